//! Runtime settings loaded from the environment (with `.env` support).

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_PAGE_IMAGE_DIR: &str = "out/converted_images";
const DEFAULT_PARSED_SECTIONS_DIR: &str = "out/parsed_sections";
const DEFAULT_RASTERIZER_URL: &str = "http://localhost:8001";
const DEFAULT_LAYOUT_MODEL_URL: &str = "http://localhost:8002";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_addr: SocketAddr,
    /// Where rasterized page PNGs are written.
    pub page_image_dir: PathBuf,
    /// Root for per-page `layout.json` output directories.
    pub parsed_sections_dir: PathBuf,
    pub rasterizer_url: String,
    pub layout_model_url: String,
    pub max_upload_bytes: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env_or("BIND_ADDR", DEFAULT_BIND_ADDR)
            .parse()
            .context("BIND_ADDR is not a valid socket address")?;

        let max_upload_bytes = match env::var("MAX_UPLOAD_BYTES") {
            Ok(raw) => raw.parse().context("MAX_UPLOAD_BYTES is not a number")?,
            Err(_) => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            bind_addr,
            page_image_dir: PathBuf::from(env_or("PAGE_IMAGE_DIR", DEFAULT_PAGE_IMAGE_DIR)),
            parsed_sections_dir: PathBuf::from(env_or(
                "PARSED_SECTIONS_DIR",
                DEFAULT_PARSED_SECTIONS_DIR,
            )),
            rasterizer_url: env_or("RASTERIZER_URL", DEFAULT_RASTERIZER_URL),
            layout_model_url: env_or("LAYOUT_MODEL_URL", DEFAULT_LAYOUT_MODEL_URL),
            max_upload_bytes,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
