//! Rasterizer abstraction and sidecar client.
//!
//! Turns an uploaded document into per-page PNG images. The rendering itself
//! happens in an external sidecar; this module only ships bytes and decodes
//! what comes back.

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use tracing::{debug, info};

/// A single rasterized page (always 1-indexed).
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub page_num: u32,
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Async trait implemented by each rasterizer backend.
#[async_trait::async_trait]
pub trait Rasterizer: Send + Sync {
    fn name(&self) -> &str;
    async fn render(&self, filename: &str, data: &[u8]) -> anyhow::Result<Vec<RenderedPage>>;
}

// ── Sidecar response types ──────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RenderResponse {
    pages: Vec<RenderedPageContent>,
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct RenderedPageContent {
    page_num: u32,
    png_base64: String,
}

// ── Provider implementation ─────────────────────────────────────────────────

pub struct RasterizerSidecar {
    url: String,
    client: reqwest::Client,
}

impl RasterizerSidecar {
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait::async_trait]
impl Rasterizer for RasterizerSidecar {
    fn name(&self) -> &str {
        "rasterizer_sidecar"
    }

    async fn render(&self, filename: &str, data: &[u8]) -> anyhow::Result<Vec<RenderedPage>> {
        use reqwest::multipart::{Form, Part};

        let part = Part::bytes(data.to_vec())
            .file_name(filename.to_string())
            .mime_str(mime_for(filename))?;
        let form = Form::new().part("file", part);

        info!(
            "RasterizerSidecar: rendering {} ({} bytes)",
            filename,
            data.len()
        );

        let response = self
            .client
            .post(format!("{}/render", self.url))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Rasterizer sidecar error ({}): {}", status, error_text);
        }

        let render: RenderResponse = response.json().await?;
        debug!(
            "RasterizerSidecar: {} pages for {}",
            render.total_pages, filename
        );

        let mut pages = Vec::with_capacity(render.pages.len());
        for page in render.pages {
            let png = BASE64
                .decode(page.png_base64.as_bytes())
                .with_context(|| format!("Invalid base64 image for page {}", page.page_num))?;
            let (width, height) = png_dimensions(&png)
                .with_context(|| format!("Page {} is not a decodable PNG", page.page_num))?;
            pages.push(RenderedPage {
                page_num: page.page_num,
                png,
                width,
                height,
            });
        }

        Ok(pages)
    }
}

/// Decode a PNG far enough to read its dimensions.
pub(crate) fn png_dimensions(png: &[u8]) -> anyhow::Result<(u32, u32)> {
    let img = image::load_from_memory_with_format(png, image::ImageFormat::Png)?;
    Ok((img.width(), img.height()))
}

fn mime_for(filename: &str) -> &'static str {
    let ext = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("tif") | Some("tiff") => "image/tiff",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_dimensions_reads_size() {
        let mut buf = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(image::RgbImage::new(3, 2))
            .write_to(&mut buf, image::ImageOutputFormat::Png)
            .unwrap();

        assert_eq!(png_dimensions(buf.get_ref()).unwrap(), (3, 2));
    }

    #[test]
    fn png_dimensions_rejects_garbage() {
        assert!(png_dimensions(b"not a png").is_err());
    }

    #[test]
    fn mime_is_sniffed_from_extension() {
        assert_eq!(mime_for("report.PDF"), "application/pdf");
        assert_eq!(mime_for("scan.jpeg"), "image/jpeg");
        assert_eq!(mime_for("page.tiff"), "image/tiff");
        assert_eq!(mime_for("unknown.bin"), "application/octet-stream");
        assert_eq!(mime_for("no_extension"), "application/octet-stream");
    }
}
