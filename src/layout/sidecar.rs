//! Layout-model sidecar client.
//!
//! The detection model (DocLayNet-class object detector) runs in an external
//! model server; this client only ships the page image and reads back boxes.

use super::{LayoutDetector, Region};
use serde::Deserialize;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct DetectResponse {
    regions: Vec<Region>,
}

pub struct LayoutSidecar {
    url: String,
    client: reqwest::Client,
}

impl LayoutSidecar {
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }
}

#[async_trait::async_trait]
impl LayoutDetector for LayoutSidecar {
    fn name(&self) -> &str {
        "layout_sidecar"
    }

    async fn detect(&self, image_name: &str, png: &[u8]) -> anyhow::Result<Vec<Region>> {
        use reqwest::multipart::{Form, Part};

        let part = Part::bytes(png.to_vec())
            .file_name(image_name.to_string())
            .mime_str("image/png")?;
        let form = Form::new().part("image", part);

        info!("LayoutSidecar: detecting regions on {}", image_name);

        let response = self
            .client
            .post(format!("{}/detect", self.url))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Layout sidecar error ({}): {}", status, error_text);
        }

        let detect: DetectResponse = response.json().await?;
        debug!(
            "LayoutSidecar: {} regions on {}",
            detect.regions.len(),
            image_name
        );

        Ok(detect.regions)
    }
}
