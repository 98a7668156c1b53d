//! ETL pipeline: document → page images → per-page layout → evaluation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::evaluation::EvaluationAgent;
use crate::layout::{sections, LayoutDetector};
use crate::raster::{self, Rasterizer};
use crate::schema::{PageLayout, PageRecord};

/// Pipeline orchestrator owning the collaborator clients and output dirs.
pub struct EtlPipeline {
    rasterizer: Arc<dyn Rasterizer>,
    detector: Arc<dyn LayoutDetector>,
    agent: EvaluationAgent,
    page_image_dir: PathBuf,
    parsed_sections_dir: PathBuf,
}

impl EtlPipeline {
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        detector: Arc<dyn LayoutDetector>,
        agent: EvaluationAgent,
        page_image_dir: PathBuf,
        parsed_sections_dir: PathBuf,
    ) -> Self {
        Self {
            rasterizer,
            detector,
            agent,
            page_image_dir,
            parsed_sections_dir,
        }
    }

    /// Rasterize the document and persist one PNG per page.
    ///
    /// Returns the image paths in page order.
    pub async fn convert_document_to_images(
        &self,
        path: &Path,
        filename: &str,
    ) -> Result<Vec<PathBuf>> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let pages = self.rasterizer.render(filename, &data).await?;
        if pages.is_empty() {
            return Err(
                ApiError::unprocessable(format!("Rasterizer produced no pages for {}", filename))
                    .into(),
            );
        }

        let stem = document_stem(filename, &data);
        tokio::fs::create_dir_all(&self.page_image_dir)
            .await
            .with_context(|| format!("Failed to create {}", self.page_image_dir.display()))?;

        let mut paths = Vec::with_capacity(pages.len());
        for page in &pages {
            let image_path = self
                .page_image_dir
                .join(format!("{}_page_{:04}.png", stem, page.page_num));
            tokio::fs::write(&image_path, &page.png)
                .await
                .with_context(|| format!("Failed to write {}", image_path.display()))?;
            debug!(
                "Wrote page {} ({}x{}) to {}",
                page.page_num,
                page.width,
                page.height,
                image_path.display()
            );
            paths.push(image_path);
        }

        info!(
            "Converted {} into {} page images via {} (stem={})",
            filename,
            paths.len(),
            self.rasterizer.name(),
            stem
        );
        Ok(paths)
    }

    /// Run layout detection on one page image and group the regions into
    /// sections. Writes `layout.json` into `output_dir` and returns the layout.
    pub async fn parse_image_layout(
        &self,
        image_path: &Path,
        output_dir: &Path,
    ) -> Result<PageLayout> {
        let image_name = image_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("page.png")
            .to_string();

        let png = tokio::fs::read(image_path)
            .await
            .with_context(|| format!("Failed to read page image {}", image_path.display()))?;
        let (width, height) = raster::png_dimensions(&png)
            .with_context(|| format!("Page image {} is not a valid PNG", image_name))?;

        let regions = self.detector.detect(&image_name, &png).await?;
        let layout = sections::build_page_layout(&image_name, width, height, regions);

        tokio::fs::create_dir_all(output_dir)
            .await
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;
        let json = serde_json::to_vec_pretty(&layout)?;
        tokio::fs::write(output_dir.join("layout.json"), json)
            .await
            .with_context(|| format!("Failed to write layout.json in {}", output_dir.display()))?;

        debug!(
            "Parsed {} via {}: {} regions in {} sections",
            image_name,
            self.detector.name(),
            layout.region_count,
            layout.sections.len()
        );
        Ok(layout)
    }

    /// Per-page loop: parse every page image, assigning 1-based page numbers
    /// in rasterization order. Each page gets its own output directory under
    /// the parsed-sections dir, named after the image file stem.
    pub async fn parse_document_pages(&self, image_paths: &[PathBuf]) -> Result<Vec<PageRecord>> {
        let mut records = Vec::with_capacity(image_paths.len());

        for (i, image_path) in image_paths.iter().enumerate() {
            let page_no = (i + 1) as u32;
            let base = image_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("page");
            let output_dir = self.parsed_sections_dir.join(base);

            let layout = self.parse_image_layout(image_path, &output_dir).await?;
            records.push(PageRecord {
                page_no,
                content: serde_json::to_value(&layout)?,
            });
        }

        Ok(records)
    }

    /// Cross-page evaluation: reconcile the page records into the final JSON.
    pub async fn evaluate(&self, pages: &[PageRecord]) -> Result<serde_json::Value> {
        self.agent.evaluate(pages).await
    }
}

/// Collision-safe file stem: sanitized filename stem plus a short content hash,
/// so two different uploads sharing a name cannot overwrite each other's pages.
fn document_stem(filename: &str, data: &[u8]) -> String {
    let base = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let digest = Sha256::digest(data);
    let hash: String = digest[..6].iter().map(|b| format!("{:02x}", b)).collect();

    format!("{}_{}", sanitized, hash)
}
