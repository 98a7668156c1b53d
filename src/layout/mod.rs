//! Modular layout-detection abstraction.
//!
//! Defines the [`LayoutDetector`] trait and the region types shared by the
//! model-server client and the section grouping pass.

pub mod sections;
pub mod sidecar;

use serde::{Deserialize, Serialize};

/// A detected layout region on a page image.
///
/// `bbox` is `[x1, y1, x2, y2]` in pixels, origin top-left.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub label: RegionClass,
    pub confidence: f64,
    pub bbox: [f32; 4],
}

/// DocLayNet label set emitted by the detection model.
///
/// Serde names match the wire labels exactly, hyphens included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionClass {
    Caption,
    Footnote,
    Formula,
    #[serde(rename = "List-item")]
    ListItem,
    #[serde(rename = "Page-footer")]
    PageFooter,
    #[serde(rename = "Page-header")]
    PageHeader,
    Picture,
    #[serde(rename = "Section-header")]
    SectionHeader,
    Table,
    Text,
    Title,
}

impl RegionClass {
    /// Heading classes open a new section during grouping.
    pub fn is_heading(self) -> bool {
        matches!(self, Self::Title | Self::SectionHeader)
    }

    /// Furniture classes never belong to a section body.
    pub fn is_furniture(self) -> bool {
        matches!(self, Self::PageHeader | Self::PageFooter | Self::Footnote)
    }
}

/// Async trait implemented by each layout-detection backend.
#[async_trait::async_trait]
pub trait LayoutDetector: Send + Sync {
    fn name(&self) -> &str;
    async fn detect(&self, image_name: &str, png: &[u8]) -> anyhow::Result<Vec<Region>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyphenated_labels_deserialize() {
        let region: Region = serde_json::from_str(
            r#"{"label": "Section-header", "confidence": 0.91, "bbox": [12.0, 40.5, 580.0, 66.0]}"#,
        )
        .unwrap();
        assert_eq!(region.label, RegionClass::SectionHeader);
        assert!(region.label.is_heading());
    }

    #[test]
    fn furniture_and_heading_sets_are_disjoint() {
        let all = [
            RegionClass::Caption,
            RegionClass::Footnote,
            RegionClass::Formula,
            RegionClass::ListItem,
            RegionClass::PageFooter,
            RegionClass::PageHeader,
            RegionClass::Picture,
            RegionClass::SectionHeader,
            RegionClass::Table,
            RegionClass::Text,
            RegionClass::Title,
        ];
        for class in all {
            assert!(!(class.is_heading() && class.is_furniture()), "{:?}", class);
        }
    }
}
