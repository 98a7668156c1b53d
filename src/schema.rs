//! JSON output types for the document processing pipeline.

use serde::{Deserialize, Serialize};

use crate::layout::Region;

/// Per-page result record accumulated across the document.
///
/// The wire key is `"page no"` — the contract consumed by the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    #[serde(rename = "page no")]
    pub page_no: u32,
    pub content: serde_json::Value,
}

/// Parsed layout of a single page: reading-ordered sections plus page furniture.
///
/// Serialized as `layout.json` into the page's output directory and embedded
/// verbatim as the `content` of the page's [`PageRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageLayout {
    /// Page image file name the regions were detected on.
    pub image: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub header: Vec<Region>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub footer: Vec<Region>,
    pub sections: Vec<Section>,
    pub region_count: usize,
}

/// A heading-delimited group of regions in reading order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// `None` for a preamble section (body regions before any heading).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<Region>,
    pub regions: Vec<Region>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_record_uses_legacy_wire_key() {
        let record = PageRecord {
            page_no: 3,
            content: serde_json::json!({"sections": []}),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["page no"], 3);
        assert!(json.get("page_no").is_none());
    }
}
