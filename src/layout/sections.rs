//! Region ordering and section grouping.
//!
//! Pure functions, no async — easily testable. Takes the raw detections for
//! one page, sorts them into reading order, and folds them into
//! heading-delimited sections with page furniture split out.

use crate::layout::{Region, RegionClass};
use crate::schema::{PageLayout, Section};

/// Vertical-overlap fraction above which two regions count as the same line.
const SAME_LINE_OVERLAP: f32 = 0.5;

/// Build the structured layout of a page from its raw detections.
pub fn build_page_layout(
    image: &str,
    width: u32,
    height: u32,
    mut regions: Vec<Region>,
) -> PageLayout {
    let region_count = regions.len();
    sort_reading_order(&mut regions);

    let mut header = Vec::new();
    let mut footer = Vec::new();
    let mut sections: Vec<Section> = Vec::new();

    for region in regions {
        if region.label.is_furniture() {
            match region.label {
                RegionClass::PageHeader => header.push(region),
                _ => footer.push(region),
            }
        } else if region.label.is_heading() {
            sections.push(Section {
                heading: Some(region),
                regions: Vec::new(),
            });
        } else {
            match sections.last_mut() {
                Some(section) => section.regions.push(region),
                // Body content before the first heading forms a preamble
                None => sections.push(Section {
                    heading: None,
                    regions: vec![region],
                }),
            }
        }
    }

    PageLayout {
        image: image.to_string(),
        width,
        height,
        header,
        footer,
        sections,
        region_count,
    }
}

/// Sort regions top-to-bottom; regions sharing a line band go left-to-right.
pub fn sort_reading_order(regions: &mut Vec<Region>) {
    regions.sort_by(|a, b| a.bbox[1].total_cmp(&b.bbox[1]));

    // Walk the y-sorted list, collecting vertically overlapping runs into
    // lines and ordering each line left-to-right.
    let mut ordered: Vec<Region> = Vec::with_capacity(regions.len());
    let mut line: Vec<Region> = Vec::new();

    for region in regions.drain(..) {
        let same_line = line
            .iter()
            .any(|r| vertical_overlap(r, &region) > SAME_LINE_OVERLAP);
        if line.is_empty() || same_line {
            line.push(region);
        } else {
            flush_line(&mut line, &mut ordered);
            line.push(region);
        }
    }
    flush_line(&mut line, &mut ordered);

    *regions = ordered;
}

fn flush_line(line: &mut Vec<Region>, ordered: &mut Vec<Region>) {
    line.sort_by(|a, b| a.bbox[0].total_cmp(&b.bbox[0]));
    ordered.append(line);
}

/// Overlap of the two vertical extents as a fraction of the smaller height.
fn vertical_overlap(a: &Region, b: &Region) -> f32 {
    let top = a.bbox[1].max(b.bbox[1]);
    let bottom = a.bbox[3].min(b.bbox[3]);
    let overlap = (bottom - top).max(0.0);
    let min_height = (a.bbox[3] - a.bbox[1]).min(b.bbox[3] - b.bbox[1]).max(1.0);
    overlap / min_height
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(label: RegionClass, bbox: [f32; 4]) -> Region {
        Region {
            label,
            confidence: 0.9,
            bbox,
        }
    }

    #[test]
    fn stacked_regions_sort_top_to_bottom() {
        let mut regions = vec![
            region(RegionClass::Text, [10.0, 500.0, 600.0, 560.0]),
            region(RegionClass::Text, [10.0, 100.0, 600.0, 160.0]),
            region(RegionClass::Text, [10.0, 300.0, 600.0, 360.0]),
        ];
        sort_reading_order(&mut regions);

        let tops: Vec<f32> = regions.iter().map(|r| r.bbox[1]).collect();
        assert_eq!(tops, vec![100.0, 300.0, 500.0]);
    }

    #[test]
    fn same_line_sorts_left_to_right() {
        // Two side-by-side cells with a slight vertical jitter
        let mut regions = vec![
            region(RegionClass::Text, [320.0, 102.0, 600.0, 162.0]),
            region(RegionClass::Text, [10.0, 100.0, 300.0, 160.0]),
        ];
        sort_reading_order(&mut regions);

        assert_eq!(regions[0].bbox[0], 10.0);
        assert_eq!(regions[1].bbox[0], 320.0);
    }

    #[test]
    fn headings_start_sections() {
        let regions = vec![
            region(RegionClass::Title, [10.0, 20.0, 600.0, 60.0]),
            region(RegionClass::Text, [10.0, 80.0, 600.0, 200.0]),
            region(RegionClass::SectionHeader, [10.0, 220.0, 600.0, 250.0]),
            region(RegionClass::Text, [10.0, 260.0, 600.0, 400.0]),
            region(RegionClass::Table, [10.0, 420.0, 600.0, 600.0]),
        ];
        let layout = build_page_layout("page_0001.png", 612, 792, regions);

        assert_eq!(layout.sections.len(), 2);
        assert_eq!(
            layout.sections[0].heading.as_ref().unwrap().label,
            RegionClass::Title
        );
        assert_eq!(layout.sections[0].regions.len(), 1);
        assert_eq!(layout.sections[1].regions.len(), 2);
        assert_eq!(layout.region_count, 5);
    }

    #[test]
    fn body_before_heading_becomes_preamble() {
        let regions = vec![
            region(RegionClass::Text, [10.0, 20.0, 600.0, 100.0]),
            region(RegionClass::SectionHeader, [10.0, 120.0, 600.0, 150.0]),
            region(RegionClass::Text, [10.0, 160.0, 600.0, 300.0]),
        ];
        let layout = build_page_layout("page_0001.png", 612, 792, regions);

        assert_eq!(layout.sections.len(), 2);
        assert!(layout.sections[0].heading.is_none());
        assert_eq!(layout.sections[0].regions.len(), 1);
    }

    #[test]
    fn furniture_is_routed_out_of_sections() {
        let regions = vec![
            region(RegionClass::PageHeader, [10.0, 5.0, 600.0, 25.0]),
            region(RegionClass::SectionHeader, [10.0, 40.0, 600.0, 70.0]),
            region(RegionClass::Text, [10.0, 80.0, 600.0, 700.0]),
            region(RegionClass::Footnote, [10.0, 710.0, 600.0, 740.0]),
            region(RegionClass::PageFooter, [10.0, 750.0, 600.0, 780.0]),
        ];
        let layout = build_page_layout("page_0001.png", 612, 792, regions);

        assert_eq!(layout.header.len(), 1);
        assert_eq!(layout.footer.len(), 2);
        assert_eq!(layout.sections.len(), 1);
        assert_eq!(layout.sections[0].regions.len(), 1);
        assert_eq!(layout.region_count, 5);
    }

    #[test]
    fn empty_page_yields_no_sections() {
        let layout = build_page_layout("page_0001.png", 612, 792, Vec::new());
        assert!(layout.sections.is_empty());
        assert_eq!(layout.region_count, 0);
    }
}
