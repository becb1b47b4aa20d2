//! Column detection from horizontal occupancy.

use crate::geom::Rect;

use super::thresholds::LayoutThresholds;

const BIN_WIDTH: f32 = 2.0;

/// Fraction of the content width above which a box is considered to span
/// columns and is excluded from gutter detection.
const SPANNING_FRACTION: f32 = 0.6;

/// Detect side-by-side text columns from line bounding boxes.
///
/// Projects the boxes onto the X axis and looks for sustained empty
/// gutters. Returns the column rectangles left to right; a page without a
/// detectable gutter yields a single column covering the content area.
pub fn detect_columns(
    boxes: &[Rect],
    page_width: f32,
    thresholds: &LayoutThresholds,
) -> Vec<Rect> {
    let Some(content) = boxes.iter().copied().reduce(|a, b| a.union(&b)) else {
        return Vec::new();
    };
    if content.width() < BIN_WIDTH * 4.0 {
        return vec![content];
    }

    // Full-width headings would bridge any gutter; leave them out.
    let narrow: Vec<&Rect> = boxes
        .iter()
        .filter(|b| b.width() < content.width() * SPANNING_FRACTION)
        .collect();
    if narrow.is_empty() {
        return vec![content];
    }

    let bins = (content.width() / BIN_WIDTH).ceil() as usize;
    let mut occupied = vec![false; bins];
    for b in &narrow {
        let lo = ((b.x0 - content.x0) / BIN_WIDTH).floor().max(0.0) as usize;
        let hi = (((b.x1 - content.x0) / BIN_WIDTH).ceil() as usize).min(bins);
        for slot in occupied.iter_mut().take(hi).skip(lo) {
            *slot = true;
        }
    }

    let min_gap_bins = (thresholds.column_gap(page_width) / BIN_WIDTH).ceil() as usize;
    let min_col_width = thresholds.column_min_width_ratio * page_width;

    // Occupied spans separated by gutters at least min_gap_bins wide.
    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut i = 0usize;
    while i < bins {
        if !occupied[i] {
            i += 1;
            continue;
        }
        let start = i;
        let mut end = i;
        while i < bins {
            if occupied[i] {
                end = i;
                i += 1;
            } else {
                // Look ahead: a short hole does not end the span.
                let hole_start = i;
                while i < bins && !occupied[i] {
                    i += 1;
                }
                if i - hole_start >= min_gap_bins.max(1) {
                    break;
                }
                // Swallowed hole; continue the span.
                if i < bins {
                    end = i;
                }
            }
        }
        spans.push((start, end));
    }

    let columns: Vec<Rect> = spans
        .iter()
        .map(|&(start, end)| {
            Rect::new(
                content.x0 + start as f32 * BIN_WIDTH,
                content.y0,
                content.x0 + (end + 1) as f32 * BIN_WIDTH,
                content.y1,
            )
        })
        .filter(|r| r.width() >= min_col_width)
        .collect();

    if columns.len() >= 2 {
        columns
    } else {
        vec![content]
    }
}

/// Index of the column whose horizontal span best matches the box, by
/// center position.
pub fn column_of(bbox: &Rect, columns: &[Rect]) -> usize {
    let cx = bbox.center_x();
    columns
        .iter()
        .position(|c| cx >= c.x0 && cx <= c.x1)
        .unwrap_or_else(|| {
            // Off-grid content snaps to the nearest column.
            columns
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    (a.center_x() - cx)
                        .abs()
                        .partial_cmp(&(b.center_x() - cx).abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(i, _)| i)
                .unwrap_or(0)
        })
}

/// Whether a box bridges two or more columns.
pub fn spans_columns(bbox: &Rect, columns: &[Rect]) -> bool {
    if columns.len() < 2 {
        return false;
    }
    let touched = columns
        .iter()
        .filter(|c| bbox.x_overlap(c) > c.width() * 0.25)
        .count();
    touched >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_column_boxes() -> Vec<Rect> {
        let mut boxes = Vec::new();
        for i in 0..10 {
            let y = 700.0 - i as f32 * 14.0;
            boxes.push(Rect::new(72.0, y, 290.0, y + 12.0));
            boxes.push(Rect::new(322.0, y, 540.0, y + 12.0));
        }
        boxes
    }

    #[test]
    fn test_two_columns_detected() {
        let columns = detect_columns(&two_column_boxes(), 612.0, &LayoutThresholds::default());
        assert_eq!(columns.len(), 2);
        assert!(columns[0].x1 < columns[1].x0);
        assert!(columns[0].x0 <= 72.0 + BIN_WIDTH);
    }

    #[test]
    fn test_single_column_page() {
        let boxes: Vec<Rect> = (0..10)
            .map(|i| {
                let y = 700.0 - i as f32 * 14.0;
                Rect::new(72.0, y, 540.0, y + 12.0)
            })
            .collect();
        let columns = detect_columns(&boxes, 612.0, &LayoutThresholds::default());
        assert_eq!(columns.len(), 1);
    }

    #[test]
    fn test_spanning_title_does_not_mask_gutter() {
        let mut boxes = two_column_boxes();
        boxes.push(Rect::new(72.0, 740.0, 540.0, 756.0)); // full-width title
        let columns = detect_columns(&boxes, 612.0, &LayoutThresholds::default());
        assert_eq!(columns.len(), 2);
    }

    #[test]
    fn test_column_assignment() {
        let columns = detect_columns(&two_column_boxes(), 612.0, &LayoutThresholds::default());
        let left_line = Rect::new(80.0, 500.0, 200.0, 512.0);
        let right_line = Rect::new(330.0, 500.0, 500.0, 512.0);
        assert_eq!(column_of(&left_line, &columns), 0);
        assert_eq!(column_of(&right_line, &columns), 1);

        let title = Rect::new(72.0, 740.0, 540.0, 756.0);
        assert!(spans_columns(&title, &columns));
        assert!(!spans_columns(&left_line, &columns));
    }

    #[test]
    fn test_word_gaps_do_not_split_columns() {
        // Single ragged column with ordinary word gaps.
        let boxes = vec![
            Rect::new(72.0, 700.0, 200.0, 712.0),
            Rect::new(208.0, 700.0, 320.0, 712.0),
            Rect::new(72.0, 686.0, 310.0, 698.0),
        ];
        let columns = detect_columns(&boxes, 612.0, &LayoutThresholds::default());
        assert_eq!(columns.len(), 1);
    }
}
