//! Paragraph segmentation and alignment inference.

use crate::geom::Rect;
use crate::model::{Alignment, Line, Paragraph};

use super::thresholds::LayoutThresholds;

/// Nominal line height as a multiple of font size, used when a paragraph
/// has a single line and no measured spacing.
const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Split top-down ordered lines into paragraphs at vertical gaps, then
/// infer alignment and indent against the enclosing column.
pub fn build_paragraphs(
    lines: Vec<Line>,
    column: &Rect,
    thresholds: &LayoutThresholds,
) -> Vec<Paragraph> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<Line> = Vec::new();

    for line in lines {
        if line.is_empty() {
            continue;
        }
        let break_before = match current.last() {
            Some(prev) => {
                let gap = prev.baseline - line.baseline;
                let line_height = prev.font_size().max(line.font_size()) * LINE_HEIGHT_FACTOR;
                gap > thresholds.paragraph_gap_factor * line_height
            }
            None => false,
        };
        if break_before && !current.is_empty() {
            paragraphs.push(finish_paragraph(std::mem::take(&mut current), column));
        }
        current.push(line);
    }
    if !current.is_empty() {
        paragraphs.push(finish_paragraph(current, column));
    }
    paragraphs
}

fn finish_paragraph(lines: Vec<Line>, column: &Rect) -> Paragraph {
    let mut paragraph = Paragraph::new(lines);
    paragraph.alignment = infer_alignment(&paragraph, column);
    paragraph.indent = (paragraph.bbox.x0 - column.x0).max(0.0);
    paragraph
}

/// Classify alignment from the paragraph's margins inside its column.
fn infer_alignment(paragraph: &Paragraph, column: &Rect) -> Alignment {
    let tolerance = (column.width() * 0.02).max(6.0);
    let left = paragraph.bbox.x0 - column.x0;
    let right = column.x1 - paragraph.bbox.x1;

    // Justified: every interior line fills the column on both sides.
    if paragraph.lines.len() >= 3 {
        let interior = &paragraph.lines[..paragraph.lines.len() - 1];
        let justified = interior.iter().all(|l| {
            l.bbox.x0 - column.x0 < tolerance && column.x1 - l.bbox.x1 < tolerance
        });
        if justified {
            return Alignment::Justify;
        }
    }

    if left > tolerance && right > tolerance && (left - right).abs() < tolerance {
        return Alignment::Center;
    }
    if right < tolerance && left > tolerance {
        return Alignment::Right;
    }
    Alignment::Left
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Run, StyleAttributes};

    fn line(text: &str, x0: f32, x1: f32, baseline: f32) -> Line {
        let run = Run::new(
            text,
            StyleAttributes::default(),
            Rect::new(x0, baseline - 2.0, x1, baseline + 10.0),
        );
        Line::new(vec![run], baseline)
    }

    fn column() -> Rect {
        Rect::new(72.0, 72.0, 540.0, 720.0)
    }

    #[test]
    fn test_gap_splits_paragraphs() {
        let lines = vec![
            line("one", 72.0, 300.0, 700.0),
            line("two", 72.0, 300.0, 686.0),
            // 40pt gap: a new paragraph.
            line("three", 72.0, 300.0, 646.0),
        ];
        let paras = build_paragraphs(lines, &column(), &LayoutThresholds::default());
        assert_eq!(paras.len(), 2);
        assert_eq!(paras[0].lines.len(), 2);
        assert_eq!(paras[1].plain_text(), "three");
    }

    #[test]
    fn test_single_spacing_stays_together() {
        let lines = vec![
            line("a", 72.0, 500.0, 700.0),
            line("b", 72.0, 500.0, 686.0),
            line("c", 72.0, 500.0, 672.0),
        ];
        let paras = build_paragraphs(lines, &column(), &LayoutThresholds::default());
        assert_eq!(paras.len(), 1);
        assert!((paras[0].line_spacing - 14.0).abs() < 1e-3);
    }

    #[test]
    fn test_centered_detection() {
        let lines = vec![line("Title", 250.0, 362.0, 700.0)];
        let paras = build_paragraphs(lines, &column(), &LayoutThresholds::default());
        assert_eq!(paras[0].alignment, Alignment::Center);
    }

    #[test]
    fn test_right_aligned_detection() {
        let lines = vec![line("Page 4", 480.0, 538.0, 700.0)];
        let paras = build_paragraphs(lines, &column(), &LayoutThresholds::default());
        assert_eq!(paras[0].alignment, Alignment::Right);
    }

    #[test]
    fn test_justified_detection() {
        let lines = vec![
            line("full width line", 72.0, 539.0, 700.0),
            line("another full line", 72.0, 540.0, 686.0),
            line("short last line", 72.0, 200.0, 672.0),
        ];
        let paras = build_paragraphs(lines, &column(), &LayoutThresholds::default());
        assert_eq!(paras[0].alignment, Alignment::Justify);
    }

    #[test]
    fn test_indent_relative_to_column() {
        let lines = vec![line("indented", 108.0, 400.0, 700.0)];
        let paras = build_paragraphs(lines, &column(), &LayoutThresholds::default());
        assert_eq!(paras[0].alignment, Alignment::Left);
        assert!((paras[0].indent - 36.0).abs() < 1e-4);
    }
}
