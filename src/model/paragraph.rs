//! Text flow types: styled runs, lines, and paragraphs.

use serde::{Deserialize, Serialize};

use super::Color;
use crate::geom::Rect;

/// Horizontal paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// Portable style attributes resolved from the source graphics state.
/// Attached to runs; pages never own style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleAttributes {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    /// Portable font family (never empty: unresolved fonts fall back to a
    /// registry default).
    pub family: String,
    /// Size in points.
    pub size: f32,
    pub color: Color,
}

impl Default for StyleAttributes {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            underline: false,
            strikethrough: false,
            family: "Times New Roman".to_string(),
            size: 12.0,
            color: Color::BLACK,
        }
    }
}

/// A styled span of text within a line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    pub style: StyleAttributes,
    pub bbox: Rect,
}

impl Run {
    pub fn new(text: impl Into<String>, style: StyleAttributes, bbox: Rect) -> Self {
        Self {
            text: text.into(),
            style,
            bbox,
        }
    }
}

/// An ordered sequence of runs sharing a baseline within tolerance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    /// Runs ordered left to right.
    pub runs: Vec<Run>,
    /// Shared baseline Y position in page space.
    pub baseline: f32,
    pub bbox: Rect,
}

impl Line {
    pub fn new(runs: Vec<Run>, baseline: f32) -> Self {
        let bbox = runs
            .iter()
            .map(|r| r.bbox)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default();
        Self {
            runs,
            baseline,
            bbox,
        }
    }

    /// Dominant font size, weighted by run length.
    pub fn font_size(&self) -> f32 {
        let total: usize = self.runs.iter().map(|r| r.text.chars().count()).sum();
        if total == 0 {
            return 12.0;
        }
        let weighted: f32 = self
            .runs
            .iter()
            .map(|r| r.style.size * r.text.chars().count() as f32)
            .sum();
        weighted / total as f32
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty() || self.text().trim().is_empty()
    }
}

/// An ordered sequence of lines forming one logical paragraph.
///
/// Lines are strictly ordered by descending baseline, then ascending left
/// edge; the layout analyzer establishes that order and the builder freezes
/// it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paragraph {
    pub lines: Vec<Line>,
    pub alignment: Alignment,
    /// Left indentation relative to the enclosing column, in points.
    pub indent: f32,
    /// Baseline-to-baseline distance in points (0 for single-line paragraphs).
    pub line_spacing: f32,
    pub bbox: Rect,
}

impl Paragraph {
    pub fn new(lines: Vec<Line>) -> Self {
        let bbox = lines
            .iter()
            .map(|l| l.bbox)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default();
        let line_spacing = if lines.len() >= 2 {
            let gaps: Vec<f32> = lines
                .windows(2)
                .map(|w| (w[0].baseline - w[1].baseline).abs())
                .collect();
            gaps.iter().sum::<f32>() / gaps.len() as f32
        } else {
            0.0
        };
        Self {
            lines,
            alignment: Alignment::Left,
            indent: 0.0,
            line_spacing,
            bbox,
        }
    }

    /// Single-run paragraph, mainly for tests and table cell filling.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let run = Run::new(text, StyleAttributes::default(), Rect::default());
        Self::new(vec![Line::new(vec![run], 0.0)])
    }

    /// Text of all lines joined with single spaces.
    pub fn plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Style-homogeneous runs across the whole paragraph, with a single
    /// space inserted at each interior line boundary. Adjacent runs with
    /// identical style merge into one; this is the shape the serializer
    /// emits.
    pub fn merged_runs(&self) -> Vec<Run> {
        let mut out: Vec<Run> = Vec::new();
        for (i, line) in self.lines.iter().enumerate() {
            for (j, run) in line.runs.iter().enumerate() {
                let mut text = run.text.clone();
                if i > 0 && j == 0 {
                    text.insert(0, ' ');
                }
                match out.last_mut() {
                    Some(prev) if prev.style == run.style => {
                        prev.text.push_str(&text);
                        prev.bbox = prev.bbox.union(&run.bbox);
                    }
                    _ => out.push(Run::new(text, run.style.clone(), run.bbox)),
                }
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.is_empty())
    }

    /// Dominant font size of the paragraph.
    pub fn font_size(&self) -> f32 {
        if self.lines.is_empty() {
            return 12.0;
        }
        let sum: f32 = self.lines.iter().map(|l| l.font_size()).sum();
        sum / self.lines.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, bold: bool, x0: f32) -> Run {
        let style = StyleAttributes {
            bold,
            ..Default::default()
        };
        Run::new(text, style, Rect::new(x0, 100.0, x0 + 40.0, 112.0))
    }

    #[test]
    fn test_line_text_and_bbox() {
        let line = Line::new(vec![run("Hello ", false, 72.0), run("world", false, 120.0)], 100.0);
        assert_eq!(line.text(), "Hello world");
        assert_eq!(line.bbox, Rect::new(72.0, 100.0, 160.0, 112.0));
    }

    #[test]
    fn test_merged_runs_same_style() {
        let para = Paragraph::new(vec![
            Line::new(vec![run("first", false, 72.0)], 100.0),
            Line::new(vec![run("second", false, 72.0)], 86.0),
        ]);
        let merged = para.merged_runs();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "first second");
        assert!((para.line_spacing - 14.0).abs() < 1e-4);
    }

    #[test]
    fn test_merged_runs_style_boundary() {
        let para = Paragraph::new(vec![Line::new(
            vec![run("plain ", false, 72.0), run("bold", true, 120.0)],
            100.0,
        )]);
        let merged = para.merged_runs();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "plain ");
        assert_eq!(merged[1].text, "bold");
        assert!(merged[1].style.bold);
    }

    #[test]
    fn test_plain_text_joins_lines() {
        let para = Paragraph::new(vec![
            Line::new(vec![run("one", false, 72.0)], 100.0),
            Line::new(vec![run("two", false, 72.0)], 86.0),
        ]);
        assert_eq!(para.plain_text(), "one two");
    }
}
