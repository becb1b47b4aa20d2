//! Tunable thresholds for layout analysis.
//!
//! Every heuristic constant used by the analyzer lives here under a name,
//! so callers can tighten or loosen detection per document class.

use serde::{Deserialize, Serialize};

/// Named thresholds controlling line merging, paragraph segmentation,
/// column detection, and table detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutThresholds {
    /// Baseline distance, as a fraction of font size, under which two runs
    /// belong to the same line.
    pub line_merge_tolerance: f32,
    /// Horizontal gap, as a fraction of font size, above which a space is
    /// inserted between adjacent runs on a line.
    pub word_gap_factor: f32,
    /// Vertical gap, as a multiple of line height, above which a new
    /// paragraph starts.
    pub paragraph_gap_factor: f32,
    /// Minimum gutter width as a fraction of page width for column
    /// detection.
    pub column_gap_ratio: f32,
    /// Minimum column width as a fraction of page width; anything narrower
    /// is treated as decoration, not a column.
    pub column_min_width_ratio: f32,
    /// Coordinate slack in points when snapping rules to a table grid.
    pub grid_tolerance: f32,
    /// Maximum thickness in points for a vector element to count as a rule.
    pub rule_thickness: f32,
    /// Minimum grid rows for a table.
    pub min_table_rows: usize,
    /// Minimum grid columns for a table.
    pub min_table_cols: usize,
}

impl Default for LayoutThresholds {
    fn default() -> Self {
        Self {
            line_merge_tolerance: 0.3,
            word_gap_factor: 0.25,
            paragraph_gap_factor: 1.5,
            column_gap_ratio: 0.03,
            column_min_width_ratio: 0.15,
            grid_tolerance: 3.0,
            rule_thickness: 1.5,
            min_table_rows: 2,
            min_table_cols: 2,
        }
    }
}

impl LayoutThresholds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line_merge_tolerance(mut self, value: f32) -> Self {
        self.line_merge_tolerance = value;
        self
    }

    pub fn with_word_gap_factor(mut self, value: f32) -> Self {
        self.word_gap_factor = value;
        self
    }

    pub fn with_paragraph_gap_factor(mut self, value: f32) -> Self {
        self.paragraph_gap_factor = value;
        self
    }

    pub fn with_column_gap_ratio(mut self, value: f32) -> Self {
        self.column_gap_ratio = value;
        self
    }

    pub fn with_grid_tolerance(mut self, value: f32) -> Self {
        self.grid_tolerance = value;
        self
    }

    /// Baseline epsilon in points for a given font size.
    pub fn line_epsilon(&self, font_size: f32) -> f32 {
        self.line_merge_tolerance * font_size.max(1.0)
    }

    /// Word gap in points for a given font size.
    pub fn word_gap(&self, font_size: f32) -> f32 {
        self.word_gap_factor * font_size.max(1.0)
    }

    /// Minimum gutter width in points for a given page width.
    pub fn column_gap(&self, page_width: f32) -> f32 {
        self.column_gap_ratio * page_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_scale_with_inputs() {
        let t = LayoutThresholds::default();
        assert!((t.line_epsilon(12.0) - 3.6).abs() < 1e-4);
        assert!((t.word_gap(10.0) - 2.5).abs() < 1e-4);
        assert!((t.column_gap(612.0) - 18.36).abs() < 1e-2);
    }

    #[test]
    fn test_builder_overrides() {
        let t = LayoutThresholds::new()
            .with_paragraph_gap_factor(2.0)
            .with_grid_tolerance(5.0);
        assert_eq!(t.paragraph_gap_factor, 2.0);
        assert_eq!(t.grid_tolerance, 5.0);
        assert_eq!(t.min_table_rows, 2);
    }
}
