//! Table types.

use serde::{Deserialize, Serialize};

use super::Paragraph;
use crate::geom::Rect;

/// A reconstructed table: a rectangular grid of cells.
///
/// Cells tile the grid exactly: every (row, column) slot is covered by
/// exactly one cell, either directly or through a row/column span.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Number of grid rows.
    pub rows: usize,
    /// Number of grid columns.
    pub cols: usize,
    /// Cells in row-major order of their anchor slot.
    pub cells: Vec<Cell>,
    /// Column widths in points, one per grid column.
    pub column_widths: Vec<f32>,
    pub bbox: Rect,
}

impl Table {
    pub fn new(rows: usize, cols: usize, column_widths: Vec<f32>, bbox: Rect) -> Self {
        Self {
            rows,
            cols,
            cells: Vec::new(),
            column_widths,
            bbox,
        }
    }

    pub fn add_cell(&mut self, cell: Cell) {
        self.cells.push(cell);
    }

    /// Cell anchored at the given grid slot, if any.
    pub fn cell_at(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.iter().find(|c| c.row == row && c.col == col)
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.is_empty())
    }

    pub fn has_merged_cells(&self) -> bool {
        self.cells.iter().any(|c| c.row_span > 1 || c.col_span > 1)
    }

    /// Tab-separated plain text, one output line per grid row.
    pub fn plain_text(&self) -> String {
        (0..self.rows)
            .map(|r| {
                (0..self.cols)
                    .filter_map(|c| self.cell_at(r, c))
                    .map(|cell| cell.plain_text())
                    .collect::<Vec<_>>()
                    .join("\t")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Check that cells tile the grid exactly: no gaps, no overlaps.
    pub fn is_well_formed(&self) -> bool {
        let mut covered = vec![false; self.rows * self.cols];
        for cell in &self.cells {
            for r in cell.row..cell.row + cell.row_span {
                for c in cell.col..cell.col + cell.col_span {
                    if r >= self.rows || c >= self.cols {
                        return false;
                    }
                    let idx = r * self.cols + c;
                    if covered[idx] {
                        return false;
                    }
                    covered[idx] = true;
                }
            }
        }
        covered.iter().all(|&v| v)
    }
}

/// A table cell anchored at a grid slot, possibly spanning further slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    /// Anchor row (0-indexed).
    pub row: usize,
    /// Anchor column (0-indexed).
    pub col: usize,
    pub row_span: usize,
    pub col_span: usize,
    /// Paragraphs inside the cell, in reading order.
    pub content: Vec<Paragraph>,
    pub bbox: Rect,
}

impl Cell {
    pub fn new(row: usize, col: usize, bbox: Rect) -> Self {
        Self {
            row,
            col,
            row_span: 1,
            col_span: 1,
            content: Vec::new(),
            bbox,
        }
    }

    /// Cell with a single plain-text paragraph, mainly for tests.
    pub fn with_text(row: usize, col: usize, text: impl Into<String>) -> Self {
        Self {
            content: vec![Paragraph::from_text(text)],
            ..Self::new(row, col, Rect::default())
        }
    }

    pub fn span(mut self, row_span: usize, col_span: usize) -> Self {
        self.row_span = row_span.max(1);
        self.col_span = col_span.max(1);
        self
    }

    pub fn plain_text(&self) -> String {
        self.content
            .iter()
            .map(|p| p.plain_text())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty() || self.plain_text().trim().is_empty()
    }
}
