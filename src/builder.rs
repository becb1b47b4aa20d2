//! Document assembly stage.
//!
//! Folds analyzed pages into a [`Document`]: one [`Section`] per source
//! page, margins inferred from where content actually sits, and tables
//! split by a page break stitched back together.

use log::debug;

use crate::layout::{AnalyzedPage, LayoutThresholds};
use crate::model::{Block, Document, Margins, Metadata, Section, Table};

/// Narrowest margin the builder will infer, in points.
const MIN_MARGIN: f32 = 18.0;
/// Widest margin the builder will infer, in points.
const MAX_MARGIN: f32 = 144.0;
/// Margin used when a page carries no content to measure.
const DEFAULT_MARGIN: f32 = 72.0;

/// Assembles analyzed pages into the final logical document.
pub struct DocumentBuilder {
    thresholds: LayoutThresholds,
    sections: Vec<Section>,
}

impl DocumentBuilder {
    pub fn new(thresholds: LayoutThresholds) -> Self {
        Self {
            thresholds,
            sections: Vec::new(),
        }
    }

    /// Append one analyzed page as a section.
    pub fn push_page(&mut self, page: AnalyzedPage) {
        let mut section = Section::new(page.width, page.height);
        section.margins = infer_margins(&page);
        section.blocks = page.blocks;

        if let Some(prev) = self.sections.last_mut() {
            try_merge_tables(prev, &mut section, &self.thresholds);
        }
        self.sections.push(section);
    }

    /// Finish assembly and attach metadata.
    pub fn finish(self, metadata: Metadata) -> Document {
        debug!(
            "built document: {} sections, {} blocks",
            self.sections.len(),
            self.sections.iter().map(|s| s.blocks.len()).sum::<usize>()
        );
        Document {
            metadata,
            sections: self.sections,
        }
    }
}

/// Derive page margins from the content bounding box, clamped to sane
/// print-like bounds.
fn infer_margins(page: &AnalyzedPage) -> Margins {
    let bbox = page
        .blocks
        .iter()
        .map(|b| b.bbox())
        .reduce(|a, b| a.union(&b));
    let bbox = match bbox {
        Some(b) if b.width() > 0.0 && b.height() > 0.0 => b,
        _ => return Margins::default(),
    };

    let clamp = |v: f32| v.clamp(MIN_MARGIN, MAX_MARGIN);
    Margins {
        top: clamp(page.height - bbox.y1),
        bottom: clamp(bbox.y0),
        left: clamp(bbox.x0),
        right: clamp(page.width - bbox.x1),
    }
}

/// Stitch a table continued across a page break: the last block of `prev`
/// absorbs the first block of `next` when both are tables with the same
/// column geometry.
fn try_merge_tables(prev: &mut Section, next: &mut Section, thresholds: &LayoutThresholds) {
    let matches = match (prev.blocks.last(), next.blocks.first()) {
        (Some(Block::Table(a)), Some(Block::Table(b))) => {
            columns_match(a, b, thresholds.grid_tolerance)
        }
        _ => false,
    };
    if !matches {
        return;
    }

    let Block::Table(continuation) = next.blocks.remove(0) else {
        return;
    };
    if let Some(Block::Table(table)) = prev.blocks.last_mut() {
        debug!(
            "merging {}-row table continuation into {}-row table",
            continuation.rows, table.rows
        );
        let offset = table.rows;
        table.rows += continuation.rows;
        for mut cell in continuation.cells {
            cell.row += offset;
            table.cells.push(cell);
        }
    }
}

/// Same column count, every width within tolerance.
fn columns_match(a: &Table, b: &Table, tolerance: f32) -> bool {
    a.cols == b.cols
        && a.column_widths.len() == b.column_widths.len()
        && a.column_widths
            .iter()
            .zip(&b.column_widths)
            .all(|(wa, wb)| (wa - wb).abs() <= tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Rect;
    use crate::model::{Cell, Paragraph};

    fn page_with_blocks(blocks: Vec<Block>) -> AnalyzedPage {
        AnalyzedPage {
            width: 612.0,
            height: 792.0,
            blocks,
        }
    }

    fn table_2col(rows: usize, y0: f32, y1: f32) -> Table {
        let mut table = Table::new(
            rows,
            2,
            vec![150.0, 150.0],
            Rect::new(72.0, y0, 372.0, y1),
        );
        for r in 0..rows {
            table.add_cell(Cell::with_text(r, 0, format!("a{}", r)));
            table.add_cell(Cell::with_text(r, 1, format!("b{}", r)));
        }
        table
    }

    fn paragraph_at(y0: f32, y1: f32) -> Block {
        let mut p = Paragraph::from_text("text");
        p.bbox = Rect::new(72.0, y0, 540.0, y1);
        Block::Paragraph(p)
    }

    #[test]
    fn test_one_section_per_page() {
        let mut builder = DocumentBuilder::new(LayoutThresholds::default());
        builder.push_page(page_with_blocks(vec![paragraph_at(600.0, 700.0)]));
        builder.push_page(page_with_blocks(vec![paragraph_at(600.0, 700.0)]));
        let doc = builder.finish(Metadata::default());
        assert_eq!(doc.section_count(), 2);
        assert_eq!(doc.sections[0].page_width, 612.0);
    }

    #[test]
    fn test_margins_from_content() {
        let mut builder = DocumentBuilder::new(LayoutThresholds::default());
        builder.push_page(page_with_blocks(vec![paragraph_at(100.0, 700.0)]));
        let doc = builder.finish(Metadata::default());
        let margins = doc.sections[0].margins;
        assert_eq!(margins.left, 72.0);
        assert_eq!(margins.right, 72.0);
        assert_eq!(margins.top, 92.0);
        assert_eq!(margins.bottom, 100.0);
    }

    #[test]
    fn test_margins_clamped() {
        let mut p = Paragraph::from_text("edge to edge");
        p.bbox = Rect::new(2.0, 2.0, 610.0, 790.0);
        let mut builder = DocumentBuilder::new(LayoutThresholds::default());
        builder.push_page(page_with_blocks(vec![Block::Paragraph(p)]));
        let doc = builder.finish(Metadata::default());
        assert_eq!(doc.sections[0].margins.left, MIN_MARGIN);
        assert_eq!(doc.sections[0].margins.top, MIN_MARGIN);
    }

    #[test]
    fn test_empty_page_gets_default_margins() {
        let mut builder = DocumentBuilder::new(LayoutThresholds::default());
        builder.push_page(page_with_blocks(Vec::new()));
        let doc = builder.finish(Metadata::default());
        assert_eq!(doc.sections[0].margins, Margins::default());
    }

    #[test]
    fn test_cross_page_table_merge() {
        let mut builder = DocumentBuilder::new(LayoutThresholds::default());
        builder.push_page(page_with_blocks(vec![Block::Table(table_2col(
            3, 72.0, 200.0,
        ))]));
        builder.push_page(page_with_blocks(vec![
            Block::Table(table_2col(2, 600.0, 720.0)),
            paragraph_at(400.0, 500.0),
        ]));
        let doc = builder.finish(Metadata::default());

        // Continuation rows moved into the first section's table.
        let Block::Table(merged) = &doc.sections[0].blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(merged.rows, 5);
        assert!(merged.is_well_formed());
        assert_eq!(merged.cell_at(3, 0).unwrap().plain_text(), "a0");

        assert_eq!(doc.sections[1].blocks.len(), 1);
    }

    #[test]
    fn test_mismatched_tables_not_merged() {
        let mut narrow = Table::new(2, 2, vec![100.0, 100.0], Rect::default());
        narrow.add_cell(Cell::with_text(0, 0, "x"));
        narrow.add_cell(Cell::with_text(0, 1, "y"));
        narrow.add_cell(Cell::with_text(1, 0, "z"));
        narrow.add_cell(Cell::with_text(1, 1, "w"));

        let mut builder = DocumentBuilder::new(LayoutThresholds::default());
        builder.push_page(page_with_blocks(vec![Block::Table(table_2col(
            2, 72.0, 200.0,
        ))]));
        builder.push_page(page_with_blocks(vec![Block::Table(narrow)]));
        let doc = builder.finish(Metadata::default());

        let Block::Table(first) = &doc.sections[0].blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(first.rows, 2);
        assert_eq!(doc.sections[1].blocks.len(), 1);
    }

    #[test]
    fn test_metadata_attached() {
        let builder = DocumentBuilder::new(LayoutThresholds::default());
        let mut meta = Metadata::with_version("1.7");
        meta.title = Some("Report".to_string());
        let doc = builder.finish(meta);
        assert_eq!(doc.metadata.pdf_version, "1.7");
        assert_eq!(doc.metadata.title.as_deref(), Some("Report"));
    }
}
