//! Layout analysis stage.
//!
//! Consumes a parsed [`Page`] and reconstructs logical structure: lines,
//! paragraphs, columns, and tables, ordered for reading. Multi-column pages
//! emit the entire left column before the next column within each
//! full-width band; content spanning all columns (titles, tables, figures)
//! cuts the page into such bands.

pub mod columns;
pub mod lines;
pub mod paragraphs;
pub mod tables;
pub mod thresholds;

pub use thresholds::LayoutThresholds;

use crate::geom::{Point, Rect};
use crate::model::{
    Block, ImageBlock, Line, Page, Primitive, VectorElement, VectorKind, Warning,
};
use crate::style::StyleMapper;

use columns::{column_of, detect_columns, spans_columns};
use lines::{build_lines, StyledRun};
use paragraphs::build_paragraphs;
use tables::detect_tables;

/// A page after layout analysis: portrait-normalized geometry plus blocks
/// in reading order.
#[derive(Debug, Clone)]
pub struct AnalyzedPage {
    pub width: f32,
    pub height: f32,
    pub blocks: Vec<Block>,
}

/// Analyze one parsed page into reading-ordered blocks.
pub fn analyze_page(
    page: &Page,
    thresholds: &LayoutThresholds,
    mapper: &mut StyleMapper,
    warnings: &mut Vec<Warning>,
) -> AnalyzedPage {
    let (width, height, primitives) = normalize_rotation(page);

    let mut vectors: Vec<VectorElement> = Vec::new();
    let mut images: Vec<ImageBlock> = Vec::new();
    let mut text_runs = Vec::new();
    for primitive in primitives {
        match primitive {
            Primitive::Vector(v) => vectors.push(v),
            Primitive::Image(image) => images.push(ImageBlock {
                data: image.data,
                encoding: image.encoding,
                width_px: image.width_px,
                height_px: image.height_px,
                bbox: image.bbox,
            }),
            Primitive::Text(run) => text_runs.push(run),
        }
    }

    let styled: Vec<StyledRun> = text_runs
        .iter()
        .map(|run| StyledRun {
            text: run.text.clone(),
            style: mapper.style_for(run, &vectors, warnings),
            bbox: run.bbox,
            baseline: run.baseline,
            size: run.size,
        })
        .collect();

    // Columns are detected from run boxes before line assembly, so lines
    // never bridge a gutter.
    let run_boxes: Vec<Rect> = styled.iter().map(|r| r.bbox).collect();
    let mut column_rects = detect_columns(&run_boxes, width, thresholds);
    if column_rects.is_empty() {
        column_rects = vec![Rect::new(0.0, 0.0, width, height)];
    }
    let multi_column = column_rects.len() >= 2;

    // Last group holds runs spanning multiple columns.
    let spanning_group = column_rects.len();
    let mut run_groups: Vec<Vec<StyledRun>> = vec![Vec::new(); column_rects.len() + 1];
    for run in styled {
        if multi_column && spans_columns(&run.bbox, &column_rects) {
            run_groups[spanning_group].push(run);
        } else {
            run_groups[column_of(&run.bbox, &column_rects)].push(run);
        }
    }
    let mut all_lines: Vec<Line> = Vec::new();
    for group in run_groups {
        all_lines.extend(build_lines(group, thresholds));
    }

    let (detected_tables, consumed) = detect_tables(&vectors, &all_lines, thresholds);
    let flow_lines: Vec<Line> = all_lines
        .into_iter()
        .zip(&consumed)
        .filter(|(_, &used)| !used)
        .map(|(line, _)| line)
        .collect();

    let blocks = order_blocks(
        flow_lines,
        detected_tables.into_iter().map(Block::Table).collect(),
        images.into_iter().map(Block::Image).collect(),
        &column_rects,
        thresholds,
    );

    AnalyzedPage {
        width,
        height,
        blocks,
    }
}

/// Rotate page content into portrait orientation. Returns the normalized
/// page size and the transformed primitives.
fn normalize_rotation(page: &Page) -> (f32, f32, Vec<Primitive>) {
    let (w, h) = (page.width, page.height);
    let rotation = page.rotation.rem_euclid(360);
    if rotation == 0 {
        return (w, h, page.primitives.clone());
    }

    let map_point = |p: Point| -> Point {
        match rotation {
            90 => Point::new(p.y, w - p.x),
            180 => Point::new(w - p.x, h - p.y),
            270 => Point::new(h - p.y, p.x),
            _ => p,
        }
    };
    let map_rect = |r: &Rect| -> Rect {
        let a = map_point(Point::new(r.x0, r.y0));
        let b = map_point(Point::new(r.x1, r.y1));
        Rect::from_points(a, b)
    };
    let (out_w, out_h) = if rotation == 180 { (w, h) } else { (h, w) };

    let primitives = page
        .primitives
        .iter()
        .map(|primitive| match primitive {
            Primitive::Text(run) => {
                let mut run = run.clone();
                run.baseline = map_point(run.baseline);
                run.bbox = map_rect(&run.bbox);
                Primitive::Text(run)
            }
            Primitive::Vector(v) => {
                let mut v = v.clone();
                v.bbox = map_rect(&v.bbox);
                v.kind = match &v.kind {
                    VectorKind::Line { from, to } => VectorKind::Line {
                        from: map_point(*from),
                        to: map_point(*to),
                    },
                    VectorKind::Rect(r) => VectorKind::Rect(map_rect(r)),
                    VectorKind::Path => VectorKind::Path,
                };
                Primitive::Vector(v)
            }
            Primitive::Image(image) => {
                let mut image = image.clone();
                image.bbox = map_rect(&image.bbox);
                Primitive::Image(image)
            }
        })
        .collect();

    (out_w, out_h, primitives)
}

/// One element that interrupts the column flow.
enum SpanningItem {
    Lines(Vec<Line>),
    Block(Block),
}

impl SpanningItem {
    fn top(&self) -> f32 {
        match self {
            SpanningItem::Lines(lines) => lines
                .iter()
                .map(|l| l.bbox.y1)
                .fold(f32::NEG_INFINITY, f32::max),
            SpanningItem::Block(b) => b.bbox().y1,
        }
    }

    fn bottom(&self) -> f32 {
        match self {
            SpanningItem::Lines(lines) => {
                lines.iter().map(|l| l.bbox.y0).fold(f32::INFINITY, f32::min)
            }
            SpanningItem::Block(b) => b.bbox().y0,
        }
    }
}

/// Assemble the final reading order: bands cut by spanning items, columns
/// left to right inside each band, top to bottom inside each column.
fn order_blocks(
    flow_lines: Vec<Line>,
    tables: Vec<Block>,
    images: Vec<Block>,
    column_rects: &[Rect],
    thresholds: &LayoutThresholds,
) -> Vec<Block> {
    let multi_column = column_rects.len() >= 2;

    // Split lines and floating blocks into spanning vs column-bound.
    let mut spanning_raw: Vec<SpanningItem> = Vec::new();
    let mut column_lines: Vec<Vec<Line>> = vec![Vec::new(); column_rects.len()];
    let mut spanning_lines: Vec<Line> = Vec::new();
    for line in flow_lines {
        if multi_column && spans_columns(&line.bbox, column_rects) {
            spanning_lines.push(line);
        } else {
            column_lines[column_of(&line.bbox, column_rects)].push(line);
        }
    }

    let mut column_floats: Vec<Vec<Block>> = vec![Vec::new(); column_rects.len()];
    for block in tables.into_iter().chain(images) {
        if multi_column && spans_columns(&block.bbox(), column_rects) || !multi_column {
            spanning_raw.push(SpanningItem::Block(block));
        } else {
            column_floats[column_of(&block.bbox(), column_rects)].push(block);
        }
    }

    // Consecutive spanning lines form their own paragraph flow.
    spanning_lines.sort_by(|a, b| {
        b.baseline
            .partial_cmp(&a.baseline)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    if !spanning_lines.is_empty() {
        spanning_raw.push(SpanningItem::Lines(spanning_lines));
    }

    // Re-split line groups around interleaved blocks by sorting everything
    // by top edge and merging adjacent line groups.
    let mut spanning: Vec<SpanningItem> = Vec::new();
    spanning_raw.sort_by(|a, b| {
        b.top()
            .partial_cmp(&a.top())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for item in spanning_raw {
        spanning.push(item);
    }

    let full_width = column_rects
        .iter()
        .copied()
        .reduce(|a, b| a.union(&b))
        .unwrap_or_default();

    let mut out: Vec<Block> = Vec::new();
    let mut cursor = f32::INFINITY;
    for item in spanning {
        let cut = item.top();
        emit_band(
            &mut out,
            &mut column_lines,
            &mut column_floats,
            column_rects,
            cursor,
            cut,
            thresholds,
        );
        cursor = item.bottom().min(cut);
        match item {
            SpanningItem::Lines(lines) => {
                for paragraph in build_paragraphs(lines, &full_width, thresholds) {
                    out.push(Block::Paragraph(paragraph));
                }
            }
            SpanningItem::Block(block) => out.push(block),
        }
    }
    emit_band(
        &mut out,
        &mut column_lines,
        &mut column_floats,
        column_rects,
        cursor,
        f32::NEG_INFINITY,
        thresholds,
    );
    out
}

/// Emit the content of every column whose items fall inside the horizontal
/// band `(cut, top]`, left to right then top to bottom.
fn emit_band(
    out: &mut Vec<Block>,
    column_lines: &mut [Vec<Line>],
    column_floats: &mut [Vec<Block>],
    column_rects: &[Rect],
    top: f32,
    cut: f32,
    thresholds: &LayoutThresholds,
) {
    for (idx, rect) in column_rects.iter().enumerate() {
        let mut band_lines: Vec<Line> = Vec::new();
        column_lines[idx].retain(|line| {
            let cy = line.bbox.center_y();
            if cy > cut && cy <= top {
                band_lines.push(line.clone());
                false
            } else {
                true
            }
        });
        band_lines.sort_by(|a, b| {
            b.baseline
                .partial_cmp(&a.baseline)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut entries: Vec<(f32, Block)> = build_paragraphs(band_lines, rect, thresholds)
            .into_iter()
            .map(|p| (p.bbox.y1, Block::Paragraph(p)))
            .collect();
        let mut kept: Vec<Block> = Vec::new();
        for block in column_floats[idx].drain(..) {
            let cy = block.bbox().center_y();
            if cy > cut && cy <= top {
                entries.push((block.bbox().y1, block));
            } else {
                kept.push(block);
            }
        }
        column_floats[idx] = kept;

        entries.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        out.extend(entries.into_iter().map(|(_, block)| block));
    }
}
