//! Table detection.
//!
//! Primary detector: ruled grids built from horizontal and vertical vector
//! rules, with merged-cell recovery from missing interior boundaries.
//! Fallback detector: borderless tables found from columns of text segments
//! aligned across consecutive lines, with a guard against bulleted lists
//! masquerading as two-column tables.

use std::sync::OnceLock;

use log::debug;
use regex::Regex;

use crate::geom::Rect;
use crate::model::{Cell, Line, Run, Table, VectorElement, VectorKind};

use super::paragraphs::build_paragraphs;
use super::thresholds::LayoutThresholds;

/// Gap inside a line, as a multiple of font size, that separates cell
/// segments in the borderless detector.
const SEGMENT_GAP_FACTOR: f32 = 1.5;

/// Minimum consecutive aligned lines for a borderless table.
const MIN_ALIGNED_LINES: usize = 3;

fn list_marker_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([\u{2022}\u{25E6}\u{2013}\u{2014}*\-]|\(?\d{1,3}[.)]|\(?[a-zA-Z][.)])$")
            .expect("list marker pattern is valid")
    })
}

/// Detect tables on a page. Returns the tables plus a mask marking which
/// input lines were absorbed into table cells.
pub fn detect_tables(
    vectors: &[VectorElement],
    lines: &[Line],
    thresholds: &LayoutThresholds,
) -> (Vec<Table>, Vec<bool>) {
    let mut consumed = vec![false; lines.len()];
    let mut tables = detect_grid_tables(vectors, lines, &mut consumed, thresholds);
    tables.extend(detect_aligned_tables(lines, &mut consumed, thresholds));
    tables.sort_by(|a, b| {
        b.bbox
            .y1
            .partial_cmp(&a.bbox.y1)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    (tables, consumed)
}

#[derive(Debug, Clone, Copy)]
struct HRule {
    y: f32,
    x0: f32,
    x1: f32,
}

#[derive(Debug, Clone, Copy)]
struct VRule {
    x: f32,
    y0: f32,
    y1: f32,
}

/// Explode painted vectors into axis-aligned rules.
fn collect_rules(
    vectors: &[VectorElement],
    thresholds: &LayoutThresholds,
) -> (Vec<HRule>, Vec<VRule>) {
    let tol = thresholds.rule_thickness;
    let mut h = Vec::new();
    let mut v = Vec::new();
    for element in vectors {
        if !element.stroked && !element.filled {
            continue;
        }
        match &element.kind {
            // A stroked box contributes its four edges.
            VectorKind::Rect(r) if element.stroked && r.width() > tol && r.height() > tol => {
                h.push(HRule {
                    y: r.y0,
                    x0: r.x0,
                    x1: r.x1,
                });
                h.push(HRule {
                    y: r.y1,
                    x0: r.x0,
                    x1: r.x1,
                });
                v.push(VRule {
                    x: r.x0,
                    y0: r.y0,
                    y1: r.y1,
                });
                v.push(VRule {
                    x: r.x1,
                    y0: r.y0,
                    y1: r.y1,
                });
            }
            _ if element.is_horizontal_rule(tol) => {
                h.push(HRule {
                    y: element.bbox.center_y(),
                    x0: element.bbox.x0,
                    x1: element.bbox.x1,
                });
            }
            _ if element.is_vertical_rule(tol) => {
                v.push(VRule {
                    x: element.bbox.center_x(),
                    y0: element.bbox.y0,
                    y1: element.bbox.y1,
                });
            }
            _ => {}
        }
    }
    (h, v)
}

/// Grid detection: cluster rule coordinates, build the cell lattice, and
/// recover row/column spans from missing interior boundaries.
fn detect_grid_tables(
    vectors: &[VectorElement],
    lines: &[Line],
    consumed: &mut [bool],
    thresholds: &LayoutThresholds,
) -> Vec<Table> {
    let (h_rules, v_rules) = collect_rules(vectors, thresholds);
    if h_rules.is_empty() || v_rules.is_empty() {
        return Vec::new();
    }

    // Partition rules into connected groups so separate tables on one page
    // stay separate.
    let rects: Vec<Rect> = h_rules
        .iter()
        .map(|r| Rect::new(r.x0, r.y, r.x1, r.y))
        .chain(v_rules.iter().map(|r| Rect::new(r.x, r.y0, r.x, r.y1)))
        .collect();
    let groups = connected_groups(&rects, thresholds.grid_tolerance * 2.0);

    let mut tables = Vec::new();
    for group in groups {
        let group_bbox = group
            .iter()
            .map(|&i| rects[i])
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default();
        let hs: Vec<HRule> = h_rules
            .iter()
            .filter(|r| group_bbox.contains_point(r.x0.max(group_bbox.x0), r.y))
            .copied()
            .collect();
        let vs: Vec<VRule> = v_rules
            .iter()
            .filter(|r| group_bbox.contains_point(r.x, r.y0.max(group_bbox.y0)))
            .copied()
            .collect();
        if let Some(table) = build_grid_table(&hs, &vs, lines, consumed, thresholds) {
            tables.push(table);
        }
    }
    tables
}

fn build_grid_table(
    h_rules: &[HRule],
    v_rules: &[VRule],
    lines: &[Line],
    consumed: &mut [bool],
    thresholds: &LayoutThresholds,
) -> Option<Table> {
    let tol = thresholds.grid_tolerance;
    let mut ys = cluster(h_rules.iter().map(|r| r.y), tol);
    let mut xs = cluster(v_rules.iter().map(|r| r.x), tol);
    // Rows run top to bottom.
    ys.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rows = ys.len().checked_sub(1)?;
    let cols = xs.len().checked_sub(1)?;
    if rows < thresholds.min_table_rows || cols < thresholds.min_table_cols {
        debug!("rule group too small for a table ({}x{})", rows, cols);
        return None;
    }

    let bbox = Rect::new(xs[0], *ys.last()?, *xs.last()?, ys[0]);
    let column_widths: Vec<f32> = xs.windows(2).map(|w| w[1] - w[0]).collect();

    let has_v = |x: f32, y_top: f32, y_bottom: f32| {
        v_rules.iter().any(|r| {
            (r.x - x).abs() <= tol
                && r.y1 >= y_top - tol
                && r.y0 <= y_bottom + tol
                && (r.y1.min(y_top) - r.y0.max(y_bottom)) >= (y_top - y_bottom) * 0.5
        })
    };
    let has_h = |y: f32, x_left: f32, x_right: f32| {
        h_rules.iter().any(|r| {
            (r.y - y).abs() <= tol
                && r.x0 <= x_left + tol
                && r.x1 >= x_right - tol
        })
    };

    // Greedy span recovery: grow each anchor right while the separating
    // vertical boundary is missing, then down while the horizontal one is.
    let mut table = Table::new(rows, cols, column_widths, bbox);
    let mut covered = vec![false; rows * cols];
    for r in 0..rows {
        for c in 0..cols {
            if covered[r * cols + c] {
                continue;
            }
            let mut col_span = 1usize;
            while c + col_span < cols
                && !covered[r * cols + c + col_span]
                && !has_v(xs[c + col_span], ys[r], ys[r + 1])
            {
                col_span += 1;
            }
            let mut row_span = 1usize;
            'rows: while r + row_span < rows {
                for cc in c..c + col_span {
                    if covered[(r + row_span) * cols + cc]
                        || has_h(ys[r + row_span], xs[c], xs[c + col_span])
                    {
                        break 'rows;
                    }
                }
                row_span += 1;
            }
            for rr in r..r + row_span {
                for cc in c..c + col_span {
                    covered[rr * cols + cc] = true;
                }
            }
            let cell_bbox = Rect::new(xs[c], ys[r + row_span], xs[c + col_span], ys[r]);
            table.add_cell(Cell::new(r, c, cell_bbox).span(row_span, col_span));
        }
    }

    fill_cells_from_lines(&mut table, lines, consumed, thresholds);
    Some(table)
}

/// Route lines whose center falls inside a cell into that cell's content.
fn fill_cells_from_lines(
    table: &mut Table,
    lines: &[Line],
    consumed: &mut [bool],
    thresholds: &LayoutThresholds,
) {
    for cell in &mut table.cells {
        let mut cell_lines: Vec<Line> = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            if consumed[i] {
                continue;
            }
            if cell
                .bbox
                .contains_point(line.bbox.center_x(), line.bbox.center_y())
            {
                consumed[i] = true;
                cell_lines.push(line.clone());
            }
        }
        cell_lines.sort_by(|a, b| {
            b.baseline
                .partial_cmp(&a.baseline)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        cell.content = build_paragraphs(cell_lines, &cell.bbox, thresholds);
    }
}

/// Cluster scalar coordinates within `tol`, returning cluster means.
fn cluster(values: impl Iterator<Item = f32>, tol: f32) -> Vec<f32> {
    let mut sorted: Vec<f32> = values.collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mut out: Vec<(f32, usize)> = Vec::new();
    for v in sorted {
        match out.last_mut() {
            Some((mean, count)) if (v - *mean).abs() <= tol => {
                *mean = (*mean * *count as f32 + v) / (*count as f32 + 1.0);
                *count += 1;
            }
            _ => out.push((v, 1)),
        }
    }
    out.into_iter().map(|(mean, _)| mean).collect()
}

/// Group rectangle indices into connected components, where rectangles
/// expanded by `slack` that intersect belong together.
fn connected_groups(rects: &[Rect], slack: f32) -> Vec<Vec<usize>> {
    let expanded: Vec<Rect> = rects
        .iter()
        .map(|r| Rect::new(r.x0 - slack, r.y0 - slack, r.x1 + slack, r.y1 + slack))
        .collect();
    let mut component: Vec<usize> = (0..rects.len()).collect();

    fn root(component: &mut Vec<usize>, mut i: usize) -> usize {
        while component[i] != i {
            component[i] = component[component[i]];
            i = component[i];
        }
        i
    }

    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            if expanded[i].intersects(&expanded[j]) {
                let (a, b) = (root(&mut component, i), root(&mut component, j));
                if a != b {
                    component[a] = b;
                }
            }
        }
    }

    let mut groups: std::collections::BTreeMap<usize, Vec<usize>> = Default::default();
    for i in 0..rects.len() {
        let r = root(&mut component, i);
        groups.entry(r).or_default().push(i);
    }
    groups.into_values().collect()
}

/// Borderless tables: consecutive lines whose internal segments align into
/// the same column start positions.
fn detect_aligned_tables(
    lines: &[Line],
    consumed: &mut [bool],
    thresholds: &LayoutThresholds,
) -> Vec<Table> {
    // Work over unconsumed lines in top-down order.
    let mut order: Vec<usize> = (0..lines.len()).filter(|&i| !consumed[i]).collect();
    order.sort_by(|&a, &b| {
        lines[b]
            .baseline
            .partial_cmp(&lines[a].baseline)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let segments: Vec<Vec<Segment>> = order
        .iter()
        .map(|&i| split_segments(&lines[i]))
        .collect();

    let mut tables = Vec::new();
    let mut i = 0usize;
    while i < order.len() {
        if segments[i].len() < 2 {
            i += 1;
            continue;
        }
        let starts: Vec<f32> = segments[i].iter().map(|s| s.bbox.x0).collect();
        let mut end = i + 1;
        while end < order.len()
            && segments[end].len() == starts.len()
            && aligned(&segments[end], &starts, thresholds.grid_tolerance * 2.0)
        {
            end += 1;
        }
        let span = end - i;
        if span >= MIN_ALIGNED_LINES && !looks_like_list(&segments[i..end]) {
            let table = build_aligned_table(&order[i..end], &segments[i..end], lines, thresholds);
            for &line_idx in &order[i..end] {
                consumed[line_idx] = true;
            }
            tables.push(table);
            i = end;
        } else {
            i += 1;
        }
    }
    tables
}

#[derive(Debug, Clone)]
struct Segment {
    runs: Vec<Run>,
    bbox: Rect,
}

/// Split a line into cell segments at wide internal gaps.
fn split_segments(line: &Line) -> Vec<Segment> {
    let gap_threshold = SEGMENT_GAP_FACTOR * line.font_size();
    let mut out: Vec<Segment> = Vec::new();
    for run in &line.runs {
        // Runs may themselves contain wide gaps only when text was merged;
        // segmentation happens at run boundaries.
        match out.last_mut() {
            Some(seg) if run.bbox.x0 - seg.bbox.x1 < gap_threshold => {
                seg.bbox = seg.bbox.union(&run.bbox);
                seg.runs.push(run.clone());
            }
            _ => out.push(Segment {
                runs: vec![run.clone()],
                bbox: run.bbox,
            }),
        }
    }
    out
}

fn aligned(segments: &[Segment], starts: &[f32], tol: f32) -> bool {
    segments
        .iter()
        .zip(starts)
        .all(|(seg, &x)| (seg.bbox.x0 - x).abs() <= tol)
}

/// Two-segment groups whose first segment is a bullet or item number are
/// lists, not tables.
fn looks_like_list(rows: &[Vec<Segment>]) -> bool {
    rows.iter().all(|row| row.len() == 2)
        && rows.iter().any(|row| {
            let marker: String = row[0]
                .runs
                .iter()
                .map(|r| r.text.trim())
                .collect::<Vec<_>>()
                .join("");
            list_marker_pattern().is_match(marker.trim())
        })
}

fn build_aligned_table(
    order: &[usize],
    rows: &[Vec<Segment>],
    lines: &[Line],
    thresholds: &LayoutThresholds,
) -> Table {
    let cols = rows[0].len();
    let bbox = rows
        .iter()
        .flat_map(|r| r.iter().map(|s| s.bbox))
        .reduce(|a, b| a.union(&b))
        .unwrap_or_default();

    // Column edges from the segment extents across all rows.
    let mut column_widths = Vec::with_capacity(cols);
    for c in 0..cols {
        let left = rows
            .iter()
            .map(|r| r[c].bbox.x0)
            .fold(f32::INFINITY, f32::min);
        let right = if c + 1 < cols {
            rows.iter()
                .map(|r| r[c + 1].bbox.x0)
                .fold(f32::INFINITY, f32::min)
        } else {
            bbox.x1
        };
        column_widths.push((right - left).max(1.0));
    }

    let mut table = Table::new(rows.len(), cols, column_widths, bbox);
    for (r, (row, &line_idx)) in rows.iter().zip(order).enumerate() {
        let baseline = lines[line_idx].baseline;
        for (c, segment) in row.iter().enumerate() {
            let cell_line = Line::new(segment.runs.clone(), baseline);
            let mut cell = Cell::new(r, c, segment.bbox);
            cell.content = build_paragraphs(vec![cell_line], &segment.bbox, thresholds);
            table.add_cell(cell);
        }
    }
    table
}
