//! Baseline clustering: text runs to lines.

use crate::geom::{Point, Rect};
use crate::model::{Line, Run, StyleAttributes};

use super::thresholds::LayoutThresholds;

/// Gap, as a multiple of font size, beyond which same-style runs stay
/// separate. Wide gaps carry layout meaning (table cells, leaders) that a
/// merged run would erase.
const SEGMENT_SPLIT_FACTOR: f32 = 1.5;

/// A text run with its style resolved, ready for line assembly.
#[derive(Debug, Clone)]
pub struct StyledRun {
    pub text: String,
    pub style: StyleAttributes,
    pub bbox: Rect,
    pub baseline: Point,
    pub size: f32,
}

/// Cluster runs into lines by baseline proximity, then order each line left
/// to right and insert spaces at word-sized gaps.
pub fn build_lines(mut runs: Vec<StyledRun>, thresholds: &LayoutThresholds) -> Vec<Line> {
    if runs.is_empty() {
        return Vec::new();
    }
    // Top of the page first, then left to right.
    runs.sort_by(|a, b| {
        b.baseline
            .y
            .partial_cmp(&a.baseline.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.baseline
                    .x
                    .partial_cmp(&b.baseline.x)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });

    let mut groups: Vec<Vec<StyledRun>> = Vec::new();
    for run in runs {
        let epsilon = thresholds.line_epsilon(run.size);
        match groups.last_mut() {
            Some(group) if (group_baseline(group) - run.baseline.y).abs() <= epsilon => {
                group.push(run);
            }
            _ => groups.push(vec![run]),
        }
    }

    groups
        .into_iter()
        .map(|group| assemble_line(group, thresholds))
        .filter(|line| !line.runs.is_empty())
        .collect()
}

fn group_baseline(group: &[StyledRun]) -> f32 {
    group.iter().map(|r| r.baseline.y).sum::<f32>() / group.len() as f32
}

fn assemble_line(mut group: Vec<StyledRun>, thresholds: &LayoutThresholds) -> Line {
    group.sort_by(|a, b| {
        a.bbox
            .x0
            .partial_cmp(&b.bbox.x0)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let baseline = group_baseline(&group);

    let mut out: Vec<Run> = Vec::new();
    for run in group {
        if run.text.is_empty() {
            continue;
        }
        let needs_space = match out.last() {
            Some(prev) => {
                let gap = run.bbox.x0 - prev.bbox.x1;
                gap > thresholds.word_gap(run.size)
                    && !prev.text.ends_with(' ')
                    && !run.text.starts_with(' ')
            }
            None => false,
        };

        let wide_gap = out
            .last()
            .map(|prev| run.bbox.x0 - prev.bbox.x1 > SEGMENT_SPLIT_FACTOR * run.size)
            .unwrap_or(false);
        match out.last_mut() {
            // Same style and close: extend the previous run.
            Some(prev) if prev.style == run.style && !wide_gap => {
                if needs_space {
                    prev.text.push(' ');
                }
                prev.text.push_str(&run.text);
                prev.bbox = prev.bbox.union(&run.bbox);
            }
            Some(prev) => {
                if needs_space {
                    prev.text.push(' ');
                }
                out.push(Run::new(run.text, run.style, run.bbox));
            }
            None => out.push(Run::new(run.text, run.style, run.bbox)),
        }
    }

    // Trailing whitespace-only runs carry no content.
    while out
        .last()
        .map(|r| r.text.trim().is_empty())
        .unwrap_or(false)
    {
        out.pop();
    }
    Line::new(out, baseline)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn styled(text: &str, x0: f32, y: f32) -> StyledRun {
        StyledRun {
            text: text.to_string(),
            style: StyleAttributes::default(),
            bbox: Rect::new(x0, y - 2.0, x0 + text.len() as f32 * 6.0, y + 10.0),
            baseline: Point::new(x0, y),
            size: 12.0,
        }
    }

    #[test]
    fn test_runs_on_same_baseline_merge() {
        let lines = build_lines(
            vec![styled("Hello", 72.0, 700.0), styled("world", 110.0, 700.5)],
            &LayoutThresholds::default(),
        );
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text(), "Hello world");
    }

    #[test]
    fn test_touching_runs_get_no_space() {
        // Second run starts exactly where the first ends.
        let lines = build_lines(
            vec![styled("Hel", 72.0, 700.0), styled("lo", 90.0, 700.0)],
            &LayoutThresholds::default(),
        );
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text(), "Hello");
        assert_eq!(lines[0].runs.len(), 1);
    }

    #[test]
    fn test_distinct_baselines_make_distinct_lines() {
        let lines = build_lines(
            vec![styled("first", 72.0, 700.0), styled("second", 72.0, 686.0)],
            &LayoutThresholds::default(),
        );
        assert_eq!(lines.len(), 2);
        // Top line first.
        assert_eq!(lines[0].text(), "first");
        assert_eq!(lines[1].text(), "second");
    }

    #[test]
    fn test_style_boundary_keeps_runs_apart() {
        let mut bold = styled("bold", 110.0, 700.0);
        bold.style.bold = true;
        let lines = build_lines(
            vec![styled("plain", 72.0, 700.0), bold],
            &LayoutThresholds::default(),
        );
        assert_eq!(lines[0].runs.len(), 2);
        assert_eq!(lines[0].text(), "plain bold");
    }

    #[test]
    fn test_out_of_order_input_sorted() {
        let lines = build_lines(
            vec![styled("right", 200.0, 700.0), styled("left", 72.0, 700.0)],
            &LayoutThresholds::default(),
        );
        assert_eq!(lines[0].text(), "left right");
    }
}
