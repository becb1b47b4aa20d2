//! Style mapping stage.
//!
//! Resolves each text run's graphics and font state into portable
//! [`StyleAttributes`]: family, weight, slant, size, color, and the
//! decorations (underline, strikethrough) that PDF draws as separate vector
//! rules rather than font properties.

pub mod fonts;

use std::collections::HashSet;

use crate::model::{StyleAttributes, TextRun, VectorElement, Warning, WarningKind};

pub use fonts::{FontRegistry, ResolvedFont};

/// Maximum rule thickness in points for decoration candidates.
const DECORATION_THICKNESS: f32 = 2.0;

/// Minimum horizontal overlap between a rule and a run, as a fraction of
/// the run width, for the rule to decorate the run.
const DECORATION_OVERLAP: f32 = 0.6;

/// Underline band below the baseline, as fractions of font size.
const UNDERLINE_BELOW: f32 = 0.3;

/// Strikethrough band above the baseline, as fractions of font size.
const STRIKE_MIN: f32 = 0.15;
const STRIKE_MAX: f32 = 0.55;

/// Maps raw run state onto portable style attributes.
pub struct StyleMapper {
    registry: &'static FontRegistry,
    /// Font names already reported as substituted, to keep warnings to one
    /// per face per document.
    warned_fonts: HashSet<String>,
}

impl StyleMapper {
    pub fn new() -> Self {
        Self {
            registry: FontRegistry::shared(),
            warned_fonts: HashSet::new(),
        }
    }

    /// Resolve the style of one run. `rules` are the page's painted vector
    /// elements, scanned for underline and strikethrough marks.
    pub fn style_for(
        &mut self,
        run: &TextRun,
        rules: &[VectorElement],
        warnings: &mut Vec<Warning>,
    ) -> StyleAttributes {
        let resolved = self.registry.resolve(&run.font.base_name, run.font.flags);
        if resolved.substituted && !run.font.base_name.is_empty() {
            let stripped = self
                .registry
                .strip_subset_prefix(&run.font.base_name)
                .to_string();
            if self.warned_fonts.insert(stripped.clone()) {
                warnings.push(Warning::new(
                    WarningKind::FontSubstituted,
                    format!("'{}' replaced with '{}'", stripped, resolved.family),
                ));
            }
        }

        // Outline-only text keeps the stroke color.
        let color = if run.state.render_mode == 1 {
            run.state.stroke_color
        } else {
            run.state.fill_color
        };

        StyleAttributes {
            bold: resolved.bold,
            italic: resolved.italic,
            underline: self.has_decoration(run, rules, DecorationBand::Underline),
            strikethrough: self.has_decoration(run, rules, DecorationBand::Strike),
            family: resolved.family,
            size: run.size,
            color,
        }
    }

    fn has_decoration(
        &self,
        run: &TextRun,
        rules: &[VectorElement],
        band: DecorationBand,
    ) -> bool {
        let run_width = run.bbox.width();
        if run_width <= 0.0 {
            return false;
        }
        let (lo, hi) = match band {
            DecorationBand::Underline => (
                run.baseline.y - UNDERLINE_BELOW * run.size,
                run.baseline.y + 0.05 * run.size,
            ),
            DecorationBand::Strike => (
                run.baseline.y + STRIKE_MIN * run.size,
                run.baseline.y + STRIKE_MAX * run.size,
            ),
        };
        rules.iter().any(|rule| {
            rule.is_horizontal_rule(DECORATION_THICKNESS)
                && rule.bbox.center_y() >= lo
                && rule.bbox.center_y() <= hi
                && rule.bbox.x_overlap(&run.bbox) >= run_width * DECORATION_OVERLAP
        })
    }
}

impl Default for StyleMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
enum DecorationBand {
    Underline,
    Strike,
}
