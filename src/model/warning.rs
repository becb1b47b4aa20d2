//! Non-fatal conversion warnings.

use serde::{Deserialize, Serialize};

/// Category of a non-fatal conversion problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// The cross-reference structure was corrupt; objects were recovered by
    /// a linear scan of the byte stream.
    DegradedParse,
    /// A construct could not be mapped and was omitted or degraded.
    UnsupportedFeature,
    /// A font could not be resolved and a default family was substituted.
    FontSubstituted,
    /// An embedded image was skipped (undecodable or over the size limit).
    ImageSkipped,
}

/// A non-fatal problem recorded during conversion.
///
/// Warnings are ordered in the sequence they were encountered and attached
/// to the successful result; they never abort a conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    /// Category of the problem.
    pub kind: WarningKind,
    /// 1-indexed page the problem occurred on, if page-scoped.
    pub page: Option<u32>,
    /// Human-readable description.
    pub note: String,
}

impl Warning {
    pub fn new(kind: WarningKind, note: impl Into<String>) -> Self {
        Self {
            kind,
            page: None,
            note: note.into(),
        }
    }

    /// Attach a 1-indexed page number.
    pub fn on_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.page {
            Some(page) => write!(f, "page {}: {}", page, self.note),
            None => write!(f, "{}", self.note),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_display() {
        let w = Warning::new(WarningKind::DegradedParse, "xref damaged").on_page(2);
        assert_eq!(w.to_string(), "page 2: xref damaged");
        let w = Warning::new(WarningKind::DegradedParse, "xref damaged");
        assert_eq!(w.to_string(), "xref damaged");
    }

    #[test]
    fn test_warning_builder() {
        let w = Warning::new(WarningKind::UnsupportedFeature, "inline image skipped").on_page(3);
        assert_eq!(w.kind, WarningKind::UnsupportedFeature);
        assert_eq!(w.page, Some(3));
        assert_eq!(w.note, "inline image skipped");
    }
}
