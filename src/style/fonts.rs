//! Portable font resolution.
//!
//! Maps raw `/BaseFont` names (subset prefixes, style suffixes, foundry
//! spellings) onto a small set of portable family names that any document
//! editor can render, plus the weight and slant encoded in the name.

use std::sync::OnceLock;

use regex::Regex;

/// Font descriptor flag bits (PDF 32000-1, table 123).
pub const FLAG_FIXED_PITCH: u32 = 1;
pub const FLAG_SERIF: u32 = 1 << 1;
pub const FLAG_ITALIC: u32 = 1 << 6;
pub const FLAG_FORCE_BOLD: u32 = 1 << 18;

/// Outcome of resolving a raw font name.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFont {
    pub family: String,
    pub bold: bool,
    pub italic: bool,
    /// True when the family was not recognized and a fallback was chosen.
    pub substituted: bool,
}

/// Shared, immutable font name resolver.
pub struct FontRegistry {
    subset_prefix: Regex,
    bold_hint: Regex,
    italic_hint: Regex,
}

/// Known base families and their portable equivalents. Matching is done on
/// the lowercased name with separators removed.
const FAMILIES: &[(&str, &str)] = &[
    ("helvetica", "Arial"),
    ("arial", "Arial"),
    ("liberationsans", "Arial"),
    ("nimbussans", "Arial"),
    ("timesnewroman", "Times New Roman"),
    ("times", "Times New Roman"),
    ("liberationserif", "Times New Roman"),
    ("nimbusroman", "Times New Roman"),
    ("couriernew", "Courier New"),
    ("courier", "Courier New"),
    ("liberationmono", "Courier New"),
    ("nimbusmono", "Courier New"),
    ("georgia", "Georgia"),
    ("verdana", "Verdana"),
    ("tahoma", "Tahoma"),
    ("trebuchet", "Trebuchet MS"),
    ("calibri", "Calibri"),
    ("cambria", "Cambria"),
    ("garamond", "Garamond"),
    ("bookantiqua", "Book Antiqua"),
    ("palatino", "Book Antiqua"),
    ("centuryschoolbook", "Century Schoolbook"),
    ("comicsans", "Comic Sans MS"),
    ("impact", "Impact"),
    ("symbol", "Symbol"),
    ("zapfdingbats", "Wingdings"),
    ("wingdings", "Wingdings"),
];

const SERIF_FALLBACK: &str = "Times New Roman";
const SANS_FALLBACK: &str = "Arial";
const MONO_FALLBACK: &str = "Courier New";

impl FontRegistry {
    fn new() -> Self {
        Self {
            subset_prefix: Regex::new(r"^[A-Z]{6}\+").expect("subset prefix pattern is valid"),
            bold_hint: Regex::new(r"(?i)\b(bold|black|heavy|semibold|demibold|demi)\b|bold")
                .expect("bold pattern is valid"),
            italic_hint: Regex::new(r"(?i)italic|oblique").expect("italic pattern is valid"),
        }
    }

    /// Process-wide shared instance.
    pub fn shared() -> &'static FontRegistry {
        static REGISTRY: OnceLock<FontRegistry> = OnceLock::new();
        REGISTRY.get_or_init(FontRegistry::new)
    }

    /// Strip a `ABCDEF+` subset prefix, if present.
    pub fn strip_subset_prefix<'a>(&self, name: &'a str) -> &'a str {
        match self.subset_prefix.find(name) {
            Some(m) => &name[m.end()..],
            None => name,
        }
    }

    /// Resolve a raw base font name plus optional descriptor flags.
    pub fn resolve(&self, base_name: &str, flags: Option<u32>) -> ResolvedFont {
        let name = self.strip_subset_prefix(base_name);
        let flat: String = name
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();

        let mut bold = self.bold_hint.is_match(name);
        let mut italic = self.italic_hint.is_match(name);
        if let Some(flags) = flags {
            bold |= flags & FLAG_FORCE_BOLD != 0;
            italic |= flags & FLAG_ITALIC != 0;
        }

        // Longest key match wins so "timesnewroman" beats "times".
        let family = FAMILIES
            .iter()
            .filter(|(key, _)| flat.contains(key))
            .max_by_key(|(key, _)| key.len())
            .map(|(_, family)| *family);

        match family {
            Some(family) => ResolvedFont {
                family: family.to_string(),
                bold,
                italic,
                substituted: false,
            },
            None => ResolvedFont {
                family: self.fallback_family(&flat, flags).to_string(),
                bold,
                italic,
                substituted: true,
            },
        }
    }

    fn fallback_family(&self, flat_name: &str, flags: Option<u32>) -> &'static str {
        let flags = flags.unwrap_or(0);
        if flags & FLAG_FIXED_PITCH != 0 || flat_name.contains("mono") {
            return MONO_FALLBACK;
        }
        if flags & FLAG_SERIF != 0
            || flat_name.contains("serif") && !flat_name.contains("sansserif")
            || flat_name.contains("roman")
        {
            return SERIF_FALLBACK;
        }
        SANS_FALLBACK
    }
}
