//! Document-level types: blocks, sections, and metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ImageEncoding, Paragraph, Table};
use crate::geom::Rect;

/// A raster image placed into document flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageBlock {
    #[serde(skip)]
    pub data: Vec<u8>,
    pub encoding: ImageEncoding,
    pub width_px: u32,
    pub height_px: u32,
    /// Placement rectangle in source page space; the serializer derives the
    /// anchor position and display size from it.
    pub bbox: Rect,
}

/// The unit placed into document flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    Image(ImageBlock),
}

impl Block {
    pub fn bbox(&self) -> Rect {
        match self {
            Block::Paragraph(p) => p.bbox,
            Block::Table(t) => t.bbox,
            Block::Image(i) => i.bbox,
        }
    }

    pub fn plain_text(&self) -> String {
        match self {
            Block::Paragraph(p) => p.plain_text(),
            Block::Table(t) => t.plain_text(),
            Block::Image(_) => String::new(),
        }
    }
}

/// Page margins in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Default for Margins {
    fn default() -> Self {
        // One inch on every side.
        Self {
            top: 72.0,
            bottom: 72.0,
            left: 72.0,
            right: 72.0,
        }
    }
}

/// A section: one source page's geometry and its blocks in reading order.
/// Section boundaries are explicit page breaks in the output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// Page width in points (portrait-normalized).
    pub page_width: f32,
    /// Page height in points (portrait-normalized).
    pub page_height: f32,
    pub margins: Margins,
    pub blocks: Vec<Block>,
}

impl Section {
    pub fn new(page_width: f32, page_height: f32) -> Self {
        Self {
            page_width,
            page_height,
            margins: Margins::default(),
            blocks: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// The finished logical document: ordered sections, immutable once the
/// builder returns it, consumed exactly once by the serializer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub metadata: Metadata,
    pub sections: Vec<Section>,
}

impl Document {
    pub fn new() -> Self {
        Self {
            metadata: Metadata::default(),
            sections: Vec::new(),
        }
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn block_count(&self) -> usize {
        self.sections.iter().map(|s| s.blocks.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| s.is_empty())
    }

    /// Plain text of the whole document, blocks joined by newlines and
    /// sections by blank lines.
    pub fn plain_text(&self) -> String {
        self.sections
            .iter()
            .map(|s| {
                s.blocks
                    .iter()
                    .map(|b| b.plain_text())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// All blocks in document order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.sections.iter().flat_map(|s| s.blocks.iter())
    }

    /// JSON rendering of the document tree, for inspection and tooling.
    /// Image bytes are omitted.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Source document metadata, copied into the package document properties.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    /// PDF version from the header (e.g. "1.7").
    pub pdf_version: String,
    pub page_count: u32,
    pub encrypted: bool,
}

impl Metadata {
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            pdf_version: version.into(),
            ..Default::default()
        }
    }
}

/// Parse a PDF date string (`D:YYYYMMDDHHmmSSOHH'mm'`).
pub(crate) fn parse_pdf_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.strip_prefix("D:").unwrap_or(s);
    if s.len() < 4 {
        return None;
    }

    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month: u32 = s.get(4..6).and_then(|m| m.parse().ok()).unwrap_or(1);
    let day: u32 = s.get(6..8).and_then(|d| d.parse().ok()).unwrap_or(1);
    let hour: u32 = s.get(8..10).and_then(|h| h.parse().ok()).unwrap_or(0);
    let minute: u32 = s.get(10..12).and_then(|m| m.parse().ok()).unwrap_or(0);
    let second: u32 = s.get(12..14).and_then(|v| v.parse().ok()).unwrap_or(0);

    chrono::NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc))
}
