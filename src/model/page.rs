//! Page-level types: decoded content primitives and their graphics state.

use serde::{Deserialize, Serialize};

use crate::geom::{Matrix, Point, Rect};

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };

    /// From normalized RGB components in `[0.0, 1.0]`.
    pub fn from_rgb(r: f32, g: f32, b: f32) -> Self {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self {
            r: q(r),
            g: q(g),
            b: q(b),
        }
    }

    /// From a DeviceGray level.
    pub fn from_gray(v: f32) -> Self {
        Self::from_rgb(v, v, v)
    }

    /// From DeviceCMYK components.
    pub fn from_cmyk(c: f32, m: f32, y: f32, k: f32) -> Self {
        Self::from_rgb(
            (1.0 - c) * (1.0 - k),
            (1.0 - m) * (1.0 - k),
            (1.0 - y) * (1.0 - k),
        )
    }

    /// Lowercase hex form, e.g. `"1a2b3c"`.
    pub fn to_hex(&self) -> String {
        format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// Reference to a font as seen in the content stream, resolved against the
/// page's font dictionary. The style mapper turns this into a portable
/// family; the name here is the raw `/BaseFont` value (subset prefix and
/// all), so resolution stays deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontRef {
    /// BaseFont name, e.g. `"ABCDEF+Helvetica-Bold"`.
    pub base_name: String,
    /// Font descriptor flags, when the descriptor was present.
    pub flags: Option<u32>,
}

impl FontRef {
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            flags: None,
        }
    }
}

/// Immutable graphics state snapshot attached to each primitive at parse
/// time. No interpreter state survives past parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphicsState {
    pub ctm: Matrix,
    pub fill_color: Color,
    pub stroke_color: Color,
    pub line_width: f32,
    /// Text rendering mode (0 = fill, 3 = invisible, ...).
    pub render_mode: u8,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            fill_color: Color::BLACK,
            stroke_color: Color::BLACK,
            line_width: 1.0,
            render_mode: 0,
        }
    }
}

/// A run of text emitted by a single show-text operation (or one string
/// segment of a `TJ` array).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRun {
    /// Decoded, NFC-normalized glyph sequence.
    pub text: String,
    pub font: FontRef,
    /// Effective font size in points, after the text and current
    /// transformation matrices.
    pub size: f32,
    /// Baseline start position in page space.
    pub baseline: Point,
    pub bbox: Rect,
    pub state: GraphicsState,
}

/// Geometric kind of a vector drawing element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VectorKind {
    /// A straight segment.
    Line { from: Point, to: Point },
    /// An axis-aligned rectangle from the `re` operator.
    Rect(Rect),
    /// Any other path; only the bounding box is retained.
    Path,
}

/// A painted vector element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorElement {
    pub kind: VectorKind,
    pub stroked: bool,
    pub filled: bool,
    pub bbox: Rect,
    pub state: GraphicsState,
}

impl VectorElement {
    /// Whether this element reads as a horizontal rule: wide, hairline-thin,
    /// and actually painted. Used for underline/strike mapping and for table
    /// grid detection.
    pub fn is_horizontal_rule(&self, max_thickness: f32) -> bool {
        (self.stroked || self.filled)
            && self.bbox.height() <= max_thickness
            && self.bbox.width() > self.bbox.height() * 4.0
    }

    /// Vertical counterpart of [`is_horizontal_rule`](Self::is_horizontal_rule).
    pub fn is_vertical_rule(&self, max_thickness: f32) -> bool {
        (self.stroked || self.filled)
            && self.bbox.width() <= max_thickness
            && self.bbox.height() > self.bbox.width() * 4.0
    }
}

/// Encoding of embedded image bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    /// DCTDecode stream: bytes are a complete JPEG file.
    Jpeg,
    /// JPXDecode stream: JPEG 2000 codestream.
    Jpeg2000,
    /// Decoded raw samples; width/height/bits describe the buffer.
    Raw,
}

impl ImageEncoding {
    /// File extension used for the media part in the output package.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageEncoding::Jpeg => "jpeg",
            ImageEncoding::Jpeg2000 => "jp2",
            ImageEncoding::Raw => "bin",
        }
    }

    /// MIME type declared in the package content types.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageEncoding::Jpeg => "image/jpeg",
            ImageEncoding::Jpeg2000 => "image/jp2",
            ImageEncoding::Raw => "application/octet-stream",
        }
    }
}

/// A raster image placed on a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageObject {
    #[serde(skip)]
    pub data: Vec<u8>,
    pub encoding: ImageEncoding,
    pub width_px: u32,
    pub height_px: u32,
    pub bbox: Rect,
}

/// A decoded content primitive, in original content-stream order. That order
/// doubles as z-order: later primitives paint on top.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Primitive {
    Text(TextRun),
    Vector(VectorElement),
    Image(ImageObject),
}

impl Primitive {
    pub fn bbox(&self) -> &Rect {
        match self {
            Primitive::Text(t) => &t.bbox,
            Primitive::Vector(v) => &v.bbox,
            Primitive::Image(i) => &i.bbox,
        }
    }
}

/// A parsed page: geometry plus its primitives in content-stream order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// 1-indexed page number.
    pub number: u32,
    pub width: f32,
    pub height: f32,
    /// Rotation in degrees (multiple of 90) from the page dictionary.
    pub rotation: i32,
    pub primitives: Vec<Primitive>,
}

impl Page {
    pub fn new(number: u32, width: f32, height: f32) -> Self {
        Self {
            number,
            width,
            height,
            rotation: 0,
            primitives: Vec::new(),
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Concatenated text of all text runs, in content-stream order.
    pub fn raw_text(&self) -> String {
        self.primitives
            .iter()
            .filter_map(|p| match p {
                Primitive::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_conversions() {
        assert_eq!(Color::from_gray(0.0), Color::BLACK);
        assert_eq!(Color::from_rgb(1.0, 0.0, 0.0).to_hex(), "ff0000");
        let c = Color::from_cmyk(0.0, 0.0, 0.0, 1.0);
        assert_eq!(c, Color::BLACK);
    }

    #[test]
    fn test_horizontal_rule_detection() {
        let rule = VectorElement {
            kind: VectorKind::Rect(Rect::new(72.0, 100.0, 300.0, 100.6)),
            stroked: false,
            filled: true,
            bbox: Rect::new(72.0, 100.0, 300.0, 100.6),
            state: GraphicsState::default(),
        };
        assert!(rule.is_horizontal_rule(1.5));
        assert!(!rule.is_vertical_rule(1.5));

        let box_outline = VectorElement {
            kind: VectorKind::Rect(Rect::new(0.0, 0.0, 50.0, 50.0)),
            stroked: true,
            filled: false,
            bbox: Rect::new(0.0, 0.0, 50.0, 50.0),
            state: GraphicsState::default(),
        };
        assert!(!box_outline.is_horizontal_rule(1.5));
    }

    #[test]
    fn test_page_raw_text() {
        let mut page = Page::new(1, 612.0, 792.0);
        for word in ["Hello", " ", "world"] {
            page.primitives.push(Primitive::Text(TextRun {
                text: word.to_string(),
                font: FontRef::new("Helvetica"),
                size: 12.0,
                baseline: Point::new(72.0, 700.0),
                bbox: Rect::new(72.0, 700.0, 120.0, 712.0),
                state: GraphicsState::default(),
            }));
        }
        assert_eq!(page.raw_text(), "Hello world");
    }
}
