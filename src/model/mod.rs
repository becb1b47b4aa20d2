//! Data model for reconstructed documents.
//!
//! The model is built once per conversion, frozen by the document builder,
//! consumed exactly once by the package serializer, and then dropped.

mod document;
mod page;
mod paragraph;
mod table;
mod warning;

pub(crate) use document::parse_pdf_date;
pub use document::{Block, Document, ImageBlock, Margins, Metadata, Section};
pub use page::{
    Color, FontRef, GraphicsState, ImageEncoding, ImageObject, Page, Primitive, TextRun,
    VectorElement, VectorKind,
};
pub use paragraph::{Alignment, Line, Paragraph, Run, StyleAttributes};
pub use table::{Cell, Table};
pub use warning::{Warning, WarningKind};
