//! # redocx
//!
//! Reconstruction of editable DOCX documents from PDF bytes.
//!
//! A conversion runs a fixed pipeline: the object parser turns raw bytes
//! into positioned page primitives, the layout analyzer reconstructs lines,
//! paragraphs, columns, and tables, the style mapper resolves portable
//! formatting, the document builder assembles sections, and the package
//! serializer emits a complete `.docx` archive. Everything operates on byte
//! buffers; the crate performs no file or network I/O of its own.
//!
//! ```no_run
//! use redocx::{convert_bytes, ConvertOptions};
//!
//! # fn main() -> redocx::Result<()> {
//! let pdf = std::fs::read("report.pdf").expect("read input");
//! let result = convert_bytes(&pdf, &ConvertOptions::new())?;
//! std::fs::write("report.docx", &result.package).expect("write output");
//! for warning in &result.warnings {
//!     eprintln!("{}", warning);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Unusual but recoverable input (damaged cross-reference tables, missing
//! page attributes, unmappable constructs) degrades into [`model::Warning`]s
//! on a successful result; only structurally unrecoverable, encrypted, or
//! over-limit documents fail the whole conversion.

pub mod builder;
pub mod convert;
pub mod detect;
pub mod error;
pub mod geom;
pub mod layout;
pub mod model;
pub mod object;
pub mod package;
pub mod style;

pub use convert::{
    convert_batch, convert_bytes, CancelToken, Conversion, Converter, ConvertOptions, Limits,
};
pub use detect::{is_pdf, pdf_version};
pub use error::{Error, Result};
pub use layout::LayoutThresholds;
pub use model::{Document, Metadata, Warning, WarningKind};
