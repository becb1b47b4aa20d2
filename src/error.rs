//! Error types for the redocx library.

use std::io;
use thiserror::Error;

/// Result type alias for redocx operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal error kinds. Non-fatal conditions are reported as
/// [`Warning`](crate::model::Warning)s attached to a successful conversion
/// instead.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while reading input bytes.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The object or content structure is unrecoverable, even after the
    /// fallback object scan.
    #[error("Corrupt document: {0}")]
    Corrupt(String),

    /// The document is encrypted and no usable credential was supplied.
    #[error("Document is encrypted")]
    Encrypted,

    /// A credential was supplied but failed verification.
    #[error("Invalid password")]
    InvalidPassword,

    /// A configured limit (page count, input size, image size) was exceeded.
    #[error("Resource limit exceeded: {0}")]
    ResourceExceeded(String),

    /// The conversion was cancelled by the caller.
    #[error("Conversion cancelled")]
    Cancelled,

    /// Failure while writing the output package.
    #[error("Package serialization error: {0}")]
    Package(String),
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Package(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Package(err.to_string())
    }
}
