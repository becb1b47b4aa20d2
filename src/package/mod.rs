//! Package serialization stage: the frozen document model out to a
//! WordprocessingML archive.

mod docx;
mod parts;

pub use docx::write_package;
