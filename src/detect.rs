//! PDF format detection.

use crate::error::{Error, Result};

/// How far into the buffer to look for the `%PDF-` header. Some producers
/// prepend junk bytes before the header; readers conventionally tolerate up
/// to 1 KiB of it.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Check whether a byte buffer looks like a PDF document.
pub fn is_pdf(data: &[u8]) -> bool {
    find_header(data).is_some()
}

/// Return the PDF version string (e.g. "1.7") from the header.
pub fn pdf_version(data: &[u8]) -> Option<String> {
    let start = find_header(data)?;
    let rest = &data[start + 5..];
    let end = rest
        .iter()
        .position(|b| !b.is_ascii_digit() && *b != b'.')
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    Some(String::from_utf8_lossy(&rest[..end]).to_string())
}

/// Verify the buffer is a PDF, returning its version.
///
/// Anything without a recognizable header is treated as corrupt: no fallback
/// scan can recover a document that never was one.
pub fn ensure_pdf(data: &[u8]) -> Result<String> {
    pdf_version(data).ok_or_else(|| Error::Corrupt("missing %PDF header".to_string()))
}

fn find_header(data: &[u8]) -> Option<usize> {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    window
        .windows(5)
        .position(|w| w == b"%PDF-")
        .filter(|pos| data.len() > pos + 7)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_valid_header() {
        assert!(is_pdf(b"%PDF-1.7\n%binary"));
        assert_eq!(pdf_version(b"%PDF-1.4\ncontent").as_deref(), Some("1.4"));
        assert_eq!(pdf_version(b"%PDF-2.0\ncontent").as_deref(), Some("2.0"));
    }

    #[test]
    fn test_detect_offset_header() {
        let mut data = vec![0u8; 64];
        data.extend_from_slice(b"%PDF-1.5\nrest of file");
        assert!(is_pdf(&data));
        assert_eq!(pdf_version(&data).as_deref(), Some("1.5"));
    }

    #[test]
    fn test_detect_rejects_garbage() {
        assert!(!is_pdf(b""));
        assert!(!is_pdf(b"%PDF"));
        assert!(!is_pdf(b"<!DOCTYPE html><html></html>"));
        assert!(matches!(ensure_pdf(b"not a pdf"), Err(Error::Corrupt(_))));
    }

    #[test]
    fn test_header_too_far_in() {
        let mut data = vec![b' '; 2048];
        data.extend_from_slice(b"%PDF-1.7\n");
        assert!(!is_pdf(&data));
    }
}
