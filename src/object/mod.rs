//! PDF object parsing stage.
//!
//! Turns raw PDF bytes into parsed [`Page`]s and document [`Metadata`].
//! Covers the cross-reference machinery, stream filters, the standard
//! security handler, and the content-stream interpreter. Parsing is lenient
//! where the format allows recovery: structural damage degrades into
//! warnings whenever a usable page can still be produced.

pub mod content;
pub mod encrypt;
pub mod filters;
pub mod lexer;
mod object;
pub mod store;
pub mod xref;

pub use object::{Dict, Object, ObjectId, Stream};

use log::debug;

use crate::detect::pdf_version;
use crate::error::{Error, Result};
use crate::geom::Matrix;
use crate::model::{parse_pdf_date, Metadata, Page, Warning};

use encrypt::Decryptor;
use store::{ObjectStore, PageNode};

/// Parsed document handle: the object arena plus the flattened page list.
pub struct ObjectParser {
    store: ObjectStore,
    pages: Vec<PageNode>,
    version: String,
    encrypted: bool,
}

impl ObjectParser {
    /// Load a document from raw bytes, decrypting if needed.
    ///
    /// `password` is only consulted when the file is encrypted; the empty
    /// user password is always tried first.
    pub fn load(
        data: &[u8],
        password: Option<&str>,
        warnings: &mut Vec<Warning>,
    ) -> Result<Self> {
        let version = pdf_version(data).unwrap_or_else(|| "1.4".to_string());
        let mut store = ObjectStore::load(data, warnings)?;

        let mut encrypted = false;
        if let Some(enc_obj) = store.trailer.get(b"Encrypt").cloned() {
            encrypted = true;
            let encrypt_dict = store
                .resolve_dict(Some(&enc_obj))
                .ok_or_else(|| Error::Corrupt("/Encrypt is not a dictionary".to_string()))?
                .clone();
            let file_id = store
                .trailer
                .get_array(b"ID")
                .and_then(|ids| ids.first())
                .and_then(Object::as_string)
                .map(|s| s.to_vec())
                .unwrap_or_default();
            let decryptor = Decryptor::new(&encrypt_dict, &file_id, password)?;
            debug!("document decryption key established");

            let encrypt_id = enc_obj.as_reference().map(|(num, _)| num);
            store.for_each_object_mut(|id, object| {
                // The encrypt dictionary and cross-reference streams are
                // stored in the clear.
                if Some(id.0) == encrypt_id {
                    return;
                }
                if let Some(stream) = object.as_stream() {
                    if stream.dict.get_name(b"Type") == Some(b"XRef".as_slice()) {
                        return;
                    }
                }
                decryptor.decrypt_object(id, object);
            });
        }

        store.expand_object_streams(warnings);
        let pages = store.pages()?;
        Ok(Self {
            store,
            pages,
            version,
            encrypted,
        })
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Parse one page (0-indexed) into positioned primitives.
    pub fn parse_page(&self, index: usize, warnings: &mut Vec<Warning>) -> Result<Page> {
        let node = self
            .pages
            .get(index)
            .ok_or_else(|| Error::Corrupt(format!("page index {} out of range", index)))?;

        let [x0, y0, x1, y1] = node.media_box;
        let width = (x1 - x0).abs().max(1.0);
        let height = (y1 - y0).abs().max(1.0);

        let content = match self.store.page_content(&node.dict) {
            Ok(bytes) => bytes,
            Err(err) => {
                warnings.push(
                    Warning::new(
                        crate::model::WarningKind::DegradedParse,
                        format!("content stream undecodable: {}", err),
                    )
                    .on_page(index as u32 + 1),
                );
                Vec::new()
            }
        };

        let before = warnings.len();
        let base = Matrix::translation(-x0.min(x1), -y0.min(y1));
        let primitives =
            content::interpret(&self.store, &node.resources, &content, base, warnings);
        for w in warnings.iter_mut().skip(before) {
            if w.page.is_none() {
                w.page = Some(index as u32 + 1);
            }
        }

        Ok(Page {
            number: index as u32 + 1,
            width,
            height,
            rotation: node.rotation,
            primitives,
        })
    }

    /// Document metadata from the information dictionary and the header.
    pub fn metadata(&self) -> Metadata {
        let mut meta = Metadata::with_version(self.version.clone());
        meta.page_count = self.page_count();
        meta.encrypted = self.encrypted;

        if let Some(info) = self.store.info() {
            let text = |key: &[u8]| info.get_string(key).map(decode_text_string);
            meta.title = text(b"Title").filter(|s| !s.is_empty());
            meta.author = text(b"Author").filter(|s| !s.is_empty());
            meta.subject = text(b"Subject").filter(|s| !s.is_empty());
            meta.keywords = text(b"Keywords").filter(|s| !s.is_empty());
            meta.creator = text(b"Creator").filter(|s| !s.is_empty());
            meta.producer = text(b"Producer").filter(|s| !s.is_empty());
            meta.created = text(b"CreationDate").and_then(|s| parse_pdf_date(&s));
            meta.modified = text(b"ModDate").and_then(|s| parse_pdf_date(&s));
        }
        meta
    }
}

/// Decode a PDF text string: UTF-16BE with BOM, then UTF-8, then CP1252-ish
/// byte mapping as the last resort.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| ((c[0] as u16) << 8) | c[1] as u16)
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_page_pdf() -> Vec<u8> {
        // No xref table; the store recovers through the object scan.
        b"%PDF-1.7\n\
1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] >>\nendobj\n\
3 0 obj\n<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>\nendobj\n\
4 0 obj\n<< /Length 42 >>\nstream\nBT /F1 12 Tf 72 700 Td (Hello world) Tj ET\nendstream\nendobj\n\
5 0 obj\n<< /Title (Test Doc) /Author (A. Writer) >>\nendobj\n\
trailer\n<< /Root 1 0 R /Info 5 0 R >>\n"
            .to_vec()
    }

    #[test]
    fn test_load_and_parse_page() {
        let mut warnings = Vec::new();
        let parser = ObjectParser::load(&one_page_pdf(), None, &mut warnings).unwrap();
        assert_eq!(parser.page_count(), 1);

        let page = parser.parse_page(0, &mut warnings).unwrap();
        assert_eq!(page.number, 1);
        assert_eq!(page.width, 612.0);
        assert_eq!(page.height, 792.0);
        assert_eq!(page.raw_text(), "Hello world");
    }

    #[test]
    fn test_metadata_from_info() {
        let mut warnings = Vec::new();
        let parser = ObjectParser::load(&one_page_pdf(), None, &mut warnings).unwrap();
        let meta = parser.metadata();
        assert_eq!(meta.title.as_deref(), Some("Test Doc"));
        assert_eq!(meta.author.as_deref(), Some("A. Writer"));
        assert_eq!(meta.pdf_version, "1.7");
        assert_eq!(meta.page_count, 1);
        assert!(!meta.encrypted);
    }

    #[test]
    fn test_page_index_out_of_range() {
        let mut warnings = Vec::new();
        let parser = ObjectParser::load(&one_page_pdf(), None, &mut warnings).unwrap();
        assert!(parser.parse_page(5, &mut warnings).is_err());
    }

    #[test]
    fn test_decode_text_string_variants() {
        assert_eq!(decode_text_string(b"plain"), "plain");
        // UTF-16BE with BOM
        assert_eq!(decode_text_string(&[0xFE, 0xFF, 0x00, 0x41]), "A");
        // Not valid UTF-8: falls back to byte mapping
        assert_eq!(decode_text_string(&[0xE9]), "\u{e9}");
    }

    #[test]
    fn test_media_box_origin_shift() {
        let pdf = b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [100 50 712 842] >>\nendobj\n\
3 0 obj\n<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>\nendobj\n\
4 0 obj\n<< /Length 39 >>\nstream\nBT /F1 12 Tf 172 750 Td (shifted) Tj ET\nendstream\nendobj\n\
trailer\n<< /Root 1 0 R >>\n";
        let mut warnings = Vec::new();
        let parser = ObjectParser::load(pdf, None, &mut warnings).unwrap();
        let page = parser.parse_page(0, &mut warnings).unwrap();
        assert_eq!(page.width, 612.0);
        let crate::model::Primitive::Text(run) = &page.primitives[0] else {
            panic!("expected text");
        };
        assert_eq!(run.baseline.x, 72.0);
        assert_eq!(run.baseline.y, 700.0);
    }
}
