//! Synthetic PDF construction and package inspection helpers.

use std::io::{Cursor, Read};

/// Builds a structurally valid PDF with a correct cross-reference table.
pub struct PdfBuilder {
    objects: Vec<(u32, Vec<u8>)>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    pub fn object(&mut self, num: u32, body: &str) -> &mut Self {
        self.objects.push((num, body.as_bytes().to_vec()));
        self
    }

    /// Add a stream object; `/Length` is computed from `content`.
    pub fn stream(&mut self, num: u32, dict_entries: &str, content: &[u8]) -> &mut Self {
        let mut body =
            format!("<< {} /Length {} >>\nstream\n", dict_entries, content.len()).into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(b"\nendstream");
        self.objects.push((num, body));
        self
    }

    /// Assemble the file: header, numbered objects, xref table, trailer.
    pub fn build(&self, trailer_entries: &str) -> Vec<u8> {
        let mut out = b"%PDF-1.7\n".to_vec();
        let mut offsets: Vec<(u32, usize)> = Vec::new();
        for (num, body) in &self.objects {
            offsets.push((*num, out.len()));
            out.extend_from_slice(format!("{} 0 obj\n", num).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_at = out.len();
        let size = self.objects.iter().map(|(n, _)| *n).max().unwrap_or(0) + 1;
        out.extend_from_slice(format!("xref\n0 {}\n", size).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for num in 1..size {
            match offsets.iter().find(|(n, _)| *n == num) {
                Some((_, offset)) => {
                    out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes())
                }
                None => out.extend_from_slice(b"0000000000 65535 f \n"),
            }
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} {} >>\nstartxref\n{}\n%%EOF\n",
                size, trailer_entries, xref_at
            )
            .as_bytes(),
        );
        out
    }
}

/// A one-page document with the given content stream and optional page
/// resources. `extra` may add more objects (fonts, images) to the file.
pub fn single_page_pdf(
    content: &[u8],
    resources: &str,
    extra: impl FnOnce(&mut PdfBuilder),
) -> Vec<u8> {
    let mut builder = PdfBuilder::new();
    builder.object(1, "<< /Type /Catalog /Pages 2 0 R >>");
    builder.object(
        2,
        "<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] >>",
    );
    let page = if resources.is_empty() {
        "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>".to_string()
    } else {
        format!(
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R /Resources {} >>",
            resources
        )
    };
    builder.object(3, &page);
    builder.stream(4, "", content);
    extra(&mut builder);
    builder.build("/Root 1 0 R")
}

/// A content-stream line that shows `text` at `(x, y)` in 12pt.
pub fn show_text(x: f32, y: f32, text: &str) -> String {
    format!("BT /F1 12 Tf {} {} Td ({}) Tj ET\n", x, y, text)
}

/// Point the startxref offset past the end of the file, forcing the
/// fallback object scan.
pub fn corrupt_startxref(pdf: &mut Vec<u8>) {
    let text = String::from_utf8_lossy(pdf).into_owned();
    let at = text.rfind("startxref").expect("fixture has startxref");
    let rebuilt = format!("{}startxref\n99999999\n%%EOF\n", &text[..at]);
    *pdf = rebuilt.into_bytes();
}

/// Extract one named part of the output package as UTF-8 text.
pub fn read_part(package: &[u8], name: &str) -> String {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(package.to_vec())).expect("package is a zip archive");
    let mut file = archive.by_name(name).expect("part exists");
    let mut out = String::new();
    file.read_to_string(&mut out).expect("part is UTF-8");
    out
}

/// Extract one named part of the output package as raw bytes.
pub fn read_part_bytes(package: &[u8], name: &str) -> Vec<u8> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(package.to_vec())).expect("package is a zip archive");
    let mut file = archive.by_name(name).expect("part exists");
    let mut out = Vec::new();
    file.read_to_end(&mut out).expect("part is readable");
    out
}

pub fn document_xml(package: &[u8]) -> String {
    read_part(package, "word/document.xml")
}

/// All `<w:t>` text contents, in document order.
pub fn body_texts(xml: &str) -> Vec<String> {
    let pattern = regex::Regex::new(r"<w:t[^>]*>([^<]*)</w:t>").expect("pattern is valid");
    pattern
        .captures_iter(xml)
        .map(|c| c[1].to_string())
        .collect()
}
