//! End-to-end conversion scenarios over synthetic documents.

mod common;

use redocx::{convert_bytes, ConvertOptions, Error, WarningKind};

use common::{
    body_texts, corrupt_startxref, document_xml, show_text, single_page_pdf, PdfBuilder,
};

#[test]
fn test_plain_text_page_becomes_one_paragraph() {
    let pdf = single_page_pdf(show_text(72.0, 700.0, "Hello world").as_bytes(), "", |_| {});
    let result = convert_bytes(&pdf, &ConvertOptions::new()).unwrap();

    let texts = body_texts(&document_xml(&result.package));
    assert_eq!(texts, vec!["Hello world"]);
}

#[test]
fn test_paragraph_split_on_vertical_gap() {
    let mut content = String::new();
    content.push_str(&show_text(72.0, 700.0, "First paragraph line one"));
    content.push_str(&show_text(72.0, 686.0, "and line two."));
    // Far below: a separate paragraph.
    content.push_str(&show_text(72.0, 600.0, "Second paragraph."));
    let pdf = single_page_pdf(content.as_bytes(), "", |_| {});
    let result = convert_bytes(&pdf, &ConvertOptions::new()).unwrap();

    let texts = body_texts(&document_xml(&result.package));
    assert_eq!(texts.len(), 2);
    assert_eq!(texts[0], "First paragraph line one and line two.");
    assert_eq!(texts[1], "Second paragraph.");
}

#[test]
fn test_bordered_3x3_table_reconstruction() {
    let mut content = String::new();
    for y in [550, 600, 650, 700] {
        content.push_str(&format!("100 {} m 400 {} l S\n", y, y));
    }
    for x in [100, 200, 300, 400] {
        content.push_str(&format!("{} 550 m {} 700 l S\n", x, x));
    }
    for (row, baseline) in [(0, 670.0), (1, 620.0), (2, 570.0)] {
        for (col, x) in [(0, 110.0), (1, 210.0), (2, 310.0)] {
            content.push_str(&show_text(x, baseline, &format!("r{}c{}", row, col)));
        }
    }
    let pdf = single_page_pdf(content.as_bytes(), "", |_| {});
    let result = convert_bytes(&pdf, &ConvertOptions::new()).unwrap();

    let xml = document_xml(&result.package);
    assert_eq!(xml.matches("<w:tbl>").count(), 1);
    assert_eq!(xml.matches("<w:gridCol").count(), 3);
    assert_eq!(xml.matches("<w:tr>").count(), 3);

    // Cell text in row-major order.
    let texts = body_texts(&xml);
    let expected: Vec<String> = (0..3)
        .flat_map(|r| (0..3).map(move |c| format!("r{}c{}", r, c)))
        .collect();
    assert_eq!(texts, expected);
}

#[test]
fn test_embedded_jpeg_becomes_media_part() {
    let jpeg: Vec<u8> = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9];
    let content = b"q 200 0 0 100 72 500 cm /Im1 Do Q\n";
    let pdf = single_page_pdf(
        content,
        "<< /XObject << /Im1 5 0 R >> >>",
        |builder| {
            builder.stream(
                5,
                "/Type /XObject /Subtype /Image /Width 2 /Height 2 \
                 /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /DCTDecode",
                &jpeg,
            );
        },
    );
    let result = convert_bytes(&pdf, &ConvertOptions::new()).unwrap();

    let media = common::read_part_bytes(&result.package, "word/media/image1.jpeg");
    assert_eq!(media[..2], [0xFF, 0xD8]);

    let xml = document_xml(&result.package);
    assert!(xml.contains("r:embed=\"rId2\""));
    // 200pt display width in EMU.
    assert!(xml.contains("cx=\"2540000\""));

    let rels = common::read_part(&result.package, "word/_rels/document.xml.rels");
    assert!(rels.contains("Target=\"media/image1.jpeg\""));
}

#[test]
fn test_encrypted_without_password_fails() {
    let mut builder = PdfBuilder::new();
    builder.object(1, "<< /Type /Catalog /Pages 2 0 R >>");
    builder.object(
        2,
        "<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] >>",
    );
    builder.object(3, "<< /Type /Page /Parent 2 0 R >>");
    builder.object(
        5,
        "<< /Filter /Standard /V 5 /R 5 /O (owner) /U (user) /P -44 >>",
    );
    let pdf = builder.build("/Root 1 0 R /Encrypt 5 0 R /ID [(0123456789abcdef) (0123456789abcdef)]");

    let err = convert_bytes(&pdf, &ConvertOptions::new()).unwrap_err();
    assert!(matches!(err, Error::Encrypted));
}

#[test]
fn test_two_column_page_reads_left_first() {
    let mut content = String::new();
    // Interleaved stream order; reading order must still be column-major.
    for i in 0..6 {
        let y = 700.0 - i as f32 * 14.0;
        content.push_str(&show_text(322.0, y, &format!("Right column text R{}.", i)));
        content.push_str(&show_text(72.0, y, &format!("Left column text L{}.", i)));
    }
    let pdf = single_page_pdf(content.as_bytes(), "", |_| {});
    let result = convert_bytes(&pdf, &ConvertOptions::new()).unwrap();

    let joined = body_texts(&document_xml(&result.package)).join(" ");
    let last_left = joined.rfind("L5").expect("left text present");
    let first_right = joined.find("R0").expect("right text present");
    assert!(
        last_left < first_right,
        "left column must precede right column: {}",
        joined
    );
}

#[test]
fn test_corrupted_xref_recovers_with_warning() {
    let content = format!(
        "{}{}",
        show_text(72.0, 700.0, "Recovered content"),
        show_text(72.0, 640.0, "Second block")
    );
    let control = single_page_pdf(content.as_bytes(), "", |_| {});
    let mut damaged = control.clone();
    corrupt_startxref(&mut damaged);

    let good = convert_bytes(&control, &ConvertOptions::new()).unwrap();
    let recovered = convert_bytes(&damaged, &ConvertOptions::new()).unwrap();

    assert!(recovered
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::DegradedParse));
    // Same content, same order as the intact control copy.
    assert_eq!(
        body_texts(&document_xml(&recovered.package)),
        body_texts(&document_xml(&good.package))
    );
}

#[test]
fn test_garbage_input_is_corrupt() {
    let err = convert_bytes(b"\x00\x01\x02 nothing like a document", &ConvertOptions::new())
        .unwrap_err();
    assert!(matches!(err, Error::Corrupt(_)));

    let err = convert_bytes(b"", &ConvertOptions::new()).unwrap_err();
    assert!(matches!(err, Error::Corrupt(_)));
}

#[test]
fn test_conversion_is_deterministic() {
    let content = format!(
        "{}{}",
        show_text(72.0, 700.0, "Deterministic output"),
        show_text(72.0, 660.0, "across repeated runs")
    );
    let pdf = single_page_pdf(content.as_bytes(), "", |_| {});

    let first = convert_bytes(&pdf, &ConvertOptions::new()).unwrap();
    let second = convert_bytes(&pdf, &ConvertOptions::new()).unwrap();
    assert_eq!(first.package, second.package);

    // The package survives a write/read round trip untouched.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.docx");
    std::fs::write(&path, &first.package).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), first.package);
}

#[test]
fn test_metadata_carried_into_package() {
    let mut builder = PdfBuilder::new();
    builder.object(1, "<< /Type /Catalog /Pages 2 0 R >>");
    builder.object(
        2,
        "<< /Type /Pages /Kids [3 0 R] /Count 1 /MediaBox [0 0 612 792] >>",
    );
    builder.object(3, "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>");
    builder.stream(4, "", show_text(72.0, 700.0, "Body").as_bytes());
    builder.object(
        5,
        "<< /Title (Quarterly Report) /Author (J. Doe) /CreationDate (D:20240115103045) >>",
    );
    let pdf = builder.build("/Root 1 0 R /Info 5 0 R");

    let result = convert_bytes(&pdf, &ConvertOptions::new()).unwrap();
    assert_eq!(result.metadata.title.as_deref(), Some("Quarterly Report"));

    let core = common::read_part(&result.package, "docProps/core.xml");
    assert!(core.contains("<dc:title>Quarterly Report</dc:title>"));
    assert!(core.contains("<dc:creator>J. Doe</dc:creator>"));
    assert!(core.contains("2024-01-15T10:30:45Z"));
}
