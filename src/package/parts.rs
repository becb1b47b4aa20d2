//! Fixed and templated package parts.
//!
//! Everything here is deterministic: the same document yields byte-identical
//! parts, so no wall-clock values ever enter the output.

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::model::Metadata;

/// Root relationships part (`_rels/.rels`).
pub const RELS_ROOT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/></Relationships>"#;

/// Minimal style part: a default paragraph and character style so editors
/// have something to inherit from. All real formatting is inline.
pub const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Times New Roman" w:hAnsi="Times New Roman"/><w:sz w:val="24"/></w:rPr></w:rPrDefault><w:pPrDefault/></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="character" w:default="1" w:styleId="DefaultParagraphFont"><w:name w:val="Default Paragraph Font"/></w:style><w:style w:type="table" w:default="1" w:styleId="TableNormal"><w:name w:val="Normal Table"/><w:tblPr><w:tblCellMar><w:top w:w="0" w:type="dxa"/><w:left w:w="108" w:type="dxa"/><w:bottom w:w="0" w:type="dxa"/><w:right w:w="108" w:type="dxa"/></w:tblCellMar></w:tblPr></w:style></w:styles>"#;

/// Content types part, declaring defaults for the media extensions actually
/// present in the package.
pub fn content_types(media: &BTreeSet<(&'static str, &'static str)>) -> String {
    let mut out = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>"#,
    );
    for (extension, mime) in media {
        out.push_str(&format!(
            r#"<Default Extension="{}" ContentType="{}"/>"#,
            extension, mime
        ));
    }
    out.push_str(
        r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/></Types>"#,
    );
    out
}

/// Relationships of the main document part: the style part plus one entry
/// per media file, in document order.
pub fn document_rels(media_targets: &[String]) -> String {
    let mut out = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
    );
    for (index, target) in media_targets.iter().enumerate() {
        out.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="{}"/>"#,
            index + 2,
            target
        ));
    }
    out.push_str("</Relationships>");
    out
}

/// Relationship id of the media part at `index` (document order), matching
/// [`document_rels`].
pub fn image_rel_id(index: usize) -> String {
    format!("rId{}", index + 2)
}

/// Core properties, carried over from the source metadata. Dates come from
/// the source document only.
pub fn core_props(meta: &Metadata) -> String {
    let mut out = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
    );
    let mut tag = |name: &str, value: &Option<String>| {
        if let Some(value) = value {
            out.push_str(&format!(
                "<{name}>{}</{name}>",
                escape_xml(value),
                name = name
            ));
        }
    };
    tag("dc:title", &meta.title);
    tag("dc:creator", &meta.author);
    tag("dc:subject", &meta.subject);
    tag("cp:keywords", &meta.keywords);
    if let Some(created) = meta.created {
        out.push_str(&format!(
            r#"<dcterms:created xsi:type="dcterms:W3CDTF">{}</dcterms:created>"#,
            w3c_date(created)
        ));
    }
    if let Some(modified) = meta.modified {
        out.push_str(&format!(
            r#"<dcterms:modified xsi:type="dcterms:W3CDTF">{}</dcterms:modified>"#,
            w3c_date(modified)
        ));
    }
    out.push_str("</cp:coreProperties>");
    out
}

/// Extended properties: source application and page count.
pub fn app_props(meta: &Metadata) -> String {
    let application = meta
        .producer
        .as_deref()
        .or(meta.creator.as_deref())
        .unwrap_or("");
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>{}</Application><Pages>{}</Pages></Properties>"#,
        escape_xml(application),
        meta.page_count
    )
}

fn w3c_date(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Escape text for inclusion in an XML element or attribute.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
