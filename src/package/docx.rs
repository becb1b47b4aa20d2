//! WordprocessingML package writer.
//!
//! Consumes the frozen [`Document`] and emits a complete `.docx` archive as
//! bytes. Output is deterministic: part order, relationship ids, media names,
//! and zip metadata never vary between runs on the same input.

use std::collections::BTreeSet;
use std::io::{Cursor, Write as _};

use log::debug;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Result;
use crate::model::{
    Alignment, Block, Cell, Document, ImageBlock, Margins, Paragraph, Section, Table,
};

use super::parts;

/// One point in twentieths of a point.
fn twips(pt: f32) -> i64 {
    (pt * 20.0).round() as i64
}

/// One point in English Metric Units.
fn emu(pt: f32) -> i64 {
    (pt * 12700.0).round() as i64
}

/// Font size in half-points, as `w:sz` wants it.
fn half_points(size: f32) -> i64 {
    (size * 2.0).round().max(2.0) as i64
}

/// Serialize the document into a complete `.docx` archive.
pub fn write_package(document: &Document) -> Result<Vec<u8>> {
    let media = collect_media(document);
    let document_xml = write_document_xml(document, &media)?;

    let mut media_types: BTreeSet<(&'static str, &'static str)> = BTreeSet::new();
    for entry in &media {
        let encoding = &entry.image.encoding;
        media_types.insert((encoding.extension(), encoding.mime_type()));
    }
    let media_targets: Vec<String> = media
        .iter()
        .map(|m| format!("media/{}", m.file_name))
        .collect();

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut put = |zip: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, data: &[u8]| -> Result<()> {
        zip.start_file(name, options)?;
        zip.write_all(data)?;
        Ok(())
    };

    let content_types = parts::content_types(&media_types);
    let document_rels = parts::document_rels(&media_targets);
    let core_props = parts::core_props(&document.metadata);
    let app_props = parts::app_props(&document.metadata);

    put(&mut zip, "[Content_Types].xml", content_types.as_bytes())?;
    put(&mut zip, "_rels/.rels", parts::RELS_ROOT.as_bytes())?;
    put(&mut zip, "word/document.xml", &document_xml)?;
    put(&mut zip, "word/styles.xml", parts::STYLES_XML.as_bytes())?;
    put(&mut zip, "word/_rels/document.xml.rels", document_rels.as_bytes())?;
    for entry in &media {
        let name = format!("word/media/{}", entry.file_name);
        put(&mut zip, &name, &entry.image.data)?;
    }
    put(&mut zip, "docProps/core.xml", core_props.as_bytes())?;
    put(&mut zip, "docProps/app.xml", app_props.as_bytes())?;

    let cursor = zip.finish()?;
    let bytes = cursor.into_inner();
    debug!("wrote package: {} bytes, {} media parts", bytes.len(), media.len());
    Ok(bytes)
}

/// A media part scheduled for the archive, keyed by document order.
struct MediaEntry<'a> {
    image: &'a ImageBlock,
    file_name: String,
    rel_id: String,
}

fn collect_media(document: &Document) -> Vec<MediaEntry<'_>> {
    let mut out = Vec::new();
    for block in document.blocks() {
        if let Block::Image(image) = block {
            let index = out.len();
            out.push(MediaEntry {
                image,
                file_name: format!("image{}.{}", index + 1, image.encoding.extension()),
                rel_id: parts::image_rel_id(index),
            });
        }
    }
    out
}

type Xml = Writer<Cursor<Vec<u8>>>;

fn write_document_xml(document: &Document, media: &[MediaEntry<'_>]) -> Result<Vec<u8>> {
    let mut w = Writer::new(Cursor::new(Vec::new()));
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

    let mut root = BytesStart::new("w:document");
    root.push_attribute((
        "xmlns:w",
        "http://schemas.openxmlformats.org/wordprocessingml/2006/main",
    ));
    root.push_attribute((
        "xmlns:r",
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships",
    ));
    root.push_attribute((
        "xmlns:wp",
        "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing",
    ));
    root.push_attribute(("xmlns:a", "http://schemas.openxmlformats.org/drawingml/2006/main"));
    root.push_attribute((
        "xmlns:pic",
        "http://schemas.openxmlformats.org/drawingml/2006/picture",
    ));
    w.write_event(Event::Start(root))?;
    w.write_event(Event::Start(BytesStart::new("w:body")))?;

    let mut image_index = 0usize;
    let last = document.sections.len().saturating_sub(1);
    for (i, section) in document.sections.iter().enumerate() {
        for block in &section.blocks {
            match block {
                Block::Paragraph(p) => write_paragraph(&mut w, p, None)?,
                Block::Table(t) => write_table(&mut w, t)?,
                Block::Image(_) => {
                    write_image(&mut w, &media[image_index])?;
                    image_index += 1;
                }
            }
        }
        if i == last {
            write_sect_pr(&mut w, section)?;
        } else {
            // A section break lives in the pPr of an otherwise empty
            // paragraph.
            w.write_event(Event::Start(BytesStart::new("w:p")))?;
            w.write_event(Event::Start(BytesStart::new("w:pPr")))?;
            write_sect_pr(&mut w, section)?;
            w.write_event(Event::End(BytesEnd::new("w:pPr")))?;
            w.write_event(Event::End(BytesEnd::new("w:p")))?;
        }
    }

    w.write_event(Event::End(BytesEnd::new("w:body")))?;
    w.write_event(Event::End(BytesEnd::new("w:document")))?;
    Ok(w.into_inner().into_inner())
}

fn empty_with_val(w: &mut Xml, name: &str, val: &str) -> Result<()> {
    let mut el = BytesStart::new(name);
    el.push_attribute(("w:val", val));
    w.write_event(Event::Empty(el))?;
    Ok(())
}

fn write_sect_pr(w: &mut Xml, section: &Section) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new("w:sectPr")))?;

    let mut size = BytesStart::new("w:pgSz");
    size.push_attribute(("w:w", twips(section.page_width).to_string().as_str()));
    size.push_attribute(("w:h", twips(section.page_height).to_string().as_str()));
    if section.page_width > section.page_height {
        size.push_attribute(("w:orient", "landscape"));
    }
    w.write_event(Event::Empty(size))?;

    let Margins {
        top,
        bottom,
        left,
        right,
    } = section.margins;
    let mut mar = BytesStart::new("w:pgMar");
    mar.push_attribute(("w:top", twips(top).to_string().as_str()));
    mar.push_attribute(("w:right", twips(right).to_string().as_str()));
    mar.push_attribute(("w:bottom", twips(bottom).to_string().as_str()));
    mar.push_attribute(("w:left", twips(left).to_string().as_str()));
    mar.push_attribute(("w:header", "720"));
    mar.push_attribute(("w:footer", "720"));
    mar.push_attribute(("w:gutter", "0"));
    w.write_event(Event::Empty(mar))?;

    w.write_event(Event::End(BytesEnd::new("w:sectPr")))?;
    Ok(())
}

/// Indents below this many points are treated as noise, not formatting.
const MIN_INDENT: f32 = 1.0;

fn write_paragraph(w: &mut Xml, paragraph: &Paragraph, cell_width: Option<f32>) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new("w:p")))?;

    let alignment = match paragraph.alignment {
        Alignment::Left => None,
        Alignment::Center => Some("center"),
        Alignment::Right => Some("right"),
        Alignment::Justify => Some("both"),
    };
    let indent = paragraph.indent >= MIN_INDENT && cell_width.is_none();
    let spacing = paragraph.line_spacing > 0.0;
    if alignment.is_some() || indent || spacing {
        w.write_event(Event::Start(BytesStart::new("w:pPr")))?;
        if spacing {
            let mut el = BytesStart::new("w:spacing");
            el.push_attribute(("w:line", twips(paragraph.line_spacing).to_string().as_str()));
            el.push_attribute(("w:lineRule", "exact"));
            w.write_event(Event::Empty(el))?;
        }
        if indent {
            let mut el = BytesStart::new("w:ind");
            el.push_attribute(("w:left", twips(paragraph.indent).to_string().as_str()));
            w.write_event(Event::Empty(el))?;
        }
        if let Some(alignment) = alignment {
            empty_with_val(w, "w:jc", alignment)?;
        }
        w.write_event(Event::End(BytesEnd::new("w:pPr")))?;
    }

    for run in paragraph.merged_runs() {
        w.write_event(Event::Start(BytesStart::new("w:r")))?;

        w.write_event(Event::Start(BytesStart::new("w:rPr")))?;
        let mut fonts = BytesStart::new("w:rFonts");
        fonts.push_attribute(("w:ascii", run.style.family.as_str()));
        fonts.push_attribute(("w:hAnsi", run.style.family.as_str()));
        w.write_event(Event::Empty(fonts))?;
        if run.style.bold {
            w.write_event(Event::Empty(BytesStart::new("w:b")))?;
        }
        if run.style.italic {
            w.write_event(Event::Empty(BytesStart::new("w:i")))?;
        }
        if run.style.strikethrough {
            w.write_event(Event::Empty(BytesStart::new("w:strike")))?;
        }
        if run.style.color != crate::model::Color::BLACK {
            empty_with_val(w, "w:color", &run.style.color.to_hex())?;
        }
        empty_with_val(w, "w:sz", &half_points(run.style.size).to_string())?;
        if run.style.underline {
            empty_with_val(w, "w:u", "single")?;
        }
        w.write_event(Event::End(BytesEnd::new("w:rPr")))?;

        let mut text = BytesStart::new("w:t");
        if run.text.starts_with(' ') || run.text.ends_with(' ') {
            text.push_attribute(("xml:space", "preserve"));
        }
        w.write_event(Event::Start(text))?;
        w.write_event(Event::Text(BytesText::new(&run.text)))?;
        w.write_event(Event::End(BytesEnd::new("w:t")))?;

        w.write_event(Event::End(BytesEnd::new("w:r")))?;
    }

    w.write_event(Event::End(BytesEnd::new("w:p")))?;
    Ok(())
}

fn write_table(w: &mut Xml, table: &Table) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new("w:tbl")))?;

    w.write_event(Event::Start(BytesStart::new("w:tblPr")))?;
    let total: f32 = table.column_widths.iter().sum();
    let mut width = BytesStart::new("w:tblW");
    width.push_attribute(("w:w", twips(total).to_string().as_str()));
    width.push_attribute(("w:type", "dxa"));
    w.write_event(Event::Empty(width))?;
    w.write_event(Event::Start(BytesStart::new("w:tblBorders")))?;
    for edge in ["w:top", "w:left", "w:bottom", "w:right", "w:insideH", "w:insideV"] {
        let mut el = BytesStart::new(edge);
        el.push_attribute(("w:val", "single"));
        el.push_attribute(("w:sz", "4"));
        el.push_attribute(("w:color", "auto"));
        w.write_event(Event::Empty(el))?;
    }
    w.write_event(Event::End(BytesEnd::new("w:tblBorders")))?;
    let mut layout = BytesStart::new("w:tblLayout");
    layout.push_attribute(("w:type", "fixed"));
    w.write_event(Event::Empty(layout))?;
    w.write_event(Event::End(BytesEnd::new("w:tblPr")))?;

    w.write_event(Event::Start(BytesStart::new("w:tblGrid")))?;
    for col_width in &table.column_widths {
        let mut el = BytesStart::new("w:gridCol");
        el.push_attribute(("w:w", twips(*col_width).to_string().as_str()));
        w.write_event(Event::Empty(el))?;
    }
    w.write_event(Event::End(BytesEnd::new("w:tblGrid")))?;

    for row in 0..table.rows {
        w.write_event(Event::Start(BytesStart::new("w:tr")))?;
        let mut col = 0;
        while col < table.cols {
            match table.cell_at(row, col) {
                Some(cell) => {
                    write_cell(w, table, cell, VMerge::from_span(cell.row_span))?;
                    col += cell.col_span;
                }
                None => match anchor_above(table, row, col) {
                    // A slot continued from a rowspan above gets a merge
                    // continuation cell.
                    Some(anchor) => {
                        write_cell(w, table, anchor, VMerge::Continue)?;
                        col += anchor.col_span;
                    }
                    None => col += 1,
                },
            }
        }
        w.write_event(Event::End(BytesEnd::new("w:tr")))?;
    }

    w.write_event(Event::End(BytesEnd::new("w:tbl")))?;
    Ok(())
}

/// Vertical merge role of an emitted cell.
enum VMerge {
    None,
    Restart,
    Continue,
}

impl VMerge {
    fn from_span(row_span: usize) -> Self {
        if row_span > 1 {
            VMerge::Restart
        } else {
            VMerge::None
        }
    }
}

/// The cell whose row span covers `(row, col)` from an earlier row.
fn anchor_above<'a>(table: &'a Table, row: usize, col: usize) -> Option<&'a Cell> {
    table
        .cells
        .iter()
        .find(|c| c.col == col && c.row < row && c.row + c.row_span > row)
}

fn write_cell(w: &mut Xml, table: &Table, cell: &Cell, merge: VMerge) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new("w:tc")))?;

    w.write_event(Event::Start(BytesStart::new("w:tcPr")))?;
    let width: f32 = table.column_widths[cell.col..cell.col + cell.col_span]
        .iter()
        .sum();
    let mut el = BytesStart::new("w:tcW");
    el.push_attribute(("w:w", twips(width).to_string().as_str()));
    el.push_attribute(("w:type", "dxa"));
    w.write_event(Event::Empty(el))?;
    if cell.col_span > 1 {
        empty_with_val(w, "w:gridSpan", &cell.col_span.to_string())?;
    }
    match merge {
        VMerge::None => {}
        VMerge::Restart => empty_with_val(w, "w:vMerge", "restart")?,
        VMerge::Continue => w.write_event(Event::Empty(BytesStart::new("w:vMerge")))?,
    }
    w.write_event(Event::End(BytesEnd::new("w:tcPr")))?;

    // A cell must contain at least one paragraph; continuation cells carry
    // only an empty one.
    let content = match merge {
        VMerge::Continue => &[][..],
        _ => cell.content.as_slice(),
    };
    if content.is_empty() {
        w.write_event(Event::Empty(BytesStart::new("w:p")))?;
    } else {
        for paragraph in content {
            write_paragraph(w, paragraph, Some(width))?;
        }
    }

    w.write_event(Event::End(BytesEnd::new("w:tc")))?;
    Ok(())
}

fn write_image(w: &mut Xml, entry: &MediaEntry<'_>) -> Result<()> {
    let display_w = emu(entry.image.bbox.width().max(1.0));
    let display_h = emu(entry.image.bbox.height().max(1.0));
    let id = entry.rel_id.trim_start_matches("rId").to_string();

    w.write_event(Event::Start(BytesStart::new("w:p")))?;
    w.write_event(Event::Start(BytesStart::new("w:r")))?;
    w.write_event(Event::Start(BytesStart::new("w:drawing")))?;

    let mut inline = BytesStart::new("wp:inline");
    for attr in ["distT", "distB", "distL", "distR"] {
        inline.push_attribute((attr, "0"));
    }
    w.write_event(Event::Start(inline))?;

    let mut extent = BytesStart::new("wp:extent");
    extent.push_attribute(("cx", display_w.to_string().as_str()));
    extent.push_attribute(("cy", display_h.to_string().as_str()));
    w.write_event(Event::Empty(extent))?;

    let mut doc_pr = BytesStart::new("wp:docPr");
    doc_pr.push_attribute(("id", id.as_str()));
    doc_pr.push_attribute(("name", entry.file_name.as_str()));
    w.write_event(Event::Empty(doc_pr))?;

    w.write_event(Event::Start(BytesStart::new("a:graphic")))?;
    let mut data = BytesStart::new("a:graphicData");
    data.push_attribute((
        "uri",
        "http://schemas.openxmlformats.org/drawingml/2006/picture",
    ));
    w.write_event(Event::Start(data))?;
    w.write_event(Event::Start(BytesStart::new("pic:pic")))?;

    w.write_event(Event::Start(BytesStart::new("pic:nvPicPr")))?;
    let mut cnv = BytesStart::new("pic:cNvPr");
    cnv.push_attribute(("id", id.as_str()));
    cnv.push_attribute(("name", entry.file_name.as_str()));
    w.write_event(Event::Empty(cnv))?;
    w.write_event(Event::Empty(BytesStart::new("pic:cNvPicPr")))?;
    w.write_event(Event::End(BytesEnd::new("pic:nvPicPr")))?;

    w.write_event(Event::Start(BytesStart::new("pic:blipFill")))?;
    let mut blip = BytesStart::new("a:blip");
    blip.push_attribute(("r:embed", entry.rel_id.as_str()));
    w.write_event(Event::Empty(blip))?;
    w.write_event(Event::Start(BytesStart::new("a:stretch")))?;
    w.write_event(Event::Empty(BytesStart::new("a:fillRect")))?;
    w.write_event(Event::End(BytesEnd::new("a:stretch")))?;
    w.write_event(Event::End(BytesEnd::new("pic:blipFill")))?;

    w.write_event(Event::Start(BytesStart::new("pic:spPr")))?;
    w.write_event(Event::Start(BytesStart::new("a:xfrm")))?;
    let mut off = BytesStart::new("a:off");
    off.push_attribute(("x", "0"));
    off.push_attribute(("y", "0"));
    w.write_event(Event::Empty(off))?;
    let mut ext = BytesStart::new("a:ext");
    ext.push_attribute(("cx", display_w.to_string().as_str()));
    ext.push_attribute(("cy", display_h.to_string().as_str()));
    w.write_event(Event::Empty(ext))?;
    w.write_event(Event::End(BytesEnd::new("a:xfrm")))?;
    let mut geom = BytesStart::new("a:prstGeom");
    geom.push_attribute(("prst", "rect"));
    w.write_event(Event::Start(geom))?;
    w.write_event(Event::Empty(BytesStart::new("a:avLst")))?;
    w.write_event(Event::End(BytesEnd::new("a:prstGeom")))?;
    w.write_event(Event::End(BytesEnd::new("pic:spPr")))?;

    w.write_event(Event::End(BytesEnd::new("pic:pic")))?;
    w.write_event(Event::End(BytesEnd::new("a:graphicData")))?;
    w.write_event(Event::End(BytesEnd::new("a:graphic")))?;
    w.write_event(Event::End(BytesEnd::new("wp:inline")))?;
    w.write_event(Event::End(BytesEnd::new("w:drawing")))?;
    w.write_event(Event::End(BytesEnd::new("w:r")))?;
    w.write_event(Event::End(BytesEnd::new("w:p")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Rect;
    use crate::model::{ImageEncoding, Line, Metadata, Run, StyleAttributes};
    use std::io::Read as _;

    fn doc_with_blocks(blocks: Vec<Block>) -> Document {
        let mut section = Section::new(612.0, 792.0);
        section.blocks = blocks;
        Document {
            metadata: Metadata::with_version("1.7"),
            sections: vec![section],
        }
    }

    fn read_part(package: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(package.to_vec())).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        out
    }

    fn styled_paragraph(text: &str, style: StyleAttributes) -> Paragraph {
        let run = Run::new(text, style, Rect::new(72.0, 700.0, 300.0, 712.0));
        Paragraph::new(vec![Line::new(vec![run], 700.0)])
    }

    #[test]
    fn test_package_has_required_parts() {
        let package = write_package(&doc_with_blocks(vec![Block::Paragraph(
            Paragraph::from_text("hello"),
        )]))
        .unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(package)).unwrap();
        for name in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/document.xml",
            "word/styles.xml",
            "word/_rels/document.xml.rels",
            "docProps/core.xml",
            "docProps/app.xml",
        ] {
            assert!(archive.by_name(name).is_ok(), "missing part {}", name);
        }
    }

    #[test]
    fn test_bold_run_formatting() {
        let style = StyleAttributes {
            bold: true,
            underline: true,
            size: 14.0,
            ..Default::default()
        };
        let package = write_package(&doc_with_blocks(vec![Block::Paragraph(styled_paragraph(
            "important", style,
        ))]))
        .unwrap();
        let xml = read_part(&package, "word/document.xml");
        assert!(xml.contains("<w:b/>"));
        assert!(xml.contains(r#"<w:u w:val="single"/>"#));
        assert!(xml.contains(r#"<w:sz w:val="28"/>"#));
        assert!(xml.contains("<w:t>important</w:t>"));
    }

    #[test]
    fn test_table_grid_and_span() {
        let mut table = Table::new(2, 2, vec![144.0, 144.0], Rect::default());
        table.add_cell(Cell::with_text(0, 0, "head").span(1, 2));
        table.add_cell(Cell::with_text(1, 0, "a"));
        table.add_cell(Cell::with_text(1, 1, "b"));
        let package = write_package(&doc_with_blocks(vec![Block::Table(table)])).unwrap();
        let xml = read_part(&package, "word/document.xml");
        // 144pt columns are 2880 twips.
        assert!(xml.contains(r#"<w:gridCol w:w="2880"/>"#));
        assert!(xml.contains(r#"<w:gridSpan w:val="2"/>"#));
    }

    #[test]
    fn test_row_span_continuation_cells() {
        let mut table = Table::new(2, 2, vec![100.0, 100.0], Rect::default());
        table.add_cell(Cell::with_text(0, 0, "tall").span(2, 1));
        table.add_cell(Cell::with_text(0, 1, "a"));
        table.add_cell(Cell::with_text(1, 1, "b"));
        let package = write_package(&doc_with_blocks(vec![Block::Table(table)])).unwrap();
        let xml = read_part(&package, "word/document.xml");
        assert!(xml.contains(r#"<w:vMerge w:val="restart"/>"#));
        assert!(xml.contains("<w:vMerge/>"));
    }

    #[test]
    fn test_image_part_and_relationship() {
        let image = ImageBlock {
            data: vec![0xff, 0xd8, 0xff, 0xe0],
            encoding: ImageEncoding::Jpeg,
            width_px: 100,
            height_px: 50,
            bbox: Rect::new(72.0, 500.0, 272.0, 600.0),
        };
        let package = write_package(&doc_with_blocks(vec![Block::Image(image)])).unwrap();

        let rels = read_part(&package, "word/_rels/document.xml.rels");
        assert!(rels.contains(r#"Target="media/image1.jpeg""#));

        let xml = read_part(&package, "word/document.xml");
        assert!(xml.contains(r#"r:embed="rId2""#));
        // 200pt wide is 2540000 EMU.
        assert!(xml.contains(r#"cx="2540000""#));

        let mut archive = zip::ZipArchive::new(Cursor::new(package)).unwrap();
        assert!(archive.by_name("word/media/image1.jpeg").is_ok());
    }

    #[test]
    fn test_section_breaks_between_pages() {
        let mut s1 = Section::new(612.0, 792.0);
        s1.blocks.push(Block::Paragraph(Paragraph::from_text("one")));
        let mut s2 = Section::new(792.0, 612.0);
        s2.blocks.push(Block::Paragraph(Paragraph::from_text("two")));
        let doc = Document {
            metadata: Metadata::default(),
            sections: vec![s1, s2],
        };
        let package = write_package(&doc).unwrap();
        let xml = read_part(&package, "word/document.xml");
        assert_eq!(xml.matches("<w:sectPr>").count(), 2);
        // Landscape second page.
        assert!(xml.contains(r#"w:orient="landscape""#));
        // The document ends with the body-level sectPr.
        assert!(xml.ends_with("</w:sectPr></w:body></w:document>"));
    }

    #[test]
    fn test_output_is_deterministic() {
        let doc = doc_with_blocks(vec![
            Block::Paragraph(Paragraph::from_text("alpha")),
            Block::Paragraph(Paragraph::from_text("beta")),
        ]);
        let a = write_package(&doc).unwrap();
        let b = write_package(&doc).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_alignment_written() {
        let mut paragraph = Paragraph::from_text("centered");
        paragraph.alignment = Alignment::Center;
        let package =
            write_package(&doc_with_blocks(vec![Block::Paragraph(paragraph)])).unwrap();
        let xml = read_part(&package, "word/document.xml");
        assert!(xml.contains(r#"<w:jc w:val="center"/>"#));
    }
}
