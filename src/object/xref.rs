//! Cross-reference loading.
//!
//! Handles classic `xref` tables, cross-reference streams, `/Prev` chains,
//! and hybrid files carrying both. When none of that is usable the caller
//! falls back to [`fallback_scan`], which rebuilds the table by walking the
//! file for indirect object headers.

use std::collections::HashMap;

use log::debug;

use crate::error::{Error, Result};

use super::filters::decode_stream_data;
use super::lexer::{is_delimiter, is_whitespace, Lexer};
use super::object::{Dict, Object};

/// Where an object body lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// Byte offset of `N G obj` in the file.
    Offset(u64),
    /// Compressed inside an object stream.
    InStream { stream_id: u32, index: u32 },
    Free,
}

/// Merged cross-reference table plus the merged trailer dictionary.
#[derive(Debug, Default)]
pub struct XrefTable {
    pub entries: HashMap<u32, XrefEntry>,
    pub trailer: Dict,
}

impl XrefTable {
    pub fn get(&self, id: u32) -> Option<XrefEntry> {
        self.entries.get(&id).copied()
    }

    /// Newer sections are merged first, so existing keys always win.
    fn absorb_entry(&mut self, id: u32, entry: XrefEntry) {
        self.entries.entry(id).or_insert(entry);
    }

    fn absorb_trailer(&mut self, dict: &Dict) {
        for (key, value) in dict.iter() {
            if !self.trailer.contains_key(key) {
                self.trailer.insert(key.clone(), value.clone());
            }
        }
    }
}

const STARTXREF_SEARCH_WINDOW: usize = 2048;
const MAX_PREV_SECTIONS: usize = 64;

/// Load the cross-reference table by following `startxref` and the
/// `/Prev` chain.
pub fn load_xref(data: &[u8]) -> Result<XrefTable> {
    let start = find_startxref(data)?;
    let mut table = XrefTable::default();
    let mut next = Some(start);
    let mut sections = 0usize;

    while let Some(offset) = next {
        sections += 1;
        if sections > MAX_PREV_SECTIONS {
            return Err(Error::Corrupt("xref /Prev chain too long".to_string()));
        }
        let section_trailer = load_section(data, offset, &mut table)?;
        // Hybrid files: classic trailer points at a parallel xref stream.
        if let Some(xref_stm) = section_trailer.get_int(b"XRefStm") {
            if xref_stm >= 0 && (xref_stm as usize) < data.len() {
                load_section(data, xref_stm as u64, &mut table)?;
            }
        }
        table.absorb_trailer(&section_trailer);
        next = section_trailer
            .get_int(b"Prev")
            .filter(|&p| p >= 0 && (p as usize) < data.len())
            .map(|p| p as u64);
    }
    debug!("xref loaded: {} entries", table.entries.len());
    Ok(table)
}

/// Locate the offset given by the trailing `startxref` keyword.
fn find_startxref(data: &[u8]) -> Result<u64> {
    let tail_start = data.len().saturating_sub(STARTXREF_SEARCH_WINDOW);
    let tail = &data[tail_start..];
    let needle = b"startxref";
    let found = tail
        .windows(needle.len())
        .rposition(|w| w == needle)
        .ok_or_else(|| Error::Corrupt("startxref keyword not found".to_string()))?;

    let mut lexer = Lexer::at(data, tail_start + found + needle.len());
    match lexer.parse_number()? {
        Object::Integer(offset) if offset >= 0 && (offset as usize) < data.len() => {
            Ok(offset as u64)
        }
        _ => Err(Error::Corrupt("bad startxref offset".to_string())),
    }
}

/// Parse one xref section (classic table or xref stream) at `offset`,
/// merging entries into `table` and returning the section's trailer.
fn load_section(data: &[u8], offset: u64, table: &mut XrefTable) -> Result<Dict> {
    let mut lexer = Lexer::at(data, offset as usize);
    lexer.skip_whitespace();
    if data[lexer.pos..].starts_with(b"xref") {
        lexer.pos += 4;
        parse_classic_section(&mut lexer, table)
    } else {
        parse_stream_section(data, offset as usize, table)
    }
}

fn parse_classic_section(lexer: &mut Lexer<'_>, table: &mut XrefTable) -> Result<Dict> {
    loop {
        lexer.skip_whitespace();
        if lexer.remaining() == 0 {
            return Err(Error::Corrupt("xref table without trailer".to_string()));
        }
        // A subsection starts with an integer; anything else is "trailer".
        if !lexer.peek().map(|b| b.is_ascii_digit()).unwrap_or(false) {
            lexer.expect_keyword(b"trailer")?;
            let dict = match lexer.parse_object()? {
                Object::Dictionary(d) => d,
                _ => return Err(Error::Corrupt("trailer is not a dictionary".to_string())),
            };
            return Ok(dict);
        }

        let start = match lexer.parse_number()? {
            Object::Integer(n) if n >= 0 => n as u32,
            _ => return Err(Error::Corrupt("bad xref subsection start".to_string())),
        };
        let count = match lexer.parse_number()? {
            Object::Integer(n) if n >= 0 => n as u32,
            _ => return Err(Error::Corrupt("bad xref subsection count".to_string())),
        };

        for i in 0..count {
            let field1 = match lexer.parse_number()? {
                Object::Integer(n) if n >= 0 => n as u64,
                _ => return Err(Error::Corrupt("bad xref entry offset".to_string())),
            };
            // Generation field, unused beyond syntax.
            let _gen = lexer.parse_number()?;
            lexer.skip_whitespace();
            let kind = lexer.read_token();
            let entry = match kind {
                b"n" => XrefEntry::Offset(field1),
                b"f" => XrefEntry::Free,
                _ => return Err(Error::Corrupt("bad xref entry type".to_string())),
            };
            table.absorb_entry(start + i, entry);
        }
    }
}

fn parse_stream_section(data: &[u8], offset: usize, table: &mut XrefTable) -> Result<Dict> {
    let mut lexer = Lexer::at(data, offset);
    let (_, object) = lexer.parse_indirect_object()?;
    let stream = object
        .as_stream()
        .ok_or_else(|| Error::Corrupt("xref offset points at a non-stream".to_string()))?;
    if stream.dict.get_name(b"Type") != Some(b"XRef".as_slice()) {
        return Err(Error::Corrupt("xref stream missing /Type /XRef".to_string()));
    }

    let decoded = decode_stream_data(&stream.dict, &stream.data)?;
    let widths = stream
        .dict
        .get_array(b"W")
        .ok_or_else(|| Error::Corrupt("xref stream missing /W".to_string()))?;
    let widths: Vec<usize> = widths
        .iter()
        .filter_map(|o| o.as_int())
        .map(|w| w.max(0) as usize)
        .collect();
    if widths.len() != 3 {
        return Err(Error::Corrupt("xref stream /W must have 3 entries".to_string()));
    }
    let entry_len: usize = widths.iter().sum();
    if entry_len == 0 {
        return Err(Error::Corrupt("xref stream with zero-width entries".to_string()));
    }

    let size = stream.dict.get_int(b"Size").unwrap_or(0).max(0) as u32;
    let subsections: Vec<(u32, u32)> = match stream.dict.get_array(b"Index") {
        Some(index) => index
            .chunks_exact(2)
            .filter_map(|pair| {
                let start = pair[0].as_int()?;
                let count = pair[1].as_int()?;
                Some((start.max(0) as u32, count.max(0) as u32))
            })
            .collect(),
        None => vec![(0, size)],
    };

    let mut cursor = 0usize;
    for (start, count) in subsections {
        for i in 0..count {
            if cursor + entry_len > decoded.len() {
                return Err(Error::Corrupt("truncated xref stream data".to_string()));
            }
            let mut fields = [0u64; 3];
            for (slot, &width) in fields.iter_mut().zip(widths.iter()) {
                let mut value = 0u64;
                for _ in 0..width {
                    value = (value << 8) | decoded[cursor] as u64;
                    cursor += 1;
                }
                *slot = value;
            }
            // A zero-width first field means type 1.
            let entry_type = if widths[0] == 0 { 1 } else { fields[0] };
            let entry = match entry_type {
                0 => XrefEntry::Free,
                1 => XrefEntry::Offset(fields[1]),
                2 => XrefEntry::InStream {
                    stream_id: fields[1] as u32,
                    index: fields[2] as u32,
                },
                _ => continue, // forward-compatible: unknown types are ignored
            };
            table.absorb_entry(start + i, entry);
        }
    }
    Ok(stream.dict.clone())
}

/// Rebuild a cross-reference table by scanning for `N G obj` headers.
///
/// Used when the declared xref is missing or unusable. The later of two
/// definitions of the same object number wins, matching incremental-update
/// semantics. The trailer is reconstructed from the last `trailer` keyword
/// found; a missing `/Root` is patched later from the materialized objects.
pub fn fallback_scan(data: &[u8]) -> Result<XrefTable> {
    let mut table = XrefTable::default();
    let mut pos = 0usize;

    while pos < data.len() {
        let b = data[pos];
        if !b.is_ascii_digit() {
            pos += 1;
            continue;
        }
        // Object headers begin at a token boundary.
        if pos > 0 {
            let prev = data[pos - 1];
            if !is_whitespace(prev) && !is_delimiter(prev) {
                pos += 1;
                continue;
            }
        }
        let mut lexer = Lexer::at(data, pos);
        if let Some((id, after)) = try_object_header(&mut lexer) {
            table.entries.insert(id, XrefEntry::Offset(pos as u64));
            pos = after;
        } else {
            pos += 1;
            while pos < data.len() && data[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }

    if table.entries.is_empty() {
        return Err(Error::Corrupt("no indirect objects found in scan".to_string()));
    }

    // Last trailer dictionary in the file, if any survived.
    let needle = b"trailer";
    let mut search_end = data.len();
    while let Some(found) = data[..search_end]
        .windows(needle.len())
        .rposition(|w| w == needle)
    {
        let mut lexer = Lexer::at(data, found + needle.len());
        if let Ok(Object::Dictionary(dict)) = lexer.parse_object() {
            table.absorb_trailer(&dict);
            break;
        }
        search_end = found;
    }

    debug!("fallback scan recovered {} objects", table.entries.len());
    Ok(table)
}

/// Match `int int obj` at the cursor, returning the object id and the
/// position right after the `obj` keyword.
fn try_object_header(lexer: &mut Lexer<'_>) -> Option<(u32, usize)> {
    let num = match lexer.parse_number().ok()? {
        Object::Integer(n) if n >= 0 && n <= u32::MAX as i64 => n as u32,
        _ => return None,
    };
    match lexer.parse_number().ok()? {
        Object::Integer(g) if (0..=u16::MAX as i64).contains(&g) => g,
        _ => return None,
    };
    lexer.skip_whitespace();
    let token = lexer.read_token();
    if token == b"obj" {
        Some((num, lexer.pos))
    } else {
        None
    }
}
