//! Stream filter decoders.
//!
//! FlateDecode (with PNG predictors), ASCIIHexDecode, ASCII85Decode, and
//! RunLengthDecode are decoded fully. DCTDecode and JPXDecode streams are
//! image payloads and pass through untouched; the caller keeps track of the
//! resulting encoding.

use std::io::Read;

use flate2::read::{DeflateDecoder, ZlibDecoder};
use log::debug;

use crate::error::{Error, Result};
use crate::model::ImageEncoding;

use super::object::{Dict, Object};

/// Outcome of running a stream through its filter chain.
pub struct DecodedStream {
    pub data: Vec<u8>,
    /// Set when the chain ended at an image filter whose payload we keep
    /// encoded (`DCTDecode`, `JPXDecode`).
    pub image_encoding: Option<ImageEncoding>,
}

/// Apply the full `/Filter` chain of `dict` to `data`.
///
/// Filter entries may be a single name or an array; `/DecodeParms` lines up
/// with it. Decoding stops at the first image filter, which by convention is
/// the last entry in the chain.
pub fn decode_stream(dict: &Dict, data: &[u8]) -> Result<DecodedStream> {
    let filters = filter_names(dict);
    let parms = decode_parms(dict);

    let mut out = data.to_vec();
    for (i, filter) in filters.iter().enumerate() {
        let parm = parms.get(i).copied().flatten();
        match filter.as_slice() {
            b"FlateDecode" | b"Fl" => out = flate_decode(&out, parm)?,
            b"ASCIIHexDecode" | b"AHx" => out = ascii_hex_decode(&out)?,
            b"ASCII85Decode" | b"A85" => out = ascii85_decode(&out)?,
            b"RunLengthDecode" | b"RL" => out = run_length_decode(&out)?,
            b"DCTDecode" | b"DCT" => {
                return Ok(DecodedStream {
                    data: out,
                    image_encoding: Some(ImageEncoding::Jpeg),
                });
            }
            b"JPXDecode" => {
                return Ok(DecodedStream {
                    data: out,
                    image_encoding: Some(ImageEncoding::Jpeg2000),
                });
            }
            other => {
                return Err(Error::Corrupt(format!(
                    "unsupported stream filter '{}'",
                    String::from_utf8_lossy(other)
                )));
            }
        }
    }
    Ok(DecodedStream {
        data: out,
        image_encoding: None,
    })
}

/// Convenience wrapper for streams that must decode to plain bytes
/// (content streams, object streams, xref streams).
pub fn decode_stream_data(dict: &Dict, data: &[u8]) -> Result<Vec<u8>> {
    let decoded = decode_stream(dict, data)?;
    if decoded.image_encoding.is_some() {
        return Err(Error::Corrupt(
            "image filter on a non-image stream".to_string(),
        ));
    }
    Ok(decoded.data)
}

fn filter_names(dict: &Dict) -> Vec<Vec<u8>> {
    match dict.get(b"Filter").or_else(|| dict.get(b"F")) {
        Some(Object::Name(n)) => vec![n.clone()],
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|o| o.as_name().map(|n| n.to_vec()))
            .collect(),
        _ => Vec::new(),
    }
}

fn decode_parms(dict: &Dict) -> Vec<Option<&Dict>> {
    match dict.get(b"DecodeParms").or_else(|| dict.get(b"DP")) {
        Some(Object::Dictionary(d)) => vec![Some(d)],
        Some(Object::Array(items)) => items.iter().map(|o| o.as_dict()).collect(),
        _ => Vec::new(),
    }
}

/// zlib-wrapped deflate, falling back to raw deflate for producers that
/// omit the zlib header.
pub fn flate_decode(data: &[u8], parms: Option<&Dict>) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let result = ZlibDecoder::new(data).read_to_end(&mut out);
    if result.is_err() || out.is_empty() && !data.is_empty() {
        debug!("zlib header missing, retrying as raw deflate");
        out.clear();
        DeflateDecoder::new(data)
            .read_to_end(&mut out)
            .map_err(|e| Error::Corrupt(format!("flate decode failed: {}", e)))?;
    }

    match parms {
        Some(p) => apply_predictor(out, p),
        None => Ok(out),
    }
}

/// Undo PNG row predictors (`/Predictor` >= 10). Predictor 1 and 2 need no
/// row transform for the byte streams we handle.
fn apply_predictor(data: Vec<u8>, parms: &Dict) -> Result<Vec<u8>> {
    let predictor = parms.get_int(b"Predictor").unwrap_or(1);
    if predictor < 10 {
        return Ok(data);
    }

    let colors = parms.get_int(b"Colors").unwrap_or(1).max(1) as usize;
    let bpc = parms.get_int(b"BitsPerComponent").unwrap_or(8).max(1) as usize;
    let columns = parms.get_int(b"Columns").unwrap_or(1).max(1) as usize;

    let bytes_per_pixel = (colors * bpc + 7) / 8;
    let row_len = (colors * bpc * columns + 7) / 8;
    let stride = row_len + 1; // leading filter-type byte

    if row_len == 0 || data.len() % stride != 0 {
        return Err(Error::Corrupt("bad predictor row geometry".to_string()));
    }

    let mut out = Vec::with_capacity(data.len() / stride * row_len);
    let mut prev_row = vec![0u8; row_len];

    for chunk in data.chunks_exact(stride) {
        let filter_type = chunk[0];
        let mut row = chunk[1..].to_vec();
        match filter_type {
            0 => {}
            1 => {
                for i in bytes_per_pixel..row_len {
                    row[i] = row[i].wrapping_add(row[i - bytes_per_pixel]);
                }
            }
            2 => {
                for i in 0..row_len {
                    row[i] = row[i].wrapping_add(prev_row[i]);
                }
            }
            3 => {
                for i in 0..row_len {
                    let left = if i >= bytes_per_pixel {
                        row[i - bytes_per_pixel] as u16
                    } else {
                        0
                    };
                    let up = prev_row[i] as u16;
                    row[i] = row[i].wrapping_add(((left + up) / 2) as u8);
                }
            }
            4 => {
                for i in 0..row_len {
                    let left = if i >= bytes_per_pixel {
                        row[i - bytes_per_pixel]
                    } else {
                        0
                    };
                    let up = prev_row[i];
                    let up_left = if i >= bytes_per_pixel {
                        prev_row[i - bytes_per_pixel]
                    } else {
                        0
                    };
                    row[i] = row[i].wrapping_add(paeth(left, up, up_left));
                }
            }
            _ => {
                return Err(Error::Corrupt(format!(
                    "unknown PNG predictor filter {}",
                    filter_type
                )));
            }
        }
        out.extend_from_slice(&row);
        prev_row = row;
    }
    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Hex pairs terminated by `>`; whitespace ignored, odd digit padded.
pub fn ascii_hex_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut nibble: Option<u8> = None;
    for &b in data {
        match b {
            b'>' => break,
            b'\0' | b'\t' | b'\n' | b'\x0c' | b'\r' | b' ' => {}
            _ => {
                let v = match b {
                    b'0'..=b'9' => b - b'0',
                    b'a'..=b'f' => b - b'a' + 10,
                    b'A'..=b'F' => b - b'A' + 10,
                    _ => return Err(Error::Corrupt("bad ASCIIHex digit".to_string())),
                };
                match nibble.take() {
                    Some(hi) => out.push((hi << 4) | v),
                    None => nibble = Some(v),
                }
            }
        }
    }
    if let Some(hi) = nibble {
        out.push(hi << 4);
    }
    Ok(out)
}

/// Base-85 groups terminated by `~>`; `z` is shorthand for four zero bytes.
pub fn ascii85_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut count = 0usize;

    let data = data.strip_prefix(b"<~").unwrap_or(data);
    let mut iter = data.iter().peekable();
    while let Some(&b) = iter.next() {
        match b {
            b'~' => break,
            b'z' if count == 0 => out.extend_from_slice(&[0, 0, 0, 0]),
            b'\0' | b'\t' | b'\n' | b'\x0c' | b'\r' | b' ' => {}
            b'!'..=b'u' => {
                group[count] = b - b'!';
                count += 1;
                if count == 5 {
                    let value = group.iter().fold(0u32, |acc, &d| {
                        acc.wrapping_mul(85).wrapping_add(d as u32)
                    });
                    out.extend_from_slice(&value.to_be_bytes());
                    count = 0;
                }
            }
            _ => return Err(Error::Corrupt("bad ASCII85 digit".to_string())),
        }
    }
    // Partial final group: pad with 'u' and keep count-1 output bytes.
    if count > 0 {
        if count == 1 {
            return Err(Error::Corrupt("truncated ASCII85 group".to_string()));
        }
        let mut padded = group;
        for slot in padded.iter_mut().take(5).skip(count) {
            *slot = 84;
        }
        let value = padded.iter().fold(0u32, |acc, &d| {
            acc.wrapping_mul(85).wrapping_add(d as u32)
        });
        out.extend_from_slice(&value.to_be_bytes()[..count - 1]);
    }
    Ok(out)
}

/// PackBits-style run length coding; 128 marks end of data.
pub fn run_length_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    while pos < data.len() {
        let length = data[pos];
        pos += 1;
        match length {
            0..=127 => {
                let n = length as usize + 1;
                if pos + n > data.len() {
                    return Err(Error::Corrupt("truncated RunLength literal".to_string()));
                }
                out.extend_from_slice(&data[pos..pos + n]);
                pos += n;
            }
            128 => break,
            129..=255 => {
                let n = 257 - length as usize;
                let byte = *data
                    .get(pos)
                    .ok_or_else(|| Error::Corrupt("truncated RunLength run".to_string()))?;
                pos += 1;
                out.extend(std::iter::repeat(byte).take(n));
            }
        }
    }
    Ok(out)
}
