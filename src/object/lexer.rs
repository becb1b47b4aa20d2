//! Tokenizer for PDF object syntax.
//!
//! Works over a borrowed byte slice with an explicit cursor; the xref
//! loader, the object store, and the content-stream interpreter all drive
//! it from different starting offsets.

use crate::error::{Error, Result};

use super::object::{Dict, Object, ObjectId, Stream};

/// PDF whitespace characters.
pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b'\0' | b'\t' | b'\n' | b'\x0c' | b'\r' | b' ')
}

/// PDF delimiter characters.
pub fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// Cursor-based lexer over raw PDF bytes.
pub struct Lexer<'a> {
    data: &'a [u8],
    pub pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn byte_at(&self, at: usize) -> Option<u8> {
        self.data.get(at).copied()
    }

    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    /// Skip whitespace and `%` comments.
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while let Some(b) = self.peek() {
                    self.pos += 1;
                    if b == b'\n' || b == b'\r' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    /// Read a run of regular characters (a bare keyword or operator token).
    pub fn read_token(&mut self) -> &'a [u8] {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if is_regular(b) {
                self.pos += 1;
            } else {
                break;
            }
        }
        &self.data[start..self.pos]
    }

    /// Expect a specific bare keyword next (after whitespace).
    pub fn expect_keyword(&mut self, kw: &[u8]) -> Result<()> {
        self.skip_whitespace();
        let token = self.read_token();
        if token == kw {
            Ok(())
        } else {
            Err(Error::Corrupt(format!(
                "expected '{}' at offset {}",
                String::from_utf8_lossy(kw),
                self.pos
            )))
        }
    }

    /// Parse one object at the cursor.
    pub fn parse_object(&mut self) -> Result<Object> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(Error::Corrupt("unexpected end of data".to_string())),
            Some(b'/') => self.parse_name().map(Object::Name),
            Some(b'(') => self.parse_literal_string().map(Object::String),
            Some(b'<') => {
                if self.data.get(self.pos + 1) == Some(&b'<') {
                    self.pos += 2;
                    self.parse_dict_body().map(Object::Dictionary)
                } else {
                    self.pos += 1;
                    self.parse_hex_string().map(Object::String)
                }
            }
            Some(b'[') => {
                self.pos += 1;
                self.parse_array_body().map(Object::Array)
            }
            Some(b) if b == b'+' || b == b'-' || b == b'.' || b.is_ascii_digit() => {
                self.parse_number_or_reference()
            }
            Some(_) => {
                let token = self.read_token();
                match token {
                    b"true" => Ok(Object::Boolean(true)),
                    b"false" => Ok(Object::Boolean(false)),
                    b"null" => Ok(Object::Null),
                    _ => Err(Error::Corrupt(format!(
                        "unexpected token '{}' at offset {}",
                        String::from_utf8_lossy(token),
                        self.pos
                    ))),
                }
            }
        }
    }

    /// Parse a name after the `/`, handling `#xx` escapes.
    fn parse_name(&mut self) -> Result<Vec<u8>> {
        self.pos += 1; // consume '/'
        let mut name = Vec::new();
        while let Some(b) = self.peek() {
            if !is_regular(b) {
                break;
            }
            self.pos += 1;
            if b == b'#' {
                let hi = self.bump();
                let lo = self.bump();
                if let (Some(hi), Some(lo)) = (hi, lo) {
                    let hex = [hi, lo];
                    if let Ok(v) =
                        u8::from_str_radix(std::str::from_utf8(&hex).unwrap_or("zz"), 16)
                    {
                        name.push(v);
                        continue;
                    }
                }
                return Err(Error::Corrupt("bad #xx escape in name".to_string()));
            }
            name.push(b);
        }
        Ok(name)
    }

    /// Parse a literal string after the `(`.
    fn parse_literal_string(&mut self) -> Result<Vec<u8>> {
        self.pos += 1; // consume '('
        let mut out = Vec::new();
        let mut depth = 1usize;
        while let Some(b) = self.bump() {
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                    out.push(b);
                }
                b'\\' => match self.bump() {
                    Some(b'n') => out.push(b'\n'),
                    Some(b'r') => out.push(b'\r'),
                    Some(b't') => out.push(b'\t'),
                    Some(b'b') => out.push(0x08),
                    Some(b'f') => out.push(0x0c),
                    Some(b'(') => out.push(b'('),
                    Some(b')') => out.push(b')'),
                    Some(b'\\') => out.push(b'\\'),
                    // Line continuation: backslash before EOL eats the break.
                    Some(b'\r') => {
                        if self.peek() == Some(b'\n') {
                            self.pos += 1;
                        }
                    }
                    Some(b'\n') => {}
                    Some(d @ b'0'..=b'7') => {
                        let mut v = (d - b'0') as u16;
                        for _ in 0..2 {
                            match self.peek() {
                                Some(d2 @ b'0'..=b'7') => {
                                    v = v * 8 + (d2 - b'0') as u16;
                                    self.pos += 1;
                                }
                                _ => break,
                            }
                        }
                        out.push(v as u8);
                    }
                    Some(other) => out.push(other),
                    None => break,
                },
                _ => out.push(b),
            }
        }
        Err(Error::Corrupt("unterminated literal string".to_string()))
    }

    /// Parse a hex string after the `<`.
    fn parse_hex_string(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut nibble: Option<u8> = None;
        while let Some(b) = self.bump() {
            match b {
                b'>' => {
                    // Odd digit count: last nibble padded with zero.
                    if let Some(hi) = nibble {
                        out.push(hi << 4);
                    }
                    return Ok(out);
                }
                _ if is_whitespace(b) => {}
                _ => {
                    let v = match b {
                        b'0'..=b'9' => b - b'0',
                        b'a'..=b'f' => b - b'a' + 10,
                        b'A'..=b'F' => b - b'A' + 10,
                        _ => {
                            return Err(Error::Corrupt("bad hex string digit".to_string()));
                        }
                    };
                    match nibble.take() {
                        Some(hi) => out.push((hi << 4) | v),
                        None => nibble = Some(v),
                    }
                }
            }
        }
        Err(Error::Corrupt("unterminated hex string".to_string()))
    }

    fn parse_array_body(&mut self) -> Result<Vec<Object>> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b']') => {
                    self.pos += 1;
                    return Ok(items);
                }
                None => return Err(Error::Corrupt("unterminated array".to_string())),
                _ => items.push(self.parse_object()?),
            }
        }
    }

    /// Parse dictionary entries after the `<<`.
    fn parse_dict_body(&mut self) -> Result<Dict> {
        let mut dict = Dict::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'>') => {
                    if self.data.get(self.pos + 1) == Some(&b'>') {
                        self.pos += 2;
                        return Ok(dict);
                    }
                    return Err(Error::Corrupt("unterminated dictionary".to_string()));
                }
                Some(b'/') => {
                    let key = self.parse_name()?;
                    let value = self.parse_object()?;
                    dict.insert(key, value);
                }
                _ => return Err(Error::Corrupt("expected name key in dictionary".to_string())),
            }
        }
    }

    /// Parse a number, upgrading `int int R` sequences to a reference.
    fn parse_number_or_reference(&mut self) -> Result<Object> {
        let first = self.parse_number()?;
        let Object::Integer(num) = first else {
            return Ok(first);
        };
        if num < 0 {
            return Ok(first);
        }

        let checkpoint = self.pos;
        self.skip_whitespace();
        let gen_start = self.pos;
        let is_digit_next = self.peek().map(|b| b.is_ascii_digit()).unwrap_or(false);
        if is_digit_next {
            if let Ok(Object::Integer(gen)) = self.parse_number() {
                if (0..=u16::MAX as i64).contains(&gen) {
                    self.skip_whitespace();
                    if self.peek() == Some(b'R') {
                        let after = self.data.get(self.pos + 1).copied();
                        if after.map(|b| !is_regular(b)).unwrap_or(true) {
                            self.pos += 1;
                            return Ok(Object::Reference((num as u32, gen as u16)));
                        }
                    }
                }
            }
            let _ = gen_start;
        }
        self.pos = checkpoint;
        Ok(first)
    }

    /// Parse a bare numeric literal.
    pub fn parse_number(&mut self) -> Result<Object> {
        self.skip_whitespace();
        let start = self.pos;
        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            self.pos += 1;
        }
        let mut is_real = false;
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() {
                self.pos += 1;
            } else if b == b'.' && !is_real {
                is_real = true;
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&self.data[start..self.pos])
            .map_err(|_| Error::Corrupt("bad number".to_string()))?;
        if text.is_empty() || text == "+" || text == "-" || text == "." {
            return Err(Error::Corrupt(format!("bad number at offset {}", start)));
        }
        if is_real {
            text.parse::<f32>()
                .map(Object::Real)
                .map_err(|_| Error::Corrupt(format!("bad real at offset {}", start)))
        } else {
            text.parse::<i64>()
                .map(Object::Integer)
                .map_err(|_| Error::Corrupt(format!("bad integer at offset {}", start)))
        }
    }

    /// Parse an indirect object (`N G obj ... endobj`) at the cursor.
    ///
    /// Stream data extent comes from `/Length` when it is a direct integer;
    /// otherwise (indirect or broken), the data runs to the nearest
    /// `endstream` keyword.
    pub fn parse_indirect_object(&mut self) -> Result<(ObjectId, Object)> {
        self.skip_whitespace();
        let num = match self.parse_number()? {
            Object::Integer(n) if n >= 0 => n as u32,
            _ => return Err(Error::Corrupt("bad object number".to_string())),
        };
        let gen = match self.parse_number()? {
            Object::Integer(g) if (0..=u16::MAX as i64).contains(&g) => g as u16,
            _ => return Err(Error::Corrupt("bad generation number".to_string())),
        };
        self.expect_keyword(b"obj")?;

        let object = self.parse_object()?;

        self.skip_whitespace();
        let checkpoint = self.pos;
        let token = self.read_token();
        match token {
            b"endobj" => Ok(((num, gen), object)),
            b"stream" => {
                let dict = match object {
                    Object::Dictionary(d) => d,
                    _ => return Err(Error::Corrupt("stream without dictionary".to_string())),
                };
                // Keyword is followed by CRLF or LF.
                if self.peek() == Some(b'\r') {
                    self.pos += 1;
                }
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
                let data_start = self.pos;
                let data = match dict.get_int(b"Length") {
                    Some(len) if len >= 0 && data_start + len as usize <= self.data.len() => {
                        let end = data_start + len as usize;
                        // Trust /Length only if endstream actually follows.
                        let mut probe = Lexer::at(self.data, end);
                        probe.skip_whitespace();
                        let tok = probe.read_token();
                        if tok == b"endstream" {
                            self.pos = probe.pos;
                            self.data[data_start..end].to_vec()
                        } else {
                            self.scan_to_endstream(data_start)?
                        }
                    }
                    _ => self.scan_to_endstream(data_start)?,
                };
                // Optional trailing endobj.
                let after = self.pos;
                self.skip_whitespace();
                if self.read_token() != b"endobj" {
                    self.pos = after;
                }
                Ok(((num, gen), Object::Stream(Stream { dict, data })))
            }
            _ => {
                self.pos = checkpoint;
                Err(Error::Corrupt(format!(
                    "missing endobj for object {}",
                    num
                )))
            }
        }
    }

    /// Recover stream data by locating the `endstream` keyword.
    fn scan_to_endstream(&mut self, data_start: usize) -> Result<Vec<u8>> {
        let haystack = &self.data[data_start..];
        let needle = b"endstream";
        let found = haystack
            .windows(needle.len())
            .position(|w| w == needle)
            .ok_or_else(|| Error::Corrupt("unterminated stream".to_string()))?;
        let mut end = data_start + found;
        // Strip the EOL that precedes the keyword.
        if end > data_start && self.data[end - 1] == b'\n' {
            end -= 1;
        }
        if end > data_start && self.data[end - 1] == b'\r' {
            end -= 1;
        }
        let data = self.data[data_start..end].to_vec();
        self.pos = data_start + found + needle.len();
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &[u8]) -> Object {
        Lexer::new(data).parse_object().unwrap()
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse(b"42"), Object::Integer(42));
        assert_eq!(parse(b"-17"), Object::Integer(-17));
        assert_eq!(parse(b"3.14"), Object::Real(3.14));
        assert_eq!(parse(b"-.5"), Object::Real(-0.5));
    }

    #[test]
    fn test_parse_name_with_escape() {
        assert_eq!(parse(b"/Name"), Object::Name(b"Name".to_vec()));
        assert_eq!(parse(b"/A#20B"), Object::Name(b"A B".to_vec()));
    }

    #[test]
    fn test_parse_literal_string() {
        assert_eq!(parse(b"(hello)"), Object::String(b"hello".to_vec()));
        assert_eq!(parse(b"(a(b)c)"), Object::String(b"a(b)c".to_vec()));
        assert_eq!(parse(b"(a\\)b)"), Object::String(b"a)b".to_vec()));
        assert_eq!(parse(b"(\\101\\102)"), Object::String(b"AB".to_vec()));
    }

    #[test]
    fn test_parse_hex_string() {
        assert_eq!(parse(b"<48656C6C6F>"), Object::String(b"Hello".to_vec()));
        assert_eq!(parse(b"<48 65 6c>"), Object::String(b"Hel".to_vec()));
        // Odd digit count pads with zero.
        assert_eq!(parse(b"<F>"), Object::String(vec![0xF0]));
    }

    #[test]
    fn test_parse_array_and_dict() {
        let obj = parse(b"[1 2 /X (s)]");
        let arr = obj.as_array().unwrap();
        assert_eq!(arr.len(), 4);

        let obj = parse(b"<< /Type /Page /MediaBox [0 0 612 792] >>");
        let dict = obj.as_dict().unwrap();
        assert!(dict.get(b"Type").unwrap().is_name(b"Page"));
        assert_eq!(dict.get_array(b"MediaBox").unwrap().len(), 4);
    }

    #[test]
    fn test_parse_reference() {
        assert_eq!(parse(b"12 0 R"), Object::Reference((12, 0)));
        // Not a reference: R is part of a longer token.
        let mut lexer = Lexer::new(b"12 0 Rx");
        assert_eq!(lexer.parse_object().unwrap(), Object::Integer(12));
    }

    #[test]
    fn test_parse_array_of_references() {
        let obj = parse(b"[1 0 R 2 0 R 30]");
        let arr = obj.as_array().unwrap();
        assert_eq!(arr[0], Object::Reference((1, 0)));
        assert_eq!(arr[1], Object::Reference((2, 0)));
        assert_eq!(arr[2], Object::Integer(30));
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(parse(b"true"), Object::Boolean(true));
        assert_eq!(parse(b"null"), Object::Null);
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(parse(b"% comment\n 7"), Object::Integer(7));
    }

    #[test]
    fn test_parse_indirect_object() {
        let data = b"4 0 obj\n<< /Type /Catalog >>\nendobj";
        let (id, obj) = Lexer::new(data).parse_indirect_object().unwrap();
        assert_eq!(id, (4, 0));
        assert!(obj.as_dict().unwrap().get(b"Type").unwrap().is_name(b"Catalog"));
    }

    #[test]
    fn test_parse_stream_with_length() {
        let data = b"5 0 obj\n<< /Length 5 >>\nstream\nhello\nendstream\nendobj";
        let (id, obj) = Lexer::new(data).parse_indirect_object().unwrap();
        assert_eq!(id, (5, 0));
        assert_eq!(obj.as_stream().unwrap().data, b"hello");
    }

    #[test]
    fn test_parse_stream_bad_length_recovers() {
        let data = b"5 0 obj\n<< /Length 9999 >>\nstream\nhello\nendstream\nendobj";
        let (_, obj) = Lexer::new(data).parse_indirect_object().unwrap();
        assert_eq!(obj.as_stream().unwrap().data, b"hello");
    }
}
