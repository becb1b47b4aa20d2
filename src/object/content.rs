//! Content-stream interpreter.
//!
//! Executes the page description operators and lowers them to positioned
//! [`Primitive`]s. Each primitive carries an immutable snapshot of the
//! graphics state at emit time; nothing of the interpreter survives past
//! [`interpret`].

use std::collections::HashMap;
use std::rc::Rc;

use log::debug;
use unicode_normalization::UnicodeNormalization;

use crate::geom::{Matrix, Point, Rect};
use crate::model::{
    Color, FontRef, GraphicsState, ImageObject, Primitive, TextRun, VectorElement, VectorKind,
    Warning, WarningKind,
};

use super::filters::decode_stream;
use super::lexer::{is_delimiter, is_whitespace, Lexer};
use super::object::{Dict, Object};
use super::store::ObjectStore;

/// Glyph ascent/descent fractions of the em square, used for run boxes when
/// no font metrics beyond widths are available.
const ASCENT_FRACTION: f32 = 0.8;
const DESCENT_FRACTION: f32 = 0.2;

/// Run the content stream against the page resources, producing primitives
/// in stream order. `base` is the device matrix applied under everything,
/// used to shift a non-zero media box origin to (0, 0).
pub fn interpret(
    store: &ObjectStore,
    resources: &Dict,
    content: &[u8],
    base: Matrix,
    warnings: &mut Vec<Warning>,
) -> Vec<Primitive> {
    let mut interp = Interpreter::new(store, resources);
    interp.gs.ctm = base;
    interp.run(content, warnings);
    interp.primitives
}

struct TextState {
    font: Option<Rc<LoadedFont>>,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    /// Horizontal scaling as a fraction (Tz operand / 100).
    hscale: f32,
    leading: f32,
    rise: f32,
    render_mode: u8,
    tm: Matrix,
    tlm: Matrix,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            hscale: 1.0,
            leading: 0.0,
            rise: 0.0,
            render_mode: 0,
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
        }
    }
}

#[derive(Default)]
struct PathBuilder {
    current: Option<Point>,
    start: Option<Point>,
    segments: Vec<(Point, Point)>,
    rects: Vec<Rect>,
    bbox: Option<Rect>,
    has_curve: bool,
}

impl PathBuilder {
    fn touch(&mut self, p: Point) {
        let r = Rect::new(p.x, p.y, p.x, p.y);
        self.bbox = Some(match self.bbox {
            Some(b) => b.union(&r),
            None => r,
        });
    }

    fn move_to(&mut self, p: Point) {
        self.current = Some(p);
        self.start = Some(p);
        self.touch(p);
    }

    fn line_to(&mut self, p: Point) {
        if let Some(from) = self.current {
            self.segments.push((from, p));
        }
        self.current = Some(p);
        self.touch(p);
    }

    fn curve_to(&mut self, controls: &[Point], end: Point) {
        self.has_curve = true;
        for &c in controls {
            self.touch(c);
        }
        self.touch(end);
        self.current = Some(end);
    }

    fn close(&mut self) {
        if let (Some(from), Some(to)) = (self.current, self.start) {
            self.segments.push((from, to));
            self.current = Some(to);
        }
    }

    fn rect(&mut self, r: Rect) {
        self.touch(Point::new(r.x0, r.y0));
        self.touch(Point::new(r.x1, r.y1));
        self.rects.push(r);
        self.current = Some(Point::new(r.x0, r.y0));
        self.start = self.current;
    }

    fn clear(&mut self) {
        *self = PathBuilder::default();
    }

    fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.rects.is_empty() && !self.has_curve
    }
}

struct Interpreter<'a> {
    store: &'a ObjectStore,
    resources: &'a Dict,
    fonts: HashMap<Vec<u8>, Rc<LoadedFont>>,
    gs: GraphicsState,
    gs_stack: Vec<GraphicsState>,
    text: TextState,
    path: PathBuilder,
    primitives: Vec<Primitive>,
    type3_warned: bool,
}

impl<'a> Interpreter<'a> {
    fn new(store: &'a ObjectStore, resources: &'a Dict) -> Self {
        Self {
            store,
            resources,
            fonts: HashMap::new(),
            gs: GraphicsState::default(),
            gs_stack: Vec::new(),
            text: TextState::default(),
            path: PathBuilder::default(),
            primitives: Vec::new(),
            type3_warned: false,
        }
    }

    fn run(&mut self, content: &[u8], warnings: &mut Vec<Warning>) {
        let mut lexer = Lexer::new(content);
        let mut operands: Vec<Object> = Vec::new();
        loop {
            lexer.skip_whitespace();
            let Some(b) = lexer.peek() else { break };
            let is_operand = matches!(b, b'/' | b'(' | b'<' | b'[')
                || b == b'+'
                || b == b'-'
                || b == b'.'
                || b.is_ascii_digit();
            if is_operand {
                match lexer.parse_object() {
                    Ok(obj) => operands.push(obj),
                    Err(err) => {
                        debug!("content operand unreadable: {}", err);
                        lexer.pos += 1;
                        operands.clear();
                    }
                }
            } else {
                let op = lexer.read_token().to_vec();
                if op.is_empty() {
                    lexer.pos += 1;
                    continue;
                }
                if op == b"BI" {
                    self.skip_inline_image(&mut lexer, warnings);
                } else {
                    self.execute(&op, &operands, warnings);
                }
                operands.clear();
            }
        }
    }

    fn execute(&mut self, op: &[u8], operands: &[Object], warnings: &mut Vec<Warning>) {
        let num = |i: usize| operands.get(i).and_then(Object::as_f32).unwrap_or(0.0);
        match op {
            // Graphics state
            b"q" => self.gs_stack.push(self.gs.clone()),
            b"Q" => {
                if let Some(prev) = self.gs_stack.pop() {
                    self.gs = prev;
                }
            }
            b"cm" if operands.len() >= 6 => {
                let m = Matrix::new(num(0), num(1), num(2), num(3), num(4), num(5));
                self.gs.ctm = m.concat(&self.gs.ctm);
            }
            b"w" => self.gs.line_width = num(0),

            // Color
            b"g" => self.gs.fill_color = Color::from_gray(num(0)),
            b"G" => self.gs.stroke_color = Color::from_gray(num(0)),
            b"rg" => self.gs.fill_color = Color::from_rgb(num(0), num(1), num(2)),
            b"RG" => self.gs.stroke_color = Color::from_rgb(num(0), num(1), num(2)),
            b"k" => self.gs.fill_color = Color::from_cmyk(num(0), num(1), num(2), num(3)),
            b"K" => self.gs.stroke_color = Color::from_cmyk(num(0), num(1), num(2), num(3)),
            b"sc" | b"scn" => {
                if let Some(c) = component_color(operands) {
                    self.gs.fill_color = c;
                }
            }
            b"SC" | b"SCN" => {
                if let Some(c) = component_color(operands) {
                    self.gs.stroke_color = c;
                }
            }

            // Path construction
            b"m" => self.path.move_to(Point::new(num(0), num(1))),
            b"l" => self.path.line_to(Point::new(num(0), num(1))),
            b"c" => self.path.curve_to(
                &[Point::new(num(0), num(1)), Point::new(num(2), num(3))],
                Point::new(num(4), num(5)),
            ),
            b"v" => self
                .path
                .curve_to(&[Point::new(num(0), num(1))], Point::new(num(2), num(3))),
            b"y" => self
                .path
                .curve_to(&[Point::new(num(0), num(1))], Point::new(num(2), num(3))),
            b"h" => self.path.close(),
            b"re" => {
                let (x, y, w, h) = (num(0), num(1), num(2), num(3));
                self.path.rect(Rect::new(x, y, x + w, y + h));
            }

            // Path painting
            b"S" => self.paint(true, false),
            b"s" => {
                self.path.close();
                self.paint(true, false);
            }
            b"f" | b"F" | b"f*" => self.paint(false, true),
            b"B" | b"B*" => self.paint(true, true),
            b"b" | b"b*" => {
                self.path.close();
                self.paint(true, true);
            }
            b"n" => self.path.clear(),

            // Text
            b"BT" => {
                self.text.tm = Matrix::IDENTITY;
                self.text.tlm = Matrix::IDENTITY;
            }
            b"ET" => {}
            b"Tf" if operands.len() >= 2 => {
                if let Some(name) = operands[0].as_name() {
                    self.text.font = Some(self.font_resource(name));
                }
                self.text.size = num(1);
            }
            b"Td" => self.text_move(num(0), num(1)),
            b"TD" => {
                self.text.leading = -num(1);
                self.text_move(num(0), num(1));
            }
            b"Tm" if operands.len() >= 6 => {
                let m = Matrix::new(num(0), num(1), num(2), num(3), num(4), num(5));
                self.text.tm = m;
                self.text.tlm = m;
            }
            b"T*" => self.text_move(0.0, -self.text.leading),
            b"TL" => self.text.leading = num(0),
            b"Tc" => self.text.char_spacing = num(0),
            b"Tw" => self.text.word_spacing = num(0),
            b"Tz" => self.text.hscale = num(0) / 100.0,
            b"Ts" => self.text.rise = num(0),
            b"Tr" => self.text.render_mode = num(0) as u8,
            b"Tj" => {
                if let Some(s) = operands.first().and_then(Object::as_string) {
                    self.show_text(s, warnings);
                }
            }
            b"'" => {
                self.text_move(0.0, -self.text.leading);
                if let Some(s) = operands.first().and_then(Object::as_string) {
                    self.show_text(s, warnings);
                }
            }
            b"\"" => {
                self.text.word_spacing = num(0);
                self.text.char_spacing = num(1);
                self.text_move(0.0, -self.text.leading);
                if let Some(s) = operands.get(2).and_then(Object::as_string) {
                    self.show_text(s, warnings);
                }
            }
            b"TJ" => {
                if let Some(items) = operands.first().and_then(Object::as_array) {
                    for item in items {
                        match item {
                            Object::String(s) => self.show_text(s, warnings),
                            _ => {
                                if let Some(adjust) = item.as_f32() {
                                    // Kerning displacement in thousandths of em.
                                    let tx = -adjust / 1000.0
                                        * self.text.size
                                        * self.text.hscale;
                                    self.text.tm =
                                        Matrix::translation(tx, 0.0).concat(&self.text.tm);
                                }
                            }
                        }
                    }
                }
            }

            // External objects
            b"Do" => {
                if let Some(name) = operands.first().and_then(Object::as_name) {
                    self.draw_xobject(name, warnings);
                }
            }

            // Clipping, marked content, and extended state need no output.
            b"W" | b"W*" | b"gs" | b"ri" | b"i" | b"j" | b"J" | b"M" | b"d" | b"sh" | b"cs"
            | b"CS" | b"BMC" | b"BDC" | b"EMC" | b"MP" | b"DP" | b"BX" | b"EX" | b"d0"
            | b"d1" => {}

            other => debug!("ignoring operator '{}'", String::from_utf8_lossy(other)),
        }
    }

    fn text_move(&mut self, tx: f32, ty: f32) {
        self.text.tlm = Matrix::translation(tx, ty).concat(&self.text.tlm);
        self.text.tm = self.text.tlm;
    }

    /// Emit painted path elements: one per rectangle, one per straight
    /// segment, plus a single box for anything curved.
    fn paint(&mut self, stroked: bool, filled: bool) {
        let state = self.gs.clone();
        let ctm = self.gs.ctm;
        for r in &self.path.rects {
            let bbox = ctm.transform_rect(r);
            self.primitives.push(Primitive::Vector(VectorElement {
                kind: VectorKind::Rect(bbox),
                stroked,
                filled,
                bbox,
                state: state.clone(),
            }));
        }
        for &(from, to) in &self.path.segments {
            let from = ctm.transform_point(from);
            let to = ctm.transform_point(to);
            self.primitives.push(Primitive::Vector(VectorElement {
                kind: VectorKind::Line { from, to },
                stroked,
                filled,
                bbox: Rect::from_points(from, to),
                state: state.clone(),
            }));
        }
        if self.path.has_curve {
            if let Some(bbox) = self.path.bbox {
                let bbox = ctm.transform_rect(&bbox);
                self.primitives.push(Primitive::Vector(VectorElement {
                    kind: VectorKind::Path,
                    stroked,
                    filled,
                    bbox,
                    state: state.clone(),
                }));
            }
        }
        self.path.clear();
    }

    fn font_resource(&mut self, name: &[u8]) -> Rc<LoadedFont> {
        if let Some(font) = self.fonts.get(name) {
            return font.clone();
        }
        let loaded = self
            .store
            .resolve_dict(self.resources.get(b"Font"))
            .and_then(|fonts| self.store.resolve_dict(fonts.get(name)))
            .map(|dict| LoadedFont::load(self.store, dict))
            .unwrap_or_default();
        let font = Rc::new(loaded);
        self.fonts.insert(name.to_vec(), font.clone());
        font
    }

    fn show_text(&mut self, bytes: &[u8], warnings: &mut Vec<Warning>) {
        let font = match &self.text.font {
            Some(f) => f.clone(),
            None => Rc::new(LoadedFont::default()),
        };
        if font.type3 && !self.type3_warned {
            self.type3_warned = true;
            warnings.push(Warning::new(
                WarningKind::UnsupportedFeature,
                "Type 3 font glyphs rendered with approximate metrics",
            ));
        }

        let mut text = String::new();
        let mut advance = 0.0f32;
        for code in font.codes(bytes) {
            let w0 = font.width(code) / 1000.0;
            let mut adv = w0 * self.text.size + self.text.char_spacing;
            if code == 32 && !font.two_byte {
                adv += self.text.word_spacing;
            }
            advance += adv * self.text.hscale;
            match font.char_for(code) {
                Some(s) => text.push_str(&s),
                None => text.push('\u{FFFD}'),
            }
        }

        let device = self.text.tm.concat(&self.gs.ctm);
        // Invisible text (render mode 3) still advances the cursor.
        if self.text.render_mode != 3 && !text.is_empty() {
            let size = self.text.size * device.vertical_scale();
            let baseline = device.transform_point(Point::new(0.0, self.text.rise));
            let local = Rect::new(
                0.0,
                self.text.rise - DESCENT_FRACTION * self.text.size,
                advance.max(0.01),
                self.text.rise + ASCENT_FRACTION * self.text.size,
            );
            let bbox = device.transform_rect(&local);
            let mut state = self.gs.clone();
            state.render_mode = self.text.render_mode;
            self.primitives.push(Primitive::Text(TextRun {
                text: text.nfc().collect(),
                font: FontRef {
                    base_name: font.base_font.clone(),
                    flags: font.flags,
                },
                size,
                baseline,
                bbox,
                state,
            }));
        }
        self.text.tm = Matrix::translation(advance, 0.0).concat(&self.text.tm);
    }

    fn draw_xobject(&mut self, name: &[u8], warnings: &mut Vec<Warning>) {
        let Some(stream) = self
            .store
            .resolve_dict(self.resources.get(b"XObject"))
            .and_then(|xobjects| xobjects.get(name))
            .map(|o| self.store.resolve(o))
            .and_then(Object::as_stream)
        else {
            debug!("XObject '{}' not found", String::from_utf8_lossy(name));
            return;
        };

        match stream.dict.get_name(b"Subtype") {
            Some(b"Image") => {
                if matches!(stream.dict.get(b"ImageMask"), Some(Object::Boolean(true))) {
                    return;
                }
                let width = stream.dict.get_int(b"Width").unwrap_or(0).max(0) as u32;
                let height = stream.dict.get_int(b"Height").unwrap_or(0).max(0) as u32;
                match decode_stream(&stream.dict, &stream.data) {
                    Ok(decoded) => {
                        let encoding = decoded
                            .image_encoding
                            .unwrap_or(crate::model::ImageEncoding::Raw);
                        // Images map the unit square through the CTM.
                        let bbox = self
                            .gs
                            .ctm
                            .transform_rect(&Rect::new(0.0, 0.0, 1.0, 1.0));
                        self.primitives.push(Primitive::Image(ImageObject {
                            data: decoded.data,
                            encoding,
                            width_px: width,
                            height_px: height,
                            bbox,
                        }));
                    }
                    Err(err) => {
                        warnings.push(Warning::new(
                            WarningKind::ImageSkipped,
                            format!("image stream undecodable: {}", err),
                        ));
                    }
                }
            }
            Some(b"Form") => {
                warnings.push(Warning::new(
                    WarningKind::UnsupportedFeature,
                    "form XObject content not expanded",
                ));
            }
            _ => {}
        }
    }

    /// Skip an inline image (`BI ... ID <binary> EI`) and note the loss.
    fn skip_inline_image(&mut self, lexer: &mut Lexer<'_>, warnings: &mut Vec<Warning>) {
        // Parameter dictionary runs until the ID keyword.
        loop {
            lexer.skip_whitespace();
            match lexer.peek() {
                None => return,
                Some(b'/') | Some(b'[') | Some(b'(') | Some(b'<') => {
                    if lexer.parse_object().is_err() {
                        lexer.pos += 1;
                    }
                }
                Some(b) if b == b'+' || b == b'-' || b == b'.' || b.is_ascii_digit() => {
                    if lexer.parse_object().is_err() {
                        lexer.pos += 1;
                    }
                }
                _ => {
                    if lexer.read_token() == b"ID" {
                        break;
                    }
                }
            }
        }
        lexer.pos += 1; // single whitespace after ID
        // Binary payload runs to a whitespace-delimited EI.
        let data_len = lexer.len();
        while lexer.pos + 1 < data_len {
            let before_ok = lexer.pos == 0
                || lexer
                    .byte_at(lexer.pos - 1)
                    .map(is_whitespace)
                    .unwrap_or(true);
            if before_ok
                && lexer.byte_at(lexer.pos) == Some(b'E')
                && lexer.byte_at(lexer.pos + 1) == Some(b'I')
            {
                let after_ok = lexer
                    .byte_at(lexer.pos + 2)
                    .map(|b| is_whitespace(b) || is_delimiter(b))
                    .unwrap_or(true);
                if after_ok {
                    lexer.pos += 2;
                    warnings.push(Warning::new(
                        WarningKind::ImageSkipped,
                        "inline image omitted",
                    ));
                    return;
                }
            }
            lexer.pos += 1;
        }
        lexer.pos = data_len;
    }
}

fn component_color(operands: &[Object]) -> Option<Color> {
    let nums: Vec<f32> = operands.iter().filter_map(Object::as_f32).collect();
    match nums.len() {
        1 => Some(Color::from_gray(nums[0])),
        3 => Some(Color::from_rgb(nums[0], nums[1], nums[2])),
        4 => Some(Color::from_cmyk(nums[0], nums[1], nums[2], nums[3])),
        _ => None,
    }
}

/// A font dictionary reduced to what text extraction needs.
struct LoadedFont {
    base_font: String,
    flags: Option<u32>,
    to_unicode: Option<CMap>,
    widths: HashMap<u32, f32>,
    default_width: f32,
    /// Composite (Type0) fonts consume two-byte codes.
    two_byte: bool,
    type3: bool,
}

impl Default for LoadedFont {
    fn default() -> Self {
        Self {
            base_font: String::new(),
            flags: None,
            to_unicode: None,
            widths: HashMap::new(),
            default_width: 500.0,
            two_byte: false,
            type3: false,
        }
    }
}

impl LoadedFont {
    fn load(store: &ObjectStore, dict: &Dict) -> Self {
        let mut font = LoadedFont {
            base_font: dict
                .get_name(b"BaseFont")
                .map(|n| String::from_utf8_lossy(n).into_owned())
                .unwrap_or_default(),
            ..Default::default()
        };

        let subtype = dict.get_name(b"Subtype").unwrap_or(b"");
        match subtype {
            b"Type0" => {
                font.two_byte = true;
                font.default_width = 1000.0;
                let descendant = dict
                    .get(b"DescendantFonts")
                    .map(|o| store.resolve(o))
                    .and_then(Object::as_array)
                    .and_then(|a| a.first())
                    .and_then(|o| store.resolve_dict(Some(o)));
                if let Some(desc) = descendant {
                    if let Some(dw) = store_f32(store, desc.get(b"DW")) {
                        font.default_width = dw;
                    }
                    if let Some(w) = desc.get(b"W").map(|o| store.resolve(o)).and_then(Object::as_array)
                    {
                        font.load_cid_widths(store, w);
                    }
                    font.load_descriptor(store, desc);
                }
            }
            b"Type3" => {
                font.type3 = true;
                font.load_simple_widths(store, dict);
            }
            _ => {
                font.load_simple_widths(store, dict);
                font.load_descriptor(store, dict);
            }
        }

        font.to_unicode = dict
            .get(b"ToUnicode")
            .map(|o| store.resolve(o))
            .and_then(Object::as_stream)
            .and_then(|s| super::filters::decode_stream_data(&s.dict, &s.data).ok())
            .map(|data| CMap::parse(&data));
        font
    }

    fn load_descriptor(&mut self, store: &ObjectStore, dict: &Dict) {
        if let Some(descriptor) = store.resolve_dict(dict.get(b"FontDescriptor")) {
            self.flags = store_f32(store, descriptor.get(b"Flags")).map(|f| f as u32);
            if let Some(mw) = store_f32(store, descriptor.get(b"MissingWidth")) {
                self.default_width = mw;
            }
        }
    }

    fn load_simple_widths(&mut self, store: &ObjectStore, dict: &Dict) {
        let first = store_f32(store, dict.get(b"FirstChar")).unwrap_or(0.0) as u32;
        if let Some(widths) = dict
            .get(b"Widths")
            .map(|o| store.resolve(o))
            .and_then(Object::as_array)
        {
            for (i, w) in widths.iter().enumerate() {
                if let Some(w) = store_f32(store, Some(w)) {
                    self.widths.insert(first + i as u32, w);
                }
            }
        }
    }

    /// CID width array: `c [w1 w2 ...]` runs and `c1 c2 w` ranges.
    fn load_cid_widths(&mut self, store: &ObjectStore, array: &[Object]) {
        let mut i = 0usize;
        while i < array.len() {
            let Some(start) = store_f32(store, array.get(i)).map(|v| v as u32) else {
                break;
            };
            match array.get(i + 1).map(|o| store.resolve(o)) {
                Some(Object::Array(ws)) => {
                    for (k, w) in ws.iter().enumerate() {
                        if let Some(w) = w.as_f32() {
                            self.widths.insert(start + k as u32, w);
                        }
                    }
                    i += 2;
                }
                Some(other) => {
                    let end = match other.as_f32() {
                        Some(v) => v as u32,
                        None => break,
                    };
                    let Some(w) = store_f32(store, array.get(i + 2)) else {
                        break;
                    };
                    for code in start..=end.min(start + 65_535) {
                        self.widths.insert(code, w);
                    }
                    i += 3;
                }
                None => break,
            }
        }
    }

    fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|c| {
                    if c.len() == 2 {
                        ((c[0] as u32) << 8) | c[1] as u32
                    } else {
                        c[0] as u32
                    }
                })
                .collect()
        } else {
            bytes.iter().map(|&b| b as u32).collect()
        }
    }

    fn width(&self, code: u32) -> f32 {
        self.widths.get(&code).copied().unwrap_or(self.default_width)
    }

    fn char_for(&self, code: u32) -> Option<String> {
        if let Some(cmap) = &self.to_unicode {
            if let Some(s) = cmap.lookup(code) {
                return Some(s.to_string());
            }
        }
        if self.two_byte {
            // Identity-encoded glyph ids carry no text meaning.
            return None;
        }
        Some(cp1252_char(code as u8).to_string())
    }
}

fn store_f32(store: &ObjectStore, object: Option<&Object>) -> Option<f32> {
    object.map(|o| store.resolve(o)).and_then(Object::as_f32)
}

/// CP1252 mapping for the 0x80..0xA0 range; everything else matches Latin-1.
fn cp1252_char(byte: u8) -> char {
    const HIGH: [char; 32] = [
        '\u{20AC}', '\u{FFFD}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}',
        '\u{2021}', '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{FFFD}',
        '\u{017D}', '\u{FFFD}', '\u{FFFD}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}',
        '\u{2022}', '\u{2013}', '\u{2014}', '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}',
        '\u{0153}', '\u{FFFD}', '\u{017E}', '\u{0178}',
    ];
    match byte {
        0x80..=0x9F => HIGH[(byte - 0x80) as usize],
        _ => byte as char,
    }
}

/// A ToUnicode character map.
pub struct CMap {
    map: HashMap<u32, String>,
}

impl CMap {
    /// Extract `bfchar` and `bfrange` sections; everything else in the CMap
    /// program is ignored.
    pub fn parse(data: &[u8]) -> Self {
        let mut map = HashMap::new();
        let mut lexer = Lexer::new(data);
        loop {
            lexer.skip_whitespace();
            let Some(b) = lexer.peek() else { break };
            if matches!(b, b'/' | b'(' | b'<' | b'[')
                || b == b'+'
                || b == b'-'
                || b == b'.'
                || b.is_ascii_digit()
            {
                if lexer.parse_object().is_err() {
                    lexer.pos += 1;
                }
                continue;
            }
            match lexer.read_token() {
                b"beginbfchar" => Self::parse_bfchar(&mut lexer, &mut map),
                b"beginbfrange" => Self::parse_bfrange(&mut lexer, &mut map),
                b"" => lexer.pos += 1,
                _ => {}
            }
        }
        Self { map }
    }

    fn parse_bfchar(lexer: &mut Lexer<'_>, map: &mut HashMap<u32, String>) {
        loop {
            lexer.skip_whitespace();
            match lexer.peek() {
                Some(b'<') => {
                    let src = lexer.parse_object().ok().and_then(|o| match o {
                        Object::String(s) => Some(s),
                        _ => None,
                    });
                    let dst = lexer.parse_object().ok().and_then(|o| match o {
                        Object::String(s) => Some(s),
                        _ => None,
                    });
                    if let (Some(src), Some(dst)) = (src, dst) {
                        map.insert(be_u32(&src), utf16be_to_string(&dst));
                    } else {
                        return;
                    }
                }
                _ => {
                    let _ = lexer.read_token(); // endbfchar
                    return;
                }
            }
        }
    }

    fn parse_bfrange(lexer: &mut Lexer<'_>, map: &mut HashMap<u32, String>) {
        loop {
            lexer.skip_whitespace();
            match lexer.peek() {
                Some(b'<') => {
                    let lo = match lexer.parse_object() {
                        Ok(Object::String(s)) => be_u32(&s),
                        _ => return,
                    };
                    let hi = match lexer.parse_object() {
                        Ok(Object::String(s)) => be_u32(&s),
                        _ => return,
                    };
                    if hi < lo || hi - lo > 65_535 {
                        return;
                    }
                    match lexer.parse_object() {
                        Ok(Object::String(dst)) => {
                            for (offset, code) in (lo..=hi).enumerate() {
                                map.insert(code, utf16be_offset(&dst, offset as u32));
                            }
                        }
                        Ok(Object::Array(items)) => {
                            for (offset, code) in (lo..=hi).enumerate() {
                                if let Some(Object::String(dst)) = items.get(offset) {
                                    map.insert(code, utf16be_to_string(dst));
                                }
                            }
                        }
                        _ => return,
                    }
                }
                _ => {
                    let _ = lexer.read_token(); // endbfrange
                    return;
                }
            }
        }
    }

    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn be_u32(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

fn utf16be_to_string(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| ((c[0] as u16) << 8) | c[1] as u16)
        .collect();
    String::from_utf16_lossy(&units)
}

/// Destination string with the final UTF-16 code unit advanced by `offset`.
fn utf16be_offset(bytes: &[u8], offset: u32) -> String {
    let mut units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| ((c[0] as u16) << 8) | c[1] as u16)
        .collect();
    if let Some(last) = units.last_mut() {
        *last = last.wrapping_add(offset as u16);
    }
    String::from_utf16_lossy(&units)
}
