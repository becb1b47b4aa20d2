//! Materialized object arena and page-tree traversal.
//!
//! All referenced objects are parsed up front into a map keyed by object
//! number. Decryption (if any) runs over the arena before object streams
//! are expanded, since compressed objects inherit the clear state of their
//! container stream.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{Warning, WarningKind};

use super::filters::decode_stream_data;
use super::lexer::Lexer;
use super::object::{Dict, Object, ObjectId};
use super::xref::{fallback_scan, load_xref, XrefEntry, XrefTable};

const MAX_RESOLVE_DEPTH: usize = 32;

static NULL_OBJECT: Object = Object::Null;

/// A page leaf with its inherited attributes resolved.
#[derive(Debug, Clone)]
pub struct PageNode {
    pub dict: Dict,
    /// `[x0 y0 x1 y1]` media box in points.
    pub media_box: [f32; 4],
    /// Clockwise rotation in degrees, normalized to 0/90/180/270.
    pub rotation: i32,
    pub resources: Dict,
}

/// Arena of materialized indirect objects plus the merged trailer.
pub struct ObjectStore {
    objects: HashMap<u32, (u16, Object)>,
    pub trailer: Dict,
}

impl ObjectStore {
    /// Materialize every object the cross-reference table points at.
    ///
    /// A broken xref degrades to a full-file scan rather than failing, with
    /// a warning recorded. Object streams are left unexpanded; call
    /// [`expand_object_streams`](Self::expand_object_streams) once the arena
    /// is in the clear.
    pub fn load(data: &[u8], warnings: &mut Vec<Warning>) -> Result<Self> {
        let table = match load_xref(data) {
            Ok(table) => table,
            Err(err) => {
                warn!("xref unusable ({}), scanning for objects", err);
                warnings.push(Warning::new(
                    WarningKind::DegradedParse,
                    format!("cross-reference table unusable ({}), rebuilt by scan", err),
                ));
                fallback_scan(data)?
            }
        };

        let mut store = Self {
            objects: HashMap::new(),
            trailer: table.trailer.clone(),
        };
        store.materialize(data, &table, warnings)?;

        if store.objects.is_empty() {
            return Err(Error::Corrupt("no objects could be parsed".to_string()));
        }
        if store.trailer.get(b"Root").is_none() {
            store.reconstruct_root()?;
        }
        Ok(store)
    }

    fn materialize(
        &mut self,
        data: &[u8],
        table: &XrefTable,
        warnings: &mut Vec<Warning>,
    ) -> Result<()> {
        let mut bad = 0usize;
        for (&id, &entry) in &table.entries {
            let XrefEntry::Offset(offset) = entry else {
                continue;
            };
            if offset as usize >= data.len() {
                bad += 1;
                continue;
            }
            let mut lexer = Lexer::at(data, offset as usize);
            match lexer.parse_indirect_object() {
                Ok(((num, gen), object)) => {
                    // Tolerate headers that disagree with the table.
                    let key = if num == id { id } else { num };
                    self.objects.insert(key, (gen, object));
                }
                Err(err) => {
                    debug!("object {} at offset {} unreadable: {}", id, offset, err);
                    bad += 1;
                }
            }
        }
        if bad > 0 {
            warnings.push(Warning::new(
                WarningKind::DegradedParse,
                format!("{} cross-referenced objects could not be parsed", bad),
            ));
        }
        Ok(())
    }

    /// Patch a missing `/Root` by locating the catalog dictionary.
    fn reconstruct_root(&mut self) -> Result<()> {
        let mut ids: Vec<u32> = self
            .objects
            .iter()
            .filter(|(_, (_, obj))| {
                obj.as_dict()
                    .map(|d| d.get_name(b"Type") == Some(b"Catalog".as_slice()))
                    .unwrap_or(false)
            })
            .map(|(&id, _)| id)
            .collect();
        ids.sort_unstable();
        match ids.last() {
            Some(&id) => {
                self.trailer
                    .insert(b"Root".to_vec(), Object::Reference((id, 0)));
                Ok(())
            }
            None => Err(Error::Corrupt("document has no catalog".to_string())),
        }
    }

    /// Visit every materialized object mutably, in object-number order.
    pub fn for_each_object_mut(&mut self, mut f: impl FnMut(ObjectId, &mut Object)) {
        let mut ids: Vec<u32> = self.objects.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            if let Some((gen, obj)) = self.objects.get_mut(&id) {
                f((id, *gen), obj);
            }
        }
    }

    /// Inline the contents of every `/Type /ObjStm` stream into the arena.
    /// Objects already present keep priority over compressed copies.
    pub fn expand_object_streams(&mut self, warnings: &mut Vec<Warning>) {
        let container_ids: Vec<u32> = self
            .objects
            .iter()
            .filter(|(_, (_, obj))| {
                obj.as_stream()
                    .map(|s| s.dict.get_name(b"Type") == Some(b"ObjStm".as_slice()))
                    .unwrap_or(false)
            })
            .map(|(&id, _)| id)
            .collect();

        for container_id in container_ids {
            let Some((_, Object::Stream(stream))) = self.objects.get(&container_id) else {
                continue;
            };
            let stream = stream.clone();
            match self.expand_one_stream(&stream.dict, &stream.data) {
                Ok(expanded) => {
                    for (id, object) in expanded {
                        self.objects.entry(id).or_insert((0, object));
                    }
                }
                Err(err) => {
                    warnings.push(Warning::new(
                        WarningKind::DegradedParse,
                        format!("object stream {} unreadable: {}", container_id, err),
                    ));
                }
            }
        }
    }

    fn expand_one_stream(&self, dict: &Dict, data: &[u8]) -> Result<Vec<(u32, Object)>> {
        let decoded = decode_stream_data(dict, data)?;
        let count = self
            .resolve_int(dict.get(b"N"))
            .ok_or_else(|| Error::Corrupt("object stream missing /N".to_string()))?;
        let first = self
            .resolve_int(dict.get(b"First"))
            .ok_or_else(|| Error::Corrupt("object stream missing /First".to_string()))?;
        if count < 0 || first < 0 {
            return Err(Error::Corrupt("bad object stream header".to_string()));
        }
        let first = first as usize;

        // Header: N pairs of (object number, offset relative to /First).
        let mut header = Lexer::new(&decoded);
        let mut pairs = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let num = match header.parse_number()? {
                Object::Integer(n) if n >= 0 => n as u32,
                _ => return Err(Error::Corrupt("bad object stream pair".to_string())),
            };
            let offset = match header.parse_number()? {
                Object::Integer(o) if o >= 0 => o as usize,
                _ => return Err(Error::Corrupt("bad object stream pair".to_string())),
            };
            pairs.push((num, offset));
        }

        let mut out = Vec::with_capacity(pairs.len());
        for (num, offset) in pairs {
            let at = first + offset;
            if at >= decoded.len() {
                return Err(Error::Corrupt("object stream offset out of range".to_string()));
            }
            let object = Lexer::at(&decoded, at).parse_object()?;
            out.push((num, object));
        }
        Ok(out)
    }

    pub fn get(&self, id: u32) -> Option<&Object> {
        self.objects.get(&id).map(|(_, obj)| obj)
    }

    /// Follow reference chains to a concrete object. Broken or circular
    /// references resolve to `Null`.
    pub fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        let mut current = object;
        for _ in 0..MAX_RESOLVE_DEPTH {
            match current {
                Object::Reference((id, _)) => match self.get(*id) {
                    Some(next) => current = next,
                    None => return &NULL_OBJECT,
                },
                _ => return current,
            }
        }
        &NULL_OBJECT
    }

    pub fn resolve_dict<'a>(&'a self, object: Option<&'a Object>) -> Option<&'a Dict> {
        object.map(|o| self.resolve(o)).and_then(Object::as_dict)
    }

    fn resolve_int(&self, object: Option<&Object>) -> Option<i64> {
        object.map(|o| self.resolve(o)).and_then(Object::as_int)
    }

    fn resolve_f32(&self, object: Option<&Object>) -> Option<f32> {
        object.map(|o| self.resolve(o)).and_then(Object::as_f32)
    }

    /// The document catalog.
    pub fn catalog(&self) -> Result<&Dict> {
        let root = self
            .trailer
            .get(b"Root")
            .ok_or_else(|| Error::Corrupt("trailer has no /Root".to_string()))?;
        self.resolve_dict(Some(root))
            .ok_or_else(|| Error::Corrupt("/Root is not a dictionary".to_string()))
    }

    /// The document information dictionary, if present.
    pub fn info(&self) -> Option<&Dict> {
        self.resolve_dict(self.trailer.get(b"Info"))
    }

    /// Walk the page tree depth-first, resolving inherited attributes.
    pub fn pages(&self) -> Result<Vec<PageNode>> {
        let catalog = self.catalog()?;
        let pages_root = self
            .resolve_dict(catalog.get(b"Pages"))
            .ok_or_else(|| Error::Corrupt("catalog has no /Pages tree".to_string()))?;

        let inherited = Inherited::default();
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        self.walk_pages(pages_root, &inherited, &mut visited, &mut out, 0)?;
        if out.is_empty() {
            return Err(Error::Corrupt("page tree contains no pages".to_string()));
        }
        Ok(out)
    }

    fn walk_pages(
        &self,
        node: &Dict,
        inherited: &Inherited,
        visited: &mut HashSet<usize>,
        out: &mut Vec<PageNode>,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_RESOLVE_DEPTH {
            return Err(Error::Corrupt("page tree too deep".to_string()));
        }

        let mut local = inherited.clone();
        if let Some(mb) = self.media_box_of(node) {
            local.media_box = Some(mb);
        }
        if let Some(rotate) = self.resolve_int(node.get(b"Rotate")) {
            local.rotation = Some(rotate as i32);
        }
        if let Some(resources) = self.resolve_dict(node.get(b"Resources")) {
            local.resources = Some(resources.clone());
        }

        match node.get_name(b"Type") {
            Some(b"Pages") | None => {
                let kids = node
                    .get(b"Kids")
                    .map(|k| self.resolve(k))
                    .and_then(Object::as_array)
                    .ok_or_else(|| Error::Corrupt("pages node has no /Kids".to_string()))?;
                for kid in kids {
                    // Cycle guard keyed on the reference target.
                    if let Some((id, _)) = kid.as_reference() {
                        if !visited.insert(id as usize) {
                            continue;
                        }
                    }
                    if let Some(kid_dict) = self.resolve_dict(Some(kid)) {
                        self.walk_pages(kid_dict, &local, visited, out, depth + 1)?;
                    }
                }
                Ok(())
            }
            Some(b"Page") => {
                let media_box = local.media_box.unwrap_or([0.0, 0.0, 612.0, 792.0]);
                let rotation = local.rotation.unwrap_or(0).rem_euclid(360) / 90 * 90;
                out.push(PageNode {
                    dict: node.clone(),
                    media_box,
                    rotation,
                    resources: local.resources.unwrap_or_default(),
                });
                Ok(())
            }
            Some(other) => Err(Error::Corrupt(format!(
                "unexpected page tree node type '{}'",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    fn media_box_of(&self, node: &Dict) -> Option<[f32; 4]> {
        let array = node
            .get(b"MediaBox")
            .map(|o| self.resolve(o))
            .and_then(Object::as_array)?;
        if array.len() != 4 {
            return None;
        }
        let mut mb = [0.0f32; 4];
        for (slot, obj) in mb.iter_mut().zip(array.iter()) {
            *slot = self.resolve_f32(Some(obj))?;
        }
        Some(mb)
    }

    /// Content stream bytes of a page, concatenating `/Contents` arrays.
    pub fn page_content(&self, page: &Dict) -> Result<Vec<u8>> {
        let contents = match page.get(b"Contents") {
            Some(c) => self.resolve(c),
            None => return Ok(Vec::new()),
        };
        let mut out = Vec::new();
        match contents {
            Object::Stream(s) => out.extend(decode_stream_data(&s.dict, &s.data)?),
            Object::Array(items) => {
                for item in items {
                    if let Some(s) = self.resolve(item).as_stream() {
                        out.extend(decode_stream_data(&s.dict, &s.data)?);
                        // Streams in an array are implicitly whitespace-joined.
                        out.push(b'\n');
                    }
                }
            }
            _ => {}
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Default)]
struct Inherited {
    media_box: Option<[f32; 4]>,
    rotation: Option<i32>,
    resources: Option<Dict>,
}
