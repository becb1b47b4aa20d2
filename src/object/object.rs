//! PDF object representation.

use std::collections::BTreeMap;

/// Object number plus generation number.
pub type ObjectId = (u32, u16);

/// A PDF dictionary. Backed by a `BTreeMap` so iteration order — and
/// everything derived from it — is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dict(pub BTreeMap<Vec<u8>, Object>);

impl Dict {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, key: impl Into<Vec<u8>>, value: Object) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &[u8]) -> Option<&Object> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    pub fn get_name(&self, key: &[u8]) -> Option<&[u8]> {
        self.get(key).and_then(Object::as_name)
    }

    pub fn get_int(&self, key: &[u8]) -> Option<i64> {
        self.get(key).and_then(Object::as_int)
    }

    pub fn get_f32(&self, key: &[u8]) -> Option<f32> {
        self.get(key).and_then(Object::as_f32)
    }

    pub fn get_array(&self, key: &[u8]) -> Option<&[Object]> {
        self.get(key).and_then(Object::as_array)
    }

    pub fn get_string(&self, key: &[u8]) -> Option<&[u8]> {
        self.get(key).and_then(Object::as_string)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Object)> {
        self.0.iter()
    }
}

/// A PDF stream: dictionary plus raw (still encoded) data bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub dict: Dict,
    pub data: Vec<u8>,
}

/// A primitive PDF object.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f32),
    /// Literal or hex string bytes (already unescaped).
    String(Vec<u8>),
    /// Name bytes, without the leading slash.
    Name(Vec<u8>),
    Array(Vec<Object>),
    Dictionary(Dict),
    Stream(Stream),
    Reference(ObjectId),
}

impl Object {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            Object::Real(r) => Some(*r as i64),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&[u8]> {
        match self {
            Object::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Object]> {
        match self {
            Object::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Object::Stream(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            Object::Reference(id) => Some(*id),
            _ => None,
        }
    }

    /// Name equality check, `obj.is_name(b"XRef")`.
    pub fn is_name(&self, name: &[u8]) -> bool {
        self.as_name() == Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Object::Integer(7).as_f32(), Some(7.0));
        assert_eq!(Object::Real(2.5).as_int(), Some(2));
        assert_eq!(Object::Null.as_int(), None);
    }

    #[test]
    fn test_dict_typed_getters() {
        let mut dict = Dict::new();
        dict.insert(b"Type".to_vec(), Object::Name(b"Page".to_vec()));
        dict.insert(b"Count".to_vec(), Object::Integer(3));

        assert_eq!(dict.get_name(b"Type"), Some(b"Page".as_slice()));
        assert_eq!(dict.get_int(b"Count"), Some(3));
        assert!(dict.get(b"Missing").is_none());
    }

    #[test]
    fn test_stream_exposes_dict() {
        let mut dict = Dict::new();
        dict.insert(b"Length".to_vec(), Object::Integer(2));
        let obj = Object::Stream(Stream {
            dict,
            data: vec![1, 2],
        });
        assert_eq!(obj.as_dict().unwrap().get_int(b"Length"), Some(2));
    }
}
