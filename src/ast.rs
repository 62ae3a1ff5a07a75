// Author: Dustin Pilgrim
// License: MIT

use std::borrow::Borrow;
use std::fmt;

use indexmap::IndexMap;

use crate::utils::decode_text;

/// A string scalar kept as the raw bytes found in the save.
///
/// Save text mixes UTF-8 with Windows-1252 bytes and in-game colour markers
/// (0x15 and friends). Nothing is transcoded until the JSON boundary, see
/// [`Text::to_string_lossless`].
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Text(Vec<u8>);

impl Text {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Text(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The text as `&str` when it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Decodes valid UTF-8 runs as-is and every other byte as its
    /// Windows-1252 character.
    pub fn to_string_lossless(&self) -> String {
        decode_text(&self.0).into_owned()
    }
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", decode_text(&self.0))
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&decode_text(&self.0))
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Text(s.as_bytes().to_vec())
    }
}

impl From<String> for Text {
    fn from(s: String) -> Self {
        Text(s.into_bytes())
    }
}

// Lets `Object` look keys up by byte slice. Hashing matches `Vec<u8>`.
impl Borrow<[u8]> for Text {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for Text {
    fn from(b: &[u8]) -> Self {
        Text(b.to_vec())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(Text),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Array(Vec<Value>),
    Object(Object),
}

impl Value {
    pub fn as_object(&self) -> Option<&Object> {
        if let Value::Object(obj) = self {
            Some(obj)
        } else {
            None
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        if let Value::Array(items) = self {
            Some(items)
        } else {
            None
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        if let Value::String(t) = self {
            Some(t)
        } else {
            None
        }
    }

    /// Renders a scalar the way it would be written in the save.
    /// Containers return `None`.
    pub fn scalar_to_string(&self) -> Option<String> {
        match self {
            Value::String(t) => Some(t.to_string_lossless()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Bool(true) => Some("yes".into()),
            Value::Bool(false) => Some("no".into()),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Text::from(s))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Field {
    value: Value,
    /// Set when the key appeared more than once and `value` is the Array of
    /// every occurrence.
    repeated: bool,
}

/// Ordered key/value block.
///
/// Keys keep the bytes found in the save, so two keys are the same only
/// when their bytes are. They are decoded at the JSON boundary like values.
///
/// A key seen twice is promoted to an Array holding every occurrence in file
/// order. The promotion is remembered so `a={1 2}` (one occurrence of an
/// array) stays distinguishable from `a=1 a=2` (two occurrences).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Object {
    fields: IndexMap<Text, Field>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an object from pairs in file order, accumulating duplicates.
    pub fn from_pairs<K: Into<Text>>(pairs: Vec<(K, Value)>) -> Self {
        let mut obj = Object {
            fields: IndexMap::with_capacity(pairs.len()),
        };
        for (key, value) in pairs {
            obj.insert(key, value);
        }
        obj
    }

    /// Inserts a value; a second occurrence of `key` promotes the slot to an
    /// Array instead of replacing it.
    pub fn insert(&mut self, key: impl Into<Text>, value: Value) {
        let key = key.into();
        match self.fields.get_mut(&key) {
            Some(field) if field.repeated => {
                if let Value::Array(items) = &mut field.value {
                    items.push(value);
                }
            }
            Some(field) => {
                let first = std::mem::replace(&mut field.value, Value::Array(Vec::new()));
                field.value = Value::Array(vec![first, value]);
                field.repeated = true;
            }
            None => {
                self.fields.insert(
                    key,
                    Field {
                        value,
                        repeated: false,
                    },
                );
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key.as_bytes()).map(|f| &f.value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key.as_bytes())
    }

    pub fn is_repeated(&self, key: &str) -> bool {
        self.fields.get(key.as_bytes()).is_some_and(|f| f.repeated)
    }

    /// Every occurrence of `key`, in file order.
    pub fn get_all<'a>(&'a self, key: &str) -> Occurrences<'a> {
        match self.fields.get(key.as_bytes()) {
            Some(field) => Occurrences::of(field),
            None => Occurrences::None,
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Text> {
        self.fields.keys()
    }

    /// One item per distinct key; repeated keys yield their Array.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.fields.iter(),
        }
    }

    /// One item per source occurrence; repeated keys are expanded.
    pub fn iter_occurrences(&self) -> impl Iterator<Item = (&Text, &Value)> {
        self.fields
            .iter()
            .flat_map(|(k, f)| Occurrences::of(f).map(move |v| (k, v)))
    }

    /// Number of times `key` appeared in the source block.
    pub fn occurrences(&self, key: &str) -> usize {
        match self.fields.get(key.as_bytes()) {
            Some(Field {
                value: Value::Array(items),
                repeated: true,
            }) => items.len(),
            Some(_) => 1,
            None => 0,
        }
    }
}

pub struct Iter<'a> {
    inner: indexmap::map::Iter<'a, Text, Field>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a Text, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, f)| (k, &f.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

pub enum Occurrences<'a> {
    None,
    One(Option<&'a Value>),
    Many(std::slice::Iter<'a, Value>),
}

impl<'a> Occurrences<'a> {
    fn of(field: &'a Field) -> Self {
        match (&field.value, field.repeated) {
            (Value::Array(items), true) => Occurrences::Many(items.iter()),
            (value, _) => Occurrences::One(Some(value)),
        }
    }
}

impl<'a> Iterator for Occurrences<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Occurrences::None => None,
            Occurrences::One(v) => v.take(),
            Occurrences::Many(iter) => iter.next(),
        }
    }
}
