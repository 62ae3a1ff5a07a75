// Author: Dustin Pilgrim
// License: MIT

use std::io::Write;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::ast::{Object, Text, Value};
use crate::error::{SaveError, SCHEMA_VERSION, TOOL_VERSION};
use crate::utils::decode_text;

/// Save values map onto JSON as:
/// - String -> JSON string (decoded only here, see [`decode_text`])
/// - Integer, Float, Bool -> JSON number / bool
/// - Array -> JSON array
/// - Object -> JSON object in file order; repeated keys appear once with an
///   array of every occurrence
///
/// Values serialize by reference so streamed entries never need a clone of
/// the tree.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(t) => t.serialize(serializer),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) if f.is_finite() => serializer.serialize_f64(*f),
            Value::Float(_) => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(obj) => obj.serialize(serializer),
        }
    }
}

impl Serialize for Object {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for Text {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&decode_text(self.as_bytes()))
    }
}

/// Top-level names of the one-shot extraction document.
const ENVELOPE_FIELDS: [&str; 2] = ["schema_version", "tool_version"];

/// The one-shot extraction document:
/// `{"schema_version":1,"tool_version":"..","<section>":{..},..}`.
///
/// Sections are borrowed from the save and serialized in place.
pub struct Extraction<'a> {
    sections: &'a IndexMap<String, &'a Value>,
}

impl<'a> Extraction<'a> {
    /// Fails when a section name would shadow an envelope field.
    pub fn new(sections: &'a IndexMap<String, &'a Value>) -> Result<Self, SaveError> {
        if let Some(name) = sections.keys().find(|k| ENVELOPE_FIELDS.contains(&k.as_str())) {
            return Err(SaveError::InvalidRequest {
                message: format!("Section '{}' collides with an envelope field", name),
                hint: Some("Read it with extract_sections over serve instead".into()),
            });
        }
        Ok(Extraction { sections })
    }

    /// Pretty-print the document to `out`.
    pub fn write_pretty<W: Write>(&self, out: W) -> Result<(), SaveError> {
        serde_json::to_writer_pretty(out, self).map_err(|e| {
            if e.is_io() {
                SaveError::Io {
                    message: e.to_string(),
                    path: "<output>".into(),
                    hint: None,
                }
            } else {
                SaveError::internal(format!("JSON serialization failed: {}", e))
            }
        })
    }
}

impl Serialize for Extraction<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len() + ENVELOPE_FIELDS.len()))?;
        map.serialize_entry("schema_version", &SCHEMA_VERSION)?;
        map.serialize_entry("tool_version", TOOL_VERSION)?;
        for (name, value) in self.sections {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_export_preserves_file_order() {
        let doc = parse(b"z=1 a=2 m=3").unwrap();
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(json, r#"{"z":1,"a":2,"m":3}"#);
    }

    #[test]
    fn test_export_duplicates_as_array() {
        let doc = parse(b"x=1 x=2 x=3").unwrap();
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(json, r#"{"x":[1,2,3]}"#);
    }

    #[test]
    fn test_export_meta_section() {
        let doc = parse(br#"meta={date="2250.03.15" version=5}"#).unwrap();
        let json = serde_json::to_string(doc.get("meta").unwrap()).unwrap();
        assert_eq!(json, r#"{"date":"2250.03.15","version":5}"#);
    }

    #[test]
    fn test_export_windows1252_string() {
        let doc = parse(b"test={name=\"Hello\x92World\" currency=\"\x80\"}").unwrap();
        let v = serde_json::to_value(doc.get("test").unwrap()).unwrap();
        assert_eq!(v["name"], "Hello\u{2019}World");
        assert_eq!(v["currency"], "\u{20AC}");
    }

    #[test]
    fn test_export_floats_and_bools() {
        let doc = parse(b"f=1.5 b=yes").unwrap();
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(json, r#"{"f":1.5,"b":true}"#);
    }

    #[test]
    fn test_export_sections_envelope() {
        let doc = parse(b"player={ { name=\"p\" country=0 } } other=1").unwrap();
        let mut sections = IndexMap::new();
        sections.insert("player".to_string(), doc.get("player").unwrap());

        let mut out = Vec::new();
        Extraction::new(&sections).unwrap().write_pretty(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("{\n  \"schema_version\": 1,\n  \"tool_version\""));

        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["player"][0]["country"], 0);
        assert!(v.get("other").is_none());
    }

    #[test]
    fn test_export_rejects_envelope_section_names() {
        let doc = parse(b"schema_version=7 tool_version=\"x\"").unwrap();
        for name in ["schema_version", "tool_version"] {
            let mut sections = IndexMap::new();
            sections.insert(name.to_string(), doc.get(name).unwrap());

            let err = Extraction::new(&sections).err().unwrap();
            assert_eq!(err.code(), "InvalidRequest");
            assert!(err.message().contains(name));
        }
    }

    #[test]
    fn test_export_decodes_keys_at_boundary() {
        let doc = parse(b"k={ \"caf\xe9\"=1 }").unwrap();
        let json = serde_json::to_string(doc.get("k").unwrap()).unwrap();
        assert_eq!(json, "{\"caf\u{e9}\":1}");
    }
}
