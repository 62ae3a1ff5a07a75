use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::debug;

use super::*;
use crate::store::SectionEntries;

/// Requested sections in request order. Any unknown name fails the whole
/// request.
pub fn extract_sections<'a>(save: &'a ParsedSave, names: &[String]) -> Result<IndexMap<String, &'a Value>, SaveError> {
    let mut out = IndexMap::with_capacity(names.len());
    for name in names {
        out.insert(name.clone(), save.require_section(name)?);
    }
    Ok(out)
}

/// Entries of a section in batches of at most `batch_size`, produced lazily.
pub fn iter_section<'a>(save: &'a ParsedSave, section: &str, batch_size: usize) -> Result<SectionBatches<'a>, SaveError> {
    if batch_size == 0 {
        return Err(SaveError::InvalidRequest {
            message: "batch_size must be at least 1".into(),
            hint: Some("Omit batch_size to use the default of 100".into()),
        });
    }

    let entries = save.iterate_section(section)?;
    debug!(section, batch_size, entries = entries.size_hint().0, "iterating section");
    Ok(SectionBatches { entries, batch_size })
}

pub struct SectionBatches<'a> {
    entries: SectionEntries<'a>,
    batch_size: usize,
}

impl<'a> Iterator for SectionBatches<'a> {
    type Item = Vec<EntryRef<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch: Vec<EntryRef<'a>> = self
            .entries
            .by_ref()
            .take(self.batch_size)
            .map(|(key, value)| EntryRef { key, value })
            .collect();

        if batch.is_empty() { None } else { Some(batch) }
    }
}

pub fn get_entry<'a>(save: &'a ParsedSave, section: &str, key: &str) -> Result<&'a Value, SaveError> {
    let value = save.require_section(section)?;
    lookup(section, value, key)?.ok_or_else(|| entry_not_found(section, key))
}

/// What a `get_entries` result carries besides its `_key`.
#[derive(Debug)]
pub enum Projection<'a> {
    /// Only the requested fields that the entry actually has.
    Fields(Vec<(&'a str, &'a Value)>),
    /// The whole entry, under `_value`.
    Whole(&'a Value),
}

#[derive(Debug)]
pub struct ProjectedEntry<'a> {
    pub key: &'a str,
    pub projection: Projection<'a>,
}

impl Serialize for ProjectedEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("_key", self.key)?;
        match &self.projection {
            Projection::Fields(fields) => {
                for (name, value) in fields {
                    map.serialize_entry(name, value)?;
                }
            }
            Projection::Whole(value) => map.serialize_entry("_value", value)?,
        }
        map.end()
    }
}

#[derive(Debug, Serialize)]
pub struct Entries<'a> {
    pub entries: Vec<ProjectedEntry<'a>>,
    pub missing: Vec<&'a str>,
}

/// Batch lookup. With `fields`, object entries are cut down to those
/// fields; without it, or for non-object entries, the whole value is
/// returned. Keys that do not exist are listed in `missing`.
pub fn get_entries<'a>(
    save: &'a ParsedSave,
    section: &str,
    keys: &'a [String],
    fields: Option<&'a [String]>,
) -> Result<Entries<'a>, SaveError> {
    let value = save.require_section(section)?;
    let mut entries = Vec::with_capacity(keys.len());
    let mut missing = Vec::new();

    for key in keys {
        let Some(entry) = lookup(section, value, key)? else {
            missing.push(key.as_str());
            continue;
        };

        let projection = match (fields, entry) {
            (Some(fields), Value::Object(obj)) => Projection::Fields(
                fields
                    .iter()
                    .filter_map(|f| obj.get(f).map(|v| (f.as_str(), v)))
                    .collect(),
            ),
            _ => Projection::Whole(entry),
        };
        entries.push(ProjectedEntry {
            key: key.as_str(),
            projection,
        });
    }

    Ok(Entries { entries, missing })
}

/// `{id, <fields>}` for every entry of a section.
#[derive(Debug)]
pub struct Summary<'a> {
    pub id: Cow<'a, str>,
    pub fields: Vec<(&'a str, &'a Value)>,
}

impl Serialize for Summary<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry("id", &self.id)?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

pub fn summarize_section<'a>(save: &'a ParsedSave, section: &str, fields: &'a [String]) -> Result<Vec<Summary<'a>>, SaveError> {
    let summaries = save
        .iterate_section(section)?
        .map(|(id, value)| {
            let fields = match value {
                Value::Object(obj) => fields
                    .iter()
                    .filter_map(|f| obj.get(f).map(|v| (f.as_str(), v)))
                    .collect(),
                _ => Vec::new(),
            };
            Summary { id, fields }
        })
        .collect();
    Ok(summaries)
}
