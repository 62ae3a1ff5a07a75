// Author: Dustin Pilgrim
// License: MIT

//! Read-only queries over a [`ParsedSave`]. Nothing here parses save text
//! again; `entry_text` only runs the lexer to find byte offsets.

use std::borrow::Cow;

use serde::Serialize;

use crate::ast::Value;
use crate::error::SaveError;
use crate::store::ParsedSave;

mod scan;
mod sections;
mod text;
mod tokens;

pub use scan::{contains_kv, contains_kv_pairs, count_keys, duplicate_values, KvPattern};
pub use sections::{
    extract_sections, get_entries, get_entry, iter_section, summarize_section, Entries,
    ProjectedEntry, Projection, SectionBatches, Summary,
};
pub use text::entry_text;
pub use tokens::contains_tokens;

/// One `(key, value)` pair of a section, borrowed from the tree.
#[derive(Debug, Clone, Serialize)]
pub struct EntryRef<'a> {
    pub key: Cow<'a, str>,
    pub value: &'a Value,
}

/// Find `key` inside a section value. Array sections are addressed by
/// their zero-based index.
pub(crate) fn lookup<'a>(section: &str, value: &'a Value, key: &str) -> Result<Option<&'a Value>, SaveError> {
    match value {
        Value::Object(obj) => Ok(obj.get(key)),
        Value::Array(items) => Ok(key.parse::<usize>().ok().and_then(|i| items.get(i))),
        _ => Err(scalar_section(section)),
    }
}

pub(crate) fn scalar_section(section: &str) -> SaveError {
    SaveError::InvalidRequest {
        message: format!("Section '{}' is a scalar and has no entries", section),
        hint: Some("Use extract_sections to read scalar sections".into()),
    }
}

fn entry_not_found(section: &str, key: &str) -> SaveError {
    SaveError::EntryNotFound {
        section: section.to_string(),
        key: key.to_string(),
    }
}

#[cfg(test)]
mod tests;
