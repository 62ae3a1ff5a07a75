// Author: Dustin Pilgrim
// License: MIT

use std::borrow::Cow;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, info};

use crate::ast::{Iter, Object, Value};
use crate::error::SaveError;
use crate::parser;
use crate::utils::{decode_text, format_bytes, format_elapsed};

mod archive;

pub use archive::{read_save_file, resolve_save_path, SaveFiles};

/// One loaded save: the raw gamestate buffer and the tree parsed from it.
///
/// Built once and never mutated. The raw bytes back substring search only;
/// every structured query goes through the tree.
pub struct ParsedSave {
    raw: Vec<u8>,
    root: Object,
    meta: Option<Value>,
}

impl ParsedSave {
    /// Load a save from disk. `.sav` archives are detected by their ZIP
    /// signature, anything else is read as plain gamestate text.
    ///
    /// # Example
    /// ```ignore
    /// let save = ParsedSave::load("~/saves/autosave.sav")?;
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SaveError> {
        let started = Instant::now();
        let resolved = resolve_save_path(path.as_ref())?;
        let files = read_save_file(&resolved)?;
        let save = Self::from_bytes(files.gamestate, files.meta)?;

        info!(
            path = %resolved.display(),
            size = %format_bytes(save.raw.len() as u64),
            sections = save.root.len(),
            elapsed = %format_elapsed(started.elapsed()),
            "save loaded"
        );
        Ok(save)
    }

    /// Load a plain gamestate text file, never treating it as an archive.
    pub fn load_gamestate<P: AsRef<Path>>(path: P) -> Result<Self, SaveError> {
        let started = Instant::now();
        let resolved = resolve_save_path(path.as_ref())?;
        let raw = std::fs::read(&resolved)
            .map_err(|e| SaveError::io(resolved.display().to_string(), &e))?;
        let save = Self::from_bytes(raw, None)?;

        info!(
            path = %resolved.display(),
            size = %format_bytes(save.raw.len() as u64),
            elapsed = %format_elapsed(started.elapsed()),
            "gamestate loaded"
        );
        Ok(save)
    }

    /// Parse already-read buffers. `meta` is the separate meta sub-file of
    /// an archive, if there was one.
    pub fn from_bytes(gamestate: Vec<u8>, meta: Option<Vec<u8>>) -> Result<Self, SaveError> {
        let root = parser::parse(&gamestate)?;
        debug!(sections = root.len(), "gamestate parsed");

        let meta = match meta {
            Some(bytes) => Some(Value::Object(parser::parse(&bytes)?)),
            None => None,
        };

        Ok(Self {
            raw: gamestate,
            root,
            meta,
        })
    }

    /// Look up a top-level section. `meta` prefers the archive's meta file
    /// over a gamestate section of the same name.
    pub fn get_section(&self, name: &str) -> Option<&Value> {
        if name == "meta" {
            if let Some(meta) = &self.meta {
                return Some(meta);
            }
        }
        self.root.get(name)
    }

    pub fn require_section(&self, name: &str) -> Result<&Value, SaveError> {
        self.get_section(name)
            .ok_or_else(|| SaveError::SectionNotFound {
                section: name.to_string(),
            })
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.get_section(name).is_some()
    }

    /// Walk the entries of a section in file order without copying them.
    ///
    /// Object sections yield their keys, Array sections their index.
    pub fn iterate_section(&self, name: &str) -> Result<SectionEntries<'_>, SaveError> {
        match self.require_section(name)? {
            Value::Object(obj) => Ok(SectionEntries::Object(obj.iter())),
            Value::Array(items) => Ok(SectionEntries::Array(items.iter().enumerate())),
            _ => Err(SaveError::InvalidRequest {
                message: format!("Section '{}' is a scalar and has no entries", name),
                hint: Some("Use extract_sections to read scalar sections".into()),
            }),
        }
    }

    /// Top-level section names in file order, followed by `meta` when it
    /// only exists as a separate file.
    pub fn section_names(&self) -> Vec<Cow<'_, str>> {
        let mut names: Vec<Cow<'_, str>> = self.root.keys().map(|k| decode_text(k.as_bytes())).collect();
        if self.meta.is_some() && !self.root.contains_key("meta") {
            names.push(Cow::Borrowed("meta"));
        }
        names
    }

    /// The raw gamestate bytes, for substring search only.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn root(&self) -> &Object {
        &self.root
    }

    pub fn meta(&self) -> Option<&Object> {
        self.meta.as_ref().and_then(Value::as_object)
    }
}

/// Lazy `(key, value)` walk over one section.
pub enum SectionEntries<'a> {
    Object(Iter<'a>),
    Array(std::iter::Enumerate<std::slice::Iter<'a, Value>>),
}

impl<'a> Iterator for SectionEntries<'a> {
    type Item = (Cow<'a, str>, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            SectionEntries::Object(iter) => iter.next().map(|(k, v)| (decode_text(k.as_bytes()), v)),
            SectionEntries::Array(iter) => iter.next().map(|(i, v)| (Cow::Owned(i.to_string()), v)),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            SectionEntries::Object(iter) => iter.size_hint(),
            SectionEntries::Array(iter) => iter.size_hint(),
        }
    }
}
