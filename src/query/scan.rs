use std::collections::HashMap;
use std::ops::ControlFlow;

use indexmap::IndexMap;
use tracing::debug;

use super::*;
use crate::ast::{Object, Text};
use crate::parser::interpret_scalar;

/// Visit every `(key, value)` occurrence below `root`, depth-first, with an
/// explicit stack. Repeated keys are visited once per occurrence.
fn walk<'a>(root: &'a Object, mut visit: impl FnMut(&'a Text, &'a Value) -> ControlFlow<()>) {
    let mut objects: Vec<&'a Object> = vec![root];
    let mut arrays: Vec<&'a [Value]> = Vec::new();

    loop {
        if let Some(obj) = objects.pop() {
            for (key, value) in obj.iter_occurrences() {
                if visit(key, value).is_break() {
                    return;
                }
                push_children(value, &mut objects, &mut arrays);
            }
        } else if let Some(items) = arrays.pop() {
            for item in items {
                push_children(item, &mut objects, &mut arrays);
            }
        } else {
            return;
        }
    }
}

fn push_children<'a>(value: &'a Value, objects: &mut Vec<&'a Object>, arrays: &mut Vec<&'a [Value]>) {
    match value {
        Value::Object(obj) => objects.push(obj),
        Value::Array(items) => arrays.push(items),
        _ => {}
    }
}

/// How often each key name occurs anywhere in the gamestate, all keys
/// counted in the same traversal. Keys match byte for byte.
pub fn count_keys(save: &ParsedSave, keys: &[String]) -> IndexMap<String, usize> {
    let mut counts: IndexMap<String, usize> = keys.iter().map(|k| (k.clone(), 0)).collect();
    if counts.is_empty() {
        return counts;
    }

    walk(save.root(), |key, _| {
        if let Some(count) = key.as_str().and_then(|k| counts.get_mut(k)) {
            *count += 1;
        }
        ControlFlow::Continue(())
    });
    counts
}

/// A `key=value` assignment to look for, normalised once.
#[derive(Debug, Clone, PartialEq)]
pub struct KvPattern {
    key: String,
    text: String,
    number: Option<f64>,
    label: String,
}

impl KvPattern {
    pub fn new(key: &str, value: &str) -> Self {
        let text = normalize(value).to_string();
        let number = match interpret_scalar(text.as_bytes()) {
            Value::Integer(i) => Some(i as f64),
            Value::Float(f) => Some(f),
            _ => None,
        };

        KvPattern {
            key: key.trim().to_string(),
            number,
            label: format!("{}={}", key, value),
            text,
        }
    }

    /// `key=value` as given by the caller, used as the result key.
    pub fn label(&self) -> &str {
        &self.label
    }

    fn matches(&self, value: &Value) -> bool {
        match value {
            Value::String(t) => normalize(&t.to_string_lossless()) == self.text,
            Value::Integer(i) => self.number == Some(*i as f64),
            Value::Float(f) => self.number == Some(*f),
            Value::Bool(true) => self.text == "yes",
            Value::Bool(false) => self.text == "no",
            Value::Array(_) | Value::Object(_) => false,
        }
    }
}

/// Trim whitespace and one pair of surrounding quotes.
fn normalize(s: &str) -> &str {
    let trimmed = s.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .map_or(trimmed, str::trim)
}

/// Whether some occurrence of `key` anywhere in the gamestate is assigned
/// the scalar `value`.
pub fn contains_kv(save: &ParsedSave, key: &str, value: &str) -> Result<bool, SaveError> {
    let found = contains_kv_pairs(save, &[KvPattern::new(key, value)])?;
    Ok(found.values().any(|hit| *hit))
}

/// Batched `contains_kv`, one traversal for every pattern. Results are
/// keyed by each pattern's label.
pub fn contains_kv_pairs(save: &ParsedSave, patterns: &[KvPattern]) -> Result<IndexMap<String, bool>, SaveError> {
    if patterns.iter().any(|p| p.key.is_empty()) {
        return Err(SaveError::invalid_request("contains_kv keys must not be empty"));
    }

    let mut found: IndexMap<String, bool> = patterns.iter().map(|p| (p.label.clone(), false)).collect();
    let mut by_key: HashMap<&str, Vec<&KvPattern>> = HashMap::new();
    for pattern in patterns {
        by_key.entry(pattern.key.as_str()).or_default().push(pattern);
    }

    let mut remaining = found.len();
    walk(save.root(), |key, value| {
        let Some(candidates) = key.as_str().and_then(|k| by_key.get(k)) else {
            return ControlFlow::Continue(());
        };
        for pattern in candidates {
            if pattern.matches(value) {
                if let Some(hit) = found.get_mut(&pattern.label) {
                    if !*hit {
                        *hit = true;
                        remaining -= 1;
                    }
                }
            }
        }
        if remaining == 0 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });

    debug!(patterns = found.len(), "key/value scan finished");
    Ok(found)
}

/// Every occurrence of `field` inside one entry, rendered as text.
///
/// `None` when the entry does not exist. Container occurrences are skipped.
pub fn duplicate_values(save: &ParsedSave, section: &str, key: &str, field: &str) -> Result<Option<Vec<String>>, SaveError> {
    let value = save.require_section(section)?;
    let Some(entry) = lookup(section, value, key)? else {
        return Ok(None);
    };

    let values = match entry {
        Value::Object(obj) => obj.get_all(field).filter_map(Value::scalar_to_string).collect(),
        _ => Vec::new(),
    };
    Ok(Some(values))
}
