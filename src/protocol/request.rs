use serde::Deserialize;

use crate::error::SaveError;

/// Entries per `iter_section` frame when the request does not say.
pub const DEFAULT_BATCH_SIZE: usize = 100;

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

/// One request line, tagged by `op`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    ExtractSections {
        sections: Vec<String>,
    },
    IterSection {
        section: String,
        #[serde(default = "default_batch_size")]
        batch_size: usize,
    },
    GetEntry {
        section: String,
        key: String,
    },
    GetEntries {
        section: String,
        keys: Vec<String>,
        #[serde(default)]
        fields: Option<Vec<String>>,
    },
    CountKeys {
        keys: Vec<String>,
    },
    ContainsTokens {
        tokens: Vec<String>,
        #[serde(default)]
        case_insensitive: bool,
    },
    /// Either a single `key`/`value` or a list of `pairs`.
    ContainsKv {
        #[serde(default)]
        key: Option<String>,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        pairs: Option<Vec<(String, String)>>,
    },
    GetSummaries {
        section: String,
        fields: Vec<String>,
    },
    GetCountrySummaries {
        fields: Vec<String>,
    },
    GetDuplicateValues {
        section: String,
        key: String,
        field: String,
    },
    GetEntryText {
        section: String,
        key: String,
    },
    /// Several non-streaming requests answered in one frame.
    Multi {
        ops: Vec<Request>,
    },
    Close,
}

impl Request {
    /// Decode one protocol line. Anything that is not a well-formed request
    /// becomes `InvalidRequest`.
    pub fn from_line(line: &[u8]) -> Result<Self, SaveError> {
        let text = std::str::from_utf8(line).map_err(|e| SaveError::InvalidRequest {
            message: format!("Request is not valid UTF-8: {}", e),
            hint: None,
        })?;

        serde_json::from_str(text).map_err(|e| SaveError::InvalidRequest {
            message: format!("Failed to parse request: {}", e),
            hint: Some(r#"Requests are single-line JSON objects such as {"op":"close"}"#.into()),
        })
    }

    pub fn op(&self) -> &'static str {
        match self {
            Request::ExtractSections { .. } => "extract_sections",
            Request::IterSection { .. } => "iter_section",
            Request::GetEntry { .. } => "get_entry",
            Request::GetEntries { .. } => "get_entries",
            Request::CountKeys { .. } => "count_keys",
            Request::ContainsTokens { .. } => "contains_tokens",
            Request::ContainsKv { .. } => "contains_kv",
            Request::GetSummaries { .. } => "get_summaries",
            Request::GetCountrySummaries { .. } => "get_country_summaries",
            Request::GetDuplicateValues { .. } => "get_duplicate_values",
            Request::GetEntryText { .. } => "get_entry_text",
            Request::Multi { .. } => "multi",
            Request::Close => "close",
        }
    }
}
