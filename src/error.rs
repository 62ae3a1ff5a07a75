// Author: Dustin Pilgrim
// License: MIT

use thiserror::Error;

/// Version of the JSON contract emitted by every command and session frame.
pub const SCHEMA_VERSION: u32 = 1;
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit codes shared by the one-shot commands and the `exit_code` field of
/// session error frames.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const IO: i32 = 1;
    pub const PARSE: i32 = 2;
    pub const INVALID_ARGUMENT: i32 = 3;
}

/// The main error type for loading, parsing and querying saves.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SaveError {
    #[error("I/O error on '{path}': {message}{}", fmt_hint(.hint))]
    Io {
        message: String,
        path: String,
        hint: Option<String>,
    },
    /// Raised when the Clausewitz text is malformed. Parsing aborts at the
    /// first error instead of guessing.
    #[error("Parse error at {line}:{col} (byte {byte_offset}): {message}{}", fmt_hint(.hint))]
    Parse {
        message: String,
        line: usize,
        col: usize,
        byte_offset: usize,
        context: String,
        hint: Option<String>,
    },
    #[error("Section '{section}' not found")]
    SectionNotFound { section: String },
    #[error("Entry '{key}' not found in section '{section}'")]
    EntryNotFound { section: String, key: String },
    #[error("Invalid request: {message}{}", fmt_hint(.hint))]
    InvalidRequest {
        message: String,
        hint: Option<String>,
    },
    /// Unreachable states that must still be answered with a frame.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn fmt_hint(hint: &Option<String>) -> String {
    hint.as_ref()
        .map_or(String::new(), |h| format!(" Hint: {}", h))
}

impl SaveError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        SaveError::InvalidRequest {
            message: message.into(),
            hint: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        SaveError::Internal {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        SaveError::Io {
            message: err.to_string(),
            path: path.into(),
            hint: match err.kind() {
                std::io::ErrorKind::NotFound => {
                    Some("Check that the save file exists and is readable".into())
                }
                _ => None,
            },
        }
    }

    /// Stable machine-readable code carried in the `error` field of frames.
    pub fn code(&self) -> &'static str {
        match self {
            SaveError::Io { .. } => "IoError",
            SaveError::Parse { .. } => "ParseError",
            SaveError::SectionNotFound { .. } => "SectionNotFound",
            SaveError::EntryNotFound { .. } => "EntryNotFound",
            SaveError::InvalidRequest { .. } => "InvalidRequest",
            SaveError::Internal { .. } => "Internal",
        }
    }

    /// Exit code an equivalent one-shot command would have used.
    pub fn exit_code(&self) -> i32 {
        match self {
            SaveError::Io { .. } | SaveError::Internal { .. } => exit_code::IO,
            SaveError::Parse { .. }
            | SaveError::SectionNotFound { .. }
            | SaveError::EntryNotFound { .. } => exit_code::PARSE,
            SaveError::InvalidRequest { .. } => exit_code::INVALID_ARGUMENT,
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            SaveError::Parse { line, .. } => Some(*line),
            _ => None,
        }
    }

    pub fn col(&self) -> Option<usize> {
        match self {
            SaveError::Parse { col, .. } => Some(*col),
            _ => None,
        }
    }

    pub fn byte_offset(&self) -> Option<usize> {
        match self {
            SaveError::Parse { byte_offset, .. } => Some(*byte_offset),
            _ => None,
        }
    }

    pub fn context(&self) -> Option<&str> {
        match self {
            SaveError::Parse { context, .. } => Some(context),
            _ => None,
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match self {
            SaveError::Io { hint, .. }
            | SaveError::Parse { hint, .. }
            | SaveError::InvalidRequest { hint, .. } => hint.as_deref(),
            _ => None,
        }
    }

    /// Message without the location prefix, as sent in the `message` field.
    pub fn message(&self) -> String {
        match self {
            SaveError::Parse { message, .. } => message.clone(),
            SaveError::InvalidRequest { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
