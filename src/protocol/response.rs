use std::io::{self, Write};

use indexmap::IndexMap;
use serde::Serialize;

use crate::ast::Value;
use crate::error::{SaveError, SCHEMA_VERSION, TOOL_VERSION};
use crate::query::{Entries, EntryRef, Summary};

/// Payload of a successful frame. Every variant borrows from the save or
/// the request, so nothing is cloned on the way out.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Reply<'a> {
    Data {
        data: IndexMap<String, &'a Value>,
    },
    Entry {
        entry: &'a Value,
        found: bool,
    },
    Entries(Entries<'a>),
    Counts {
        counts: IndexMap<String, usize>,
    },
    Matches {
        matches: IndexMap<String, bool>,
    },
    KvMatch {
        found: bool,
        matches: IndexMap<String, bool>,
    },
    Summaries {
        section: &'a str,
        summaries: Vec<Summary<'a>>,
    },
    Countries {
        countries: Vec<Summary<'a>>,
    },
    Values {
        values: Vec<String>,
        found: bool,
    },
    Text {
        text: String,
        found: bool,
    },
    Results {
        results: Vec<Frame<'a>>,
    },
    StreamHeader {
        stream: bool,
        op: &'static str,
        section: &'a str,
    },
    Batch {
        entries: Vec<EntryRef<'a>>,
    },
    StreamDone {
        done: bool,
        op: &'static str,
        section: &'a str,
    },
    Closed {
        closed: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct Success<'a> {
    pub ok: bool,
    #[serde(flatten)]
    pub reply: Reply<'a>,
}

/// Error frame. `line` and `col` are always present, `null` when the error
/// has no source location.
#[derive(Debug, Serialize)]
pub struct ErrorFrame {
    pub ok: bool,
    pub error: &'static str,
    pub message: String,
    pub line: Option<usize>,
    pub col: Option<usize>,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub schema_version: u32,
    pub tool_version: &'static str,
}

impl ErrorFrame {
    pub fn new(err: &SaveError) -> Self {
        ErrorFrame {
            ok: false,
            error: err.code(),
            message: err.message(),
            line: err.line(),
            col: err.col(),
            exit_code: err.exit_code(),
            hint: err.hint().map(str::to_string),
            byte_offset: err.byte_offset(),
            context: err.context().map(str::to_string),
            schema_version: SCHEMA_VERSION,
            tool_version: TOOL_VERSION,
        }
    }
}

/// Either outcome of one op, as carried in `multi` results.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Frame<'a> {
    Ok(Success<'a>),
    Err(ErrorFrame),
}

impl<'a> Frame<'a> {
    pub fn ok(reply: Reply<'a>) -> Self {
        Frame::Ok(Success { ok: true, reply })
    }

    pub fn err(err: &SaveError) -> Self {
        Frame::Err(ErrorFrame::new(err))
    }
}

/// Writes one JSON object per line and flushes after each, so a reader on
/// the other end of a pipe sees every frame as soon as it is complete.
pub struct FrameWriter<W: Write> {
    out: W,
    frames: u64,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(out: W) -> Self {
        FrameWriter { out, frames: 0 }
    }

    pub fn send<T: Serialize>(&mut self, frame: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, frame)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.frames += 1;
        Ok(())
    }

    pub fn ok(&mut self, reply: Reply<'_>) -> io::Result<()> {
        self.send(&Success { ok: true, reply })
    }

    pub fn error(&mut self, err: &SaveError) -> io::Result<()> {
        self.send(&ErrorFrame::new(err))
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Frames written so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}
