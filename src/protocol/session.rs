use std::io::{self, BufRead, Write};
use std::ops::ControlFlow;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::request::Request;
use super::response::{Frame, FrameWriter, Reply};
use crate::error::{exit_code, SaveError, TOOL_VERSION};
use crate::query::{self, KvPattern};
use crate::store::ParsedSave;
use crate::utils::format_elapsed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Ready,
    Dispatching,
    Closing,
    Terminated,
}

/// Request loop over one parsed save.
pub struct Session<'a, W: Write> {
    save: &'a ParsedSave,
    out: FrameWriter<W>,
    state: SessionState,
    requests: u64,
}

impl<'a, W: Write> Session<'a, W> {
    pub fn new(save: &'a ParsedSave, out: W) -> Self {
        Session {
            save,
            out: FrameWriter::new(out),
            state: SessionState::Starting,
            requests: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Serve requests from `input` until `close`, EOF, or a failed write.
    ///
    /// Bad requests are answered with an error frame and never end the
    /// loop. Only I/O failures on either stream are returned.
    pub fn run<R: BufRead>(&mut self, mut input: R) -> io::Result<()> {
        let mut line = Vec::new();
        if self.state == SessionState::Starting {
            self.state = SessionState::Ready;
        }

        while self.state == SessionState::Ready {
            line.clear();
            if input.read_until(b'\n', &mut line)? == 0 {
                debug!("stdin closed");
                self.state = SessionState::Closing;
                break;
            }

            let trimmed = line.trim_ascii();
            if trimmed.is_empty() {
                continue;
            }

            self.state = SessionState::Dispatching;
            self.requests += 1;
            self.state = match self.dispatch(trimmed)? {
                ControlFlow::Continue(()) => SessionState::Ready,
                ControlFlow::Break(()) => SessionState::Closing,
            };
        }

        self.out.flush()?;
        self.state = SessionState::Terminated;
        info!(requests = self.requests, frames = self.out.frames(), "session ended");
        Ok(())
    }

    fn dispatch(&mut self, line: &[u8]) -> io::Result<ControlFlow<()>> {
        let request = match Request::from_line(line) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "rejected request");
                self.out.error(&err)?;
                return Ok(ControlFlow::Continue(()));
            }
        };

        let started = Instant::now();
        debug!(op = request.op(), "dispatching");

        match &request {
            Request::Close => {
                self.out.ok(Reply::Closed { closed: true })?;
                return Ok(ControlFlow::Break(()));
            }
            Request::IterSection {
                section,
                batch_size,
            } => self.stream_section(section, *batch_size)?,
            Request::Multi { ops } => {
                let results = ops
                    .iter()
                    .map(|op| match answer(self.save, op) {
                        Ok(reply) => Frame::ok(reply),
                        Err(err) => Frame::err(&err),
                    })
                    .collect();
                self.out.ok(Reply::Results { results })?;
            }
            other => match answer(self.save, other) {
                Ok(reply) => self.out.ok(reply)?,
                Err(err) => {
                    debug!(op = other.op(), error = %err, "request failed");
                    self.out.error(&err)?;
                }
            },
        }

        debug!(op = request.op(), elapsed = %format_elapsed(started.elapsed()), "answered");
        Ok(ControlFlow::Continue(()))
    }

    /// Header, bounded batches, done. Errors found before the header is
    /// written are answered with a single error frame instead.
    fn stream_section(&mut self, section: &str, batch_size: usize) -> io::Result<()> {
        let batches = match query::iter_section(self.save, section, batch_size) {
            Ok(batches) => batches,
            Err(err) => return self.out.error(&err),
        };

        self.out.ok(Reply::StreamHeader {
            stream: true,
            op: "iter_section",
            section,
        })?;
        for entries in batches {
            self.out.ok(Reply::Batch { entries })?;
        }
        self.out.ok(Reply::StreamDone {
            done: true,
            op: "iter_section",
            section,
        })
    }
}

/// Load the save at `path`, then serve requests until the session ends.
/// Returns the process exit code.
///
/// A save that cannot be loaded is reported with one error frame on
/// `output` and the matching exit code.
pub fn serve<R: BufRead, W: Write>(path: &Path, input: R, mut output: W) -> i32 {
    info!(
        path = %path.display(),
        tool_version = TOOL_VERSION,
        state = ?SessionState::Starting,
        "loading save"
    );

    let save = match ParsedSave::load(path) {
        Ok(save) => save,
        Err(err) => {
            error!(error = %err, "failed to load save");
            let mut out = FrameWriter::new(&mut output);
            if let Err(e) = out.error(&err) {
                warn!(error = %e, "could not report load failure");
            }
            return err.exit_code();
        }
    };

    info!(sections = save.root().len(), "save ready, entering request loop");
    let mut session = Session::new(&save, output);
    match session.run(input) {
        Ok(()) => exit_code::SUCCESS,
        Err(err) => {
            error!(error = %err, "session stream failed");
            exit_code::IO
        }
    }
}

/// Answer one non-streaming request.
pub fn answer<'a>(save: &'a ParsedSave, request: &'a Request) -> Result<Reply<'a>, SaveError> {
    let reply = match request {
        Request::ExtractSections { sections } => Reply::Data {
            data: query::extract_sections(save, sections)?,
        },
        Request::GetEntry { section, key } => Reply::Entry {
            entry: query::get_entry(save, section, key)?,
            found: true,
        },
        Request::GetEntries {
            section,
            keys,
            fields,
        } => Reply::Entries(query::get_entries(save, section, keys, fields.as_deref())?),
        Request::CountKeys { keys } => Reply::Counts {
            counts: query::count_keys(save, keys),
        },
        Request::ContainsTokens {
            tokens,
            case_insensitive,
        } => Reply::Matches {
            matches: query::contains_tokens(save.raw_bytes(), tokens, *case_insensitive)?,
        },
        Request::ContainsKv { key, value, pairs } => {
            let patterns = kv_patterns(key.as_deref(), value.as_deref(), pairs.as_deref())?;
            let matches = query::contains_kv_pairs(save, &patterns)?;
            Reply::KvMatch {
                found: matches.values().all(|hit| *hit),
                matches,
            }
        }
        Request::GetSummaries { section, fields } => Reply::Summaries {
            section,
            summaries: query::summarize_section(save, section, fields)?,
        },
        Request::GetCountrySummaries { fields } => Reply::Countries {
            countries: query::summarize_section(save, "country", fields)?,
        },
        Request::GetDuplicateValues {
            section,
            key,
            field,
        } => match query::duplicate_values(save, section, key, field)? {
            Some(values) => Reply::Values { values, found: true },
            None => Reply::Values {
                values: Vec::new(),
                found: false,
            },
        },
        Request::GetEntryText { section, key } => {
            let text = query::entry_text(save, section, key)?;
            Reply::Text {
                found: text.is_some(),
                text: text.unwrap_or_default(),
            }
        }
        Request::IterSection { .. } | Request::Multi { .. } | Request::Close => {
            return Err(SaveError::InvalidRequest {
                message: format!("'{}' cannot run inside multi", request.op()),
                hint: Some("Send streaming and close requests on their own line".into()),
            });
        }
    };
    Ok(reply)
}

fn kv_patterns(key: Option<&str>, value: Option<&str>, pairs: Option<&[(String, String)]>) -> Result<Vec<KvPattern>, SaveError> {
    match (key, value, pairs) {
        (Some(key), Some(value), None) => Ok(vec![KvPattern::new(key, value)]),
        (None, None, Some(pairs)) if !pairs.is_empty() => {
            Ok(pairs.iter().map(|(k, v)| KvPattern::new(k, v)).collect())
        }
        _ => Err(SaveError::InvalidRequest {
            message: "contains_kv needs either 'key' and 'value' or a non-empty 'pairs' list".into(),
            hint: Some(r#"{"op":"contains_kv","key":"has_ascension","value":"yes"}"#.into()),
        }),
    }
}
