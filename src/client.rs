// Author: Dustin Pilgrim
// License: MIT

//! Client handle for a `cwsave serve` child process.
//!
//! The server has no timeouts of its own. [`SessionClient`] owns them: a
//! reader thread decodes stdout frames and forwards them over a channel, and
//! every receive waits at most `timeout`. A timed-out session is killed,
//! since its late answer would otherwise be read as the reply to the next
//! request. Dropping the handle kills the child if it is still running.

// Frames nest as deep as the save itself, up to `parser::MAX_DEPTH` blocks,
// so the reader decodes without serde_json's recursion limit on a thread
// with room for it.

use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{json, Value as Json};
use thiserror::Error;
use tracing::{debug, warn};

/// Receive timeout used by [`SessionClient::spawn`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const READER_STACK_SIZE: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to start '{binary}': {source}")]
    Spawn {
        binary: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Session pipe failed: {0}")]
    Pipe(#[from] io::Error),
    #[error("Session timed out after {0:?}")]
    Timeout(Duration),
    #[error("Session ended unexpectedly")]
    Closed,
    #[error("Malformed frame from server: {0}")]
    Frame(#[from] serde_json::Error),
    #[error("{code}: {message}")]
    Server {
        code: String,
        message: String,
        line: Option<usize>,
        col: Option<usize>,
        exit_code: i32,
    },
    #[error("Unexpected frame: {0}")]
    Protocol(String),
}

impl ClientError {
    /// Stable server code for `Server` errors, e.g. `EntryNotFound`.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Server { code, .. } => Some(code),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct ServerError {
    error: String,
    message: String,
    line: Option<usize>,
    col: Option<usize>,
    exit_code: i32,
}

pub struct SessionClient {
    child: Child,
    stdin: Option<ChildStdin>,
    frames: Receiver<Result<Json, ClientError>>,
    timeout: Duration,
    in_stream: bool,
    closed: bool,
}

impl SessionClient {
    /// Start `binary serve --path save` with [`DEFAULT_TIMEOUT`].
    pub fn spawn(binary: impl AsRef<Path>, save: impl AsRef<Path>) -> Result<Self, ClientError> {
        Self::spawn_with_timeout(binary, save, DEFAULT_TIMEOUT)
    }

    pub fn spawn_with_timeout(
        binary: impl AsRef<Path>,
        save: impl AsRef<Path>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let binary = binary.as_ref();
        debug!(binary = %binary.display(), save = %save.as_ref().display(), "spawning session");

        let mut child = Command::new(binary)
            .arg("serve")
            .arg("--path")
            .arg(save.as_ref())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ClientError::Spawn {
                binary: binary.to_path_buf(),
                source,
            })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take().ok_or(ClientError::Closed)?;

        let (tx, rx) = mpsc::channel();
        let reader = thread::Builder::new()
            .name("cwsave-reader".into())
            .stack_size(READER_STACK_SIZE)
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let (frame, fatal) = match line {
                        Ok(line) => (decode_frame(&line), false),
                        Err(err) => (Err(err.into()), true),
                    };
                    if tx.send(frame).is_err() || fatal {
                        break;
                    }
                }
            });
        if let Err(err) = reader {
            let _ = child.kill();
            let _ = child.wait();
            return Err(err.into());
        }

        Ok(SessionClient {
            child,
            stdin,
            frames: rx,
            timeout,
            in_stream: false,
            closed: false,
        })
    }

    /// Send one request and return its successful frame.
    pub fn request(&mut self, request: &Json) -> Result<Json, ClientError> {
        self.send(request)?;
        self.recv()
    }

    pub fn extract_sections(&mut self, sections: &[&str]) -> Result<Json, ClientError> {
        let mut frame = self.request(&json!({"op": "extract_sections", "sections": sections}))?;
        Ok(frame["data"].take())
    }

    /// `None` when the entry does not exist.
    pub fn get_entry(&mut self, section: &str, key: &str) -> Result<Option<Json>, ClientError> {
        match self.request(&json!({"op": "get_entry", "section": section, "key": key})) {
            Ok(mut frame) => Ok(Some(frame["entry"].take())),
            Err(err) if err.code() == Some("EntryNotFound") => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn count_keys(&mut self, keys: &[&str]) -> Result<IndexMap<String, usize>, ClientError> {
        let mut frame = self.request(&json!({"op": "count_keys", "keys": keys}))?;
        Ok(serde_json::from_value(frame["counts"].take())?)
    }

    pub fn contains_tokens(&mut self, tokens: &[&str]) -> Result<IndexMap<String, bool>, ClientError> {
        let mut frame = self.request(&json!({"op": "contains_tokens", "tokens": tokens}))?;
        Ok(serde_json::from_value(frame["matches"].take())?)
    }

    /// Stream a section. Entries left unread when the stream is dropped are
    /// drained before the next request is sent.
    pub fn iter_section(&mut self, section: &str, batch_size: usize) -> Result<SectionStream<'_>, ClientError> {
        self.send(&json!({"op": "iter_section", "section": section, "batch_size": batch_size}))?;

        let header = self.recv()?;
        if header["stream"] != Json::Bool(true) {
            return Err(ClientError::Protocol(header.to_string()));
        }
        self.in_stream = true;

        Ok(SectionStream {
            client: self,
            pending: Vec::new().into_iter(),
        })
    }

    /// Ask the server to close and wait for it to exit. Returns its exit code.
    pub fn close(mut self) -> Result<i32, ClientError> {
        self.send(&json!({"op": "close"}))?;
        let frame = self.recv()?;
        if frame["closed"] != Json::Bool(true) {
            return Err(ClientError::Protocol(frame.to_string()));
        }

        self.closed = true;
        drop(self.stdin.take());
        let status = self.child.wait()?;
        Ok(status.code().unwrap_or(1))
    }

    fn send(&mut self, request: &Json) -> Result<(), ClientError> {
        if self.closed {
            return Err(ClientError::Closed);
        }
        self.drain_stream()?;

        let stdin = self.stdin.as_mut().ok_or(ClientError::Closed)?;
        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');
        stdin.write_all(&line)?;
        stdin.flush()?;
        Ok(())
    }

    /// Next frame. Error frames become `ClientError::Server`.
    fn recv(&mut self) -> Result<Json, ClientError> {
        let frame = match self.frames.recv_timeout(self.timeout) {
            Ok(frame) => frame?,
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout = ?self.timeout, "session timed out, killing server");
                self.shutdown();
                return Err(ClientError::Timeout(self.timeout));
            }
            Err(RecvTimeoutError::Disconnected) => return Err(ClientError::Closed),
        };

        if frame["ok"] == Json::Bool(true) {
            return Ok(frame);
        }

        let err: ServerError = serde_json::from_value(frame)?;
        Err(ClientError::Server {
            code: err.error,
            message: err.message,
            line: err.line,
            col: err.col,
            exit_code: err.exit_code,
        })
    }

    fn drain_stream(&mut self) -> Result<(), ClientError> {
        while self.in_stream {
            let frame = self.recv()?;
            if frame["done"] == Json::Bool(true) {
                self.in_stream = false;
            }
        }
        Ok(())
    }

    /// Mark the session closed and kill the child if it is still running.
    fn shutdown(&mut self) {
        self.closed = true;
        self.in_stream = false;
        drop(self.stdin.take());
        if let Ok(None) = self.child.try_wait() {
            debug!("killing session child");
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

fn decode_frame(line: &str) -> Result<Json, ClientError> {
    let mut de = serde_json::Deserializer::from_str(line);
    de.disable_recursion_limit();
    let frame = Json::deserialize(&mut de)?;
    de.end()?;
    Ok(frame)
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Entries of one `iter_section` stream, in server order.
pub struct SectionStream<'a> {
    client: &'a mut SessionClient,
    pending: std::vec::IntoIter<Json>,
}

impl Iterator for SectionStream<'_> {
    type Item = Result<(String, Json), ClientError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(mut entry) = self.pending.next() {
                let key = entry["key"].as_str().unwrap_or_default().to_string();
                return Some(Ok((key, entry["value"].take())));
            }
            if !self.client.in_stream {
                return None;
            }

            let mut frame = match self.client.recv() {
                Ok(frame) => frame,
                Err(err) => {
                    self.client.in_stream = false;
                    return Some(Err(err));
                }
            };
            if frame["done"] == Json::Bool(true) {
                self.client.in_stream = false;
                return None;
            }
            match frame["entries"].take() {
                Json::Array(entries) => self.pending = entries.into_iter(),
                other => {
                    self.client.in_stream = false;
                    return Some(Err(ClientError::Protocol(other.to_string())));
                }
            }
        }
    }
}
