// Author: Dustin Pilgrim
// License: MIT

//! Line-delimited JSON session over stdin/stdout.
//!
//! The save is parsed once when the session starts. Each request line gets
//! exactly one response line, except `iter_section`, which answers with a
//! stream header, one frame per batch and a done frame.

pub mod request;
pub mod response;
mod session;

pub use request::{Request, DEFAULT_BATCH_SIZE};
pub use response::{ErrorFrame, Frame, FrameWriter, Reply, Success};
pub use session::{answer, serve, Session, SessionState};

#[cfg(test)]
mod tests;
