// Author: Dustin Pilgrim
// License: MIT

pub mod ast;
pub mod cli;
pub mod client;
pub mod commands;
pub mod error;
pub mod export;
pub mod lexer;
pub mod parser;
pub mod protocol;
pub mod query;
pub mod store;
pub mod utils;

pub use ast::{Object, Text, Value};
pub use client::{ClientError, SessionClient};
pub use error::SaveError;
pub use protocol::{Request, Session, SessionState};
pub use store::ParsedSave;
