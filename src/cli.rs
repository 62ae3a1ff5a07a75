// Author: Dustin Pilgrim
// License: MIT

//! Command-line arguments and logging setup for the `cwsave` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::error::SCHEMA_VERSION;

#[derive(Debug, Parser)]
#[command(
    name = "cwsave",
    version,
    about = "Parse Clausewitz save files once and answer structured queries as JSON."
)]
pub struct CwsaveArgs {
    /// Log filter for stderr output, e.g. `info` or `cwsave=debug`.
    #[arg(long, global = true, env = "CWSAVE_LOG", default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Extract sections of a .sav archive (or plain gamestate) as one JSON document.
    ExtractSave(ExtractArgs),
    /// Extract sections of an already unpacked gamestate file.
    ExtractGamestate(ExtractArgs),
    /// Stream the entries of one section as JSON lines.
    IterSave(IterArgs),
    /// Parse once, then answer JSON requests on stdin until closed.
    Serve {
        /// Path to the .sav archive or gamestate file.
        #[arg(long)]
        path: PathBuf,
    },
}

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// Path to the save file.
    pub path: PathBuf,

    /// Comma-separated section names.
    #[arg(long, required = true, value_delimiter = ',')]
    pub sections: Vec<String>,

    /// JSON contract version the caller expects.
    #[arg(long, default_value_t = SCHEMA_VERSION)]
    pub schema_version: u32,

    /// Output file, `-` for stdout.
    #[arg(long, short, default_value = "-")]
    pub output: String,
}

#[derive(Debug, Args)]
pub struct IterArgs {
    /// Path to the save file.
    pub path: PathBuf,

    /// Section to iterate.
    #[arg(long)]
    pub section: String,

    /// JSON contract version the caller expects.
    #[arg(long, default_value_t = SCHEMA_VERSION)]
    pub schema_version: u32,

    /// Output format. Only `jsonl` is supported.
    #[arg(long, default_value = "jsonl")]
    pub format: String,
}

impl ExtractArgs {
    /// Section names with surrounding whitespace and empty items removed.
    pub fn section_names(&self) -> Vec<String> {
        self.sections
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Install the stderr log subscriber. Stdout carries protocol and command
/// output only.
pub fn init_logging(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
