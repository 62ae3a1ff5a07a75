use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use super::check_schema_version;
use crate::ast::Value;
use crate::cli::IterArgs;
use crate::error::{SaveError, SCHEMA_VERSION, TOOL_VERSION};
use crate::query::EntryRef;
use crate::store::ParsedSave;

/// First line of the stream, carrying the contract fields once.
#[derive(Serialize)]
struct FirstLine<'a> {
    schema_version: u32,
    tool_version: &'static str,
    section: &'a str,
    key: &'a str,
    value: &'a Value,
}

/// `iter-save`: one JSON object per entry of a section.
pub fn run_iter(args: &IterArgs) -> Result<()> {
    check_schema_version(args.schema_version)?;
    if args.format != "jsonl" {
        return Err(SaveError::InvalidRequest {
            message: format!("Unsupported format: {}", args.format),
            hint: Some("Only 'jsonl' is supported".into()),
        }
        .into());
    }

    let save = ParsedSave::load(&args.path)?;
    let entries = save.iterate_section(&args.section)?;

    let mut out = BufWriter::new(io::stdout().lock());
    let mut count = 0usize;
    for (key, value) in entries {
        if count == 0 {
            serde_json::to_writer(
                &mut out,
                &FirstLine {
                    schema_version: SCHEMA_VERSION,
                    tool_version: TOOL_VERSION,
                    section: &args.section,
                    key: &key,
                    value,
                },
            )?;
        } else {
            serde_json::to_writer(&mut out, &EntryRef { key, value })?;
        }
        out.write_all(b"\n")?;
        count += 1;
    }
    out.flush().context("Failed to flush entries to stdout")?;

    info!(section = %args.section, entries = count, "section streamed");
    Ok(())
}
