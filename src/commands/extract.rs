use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::check_schema_version;
use crate::cli::ExtractArgs;
use crate::error::SaveError;
use crate::export::Extraction;
use crate::query;
use crate::store::ParsedSave;

/// `extract-save`: archive or plain gamestate, detected from the file.
pub fn run_save(args: &ExtractArgs) -> Result<()> {
    extract(args, |path| ParsedSave::load(path))
}

/// `extract-gamestate`: always plain gamestate text.
pub fn run_gamestate(args: &ExtractArgs) -> Result<()> {
    extract(args, |path| ParsedSave::load_gamestate(path))
}

fn extract(args: &ExtractArgs, load: impl FnOnce(&Path) -> Result<ParsedSave, SaveError>) -> Result<()> {
    check_schema_version(args.schema_version)?;

    let names = args.section_names();
    if names.is_empty() {
        return Err(SaveError::invalid_request("--sections must name at least one section").into());
    }

    let save = load(&args.path)?;
    let sections = query::extract_sections(&save, &names)?;
    let document = Extraction::new(&sections)?;

    write_output(&document, &args.output)
        .with_context(|| format!("Failed to write output to '{}'", args.output))?;
    info!(sections = names.len(), output = %args.output, "extraction written");
    Ok(())
}

fn write_output(document: &Extraction, output: &str) -> Result<(), SaveError> {
    let io_error = |e: io::Error| SaveError::io(output, &e);

    if output == "-" {
        let mut stdout = io::stdout().lock();
        document.write_pretty(&mut stdout)?;
        stdout.write_all(b"\n").map_err(io_error)?;
        return stdout.flush().map_err(io_error);
    }

    let mut writer = BufWriter::new(File::create(output).map_err(io_error)?);
    document.write_pretty(&mut writer)?;
    writer.write_all(b"\n").map_err(io_error)?;
    writer.flush().map_err(io_error)
}
