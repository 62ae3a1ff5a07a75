use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::SaveError;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Raw sub-files of one save.
#[derive(Debug)]
pub struct SaveFiles {
    pub gamestate: Vec<u8>,
    pub meta: Option<Vec<u8>>,
}

/// Expand a leading `~/` to the home directory.
pub fn resolve_save_path(path: &Path) -> Result<PathBuf, SaveError> {
    let raw = path.to_string_lossy();
    let Some(rest) = raw.strip_prefix("~/") else {
        return Ok(path.to_path_buf());
    };

    let home = dirs::home_dir().ok_or_else(|| SaveError::Io {
        message: "Could not determine home directory for ~ expansion".into(),
        path: raw.to_string(),
        hint: Some("Set HOME or pass an absolute path".into()),
    })?;
    Ok(home.join(rest))
}

/// Read a save from disk. ZIP archives yield their `gamestate` and `meta`
/// members; any other file is taken as plain gamestate text.
pub fn read_save_file(path: &Path) -> Result<SaveFiles, SaveError> {
    let shown = path.display().to_string();
    let bytes = std::fs::read(path).map_err(|e| SaveError::io(shown.clone(), &e))?;

    if !bytes.starts_with(ZIP_MAGIC) {
        debug!(path = %shown, "reading plain gamestate");
        return Ok(SaveFiles {
            gamestate: bytes,
            meta: None,
        });
    }

    debug!(path = %shown, "reading save archive");
    let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice()))
        .map_err(|e| archive_error(&shown, "Failed to read save archive", e))?;

    let gamestate = read_member(&mut archive, "gamestate")
        .map_err(|e| archive_error(&shown, "Failed to read 'gamestate' from archive", e))?
        .ok_or_else(|| SaveError::Io {
            message: "No gamestate file in archive".into(),
            path: shown.clone(),
            hint: Some("The archive must contain a 'gamestate' member".into()),
        })?;

    let meta = read_member(&mut archive, "meta")
        .map_err(|e| archive_error(&shown, "Failed to read 'meta' from archive", e))?;

    Ok(SaveFiles { gamestate, meta })
}

fn read_member<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, ZipError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut content = Vec::with_capacity(usize::try_from(file.size()).unwrap_or(0));
    file.read_to_end(&mut content)?;
    Ok(Some(content))
}

fn archive_error(path: &str, what: &str, err: ZipError) -> SaveError {
    SaveError::Io {
        message: format!("{}: {}", what, err),
        path: path.to_string(),
        hint: Some("The file looks like a ZIP archive but could not be read".into()),
    }
}
