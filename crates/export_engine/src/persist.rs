use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use engine_logging::engine_info;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::types::ExportOutput;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("invalid file name: {0:?}")]
    InvalidFileName(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Writes `{dir}/{filename}` through a temp file in the same directory, then
/// renames. The temp file is removed when any step fails.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write_bytes(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        if filename.is_empty()
            || filename.contains(['/', '\\'])
            || filename == "."
            || filename == ".."
        {
            return Err(PersistError::InvalidFileName(filename.to_string()));
        }
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        if target.exists() {
            fs::remove_file(&target)?;
        }
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// Save an export result under its suggested file name.
pub fn save_export(dir: &Path, output: &ExportOutput) -> Result<PathBuf, PersistError> {
    let writer = AtomicFileWriter::new(dir.to_path_buf());
    let path = writer.write_bytes(&output.filename, &output.bytes)?;
    engine_info!("Saved {} ({} bytes) to {:?}", output.filename, output.bytes.len(), path);
    Ok(path)
}
