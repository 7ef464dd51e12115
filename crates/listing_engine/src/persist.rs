use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use listing_core::OutputEnvelope;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Atomically write content to `{dir}/{filename}`: temp file in the same
/// directory, fsync, then rename over any previous version.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }

    /// Serialize the envelope as pretty JSON and write it under `filename`.
    pub fn write_envelope(
        &self,
        filename: &str,
        envelope: &OutputEnvelope,
    ) -> Result<PathBuf, PersistError> {
        let mut json = serde_json::to_string_pretty(envelope)?;
        json.push('\n');
        self.write(filename, &json)
    }
}

/// `fidelity_press__20260105T120000Z.json` -> `fidelity_press__normalized__20260105T120000Z.json`
pub fn normalized_filename(raw_path: &Path) -> String {
    let stem = raw_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}.json", stem.replace("__", "__normalized__"))
}

/// Sibling `normalized` directory of the raw capture's parent directory.
pub fn default_output_dir(raw_path: &Path) -> PathBuf {
    let parent = raw_path.parent().unwrap_or_else(|| Path::new(""));
    match parent.parent() {
        Some(grandparent) => grandparent.join("normalized"),
        None => parent.join("normalized"),
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{default_output_dir, normalized_filename};

    #[test]
    fn filename_inserts_normalized_marker() {
        assert_eq!(
            normalized_filename(Path::new(
                "data/evidence/raw/fidelity_press__20260105T120000Z.json"
            )),
            "fidelity_press__normalized__20260105T120000Z.json"
        );
        assert_eq!(normalized_filename(Path::new("capture.json")), "capture.json");
    }

    #[test]
    fn output_dir_is_sibling_of_raw_dir() {
        assert_eq!(
            default_output_dir(Path::new("data/evidence/raw/x.json")),
            PathBuf::from("data/evidence/normalized")
        );
        assert_eq!(
            default_output_dir(Path::new("x.json")),
            PathBuf::from("normalized")
        );
    }
}
