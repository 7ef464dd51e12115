use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine_logging::engine_debug;
use listing_core::{check_schema_marker, PreconditionError, RawCapture};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid raw capture json in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{}: {source}", .path.display())]
    Precondition {
        path: PathBuf,
        source: PreconditionError,
    },
}

/// Read a raw capture file. The schema marker is checked before the rest of
/// the record is interpreted.
pub fn load_raw_capture(path: &Path) -> Result<RawCapture, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_raw_capture(&text).map_err(|err| err.at(path))
}

/// Parse raw capture JSON text.
pub fn parse_raw_capture(text: &str) -> Result<RawCapture, ParseFailure> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(ParseFailure::Json)?;
    check_schema_marker(value.get("schema").and_then(|s| s.as_str()))
        .map_err(ParseFailure::Precondition)?;
    let capture: RawCapture = serde_json::from_value(value).map_err(ParseFailure::Json)?;
    engine_debug!(
        "Parsed raw capture for source {} ({} bytes of markup)",
        capture.source.id,
        capture.raw_content.len()
    );
    Ok(capture)
}

/// Parse failure not yet tied to a file.
#[derive(Debug, Error)]
pub enum ParseFailure {
    #[error(transparent)]
    Json(serde_json::Error),
    #[error(transparent)]
    Precondition(PreconditionError),
}

impl ParseFailure {
    fn at(self, path: &Path) -> LoadError {
        let path = path.to_path_buf();
        match self {
            ParseFailure::Json(source) => LoadError::Json { path, source },
            ParseFailure::Precondition(source) => LoadError::Precondition { path, source },
        }
    }
}
