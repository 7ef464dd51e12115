use std::path::{Path, PathBuf};

use engine_logging::{engine_info, engine_warn};
use listing_core::{
    normalize_capture, normalize_markup, OutputEnvelope, PreconditionError, Provenance,
    SourceProfile,
};
use thiserror::Error;

use crate::decode::{decode_markup, DecodeError};
use crate::persist::{default_output_dir, normalized_filename, AtomicFileWriter, PersistError};
use crate::raw::{load_raw_capture, LoadError};

#[derive(Debug, Clone, Default)]
pub struct NormalizeSettings {
    /// Defaults to `normalized/` next to the raw capture directory.
    pub out_dir: Option<PathBuf>,
    pub href_pattern: Option<String>,
    pub date_marker: Option<String>,
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    #[error("invalid href pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeReport {
    pub output_path: PathBuf,
    pub candidate_count: usize,
}

/// Matcher profile for `source_id` with any configured overrides applied.
pub fn resolve_profile(
    source_id: &str,
    settings: &NormalizeSettings,
) -> Result<SourceProfile, NormalizeError> {
    let mut profile = SourceProfile::for_source(source_id).unwrap_or_else(|| {
        engine_warn!(
            "No matcher profile registered for source {}; using the default profile",
            source_id
        );
        SourceProfile::default()
    });
    if let Some(pattern) = &settings.href_pattern {
        profile = profile.with_href_pattern(pattern)?;
    }
    if let Some(marker) = &settings.date_marker {
        profile = profile.with_date_marker(marker.clone());
    }
    Ok(profile)
}

/// Load a raw capture, extract its listing and persist the envelope.
pub fn normalize_raw_file(
    raw_path: &Path,
    settings: &NormalizeSettings,
) -> Result<NormalizeReport, NormalizeError> {
    let capture = load_raw_capture(raw_path)?;
    engine_info!("Loaded raw capture {:?} (source {})", raw_path, capture.source.id);

    let profile = resolve_profile(&capture.source.id, settings)?;
    let envelope = normalize_capture(&capture, &raw_path.to_string_lossy(), &profile)?;
    persist(raw_path, &envelope, settings)
}

/// Extract a listing from a plain markup file with caller-supplied provenance.
pub fn normalize_markup_file(
    markup_path: &Path,
    source_id: &str,
    fetched_at: &str,
    settings: &NormalizeSettings,
) -> Result<NormalizeReport, NormalizeError> {
    let bytes = std::fs::read(markup_path).map_err(|source| NormalizeError::Read {
        path: markup_path.to_path_buf(),
        source,
    })?;
    let decoded = decode_markup(&bytes, None)?;
    engine_info!(
        "Decoded {:?} as {} ({} bytes)",
        markup_path,
        decoded.encoding_label,
        bytes.len()
    );

    let profile = resolve_profile(source_id, settings)?;
    let provenance = Provenance {
        source_id: source_id.to_string(),
        fetched_at: fetched_at.to_string(),
        input_provenance: markup_path.to_string_lossy().into_owned(),
    };
    let envelope = normalize_markup(&decoded.text, provenance, &profile);
    persist(markup_path, &envelope, settings)
}

fn persist(
    input_path: &Path,
    envelope: &OutputEnvelope,
    settings: &NormalizeSettings,
) -> Result<NormalizeReport, NormalizeError> {
    let out_dir = settings
        .out_dir
        .clone()
        .unwrap_or_else(|| default_output_dir(input_path));
    let writer = AtomicFileWriter::new(out_dir);
    let output_path = writer.write_envelope(&normalized_filename(input_path), envelope)?;
    engine_info!(
        "Wrote {} candidates to {:?}",
        envelope.candidate_count,
        output_path
    );
    Ok(NormalizeReport {
        output_path,
        candidate_count: envelope.candidate_count,
    })
}
