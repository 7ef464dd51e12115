use serde::Deserialize;
use thiserror::Error;

use crate::machine::extract_candidates;
use crate::matchers::FieldMatchers;
use crate::types::{
    Candidate, OutputEnvelope, Provenance, ENVELOPE_NOTES, NORMALIZED_SCHEMA, RAW_SCHEMA,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("unexpected raw capture schema: expected {expected}, found {}", .observed.as_deref().unwrap_or("nothing"))]
    SchemaMismatch {
        expected: &'static str,
        observed: Option<String>,
    },
}

/// Raw capture record written by the fetch collaborator. Fields the
/// extraction does not need (source class, tier, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawCapture {
    #[serde(default)]
    pub schema: Option<String>,
    pub source: CaptureSource,
    pub fetch: CaptureFetch,
    #[serde(default)]
    pub raw_content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CaptureSource {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CaptureFetch {
    pub fetched_at_utc: String,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub response_bytes: Option<u64>,
}

impl RawCapture {
    /// Reject captures that do not carry the expected schema marker.
    pub fn check_schema(&self) -> Result<(), PreconditionError> {
        check_schema_marker(self.schema.as_deref())
    }
}

/// Validate a raw capture's schema marker before anything else is read from it.
pub fn check_schema_marker(observed: Option<&str>) -> Result<(), PreconditionError> {
    match observed {
        Some(RAW_SCHEMA) => Ok(()),
        observed => Err(PreconditionError::SchemaMismatch {
            expected: RAW_SCHEMA,
            observed: observed.map(str::to_string),
        }),
    }
}

/// Wrap an ordered candidate sequence with its provenance.
pub fn build_envelope(candidates: Vec<Candidate>, provenance: Provenance) -> OutputEnvelope {
    OutputEnvelope {
        schema_tag: NORMALIZED_SCHEMA.to_string(),
        source_id: provenance.source_id,
        fetched_at: provenance.fetched_at,
        input_provenance: provenance.input_provenance,
        candidate_count: candidates.len(),
        candidates,
        notes: ENVELOPE_NOTES.to_string(),
    }
}

/// Extract candidates from markup text and wrap them in an envelope.
pub fn normalize_markup(
    markup: &str,
    provenance: Provenance,
    matchers: &dyn FieldMatchers,
) -> OutputEnvelope {
    build_envelope(extract_candidates(markup, matchers), provenance)
}

/// Check the capture's schema, then extract from its raw content.
pub fn normalize_capture(
    capture: &RawCapture,
    input_provenance: &str,
    matchers: &dyn FieldMatchers,
) -> Result<OutputEnvelope, PreconditionError> {
    capture.check_schema()?;
    let provenance = Provenance {
        source_id: capture.source.id.clone(),
        fetched_at: capture.fetch.fetched_at_utc.clone(),
        input_provenance: input_provenance.to_string(),
    };
    Ok(normalize_markup(&capture.raw_content, provenance, matchers))
}
