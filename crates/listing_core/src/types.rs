use serde::{Deserialize, Serialize};

/// Schema marker the fetch collaborator stamps on raw captures.
pub const RAW_SCHEMA: &str = "raw_signal.v0";
/// Schema marker of the envelope produced here.
pub const NORMALIZED_SCHEMA: &str = "normalized_signal.v0";

pub const ENVELOPE_NOTES: &str = "Normalization v0: streaming extraction from listing markup. \
Titles and dates paired by local adjacency in encounter order; duplicate links dropped \
(first occurrence wins); best-effort mojibake repair on titles and dates.";

/// One extracted listing record. `url` is never empty and is the dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub url: String,
    pub title: Option<String>,
    pub date_text: Option<String>,
}

/// Caller-supplied provenance stamped by the fetch collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub source_id: String,
    pub fetched_at: String,
    pub input_provenance: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEnvelope {
    #[serde(rename = "schema")]
    pub schema_tag: String,
    pub source_id: String,
    #[serde(rename = "fetched_at_utc")]
    pub fetched_at: String,
    #[serde(rename = "input_raw_path")]
    pub input_provenance: String,
    pub candidate_count: usize,
    pub candidates: Vec<Candidate>,
    pub notes: String,
}
