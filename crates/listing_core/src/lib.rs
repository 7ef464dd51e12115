//! Listing core: pure, single-pass extraction of press-release listings.
mod entities;
mod envelope;
mod event;
mod machine;
mod matchers;
mod repair;
mod types;

pub use entities::decode_entities;
pub use envelope::{
    build_envelope, check_schema_marker, normalize_capture, normalize_markup, CaptureFetch,
    CaptureSource, PreconditionError, RawCapture,
};
pub use event::{attr, Attribute, MarkupEvent, MarkupEvents};
pub use machine::{extract_candidates, normalize_space, CandidateMachine};
pub use matchers::{FieldMatchers, SourceProfile, FIDELITY_PRESS_SOURCE_ID};
pub use repair::repair;
pub use types::{
    Candidate, OutputEnvelope, Provenance, ENVELOPE_NOTES, NORMALIZED_SCHEMA, RAW_SCHEMA,
};
