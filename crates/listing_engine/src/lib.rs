//! Listing engine: file IO around the extraction core.
mod decode;
mod engine;
mod persist;
mod raw;

pub use decode::{decode_markup, DecodeError, DecodedMarkup};
pub use engine::{
    normalize_markup_file, normalize_raw_file, resolve_profile, NormalizeError, NormalizeReport,
    NormalizeSettings,
};
pub use persist::{
    default_output_dir, ensure_output_dir, normalized_filename, AtomicFileWriter, PersistError,
};
pub use raw::{load_raw_capture, parse_raw_capture, LoadError, ParseFailure};
