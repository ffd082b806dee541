//! Record normalizer module
//!
//! Reads nested JSON source files and produces flat tabular datasets:
//! nested keys are joined with a separator, date columns are canonicalized
//! and unwanted columns dropped.

mod dataset;
mod dates;
mod decoders;
mod flatten;
mod normalizer;

pub use dataset::TabularDataset;
pub use dates::{canonicalize, format_canonical, parse_datetime, parse_datetime_value, CANONICAL_FORMAT};
pub use decoders::{create_decoder, read_records, DecoderFormat, JsonDecoder, JsonlDecoder, RecordDecoder};
pub use flatten::{flatten_record, key_paths, unflatten_record, VALUE_COLUMN};
pub use normalizer::{dataset_stem, tweak_dataset, NormalizeProfile, RecordNormalizer};
