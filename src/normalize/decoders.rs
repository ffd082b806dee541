//! Record decoders
//!
//! Turn the raw text of a source file into a list of JSON records.

use crate::error::{Error, Result};
use serde_json::Value;
use std::path::Path;

/// Format of a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecoderFormat {
    /// A JSON document (array, object, or a string holding either)
    #[default]
    Json,
    /// JSON Lines (one document per line)
    Jsonl,
}

impl DecoderFormat {
    /// Pick the format from a file extension
    pub fn for_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("jsonl" | "ndjson") => Self::Jsonl,
            _ => Self::Json,
        }
    }
}

/// Trait for record decoders
pub trait RecordDecoder {
    /// Decode a file body into records
    fn decode(&self, body: &str) -> std::result::Result<Vec<Value>, String>;
}

/// JSON decoder
///
/// Arrays yield their elements, objects yield themselves. A top-level string
/// is parsed again, since some exports store the whole document as one
/// JSON-encoded string.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl JsonDecoder {
    /// Nested string documents are unwrapped at most this many times
    const MAX_UNWRAP: usize = 4;

    fn extract_records(value: Value, depth: usize) -> std::result::Result<Vec<Value>, String> {
        match value {
            Value::Array(arr) => Ok(arr),
            Value::String(inner) if depth < Self::MAX_UNWRAP => {
                let parsed: Value = serde_json::from_str(&inner)
                    .map_err(|e| format!("Failed to parse embedded JSON document: {e}"))?;
                Self::extract_records(parsed, depth + 1)
            }
            other => Ok(vec![other]),
        }
    }
}

impl RecordDecoder for JsonDecoder {
    fn decode(&self, body: &str) -> std::result::Result<Vec<Value>, String> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| format!("Failed to parse JSON: {e}"))?;
        Self::extract_records(value, 0)
    }
}

/// JSON Lines decoder (one JSON object per line)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonlDecoder;

impl RecordDecoder for JsonlDecoder {
    fn decode(&self, body: &str) -> std::result::Result<Vec<Value>, String> {
        let mut records = Vec::new();

        for (line_num, line) in body.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let value: Value = serde_json::from_str(line)
                .map_err(|e| format!("Failed to parse JSONL at line {}: {e}", line_num + 1))?;

            records.push(value);
        }

        Ok(records)
    }
}

/// Create a decoder for a format
pub fn create_decoder(format: DecoderFormat) -> Box<dyn RecordDecoder + Send + Sync> {
    match format {
        DecoderFormat::Json => Box::new(JsonDecoder),
        DecoderFormat::Jsonl => Box::new(JsonlDecoder),
    }
}

/// Read every record from a source file
pub fn read_records(path: &Path) -> Result<Vec<Value>> {
    let body = std::fs::read_to_string(path).map_err(|e| Error::filesystem(path, e))?;
    create_decoder(DecoderFormat::for_path(path))
        .decode(&body)
        .map_err(|message| Error::decode(path, message))
}
