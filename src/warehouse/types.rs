//! Warehouse types
//!
//! Table references, declared schemas and job bookkeeping shared by every
//! warehouse engine.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Schema
// ============================================================================

/// Column type in a declared warehouse schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    /// Text
    String,
    /// 64-bit float
    Float,
    /// 64-bit integer
    Integer,
    /// Boolean
    Boolean,
    /// Date-time without zone, microsecond precision
    Timestamp,
}

impl FieldType {
    /// Warehouse type name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Float => "FLOAT",
            Self::Integer => "INTEGER",
            Self::Boolean => "BOOLEAN",
            Self::Timestamp => "TIMESTAMP",
        }
    }

    /// Equivalent DuckDB SQL type
    pub fn duckdb_type(&self) -> &'static str {
        match self {
            Self::String => "VARCHAR",
            Self::Float => "DOUBLE",
            Self::Integer => "BIGINT",
            Self::Boolean => "BOOLEAN",
            Self::Timestamp => "TIMESTAMP",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Column mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldMode {
    #[default]
    Nullable,
    Required,
}

impl FieldMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nullable => "NULLABLE",
            Self::Required => "REQUIRED",
        }
    }
}

/// One column of a declared schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Column name
    pub name: String,

    /// Column type
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Column mode
    #[serde(default)]
    pub mode: FieldMode,
}

impl SchemaField {
    /// Create a nullable field
    pub fn nullable(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            mode: FieldMode::Nullable,
        }
    }
}

/// Ordered list of declared columns
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableSchema {
    pub fields: Vec<SchemaField>,
}

impl TableSchema {
    /// Create a schema from fields
    pub fn new(fields: Vec<SchemaField>) -> Self {
        Self { fields }
    }

    /// Build a schema of nullable fields from `(name, type)` pairs
    pub fn nullable(columns: &[(&str, FieldType)]) -> Self {
        Self::new(
            columns
                .iter()
                .map(|(name, ty)| SchemaField::nullable(*name, *ty))
                .collect(),
        )
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Column names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

// ============================================================================
// Tables
// ============================================================================

/// Fully qualified table reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    /// Create a table reference
    pub fn new(
        project: impl Into<String>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

// ============================================================================
// Jobs
// ============================================================================

/// Handle of a submitted warehouse job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    /// Job identifier
    pub id: String,

    /// Processing location, when the engine reports one
    pub location: Option<String>,
}

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location: None,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Done,
}

impl JobState {
    /// Parse an engine-reported state, treating unknown states as running
    pub fn parse(state: &str) -> Self {
        match state.to_ascii_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "DONE" => Self::Done,
            _ => Self::Running,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Done => "DONE",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Polled status of a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub state: JobState,

    /// Error message when the job finished unsuccessfully
    pub error: Option<String>,
}

impl JobStatus {
    pub fn running() -> Self {
        Self {
            state: JobState::Running,
            error: None,
        }
    }

    pub fn done() -> Self {
        Self {
            state: JobState::Done,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: JobState::Done,
            error: Some(message.into()),
        }
    }
}

/// Append-load of a columnar object into a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    /// Source object URI
    pub source_uri: String,

    /// Destination table
    pub destination: TableRef,

    /// Declared schema of the destination
    pub schema: TableSchema,
}

/// Options for query jobs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Byte ceiling for billing; the job fails rather than exceed it
    pub maximum_bytes_billed: Option<u64>,
}
