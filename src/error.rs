use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error("{source_name} request failed: {detail}")]
    Transport { source_name: String, detail: String },

    #[error("{source_name} returned status {status}: {message}")]
    Status {
        source_name: String,
        status: u16,
        message: String,
    },

    #[error("malformed checksum file for {table}: {detail}")]
    MalformedChecksum { table: String, detail: String },

    #[error("checksum mismatch: computed {actual} but the sidecar declares {expected}")]
    ChecksumMismatch { actual: String, expected: String },

    #[error("content size mismatch: streamed {actual} bytes but the response declared {expected}")]
    SizeMismatch { actual: u64, expected: u64 },

    #[error("schema {schema} requires column '{column}' which is missing from the source")]
    MissingColumn { schema: String, column: String },

    #[error("schema {schema} does not accept column '{column}'")]
    UnexpectedColumn { schema: String, column: String },

    #[error("schema {schema} declares {expected} columns but the source has {actual}")]
    ColumnCount {
        schema: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate key {0} where a unique key was required")]
    DuplicateKey(String),

    #[error("join cardinality violated: expected {expected} rows, produced {actual}")]
    Cardinality { expected: usize, actual: usize },

    #[error("failed to parse {0}")]
    Parse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
