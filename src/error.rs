//! Error types for mamo-rs.
//!
//! Each layer owns a `thiserror` enum; [`Error`] aggregates them for the
//! pipeline and the CLI. Per-call tool failures ([`ToolError`]) and search
//! failures ([`RetrievalError`]) are normally converted into tool-result
//! strings for the model instead of being propagated.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used by the pipeline and CLI layers.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error for a replanning run.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Input tables could not be loaded or interpreted.
    #[error(transparent)]
    Data(#[from] DataError),

    /// The evidence index could not be built.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// A standalone search failed.
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    /// The reasoning loop failed.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// The tool catalog could not be assembled.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Writing audit artifacts failed.
    #[error("audit write failed for {path}: {source}")]
    Audit {
        /// Path being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A CLI command could not be carried out.
    #[error("command failed: {0}")]
    Command(String),
}

/// Missing or invalid settings. Fatal before a run starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting has no value.
    #[error("missing required setting: {name} (set {env})")]
    MissingSetting {
        /// Setting name.
        name: &'static str,
        /// Environment variable(s) that can supply it.
        env: &'static str,
    },

    /// A setting has a value outside its allowed range.
    #[error("invalid value for {name}: {message}")]
    InvalidValue {
        /// Setting name.
        name: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// The provider name is not one of the supported backends.
    #[error("unsupported provider: {name} (expected \"openai\" or \"azure\")")]
    UnsupportedProvider {
        /// Requested provider name.
        name: String,
    },
}

/// Errors from loading and interpreting the input tables.
#[derive(Debug, Error)]
pub enum DataError {
    /// CSV file could not be opened or parsed.
    #[error("failed to read {path}: {source}")]
    Csv {
        /// File path.
        path: PathBuf,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// CSV produced by an in-memory reader or writer failed.
    #[error("csv error in table {table}: {source}")]
    Table {
        /// Table name.
        table: String,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// A column required by the planning computation is absent.
    #[error("table {table} has no column {column}")]
    MissingColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A cell could not be parsed into the expected type.
    #[error("table {table}, row {row}, column {column}: cannot parse {value:?}")]
    InvalidValue {
        /// Table name.
        table: String,
        /// Zero-based row index.
        row: usize,
        /// Column name.
        column: String,
        /// Raw cell value.
        value: String,
    },
}

/// Failures reported by an embedding backend.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The API call failed (network, auth, rate limit, server error).
    #[error("embedding request failed: {message}")]
    ApiRequest {
        /// Error message from the client.
        message: String,
    },

    /// The backend answered with the wrong number of vectors.
    #[error("embedding response returned {actual} vectors for {expected} inputs")]
    CountMismatch {
        /// Inputs sent.
        expected: usize,
        /// Vectors received.
        actual: usize,
    },
}

/// Fatal errors while building the evidence index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// An embedding batch failed.
    #[error("embedding batch {batch} failed: {source}")]
    Embedding {
        /// Zero-based batch number.
        batch: usize,
        /// Underlying embedding error.
        #[source]
        source: EmbeddingError,
    },

    /// Vector count does not match document count.
    #[error("index has {documents} documents but {vectors} vectors")]
    CountMismatch {
        /// Documents supplied.
        documents: usize,
        /// Vectors supplied.
        vectors: usize,
    },

    /// A vector's dimension differs from the first vector's.
    #[error("vector {position} has dimension {actual}, expected {expected}")]
    DimensionMismatch {
        /// Document position.
        position: usize,
        /// Index dimension.
        expected: usize,
        /// Offending dimension.
        actual: usize,
    },

    /// A vector has zero (or non-finite) length and cannot be normalized.
    #[error("degenerate embedding at position {position}")]
    DegenerateVector {
        /// Document position.
        position: usize,
    },

    /// Batch size configured as zero.
    #[error("embedding batch size must be at least 1")]
    ZeroBatchSize,
}

/// Errors while answering a search against a built index.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Embedding the query failed.
    #[error("query embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    /// The query embedding has zero length.
    #[error("query embedding is degenerate")]
    DegenerateQuery,

    /// The query embedding does not match the index dimension.
    #[error("query embedding has dimension {actual}, index has {expected}")]
    DimensionMismatch {
        /// Index dimension.
        expected: usize,
        /// Query dimension.
        actual: usize,
    },
}

/// Per-call tool failures. Reported back to the model as tool results.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The model asked for a tool that is not registered.
    #[error("unknown tool: {name} (available: {available})")]
    UnknownTool {
        /// Requested name.
        name: String,
        /// Comma-separated registered names.
        available: String,
    },

    /// Arguments failed decoding or schema validation.
    #[error("invalid arguments for {name}: {message}")]
    InvalidArguments {
        /// Tool name.
        name: String,
        /// Validation failure.
        message: String,
    },

    /// The handler ran but could not produce a result.
    #[error("{name} failed: {message}")]
    Execution {
        /// Tool name.
        name: String,
        /// Failure description.
        message: String,
    },

    /// A tool with the same name is already registered.
    #[error("tool already registered: {name}")]
    DuplicateName {
        /// Conflicting name.
        name: String,
    },
}

/// Errors from the chat backend and the reasoning loop.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The chat API call failed. Fatal to the run.
    #[error("chat request failed: {message}")]
    ApiRequest {
        /// Error message from the client.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// Run-level precondition failed (empty question, zero budget).
    #[error("orchestration error: {message}")]
    Orchestration {
        /// Description.
        message: String,
    },
}
