//! Error types for the EduEDA chart pipeline.
//!
//! - [`CsvError`] - CSV parsing errors
//! - [`FetchError`] - Dataset retrieval errors
//! - [`AggregateError`] - Aggregation request errors
//! - [`ConfigError`] - Environment configuration errors
//! - [`PipelineError`] - Parse-then-aggregate errors
//! - [`SessionError`] - Chart session orchestration errors
//! - [`ServerError`] - HTTP server errors
//!
//! Field-level problems (an unparseable count, a missing cell) never show up
//! here: they coerce to zero inside the parser.

use thiserror::Error;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors during CSV parsing.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid CSV structure.
    #[error("Line {line}: {message}")]
    ParseError { line: u64, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// A column the dataset schema relies on is absent from the header.
    #[error("Missing required column: {0}")]
    MissingColumn(String),
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        CsvError::ParseError {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Fetch Errors
// =============================================================================

/// Errors while retrieving the backing CSV resource.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    /// Network failure.
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// Local file could not be read.
    #[error("Cannot read dataset '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// =============================================================================
// Aggregation Errors
// =============================================================================

/// Errors in an aggregation request.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// The requested metric is not a column of the dataset.
    #[error("Unknown metric column: {0}")]
    UnknownMetric(String),

    /// The requested facet is not one of the selectable age groups.
    #[error("Unknown age group: {0}")]
    UnknownFacet(String),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be interpreted.
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

// =============================================================================
// Pipeline Errors
// =============================================================================

/// Errors from turning CSV content into chart data.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Dataset could not be parsed.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Aggregation request was invalid.
    #[error("Aggregate error: {0}")]
    Aggregate(#[from] AggregateError),
}

// =============================================================================
// Session Errors
// =============================================================================

/// Errors surfaced by a chart session request.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Dataset could not be fetched.
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Dataset could not be parsed or aggregated.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// Client-supplied session id is malformed.
    #[error("Invalid session id: '{0}'")]
    InvalidSessionId(String),

    /// Every session slot is held by a request in flight.
    #[error("Too many chart sessions (limit {0})")]
    TooManySessions(usize),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Session error.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Pipeline error on uploaded content.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Listener failure.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Result type for aggregation operations.
pub type AggregateResult<T> = Result<T, AggregateError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
