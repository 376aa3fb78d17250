//! # EduEDA - teacher-count charts from education CSV datasets
//!
//! Fetches a yearly teacher-count CSV, filters it by age group, sums a count
//! column per year and derives y-axis bounds for a bar chart.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV (URL   │────▶│   Parser    │────▶│  Aggregate  │────▶│  ChartData  │
//! │  or path)   │     │ (auto-enc)  │     │ (facet,sum) │     │ (+ y bounds)│
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use edueda::{chart_from_file, AggregateOptions, DatasetSchema};
//!
//! let result = chart_from_file("teachers.csv", &DatasetSchema::default(), &AggregateOptions::default())?;
//! println!("{:?} -> {:?}", result.chart.labels, result.chart.values);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Records, facets, dataset schema
//! - [`parser`] - CSV parsing and count coercion
//! - [`aggregate`] - Facet filtering and per-year series
//! - [`scale`] - Y-axis bounds
//! - [`chart`] - Render-ready chart payload and component registration
//! - [`source`] - Dataset retrieval
//! - [`session`] - Per-viewer, latest-selection-wins chart state
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Aggregation and charting
pub mod aggregate;
pub mod chart;
pub mod scale;

// Retrieval and session state
pub mod session;
pub mod source;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AggregateError, ConfigError, CsvError, FetchError, PipelineError, ServerError, SessionError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{AgeGroup, Dataset, DatasetSchema, FacetFilter, Record, ALL_SENTINEL, DEFAULT_METRIC};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes_auto, parse_csv_file_auto,
    parse_str, safe_parse,
};

// =============================================================================
// Re-exports - Aggregation
// =============================================================================

pub use aggregate::{
    aggregate, build_chart, chart_from_bytes, chart_from_file, year_labels, AggregateOptions,
    ChartResult, CsvInfo, Series, SeriesPoint,
};
pub use chart::{ensure_registered, ChartComponent, ChartData};
pub use scale::{step_size, upper_bound, AxisBounds};

// =============================================================================
// Re-exports - Retrieval
// =============================================================================

pub use config::AppConfig;
pub use session::{ChartSession, ChartState, RequestToken, Selection, SessionRegistry};
pub use source::DatasetSource;

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
