//! Facet filtering and per-year summing of teacher counts.
//!
//! ```text
//! Records (unfiltered)                          Series
//! ┌──────────────────────────┐                 ┌──────────────┐
//! │ 2019  All    100         │   labels from   │ 2019  →  40  │
//! │ 2019  25-29   40         │ ─ unfiltered ─▶ │ 2020  →   0  │
//! │ 2020  All    200         │   rows, sums    └──────────────┘
//! └──────────────────────────┘   from filtered
//!          facet = 25-29
//! ```
//!
//! - `series`: [`Series`] and the [`aggregate`] function
//! - `pipeline`: dataset → chart payload, with metric validation and logging

pub mod pipeline;
pub mod series;

pub use pipeline::{build_chart, chart_from_bytes, chart_from_file, AggregateOptions, ChartResult, CsvInfo};
pub use series::{aggregate, year_labels, Series, SeriesPoint};
