//! High-level API: CSV content in, chart payload out.
//!
//! # Example
//!
//! ```rust,ignore
//! use edueda::aggregate::{chart_from_file, AggregateOptions};
//! use edueda::models::DatasetSchema;
//!
//! let result = chart_from_file(
//!     "teachers_age_data_2019_2023_cleaned.csv",
//!     &DatasetSchema::default(),
//!     &AggregateOptions::default(),
//! )?;
//! println!("{} bars, y max {}", result.chart.labels.len(), result.chart.y_axis.bounds.max);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::series::aggregate;
use crate::api::logs::{log_info, log_success, log_warning};
use crate::chart::ChartData;
use crate::error::{AggregateError, AggregateResult, PipelineResult};
use crate::models::{Dataset, DatasetSchema, FacetFilter, DEFAULT_METRIC};
use crate::parser::{parse_bytes_auto, parse_csv_file_auto};

/// What to chart from a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateOptions {
    /// Age-group filter; `All` disables filtering.
    #[serde(default)]
    pub facet: FacetFilter,

    /// Numeric column to sum per year.
    #[serde(default = "default_metric")]
    pub metric: String,
}

fn default_metric() -> String {
    DEFAULT_METRIC.to_string()
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            facet: FacetFilter::All,
            metric: default_metric(),
        }
    }
}

/// CSV file information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
    pub skipped_rows: usize,
}

impl From<&Dataset> for CsvInfo {
    fn from(dataset: &Dataset) -> Self {
        Self {
            encoding: dataset.encoding.clone(),
            delimiter: dataset.delimiter,
            headers: dataset.headers.clone(),
            row_count: dataset.records.len(),
            skipped_rows: dataset.skipped_rows,
        }
    }
}

/// Chart plus the metadata of the CSV it came from.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartResult {
    pub chart: ChartData,
    pub csv_info: CsvInfo,
}

/// Aggregate a parsed dataset into chart data.
///
/// The metric must be one of the dataset's numeric columns.
pub fn build_chart(dataset: &Dataset, options: &AggregateOptions) -> AggregateResult<ChartData> {
    if !dataset.has_metric(&options.metric) {
        return Err(AggregateError::UnknownMetric(options.metric.clone()));
    }

    log_info(format!(
        "Summing '{}' per year (age group: {})",
        options.metric, options.facet
    ));
    let series = aggregate(&dataset.records, &options.metric, options.facet);
    let chart = ChartData::new(&series, &options.metric, options.facet);

    if chart.empty {
        log_warning(format!("No data above zero for {}", options.facet));
    } else {
        log_success(format!(
            "{} years, y axis 0..{} step {}",
            chart.labels.len(),
            chart.y_axis.bounds.max,
            chart.y_axis.bounds.step
        ));
    }

    Ok(chart)
}

/// Parse CSV bytes and aggregate them.
pub fn chart_from_bytes(
    bytes: &[u8],
    schema: &DatasetSchema,
    options: &AggregateOptions,
) -> PipelineResult<ChartResult> {
    let dataset = parse_bytes_auto(bytes, schema)?;
    chart_from_dataset(&dataset, options)
}

/// Parse a CSV file and aggregate it.
pub fn chart_from_file<P: AsRef<Path>>(
    path: P,
    schema: &DatasetSchema,
    options: &AggregateOptions,
) -> PipelineResult<ChartResult> {
    let dataset = parse_csv_file_auto(path, schema)?;
    chart_from_dataset(&dataset, options)
}

fn chart_from_dataset(dataset: &Dataset, options: &AggregateOptions) -> PipelineResult<ChartResult> {
    let chart = build_chart(dataset, options)?;
    Ok(ChartResult {
        chart,
        csv_info: CsvInfo::from(dataset),
    })
}
