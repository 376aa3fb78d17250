//! REST API types.
//!
//! Chart responses carry the render-ready [`ChartData`] unchanged; clients
//! pass it straight to their bar-chart component.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::aggregate::pipeline::{ChartResult, CsvInfo};
use crate::chart::ChartData;
use crate::models::{FacetFilter, ALL_SENTINEL};
use crate::session::Selection;

/// Response for `/api/chart` and `/api/aggregate`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartResponse {
    /// "ready", or "empty" when no bar is above zero
    pub status: String,
    /// Whether this chart is now the session's visible state. Uploads are
    /// never published.
    pub published: bool,
    pub chart: ChartData,
    pub csv_info: CsvInfo,
}

impl From<ChartResult> for ChartResponse {
    fn from(result: ChartResult) -> Self {
        ChartResponse {
            status: if result.chart.empty { "empty" } else { "ready" }.to_string(),
            published: false,
            chart: result.chart,
            csv_info: result.csv_info,
        }
    }
}

impl From<Selection> for ChartResponse {
    fn from(selection: Selection) -> Self {
        ChartResponse {
            published: selection.published,
            ..selection.result.into()
        }
    }
}

/// Query string of `/api/chart`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartQuery {
    pub age_group: Option<String>,
    pub metric: Option<String>,
    /// Viewer session id; selections only supersede others in the same session
    pub session: Option<String>,
}

/// Query string of `/api/chart/state`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionQuery {
    pub session: Option<String>,
}

/// Selector options for `/api/facets`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetsResponse {
    pub options: Vec<&'static str>,
    pub default: &'static str,
    pub metric: String,
}

impl FacetsResponse {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            options: FacetFilter::options(),
            default: ALL_SENTINEL,
            metric: metric.into(),
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}
