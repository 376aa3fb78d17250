//! Chart payload handed to the bar-chart renderer.
//!
//! The renderer itself lives outside this crate. What it needs from us is a
//! [`ChartData`] (labels, values, titles, y-axis bounds) and a one-time
//! registration of the chart components it will draw with.

pub mod registry;

use serde::{Deserialize, Serialize};

use crate::aggregate::Series;
use crate::models::FacetFilter;
use crate::scale::AxisBounds;

pub use registry::{ensure_registered, registered_components, ChartComponent};

/// Dataset label shown when no facet filter is applied.
pub const ALL_GROUPS_LABEL: &str = "All Age Groups";

pub const X_AXIS_TITLE: &str = "Year";
pub const Y_AXIS_TITLE: &str = "Number of Teachers";

/// Render-ready bar chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub title: String,
    pub dataset_label: String,
    pub metric: String,
    pub facet: FacetFilter,
    pub labels: Vec<String>,
    pub values: Vec<i64>,
    pub x_axis: AxisTitle,
    pub y_axis: YAxis,
    /// True when there is no bar above zero.
    pub empty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisTitle {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YAxis {
    pub title: String,
    pub begin_at_zero: bool,
    #[serde(flatten)]
    pub bounds: AxisBounds,
}

impl ChartData {
    /// Assemble the payload for a series. Bounds are recomputed from this
    /// series every time.
    pub fn new(series: &Series, metric: &str, facet: FacetFilter) -> Self {
        let dataset_label = match facet {
            FacetFilter::All => ALL_GROUPS_LABEL.to_string(),
            FacetFilter::Facet(group) => group.label().to_string(),
        };

        ChartData {
            title: format!("Teachers' {} ({})", title_metric(metric), facet.label()),
            dataset_label,
            metric: metric.to_string(),
            facet,
            labels: series.labels(),
            values: series.values(),
            x_axis: AxisTitle {
                title: X_AXIS_TITLE.to_string(),
            },
            y_axis: YAxis {
                title: Y_AXIS_TITLE.to_string(),
                begin_at_zero: true,
                bounds: AxisBounds::for_series(series),
            },
            empty: series.is_blank(),
        }
    }
}

/// "Overall Total" reads as "Overall Numbers" in the title.
fn title_metric(metric: &str) -> String {
    match metric.strip_suffix(" Total") {
        Some(prefix) => format!("{} Numbers", prefix),
        None => metric.to_string(),
    }
}
