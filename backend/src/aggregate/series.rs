//! Ordered year → total series.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::models::{FacetFilter, Record};

/// One bar of the chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: i64,
}

impl SeriesPoint {
    pub fn new(label: impl Into<String>, value: i64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Year-ordered totals handed to the chart renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Series {
    points: Vec<SeriesPoint>,
}

impl Series {
    pub fn from_points(points: Vec<SeriesPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn labels(&self) -> Vec<String> {
        self.points.iter().map(|p| p.label.clone()).collect()
    }

    pub fn values(&self) -> Vec<i64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Largest value, `None` when the series has no points.
    pub fn max_value(&self) -> Option<i64> {
        self.points.iter().map(|p| p.value).max()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// No points, or nothing above zero.
    pub fn is_blank(&self) -> bool {
        self.points.iter().all(|p| p.value <= 0)
    }

    /// Value for a label, if the label is part of the series.
    pub fn get(&self, label: &str) -> Option<i64> {
        self.points.iter().find(|p| p.label == label).map(|p| p.value)
    }
}

/// Distinct year labels in first-seen order.
pub fn year_labels(records: &[Record]) -> Vec<&str> {
    let mut seen = HashSet::new();
    records
        .iter()
        .map(Record::year)
        .filter(|year| seen.insert(*year))
        .collect()
}

/// Sum `metric` per year over the rows that pass `filter`.
///
/// Every year of the unfiltered records appears exactly once, in first-seen
/// order; years whose rows were all filtered out get 0.
pub fn aggregate(records: &[Record], metric: &str, filter: FacetFilter) -> Series {
    let mut sums: HashMap<&str, i64> = HashMap::new();

    for record in records.iter().filter(|r| filter.matches(r.facet())) {
        let total = sums.entry(record.year()).or_insert(0);
        *total = total.saturating_add(record.count(metric));
    }

    let points = year_labels(records)
        .into_iter()
        .map(|year| SeriesPoint::new(year, sums.get(year).copied().unwrap_or(0)))
        .collect();

    Series { points }
}
