//! Domain models for the EduEDA chart pipeline.
//!
//! - [`AgeGroup`] - The closed set of selectable age-group facets
//! - [`FacetFilter`] - Either no filtering or a single age group
//! - [`DatasetSchema`] - Which CSV columns carry the year and the facet
//! - [`Record`] - One parsed, immutable CSV row
//! - [`Dataset`] - All records from one fetch, with parse metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::AggregateError;

/// Selector value that disables facet filtering.
pub const ALL_SENTINEL: &str = "All";

/// Metric charted when the caller does not pick one.
pub const DEFAULT_METRIC: &str = "Overall Total";

// =============================================================================
// Age Group
// =============================================================================

/// Age band of a teacher-count row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "24 and below")]
    UpTo24,
    #[serde(rename = "25-29")]
    From25To29,
    #[serde(rename = "30-34")]
    From30To34,
    #[serde(rename = "35-39")]
    From35To39,
    #[serde(rename = "40-44")]
    From40To44,
    #[serde(rename = "45-49")]
    From45To49,
    #[serde(rename = "50-54")]
    From50To54,
    #[serde(rename = "55 and above")]
    From55,
}

impl AgeGroup {
    /// Every selectable group, in selector order.
    pub const ALL: [AgeGroup; 8] = [
        AgeGroup::UpTo24,
        AgeGroup::From25To29,
        AgeGroup::From30To34,
        AgeGroup::From35To39,
        AgeGroup::From40To44,
        AgeGroup::From45To49,
        AgeGroup::From50To54,
        AgeGroup::From55,
    ];

    /// Label exactly as it appears in the dataset's facet column.
    pub fn label(&self) -> &'static str {
        match self {
            Self::UpTo24 => "24 and below",
            Self::From25To29 => "25-29",
            Self::From30To34 => "30-34",
            Self::From35To39 => "35-39",
            Self::From40To44 => "40-44",
            Self::From45To49 => "45-49",
            Self::From50To54 => "50-54",
            Self::From55 => "55 and above",
        }
    }

    /// Look a group up by its dataset label (case-sensitive).
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.label() == label)
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Facet Filter
// =============================================================================

/// Row filter applied before aggregation.
///
/// `All` means "no filter". It never matches a literal `All` value in the
/// facet column; rows are simply not filtered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacetFilter {
    #[default]
    All,
    Facet(AgeGroup),
}

impl FacetFilter {
    /// Whether a row with the given facet value survives the filter.
    pub fn matches(&self, facet_value: &str) -> bool {
        match self {
            FacetFilter::All => true,
            FacetFilter::Facet(group) => group.label() == facet_value,
        }
    }

    /// Selector label: `All` or the age-group label.
    pub fn label(&self) -> &'static str {
        match self {
            FacetFilter::All => ALL_SENTINEL,
            FacetFilter::Facet(group) => group.label(),
        }
    }

    /// Selector options offered to clients, sentinel first.
    pub fn options() -> Vec<&'static str> {
        std::iter::once(ALL_SENTINEL)
            .chain(AgeGroup::ALL.iter().map(AgeGroup::label))
            .collect()
    }
}

impl FromStr for FacetFilter {
    type Err = AggregateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ALL_SENTINEL {
            return Ok(FacetFilter::All);
        }
        AgeGroup::from_label(s)
            .map(FacetFilter::Facet)
            .ok_or_else(|| AggregateError::UnknownFacet(s.to_string()))
    }
}

impl fmt::Display for FacetFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for FacetFilter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for FacetFilter {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Dataset Schema
// =============================================================================

/// Column roles of a teacher-count CSV.
///
/// Every header other than the year and facet columns is numeric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSchema {
    pub year_column: String,
    pub facet_column: String,
}

impl Default for DatasetSchema {
    fn default() -> Self {
        Self {
            year_column: "Year".to_string(),
            facet_column: "Age Group".to_string(),
        }
    }
}

impl DatasetSchema {
    /// Headers that hold counts.
    pub fn numeric_columns<'a>(&'a self, headers: &'a [String]) -> impl Iterator<Item = &'a String> {
        headers
            .iter()
            .filter(move |h| **h != self.year_column && **h != self.facet_column)
    }
}

// =============================================================================
// Record
// =============================================================================

/// One teacher-count row, already coerced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    year: String,
    facet: String,
    counts: HashMap<String, i64>,
}

impl Record {
    pub fn new(year: impl Into<String>, facet: impl Into<String>, counts: HashMap<String, i64>) -> Self {
        Self {
            year: year.into(),
            facet: facet.into(),
            counts,
        }
    }

    pub fn year(&self) -> &str {
        &self.year
    }

    pub fn facet(&self) -> &str {
        &self.facet
    }

    /// Count for a numeric column; absent columns read as 0.
    pub fn count(&self, column: &str) -> i64 {
        self.counts.get(column).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &HashMap<String, i64> {
        &self.counts
    }
}

// =============================================================================
// Dataset
// =============================================================================

/// Records from a single fetch of the backing CSV.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub records: Vec<Record>,
    pub headers: Vec<String>,
    pub schema: DatasetSchema,
    pub encoding: String,
    pub delimiter: char,
    /// Rows dropped because their year cell was blank.
    pub skipped_rows: usize,
    pub loaded_at: DateTime<Utc>,
}

impl Dataset {
    /// Whether `column` is one of the dataset's numeric columns.
    pub fn has_metric(&self, column: &str) -> bool {
        self.schema.numeric_columns(&self.headers).any(|h| h == column)
    }

    pub fn metrics(&self) -> Vec<String> {
        self.schema.numeric_columns(&self.headers).cloned().collect()
    }
}
