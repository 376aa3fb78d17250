//! Application configuration.
//!
//! Read from the environment (after loading `.env` if present):
//!
//! | Variable          | Default                                          |
//! |-------------------|--------------------------------------------------|
//! | `EDUEDA_DATASET`  | `data/teachers_age_data_2019_2023_cleaned.csv`   |
//! | `EDUEDA_PORT`     | `3000`                                           |
//! | `EDUEDA_METRIC`   | `Overall Total`                                  |

use std::env;

use crate::error::ConfigError;
use crate::models::{DatasetSchema, DEFAULT_METRIC};
use crate::source::DatasetSource;

/// Dataset served when `EDUEDA_DATASET` is unset.
pub const DEFAULT_DATASET: &str = "data/teachers_age_data_2019_2023_cleaned.csv";

/// HTTP port when `EDUEDA_PORT` is unset.
pub const DEFAULT_PORT: u16 = 3000;

/// Maximum accepted upload size for `/api/aggregate` (in bytes).
///
/// 10 MB limit.
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Chart sessions kept at once, one per viewer.
pub const MAX_SESSIONS: usize = 1024;

/// Path the local dataset file is served under.
pub const DATASET_ROUTE: &str = "/data/dataset.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub dataset: DatasetSource,
    pub port: u16,
    pub metric: String,
    pub schema: DatasetSchema,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetSource::parse(DEFAULT_DATASET),
            port: DEFAULT_PORT,
            metric: DEFAULT_METRIC.to_string(),
            schema: DatasetSchema::default(),
        }
    }
}

impl AppConfig {
    /// Build from process environment variables, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(location) = lookup("EDUEDA_DATASET").filter(|v| !v.trim().is_empty()) {
            config.dataset = DatasetSource::parse(location.trim());
        }

        if let Some(port) = lookup("EDUEDA_PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    name: "EDUEDA_PORT",
                    value: port.clone(),
                })?;
        }

        if let Some(metric) = lookup("EDUEDA_METRIC") {
            if metric.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    name: "EDUEDA_METRIC",
                    value: metric,
                });
            }
            config.metric = metric.trim().to_string();
        }

        Ok(config)
    }
}
