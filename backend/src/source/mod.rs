//! Retrieval of the backing CSV resource.
//!
//! A dataset lives either behind a URL or on local disk. Fetching is a
//! single read: no retry, no cache.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::api::logs::{log_info, log_success};
use crate::error::{FetchError, FetchResult};

/// Where the teacher-count CSV comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "location")]
pub enum DatasetSource {
    Url(String),
    Path(PathBuf),
}

impl DatasetSource {
    /// `http://` and `https://` locations are URLs, anything else is a path.
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            DatasetSource::Url(location.to_string())
        } else {
            DatasetSource::Path(PathBuf::from(location))
        }
    }

    /// Read the raw CSV bytes.
    pub async fn fetch(&self, client: &reqwest::Client) -> FetchResult<Vec<u8>> {
        log_info(format!("Fetching dataset from {}", self));

        let bytes = match self {
            DatasetSource::Url(url) => fetch_url(client, url).await?,
            DatasetSource::Path(path) => tokio::fs::read(path).await.map_err(|source| FetchError::Io {
                path: path.display().to_string(),
                source,
            })?,
        };

        log_success(format!("Fetched {} bytes", bytes.len()));
        Ok(bytes)
    }
}

async fn fetch_url(client: &reqwest::Client, url: &str) -> FetchResult<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::RequestFailed(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| FetchError::RequestFailed(e.to_string()))?;
    Ok(body.to_vec())
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSource::Url(url) => f.write_str(url),
            DatasetSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}
