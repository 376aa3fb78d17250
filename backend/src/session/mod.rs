//! Chart sessions: per viewer, the latest facet selection wins.
//!
//! Every selection fetches the dataset and aggregates it from scratch. Fetches
//! can finish out of order, so each selection takes a token from a
//! monotonically increasing counter and only the holder of the newest token
//! may publish its result. A slow response for an older selection is still
//! returned to its own requester but never becomes the visible state.
//!
//! ```text
//! select(25-29)  token 1 ──fetch──────────────────▶ done  (returned, not published)
//! select(30-34)  token 2 ──fetch────▶ done  (published)
//! ```
//!
//! Each viewer owns one [`ChartSession`]. The [`SessionRegistry`] hands them
//! out by session id, so one viewer's selections never supersede another's.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::aggregate::pipeline::{build_chart, AggregateOptions, ChartResult, CsvInfo};
use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::chart::{ensure_registered, ChartData};
use crate::config::MAX_SESSIONS;
use crate::error::{PipelineError, SessionError, SessionResult};
use crate::models::DatasetSchema;
use crate::parser::parse_bytes_auto;
use crate::source::DatasetSource;

/// Identifies one selection request. Larger is newer.
pub type RequestToken = u64;

/// Session used by clients that do not send an id.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Longest accepted session id.
const MAX_SESSION_ID_LEN: usize = 64;

/// What a viewer currently sees.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "status")]
pub enum ChartState {
    /// Nothing has completed yet.
    Loading,
    Ready {
        token: RequestToken,
        chart: ChartData,
        csv_info: CsvInfo,
    },
    Failed {
        token: RequestToken,
        message: String,
    },
}

impl ChartState {
    fn token(&self) -> RequestToken {
        match self {
            ChartState::Loading => 0,
            ChartState::Ready { token, .. } | ChartState::Failed { token, .. } => *token,
        }
    }
}

/// Outcome of one [`ChartSession::select`] call.
#[derive(Debug, Clone)]
pub struct Selection {
    pub token: RequestToken,
    /// Whether the chart became the session's visible state.
    pub published: bool,
    pub result: ChartResult,
}

/// Chart state of one viewer.
pub struct ChartSession {
    source: DatasetSource,
    schema: DatasetSchema,
    client: reqwest::Client,
    latest: AtomicU64,
    state: RwLock<ChartState>,
}

impl ChartSession {
    pub fn new(source: DatasetSource, schema: DatasetSchema) -> Self {
        Self::with_client(source, schema, reqwest::Client::new())
    }

    /// Session sharing an existing HTTP client (and its connection pool).
    pub fn with_client(source: DatasetSource, schema: DatasetSchema, client: reqwest::Client) -> Self {
        Self {
            source,
            schema,
            client,
            latest: AtomicU64::new(0),
            state: RwLock::new(ChartState::Loading),
        }
    }

    /// Issue a token for a new selection; it supersedes all earlier ones.
    pub fn begin(&self) -> RequestToken {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Token of the newest selection issued so far (0 if none).
    pub fn latest_token(&self) -> RequestToken {
        self.latest.load(Ordering::SeqCst)
    }

    /// Publish `state` for `token`, unless a newer selection exists.
    ///
    /// Returns whether the state was published.
    pub async fn commit(&self, token: RequestToken, state: ChartState) -> bool {
        let mut current = self.state.write().await;
        if token != self.latest_token() || token <= current.token() {
            log_warning(format!("Discarding stale response for request {}", token));
            return false;
        }
        *current = state;
        true
    }

    /// Snapshot of the published state.
    pub async fn state(&self) -> ChartState {
        self.state.read().await.clone()
    }

    /// Fetch, aggregate and try to publish a chart for `options`.
    ///
    /// The computed chart is always returned to the caller;
    /// [`Selection::published`] is `false` when a newer selection was issued
    /// while this one was in flight. A failure is published as
    /// [`ChartState::Failed`] under the same rule.
    pub async fn select(&self, options: &AggregateOptions) -> SessionResult<Selection> {
        ensure_registered();

        let token = self.begin();
        log_info(format!("Request {}: age group {}, metric '{}'", token, options.facet, options.metric));

        match self.load(options).await {
            Ok(result) => {
                let ready = ChartState::Ready {
                    token,
                    chart: result.chart.clone(),
                    csv_info: result.csv_info.clone(),
                };
                let published = self.commit(token, ready).await;
                if published {
                    log_success(format!("Request {} published", token));
                }
                Ok(Selection {
                    token,
                    published,
                    result,
                })
            }
            Err(e) => {
                log_error(format!("Request {} failed: {}", token, e));
                let failed = ChartState::Failed {
                    token,
                    message: e.to_string(),
                };
                self.commit(token, failed).await;
                Err(e)
            }
        }
    }

    async fn load(&self, options: &AggregateOptions) -> SessionResult<ChartResult> {
        let bytes = self.source.fetch(&self.client).await?;
        let dataset = parse_bytes_auto(&bytes, &self.schema).map_err(PipelineError::from)?;
        let chart = build_chart(&dataset, options).map_err(PipelineError::from)?;
        Ok(ChartResult {
            chart,
            csv_info: CsvInfo::from(&dataset),
        })
    }
}

/// Check a client-supplied session id: 1 to 64 ASCII letters, digits, `-` or `_`.
pub fn validate_session_id(id: &str) -> SessionResult<()> {
    let valid = !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(SessionError::InvalidSessionId(id.to_string()))
    }
}

/// Chart sessions keyed by viewer id, all reading the same dataset.
pub struct SessionRegistry {
    source: DatasetSource,
    schema: DatasetSchema,
    client: reqwest::Client,
    max_sessions: usize,
    sessions: RwLock<HashMap<String, Arc<ChartSession>>>,
}

impl SessionRegistry {
    pub fn new(source: DatasetSource, schema: DatasetSchema) -> Self {
        Self::with_limit(source, schema, MAX_SESSIONS)
    }

    pub fn with_limit(source: DatasetSource, schema: DatasetSchema, max_sessions: usize) -> Self {
        Self {
            source,
            schema,
            client: reqwest::Client::new(),
            max_sessions,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &DatasetSource {
        &self.source
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Existing session for `id`, if any.
    pub async fn get(&self, id: &str) -> Option<Arc<ChartSession>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Session for `id`, created on first use.
    ///
    /// When the registry is full, sessions with no request in flight are
    /// dropped first; if every session is busy the call fails.
    pub async fn get_or_create(&self, id: &str) -> SessionResult<Arc<ChartSession>> {
        validate_session_id(id)?;
        if let Some(session) = self.get(id).await {
            return Ok(session);
        }

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(id) {
            return Ok(Arc::clone(session));
        }

        if sessions.len() >= self.max_sessions {
            let before = sessions.len();
            sessions.retain(|_, session| Arc::strong_count(session) > 1);
            log_warning(format!("Session limit reached, dropped {} idle sessions", before - sessions.len()));
            if sessions.len() >= self.max_sessions {
                return Err(SessionError::TooManySessions(self.max_sessions));
            }
        }

        let session = Arc::new(ChartSession::with_client(
            self.source.clone(),
            self.schema.clone(),
            self.client.clone(),
        ));
        sessions.insert(id.to_string(), Arc::clone(&session));
        log_info(format!("Opened chart session '{}'", id));
        Ok(session)
    }

    /// Published state of session `id`; `Loading` for a session never used.
    pub async fn state(&self, id: &str) -> ChartState {
        match self.get(id).await {
            Some(session) => session.state().await,
            None => ChartState::Loading,
        }
    }
}
