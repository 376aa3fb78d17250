//! HTTP Server for the EduEDA chart API.
//!
//! # API Endpoints
//!
//! | Method | Path               | Description                                   |
//! |--------|--------------------|-----------------------------------------------|
//! | GET    | `/health`          | Health check                                  |
//! | GET    | `/api/facets`      | Age-group selector options                    |
//! | GET    | `/api/chart`       | Chart for `?ageGroup=&metric=&session=`       |
//! | GET    | `/api/chart/state` | Latest published chart state of `?session=`   |
//! | POST   | `/api/aggregate`   | Upload a CSV and chart it                     |
//! | GET    | `/api/logs`        | SSE stream for real-time logs                 |
//! | GET    | `/data/dataset.csv`| The dataset file (local datasets only)        |
//!
//! Requests without `session` share the `default` session.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::{cors::CorsLayer, services::ServeFile};

use super::logs::{log_error, LOG_BROADCASTER};
use super::types::{error_response, ChartQuery, ChartResponse, FacetsResponse, SessionQuery};
use crate::aggregate::pipeline::{chart_from_bytes, AggregateOptions};
use crate::chart::ensure_registered;
use crate::config::{AppConfig, DATASET_ROUTE, MAX_UPLOAD_SIZE};
use crate::error::{AggregateError, PipelineError, ServerError, SessionError};
use crate::models::{DatasetSchema, FacetFilter};
use crate::session::{validate_session_id, ChartState, SessionRegistry, DEFAULT_SESSION_ID};
use crate::source::DatasetSource;

type ApiError = (StatusCode, Json<Value>);

fn reject(status: StatusCode, message: &str) -> ApiError {
    (status, Json(error_response(message)))
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    sessions: Arc<SessionRegistry>,
    schema: DatasetSchema,
    default_metric: String,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new(config.dataset.clone(), config.schema.clone())),
            schema: config.schema.clone(),
            default_metric: config.metric.clone(),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    // Permissive CORS: the chart page may be served from another origin.
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let dataset_file = match state.sessions.source() {
        DatasetSource::Path(path) => Some(path.clone()),
        DatasetSource::Url(_) => None,
    };

    let mut app = Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/facets", get(facets))
        .route("/api/chart", get(chart))
        .route("/api/chart/state", get(chart_state))
        .route("/api/aggregate", post(aggregate_upload))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE));

    // Only the dataset itself, never its directory.
    if let Some(path) = dataset_file {
        app = app.route_service(DATASET_ROUTE, ServeFile::new(path));
    }

    app.layer(cors).with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: AppConfig) -> Result<(), ServerError> {
    ensure_registered();

    let state = AppState::new(&config);
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    println!("🚀 EduEDA server running on http://localhost:{}", config.port);
    println!("   Dataset: {}", config.dataset);
    println!("   GET  /api/chart       - Chart for an age group");
    println!("   GET  /api/facets      - Age-group options");
    println!("   POST /api/aggregate   - Upload CSV and chart it");
    println!("   GET  /api/logs        - SSE log stream");
    println!("   GET  /health          - Health check");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "edueda",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "chart": "GET /api/chart?ageGroup=&metric=",
            "facets": "GET /api/facets",
            "aggregate": "POST /api/aggregate",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn facets(State(state): State<AppState>) -> Json<FacetsResponse> {
    Json(FacetsResponse::new(state.default_metric.clone()))
}

/// Chart for the selected age group, fetched and aggregated fresh.
async fn chart(
    State(state): State<AppState>,
    Query(query): Query<ChartQuery>,
) -> Result<Json<ChartResponse>, ApiError> {
    let session_id = query.session.clone().unwrap_or_else(|| DEFAULT_SESSION_ID.to_string());
    let options = options_from(query, &state.default_metric)?;

    let session = state.sessions.get_or_create(&session_id).await.map_err(session_error)?;
    let selection = session.select(&options).await.map_err(session_error)?;

    Ok(Json(selection.into()))
}

async fn chart_state(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<ChartState>, ApiError> {
    let session_id = query.session.as_deref().unwrap_or(DEFAULT_SESSION_ID);
    validate_session_id(session_id).map_err(session_error)?;
    Ok(Json(state.sessions.state(session_id).await))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload a CSV (`file` field, optional `ageGroup` and `metric` fields) and chart it
async fn aggregate_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ChartResponse>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut query = ChartQuery::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| reject(StatusCode::BAD_REQUEST, &format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| reject(StatusCode::BAD_REQUEST, &format!("Read error: {}", e)))?;
                file_data = Some(bytes.to_vec());
            }
            "ageGroup" => {
                query.age_group = Some(field.text().await.map_err(|e| {
                    reject(StatusCode::BAD_REQUEST, &format!("Read error: {}", e))
                })?);
            }
            "metric" => {
                query.metric = Some(field.text().await.map_err(|e| {
                    reject(StatusCode::BAD_REQUEST, &format!("Read error: {}", e))
                })?);
            }
            _ => {}
        }
    }

    let bytes = file_data.ok_or_else(|| reject(StatusCode::BAD_REQUEST, "No file provided"))?;
    let options = options_from(query, &state.default_metric)?;

    ensure_registered();
    let result = chart_from_bytes(&bytes, &state.schema, &options).map_err(|e| {
        log_error(format!("Upload aggregation failed: {}", e));
        (pipeline_status(&e), Json(error_response(&e.to_string())))
    })?;

    Ok(Json(result.into()))
}

fn options_from(query: ChartQuery, default_metric: &str) -> Result<AggregateOptions, ApiError> {
    let facet = match query.age_group.as_deref() {
        Some(label) => label
            .parse::<FacetFilter>()
            .map_err(|e| reject(StatusCode::BAD_REQUEST, &e.to_string()))?,
        None => FacetFilter::All,
    };
    let metric = query
        .metric
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| default_metric.to_string());

    Ok(AggregateOptions { facet, metric })
}

fn pipeline_status(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::Csv(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::Aggregate(AggregateError::UnknownMetric(_) | AggregateError::UnknownFacet(_)) => {
            StatusCode::BAD_REQUEST
        }
    }
}

fn session_status(err: &SessionError) -> StatusCode {
    match err {
        SessionError::Fetch(_) => StatusCode::BAD_GATEWAY,
        SessionError::Pipeline(e) => pipeline_status(e),
        SessionError::InvalidSessionId(_) => StatusCode::BAD_REQUEST,
        SessionError::TooManySessions(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn session_error(err: SessionError) -> ApiError {
    reject(session_status(&err), &err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CsvError, FetchError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CSV: &str = "Year,Age Group,Overall Total\n2019,All,\"3,900\"\n2019,25-29,300\n2020,All,4200\n";

    async fn spawn_app(dataset: DatasetSource) -> String {
        let config = AppConfig {
            dataset,
            ..AppConfig::default()
        };
        let app = router(AppState::new(&config));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    /// Serves `CSV`, holding back the first response for 500ms.
    async fn spawn_slow_first_server() -> String {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new().route(
            "/teachers.csv",
            get(move || {
                let hits = Arc::clone(&hits);
                async move {
                    if hits.fetch_add(1, Ordering::SeqCst) == 0 {
                        tokio::time::sleep(Duration::from_millis(500)).await;
                    }
                    CSV
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/teachers.csv", addr)
    }

    fn dataset_dir() -> (tempfile::TempDir, DatasetSource) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("teachers.csv");
        std::fs::write(&path, CSV).unwrap();
        (dir, DatasetSource::Path(path))
    }

    #[test]
    fn test_options_from_query() {
        let options = options_from(
            ChartQuery {
                age_group: Some("50-54".into()),
                ..ChartQuery::default()
            },
            "Overall Total",
        )
        .unwrap();
        assert_eq!(options.facet.label(), "50-54");
        assert_eq!(options.metric, "Overall Total");

        let err = options_from(
            ChartQuery {
                age_group: Some("60+".into()),
                ..ChartQuery::default()
            },
            "Overall Total",
        )
        .unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            session_status(&SessionError::InvalidSessionId("a b".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            session_status(&SessionError::TooManySessions(1)),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            session_status(&SessionError::Fetch(FetchError::RequestFailed("refused".into()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            pipeline_status(&PipelineError::Csv(CsvError::EmptyFile)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn test_chart_endpoint() {
        let (_dir, source) = dataset_dir();
        let base = spawn_app(source).await;

        let body: Value = reqwest::get(format!("{}/api/chart", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ready");
        assert_eq!(body["chart"]["labels"], json!(["2019", "2020"]));
        assert_eq!(body["chart"]["values"], json!([4200, 4200]));
        assert_eq!(body["chart"]["yAxis"]["max"], 5000);
        assert_eq!(body["chart"]["yAxis"]["step"], 1000);
    }

    #[tokio::test]
    async fn test_chart_endpoint_facet_and_state() {
        let (_dir, source) = dataset_dir();
        let base = spawn_app(source).await;

        let body: Value = reqwest::get(format!("{}/api/chart?ageGroup=25-29", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["chart"]["values"], json!([300, 0]));
        assert_eq!(body["chart"]["datasetLabel"], "25-29");

        let state: Value = reqwest::get(format!("{}/api/chart/state", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(state["status"], "ready");
        assert_eq!(state["chart"]["facet"], "25-29");
    }

    #[tokio::test]
    async fn test_chart_endpoint_fetch_failure() {
        let base = spawn_app(DatasetSource::parse("/nonexistent/teachers.csv")).await;
        let response = reqwest::get(format!("{}/api/chart", base)).await.unwrap();
        assert_eq!(response.status().as_u16(), 502);

        let state: Value = reqwest::get(format!("{}/api/chart/state", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(state["status"], "failed");
    }

    #[tokio::test]
    async fn test_unknown_age_group_rejected() {
        let (_dir, source) = dataset_dir();
        let base = spawn_app(source).await;
        let response = reqwest::get(format!("{}/api/chart?ageGroup=All%20Ages", base))
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);
    }

    #[tokio::test]
    async fn test_facets_endpoint() {
        let (_dir, source) = dataset_dir();
        let base = spawn_app(source).await;
        let body: Value = reqwest::get(format!("{}/api/facets", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["options"][0], "All");
        assert_eq!(body["options"][8], "55 and above");
    }

    #[tokio::test]
    async fn test_upload_endpoint() {
        let (_dir, source) = dataset_dir();
        let base = spawn_app(source).await;

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(CSV.as_bytes().to_vec()).file_name("teachers.csv"),
            )
            .text("ageGroup", "25-29");
        let response = reqwest::Client::new()
            .post(format!("{}/api/aggregate", base))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["chart"]["values"], json!([300, 0]));
        assert_eq!(body["csvInfo"]["rowCount"], 3);
    }

    #[tokio::test]
    async fn test_upload_without_file() {
        let (_dir, source) = dataset_dir();
        let base = spawn_app(source).await;

        let form = reqwest::multipart::Form::new().text("ageGroup", "25-29");
        let response = reqwest::Client::new()
            .post(format!("{}/api/aggregate", base))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);
    }

    #[tokio::test]
    async fn test_static_dataset_served() {
        let (_dir, source) = dataset_dir();
        let base = spawn_app(source).await;
        let text = reqwest::get(format!("{}/data/dataset.csv", base))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(text.starts_with("Year,Age Group"));
    }

    #[tokio::test]
    async fn test_dataset_siblings_not_served() {
        let (dir, source) = dataset_dir();
        std::fs::write(dir.path().join(".env"), "SECRET=1\n").unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\n").unwrap();
        let base = spawn_app(source).await;

        for path in ["/data/Cargo.toml", "/data/.env", "/data/teachers.csv", "/data/"] {
            let response = reqwest::get(format!("{}{}", base, path)).await.unwrap();
            assert_eq!(response.status().as_u16(), 404, "{} must not be served", path);
        }
    }

    #[tokio::test]
    async fn test_overlapping_clients_in_separate_sessions() {
        let base = spawn_app(DatasetSource::parse(&spawn_slow_first_server().await)).await;

        let slow = tokio::spawn(reqwest::get(format!("{}/api/chart?ageGroup=25-29&session=a", base)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        let fast = reqwest::get(format!("{}/api/chart?session=b", base)).await.unwrap();
        assert_eq!(fast.status().as_u16(), 200);

        let slow = slow.await.unwrap().unwrap();
        assert_eq!(slow.status().as_u16(), 200);
        let body: Value = slow.json().await.unwrap();
        assert_eq!(body["published"], true);
        assert_eq!(body["chart"]["values"], json!([300, 0]));

        let state: Value = reqwest::get(format!("{}/api/chart/state?session=a", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(state["chart"]["facet"], "25-29");
    }

    #[tokio::test]
    async fn test_overlapping_requests_in_one_session() {
        let base = spawn_app(DatasetSource::parse(&spawn_slow_first_server().await)).await;

        let slow = tokio::spawn(reqwest::get(format!("{}/api/chart?ageGroup=25-29", base)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        let fast: Value = reqwest::get(format!("{}/api/chart", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(fast["published"], true);

        // The older request still gets its own chart, but it is not published.
        let slow = slow.await.unwrap().unwrap();
        assert_eq!(slow.status().as_u16(), 200);
        let body: Value = slow.json().await.unwrap();
        assert_eq!(body["published"], false);
        assert_eq!(body["chart"]["values"], json!([300, 0]));

        let state: Value = reqwest::get(format!("{}/api/chart/state", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(state["chart"]["facet"], "All");
        assert_eq!(state["chart"]["values"], json!([4200, 4200]));
    }

    #[tokio::test]
    async fn test_invalid_session_rejected() {
        let (_dir, source) = dataset_dir();
        let base = spawn_app(source).await;
        for path in ["/api/chart?session=a%20b", "/api/chart/state?session=..%2Fx"] {
            let response = reqwest::get(format!("{}{}", base, path)).await.unwrap();
            assert_eq!(response.status().as_u16(), 400);
        }
    }
}
