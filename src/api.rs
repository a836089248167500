//! HTTP surface: routing, bearer authentication, request parsing and the
//! mapping of service errors onto status codes.

use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::{Path, Query, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use http::header::AUTHORIZATION;
use http::{HeaderMap, StatusCode};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::PageLimits;
use crate::db::models::{Sensor, SensorReading};
use crate::db::store::{PgPool, PgStore};
use crate::error::SensorDataError;
use crate::pagination::Pagination;
use crate::services::summary::PeriodSummary;
use crate::services::{ingest, query, summary};
use crate::time_range::TimeRange;
use crate::utils::parse_lenient_int;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub api_token: String,
    pub page_limits: PageLimits,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    error: String,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>) -> Self {
        ApiError {
            status,
            error: error.into(),
        }
    }

    fn unauthorized() -> Self {
        ApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Which endpoint family failed; the client-facing wording differs per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Create,
    Readings,
    CalendarSummary,
    Trailing,
}

fn reject(endpoint: Endpoint, err: SensorDataError) -> ApiError {
    match err {
        SensorDataError::MissingRequiredField(_) if endpoint == Endpoint::Create => {
            ApiError::new(StatusCode::BAD_REQUEST, "Missing sensor_code or value")
        }
        SensorDataError::MissingRequiredField(_) => ApiError::new(StatusCode::BAD_REQUEST, "sensor_code is required"),
        SensorDataError::InvalidPeriod(_) if endpoint == Endpoint::CalendarSummary => {
            ApiError::new(StatusCode::BAD_REQUEST, "Invalid period type")
        }
        SensorDataError::InvalidPeriod(_) => ApiError::new(StatusCode::BAD_REQUEST, "Invalid period"),
        e @ SensorDataError::InvalidSensorCode(_) => ApiError::new(StatusCode::BAD_REQUEST, e.to_string()),
        SensorDataError::Store(e) => {
            error!("{:?} request failed: {}", endpoint, e);
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// Token from an `Authorization` header: the last whitespace-separated word,
/// so both `Bearer <token>` and a bare `<token>` are accepted.
fn presented_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_whitespace().last())
}

async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if presented_token(request.headers()) != Some(state.api_token.as_str()) {
        warn!("Rejected unauthenticated {} {}", request.method(), request.uri().path());
        return ApiError::unauthorized().into_response();
    }
    next.run(request).await
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sensor_data", post(create_reading))
        .route("/sensors", get(list_sensors))
        .route("/sensor_data/:sensor_code", get(list_readings))
        .route("/sensor_data/:sensor_code/:period_type", get(calendar_summary))
        .route("/sensor_data/:sensor_code/last/:window", get(last_readings))
        .route("/sensor_data/:sensor_code/daily-last/:window", get(trailing_daily_summary))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer))
        // health stays outside the bearer gate
        .route("/up", get(up))
        .with_state(state)
}

/// Run `op` against a pooled Postgres connection on the blocking thread pool.
async fn with_store<T, F>(state: &AppState, op: F) -> Result<T, SensorDataError>
where
    T: Send + 'static,
    F: FnOnce(&mut PgStore<'_>) -> Result<T, SensorDataError> + Send + 'static,
{
    let pool = state.pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        op(&mut PgStore::new(&mut conn))
    })
    .await
    .map_err(|e| SensorDataError::Store(format!("blocking task failed: {}", e)))?
}

#[derive(Debug, Serialize)]
struct StatusBody {
    status: &'static str,
}

async fn up() -> Json<StatusBody> {
    Json(StatusBody { status: "ok" })
}

/// `value` arrives as whatever JSON scalar the device sent; it is stored as text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum ReadingValue {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl ReadingValue {
    fn into_text(self) -> String {
        match self {
            ReadingValue::Text(s) => s,
            ReadingValue::Number(n) => n.to_string(),
            ReadingValue::Bool(b) => b.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CreateReadingBody {
    #[serde(default)]
    sensor_code: Option<String>,
    #[serde(default)]
    value: Option<ReadingValue>,
}

fn parse_create_body(body: &[u8]) -> Result<CreateReadingBody, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CreateReadingBody::default());
    }
    let de = &mut serde_json::Deserializer::from_slice(body);
    serde_path_to_error::deserialize(de).map_err(|e| {
        let path = e.path().to_string();
        ApiError::new(
            StatusCode::BAD_REQUEST,
            format!("Invalid JSON body at {}: {}", path, e.into_inner()),
        )
    })
}

async fn create_reading(State(state): State<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let body = parse_create_body(&body)?;
    let sensor_code = body.sensor_code;
    let value = body.value.map(ReadingValue::into_text);

    with_store(&state, move |store| {
        ingest::record_reading(store, sensor_code.as_deref(), value.as_deref())
    })
    .await
    .map_err(|e| reject(Endpoint::Create, e))?;

    Ok((StatusCode::CREATED, Json(StatusBody { status: "ok" })).into_response())
}

async fn list_sensors(State(state): State<AppState>) -> Result<Json<Vec<Sensor>>, ApiError> {
    with_store(&state, |store| query::list_sensors(store))
        .await
        .map(Json)
        .map_err(|e| reject(Endpoint::Readings, e))
}

/// `after`/`before`/`page`/`per`, all optional and all parsed leniently.
#[derive(Debug, Default, Deserialize)]
struct ListParams {
    after: Option<String>,
    before: Option<String>,
    page: Option<String>,
    per: Option<String>,
}

impl ListParams {
    fn range(&self) -> TimeRange {
        TimeRange::resolve(self.after.as_deref(), self.before.as_deref())
    }

    fn pagination(&self, limits: &PageLimits, max_per_page: i64) -> Pagination {
        Pagination::new(
            parse_lenient_int(self.page.as_deref()),
            parse_lenient_int(self.per.as_deref()),
            limits.default_per_page,
            max_per_page,
        )
    }
}

async fn list_readings(
    State(state): State<AppState>,
    Path(sensor_code): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<SensorReading>>, ApiError> {
    let range = params.range();
    let page = params.pagination(&state.page_limits, state.page_limits.raw_max_per_page);
    with_store(&state, move |store| query::list_readings(store, Some(&sensor_code), &range, &page))
        .await
        .map(Json)
        .map_err(|e| reject(Endpoint::Readings, e))
}

async fn calendar_summary(
    State(state): State<AppState>,
    Path((sensor_code, period_type)): Path<(String, String)>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<PeriodSummary>>, ApiError> {
    let range = params.range();
    let page = params.pagination(&state.page_limits, state.page_limits.summary_max_per_page);
    with_store(&state, move |store| {
        summary::summarize(store, Some(&sensor_code), &period_type, &range, &page)
    })
    .await
    .map(Json)
    .map_err(|e| reject(Endpoint::CalendarSummary, e))
}

async fn last_readings(
    State(state): State<AppState>,
    Path((sensor_code, window)): Path<(String, String)>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<SensorReading>>, ApiError> {
    let page = params.pagination(&state.page_limits, state.page_limits.raw_max_per_page);
    let now = Utc::now();
    with_store(&state, move |store| {
        query::last_readings(store, Some(&sensor_code), &window, now, &page)
    })
    .await
    .map(Json)
    .map_err(|e| reject(Endpoint::Trailing, e))
}

async fn trailing_daily_summary(
    State(state): State<AppState>,
    Path((sensor_code, window)): Path<(String, String)>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<PeriodSummary>>, ApiError> {
    let page = params.pagination(&state.page_limits, state.page_limits.summary_max_per_page);
    let now = Utc::now();
    with_store(&state, move |store| {
        summary::summarize_trailing_daily(store, Some(&sensor_code), &window, now, &page)
    })
    .await
    .map(Json)
    .map_err(|e| reject(Endpoint::Trailing, e))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested; draining in-flight requests"),
        Err(e) => {
            error!("Unable to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), String> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("bind {} failed: {}", addr, e))?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("HTTP server failed: {}", e))
}
