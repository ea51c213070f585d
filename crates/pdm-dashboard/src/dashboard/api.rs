//! REST API endpoints for the dashboard
//!
//! Every page of the UI is backed by one of these routes. Responses use the
//! [`ApiResponse`] envelope except the CSV export, which is sent as a file.

use axum::{
    Json, Router,
    extract::{
        FromRequest, FromRequestParts, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::alerts::AlertStreamSnapshot;
use crate::chart::ChartSet;
use crate::export::CSV_CONTENT_TYPE;
use crate::model::{DcpConfig, DcpConfigForm, Machine, MachineForm, MachinePatch};
use crate::pages::anomalies::{self, AnomalyListing, AnomalyRow, SearchWindow};
use crate::pages::dcp_configs::{self, DcpConfigRow};
use crate::pages::overview::{self, Overview};
use crate::pages::sensor_data::{self, SensorQuery, SensorRow};
use crate::pages::{PageError, machines};
use crate::pagination::{DEFAULT_PAGE_SIZE, PageRequest, Paginated};
use crate::state::AppState;

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    /// Per-field messages of a rejected form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: u64,
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            details: None,
            timestamp: now_secs(),
        }
    }

    pub fn error(message: &str) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.to_string()),
            details: None,
            timestamp: now_secs(),
        }
    }
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid input: {message}")]
    Unprocessable {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PageError> for ApiError {
    fn from(e: PageError) -> Self {
        match e {
            PageError::Validation(errors) => ApiError::Unprocessable {
                message: errors.to_string(),
                details: serde_json::to_value(&errors).ok(),
            },
            PageError::Pagination(e) => ApiError::Unprocessable {
                message: e.to_string(),
                details: None,
            },
            PageError::MissingParameter(_) | PageError::InvalidRange(_) => {
                ApiError::BadRequest(e.to_string())
            }
            PageError::Upstream(e) if e.is_not_found() => ApiError::NotFound(e.to_string()),
            PageError::Upstream(e) => ApiError::Upstream(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Unprocessable { message, details } => {
                (StatusCode::UNPROCESSABLE_ENTITY, message, details)
            }
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg, None),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
        };

        let mut body = ApiResponse::<()>::error(&message);
        body.details = details;
        (status, Json(body)).into_response()
    }
}

/// Name of the field a body is missing, from serde's `missing field` message
fn missing_field(message: &str) -> Option<&str> {
    let rest = &message[message.find("missing field `")? + "missing field `".len()..];
    rest.split('`').next()
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        match rejection {
            JsonRejection::JsonDataError(_) => {
                let details = match missing_field(&message) {
                    Some(field) => serde_json::json!({ field: format!("{field} is required") }),
                    None => serde_json::json!({ "body": message.clone() }),
                };
                ApiError::Unprocessable {
                    message,
                    details: Some(details),
                }
            }
            _ => ApiError::BadRequest(message),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// `axum::Json` answering rejections with the API envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
struct ApiJson<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
struct ApiPath<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
struct ApiQuery<T>(T);

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

/// Query of the paged listings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl ListQuery {
    fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page.unwrap_or(1), self.page_size.unwrap_or(DEFAULT_PAGE_SIZE))
    }

    fn sensor_query(&self, machine_id: i64) -> SensorQuery<'_> {
        SensorQuery {
            machine_id: Some(machine_id),
            start: self.start.as_deref(),
            end: self.end.as_deref(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub max_points: Option<usize>,
}

/// Create API router
pub fn create_api_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Overview
        .route("/overview", get(get_overview))
        // Machines
        .route("/machines", get(get_machines).post(create_machine))
        .route(
            "/machines/{id}",
            get(get_machine).put(update_machine).delete(delete_machine),
        )
        .route("/machine-types", get(get_machine_types))
        // DCP configs
        .route("/dcp-configs", get(get_dcp_configs).post(create_dcp_config))
        .route(
            "/dcp-configs/{id}",
            get(get_dcp_config)
                .put(update_dcp_config)
                .delete(delete_dcp_config),
        )
        // Sensor data
        .route("/machines/{id}/sensor-data", get(get_sensor_data))
        .route("/machines/{id}/sensor-data/chart", get(get_sensor_charts))
        .route("/machines/{id}/sensor-data/export", get(export_sensor_data))
        // Anomalies
        .route("/machines/{id}/anomalies", get(get_machine_anomalies))
        .route("/anomalies", get(get_anomalies))
        .route("/anomalies/search-window", get(get_search_window))
        // System
        .route("/health", get(health_check))
        .with_state(state)
}

/// Get dashboard overview
async fn get_overview(State(state): State<Arc<AppState>>) -> ApiResult<Overview> {
    ok(overview::load(&state).await)
}

async fn get_machines(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Machine>> {
    ok(machines::list(&state).await?)
}

async fn get_machine(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Machine> {
    ok(machines::get(&state, id).await?)
}

async fn create_machine(
    State(state): State<Arc<AppState>>,
    ApiJson(form): ApiJson<MachineForm>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ApiError> {
    machines::create(&state, &form).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(()))))
}

async fn update_machine(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<MachinePatch>,
) -> ApiResult<()> {
    machines::update(&state, id, &patch).await?;
    ok(())
}

async fn delete_machine(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    machines::delete(&state, id).await?;
    ok(())
}

async fn get_machine_types() -> ApiResult<Vec<&'static str>> {
    ok(machines::machine_types())
}

async fn get_dcp_configs(State(state): State<Arc<AppState>>) -> ApiResult<Vec<DcpConfigRow>> {
    ok(dcp_configs::list(&state).await?)
}

async fn get_dcp_config(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<DcpConfig> {
    ok(dcp_configs::get(&state, id).await?)
}

async fn create_dcp_config(
    State(state): State<Arc<AppState>>,
    ApiJson(form): ApiJson<DcpConfigForm>,
) -> Result<(StatusCode, Json<ApiResponse<()>>), ApiError> {
    dcp_configs::create(&state, &form).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(()))))
}

async fn update_dcp_config(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(form): ApiJson<DcpConfigForm>,
) -> ApiResult<()> {
    dcp_configs::update(&state, id, &form).await?;
    ok(())
}

async fn delete_dcp_config(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<()> {
    dcp_configs::delete(&state, id).await?;
    ok(())
}

/// Paged sensor readings of one machine
async fn get_sensor_data(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Paginated<SensorRow>> {
    ok(sensor_data::table(&state, &query.sensor_query(id), query.page_request()).await?)
}

async fn get_sensor_charts(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<ChartQuery>,
) -> ApiResult<ChartSet> {
    let sensor_query = SensorQuery {
        machine_id: Some(id),
        start: query.start.as_deref(),
        end: query.end.as_deref(),
    };
    ok(sensor_data::charts(&state, &sensor_query, query.max_points).await?)
}

/// CSV attachment, or `204 No Content` when the range is empty
async fn export_sensor_data(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Response, ApiError> {
    let now_millis = chrono::Utc::now().timestamp_millis();
    let export = sensor_data::export(&state, &query.sensor_query(id), now_millis).await?;

    Ok(match export {
        Some(export) => (
            [
                (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", export.filename),
                ),
            ],
            export.body,
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

async fn get_machine_anomalies(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Vec<AnomalyRow>> {
    ok(anomalies::for_machine(&state, id).await?)
}

/// All anomalies, or a date-range search when `start` and `end` are given
async fn get_anomalies(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<AnomalyListing> {
    let listing = anomalies::list(
        &state,
        query.start.as_deref(),
        query.end.as_deref(),
        query.page_request(),
    )
    .await?;
    ok(listing)
}

async fn get_search_window() -> ApiResult<SearchWindow> {
    ok(anomalies::default_search_window(
        chrono::Local::now().naive_local(),
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub alert_stream: AlertStreamSnapshot,
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> ApiResult<HealthStatus> {
    ok(HealthStatus {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        alert_stream: state.alert_status.snapshot(),
    })
}
