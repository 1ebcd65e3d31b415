//! HTTP request handlers for the prefab automation API

use crate::core::AppState;
use crate::prefab::{CreatePrefabRequest, PrefabCreated, PrefabSummary, ToolResult, ValidationReport};
use crate::system::health::{self, HealthStatus};
use crate::system::metrics;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    Json as JsonExtractor,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response envelope shared by every JSON endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// True when the operation completed
    pub success: bool,
    /// Operation output
    pub data: Option<T>,
    /// Failure or informational message
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Successful response without a message
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), message: None }
    }

    /// Failed response
    pub fn error(message: impl Into<String>) -> Self {
        Self { success: false, data: None, message: Some(message.into()) }
    }
}

impl<T> From<ToolResult<T>> for ApiResponse<T> {
    fn from(result: ToolResult<T>) -> Self {
        Self {
            success: result.success,
            data: result.data,
            message: result.error,
        }
    }
}

type JsonResponse<T> = (StatusCode, Json<ApiResponse<T>>);

fn respond<T>(result: ToolResult<T>, success: StatusCode) -> JsonResponse<T> {
    let status = if result.success { success } else { StatusCode::BAD_REQUEST };
    (status, Json(result.into()))
}

/// Body of `POST /api/v1/prefabs/validate`: a stored prefab path or an inline document
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    /// Path of a stored prefab
    pub path: Option<String>,
    /// Document to validate as is
    pub document: Option<Value>,
}

/// Query of `GET /api/v1/prefabs/info`
#[derive(Debug, Deserialize)]
pub struct InfoQuery {
    /// Prefab asset path
    pub path: String,
}

/// `POST /api/v1/prefabs`
pub async fn create_prefab(
    State(state): State<AppState>,
    JsonExtractor(request): JsonExtractor<CreatePrefabRequest>,
) -> JsonResponse<PrefabCreated> {
    let result = state.service.create_prefab(request).await;
    respond(result, StatusCode::CREATED)
}

/// `POST /api/v1/prefabs/validate`
pub async fn validate_prefab(
    State(state): State<AppState>,
    JsonExtractor(request): JsonExtractor<ValidateRequest>,
) -> JsonResponse<ValidationReport> {
    let result = match (request.document, request.path) {
        (Some(document), _) => state.service.validate_document(&document),
        (None, Some(path)) => state.service.validate_prefab(&path).await,
        (None, None) => ToolResult::err("either `path` or `document` is required"),
    };
    respond(result, StatusCode::OK)
}

/// `GET /api/v1/prefabs/info?path=`
pub async fn prefab_info(
    State(state): State<AppState>,
    Query(query): Query<InfoQuery>,
) -> JsonResponse<PrefabSummary> {
    let result = state.service.prefab_info(&query.path).await;
    let status = if result.success { StatusCode::OK } else { StatusCode::NOT_FOUND };
    (status, Json(result.into()))
}

/// `GET /api/v1/health`
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::ok(health::check(state.storage_backend())))
}

/// `GET /metrics` in Prometheus text format
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::collect_metrics(),
    )
}
