//! HTTP routes.
//!
//! | Method | Path                            | Operation |
//! |--------|---------------------------------|-----------|
//! | POST   | `/user/admin/verification-code` | verify    |
//! | PUT    | `/user/admin/verification-code` | consume   |
//! | GET    | `/found-items`                  | list      |
//! | GET    | `/found-items/:name`            | fetch     |
//! | PUT    | `/found-items/:name`            | upload    |
//! | POST   | `/delete-item`                  | delete    |
//! | GET    | `/health`                       | health    |
//!
//! Errors are JSON `{ "status": ..., "message": ... }` bodies whose status is
//! the stable [`ErrorKind`] identifier. Store details stay in the logs.

use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Path, Query, State,
        rejection::{BytesRejection, JsonRejection},
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use finditnow_state::{
    AccessCodeConsumer, AccessCodeVerifier, AccessError, CatalogError, CatalogLister,
    CatalogMutator,
};
use finditnow_types::{Classify, Deletion, ErrorKind, UploadRequest, Verdict, config::FindItNowConfig};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Name reported by the health endpoint.
pub const SERVICE_NAME: &str = "finditnow";

/// Engines shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub(crate) verifier: AccessCodeVerifier,
    pub(crate) consumer: AccessCodeConsumer,
    pub(crate) lister: CatalogLister,
    pub(crate) mutator: CatalogMutator,
}

/// Builds the router with CORS, timeout, body limit and request tracing.
pub fn router(state: AppState, config: &FindItNowConfig) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/user/admin/verification-code", post(verify_code).put(consume_code))
        .route("/found-items", get(list_items))
        .route("/found-items/:name", get(fetch_item).put(upload_item))
        .route("/delete-item", post(delete_item))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.catalog.max_upload_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.http.request_timeout,
        ))
        .layer(TraceLayer::new_for_http());

    if config.http.permissive_cors { router.layer(CorsLayer::permissive()) } else { router }
}

// ============================================================================
// Bodies
// ============================================================================

/// `{ "status": ..., "message": ... }`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusBody {
    pub status: String,
    pub message: String,
}

impl StatusBody {
    fn new(status: &str, message: impl Into<String>) -> Self {
        Self { status: status.to_string(), message: message.into() }
    }
}

/// `GET /health` response.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthBody {
    /// `ok`, or `store_unavailable` when either store is unreachable.
    pub status: String,
    pub service: String,
    pub code_table: String,
    pub catalog: String,
}

/// Successful upload.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadedBody {
    pub status: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct CodeRequest {
    #[serde(default)]
    code: String,
}

#[derive(Debug, Deserialize)]
struct DeleteRequest {
    #[serde(default)]
    key: String,
    // Legacy clients still send the bucket; the server has a single catalog.
    #[serde(default)]
    #[allow(dead_code)]
    bucket: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct UploadParams {
    observed: Option<String>,
    original: Option<String>,
}

// ============================================================================
// Errors
// ============================================================================

/// Error response carrying only the classification.
#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
}

impl ApiError {
    fn from_kind(kind: ErrorKind) -> Self {
        Self { kind, message: kind.public_message().to_string() }
    }

    fn rejected(rejection: impl std::fmt::Display) -> Self {
        tracing::debug!(error = %rejection, "Request body rejected");
        Self::from_kind(ErrorKind::Invalid)
    }

    fn classified<E: Classify + std::fmt::Display>(err: &E) -> Self {
        let kind = err.kind();
        match kind {
            ErrorKind::Internal => tracing::error!(error = %err, "Request failed"),
            ErrorKind::StoreUnavailable => {
                tracing::warn!(error = %err, kind = %kind, "Request failed: store unavailable");
            },
            _ => tracing::debug!(error = %err, kind = %kind, "Request rejected"),
        }
        Self::from_kind(kind)
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        Self::classified(&err)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        Self::classified(&err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response =
            (status, Json(StatusBody::new(self.kind.as_str(), self.message))).into_response();
        if self.kind.is_retryable() {
            response.headers_mut().insert(header::RETRY_AFTER, header::HeaderValue::from_static("1"));
        }
        response
    }
}

/// Runs a code table call off the async workers; redb blocks on disk I/O.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, AccessError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => {
            tracing::error!(error = %e, "Code table task failed");
            Err(ApiError::from_kind(ErrorKind::Internal))
        },
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthBody>) {
    let verifier = state.verifier.clone();
    let code_table = blocking(move || verifier.check_store()).await.is_ok();
    let catalog = state.lister.check_store().await.is_ok();

    let reachability = |up: bool| (if up { "ok" } else { "unavailable" }).to_string();
    let (status, kind) = if code_table && catalog {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, ErrorKind::StoreUnavailable.as_str())
    };
    let body = HealthBody {
        status: kind.to_string(),
        service: SERVICE_NAME.to_string(),
        code_table: reachability(code_table),
        catalog: reachability(catalog),
    };
    (status, Json(body))
}

async fn verify_code(
    State(state): State<AppState>,
    payload: Result<Json<CodeRequest>, JsonRejection>,
) -> Result<Json<StatusBody>, ApiError> {
    let Json(request) = payload.map_err(ApiError::rejected)?;
    let verifier = state.verifier.clone();
    let verdict = blocking(move || verifier.verify(&request.code)).await?;
    match verdict {
        Verdict::Valid => Ok(Json(StatusBody::new("valid", "Code is valid"))),
        Verdict::Invalid => Err(ApiError::from_kind(ErrorKind::InvalidCode)),
        Verdict::AlreadyUsed => Err(ApiError::from_kind(ErrorKind::AlreadyUsed)),
    }
}

async fn consume_code(
    State(state): State<AppState>,
    payload: Result<Json<CodeRequest>, JsonRejection>,
) -> Result<Json<StatusBody>, ApiError> {
    let Json(request) = payload.map_err(ApiError::rejected)?;
    let consumer = state.consumer.clone();
    blocking(move || consumer.consume(&request.code)).await?;
    Ok(Json(StatusBody::new("used", "Code marked as used")))
}

async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.lister.list().await?))
}

async fn fetch_item(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let entry = state.lister.fetch(&name).await?;
    Ok(([(header::CONTENT_TYPE, entry.media_type)], entry.content).into_response())
}

async fn upload_item(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<UploadedBody>), ApiError> {
    let body = body.map_err(ApiError::rejected)?;

    let observed = match params.observed {
        Some(list) => {
            list.split(',').map(str::trim).filter(|n| !n.is_empty()).map(String::from).collect()
        },
        None => state.lister.list().await?,
    };

    let request = UploadRequest {
        name,
        original_name: params.original,
        content: body.to_vec(),
        media_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(String::from),
    };

    let name = state.mutator.upload(request, &observed).await?;
    Ok((StatusCode::CREATED, Json(UploadedBody { status: "created".to_string(), name })))
}

async fn delete_item(
    State(state): State<AppState>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<StatusBody>, ApiError> {
    let Json(request) = payload.map_err(ApiError::rejected)?;
    let body = match state.mutator.delete(&request.key).await? {
        Deletion::Removed => StatusBody::new("deleted", "Item deleted successfully"),
        Deletion::Absent => StatusBody::new("absent", "Item was already gone"),
    };
    Ok(Json(body))
}
