//! HTTP routes for the server.

use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use snipvault_core::{CoreError, Snippet};
use snipvault_history::HistoryEntry;
use std::collections::BTreeMap;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/snippets", get(snippet_list).post(snippet_create))
        .route(
            "/api/snippets/{id}",
            get(snippet_get).put(snippet_update).delete(snippet_delete),
        )
        .route("/api/snippets/{id}/history", get(snippet_history))
        .route("/api/snippets/{id}/diff/{hash}", get(snippet_diff))
        .route("/api/snippets/{id}/tracking", get(snippet_tracking))
        .route("/api/snippets/{id}/git-status", get(snippet_tracking))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize)]
struct SnippetResponse {
    id: String,
    name: String,
    content: String,
    tracking: bool,
    last_modified: DateTime<Utc>,
}

impl From<Snippet> for SnippetResponse {
    fn from(s: Snippet) -> Self {
        Self {
            id: s.id,
            name: s.name,
            content: s.content,
            tracking: s.tracking,
            last_modified: s.updated_at,
        }
    }
}

/// Listing entry; the id is the map key.
#[derive(Debug, Serialize)]
struct SnippetSummary {
    name: String,
    content: String,
    tracking: bool,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct HistoryEntryResponse {
    hash: String,
    message: String,
    author: String,
    date: DateTime<Utc>,
    content: String,
}

impl From<HistoryEntry> for HistoryEntryResponse {
    fn from(e: HistoryEntry) -> Self {
        Self {
            hash: e.commit_ref.as_str().to_string(),
            message: e.message,
            author: e.author,
            date: e.timestamp,
            content: e.content,
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
    code: String,
}

impl ApiError {
    fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }

    fn not_found(msg: impl Into<String>) -> (StatusCode, Json<Self>) {
        (StatusCode::NOT_FOUND, Json(Self::new(msg, "NOT_FOUND")))
    }

    fn bad_request(msg: impl Into<String>) -> (StatusCode, Json<Self>) {
        (StatusCode::BAD_REQUEST, Json(Self::new(msg, "BAD_REQUEST")))
    }

    fn internal(msg: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Self::new(msg, "INTERNAL_ERROR")),
        )
    }

    /// Map a core error onto the matching status code.
    fn from_core(e: CoreError) -> (StatusCode, Json<Self>) {
        if e.is_not_found() {
            Self::not_found(e.to_string())
        } else if e.is_invalid_input() {
            Self::bad_request(e.to_string())
        } else {
            error!(error = %e, "Request failed");
            Self::internal(e.to_string())
        }
    }
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

/// Unwrap a JSON body, reporting malformed input as a 400 `ApiError`.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

// =============================================================================
// Endpoints
// =============================================================================

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "healthy": true,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn snippet_list(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let snippets = state.service.list().await.map_err(ApiError::from_core)?;

    let listing: BTreeMap<String, SnippetSummary> = snippets
        .into_iter()
        .map(|s| {
            (
                s.id,
                SnippetSummary {
                    name: s.name,
                    content: s.content,
                    tracking: s.tracking,
                    last_modified: s.updated_at,
                },
            )
        })
        .collect();
    Ok(Json(listing))
}

#[derive(Debug, Deserialize)]
struct CreateSnippetRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    content: String,
    #[serde(default, alias = "git_tracking")]
    tracking: bool,
}

async fn snippet_create(
    State(state): State<AppState>,
    body: Result<Json<CreateSnippetRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = json_body(body)?;
    let snippet = state
        .service
        .create(&req.name, &req.content, req.tracking)
        .await
        .map_err(ApiError::from_core)?;
    Ok((StatusCode::CREATED, Json(SnippetResponse::from(snippet))))
}

async fn snippet_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let snippet = state.service.get(&id).await.map_err(ApiError::from_core)?;
    Ok(Json(SnippetResponse::from(snippet)))
}

#[derive(Debug, Deserialize)]
struct UpdateSnippetRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    content: String,
}

async fn snippet_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateSnippetRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = json_body(body)?;
    let snippet = state
        .service
        .update(&id, req.name.as_deref(), &req.content)
        .await
        .map_err(ApiError::from_core)?;
    Ok(Json(SnippetResponse::from(snippet)))
}

async fn snippet_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state
        .service
        .delete(&id)
        .await
        .map_err(ApiError::from_core)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn snippet_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let history = state
        .service
        .history(&id)
        .await
        .map_err(ApiError::from_core)?;
    let entries: Vec<HistoryEntryResponse> = history.into_iter().map(Into::into).collect();
    Ok(Json(entries))
}

async fn snippet_diff(
    State(state): State<AppState>,
    Path((id, hash)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    match state
        .service
        .diff(&id, &hash)
        .await
        .map_err(ApiError::from_core)?
    {
        Some(diff) => Ok(Json(serde_json::json!({ "diff": diff }))),
        None => Err(ApiError::not_found("Diff not found")),
    }
}

async fn snippet_tracking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let tracked = state
        .service
        .is_tracked(&id)
        .await
        .map_err(ApiError::from_core)?;
    Ok(Json(serde_json::json!({ "tracked": tracked })))
}
