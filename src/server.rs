//! HTTP surface over the [`Store`].
//!
//! | Method | Path | Effect |
//! |---|---|---|
//! | `PUT` | `/` (or any path) | Store the body as a new source image, redirect to it |
//! | `POST` | `<file in container>` | `format=<segment>` reserves a variant, `metadata=<text>` writes the sidecar; redirect to the result |
//! | `GET` | `<any path>` | Serve the file, rendering placeholders on first read |
//! | `DELETE` | `<source>` / `<variant>` | Remove the whole container / just the file |
//!
//! Store calls are synchronous file and pixel work, so each one runs on the
//! blocking pool via [`tokio::task::spawn_blocking`].

use crate::store::{Artifact, Store, StoreError};
use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::header::{CONTENT_TYPE, IF_MODIFIED_SINCE, LAST_MODIFIED};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, put};
use axum::Form;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;
use tower_http::trace::TraceLayer;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    /// Largest accepted request body, in bytes.
    pub max_upload_bytes: usize,
}

/// HTTP-facing error. Server-side failures are logged and reported without
/// detail.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(path) => Self::NotFound(path),
            StoreError::Forbidden(path) => Self::Forbidden(path),
            StoreError::Parse(_) | StoreError::InvalidImage(_) | StoreError::InvalidPath(_) => {
                Self::BadRequest(e.to_string())
            }
            StoreError::Allocation(_) | StoreError::Render(_) | StoreError::Io(_) => {
                Self::Internal(e.to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "not found".to_string()),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden".to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Internal(_) => {
                tracing::error!(error = %self, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, message).into_response()
    }
}

/// Build the router with tracing and the upload size limit applied.
pub fn router(state: AppState) -> Router {
    let limit = state.max_upload_bytes;
    Router::new()
        .route("/", put(upload).get(fetch_root))
        .route(
            "/*path",
            get(fetch).post(reserve).delete(remove).put(upload),
        )
        .layer(DefaultBodyLimit::max(limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutting down");
}

/// Run a store call on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("worker task failed: {e}")))?
        .map_err(AppError::from)
}

// ============================================================================
// Handlers
// ============================================================================

async fn upload(State(state): State<AppState>, body: Bytes) -> Result<Redirect, AppError> {
    let store = state.store.clone();
    let url = blocking(move || store.put(&body)).await?;
    Ok(Redirect::to(&url))
}

/// Form fields accepted by `POST`.
#[derive(Debug, Deserialize)]
struct PostForm {
    format: Option<String>,
    metadata: Option<String>,
}

async fn reserve(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Form(form): Form<PostForm>,
) -> Result<Redirect, AppError> {
    let store = state.store.clone();
    let url = match (form.format, form.metadata) {
        (Some(segment), _) => blocking(move || store.reserve(&path, &segment)).await?,
        (None, Some(text)) => blocking(move || store.write_metadata(&path, &text)).await?,
        (None, None) => {
            return Err(AppError::BadRequest(
                "missing form field: format or metadata".into(),
            ));
        }
    };
    Ok(Redirect::to(&url))
}

async fn fetch_root(state: State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    fetch(state, Path(String::new()), headers).await
}

async fn fetch(
    State(state): State<AppState>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let store = state.store.clone();
    let artifact = blocking(move || store.read(&path)).await?;
    Ok(artifact_response(artifact, &headers))
}

async fn remove(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<StatusCode, AppError> {
    let store = state.store.clone();
    blocking(move || store.delete(&path)).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn artifact_response(artifact: Artifact, headers: &HeaderMap) -> Response {
    let last_modified = http_date(artifact.modified);
    if not_modified(headers, artifact.modified) {
        return (StatusCode::NOT_MODIFIED, [(LAST_MODIFIED, last_modified)]).into_response();
    }
    (
        [
            (CONTENT_TYPE, artifact.content_type.to_string()),
            (LAST_MODIFIED, last_modified),
        ],
        artifact.bytes,
    )
        .into_response()
}

// ============================================================================
// HTTP dates
// ============================================================================

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Whether `If-Modified-Since` covers `modified` (at one-second precision).
fn not_modified(headers: &HeaderMap, modified: SystemTime) -> bool {
    let Some(since) = headers
        .get(IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| DateTime::parse_from_rfc2822(v).ok())
    else {
        return false;
    };
    DateTime::<Utc>::from(modified).timestamp() <= since.timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::ParseError;
    use axum::http::HeaderValue;
    use std::time::Duration;

    fn status(e: AppError) -> StatusCode {
        e.into_response().status()
    }

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (StoreError::NotFound("/x".into()), StatusCode::NOT_FOUND),
            (StoreError::Forbidden("/x".into()), StatusCode::FORBIDDEN),
            (
                StoreError::Parse(ParseError::Unparseable("banana".into())),
                StatusCode::BAD_REQUEST,
            ),
            (StoreError::InvalidImage("empty".into()), StatusCode::BAD_REQUEST),
            (StoreError::InvalidPath("..".into()), StatusCode::BAD_REQUEST),
            (
                StoreError::Io(std::io::Error::other("disk")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(status(AppError::from(err)), expected);
        }
    }

    #[tokio::test]
    async fn internal_errors_hide_detail() {
        let response = AppError::Internal("secret path /srv/x".into()).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"internal server error");
    }

    #[test]
    fn http_date_is_imf_fixdate() {
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(784111777);
        assert_eq!(http_date(t), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn if_modified_since_compares_seconds() {
        let t = SystemTime::UNIX_EPOCH + Duration::from_millis(784111777_500);
        let mut headers = HeaderMap::new();
        assert!(!not_modified(&headers, t));

        headers.insert(
            IF_MODIFIED_SINCE,
            HeaderValue::from_static("Sun, 06 Nov 1994 08:49:37 GMT"),
        );
        assert!(not_modified(&headers, t));

        headers.insert(
            IF_MODIFIED_SINCE,
            HeaderValue::from_static("Sun, 06 Nov 1994 08:49:36 GMT"),
        );
        assert!(!not_modified(&headers, t));

        headers.insert(IF_MODIFIED_SINCE, HeaderValue::from_static("yesterday"));
        assert!(!not_modified(&headers, t));
    }
}
