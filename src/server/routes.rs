//! HTTP routes for the file service.

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use axum_extra::extract::Form;
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::templates::{FileRow, TemplateEngine};
use crate::storage::{SharedDir, StorageError};

/// Shared application state.
pub struct AppState {
    pub shared: SharedDir,
    pub template_engine: TemplateEngine,
    pub title: String,
    pub max_upload_bytes: usize,
}

/// Build the router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .route("/", get(index_handler))
        .route("/files/", get(file_index_handler))
        .route("/files/:name", get(download_handler))
        .route("/upload", post(upload_handler))
        .route("/delete", post(delete_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Map a storage error onto an HTTP response.
///
/// Rejected names are the client's fault; everything else is ours.
fn storage_error_response(err: StorageError) -> Response {
    match err {
        StorageError::InvalidName { .. } => {
            warn!(error = %err, "Rejected file name");
            (StatusCode::BAD_REQUEST, err.to_string()).into_response()
        }
        other => {
            error!(error = %other, "Storage operation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()).into_response()
        }
    }
}

/// Handler for the landing page: upload form plus file table.
async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    let entries = match state.shared.entries() {
        Ok(entries) => entries,
        Err(e) => return storage_error_response(e),
    };
    let rows: Vec<FileRow> = entries.iter().map(FileRow::from_entry).collect();

    match state.template_engine.render_index(&state.title, &rows) {
        Ok(html) => Html(html).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Template error: {}", e),
        )
            .into_response(),
    }
}

/// Handler for the bare file index.
async fn file_index_handler(State(state): State<Arc<AppState>>) -> Response {
    let entries = match state.shared.entries() {
        Ok(entries) => entries,
        Err(e) => return storage_error_response(e),
    };
    let rows: Vec<FileRow> = entries.iter().map(FileRow::from_entry).collect();

    match state.template_engine.render_file_index(&state.title, &rows) {
        Ok(html) => Html(html).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Template error: {}", e),
        )
            .into_response(),
    }
}

/// Handler for downloading a single file.
async fn download_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    let path = match state.shared.resolve(&name) {
        Ok(path) => path,
        Err(e) => return storage_error_response(e),
    };

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            error!(file = %name, error = %e, "Failed to open file for download");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to open {}: {}", name, e),
            )
                .into_response();
        }
    };

    let metadata = match file.metadata().await {
        Ok(md) => md,
        Err(e) => {
            error!(file = %name, error = %e, "Failed to stat file for download");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to read {}: {}", name, e),
            )
                .into_response();
        }
    };
    if !metadata.is_file() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Not a regular file: {}", name),
        )
            .into_response();
    }

    info!(file = %name, bytes = metadata.len(), "Serving download");

    let disposition = format!("attachment; filename=\"{}\"", name.replace('"', "'"));
    let disposition = header::HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| header::HeaderValue::from_static("attachment"));

    let stream = ReaderStream::new(file);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type(&name))
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, metadata.len())
        .body(Body::from_stream(stream))
        .unwrap()
}

/// Handler for multipart file uploads.
///
/// Fields other than `file`, and file parts without a name, are skipped the
/// way a browser resubmitting an empty form would expect. A name that fails
/// validation is a hard 400 though, never a silent skip.
async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Response {
    let mut saved = 0usize;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Malformed multipart upload");
                return (StatusCode::BAD_REQUEST, format!("Upload failed: {}", e))
                    .into_response();
            }
        };

        if field.name() != Some("file") {
            continue;
        }
        let file_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                warn!("Upload field without a file name, skipping");
                continue;
            }
        };

        let path = match state.shared.resolve(&file_name) {
            Ok(path) => path,
            Err(e) => return storage_error_response(e),
        };

        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => {
                warn!(file = %file_name, error = %e, "Failed to read upload body");
                return (StatusCode::BAD_REQUEST, format!("Upload failed: {}", e))
                    .into_response();
            }
        };

        if let Err(e) = tokio::fs::write(&path, &data).await {
            error!(file = %file_name, error = %e, "Failed to store upload");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to store {}: {}", file_name, e),
            )
                .into_response();
        }

        info!(file = %file_name, bytes = data.len(), "Stored upload");
        saved += 1;
    }

    if saved == 0 {
        warn!("Upload request carried no usable file field");
    }
    Redirect::to("/").into_response()
}

/// Form payload for the delete endpoint.
///
/// `delete_files` repeats once per checked box, which is why this uses the
/// multi-value form extractor.
#[derive(Debug, Deserialize)]
struct DeleteForm {
    #[serde(default)]
    delete_files: Vec<String>,
}

/// Handler for deleting selected files.
///
/// Best-effort: every requested file is attempted even after a failure, and
/// the response only reports an error if at least one deletion failed.
async fn delete_handler(
    State(state): State<Arc<AppState>>,
    Form(form): Form<DeleteForm>,
) -> Response {
    let mut failed = Vec::new();

    for name in &form.delete_files {
        if let Err(e) = state.shared.remove(name) {
            error!(file = %name, error = %e, "Failed to delete file");
            failed.push(name.clone());
        }
    }

    if failed.is_empty() {
        Redirect::to("/").into_response()
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to delete: {}", failed.join(", ")),
        )
            .into_response()
    }
}

/// Guess the content type for a download based on its extension.
pub fn content_type(name: &str) -> &'static str {
    if name.ends_with(".txt") || name.ends_with(".log") {
        "text/plain; charset=utf-8"
    } else if name.ends_with(".html") {
        "text/html; charset=utf-8"
    } else if name.ends_with(".json") {
        "application/json; charset=utf-8"
    } else if name.ends_with(".pdf") {
        "application/pdf"
    } else if name.ends_with(".png") {
        "image/png"
    } else if name.ends_with(".jpg") || name.ends_with(".jpeg") {
        "image/jpeg"
    } else if name.ends_with(".gif") {
        "image/gif"
    } else if name.ends_with(".svg") {
        "image/svg+xml"
    } else if name.ends_with(".mp3") {
        "audio/mpeg"
    } else if name.ends_with(".mp4") {
        "video/mp4"
    } else if name.ends_with(".zip") {
        "application/zip"
    } else {
        "application/octet-stream"
    }
}
