//! Download routes
//!
//! Serves converted PDFs from the download directory as attachments. Files
//! are only ever named `<token>_searchable.pdf`, so anything else is rejected
//! before the filesystem is touched.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
    routing::get,
    Router,
};

use crate::auth::CurrentAccount;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Create the downloads router
pub fn router() -> Router<AppState> {
    Router::new().route("/downloads/:filename", get(download))
}

/// A converted-output filename: a UUID token plus the fixed suffix, with no
/// path structure of any kind.
fn is_valid_download_name(filename: &str) -> bool {
    let Some(token) = filename.strip_suffix("_searchable.pdf") else {
        return false;
    };
    !token.is_empty() && token.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

/// GET /downloads/:filename
async fn download(
    State(state): State<AppState>,
    _account: CurrentAccount,
    Path(filename): Path<String>,
) -> Result<Response> {
    if !is_valid_download_name(&filename) {
        return Err(AppError::NotFound(filename));
    }

    let path = state.config().storage.download_dir.join(&filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(filename));
        }
        Err(e) => return Err(e.into()),
    };

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.to_string()))?)
}
