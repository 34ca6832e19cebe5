//! OCR Forge
//!
//! A small web service that turns uploaded PDFs into searchable PDFs via the
//! ocrmypdf pipeline, with account registration, per-plan page quotas, and a
//! payment-provider upgrade flow.
//!
//! # Modules
//!
//! - `routes`: HTTP handlers (upload/convert, auth, downloads, billing)
//! - `db`: SQLite account store
//! - `ocr`: external OCR engine seam
//! - `billing`: payment provider seam
//! - `auth`: password hashing, sessions, flash messages

pub mod auth;
pub mod billing;
pub mod config;
pub mod db;
pub mod error;
pub mod html;
pub mod ocr;
pub mod routes;
pub mod state;

use axum::{extract::DefaultBodyLimit, Router};
use tower_http::trace::TraceLayer;
use tower_sessions::{
    cookie::{time::Duration, Key},
    Expiry, MemoryStore, SessionManagerLayer,
};

use state::AppState;

/// Build the application router with its session and trace layers.
pub fn app(state: AppState) -> Router {
    let session_key = match state.config().server.secret_key.as_deref() {
        Some(secret) => Key::try_from(secret.as_bytes()).unwrap_or_else(|_| {
            tracing::warn!("SECRET_KEY shorter than 64 bytes, generating a session key instead");
            Key::generate()
        }),
        None => Key::generate(),
    };

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_signed(session_key)
        .with_expiry(Expiry::OnInactivity(Duration::days(14)));

    Router::new()
        .merge(routes::health::router())
        .merge(routes::convert::router())
        .merge(routes::auth::router())
        .merge(routes::downloads::router())
        .merge(routes::billing::router())
        .layer(DefaultBodyLimit::max(routes::convert::MAX_UPLOAD_BYTES))
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
