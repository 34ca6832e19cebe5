//! Upload / quota / OCR route
//!
//! `GET /` renders the upload form, `POST /` runs one upload-to-download
//! cycle: validate the form, check the quota, write the upload under a fresh
//! token, invoke the OCR engine, and account for the consumed page. Every
//! outcome is reported as a flash message and a redirect back to the form;
//! the converted file itself is fetched from `/downloads/` afterwards.

use axum::{
    extract::{Multipart, State},
    response::{Html, Redirect},
    routing::get,
    Router,
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::auth::{flash, take_flashes, CurrentAccount, FlashLevel};
use crate::db::AccountRepository;
use crate::error::Result;
use crate::html;
use crate::ocr::OcrOutcome;
use crate::state::AppState;

/// Upper bound on the multipart request body (16 MiB)
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Create the convert router
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(index).post(convert))
}

/// GET /
async fn index(
    State(state): State<AppState>,
    session: Session,
    CurrentAccount(account): CurrentAccount,
) -> Result<Html<String>> {
    let flashes = take_flashes(&session).await?;
    let ceiling = state.config().quota.ceiling(account.plan);
    Ok(html::index_page(&flashes, &account, ceiling))
}

/// POST /
async fn convert(
    State(state): State<AppState>,
    session: Session,
    CurrentAccount(account): CurrentAccount,
    mut multipart: Multipart,
) -> Result<Redirect> {
    let ceiling = state.config().quota.ceiling(account.plan);

    // Quota check before any file I/O. This read is advisory; the
    // authoritative guard is the conditional increment below.
    if account.pages_processed >= ceiling {
        flash(
            &session,
            FlashLevel::Warning,
            format!(
                "You have reached your processing limit of {ceiling} pages for the '{}' plan. Please upgrade.",
                account.plan
            ),
        )
        .await?;
        return Ok(Redirect::to("/"));
    }

    let mut file: Option<(String, axum::body::Bytes)> = None;
    let mut language: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                file = Some((filename, data));
            }
            Some("language") => {
                language = Some(field.text().await?);
            }
            _ => {}
        }
    }

    let Some((filename, data)) = file else {
        flash(&session, FlashLevel::Danger, "No file selected.").await?;
        return Ok(Redirect::to("/"));
    };

    if filename.is_empty() || !filename.ends_with(".pdf") {
        flash(&session, FlashLevel::Danger, "Please select a valid PDF file.").await?;
        return Ok(Redirect::to("/"));
    }

    let Some(language) = language.filter(|l| !l.is_empty()) else {
        flash(&session, FlashLevel::Danger, "No language selected.").await?;
        return Ok(Redirect::to("/"));
    };

    // Job paths derive from the token only, never from the client filename.
    let token = Uuid::new_v4();
    let storage = &state.config().storage;
    let input_path = storage.upload_dir.join(format!("{token}.pdf"));
    let output_path = storage.download_dir.join(format!("{token}_searchable.pdf"));

    tokio::fs::write(&input_path, &data).await?;

    match state.ocr().ocr(&input_path, &output_path, &language).await {
        Ok(outcome) => {
            let repo = AccountRepository::new(state.db());
            if repo.consume_page(account.id, ceiling).await? {
                if outcome == OcrOutcome::AlreadyHasText {
                    tracing::info!(%token, "input already had a text layer, output is a copy");
                }
                tracing::info!(
                    %token,
                    account_id = account.id,
                    language = %language,
                    "OCR completed"
                );
                flash(
                    &session,
                    FlashLevel::Success,
                    format!(
                        "Success! <a href=\"/downloads/{token}_searchable.pdf\">Click here to download.</a> Usage: {}/{ceiling} pages.",
                        account.pages_processed + 1
                    ),
                )
                .await?;
            } else {
                // A concurrent request took the last page between our
                // pre-check and here.
                flash(
                    &session,
                    FlashLevel::Warning,
                    format!(
                        "You have reached your processing limit of {ceiling} pages for the '{}' plan. Please upgrade.",
                        account.plan
                    ),
                )
                .await?;
            }
        }
        Err(e) => {
            tracing::warn!(%token, error = %e, "OCR run failed");
            flash(
                &session,
                FlashLevel::Danger,
                format!(
                    "An error occurred during OCR: {}",
                    html_escape::encode_text(&e.to_string())
                ),
            )
            .await?;
        }
    }

    Ok(Redirect::to("/"))
}
