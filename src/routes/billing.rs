//! Plan upgrade routes
//!
//! One outbound checkout call plus the provider's two terminal callbacks.

use axum::{
    extract::State,
    response::Redirect,
    routing::get,
    Router,
};
use tower_sessions::Session;

use crate::auth::{flash, CurrentAccount, FlashLevel};
use crate::db::AccountRepository;
use crate::error::Result;
use crate::state::AppState;

/// Create the billing router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create-checkout", get(create_checkout))
        .route("/success", get(success))
        .route("/cancel", get(cancel))
}

/// GET /create-checkout
async fn create_checkout(
    State(state): State<AppState>,
    session: Session,
    CurrentAccount(account): CurrentAccount,
) -> Result<Redirect> {
    let base = state.config().server.public_url.trim_end_matches('/').to_string();
    let success_url = format!("{base}/success");
    let cancel_url = format!("{base}/cancel");

    match state
        .billing()
        .create_checkout(&account.email, &success_url, &cancel_url)
        .await
    {
        Ok(checkout_url) => Ok(Redirect::to(&checkout_url)),
        Err(e) => {
            tracing::error!(error = %e, "checkout creation failed");
            flash(
                &session,
                FlashLevel::Danger,
                format!(
                    "Error communicating with provider: {}",
                    html_escape::encode_text(&e.to_string())
                ),
            )
            .await?;
            Ok(Redirect::to("/"))
        }
    }
}

/// GET /success - provider success callback
async fn success(
    State(state): State<AppState>,
    session: Session,
    CurrentAccount(account): CurrentAccount,
) -> Result<Redirect> {
    AccountRepository::new(state.db())
        .upgrade_plan(account.id)
        .await?;
    tracing::info!(account_id = account.id, "plan upgraded to pro");
    flash(
        &session,
        FlashLevel::Success,
        "Congratulations! You have successfully upgraded to the Pro plan.",
    )
    .await?;
    Ok(Redirect::to("/"))
}

/// GET /cancel - provider cancel callback
async fn cancel(session: Session, _account: CurrentAccount) -> Result<Redirect> {
    flash(
        &session,
        FlashLevel::Info,
        "Payment was cancelled. You are still on the free plan.",
    )
    .await?;
    Ok(Redirect::to("/"))
}
