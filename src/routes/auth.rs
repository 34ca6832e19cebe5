//! Account and session routes

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::auth::{
    flash, hash_password, take_flashes, verify_password, FlashLevel, ACCOUNT_ID_KEY,
};
use crate::db::{is_unique_violation, AccountRepository};
use crate::error::{AppError, Result};
use crate::html;
use crate::state::AppState;

/// Create the auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
}

#[derive(Deserialize)]
struct RegisterForm {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
struct LoginQuery {
    next: Option<String>,
}

/// Only ever redirect back into this application. Anything that is not an
/// absolute path on this host (including scheme-relative `//host`) falls back
/// to the landing page.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(n) if n.starts_with('/') && !n.starts_with("//") => n,
        _ => "/",
    }
}

async fn is_authenticated(session: &Session) -> bool {
    matches!(session.get::<i64>(ACCOUNT_ID_KEY).await, Ok(Some(_)))
}

/// GET /register
async fn register_page(session: Session) -> Result<Response> {
    if is_authenticated(&session).await {
        return Ok(Redirect::to("/").into_response());
    }
    let flashes = take_flashes(&session).await?;
    Ok(html::register_page(&flashes).into_response())
}

/// POST /register
async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Redirect> {
    if is_authenticated(&session).await {
        return Ok(Redirect::to("/"));
    }

    let repo = AccountRepository::new(state.db());
    if repo.find_by_email(&form.email).await?.is_some() {
        flash(
            &session,
            FlashLevel::Warning,
            "Email address already exists. Please log in.",
        )
        .await?;
        return Ok(Redirect::to("/login"));
    }

    let password_hash = hash_password(form.password).await?;

    match repo.create(&form.email, &password_hash).await {
        Ok(account) => {
            tracing::info!(account_id = account.id, "account created");
            flash(
                &session,
                FlashLevel::Success,
                "Account created successfully! Please log in.",
            )
            .await?;
            Ok(Redirect::to("/login"))
        }
        // Lost a race with a concurrent registration for the same email.
        Err(e) if is_unique_violation(&e) => {
            flash(
                &session,
                FlashLevel::Warning,
                "Email address already exists. Please log in.",
            )
            .await?;
            Ok(Redirect::to("/login"))
        }
        Err(e) => Err(AppError::Database(e)),
    }
}

/// GET /login
async fn login_page(session: Session, Query(query): Query<LoginQuery>) -> Result<Response> {
    if is_authenticated(&session).await {
        return Ok(Redirect::to("/").into_response());
    }
    let flashes = take_flashes(&session).await?;
    Ok(html::login_page(&flashes, query.next.as_deref()).into_response())
}

/// POST /login
async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Redirect> {
    if is_authenticated(&session).await {
        return Ok(Redirect::to("/"));
    }

    let repo = AccountRepository::new(state.db());
    let account = repo.find_by_email(&form.email).await?;

    let verified = match &account {
        Some(account) => verify_password(form.password, account.password_hash.clone()).await?,
        None => false,
    };

    match account {
        Some(account) if verified => {
            session.cycle_id().await?;
            session.insert(ACCOUNT_ID_KEY, account.id).await?;
            tracing::info!(account_id = account.id, "login succeeded");
            Ok(Redirect::to(safe_next(form.next.as_deref())))
        }
        _ => {
            // One generic message, whichever credential was wrong.
            flash(
                &session,
                FlashLevel::Danger,
                "Login failed. Please check your email and password.",
            )
            .await?;
            let target = match form.next.as_deref() {
                Some(next) => format!("/login?next={}", urlencoding::encode(next)),
                None => "/login".to_string(),
            };
            Ok(Redirect::to(&target))
        }
    }
}

/// GET /logout
async fn logout(session: Session) -> Result<Redirect> {
    session.flush().await?;
    Ok(Redirect::to("/login"))
}
