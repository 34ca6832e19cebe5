//! Login session and flash messages
//!
//! Sessions live server-side (tower-sessions); the cookie only carries a
//! signed session id. The logged-in account id is the single session value
//! besides pending flash messages.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::db::{Account, AccountRepository};
use crate::state::AppState;

/// Session key holding the logged-in account id
pub const ACCOUNT_ID_KEY: &str = "account_id";

/// Session key holding flash messages pending display
const FLASH_KEY: &str = "_flashes";

/// Severity of a flash message, mirrored into a CSS class when rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Danger,
}

/// One-shot message shown on the next rendered page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

/// Queue a message for the next page render.
///
/// The message is rendered as-is, so callers interpolating user-supplied or
/// dependency-supplied text must escape it first.
pub async fn flash(
    session: &Session,
    level: FlashLevel,
    message: impl Into<String>,
) -> Result<(), tower_sessions::session::Error> {
    let mut pending: Vec<Flash> = session.get(FLASH_KEY).await?.unwrap_or_default();
    pending.push(Flash {
        level,
        message: message.into(),
    });
    session.insert(FLASH_KEY, pending).await
}

/// Drain all pending flash messages for display.
pub async fn take_flashes(
    session: &Session,
) -> Result<Vec<Flash>, tower_sessions::session::Error> {
    Ok(session.remove(FLASH_KEY).await?.unwrap_or_default())
}

/// Extractor for the authenticated account behind a protected route.
///
/// Rejects with a redirect to the login page, carrying the originally
/// requested path so login can send the user back there.
pub struct CurrentAccount(pub Account);

/// Rejection that bounces the request to the login form
pub struct AuthRedirect {
    next: String,
}

impl AuthRedirect {
    fn for_path(path: &str) -> Self {
        Self {
            next: path.to_string(),
        }
    }
}

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        let target = format!("/login?next={}", urlencoding::encode(&self.next));
        Redirect::to(&target).into_response()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = AuthRedirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let path = parts.uri.path().to_string();

        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthRedirect::for_path(&path))?;

        let account_id: Option<i64> = session.get(ACCOUNT_ID_KEY).await.ok().flatten();
        let Some(account_id) = account_id else {
            return Err(AuthRedirect::for_path(&path));
        };

        // A stale session (account row gone) falls back to the login page.
        match AccountRepository::new(state.db()).find_by_id(account_id).await {
            Ok(Some(account)) => Ok(CurrentAccount(account)),
            _ => Err(AuthRedirect::for_path(&path)),
        }
    }
}
