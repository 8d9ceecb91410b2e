//! Account endpoints and the session middleware
//!
//! Register and login delegate credential checking to the hosted auth
//! provider; the server's own contribution is the session row and the
//! HttpOnly cookie. Protected routes run through `session_middleware`,
//! which resolves the cookie, enforces the idle timeout, and refreshes
//! the provider ID token when it is about to lapse.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{AppendHeaders, IntoResponse, Response},
    Extension, Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use cinescope_common::db::Session;

use crate::error::{ApiError, ApiResult};
use crate::session;
use crate::AppState;

/// The signed-in user, injected into request extensions by the
/// session middleware
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

/// Registration request
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The signed-in user as returned to the browser
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub uid: String,
    pub email: String,
}

/// POST /api/auth/register
///
/// Creates an account with the hosted auth provider and opens a
/// session. Password rules beyond the length floor are the provider's
/// to enforce.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<Response> {
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;

    if payload.password != payload.confirm_password {
        return Err(ApiError::BadRequest("Passwords do not match".to_string()));
    }

    let tokens = state.auth.sign_up(&payload.email, &payload.password).await?;
    let session = session::create_session(&state.db, &tokens).await?;

    info!(uid = %session.uid, "Registered new account");

    Ok(signed_in_response(session))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Response> {
    validate_email(&payload.email)?;
    validate_password(&payload.password)?;

    let tokens = state.auth.sign_in(&payload.email, &payload.password).await?;
    let session = session::create_session(&state.db, &tokens).await?;

    info!(uid = %session.uid, "User signed in");

    Ok(signed_in_response(session))
}

/// POST /api/auth/logout
///
/// Deletes the session row and clears the cookie. Requires a session.
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Response> {
    session::delete_session(&state.db, user.0.guid).await?;

    info!(uid = %user.0.uid, "User signed out");

    Ok((
        AppendHeaders([(header::SET_COOKIE, session::clear_session_cookie())]),
        Json(json!({ "success": true })),
    )
        .into_response())
}

/// GET /api/auth/session
///
/// Returns the signed-in user. No upstream call; the middleware has
/// already validated the session.
pub async fn current_session(Extension(user): Extension<CurrentUser>) -> Json<UserResponse> {
    Json(UserResponse {
        uid: user.0.uid,
        email: user.0.email,
    })
}

fn signed_in_response(session: Session) -> Response {
    (
        AppendHeaders([(header::SET_COOKIE, session::session_cookie(session.guid))]),
        Json(UserResponse {
            uid: session.uid,
            email: session.email,
        }),
    )
        .into_response()
}

fn validate_email(email: &str) -> ApiResult<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("A valid email is required".to_string()));
    }
    Ok(())
}

fn validate_password(password: &str) -> ApiResult<()> {
    // The provider rejects anything shorter; fail fast locally
    if password.len() < 6 {
        return Err(ApiError::BadRequest(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    Ok(())
}

/// Session middleware for protected routes
///
/// Resolves the session cookie, enforces the idle timeout, refreshes
/// the provider ID token when needed, and injects `CurrentUser`.
/// Returns 401 when no valid session exists.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let cookie_header = request
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let guid = session::session_id_from_cookies(cookie_header).ok_or(AuthError::NotSignedIn)?;

    let session = session::load_session(&state.db, guid)
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?
        .ok_or(AuthError::NotSignedIn)?;

    let timeout = cinescope_common::db::settings::get_session_timeout_seconds(&state.db)
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?;

    let now = Utc::now();

    if session::session_expired(session.last_used_at, timeout, now) {
        // Remove the dead row so the sweep doesn't have to
        let _ = session::delete_session(&state.db, guid).await;
        return Err(AuthError::SessionExpired);
    }

    let session = if session::token_needs_refresh(session.token_expires_at, now) {
        refresh_session_tokens(&state, session).await?
    } else {
        session
    };

    session::touch_session(&state.db, guid)
        .await
        .map_err(|e| AuthError::Internal(e.to_string()))?;

    request.extensions_mut().insert(CurrentUser(session));

    Ok(next.run(request).await)
}

/// Exchange the session's refresh token for a fresh ID token and
/// persist the result
async fn refresh_session_tokens(state: &AppState, session: Session) -> Result<Session, AuthError> {
    let refreshed = match state.auth.refresh(&session.refresh_token).await {
        Ok(tokens) => tokens,
        Err(e) => {
            // Provider revoked the refresh token: the session is dead
            warn!(uid = %session.uid, "Token refresh failed: {}", e);
            let _ = session::delete_session(&state.db, session.guid).await;
            return Err(AuthError::SessionExpired);
        }
    };

    let token_expires_at = Utc::now() + Duration::seconds(refreshed.expires_in);

    session::update_session_tokens(
        &state.db,
        session.guid,
        &refreshed.id_token,
        &refreshed.refresh_token,
        token_expires_at,
    )
    .await
    .map_err(|e| AuthError::Internal(e.to_string()))?;

    Ok(Session {
        id_token: refreshed.id_token,
        refresh_token: refreshed.refresh_token,
        token_expires_at,
        ..session
    })
}

/// Authentication error types for HTTP responses
#[derive(Debug)]
pub enum AuthError {
    NotSignedIn,
    SessionExpired,
    Internal(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::NotSignedIn => (StatusCode::UNAUTHORIZED, "Not signed in".to_string()),
            AuthError::SessionExpired => {
                (StatusCode::UNAUTHORIZED, "Session expired".to_string())
            }
            AuthError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Authentication error: {}", msg),
            ),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("   ").is_err());
        assert!(validate_email("no-at-sign").is_err());
    }

    #[test]
    fn test_password_validation() {
        assert!(validate_password("secret1").is_ok());
        assert!(validate_password("123456").is_ok());
        assert!(validate_password("12345").is_err());
        assert!(validate_password("").is_err());
    }
}
