//! Login session persistence
//!
//! Sessions live in the local SQLite database; the browser holds an
//! opaque session id in an HttpOnly cookie. The auth provider's tokens
//! stay server-side on the session row.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use cinescope_common::db::Session;
use cinescope_common::Result;

use crate::firebase::auth::AuthTokens;

/// Cookie name carrying the session id
pub const SESSION_COOKIE: &str = "session_id";

/// Create a session row from freshly issued provider tokens
pub async fn create_session(pool: &SqlitePool, tokens: &AuthTokens) -> Result<Session> {
    let now = Utc::now();
    let session = Session {
        guid: Uuid::new_v4(),
        uid: tokens.uid.clone(),
        email: tokens.email.clone(),
        id_token: tokens.id_token.clone(),
        refresh_token: tokens.refresh_token.clone(),
        token_expires_at: now + Duration::seconds(tokens.expires_in),
        created_at: now,
        last_used_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO sessions (
            guid, uid, email, id_token, refresh_token,
            token_expires_at, created_at, last_used_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(session.guid.to_string())
    .bind(&session.uid)
    .bind(&session.email)
    .bind(&session.id_token)
    .bind(&session.refresh_token)
    .bind(session.token_expires_at.to_rfc3339())
    .bind(session.created_at.to_rfc3339())
    .bind(session.last_used_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(session)
}

/// Load a session by id
pub async fn load_session(pool: &SqlitePool, guid: Uuid) -> Result<Option<Session>> {
    let row = sqlx::query("SELECT * FROM sessions WHERE guid = ?")
        .bind(guid.to_string())
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(Session::from_row(&row)?)),
        None => Ok(None),
    }
}

/// Record activity on a session (drives idle expiry)
pub async fn touch_session(pool: &SqlitePool, guid: Uuid) -> Result<()> {
    sqlx::query("UPDATE sessions SET last_used_at = ? WHERE guid = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(guid.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Replace the provider tokens on a session after a refresh
pub async fn update_session_tokens(
    pool: &SqlitePool,
    guid: Uuid,
    id_token: &str,
    refresh_token: &str,
    token_expires_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE sessions SET id_token = ?, refresh_token = ?, token_expires_at = ? WHERE guid = ?",
    )
    .bind(id_token)
    .bind(refresh_token)
    .bind(token_expires_at.to_rfc3339())
    .bind(guid.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a session (logout)
pub async fn delete_session(pool: &SqlitePool, guid: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE guid = ?")
        .bind(guid.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

/// Whether a session has sat idle past the configured timeout
pub fn session_expired(last_used_at: DateTime<Utc>, timeout_seconds: i64, now: DateTime<Utc>) -> bool {
    now - last_used_at > Duration::seconds(timeout_seconds)
}

/// Whether the provider ID token needs a refresh before use
///
/// Refreshes one minute early so a token never expires mid-request.
pub fn token_needs_refresh(token_expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    token_expires_at - now < Duration::seconds(60)
}

/// Delete sessions idle past the timeout; returns the number removed
///
/// Run at startup: rows left behind by long-gone browsers would
/// otherwise accumulate forever.
pub async fn sweep_expired_sessions(pool: &SqlitePool) -> Result<usize> {
    let timeout = cinescope_common::db::settings::get_session_timeout_seconds(pool).await?;
    let cutoff = (Utc::now() - Duration::seconds(timeout)).to_rfc3339();

    let result = sqlx::query("DELETE FROM sessions WHERE last_used_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() as usize)
}

/// Extract the session id from a Cookie header value
pub fn session_id_from_cookies(cookie_header: &str) -> Option<Uuid> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// Build the Set-Cookie value establishing a session
pub fn session_cookie(guid: Uuid) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, guid
    )
}

/// Build the Set-Cookie value clearing the session cookie
pub fn clear_session_cookie() -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        SESSION_COOKIE
    )
}
