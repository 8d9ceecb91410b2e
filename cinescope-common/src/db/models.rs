//! Database row types

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::{Error, Result};

/// A server-side login session
///
/// The browser holds only the opaque `guid` (in a cookie); the hosted
/// auth provider's tokens never leave the server.
#[derive(Debug, Clone)]
pub struct Session {
    pub guid: Uuid,
    pub uid: String,
    pub email: String,
    pub id_token: String,
    pub refresh_token: String,
    pub token_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl Session {
    /// Build a Session from a `SELECT *` row over the sessions table
    pub fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self> {
        let guid_str: String = row.get("guid");
        let guid = Uuid::parse_str(&guid_str)
            .map_err(|e| Error::Internal(format!("Failed to parse session guid: {}", e)))?;

        Ok(Session {
            guid,
            uid: row.get("uid"),
            email: row.get("email"),
            id_token: row.get("id_token"),
            refresh_token: row.get("refresh_token"),
            token_expires_at: parse_timestamp(row, "token_expires_at")?,
            created_at: parse_timestamp(row, "created_at")?,
            last_used_at: parse_timestamp(row, "last_used_at")?,
        })
    }
}

fn parse_timestamp(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.get(column);
    chrono::DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}
