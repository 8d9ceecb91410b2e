//! Settings database operations
//!
//! Get/set accessors for the settings table following the key-value
//! pattern. Typed getters parse the stored string and fall back to a
//! caller-supplied default when absent or unparsable.

use sqlx::SqlitePool;

use crate::Result;

/// Get a setting value, parsed to the requested type
pub async fn get_setting<T>(db: &SqlitePool, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
{
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(db)
            .await?;

    Ok(value.flatten().and_then(|v| v.parse::<T>().ok()))
}

/// Set a setting value
pub async fn set_setting(db: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
    )
    .bind(key)
    .bind(value)
    .execute(db)
    .await?;

    Ok(())
}

/// Session lifetime in seconds (default 30 days)
pub async fn get_session_timeout_seconds(db: &SqlitePool) -> Result<i64> {
    get_setting(db, "session_timeout_seconds")
        .await
        .map(|opt| opt.unwrap_or(2_592_000))
}

/// Catalog cache TTL in seconds (default 5 minutes)
pub async fn get_catalog_cache_ttl_seconds(db: &SqlitePool) -> Result<i64> {
    get_setting(db, "catalog_cache_ttl_seconds")
        .await
        .map(|opt| opt.unwrap_or(300))
}

/// Catalog language code passed to TMDB (default en-US)
pub async fn get_catalog_language(db: &SqlitePool) -> Result<String> {
    get_setting(db, "catalog_language")
        .await
        .map(|opt| opt.unwrap_or_else(|| "en-US".to_string()))
}

/// Outbound HTTP request timeout in milliseconds (default 30s)
pub async fn get_http_request_timeout_ms(db: &SqlitePool) -> Result<u64> {
    get_setting(db, "http_request_timeout_ms")
        .await
        .map(|opt| opt.unwrap_or(30_000))
}
