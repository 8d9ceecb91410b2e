//! Catalog response cache
//!
//! Successful list responses are cached in SQLite keyed by a hash of
//! the request, so repeated browsing of the same pages doesn't hammer
//! the catalog. Entries expire after `catalog_cache_ttl_seconds`.

use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

use cinescope_common::Result;

/// Hash the identifying parts of a catalog request (path + params,
/// never the API key) into a 64-char hex cache key
pub fn request_hash(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"\x1f");
    }
    format!("{:x}", hasher.finalize())
}

/// Look up a cached response body, honoring the TTL
///
/// Stale entries are deleted on the way out so the table stays small.
pub async fn lookup(db: &SqlitePool, hash: &str, ttl_seconds: i64) -> Result<Option<String>> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT body FROM catalog_cache
         WHERE request_hash = ?
           AND cached_at >= datetime('now', '-' || ? || ' seconds')",
    )
    .bind(hash)
    .bind(ttl_seconds)
    .fetch_optional(db)
    .await?;

    if row.is_none() {
        sqlx::query("DELETE FROM catalog_cache WHERE request_hash = ?")
            .bind(hash)
            .execute(db)
            .await?;
    }

    Ok(row.map(|(body,)| body))
}

/// Store a response body under the request hash
pub async fn store(db: &SqlitePool, hash: &str, body: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO catalog_cache (request_hash, body, cached_at)
         VALUES (?, ?, datetime('now'))
         ON CONFLICT(request_hash) DO UPDATE SET
             body = excluded.body,
             cached_at = excluded.cached_at",
    )
    .bind(hash)
    .bind(body)
    .execute(db)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> (SqlitePool, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let db_path = dir.path().join("cinescope.db");

        let pool = cinescope_common::db::init_database(&db_path)
            .await
            .expect("Should initialize database");

        (pool, dir)
    }

    #[tokio::test]
    async fn test_store_and_lookup_within_ttl() {
        let (pool, _dir) = test_pool().await;
        let hash = request_hash(&["/movie/popular", "page=1"]);

        store(&pool, &hash, r#"{"page":1}"#).await.expect("store should succeed");

        let body = lookup(&pool, &hash, 300).await.expect("lookup should succeed");
        assert_eq!(body.as_deref(), Some(r#"{"page":1}"#));

        // Re-storing replaces the body under the same key
        store(&pool, &hash, r#"{"page":1,"v":2}"#).await.expect("store should succeed");

        let body = lookup(&pool, &hash, 300).await.expect("lookup should succeed");
        assert_eq!(body.as_deref(), Some(r#"{"page":1,"v":2}"#));
    }

    #[tokio::test]
    async fn test_lookup_misses_for_unknown_hash() {
        let (pool, _dir) = test_pool().await;

        let body = lookup(&pool, &request_hash(&["/movie/top_rated", "page=9"]), 300)
            .await
            .expect("lookup should succeed");
        assert_eq!(body, None);
    }

    #[tokio::test]
    async fn test_expired_entry_misses_and_is_purged() {
        let (pool, _dir) = test_pool().await;
        let hash = request_hash(&["/movie/popular", "page=2"]);

        store(&pool, &hash, r#"{"page":2}"#).await.expect("store should succeed");

        // Age the entry past a 5-minute TTL
        sqlx::query(
            "UPDATE catalog_cache SET cached_at = datetime('now', '-600 seconds')
             WHERE request_hash = ?",
        )
        .bind(&hash)
        .execute(&pool)
        .await
        .expect("update should succeed");

        let body = lookup(&pool, &hash, 300).await.expect("lookup should succeed");
        assert_eq!(body, None, "stale entry must not be served");

        // The stale row is deleted on the way out, not left behind
        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM catalog_cache WHERE request_hash = ?")
                .bind(&hash)
                .fetch_one(&pool)
                .await
                .expect("count should succeed");
        assert_eq!(remaining, 0);
    }

    #[test]
    fn test_request_hash_is_hex_sha256() {
        let hash = request_hash(&["/movie/popular", "page=1"]);
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_request_hash_deterministic() {
        let a = request_hash(&["/movie/popular", "page=1"]);
        let b = request_hash(&["/movie/popular", "page=1"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_request_hash_distinguishes_params() {
        let a = request_hash(&["/movie/popular", "page=1"]);
        let b = request_hash(&["/movie/popular", "page=2"]);
        let c = request_hash(&["/movie/top_rated", "page=1"]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_request_hash_separator_prevents_ambiguity() {
        // "ab" + "c" must not collide with "a" + "bc"
        let a = request_hash(&["ab", "c"]);
        let b = request_hash(&["a", "bc"]);
        assert_ne!(a, b);
    }
}
