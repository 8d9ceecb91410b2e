//! Configuration loading and data directory resolution

use crate::{Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Service configuration loaded from `cinescope.toml`
///
/// All fields are optional in the file; API keys may instead be
/// supplied via environment variables or the settings table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// TCP port for the HTTP server (default 5730)
    pub port: Option<u16>,
    /// Bind address (default 127.0.0.1)
    pub bind_address: Option<String>,
    /// TMDB API key
    pub tmdb_api_key: Option<String>,
    /// Firebase Web API key
    pub firebase_api_key: Option<String>,
    /// Firebase / GCP project id (Firestore document paths)
    pub firebase_project_id: Option<String>,
}

impl AppConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(5730)
    }

    pub fn bind_address(&self) -> &str {
        self.bind_address.as_deref().unwrap_or("127.0.0.1")
    }
}

/// Data directory resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable CINESCOPE_DATA_DIR
/// 3. TOML config file `data_dir` key
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_dir(cli_arg: Option<&str>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var("CINESCOPE_DATA_DIR") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = config_file_path() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(value) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(dir) = value.get("data_dir").and_then(|v| v.as_str()) {
                    return PathBuf::from(dir);
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    default_data_dir()
}

/// Load service configuration from `cinescope.toml`
///
/// Looks in the platform config directory first, then the data
/// directory. A missing file yields the defaults; a malformed file is
/// an error (silent fallback would hide typos in API keys).
pub fn load_app_config(data_dir: &Path) -> Result<AppConfig> {
    let candidates = [
        config_file_path().ok(),
        Some(data_dir.join("cinescope.toml")),
    ];

    for path in candidates.into_iter().flatten() {
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: AppConfig = toml::from_str(&content)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
            info!("Loaded configuration from {}", path.display());
            return Ok(config);
        }
    }

    Ok(AppConfig::default())
}

/// Get configuration file path for the platform
fn config_file_path() -> Result<PathBuf> {
    let user_config = dirs::config_dir()
        .map(|d| d.join("cinescope").join("cinescope.toml"))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

    if user_config.exists() {
        return Ok(user_config);
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/cinescope/cinescope.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}

/// Get OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("cinescope"))
        .unwrap_or_else(|| PathBuf::from("./cinescope_data"))
}

/// Ensure the data directory exists, creating it if needed
pub fn ensure_data_dir(data_dir: &Path) -> Result<()> {
    if !data_dir.exists() {
        std::fs::create_dir_all(data_dir)?;
        info!("Created data directory: {}", data_dir.display());
    }
    Ok(())
}

/// Database file path inside the data directory
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join("cinescope.db")
}

/// Resolve the TMDB API key from 3-tier configuration
///
/// Priority: Database -> ENV (CINESCOPE_TMDB_API_KEY) -> TOML
pub async fn resolve_tmdb_api_key(db: &SqlitePool, config: &AppConfig) -> Result<String> {
    resolve_api_key(
        db,
        "tmdb_api_key",
        "CINESCOPE_TMDB_API_KEY",
        config.tmdb_api_key.as_deref(),
    )
    .await
}

/// Resolve the Firebase Web API key from 3-tier configuration
///
/// Priority: Database -> ENV (CINESCOPE_FIREBASE_API_KEY) -> TOML
pub async fn resolve_firebase_api_key(db: &SqlitePool, config: &AppConfig) -> Result<String> {
    resolve_api_key(
        db,
        "firebase_api_key",
        "CINESCOPE_FIREBASE_API_KEY",
        config.firebase_api_key.as_deref(),
    )
    .await
}

/// Resolve the Firebase project id from 3-tier configuration
///
/// Priority: Database -> ENV (CINESCOPE_FIREBASE_PROJECT_ID) -> TOML
pub async fn resolve_firebase_project_id(db: &SqlitePool, config: &AppConfig) -> Result<String> {
    resolve_api_key(
        db,
        "firebase_project_id",
        "CINESCOPE_FIREBASE_PROJECT_ID",
        config.firebase_project_id.as_deref(),
    )
    .await
}

/// Generic 3-tier credential resolution: Database -> ENV -> TOML
///
/// The database tier is authoritative so that a key configured at
/// runtime survives restarts without editing files.
async fn resolve_api_key(
    db: &SqlitePool,
    settings_key: &str,
    env_var: &str,
    toml_value: Option<&str>,
) -> Result<String> {
    // Tier 1: Database (authoritative)
    let db_value: Option<String> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(settings_key)
            .fetch_optional(db)
            .await?
            .flatten();

    if let Some(value) = db_value {
        if is_valid_key(&value) {
            return Ok(value);
        }
        warn!("Setting '{}' present but empty, falling through", settings_key);
    }

    // Tier 2: Environment variable
    if let Ok(value) = std::env::var(env_var) {
        if is_valid_key(&value) {
            info!("Resolved '{}' from environment", settings_key);
            return Ok(value.trim().to_string());
        }
    }

    // Tier 3: TOML config file
    if let Some(value) = toml_value {
        if is_valid_key(value) {
            return Ok(value.trim().to_string());
        }
    }

    Err(Error::Config(format!(
        "'{}' is not configured (set it in the settings table, {} or cinescope.toml)",
        settings_key, env_var
    )))
}

/// Validate an API key or project id: non-empty, non-whitespace
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
