use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `DOCVAULT_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("DOCVAULT_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        let storage = StorageConfig::from_env_profiled(p);
        let database = DatabaseConfig::from_env_profiled(p, &storage);
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            storage,
            database,
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:    {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  storage:   data_dir={}, upload_dir={}",
            self.storage.data_dir.display(),
            self.storage.upload_dir
        );
        tracing::info!(
            "  database:  url={}, max_connections={}",
            self.database.url,
            self.database.max_connections
        );
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 3001),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Application root. Record file paths are relative to this directory.
    pub data_dir: PathBuf,
    /// Flat upload directory, relative to `data_dir`.
    pub upload_dir: String,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        let upload_dir = profiled_env_or(p, "UPLOAD_DIR", "uploads")
            .trim_matches('/')
            .to_string();
        Self {
            data_dir: PathBuf::from(profiled_env_or(p, "DATA_DIR", "data")),
            upload_dir,
        }
    }

    /// Absolute-or-relative filesystem path of the upload directory.
    pub fn upload_path(&self) -> PathBuf {
        self.data_dir.join(&self.upload_dir)
    }
}

// ── Database (SQLite) ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    fn from_env_profiled(p: &str, storage: &StorageConfig) -> Self {
        let default_url = format!(
            "sqlite://{}",
            storage.data_dir.join("licenses.sqlite").display()
        );
        Self {
            url: profiled_env_or(p, "DATABASE_URL", &default_url),
            max_connections: profiled_env_u32(p, "DB_MAX_CONNECTIONS", 5),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env vars are process-global; each test uses its own profile prefix.

    #[test]
    fn defaults_without_env() {
        let config = Config::for_profile("DOCVAULT_TEST_DEFAULTS");
        assert_eq!(config.profile_label(), "DOCVAULT_TEST_DEFAULTS");
        assert_eq!(config.storage.upload_dir, "uploads");
        assert!(config.database.url.starts_with("sqlite://"));
        assert!(config.database.url.ends_with("licenses.sqlite"));
    }

    #[test]
    fn profiled_key_wins_over_plain_key() {
        env::set_var("DVPROF_UPLOAD_DIR", "/incoming/");
        env::set_var("DVPROF_DB_MAX_CONNECTIONS", "9");
        let config = Config::for_profile("dvprof");
        assert_eq!(config.profile, "DVPROF");
        assert_eq!(config.storage.upload_dir, "incoming");
        assert_eq!(config.database.max_connections, 9);
        env::remove_var("DVPROF_UPLOAD_DIR");
        env::remove_var("DVPROF_DB_MAX_CONNECTIONS");
    }

    #[test]
    fn memory_url_detected() {
        let db = DatabaseConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
        };
        assert!(db.is_in_memory());
    }
}
