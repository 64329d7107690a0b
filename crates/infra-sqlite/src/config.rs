// Database configuration, read once at startup from the environment.

use std::time::Duration;

use studyhub_core::{Result, StoreError};

pub const DEFAULT_MAX_OPEN_CONNS: usize = 10;
pub const DEFAULT_MAX_IDLE_CONNS: usize = 5;
pub const DEFAULT_CONN_MAX_LIFETIME_SECS: u64 = 300;
pub const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 5_000;

/// Pool and storage settings. Malformed values are fatal at startup; a
/// missing variable falls back to its documented default.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database file path (or `:memory:` for a single-connection scratch DB).
    pub path: String,
    pub max_open_conns: usize,
    pub max_idle_conns: usize,
    pub conn_max_lifetime: Duration,
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: "studyhub.db".into(),
            max_open_conns: DEFAULT_MAX_OPEN_CONNS,
            max_idle_conns: DEFAULT_MAX_IDLE_CONNS,
            conn_max_lifetime: Duration::from_secs(DEFAULT_CONN_MAX_LIFETIME_SECS),
            acquire_timeout: Duration::from_millis(DEFAULT_ACQUIRE_TIMEOUT_MS),
        }
    }
}

impl DbConfig {
    /// Load from `DB_PATH`, `DB_MAX_OPEN_CONNS`, `DB_MAX_IDLE_CONNS`,
    /// `DB_CONN_MAX_LIFETIME` (seconds) and `DB_ACQUIRE_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let cfg = Self {
            path: std::env::var("DB_PATH").unwrap_or(defaults.path),
            max_open_conns: parse_env("DB_MAX_OPEN_CONNS", defaults.max_open_conns)?,
            max_idle_conns: parse_env("DB_MAX_IDLE_CONNS", defaults.max_idle_conns)?,
            conn_max_lifetime: Duration::from_secs(parse_env(
                "DB_CONN_MAX_LIFETIME",
                DEFAULT_CONN_MAX_LIFETIME_SECS,
            )?),
            acquire_timeout: Duration::from_millis(parse_env(
                "DB_ACQUIRE_TIMEOUT_MS",
                DEFAULT_ACQUIRE_TIMEOUT_MS,
            )?),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(StoreError::Config("DB_PATH must not be empty".into()));
        }
        if self.max_open_conns == 0 {
            return Err(StoreError::Config("DB_MAX_OPEN_CONNS must be > 0".into()));
        }
        if self.max_idle_conns > self.max_open_conns {
            return Err(StoreError::Config(format!(
                "DB_MAX_IDLE_CONNS ({}) exceeds DB_MAX_OPEN_CONNS ({})",
                self.max_idle_conns, self.max_open_conns
            )));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| StoreError::Config(format!("cannot parse {key}='{raw}'"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(DbConfig::default().validate().is_ok());
    }

    #[test]
    fn idle_above_open_rejected() {
        let cfg = DbConfig {
            max_open_conns: 2,
            max_idle_conns: 5,
            ..DbConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(StoreError::Config(_))));
    }

    #[test]
    fn malformed_env_value_is_fatal() {
        // Env mutation: this is the only test touching these variables.
        std::env::set_var("DB_MAX_OPEN_CONNS", "not-a-number");
        let result = DbConfig::from_env();
        std::env::remove_var("DB_MAX_OPEN_CONNS");
        assert!(matches!(result, Err(StoreError::Config(_))));
    }
}
