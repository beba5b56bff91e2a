//! Application configuration.
//!
//! Stored as TOML at `~/.config/profsearch/config.toml` (or XDG equivalent).
//! A missing file is not an error; every field has a default.
//!
//! ```toml
//! db_path = "/var/lib/profsearch/catalog.db"
//! log_level = "info"
//!
//! [search]
//! min_query_len = 2
//! name_match = "either"
//! failure_policy = "clear"
//! suggestion_limit = 25
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::NameMatch;
use crate::search::typeahead::SearchSettings;

pub const CONFIG_ENV: &str = "PROFSEARCH_CONFIG";
pub const DB_ENV: &str = "PROFSEARCH_DB";
pub const NAME_MATCH_ENV: &str = "PROFSEARCH_NAME_MATCH";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Catalog database; defaults to the platform data directory.
    pub db_path: Option<PathBuf>,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: Option<String>,
    pub search: SearchSettings,
}

impl AppConfig {
    /// Load from `explicit`, else `$PROFSEARCH_CONFIG`, else the default path,
    /// then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(path) => PathBuf::from(path),
                None => Self::config_path()?,
            },
        };
        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a specific file without consulting the environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|p| p.join("profsearch").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(db) = std::env::var_os(DB_ENV)
            && !db.is_empty()
        {
            self.db_path = Some(PathBuf::from(db));
        }
        if let Ok(raw) = std::env::var(NAME_MATCH_ENV)
            && !raw.trim().is_empty()
        {
            self.search.name_match = raw
                .parse::<NameMatch>()
                .map_err(|e| ConfigError::Validation(format!("{NAME_MATCH_ENV}: {e}")))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.suggestion_limit == 0 {
            return Err(ConfigError::Validation(
                "search.suggestion_limit must be at least 1".into(),
            ));
        }
        if self.search.min_query_len > 64 {
            warn!(
                min_query_len = self.search.min_query_len,
                "unusually large min_query_len; most queries will never issue a lookup"
            );
        }
        Ok(())
    }

    /// Resolved catalog path: config value, else the platform data dir, else CWD.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.db_path {
            return path.clone();
        }
        dirs::data_dir()
            .map(|p| p.join("profsearch").join("catalog.db"))
            .unwrap_or_else(|| PathBuf::from("profsearch.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::typeahead::LookupFailurePolicy;
    use serial_test::serial;
    use tempfile::TempDir;

    struct EnvGuard {
        key: &'static str,
        prev: Option<std::ffi::OsString>,
    }

    impl EnvGuard {
        fn set(key: &'static str, val: &str) -> Self {
            let prev = std::env::var_os(key);
            unsafe { std::env::set_var(key, val) };
            Self { key, prev }
        }

        fn unset(key: &'static str) -> Self {
            let prev = std::env::var_os(key);
            unsafe { std::env::remove_var(key) };
            Self { key, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.prev {
                Some(v) => unsafe { std::env::set_var(self.key, v) },
                None => unsafe { std::env::remove_var(self.key) },
            }
        }
    }

    #[test]
    fn missing_file_yields_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = AppConfig::load_from(&tmp.path().join("nope.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.search.min_query_len, 2);
        assert_eq!(config.search.suggestion_limit, 25);
        assert_eq!(config.search.name_match, NameMatch::First);
        assert_eq!(config.search.failure_policy, LookupFailurePolicy::KeepExisting);
    }

    #[test]
    fn parses_search_table() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            "db_path = \"/tmp/cat.db\"\n\n[search]\nname_match = \"either\"\nfailure_policy = \"clear\"\n",
        )
        .unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/cat.db")));
        assert_eq!(config.search.name_match, NameMatch::Either);
        assert_eq!(config.search.failure_policy, LookupFailurePolicy::Clear);
        assert_eq!(config.search.min_query_len, 2, "unset fields keep defaults");
    }

    #[test]
    fn rejects_zero_limit() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[search]\nsuggestion_limit = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.search.name_match = NameMatch::Last;
        config.log_level = Some("debug".into());
        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    #[serial]
    fn env_overrides_apply() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        let _db = EnvGuard::set(DB_ENV, "/tmp/override.db");
        let _nm = EnvGuard::set(NAME_MATCH_ENV, "last");
        let config = AppConfig::load(Some(path.as_path())).unwrap();
        assert_eq!(config.database_path(), PathBuf::from("/tmp/override.db"));
        assert_eq!(config.search.name_match, NameMatch::Last);
    }

    #[test]
    #[serial]
    fn bad_name_match_env_is_a_validation_error() {
        let tmp = TempDir::new().unwrap();
        let _db = EnvGuard::unset(DB_ENV);
        let _nm = EnvGuard::set(NAME_MATCH_ENV, "middle");
        let err = AppConfig::load(Some(tmp.path().join("config.toml").as_path())).unwrap_err();
        assert!(err.to_string().contains(NAME_MATCH_ENV), "{err}");
    }
}
