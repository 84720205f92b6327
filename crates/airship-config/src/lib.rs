use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const FALLBACK_CONFIG_FILE: &str = "airship-config.toml";

/// Global configuration for airship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Insert the sample releases when the database is empty.
    #[serde(default = "default_seed_on_start")]
    pub seed_on_start: bool,

    /// Default tracing filter; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file. Defaults to the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default)]
    pub allow_destructive_migrations: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed_on_start: default_seed_on_start(),
            log_level: default_log_level(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
            allow_destructive_migrations: false,
        }
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

fn default_seed_on_start() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_connections() -> u32 {
    4
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl Config {
    /// Load config from default location or create default if not found
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, writing the defaults there if it is missing
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = toml::to_string_pretty(&config)?;
            std::fs::write(path, content)?;
            Ok(config)
        }
    }

    /// Get config file path
    ///
    /// Falls back to `airship-config.toml` in the working directory when
    /// the platform has no home directory.
    pub fn config_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("com", "airship", "airship-beta") {
            dirs.config_dir().join("config.toml")
        } else {
            PathBuf::from(FALLBACK_CONFIG_FILE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.seed_on_start);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.database.busy_timeout(), Duration::from_secs(5));
        assert!(config.database.path.is_none());
        assert!(!config.database.allow_destructive_migrations);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.database.busy_timeout_ms, config.database.busy_timeout_ms);
        assert_eq!(parsed.seed_on_start, config.seed_on_start);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml_str = r#"
seed_on_start = false

[database]
path = "/var/lib/airship/releases.db"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(!config.seed_on_start);
        assert_eq!(
            config.database.path,
            Some(PathBuf::from("/var/lib/airship/releases.db"))
        );
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("airship").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert!(config.seed_on_start);

        std::fs::write(&path, "log_level = \"debug\"\n").unwrap();
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.log_level, "debug");
    }

    #[test]
    fn test_config_path_has_no_unexpanded_home() {
        let path = Config::config_path();
        assert!(path.extension().is_some_and(|ext| ext == "toml"));
        assert!(!path.components().any(|c| c.as_os_str() == "~"));
        assert!(!Path::new(FALLBACK_CONFIG_FILE).is_absolute());
    }
}
