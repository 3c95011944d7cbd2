use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::snowflake::{DEFAULT_EPOCH_MS, MAX_WORKER_ID};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ids: IdConfig,
    #[serde(default)]
    pub views: ViewsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Maximum accepted request body, in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

/// Snowflake identifier settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdConfig {
    #[serde(default)]
    pub worker_id: u32,
    #[serde(default = "default_epoch_ms")]
    pub epoch_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ViewsConfig {
    #[serde(default = "default_views_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Keep template sources in memory after the first read
    #[serde(default = "default_cache")]
    pub cache: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_body_limit() -> usize {
    10 * 1024 * 1024
}

fn default_epoch_ms() -> u64 {
    DEFAULT_EPOCH_MS
}

fn default_views_dir() -> PathBuf {
    PathBuf::from("views")
}

fn default_extension() -> String {
    "html".to_string()
}

fn default_cache() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            worker_id: 0,
            epoch_ms: default_epoch_ms(),
        }
    }
}

impl Default for ViewsConfig {
    fn default() -> Self {
        Self {
            dir: default_views_dir(),
            extension: default_extension(),
            cache: default_cache(),
        }
    }
}

/// Load configuration from `path` layered with `WEBSERVER__*` environment variables
///
/// A missing file is not an error: every section has defaults.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(config::Environment::with_prefix("WEBSERVER").separator("__"))
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if cfg.server.body_limit_bytes == 0 {
        anyhow::bail!("Body limit must be greater than 0");
    }

    if !matches!(cfg.server.log_format.as_str(), "text" | "json") {
        anyhow::bail!(
            "Invalid log format '{}': expected 'text' or 'json'",
            cfg.server.log_format
        );
    }

    if cfg.ids.worker_id > MAX_WORKER_ID {
        anyhow::bail!(
            "Worker id {} is out of range (0..={})",
            cfg.ids.worker_id,
            MAX_WORKER_ID
        );
    }

    let extension = cfg.views.extension.trim_start_matches('.');
    if extension.is_empty() {
        anyhow::bail!("View extension cannot be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = Config::default();
        assert!(validate_config(&cfg).is_ok());
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.views.extension, "html");
        assert_eq!(cfg.ids.epoch_ms, DEFAULT_EPOCH_MS);
    }

    #[test]
    fn test_validate_config_rejects_worker_id() {
        let mut cfg = Config::default();
        cfg.ids.worker_id = MAX_WORKER_ID + 1;

        let result = validate_config(&cfg);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("out of range"));
    }

    #[test]
    fn test_validate_config_rejects_empty_extension() {
        let mut cfg = Config::default();
        cfg.views.extension = ".".to_string();

        let result = validate_config(&cfg);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("extension"));
    }

    #[test]
    fn test_validate_config_rejects_log_format() {
        let mut cfg = Config::default();
        cfg.server.log_format = "xml".to_string();
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9090

[ids]
worker_id = 7

[views]
dir = "templates"
cache = false
"#
        )
        .unwrap();

        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.ids.worker_id, 7);
        assert_eq!(cfg.views.dir, PathBuf::from("templates"));
        assert!(!cfg.views.cache);
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let cfg = load_config(Path::new("does-not-exist.toml")).unwrap();
        assert_eq!(cfg.server.port, 8080);
    }
}
