use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use crate::settings::{ReportSettings, SettingsError};

pub const DEFAULT_CONFIG_PATH: &str = "pipecast.toml";
const ENV_CONFIG_PATH: &str = "PIPECAST_CONFIG";
const ENV_DATABASE_URL: &str = "PIPECAST_DATABASE_URL";
const ENV_LOG_LEVEL: &str = "PIPECAST_LOG_LEVEL";
const ENV_LOG_FORMAT: &str = "PIPECAST_LOG_FORMAT";
const ENV_BIND_ADDRESS: &str = "PIPECAST_BIND_ADDRESS";
const ENV_PORT: &str = "PIPECAST_PORT";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub reports: ReportSettings,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://pipecast.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            reports: ReportSettings::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    database: Option<RawDatabase>,
    server: Option<RawServer>,
    logging: Option<RawLogging>,
    reports: Option<toml::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDatabase {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawServer {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLogging {
    level: Option<String>,
    format: Option<String>,
}

impl AppConfig {
    /// Precedence, lowest to highest: built-in defaults, config file,
    /// process environment, explicit overrides.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = options
            .config_path
            .or_else(|| env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let raw: RawConfig = toml::from_str(&contents)
                    .map_err(|source| ConfigError::ParseFile { path: path.clone(), source })?;
                config.apply_raw(raw)?;
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                if options.require_file {
                    return Err(ConfigError::MissingConfigFile(path));
                }
            }
            Err(source) => return Err(ConfigError::ReadFile { path, source }),
        }

        config.apply_env()?;
        config.apply_overrides(options.overrides);
        config.validate()?;
        Ok(config)
    }

    fn apply_raw(&mut self, raw: RawConfig) -> Result<(), ConfigError> {
        if let Some(database) = raw.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }
        if let Some(server) = raw.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }
        if let Some(logging) = raw.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format.parse()?;
            }
        }
        if let Some(reports) = raw.reports {
            let rendered = toml::to_string(&reports).map_err(|error| {
                ConfigError::Validation(format!("could not re-render [reports]: {error}"))
            })?;
            self.reports = ReportSettings::from_toml_str(&rendered)?;
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = env::var(ENV_DATABASE_URL) {
            self.database.url = url;
        }
        if let Ok(level) = env::var(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Ok(format) = env::var(ENV_LOG_FORMAT) {
            self.logging.format = format.parse()?;
        }
        if let Ok(bind_address) = env::var(ENV_BIND_ADDRESS) {
            self.server.bind_address = bind_address;
        }
        if let Ok(port) = env::var(ENV_PORT) {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                key: ENV_PORT.to_string(),
                value: port,
            })?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = overrides.database_url {
            self.database.url = url;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if self.server.bind_address.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.bind_address must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pipecast.toml");
        let mut file = std::fs::File::create(&path).expect("create config");
        file.write_all(contents.as_bytes()).expect("write config");
        (dir, path)
    }

    #[test]
    fn defaults_apply_without_a_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AppConfig::load(LoadOptions {
            config_path: Some(dir.path().join("missing.toml")),
            ..LoadOptions::default()
        })
        .expect("load defaults");

        assert_eq!(config.database.url, "sqlite://pipecast.db");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = AppConfig::load(LoadOptions {
            config_path: Some(dir.path().join("missing.toml")),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect_err("missing file");
        assert!(matches!(error, ConfigError::MissingConfigFile(_)));
    }

    #[test]
    fn file_values_override_defaults() {
        let (_dir, path) = write_config(
            r#"
            [database]
            url = "sqlite://reports.db"
            max_connections = 2

            [server]
            port = 9090

            [logging]
            level = "debug"
            format = "json"

            [reports]
            roster_limit = 3
            "#,
        );

        let config = AppConfig::load(LoadOptions {
            config_path: Some(path),
            ..LoadOptions::default()
        })
        .expect("load config");

        assert_eq!(config.database.url, "sqlite://reports.db");
        assert_eq!(config.database.max_connections, 2);
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.reports.roster_limit(), 3);
    }

    #[test]
    fn explicit_overrides_beat_the_file() {
        let (_dir, path) = write_config("[database]\nurl = \"sqlite://from-file.db\"\n");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(path),
            overrides: ConfigOverrides {
                database_url: Some("sqlite://from-override.db".to_string()),
                port: Some(1234),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("load config");

        assert_eq!(config.database.url, "sqlite://from-override.db");
        assert_eq!(config.server.port, 1234);
    }

    #[test]
    fn malformed_file_reports_a_parse_error() {
        let (_dir, path) = write_config("not [valid toml");
        let error = AppConfig::load(LoadOptions {
            config_path: Some(path),
            ..LoadOptions::default()
        })
        .expect_err("parse failure");
        assert!(matches!(error, ConfigError::ParseFile { .. }));
    }

    #[test]
    fn zero_connections_fail_validation() {
        let (_dir, path) = write_config("[database]\nmax_connections = 0\n");
        let error = AppConfig::load(LoadOptions {
            config_path: Some(path),
            ..LoadOptions::default()
        })
        .expect_err("validation failure");
        assert!(matches!(error, ConfigError::Validation(_)));
    }
}
