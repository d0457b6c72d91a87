use anyhow::Context;
use serde::Deserialize;

use crate::books_repository::PostgresBooksRepositoryConfig;

const CONFIG_FILE_ENV: &str = "BOOKSTORE_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "bookstore";
const ENV_PREFIX: &str = "BOOKSTORE";

/// Service configuration, layered from defaults, an optional config file
/// and `BOOKSTORE__SECTION__KEY` environment variables
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        let config_file =
            std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_sources(
            config::Config::builder()
                .add_source(config::File::with_name(&config_file).required(false))
                .add_source(
                    config::Environment::with_prefix(ENV_PREFIX)
                        .separator("__")
                        .try_parsing(true),
                ),
        )
    }

    fn from_sources(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> anyhow::Result<Self> {
        builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DatabaseSettings {
    /// Keeps books in process memory instead of postgres
    #[serde(default)]
    pub use_in_memory: bool,
    #[serde(default = "DatabaseSettings::default_hostname")]
    pub hostname: String,
    #[serde(default = "DatabaseSettings::default_credential")]
    pub username: String,
    #[serde(default = "DatabaseSettings::default_credential")]
    pub password: String,
    #[serde(default = "DatabaseSettings::default_credential")]
    pub dbname: String,
}

impl DatabaseSettings {
    fn default_hostname() -> String {
        "127.0.0.1".to_string()
    }

    fn default_credential() -> String {
        "postgres".to_string()
    }

    pub fn postgres_config(&self) -> PostgresBooksRepositoryConfig {
        PostgresBooksRepositoryConfig {
            hostname: self.hostname.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            dbname: self.dbname.clone(),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            use_in_memory: false,
            hostname: Self::default_hostname(),
            username: Self::default_credential(),
            password: Self::default_credential(),
            dbname: Self::default_credential(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TelemetrySettings {
    #[serde(default = "TelemetrySettings::default_service_name")]
    pub service_name: String,
    /// Exports spans to a local jaeger agent
    #[serde(default)]
    pub jaeger_enabled: bool,
}

impl TelemetrySettings {
    fn default_service_name() -> String {
        "bookstore_service".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            service_name: Self::default_service_name(),
            jaeger_enabled: false,
        }
    }
}
