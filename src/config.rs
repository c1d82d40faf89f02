//! Configuration for the `mcp-host` binary.
//!
//! The binary is driven by a TOML file with `[server]`, `[transport]`,
//! `[auth]`, and `[logging]` sections. Values from the file can be overridden
//! with `MCP_HOST_*` environment variables using `__` as the section
//! separator, e.g. `MCP_HOST_LOGGING__LEVEL=debug` or
//! `MCP_HOST_TRANSPORT__PORT=9090`.
//!
//! Library consumers configure servers through
//! [`ServerBuilder`](crate::server::ServerBuilder) directly and do not need
//! this module.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, ServerError};
use crate::server::{DEFAULT_BIND_ADDRESS, DEFAULT_SERVER_NAME};
use crate::transport::TransportKind;
use crate::utils::auth::AuthConfig;
use crate::utils::validation::{validate_server_name, validate_version};

/// Main configuration structure for the binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server identity.
    #[serde(default)]
    pub server: ServerConfig,

    /// Transport selection and addressing.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Authentication settings.
    #[serde(default)]
    pub auth: AuthSettings,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server identity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server name.
    #[serde(default = "default_server_name")]
    pub name: String,

    /// Server version.
    #[serde(default = "default_server_version")]
    pub version: String,

    /// Server description, surfaced as `instructions` on initialize.
    pub description: Option<String>,
}

/// Transport layer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Transport kind ("http-sse" or "stdio"; "http" is accepted too).
    #[serde(default = "default_transport_kind")]
    pub kind: TransportKind,

    /// HTTP bind address.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP port.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Authentication configuration.
///
/// Converted into an [`AuthConfig`] gate when enabled. The `custom` scheme
/// has no file representation; it is builder-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Enable authentication.
    #[serde(default)]
    pub enabled: bool,

    /// Authentication scheme.
    #[serde(default)]
    pub scheme: AuthScheme,

    /// Bearer token (scheme = "bearer").
    pub token: Option<String>,

    /// Accepted API keys (scheme = "api-key").
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Username (scheme = "basic").
    pub username: Option<String>,

    /// Password (scheme = "basic").
    pub password: Option<String>,
}

/// Authentication scheme enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthScheme {
    None,
    Bearer,
    ApiKey,
    Basic,
}

impl Default for AuthScheme {
    fn default() -> Self {
        AuthScheme::None
    }
}

/// Logging configuration, consumed by
/// [`init_logging`](crate::utils::logging::init_logging).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format.
    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Write logs to stderr instead of stdout.
    #[serde(default)]
    pub stderr: bool,
}

/// Log format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

// Default value functions
fn default_server_name() -> String {
    DEFAULT_SERVER_NAME.to_string()
}
fn default_server_version() -> String {
    crate::SERVER_VERSION.to_string()
}
fn default_transport_kind() -> TransportKind {
    TransportKind::HttpSse
}
fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            version: default_server_version(),
            description: None,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: default_transport_kind(),
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            stderr: false,
        }
    }
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix("MCP_HOST")
        .separator("__")
        .try_parsing(true)
}

impl Config {
    /// Load configuration from a TOML file, then apply `MCP_HOST_*`
    /// environment overrides on top.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let loaded = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(env_source())
            .build()
            .map_err(|e| ServerError::Config(format!("Failed to read config file: {}", e)))?;

        loaded
            .try_deserialize()
            .map_err(|e| ServerError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Default configuration with `MCP_HOST_*` environment overrides applied.
    pub fn from_env() -> Result<Self> {
        let loaded = config::Config::builder()
            .add_source(env_source())
            .build()
            .map_err(|e| ServerError::Config(format!("Failed to read environment: {}", e)))?;

        loaded
            .try_deserialize()
            .map_err(|e| ServerError::Config(format!("Failed to parse environment: {}", e)))
    }

    /// Save configuration to a file as pretty TOML.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ServerError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ServerError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validate_server_name(&self.server.name)?;
        validate_version(&self.server.version)?;

        if self.transport.kind == TransportKind::HttpSse && self.transport.port == 0 {
            return Err(ServerError::Config(
                "HTTP transport selected but no port configured".to_string(),
            ));
        }

        self.auth.to_auth()?;

        Ok(())
    }
}

impl AuthSettings {
    /// Build the transport auth gate described by this section.
    ///
    /// Returns `Ok(None)` when authentication is disabled.
    pub fn to_auth(&self) -> Result<Option<AuthConfig>> {
        if !self.enabled {
            return Ok(None);
        }

        match self.scheme {
            AuthScheme::None => Err(ServerError::Config(
                "Authentication enabled but no scheme selected".to_string(),
            )),
            AuthScheme::Bearer => match self.token.as_deref() {
                Some(token) if !token.is_empty() => Ok(Some(AuthConfig::bearer(token))),
                _ => Err(ServerError::Config(
                    "Bearer authentication enabled but no token provided".to_string(),
                )),
            },
            AuthScheme::ApiKey => {
                if self.api_keys.is_empty() {
                    return Err(ServerError::Config(
                        "API key authentication enabled but no API keys provided".to_string(),
                    ));
                }
                Ok(Some(AuthConfig::api_key(self.api_keys.clone())))
            }
            AuthScheme::Basic => match (self.username.as_deref(), self.password.as_deref()) {
                (Some(username), Some(password)) if !username.is_empty() => {
                    Ok(Some(AuthConfig::basic(username, password)))
                }
                _ => Err(ServerError::Config(
                    "Basic authentication enabled but username or password missing".to_string(),
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mcp-host.toml");

        let config = Config::default();
        config.to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.server.version, crate::SERVER_VERSION);
        assert_eq!(loaded.transport.kind, TransportKind::HttpSse);
        assert_eq!(loaded.transport.bind_address, "127.0.0.1");
        assert_eq!(loaded.logging.format, LogFormat::Pretty);
        assert!(!loaded.auth.enabled);
        loaded.validate().unwrap();
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(
            &path,
            "[server]\nversion = \"2.1.0\"\n\n[transport]\nkind = \"http\"\n",
        )
        .unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.server.version, "2.1.0");
        assert_eq!(loaded.transport.kind, TransportKind::HttpSse);
        assert_eq!(loaded.logging.level, "info");
        assert_eq!(loaded.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("env.toml");
        std::fs::write(&path, "[server]\nname = \"file-name\"\n").unwrap();

        std::env::set_var("MCP_HOST_SERVER__NAME", "env-name");
        std::env::set_var("MCP_HOST_TRANSPORT__PORT", "9191");
        let loaded = Config::from_file(&path);
        std::env::remove_var("MCP_HOST_SERVER__NAME");
        std::env::remove_var("MCP_HOST_TRANSPORT__PORT");

        let loaded = loaded.unwrap();
        assert_eq!(loaded.server.name, "env-name");
        assert_eq!(loaded.transport.port, 9191);
    }

    #[test]
    fn test_from_file_missing_path() {
        let err = Config::from_file("/nonexistent/mcp-host.toml");
        assert!(matches!(err, Err(ServerError::Config(_))));
    }

    #[test]
    fn test_validate_flags_contradictions() {
        let mut config = Config::default();
        config.transport.port = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.transport.kind = TransportKind::Stdio;
        config.transport.port = 0;
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.server.name = "has space".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.version = "one.two".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.auth.enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_auth_section_to_gate() {
        let mut auth = AuthSettings::default();
        assert!(auth.to_auth().unwrap().is_none());

        auth.enabled = true;
        auth.scheme = AuthScheme::Bearer;
        assert!(auth.to_auth().is_err());

        auth.token = Some("sekrit".to_string());
        assert_eq!(auth.to_auth().unwrap().unwrap().scheme(), "bearer");

        let keys = AuthSettings {
            enabled: true,
            scheme: AuthScheme::ApiKey,
            api_keys: vec!["k1".to_string()],
            ..AuthSettings::default()
        };
        assert_eq!(keys.to_auth().unwrap().unwrap().scheme(), "api-key");

        let basic = AuthSettings {
            enabled: true,
            scheme: AuthScheme::Basic,
            username: Some("admin".to_string()),
            ..AuthSettings::default()
        };
        assert!(basic.to_auth().is_err());
    }
}
