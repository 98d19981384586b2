use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::provider::config::ProviderConfig;

/// Environment variable prefix (`AUTHGATE_SERVER__PORT`, `AUTHGATE_PROVIDERS__GOOGLE__CLIENT_ID`, ...)
pub const ENV_PREFIX: &str = "AUTHGATE";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    /// Provider instances keyed by id (e.g. google, steam, my_provider)
    pub providers: BTreeMap<String, ProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally visible origin (e.g. `https://login.example.com`).
    /// When unset, callback URLs are derived from the incoming request.
    pub public_url: Option<String>,
    /// Where the browser lands after a successful callback
    pub success_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            public_url: None,
            success_path: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// Login flow tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// How long an issued redirect stays redeemable
    pub pending_ttl_seconds: u64,
    /// Upper bound for every outbound provider call
    pub http_timeout_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            pending_ttl_seconds: 600,
            http_timeout_seconds: 10,
        }
    }
}

impl AuthConfig {
    #[must_use]
    pub const fn pending_ttl(&self) -> Duration {
        Duration::from_secs(self.pending_ttl_seconds)
    }

    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_file, Self::environment())
    }

    /// Same as [`Config::load`] with an explicit environment source.
    pub fn load_with_env(config_file: Option<&str>, env: Environment) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            } else {
                return Err(ConfigError::NotFound(path.to_string()));
            }
        }

        builder = builder.add_source(env);

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// `AUTHGATE_` prefixed variables, `__` between nesting levels
    #[must_use]
    pub fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Get HTTP listen address
    #[must_use]
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Check the whole configuration, reporting every problem found
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            errors.push(format!(
                "logging.format must be \"json\" or \"pretty\", got \"{}\"",
                self.logging.format
            ));
        }

        if !self.server.success_path.starts_with('/') || self.server.success_path.starts_with("//") {
            errors.push(format!(
                "server.success_path must be a local path, got \"{}\"",
                self.server.success_path
            ));
        }

        if let Some(public_url) = &self.server.public_url {
            match url::Url::parse(public_url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => errors.push(format!(
                    "server.public_url must use http or https, got \"{}\"",
                    url.scheme()
                )),
                Err(e) => errors.push(format!("server.public_url is not a valid URL: {e}")),
            }
        }

        if self.auth.pending_ttl_seconds == 0 {
            errors.push("auth.pending_ttl_seconds must be greater than zero".to_string());
        }
        if self.auth.http_timeout_seconds == 0 {
            errors.push("auth.http_timeout_seconds must be greater than zero".to_string());
        }

        for (id, provider) in &self.providers {
            if let Err(e) = provider.resolve(id, self.auth.http_timeout()) {
                errors.push(e.to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::config::ProviderKind;
    use std::io::Write;

    fn env_from(pairs: &[(&str, &str)]) -> Environment {
        let source = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::environment().source(Some(source))
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.http_address(), "0.0.0.0:8000");
        assert_eq!(config.server.success_path, "/");
        assert_eq!(config.auth.pending_ttl(), Duration::from_secs(600));
        assert!(config.providers.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_then_env_layering() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9000

[providers.google]
client_id = "file-id"
client_secret = "file-secret"

[providers.steam]
type = "steam"
"#
        )
        .unwrap();

        let env = env_from(&[
            ("AUTHGATE_SERVER__HOST", "127.0.0.1"),
            ("AUTHGATE_PROVIDERS__GOOGLE__CLIENT_ID", "env-id"),
        ]);
        let config = Config::load_with_env(file.path().to_str(), env).unwrap();

        assert_eq!(config.http_address(), "127.0.0.1:9000");
        let google = &config.providers["google"];
        assert_eq!(google.client_id, "env-id");
        assert_eq!(google.client_secret, "file-secret");
        assert!(config.providers.contains_key("steam"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = Config::load_with_env(Some("/nonexistent/authgate.toml"), env_from(&[]));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_collects_every_error() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        config.server.success_path = "https://evil.example".to_string();
        config.providers.insert(
            "my_provider".to_string(),
            ProviderConfig {
                kind: Some(ProviderKind::OAuth2),
                client_id: "id".to_string(),
                ..ProviderConfig::default()
            },
        );
        config
            .providers
            .insert("google".to_string(), ProviderConfig::default());

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4, "{errors:?}");
        assert!(errors.iter().any(|e| e.contains("logging.format")));
        assert!(errors.iter().any(|e| e.contains("success_path")));
        assert!(errors.iter().any(|e| e.contains("my_provider")));
        assert!(errors.iter().any(|e| e.contains("google")));
    }
}
