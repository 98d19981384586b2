//! Configuration loading

use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::Config;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "AUTHGATE_CONFIG_PATH";

/// Config files looked up in the working directory, in order
const DEFAULT_CONFIG_FILES: [&str; 3] = ["config.toml", "config.yaml", "config.json"];

/// Pick the config file to load
///
/// Search order:
/// 1. explicit path (`--config`)
/// 2. `AUTHGATE_CONFIG_PATH`
/// 3. `config.toml` / `config.yaml` / `config.json` in the working directory
///
/// `None` means environment variables and defaults only.
#[must_use]
pub fn config_path(explicit: Option<&str>) -> Option<String> {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().filter(|p| !p.is_empty()))
        .or_else(|| {
            DEFAULT_CONFIG_FILES
                .iter()
                .find(|name| Path::new(name).exists())
                .map(|name| (*name).to_string())
        })
}

/// Load and validate the configuration
///
/// A named config file that cannot be read is an error, never silently skipped.
pub fn load_config(explicit: Option<&str>) -> Result<Config> {
    let config = match config_path(explicit) {
        Some(path) => {
            eprintln!("Loading config from {path}");
            Config::from_file(&path).map_err(|e| anyhow::anyhow!("Failed to load {path}: {e}"))?
        }
        None => {
            eprintln!("No config file found, using environment variables");
            Config::from_env()?
        }
    };

    // Fail fast on misconfigurations
    if let Err(errors) = config.validate() {
        for error in &errors {
            tracing::error!("Config validation error: {}", error);
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s): {}",
            errors.len(),
            errors.join("; ")
        ));
    }

    info!(
        providers = config.providers.len(),
        "Configuration loaded and validated successfully"
    );
    info!("HTTP address: {}", config.http_address());

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_explicit_path_wins() {
        assert_eq!(
            config_path(Some("/etc/authgate/config.toml")).as_deref(),
            Some("/etc/authgate/config.toml")
        );
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 8123

[providers.steam]
type = "steam"
"#
        )
        .unwrap();

        let config = load_config(file.path().to_str()).unwrap();
        assert_eq!(config.server.port, 8123);
        assert!(config.providers.contains_key("steam"));
    }

    #[test]
    fn test_invalid_file_fails_validation() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[providers.my_provider]
type = "oauth2"
client_id = "id"
"#
        )
        .unwrap();

        let err = load_config(file.path().to_str()).unwrap_err();
        assert!(err.to_string().contains("validation failed"), "{err}");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(load_config(Some("/nonexistent/authgate.toml")).is_err());
    }
}
