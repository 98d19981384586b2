use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize structured logging based on configuration
///
/// `RUST_LOG` wins over the configured level. Output is JSON or pretty,
/// written to stdout or appended to `file_path`.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(&config.level)?,
    };

    let layer = output_layer(config)?.with_filter(env_filter);
    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))?;

    Ok(())
}

fn output_layer(config: &LoggingConfig) -> anyhow::Result<BoxedLayer> {
    let file = match &config.file_path {
        Some(path) => Some(std::sync::Arc::new(
            std::fs::OpenOptions::new().create(true).append(true).open(path)?,
        )),
        None => None,
    };

    let layer: BoxedLayer = if config.format == "json" {
        let json = fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_current_span(true)
            .with_target(true)
            .with_line_number(true);
        match file {
            Some(file) => json.with_writer(file).boxed(),
            None => json.boxed(),
        }
    } else {
        let pretty = fmt::layer().pretty().with_target(true).with_file(false);
        match file {
            Some(file) => pretty.with_ansi(false).with_writer(file).boxed(),
            None => pretty.boxed(),
        }
    };

    Ok(layer)
}

/// Plain levels (`info`) or full directives (`authgate_core=debug,info`)
fn build_filter(level: &str) -> anyhow::Result<EnvFilter> {
    if let Ok(level) = parse_log_level(level) {
        return Ok(EnvFilter::new(level.to_string()));
    }
    EnvFilter::try_new(level).map_err(|e| anyhow::anyhow!("Invalid log level \"{level}\": {e}"))
}

/// Parse log level string to tracing Level
fn parse_log_level(level: &str) -> anyhow::Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(anyhow::anyhow!("Invalid log level: {level}")),
    }
}
