//! Log setup for hosts embedding the pipeline

use eyre::{Context, Result, eyre};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{Level, info, warn};

/// Default log directory: `<data_local_dir>/goalpilot/logs`
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("goalpilot")
        .join("logs")
}

/// Parse a level name, falling back to INFO for unknown or missing values
pub fn parse_level(level: Option<&str>) -> Level {
    level.and_then(known_level).unwrap_or(Level::INFO)
}

/// Level for a recognized name, case-insensitive
fn known_level(name: &str) -> Option<Level> {
    match name.trim().to_uppercase().as_str() {
        "TRACE" => Some(Level::TRACE),
        "DEBUG" => Some(Level::DEBUG),
        "INFO" => Some(Level::INFO),
        "WARN" | "WARNING" => Some(Level::WARN),
        "ERROR" => Some(Level::ERROR),
        _ => None,
    }
}

/// Install a file-backed tracing subscriber
///
/// Level priority: `level` argument > `config_level` > INFO. `RUST_LOG`
/// directives still apply on top. Returns the log file path.
pub fn setup_logging(level: Option<&str>, config_level: Option<&str>, log_dir: Option<&Path>) -> Result<PathBuf> {
    let log_dir = log_dir.map(Path::to_path_buf).unwrap_or_else(default_log_dir);
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let requested = level.or(config_level);
    let level = parse_level(requested);
    let log_path = log_dir.join("goalpilot.log");
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

    info!("Logging initialized (level: {:?})", level);
    if let Some(name) = requested.filter(|name| known_level(name).is_none()) {
        warn!(%name, "Unknown log-level, defaulting to INFO");
    }
    Ok(log_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level(Some("trace")), Level::TRACE);
        assert_eq!(parse_level(Some("Debug")), Level::DEBUG);
        assert_eq!(parse_level(Some("warning")), Level::WARN);
        assert_eq!(parse_level(Some(" ERROR ")), Level::ERROR);
        assert_eq!(parse_level(None), Level::INFO);
        assert_eq!(parse_level(Some("loud")), Level::INFO);
    }

    #[test]
    fn test_known_level_rejects_unknown_names() {
        assert_eq!(known_level("Info"), Some(Level::INFO));
        assert_eq!(known_level("loud"), None);
        assert_eq!(known_level(""), None);
    }

    #[test]
    fn test_default_log_dir() {
        assert!(default_log_dir().ends_with("goalpilot/logs"));
    }
}
