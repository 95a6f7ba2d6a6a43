//! Configuration module for the field-ops backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("Invalid FIELDOPS_LOG_FORMAT: {other}")),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
    /// Delay between closing the removal modal and refreshing the leader list
    pub refresh_delay: Duration,
    /// How long recorded procedure responses stay replayable
    pub operation_retention: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let api_psk = env::var("FIELDOPS_API_PSK")
            .ok()
            .filter(|psk| !psk.trim().is_empty());

        let db_path = env::var("FIELDOPS_DB_PATH")
            .unwrap_or_else(|_| "./data/fieldops.sqlite".to_string())
            .into();

        let bind_addr = env::var("FIELDOPS_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_addr = bind_addr
            .parse()
            .map_err(|e| format!("Invalid FIELDOPS_BIND_ADDR {bind_addr}: {e}"))?;

        let log_level = env::var("FIELDOPS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match env::var("FIELDOPS_LOG_FORMAT") {
            Ok(value) => LogFormat::parse(&value)?,
            Err(_) => LogFormat::Pretty,
        };

        let refresh_delay_ms: u64 = match env::var("FIELDOPS_REFRESH_DELAY_MS") {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e| format!("Invalid FIELDOPS_REFRESH_DELAY_MS {value}: {e}"))?,
            Err(_) => 300,
        };

        let retention_hours: u64 = match env::var("FIELDOPS_OPERATION_RETENTION_HOURS") {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e| format!("Invalid FIELDOPS_OPERATION_RETENTION_HOURS {value}: {e}"))?,
            Err(_) => 168,
        };

        Ok(Self {
            api_psk,
            db_path,
            bind_addr,
            log_level,
            log_format,
            refresh_delay: Duration::from_millis(refresh_delay_ms),
            operation_retention: Duration::from_secs(retention_hours * 3600),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env vars are process-global; keep every env assertion in one test.
    #[test]
    fn test_config_from_env() {
        env::remove_var("FIELDOPS_API_PSK");
        env::remove_var("FIELDOPS_DB_PATH");
        env::remove_var("FIELDOPS_BIND_ADDR");
        env::remove_var("FIELDOPS_LOG_LEVEL");
        env::remove_var("FIELDOPS_LOG_FORMAT");
        env::remove_var("FIELDOPS_REFRESH_DELAY_MS");
        env::remove_var("FIELDOPS_OPERATION_RETENTION_HOURS");

        let config = Config::from_env().unwrap();

        assert!(config.api_psk.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/fieldops.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.refresh_delay, Duration::from_millis(300));
        assert_eq!(config.operation_retention, Duration::from_secs(168 * 3600));

        env::set_var("FIELDOPS_BIND_ADDR", "not-an-address");
        assert!(Config::from_env().is_err());
        env::remove_var("FIELDOPS_BIND_ADDR");

        env::set_var("FIELDOPS_LOG_FORMAT", "JSON");
        env::set_var("FIELDOPS_REFRESH_DELAY_MS", "25");
        env::set_var("FIELDOPS_OPERATION_RETENTION_HOURS", "2");
        let config = Config::from_env().unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.refresh_delay, Duration::from_millis(25));
        assert_eq!(config.operation_retention, Duration::from_secs(7200));
        env::remove_var("FIELDOPS_LOG_FORMAT");
        env::remove_var("FIELDOPS_REFRESH_DELAY_MS");

        env::set_var("FIELDOPS_OPERATION_RETENTION_HOURS", "forever");
        assert!(Config::from_env().is_err());
        env::remove_var("FIELDOPS_OPERATION_RETENTION_HOURS");
    }

    #[test]
    fn test_log_format_rejects_unknown() {
        assert!(LogFormat::parse("xml").is_err());
        assert_eq!(LogFormat::parse(" text ").unwrap(), LogFormat::Pretty);
    }
}
