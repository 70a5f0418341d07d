//! Logger and HTTP client construction.

use std::io::Write;
use std::time::Duration;

use log::SetLoggerError;

use crate::config::{Config, LogFormat};

/// Initializes the global logger with the requested level and format.
pub fn init_logger_with(level: log::LevelFilter, format: LogFormat) -> Result<(), SetLoggerError> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);

    if let LogFormat::Json = format {
        builder.format(|buf, record| {
            let line = serde_json::json!({
                "ts": chrono::Utc::now().to_rfc3339(),
                "level": record.level().to_string(),
                "target": record.target(),
                "message": record.args().to_string(),
            });
            writeln!(buf, "{}", line)
        });
    }

    builder.try_init()
}

/// Builds the HTTP client used for geocoding. The User-Agent carries the
/// caller's contact email, which Nominatim's usage policy requires.
pub fn init_client(config: &Config) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(format!(
            "timeline_to_city/{} ({})",
            env!("CARGO_PKG_VERSION"),
            config.email
        ))
        .build()
}
