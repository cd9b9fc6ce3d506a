// src/config.rs
use clap::Args;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt as tracing_fmt, prelude::*, EnvFilter};
use url::Url;

use crate::errors::ConfigError;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Connection and logging flags shared by every binary. Each one can also
/// come from the environment (or a `.env` file loaded before parsing).
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Base URL of the backtest service
    #[arg(long, env = "BACKTEST_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "BACKTEST_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Attempts for the symbol list request (the run request is never retried)
    #[arg(long, env = "BACKTEST_SYMBOL_RETRIES", default_value_t = 3)]
    pub symbol_retries: u32,

    /// Directory for log files
    #[arg(long, env = "BACKTEST_LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

impl ConnectionArgs {
    pub fn into_config(self) -> Result<PanelConfig, ConfigError> {
        let config = PanelConfig {
            base: ServiceBase::parse(&self.api_url)?,
            timeout: Duration::from_secs(self.timeout_secs),
            symbol_retries: self.symbol_retries.max(1),
            retry_backoff: Duration::from_millis(500),
            log_dir: self.log_dir,
            debug: self.debug,
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone)]
pub struct PanelConfig {
    pub base: ServiceBase,
    pub timeout: Duration,
    pub symbol_retries: u32,
    /// Multiplied by the attempt number between symbol list retries.
    pub retry_backoff: Duration,
    pub log_dir: PathBuf,
    pub debug: bool,
}

impl PanelConfig {
    pub fn new(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base: ServiceBase::parse(api_url)?,
            timeout: Duration::from_secs(30),
            symbol_retries: 3,
            retry_backoff: Duration::from_millis(500),
            log_dir: PathBuf::from("logs"),
            debug: false,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Root URL of the backtest service. Always http(s) with a hierarchical path,
/// so endpoint paths can be appended without failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceBase(Url);

impl ServiceBase {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(raw.trim()).map_err(|e| ConfigError::BaseUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::BaseUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme {:?}", url.scheme()),
            });
        }
        if url.cannot_be_a_base() || url.query().is_some() {
            return Err(ConfigError::BaseUrl {
                url: raw.to_string(),
                reason: "expected a plain http(s) base without query".to_string(),
            });
        }

        Ok(Self(url))
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// Appends percent-encoded path segments to the base path.
    pub fn join<I, S>(&self, segments: I) -> Url
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut url = self.0.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            for segment in segments {
                path.push(segment.as_ref());
            }
        }
        url
    }
}

impl fmt::Display for ServiceBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str().trim_end_matches('/'))
    }
}

fn env_filter(debug: bool) -> EnvFilter {
    let default = if debug { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// File-only logging for the dashboard, which owns the terminal.
/// Keep the guard alive for the life of the program or buffered lines are lost.
pub fn setup_file_logging(log_dir: &Path, debug: bool) -> std::io::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "backtest_panel");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_level(true)
                .with_ansi(false),
        )
        .with(env_filter(debug))
        .init();

    Ok(guard)
}

pub fn setup_stderr_logging(debug: bool) {
    tracing_subscriber::registry()
        .with(
            tracing_fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        .with(env_filter(debug))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_base_rejects_non_http_urls() {
        assert!(ServiceBase::parse("ftp://example.com").is_err());
        assert!(ServiceBase::parse("not a url").is_err());
        assert!(ServiceBase::parse("mailto:ops@example.com").is_err());
        assert!(ServiceBase::parse("http://localhost:5000?x=1").is_err());
    }

    #[test]
    fn test_join_appends_under_base_path() {
        let base = ServiceBase::parse("http://localhost:5000").unwrap();
        assert_eq!(base.join(["symbols"]).as_str(), "http://localhost:5000/symbols");

        let nested = ServiceBase::parse("https://example.com/api/").unwrap();
        assert_eq!(
            nested.join(["results", "r1", "sig.png"]).as_str(),
            "https://example.com/api/results/r1/sig.png"
        );
        assert_eq!(nested.to_string(), "https://example.com/api");
    }

    #[test]
    fn test_join_encodes_segments() {
        let base = ServiceBase::parse("http://localhost:5000").unwrap();
        assert_eq!(
            base.join(["results", "run 1", "a#b.png"]).as_str(),
            "http://localhost:5000/results/run%201/a%23b.png"
        );
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let args = ConnectionArgs {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 0,
            symbol_retries: 0,
            log_dir: PathBuf::from("logs"),
            debug: false,
        };
        assert!(matches!(args.into_config(), Err(ConfigError::ZeroTimeout)));
    }
}
