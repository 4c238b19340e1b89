//! # Structured Logging
//!
//! Environment-aware console logging for a containerized service. Output
//! goes to stdout, either as human-readable lines or, with
//! `LOG_FORMAT=json`, as one JSON object per event for log shippers.
//!
//! The level comes from `RUST_LOG` when set, otherwise from the environment
//! name: `local` and `test` log at debug, everything else at info.

use std::io::IsTerminal;
use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::constants::DEFAULT_ENVIRONMENT;

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Install the global subscriber. Safe to call more than once; only the
/// first call does anything, and an already-installed subscriber is kept.
pub fn init_structured_logging() {
    TRACING_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let log_level = get_log_level(&environment, std::env::var("RUST_LOG").ok().as_deref());
        let json = use_json_format(std::env::var("LOG_FORMAT").ok().as_deref());
        let use_ansi = IsTerminal::is_terminal(&std::io::stdout());

        let console_layer = (!json).then(|| {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(use_ansi)
                .with_filter(EnvFilter::new(&log_level))
        });

        let json_layer = json.then(|| {
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(true)
                .with_filter(EnvFilter::new(&log_level))
        });

        let subscriber = tracing_subscriber::registry()
            .with(console_layer)
            .with(json_layer);

        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        } else {
            tracing::info!(
                environment = %environment,
                log_level = %log_level,
                json_output = json,
                ansi_colors = use_ansi,
                "Structured logging initialized"
            );
        }
    });
}

fn get_environment() -> String {
    std::env::var("ENV")
        .ok()
        .filter(|env| !env.is_empty())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
}

fn get_log_level(environment: &str, rust_log: Option<&str>) -> String {
    if let Some(level) = rust_log.filter(|level| !level.is_empty()) {
        return level.to_lowercase();
    }

    match environment {
        "local" | "test" => "debug".to_string(),
        _ => "info".to_string(),
    }
}

fn use_json_format(log_format: Option<&str>) -> bool {
    log_format
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("local", None), "debug");
        assert_eq!(get_log_level("test", None), "debug");
        assert_eq!(get_log_level("stg", None), "info");
        assert_eq!(get_log_level("prd", None), "info");
    }

    #[test]
    fn test_rust_log_overrides_environment() {
        assert_eq!(get_log_level("prd", Some("WARN")), "warn");
        assert_eq!(
            get_log_level("local", Some("sftp_ingestion=trace")),
            "sftp_ingestion=trace"
        );
        assert_eq!(get_log_level("prd", Some("")), "info");
    }

    #[test]
    fn test_json_format_selection() {
        assert!(use_json_format(Some("json")));
        assert!(use_json_format(Some("JSON")));
        assert!(!use_json_format(Some("pretty")));
        assert!(!use_json_format(None));
    }

    #[test]
    fn test_init_is_idempotent() {
        init_structured_logging();
        init_structured_logging();
    }
}
