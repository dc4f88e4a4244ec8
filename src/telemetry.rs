//! Tracing setup for the server binary.
//!
//! Human-readable logs go to stderr so stdout stays a clean stream of
//! phrase events. With `--logs`, debug-level output is written as JSON
//! lines to a temp file instead, for machine consumption.

use crate::config::AppConfig;
use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::Level;
use tracing_subscriber::fmt::time::UtcTime;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

pub fn trace_log_path() -> PathBuf {
    env::var("EARWIRE_TRACE_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("earwire_trace.jsonl"))
}

pub fn init_tracing(config: &AppConfig) {
    let logs_enabled = config.logs;
    let _ = TRACING_INIT.get_or_init(|| {
        if logs_enabled {
            let path = trace_log_path();
            let file = match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => file,
                Err(_) => return,
            };
            let subscriber = tracing_subscriber::fmt()
                .json()
                .with_timer(UtcTime::rfc_3339())
                .with_writer(file)
                .with_max_level(Level::DEBUG)
                .with_current_span(false)
                .with_span_list(false)
                .finish();
            let _ = tracing::subscriber::set_global_default(subscriber);
        } else {
            let subscriber = tracing_subscriber::fmt()
                .compact()
                .with_writer(std::io::stderr)
                .with_max_level(Level::INFO)
                .with_target(false)
                .finish();
            let _ = tracing::subscriber::set_global_default(subscriber);
        }
    });
}
