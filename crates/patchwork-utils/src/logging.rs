/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Patchwork Logging Module
//!
//! A process-wide `log` implementation used by the engine and its CLI.
//!
//! ## Usage
//!
//! ```ignore
//! patchwork_utils::logging::init_with_format("info", "json")?;
//! log::info!("reconciling patch window {}", window);
//! patchwork_utils::logging::update_log_level("debug")?;
//! ```
//!
//! Notification channel URLs embed webhook secrets. Anything that logs a
//! channel endpoint must pass it through [`redact_url`] first.

use log::{LevelFilter, Metadata, Record, SetLoggerError};
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub use log::{debug, error, info, trace, warn};

static LOGGER: PatchworkLogger = PatchworkLogger;
static CURRENT_LEVEL: AtomicUsize = AtomicUsize::new(LevelFilter::Info as usize);
static JSON_FORMAT: AtomicBool = AtomicBool::new(false);
static INIT: OnceCell<()> = OnceCell::new();

/// Logger writing one line per record to stderr, as text or JSON.
pub struct PatchworkLogger;

impl log::Log for PatchworkLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= level_filter_from_usize(CURRENT_LEVEL.load(Ordering::Relaxed))
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        if JSON_FORMAT.load(Ordering::Relaxed) {
            let log_entry = serde_json::json!({
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "level": record.level().to_string().to_lowercase(),
                "target": record.target(),
                "message": format!("{}", record.args()),
                "module": record.module_path(),
                "file": record.file(),
                "line": record.line()
            });
            eprintln!("{}", log_entry);
        } else {
            eprintln!(
                "{} - {} [{}]: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

/// Initializes the logger with text output.
pub fn init(level: &str) -> Result<(), SetLoggerError> {
    init_with_format(level, "text")
}

/// Initializes the logger with the given level and format.
///
/// # Arguments
/// * `level` - "off", "error", "warn", "info", "debug" or "trace". Unknown values fall back to info.
/// * `format` - "text" for human-readable lines, "json" for one JSON object per line
///
/// Calling this more than once only updates the level and format.
pub fn init_with_format(level: &str, format: &str) -> Result<(), SetLoggerError> {
    let level_filter = str_to_level_filter(level);
    let use_json = format.eq_ignore_ascii_case("json");

    INIT.get_or_try_init(|| {
        log::set_logger(&LOGGER).map(|()| log::set_max_level(LevelFilter::Trace))
    })?;

    JSON_FORMAT.store(use_json, Ordering::Relaxed);
    CURRENT_LEVEL.store(level_filter as usize, Ordering::Relaxed);
    log::set_max_level(level_filter);
    Ok(())
}

/// Updates the current log level at runtime. Unlike [`init_with_format`],
/// an unknown level is rejected and the current level kept.
pub fn update_log_level(level: &str) -> Result<(), String> {
    let new_level: LevelFilter = level
        .parse()
        .map_err(|_| format!("Unknown log level '{}'", level))?;
    CURRENT_LEVEL.store(new_level as usize, Ordering::Relaxed);
    log::set_max_level(new_level);
    Ok(())
}

/// Strips credentials, path, query and fragment from a URL, leaving only
/// scheme, host and port.
///
/// Webhook URLs carry their secret in the path or query string, so this is
/// the only form of a channel endpoint that may appear in logs.
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => match parsed.port() {
                Some(port) => format!("{}://{}:{}/…", parsed.scheme(), host, port),
                None => format!("{}://{}/…", parsed.scheme(), host),
            },
            None => "<redacted>".to_string(),
        },
        Err(_) => "<redacted>".to_string(),
    }
}

fn str_to_level_filter(level: &str) -> LevelFilter {
    level.parse().unwrap_or(LevelFilter::Info)
}

fn level_filter_from_usize(v: usize) -> LevelFilter {
    LevelFilter::iter().nth(v).unwrap_or(LevelFilter::Off)
}

pub mod prelude {
    pub use log::{debug, error, info, trace, warn};
}
