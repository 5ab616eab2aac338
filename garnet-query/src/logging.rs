//! Logging setup for Garnet.
//!
//! Library code only emits `tracing` events. Applications that do not install
//! their own subscriber can call [`init`] (behind the `tracing-subscriber`
//! feature) and steer it with environment variables:
//!
//! - `GARNET_DEBUG=true|1|yes` - enable debug logging
//! - `GARNET_LOG_LEVEL=trace|debug|info|warn|error` - set a specific level
//! - `GARNET_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! ```rust,no_run
//! use garnet_query::logging;
//!
//! logging::init();
//! ```
//!
//! Inside the workspace, events carry structured fields:
//!
//! ```rust,ignore
//! debug!(relation = %name, parents = parents.len(), keys = keys.len(), "batch fetch");
//! debug!(sql = %sql, "Executing select");
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Check if debug logging is enabled via `GARNET_DEBUG`.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("GARNET_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Get the configured log level from `GARNET_LOG_LEVEL`.
///
/// Defaults to "debug" if `GARNET_DEBUG` is enabled, otherwise "warn".
pub fn get_log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("GARNET_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// Get the configured log format from `GARNET_LOG_FORMAT`.
pub fn get_log_format() -> &'static str {
    env::var("GARNET_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => "pretty",
            "compact" => "compact",
            _ => "json",
        })
        .unwrap_or("json")
}

/// Build the `EnvFilter` directive string for the workspace crates.
pub fn filter_directives(level: &str) -> String {
    ["garnet_orm", "garnet_query", "garnet_sqlite"]
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize the Garnet logging system.
///
/// Subsequent calls are no-ops. Does nothing unless `GARNET_DEBUG` or
/// `GARNET_LOG_LEVEL` is set.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var("GARNET_LOG_LEVEL").is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(filter_directives(level))
                .unwrap_or_else(|_| EnvFilter::new("warn"));

            // A subscriber installed by the host application wins.
            let installed = match get_log_format() {
                "json" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json())
                    .try_init(),
                "compact" => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact())
                    .try_init(),
                _ => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty())
                    .try_init(),
            };

            if installed.is_ok() {
                tracing::info!(
                    level = level,
                    format = get_log_format(),
                    "Garnet logging initialized"
                );
            }
        }
    });
}

/// Debug-level event that is only emitted when `GARNET_DEBUG` is enabled.
#[macro_export]
macro_rules! garnet_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}
