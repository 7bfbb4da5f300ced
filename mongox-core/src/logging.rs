//! Logging setup for mongox.
//!
//! The crate logs through `tracing` and installs nothing by default. Call
//! [`init`] once at startup (with the `tracing-subscriber` feature) to get a
//! subscriber configured from the environment.
//!
//! # Environment Variables
//!
//! - `MONGOX_DEBUG=true|1|yes` - Enable debug logging
//! - `MONGOX_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific level
//! - `MONGOX_LOG_FORMAT=json|pretty|compact` - Output format (default: json)
//!
//! What gets logged:
//!
//! - `debug`: each registry dispatch and each driver call issued by a façade
//! - `trace`: each callback invoked
//! - `info`: connecting to a server
//! - `warn`: a wildcard stage dispatched directly
//!
//! ```rust,no_run
//! use mongox_core::logging;
//!
//! logging::init();
//! ```

use std::env;
use std::sync::Once;

/// Enables debug logging when set to `true`, `1`, or `yes`.
pub const ENV_DEBUG: &str = "MONGOX_DEBUG";
/// Overrides the log level.
pub const ENV_LOG_LEVEL: &str = "MONGOX_LOG_LEVEL";
/// Selects the output format.
pub const ENV_LOG_FORMAT: &str = "MONGOX_LOG_FORMAT";

static INIT: Once = Once::new();

/// Check if `MONGOX_DEBUG` enables debug logging.
#[inline]
pub fn is_debug_enabled() -> bool {
    debug_enabled_from(|name| env::var(name).ok())
}

/// Level from `MONGOX_LOG_LEVEL`, falling back to `debug` when
/// `MONGOX_DEBUG` is on and `warn` otherwise.
pub fn get_log_level() -> &'static str {
    log_level_from(|name| env::var(name).ok())
}

/// Format from `MONGOX_LOG_FORMAT`, `json` unless `pretty` or `compact`.
pub fn get_log_format() -> &'static str {
    log_format_from(|name| env::var(name).ok())
}

fn debug_enabled_from(lookup: impl Fn(&str) -> Option<String>) -> bool {
    lookup(ENV_DEBUG).is_some_and(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
}

fn log_level_from(lookup: impl Fn(&str) -> Option<String>) -> &'static str {
    let fallback = if debug_enabled_from(&lookup) {
        "debug"
    } else {
        "warn"
    };
    match lookup(ENV_LOG_LEVEL).map(|level| level.to_lowercase()).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => fallback,
    }
}

fn log_format_from(lookup: impl Fn(&str) -> Option<String>) -> &'static str {
    match lookup(ENV_LOG_FORMAT).map(|f| f.to_lowercase()).as_deref() {
        Some("pretty") => "pretty",
        Some("compact") => "compact",
        _ => "json",
    }
}

/// Filter directive covering every mongox crate at `level`.
pub fn filter_directive(level: &str) -> String {
    format!("mongox={level},mongox_core={level},mongox_bson={level}")
}

/// Initialize logging from the environment.
///
/// Does nothing unless `MONGOX_DEBUG` or `MONGOX_LOG_LEVEL` is set, or when
/// the `tracing-subscriber` feature is off. Later calls are no-ops.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var(ENV_LOG_LEVEL).is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = get_log_level();
            let filter = EnvFilter::try_new(filter_directive(level))
                .unwrap_or_else(|_| EnvFilter::new("warn"));

            match get_log_format() {
                "json" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().json())
                        .init();
                }
                "compact" => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().compact())
                        .init();
                }
                _ => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().pretty())
                        .init();
                }
            }

            tracing::info!(
                level = level,
                format = get_log_format(),
                "mongox logging initialized"
            );
        }
    });
}

/// Initialize logging at `level`.
///
/// # Safety
///
/// Sets `MONGOX_LOG_LEVEL`, which is unsound while other threads read the
/// environment. Call it at startup before spawning threads.
pub fn init_with_level(level: &str) {
    // SAFETY: documented as startup-only, before other threads exist.
    unsafe {
        env::set_var(ENV_LOG_LEVEL, level);
    }
    init();
}

/// Initialize debug logging; same as `MONGOX_DEBUG=true` plus [`init`].
///
/// # Safety
///
/// Same constraint as [`init_with_level`].
pub fn init_debug() {
    // SAFETY: documented as startup-only, before other threads exist.
    unsafe {
        env::set_var(ENV_DEBUG, "true");
    }
    init();
}
