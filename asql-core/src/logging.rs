//! Logging setup for asql.
//!
//! All crates log through `tracing`. Dispatch and barrier events are logged
//! at `debug` and `trace`, connection lifecycle at `info`, and misuse (a
//! transaction dropped without being finished, an operation task that died)
//! at `warn`.
//!
//! # Environment Variables
//!
//! - `ASQL_DEBUG=true|1|yes` - Enable debug logging
//! - `ASQL_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific log level
//! - `ASQL_LOG_FORMAT=json|pretty|compact` - Set the output format (default: json)
//!
//! # Usage
//!
//! ```rust,no_run
//! use asql_core::logging;
//!
//! // Installs a subscriber when the `tracing-subscriber` feature is on and
//! // one of the variables above asks for output.
//! logging::init();
//! ```
//!
//! Applications that install their own subscriber can skip this module.

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

const DEBUG_VAR: &str = "ASQL_DEBUG";
const LEVEL_VAR: &str = "ASQL_LOG_LEVEL";
const FORMAT_VAR: &str = "ASQL_LOG_FORMAT";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Multi-line human readable output.
    Pretty,
    /// Single-line human readable output.
    Compact,
}

impl LogFormat {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::to_lowercase).as_deref() {
            Some("pretty") => Self::Pretty,
            Some("compact") => Self::Compact,
            _ => Self::Json,
        }
    }

    /// Name of the format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
            Self::Compact => "compact",
        }
    }
}

fn parse_debug(raw: Option<&str>) -> bool {
    raw.is_some_and(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
}

fn parse_level(raw: Option<&str>, debug: bool) -> &'static str {
    let fallback = if debug { "debug" } else { "warn" };
    match raw.map(str::to_lowercase).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => fallback,
    }
}

/// Check if `ASQL_DEBUG` enables debug logging.
#[inline]
pub fn is_debug_enabled() -> bool {
    parse_debug(env::var(DEBUG_VAR).ok().as_deref())
}

/// The configured log level.
///
/// `ASQL_LOG_LEVEL` wins; otherwise "debug" when `ASQL_DEBUG` is set and
/// "warn" when it is not.
pub fn log_level() -> &'static str {
    parse_level(env::var(LEVEL_VAR).ok().as_deref(), is_debug_enabled())
}

/// The configured output format.
pub fn log_format() -> LogFormat {
    LogFormat::parse(env::var(FORMAT_VAR).ok().as_deref())
}

/// Install a global subscriber according to the environment.
///
/// Does nothing unless `ASQL_DEBUG` or `ASQL_LOG_LEVEL` is set, or when the
/// `tracing-subscriber` feature is off. Later calls are no-ops.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var(LEVEL_VAR).is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let level = log_level();
            let filter = EnvFilter::try_new(format!(
                "asql={level},asql_core={level},asql_sqlite={level}"
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            let registry = tracing_subscriber::registry().with(filter);
            let installed = match log_format() {
                LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
                LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
                LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
            };

            if installed.is_ok() {
                tracing::info!(
                    level = level,
                    format = log_format().as_str(),
                    "asql logging initialized"
                );
            }
        }
    });
}

/// Set `ASQL_LOG_LEVEL` and initialize logging.
///
/// # Safety
///
/// This function modifies environment variables, which is unsafe in
/// multi-threaded programs. Call it at startup before spawning threads.
pub fn init_with_level(level: &str) {
    // SAFETY: the caller runs this before any other thread exists.
    unsafe {
        env::set_var(LEVEL_VAR, level);
    }
    init();
}
