//! Logging setup for coto.
//!
//! Output is structured JSON by default and is controlled by environment
//! variables:
//!
//! - `COTO_DEBUG=true|1|yes` - raise the default level to debug
//! - `COTO_LOG_LEVEL=trace|debug|info|warn|error` - set the level explicitly
//! - `COTO_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! ```rust,no_run
//! use coto_query::logging;
//!
//! // once, at startup
//! logging::init();
//! ```
//!
//! Inside the crates, use the `tracing` macros with structured fields. Never
//! log a password or an unredacted connection string:
//!
//! ```rust,ignore
//! debug!(key = %key, uri = %uri, "opening connection"); // uri renders redacted
//! warn!(error = %err, "liveness probe failed, reconnecting");
//! ```

use std::sync::Once;

use crate::config::{EnvSource, StdEnvSource};

static INIT: Once = Once::new();

/// Crates whose events are shown at the configured level.
const TARGETS: [&str; 4] = ["coto", "coto_query", "coto_mongodb", "coto_axum"];

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Multi-line, human readable.
    Pretty,
    /// Single-line, human readable.
    Compact,
}

/// Resolved logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Level name.
    pub level: &'static str,
    /// Output format.
    pub format: LogFormat,
}

impl LogSettings {
    /// Read the settings from an environment source.
    pub fn from_source(env: &dyn EnvSource) -> Self {
        let debug = is_debug_enabled_in(env);
        let level = env
            .get("COTO_LOG_LEVEL")
            .and_then(|level| match level.to_lowercase().as_str() {
                "trace" => Some("trace"),
                "debug" => Some("debug"),
                "info" => Some("info"),
                "warn" => Some("warn"),
                "error" => Some("error"),
                _ => None,
            })
            .unwrap_or(if debug { "debug" } else { "info" });

        let format = env
            .get("COTO_LOG_FORMAT")
            .map(|f| match f.to_lowercase().as_str() {
                "pretty" => LogFormat::Pretty,
                "compact" => LogFormat::Compact,
                _ => LogFormat::Json,
            })
            .unwrap_or(LogFormat::Json);

        Self { level, format }
    }

    /// The filter directive for these settings.
    pub fn directive(&self) -> String {
        let mut directive = String::from("warn");
        for target in TARGETS {
            directive.push(',');
            directive.push_str(target);
            directive.push('=');
            directive.push_str(self.level);
        }
        directive
    }
}

/// Check if `COTO_DEBUG` is set.
#[inline]
pub fn is_debug_enabled() -> bool {
    is_debug_enabled_in(&StdEnvSource)
}

fn is_debug_enabled_in(env: &dyn EnvSource) -> bool {
    env.get("COTO_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Initialize the global subscriber from the process environment.
///
/// Subsequent calls are no-ops. Without the `tracing-subscriber` feature
/// this does nothing and the host application installs its own subscriber.
pub fn init() {
    init_with(LogSettings::from_source(&StdEnvSource));
}

/// Initialize the global subscriber with explicit settings.
pub fn init_with(settings: LogSettings) {
    INIT.call_once(|| {
        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter = EnvFilter::try_new(settings.directive())
                .unwrap_or_else(|_| EnvFilter::new("info"));

            // another subscriber may already be installed (tests, embedding)
            let installed = match settings.format {
                LogFormat::Json => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().json())
                    .try_init(),
                LogFormat::Compact => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().compact())
                    .try_init(),
                LogFormat::Pretty => tracing_subscriber::registry()
                    .with(filter)
                    .with(fmt::layer().pretty())
                    .try_init(),
            };

            if installed.is_ok() {
                tracing::debug!(
                    level = settings.level,
                    format = ?settings.format,
                    "coto logging initialized"
                );
            }
        }

        #[cfg(not(feature = "tracing-subscriber"))]
        {
            let _ = settings;
        }
    });
}
