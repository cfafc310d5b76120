//! Shared logging utilities for consistent tracing across engine components

use crate::types::Component;
use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Default filter directives for a given base level
fn filter_directives(base_level: &str) -> String {
    format!("outreach={base_level},shared={base_level},reqwest=warn,hyper=warn")
}

/// Initialize tracing subscriber with an optional log level
///
/// `RUST_LOG` takes precedence over the supplied level when it is set.
pub fn init_tracing(log_level: Option<&str>) {
    use tracing_subscriber::{fmt, EnvFilter};

    let base_level = log_level.unwrap_or("info");
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(base_level)));

    // Tests may initialize more than once
    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for component-aware info logging
#[macro_export]
macro_rules! component_info {
    ($component:expr, $($arg:tt)*) => {
        tracing::info!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for component-aware warning logging
#[macro_export]
macro_rules! component_warn {
    ($component:expr, $($arg:tt)*) => {
        tracing::warn!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for component-aware error logging
#[macro_export]
macro_rules! component_error {
    ($component:expr, $($arg:tt)*) => {
        tracing::error!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for component-aware debug logging
#[macro_export]
macro_rules! component_debug {
    ($component:expr, $($arg:tt)*) => {
        tracing::debug!(
            component = %$component,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(component: Component, details: &str) {
    info!(
        component = %component,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        details
    );
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(component: Component, reason: &str) {
    info!(
        component = %component,
        timestamp = format_timestamp(),
        "🛑 Shutting down: {}",
        reason
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(component: Component, context: &str, error: &dyn std::fmt::Display) {
    error!(
        component = %component,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(component: Component, message: &str) {
    info!(
        component = %component,
        timestamp = format_timestamp(),
        "✅ {}",
        message
    );
}
