//! Built-in configuration defaults shared by the kernel and its tests.

use crate::logging::LogFormat;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Bootstrappers are dispatched lazily unless configured otherwise.
#[must_use]
pub const fn default_force_eager_loading() -> bool {
    false
}
