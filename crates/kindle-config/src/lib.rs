//! Shared configuration for the Kindle application kernel.
//!
//! Configuration is layered by [`ortho_config`]: built-in defaults, then an
//! optional `kindle.toml` file, then `KINDLE_*` environment variables, then
//! command-line flags. The resulting [`KindleConfig`] controls how the
//! bootstrapper dispatcher behaves (lazy or forced-eager dispatch), how the
//! telemetry subscriber renders events, and where the registry manifest cache
//! lives.

mod defaults;
mod logging;

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, default_force_eager_loading, default_log_filter,
    default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved kernel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "KINDLE")]
pub struct KindleConfig {
    /// Initialise every bootstrapper during dispatch, including those that
    /// only supply lazy bindings.
    #[ortho_config(default = default_force_eager_loading())]
    pub force_eager_loading: bool,
    /// `tracing` filter expression applied to the telemetry subscriber.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format of the telemetry subscriber.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Location of the JSON registry manifest cache, if caching is enabled.
    pub manifest_cache: Option<Utf8PathBuf>,
}

impl KindleConfig {
    /// Loads configuration from files, environment and process arguments.
    ///
    /// # Errors
    ///
    /// Returns the aggregated loader error when any layer is malformed.
    pub fn load_layers() -> Result<Self, Arc<OrthoError>> {
        Self::load()
    }

    /// Whether lazy semantics are suppressed.
    #[must_use]
    pub const fn force_eager_loading(&self) -> bool {
        self.force_eager_loading
    }

    /// Filter expression for the telemetry subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format for the telemetry subscriber.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Path of the registry manifest cache.
    #[must_use]
    pub fn manifest_cache(&self) -> Option<&Utf8Path> {
        self.manifest_cache.as_deref()
    }
}

impl Default for KindleConfig {
    fn default() -> Self {
        Self {
            force_eager_loading: default_force_eager_loading(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            manifest_cache: None,
        }
    }
}
