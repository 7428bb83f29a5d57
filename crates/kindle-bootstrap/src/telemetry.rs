//! Telemetry for the application kernel.
//!
//! The `tracing` subscriber is process-wide but kernels are not: every
//! [`bootstrap_with`](crate::bootstrap_with) call asks for telemetry, the
//! first installs the subscriber and later kernels join it.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{EnvFilter, fmt};

use kindle_config::{KindleConfig, LogFormat};

/// Format of the subscriber installed by the first kernel.
static INSTALLED_FORMAT: OnceCell<LogFormat> = OnceCell::new();

/// The part of [`KindleConfig`] telemetry depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetrySettings<'config> {
    filter: &'config str,
    format: LogFormat,
}

impl<'config> TelemetrySettings<'config> {
    /// Settings with an explicit filter expression and format.
    #[must_use]
    pub const fn new(filter: &'config str, format: LogFormat) -> Self {
        Self { filter, format }
    }

    /// Settings taken from a loaded kernel configuration.
    #[must_use]
    pub fn from_config(config: &'config KindleConfig) -> Self {
        Self::new(config.log_filter(), config.log_format())
    }

    fn env_filter(&self) -> Result<EnvFilter, TelemetryError> {
        EnvFilter::try_new(self.filter).map_err(|error| TelemetryError::InvalidFilter {
            filter: self.filter.to_owned(),
            message: error.to_string(),
        })
    }
}

/// Outcome of a kernel's telemetry request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryHandle {
    /// This kernel installed the global subscriber.
    Installed(LogFormat),
    /// An earlier kernel installed it; events keep that kernel's format.
    Joined(LogFormat),
}

impl TelemetryHandle {
    /// Format events are written in.
    #[must_use]
    pub const fn format(self) -> LogFormat {
        match self {
            Self::Installed(format) | Self::Joined(format) => format,
        }
    }

    /// Whether this request installed the subscriber.
    #[must_use]
    pub const fn installed_here(self) -> bool {
        matches!(self, Self::Installed(_))
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter expression did not parse.
    #[error("invalid log filter `{filter}`: {message}")]
    InvalidFilter {
        /// Rejected expression.
        filter: String,
        /// Parser diagnostic.
        message: String,
    },
    /// A subscriber not installed by a kernel was already set.
    #[error("another tracing subscriber is already installed: {0}")]
    ForeignSubscriber(#[source] SetGlobalDefaultError),
}

/// Installs the global subscriber on the first call and joins it afterwards.
///
/// The filter is validated on every call, so a kernel with a malformed
/// `log_filter` fails even when an earlier kernel already installed
/// telemetry.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for a malformed filter and
/// [`TelemetryError::ForeignSubscriber`] when some other code installed a
/// global subscriber first.
pub fn initialise(settings: TelemetrySettings<'_>) -> Result<TelemetryHandle, TelemetryError> {
    let filter = settings.env_filter()?;
    let mut installed_here = false;
    let format = INSTALLED_FORMAT.get_or_try_init(|| -> Result<LogFormat, TelemetryError> {
        install(filter, settings.format)?;
        installed_here = true;
        Ok(settings.format)
    })?;
    Ok(if installed_here {
        TelemetryHandle::Installed(*format)
    } else {
        TelemetryHandle::Joined(*format)
    })
}

fn install(filter: EnvFilter, format: LogFormat) -> Result<(), TelemetryError> {
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(fmt::time::UtcTime::rfc_3339());
    let installed = match format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            builder.json().flatten_event(true).finish(),
        ),
        LogFormat::Compact => tracing::subscriber::set_global_default(builder.compact().finish()),
    };
    installed.map_err(TelemetryError::ForeignSubscriber)
}
