//! Output formats for the kernel's telemetry subscriber.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, VariantNames};
use thiserror::Error;

/// How the kernel renders dispatch and lifecycle events.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Display, VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LogFormat {
    /// One JSON record per event, with the `event` field of each lifecycle
    /// report flattened to the top level.
    #[default]
    Json,
    /// Single-line text for running a kernel from a terminal.
    Compact,
}

impl LogFormat {
    /// Whether events are written as machine-readable records.
    #[must_use]
    pub const fn is_structured(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// A `log_format` value naming no known format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "unknown log format `{value}` (expected one of: {})",
    LogFormat::VARIANTS.join(", ")
)]
pub struct LogFormatParseError {
    value: String,
}

impl LogFormatParseError {
    /// The rejected input.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl FromStr for LogFormat {
    type Err = LogFormatParseError;

    /// Parses a format name, ignoring ASCII case and surrounding whitespace.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(LogFormatParseError {
                value: value.to_owned(),
            }),
        }
    }
}
