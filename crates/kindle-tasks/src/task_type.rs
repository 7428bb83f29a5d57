use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle points at which queued tasks run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TaskType {
    /// Before the application starts.
    PreStart,
    /// After the application has started.
    PostStart,
    /// Before the application shuts down.
    PreShutdown,
    /// After the application has shut down.
    PostShutdown,
}

/// Errors encountered while parsing a [`TaskType`] from text.
pub type TaskTypeParseError = strum::ParseError;
