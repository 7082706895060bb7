//! Operational states and stop semantics.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Operational state reported by a registered service.
///
/// The set is closed: registry bindings carrying any other value are rejected
/// when parsed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    Serialize,
    EnumString,
    Display,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ServiceState {
    /// Healthy and serving.
    Open,
    /// Cleanly stopped.
    Closed,
    /// Crashed after having started.
    Failed,
    /// Never started successfully.
    InitFailed,
    /// Running, but its backing resource is down.
    DataSourceUnavailable,
}

/// Errors encountered while parsing a [`ServiceState`] from text.
pub type ServiceStateParseError = strum::ParseError;

/// How a stop request treats in-flight work.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum StopMode {
    /// Wait for in-flight work to drain before stopping.
    #[default]
    Graceful,
    /// Stop at once, abandoning in-flight work.
    Immediate,
}
