use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Output format for the reconciler's log and health events.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One flattened JSON object per event. Health events keep their `event`
    /// field at the top level so pass outcomes can be filtered downstream.
    #[default]
    Json,
    /// Single-line output for an operator watching a pass at a terminal.
    Compact,
}

impl LogFormat {
    /// Whether events in this format may carry ANSI colour codes when written
    /// to `terminal`.
    ///
    /// JSON output is never coloured, so escape codes cannot corrupt the
    /// records even when a pass is run interactively.
    #[must_use]
    pub const fn uses_ansi(self, terminal: bool) -> bool {
        match self {
            Self::Json => false,
            Self::Compact => terminal,
        }
    }
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;
