//! Layered configuration for the warden reconciler.
//!
//! Values resolve from built-in defaults, then a `.warden.toml` configuration
//! file (or the file named by `--config-path`), then `WARDEN_*` environment
//! variables, and finally command-line flags. Later layers win.

mod defaults;
mod logging;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use warden_types::StopMode;

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_RECONCILE_WORKERS, default_log_filter, default_log_filter_string,
    default_log_format, default_reconcile_workers, default_restart_stop_mode,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved reconciler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "WARDEN")]
pub struct Config {
    /// `tracing` filter expression, e.g. `info,warden::reconcile=debug`.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for log events.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
    /// Worker threads sharing the per-host reconciliation walk.
    #[ortho_config(default = default_reconcile_workers())]
    pub reconcile_workers: usize,
    /// Stop mode used before restarting a service.
    #[ortho_config(default = default_restart_stop_mode())]
    pub restart_stop_mode: StopMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            reconcile_workers: default_reconcile_workers(),
            restart_stop_mode: default_restart_stop_mode(),
        }
    }
}

impl Config {
    /// Returns the log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Returns the log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the number of reconciliation workers, never less than one.
    #[must_use]
    pub fn reconcile_workers(&self) -> usize {
        self.reconcile_workers.max(1)
    }

    /// Returns the stop mode applied before a service restart.
    #[must_use]
    pub const fn restart_stop_mode(&self) -> StopMode {
        self.restart_stop_mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn default_config_walks_sequentially() {
        let config = Config::default();
        assert_eq!(config.reconcile_workers(), 1);
        assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
        assert_eq!(config.log_format(), LogFormat::Json);
        assert_eq!(config.restart_stop_mode(), StopMode::Graceful);
    }

    #[rstest]
    fn zero_workers_are_clamped_to_one() {
        let config = Config {
            reconcile_workers: 0,
            ..Config::default()
        };
        assert_eq!(config.reconcile_workers(), 1);
    }
}
