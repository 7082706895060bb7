use warden_types::StopMode;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default number of workers walking hosts during reconciliation.
pub const DEFAULT_RECONCILE_WORKERS: usize = 1;

/// Default log filter expression.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Default reconciliation worker count; one worker walks the tree sequentially.
pub fn default_reconcile_workers() -> usize {
    DEFAULT_RECONCILE_WORKERS
}

/// Stop mode used for the stop half of a service restart.
pub fn default_restart_stop_mode() -> StopMode {
    StopMode::Graceful
}
