//! Structured reporting of bootstrap, reconciliation, and command events.

use std::sync::Arc;

use warden_config::Config;

use crate::bootstrap::BootstrapError;
use crate::errors::{Action, ControlError, Target};
use crate::snapshot::SystemState;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface engine events to telemetry sinks.
pub trait ClusterReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked when a reconciliation pass begins.
    fn pass_starting(&self);

    /// Invoked once the snapshot for a pass or query has been built.
    fn snapshot_built(&self, state: &SystemState);

    /// Invoked after the whole tree has been walked.
    fn pass_completed(&self, failures: usize);

    /// Invoked before a remote command is sent.
    fn action_issued(&self, target: &Target, action: Action);

    /// Invoked when a command or handle resolution fails.
    fn action_failed(&self, error: &ControlError);

    /// Invoked when the stop half of a restart fails and the start half
    /// proceeds regardless.
    fn restart_stop_failed(&self, error: &ControlError);
}

impl<T> ClusterReporter for Arc<T>
where
    T: ClusterReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn pass_starting(&self) {
        (**self).pass_starting();
    }

    fn snapshot_built(&self, state: &SystemState) {
        (**self).snapshot_built(state);
    }

    fn pass_completed(&self, failures: usize) {
        (**self).pass_completed(failures);
    }

    fn action_issued(&self, target: &Target, action: Action) {
        (**self).action_issued(target, action);
    }

    fn action_failed(&self, error: &ControlError) {
        (**self).action_failed(error);
    }

    fn restart_stop_failed(&self, error: &ControlError) {
        (**self).restart_stop_failed(error);
    }
}

/// Default reporter that records events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredClusterReporter;

impl StructuredClusterReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ClusterReporter for StructuredClusterReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting reconciler bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            reconcile_workers = config.reconcile_workers(),
            "reconciler bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "reconciler bootstrap failed"
        );
    }

    fn pass_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "pass_starting",
            "starting reconciliation pass"
        );
    }

    fn snapshot_built(&self, state: &SystemState) {
        tracing::debug!(
            target: HEALTH_TARGET,
            event = "snapshot_built",
            hosts = state.hosts().len(),
            diagnostics = state.diagnostics().len(),
            "system snapshot built"
        );
        for diagnostic in state.diagnostics() {
            tracing::warn!(
                target: HEALTH_TARGET,
                event = "snapshot_diagnostic",
                node = %diagnostic.target,
                message = %diagnostic.message,
                "registry state could not be determined"
            );
        }
    }

    fn pass_completed(&self, failures: usize) {
        if failures == 0 {
            tracing::info!(
                target: HEALTH_TARGET,
                event = "pass_completed",
                failures,
                "reconciliation pass completed"
            );
        } else {
            tracing::warn!(
                target: HEALTH_TARGET,
                event = "pass_completed",
                failures,
                "reconciliation pass completed with failures"
            );
        }
    }

    fn action_issued(&self, target: &Target, action: Action) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "action_issued",
            node = %target,
            action = %action,
            "issuing corrective action"
        );
    }

    fn action_failed(&self, error: &ControlError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "action_failed",
            error = %error,
            "action failed"
        );
    }

    fn restart_stop_failed(&self, error: &ControlError) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "restart_stop_failed",
            error = %error,
            "stop half of restart failed; starting anyway"
        );
    }
}
