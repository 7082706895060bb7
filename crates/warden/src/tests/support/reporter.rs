//! Test double for [`ClusterReporter`] that records structured events for
//! assertions.

use std::sync::Mutex;

use warden_config::Config;

use crate::bootstrap::BootstrapError;
use crate::errors::{Action, ControlError, Target};
use crate::health::ClusterReporter;
use crate::snapshot::SystemState;

/// Structured events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    PassStarting,
    SnapshotBuilt { hosts: usize, diagnostics: usize },
    PassCompleted(usize),
    ActionIssued { target: Target, action: Action },
    ActionFailed(String),
    RestartStopFailed(String),
}

/// Records reporter events for assertions.
#[derive(Debug, Default)]
pub struct RecordingClusterReporter {
    events: Mutex<Vec<ClusterEvent>>,
}

impl RecordingClusterReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<ClusterEvent> {
        self.events
            .lock()
            .expect("cluster reporter mutex poisoned")
            .clone()
    }

    pub fn record(&self, event: ClusterEvent) {
        self.events
            .lock()
            .expect("cluster reporter mutex poisoned")
            .push(event);
    }
}

impl ClusterReporter for RecordingClusterReporter {
    fn bootstrap_starting(&self) {
        self.record(ClusterEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(ClusterEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(ClusterEvent::BootstrapFailed(error.to_string()));
    }

    fn pass_starting(&self) {
        self.record(ClusterEvent::PassStarting);
    }

    fn snapshot_built(&self, state: &SystemState) {
        self.record(ClusterEvent::SnapshotBuilt {
            hosts: state.hosts().len(),
            diagnostics: state.diagnostics().len(),
        });
    }

    fn pass_completed(&self, failures: usize) {
        self.record(ClusterEvent::PassCompleted(failures));
    }

    fn action_issued(&self, target: &Target, action: Action) {
        self.record(ClusterEvent::ActionIssued {
            target: target.clone(),
            action,
        });
    }

    fn action_failed(&self, error: &ControlError) {
        self.record(ClusterEvent::ActionFailed(error.to_string()));
    }

    fn restart_stop_failed(&self, error: &ControlError) {
        self.record(ClusterEvent::RestartStopFailed(error.to_string()));
    }
}
