//! The engine: one serialised entry point for reconciliation and commands.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use warden_config::Config;
use warden_types::StopMode;

use crate::collaborators::Collaborators;
use crate::command;
use crate::errors::{AggregatedFailure, ControlError, SyncError};
use crate::facade::ControlFacade;
use crate::health::ClusterReporter;
use crate::lifecycle::ServiceLifecycle;
use crate::reconcile::Reconciler;
use crate::snapshot::{SnapshotBuilder, SystemState};

/// Tunables the engine reads from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Worker threads sharing the per-host process pass. `1` walks the tree
    /// sequentially.
    pub reconcile_workers: usize,
    /// How the stop half of a restart stops the service.
    pub restart_stop_mode: StopMode,
}

impl EngineSettings {
    /// Extracts the engine settings from a loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            reconcile_workers: config.reconcile_workers(),
            restart_stop_mode: config.restart_stop_mode(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Reconciles the cluster and executes targeted lifecycle commands.
///
/// Every public operation takes the same lock, so at most one pass or
/// command runs at a time. The engine owns no cluster state; each operation
/// reads the collaborators afresh.
pub struct Engine {
    pub(crate) facade: ControlFacade,
    pub(crate) reporter: Arc<dyn ClusterReporter>,
    settings: EngineSettings,
    serial: Mutex<()>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Engine")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Assembles an engine over the supplied collaborators.
    #[must_use]
    pub fn new(
        collaborators: Collaborators,
        reporter: Arc<dyn ClusterReporter>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            facade: ControlFacade::new(collaborators),
            reporter,
            settings,
            serial: Mutex::new(()),
        }
    }

    /// Settings the engine was built with.
    #[must_use]
    pub const fn settings(&self) -> EngineSettings {
        self.settings
    }

    /// Lookup facade used by every operation.
    #[must_use]
    pub const fn facade(&self) -> &ControlFacade {
        &self.facade
    }

    /// Brings the cluster towards its declared layout in one pass.
    ///
    /// Hosts are handled first, then processes on running hosts, then
    /// services inside running processes. A failing node does not stop the
    /// pass.
    ///
    /// # Errors
    ///
    /// [`SyncError::Snapshot`] when the configuration source cannot be read,
    /// in which case no command is issued. [`SyncError::Aggregated`] with
    /// every failure, in walk order, when any corrective action failed.
    pub fn synchronize_server(&self) -> Result<(), SyncError> {
        let _guard = self.serialise();
        self.reporter.pass_starting();

        let state = match self.build_snapshot() {
            Ok(state) => state,
            Err(failure) => {
                let reported = command::refuse(self.reporter.as_ref(), failure);
                self.reporter.pass_completed(1);
                return Err(SyncError::Snapshot(reported));
            }
        };

        let failures = Reconciler::new(
            &self.facade,
            self.reporter.as_ref(),
            self.settings.restart_stop_mode,
            self.settings.reconcile_workers,
        )
        .run(&state);
        self.reporter.pass_completed(failures.len());

        AggregatedFailure::from_failures(failures).map_or(Ok(()), |aggregate| Err(aggregate.into()))
    }

    pub(crate) fn serialise(&self) -> MutexGuard<'_, ()> {
        self.serial.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn build_snapshot(&self) -> Result<SystemState, ControlError> {
        let state = SnapshotBuilder::new(&self.facade).build()?;
        self.reporter.snapshot_built(&state);
        Ok(state)
    }

    pub(crate) fn lifecycle(&self) -> ServiceLifecycle<'_> {
        ServiceLifecycle::new(self.reporter.as_ref(), self.settings.restart_stop_mode)
    }

    /// Reports a failure raised before any command was sent.
    pub(crate) fn refuse(&self, error: ControlError) -> ControlError {
        command::refuse(self.reporter.as_ref(), error)
    }
}
