//! Error taxonomy for lifecycle commands and reconciliation.
//!
//! Single-target commands fail with one [`ControlError`]. A reconciliation
//! pass keeps walking after per-node failures and reports all of them at the
//! end as an [`AggregatedFailure`], wrapped in [`SyncError`].

use std::fmt;

use thiserror::Error;

use warden_types::{HostName, ProcessKey, ServiceId};

use crate::collaborators::{RemoteError, SourceError};

/// Cluster node an error or diagnostic refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// The cluster as a whole.
    Cluster,
    /// A host.
    Host(HostName),
    /// A process.
    Process(ProcessKey),
    /// A service.
    Service(ServiceId),
}

impl fmt::Display for Target {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cluster => formatter.write_str("cluster"),
            Self::Host(host) => write!(formatter, "host '{host}'"),
            Self::Process(process) => write!(formatter, "process '{process}'"),
            Self::Service(service) => write!(formatter, "service '{service}'"),
        }
    }
}

impl From<HostName> for Target {
    fn from(host: HostName) -> Self {
        Self::Host(host)
    }
}

impl From<ProcessKey> for Target {
    fn from(process: ProcessKey) -> Self {
        Self::Process(process)
    }
}

impl From<ServiceId> for Target {
    fn from(service: ServiceId) -> Self {
        Self::Service(service)
    }
}

/// Remote command issued through a control handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Bring a host and its declared processes up.
    StartHost,
    /// Stop every process on a host.
    KillHost,
    /// Start a process.
    StartProcess,
    /// Stop a process.
    KillProcess,
    /// Start a registered service.
    StartService,
    /// Instantiate a declared service.
    StartDeployedService,
    /// Stop a service.
    StopService,
    /// Re-check a service's backing resources.
    CheckService,
    /// Read statistics from a process.
    ReadStatistics,
}

impl fmt::Display for Action {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::StartHost => "start-host",
            Self::KillHost => "kill-host",
            Self::StartProcess => "start-process",
            Self::KillProcess => "kill-process",
            Self::StartService => "start-service",
            Self::StartDeployedService => "start-deployed-service",
            Self::StopService => "stop-service",
            Self::CheckService => "check-service",
            Self::ReadStatistics => "read-statistics",
        };
        formatter.write_str(label)
    }
}

/// Errors surfaced by lookups and lifecycle commands.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The node is neither declared nor running.
    #[error("{target} is not known to configuration or registry")]
    NotFound {
        /// Node that was looked up.
        target: Target,
    },
    /// The node is declared but has no live binding.
    #[error("{target} is deployed but not registered")]
    NotRegistered {
        /// Node that was looked up.
        target: Target,
    },
    /// The node is not declared in configuration.
    #[error("{target} is not deployed")]
    NotDeployed {
        /// Node that was looked up.
        target: Target,
    },
    /// A start was requested for a node that is already running.
    #[error("{target} is already running")]
    AlreadyRunning {
        /// Node that was to be started.
        target: Target,
    },
    /// The node is registered but cannot be commanded.
    #[error("no usable control handle for {target}: {reason}")]
    ControlHandleUnavailable {
        /// Node lacking a handle.
        target: Target,
        /// Why the handle could not be used.
        reason: String,
    },
    /// The control handle was reached but the command failed.
    #[error("{action} failed for {target}: {source}")]
    RemoteAction {
        /// Node the command addressed.
        target: Target,
        /// Command that failed.
        action: Action,
        /// Failure reported by the handle.
        #[source]
        source: RemoteError,
    },
    /// The configuration source could not be read.
    #[error("configuration source unavailable: {source}")]
    Configuration {
        /// Failure reported by the source.
        #[source]
        source: SourceError,
    },
    /// The live registry could not be read.
    #[error("live registry unavailable: {source}")]
    Registry {
        /// Failure reported by the registry.
        #[source]
        source: SourceError,
    },
}

impl ControlError {
    /// Returns the node the error refers to, when it names one.
    #[must_use]
    pub const fn target(&self) -> Option<&Target> {
        match self {
            Self::NotFound { target }
            | Self::NotRegistered { target }
            | Self::NotDeployed { target }
            | Self::AlreadyRunning { target }
            | Self::ControlHandleUnavailable { target, .. }
            | Self::RemoteAction { target, .. } => Some(target),
            Self::Configuration { .. } | Self::Registry { .. } => None,
        }
    }

    /// Returns `true` when the error reports a violated precondition rather
    /// than a communication or remote failure.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::NotRegistered { .. }
                | Self::NotDeployed { .. }
                | Self::AlreadyRunning { .. }
        )
    }
}

/// Every failure collected during one reconciliation pass or cluster-wide
/// command. Never empty.
#[derive(Debug, Error)]
pub struct AggregatedFailure {
    failures: Vec<ControlError>,
}

impl AggregatedFailure {
    /// Wraps collected failures, returning `None` when there are none.
    #[must_use]
    pub fn from_failures(failures: Vec<ControlError>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self { failures })
        }
    }

    /// Failures in the order they occurred.
    #[must_use]
    pub fn failures(&self) -> &[ControlError] {
        self.failures.as_slice()
    }

    /// Number of failures collected.
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Always `false`; present for API symmetry with [`Self::len`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for AggregatedFailure {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} operation(s) failed", self.failures.len())?;
        for failure in &self.failures {
            write!(formatter, "; {failure}")?;
        }
        Ok(())
    }
}

/// Result of a failed reconciliation pass.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The snapshot could not be built, so nothing was reconciled.
    #[error("failed to build the system snapshot: {0}")]
    Snapshot(#[source] ControlError),
    /// The walk completed but some corrective actions failed.
    #[error(transparent)]
    Aggregated(#[from] AggregatedFailure),
}

impl SyncError {
    /// Returns the collected failures, or the snapshot failure as a single
    /// element.
    #[must_use]
    pub fn failures(&self) -> &[ControlError] {
        match self {
            Self::Snapshot(error) => std::slice::from_ref(error),
            Self::Aggregated(aggregate) => aggregate.failures(),
        }
    }
}
