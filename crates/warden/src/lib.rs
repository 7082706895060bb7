//! Runtime-state reconciliation and lifecycle control for a cluster of
//! hosts, processes, and services.
//!
//! The cluster's desired layout lives in a [`ConfigurationSource`] and its
//! actual state in a [`LiveRegistry`]. The [`Engine`] compares the two at
//! every level and issues corrective commands through [`HostControl`] and
//! per-process [`ProcessControl`] handles:
//!
//! - [`Engine::synchronize_server`] walks a fresh [`SystemState`] snapshot
//!   top-down (hosts, then processes, then services), collecting every
//!   failure instead of stopping at the first one.
//! - Targeted operations such as [`Engine::start_process`] or
//!   [`Engine::restart_service`] check their preconditions and fail fast.
//!
//! The engine owns no cluster state. Snapshots are immutable; the effect of
//! a command is only visible in the next snapshot.
//!
//! [`bootstrap_with`] loads configuration through [`warden_config`],
//! installs structured telemetry, and assembles the engine. Engine events are
//! surfaced through a [`ClusterReporter`].

mod admin;
mod bootstrap;
mod collaborators;
mod command;
mod engine;
mod errors;
mod facade;
mod health;
mod lifecycle;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
mod reconcile;
mod snapshot;
mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use collaborators::{
    Collaborators, ConfigurationSource, DeployedService, HostControl, LiveRegistry,
    ProcessBinding, ProcessControl, ProcessHandle, RemoteError, ServiceBinding, SourceError,
};
pub use engine::{Engine, EngineSettings};
pub use errors::{Action, AggregatedFailure, ControlError, SyncError, Target};
pub use facade::ControlFacade;
pub use health::{ClusterReporter, StructuredClusterReporter};
pub use lifecycle::{ServiceAction, ServiceLifecycle};
pub use snapshot::{
    Diagnostic, HostNode, ProcessLink, ProcessNode, ServiceNode, SnapshotBuilder, SystemState,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
