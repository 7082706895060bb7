//! External collaborators consumed by the reconciler.
//!
//! The reconciler owns no cluster state. It reads the desired state from a
//! [`ConfigurationSource`], the actual state from a [`LiveRegistry`], and
//! issues commands through a cluster-wide [`HostControl`] and per-process
//! [`ProcessControl`] handles that the registry hands out with each process
//! binding. Transport, retries, and timeouts belong to the implementations.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use warden_types::{
    ConnectionPoolStatistics, DefinitionId, HostName, ProcessKey, ProcessStatistics,
    QueueStatistics, ServiceId, ServiceState, StopMode,
};

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Error reported by a configuration source or registry read.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SourceError {
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

impl SourceError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error that wraps an underlying source.
    #[must_use]
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxedSource>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-readable message describing the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// Error reported by a control handle that was reached but failed the call.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RemoteError {
    message: String,
    #[source]
    source: Option<BoxedSource>,
}

impl RemoteError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error that wraps an underlying source.
    #[must_use]
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxedSource>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-readable message describing the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

/// A service declared by configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedService {
    /// Service name, unique within its process.
    pub service: String,
    /// Configuration element that declared the service.
    pub definition: DefinitionId,
}

impl DeployedService {
    /// Builds a declared service.
    #[must_use]
    pub fn new(service: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            definition: DefinitionId::new(definition),
        }
    }
}

/// Read-only view of the desired cluster layout.
pub trait ConfigurationSource: Send + Sync {
    /// Lists every host declared in configuration.
    fn deployed_hosts(&self) -> Result<Vec<HostName>, SourceError>;

    /// Returns `true` when the host is declared in configuration.
    fn is_host_deployed(&self, host: &HostName) -> Result<bool, SourceError>;

    /// Lists the process names declared for a host.
    fn deployed_processes(&self, host: &HostName) -> Result<Vec<String>, SourceError>;

    /// Lists the services declared for a process.
    fn deployed_services(&self, process: &ProcessKey) -> Result<Vec<DeployedService>, SourceError>;
}

/// Commands accepted by a running process.
pub trait ProcessControl: Send + Sync {
    /// Starts a registered service.
    fn start_service(&self, service: &ServiceId) -> Result<(), RemoteError>;

    /// Stops a registered service.
    fn stop_service(&self, service: &ServiceId, mode: StopMode) -> Result<(), RemoteError>;

    /// Asks a service to re-check its backing resources without restarting.
    fn check_service(&self, service: &ServiceId) -> Result<(), RemoteError>;

    /// Instantiates a declared service that has no live binding yet.
    fn start_deployed_service(&self, definition: &DefinitionId) -> Result<(), RemoteError>;

    /// Reads the message queue figures of the process.
    fn queue_statistics(&self) -> Result<Vec<QueueStatistics>, RemoteError>;

    /// Reads the connection pool figures of the process.
    fn connection_pool_statistics(&self) -> Result<Vec<ConnectionPoolStatistics>, RemoteError>;

    /// Reads runtime figures for the whole process.
    fn process_statistics(&self) -> Result<ProcessStatistics, RemoteError>;
}

/// Shared handle to a process's control surface.
pub type ProcessHandle = Arc<dyn ProcessControl>;

/// Cluster-wide commands that bring hosts and processes up or down.
pub trait HostControl: Send + Sync {
    /// Starts the host controller and every declared process on the host.
    fn start_all_servers_on_host(&self, host: &HostName) -> Result<(), RemoteError>;

    /// Stops every process on the host, then the host controller itself.
    fn kill_servers_on_host(&self, host: &HostName, mode: StopMode) -> Result<(), RemoteError>;

    /// Starts one process, bootstrapping its declared services.
    fn start_process(&self, process: &ProcessKey) -> Result<(), RemoteError>;

    /// Stops one process and every service it hosts.
    fn kill_process(&self, process: &ProcessKey, mode: StopMode) -> Result<(), RemoteError>;
}

/// Live binding of a process in the registry.
#[derive(Clone)]
pub struct ProcessBinding {
    /// Identity of the process.
    pub key: ProcessKey,
    /// Control handle, absent when the registry could not provide one.
    pub control: Option<ProcessHandle>,
}

impl ProcessBinding {
    /// Builds a binding with a resolvable control handle.
    #[must_use]
    pub fn new(key: ProcessKey, control: ProcessHandle) -> Self {
        Self {
            key,
            control: Some(control),
        }
    }

    /// Builds a binding whose control handle could not be obtained.
    #[must_use]
    pub fn without_control(key: ProcessKey) -> Self {
        Self { key, control: None }
    }
}

impl fmt::Debug for ProcessBinding {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ProcessBinding")
            .field("key", &self.key)
            .field("has_control", &self.control.is_some())
            .finish()
    }
}

/// Live binding of a service in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceBinding {
    /// Identity of the service.
    pub id: ServiceId,
    /// Configuration element the service was instantiated from.
    pub definition: DefinitionId,
    /// Current operational state.
    pub state: ServiceState,
}

/// Source of truth for what is currently running.
pub trait LiveRegistry: Send + Sync {
    /// Lists hosts with a live host-controller binding.
    fn registered_hosts(&self) -> Result<Vec<HostName>, SourceError>;

    /// Lists the live process bindings on a host.
    fn registered_processes(&self, host: &HostName) -> Result<Vec<ProcessBinding>, SourceError>;

    /// Lists the live service bindings inside a process.
    fn registered_services(&self, process: &ProcessKey)
    -> Result<Vec<ServiceBinding>, SourceError>;
}

/// The collaborators an [`crate::Engine`] is assembled from.
#[derive(Clone)]
pub struct Collaborators {
    /// Desired state.
    pub configuration: Arc<dyn ConfigurationSource>,
    /// Actual state.
    pub registry: Arc<dyn LiveRegistry>,
    /// Cluster-wide host and process commands.
    pub hosts: Arc<dyn HostControl>,
}

impl Collaborators {
    /// Bundles the three collaborators.
    #[must_use]
    pub fn new(
        configuration: Arc<dyn ConfigurationSource>,
        registry: Arc<dyn LiveRegistry>,
        hosts: Arc<dyn HostControl>,
    ) -> Self {
        Self {
            configuration,
            registry,
            hosts,
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
