//! Lookup and control facade over the configuration source and registry.
//!
//! Every lookup consults the collaborators at call time; nothing is cached.
//! Lookups distinguish a node that is declared but not running
//! ([`ControlError::NotRegistered`]) from a node that is unknown to both
//! sources ([`ControlError::NotFound`]), because the corrective action
//! differs.

use std::fmt;
use std::sync::Arc;

use warden_types::{HostName, ProcessKey, ServiceId};

use crate::collaborators::{
    Collaborators, ConfigurationSource, DeployedService, HostControl, LiveRegistry,
    ProcessBinding, ProcessHandle, ServiceBinding, SourceError,
};
use crate::errors::{ControlError, Target};

/// Resolves cluster nodes to live bindings and control handles.
#[derive(Clone)]
pub struct ControlFacade {
    configuration: Arc<dyn ConfigurationSource>,
    registry: Arc<dyn LiveRegistry>,
    hosts: Arc<dyn HostControl>,
}

impl fmt::Debug for ControlFacade {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("ControlFacade").finish_non_exhaustive()
    }
}

fn configuration_error(source: SourceError) -> ControlError {
    ControlError::Configuration { source }
}

fn registry_error(source: SourceError) -> ControlError {
    ControlError::Registry { source }
}

impl ControlFacade {
    /// Builds a facade over the supplied collaborators.
    #[must_use]
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            configuration: collaborators.configuration,
            registry: collaborators.registry,
            hosts: collaborators.hosts,
        }
    }

    /// Cluster-wide host and process control handle.
    #[must_use]
    pub fn host_control(&self) -> &dyn HostControl {
        self.hosts.as_ref()
    }

    /// Lists every declared host.
    pub fn deployed_hosts(&self) -> Result<Vec<HostName>, ControlError> {
        self.configuration
            .deployed_hosts()
            .map_err(configuration_error)
    }

    /// Returns `true` when the host is declared.
    pub fn is_host_deployed(&self, host: &HostName) -> Result<bool, ControlError> {
        self.configuration
            .is_host_deployed(host)
            .map_err(configuration_error)
    }

    /// Lists the processes declared for a host.
    pub fn deployed_processes(&self, host: &HostName) -> Result<Vec<String>, ControlError> {
        self.configuration
            .deployed_processes(host)
            .map_err(configuration_error)
    }

    /// Returns `true` when the process is declared on a declared host.
    pub fn is_process_deployed(&self, key: &ProcessKey) -> Result<bool, ControlError> {
        if !self.is_host_deployed(&key.host)? {
            return Ok(false);
        }
        Ok(self
            .deployed_processes(&key.host)?
            .iter()
            .any(|process| *process == key.process))
    }

    /// Lists the services declared for a process.
    pub fn deployed_services(&self, key: &ProcessKey) -> Result<Vec<DeployedService>, ControlError> {
        self.configuration
            .deployed_services(key)
            .map_err(configuration_error)
    }

    /// Returns the declaration of a service, if any.
    pub fn deployed_service(&self, id: &ServiceId) -> Result<Option<DeployedService>, ControlError> {
        if !self.is_process_deployed(&id.process)? {
            return Ok(None);
        }
        Ok(self
            .deployed_services(&id.process)?
            .into_iter()
            .find(|declared| declared.service == id.service))
    }

    /// Lists hosts with a live binding.
    pub fn registered_hosts(&self) -> Result<Vec<HostName>, ControlError> {
        self.registry.registered_hosts().map_err(registry_error)
    }

    /// Lists the live process bindings on a host.
    pub fn registered_processes(&self, host: &HostName) -> Result<Vec<ProcessBinding>, ControlError> {
        self.registry
            .registered_processes(host)
            .map_err(registry_error)
    }

    /// Lists the live service bindings of a process.
    pub fn registered_services(&self, key: &ProcessKey) -> Result<Vec<ServiceBinding>, ControlError> {
        self.registry
            .registered_services(key)
            .map_err(registry_error)
    }

    /// Returns `true` when the host has a live binding.
    pub fn is_host_registered(&self, host: &HostName) -> Result<bool, ControlError> {
        Ok(self.registered_hosts()?.contains(host))
    }

    /// Resolves a registered host.
    ///
    /// # Errors
    ///
    /// [`ControlError::NotRegistered`] when the host is declared but not live,
    /// [`ControlError::NotFound`] when it is unknown to both sources.
    pub fn find_host(&self, host: &HostName) -> Result<HostName, ControlError> {
        if self.is_host_registered(host)? {
            return Ok(host.clone());
        }
        let target = Target::Host(host.clone());
        if self.is_host_deployed(host)? {
            Err(ControlError::NotRegistered { target })
        } else {
            Err(ControlError::NotFound { target })
        }
    }

    /// Resolves the live binding of a process.
    ///
    /// # Errors
    ///
    /// [`ControlError::NotRegistered`] when the process is declared but not
    /// live, [`ControlError::NotFound`] when it is unknown to both sources.
    pub fn find_process(&self, key: &ProcessKey) -> Result<ProcessBinding, ControlError> {
        let binding = if self.is_host_registered(&key.host)? {
            self.registered_processes(&key.host)?
                .into_iter()
                .find(|binding| binding.key == *key)
        } else {
            None
        };
        if let Some(binding) = binding {
            return Ok(binding);
        }
        let target = Target::Process(key.clone());
        if self.is_process_deployed(key)? {
            Err(ControlError::NotRegistered { target })
        } else {
            Err(ControlError::NotFound { target })
        }
    }

    /// Resolves the control handle of a registered process.
    ///
    /// # Errors
    ///
    /// Lookup errors from [`Self::find_process`], or
    /// [`ControlError::ControlHandleUnavailable`] when the process is
    /// registered without a usable handle.
    pub fn process_control(&self, key: &ProcessKey) -> Result<ProcessHandle, ControlError> {
        self.find_process(key)?
            .control
            .ok_or_else(|| ControlError::ControlHandleUnavailable {
                target: Target::Process(key.clone()),
                reason: "registry binding carries no control handle".to_owned(),
            })
    }

    /// Resolves the live binding of a service.
    ///
    /// # Errors
    ///
    /// [`ControlError::NotRegistered`] when the service is declared but not
    /// live, [`ControlError::NotFound`] when it is unknown to both sources.
    pub fn find_service_binding(&self, id: &ServiceId) -> Result<ServiceBinding, ControlError> {
        let binding = match self.find_process(&id.process) {
            Ok(_) => self
                .registered_services(&id.process)?
                .into_iter()
                .find(|binding| binding.id == *id),
            Err(ControlError::NotRegistered { .. } | ControlError::NotFound { .. }) => None,
            Err(other) => return Err(other),
        };
        if let Some(binding) = binding {
            return Ok(binding);
        }
        let target = Target::Service(id.clone());
        if self.deployed_service(id)?.is_some() {
            Err(ControlError::NotRegistered { target })
        } else {
            Err(ControlError::NotFound { target })
        }
    }
}
