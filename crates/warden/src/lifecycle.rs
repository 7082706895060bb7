//! Per-service decision table and lifecycle primitives.

use warden_types::{DefinitionId, Presence, ServiceId, ServiceState, StopMode};

use crate::collaborators::ProcessControl;
use crate::command;
use crate::errors::{Action, ControlError, Target};
use crate::health::ClusterReporter;
use crate::snapshot::ServiceNode;

/// Corrective action for a single service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceAction {
    /// Registered but not declared: stop it immediately.
    Kill,
    /// Declared but not registered: instantiate it from its definition.
    StartDeployed,
    /// Declared and registered but stopped or crashed: start it.
    Start,
    /// Declared and registered with its data source down: re-check it.
    Check,
    /// Declared, registered, and open.
    NoAction,
}

impl ServiceAction {
    /// Chooses the action for a service from its presence and live state.
    #[must_use]
    pub const fn decide(presence: &Presence<ServiceState>) -> Self {
        match presence {
            Presence::Registered(_) => Self::Kill,
            Presence::Deployed => Self::StartDeployed,
            Presence::Both(ServiceState::Open) => Self::NoAction,
            Presence::Both(ServiceState::DataSourceUnavailable) => Self::Check,
            Presence::Both(ServiceState::Closed | ServiceState::Failed | ServiceState::InitFailed) => {
                Self::Start
            }
        }
    }
}

/// Issues lifecycle commands for services through a process control handle.
///
/// Every primitive is exactly one remote call and is never retried.
#[derive(Clone, Copy)]
pub struct ServiceLifecycle<'a> {
    reporter: &'a dyn ClusterReporter,
    restart_stop_mode: StopMode,
}

impl<'a> ServiceLifecycle<'a> {
    /// Builds a controller reporting through `reporter`. Restarts stop the
    /// service with `restart_stop_mode`.
    #[must_use]
    pub const fn new(reporter: &'a dyn ClusterReporter, restart_stop_mode: StopMode) -> Self {
        Self {
            reporter,
            restart_stop_mode,
        }
    }

    /// Decides and executes the corrective action for `service`, returning
    /// the action taken.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::RemoteAction`] when the command fails.
    pub fn normalise(
        &self,
        control: &dyn ProcessControl,
        service: &ServiceNode,
    ) -> Result<ServiceAction, ControlError> {
        let action = ServiceAction::decide(service.presence());
        let id = service.id();
        match action {
            ServiceAction::Kill => self.stop(control, id, StopMode::Immediate)?,
            ServiceAction::StartDeployed => self.start_deployed(control, id, service.definition())?,
            ServiceAction::Start => self.start(control, id)?,
            ServiceAction::Check => self.check(control, id)?,
            ServiceAction::NoAction => {}
        }
        Ok(action)
    }

    /// Starts a registered service.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::RemoteAction`] when the command fails.
    pub fn start(&self, control: &dyn ProcessControl, id: &ServiceId) -> Result<(), ControlError> {
        command::issue(self.reporter, target(id), Action::StartService, || {
            control.start_service(id)
        })
    }

    /// Instantiates a declared service from its definition.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::RemoteAction`] when the command fails.
    pub fn start_deployed(
        &self,
        control: &dyn ProcessControl,
        id: &ServiceId,
        definition: &DefinitionId,
    ) -> Result<(), ControlError> {
        command::issue(self.reporter, target(id), Action::StartDeployedService, || {
            control.start_deployed_service(definition)
        })
    }

    /// Stops a service.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::RemoteAction`] when the command fails.
    pub fn stop(
        &self,
        control: &dyn ProcessControl,
        id: &ServiceId,
        mode: StopMode,
    ) -> Result<(), ControlError> {
        command::issue(self.reporter, target(id), Action::StopService, || {
            control.stop_service(id, mode)
        })
    }

    /// Asks a service to re-check its backing resources.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::RemoteAction`] when the command fails.
    pub fn check(&self, control: &dyn ProcessControl, id: &ServiceId) -> Result<(), ControlError> {
        command::issue(self.reporter, target(id), Action::CheckService, || {
            control.check_service(id)
        })
    }

    /// Stops then starts a service.
    ///
    /// A failed stop is reported and the start is attempted regardless, so
    /// the service is never left half-stopped by this call.
    ///
    /// # Errors
    ///
    /// Returns the start failure only.
    pub fn restart(&self, control: &dyn ProcessControl, id: &ServiceId) -> Result<(), ControlError> {
        if let Err(error) = self.stop(control, id, self.restart_stop_mode) {
            self.reporter.restart_stop_failed(&error);
        }
        self.start(control, id)
    }
}

fn target(id: &ServiceId) -> Target {
    Target::Service(id.clone())
}
