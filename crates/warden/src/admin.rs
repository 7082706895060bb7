//! Targeted operations exposed to the administrative boundary.
//!
//! Each operation checks its preconditions against the live registry and the
//! configuration source, then issues at most one command per target. Unlike
//! [`Engine::synchronize_server`], single-target operations stop at the first
//! failure and return it.

use warden_types::{
    ConnectionPoolStatistics, HostName, ProcessKey, ProcessStatistics, QueueStatistics, ServiceId,
    ServiceState, StopMode,
};

use crate::collaborators::ProcessHandle;
use crate::command;
use crate::engine::Engine;
use crate::errors::{Action, AggregatedFailure, ControlError, SyncError, Target};
use crate::snapshot::SystemState;

impl Engine {
    /// Builds a fresh snapshot of the cluster.
    ///
    /// # Errors
    ///
    /// [`ControlError::Configuration`] when the configuration source cannot
    /// be read.
    pub fn system_state(&self) -> Result<SystemState, ControlError> {
        let _guard = self.serialise();
        self.build_snapshot().map_err(|error| self.refuse(error))
    }

    /// Starts a declared host that is not running.
    ///
    /// # Errors
    ///
    /// [`ControlError::AlreadyRunning`] when the host is registered,
    /// [`ControlError::NotFound`] when it is neither declared nor registered,
    /// or the failure of the start command.
    pub fn start_host(&self, host: &HostName) -> Result<(), ControlError> {
        let _guard = self.serialise();
        let target = Target::Host(host.clone());
        if self.checked(self.facade.is_host_registered(host))? {
            return Err(self.refuse(ControlError::AlreadyRunning { target }));
        }
        if !self.checked(self.facade.is_host_deployed(host))? {
            return Err(self.refuse(ControlError::NotFound { target }));
        }
        command::issue(self.reporter.as_ref(), target, Action::StartHost, || {
            self.facade.host_control().start_all_servers_on_host(host)
        })
    }

    /// Stops every process on a running host, then the host itself.
    ///
    /// # Errors
    ///
    /// [`ControlError::NotRegistered`] or [`ControlError::NotFound`] when the
    /// host is not running, or the failure of the stop command.
    pub fn stop_host(&self, host: &HostName, mode: StopMode) -> Result<(), ControlError> {
        let _guard = self.serialise();
        self.checked(self.facade.find_host(host))?;
        command::issue(
            self.reporter.as_ref(),
            Target::Host(host.clone()),
            Action::KillHost,
            || self.facade.host_control().kill_servers_on_host(host, mode),
        )
    }

    /// Starts a declared process on a running host.
    ///
    /// # Errors
    ///
    /// [`ControlError::NotFound`] naming the host when the host is not
    /// running, [`ControlError::AlreadyRunning`] when the process is
    /// registered, [`ControlError::NotDeployed`] when it is not declared, or
    /// the failure of the start command.
    pub fn start_process(&self, key: &ProcessKey) -> Result<(), ControlError> {
        let _guard = self.serialise();
        if !self.checked(self.facade.is_host_registered(&key.host))? {
            return Err(self.refuse(ControlError::NotFound {
                target: Target::Host(key.host.clone()),
            }));
        }
        let target = Target::Process(key.clone());
        let running = self
            .checked(self.facade.registered_processes(&key.host))?
            .iter()
            .any(|binding| binding.key == *key);
        if running {
            return Err(self.refuse(ControlError::AlreadyRunning { target }));
        }
        if !self.checked(self.facade.is_process_deployed(key))? {
            return Err(self.refuse(ControlError::NotDeployed { target }));
        }
        command::issue(self.reporter.as_ref(), target, Action::StartProcess, || {
            self.facade.host_control().start_process(key)
        })
    }

    /// Stops a running process and every service it hosts.
    ///
    /// # Errors
    ///
    /// [`ControlError::NotRegistered`] or [`ControlError::NotFound`] when the
    /// process is not running, or the failure of the stop command.
    pub fn stop_process(&self, key: &ProcessKey, mode: StopMode) -> Result<(), ControlError> {
        let _guard = self.serialise();
        self.checked(self.facade.find_process(key))?;
        command::issue(
            self.reporter.as_ref(),
            Target::Process(key.clone()),
            Action::KillProcess,
            || self.facade.host_control().kill_process(key, mode),
        )
    }

    /// Starts a service.
    ///
    /// A registered service that is not open is started in place. A declared
    /// service without a live binding is instantiated from its definition
    /// through its process.
    ///
    /// # Errors
    ///
    /// [`ControlError::AlreadyRunning`] when the service is open,
    /// [`ControlError::NotFound`] when it is neither declared nor registered,
    /// lookup errors for its process, or the failure of the start command.
    pub fn start_service(&self, id: &ServiceId) -> Result<(), ControlError> {
        let _guard = self.serialise();
        match self.facade.find_service_binding(id) {
            Ok(binding) => {
                if binding.state == ServiceState::Open {
                    return Err(self.refuse(ControlError::AlreadyRunning {
                        target: Target::Service(id.clone()),
                    }));
                }
                let control = self.control_for(id)?;
                self.lifecycle().start(control.as_ref(), id)
            }
            Err(ControlError::NotRegistered { .. }) => {
                let Some(declared) = self.checked(self.facade.deployed_service(id))? else {
                    return Err(self.refuse(ControlError::NotFound {
                        target: Target::Service(id.clone()),
                    }));
                };
                let control = self.control_for(id)?;
                self.lifecycle()
                    .start_deployed(control.as_ref(), id, &declared.definition)
            }
            Err(other) => Err(self.refuse(other)),
        }
    }

    /// Asks a running service to re-check its backing resources.
    ///
    /// # Errors
    ///
    /// Lookup errors for the service or its process, or the failure of the
    /// check command.
    pub fn check_service(&self, id: &ServiceId) -> Result<(), ControlError> {
        let _guard = self.serialise();
        let control = self.registered_service_control(id)?;
        self.lifecycle().check(control.as_ref(), id)
    }

    /// Stops then starts a running service. A failed stop is reported and
    /// the start is still attempted.
    ///
    /// # Errors
    ///
    /// Lookup errors for the service or its process, or the failure of the
    /// start half.
    pub fn restart_service(&self, id: &ServiceId) -> Result<(), ControlError> {
        let _guard = self.serialise();
        let control = self.registered_service_control(id)?;
        self.lifecycle().restart(control.as_ref(), id)
    }

    /// Stops a running service.
    ///
    /// # Errors
    ///
    /// Lookup errors for the service or its process, or the failure of the
    /// stop command.
    pub fn stop_service(&self, id: &ServiceId, mode: StopMode) -> Result<(), ControlError> {
        let _guard = self.serialise();
        let control = self.registered_service_control(id)?;
        self.lifecycle().stop(control.as_ref(), id, mode)
    }

    /// Stops every registered host immediately.
    ///
    /// # Errors
    ///
    /// [`SyncError::Snapshot`] when the registry cannot be listed, in which
    /// case nothing is stopped. [`SyncError::Aggregated`] with every host
    /// that failed to stop.
    pub fn shutdown_server(&self) -> Result<(), SyncError> {
        let _guard = self.serialise();
        let registered = self
            .checked(self.facade.registered_hosts())
            .map_err(SyncError::Snapshot)?;
        let failures = self.kill_hosts(&registered);
        AggregatedFailure::from_failures(failures).map_or(Ok(()), |aggregate| Err(aggregate.into()))
    }

    /// Stops every registered host immediately, then starts every declared
    /// host. Starts are attempted even when some stops failed.
    ///
    /// # Errors
    ///
    /// [`SyncError::Snapshot`] when either source cannot be listed, in which
    /// case no command is issued. [`SyncError::Aggregated`] with every stop
    /// and start that failed.
    pub fn bounce_server(&self) -> Result<(), SyncError> {
        let _guard = self.serialise();
        let registered = self
            .checked(self.facade.registered_hosts())
            .map_err(SyncError::Snapshot)?;
        let deployed = self
            .checked(self.facade.deployed_hosts())
            .map_err(SyncError::Snapshot)?;

        let mut failures = self.kill_hosts(&registered);
        for host in &deployed {
            let outcome = command::issue(
                self.reporter.as_ref(),
                Target::Host(host.clone()),
                Action::StartHost,
                || self.facade.host_control().start_all_servers_on_host(host),
            );
            failures.extend(outcome.err());
        }
        AggregatedFailure::from_failures(failures).map_or(Ok(()), |aggregate| Err(aggregate.into()))
    }

    /// Reads queue figures from a process. Empty when the process has no
    /// live binding or control handle.
    ///
    /// # Errors
    ///
    /// Source read failures, or the failure of the remote read.
    pub fn queue_statistics(&self, key: &ProcessKey) -> Result<Vec<QueueStatistics>, ControlError> {
        let _guard = self.serialise();
        let Some(control) = self.optional_control(key)? else {
            return Ok(Vec::new());
        };
        command::issue(
            self.reporter.as_ref(),
            Target::Process(key.clone()),
            Action::ReadStatistics,
            || control.queue_statistics(),
        )
    }

    /// Reads connection pool figures from a process. Empty when the process
    /// has no live binding or control handle.
    ///
    /// # Errors
    ///
    /// Source read failures, or the failure of the remote read.
    pub fn connection_pool_statistics(
        &self,
        key: &ProcessKey,
    ) -> Result<Vec<ConnectionPoolStatistics>, ControlError> {
        let _guard = self.serialise();
        let Some(control) = self.optional_control(key)? else {
            return Ok(Vec::new());
        };
        command::issue(
            self.reporter.as_ref(),
            Target::Process(key.clone()),
            Action::ReadStatistics,
            || control.connection_pool_statistics(),
        )
    }

    /// Reads runtime figures from every live process on a host. Empty when
    /// the host is not running; processes without a control handle are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Registry read failures, or the first failing remote read.
    pub fn process_statistics(&self, host: &HostName) -> Result<Vec<ProcessStatistics>, ControlError> {
        let _guard = self.serialise();
        if !self.checked(self.facade.is_host_registered(host))? {
            return Ok(Vec::new());
        }
        let bindings = self.checked(self.facade.registered_processes(host))?;
        let mut statistics = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let Some(control) = binding.control else {
                continue;
            };
            statistics.push(command::issue(
                self.reporter.as_ref(),
                Target::Process(binding.key),
                Action::ReadStatistics,
                || control.process_statistics(),
            )?);
        }
        Ok(statistics)
    }

    fn checked<T>(&self, result: Result<T, ControlError>) -> Result<T, ControlError> {
        result.map_err(|error| self.refuse(error))
    }

    fn control_for(&self, id: &ServiceId) -> Result<ProcessHandle, ControlError> {
        self.checked(self.facade.process_control(&id.process))
    }

    fn registered_service_control(&self, id: &ServiceId) -> Result<ProcessHandle, ControlError> {
        self.checked(self.facade.find_service_binding(id))?;
        self.control_for(id)
    }

    fn optional_control(&self, key: &ProcessKey) -> Result<Option<ProcessHandle>, ControlError> {
        match self.facade.process_control(key) {
            Ok(control) => Ok(Some(control)),
            Err(
                ControlError::NotRegistered { .. }
                | ControlError::NotFound { .. }
                | ControlError::ControlHandleUnavailable { .. },
            ) => Ok(None),
            Err(other) => Err(self.refuse(other)),
        }
    }

    fn kill_hosts(&self, hosts: &[HostName]) -> Vec<ControlError> {
        hosts
            .iter()
            .filter_map(|host| {
                command::issue(
                    self.reporter.as_ref(),
                    Target::Host(host.clone()),
                    Action::KillHost,
                    || {
                        self.facade
                            .host_control()
                            .kill_servers_on_host(host, StopMode::Immediate)
                    },
                )
                .err()
            })
            .collect()
    }
}
