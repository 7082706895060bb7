//! In-memory cluster implementing every collaborator trait.
//!
//! [`MemoryCluster`] keeps a declared layout and a live registry side by side.
//! Commands are recorded in order and applied to the live side the way a
//! real cluster would apply them: starting a host registers its declared
//! processes and services, killing a process removes its binding, and so on.
//! Failures can be injected per command target and per registry read.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use warden_types::{
    ConnectionPoolStatistics, DefinitionId, HostName, ProcessKey, ProcessStatistics,
    QueueStatistics, ServiceId, ServiceState, StopMode,
};

use crate::collaborators::{
    Collaborators, ConfigurationSource, DeployedService, HostControl, LiveRegistry,
    ProcessBinding, ProcessControl, RemoteError, ServiceBinding, SourceError,
};
use crate::errors::{Action, Target};

/// A command received by the in-memory cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `start_all_servers_on_host`.
    StartHost(HostName),
    /// `kill_servers_on_host`.
    KillHost(HostName, StopMode),
    /// `start_process`.
    StartProcess(ProcessKey),
    /// `kill_process`.
    KillProcess(ProcessKey, StopMode),
    /// `start_service`.
    StartService(ServiceId),
    /// `stop_service`.
    StopService(ServiceId, StopMode),
    /// `check_service`.
    CheckService(ServiceId),
    /// `start_deployed_service`, addressed to a process.
    StartDeployedService(ProcessKey, DefinitionId),
}

/// Registry read that can be made to fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ReadFault {
    Hosts,
    Processes(HostName),
    Services(ProcessKey),
}

#[derive(Debug, Clone)]
struct LiveService {
    definition: DefinitionId,
    state: ServiceState,
}

#[derive(Debug, Clone, Default)]
struct LiveProcess {
    handle_dropped: bool,
    services: BTreeMap<String, LiveService>,
    queues: Vec<QueueStatistics>,
    pools: Vec<ConnectionPoolStatistics>,
}

#[derive(Debug, Default)]
struct ClusterState {
    declared: BTreeMap<HostName, BTreeMap<String, Vec<DeployedService>>>,
    live: BTreeMap<HostName, BTreeMap<String, LiveProcess>>,
    commands: Vec<Command>,
    command_faults: HashSet<(Target, Action)>,
    read_faults: HashSet<ReadFault>,
    configuration_fault: bool,
}

impl ClusterState {
    fn declared_process(&self, key: &ProcessKey) -> Option<&Vec<DeployedService>> {
        self.declared.get(&key.host)?.get(&key.process)
    }

    fn live_process_mut(&mut self, key: &ProcessKey) -> Option<&mut LiveProcess> {
        self.live.get_mut(&key.host)?.get_mut(&key.process)
    }

    fn booted(declared: &[DeployedService]) -> LiveProcess {
        LiveProcess {
            services: declared
                .iter()
                .map(|service| {
                    (
                        service.service.clone(),
                        LiveService {
                            definition: service.definition.clone(),
                            state: ServiceState::Open,
                        },
                    )
                })
                .collect(),
            ..LiveProcess::default()
        }
    }

    /// Records `command` and fails it when a fault is armed for the pair.
    fn accept(&mut self, command: Command, target: Target, action: Action) -> Result<(), RemoteError> {
        self.commands.push(command);
        if self.command_faults.contains(&(target.clone(), action)) {
            return Err(RemoteError::new(format!("injected {action} failure for {target}")));
        }
        Ok(())
    }

    fn check_read(&self, fault: &ReadFault) -> Result<(), SourceError> {
        if self.read_faults.contains(fault) {
            return Err(SourceError::new(format!("injected registry failure: {fault:?}")));
        }
        Ok(())
    }

    fn check_configuration(&self) -> Result<(), SourceError> {
        if self.configuration_fault {
            return Err(SourceError::new("injected configuration store failure"));
        }
        Ok(())
    }
}

/// Shared in-memory cluster. Clones observe and mutate the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryCluster {
    state: Arc<Mutex<ClusterState>>,
}

impl MemoryCluster {
    /// Creates an empty cluster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ClusterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bundles this cluster as the engine's three collaborators.
    #[must_use]
    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(
            Arc::new(self.clone()),
            Arc::new(self.clone()),
            Arc::new(self.clone()),
        )
    }

    /// Declares a host with no processes.
    pub fn declare_host(&self, host: &str) {
        self.lock().declared.entry(HostName::new(host)).or_default();
    }

    /// Declares a process, and its host if needed.
    pub fn declare_process(&self, key: &ProcessKey) {
        self.lock()
            .declared
            .entry(key.host.clone())
            .or_default()
            .entry(key.process.clone())
            .or_default();
    }

    /// Declares a service, and its process and host if needed. The
    /// definition id is derived from the service name.
    pub fn declare_service(&self, id: &ServiceId) {
        let declared = DeployedService::new(id.service.clone(), definition_for(&id.service));
        let mut state = self.lock();
        let services = state
            .declared
            .entry(id.process.host.clone())
            .or_default()
            .entry(id.process.process.clone())
            .or_default();
        if !services.iter().any(|existing| existing.service == id.service) {
            services.push(declared);
        }
    }

    /// Registers a host with no processes.
    pub fn register_host(&self, host: &str) {
        self.lock().live.entry(HostName::new(host)).or_default();
    }

    /// Registers a process, and its host if needed.
    pub fn register_process(&self, key: &ProcessKey) {
        self.lock()
            .live
            .entry(key.host.clone())
            .or_default()
            .entry(key.process.clone())
            .or_default();
    }

    /// Registers a service in the given state, and its process and host if
    /// needed.
    pub fn register_service(&self, id: &ServiceId, state: ServiceState) {
        self.register_process(&id.process);
        if let Some(process) = self.lock().live_process_mut(&id.process) {
            process.services.insert(
                id.service.clone(),
                LiveService {
                    definition: DefinitionId::new(definition_for(&id.service)),
                    state,
                },
            );
        }
    }

    /// Declares and registers a service in the given state.
    pub fn run_service(&self, id: &ServiceId, state: ServiceState) {
        self.declare_service(id);
        self.register_service(id, state);
    }

    /// Makes the registry hand out `key` without a control handle.
    pub fn drop_handle(&self, key: &ProcessKey) {
        if let Some(process) = self.lock().live_process_mut(key) {
            process.handle_dropped = true;
        }
    }

    /// Arms a failure for every `action` command addressed to `target`.
    pub fn fail_command(&self, target: impl Into<Target>, action: Action) {
        self.lock().command_faults.insert((target.into(), action));
    }

    /// Makes listing registered hosts fail.
    pub fn fail_registered_hosts(&self) {
        self.lock().read_faults.insert(ReadFault::Hosts);
    }

    /// Makes listing the registered processes of `host` fail.
    pub fn fail_registered_processes(&self, host: &str) {
        self.lock()
            .read_faults
            .insert(ReadFault::Processes(HostName::new(host)));
    }

    /// Makes listing the registered services of `key` fail.
    pub fn fail_registered_services(&self, key: &ProcessKey) {
        self.lock()
            .read_faults
            .insert(ReadFault::Services(key.clone()));
    }

    /// Makes every configuration read fail.
    pub fn fail_configuration(&self) {
        self.lock().configuration_fault = true;
    }

    /// Disarms every injected failure.
    pub fn heal(&self) {
        let mut state = self.lock();
        state.command_faults.clear();
        state.read_faults.clear();
        state.configuration_fault = false;
    }

    /// Publishes queue figures for a registered process.
    pub fn set_queue_statistics(&self, key: &ProcessKey, queues: Vec<QueueStatistics>) {
        if let Some(process) = self.lock().live_process_mut(key) {
            process.queues = queues;
        }
    }

    /// Publishes connection pool figures for a registered process.
    pub fn set_pool_statistics(&self, key: &ProcessKey, pools: Vec<ConnectionPoolStatistics>) {
        if let Some(process) = self.lock().live_process_mut(key) {
            process.pools = pools;
        }
    }

    /// Commands received so far, oldest first.
    #[must_use]
    pub fn commands(&self) -> Vec<Command> {
        self.lock().commands.clone()
    }

    /// Forgets the recorded commands.
    pub fn clear_commands(&self) {
        self.lock().commands.clear();
    }

    /// Live state of a service, if registered.
    #[must_use]
    pub fn service_state(&self, id: &ServiceId) -> Option<ServiceState> {
        let state = self.lock();
        state
            .live
            .get(&id.process.host)?
            .get(&id.process.process)?
            .services
            .get(&id.service)
            .map(|service| service.state)
    }

    /// Returns `true` when the process is registered.
    #[must_use]
    pub fn is_process_live(&self, key: &ProcessKey) -> bool {
        self.lock()
            .live
            .get(&key.host)
            .is_some_and(|processes| processes.contains_key(&key.process))
    }

    /// Returns `true` when the host is registered.
    #[must_use]
    pub fn is_host_live(&self, host: &str) -> bool {
        self.lock().live.contains_key(&HostName::new(host))
    }

    fn process_handle(&self, key: ProcessKey) -> MemoryProcess {
        MemoryProcess {
            key,
            cluster: self.clone(),
        }
    }
}

fn definition_for(service: &str) -> String {
    format!("def-{service}")
}

impl ConfigurationSource for MemoryCluster {
    fn deployed_hosts(&self) -> Result<Vec<HostName>, SourceError> {
        let state = self.lock();
        state.check_configuration()?;
        Ok(state.declared.keys().cloned().collect())
    }

    fn is_host_deployed(&self, host: &HostName) -> Result<bool, SourceError> {
        let state = self.lock();
        state.check_configuration()?;
        Ok(state.declared.contains_key(host))
    }

    fn deployed_processes(&self, host: &HostName) -> Result<Vec<String>, SourceError> {
        let state = self.lock();
        state.check_configuration()?;
        Ok(state
            .declared
            .get(host)
            .map(|processes| processes.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn deployed_services(&self, process: &ProcessKey) -> Result<Vec<DeployedService>, SourceError> {
        let state = self.lock();
        state.check_configuration()?;
        Ok(state.declared_process(process).cloned().unwrap_or_default())
    }
}

impl LiveRegistry for MemoryCluster {
    fn registered_hosts(&self) -> Result<Vec<HostName>, SourceError> {
        let state = self.lock();
        state.check_read(&ReadFault::Hosts)?;
        Ok(state.live.keys().cloned().collect())
    }

    fn registered_processes(&self, host: &HostName) -> Result<Vec<ProcessBinding>, SourceError> {
        let processes: Vec<(String, bool)> = {
            let state = self.lock();
            state.check_read(&ReadFault::Processes(host.clone()))?;
            state
                .live
                .get(host)
                .map(|processes| {
                    processes
                        .iter()
                        .map(|(name, process)| (name.clone(), process.handle_dropped))
                        .collect()
                })
                .unwrap_or_default()
        };
        Ok(processes
            .into_iter()
            .map(|(name, handle_dropped)| {
                let key = ProcessKey::new(host.clone(), name);
                if handle_dropped {
                    ProcessBinding::without_control(key)
                } else {
                    ProcessBinding::new(key.clone(), Arc::new(self.process_handle(key)))
                }
            })
            .collect())
    }

    fn registered_services(
        &self,
        process: &ProcessKey,
    ) -> Result<Vec<ServiceBinding>, SourceError> {
        let state = self.lock();
        state.check_read(&ReadFault::Services(process.clone()))?;
        let Some(live) = state
            .live
            .get(&process.host)
            .and_then(|processes| processes.get(&process.process))
        else {
            return Ok(Vec::new());
        };
        Ok(live
            .services
            .iter()
            .map(|(name, service)| ServiceBinding {
                id: process.service(name.clone()),
                definition: service.definition.clone(),
                state: service.state,
            })
            .collect())
    }
}

impl HostControl for MemoryCluster {
    fn start_all_servers_on_host(&self, host: &HostName) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.accept(
            Command::StartHost(host.clone()),
            Target::Host(host.clone()),
            Action::StartHost,
        )?;
        let Some(declared) = state.declared.get(host).cloned() else {
            return Err(RemoteError::new(format!("host '{host}' is not declared")));
        };
        let live = state.live.entry(host.clone()).or_default();
        for (process, services) in declared {
            live.entry(process)
                .or_insert_with(|| ClusterState::booted(&services));
        }
        Ok(())
    }

    fn kill_servers_on_host(&self, host: &HostName, mode: StopMode) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.accept(
            Command::KillHost(host.clone(), mode),
            Target::Host(host.clone()),
            Action::KillHost,
        )?;
        state
            .live
            .remove(host)
            .map(drop)
            .ok_or_else(|| RemoteError::new(format!("host '{host}' is not running")))
    }

    fn start_process(&self, process: &ProcessKey) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.accept(
            Command::StartProcess(process.clone()),
            Target::Process(process.clone()),
            Action::StartProcess,
        )?;
        let Some(declared) = state.declared_process(process).cloned() else {
            return Err(RemoteError::new(format!("process '{process}' is not declared")));
        };
        let Some(live) = state.live.get_mut(&process.host) else {
            return Err(RemoteError::new(format!(
                "host '{}' is not running",
                process.host
            )));
        };
        live.entry(process.process.clone())
            .or_insert_with(|| ClusterState::booted(&declared));
        Ok(())
    }

    fn kill_process(&self, process: &ProcessKey, mode: StopMode) -> Result<(), RemoteError> {
        let mut state = self.lock();
        state.accept(
            Command::KillProcess(process.clone(), mode),
            Target::Process(process.clone()),
            Action::KillProcess,
        )?;
        state
            .live
            .get_mut(&process.host)
            .and_then(|processes| processes.remove(&process.process))
            .map(drop)
            .ok_or_else(|| RemoteError::new(format!("process '{process}' is not running")))
    }
}

/// Control handle for one process of a [`MemoryCluster`].
#[derive(Debug, Clone)]
pub struct MemoryProcess {
    key: ProcessKey,
    cluster: MemoryCluster,
}

impl MemoryProcess {
    fn with_service<T>(
        &self,
        service: &ServiceId,
        command: Command,
        action: Action,
        apply: impl FnOnce(&mut ClusterState, &ServiceId) -> Result<T, RemoteError>,
    ) -> Result<T, RemoteError> {
        let mut state = self.cluster.lock();
        state.accept(command, Target::Service(service.clone()), action)?;
        if service.process != self.key {
            return Err(RemoteError::new(format!(
                "service '{service}' is not hosted by '{}'",
                self.key
            )));
        }
        apply(&mut state, service)
    }
}

fn live_service<'a>(
    state: &'a mut ClusterState,
    id: &ServiceId,
) -> Result<&'a mut LiveService, RemoteError> {
    state
        .live_process_mut(&id.process)
        .and_then(|process| process.services.get_mut(&id.service))
        .ok_or_else(|| RemoteError::new(format!("service '{id}' is not registered")))
}

impl ProcessControl for MemoryProcess {
    fn start_service(&self, service: &ServiceId) -> Result<(), RemoteError> {
        self.with_service(
            service,
            Command::StartService(service.clone()),
            Action::StartService,
            |state, id| {
                live_service(state, id)?.state = ServiceState::Open;
                Ok(())
            },
        )
    }

    fn stop_service(&self, service: &ServiceId, mode: StopMode) -> Result<(), RemoteError> {
        self.with_service(
            service,
            Command::StopService(service.clone(), mode),
            Action::StopService,
            |state, id| {
                let declared = state
                    .declared_process(&id.process)
                    .is_some_and(|services| services.iter().any(|s| s.service == id.service));
                if declared {
                    live_service(state, id)?.state = ServiceState::Closed;
                    return Ok(());
                }
                state
                    .live_process_mut(&id.process)
                    .and_then(|process| process.services.remove(&id.service))
                    .map(drop)
                    .ok_or_else(|| RemoteError::new(format!("service '{id}' is not registered")))
            },
        )
    }

    fn check_service(&self, service: &ServiceId) -> Result<(), RemoteError> {
        self.with_service(
            service,
            Command::CheckService(service.clone()),
            Action::CheckService,
            |state, id| {
                let live = live_service(state, id)?;
                if live.state == ServiceState::DataSourceUnavailable {
                    live.state = ServiceState::Open;
                }
                Ok(())
            },
        )
    }

    fn start_deployed_service(&self, definition: &DefinitionId) -> Result<(), RemoteError> {
        let mut state = self.cluster.lock();
        let found = state.declared_process(&self.key).and_then(|services| {
            services
                .iter()
                .find(|service| service.definition == *definition)
                .cloned()
        });
        let target = match &found {
            Some(service) => Target::Service(self.key.service(service.service.clone())),
            None => Target::Process(self.key.clone()),
        };
        state.accept(
            Command::StartDeployedService(self.key.clone(), definition.clone()),
            target,
            Action::StartDeployedService,
        )?;
        let Some(declared) = found else {
            return Err(RemoteError::new(format!(
                "definition '{definition}' is not declared for '{}'",
                self.key
            )));
        };
        let Some(process) = state.live_process_mut(&self.key) else {
            return Err(RemoteError::new(format!("process '{}' is not running", self.key)));
        };
        process.services.insert(
            declared.service,
            LiveService {
                definition: declared.definition,
                state: ServiceState::Open,
            },
        );
        Ok(())
    }

    fn queue_statistics(&self) -> Result<Vec<QueueStatistics>, RemoteError> {
        let state = self.cluster.lock();
        self.read_statistics(&state)
            .map(|process| process.queues.clone())
    }

    fn connection_pool_statistics(&self) -> Result<Vec<ConnectionPoolStatistics>, RemoteError> {
        let state = self.cluster.lock();
        self.read_statistics(&state)
            .map(|process| process.pools.clone())
    }

    fn process_statistics(&self) -> Result<ProcessStatistics, RemoteError> {
        let state = self.cluster.lock();
        let process = self.read_statistics(&state)?;
        Ok(ProcessStatistics {
            process: self.key.clone(),
            uptime_secs: 0,
            threads: u32::try_from(process.services.len()).unwrap_or(u32::MAX),
            heap_used_bytes: 0,
            heap_max_bytes: 0,
        })
    }
}

impl MemoryProcess {
    fn read_statistics<'a>(
        &self,
        state: &'a ClusterState,
    ) -> Result<&'a LiveProcess, RemoteError> {
        if state
            .command_faults
            .contains(&(Target::Process(self.key.clone()), Action::ReadStatistics))
        {
            return Err(RemoteError::new(format!(
                "injected {} failure for process '{}'",
                Action::ReadStatistics,
                self.key
            )));
        }
        state
            .live
            .get(&self.key.host)
            .and_then(|processes| processes.get(&self.key.process))
            .ok_or_else(|| RemoteError::new(format!("process '{}' is not running", self.key)))
    }
}
