//! Point-in-time view of the cluster merging declared and live state.
//!
//! A [`SystemState`] is built once per query or reconciliation pass and never
//! changes afterwards. Commands issued while walking it do not update it; a
//! fresh snapshot must be built to observe their effect.

use std::collections::BTreeMap;
use std::fmt;

use warden_types::{DefinitionId, HostName, Presence, ProcessKey, ServiceId, ServiceState};

use crate::collaborators::{ProcessBinding, ProcessHandle, ServiceBinding};
use crate::errors::{ControlError, Target};
use crate::facade::ControlFacade;

/// Live side of a registered process.
#[derive(Clone)]
pub struct ProcessLink {
    control: Option<ProcessHandle>,
}

impl ProcessLink {
    /// Control handle supplied by the registry, if any.
    #[must_use]
    pub fn control(&self) -> Option<&ProcessHandle> {
        self.control.as_ref()
    }
}

impl fmt::Debug for ProcessLink {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ProcessLink")
            .field("has_control", &self.control.is_some())
            .finish()
    }
}

/// Registry state that could not be read while building the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Node whose children or liveness are unknown.
    pub target: Target,
    /// Failure reported by the registry.
    pub message: String,
}

/// A service as seen by the snapshot.
#[derive(Debug, Clone)]
pub struct ServiceNode {
    id: ServiceId,
    definition: DefinitionId,
    presence: Presence<ServiceState>,
}

impl ServiceNode {
    #[cfg(test)]
    pub(crate) const fn for_tests(
        id: ServiceId,
        definition: DefinitionId,
        presence: Presence<ServiceState>,
    ) -> Self {
        Self {
            id,
            definition,
            presence,
        }
    }

    /// Service identity.
    #[must_use]
    pub fn id(&self) -> &ServiceId {
        &self.id
    }

    /// Configuration element the service comes from.
    #[must_use]
    pub fn definition(&self) -> &DefinitionId {
        &self.definition
    }

    /// Declared and live status, with the operational state when live.
    #[must_use]
    pub fn presence(&self) -> &Presence<ServiceState> {
        &self.presence
    }
}

/// A process as seen by the snapshot.
#[derive(Debug, Clone)]
pub struct ProcessNode {
    key: ProcessKey,
    presence: Presence<ProcessLink>,
    degraded: Option<String>,
    services: Vec<ServiceNode>,
}

impl ProcessNode {
    /// Process identity.
    #[must_use]
    pub fn key(&self) -> &ProcessKey {
        &self.key
    }

    /// Declared and live status, with the control link when live.
    #[must_use]
    pub fn presence(&self) -> &Presence<ProcessLink> {
        &self.presence
    }

    /// Registry failure that left the service list incomplete.
    #[must_use]
    pub fn degraded(&self) -> Option<&str> {
        self.degraded.as_deref()
    }

    /// Services sorted by name.
    #[must_use]
    pub fn services(&self) -> &[ServiceNode] {
        &self.services
    }
}

/// A host as seen by the snapshot.
#[derive(Debug, Clone)]
pub struct HostNode {
    name: HostName,
    presence: Presence<()>,
    degraded: Option<String>,
    processes: Vec<ProcessNode>,
}

impl HostNode {
    /// Host name.
    #[must_use]
    pub fn name(&self) -> &HostName {
        &self.name
    }

    /// Declared and live status.
    #[must_use]
    pub fn presence(&self) -> &Presence<()> {
        &self.presence
    }

    /// Registry failure that left the process list incomplete.
    #[must_use]
    pub fn degraded(&self) -> Option<&str> {
        self.degraded.as_deref()
    }

    /// Processes sorted by name.
    #[must_use]
    pub fn processes(&self) -> &[ProcessNode] {
        &self.processes
    }
}

/// Immutable host, process, and service tree.
#[derive(Debug, Clone, Default)]
pub struct SystemState {
    hosts: Vec<HostNode>,
    diagnostics: Vec<Diagnostic>,
}

impl SystemState {
    /// Hosts sorted by name.
    #[must_use]
    pub fn hosts(&self) -> &[HostNode] {
        &self.hosts
    }

    /// Looks up a host by name.
    #[must_use]
    pub fn host(&self, name: &HostName) -> Option<&HostNode> {
        self.hosts.iter().find(|host| host.name == *name)
    }

    /// Looks up a process by key.
    #[must_use]
    pub fn process(&self, key: &ProcessKey) -> Option<&ProcessNode> {
        self.host(&key.host)?
            .processes
            .iter()
            .find(|process| process.key == *key)
    }

    /// Looks up a service by identifier.
    #[must_use]
    pub fn service(&self, id: &ServiceId) -> Option<&ServiceNode> {
        self.process(&id.process)?
            .services
            .iter()
            .find(|service| service.id == *id)
    }

    /// Registry failures recorded while building the snapshot.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns `true` when a reconciliation pass over this snapshot would
    /// issue no command and record no failure.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.diagnostics.is_empty()
            && self.hosts.iter().all(|host| {
                host.presence.is_registered()
                    && host.degraded.is_none()
                    && host.processes.iter().all(|process| {
                        matches!(&process.presence, Presence::Both(link) if link.control.is_some())
                            && process.degraded.is_none()
                            && process.services.iter().all(|service| {
                                matches!(service.presence, Presence::Both(ServiceState::Open))
                            })
                    })
            })
    }
}

/// Builds [`SystemState`] snapshots from the facade's two sources.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotBuilder<'a> {
    facade: &'a ControlFacade,
}

struct Sides<D, R> {
    deployed: Option<D>,
    registered: Option<R>,
}

impl<D, R> Default for Sides<D, R> {
    fn default() -> Self {
        Self {
            deployed: None,
            registered: None,
        }
    }
}

impl<'a> SnapshotBuilder<'a> {
    /// Creates a builder reading through `facade`.
    #[must_use]
    pub const fn new(facade: &'a ControlFacade) -> Self {
        Self { facade }
    }

    /// Reads both sources and merges them into a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Configuration`] when the configuration source
    /// cannot be read. Registry failures never fail the build; they become
    /// [`Diagnostic`]s and degraded nodes instead.
    pub fn build(&self) -> Result<SystemState, ControlError> {
        let mut diagnostics = Vec::new();
        let mut hosts: BTreeMap<HostName, Sides<(), ()>> = BTreeMap::new();

        for host in self.facade.deployed_hosts()? {
            hosts.entry(host).or_default().deployed = Some(());
        }
        match self.facade.registered_hosts() {
            Ok(registered) => {
                for host in registered {
                    hosts.entry(host).or_default().registered = Some(());
                }
            }
            Err(error) => diagnostics.push(Diagnostic {
                target: Target::Cluster,
                message: error.to_string(),
            }),
        }

        let mut nodes = Vec::with_capacity(hosts.len());
        for (name, sides) in hosts {
            let Some(presence) = Presence::from_parts(sides.deployed.is_some(), sides.registered)
            else {
                continue;
            };
            nodes.push(self.host_node(name, presence, &mut diagnostics)?);
        }

        Ok(SystemState {
            hosts: nodes,
            diagnostics,
        })
    }

    fn host_node(
        &self,
        name: HostName,
        presence: Presence<()>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<HostNode, ControlError> {
        let mut processes: BTreeMap<String, Sides<(), ProcessBinding>> = BTreeMap::new();
        if presence.is_deployed() {
            for process in self.facade.deployed_processes(&name)? {
                processes.entry(process).or_default().deployed = Some(());
            }
        }

        let mut degraded = None;
        if presence.is_registered() {
            match self.facade.registered_processes(&name) {
                Ok(bindings) => {
                    for binding in bindings {
                        let process = binding.key.process.clone();
                        processes.entry(process).or_default().registered = Some(binding);
                    }
                }
                Err(error) => {
                    let message = error.to_string();
                    diagnostics.push(Diagnostic {
                        target: Target::Host(name.clone()),
                        message: message.clone(),
                    });
                    degraded = Some(message);
                }
            }
        }

        let mut nodes = Vec::with_capacity(processes.len());
        for (process, sides) in processes {
            let key = ProcessKey::new(name.clone(), process);
            let link = sides.registered.map(|binding| ProcessLink {
                control: binding.control,
            });
            let Some(presence) = Presence::from_parts(sides.deployed.is_some(), link) else {
                continue;
            };
            nodes.push(self.process_node(key, presence, diagnostics)?);
        }

        Ok(HostNode {
            name,
            presence,
            degraded,
            processes: nodes,
        })
    }

    fn process_node(
        &self,
        key: ProcessKey,
        presence: Presence<ProcessLink>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<ProcessNode, ControlError> {
        let mut services: BTreeMap<String, Sides<DefinitionId, ServiceBinding>> = BTreeMap::new();
        if presence.is_deployed() {
            for declared in self.facade.deployed_services(&key)? {
                services.entry(declared.service).or_default().deployed = Some(declared.definition);
            }
        }

        let mut degraded = None;
        if presence.is_registered() {
            match self.facade.registered_services(&key) {
                Ok(bindings) => {
                    for binding in bindings {
                        let service = binding.id.service.clone();
                        services.entry(service).or_default().registered = Some(binding);
                    }
                }
                Err(error) => {
                    let message = error.to_string();
                    diagnostics.push(Diagnostic {
                        target: Target::Process(key.clone()),
                        message: message.clone(),
                    });
                    degraded = Some(message);
                }
            }
        }

        let nodes = services
            .into_iter()
            .filter_map(|(service, sides)| service_node(&key, service, sides))
            .collect();

        Ok(ProcessNode {
            key,
            presence,
            degraded,
            services: nodes,
        })
    }
}

fn service_node(
    key: &ProcessKey,
    service: String,
    sides: Sides<DefinitionId, ServiceBinding>,
) -> Option<ServiceNode> {
    let deployed = sides.deployed.is_some();
    // The live binding's definition wins; it names what is actually running.
    let (definition, state) = match sides.registered {
        Some(binding) => (binding.definition, Some(binding.state)),
        None => (sides.deployed?, None),
    };
    Some(ServiceNode {
        id: key.service(service),
        definition,
        presence: Presence::from_parts(deployed, state)?,
    })
}
