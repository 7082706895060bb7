//! The reconciliation walk over a [`SystemState`].
//!
//! The walk runs top-down: hosts first, then processes on hosts that are
//! already up, then services inside processes that are both declared and
//! live. A failing node never stops the walk; every failure is collected and
//! returned in walk order once the whole tree has been visited.

use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use warden_types::{Presence, StopMode};

use crate::command;
use crate::errors::{Action, ControlError, Target};
use crate::facade::ControlFacade;
use crate::health::ClusterReporter;
use crate::lifecycle::ServiceLifecycle;
use crate::snapshot::{HostNode, ProcessNode, SystemState};

/// Walks one snapshot and issues the corrective actions it calls for.
pub(crate) struct Reconciler<'a> {
    facade: &'a ControlFacade,
    reporter: &'a dyn ClusterReporter,
    lifecycle: ServiceLifecycle<'a>,
    workers: usize,
}

impl<'a> Reconciler<'a> {
    pub(crate) fn new(
        facade: &'a ControlFacade,
        reporter: &'a dyn ClusterReporter,
        restart_stop_mode: StopMode,
        workers: usize,
    ) -> Self {
        Self {
            facade,
            reporter,
            lifecycle: ServiceLifecycle::new(reporter, restart_stop_mode),
            workers: workers.max(1),
        }
    }

    /// Runs the host, process, and service passes, returning every failure.
    pub(crate) fn run(&self, state: &SystemState) -> Vec<ControlError> {
        let mut failures = Vec::new();
        let mut running = Vec::with_capacity(state.hosts().len());

        for host in state.hosts() {
            match host.presence() {
                // Starting a host brings its declared processes and services
                // up with it, so its subtree is left alone this pass.
                Presence::Deployed => {
                    let name = host.name();
                    let outcome = command::issue(
                        self.reporter,
                        Target::Host(name.clone()),
                        Action::StartHost,
                        || self.facade.host_control().start_all_servers_on_host(name),
                    );
                    failures.extend(outcome.err());
                }
                Presence::Registered(()) | Presence::Both(()) => running.push(host),
            }
        }

        for host_failures in self.process_pass(&running) {
            failures.extend(host_failures);
        }
        failures
    }

    fn process_pass(&self, hosts: &[&HostNode]) -> Vec<Vec<ControlError>> {
        let workers = self.workers.min(hosts.len());
        if workers <= 1 {
            return hosts.iter().map(|host| self.reconcile_host(host)).collect();
        }

        let cursor = &AtomicUsize::new(0);
        let mut slots: Vec<Vec<ControlError>> = hosts.iter().map(|_| Vec::new()).collect();
        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| scope.spawn(move || self.drain(hosts, cursor)))
                .collect();
            for handle in handles {
                match handle.join() {
                    Ok(done) => {
                        for (index, host_failures) in done {
                            if let Some(slot) = slots.get_mut(index) {
                                *slot = host_failures;
                            }
                        }
                    }
                    Err(payload) => panic::resume_unwind(payload),
                }
            }
        });
        slots
    }

    /// Claims hosts from the shared cursor until none remain.
    fn drain(
        &self,
        hosts: &[&HostNode],
        cursor: &AtomicUsize,
    ) -> Vec<(usize, Vec<ControlError>)> {
        let mut done = Vec::new();
        loop {
            let index = cursor.fetch_add(1, Ordering::Relaxed);
            let Some(host) = hosts.get(index) else {
                break;
            };
            done.push((index, self.reconcile_host(host)));
        }
        done
    }

    fn reconcile_host(&self, host: &HostNode) -> Vec<ControlError> {
        let mut failures = Vec::new();
        if let Some(reason) = host.degraded() {
            failures.push(command::refuse(
                self.reporter,
                ControlError::ControlHandleUnavailable {
                    target: Target::Host(host.name().clone()),
                    reason: format!("process list unavailable: {reason}"),
                },
            ));
            return failures;
        }
        for process in host.processes() {
            self.reconcile_process(process, &mut failures);
        }
        failures
    }

    fn reconcile_process(&self, process: &ProcessNode, failures: &mut Vec<ControlError>) {
        let key = process.key();
        let hosts = self.facade.host_control();
        let link = match process.presence() {
            Presence::Deployed => {
                let outcome = command::issue(
                    self.reporter,
                    Target::Process(key.clone()),
                    Action::StartProcess,
                    || hosts.start_process(key),
                );
                failures.extend(outcome.err());
                return;
            }
            Presence::Registered(_) => {
                let outcome = command::issue(
                    self.reporter,
                    Target::Process(key.clone()),
                    Action::KillProcess,
                    || hosts.kill_process(key, StopMode::Immediate),
                );
                failures.extend(outcome.err());
                return;
            }
            Presence::Both(link) => link,
        };

        let Some(control) = link.control() else {
            failures.push(command::refuse(
                self.reporter,
                ControlError::ControlHandleUnavailable {
                    target: Target::Process(key.clone()),
                    reason: "registry binding carries no control handle".to_owned(),
                },
            ));
            return;
        };
        if let Some(reason) = process.degraded() {
            failures.push(command::refuse(
                self.reporter,
                ControlError::ControlHandleUnavailable {
                    target: Target::Process(key.clone()),
                    reason: format!("service list unavailable: {reason}"),
                },
            ));
            return;
        }

        for service in process.services() {
            if let Err(error) = self.lifecycle.normalise(control.as_ref(), service) {
                failures.push(error);
            }
        }
    }
}
