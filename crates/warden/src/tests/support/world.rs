//! BDD test worlds: bootstrap state, and an in-memory cluster with the
//! engine driving it.

use std::cell::RefCell;
use std::sync::Arc;

use warden_types::{HostName, ProcessKey, ServiceId, StopMode};

use crate::bootstrap::{BootstrapError, ConfigLoader, bootstrap_with};
use crate::engine::{Engine, EngineSettings};
use crate::errors::{ControlError, SyncError};
use crate::memory::{Command, MemoryCluster};

use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::reporter::RecordingClusterReporter;

/// Scenario world for the bootstrap sequence.
pub struct TestWorld {
    loader: Box<dyn ConfigLoader>,
    pub reporter: Arc<RecordingClusterReporter>,
    pub cluster: MemoryCluster,
    engine: Option<Engine>,
    bootstrap_error: Option<BootstrapError>,
}

impl TestWorld {
    /// Builds a world with a successful configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            loader: Box::new(TestConfigLoader::new()),
            reporter: Arc::new(RecordingClusterReporter::default()),
            cluster: MemoryCluster::new(),
            engine: None,
            bootstrap_error: None,
        }
    }

    /// Installs a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.loader = Box::new(FailingConfigLoader);
        self.reset_results();
    }

    /// Installs a loader that succeeds with the given worker count.
    pub fn use_successful_loader(&mut self, workers: usize) {
        self.loader = Box::new(TestConfigLoader::with_workers(workers));
        self.reset_results();
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.engine.is_some() || self.bootstrap_error.is_some() {
            return;
        }

        match bootstrap_with(
            &*self.loader,
            self.reporter.clone(),
            self.cluster.collaborators(),
        ) {
            Ok(engine) => self.engine = Some(engine),
            Err(error) => self.bootstrap_error = Some(error),
        }
    }

    /// Returns the bootstrap error, if any.
    #[must_use]
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    /// Returns the engine when bootstrap succeeded.
    #[must_use]
    pub fn engine(&self) -> Option<&Engine> {
        self.engine.as_ref()
    }

    fn reset_results(&mut self) {
        self.engine = None;
        self.bootstrap_error = None;
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default bootstrap world fixture.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}

/// Scenario world holding an in-memory cluster and an engine over it.
pub struct ClusterWorld {
    pub cluster: MemoryCluster,
    pub reporter: Arc<RecordingClusterReporter>,
    pub settings: EngineSettings,
    engine: Option<Engine>,
    pub sync_result: Option<Result<(), SyncError>>,
    pub command_result: Option<Result<(), ControlError>>,
    pub statistics_result: Option<Result<usize, ControlError>>,
}

impl ClusterWorld {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cluster: MemoryCluster::new(),
            reporter: Arc::new(RecordingClusterReporter::default()),
            settings: EngineSettings::default(),
            engine: None,
            sync_result: None,
            command_result: None,
            statistics_result: None,
        }
    }

    /// Returns the engine, building it on first use with the current
    /// settings.
    pub fn engine(&mut self) -> &Engine {
        self.engine.get_or_insert_with(|| {
            Engine::new(
                self.cluster.collaborators(),
                self.reporter.clone(),
                self.settings,
            )
        })
    }

    /// Runs one reconciliation pass and stores its result.
    pub fn synchronize(&mut self) {
        let result = self.engine().synchronize_server();
        self.sync_result = Some(result);
    }

    /// Runs a single-target command and stores its result.
    pub fn run_command(&mut self, command: impl FnOnce(&Engine) -> Result<(), ControlError>) {
        let result = command(self.engine());
        self.command_result = Some(result);
    }

    /// Runs a cluster-wide command and stores its result alongside pass
    /// results.
    pub fn run_cluster_command(&mut self, command: impl FnOnce(&Engine) -> Result<(), SyncError>) {
        let result = command(self.engine());
        self.sync_result = Some(result);
    }

    /// Runs a statistics read and stores how many records it returned.
    pub fn read_statistics<T>(
        &mut self,
        read: impl FnOnce(&Engine) -> Result<Vec<T>, ControlError>,
    ) {
        let result = read(self.engine()).map(|records| records.len());
        self.statistics_result = Some(result);
    }

    /// Recorded commands rendered with [`describe`].
    #[must_use]
    pub fn described_commands(&self) -> Vec<String> {
        self.cluster.commands().iter().map(describe).collect()
    }

    /// Failures of the last reconciliation pass or cluster-wide command.
    #[must_use]
    pub fn sync_failures(&self) -> &[ControlError] {
        match &self.sync_result {
            Some(Err(error)) => error.failures(),
            _ => &[],
        }
    }
}

impl Default for ClusterWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Default cluster world fixture.
#[must_use]
pub fn cluster_world() -> RefCell<ClusterWorld> {
    RefCell::new(ClusterWorld::new())
}

fn mode_suffix(mode: StopMode) -> &'static str {
    match mode {
        StopMode::Immediate => "immediately",
        StopMode::Graceful => "gracefully",
    }
}

/// Renders a recorded command as the phrase used in feature files.
#[must_use]
pub fn describe(command: &Command) -> String {
    match command {
        Command::StartHost(host) => format!("start host {host}"),
        Command::KillHost(host, mode) => format!("kill host {host} {}", mode_suffix(*mode)),
        Command::StartProcess(key) => format!("start process {key}"),
        Command::KillProcess(key, mode) => format!("kill process {key} {}", mode_suffix(*mode)),
        Command::StartService(id) => format!("start service {id}"),
        Command::StopService(id, mode) => format!("stop service {id} {}", mode_suffix(*mode)),
        Command::CheckService(id) => format!("check service {id}"),
        Command::StartDeployedService(key, definition) => {
            format!("start deployed {definition} in {key}")
        }
    }
}

/// Parses a host name from step text.
pub fn parse_host(text: &str) -> Result<HostName, String> {
    text.parse()
        .map_err(|error| format!("invalid host '{text}': {error}"))
}

/// Parses a process key from step text.
pub fn parse_process(text: &str) -> Result<ProcessKey, String> {
    text.parse()
        .map_err(|error| format!("invalid process '{text}': {error}"))
}

/// Parses a service identifier from step text.
pub fn parse_service(text: &str) -> Result<ServiceId, String> {
    text.parse()
        .map_err(|error| format!("invalid service '{text}': {error}"))
}

/// Parses a stop mode phrase from step text.
pub fn parse_mode(text: &str) -> Result<StopMode, String> {
    match text {
        "immediately" => Ok(StopMode::Immediate),
        "gracefully" => Ok(StopMode::Graceful),
        other => Err(format!("invalid stop mode '{other}'")),
    }
}
