//! Engine bootstrap orchestration.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use warden_config::Config;

use crate::collaborators::Collaborators;
use crate::engine::{Engine, EngineSettings};
use crate::health::ClusterReporter;
use crate::telemetry::{self, TelemetryError};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the reconciler configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands out a configuration resolved elsewhere.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already-resolved configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
}

/// Loads configuration, installs telemetry, and assembles an [`Engine`] over
/// the supplied collaborators.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration cannot be loaded or the
/// tracing subscriber cannot be installed. Failures are also reported to
/// `reporter`.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn ClusterReporter>,
    collaborators: Collaborators,
) -> Result<Engine, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    if let Err(source) = telemetry::initialise(&config) {
        let error = BootstrapError::Telemetry { source };
        reporter.bootstrap_failed(&error);
        return Err(error);
    }

    reporter.bootstrap_succeeded(&config);
    let settings = EngineSettings::from_config(&config);
    Ok(Engine::new(collaborators, reporter, settings))
}
