//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use warden_config::Config;
use warden_types::StopMode;

use crate::bootstrap::ConfigLoader;

/// Loader returning defaults with an explicit worker count.
pub struct TestConfigLoader {
    reconcile_workers: usize,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            reconcile_workers: 1,
        }
    }

    #[must_use]
    pub fn with_workers(reconcile_workers: usize) -> Self {
        Self { reconcile_workers }
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            reconcile_workers: self.reconcile_workers,
            restart_stop_mode: StopMode::Graceful,
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing invalid CLI arguments.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("warden"),
            OsString::from("--restart-stop-mode"),
            OsString::from("eventually"),
        ];
        Config::load_from_iter(args)
    }
}
