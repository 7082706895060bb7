//! Structured telemetry initialisation for the reconciler.
//!
//! Health events from [`crate::StructuredClusterReporter`] land on the
//! `warden::health` target, so a filter such as `warn,warden::health=info`
//! keeps pass outcomes while silencing everything else.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use warden_config::{Config, LogFormat};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// `log_filter` from the configuration did not parse.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// The tracing subscriber could not be installed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global tracing subscriber on first use.
///
/// Every engine built in one process shares the subscriber installed by the
/// first bootstrap. Later calls return a fresh [`TelemetryHandle`] without
/// touching it, whatever configuration they pass.
///
/// With more than one reconcile worker, events carry the emitting thread's
/// id so the host walks of a parallel pass can be told apart.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or another
/// subscriber was installed outside this function.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| TelemetryHandle)
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let parallel = config.reconcile_workers() > 1;
    let format = config.log_format();
    let builder = |env_filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(parallel)
            .with_writer(io::stderr)
            .with_ansi(format.uses_ansi(io::stderr().is_terminal()))
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match format {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}
