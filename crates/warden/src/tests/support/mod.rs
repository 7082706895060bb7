//! Test harness utilities for the engine behavioural suites.

mod config_loader;
mod reporter;
mod world;

pub use config_loader::TestConfigLoader;
pub use reporter::{ClusterEvent, RecordingClusterReporter};
pub use world::{
    ClusterWorld, TestWorld, cluster_world, describe, parse_host, parse_mode, parse_process,
    parse_service, world,
};
