//! Shared vocabulary for the warden cluster reconciler.
//!
//! The types here describe cluster nodes independently of how they are
//! observed or commanded: identifiers for hosts, processes, and services, the
//! closed set of service operational states, stop semantics, the
//! deployed/registered [`Presence`] of a node, and the statistics records read
//! from live processes.

mod ids;
mod presence;
mod state;
mod stats;

pub use ids::{DefinitionId, HostName, IdParseError, ProcessKey, ServiceId};
pub use presence::Presence;
pub use state::{ServiceState, ServiceStateParseError, StopMode};
pub use stats::{ConnectionPoolStatistics, ProcessStatistics, QueueStatistics};
