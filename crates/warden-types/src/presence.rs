//! Deployed/registered presence of a cluster node.

use serde::{Deserialize, Serialize};

/// Whether a node is declared in configuration, live in the registry, or both.
///
/// A node that is neither deployed nor registered has no representation, so
/// snapshots cannot contain one. The registered variants carry the live
/// payload observed in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "presence", content = "live", rename_all = "snake_case")]
pub enum Presence<T> {
    /// Declared in configuration but not running.
    Deployed,
    /// Running but not declared in configuration.
    Registered(T),
    /// Declared and running.
    Both(T),
}

impl<T> Presence<T> {
    /// Combines the two membership tests, returning `None` when the node is
    /// absent from both sources.
    #[must_use]
    pub fn from_parts(deployed: bool, live: Option<T>) -> Option<Self> {
        match (deployed, live) {
            (true, Some(live)) => Some(Self::Both(live)),
            (true, None) => Some(Self::Deployed),
            (false, Some(live)) => Some(Self::Registered(live)),
            (false, None) => None,
        }
    }

    /// Returns `true` when the node is declared in configuration.
    #[must_use]
    pub const fn is_deployed(&self) -> bool {
        matches!(self, Self::Deployed | Self::Both(_))
    }

    /// Returns `true` when the node is live in the registry.
    #[must_use]
    pub const fn is_registered(&self) -> bool {
        matches!(self, Self::Registered(_) | Self::Both(_))
    }
}
