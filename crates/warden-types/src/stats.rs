//! Statistics records read from live processes.

use serde::{Deserialize, Serialize};

use crate::ids::ProcessKey;

/// Depth and throughput of one message queue inside a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatistics {
    /// Process owning the queue.
    pub process: ProcessKey,
    /// Queue name.
    pub queue: String,
    /// Messages currently waiting.
    pub depth: u64,
    /// Messages enqueued since the process started.
    pub enqueued: u64,
    /// Messages dequeued since the process started.
    pub dequeued: u64,
}

/// Utilisation of one connection pool inside a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionPoolStatistics {
    /// Process owning the pool.
    pub process: ProcessKey,
    /// Pool name.
    pub pool: String,
    /// Connections currently checked out.
    pub active: u32,
    /// Connections open but idle.
    pub idle: u32,
    /// Configured pool ceiling.
    pub max: u32,
}

impl ConnectionPoolStatistics {
    /// Returns `true` when every permitted connection is checked out.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.active >= self.max
    }
}

/// Runtime figures for a whole process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessStatistics {
    /// Process described by the record.
    pub process: ProcessKey,
    /// Seconds since the process started.
    pub uptime_secs: u64,
    /// Live thread count.
    pub threads: u32,
    /// Heap bytes in use.
    pub heap_used_bytes: u64,
    /// Heap ceiling in bytes.
    pub heap_max_bytes: u64,
}
