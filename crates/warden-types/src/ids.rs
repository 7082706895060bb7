//! Identities of cluster nodes.
//!
//! Hosts are named, processes are identified by their host and name, and
//! services by their process and a name that is unique within that process.
//! The textual form joins the segments with `/`, e.g. `h1/orders/ledger`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SEPARATOR: char = '/';

/// Errors produced when parsing node identifiers from text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdParseError {
    /// The value did not contain the expected number of segments.
    #[error("expected {expected} '/'-separated segments in '{value}'")]
    SegmentCount {
        /// Offending value.
        value: String,
        /// Number of segments the identifier requires.
        expected: usize,
    },
    /// One of the segments was empty.
    #[error("identifier '{0}' contains an empty segment")]
    EmptySegment(String),
}

fn split_segments<const N: usize>(value: &str) -> Result<[&str; N], IdParseError> {
    let trimmed = value.trim();
    let parts: Vec<&str> = trimmed.split(SEPARATOR).collect();
    let segments: [&str; N] =
        parts
            .try_into()
            .map_err(|_: Vec<&str>| IdParseError::SegmentCount {
                value: trimmed.to_owned(),
                expected: N,
            })?;
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(IdParseError::EmptySegment(trimmed.to_owned()));
    }
    Ok(segments)
}

/// Name of a cluster host.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostName(String);

impl HostName {
    /// Wraps a host name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the host name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for HostName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<HostName> for String {
    fn from(host: HostName) -> Self {
        host.0
    }
}

impl FromStr for HostName {
    type Err = IdParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let [host] = split_segments::<1>(value)?;
        Ok(Self::new(host))
    }
}

/// Identity of a process: the host running it plus its name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessKey {
    /// Host running the process.
    pub host: HostName,
    /// Process name, unique within the host.
    pub process: String,
}

impl ProcessKey {
    /// Builds a process key.
    #[must_use]
    pub fn new(host: impl Into<String>, process: impl Into<String>) -> Self {
        Self {
            host: HostName::new(host),
            process: process.into(),
        }
    }

    /// Builds the identifier of a service hosted by this process.
    #[must_use]
    pub fn service(&self, service: impl Into<String>) -> ServiceId {
        ServiceId {
            process: self.clone(),
            service: service.into(),
        }
    }
}

impl fmt::Display for ProcessKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}{SEPARATOR}{}", self.host, self.process)
    }
}

impl FromStr for ProcessKey {
    type Err = IdParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let [host, process] = split_segments::<2>(value)?;
        Ok(Self::new(host, process))
    }
}

/// Identity of a service: its process plus a name unique within that process.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServiceId {
    /// Process hosting the service.
    pub process: ProcessKey,
    /// Service name, unique within the process.
    pub service: String,
}

impl ServiceId {
    /// Builds a service identifier from its three segments.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        process: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        ProcessKey::new(host, process).service(service)
    }

    /// Host running the service's process.
    #[must_use]
    pub fn host(&self) -> &HostName {
        &self.process.host
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}{SEPARATOR}{}", self.process, self.service)
    }
}

impl FromStr for ServiceId {
    type Err = IdParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let [host, process, service] = split_segments::<3>(value)?;
        Ok(Self::new(host, process, service))
    }
}

/// Identifier of the configuration element that declared a service.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefinitionId(String);

impl DefinitionId {
    /// Wraps a component definition identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DefinitionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}
