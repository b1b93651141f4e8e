//! Client traits the core is written against.
//!
//! Implementations may block on network I/O in every method.

use std::time::Duration;

use crate::{HostPort, Key, PartitionId, ReplicaNode, ReplicaStatus, ScanOptions, StoreError, Topology};

/// One entry served by a partition scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// Partition the store served this entry from.
    pub partition: PartitionId,
    pub key: Key,
    pub value: Option<Vec<u8>>,
}

/// Lazy stream of scan results. Ends after the first error.
pub type EntryStream = Box<dyn Iterator<Item = Result<KeyValue, StoreError>> + Send>;

/// Resolves cluster topology and checks replica health.
pub trait TopologyClient {
    /// Resolves the topology by contacting `helper_hosts`, retrying each
    /// contact at most `max_retries` times.
    fn locate(&self, helper_hosts: &[HostPort], max_retries: u32) -> Result<Topology, StoreError>;

    /// Pings a replica's admin service, giving up after `timeout`.
    fn ping(&self, node: &ReplicaNode, timeout: Duration) -> Result<ReplicaStatus, StoreError>;
}

/// Opens sessions against a named store.
pub trait StoreConnector {
    type Session: StoreSession;

    /// Opens a session through the first usable endpoint, in order.
    fn open(&self, store_name: &str, endpoints: &[HostPort]) -> Result<Self::Session, StoreError>;
}

/// A live connection to the store.
pub trait StoreSession {
    /// Starts a scan restricted to one partition.
    fn partition_scan(
        &mut self,
        partition: PartitionId,
        options: &ScanOptions,
    ) -> Result<EntryStream, StoreError>;

    /// Releases the session. Calling it more than once has no further effect.
    fn close(&mut self);
}
