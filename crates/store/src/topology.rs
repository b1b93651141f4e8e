//! Read-only snapshot of how partitions map onto replication groups and
//! replica nodes.

use std::collections::BTreeMap;
use std::fmt;

use crate::{HostPort, StoreError};

/// Partition ids form the dense range `1..=partition_count`.
pub type PartitionId = u32;

/// Identifier of a replication group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepGroupId(pub u32);

impl fmt::Display for RepGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rg{}", self.0)
    }
}

/// One replica of a replication group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReplicaNode {
    /// Stable resource id, e.g. `rg1-rn2`.
    pub resource_id: String,
    pub host: String,
    pub port: u16,
}

impl ReplicaNode {
    pub fn new(resource_id: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            resource_id: resource_id.into(),
            host: host.into(),
            port,
        }
    }

    pub fn endpoint(&self) -> HostPort {
        HostPort::new(self.host.clone(), self.port)
    }
}

/// Replication role reported by a replica's health ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicaState {
    Master,
    Replica,
    Unknown,
    Detached,
}

/// Result of a successful health ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaStatus {
    pub state: ReplicaState,
}

impl ReplicaStatus {
    /// `true` if the replica is an active member of its group.
    pub fn is_active(&self) -> bool {
        matches!(self.state, ReplicaState::Master | ReplicaState::Replica)
    }

    pub fn is_master(&self) -> bool {
        self.state == ReplicaState::Master
    }
}

/// Partition and replication-group layout of a store.
///
/// Built through [`TopologyBuilder`], which enforces that partition ids are
/// dense from 1 and that every partition belongs to a known group. The
/// snapshot is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    /// Group of partition `i` is at index `i - 1`.
    partitions: Vec<RepGroupId>,
    groups: BTreeMap<RepGroupId, Vec<ReplicaNode>>,
}

impl Topology {
    pub fn partition_count(&self) -> u32 {
        self.partitions.len() as u32
    }

    /// Returns the replication group owning `partition`.
    pub fn rep_group(&self, partition: PartitionId) -> Option<RepGroupId> {
        let index = (partition as usize).checked_sub(1)?;
        self.partitions.get(index).copied()
    }

    /// Returns the replicas of `group`, empty if the group is unknown.
    pub fn replicas(&self, group: RepGroupId) -> &[ReplicaNode] {
        self.groups.get(&group).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn groups(&self) -> impl Iterator<Item = (RepGroupId, &[ReplicaNode])> {
        self.groups.iter().map(|(id, nodes)| (*id, nodes.as_slice()))
    }

    /// Every replica across all groups.
    pub fn nodes(&self) -> impl Iterator<Item = &ReplicaNode> {
        self.groups.values().flatten()
    }
}

/// Accumulates groups and partition assignments, validating on [`build`](Self::build).
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    partitions: BTreeMap<PartitionId, RepGroupId>,
    groups: BTreeMap<RepGroupId, Vec<ReplicaNode>>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(mut self, id: RepGroupId, nodes: Vec<ReplicaNode>) -> Self {
        self.groups.insert(id, nodes);
        self
    }

    pub fn assign(mut self, partition: PartitionId, group: RepGroupId) -> Self {
        self.partitions.insert(partition, group);
        self
    }

    /// # Errors
    ///
    /// Returns [`StoreError::InvalidTopology`] if partition ids are not exactly
    /// `1..=n` or a partition references an undeclared group.
    pub fn build(self) -> Result<Topology, StoreError> {
        let mut partitions = Vec::with_capacity(self.partitions.len());
        for (expected, (partition, group)) in (1u32..).zip(self.partitions) {
            if partition != expected {
                return Err(StoreError::InvalidTopology(format!(
                    "partition ids must be dense from 1: expected {}, found {}",
                    expected, partition
                )));
            }
            if !self.groups.contains_key(&group) {
                return Err(StoreError::InvalidTopology(format!(
                    "partition {} references unknown group {}",
                    partition, group
                )));
            }
            partitions.push(group);
        }

        Ok(Topology {
            partitions,
            groups: self.groups,
        })
    }
}
