//! In-memory replicated store implementing every client trait.
//!
//! Entries live in one `BTreeMap<Key, Vec<u8>>` per partition, so forward and
//! reverse scans come straight out of the map's ordering. A key's partition is
//! `crc32(major path) % n + 1`.
//!
//! Replicas carry a [`NodeHealth`] that drives both pings and session opens:
//!
//! | Health        | ping                      | session open via its endpoint |
//! |---------------|---------------------------|-------------------------------|
//! | `Up`          | `Master` / `Replica`      | yes                           |
//! | `Unreachable` | `ReplicaUnreachable`      | no                            |
//! | `Unbound`     | `NoAdminService`          | yes                           |
//! | `Detached`    | `Detached`                | yes                           |

use crc32fast::Hasher as Crc32;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::Bound;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::debug;

use crate::{
    Direction, EntryStream, HostPort, Key, KeyValue, PartitionId, RepGroupId, ReplicaNode,
    ReplicaState, ReplicaStatus, ScanOptions, StoreConnector, StoreError, StoreSession, Topology,
    TopologyBuilder, TopologyClient,
};

/// Entries fetched per batch when a scan asks for the store default.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Port every demo replica listens on.
const DEFAULT_PORT: u16 = 5000;

/// Simulated health of one replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeHealth {
    Up,
    Unreachable,
    /// Serves data but has no admin service to ping.
    Unbound,
    /// Reachable but no longer an active group member.
    Detached,
}

struct Inner {
    store_name: String,
    topology: Topology,
    health: HashMap<String, NodeHealth>,
    data: BTreeMap<PartitionId, BTreeMap<Key, Vec<u8>>>,
    lookup_failure: bool,
    read_fault: bool,
    sessions_opened: u64,
    sessions_closed: u64,
}

/// Cheaply cloneable handle to a shared in-memory store.
#[derive(Clone)]
pub struct MemStore {
    inner: Arc<RwLock<Inner>>,
}

impl std::fmt::Debug for MemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("MemStore")
            .field("store_name", &inner.store_name)
            .field("partitions", &inner.topology.partition_count())
            .field("groups", &inner.topology.groups().count())
            .field("entries", &inner.data.values().map(BTreeMap::len).sum::<usize>())
            .field("sessions_opened", &inner.sessions_opened)
            .field("sessions_closed", &inner.sessions_closed)
            .finish()
    }
}

impl MemStore {
    /// Wraps an existing topology. Every replica starts `Up`.
    pub fn new(store_name: impl Into<String>, topology: Topology) -> Self {
        let health = topology
            .nodes()
            .map(|node| (node.resource_id.clone(), NodeHealth::Up))
            .collect();
        Self {
            inner: Arc::new(RwLock::new(Inner {
                store_name: store_name.into(),
                topology,
                health,
                data: BTreeMap::new(),
                lookup_failure: false,
                read_fault: false,
                sessions_opened: 0,
                sessions_closed: 0,
            })),
        }
    }

    /// Builds a store with `groups` replication groups of `replicas` nodes each.
    ///
    /// Partitions are assigned to groups round-robin. Replica `r` of group `g`
    /// has resource id `rg{g}-rn{r}` and listens on `sn{n}.kv.local:5000`,
    /// `n` counting nodes from 1 across the cluster.
    pub fn uniform(
        store_name: impl Into<String>,
        partitions: u32,
        groups: u32,
        replicas: u32,
    ) -> Result<Self, StoreError> {
        if partitions == 0 || groups == 0 || replicas == 0 {
            return Err(StoreError::InvalidTopology(format!(
                "need at least one partition, group and replica (got {}/{}/{})",
                partitions, groups, replicas
            )));
        }

        let mut builder = TopologyBuilder::new();
        let mut storage_node = 0u32;
        for g in 1..=groups {
            let nodes = (1..=replicas)
                .map(|r| {
                    storage_node += 1;
                    ReplicaNode::new(
                        format!("rg{}-rn{}", g, r),
                        format!("sn{}.kv.local", storage_node),
                        DEFAULT_PORT,
                    )
                })
                .collect();
            builder = builder.group(RepGroupId(g), nodes);
        }
        for p in 1..=partitions {
            builder = builder.assign(p, RepGroupId((p - 1) % groups + 1));
        }

        Ok(Self::new(store_name, builder.build()?))
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn store_name(&self) -> String {
        self.read().store_name.clone()
    }

    pub fn topology(&self) -> Topology {
        self.read().topology.clone()
    }

    /// Endpoints of every replica, usable as helper hosts.
    pub fn helper_hosts(&self) -> Vec<HostPort> {
        self.read().topology.nodes().map(ReplicaNode::endpoint).collect()
    }

    /// Returns the partition `key` is stored in.
    pub fn partition_for(&self, key: &Key) -> PartitionId {
        partition_of(key, self.read().topology.partition_count())
    }

    /// Inserts or replaces an entry, returning its partition.
    pub fn put(&self, key: Key, value: Vec<u8>) -> PartitionId {
        let mut inner = self.write();
        let partition = partition_of(&key, inner.topology.partition_count());
        inner.data.entry(partition).or_default().insert(key, value);
        partition
    }

    pub fn entry_count(&self) -> usize {
        self.read().data.values().map(BTreeMap::len).sum()
    }

    pub fn partition_len(&self, partition: PartitionId) -> usize {
        self.read().data.get(&partition).map(BTreeMap::len).unwrap_or(0)
    }

    /// Changes the simulated health of one replica.
    pub fn set_node_health(&self, resource_id: &str, health: NodeHealth) -> Result<(), StoreError> {
        let mut inner = self.write();
        match inner.health.get_mut(resource_id) {
            Some(slot) => {
                *slot = health;
                Ok(())
            }
            None => Err(StoreError::InvalidTopology(format!(
                "unknown replica {}",
                resource_id
            ))),
        }
    }

    pub fn node_health(&self, resource_id: &str) -> Option<NodeHealth> {
        self.read().health.get(resource_id).copied()
    }

    /// Makes every subsequent topology lookup fail.
    pub fn set_lookup_failure(&self, fail: bool) {
        self.write().lookup_failure = fail;
    }

    /// Makes the next batch fetch of every open scan fail.
    pub fn set_read_fault(&self, fault: bool) {
        self.write().read_fault = fault;
    }

    pub fn sessions_opened(&self) -> u64 {
        self.read().sessions_opened
    }

    pub fn sessions_closed(&self) -> u64 {
        self.read().sessions_closed
    }

    /// Sessions opened and not yet closed.
    pub fn open_sessions(&self) -> u64 {
        let inner = self.read();
        inner.sessions_opened - inner.sessions_closed
    }
}

impl Inner {
    fn node_at(&self, endpoint: &HostPort) -> Option<&ReplicaNode> {
        self.topology
            .nodes()
            .find(|node| node.host == endpoint.host && node.port == endpoint.port)
    }

    fn health_of(&self, node: &ReplicaNode) -> NodeHealth {
        self.health
            .get(&node.resource_id)
            .copied()
            .unwrap_or(NodeHealth::Unreachable)
    }

    /// The master of a group is its first replica that is `Up`.
    fn is_master(&self, node: &ReplicaNode) -> bool {
        self.topology
            .groups()
            .find(|(_, nodes)| nodes.iter().any(|n| n.resource_id == node.resource_id))
            .and_then(|(_, nodes)| {
                nodes
                    .iter()
                    .find(|n| self.health_of(n) == NodeHealth::Up)
            })
            .map(|master| master.resource_id == node.resource_id)
            .unwrap_or(false)
    }
}

impl TopologyClient for MemStore {
    /// Single attempt regardless of `max_retries`; there is no network to retry.
    fn locate(&self, helper_hosts: &[HostPort], _max_retries: u32) -> Result<Topology, StoreError> {
        let inner = self.read();
        let helpers = join_endpoints(helper_hosts);

        if inner.lookup_failure {
            return Err(StoreError::TopologyLookup {
                helpers,
                reason: "topology service unavailable".to_string(),
            });
        }

        let reachable = helper_hosts.iter().any(|hp| {
            inner
                .node_at(hp)
                .map(|node| inner.health_of(node) != NodeHealth::Unreachable)
                .unwrap_or(false)
        });
        if !reachable {
            return Err(StoreError::TopologyLookup {
                helpers,
                reason: "no helper host answered".to_string(),
            });
        }

        Ok(inner.topology.clone())
    }

    fn ping(&self, node: &ReplicaNode, _timeout: Duration) -> Result<ReplicaStatus, StoreError> {
        let inner = self.read();
        let endpoint = node.endpoint().to_string();
        let health = inner
            .health
            .get(&node.resource_id)
            .copied()
            .ok_or_else(|| StoreError::ReplicaUnreachable {
                resource_id: node.resource_id.clone(),
                endpoint: endpoint.clone(),
                reason: "unknown replica".to_string(),
            })?;

        match health {
            NodeHealth::Up => Ok(ReplicaStatus {
                state: if inner.is_master(node) {
                    ReplicaState::Master
                } else {
                    ReplicaState::Replica
                },
            }),
            NodeHealth::Detached => Ok(ReplicaStatus {
                state: ReplicaState::Detached,
            }),
            NodeHealth::Unbound => Err(StoreError::NoAdminService {
                resource_id: node.resource_id.clone(),
                endpoint,
            }),
            NodeHealth::Unreachable => Err(StoreError::ReplicaUnreachable {
                resource_id: node.resource_id.clone(),
                endpoint,
                reason: "connection refused".to_string(),
            }),
        }
    }
}

impl StoreConnector for MemStore {
    type Session = MemSession;

    fn open(&self, store_name: &str, endpoints: &[HostPort]) -> Result<MemSession, StoreError> {
        let mut inner = self.write();
        let connection_error = |reason: String| StoreError::Connection {
            store: store_name.to_string(),
            endpoints: join_endpoints(endpoints),
            reason,
        };

        if inner.store_name != store_name {
            return Err(connection_error(format!(
                "store is named '{}'",
                inner.store_name
            )));
        }

        let endpoint = endpoints
            .iter()
            .find(|hp| {
                inner
                    .node_at(hp)
                    .map(|node| inner.health_of(node) != NodeHealth::Unreachable)
                    .unwrap_or(false)
            })
            .cloned()
            .ok_or_else(|| connection_error("no endpoint reachable".to_string()))?;

        inner.sessions_opened += 1;
        debug!(store = store_name, %endpoint, "session opened");

        Ok(MemSession {
            store: self.clone(),
            endpoint,
            closed: false,
        })
    }
}

/// Session against a [`MemStore`]. Closing is idempotent; dropping closes.
pub struct MemSession {
    store: MemStore,
    endpoint: HostPort,
    closed: bool,
}

impl MemSession {
    /// Endpoint the session was opened through.
    pub fn endpoint(&self) -> &HostPort {
        &self.endpoint
    }
}

impl StoreSession for MemSession {
    fn partition_scan(
        &mut self,
        partition: PartitionId,
        options: &ScanOptions,
    ) -> Result<EntryStream, StoreError> {
        if self.closed {
            return Err(StoreError::Read {
                partition,
                reason: "session is closed".to_string(),
            });
        }
        let partition_count = self.store.read().topology.partition_count();
        if partition == 0 || partition > partition_count {
            return Err(StoreError::Read {
                partition,
                reason: format!("no such partition (store has {})", partition_count),
            });
        }

        let batch_size = match options.batch_size {
            0 => DEFAULT_BATCH_SIZE,
            n => n as usize,
        };

        Ok(Box::new(MemEntryStream {
            store: self.store.clone(),
            partition,
            options: options.clone(),
            batch_size,
            buffer: VecDeque::with_capacity(batch_size),
            resume_after: None,
            exhausted: false,
        }))
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.store.write().sessions_closed += 1;
        debug!(endpoint = %self.endpoint, "session closed");
    }
}

impl Drop for MemSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Lazily fetches one partition in batches, resuming after the last key seen.
struct MemEntryStream {
    store: MemStore,
    partition: PartitionId,
    options: ScanOptions,
    batch_size: usize,
    buffer: VecDeque<KeyValue>,
    resume_after: Option<Key>,
    exhausted: bool,
}

impl MemEntryStream {
    fn fetch_batch(&mut self) -> Result<(), StoreError> {
        let inner = self.store.read();
        if inner.read_fault {
            return Err(StoreError::Read {
                partition: self.partition,
                reason: "injected read fault".to_string(),
            });
        }

        let entries = match inner.data.get(&self.partition) {
            Some(entries) => entries,
            None => {
                self.exhausted = true;
                return Ok(());
            }
        };

        let candidates: Box<dyn Iterator<Item = (&Key, &Vec<u8>)> + '_> =
            match (self.options.direction, &self.resume_after) {
                (Direction::Reverse, Some(last)) => Box::new(entries.range(..last.clone()).rev()),
                (Direction::Reverse, None) => Box::new(entries.iter().rev()),
                (_, Some(last)) => Box::new(
                    entries.range((Bound::Excluded(last.clone()), Bound::Unbounded)),
                ),
                (_, None) => Box::new(entries.iter()),
            };

        let batch: Vec<KeyValue> = candidates
            .filter(|(key, _)| self.options.admits(key))
            .take(self.batch_size)
            .map(|(key, value)| KeyValue {
                partition: self.partition,
                key: key.clone(),
                value: Some(value.clone()),
            })
            .collect();
        drop(inner);

        if batch.len() < self.batch_size {
            self.exhausted = true;
        }
        if let Some(last) = batch.last() {
            self.resume_after = Some(last.key.clone());
        }
        self.buffer.extend(batch);
        Ok(())
    }
}

impl Iterator for MemEntryStream {
    type Item = Result<KeyValue, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.fetch_batch() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

fn partition_of(key: &Key, partition_count: u32) -> PartitionId {
    let mut hasher = Crc32::new();
    for component in key.major_path() {
        hasher.update(component.as_bytes());
        hasher.update(b"/");
    }
    hasher.finalize() % partition_count.max(1) + 1
}

fn join_endpoints(endpoints: &[HostPort]) -> String {
    endpoints
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
