//! # Store - client boundary for a sharded, replicated key-value store
//!
//! Everything the split planner and the partition reader need from the store
//! lives here: the hierarchical [`Key`] model, iteration parameters, the
//! read-only [`Topology`] snapshot, and the three client traits the core is
//! written against.
//!
//! ```text
//! TopologyClient   locate(helper hosts) -> Topology, ping(replica)
//! StoreConnector   open(store name, endpoints) -> StoreSession
//! StoreSession     partition_scan(partition, options) -> EntryStream, close()
//! ```
//!
//! [`MemStore`] implements all three over an in-memory cluster. Keys are
//! assigned to partitions by `crc32(major path) % n + 1`, replicas can be
//! taken down individually, and scans are fetched lazily in batches.
//!
//! ## Key path form
//!
//! ```text
//! /major1/major2/-/minor1/minor2
//! ```
//!
//! A lone `-` component separates the major path from the minor path.

mod client;
mod error;
mod key;
mod mem;
mod options;
mod topology;

pub use client::{EntryStream, KeyValue, StoreConnector, StoreSession, TopologyClient};
pub use error::StoreError;
pub use key::{Key, KeyRange, MAX_ENCODED_LEN};
pub use mem::{MemSession, MemStore, NodeHealth, DEFAULT_BATCH_SIZE};
pub use options::{
    parse_host_list, Consistency, Depth, Direction, HostPort, ScanOptions, TimeUnit,
};
pub use topology::{
    PartitionId, RepGroupId, ReplicaNode, ReplicaState, ReplicaStatus, Topology,
    TopologyBuilder,
};
