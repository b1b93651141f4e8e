use thiserror::Error;

use crate::PartitionId;

/// Errors reported by the store client boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No helper host could resolve the cluster topology.
    #[error("topology lookup via [{helpers}] failed: {reason}")]
    TopologyLookup { helpers: String, reason: String },

    /// A topology snapshot violates its structural invariants.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// A replica did not answer its health ping.
    #[error("replica {resource_id} at {endpoint} unreachable: {reason}")]
    ReplicaUnreachable {
        resource_id: String,
        endpoint: String,
        reason: String,
    },

    /// A replica has no admin service bound, so it cannot be pinged.
    #[error("no admin service bound for replica {resource_id} at {endpoint}")]
    NoAdminService {
        resource_id: String,
        endpoint: String,
    },

    /// A session could not be opened through any of the given endpoints.
    #[error("cannot connect to store '{store}' via [{endpoints}]: {reason}")]
    Connection {
        store: String,
        endpoints: String,
        reason: String,
    },

    /// A scan failed while fetching entries.
    #[error("read from partition {partition} failed: {reason}")]
    Read {
        partition: PartitionId,
        reason: String,
    },

    /// A key path or encoded key could not be parsed.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A `host:port` endpoint could not be parsed.
    #[error("invalid host:port '{0}'")]
    InvalidHostPort(String),

    /// A canonical enum name was not recognised.
    #[error("unknown {kind} name '{name}'")]
    UnknownName { kind: &'static str, name: String },
}
