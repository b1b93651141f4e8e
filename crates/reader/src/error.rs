use store::{PartitionId, StoreError};
use thiserror::Error;

/// Errors that end a partition read.
#[derive(Debug, Error)]
pub enum ReadError {
    /// No session could be opened for the split. The whole split may be
    /// retried elsewhere.
    #[error("cannot open store '{store}' for partition {partition} via [{endpoints}]")]
    StoreConnection {
        store: String,
        partition: PartitionId,
        endpoints: String,
        #[source]
        source: StoreError,
    },

    /// The scan failed part way. Rows already yielded stay valid.
    #[error("reading partition {partition} of store '{store}' failed")]
    StoreRead {
        store: String,
        partition: PartitionId,
        #[source]
        source: StoreError,
    },

    #[error("{0} is not supported")]
    Unsupported(&'static str),
}
