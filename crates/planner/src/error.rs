use split::SplitError;
use store::StoreError;
use thiserror::Error;

/// Errors that abort split planning.
///
/// Per-replica ping failures never surface here; they only shrink a split's
/// locality hints.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The topology could not be resolved through any helper host.
    #[error("topology for store '{store}' unavailable via [{helper_hosts}]")]
    TopologyUnavailable {
        store: String,
        helper_hosts: String,
        #[source]
        source: StoreError,
    },

    /// The resolved topology is internally inconsistent.
    #[error("invalid topology for store '{store}': {reason}")]
    InvalidTopology { store: String, reason: String },

    #[error(transparent)]
    Split(#[from] SplitError),
}
