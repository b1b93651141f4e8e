//! # Planner - one split per store partition
//!
//! ```text
//! helper hosts --locate--> Topology
//!   for partition in 1..=n:
//!     group    = rep_group(partition)
//!     replicas = ping each member once per group, keep the admitted ones
//!     split    = store identity + partition + endpoints + locations + iteration
//! ```
//!
//! A failed topology lookup is an error, never an empty plan. A failed ping
//! only drops that replica from the split.

mod error;
mod planner;
mod policy;

pub use error::PlanError;
pub use planner::SplitPlanner;
pub use policy::{ActiveMembers, ReplicaPolicy};

#[cfg(test)]
mod tests;
