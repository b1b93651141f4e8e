use store::{Consistency, ReplicaNode, ReplicaStatus};

/// Decides whether a replica that answered its ping may serve a split.
///
/// Replicas that fail to answer are excluded before the policy is asked.
pub trait ReplicaPolicy: Send + Sync {
    fn admit(
        &self,
        node: &ReplicaNode,
        status: &ReplicaStatus,
        consistency: Option<Consistency>,
    ) -> bool;
}

/// Admits every replica that is an active member of its group, whatever the
/// requested consistency.
///
/// A master-only policy for [`Consistency::Absolute`] would plug in here.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveMembers;

impl ReplicaPolicy for ActiveMembers {
    fn admit(&self, _node: &ReplicaNode, status: &ReplicaStatus, _consistency: Option<Consistency>) -> bool {
        status.is_active()
    }
}
