use config::JobConfig;
use split::PartitionSplit;
use std::collections::BTreeMap;
use store::{HostPort, RepGroupId, ReplicaNode, Topology, TopologyClient};
use tracing::{debug, info, warn};

use crate::{ActiveMembers, PlanError, ReplicaPolicy};

/// Topology lookups are attempted once; retrying is the caller's business.
const LOOKUP_RETRIES: u32 = 0;

/// Turns a store's partition layout into one split per partition.
pub struct SplitPlanner<C> {
    client: C,
    job: JobConfig,
    policy: Box<dyn ReplicaPolicy>,
}

/// Replicas of one group that survived probing.
#[derive(Debug, Clone, Default)]
struct GroupProbe {
    endpoints: Vec<HostPort>,
    locations: Vec<String>,
}

impl<C: TopologyClient> SplitPlanner<C> {
    pub fn new(client: C, job: JobConfig) -> Self {
        Self {
            client,
            job,
            policy: Box::new(ActiveMembers),
        }
    }

    /// Replaces the default [`ActiveMembers`] policy.
    pub fn with_policy(mut self, policy: Box<dyn ReplicaPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn job(&self) -> &JobConfig {
        &self.job
    }

    /// Resolves the topology and emits one split per partition, ordered by
    /// partition id.
    ///
    /// Replicas that fail their ping or are rejected by the policy are left
    /// out of the split's endpoints and locations. A partition with no
    /// surviving replica still gets a split, with empty locations and every
    /// nominal replica endpoint.
    ///
    /// # Errors
    ///
    /// [`PlanError::TopologyUnavailable`] if no helper host resolves the
    /// topology. Planning never degrades this into an empty result.
    pub fn plan(&self) -> Result<Vec<PartitionSplit>, PlanError> {
        let job = &self.job;
        let topology = self
            .client
            .locate(&job.helper_hosts, LOOKUP_RETRIES)
            .map_err(|source| PlanError::TopologyUnavailable {
                store: job.store_name.clone(),
                helper_hosts: join(&job.helper_hosts),
                source,
            })?;

        let partitions = topology.partition_count();
        let mut probes: BTreeMap<RepGroupId, GroupProbe> = BTreeMap::new();
        let mut splits = Vec::with_capacity(partitions as usize);
        let mut unplaced = 0usize;

        for partition in 1..=partitions {
            let group = topology
                .rep_group(partition)
                .ok_or_else(|| PlanError::InvalidTopology {
                    store: job.store_name.clone(),
                    reason: format!("partition {} has no replication group", partition),
                })?;
            let probe = probes
                .entry(group)
                .or_insert_with(|| self.probe_group(&topology, group));

            let endpoints = if probe.endpoints.is_empty() {
                warn!(
                    store = %job.store_name,
                    partition,
                    group = %group,
                    "no reachable replica; split keeps all nominal endpoints"
                );
                unplaced += 1;
                topology.replicas(group).iter().map(ReplicaNode::endpoint).collect()
            } else {
                probe.endpoints.clone()
            };

            let split = PartitionSplit::builder(job.store_name.clone(), partition)
                .helper_hosts(job.helper_hosts.clone())
                .iteration(job.iteration.clone())
                .endpoints(endpoints)
                .locations(probe.locations.clone())
                .build()?;
            splits.push(split);
        }

        info!(
            store = %job.store_name,
            partitions,
            groups = probes.len(),
            unplaced,
            "split planning finished"
        );
        Ok(splits)
    }

    /// Pings every replica in `group` once.
    fn probe_group(&self, topology: &Topology, group: RepGroupId) -> GroupProbe {
        let consistency = self.job.iteration.consistency;
        let mut probe = GroupProbe::default();

        for node in topology.replicas(group) {
            let status = match self.client.ping(node, self.job.ping_timeout) {
                Ok(status) => status,
                Err(err) => {
                    warn!(
                        replica = %node.resource_id,
                        endpoint = %node.endpoint(),
                        error = %err,
                        "replica ping failed; excluding it"
                    );
                    continue;
                }
            };
            if !self.policy.admit(node, &status, consistency) {
                warn!(
                    replica = %node.resource_id,
                    endpoint = %node.endpoint(),
                    state = ?status.state,
                    "replica not admitted; excluding it"
                );
                continue;
            }

            debug!(replica = %node.resource_id, state = ?status.state, "replica admitted");
            probe.endpoints.push(node.endpoint());
            if !probe.locations.contains(&node.host) {
                probe.locations.push(node.host.clone());
            }
        }
        probe
    }
}

impl<C> std::fmt::Debug for SplitPlanner<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplitPlanner")
            .field("store", &self.job.store_name)
            .field("helper_hosts", &self.job.helper_hosts.len())
            .finish()
    }
}

fn join(hosts: &[HostPort]) -> String {
    hosts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
