use crate::*;
use anyhow::Result;
use config::{ColumnMapping, IterationParams, JobConfig};
use store::{
    Consistency, Direction, HostPort, MemStore, NodeHealth, ReplicaNode, ReplicaStatus,
    StoreError,
};

fn job_for(store: &MemStore) -> Result<JobConfig> {
    let columns = ColumnMapping::parse("table,id", None)?;
    Ok(JobConfig::new(store.helper_hosts(), "kvstore", columns))
}

fn planner(store: &MemStore) -> Result<SplitPlanner<MemStore>> {
    Ok(SplitPlanner::new(store.clone(), job_for(store)?))
}

fn hp(s: &str) -> HostPort {
    HostPort::new(s, 5000)
}

#[test]
fn one_split_per_partition_in_order() -> Result<()> {
    let store = MemStore::uniform("kvstore", 8, 3, 2)?;
    let splits = planner(&store)?.plan()?;
    let ids: Vec<u32> = splits.iter().map(|s| s.partition_id()).collect();
    assert_eq!(ids, (1..=8).collect::<Vec<_>>());
    for split in &splits {
        assert_eq!(split.store_name(), "kvstore");
        assert_eq!(split.helper_hosts(), store.helper_hosts().as_slice());
        assert_eq!(split.endpoints().len(), 2);
        assert_eq!(split.locations().len(), 2);
    }
    Ok(())
}

#[test]
fn locations_follow_the_partition_group() -> Result<()> {
    let store = MemStore::uniform("kvstore", 4, 2, 3)?;
    let splits = planner(&store)?.plan()?;
    // odd partitions live in rg1 (sn1..sn3), even ones in rg2 (sn4..sn6)
    assert_eq!(splits[0].locations(), ["sn1.kv.local", "sn2.kv.local", "sn3.kv.local"]);
    assert_eq!(splits[1].locations(), ["sn4.kv.local", "sn5.kv.local", "sn6.kv.local"]);
    assert_eq!(splits[2].endpoints(), splits[0].endpoints());
    Ok(())
}

#[test]
fn unreachable_replica_is_excluded() -> Result<()> {
    let store = MemStore::uniform("kvstore", 4, 2, 3)?;
    store.set_node_health("rg1-rn2", NodeHealth::Unreachable)?;
    store.set_node_health("rg2-rn3", NodeHealth::Unbound)?;

    let splits = planner(&store)?.plan()?;
    assert_eq!(splits.len(), 4);
    assert_eq!(splits[0].locations(), ["sn1.kv.local", "sn3.kv.local"]);
    assert_eq!(splits[0].endpoints(), [hp("sn1.kv.local"), hp("sn3.kv.local")]);
    assert_eq!(splits[1].locations(), ["sn4.kv.local", "sn5.kv.local"]);
    assert_eq!(splits[3].locations().len(), 2);
    Ok(())
}

#[test]
fn detached_replica_is_excluded() -> Result<()> {
    let store = MemStore::uniform("kvstore", 2, 1, 3)?;
    store.set_node_health("rg1-rn1", NodeHealth::Detached)?;
    let splits = planner(&store)?.plan()?;
    for split in &splits {
        assert_eq!(split.locations(), ["sn2.kv.local", "sn3.kv.local"]);
    }
    Ok(())
}

#[test]
fn group_without_live_replicas_keeps_nominal_endpoints() -> Result<()> {
    let store = MemStore::uniform("kvstore", 4, 2, 3)?;
    for id in ["rg2-rn1", "rg2-rn2", "rg2-rn3"] {
        store.set_node_health(id, NodeHealth::Unreachable)?;
    }

    let splits = planner(&store)?.plan()?;
    assert_eq!(splits.len(), 4);
    for split in splits.iter().filter(|s| s.partition_id() % 2 == 0) {
        assert!(split.locations().is_empty());
        assert_eq!(
            split.endpoints(),
            [hp("sn4.kv.local"), hp("sn5.kv.local"), hp("sn6.kv.local")]
        );
    }
    assert_eq!(splits[0].locations().len(), 3);
    Ok(())
}

#[test]
fn lookup_failure_is_an_error() -> Result<()> {
    let store = MemStore::uniform("kvstore", 4, 2, 3)?;
    store.set_lookup_failure(true);
    match planner(&store)?.plan() {
        Err(PlanError::TopologyUnavailable { store, source, .. }) => {
            assert_eq!(store, "kvstore");
            assert!(matches!(source, StoreError::TopologyLookup { .. }));
        }
        other => panic!("expected TopologyUnavailable, got {:?}", other),
    }
    Ok(())
}

#[test]
fn unknown_helpers_are_an_error() -> Result<()> {
    let store = MemStore::uniform("kvstore", 4, 2, 3)?;
    let mut job = job_for(&store)?;
    job.helper_hosts = vec![HostPort::new("elsewhere", 1)];
    let err = SplitPlanner::new(store, job).plan().unwrap_err();
    assert!(err.to_string().contains("elsewhere:1"));
    Ok(())
}

#[test]
fn iteration_params_are_copied_into_every_split() -> Result<()> {
    let store = MemStore::uniform("kvstore", 3, 1, 1)?;
    let mut job = job_for(&store)?;
    job.iteration = IterationParams {
        direction: Direction::Reverse,
        batch_size: 17,
        consistency: Some(Consistency::Absolute),
        ..IterationParams::default()
    };
    let splits = SplitPlanner::new(store, job.clone()).plan()?;
    for split in &splits {
        assert_eq!(split.iteration(), &job.iteration);
    }
    Ok(())
}

struct MastersOnly;

impl ReplicaPolicy for MastersOnly {
    fn admit(&self, _node: &ReplicaNode, status: &ReplicaStatus, consistency: Option<Consistency>) -> bool {
        match consistency {
            Some(Consistency::Absolute) => status.is_master(),
            _ => status.is_active(),
        }
    }
}

#[test]
fn custom_policy_narrows_replicas() -> Result<()> {
    let store = MemStore::uniform("kvstore", 2, 1, 3)?;
    let mut job = job_for(&store)?;
    job.iteration.consistency = Some(Consistency::Absolute);

    let splits = SplitPlanner::new(store.clone(), job)
        .with_policy(Box::new(MastersOnly))
        .plan()?;
    assert_eq!(splits[0].locations(), ["sn1.kv.local"]);

    // the master moves when it goes down
    store.set_node_health("rg1-rn1", NodeHealth::Unreachable)?;
    let mut job = job_for(&store)?;
    job.iteration.consistency = Some(Consistency::Absolute);
    let splits = SplitPlanner::new(store, job)
        .with_policy(Box::new(MastersOnly))
        .plan()?;
    assert_eq!(splits[0].locations(), ["sn2.kv.local"]);
    Ok(())
}

#[test]
fn planned_splits_survive_the_wire() -> Result<()> {
    let store = MemStore::uniform("kvstore", 4, 2, 3)?;
    store.set_node_health("rg1-rn1", NodeHealth::Unreachable)?;
    for planned in planner(&store)?.plan()? {
        let decoded = split::PartitionSplit::decode(&planned.encode()?)?;
        assert_eq!(decoded, planned);
    }
    Ok(())
}
