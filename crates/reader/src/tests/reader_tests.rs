use crate::*;
use anyhow::Result;
use config::ColumnMapping;
use split::PartitionSplit;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use store::{
    EntryStream, HostPort, Key, KeyValue, MemStore, NodeHealth, PartitionId, ScanOptions,
    StoreConnector, StoreError, StoreSession,
};

fn columns() -> Result<ColumnMapping> {
    Ok(ColumnMapping::parse("table,id", None)?)
}

/// 4 partitions over 2 groups of 3, holding 40 users with a name each and
/// 10 bare keys.
fn sample_store() -> Result<MemStore> {
    let store = MemStore::uniform("kvstore", 4, 2, 3)?;
    for i in 0..40 {
        store.put(Key::parse(&format!("/user/{:02}/-/name", i))?, format!("n{}", i).into_bytes());
    }
    for i in 0..10 {
        store.put(Key::parse(&format!("/flag/{}", i))?, b"on".to_vec());
    }
    Ok(store)
}

fn split_for(store: &MemStore, partition: PartitionId) -> Result<PartitionSplit> {
    let topology = store.topology();
    let group = topology
        .rep_group(partition)
        .ok_or_else(|| anyhow::anyhow!("no group for {}", partition))?;
    let endpoints: Vec<HostPort> = topology.replicas(group).iter().map(|n| n.endpoint()).collect();
    let locations = endpoints.iter().map(|hp| hp.host.clone()).collect();
    Ok(PartitionSplit::builder("kvstore", partition)
        .helper_hosts(store.helper_hosts())
        .endpoints(endpoints)
        .locations(locations)
        .build()?)
}

fn read_all(store: &MemStore, partition: PartitionId) -> Result<Vec<(u64, RowFields)>> {
    let reader = PartitionRecordReader::open(store, &split_for(store, partition)?, &columns()?)?;
    Ok(reader.collect::<Result<Vec<_>, _>>()?)
}

// -------------------- Rows --------------------

#[test]
fn rows_map_key_structure_to_columns() -> Result<()> {
    let store = sample_store()?;
    let partition = store.partition_for(&Key::parse("/user/07")?);
    let rows = read_all(&store, partition)?;

    let (_, row) = rows
        .iter()
        .find(|(_, r)| r.get("id") == Some("07"))
        .ok_or_else(|| anyhow::anyhow!("user 07 missing"))?;
    assert_eq!(row.get("table"), Some("user"));
    assert_eq!(row.get("name"), Some("n7"));
    assert_eq!(row.len(), 3);
    Ok(())
}

#[test]
fn short_major_path_leaves_column_out() -> Result<()> {
    let store = MemStore::uniform("kvstore", 1, 1, 1)?;
    store.put(Key::parse("/solo")?, b"X".to_vec());
    let rows = read_all(&store, 1)?;
    assert_eq!(rows.len(), 1);
    let row = &rows[0].1;
    assert_eq!(row.get("table"), Some("solo"));
    assert_eq!(row.get("id"), None);
    assert_eq!(row.get("value"), Some("X"));

    let shaped = RowShape::new(columns()?).shape(row);
    assert_eq!(shaped.values, [Some("solo".to_string()), None, Some("X".to_string())]);
    Ok(())
}

#[test]
fn every_minor_segment_gets_the_value() -> Result<()> {
    let store = MemStore::uniform("kvstore", 1, 1, 1)?;
    store.put(Key::parse("/user/1/-/first/last")?, b"Ada".to_vec());
    let rows = read_all(&store, 1)?;
    let row = &rows[0].1;
    assert_eq!(row.get("first"), Some("Ada"));
    assert_eq!(row.get("last"), Some("Ada"));
    assert_eq!(row.get("value"), None);
    Ok(())
}

#[test]
fn null_sentinels_are_skipped() -> Result<()> {
    let store = MemStore::uniform("kvstore", 1, 1, 1)?;
    store.put(Key::parse("/null/2")?, b"null".to_vec());
    let rows = read_all(&store, 1)?;
    let row = &rows[0].1;
    assert_eq!(row.get("table"), None);
    assert_eq!(row.get("id"), Some("2"));
    assert_eq!(row.get("value"), None);
    assert_eq!(row.len(), 1);
    Ok(())
}

#[test]
fn custom_sentinel_applies_to_values_not_key_segments() -> Result<()> {
    let store = MemStore::uniform("kvstore", 1, 1, 1)?;
    store.put(Key::parse("/null/2")?, b"X".to_vec());
    store.put(Key::parse("/t/3")?, b"\\N".to_vec());
    store.put(Key::parse("/t/4")?, b"null".to_vec());
    let mapping = columns()?.with_null_sentinel("\\N");

    let reader = PartitionRecordReader::open(&store, &split_for(&store, 1)?, &mapping)?;
    assert_eq!(PartitionRecordReader::partition(&reader), 1);
    let rows = ShapedRows::new(reader, RowShape::new(mapping))
        .map(|item| item.map(|(_, row)| row.values))
        .collect::<Result<Vec<_>, _>>()?;

    let some = |s: &str| Some(s.to_string());
    assert_eq!(
        rows,
        [
            vec![None, some("2"), some("X")],
            vec![some("t"), some("3"), None],
            vec![some("t"), some("4"), some("null")],
        ]
    );
    Ok(())
}

#[test]
fn invalid_utf8_values_are_replaced() -> Result<()> {
    let store = MemStore::uniform("kvstore", 1, 1, 1)?;
    store.put(Key::parse("/t/1")?, vec![b'o', 0xff, b'k']);
    store.put(Key::parse("/t/2")?, vec![0xc3]);
    let rows = read_all(&store, 1)?;
    assert_eq!(rows[0].1.get("value"), Some("o\u{fffd}k"));
    assert_eq!(rows[1].1.get("value"), Some("\u{fffd}"));
    Ok(())
}

#[test]
fn row_keys_count_from_zero() -> Result<()> {
    let store = sample_store()?;
    let partition = store.partition_for(&Key::parse("/user/00")?);
    let rows = read_all(&store, partition)?;
    let keys: Vec<u64> = rows.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, (0..rows.len() as u64).collect::<Vec<_>>());
    assert_eq!(rows.len(), store.partition_len(partition));
    Ok(())
}

#[test]
fn all_partitions_cover_the_store_once() -> Result<()> {
    let store = sample_store()?;
    let total: usize = (1..=4)
        .map(|p| read_all(&store, p).map(|rows| rows.len()))
        .sum::<Result<usize>>()?;
    assert_eq!(total, store.entry_count());
    Ok(())
}

#[test]
fn shaped_rows_over_a_reader() -> Result<()> {
    let store = sample_store()?;
    let partition = store.partition_for(&Key::parse("/flag/3")?);
    let mapping = ColumnMapping::parse("table,id", None)?;
    let reader = PartitionRecordReader::open(&store, &split_for(&store, partition)?, &mapping)?;
    let mut shaped = ShapedRows::new(reader, RowShape::new(mapping));
    assert_eq!(shaped.shape().field_count(), 3);
    for item in shaped.by_ref() {
        let (_, row) = item?;
        assert_eq!(row.values.len(), 3);
        assert!(row.get(0).is_some());
    }

    let reader = shaped.into_inner();
    assert_eq!(PartitionRecordReader::partition(&reader), partition);
    assert_eq!(reader.position() as usize, store.partition_len(partition));
    Ok(())
}

// -------------------- Progress and lifecycle --------------------

#[test]
fn progress_is_a_unit_fraction() -> Result<()> {
    let store = MemStore::uniform("kvstore", 1, 1, 1)?;
    store.put(Key::parse("/t/1")?, b"a".to_vec());
    store.put(Key::parse("/t/2")?, b"b".to_vec());
    let mut reader = PartitionRecordReader::open(&store, &split_for(&store, 1)?, &columns()?)?;
    assert_eq!(reader.progress(), 0.0);
    assert!(reader.next().is_some());
    assert_eq!(reader.position(), 1);
    assert_eq!(reader.progress(), 1.0);
    assert!(reader.next().is_some());
    assert_eq!(reader.progress(), 1.0);
    Ok(())
}

#[test]
fn close_releases_once_after_zero_rows() -> Result<()> {
    let store = sample_store()?;
    let mut reader = PartitionRecordReader::open(&store, &split_for(&store, 1)?, &columns()?)?;
    assert_eq!(store.open_sessions(), 1);
    reader.close();
    reader.close();
    assert!(reader.is_closed());
    assert!(reader.next().is_none());
    drop(reader);
    assert_eq!(store.sessions_closed(), 1);
    assert_eq!(store.open_sessions(), 0);
    Ok(())
}

#[test]
fn close_releases_once_after_some_rows() -> Result<()> {
    let store = sample_store()?;
    let partition = store.partition_for(&Key::parse("/user/00")?);
    let mut reader = PartitionRecordReader::open(&store, &split_for(&store, partition)?, &columns()?)?;
    assert!(reader.next().is_some());
    reader.close();
    assert!(reader.next().is_none());
    drop(reader);
    assert_eq!(store.sessions_opened(), 1);
    assert_eq!(store.sessions_closed(), 1);
    Ok(())
}

#[test]
fn drop_releases_once_after_all_rows() -> Result<()> {
    let store = sample_store()?;
    let reader = PartitionRecordReader::open(&store, &split_for(&store, 2)?, &columns()?)?;
    let rows = reader.count();
    assert_eq!(rows, store.partition_len(2));
    assert_eq!(store.sessions_closed(), 1);
    assert_eq!(store.open_sessions(), 0);
    Ok(())
}

// -------------------- Failures --------------------

#[test]
fn open_falls_back_past_dead_endpoints() -> Result<()> {
    let store = sample_store()?;
    store.set_node_health("rg1-rn1", NodeHealth::Unreachable)?;
    store.set_node_health("rg1-rn2", NodeHealth::Unreachable)?;
    assert_eq!(read_all(&store, 1)?.len(), store.partition_len(1));
    Ok(())
}

#[test]
fn open_fails_when_nothing_answers() -> Result<()> {
    let store = sample_store()?;
    let split = split_for(&store, 1)?;
    for node in store.topology().nodes() {
        store.set_node_health(&node.resource_id, NodeHealth::Unreachable)?;
    }
    match PartitionRecordReader::open(&store, &split, &columns()?) {
        Err(ReadError::StoreConnection { store: name, partition, endpoints, .. }) => {
            assert_eq!(name, "kvstore");
            assert_eq!(partition, 1);
            assert!(endpoints.starts_with("sn1.kv.local:5000"));
        }
        other => panic!("expected StoreConnection, got {:?}", other.map(|_| ())),
    }
    assert_eq!(store.sessions_opened(), 0);
    Ok(())
}

#[test]
fn open_fails_for_unknown_partition() -> Result<()> {
    let store = sample_store()?;
    let split = PartitionSplit::builder("kvstore", 9)
        .helper_hosts(store.helper_hosts())
        .build()?;
    let err = PartitionRecordReader::open(&store, &split, &columns()?).unwrap_err();
    assert!(matches!(err, ReadError::StoreRead { partition: 9, .. }));
    assert_eq!(store.open_sessions(), 0);
    Ok(())
}

#[test]
fn read_fault_ends_the_sequence() -> Result<()> {
    let store = sample_store()?;
    let partition = store.partition_for(&Key::parse("/user/00")?);
    let mut reader = PartitionRecordReader::open(&store, &split_for(&store, partition)?, &columns()?)?;
    store.set_read_fault(true);
    assert!(matches!(reader.next(), Some(Err(ReadError::StoreRead { .. }))));
    assert!(reader.next().is_none());
    store.set_read_fault(false);
    assert!(reader.next().is_none());
    drop(reader);
    assert_eq!(store.sessions_closed(), 1);
    Ok(())
}

// -------------------- Partition isolation --------------------

/// Connector whose scans return a fixed list, whatever partition is asked for.
#[derive(Clone, Default)]
struct LeakyConnector {
    entries: Vec<Result<KeyValue, String>>,
    closed: Arc<AtomicU64>,
    seen_endpoints: Arc<std::sync::Mutex<Vec<HostPort>>>,
}

struct LeakySession {
    entries: Vec<Result<KeyValue, String>>,
    closed: Arc<AtomicU64>,
}

impl StoreConnector for LeakyConnector {
    type Session = LeakySession;

    fn open(&self, _store_name: &str, endpoints: &[HostPort]) -> Result<LeakySession, StoreError> {
        if let Ok(mut seen) = self.seen_endpoints.lock() {
            seen.extend_from_slice(endpoints);
        }
        Ok(LeakySession {
            entries: self.entries.clone(),
            closed: self.closed.clone(),
        })
    }
}

impl StoreSession for LeakySession {
    fn partition_scan(&mut self, partition: PartitionId, _options: &ScanOptions) -> Result<EntryStream, StoreError> {
        let items: Vec<Result<KeyValue, StoreError>> = self
            .entries
            .iter()
            .cloned()
            .map(|e| e.map_err(|reason| StoreError::Read { partition, reason }))
            .collect();
        Ok(Box::new(items.into_iter()))
    }

    fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

fn entry(partition: PartitionId, path: &str) -> Result<KeyValue> {
    Ok(KeyValue {
        partition,
        key: Key::parse(path)?,
        value: Some(path.as_bytes().to_vec()),
    })
}

#[test]
fn foreign_partition_entries_are_never_yielded() -> Result<()> {
    let connector = LeakyConnector {
        entries: vec![
            Ok(entry(2, "/a/1")?),
            Ok(entry(3, "/b/1")?),
            Ok(entry(2, "/a/2")?),
            Ok(entry(1, "/c/1")?),
        ],
        ..LeakyConnector::default()
    };
    let split = PartitionSplit::builder("kvstore", 2).build()?;
    let rows: Vec<_> = PartitionRecordReader::open(&connector, &split, &columns()?)?
        .collect::<Result<Vec<_>, _>>()?;

    let tables: Vec<_> = rows.iter().filter_map(|(_, r)| r.get("table")).collect();
    assert_eq!(tables, ["a", "a"]);
    assert_eq!(rows[1].0, 1);
    assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn rows_before_a_failure_stay_valid() -> Result<()> {
    let connector = LeakyConnector {
        entries: vec![
            Ok(entry(1, "/a/1")?),
            Err("disk on fire".to_string()),
            Ok(entry(1, "/a/2")?),
        ],
        ..LeakyConnector::default()
    };
    let split = PartitionSplit::builder("kvstore", 1).build()?;
    let mut reader = PartitionRecordReader::open(&connector, &split, &columns()?)?;

    let (key, row) = reader.next().ok_or_else(|| anyhow::anyhow!("no first row"))??;
    assert_eq!(key, 0);
    assert_eq!(row.get("id"), Some("1"));
    assert!(matches!(reader.next(), Some(Err(ReadError::StoreRead { partition: 1, .. }))));
    assert!(reader.next().is_none());
    assert_eq!(reader.position(), 1);
    drop(reader);
    assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn endpoints_prefer_locations_then_helpers() -> Result<()> {
    let connector = LeakyConnector::default();
    let split = PartitionSplit::builder("kvstore", 1)
        .helper_hosts(vec![HostPort::new("h1", 1), HostPort::new("e2", 2)])
        .endpoints(vec![HostPort::new("e1", 1), HostPort::new("e2", 2), HostPort::new("e3", 3)])
        .locations(vec!["e3".to_string()])
        .build()?;
    let reader = PartitionRecordReader::open(&connector, &split, &columns()?)?;
    drop(reader);

    let seen = connector
        .seen_endpoints
        .lock()
        .map_err(|_| anyhow::anyhow!("poisoned"))?
        .clone();
    assert_eq!(
        seen,
        [
            HostPort::new("e3", 3),
            HostPort::new("e1", 1),
            HostPort::new("e2", 2),
            HostPort::new("h1", 1),
        ]
    );
    Ok(())
}
