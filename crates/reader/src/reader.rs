use config::{ColumnMapping, DEFAULT_NULL_SENTINEL, DEFAULT_VALUE_COLUMN};
use split::PartitionSplit;
use store::{EntryStream, HostPort, KeyValue, PartitionId, StoreConnector, StoreSession};
use tracing::{debug, warn};

use crate::{ReadError, RowFields};

/// Streams one partition's entries as [`RowFields`], tagged with a zero-based
/// row key.
///
/// The session is opened by [`open`](Self::open) and released exactly once,
/// by [`close`](Self::close) or on drop, however much of the scan was read.
/// After a read error the reader yields nothing more.
pub struct PartitionRecordReader<S: StoreSession> {
    session: Option<S>,
    entries: Option<EntryStream>,
    store_name: String,
    partition: PartitionId,
    major_columns: Vec<String>,
    null_sentinel: String,
    length: u64,
    position: u64,
    done: bool,
    warned_minor: bool,
    warned_lossy: bool,
}

impl<S: StoreSession> PartitionRecordReader<S> {
    /// Opens a session for `split` and starts its partition scan.
    ///
    /// # Errors
    ///
    /// [`ReadError::StoreConnection`] if no endpoint yields a session,
    /// [`ReadError::StoreRead`] if the scan cannot be started.
    pub fn open<C>(connector: &C, split: &PartitionSplit, columns: &ColumnMapping) -> Result<Self, ReadError>
    where
        C: StoreConnector<Session = S>,
    {
        let store_name = split.store_name().to_string();
        let partition = split.partition_id();
        let endpoints = session_endpoints(split);

        let iteration = split.iteration();
        if iteration.timeout > 0 && iteration.timeout_unit.is_none() {
            warn!(
                store = %store_name,
                partition,
                timeout = iteration.timeout,
                "scan timeout has no unit; reading without a timeout"
            );
        }

        let mut session = connector
            .open(&store_name, &endpoints)
            .map_err(|source| ReadError::StoreConnection {
                store: store_name.clone(),
                partition,
                endpoints: join(&endpoints),
                source,
            })?;

        let entries = match session.partition_scan(partition, &split.scan_options()) {
            Ok(entries) => entries,
            Err(source) => {
                session.close();
                return Err(ReadError::StoreRead {
                    store: store_name,
                    partition,
                    source,
                });
            }
        };
        debug!(store = %store_name, partition, "partition scan started");

        Ok(Self {
            session: Some(session),
            entries: Some(entries),
            store_name,
            partition,
            major_columns: columns.major().to_vec(),
            null_sentinel: columns.null_sentinel().to_string(),
            length: split.length(),
            position: 0,
            done: false,
            warned_minor: false,
            warned_lossy: false,
        })
    }

    pub fn partition(&self) -> PartitionId {
        self.partition
    }

    /// Rows yielded so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Rows read over the split's nominal length, capped at 1.
    pub fn progress(&self) -> f32 {
        if self.length == 0 {
            return 1.0;
        }
        (self.position as f32 / self.length as f32).min(1.0)
    }

    /// Stops the scan and releases the session. Later calls do nothing.
    pub fn close(&mut self) {
        self.done = true;
        self.entries = None;
        if let Some(mut session) = self.session.take() {
            session.close();
            debug!(
                store = %self.store_name,
                partition = self.partition,
                rows = self.position,
                "partition reader closed"
            );
        }
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_none()
    }

    /// Builds a row from one entry.
    ///
    /// Major components map positionally onto the major columns; missing
    /// components and a literal `null` component leave the column out. A value
    /// equal to the configured null sentinel is dropped. The value goes to the
    /// column named by each minor component, or to `value` when the key has no
    /// minor path.
    fn to_row(&mut self, entry: KeyValue) -> RowFields {
        let mut row = RowFields::new();
        for (column, component) in self.major_columns.iter().zip(entry.key.major_path()) {
            if component != DEFAULT_NULL_SENTINEL {
                row.put(column.clone(), component.clone());
            }
        }

        let value = match entry.value {
            Some(bytes) => match String::from_utf8(bytes) {
                Ok(value) => value,
                Err(err) => {
                    if !self.warned_lossy {
                        self.warned_lossy = true;
                        warn!(
                            store = %self.store_name,
                            partition = self.partition,
                            key = %entry.key,
                            "value is not valid UTF-8; invalid sequences replaced"
                        );
                    }
                    String::from_utf8_lossy(err.as_bytes()).into_owned()
                }
            },
            None => return row,
        };
        if value == self.null_sentinel {
            return row;
        }

        let minor = entry.key.minor_path();
        if minor.len() > 1 && !self.warned_minor {
            self.warned_minor = true;
            warn!(
                store = %self.store_name,
                partition = self.partition,
                key = %entry.key,
                "key has several minor components; each column gets the same whole value"
            );
        }
        match minor {
            [] => row.put(DEFAULT_VALUE_COLUMN, value),
            segments => {
                for segment in segments {
                    row.put(segment.clone(), value.clone());
                }
            }
        }
        row
    }
}

impl<S: StoreSession> Iterator for PartitionRecordReader<S> {
    type Item = Result<(u64, RowFields), ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let next = self.entries.as_mut()?.next();
            match next {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Err(source)) => {
                    self.done = true;
                    self.entries = None;
                    return Some(Err(ReadError::StoreRead {
                        store: self.store_name.clone(),
                        partition: self.partition,
                        source,
                    }));
                }
                Some(Ok(entry)) if entry.partition != self.partition => {
                    warn!(
                        partition = self.partition,
                        foreign = entry.partition,
                        key = %entry.key,
                        "dropping entry from another partition"
                    );
                }
                Some(Ok(entry)) => {
                    let row = self.to_row(entry);
                    let key = self.position;
                    self.position += 1;
                    return Some(Ok((key, row)));
                }
            }
        }
    }
}

impl<S: StoreSession> Drop for PartitionRecordReader<S> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<S: StoreSession> std::fmt::Debug for PartitionRecordReader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionRecordReader")
            .field("store", &self.store_name)
            .field("partition", &self.partition)
            .field("position", &self.position)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Endpoints on a location host first, then the rest, then any helper host
/// not already listed.
fn session_endpoints(split: &PartitionSplit) -> Vec<HostPort> {
    let locations = split.locations();
    let (mut ordered, rest): (Vec<HostPort>, Vec<HostPort>) = split
        .endpoints()
        .iter()
        .cloned()
        .partition(|hp| locations.contains(&hp.host));
    ordered.extend(rest);
    for helper in split.helper_hosts() {
        if !ordered.contains(helper) {
            ordered.push(helper.clone());
        }
    }
    ordered
}

fn join(hosts: &[HostPort]) -> String {
    hosts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
