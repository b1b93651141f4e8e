use byteorder::{BigEndian, WriteBytesExt};
use config::IterationParams;
use std::io::{self, Cursor, Read, Write};
use store::{
    Consistency, Depth, Direction, HostPort, Key, KeyRange, PartitionId, ScanOptions, StoreError,
    TimeUnit,
};

use crate::codec::*;
use crate::error::malformed;
use crate::SplitError;

/// One partition's read job.
///
/// Immutable once built; the only way in is [`PartitionSplitBuilder`] or
/// [`PartitionSplit::decode`].
#[derive(Clone, PartialEq, Eq)]
pub struct PartitionSplit {
    helper_hosts: Vec<HostPort>,
    store_name: String,
    partition_id: PartitionId,
    iteration: IterationParams,
    endpoints: Vec<HostPort>,
    locations: Vec<String>,
}

impl PartitionSplit {
    pub fn builder(store_name: impl Into<String>, partition_id: PartitionId) -> PartitionSplitBuilder {
        PartitionSplitBuilder::new(store_name, partition_id)
    }

    pub fn helper_hosts(&self) -> &[HostPort] {
        &self.helper_hosts
    }

    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    pub fn partition_id(&self) -> PartitionId {
        self.partition_id
    }

    pub fn iteration(&self) -> &IterationParams {
        &self.iteration
    }

    /// Replica endpoints a reader may open a session through.
    pub fn endpoints(&self) -> &[HostPort] {
        &self.endpoints
    }

    /// Hostnames of replicas that answered at planning time. May be empty.
    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    /// Nominal size; a partition's entry count is not known up front.
    pub fn length(&self) -> u64 {
        1
    }

    pub fn scan_options(&self) -> ScanOptions {
        self.iteration.scan_options()
    }

    /// Serializes into a fresh buffer.
    ///
    /// # Errors
    ///
    /// [`SplitError::Io`] with [`io::ErrorKind::InvalidInput`] if a single
    /// field exceeds the 16 MiB field limit.
    pub fn encode(&self) -> Result<Vec<u8>, SplitError> {
        let mut buf = Vec::with_capacity(256);
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    /// Writes the wire form:
    ///
    /// ```text
    /// [helpers: list<string>][store_name: string][partition_id: u32]
    /// [direction: string][batch_size: u32][parent_key: blob][sub_range: blob]
    /// [depth: string][consistency: string][lag_ms: u64][timeout_ms: u64]
    /// [timeout: u64][timeout_unit: string]
    /// [endpoints: list<string>][locations: list<string>]
    /// ```
    ///
    /// `lag_ms` and `timeout_ms` are present only when consistency is `TIME`.
    /// An empty enum string means default (direction, depth) or unset
    /// (consistency, timeout unit).
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let it = &self.iteration;

        write_strings(w, self.helper_hosts.iter().map(ToString::to_string))?;
        write_string(w, &self.store_name)?;
        w.write_u32::<BigEndian>(self.partition_id)?;

        write_string(w, it.direction.name())?;
        w.write_u32::<BigEndian>(it.batch_size)?;
        let parent_key = it.parent_key.as_ref().map(Key::to_bytes).transpose().map_err(invalid_input)?;
        write_blob(w, parent_key.as_deref())?;
        let sub_range = it.sub_range.as_ref().map(KeyRange::to_bytes).transpose().map_err(invalid_input)?;
        write_blob(w, sub_range.as_deref())?;
        write_string(w, it.depth.name())?;

        match it.consistency {
            None => write_string(w, "")?,
            Some(c) => {
                write_string(w, c.name())?;
                if let Consistency::Time {
                    permissible_lag_ms,
                    timeout_ms,
                } = c
                {
                    w.write_u64::<BigEndian>(permissible_lag_ms)?;
                    w.write_u64::<BigEndian>(timeout_ms)?;
                }
            }
        }
        w.write_u64::<BigEndian>(it.timeout)?;
        write_string(w, it.timeout_unit.map(TimeUnit::name).unwrap_or_default())?;

        write_strings(w, self.endpoints.iter().map(ToString::to_string))?;
        write_strings(w, self.locations.iter())?;
        Ok(())
    }

    /// Decodes a complete buffer.
    ///
    /// # Errors
    ///
    /// [`SplitError::MalformedSplit`] on truncation, trailing bytes, or any
    /// field that fails validation.
    pub fn decode(bytes: &[u8]) -> Result<Self, SplitError> {
        let mut cursor = Cursor::new(bytes);
        let split = Self::read_from(&mut cursor)?;
        let trailing = bytes.len() as u64 - cursor.position();
        if trailing > 0 {
            return Err(malformed(format!("{} trailing bytes", trailing)));
        }
        Ok(split)
    }

    /// Reads exactly one split from a stream, leaving anything after it unread.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, SplitError> {
        let helper_hosts = read_hosts(r, "helper hosts")?;
        let store_name = read_string(r, "store name")?;
        let partition_id = read_u32(r, "partition id")?;

        let direction = match read_string(r, "direction")?.as_str() {
            "" => Direction::default(),
            name => Direction::from_name(name).map_err(field_error("direction"))?,
        };
        let batch_size = read_u32(r, "batch size")?;
        let parent_key = read_blob(r, "parent key")?
            .map(|b| Key::from_bytes(&b))
            .transpose()
            .map_err(field_error("parent key"))?;
        let sub_range = read_blob(r, "sub-range")?
            .map(|b| KeyRange::from_bytes(&b))
            .transpose()
            .map_err(field_error("sub-range"))?;
        let depth = match read_string(r, "depth")?.as_str() {
            "" => Depth::default(),
            name => Depth::from_name(name).map_err(field_error("depth"))?,
        };
        let consistency = match read_string(r, "consistency")?.as_str() {
            "" => None,
            "TIME" => Some(Consistency::Time {
                permissible_lag_ms: read_u64(r, "consistency lag")?,
                timeout_ms: read_u64(r, "consistency timeout")?,
            }),
            "NONE_REQUIRED" => Some(Consistency::NoneRequired),
            "ABSOLUTE" => Some(Consistency::Absolute),
            other => return Err(malformed(format!("consistency: unknown name '{}'", other))),
        };
        let timeout = read_u64(r, "timeout")?;
        let timeout_unit = match read_string(r, "timeout unit")?.as_str() {
            "" => None,
            name => Some(TimeUnit::from_name(name).map_err(field_error("timeout unit"))?),
        };

        let endpoints = read_hosts(r, "endpoints")?;
        let locations = read_strings(r, "locations")?;

        PartitionSplitBuilder {
            helper_hosts,
            store_name,
            partition_id,
            iteration: IterationParams {
                direction,
                batch_size,
                parent_key,
                sub_range,
                depth,
                consistency,
                timeout,
                timeout_unit,
            },
            endpoints,
            locations,
        }
        .build()
    }
}

impl std::fmt::Debug for PartitionSplit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionSplit")
            .field("store", &self.store_name)
            .field("partition", &self.partition_id)
            .field("endpoints", &self.endpoints.len())
            .field("locations", &self.locations)
            .field("iteration", &self.iteration)
            .finish()
    }
}

/// Accumulates a split's fields; [`build`](Self::build) freezes them.
#[derive(Debug, Clone)]
pub struct PartitionSplitBuilder {
    helper_hosts: Vec<HostPort>,
    store_name: String,
    partition_id: PartitionId,
    iteration: IterationParams,
    endpoints: Vec<HostPort>,
    locations: Vec<String>,
}

impl PartitionSplitBuilder {
    pub fn new(store_name: impl Into<String>, partition_id: PartitionId) -> Self {
        Self {
            helper_hosts: Vec::new(),
            store_name: store_name.into(),
            partition_id,
            iteration: IterationParams::default(),
            endpoints: Vec::new(),
            locations: Vec::new(),
        }
    }

    pub fn helper_hosts(mut self, hosts: Vec<HostPort>) -> Self {
        self.helper_hosts = hosts;
        self
    }

    pub fn iteration(mut self, iteration: IterationParams) -> Self {
        self.iteration = iteration;
        self
    }

    pub fn endpoints(mut self, endpoints: Vec<HostPort>) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn locations(mut self, locations: Vec<String>) -> Self {
        self.locations = locations;
        self
    }

    /// # Errors
    ///
    /// [`SplitError::MalformedSplit`] if the partition id is 0 or the store
    /// name is empty.
    pub fn build(self) -> Result<PartitionSplit, SplitError> {
        if self.partition_id == 0 {
            return Err(malformed("partition id must be at least 1"));
        }
        if self.store_name.is_empty() {
            return Err(malformed("store name is empty"));
        }
        Ok(PartitionSplit {
            helper_hosts: self.helper_hosts,
            store_name: self.store_name,
            partition_id: self.partition_id,
            iteration: self.iteration,
            endpoints: self.endpoints,
            locations: self.locations,
        })
    }
}

fn read_hosts<R: Read>(r: &mut R, field: &'static str) -> Result<Vec<HostPort>, SplitError> {
    read_strings(r, field)?
        .iter()
        .map(|s| s.parse::<HostPort>().map_err(field_error(field)))
        .collect()
}

fn invalid_input(e: StoreError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, e)
}

fn field_error<E: std::fmt::Display>(field: &'static str) -> impl Fn(E) -> SplitError {
    move |e| malformed(format!("{}: {}", field, e))
}
