use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;
use store::{
    parse_host_list, Consistency, Depth, Direction, HostPort, Key, KeyRange, ScanOptions,
    TimeUnit,
};
use tracing::debug;

use crate::*;

/// Default bound on each replica health ping during planning.
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_millis(5000);

/// Iteration parameters copied into every split of a job.
///
/// `Default` gives a forward, unbatched scan of everything in the partition
/// with store-default consistency and no timeout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationParams {
    pub direction: Direction,
    /// `0` selects the store default.
    pub batch_size: u32,
    pub parent_key: Option<Key>,
    pub sub_range: Option<KeyRange>,
    pub depth: Depth,
    pub consistency: Option<Consistency>,
    /// `0` means no timeout.
    pub timeout: u64,
    pub timeout_unit: Option<TimeUnit>,
}

impl IterationParams {
    /// Effective timeout, `None` when the value is zero or has no unit.
    pub fn timeout_duration(&self) -> Option<Duration> {
        match (self.timeout, self.timeout_unit) {
            (0, _) | (_, None) => None,
            (amount, Some(unit)) => Some(unit.to_duration(amount)),
        }
    }

    /// Converts into the options a store session scans with.
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            direction: self.direction,
            batch_size: self.batch_size,
            parent_key: self.parent_key.clone(),
            sub_range: self.sub_range.clone(),
            depth: self.depth,
            consistency: self.consistency,
            timeout: self.timeout_duration(),
        }
    }
}

/// Everything the planner and the readers need to know about one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    pub helper_hosts: Vec<HostPort>,
    pub store_name: String,
    pub columns: ColumnMapping,
    pub iteration: IterationParams,
    pub ping_timeout: Duration,
}

impl JobConfig {
    /// Creates a configuration with default iteration parameters.
    pub fn new(helper_hosts: Vec<HostPort>, store_name: impl Into<String>, columns: ColumnMapping) -> Self {
        Self {
            helper_hosts,
            store_name: store_name.into(),
            columns,
            iteration: IterationParams::default(),
            ping_timeout: DEFAULT_PING_TIMEOUT,
        }
    }

    /// Builds a configuration from `kv.*` properties.
    ///
    /// Blank values count as absent. Unknown keys are ignored so the same map
    /// can carry unrelated job settings.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingRequired`] for an absent host list, store name or
    /// major mapping; [`ConfigError::InvalidValue`] for anything unparsable.
    pub fn from_properties(props: &BTreeMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            props
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(ConfigError::MissingRequired(key));

        let hosts = require(KV_HOST_PORT)?;
        let helper_hosts =
            parse_host_list(hosts).map_err(|e| ConfigError::invalid(KV_HOST_PORT, hosts, e))?;
        let store_name = require(KV_NAME)?.to_string();

        let null_sentinel = get(KV_NULL_SENTINEL).unwrap_or(DEFAULT_NULL_SENTINEL);
        let columns = ColumnMapping::parse(require(KV_MAJOR_KEYS_MAPPING)?, get(KV_MINOR_KEYS_MAPPING))?
            .with_null_sentinel(null_sentinel);

        let mut iteration = IterationParams::default();
        if let Some(v) = get(KV_SCAN_DIRECTION) {
            iteration.direction =
                Direction::from_name(v).map_err(|e| ConfigError::invalid(KV_SCAN_DIRECTION, v, e))?;
        }
        if let Some(v) = get(KV_SCAN_BATCH_SIZE) {
            iteration.batch_size = parse_number(KV_SCAN_BATCH_SIZE, v)?;
        }
        if let Some(v) = get(KV_SCAN_PARENT_KEY) {
            iteration.parent_key =
                Some(Key::parse(v).map_err(|e| ConfigError::invalid(KV_SCAN_PARENT_KEY, v, e))?);
        }
        if let Some(v) = get(KV_SCAN_SUBRANGE) {
            iteration.sub_range =
                Some(KeyRange::parse(v).map_err(|e| ConfigError::invalid(KV_SCAN_SUBRANGE, v, e))?);
        }
        if let Some(v) = get(KV_SCAN_DEPTH) {
            iteration.depth =
                Depth::from_name(v).map_err(|e| ConfigError::invalid(KV_SCAN_DEPTH, v, e))?;
        }
        if let Some(v) = get(KV_SCAN_CONSISTENCY) {
            iteration.consistency = Some(
                Consistency::parse(v).map_err(|e| ConfigError::invalid(KV_SCAN_CONSISTENCY, v, e))?,
            );
        }
        if let Some(v) = get(KV_SCAN_TIMEOUT) {
            iteration.timeout = parse_number(KV_SCAN_TIMEOUT, v)?;
        }
        if let Some(v) = get(KV_SCAN_TIMEOUT_UNIT) {
            iteration.timeout_unit = Some(
                TimeUnit::from_name(v).map_err(|e| ConfigError::invalid(KV_SCAN_TIMEOUT_UNIT, v, e))?,
            );
        }
        if iteration.timeout > 0 && iteration.timeout_unit.is_none() {
            return Err(ConfigError::MissingRequired(KV_SCAN_TIMEOUT_UNIT));
        }

        let ping_timeout = match get(KV_PING_TIMEOUT_MS) {
            Some(v) => Duration::from_millis(parse_number(KV_PING_TIMEOUT_MS, v)?),
            None => DEFAULT_PING_TIMEOUT,
        };

        debug!(
            store = %store_name,
            helpers = helper_hosts.len(),
            columns = columns.field_count(),
            "job configuration loaded"
        );

        Ok(Self {
            helper_hosts,
            store_name,
            columns,
            iteration,
            ping_timeout,
        })
    }
}

fn parse_number<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| ConfigError::invalid(key, value, e))
}
