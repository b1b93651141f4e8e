//! Iteration parameters and endpoint addressing.
//!
//! Every enum has a canonical upper-case name. Split descriptors and job
//! configuration carry these names rather than numeric tags.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::{Key, KeyRange, StoreError};

/// Order in which a partition scan returns entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    Unordered,
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    pub fn name(self) -> &'static str {
        match self {
            Direction::Unordered => "UNORDERED",
            Direction::Forward => "FORWARD",
            Direction::Reverse => "REVERSE",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, StoreError> {
        match name {
            "UNORDERED" => Ok(Direction::Unordered),
            "FORWARD" => Ok(Direction::Forward),
            "REVERSE" => Ok(Direction::Reverse),
            _ => Err(unknown("direction", name)),
        }
    }
}

/// Which levels below the parent key a scan returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Depth {
    /// Only keys exactly one major component below the parent.
    ChildrenOnly,
    /// Every key strictly below the parent.
    DescendantsOnly,
    /// The parent and keys one major component below it.
    ParentAndChildren,
    /// The parent and every key below it.
    #[default]
    ParentAndDescendants,
}

impl Depth {
    pub fn name(self) -> &'static str {
        match self {
            Depth::ChildrenOnly => "CHILDREN_ONLY",
            Depth::DescendantsOnly => "DESCENDANTS_ONLY",
            Depth::ParentAndChildren => "PARENT_AND_CHILDREN",
            Depth::ParentAndDescendants => "PARENT_AND_DESCENDANTS",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, StoreError> {
        match name {
            "CHILDREN_ONLY" => Ok(Depth::ChildrenOnly),
            "DESCENDANTS_ONLY" => Ok(Depth::DescendantsOnly),
            "PARENT_AND_CHILDREN" => Ok(Depth::ParentAndChildren),
            "PARENT_AND_DESCENDANTS" => Ok(Depth::ParentAndDescendants),
            _ => Err(unknown("depth", name)),
        }
    }

    /// Returns `true` if a major path `extra` components below the parent is
    /// within this depth.
    pub fn admits(self, extra: usize) -> bool {
        match self {
            Depth::ChildrenOnly => extra == 1,
            Depth::DescendantsOnly => extra >= 1,
            Depth::ParentAndChildren => extra <= 1,
            Depth::ParentAndDescendants => true,
        }
    }
}

/// Read consistency requested from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Consistency {
    /// Any replica may serve the read.
    NoneRequired,
    /// Only the group master may serve the read.
    Absolute,
    /// A replica may serve the read if it lags the master by at most
    /// `permissible_lag_ms`, waiting up to `timeout_ms` to catch up.
    Time {
        permissible_lag_ms: u64,
        timeout_ms: u64,
    },
}

impl Consistency {
    pub fn name(self) -> &'static str {
        match self {
            Consistency::NoneRequired => "NONE_REQUIRED",
            Consistency::Absolute => "ABSOLUTE",
            Consistency::Time { .. } => "TIME",
        }
    }

    /// Parses `NONE_REQUIRED`, `ABSOLUTE` or `TIME:<lag_ms>:<timeout_ms>`.
    pub fn parse(text: &str) -> Result<Self, StoreError> {
        let mut parts = text.split(':');
        let head = parts.next().unwrap_or_default();
        let consistency = match head {
            "NONE_REQUIRED" => Consistency::NoneRequired,
            "ABSOLUTE" => Consistency::Absolute,
            "TIME" => {
                let mut millis = || {
                    parts
                        .next()
                        .and_then(|p| p.trim().parse::<u64>().ok())
                        .ok_or_else(|| unknown("consistency", text))
                };
                let permissible_lag_ms = millis()?;
                let timeout_ms = millis()?;
                Consistency::Time {
                    permissible_lag_ms,
                    timeout_ms,
                }
            }
            _ => return Err(unknown("consistency", text)),
        };
        if parts.next().is_some() {
            return Err(unknown("consistency", text));
        }
        Ok(consistency)
    }
}

/// Unit attached to a scan timeout value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    pub fn name(self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "NANOSECONDS",
            TimeUnit::Microseconds => "MICROSECONDS",
            TimeUnit::Milliseconds => "MILLISECONDS",
            TimeUnit::Seconds => "SECONDS",
            TimeUnit::Minutes => "MINUTES",
            TimeUnit::Hours => "HOURS",
            TimeUnit::Days => "DAYS",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, StoreError> {
        match name {
            "NANOSECONDS" => Ok(TimeUnit::Nanoseconds),
            "MICROSECONDS" => Ok(TimeUnit::Microseconds),
            "MILLISECONDS" => Ok(TimeUnit::Milliseconds),
            "SECONDS" => Ok(TimeUnit::Seconds),
            "MINUTES" => Ok(TimeUnit::Minutes),
            "HOURS" => Ok(TimeUnit::Hours),
            "DAYS" => Ok(TimeUnit::Days),
            _ => Err(unknown("time unit", name)),
        }
    }

    /// Converts `amount` of this unit into a [`Duration`], saturating on overflow.
    pub fn to_duration(self, amount: u64) -> Duration {
        match self {
            TimeUnit::Nanoseconds => Duration::from_nanos(amount),
            TimeUnit::Microseconds => Duration::from_micros(amount),
            TimeUnit::Milliseconds => Duration::from_millis(amount),
            TimeUnit::Seconds => Duration::from_secs(amount),
            TimeUnit::Minutes => Duration::from_secs(amount.saturating_mul(60)),
            TimeUnit::Hours => Duration::from_secs(amount.saturating_mul(60 * 60)),
            TimeUnit::Days => Duration::from_secs(amount.saturating_mul(24 * 60 * 60)),
        }
    }
}

/// A `host:port` network endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostPort {
    pub host: String,
    pub port: u16,
}

impl HostPort {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl FromStr for HostPort {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| StoreError::InvalidHostPort(s.to_string()))?;
        if host.is_empty() {
            return Err(StoreError::InvalidHostPort(s.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| StoreError::InvalidHostPort(s.to_string()))?;
        Ok(Self::new(host, port))
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Splits a comma-separated `host:port` list, trimming whitespace.
///
/// # Errors
///
/// Fails on an empty list, an empty entry, or an unparsable endpoint.
pub fn parse_host_list(list: &str) -> Result<Vec<HostPort>, StoreError> {
    let hosts = list
        .split(',')
        .map(str::parse::<HostPort>)
        .collect::<Result<Vec<_>, _>>()?;
    if hosts.is_empty() {
        return Err(StoreError::InvalidHostPort(list.to_string()));
    }
    Ok(hosts)
}

/// Everything a partition scan needs besides the partition id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pub direction: Direction,
    /// Entries fetched per round trip; `0` selects the store default.
    pub batch_size: u32,
    pub parent_key: Option<Key>,
    pub sub_range: Option<KeyRange>,
    pub depth: Depth,
    pub consistency: Option<Consistency>,
    /// `None` means no timeout.
    pub timeout: Option<Duration>,
}

impl ScanOptions {
    /// Returns `true` if `key` falls under the parent key, depth and sub-range.
    pub fn admits(&self, key: &Key) -> bool {
        let parent_len = match &self.parent_key {
            Some(parent) if !parent.is_major_prefix_of(key) => return false,
            Some(parent) => parent.major_path().len(),
            None => 0,
        };

        let extra = key.major_path().len() - parent_len;
        if !self.depth.admits(extra) {
            return false;
        }

        match &self.sub_range {
            Some(range) => key
                .major_path()
                .get(parent_len)
                .map(|component| range.contains(component))
                .unwrap_or(false),
            None => true,
        }
    }
}

fn unknown(kind: &'static str, name: &str) -> StoreError {
    StoreError::UnknownName {
        kind,
        name: name.to_string(),
    }
}
