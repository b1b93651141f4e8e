//! # Config - job configuration for partition-parallel store reads
//!
//! A job is described by flat `kv.*` properties, the same keys whether they
//! come from a `.properties` file or from the execution framework's job
//! settings:
//!
//! ```text
//! kv.host.port             host:port[,host:port...]   required
//! kv.name                  store name                  required
//! kv.major.keys.mapping    column[,column...]          required
//! kv.minor.keys.mapping    column[,column...]          default: value
//! kv.null.sentinel         absence marker              default: null
//! kv.scan.direction        UNORDERED|FORWARD|REVERSE   default: FORWARD
//! kv.scan.batch.size       u32                         default: 0 (store default)
//! kv.scan.parent.key       /major/.../-/minor/...
//! kv.scan.subrange         [a,b) | (a,] | [,b]
//! kv.scan.depth            CHILDREN_ONLY|DESCENDANTS_ONLY|PARENT_AND_CHILDREN|PARENT_AND_DESCENDANTS
//! kv.scan.consistency      NONE_REQUIRED|ABSOLUTE|TIME:<lag_ms>:<timeout_ms>
//! kv.scan.timeout          u64                         default: 0 (no timeout)
//! kv.scan.timeout.unit     NANOSECONDS..DAYS           required when timeout > 0
//! kv.ping.timeout.ms       u64                         default: 5000
//! ```

mod columns;
mod error;
mod job;
mod properties;

pub use columns::{ColumnMapping, DEFAULT_NULL_SENTINEL, DEFAULT_VALUE_COLUMN};
pub use error::ConfigError;
pub use job::{IterationParams, JobConfig, DEFAULT_PING_TIMEOUT};
pub use properties::{load_properties, parse_properties};

pub const KV_HOST_PORT: &str = "kv.host.port";
pub const KV_NAME: &str = "kv.name";
pub const KV_MAJOR_KEYS_MAPPING: &str = "kv.major.keys.mapping";
pub const KV_MINOR_KEYS_MAPPING: &str = "kv.minor.keys.mapping";
pub const KV_NULL_SENTINEL: &str = "kv.null.sentinel";
pub const KV_SCAN_DIRECTION: &str = "kv.scan.direction";
pub const KV_SCAN_BATCH_SIZE: &str = "kv.scan.batch.size";
pub const KV_SCAN_PARENT_KEY: &str = "kv.scan.parent.key";
pub const KV_SCAN_SUBRANGE: &str = "kv.scan.subrange";
pub const KV_SCAN_DEPTH: &str = "kv.scan.depth";
pub const KV_SCAN_CONSISTENCY: &str = "kv.scan.consistency";
pub const KV_SCAN_TIMEOUT: &str = "kv.scan.timeout";
pub const KV_SCAN_TIMEOUT_UNIT: &str = "kv.scan.timeout.unit";
pub const KV_PING_TIMEOUT_MS: &str = "kv.ping.timeout.ms";

#[cfg(test)]
mod tests;
