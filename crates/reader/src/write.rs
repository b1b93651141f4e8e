use config::JobConfig;
use std::convert::Infallible;

use crate::ReadError;

/// The store is read-only through this path; asking for a writer always fails.
pub fn record_writer(job: &JobConfig) -> Result<Infallible, ReadError> {
    tracing::debug!(store = %job.store_name, "record writer requested");
    Err(ReadError::Unsupported("writing to the store"))
}
