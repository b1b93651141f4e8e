//! # Split - one partition's read job, and its wire form
//!
//! A [`PartitionSplit`] is built once by the planner, encoded, shipped to a
//! worker, decoded and handed to exactly one reader. It carries everything
//! the reader needs: store identity, the partition id, replica endpoints,
//! locality hints and the job's iteration parameters.
//!
//! ## Wire format
//!
//! All integers are big-endian. Strings are a `u32` byte length followed by
//! UTF-8. Optional blobs use the same framing with length `0` meaning absent,
//! so an empty blob and an absent one decode the same way.
//!
//! ```text
//! [helper hosts][store name][partition id]
//! [direction][batch size][parent key][sub-range][depth]
//! [consistency (+ lag, timeout when TIME)][timeout][timeout unit]
//! [endpoints][locations]
//! ```

mod codec;
mod descriptor;
mod error;

pub use codec::{read_blob, read_string, write_blob, write_string, MAX_FIELD_LEN};
pub use descriptor::{PartitionSplit, PartitionSplitBuilder};
pub use error::SplitError;
