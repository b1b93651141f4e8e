//! # Reader - partition entries to engine rows
//!
//! ```text
//! PartitionSplit --open--> PartitionRecordReader --(row key, RowFields)-->
//!                          ShapedRows / RowShape --(row key, ShapedRow)--> engine
//! ```
//!
//! A reader holds one store session for one partition. It never yields an
//! entry the store tags with another partition.
//!
//! Row building from a key `/m1/m2/-/n1/n2` with value `v` and major columns
//! `[a, b]`:
//!
//! ```text
//! a = m1, b = m2, n1 = v, n2 = v
//! ```
//!
//! With no minor path the value lands in the `value` column. Major components
//! past the configured columns are ignored; missing ones leave the column out.

mod error;
mod reader;
mod row;
mod write;

pub use error::ReadError;
pub use reader::PartitionRecordReader;
pub use row::{RowFields, RowShape, ShapedRow, ShapedRows};
pub use write::record_writer;

#[cfg(test)]
mod tests;
