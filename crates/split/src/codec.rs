//! Primitive encoders shared by the split wire format.
//!
//! ```text
//! string  [len: u32 BE][utf-8 bytes]
//! blob    [len: u32 BE][bytes]          len 0 = absent
//! list    [count: u32 BE][element...]
//! ```

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::error::malformed;
use crate::SplitError;

/// Upper bound on any single length prefix.
pub const MAX_FIELD_LEN: u32 = 16 * 1024 * 1024;

/// Upper bound on any element count; each element costs at least 4 bytes.
const MAX_COUNT: u32 = MAX_FIELD_LEN / 4;

pub fn write_string<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    write_len(w, s.len())?;
    w.write_all(s.as_bytes())
}

pub fn read_string<R: Read>(r: &mut R, field: &str) -> Result<String, SplitError> {
    let bytes = read_sized(r, field)?;
    String::from_utf8(bytes).map_err(|_| malformed(format!("{} is not valid UTF-8", field)))
}

/// Writes an optional blob. `None` and an empty blob encode identically.
pub fn write_blob<W: Write>(w: &mut W, blob: Option<&[u8]>) -> io::Result<()> {
    let blob = blob.unwrap_or_default();
    write_len(w, blob.len())?;
    w.write_all(blob)
}

/// Reads an optional blob. A zero length decodes as `None`.
pub fn read_blob<R: Read>(r: &mut R, field: &str) -> Result<Option<Vec<u8>>, SplitError> {
    let bytes = read_sized(r, field)?;
    Ok(if bytes.is_empty() { None } else { Some(bytes) })
}

pub(crate) fn write_strings<W, I, S>(w: &mut W, items: I) -> io::Result<()>
where
    W: Write,
    I: ExactSizeIterator<Item = S>,
    S: AsRef<str>,
{
    write_len(w, items.len())?;
    for item in items {
        write_string(w, item.as_ref())?;
    }
    Ok(())
}

pub(crate) fn read_strings<R: Read>(r: &mut R, field: &str) -> Result<Vec<String>, SplitError> {
    let count = read_u32(r, field)?;
    if count > MAX_COUNT {
        return Err(malformed(format!("{} count {} exceeds limit", field, count)));
    }
    (0..count).map(|_| read_string(r, field)).collect()
}

pub(crate) fn read_u32<R: Read>(r: &mut R, field: &str) -> Result<u32, SplitError> {
    r.read_u32::<BigEndian>().map_err(|e| truncated(e, field))
}

pub(crate) fn read_u64<R: Read>(r: &mut R, field: &str) -> Result<u64, SplitError> {
    r.read_u64::<BigEndian>().map_err(|e| truncated(e, field))
}

pub(crate) fn write_len<W: Write>(w: &mut W, len: usize) -> io::Result<()> {
    let len = u32::try_from(len)
        .ok()
        .filter(|&n| n <= MAX_FIELD_LEN)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "field too large to encode"))?;
    w.write_u32::<BigEndian>(len)
}

fn read_sized<R: Read>(r: &mut R, field: &str) -> Result<Vec<u8>, SplitError> {
    let len = read_u32(r, field)?;
    if len > MAX_FIELD_LEN {
        return Err(malformed(format!("{} length {} exceeds limit", field, len)));
    }
    let mut buf = Vec::new();
    r.by_ref().take(u64::from(len)).read_to_end(&mut buf)?;
    if buf.len() != len as usize {
        return Err(malformed(format!(
            "{} truncated: wanted {} bytes, got {}",
            field,
            len,
            buf.len()
        )));
    }
    Ok(buf)
}

fn truncated(e: io::Error, field: &str) -> SplitError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        malformed(format!("truncated before {}", field))
    } else {
        SplitError::Io(e)
    }
}
