//! Hierarchical keys and sub-ranges, with their binary encodings.
//!
//! ## Key encoding (big-endian)
//!
//! ```text
//! [major_count: u32][len: u32][utf8]...[minor_count: u32][len: u32][utf8]...
//! ```
//!
//! ## KeyRange encoding (big-endian)
//!
//! ```text
//! [flags: u8][start_len: u32][start]?[end_len: u32][end]?
//! flags: 0x1 has start, 0x2 start inclusive, 0x4 has end, 0x8 end inclusive
//! ```
//!
//! Neither encoding is ever empty, so both survive the zero-length-means-absent
//! blob convention used by split descriptors. Every length and count is at
//! most [`MAX_ENCODED_LEN`].

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;

use crate::StoreError;

/// Component that separates the major path from the minor path in key paths.
const MINOR_SEPARATOR: &str = "-";

/// Upper bound on a component's byte length, and on a path's component count,
/// in the binary forms.
pub const MAX_ENCODED_LEN: usize = 16 * 1024 * 1024;

const HAS_START: u8 = 0x1;
const START_INCLUSIVE: u8 = 0x2;
const HAS_END: u8 = 0x4;
const END_INCLUSIVE: u8 = 0x8;

/// A hierarchical store key: a major path followed by an optional minor path.
///
/// Keys order component-wise, major path first, which is the order a forward
/// scan returns them in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    major: Vec<String>,
    minor: Vec<String>,
}

impl Key {
    pub fn new(major: Vec<String>, minor: Vec<String>) -> Self {
        Self { major, minor }
    }

    /// Builds a key with only major components.
    pub fn from_major<I, S>(major: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            major: major.into_iter().map(Into::into).collect(),
            minor: Vec::new(),
        }
    }

    pub fn major_path(&self) -> &[String] {
        &self.major
    }

    pub fn minor_path(&self) -> &[String] {
        &self.minor
    }

    /// Parses the `/major/.../-/minor/...` path form.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] if the path does not start with `/`,
    /// has an empty component, repeats the `-` separator, or has no major
    /// component.
    pub fn parse(path: &str) -> Result<Self, StoreError> {
        let rest = path
            .strip_prefix('/')
            .ok_or_else(|| StoreError::InvalidKey(format!("'{}' must start with '/'", path)))?;

        let mut major = Vec::new();
        let mut minor = Vec::new();
        let mut in_minor = false;

        for component in rest.split('/') {
            if component.is_empty() {
                return Err(StoreError::InvalidKey(format!(
                    "'{}' has an empty component",
                    path
                )));
            }
            if component == MINOR_SEPARATOR {
                if in_minor {
                    return Err(StoreError::InvalidKey(format!(
                        "'{}' repeats the minor separator",
                        path
                    )));
                }
                in_minor = true;
                continue;
            }
            if in_minor {
                minor.push(component.to_string());
            } else {
                major.push(component.to_string());
            }
        }

        if major.is_empty() {
            return Err(StoreError::InvalidKey(format!(
                "'{}' has no major component",
                path
            )));
        }

        Ok(Self { major, minor })
    }

    /// Returns `true` if this key's major path is a prefix of `other`'s.
    pub fn is_major_prefix_of(&self, other: &Key) -> bool {
        other.major.len() >= self.major.len() && other.major[..self.major.len()] == self.major[..]
    }

    /// Encodes the key into its binary form.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] if a component or a path is longer
    /// than [`MAX_ENCODED_LEN`].
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        let mut buf = Vec::with_capacity(16);
        write_components(&mut buf, &self.major)?;
        write_components(&mut buf, &self.minor)?;
        Ok(buf)
    }

    /// Decodes a key produced by [`Key::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] on truncated input, invalid UTF-8,
    /// or trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        let mut r = bytes;
        let major = read_components(&mut r)?;
        let minor = read_components(&mut r)?;
        if !r.is_empty() {
            return Err(StoreError::InvalidKey(format!(
                "{} trailing bytes after key",
                r.len()
            )));
        }
        Ok(Self { major, minor })
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for component in &self.major {
            write!(f, "/{}", component)?;
        }
        if !self.minor.is_empty() {
            write!(f, "/{}", MINOR_SEPARATOR)?;
            for component in &self.minor {
                write!(f, "/{}", component)?;
            }
        }
        Ok(())
    }
}

/// A lexicographic bound on the major component directly below a parent key.
///
/// At least one side is bounded. An unbounded side is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyRange {
    start: Option<String>,
    start_inclusive: bool,
    end: Option<String>,
    end_inclusive: bool,
}

impl KeyRange {
    /// Creates a range, rejecting fully unbounded and inverted ranges.
    pub fn new(
        start: Option<String>,
        start_inclusive: bool,
        end: Option<String>,
        end_inclusive: bool,
    ) -> Result<Self, StoreError> {
        if start.is_none() && end.is_none() {
            return Err(StoreError::InvalidKey(
                "key range must bound at least one side".to_string(),
            ));
        }
        if let (Some(s), Some(e)) = (&start, &end) {
            let empty = s > e || (s == e && !(start_inclusive && end_inclusive));
            if empty {
                return Err(StoreError::InvalidKey(format!(
                    "key range start '{}' is past end '{}'",
                    s, e
                )));
            }
        }
        Ok(Self {
            start,
            start_inclusive,
            end,
            end_inclusive,
        })
    }

    /// Parses interval notation: `[a,b)`, `(a,]`, `[,b]`.
    pub fn parse(text: &str) -> Result<Self, StoreError> {
        let text = text.trim();
        let invalid = || StoreError::InvalidKey(format!("'{}' is not an interval", text));

        let start_inclusive = match text.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(invalid()),
        };
        let end_inclusive = match text.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(invalid()),
        };
        if text.len() < 2 {
            return Err(invalid());
        }

        let body = &text[1..text.len() - 1];
        let (start, end) = body.split_once(',').ok_or_else(invalid)?;
        let bound = |s: &str| {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        };

        Self::new(bound(start), start_inclusive, bound(end), end_inclusive)
    }

    pub fn start(&self) -> Option<&str> {
        self.start.as_deref()
    }

    pub fn end(&self) -> Option<&str> {
        self.end.as_deref()
    }

    pub fn start_inclusive(&self) -> bool {
        self.start_inclusive
    }

    pub fn end_inclusive(&self) -> bool {
        self.end_inclusive
    }

    /// Returns `true` if `component` lies inside the range.
    pub fn contains(&self, component: &str) -> bool {
        let above_start = match &self.start {
            None => true,
            Some(s) if self.start_inclusive => component >= s.as_str(),
            Some(s) => component > s.as_str(),
        };
        let below_end = match &self.end {
            None => true,
            Some(e) if self.end_inclusive => component <= e.as_str(),
            Some(e) => component < e.as_str(),
        };
        above_start && below_end
    }

    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] if a bound is longer than
    /// [`MAX_ENCODED_LEN`].
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        let mut flags = 0u8;
        if self.start.is_some() {
            flags |= HAS_START;
        }
        if self.start_inclusive {
            flags |= START_INCLUSIVE;
        }
        if self.end.is_some() {
            flags |= HAS_END;
        }
        if self.end_inclusive {
            flags |= END_INCLUSIVE;
        }

        let mut buf = vec![flags];
        if let Some(s) = &self.start {
            write_component(&mut buf, s)?;
        }
        if let Some(e) = &self.end {
            write_component(&mut buf, e)?;
        }
        Ok(buf)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        let mut r = bytes;
        let flags = r.read_u8().map_err(|_| truncated())?;
        if flags & !(HAS_START | START_INCLUSIVE | HAS_END | END_INCLUSIVE) != 0 {
            return Err(StoreError::InvalidKey(format!(
                "unknown key range flags {:#04x}",
                flags
            )));
        }
        let start = if flags & HAS_START != 0 {
            Some(read_component(&mut r)?)
        } else {
            None
        };
        let end = if flags & HAS_END != 0 {
            Some(read_component(&mut r)?)
        } else {
            None
        };
        if !r.is_empty() {
            return Err(StoreError::InvalidKey(format!(
                "{} trailing bytes after key range",
                r.len()
            )));
        }
        Self::new(
            start,
            flags & START_INCLUSIVE != 0,
            end,
            flags & END_INCLUSIVE != 0,
        )
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{},{}{}",
            if self.start_inclusive { '[' } else { '(' },
            self.start.as_deref().unwrap_or(""),
            self.end.as_deref().unwrap_or(""),
            if self.end_inclusive { ']' } else { ')' },
        )
    }
}

fn truncated() -> StoreError {
    StoreError::InvalidKey("truncated encoding".to_string())
}

fn write_len(buf: &mut Vec<u8>, len: usize, what: &str) -> Result<(), StoreError> {
    let len = u32::try_from(len)
        .ok()
        .filter(|&n| n as usize <= MAX_ENCODED_LEN)
        .ok_or_else(|| StoreError::InvalidKey(format!("{} of {} is too large to encode", what, len)))?;
    buf.write_u32::<BigEndian>(len)
        .map_err(|e| StoreError::InvalidKey(e.to_string()))
}

fn write_component(buf: &mut Vec<u8>, component: &str) -> Result<(), StoreError> {
    write_len(buf, component.len(), "component length")?;
    buf.extend_from_slice(component.as_bytes());
    Ok(())
}

fn write_components(buf: &mut Vec<u8>, components: &[String]) -> Result<(), StoreError> {
    write_len(buf, components.len(), "component count")?;
    for component in components {
        write_component(buf, component)?;
    }
    Ok(())
}

fn read_component(r: &mut &[u8]) -> Result<String, StoreError> {
    let len = r.read_u32::<BigEndian>().map_err(|_| truncated())? as usize;
    if len > r.len() {
        return Err(truncated());
    }
    let (head, tail) = r.split_at(len);
    let component = std::str::from_utf8(head)
        .map_err(|e| StoreError::InvalidKey(format!("component is not UTF-8: {}", e)))?
        .to_string();
    *r = tail;
    Ok(component)
}

fn read_components(r: &mut &[u8]) -> Result<Vec<String>, StoreError> {
    let count = r.read_u32::<BigEndian>().map_err(|_| truncated())? as usize;
    // every component needs at least its 4-byte length prefix
    if count > r.len() / 4 {
        return Err(truncated());
    }
    let mut components = Vec::with_capacity(count);
    for _ in 0..count {
        components.push(read_component(r)?);
    }
    Ok(components)
}
