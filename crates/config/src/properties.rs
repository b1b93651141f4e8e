//! Minimal Java-style `.properties` reader.
//!
//! Supports `key=value` and `key: value` lines, `#` / `!` comments and blank
//! lines. Later duplicates win. No escapes or line continuations.

use std::collections::BTreeMap;
use std::path::Path;

use crate::ConfigError;

/// Reads and parses a properties file.
pub fn load_properties<P: AsRef<Path>>(path: P) -> Result<BTreeMap<String, String>, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_properties(&text))
}

pub fn parse_properties(text: &str) -> BTreeMap<String, String> {
    let mut props = BTreeMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let split_at = line.find(|c| c == '=' || c == ':');
        let (key, value) = match split_at {
            Some(i) => (&line[..i], &line[i + 1..]),
            None => (line, ""),
        };
        props.insert(key.trim().to_string(), value.trim().to_string());
    }
    props
}
