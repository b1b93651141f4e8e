use crate::ConfigError;

/// Column that receives the value blob when no minor mapping is configured.
pub const DEFAULT_VALUE_COLUMN: &str = "value";

/// Default representation of an absent value.
pub const DEFAULT_NULL_SENTINEL: &str = "null";

/// Static mapping from key structure to column names.
///
/// Columns are ordered major first, then minor. Without a minor mapping the
/// minor side is the single column `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    major: Vec<String>,
    minor: Vec<String>,
    null_sentinel: String,
}

impl ColumnMapping {
    /// # Errors
    ///
    /// Rejects an empty major mapping, an empty minor mapping when one is
    /// given, and blank column names.
    pub fn new(major: Vec<String>, minor: Option<Vec<String>>) -> Result<Self, ConfigError> {
        if major.is_empty() {
            return Err(ConfigError::MissingRequired(crate::KV_MAJOR_KEYS_MAPPING));
        }
        check_names(crate::KV_MAJOR_KEYS_MAPPING, &major)?;

        let minor = match minor {
            Some(minor) => {
                if minor.is_empty() {
                    return Err(ConfigError::invalid(
                        crate::KV_MINOR_KEYS_MAPPING,
                        "",
                        "mapping is empty",
                    ));
                }
                check_names(crate::KV_MINOR_KEYS_MAPPING, &minor)?;
                minor
            }
            None => vec![DEFAULT_VALUE_COLUMN.to_string()],
        };

        Ok(Self {
            major,
            minor,
            null_sentinel: DEFAULT_NULL_SENTINEL.to_string(),
        })
    }

    /// Parses the comma-separated property forms.
    pub fn parse(major: &str, minor: Option<&str>) -> Result<Self, ConfigError> {
        Self::new(split_list(major), minor.map(split_list))
    }

    pub fn with_null_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.null_sentinel = sentinel.into();
        self
    }

    pub fn major(&self) -> &[String] {
        &self.major
    }

    pub fn minor(&self) -> &[String] {
        &self.minor
    }

    pub fn null_sentinel(&self) -> &str {
        &self.null_sentinel
    }

    /// Number of columns in a shaped row.
    pub fn field_count(&self) -> usize {
        self.major.len() + self.minor.len()
    }

    /// All column names in row order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.major.iter().chain(self.minor.iter()).map(String::as_str)
    }
}

fn split_list(list: &str) -> Vec<String> {
    if list.trim().is_empty() {
        return Vec::new();
    }
    list.split(',').map(|s| s.trim().to_string()).collect()
}

fn check_names(key: &'static str, names: &[String]) -> Result<(), ConfigError> {
    if names.iter().any(String::is_empty) {
        return Err(ConfigError::invalid(key, &names.join(","), "blank column name"));
    }
    Ok(())
}
