use config::ColumnMapping;

use crate::ReadError;

/// Column name to string value, in insertion order.
///
/// Putting a column that is already present overwrites its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFields {
    fields: Vec<(String, String)>,
}

impl RowFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(c, v)| (c.as_str(), v.as_str()))
    }
}

/// Values in configured column order; `None` marks an absent column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapedRow {
    pub values: Vec<Option<String>>,
}

impl ShapedRow {
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(|v| v.as_deref())
    }
}

/// Projects [`RowFields`] onto the configured column order.
#[derive(Debug, Clone)]
pub struct RowShape {
    columns: ColumnMapping,
}

impl RowShape {
    pub fn new(columns: ColumnMapping) -> Self {
        Self { columns }
    }

    /// Major columns first, then minor columns.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.column_names()
    }

    pub fn field_count(&self) -> usize {
        self.columns.field_count()
    }

    /// A column missing from `row`, or holding the null sentinel, comes out
    /// as `None`.
    pub fn shape(&self, row: &RowFields) -> ShapedRow {
        let sentinel = self.columns.null_sentinel();
        let values = self
            .columns
            .column_names()
            .map(|column| {
                row.get(column)
                    .filter(|value| *value != sentinel)
                    .map(str::to_string)
            })
            .collect();
        ShapedRow { values }
    }
}

/// Runs every row of a reader through a [`RowShape`], keeping row keys.
pub struct ShapedRows<I> {
    rows: I,
    shape: RowShape,
}

impl<I> ShapedRows<I>
where
    I: Iterator<Item = Result<(u64, RowFields), ReadError>>,
{
    pub fn new(rows: I, shape: RowShape) -> Self {
        Self { rows, shape }
    }

    pub fn shape(&self) -> &RowShape {
        &self.shape
    }

    pub fn into_inner(self) -> I {
        self.rows
    }
}

impl<I> Iterator for ShapedRows<I>
where
    I: Iterator<Item = Result<(u64, RowFields), ReadError>>,
{
    type Item = Result<(u64, ShapedRow), ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.rows.next()?;
        Some(item.map(|(key, fields)| (key, self.shape.shape(&fields))))
    }
}
