use super::snapshot::{ScalarValue, Snapshot};

/// Which snapshot fields make it into a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnFilter {
    /// Every field present in the snapshot, in snapshot order.
    All,
    /// Only the listed columns, in list order; absent fields are skipped.
    Only(&'static [&'static str]),
}

/// The persisted projection of a snapshot. Columns and values are kept as
/// pairs so an insert can never misalign them. Booleans are stored as 0/1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, ScalarValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(snapshot: &Snapshot, filter: ColumnFilter) -> Self {
        let mut row = Row::new();
        match filter {
            ColumnFilter::All => {
                for (name, value) in snapshot.iter() {
                    row.push(name, value.clone());
                }
            }
            ColumnFilter::Only(columns) => {
                for column in columns {
                    if let Some(value) = snapshot.get(column) {
                        row.push(*column, value.clone());
                    }
                }
            }
        }
        row
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.push(column, value.into());
        self
    }

    fn push(&mut self, column: impl Into<String>, value: ScalarValue) {
        let value = match value {
            ScalarValue::Bool(flag) => ScalarValue::Integer(i64::from(flag)),
            other => other,
        };
        self.cells.push((column.into(), value));
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(column, _)| column.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &ScalarValue> {
        self.cells.iter().map(|(_, value)| value)
    }

    pub fn get(&self, column: &str) -> Option<&ScalarValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
