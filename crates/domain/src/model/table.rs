use super::snapshot::ScalarValue;

/// SQL column types the logger tables use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Bool,
    Int,
    BigInt,
    Double,
    VarChar(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnDefault {
    Null,
    Value(ScalarValue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub default: ColumnDefault,
}

impl ColumnSpec {
    /// Nullable column defaulting to `NULL`.
    pub const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            nullable: true,
            default: ColumnDefault::Null,
        }
    }

    pub fn not_null(mut self, default: impl Into<ScalarValue>) -> Self {
        self.nullable = false;
        self.default = ColumnDefault::Value(default.into());
        self
    }
}

/// Caller-declared columns of one table. The storage layer adds the `id`
/// primary key and the `created` timestamp itself.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    pub fn new(name: &'static str, columns: Vec<ColumnSpec>) -> Self {
        Self { name, columns }
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|column| column.name)
    }
}
