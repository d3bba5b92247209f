//! Tables the logger provisions and the columns each collection writes.

use rdd_logger_domain::model::{ColumnFilter, ColumnSpec, ColumnType, TableSpec};

pub const GETINFO_TABLE: &str = "getinfo";
pub const STAKING_TABLE: &str = "getstakinginfo";
pub const PRICES_TABLE: &str = "prices";

pub const GETINFO_COLUMNS: &[&str] = &["balance", "txcount", "blocks", "moneysupply"];
pub const STAKING_COLUMNS: &[&str] = &[
    "staking",
    "averageweight",
    "totalweight",
    "netstakeweight",
    "expectedtime",
];

pub fn getinfo_table() -> TableSpec {
    TableSpec::new(
        GETINFO_TABLE,
        vec![
            ColumnSpec::new("balance", ColumnType::Double),
            ColumnSpec::new("txcount", ColumnType::Int),
            ColumnSpec::new("blocks", ColumnType::Int),
            ColumnSpec::new("moneysupply", ColumnType::Double),
        ],
    )
}

pub fn staking_table() -> TableSpec {
    TableSpec::new(
        STAKING_TABLE,
        vec![
            ColumnSpec::new("staking", ColumnType::Bool).not_null(false),
            ColumnSpec::new("averageweight", ColumnType::BigInt),
            ColumnSpec::new("totalweight", ColumnType::BigInt),
            ColumnSpec::new("netstakeweight", ColumnType::BigInt),
            ColumnSpec::new("expectedtime", ColumnType::BigInt),
        ],
    )
}

pub fn prices_table() -> TableSpec {
    TableSpec::new(
        PRICES_TABLE,
        vec![
            ColumnSpec::new("currency", ColumnType::VarChar(32)),
            ColumnSpec::new("price", ColumnType::Double),
            ColumnSpec::new("priceView", ColumnType::VarChar(64)),
        ],
    )
}

/// Every table the daemon writes to. `prices` is provisioned even when the
/// price logger is disabled so enabling it later needs no schema step.
pub fn logger_tables() -> Vec<TableSpec> {
    vec![getinfo_table(), staking_table(), prices_table()]
}

pub fn getinfo_filter() -> ColumnFilter {
    ColumnFilter::Only(GETINFO_COLUMNS)
}

pub fn staking_filter() -> ColumnFilter {
    ColumnFilter::Only(STAKING_COLUMNS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_lists_match_declared_columns() {
        assert!(getinfo_table().column_names().eq(GETINFO_COLUMNS.iter().copied()));
        assert!(staking_table().column_names().eq(STAKING_COLUMNS.iter().copied()));
    }

    #[test]
    fn staking_flag_is_not_null_with_zero_default() {
        let staking = &staking_table().columns[0];
        assert_eq!(staking.name, "staking");
        assert!(!staking.nullable);
    }
}
