use rdd_logger_domain::model::{ColumnDefault, ColumnSpec, ColumnType, ScalarValue, TableSpec};
use rdd_logger_domain::storage::{SchemaStore, StorageError, StorageResult};
use sea_orm::sea_query::{Alias, ColumnDef, Expr, Table, TableCreateStatement};
use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};
use tracing::debug;

use crate::SeaOrmStorage;

const MYSQL_CHARSET: &str = "utf8mb4";
const MYSQL_COLLATION: &str = "utf8mb4_general_ci";

#[async_trait::async_trait]
impl SchemaStore for SeaOrmStorage {
    async fn table_exists(&self, table: &str) -> StorageResult<bool> {
        let backend = self.backend();
        let sql = match backend {
            DatabaseBackend::MySql => {
                "SELECT COUNT(*) AS cnt FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_name = ?"
            }
            DatabaseBackend::Postgres => {
                "SELECT COUNT(*) AS cnt FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_name = $1"
            }
            DatabaseBackend::Sqlite => {
                "SELECT COUNT(*) AS cnt FROM sqlite_master WHERE type = 'table' AND name = ?"
            }
        };
        let stmt = Statement::from_sql_and_values(backend, sql, [table.into()]);
        let row = self
            .connection()
            .query_one(stmt)
            .await
            .map_err(StorageError::from_source)?
            .ok_or_else(|| StorageError::Database("catalog query returned no rows".into()))?;
        let count: i64 = row.try_get("", "cnt").map_err(StorageError::from_source)?;
        Ok(count > 0)
    }

    async fn create_table(&self, spec: &TableSpec) -> StorageResult<()> {
        let backend = self.backend();
        let statement = backend.build(&create_statement(backend, spec));
        debug!(table = spec.name, sql = %statement.sql, "creating table");
        self.connection()
            .execute(statement)
            .await
            .map_err(|err| StorageError::schema(spec.name, err))?;
        Ok(())
    }
}

/// Builds `CREATE TABLE` with the implicit `id` key first, the declared
/// columns in order and the `created` timestamp last.
pub(crate) fn create_statement(backend: DatabaseBackend, spec: &TableSpec) -> TableCreateStatement {
    let mut statement = Table::create();
    statement
        .table(Alias::new(spec.name))
        .if_not_exists()
        .col(
            ColumnDef::new(Alias::new("id"))
                .integer()
                .not_null()
                .auto_increment()
                .primary_key(),
        );

    for column in &spec.columns {
        statement.col(&mut column_def(column));
    }

    statement.col(
        ColumnDef::new(Alias::new("created"))
            .date_time()
            .null()
            .default(Expr::current_timestamp()),
    );

    if backend == DatabaseBackend::MySql {
        statement
            .character_set(MYSQL_CHARSET)
            .collate(MYSQL_COLLATION);
    }

    statement.to_owned()
}

fn column_def(column: &ColumnSpec) -> ColumnDef {
    let mut def = ColumnDef::new(Alias::new(column.name));
    match column.column_type {
        ColumnType::Bool => def.boolean(),
        ColumnType::Int => def.integer(),
        ColumnType::BigInt => def.big_integer(),
        ColumnType::Double => def.double(),
        ColumnType::VarChar(len) => def.string_len(len),
    };

    if column.nullable {
        def.null();
    } else {
        def.not_null();
    }

    if let ColumnDefault::Value(value) = &column.default {
        match value {
            ScalarValue::Integer(v) => def.default(*v),
            ScalarValue::Float(v) => def.default(*v),
            ScalarValue::Text(v) => def.default(v.clone()),
            ScalarValue::Bool(v) => def.default(i64::from(*v)),
        };
    }

    def
}
