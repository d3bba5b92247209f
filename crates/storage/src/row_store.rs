use rdd_logger_domain::model::{Row, ScalarValue};
use rdd_logger_domain::storage::{RowStore, StorageError, StorageResult};
use sea_orm::sea_query::{Alias, Query, SimpleExpr};
use sea_orm::{ConnectionTrait, Value};

use crate::SeaOrmStorage;

#[async_trait::async_trait]
impl RowStore for SeaOrmStorage {
    async fn insert_row(&self, table: &str, row: &Row) -> StorageResult<()> {
        if row.is_empty() {
            return Err(StorageError::write(table, "row has no columns"));
        }

        let mut insert = Query::insert();
        insert
            .into_table(Alias::new(table))
            .columns(row.columns().map(Alias::new))
            .values(row.values().map(to_expr))
            .map_err(|err| StorageError::write(table, err))?;

        let backend = self.backend();
        self.connection()
            .execute(backend.build(&insert))
            .await
            .map_err(|err| StorageError::write(table, err))?;
        Ok(())
    }
}

fn to_expr(value: &ScalarValue) -> SimpleExpr {
    let value = match value {
        ScalarValue::Integer(v) => Value::BigInt(Some(*v)),
        ScalarValue::Float(v) => Value::Double(Some(*v)),
        ScalarValue::Text(v) => Value::String(Some(Box::new(v.clone()))),
        ScalarValue::Bool(v) => Value::BigInt(Some(i64::from(*v))),
    };
    SimpleExpr::Value(value)
}
