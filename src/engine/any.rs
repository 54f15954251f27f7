//! SQLite and MySQL through `sqlx::Any`.

use super::{CopySource, Cursor, Dialect, Driver, Engine, Prepared, try_cell};
use crate::error::{Error, Result};
use crate::value::{Row, Value};
use async_trait::async_trait;
use futures::StreamExt;
use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, Column, Executor, Statement, Transaction, TypeInfo};

/// One connection, one transaction.
pub struct AnyEngine {
    dialect: Dialect,
    tx: Transaction<'static, Any>,
    next_id: usize,
}

impl AnyEngine {
    pub async fn connect(driver: Driver, url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();

        // A single connection keeps in-memory databases alive for the
        // whole session.
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        let tx = pool
            .begin()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        Ok(Self {
            dialect: driver.dialect(),
            tx,
            next_id: 0,
        })
    }
}

fn bind_value<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    value: &Value,
) -> Query<'q, Any, AnyArguments<'q>> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Bytes(v) => match std::str::from_utf8(v) {
            Ok(s) => query.bind(s.to_string()),
            Err(_) => query.bind(v.clone()),
        },
        Value::Timestamp(v) => query.bind(v.to_rfc3339()),
    }
}

/// Decode a row, guided by the column type name and falling back through
/// the common representations.
fn decode_row(row: &AnyRow) -> Row {
    use sqlx::Row as _;

    row.columns()
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let typed = match column.type_info().name() {
                "BOOL" | "BOOLEAN" => try_cell::<_, bool>(row, i).map(|v| v.map(Value::Bool)),
                "SMALLINT" | "INT" | "INTEGER" | "BIGINT" => {
                    try_cell::<_, i64>(row, i).map(|v| v.map(Value::Int))
                }
                "REAL" | "FLOAT" | "DOUBLE" => try_cell::<_, f64>(row, i).map(|v| v.map(Value::Float)),
                "BLOB" => try_cell::<_, Vec<u8>>(row, i).map(|v| v.map(Value::Bytes)),
                _ => None,
            };
            typed
                .or_else(|| try_cell::<_, String>(row, i).map(|v| v.map(Value::Text)))
                .or_else(|| try_cell::<_, i64>(row, i).map(|v| v.map(Value::Int)))
                .or_else(|| try_cell::<_, f64>(row, i).map(|v| v.map(Value::Float)))
                .or_else(|| try_cell::<_, Vec<u8>>(row, i).map(|v| v.map(Value::Bytes)))
                .or_else(|| try_cell::<_, bool>(row, i).map(|v| v.map(Value::Bool)))
                .flatten()
                .unwrap_or(Value::Null)
        })
        .collect()
}

#[async_trait]
impl Engine for AnyEngine {
    fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        tracing::debug!("{}", sql);
        let result = sqlx::query(sql)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| Error::engine(sql, e))?;
        Ok(result.rows_affected())
    }

    async fn prepare(&mut self, sql: &str) -> Result<Prepared> {
        Executor::prepare(&mut *self.tx, sql)
            .await
            .map_err(|e| Error::engine(sql, e))?;
        self.next_id += 1;
        Ok(Prepared {
            id: self.next_id,
            sql: sql.to_string(),
        })
    }

    async fn execute_prepared(&mut self, stmt: &Prepared, params: &[Value]) -> Result<u64> {
        let mut query = sqlx::query(&stmt.sql);
        for value in params {
            query = bind_value(query, value);
        }
        let result = query
            .execute(&mut *self.tx)
            .await
            .map_err(|e| Error::engine(stmt.sql.as_str(), e))?;
        Ok(result.rows_affected())
    }

    async fn close_prepared(&mut self, _stmt: Prepared) -> Result<()> {
        // Statements stay in the connection's statement cache.
        Ok(())
    }

    async fn copy_in(
        &mut self,
        table: &str,
        _columns: &[String],
        _source: &mut (dyn CopySource + Send),
    ) -> Result<u64> {
        Err(Error::Config(format!("COPY is not available for {}", table)))
    }

    async fn describe(&mut self, sql: &str) -> Result<Vec<(String, String)>> {
        let stmt = Executor::prepare(&mut *self.tx, sql)
            .await
            .map_err(|e| Error::engine(sql, e))?;
        Ok(stmt
            .columns()
            .iter()
            .map(|c| (c.name().to_string(), c.type_info().name().to_string()))
            .collect())
    }

    async fn query<'a>(&'a mut self, sql: &'a str) -> Result<Cursor<'a>> {
        let (columns, types) = self.describe(sql).await?.into_iter().unzip();
        tracing::debug!("{}", sql);
        let rows = sqlx::query(sql)
            .fetch(&mut *self.tx)
            .map(move |row| row.map(|r| decode_row(&r)).map_err(|e| Error::engine(sql, e)))
            .boxed();
        Ok(Cursor {
            columns,
            types,
            rows,
        })
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(|e| Error::engine("COMMIT", e))
    }
}
