//! PostgreSQL with a COPY FROM STDIN bulk path.

use super::{CopySource, Cursor, Dialect, Driver, Engine, Prepared, try_cell};
use crate::error::{Error, Result};
use crate::value::{Row, Value};
use async_trait::async_trait;
use futures::StreamExt;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Executor, Postgres, Statement, Transaction, TypeInfo};

pub struct PgEngine {
    dialect: Dialect,
    tx: Transaction<'static, Postgres>,
    next_id: usize,
}

impl PgEngine {
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        let tx = pool
            .begin()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        Ok(Self {
            dialect: Driver::Postgres.dialect(),
            tx,
            next_id: 0,
        })
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
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
        Value::Timestamp(v) => query.bind(*v),
    }
}

fn decode_row(row: &PgRow) -> Row {
    use sqlx::Row as _;

    row.columns()
        .iter()
        .enumerate()
        .map(|(i, column)| {
            let typed = match column.type_info().name() {
                "BOOL" => try_cell::<_, bool>(row, i).map(|v| v.map(Value::Bool)),
                "INT2" => try_cell::<_, i16>(row, i).map(|v| v.map(|n| Value::Int(n.into()))),
                "INT4" => try_cell::<_, i32>(row, i).map(|v| v.map(|n| Value::Int(n.into()))),
                "INT8" => try_cell::<_, i64>(row, i).map(|v| v.map(Value::Int)),
                "FLOAT4" => try_cell::<_, f32>(row, i).map(|v| v.map(|n| Value::Float(n.into()))),
                "FLOAT8" => try_cell::<_, f64>(row, i).map(|v| v.map(Value::Float)),
                "NUMERIC" => try_cell::<_, rust_decimal::Decimal>(row, i)
                    .map(|v| v.map(|d| Value::Text(d.to_string()))),
                "TIMESTAMPTZ" => try_cell::<_, chrono::DateTime<chrono::Utc>>(row, i)
                    .map(|v| v.map(Value::Timestamp)),
                "TIMESTAMP" => try_cell::<_, chrono::NaiveDateTime>(row, i)
                    .map(|v| v.map(|t| Value::Timestamp(t.and_utc()))),
                "DATE" => try_cell::<_, chrono::NaiveDate>(row, i)
                    .map(|v| v.map(|d| Value::Text(d.to_string()))),
                "BYTEA" => try_cell::<_, Vec<u8>>(row, i).map(|v| v.map(Value::Bytes)),
                _ => None,
            };
            typed
                .or_else(|| try_cell::<_, String>(row, i).map(|v| v.map(Value::Text)))
                .flatten()
                .unwrap_or_else(|| {
                    if !row.try_get_raw(i).is_ok_and(|raw| sqlx::ValueRef::is_null(&raw)) {
                        tracing::warn!(column = column.name(), "undecodable value loaded as NULL");
                    }
                    Value::Null
                })
        })
        .collect()
}

#[async_trait]
impl Engine for PgEngine {
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
        Ok(())
    }

    async fn copy_in(
        &mut self,
        table: &str,
        columns: &[String],
        source: &mut (dyn CopySource + Send),
    ) -> Result<u64> {
        let quoted: Vec<String> = columns.iter().map(|c| self.dialect.quote_ident(c)).collect();
        let sql = format!("COPY {} ({}) FROM STDIN", table, quoted.join(", "));
        tracing::debug!("{}", sql);

        let mut copy = self
            .tx
            .copy_in_raw(&sql)
            .await
            .map_err(|e| Error::engine(sql.as_str(), e))?;
        loop {
            let chunk = match source.next_chunk() {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    if let Err(abort) = copy.abort(e.to_string()).await {
                        tracing::debug!("copy abort: {}", abort);
                    }
                    return Err(e);
                }
            };
            if let Err(e) = copy.send(chunk).await {
                return Err(Error::engine(sql, e));
            }
        }
        copy.finish().await.map_err(|e| Error::engine(sql, e))
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
