//! Backing SQL engines.
//!
//! All work of one query happens inside a single transaction opened by
//! [`connect`]. Dropping an engine without calling [`Engine::commit`] rolls
//! the transaction back.

mod any;
mod copy;
mod postgres;

pub use self::any::AnyEngine;
pub use self::copy::{CopySource, encode_copy_row, encode_copy_value};
pub use self::postgres::PgEngine;

use crate::error::{Error, Result};
use crate::value::{Row, Value};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;
use std::str::FromStr;

/// Supported engine drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Driver {
    #[default]
    Sqlite,
    Mysql,
    Postgres,
}

impl FromStr for Driver {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "" | "sqlite" | "sqlite3" => Ok(Driver::Sqlite),
            "mysql" => Ok(Driver::Mysql),
            "postgres" | "postgresql" | "pg" => Ok(Driver::Postgres),
            other => Err(Error::Config(format!("unknown driver '{}'", other))),
        }
    }
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Driver::Sqlite => "sqlite",
            Driver::Mysql => "mysql",
            Driver::Postgres => "postgres",
        })
    }
}

impl Driver {
    /// SQL dialect of the driver.
    pub fn dialect(self) -> Dialect {
        match self {
            Driver::Sqlite => Dialect {
                quote: '`',
                placeholder: Placeholder::Question,
                max_params: 32766,
                bulk: BulkStrategy::Insert,
            },
            Driver::Mysql => Dialect {
                quote: '`',
                placeholder: Placeholder::Question,
                max_params: 65535,
                bulk: BulkStrategy::Insert,
            },
            Driver::Postgres => Dialect {
                quote: '"',
                placeholder: Placeholder::Dollar,
                max_params: 65535,
                bulk: BulkStrategy::Copy,
            },
        }
    }

    /// Connection URL for `dsn`. An empty DSN is an in-memory SQLite
    /// database; a bare SQLite path is created when missing.
    pub fn url(self, dsn: &str) -> String {
        match self {
            Driver::Sqlite if dsn.is_empty() => "sqlite::memory:".to_string(),
            Driver::Sqlite if !dsn.starts_with("sqlite:") => format!("sqlite://{}?mode=rwc", dsn),
            Driver::Mysql if !dsn.starts_with("mysql://") => format!("mysql://{}", dsn),
            _ => dsn.to_string(),
        }
    }
}

/// Bind parameter syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `?`
    Question,
    /// `$1`, `$2`, ...
    Dollar,
}

/// How rows are bulk loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkStrategy {
    /// Engine-native streaming copy.
    Copy,
    /// Multi-row prepared INSERT statements.
    Insert,
}

/// The dialect facts the loader needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    pub quote: char,
    pub placeholder: Placeholder,
    /// Maximum number of bind parameters in one statement.
    pub max_params: usize,
    pub bulk: BulkStrategy,
}

impl Dialect {
    /// Quote an identifier, doubling embedded quote characters.
    pub fn quote_ident(&self, name: &str) -> String {
        let q = self.quote;
        let mut out = String::with_capacity(name.len() + 2);
        out.push(q);
        for c in name.chars() {
            if c == q {
                out.push(q);
            }
            out.push(c);
        }
        out.push(q);
        out
    }

    /// `(p, p), (p, p)` for `rows` rows of `columns` parameters.
    pub fn values_clause(&self, columns: usize, rows: usize) -> String {
        let mut out = String::new();
        let mut n = 0;
        for r in 0..rows {
            if r > 0 {
                out.push(',');
            }
            out.push('(');
            for c in 0..columns {
                if c > 0 {
                    out.push(',');
                }
                n += 1;
                match self.placeholder {
                    Placeholder::Question => out.push('?'),
                    Placeholder::Dollar => {
                        out.push('$');
                        out.push_str(&n.to_string());
                    }
                }
            }
            out.push(')');
        }
        out
    }
}

/// A statement prepared for repeated execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    pub id: usize,
    pub sql: String,
}

/// An open result set.
pub struct Cursor<'a> {
    pub columns: Vec<String>,
    pub types: Vec<String>,
    pub rows: BoxStream<'a, Result<Row>>,
}

/// The prepare/execute/query surface of a backing engine.
#[async_trait]
pub trait Engine: Send {
    fn dialect(&self) -> &Dialect;

    /// Run a statement, returning the affected row count.
    async fn execute(&mut self, sql: &str) -> Result<u64>;

    async fn prepare(&mut self, sql: &str) -> Result<Prepared>;

    async fn execute_prepared(&mut self, stmt: &Prepared, params: &[Value]) -> Result<u64>;

    async fn close_prepared(&mut self, stmt: Prepared) -> Result<()>;

    /// Stream rows into `table` with the engine's copy protocol.
    async fn copy_in(
        &mut self,
        table: &str,
        columns: &[String],
        source: &mut (dyn CopySource + Send),
    ) -> Result<u64>;

    /// Result column names and type names of `sql`, without running it.
    async fn describe(&mut self, sql: &str) -> Result<Vec<(String, String)>>;

    async fn query<'a>(&'a mut self, sql: &'a str) -> Result<Cursor<'a>>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

/// `Some` when column `i` of `row` decodes as `T`; the inner `None` is SQL
/// null.
pub(crate) fn try_cell<'r, R, T>(row: &'r R, i: usize) -> Option<Option<T>>
where
    R: sqlx::Row,
    T: sqlx::Decode<'r, R::Database> + sqlx::Type<R::Database>,
    usize: sqlx::ColumnIndex<R>,
{
    row.try_get::<Option<T>, _>(i).ok()
}

/// Connect and open the transaction.
pub async fn connect(driver: Driver, dsn: &str) -> Result<Box<dyn Engine>> {
    let url = driver.url(dsn);
    tracing::debug!(driver = %driver, "connect");
    match driver {
        Driver::Postgres => Ok(Box::new(PgEngine::connect(&url).await?)),
        _ => Ok(Box::new(AnyEngine::connect(driver, &url).await?)),
    }
}
