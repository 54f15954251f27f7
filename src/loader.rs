//! Bulk loading of reader rows into an engine table.

use crate::engine::{BulkStrategy, CopySource, Engine, Prepared, encode_copy_row};
use crate::error::{Error, Result};
use crate::reader::{Reader, fit_row};
use crate::value::{Row, Value};
use bytes::{Bytes, BytesMut};

/// Target size of one COPY data message.
const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Creates a table and streams every row of a reader into it.
pub struct TableLoader<'e> {
    engine: &'e mut dyn Engine,
    temporary: bool,
}

impl<'e> TableLoader<'e> {
    pub fn new(engine: &'e mut dyn Engine) -> Self {
        Self {
            engine,
            temporary: true,
        }
    }

    pub fn temporary(mut self, temporary: bool) -> Self {
        self.temporary = temporary;
        self
    }

    /// Create `table` (already escaped) and load `reader` into it.
    pub async fn import(
        &mut self,
        table: &str,
        names: &[String],
        types: &[String],
        reader: &mut dyn Reader,
    ) -> Result<u64> {
        self.create_table(table, names, types).await?;
        let loaded = match self.engine.dialect().bulk {
            BulkStrategy::Copy => self.copy_rows(table, names, reader).await?,
            BulkStrategy::Insert => self.insert_rows(table, names, reader).await?,
        };
        tracing::info!(table = %table, rows = loaded, "imported");
        Ok(loaded)
    }

    pub async fn create_table(&mut self, table: &str, names: &[String], types: &[String]) -> Result<()> {
        if names.is_empty() {
            return Err(Error::NoColumns(table.to_string()));
        }
        if names.len() != types.len() {
            return Err(Error::ColumnMismatch {
                names: names.len(),
                types: types.len(),
            });
        }
        let dialect = self.engine.dialect();
        let columns: Vec<String> = names
            .iter()
            .zip(types)
            .map(|(name, ty)| format!("{} {}", dialect.quote_ident(name), ty))
            .collect();
        let sql = format!(
            "CREATE {}TABLE {} ( {} )",
            if self.temporary { "TEMPORARY " } else { "" },
            table,
            columns.join(", ")
        );
        self.engine.execute(&sql).await?;
        Ok(())
    }

    async fn copy_rows(&mut self, table: &str, names: &[String], reader: &mut dyn Reader) -> Result<u64> {
        let mut source = RowChunks::new(reader, names.len());
        self.engine.copy_in(table, names, &mut source).await?;
        Ok(source.rows)
    }

    /// Multi-row INSERTs of at most `max_params / columns` rows each.
    async fn insert_rows(&mut self, table: &str, names: &[String], reader: &mut dyn Reader) -> Result<u64> {
        let mut stmt: Option<(Prepared, usize)> = None;
        let result = self.insert_batches(table, names, reader, &mut stmt).await;
        if let Some((prepared, _)) = stmt {
            if let Err(e) = self.engine.close_prepared(prepared).await {
                if result.is_ok() {
                    return Err(e);
                }
                tracing::warn!("close prepared statement: {}", e);
            }
        }
        result
    }

    async fn insert_batches(
        &mut self,
        table: &str,
        names: &[String],
        reader: &mut dyn Reader,
        stmt: &mut Option<(Prepared, usize)>,
    ) -> Result<u64> {
        let width = names.len();
        let capacity = (self.engine.dialect().max_params / width).max(1);
        tracing::debug!(table = %table, capacity, "batch insert");

        let dialect = self.engine.dialect();
        let insert = format!(
            "INSERT INTO {} ({}) VALUES ",
            table,
            names.iter().map(|n| dialect.quote_ident(n)).collect::<Vec<_>>().join(", ")
        );

        let mut rows = Rows::new(reader);
        let mut params: Vec<Value> = Vec::with_capacity(capacity * width);
        let mut batch = 0;
        let mut total = 0;
        while let Some(row) = rows.next_row()? {
            if row.is_empty() {
                continue;
            }
            params.extend(fit_row(row, width));
            batch += 1;
            if batch == capacity {
                self.flush(&insert, width, batch, &params, stmt).await?;
                total += batch as u64;
                params.clear();
                batch = 0;
            }
        }
        if batch > 0 {
            self.flush(&insert, width, batch, &params, stmt).await?;
            total += batch as u64;
        }
        Ok(total)
    }

    /// Execute one batch, preparing a new statement only when the batch
    /// shape changed.
    async fn flush(
        &mut self,
        insert: &str,
        width: usize,
        batch: usize,
        params: &[Value],
        stmt: &mut Option<(Prepared, usize)>,
    ) -> Result<()> {
        if stmt.as_ref().is_none_or(|(_, rows)| *rows != batch) {
            if let Some((old, _)) = stmt.take() {
                self.engine.close_prepared(old).await?;
            }
            let sql = format!("{}{}", insert, self.engine.dialect().values_clause(width, batch));
            let prepared = self.engine.prepare(&sql).await?;
            *stmt = Some((prepared, batch));
        }
        if let Some((prepared, _)) = stmt.as_ref() {
            self.engine.execute_prepared(prepared, params).await?;
        }
        Ok(())
    }
}

/// Pre-read rows first, then live rows.
struct Rows<'r> {
    pre_read: std::vec::IntoIter<Row>,
    reader: &'r mut dyn Reader,
}

impl<'r> Rows<'r> {
    fn new(reader: &'r mut dyn Reader) -> Self {
        Self {
            pre_read: reader.pre_read_rows().into_iter(),
            reader,
        }
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        match self.pre_read.next() {
            Some(row) => Ok(Some(row)),
            None => self.reader.read_row(),
        }
    }
}

/// Rows encoded as COPY text, about [`COPY_CHUNK_SIZE`] bytes at a time.
struct RowChunks<'r> {
    rows: u64,
    source: Rows<'r>,
    width: usize,
    done: bool,
}

impl<'r> RowChunks<'r> {
    fn new(reader: &'r mut dyn Reader, width: usize) -> Self {
        Self {
            rows: 0,
            source: Rows::new(reader),
            width,
            done: false,
        }
    }
}

impl CopySource for RowChunks<'_> {
    fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        let mut buf = BytesMut::with_capacity(COPY_CHUNK_SIZE);
        while !self.done && buf.len() < COPY_CHUNK_SIZE {
            match self.source.next_row()? {
                Some(row) if row.is_empty() => {}
                Some(row) => {
                    encode_copy_row(&mut buf, &row, self.width);
                    self.rows += 1;
                }
                None => self.done = true,
            }
        }
        if buf.is_empty() {
            Ok(None)
        } else {
            Ok(Some(buf.freeze()))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::engine::{Cursor, Dialect, Driver};
    use crate::options::ReadOptions;
    use crate::reader::{CsvReader, SliceReader};
    use async_trait::async_trait;
    use futures::StreamExt;
    use pretty_assertions::assert_eq;
    use std::io::Cursor as IoCursor;

    /// Records what the loader asks of an engine.
    pub(crate) struct MockEngine {
        pub dialect: Dialect,
        pub executed: Vec<String>,
        pub prepared: Vec<String>,
        /// (statement id, parameter count) per prepared execution.
        pub executions: Vec<(usize, usize)>,
        pub closed: Vec<usize>,
        pub copied: Vec<u8>,
        pub fail_execution: Option<usize>,
        /// Result columns (name, type) and rows served by `describe`/`query`.
        pub columns: Vec<(String, String)>,
        pub rows: Vec<Row>,
    }

    impl MockEngine {
        pub fn new(dialect: Dialect) -> Self {
            Self {
                dialect,
                executed: Vec::new(),
                prepared: Vec::new(),
                executions: Vec::new(),
                closed: Vec::new(),
                copied: Vec::new(),
                fail_execution: None,
                columns: Vec::new(),
                rows: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl Engine for MockEngine {
        fn dialect(&self) -> &Dialect {
            &self.dialect
        }

        async fn execute(&mut self, sql: &str) -> Result<u64> {
            self.executed.push(sql.to_string());
            Ok(0)
        }

        async fn prepare(&mut self, sql: &str) -> Result<Prepared> {
            self.prepared.push(sql.to_string());
            Ok(Prepared {
                id: self.prepared.len(),
                sql: sql.to_string(),
            })
        }

        async fn execute_prepared(&mut self, stmt: &Prepared, params: &[Value]) -> Result<u64> {
            if self.fail_execution == Some(self.executions.len()) {
                return Err(Error::engine(stmt.sql.as_str(), sqlx::Error::PoolClosed));
            }
            self.executions.push((stmt.id, params.len()));
            Ok(1)
        }

        async fn close_prepared(&mut self, stmt: Prepared) -> Result<()> {
            self.closed.push(stmt.id);
            Ok(())
        }

        async fn copy_in(
            &mut self,
            _table: &str,
            _columns: &[String],
            source: &mut (dyn CopySource + Send),
        ) -> Result<u64> {
            while let Some(chunk) = source.next_chunk()? {
                self.copied.extend_from_slice(&chunk);
            }
            Ok(0)
        }

        async fn describe(&mut self, _sql: &str) -> Result<Vec<(String, String)>> {
            Ok(self.columns.clone())
        }

        async fn query<'a>(&'a mut self, _sql: &'a str) -> Result<Cursor<'a>> {
            let (columns, types) = self.columns.iter().cloned().unzip();
            let rows: Vec<Result<Row>> = self.rows.iter().cloned().map(Ok).collect();
            Ok(Cursor {
                columns,
                types,
                rows: futures::stream::iter(rows).boxed(),
            })
        }

        async fn commit(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    fn small_batches() -> Dialect {
        Dialect {
            max_params: 4,
            ..Driver::Sqlite.dialect()
        }
    }

    fn csv(data: &str) -> CsvReader {
        CsvReader::new(Box::new(IoCursor::new(data.to_string())), &ReadOptions::new()).unwrap()
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_create_table_sql() {
        let mut engine = MockEngine::new(Driver::Sqlite.dialect());
        let mut reader = csv("1,2\n");
        TableLoader::new(&mut engine)
            .import("`t.csv`", &strings(&["c1", "c2"]), &strings(&["text", "text"]), &mut reader)
            .await
            .unwrap();
        assert_eq!(
            engine.executed,
            vec!["CREATE TEMPORARY TABLE `t.csv` ( `c1` text, `c2` text )"]
        );
        assert_eq!(engine.prepared, vec!["INSERT INTO `t.csv` (`c1`, `c2`) VALUES (?,?)"]);
    }

    #[tokio::test]
    async fn test_batch_sizing() {
        // Capacity is 4 / 2 = 2 rows; 2 * 3 + 1 rows need four executions.
        let mut engine = MockEngine::new(small_batches());
        let mut reader = csv("1,a\n2,b\n3,c\n4,d\n5,e\n6,f\n7,g\n");
        let loaded = TableLoader::new(&mut engine)
            .import("t", &strings(&["c1", "c2"]), &strings(&["text", "text"]), &mut reader)
            .await
            .unwrap();
        assert_eq!(loaded, 7);
        assert_eq!(engine.executions, vec![(1, 4), (1, 4), (1, 4), (2, 2)]);
        assert_eq!(engine.prepared.len(), 2);
        assert!(engine.prepared[1].ends_with("VALUES (?,?)"));
        assert_eq!(engine.closed, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_statement_closed_on_error() {
        let mut engine = MockEngine::new(small_batches());
        engine.fail_execution = Some(1);
        let mut reader = csv("1\n2\n3\n4\n5\n6\n7\n8\n9\n");
        let err = TableLoader::new(&mut engine)
            .import("t", &strings(&["c1"]), &strings(&["text"]), &mut reader)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Engine { .. }));
        assert_eq!(engine.closed, vec![1]);
    }

    #[tokio::test]
    async fn test_no_columns() {
        let mut engine = MockEngine::new(Driver::Sqlite.dialect());
        let mut reader = SliceReader::new(&Vec::<String>::new()).unwrap();
        let err = TableLoader::new(&mut engine)
            .import("t", &[], &[], &mut reader)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoColumns(_)));
        assert!(engine.executed.is_empty());
    }

    #[tokio::test]
    async fn test_column_mismatch() {
        let mut engine = MockEngine::new(Driver::Sqlite.dialect());
        let mut reader = csv("a\n");
        let err = TableLoader::new(&mut engine)
            .import("t", &strings(&["a", "b"]), &strings(&["text"]), &mut reader)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ColumnMismatch { names: 2, types: 1 }));
    }

    #[tokio::test]
    async fn test_copy_path() {
        let mut engine = MockEngine::new(Driver::Postgres.dialect());
        let mut reader = SliceReader::new(&vec![vec![Some("a"), None], vec![Some("b\tc"), Some("d")]]).unwrap();
        let loaded = TableLoader::new(&mut engine)
            .temporary(false)
            .import("\"t\"", &strings(&["c1", "c2"]), &strings(&["text", "text"]), &mut reader)
            .await
            .unwrap();
        assert_eq!(loaded, 2);
        assert_eq!(engine.executed, vec!["CREATE TABLE \"t\" ( \"c1\" text, \"c2\" text )"]);
        assert!(engine.prepared.is_empty());
        assert_eq!(String::from_utf8(engine.copied).unwrap(), "a\t\\N\nb\\tc\td\n");
    }
}
