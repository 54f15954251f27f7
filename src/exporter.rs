//! Running the rewritten query and handing its result to a writer.

use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::writer::Writer;
use futures::StreamExt;

/// Runs a statement and streams the result set into `W`.
pub struct Exporter<W> {
    writer: W,
}

impl<W: Writer> Exporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Run `sql`. Statements without result columns are executed and write
    /// nothing.
    pub async fn export(&mut self, engine: &mut dyn Engine, sql: &str) -> Result<()> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(Error::NoStatement);
        }

        let described = engine.describe(sql).await?;
        if described.is_empty() {
            let affected = engine.execute(sql).await?;
            tracing::debug!(rows = affected, "statement executed");
            return Ok(());
        }

        let mut cursor = engine.query(sql).await?;
        self.writer.pre_write(&cursor.columns, &cursor.types)?;
        let mut count = 0u64;
        while let Some(row) = cursor.rows.next().await {
            self.writer.write_row(&row?, &cursor.columns)?;
            count += 1;
        }
        tracing::debug!(rows = count, "exported");
        self.writer.post_write()
    }
}
