//! Importing the files a query refers to.

use crate::engine::Engine;
use crate::error::Result;
use crate::input::{self, trim_quotes};
use crate::loader::TableLoader;
use crate::options::{Format, ReadOptions, guess_format};
use crate::reader::{Reader, new_reader};
use crate::rewriter::QueryRewriter;
use crate::scanner::table_refs;
use async_trait::async_trait;

/// Loads the tables a query needs and returns the query to run.
#[async_trait]
pub trait Import: Send {
    async fn import(&mut self, engine: &mut dyn Engine, sql: &str) -> Result<String>;
}

/// Imports every file referenced after `FROM`/`JOIN`.
///
/// References that are not existing files are left alone, so queries such
/// as `SELECT 1+1` or ones naming real tables of the database still run.
#[derive(Debug, Clone, Default)]
pub struct FileImporter {
    opts: ReadOptions,
}

impl FileImporter {
    pub fn new(opts: ReadOptions) -> Self {
        Self { opts }
    }

    /// Import one reference. Returns the escaped table name, or `None` when
    /// the reference is not a file.
    pub async fn import_file(&self, engine: &mut dyn Engine, reference: &str) -> Result<Option<String>> {
        let Some(opened) = input::resolve(reference)? else {
            tracing::debug!(reference = %reference, "not a file");
            return Ok(None);
        };

        let mut opts = self.opts.clone();
        let file = trim_quotes(&opened.file);
        let mut name = file.to_string();
        if let Some(path) = opened.path {
            name = format!("{}::{}", file, path);
            opts.path = Some(path);
        }
        if opts.format == Format::Guess {
            opts.format = guess_format(file);
            tracing::debug!(file = %file, format = %opts.format, "guessed format");
        }

        let table = engine.dialect().quote_ident(&name);
        let mut reader = new_reader(opened.input, &opts)?;
        load(engine, &table, &mut reader, opts.temporary).await?;
        Ok(Some(table))
    }
}

#[async_trait]
impl Import for FileImporter {
    async fn import(&mut self, engine: &mut dyn Engine, sql: &str) -> Result<String> {
        let refs = table_refs(sql);
        if refs.is_empty() {
            tracing::debug!("no table reference");
            return Ok(sql.to_string());
        }

        let mut rewriter = QueryRewriter::new();
        let mut rewritten = sql.to_string();
        for reference in refs {
            if let Some(table) = self.import_file(engine, &reference).await? {
                rewritten = rewriter.rewrite(&rewritten, &reference, &table);
            }
        }
        Ok(rewritten)
    }
}

/// Imports one reader under a fixed table name, for data that does not
/// come from a file. The query is returned unchanged.
pub struct ReaderImporter {
    table: String,
    reader: Box<dyn Reader>,
    temporary: bool,
}

impl ReaderImporter {
    pub fn new(table: impl Into<String>, reader: impl Reader + 'static) -> Self {
        Self {
            table: table.into(),
            reader: Box::new(reader),
            temporary: true,
        }
    }

    pub fn temporary(mut self, temporary: bool) -> Self {
        self.temporary = temporary;
        self
    }
}

#[async_trait]
impl Import for ReaderImporter {
    async fn import(&mut self, engine: &mut dyn Engine, sql: &str) -> Result<String> {
        let table = engine.dialect().quote_ident(&self.table);
        load(engine, &table, &mut self.reader, self.temporary).await?;
        Ok(sql.to_string())
    }
}

async fn load(engine: &mut dyn Engine, table: &str, reader: &mut Box<dyn Reader>, temporary: bool) -> Result<()> {
    let names = reader.names()?.to_vec();
    let types = reader.types()?.to_vec();
    tracing::debug!(table = %table, names = ?names, types = ?types, "schema");
    TableLoader::new(engine)
        .temporary(temporary)
        .import(table, &names, &types, reader.as_mut())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Driver;
    use crate::loader::tests::MockEngine;
    use crate::reader::SliceReader;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[tokio::test]
    async fn test_missing_file_leaves_query() {
        let mut engine = MockEngine::new(Driver::Sqlite.dialect());
        let mut importer = FileImporter::default();
        let sql = "SELECT * FROM no_such_file.csv";
        assert_eq!(importer.import(&mut engine, sql).await.unwrap(), sql);
        assert!(engine.executed.is_empty());
    }

    #[tokio::test]
    async fn test_no_from_clause() {
        let mut engine = MockEngine::new(Driver::Sqlite.dialect());
        let mut importer = FileImporter::default();
        assert_eq!(importer.import(&mut engine, "SELECT 1+1").await.unwrap(), "SELECT 1+1");
    }

    #[tokio::test]
    async fn test_import_rewrites_reference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "id,name\n1,alice\n2,bob").unwrap();
        let file_name = path.display().to_string();

        let mut engine = MockEngine::new(Driver::Sqlite.dialect());
        let mut importer = FileImporter::new(ReadOptions::new().header(true));
        let sql = format!("SELECT name FROM {} WHERE id = 1", file_name);
        let rewritten = importer.import(&mut engine, &sql).await.unwrap();

        assert_eq!(rewritten, format!("SELECT name FROM `{}` WHERE id = 1", file_name));
        assert_eq!(
            engine.executed,
            vec![format!("CREATE TEMPORARY TABLE `{}` ( `id` text, `name` text )", file_name)]
        );
        assert_eq!(engine.executions.len(), 1);
    }

    #[tokio::test]
    async fn test_path_notation_table_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        std::fs::write(&path, r#"{"items":[{"a":1},{"a":2}]}"#).unwrap();
        let reference = format!("{}::items", path.display());

        let mut engine = MockEngine::new(Driver::Sqlite.dialect());
        let importer = FileImporter::default();
        let table = importer.import_file(&mut engine, &reference).await.unwrap();
        assert_eq!(table, Some(format!("`{}`", reference)));
        assert_eq!(engine.executions, vec![(1, 2)]);
    }

    #[tokio::test]
    async fn test_reader_importer() {
        let reader = SliceReader::new(&vec![1, 2, 3]).unwrap();
        let mut importer = ReaderImporter::new("numbers", reader).temporary(false);
        let mut engine = MockEngine::new(Driver::Sqlite.dialect());
        let sql = "SELECT * FROM numbers";
        assert_eq!(importer.import(&mut engine, sql).await.unwrap(), sql);
        assert_eq!(engine.executed, vec!["CREATE TABLE `numbers` ( `c1` int )"]);
        assert_eq!(engine.executions, vec![(1, 3)]);
    }
}
