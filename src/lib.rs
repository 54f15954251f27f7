//! # flatsql
//!
//! Run SQL directly on CSV, LTSV, JSON, YAML, TBLN and plain text files.
//!
//! Every file named after `FROM` or `JOIN` is loaded into a temporary table
//! of a backing SQL engine (in-memory SQLite by default, or MySQL /
//! PostgreSQL), the query is rewritten to use those tables, and the result
//! is written in the chosen output format. Loading and querying share one
//! transaction.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use flatsql::prelude::*;
//!
//! let importer = FileImporter::new(ReadOptions::new().header(true));
//! let writer = new_writer(std::io::stdout(), &WriteOptions::new().format(OutputFormat::At))?;
//! let mut fs = FlatSql::new(importer, writer);
//! fs.exec("SELECT name, count(*) FROM users.csv GROUP BY name").await?;
//! ```
//!
//! ## Input formats
//!
//! | Format | Extension         | Columns                                |
//! |--------|-------------------|----------------------------------------|
//! | CSV    | `.csv`            | header row or `c1..cN`                 |
//! | LTSV   | `.ltsv`           | labels                                 |
//! | JSON   | `.json`, `.jsonl` | object keys                            |
//! | YAML   | `.yaml`, `.yml`   | mapping keys                           |
//! | TBLN   | `.tbln`           | embedded definition                    |
//! | WIDTH  |                   | guessed from aligned text              |
//! | TEXT   |                   | one `text` column per line             |

pub mod analyze;
pub mod compress;
pub mod config;
pub mod engine;
pub mod error;
pub mod exporter;
pub mod importer;
pub mod input;
pub mod loader;
pub mod options;
pub mod reader;
pub mod rewriter;
pub mod scanner;
pub mod value;
pub mod writer;

use crate::engine::Driver;
use crate::error::Result;
use crate::exporter::Exporter;
use crate::importer::{FileImporter, Import};
use crate::writer::Writer;

pub mod prelude {
    pub use crate::FlatSql;
    pub use crate::analyze::{AnalyzeOptions, analyze};
    pub use crate::compress::Compression;
    pub use crate::engine::{Driver, Engine, connect};
    pub use crate::error::*;
    pub use crate::exporter::Exporter;
    pub use crate::importer::{FileImporter, Import, ReaderImporter};
    pub use crate::options::{Format, ReadOptions};
    pub use crate::reader::{Reader, SliceReader, new_reader};
    pub use crate::value::{Row, Value};
    pub use crate::writer::{OutputFormat, SliceWriter, WriteOptions, Writer, new_writer};
}

/// One import-query-export run against a backing engine.
pub struct FlatSql<I = FileImporter, W = Box<dyn Writer>> {
    pub driver: Driver,
    pub dsn: String,
    importer: I,
    exporter: Exporter<W>,
}

impl<I: Import, W: Writer> FlatSql<I, W> {
    pub fn new(importer: I, writer: W) -> Self {
        Self {
            driver: Driver::default(),
            dsn: String::new(),
            importer,
            exporter: Exporter::new(writer),
        }
    }

    pub fn driver(mut self, driver: Driver) -> Self {
        self.driver = driver;
        self
    }

    pub fn dsn(mut self, dsn: &str) -> Self {
        self.dsn = dsn.to_string();
        self
    }

    pub fn exporter(&self) -> &Exporter<W> {
        &self.exporter
    }

    pub fn into_exporter(self) -> Exporter<W> {
        self.exporter
    }

    /// Connect, import the referenced files, run `sql` and write the result.
    /// Nothing is committed unless every step succeeds.
    pub async fn exec(&mut self, sql: &str) -> Result<()> {
        let mut engine = engine::connect(self.driver, &self.dsn).await?;
        let rewritten = self.importer.import(engine.as_mut(), sql).await?;
        tracing::debug!(sql = %rewritten, "query");
        self.exporter.export(engine.as_mut(), &rewritten).await?;
        engine.commit().await
    }
}
