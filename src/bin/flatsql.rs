//! flatsql: SQL on CSV, LTSV, JSON, YAML and TBLN files
//!
//! # Usage
//!
//! ```bash
//! # Query a CSV file with a header row
//! flatsql --ih "SELECT id, name FROM users.csv ORDER BY id"
//!
//! # Join two formats, print an ASCII table
//! flatsql --ofmt at "SELECT * FROM a.ltsv JOIN b.json ON a.id = b.id"
//!
//! # Describe a file
//! flatsql -a access.log.ltsv
//! ```

use anyhow::{Context, bail};
use clap::Parser;
use colored::*;
use flatsql::config::Config;
use flatsql::prelude::*;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flatsql")]
#[command(version)]
#[command(about = "Run SQL queries on CSV, LTSV, JSON, YAML and TBLN files", long_about = None)]
#[command(after_help = "EXAMPLES:
    flatsql --ih 'SELECT * FROM users.csv WHERE age > 30'
    flatsql --ofmt json 'SELECT host, count(*) FROM access.ltsv GROUP BY host'
    cat data.csv | flatsql 'SELECT c1 FROM -'
    flatsql 'SELECT name FROM doc.json::items'
    flatsql --out result.csv.gz 'SELECT * FROM big.csv.zst'")]
struct Cli {
    /// SQL query
    query: Vec<String>,

    /// Read the query from a file
    #[arg(short = 'q', value_name = "FILE")]
    query_file: Option<PathBuf>,

    /// Input format: guess, csv, ltsv, json, yaml, tbln, width, text, tsv, psv
    #[arg(long = "ifmt", default_value = "guess")]
    ifmt: Format,

    /// Input field delimiter
    #[arg(long = "id", default_value = ",")]
    id: String,

    /// The first input row is a header
    #[arg(long = "ih")]
    ih: bool,

    /// Input rows to skip
    #[arg(long = "is", default_value_t = 0)]
    is: usize,

    /// Input rows read ahead to infer the schema
    #[arg(long = "ir", default_value_t = 1)]
    ir: usize,

    /// Load only the read-ahead rows
    #[arg(long = "ilr")]
    ilr: bool,

    /// Input value loaded as NULL
    #[arg(long = "inull")]
    inull: Option<String>,

    /// Add a row number column
    #[arg(long = "inum")]
    inum: bool,

    /// Path to the table inside JSON/YAML documents
    #[arg(long = "ipath")]
    ipath: Option<String>,

    /// Output format: csv, ltsv, json, jsonl, yaml, tbln, raw, at, md, vf
    #[arg(long = "ofmt", default_value = "csv")]
    ofmt: OutputFormat,

    /// Output field delimiter
    #[arg(long = "od", default_value = ",")]
    od: String,

    /// Write a header row
    #[arg(long = "oh")]
    oh: bool,

    /// Output text for NULL
    #[arg(long = "onull")]
    onull: Option<String>,

    /// CSV output quote character; empty disables quoting
    #[arg(long = "oq", default_value = "\"")]
    oq: String,

    /// Quote every CSV output field
    #[arg(long = "oaq")]
    oaq: bool,

    /// End CSV output lines with CRLF
    #[arg(long = "ocrlf")]
    ocrlf: bool,

    /// Output compression: gz, bz2, zstd, lz4, xz. Guessed from --out otherwise
    #[arg(long = "oz")]
    oz: Option<Compression>,

    /// Write the result to a file
    #[arg(long = "out", value_name = "FILE")]
    out: Option<PathBuf>,

    /// Database driver: sqlite, mysql, postgres
    #[arg(long, env = "FLATSQL_DRIVER")]
    driver: Option<Driver>,

    /// Database connection string
    #[arg(long, env = "FLATSQL_DSN")]
    dsn: Option<String>,

    /// Database profile from the config file
    #[arg(long)]
    db: Option<String>,

    /// Config file path
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// List configured databases
    #[arg(long)]
    dblist: bool,

    /// Debug logging
    #[arg(long)]
    debug: bool,

    /// Describe a file and print example queries
    #[arg(short = 'a', value_name = "FILE")]
    analyze: Option<String>,

    /// Print only the example queries for a file
    #[arg(short = 'A', value_name = "FILE", conflicts_with = "analyze")]
    examples: Option<String>,
}

impl Cli {
    fn read_options(&self) -> ReadOptions {
        let mut opts = ReadOptions::new()
            .format(self.ifmt)
            .delimiter(&self.id)
            .header(self.ih)
            .skip(self.is)
            .pre_read(self.ir)
            .row_number(self.inum);
        if self.ilr {
            opts = opts.limit_read(self.ir);
        }
        if let Some(path) = &self.ipath {
            opts = opts.path(path);
        }
        if let Some(null) = &self.inull {
            opts = opts.null(null);
        }
        opts
    }

    fn write_options(&self) -> WriteOptions {
        let compression = self
            .oz
            .or_else(|| self.out.as_deref().and_then(Compression::from_path));
        let opts = WriteOptions::new()
            .format(self.ofmt)
            .delimiter(&self.od)
            .header(self.oh)
            .quote(&self.oq)
            .all_quotes(self.oaq)
            .crlf(self.ocrlf)
            .compression(compression);
        match &self.onull {
            Some(null) => opts.null(null),
            None => opts,
        }
    }

    fn sql(&self) -> anyhow::Result<String> {
        let sql = match &self.query_file {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("reading query from {}", path.display()))?,
            None => self.query.join(" "),
        };
        if sql.trim().is_empty() {
            bail!("no query given; try 'flatsql --help'");
        }
        Ok(sql)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(e) = run(&cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(debug: bool) {
    let level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    if cli.dblist {
        for (name, db) in &config.database {
            println!("{}:{}:{}", name.cyan(), db.driver, db.dsn);
        }
        return Ok(());
    }

    let (driver, dsn) = database(cli, &config)?;
    let read = cli.read_options();

    if let Some(file) = cli.analyze.as_ref().or(cli.examples.as_ref()) {
        let opts = AnalyzeOptions {
            dialect: driver.dialect(),
            detail: cli.analyze.is_some(),
            ..AnalyzeOptions::default()
        };
        analyze(&mut io::stdout().lock(), file, &opts, &read)?;
        return Ok(());
    }

    let sql = cli.sql()?;
    let write = cli.write_options();
    let writer = match &cli.out {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            new_writer(BufWriter::new(file), &write)?
        }
        None => new_writer(BufWriter::new(io::stdout()), &write)?,
    };

    let mut fs = FlatSql::new(FileImporter::new(read), writer)
        .driver(driver)
        .dsn(&dsn);
    fs.exec(&sql).await?;
    Ok(())
}

/// `--driver/--dsn`, then the `--db` profile, then the default profile,
/// then in-memory SQLite.
fn database(cli: &Cli, config: &Config) -> anyhow::Result<(Driver, String)> {
    if cli.driver.is_some() || cli.dsn.is_some() {
        return Ok((cli.driver.unwrap_or_default(), cli.dsn.clone().unwrap_or_default()));
    }
    match config.profile(cli.db.as_deref())? {
        Some(db) => Ok((db.driver()?, db.dsn.clone())),
        None => Ok((Driver::default(), String::new())),
    }
}
