//! Describing a file as a table: schema, samples and example queries.

use crate::engine::{Dialect, Driver};
use crate::error::{Error, Result};
use crate::input::{self, trim_quotes};
use crate::options::{Format, ReadOptions, guess_format};
use crate::reader::new_reader;
use colored::Colorize;
use comfy_table::Table;
use comfy_table::presets::ASCII_FULL;
use std::io::Write;

/// Words that must be quoted when used as a column name.
const KEYWORDS: &[&str] = &[
    "all", "and", "as", "asc", "between", "by", "case", "cast", "check", "column", "create",
    "cross", "current_date", "current_time", "default", "delete", "desc", "distinct", "drop",
    "else", "end", "except", "exists", "false", "fetch", "for", "from", "full", "group", "having",
    "in", "index", "inner", "insert", "intersect", "into", "is", "join", "key", "lateral", "left",
    "like", "limit", "natural", "not", "null", "offset", "on", "or", "order", "outer", "primary",
    "references", "right", "select", "set", "table", "then", "to", "true", "union", "unique",
    "update", "user", "using", "values", "when", "where", "window", "with",
];

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Command name printed in front of the example queries.
    pub command: String,
    /// Identifier quoting of the target engine.
    pub dialect: Dialect,
    /// Print schema and samples, not only the examples.
    pub detail: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            command: env!("CARGO_PKG_NAME").to_string(),
            dialect: Driver::Sqlite.dialect(),
            detail: true,
        }
    }
}

/// Print what `reference` looks like as a table.
pub fn analyze<W: Write>(out: &mut W, reference: &str, opts: &AnalyzeOptions, read: &ReadOptions) -> Result<()> {
    let opened = input::resolve(reference)?
        .ok_or_else(|| Error::Config(format!("{}: no such file", reference)))?;

    let mut read = read.clone();
    let file = trim_quotes(&opened.file).to_string();
    let mut table = file.clone();
    if let Some(path) = opened.path {
        table = format!("{}::{}", file, path);
        read.path = Some(path);
    }
    if read.format == Format::Guess {
        read.format = guess_format(&file);
    }

    let mut reader = new_reader(opened.input, &read)?;
    let raw_names = reader.names()?.to_vec();
    let types = reader.types()?.to_vec();
    let names: Vec<String> = raw_names.iter().map(|n| quote_name(n, &opts.dialect)).collect();
    let samples: Vec<Vec<String>> = reader
        .pre_read_rows()
        .iter()
        .map(|row| row.iter().map(|v| v.to_text()).collect())
        .collect();

    if opts.detail {
        writeln!(out, "The table name is {}.", table.yellow())?;
        writeln!(out, "The file type is {}.", read.format.to_string().red())?;
        if names.len() <= 1 {
            if let Some(first) = samples.first().and_then(|row| row.first()) {
                hints(out, &read, &raw_names[0], first)?;
            }
        }

        writeln!(out, "{}", "\nData types:".cyan())?;
        let mut type_table = Table::new();
        type_table.load_preset(ASCII_FULL);
        type_table.set_header(vec!["column name", "type"]);
        for (name, ty) in names.iter().zip(&types) {
            type_table.add_row(vec![name, ty]);
        }
        writeln!(out, "{}", type_table)?;

        writeln!(out, "{}", "\nData samples:".cyan())?;
        let mut sample_table = Table::new();
        sample_table.load_preset(ASCII_FULL);
        sample_table.set_header(&names);
        for row in &samples {
            sample_table.add_row(row);
        }
        writeln!(out, "{}", sample_table)?;

        writeln!(out, "{}", "\nExamples:".cyan())?;
    }

    let Some(first) = samples.first() else {
        return Ok(());
    };
    for query in example_queries(&table, &names, first) {
        writeln!(out, "{} \"{}\"", opts.command, query)?;
    }
    Ok(())
}

/// Suggestions for a file that decoded into a single column.
fn hints<W: Write>(out: &mut W, read: &ReadOptions, name: &str, value: &str) -> Result<()> {
    match read.format {
        Format::Csv => {
            if value == "[" || value == "{" {
                writeln!(out, "{}", "Is it a JSON file?".magenta())?;
                writeln!(out, "{}", "Please try again with --ifmt json.".magenta())?;
                return Ok(());
            }
            writeln!(out, "{}", "Is the delimiter different?".magenta())?;
            let delimiter = if value.matches('\t').count() > 1 {
                "\\t"
            } else if value.matches(';').count() > 1 {
                ";"
            } else {
                " "
            };
            let advice = format!("Please try again with --id \"{}\" or other character.", delimiter);
            writeln!(out, "{}", advice.magenta())?;
            if value.contains(':') {
                writeln!(out, "{}", "Is it a LTSV file?".magenta())?;
                writeln!(out, "{}", "Please try again with --ifmt ltsv.".magenta())?;
            }
        }
        Format::Json | Format::Yaml => {
            writeln!(out, "{}", "Is it for internal objects?".magenta())?;
            let path = match &read.path {
                Some(path) => format!("{}.{}", path, name),
                None => name.to_string(),
            };
            let advice = format!("Please try again with --ipath \"{}\".", path);
            writeln!(out, "{}", advice.magenta())?;
        }
        _ => {}
    }
    Ok(())
}

/// Plain lowercase identifiers that are not keywords stay bare.
fn quote_name(name: &str, dialect: &Dialect) -> String {
    let plain = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
    if plain && !KEYWORDS.contains(&name) {
        name.to_string()
    } else {
        dialect.quote_ident(name)
    }
}

fn example_queries(table: &str, names: &[String], first: &[String]) -> Vec<String> {
    let columns = names.join(", ");
    let key = &names[0];
    let value = first.first().map(|v| v.replace('\'', "''")).unwrap_or_default();
    vec![
        format!("SELECT {} FROM {}", columns, table),
        format!("SELECT {} FROM {} WHERE {} = '{}'", columns, table, key, value),
        format!("SELECT {}, count({}) FROM {} GROUP BY {}", key, key, table, key),
        format!("SELECT {} FROM {} ORDER BY {} LIMIT 10", columns, table, key),
    ]
}
