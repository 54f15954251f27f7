//! Output writers.
//!
//! The exporter drives a writer with `pre_write` once, `write_row` for every
//! result row and `post_write` once at the end.

mod csv;
mod json;
mod ltsv;
mod raw;
mod slice;
mod table;
mod tbln;
mod vertical;
mod yaml;

pub use self::csv::CsvWriter;
pub use self::json::{JsonWriter, JsonlWriter};
pub use self::ltsv::LtsvWriter;
pub use self::raw::RawWriter;
pub use self::slice::SliceWriter;
pub use self::table::TableWriter;
pub use self::tbln::TblnWriter;
pub use self::vertical::VerticalWriter;
pub use self::yaml::YamlWriter;

use crate::compress::{Compression, Encoder};
use crate::error::{Error, Result};
use crate::value::Value;
use serde_json::Value as JsonValue;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Ltsv,
    /// One JSON array of objects.
    Json,
    /// One JSON object per line.
    Jsonl,
    Yaml,
    Tbln,
    /// Delimiter-joined values without quoting.
    Raw,
    /// ASCII table.
    At,
    /// Markdown table.
    Md,
    /// Vertical, one block per row.
    Vf,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "ltsv" => Ok(OutputFormat::Ltsv),
            "json" => Ok(OutputFormat::Json),
            "jsonl" => Ok(OutputFormat::Jsonl),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            "tbln" => Ok(OutputFormat::Tbln),
            "raw" => Ok(OutputFormat::Raw),
            "at" => Ok(OutputFormat::At),
            "md" => Ok(OutputFormat::Md),
            "vf" => Ok(OutputFormat::Vf),
            _ => Err(Error::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Csv => "CSV",
            OutputFormat::Ltsv => "LTSV",
            OutputFormat::Json => "JSON",
            OutputFormat::Jsonl => "JSONL",
            OutputFormat::Yaml => "YAML",
            OutputFormat::Tbln => "TBLN",
            OutputFormat::Raw => "RAW",
            OutputFormat::At => "AT",
            OutputFormat::Md => "MD",
            OutputFormat::Vf => "VF",
        };
        f.write_str(name)
    }
}

/// Options shared by the writers.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub format: OutputFormat,
    /// Delimiter literal for CSV and RAW; escapes such as `\t` are decoded.
    pub delimiter: String,
    /// Write a header line (CSV, RAW).
    pub header: bool,
    /// Text written for null values. Without it nulls are empty, or JSON
    /// `null` for the structured formats.
    pub null: Option<String>,
    /// CSV quote character. Empty turns quoting off.
    pub quote: String,
    /// Quote every CSV field.
    pub all_quotes: bool,
    /// End CSV lines with `\r\n`.
    pub crlf: bool,
    /// Compress the output stream.
    pub compression: Option<Compression>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Csv,
            delimiter: ",".to_string(),
            header: false,
            null: None,
            quote: "\"".to_string(),
            all_quotes: false,
            crlf: false,
            compression: None,
        }
    }
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn delimiter(mut self, delimiter: &str) -> Self {
        self.delimiter = delimiter.to_string();
        self
    }

    pub fn header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn null(mut self, null: &str) -> Self {
        self.null = Some(null.to_string());
        self
    }

    pub fn quote(mut self, quote: &str) -> Self {
        self.quote = quote.to_string();
        self
    }

    pub fn all_quotes(mut self, all_quotes: bool) -> Self {
        self.all_quotes = all_quotes;
        self
    }

    pub fn crlf(mut self, crlf: bool) -> Self {
        self.crlf = crlf;
        self
    }

    pub fn compression(mut self, compression: Option<Compression>) -> Self {
        self.compression = compression;
        self
    }
}

/// A result sink.
pub trait Writer: Send {
    fn pre_write(&mut self, columns: &[String], types: &[String]) -> Result<()>;

    fn write_row(&mut self, values: &[Value], columns: &[String]) -> Result<()>;

    fn post_write(&mut self) -> Result<()>;
}

impl<W: Writer + ?Sized> Writer for Box<W> {
    fn pre_write(&mut self, columns: &[String], types: &[String]) -> Result<()> {
        (**self).pre_write(columns, types)
    }

    fn write_row(&mut self, values: &[Value], columns: &[String]) -> Result<()> {
        (**self).write_row(values, columns)
    }

    fn post_write(&mut self) -> Result<()> {
        (**self).post_write()
    }
}

/// Build the writer for `opts.format` on top of `out`, compressed when
/// `opts.compression` is set.
pub fn new_writer<O>(out: O, opts: &WriteOptions) -> Result<Box<dyn Writer>>
where
    O: Write + Send + 'static,
{
    let out = Encoder::new(out, opts.compression)?;
    let writer: Box<dyn Writer> = match opts.format {
        OutputFormat::Csv => Box::new(CsvWriter::new(out, opts)?),
        OutputFormat::Ltsv => Box::new(LtsvWriter::new(out, opts)),
        OutputFormat::Json => Box::new(JsonWriter::new(out, opts)),
        OutputFormat::Jsonl => Box::new(JsonlWriter::new(out, opts)),
        OutputFormat::Yaml => Box::new(YamlWriter::new(out, opts)),
        OutputFormat::Tbln => Box::new(TblnWriter::new(out, opts)),
        OutputFormat::Raw => Box::new(RawWriter::new(out, opts)),
        OutputFormat::At => Box::new(TableWriter::new(out, opts, false)),
        OutputFormat::Md => Box::new(TableWriter::new(out, opts, true)),
        OutputFormat::Vf => Box::new(VerticalWriter::new(out, opts)),
    };
    Ok(writer)
}

/// Text of a cell, with the configured null replacement.
pub(crate) fn cell_text(value: &Value, null: Option<&str>) -> String {
    match (value, null) {
        (Value::Null, Some(null)) => null.to_string(),
        _ => value.to_text(),
    }
}

/// JSON form of a cell. Text holding a JSON object or array is embedded as
/// structure rather than as a string.
pub(crate) fn json_value(value: &Value, null: Option<&str>) -> JsonValue {
    match value {
        Value::Null => match null {
            Some(null) => JsonValue::String(null.to_string()),
            None => JsonValue::Null,
        },
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int(n) => JsonValue::from(*n),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Text(s) => embedded_json(s).unwrap_or_else(|| JsonValue::String(s.clone())),
        other => JsonValue::String(other.to_text()),
    }
}

fn embedded_json(s: &str) -> Option<JsonValue> {
    let trimmed = s.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }
    serde_json::from_str(s).ok()
}

/// One result row as an ordered JSON object.
pub(crate) fn json_object(values: &[Value], columns: &[String], null: Option<&str>) -> JsonValue {
    let map: serde_json::Map<String, JsonValue> = columns
        .iter()
        .zip(values)
        .map(|(column, value)| (column.clone(), json_value(value, null)))
        .collect();
    JsonValue::Object(map)
}
