//! Format readers.
//!
//! Every input format is decoded into the same model: ordered column names,
//! one type hint per column, the rows read ahead for schema inference, and a
//! pull-based stream of the remaining rows.
//!
//! | Format | Schema source                                  |
//! |--------|------------------------------------------------|
//! | CSV    | header row or `c1..cN`, grows during pre-read  |
//! | LTSV   | union of keys in the pre-read window           |
//! | JSON   | union of object keys, `c1` for other values    |
//! | YAML   | same as JSON                                   |
//! | TBLN   | embedded `; name:` / `; type:` definition      |
//! | WIDTH  | column boundaries guessed from aligned text    |
//! | TEXT   | a single `text` column                         |

mod csv;
mod document;
mod ltsv;
mod path;
mod row_number;
mod slice;
mod tbln;
mod text;
mod width;

pub use self::csv::CsvReader;
pub use self::document::{JsonReader, YamlReader};
pub use self::ltsv::LtsvReader;
pub use self::path::PathSelector;
pub use self::row_number::RowNumberReader;
pub use self::slice::SliceReader;
pub use self::tbln::TblnReader;
pub use self::text::TextReader;
pub use self::width::WidthReader;

use crate::error::{Error, Result};
use crate::options::{Format, ReadOptions};
use crate::value::{Row, Value};
use std::collections::HashMap;
use std::io::Read;

/// Type hint given to every column of a format without native typing.
pub const DEFAULT_TYPE: &str = "text";

/// Input stream handed to readers.
pub type Input = Box<dyn Read + Send>;

/// A decoded table source.
pub trait Reader: Send {
    /// Column names. Fails with [`Error::NoRows`] when no row was observed.
    fn names(&self) -> Result<&[String]>;

    /// Column type hints, one per name.
    fn types(&self) -> Result<&[String]>;

    /// Take the rows read ahead during construction, aligned to the final
    /// schema. The buffer is handed out once; later calls return nothing.
    fn pre_read_rows(&mut self) -> Vec<Row>;

    /// Next row, or `None` at end of stream. Keeps returning `None` once the
    /// end has been reached.
    fn read_row(&mut self) -> Result<Option<Row>>;
}

impl<R: Reader + ?Sized> Reader for Box<R> {
    fn names(&self) -> Result<&[String]> {
        (**self).names()
    }

    fn types(&self) -> Result<&[String]> {
        (**self).types()
    }

    fn pre_read_rows(&mut self) -> Vec<Row> {
        (**self).pre_read_rows()
    }

    fn read_row(&mut self) -> Result<Option<Row>> {
        (**self).read_row()
    }
}

/// Build the reader for `opts.format`, wrapped with the row number column
/// when requested. [`Format::Guess`] falls back to CSV; callers that know a
/// file name resolve the format first.
pub fn new_reader(input: Input, opts: &ReadOptions) -> Result<Box<dyn Reader>> {
    let reader: Box<dyn Reader> = match opts.format {
        Format::Guess | Format::Csv => Box::new(CsvReader::new(input, opts)?),
        Format::Tsv => Box::new(CsvReader::with_delimiter(input, opts, '\t')?),
        Format::Psv => Box::new(CsvReader::with_delimiter(input, opts, '|')?),
        Format::Ltsv => Box::new(LtsvReader::new(input, opts)?),
        Format::Json => Box::new(JsonReader::new(input, opts)?),
        Format::Yaml => Box::new(YamlReader::new(input, opts)?),
        Format::Tbln => Box::new(TblnReader::new(input, opts)?),
        Format::Width => Box::new(WidthReader::new(input, opts)?),
        Format::Text => Box::new(TextReader::new(input, opts)?),
    };
    if opts.row_number {
        return Ok(Box::new(RowNumberReader::new(reader)));
    }
    Ok(reader)
}

/// Pick a name not already in `existing`.
///
/// `base` is used as is when free; otherwise `base0`, `base1`, ... are tried
/// in order and the first free one wins. Comparison ignores ASCII case, since
/// the backing engines treat column names that way.
pub fn unique_name(base: &str, existing: &[String]) -> String {
    let taken = |candidate: &str| existing.iter().any(|n| n.eq_ignore_ascii_case(candidate));
    if !taken(base) {
        return base.to_string();
    }
    (0..)
        .map(|i| format!("{}{}", base, i))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Positional placeholder name for the column at zero-based `index`.
pub(crate) fn positional_name(index: usize) -> String {
    format!("c{}", index + 1)
}

/// `n` copies of the placeholder type.
pub(crate) fn default_types(n: usize) -> Vec<String> {
    vec![DEFAULT_TYPE.to_string(); n]
}

/// Pad with null or cut `row` to exactly `width` values.
pub(crate) fn fit_row(mut row: Row, width: usize) -> Row {
    row.resize(width, Value::Null);
    row
}

pub(crate) fn names_or_no_rows(names: &[String]) -> Result<&[String]> {
    if names.is_empty() {
        Err(Error::NoRows)
    } else {
        Ok(names)
    }
}

/// Ordered set of columns keyed by their source key.
///
/// Keys are what the input calls a field; names are what the table calls
/// the column. They only differ when two keys collide as column names.
#[derive(Debug, Default, Clone)]
pub(crate) struct Columns {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl Columns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of `key`, registering it when first seen.
    pub fn add(&mut self, key: &str) -> usize {
        if let Some(&i) = self.index.get(key) {
            return i;
        }
        let name = unique_name(key, &self.names);
        let i = self.names.len();
        self.names.push(name);
        self.index.insert(key.to_string(), i);
        i
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}
