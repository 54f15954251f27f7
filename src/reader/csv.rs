//! Delimited text (CSV, TSV, PSV).

use super::{Input, Reader, default_types, fit_row, names_or_no_rows, positional_name, unique_name};
use crate::error::{Error, Result};
use crate::options::ReadOptions;
use crate::value::{Row, Value};
use ::csv::{ByteRecord, ReaderBuilder, Trim};

/// Reads delimited records with the `csv` crate.
///
/// Records may have different field counts. While pre-reading, a longer
/// record adds `cN` columns; afterwards rows are cut or padded to the schema.
pub struct CsvReader {
    reader: ::csv::Reader<Input>,
    record: ByteRecord,
    names: Vec<String>,
    types: Vec<String>,
    pre_read: Vec<Row>,
    null: Option<String>,
    limit_read: bool,
    done: bool,
}

impl CsvReader {
    pub fn new(input: Input, opts: &ReadOptions) -> Result<Self> {
        let delimiter = opts.delimiter_char()?;
        Self::with_delimiter(input, opts, delimiter)
    }

    pub fn with_delimiter(input: Input, opts: &ReadOptions, delimiter: char) -> Result<Self> {
        if !delimiter.is_ascii() {
            return Err(Error::delimiter(&opts.delimiter, "must be a single-byte character"));
        }
        let mut builder = ReaderBuilder::new();
        builder.delimiter(delimiter as u8).has_headers(false).flexible(true);
        if delimiter == ' ' {
            builder.trim(Trim::Fields);
        }

        let mut r = Self {
            reader: builder.from_reader(input),
            record: ByteRecord::new(),
            names: Vec::new(),
            types: Vec::new(),
            pre_read: Vec::new(),
            null: opts.null.clone(),
            limit_read: opts.limit_read,
            done: false,
        };

        for _ in 0..opts.skip {
            if !r.next_record()? {
                break;
            }
        }

        let mut budget = opts.pre_read;
        if opts.header {
            budget = budget.saturating_sub(1);
            if r.next_record()? {
                r.set_header();
            }
        }

        for _ in 0..budget {
            if !r.next_record()? {
                break;
            }
            r.grow(r.record.len());
            let row = r.current_row(r.record.len());
            r.pre_read.push(row);
        }
        tracing::debug!(columns = r.names.len(), rows = r.pre_read.len(), "csv pre-read");
        Ok(r)
    }

    fn next_record(&mut self) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        let more = self.reader.read_byte_record(&mut self.record)?;
        if !more {
            self.done = true;
        }
        Ok(more)
    }

    fn set_header(&mut self) {
        for i in 0..self.record.len() {
            let raw = String::from_utf8_lossy(&self.record[i]);
            let base = if raw.is_empty() { positional_name(i) } else { raw.into_owned() };
            let name = unique_name(&base, &self.names);
            self.names.push(name);
        }
        self.types = default_types(self.names.len());
    }

    fn grow(&mut self, width: usize) {
        while self.names.len() < width {
            let name = unique_name(&positional_name(self.names.len()), &self.names);
            self.names.push(name);
            self.types.push(super::DEFAULT_TYPE.to_string());
        }
    }

    fn current_row(&self, width: usize) -> Row {
        let null = self.null.as_deref();
        (0..width)
            .map(|i| match self.record.get(i) {
                Some(field) => Value::from_bytes(field).null_if(null),
                None => Value::Null,
            })
            .collect()
    }
}

impl Reader for CsvReader {
    fn names(&self) -> Result<&[String]> {
        names_or_no_rows(&self.names)
    }

    fn types(&self) -> Result<&[String]> {
        names_or_no_rows(&self.names)?;
        Ok(&self.types)
    }

    fn pre_read_rows(&mut self) -> Vec<Row> {
        let width = self.names.len();
        std::mem::take(&mut self.pre_read).into_iter().map(|row| fit_row(row, width)).collect()
    }

    fn read_row(&mut self) -> Result<Option<Row>> {
        if self.limit_read || !self.next_record()? {
            return Ok(None);
        }
        Ok(Some(self.current_row(self.names.len())))
    }
}
