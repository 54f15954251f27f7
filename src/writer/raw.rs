use super::{WriteOptions, Writer, cell_text};
use crate::error::Result;
use crate::options::parse_delimiter;
use crate::value::Value;
use std::io::Write;

/// Values joined by the delimiter as they are, no quoting.
pub struct RawWriter<O: Write> {
    out: O,
    separator: String,
    header: bool,
    null: Option<String>,
}

impl<O: Write> RawWriter<O> {
    pub fn new(out: O, opts: &WriteOptions) -> Self {
        // A multi-character separator is used literally.
        let separator = parse_delimiter(&opts.delimiter)
            .map(String::from)
            .unwrap_or_else(|_| opts.delimiter.clone());
        Self {
            out,
            separator,
            header: opts.header,
            null: opts.null.clone(),
        }
    }

    pub fn into_inner(self) -> O {
        self.out
    }
}

impl<O: Write + Send> Writer for RawWriter<O> {
    fn pre_write(&mut self, columns: &[String], _types: &[String]) -> Result<()> {
        if self.header {
            writeln!(self.out, "{}", columns.join(&self.separator))?;
        }
        Ok(())
    }

    fn write_row(&mut self, values: &[Value], _columns: &[String]) -> Result<()> {
        let null = self.null.as_deref();
        let cells: Vec<String> = values.iter().map(|v| cell_text(v, null)).collect();
        writeln!(self.out, "{}", cells.join(&self.separator))?;
        Ok(())
    }

    fn post_write(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
