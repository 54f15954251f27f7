//! Plain text, one row per line.

use super::{DEFAULT_TYPE, Input, Reader};
use crate::error::Result;
use crate::options::ReadOptions;
use crate::value::{Row, Value};
use std::io::{BufRead, BufReader};

const TEXT_COLUMN: &str = "text";

/// Every line becomes a row with a single `text` column. Nothing is read
/// ahead; the schema is fixed.
pub struct TextReader {
    input: BufReader<Input>,
    names: Vec<String>,
    types: Vec<String>,
    /// Row cap when only a limited number of rows is read.
    max_rows: Option<usize>,
    count: usize,
    done: bool,
}

impl TextReader {
    pub fn new(input: Input, opts: &ReadOptions) -> Result<Self> {
        let mut r = Self {
            input: BufReader::new(input),
            names: vec![TEXT_COLUMN.to_string()],
            types: vec![DEFAULT_TYPE.to_string()],
            max_rows: opts.limit_read.then_some(opts.pre_read),
            count: 0,
            done: false,
        };
        for _ in 0..opts.skip {
            if r.next_line()?.is_none() {
                break;
            }
        }
        Ok(r)
    }

    fn next_line(&mut self) -> Result<Option<Vec<u8>>> {
        if self.done {
            return Ok(None);
        }
        let mut buf = Vec::new();
        if self.input.read_until(b'\n', &mut buf)? == 0 {
            self.done = true;
            return Ok(None);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        Ok(Some(buf))
    }
}

impl Reader for TextReader {
    fn names(&self) -> Result<&[String]> {
        Ok(&self.names)
    }

    fn types(&self) -> Result<&[String]> {
        Ok(&self.types)
    }

    fn pre_read_rows(&mut self) -> Vec<Row> {
        Vec::new()
    }

    fn read_row(&mut self) -> Result<Option<Row>> {
        if self.max_rows.is_some_and(|max| self.count >= max) {
            return Ok(None);
        }
        let Some(line) = self.next_line()? else {
            return Ok(None);
        };
        self.count += 1;
        Ok(Some(vec![Value::from_bytes(&line)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn reader(data: &str, opts: &ReadOptions) -> TextReader {
        TextReader::new(Box::new(Cursor::new(data.to_string())), opts).unwrap()
    }

    #[test]
    fn test_lines() {
        let mut r = reader("a b c\n\nlast", &ReadOptions::new());
        assert_eq!(r.names().unwrap(), ["text"]);
        assert!(r.pre_read_rows().is_empty());
        assert_eq!(r.read_row().unwrap(), Some(vec![Value::from("a b c")]));
        assert_eq!(r.read_row().unwrap(), Some(vec![Value::from("")]));
        assert_eq!(r.read_row().unwrap(), Some(vec![Value::from("last")]));
        assert_eq!(r.read_row().unwrap(), None);
    }

    #[test]
    fn test_skip_and_limit() {
        let opts = ReadOptions::new().skip(1).limit_read(1);
        let mut r = reader("skip\r\nkeep\r\nmore\r\n", &opts);
        assert_eq!(r.read_row().unwrap(), Some(vec![Value::from("keep")]));
        assert_eq!(r.read_row().unwrap(), None);
    }
}
