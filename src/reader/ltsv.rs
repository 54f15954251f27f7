//! Labeled tab-separated values.

use super::{Columns, Input, Reader, default_types, fit_row, names_or_no_rows};
use crate::error::{Error, Result};
use crate::options::ReadOptions;
use crate::value::{Row, Value};
use std::io::{BufRead, BufReader};

/// Reads `key:value` pairs joined by tabs, one record per line.
///
/// The schema is the union of keys seen while pre-reading. Keys that first
/// show up later are dropped.
pub struct LtsvReader {
    input: BufReader<Input>,
    columns: Columns,
    types: Vec<String>,
    pre_read: Vec<Row>,
    null: Option<String>,
    limit_read: bool,
    line_no: usize,
    done: bool,
}

type Pairs = Vec<(String, Value)>;

impl LtsvReader {
    pub fn new(input: Input, opts: &ReadOptions) -> Result<Self> {
        let mut r = Self {
            input: BufReader::new(input),
            columns: Columns::new(),
            types: Vec::new(),
            pre_read: Vec::new(),
            null: opts.null.clone(),
            limit_read: opts.limit_read,
            line_no: 0,
            done: false,
        };

        for _ in 0..opts.skip {
            if r.next_pairs()?.is_none() {
                break;
            }
        }

        for _ in 0..opts.pre_read {
            let Some(pairs) = r.next_pairs()? else {
                break;
            };
            let mut row = Vec::new();
            for (key, value) in pairs {
                let i = r.columns.add(&key);
                if row.len() <= i {
                    row.resize(i + 1, Value::Null);
                }
                row[i] = value;
            }
            r.pre_read.push(row);
        }
        r.types = default_types(r.columns.len());
        tracing::debug!(columns = r.columns.len(), rows = r.pre_read.len(), "ltsv pre-read");
        Ok(r)
    }

    /// Next non-blank line split into pairs.
    fn next_pairs(&mut self) -> Result<Option<Pairs>> {
        let mut buf = Vec::new();
        while !self.done {
            buf.clear();
            if self.input.read_until(b'\n', &mut buf)? == 0 {
                self.done = true;
                break;
            }
            self.line_no += 1;
            let line = trim_line_end(&buf);
            if line.iter().all(|b| b.is_ascii_whitespace()) {
                continue;
            }
            return self.split_pairs(line).map(Some);
        }
        Ok(None)
    }

    fn split_pairs(&self, line: &[u8]) -> Result<Pairs> {
        let null = self.null.as_deref();
        line.split(|&b| b == b'\t')
            .map(|field| {
                let Some(colon) = field.iter().position(|&b| b == b':') else {
                    return Err(Error::InvalidColumn {
                        line: self.line_no,
                        column: String::from_utf8_lossy(field).into_owned(),
                    });
                };
                let key = String::from_utf8_lossy(&field[..colon]).into_owned();
                let value = Value::from_bytes(&field[colon + 1..]).null_if(null);
                Ok((key, value))
            })
            .collect()
    }
}

fn trim_line_end(buf: &[u8]) -> &[u8] {
    let mut end = buf.len();
    while end > 0 && (buf[end - 1] == b'\n' || buf[end - 1] == b'\r') {
        end -= 1;
    }
    &buf[..end]
}

impl Reader for LtsvReader {
    fn names(&self) -> Result<&[String]> {
        names_or_no_rows(self.columns.names())
    }

    fn types(&self) -> Result<&[String]> {
        names_or_no_rows(self.columns.names())?;
        Ok(&self.types)
    }

    fn pre_read_rows(&mut self) -> Vec<Row> {
        let width = self.columns.len();
        std::mem::take(&mut self.pre_read).into_iter().map(|row| fit_row(row, width)).collect()
    }

    fn read_row(&mut self) -> Result<Option<Row>> {
        if self.limit_read {
            return Ok(None);
        }
        let Some(pairs) = self.next_pairs()? else {
            return Ok(None);
        };
        let mut row = vec![Value::Null; self.columns.len()];
        for (key, value) in pairs {
            if let Some(i) = self.columns.position(&key) {
                row[i] = value;
            }
        }
        Ok(Some(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn reader(data: &str, opts: &ReadOptions) -> Result<LtsvReader> {
        LtsvReader::new(Box::new(Cursor::new(data.to_string())), opts)
    }

    #[test]
    fn test_union_of_keys() {
        let opts = ReadOptions::new().pre_read(2);
        let mut r = reader("id:1\tname:Orange\nid:2\tprice:50\nid:3\tcolor:red\n", &opts).unwrap();
        assert_eq!(r.names().unwrap(), ["id", "name", "price"]);
        let rows = r.pre_read_rows();
        assert_eq!(rows[0], vec![Value::from("1"), Value::from("Orange"), Value::Null]);
        assert_eq!(rows[1], vec![Value::from("2"), Value::Null, Value::from("50")]);
        // `color` was not in the pre-read window.
        assert_eq!(
            r.read_row().unwrap(),
            Some(vec![Value::from("3"), Value::Null, Value::Null])
        );
        assert_eq!(r.read_row().unwrap(), None);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let mut r = reader("\na:1\n\n\na:2\n", &ReadOptions::new()).unwrap();
        assert_eq!(r.pre_read_rows(), vec![vec![Value::from("1")]]);
        assert_eq!(r.read_row().unwrap(), Some(vec![Value::from("2")]));
        assert_eq!(r.read_row().unwrap(), None);
    }

    #[test]
    fn test_value_with_colon() {
        let mut r = reader("time:10:20:30\n", &ReadOptions::new()).unwrap();
        assert_eq!(r.pre_read_rows(), vec![vec![Value::from("10:20:30")]]);
    }

    #[test]
    fn test_invalid_column() {
        let err = reader("a:1\tbroken\n", &ReadOptions::new()).err().unwrap();
        assert!(matches!(err, Error::InvalidColumn { line: 1, .. }));

        let mut r = reader("a:1\nnope\n", &ReadOptions::new()).unwrap();
        assert!(matches!(r.read_row(), Err(Error::InvalidColumn { line: 2, .. })));
    }

    #[test]
    fn test_crlf() {
        let mut r = reader("a:1\r\n", &ReadOptions::new()).unwrap();
        assert_eq!(r.pre_read_rows(), vec![vec![Value::from("1")]]);
    }
}
