//! TBLN: pipe-framed rows with an embedded column definition.
//!
//! ```text
//! ; name: | id | name |
//! ; type: | int | text |
//! # comment
//! | 1 | Bob |
//! | 2 | a || b |
//! ```

use super::{Input, Reader, default_types, fit_row, names_or_no_rows, positional_name, unique_name};
use crate::error::{Error, Result};
use crate::options::ReadOptions;
use crate::value::{Row, Value};
use std::io::{BufRead, BufReader};

enum Line {
    Row(Vec<String>),
    Extra { key: String, values: Vec<String> },
}

pub struct TblnReader {
    input: BufReader<Input>,
    names: Vec<String>,
    types: Vec<String>,
    pre_read: Vec<Row>,
    null: Option<String>,
    limit_read: bool,
    line_no: usize,
    done: bool,
}

impl TblnReader {
    pub fn new(input: Input, opts: &ReadOptions) -> Result<Self> {
        let mut r = Self {
            input: BufReader::new(input),
            names: Vec::new(),
            types: Vec::new(),
            pre_read: Vec::new(),
            null: opts.null.clone(),
            limit_read: opts.limit_read,
            line_no: 0,
            done: false,
        };

        let mut names = Vec::new();
        let mut types = Vec::new();
        let first = loop {
            match r.next_line()? {
                None => break None,
                Some(Line::Row(cells)) => break Some(cells),
                Some(Line::Extra { key, values }) => match key.as_str() {
                    "name" => names = values,
                    "type" => types = values,
                    _ => tracing::debug!(key = %key, "tbln extra ignored"),
                },
            }
        };
        let Some(first) = first else {
            return Ok(r);
        };

        if names.is_empty() {
            names = (0..first.len()).map(positional_name).collect();
        }
        if types.is_empty() {
            types = default_types(names.len());
        }
        if names.len() != types.len() {
            return Err(Error::ColumnMismatch {
                names: names.len(),
                types: types.len(),
            });
        }
        for (i, name) in names.iter().enumerate() {
            let base = if name.is_empty() { positional_name(i) } else { name.clone() };
            let unique = unique_name(&base, &r.names);
            r.names.push(unique);
        }
        r.types = types;

        if opts.pre_read > 0 {
            let row = r.to_row(first);
            r.pre_read.push(row);
        }
        while r.pre_read.len() < opts.pre_read {
            match r.next_row()? {
                Some(cells) => {
                    let row = r.to_row(cells);
                    r.pre_read.push(row);
                }
                None => break,
            }
        }
        Ok(r)
    }

    fn next_line(&mut self) -> Result<Option<Line>> {
        let mut buf = Vec::new();
        while !self.done {
            buf.clear();
            if self.input.read_until(b'\n', &mut buf)? == 0 {
                self.done = true;
                break;
            }
            self.line_no += 1;
            let text = String::from_utf8_lossy(&buf);
            let text = text.trim_end_matches(['\n', '\r']);
            if text.trim().is_empty() || text.starts_with('#') {
                continue;
            }
            return self.parse_line(text).map(Some);
        }
        Ok(None)
    }

    fn next_row(&mut self) -> Result<Option<Vec<String>>> {
        loop {
            match self.next_line()? {
                None => return Ok(None),
                Some(Line::Row(cells)) => return Ok(Some(cells)),
                Some(Line::Extra { .. }) => {}
            }
        }
    }

    fn parse_line(&self, text: &str) -> Result<Line> {
        if let Some(extra) = text.strip_prefix(';') {
            let Some((key, rest)) = extra.split_once(':') else {
                return Err(self.invalid("extra line without ':'"));
            };
            let rest = rest.trim();
            let values = if rest.starts_with('|') {
                split_cells(rest).ok_or_else(|| self.invalid("unterminated definition"))?
            } else {
                vec![rest.to_string()]
            };
            return Ok(Line::Extra {
                key: key.trim().to_string(),
                values,
            });
        }
        if text.starts_with('|') {
            let cells = split_cells(text.trim_end()).ok_or_else(|| self.invalid("unterminated row"))?;
            return Ok(Line::Row(cells));
        }
        Err(self.invalid("expected a row, an extra or a comment"))
    }

    fn invalid(&self, message: &str) -> Error {
        Error::InvalidTbln {
            line: self.line_no,
            message: message.to_string(),
        }
    }

    fn to_row(&self, cells: Vec<String>) -> Row {
        let null = self.null.as_deref();
        let row = cells
            .into_iter()
            .map(|c| {
                if c.is_empty() {
                    Value::Null
                } else {
                    Value::Text(c).null_if(null)
                }
            })
            .collect();
        fit_row(row, self.names.len())
    }
}

/// Split `| a | b |` into trimmed cells. `||` inside a cell is a literal
/// pipe. `None` when the text is not framed by pipes.
fn split_cells(text: &str) -> Option<Vec<String>> {
    let inner = text.strip_prefix('|')?.strip_suffix('|')?;
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '|' {
            cell.push(c);
        } else if chars.peek() == Some(&'|') {
            chars.next();
            cell.push('|');
        } else {
            cells.push(cell.trim().to_string());
            cell.clear();
        }
    }
    cells.push(cell.trim().to_string());
    Some(cells)
}

impl Reader for TblnReader {
    fn names(&self) -> Result<&[String]> {
        names_or_no_rows(&self.names)
    }

    fn types(&self) -> Result<&[String]> {
        names_or_no_rows(&self.names)?;
        Ok(&self.types)
    }

    fn pre_read_rows(&mut self) -> Vec<Row> {
        std::mem::take(&mut self.pre_read)
    }

    fn read_row(&mut self) -> Result<Option<Row>> {
        if self.limit_read {
            return Ok(None);
        }
        Ok(self.next_row()?.map(|cells| self.to_row(cells)))
    }
}
