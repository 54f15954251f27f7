//! Row number column decorator.

use super::{Reader, names_or_no_rows, unique_name};
use crate::error::Result;
use crate::value::{Row, Value};

const NUMBER_COLUMN: &str = "num";
const NUMBER_TYPE: &str = "int";

/// Wraps a reader and prepends a 1-based running row number.
///
/// The column is called `num`, or `num0`, `num1`, ... when the wrapped
/// schema already uses the name. Numbering runs across pre-read and live
/// rows without gaps.
pub struct RowNumberReader<R> {
    inner: R,
    names: Vec<String>,
    types: Vec<String>,
    count: i64,
}

impl<R: Reader> RowNumberReader<R> {
    pub fn new(inner: R) -> Self {
        let (names, types) = match (inner.names(), inner.types()) {
            (Ok(names), Ok(types)) => {
                let number = unique_name(NUMBER_COLUMN, names);
                let mut all_names = vec![number];
                all_names.extend_from_slice(names);
                let mut all_types = vec![NUMBER_TYPE.to_string()];
                all_types.extend_from_slice(types);
                (all_names, all_types)
            }
            _ => (Vec::new(), Vec::new()),
        };
        Self {
            inner,
            names,
            types,
            count: 0,
        }
    }

    fn number(&mut self, row: Row) -> Row {
        self.count += 1;
        let mut numbered = Vec::with_capacity(row.len() + 1);
        numbered.push(Value::Int(self.count));
        numbered.extend(row);
        numbered
    }
}

impl<R: Reader> Reader for RowNumberReader<R> {
    fn names(&self) -> Result<&[String]> {
        names_or_no_rows(&self.names)
    }

    fn types(&self) -> Result<&[String]> {
        names_or_no_rows(&self.names)?;
        Ok(&self.types)
    }

    fn pre_read_rows(&mut self) -> Vec<Row> {
        let rows = self.inner.pre_read_rows();
        rows.into_iter().map(|row| self.number(row)).collect()
    }

    fn read_row(&mut self) -> Result<Option<Row>> {
        Ok(self.inner.read_row()?.map(|row| self.number(row)))
    }
}
