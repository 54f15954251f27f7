use super::{WriteOptions, Writer, cell_text};
use crate::error::Result;
use crate::value::Value;
use std::io::Write;

const RULE: &str = "***************************";

/// One block per row, column names right-aligned.
pub struct VerticalWriter<O: Write> {
    out: O,
    null: Option<String>,
    width: usize,
    count: usize,
}

impl<O: Write> VerticalWriter<O> {
    pub fn new(out: O, opts: &WriteOptions) -> Self {
        Self {
            out,
            null: opts.null.clone(),
            width: 0,
            count: 0,
        }
    }

    pub fn into_inner(self) -> O {
        self.out
    }
}

impl<O: Write + Send> Writer for VerticalWriter<O> {
    fn pre_write(&mut self, columns: &[String], _types: &[String]) -> Result<()> {
        self.width = columns.iter().map(|c| c.chars().count()).max().unwrap_or(0);
        self.count = 0;
        Ok(())
    }

    fn write_row(&mut self, values: &[Value], columns: &[String]) -> Result<()> {
        self.count += 1;
        writeln!(self.out, "{} {}. row {}", RULE, self.count, RULE)?;
        let null = self.null.as_deref();
        for (column, value) in columns.iter().zip(values) {
            writeln!(self.out, "{:>width$}: {}", column, cell_text(value, null), width = self.width)?;
        }
        Ok(())
    }

    fn post_write(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_vertical_blocks() {
        let columns = vec!["id".to_string(), "name".to_string()];
        let mut w = VerticalWriter::new(Vec::new(), &WriteOptions::new());
        w.pre_write(&columns, &[]).unwrap();
        w.write_row(&[Value::Int(1), Value::from("ann")], &columns).unwrap();
        w.write_row(&[Value::Int(2), Value::Null], &columns).unwrap();
        w.post_write().unwrap();
        let expected = format!(
            "{r} 1. row {r}\n  id: 1\nname: ann\n{r} 2. row {r}\n  id: 2\nname: \n",
            r = RULE
        );
        assert_eq!(String::from_utf8(w.into_inner()).unwrap(), expected);
    }
}
