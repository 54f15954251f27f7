use super::{WriteOptions, Writer, cell_text};
use crate::error::Result;
use crate::value::Value;
use comfy_table::presets::{ASCII_FULL, ASCII_MARKDOWN};
use comfy_table::Table;
use std::io::Write;

/// ASCII or Markdown table, rendered after the last row.
pub struct TableWriter<O: Write> {
    out: O,
    table: Table,
    null: Option<String>,
}

impl<O: Write> TableWriter<O> {
    pub fn new(out: O, opts: &WriteOptions, markdown: bool) -> Self {
        let mut table = Table::new();
        table.load_preset(if markdown { ASCII_MARKDOWN } else { ASCII_FULL });
        Self {
            out,
            table,
            null: opts.null.clone(),
        }
    }

    pub fn into_inner(self) -> O {
        self.out
    }
}

impl<O: Write + Send> Writer for TableWriter<O> {
    fn pre_write(&mut self, columns: &[String], _types: &[String]) -> Result<()> {
        self.table.set_header(columns);
        Ok(())
    }

    fn write_row(&mut self, values: &[Value], _columns: &[String]) -> Result<()> {
        let null = self.null.as_deref();
        self.table.add_row(values.iter().map(|v| cell_text(v, null)));
        Ok(())
    }

    fn post_write(&mut self) -> Result<()> {
        writeln!(self.out, "{}", self.table)?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_markdown_table() {
        let columns = vec!["id".to_string(), "name".to_string()];
        let mut w = TableWriter::new(Vec::new(), &WriteOptions::new(), true);
        w.pre_write(&columns, &[]).unwrap();
        w.write_row(&[Value::Int(1), Value::from("ann")], &columns).unwrap();
        w.post_write().unwrap();
        let out = String::from_utf8(w.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("| id"));
        assert!(lines[1].starts_with("|--"));
        assert!(lines[2].contains("| ann"));
    }

    #[test]
    fn test_ascii_table_has_borders() {
        let columns = vec!["c1".to_string()];
        let mut w = TableWriter::new(Vec::new(), &WriteOptions::new(), false);
        w.pre_write(&columns, &[]).unwrap();
        w.write_row(&[Value::from("x")], &columns).unwrap();
        w.post_write().unwrap();
        let out = String::from_utf8(w.into_inner()).unwrap();
        assert!(out.starts_with("+----+"));
        assert!(out.contains("| x  |"));
    }
}
