use super::{WriteOptions, Writer, json_object};
use crate::error::Result;
use crate::value::Value;
use serde_json::Value as JsonValue;
use std::io::Write;

/// A YAML sequence of mappings, written once all rows are in.
pub struct YamlWriter<O: Write> {
    out: O,
    null: Option<String>,
    rows: Vec<JsonValue>,
}

impl<O: Write> YamlWriter<O> {
    pub fn new(out: O, opts: &WriteOptions) -> Self {
        Self {
            out,
            null: opts.null.clone(),
            rows: Vec::new(),
        }
    }

    pub fn into_inner(self) -> O {
        self.out
    }
}

impl<O: Write + Send> Writer for YamlWriter<O> {
    fn pre_write(&mut self, _columns: &[String], _types: &[String]) -> Result<()> {
        self.rows.clear();
        Ok(())
    }

    fn write_row(&mut self, values: &[Value], columns: &[String]) -> Result<()> {
        self.rows.push(json_object(values, columns, self.null.as_deref()));
        Ok(())
    }

    fn post_write(&mut self) -> Result<()> {
        serde_yaml::to_writer(&mut self.out, &self.rows)?;
        self.out.flush()?;
        Ok(())
    }
}
