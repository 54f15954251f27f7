use super::{WriteOptions, Writer, json_object};
use crate::error::Result;
use crate::value::Value;
use serde_json::Value as JsonValue;
use std::io::Write;

/// A pretty-printed array of objects, written once all rows are in.
pub struct JsonWriter<O: Write> {
    out: O,
    null: Option<String>,
    rows: Vec<JsonValue>,
}

impl<O: Write> JsonWriter<O> {
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

impl<O: Write + Send> Writer for JsonWriter<O> {
    fn pre_write(&mut self, _columns: &[String], _types: &[String]) -> Result<()> {
        self.rows.clear();
        Ok(())
    }

    fn write_row(&mut self, values: &[Value], columns: &[String]) -> Result<()> {
        self.rows.push(json_object(values, columns, self.null.as_deref()));
        Ok(())
    }

    fn post_write(&mut self) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.out, &self.rows)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

/// One compact object per line.
pub struct JsonlWriter<O: Write> {
    out: O,
    null: Option<String>,
}

impl<O: Write> JsonlWriter<O> {
    pub fn new(out: O, opts: &WriteOptions) -> Self {
        Self {
            out,
            null: opts.null.clone(),
        }
    }

    pub fn into_inner(self) -> O {
        self.out
    }
}

impl<O: Write + Send> Writer for JsonlWriter<O> {
    fn pre_write(&mut self, _columns: &[String], _types: &[String]) -> Result<()> {
        Ok(())
    }

    fn write_row(&mut self, values: &[Value], columns: &[String]) -> Result<()> {
        serde_json::to_writer(&mut self.out, &json_object(values, columns, self.null.as_deref()))?;
        writeln!(self.out)?;
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

    fn columns() -> Vec<String> {
        vec!["name".to_string(), "age".to_string()]
    }

    #[test]
    fn test_json_array_keeps_column_order() {
        let mut w = JsonWriter::new(Vec::new(), &WriteOptions::new());
        w.pre_write(&columns(), &[]).unwrap();
        w.write_row(&[Value::from("bob"), Value::Int(30)], &columns()).unwrap();
        w.post_write().unwrap();
        assert_eq!(
            String::from_utf8(w.into_inner()).unwrap(),
            "[\n  {\n    \"name\": \"bob\",\n    \"age\": 30\n  }\n]\n"
        );
    }

    #[test]
    fn test_jsonl() {
        let mut w = JsonlWriter::new(Vec::new(), &WriteOptions::new());
        w.pre_write(&columns(), &[]).unwrap();
        w.write_row(&[Value::from("ann"), Value::Null], &columns()).unwrap();
        w.write_row(&[Value::from("joe"), Value::from("7")], &columns()).unwrap();
        w.post_write().unwrap();
        assert_eq!(
            String::from_utf8(w.into_inner()).unwrap(),
            "{\"name\":\"ann\",\"age\":null}\n{\"name\":\"joe\",\"age\":\"7\"}\n"
        );
    }
}
