use super::{WriteOptions, Writer, cell_text};
use crate::error::Result;
use crate::value::Value;
use std::io::Write;

/// TBLN with a `; name:` / `; type:` definition header.
pub struct TblnWriter<O: Write> {
    out: O,
    null: Option<String>,
}

impl<O: Write> TblnWriter<O> {
    pub fn new(out: O, opts: &WriteOptions) -> Self {
        Self {
            out,
            null: opts.null.clone(),
        }
    }

    pub fn into_inner(self) -> O {
        self.out
    }

    fn write_cells<I, S>(&mut self, cells: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut line = String::from("|");
        for cell in cells {
            line.push(' ');
            line.push_str(&cell.as_ref().replace('|', "||"));
            line.push_str(" |");
        }
        writeln!(self.out, "{}", line)?;
        Ok(())
    }
}

/// Map an engine type name onto the portable TBLN type names.
pub fn tbln_type(engine_type: &str) -> &'static str {
    match engine_type.to_ascii_lowercase().as_str() {
        "smallint" | "integer" | "int" | "int2" | "int4" | "smallserial" | "serial" => "int",
        "bigint" | "int8" | "bigserial" => "bigint",
        "float" | "float4" | "float8" | "decimal" | "numeric" | "real" | "double" | "double precision" => "numeric",
        "bool" | "boolean" => "bool",
        "timestamp" | "timestamptz" | "date" | "time" | "datetime" => "timestamp",
        _ => "text",
    }
}

impl<O: Write + Send> Writer for TblnWriter<O> {
    fn pre_write(&mut self, columns: &[String], types: &[String]) -> Result<()> {
        write!(self.out, "; name: ")?;
        self.write_cells(columns)?;
        write!(self.out, "; type: ")?;
        self.write_cells(types.iter().map(|t| tbln_type(t)))
    }

    fn write_row(&mut self, values: &[Value], _columns: &[String]) -> Result<()> {
        let null = self.null.clone();
        self.write_cells(values.iter().map(|v| cell_text(v, null.as_deref())))
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
    fn test_write_tbln() {
        let columns = vec!["id".to_string(), "note".to_string()];
        let types = vec!["INTEGER".to_string(), "TEXT".to_string()];
        let mut w = TblnWriter::new(Vec::new(), &WriteOptions::new());
        w.pre_write(&columns, &types).unwrap();
        w.write_row(&[Value::Int(1), Value::from("a|b")], &columns).unwrap();
        w.post_write().unwrap();
        assert_eq!(
            String::from_utf8(w.into_inner()).unwrap(),
            "; name: | id | note |\n; type: | int | text |\n| 1 | a||b |\n"
        );
    }

    #[test]
    fn test_tbln_type() {
        assert_eq!(tbln_type("INT8"), "bigint");
        assert_eq!(tbln_type("double precision"), "numeric");
        assert_eq!(tbln_type("VARCHAR"), "text");
    }
}
