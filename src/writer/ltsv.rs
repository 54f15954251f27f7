use super::{WriteOptions, Writer, cell_text};
use crate::error::Result;
use crate::value::Value;
use std::io::Write;

/// `label:value` pairs joined by tabs.
pub struct LtsvWriter<O: Write> {
    out: O,
    null: Option<String>,
}

impl<O: Write> LtsvWriter<O> {
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

impl<O: Write + Send> Writer for LtsvWriter<O> {
    fn pre_write(&mut self, _columns: &[String], _types: &[String]) -> Result<()> {
        Ok(())
    }

    fn write_row(&mut self, values: &[Value], columns: &[String]) -> Result<()> {
        let null = self.null.as_deref();
        let fields: Vec<String> = columns
            .iter()
            .zip(values)
            .map(|(label, value)| format!("{}:{}", label, cell_text(value, null)))
            .collect();
        writeln!(self.out, "{}", fields.join("\t"))?;
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
    fn test_write_ltsv() {
        let columns = vec!["host".to_string(), "status".to_string()];
        let mut w = LtsvWriter::new(Vec::new(), &WriteOptions::new());
        w.pre_write(&columns, &[]).unwrap();
        w.write_row(&[Value::from("127.0.0.1"), Value::Int(200)], &columns).unwrap();
        w.write_row(&[Value::from("::1"), Value::Null], &columns).unwrap();
        w.post_write().unwrap();
        assert_eq!(
            String::from_utf8(w.into_inner()).unwrap(),
            "host:127.0.0.1\tstatus:200\nhost:::1\tstatus:\n"
        );
    }
}
