use super::{WriteOptions, Writer, cell_text};
use crate::error::{Error, Result};
use crate::options::parse_delimiter;
use crate::value::Value;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::io::Write;

/// CSV, quoting only fields that need it unless every field is asked for.
pub struct CsvWriter<O: Write> {
    writer: csv::Writer<O>,
    header: bool,
    null: Option<String>,
}

impl<O: Write> CsvWriter<O> {
    pub fn new(out: O, opts: &WriteOptions) -> Result<Self> {
        let delimiter = parse_delimiter(&opts.delimiter)?;
        if !delimiter.is_ascii() {
            return Err(Error::delimiter(&opts.delimiter, "must be a single-byte character"));
        }
        let mut builder = WriterBuilder::new();
        builder.delimiter(delimiter as u8).flexible(true);
        builder.quote_style(if opts.all_quotes {
            QuoteStyle::Always
        } else {
            QuoteStyle::Necessary
        });
        if opts.crlf {
            builder.terminator(Terminator::CRLF);
        }
        match opts.quote.chars().next() {
            None => {
                builder.quote_style(QuoteStyle::Never);
            }
            Some(q) if q.is_ascii() => {
                builder.quote(q as u8);
            }
            Some(_) => {
                return Err(Error::Config(format!(
                    "quote \"{}\" must be a single-byte character",
                    opts.quote
                )));
            }
        }
        let writer = builder.from_writer(out);
        Ok(Self {
            writer,
            header: opts.header,
            null: opts.null.clone(),
        })
    }

    pub fn into_inner(self) -> Result<O> {
        self.writer.into_inner().map_err(|e| Error::Io(e.into_error()))
    }
}

impl<O: Write + Send> Writer for CsvWriter<O> {
    fn pre_write(&mut self, columns: &[String], _types: &[String]) -> Result<()> {
        if self.header && !columns.is_empty() {
            self.writer.write_record(columns)?;
        }
        Ok(())
    }

    fn write_row(&mut self, values: &[Value], _columns: &[String]) -> Result<()> {
        let null = self.null.as_deref();
        self.writer.write_record(values.iter().map(|v| cell_text(v, null)))?;
        Ok(())
    }

    fn post_write(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn columns() -> Vec<String> {
        vec!["id".to_string(), "name".to_string()]
    }

    fn render(opts: &WriteOptions, rows: &[Vec<Value>]) -> String {
        let mut w = CsvWriter::new(Vec::new(), opts).unwrap();
        w.pre_write(&columns(), &[]).unwrap();
        for row in rows {
            w.write_row(row, &columns()).unwrap();
        }
        w.post_write().unwrap();
        String::from_utf8(w.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_header_and_quoting() {
        let rows = vec![
            vec![Value::Int(1), Value::from("Orange, ripe")],
            vec![Value::Int(2), Value::from("say \"hi\"")],
        ];
        assert_eq!(
            render(&WriteOptions::new().header(true), &rows),
            "id,name\n1,\"Orange, ripe\"\n2,\"say \"\"hi\"\"\"\n"
        );
    }

    #[test]
    fn test_delimiter_and_null() {
        let opts = WriteOptions::new().delimiter("\\t").null("NULL");
        let rows = vec![vec![Value::Int(1), Value::Null]];
        assert_eq!(render(&opts, &rows), "1\tNULL\n");
    }

    #[test]
    fn test_quote_character_and_all_quotes() {
        let rows = vec![vec![Value::Int(1), Value::from("it's")]];
        let opts = WriteOptions::new().quote("'");
        assert_eq!(render(&opts, &rows), "1,'it''s'\n");

        let opts = WriteOptions::new().all_quotes(true).header(true);
        assert_eq!(render(&opts, &rows), "\"id\",\"name\"\n\"1\",\"it's\"\n");
    }

    #[test]
    fn test_crlf_and_no_quoting() {
        let rows = vec![vec![Value::Int(1), Value::from("a,b")]];
        let opts = WriteOptions::new().crlf(true).quote("");
        assert_eq!(render(&opts, &rows), "1,a,b\r\n");
    }

    #[test]
    fn test_multibyte_quote_rejected() {
        let opts = WriteOptions::new().quote("「");
        assert!(matches!(CsvWriter::new(Vec::new(), &opts), Err(Error::Config(_))));
    }

    #[test]
    fn test_multibyte_delimiter_rejected() {
        let opts = WriteOptions::new().delimiter("、");
        assert!(matches!(CsvWriter::new(Vec::new(), &opts), Err(Error::InvalidDelimiter { .. })));
    }
}
