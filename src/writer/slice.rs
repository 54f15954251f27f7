use super::Writer;
use crate::error::Result;
use crate::value::{Row, Value};

/// Collects the result in memory.
#[derive(Debug, Default, Clone)]
pub struct SliceWriter {
    pub columns: Vec<String>,
    pub types: Vec<String>,
    pub rows: Vec<Row>,
}

impl SliceWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Writer for SliceWriter {
    fn pre_write(&mut self, columns: &[String], types: &[String]) -> Result<()> {
        self.columns = columns.to_vec();
        self.types = types.to_vec();
        self.rows.clear();
        Ok(())
    }

    fn write_row(&mut self, values: &[Value], _columns: &[String]) -> Result<()> {
        self.rows.push(values.to_vec());
        Ok(())
    }

    fn post_write(&mut self) -> Result<()> {
        Ok(())
    }
}
