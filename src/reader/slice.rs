//! In-memory data as a table.

use super::{Columns, Reader, positional_name};
use crate::error::{Error, Result};
use crate::value::{Row, Value};
use serde::Serialize;
use serde_json::Value as JsonValue;

/// A table built from any serializable value.
///
/// Accepted shapes:
///
/// - a sequence of scalars: one column `c1`
/// - a sequence of sequences: columns `c1..cN`, N being the longest
/// - a sequence of records: the union of field names
/// - a record or map: one row per entry, key in `c1`, value in `c2`
///
/// Every row is available from [`Reader::pre_read_rows`]; there is nothing
/// left to stream afterwards.
#[derive(Debug)]
pub struct SliceReader {
    names: Vec<String>,
    types: Vec<String>,
    rows: Vec<Row>,
}

impl SliceReader {
    pub fn new<T: Serialize + ?Sized>(data: &T) -> Result<Self> {
        match serde_json::to_value(data)? {
            JsonValue::Array(items) => Self::from_sequence(items),
            JsonValue::Object(map) => {
                let rows = map
                    .into_iter()
                    .map(|(k, v)| vec![Value::Text(k), cell(v)])
                    .collect();
                Ok(Self::with_rows(vec!["c1".into(), "c2".into()], rows))
            }
            other => Err(Error::UnsupportedShape(shape_name(&other).to_string())),
        }
    }

    fn from_sequence(items: Vec<JsonValue>) -> Result<Self> {
        let first_shape = items.first().map(shape_name);
        match first_shape {
            None => Ok(Self::with_rows(vec![positional_name(0)], Vec::new())),
            Some("sequence") => {
                let mut rows = Vec::with_capacity(items.len());
                for item in items {
                    let JsonValue::Array(values) = item else {
                        return Err(mixed(first_shape, &item));
                    };
                    rows.push(values.into_iter().map(cell).collect::<Row>());
                }
                let width = rows.iter().map(Vec::len).max().unwrap_or(0);
                for row in &mut rows {
                    row.resize(width, Value::Null);
                }
                Ok(Self::with_rows((0..width).map(positional_name).collect(), rows))
            }
            Some("record") => {
                let mut columns = Columns::new();
                let mut records = Vec::with_capacity(items.len());
                for item in items {
                    let JsonValue::Object(map) = item else {
                        return Err(mixed(first_shape, &item));
                    };
                    let record: Vec<(usize, Value)> = map
                        .into_iter()
                        .map(|(k, v)| (columns.add(&k), cell(v)))
                        .collect();
                    records.push(record);
                }
                let rows = records
                    .into_iter()
                    .map(|record| {
                        let mut row = vec![Value::Null; columns.len()];
                        for (i, v) in record {
                            row[i] = v;
                        }
                        row
                    })
                    .collect();
                Ok(Self::with_rows(columns.names().to_vec(), rows))
            }
            Some(_) => {
                let rows = items.into_iter().map(|v| vec![cell(v)]).collect();
                Ok(Self::with_rows(vec![positional_name(0)], rows))
            }
        }
    }

    fn with_rows(names: Vec<String>, rows: Vec<Row>) -> Self {
        let types = (0..names.len()).map(|i| column_type(&rows, i).to_string()).collect();
        Self { names, types, rows }
    }
}

fn mixed(first: Option<&'static str>, item: &JsonValue) -> Error {
    Error::UnsupportedShape(format!(
        "{} mixed with {}",
        first.unwrap_or("nothing"),
        shape_name(item)
    ))
}

fn shape_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "sequence",
        JsonValue::Object(_) => "record",
    }
}

/// `int` when every non-null value of the column is an integer.
fn column_type(rows: &[Row], index: usize) -> &'static str {
    let mut values = rows.iter().filter_map(|r| r.get(index)).filter(|v| !v.is_null()).peekable();
    if values.peek().is_some() && values.all(|v| matches!(v, Value::Int(_))) {
        "int"
    } else {
        super::DEFAULT_TYPE
    }
}

fn cell(value: JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map_or_else(|| Value::Text(n.to_string()), Value::Float),
        },
        JsonValue::String(s) => Value::Text(s),
        nested => Value::Text(nested.to_string()),
    }
}

impl Reader for SliceReader {
    fn names(&self) -> Result<&[String]> {
        Ok(&self.names)
    }

    fn types(&self) -> Result<&[String]> {
        Ok(&self.types)
    }

    fn pre_read_rows(&mut self) -> Vec<Row> {
        std::mem::take(&mut self.rows)
    }

    fn read_row(&mut self) -> Result<Option<Row>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Fruit {
        id: i64,
        name: &'static str,
    }

    #[test]
    fn test_scalars() {
        let mut r = SliceReader::new(&["a", "b"]).unwrap();
        assert_eq!(r.names().unwrap(), ["c1"]);
        assert_eq!(r.types().unwrap(), ["text"]);
        assert_eq!(r.pre_read_rows(), vec![vec![Value::from("a")], vec![Value::from("b")]]);
        assert_eq!(r.read_row().unwrap(), None);
    }

    #[test]
    fn test_sequences() {
        let data = vec![vec![1, 2], vec![3]];
        let mut r = SliceReader::new(&data).unwrap();
        assert_eq!(r.names().unwrap(), ["c1", "c2"]);
        assert_eq!(r.types().unwrap(), ["int", "int"]);
        assert_eq!(r.pre_read_rows()[1], vec![Value::Int(3), Value::Null]);
    }

    #[test]
    fn test_records() {
        let data = vec![Fruit { id: 1, name: "Orange" }, Fruit { id: 2, name: "Melon" }];
        let mut r = SliceReader::new(&data).unwrap();
        assert_eq!(r.names().unwrap(), ["id", "name"]);
        assert_eq!(r.types().unwrap(), ["int", "text"]);
        assert_eq!(r.pre_read_rows()[0], vec![Value::Int(1), Value::from("Orange")]);
    }

    #[test]
    fn test_mapping() {
        let mut data = BTreeMap::new();
        data.insert("a", 1);
        data.insert("b", 2);
        let mut r = SliceReader::new(&data).unwrap();
        assert_eq!(r.names().unwrap(), ["c1", "c2"]);
        assert_eq!(r.types().unwrap(), ["text", "int"]);
        assert_eq!(r.pre_read_rows()[1], vec![Value::from("b"), Value::Int(2)]);
    }

    #[test]
    fn test_empty_sequence() {
        let data: Vec<i64> = Vec::new();
        let mut r = SliceReader::new(&data).unwrap();
        assert_eq!(r.names().unwrap(), ["c1"]);
        assert!(r.pre_read_rows().is_empty());
    }

    #[test]
    fn test_unsupported() {
        assert!(matches!(SliceReader::new(&42), Err(Error::UnsupportedShape(_))));
        let mixed = serde_json::json!([[1], {"a": 1}]);
        assert!(matches!(SliceReader::new(&mixed), Err(Error::UnsupportedShape(_))));
    }
}
