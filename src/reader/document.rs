//! JSON and YAML documents.
//!
//! Both formats decode into `serde_json::Value` documents and share the row
//! extraction below. A top-level array yields one row per element, anything
//! else yields a single row. Objects contribute their keys as columns; other
//! values land in a `c1` column. Nested objects and arrays are kept as JSON
//! text.

use super::{Columns, Input, PathSelector, Reader, default_types, names_or_no_rows};
use crate::error::Result;
use crate::options::ReadOptions;
use crate::value::{Row, Value};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use serde_json::de::IoRead;
use std::collections::VecDeque;
use std::io::{BufReader, Read};

const SCALAR_COLUMN: &str = "c1";

/// A stream of decoded documents.
pub trait DocumentSource: Send {
    fn next_document(&mut self) -> Result<Option<JsonValue>>;
}

/// Concatenated or line-delimited JSON values.
pub struct JsonDocuments {
    stream: serde_json::StreamDeserializer<'static, IoRead<BufReader<Input>>, JsonValue>,
}

impl JsonDocuments {
    pub fn new(input: Input) -> Self {
        let stream = serde_json::Deserializer::from_reader(BufReader::new(input)).into_iter();
        Self { stream }
    }
}

impl DocumentSource for JsonDocuments {
    fn next_document(&mut self) -> Result<Option<JsonValue>> {
        Ok(self.stream.next().transpose()?)
    }
}

/// A multi-document YAML stream.
///
/// The YAML loader works on a complete buffer, so all documents are decoded
/// up front and handed out one at a time.
pub struct YamlDocuments {
    documents: VecDeque<JsonValue>,
}

impl YamlDocuments {
    pub fn new(mut input: Input) -> Result<Self> {
        let mut text = String::new();
        input.read_to_string(&mut text)?;
        let mut documents = VecDeque::new();
        for document in serde_yaml::Deserializer::from_str(&text) {
            let value = serde_yaml::Value::deserialize(document)?;
            documents.push_back(yaml_to_json(value));
        }
        Ok(Self { documents })
    }
}

impl DocumentSource for YamlDocuments {
    fn next_document(&mut self) -> Result<Option<JsonValue>> {
        Ok(self.documents.pop_front())
    }
}

/// Convert a YAML value, turning mapping keys into strings.
fn yaml_to_json(value: serde_yaml::Value) -> JsonValue {
    use serde_yaml::Value as Y;
    match value {
        Y::Null => JsonValue::Null,
        Y::Bool(b) => JsonValue::Bool(b),
        Y::Number(n) => {
            if let Some(i) = n.as_i64() {
                JsonValue::from(i)
            } else if let Some(u) = n.as_u64() {
                JsonValue::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or_else(|| JsonValue::String(n.to_string()), JsonValue::Number)
            }
        }
        Y::String(s) => JsonValue::String(s),
        Y::Sequence(items) => JsonValue::Array(items.into_iter().map(yaml_to_json).collect()),
        Y::Mapping(map) => JsonValue::Object(
            map.into_iter()
                .map(|(k, v)| (yaml_key(k), yaml_to_json(v)))
                .collect(),
        ),
        Y::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        other => match yaml_to_json(other) {
            JsonValue::String(s) => s,
            v => v.to_string(),
        },
    }
}

/// Cell text for a document value.
fn cell(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::String(s) => Value::Text(s.clone()),
        JsonValue::Bool(b) => Value::Text(b.to_string()),
        JsonValue::Number(n) => Value::Text(n.to_string()),
        nested => Value::Text(nested.to_string()),
    }
}

/// Reader over any [`DocumentSource`].
pub struct DocumentReader<S> {
    source: S,
    path: Option<PathSelector>,
    columns: Columns,
    types: Vec<String>,
    pending: VecDeque<JsonValue>,
    pre_read: Vec<JsonValue>,
    null: Option<String>,
    limit_read: bool,
}

pub type JsonReader = DocumentReader<JsonDocuments>;
pub type YamlReader = DocumentReader<YamlDocuments>;

impl DocumentReader<JsonDocuments> {
    pub fn new(input: Input, opts: &ReadOptions) -> Result<Self> {
        Self::from_source(JsonDocuments::new(input), opts)
    }
}

impl DocumentReader<YamlDocuments> {
    pub fn new(input: Input, opts: &ReadOptions) -> Result<Self> {
        Self::from_source(YamlDocuments::new(input)?, opts)
    }
}

impl<S: DocumentSource> DocumentReader<S> {
    pub fn from_source(source: S, opts: &ReadOptions) -> Result<Self> {
        let path = opts
            .path
            .as_deref()
            .map(PathSelector::parse)
            .filter(|p| !p.is_identity());
        let mut r = Self {
            source,
            path,
            columns: Columns::new(),
            types: Vec::new(),
            pending: VecDeque::new(),
            pre_read: Vec::new(),
            null: opts.null.clone(),
            limit_read: opts.limit_read,
        };

        for _ in 0..opts.skip {
            if r.next_item()?.is_none() {
                break;
            }
        }

        for _ in 0..opts.pre_read {
            let Some(item) = r.next_item()? else {
                break;
            };
            r.register(&item);
            r.pre_read.push(item);
        }
        r.types = default_types(r.columns.len());
        tracing::debug!(columns = r.columns.len(), rows = r.pre_read.len(), "document pre-read");
        Ok(r)
    }

    /// Next row-producing value, decoding documents as needed.
    fn next_item(&mut self) -> Result<Option<JsonValue>> {
        loop {
            if let Some(item) = self.pending.pop_front() {
                return Ok(Some(item));
            }
            let Some(doc) = self.source.next_document()? else {
                return Ok(None);
            };
            let doc = match &self.path {
                Some(path) => path.select(&doc),
                None => doc,
            };
            match doc {
                JsonValue::Array(items) => self.pending.extend(items),
                JsonValue::Null => {}
                other => self.pending.push_back(other),
            }
        }
    }

    fn register(&mut self, item: &JsonValue) {
        match item {
            JsonValue::Object(map) => {
                for key in map.keys() {
                    self.columns.add(key);
                }
            }
            JsonValue::Null => {}
            _ => {
                self.columns.add(SCALAR_COLUMN);
            }
        }
    }

    fn project(&self, item: &JsonValue) -> Row {
        let null = self.null.as_deref();
        let mut row = vec![Value::Null; self.columns.len()];
        match item {
            JsonValue::Object(map) => {
                for (key, v) in map {
                    if let Some(i) = self.columns.position(key) {
                        row[i] = cell(v).null_if(null);
                    }
                }
            }
            other if !row.is_empty() => {
                let i = self.columns.position(SCALAR_COLUMN).unwrap_or(0);
                row[i] = cell(other).null_if(null);
            }
            _ => {}
        }
        row
    }
}

impl<S: DocumentSource> Reader for DocumentReader<S> {
    fn names(&self) -> Result<&[String]> {
        names_or_no_rows(self.columns.names())
    }

    fn types(&self) -> Result<&[String]> {
        names_or_no_rows(self.columns.names())?;
        Ok(&self.types)
    }

    fn pre_read_rows(&mut self) -> Vec<Row> {
        let items = std::mem::take(&mut self.pre_read);
        items.iter().map(|item| self.project(item)).collect()
    }

    fn read_row(&mut self) -> Result<Option<Row>> {
        if self.limit_read {
            return Ok(None);
        }
        Ok(self.next_item()?.map(|item| self.project(&item)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn json(data: &str, opts: &ReadOptions) -> JsonReader {
        JsonReader::new(Box::new(Cursor::new(data.to_string())), opts).unwrap()
    }

    fn yaml(data: &str, opts: &ReadOptions) -> YamlReader {
        YamlReader::new(Box::new(Cursor::new(data.to_string())), opts).unwrap()
    }

    fn drain<R: Reader>(r: &mut R) -> Vec<Row> {
        let mut rows = r.pre_read_rows();
        while let Some(row) = r.read_row().unwrap() {
            rows.push(row);
        }
        rows
    }

    #[test]
    fn test_single_object() {
        let mut r = json(r#"{"a":1}"#, &ReadOptions::new());
        assert_eq!(r.names().unwrap(), ["a"]);
        assert_eq!(drain(&mut r), vec![vec![Value::from("1")]]);
    }

    #[test]
    fn test_array_of_objects() {
        let opts = ReadOptions::new().pre_read(2);
        let mut r = json(r#"[{"a":1},{"a":2,"b":"x"}]"#, &opts);
        assert_eq!(r.names().unwrap(), ["a", "b"]);
        assert_eq!(
            drain(&mut r),
            vec![
                vec![Value::from("1"), Value::Null],
                vec![Value::from("2"), Value::from("x")],
            ]
        );
    }

    #[test]
    fn test_array_of_scalars() {
        let mut r = json(r#"["x","y"]"#, &ReadOptions::new());
        assert_eq!(r.names().unwrap(), ["c1"]);
        assert_eq!(
            drain(&mut r),
            vec![vec![Value::from("x")], vec![Value::from("y")]]
        );
    }

    #[test]
    fn test_json_lines() {
        let data = "{\"id\":1,\"tags\":[\"a\",\"b\"]}\n{\"id\":2,\"tags\":{\"k\":true}}\n";
        let mut r = json(data, &ReadOptions::new());
        assert_eq!(r.names().unwrap(), ["id", "tags"]);
        assert_eq!(
            drain(&mut r),
            vec![
                vec![Value::from("1"), Value::from(r#"["a","b"]"#)],
                vec![Value::from("2"), Value::from(r#"{"k":true}"#)],
            ]
        );
    }

    #[test]
    fn test_path() {
        let opts = ReadOptions::new().path("menu.items");
        let mut r = json(r#"{"menu":{"items":[{"id":"a"},{"id":"b"}]}}"#, &opts);
        assert_eq!(r.names().unwrap(), ["id"]);
        assert_eq!(drain(&mut r).len(), 2);
    }

    #[test]
    fn test_invalid_json() {
        let mut r = json("{\"a\":1}\n{broken", &ReadOptions::new());
        assert!(matches!(r.read_row(), Err(Error::InvalidJson(_))));
    }

    #[test]
    fn test_empty_json() {
        let r = json("", &ReadOptions::new());
        assert!(matches!(r.names(), Err(Error::NoRows)));
    }

    #[test]
    fn test_yaml_documents() {
        let data = "a: 1\nb: hello\n---\na: 2\nc: [1, 2]\n";
        let opts = ReadOptions::new().pre_read(2);
        let mut r = yaml(data, &opts);
        assert_eq!(r.names().unwrap(), ["a", "b", "c"]);
        assert_eq!(
            drain(&mut r),
            vec![
                vec![Value::from("1"), Value::from("hello"), Value::Null],
                vec![Value::from("2"), Value::Null, Value::from("[1,2]")],
            ]
        );
    }

    #[test]
    fn test_yaml_sequence() {
        let mut r = yaml("- name: x\n- name: y\n", &ReadOptions::new());
        assert_eq!(r.names().unwrap(), ["name"]);
        assert_eq!(
            drain(&mut r),
            vec![vec![Value::from("x")], vec![Value::from("y")]]
        );
    }

    #[test]
    fn test_yaml_non_string_keys() {
        let mut r = yaml("1: one\ntrue: yes\n", &ReadOptions::new());
        assert_eq!(r.names().unwrap(), ["1", "true"]);
        assert_eq!(drain(&mut r).len(), 1);
    }

    #[test]
    fn test_null_element_adds_no_column() {
        let opts = ReadOptions::new().pre_read(2);
        let mut r = json(r#"[{"a":1},null]"#, &opts);
        assert_eq!(r.names().unwrap(), ["a"]);
        assert_eq!(drain(&mut r), vec![vec![Value::from("1")], vec![Value::Null]]);
    }

    #[test]
    fn test_null_sentinel() {
        let opts = ReadOptions::new().null("-");
        let mut r = json(r#"{"a":"-","b":"x"}"#, &opts);
        assert_eq!(drain(&mut r), vec![vec![Value::Null, Value::from("x")]]);
    }
}
