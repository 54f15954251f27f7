//! Cell values shared by readers, the loader and writers.

use chrono::{DateTime, Utc};
use std::fmt;

/// A single cell of a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Raw bytes that are not known to be UTF-8.
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
}

/// A row aligned to a column schema by position.
pub type Row = Vec<Value>;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Build a value from bytes, keeping text when the bytes are valid UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(s) => Value::Text(s.to_string()),
            Err(_) => Value::Bytes(bytes.to_vec()),
        }
    }

    /// Canonical value-to-text conversion used by every writer.
    ///
    /// Null becomes the empty string, non UTF-8 bytes become `\x` followed by
    /// lowercase hex, timestamps use RFC 3339.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Bytes(b) => match std::str::from_utf8(b) {
                Ok(s) => s.to_string(),
                Err(_) => hex_escape(b),
            },
            Value::Timestamp(t) => t.to_rfc3339(),
        }
    }

    /// Replace the value with null when its text form equals `sentinel`.
    pub fn null_if(self, sentinel: Option<&str>) -> Self {
        let Some(sentinel) = sentinel else {
            return self;
        };
        let matched = match &self {
            Value::Text(s) => s == sentinel,
            Value::Bytes(b) => b.as_slice() == sentinel.as_bytes(),
            _ => false,
        };
        if matched { Value::Null } else { self }
    }
}

/// `\x` + lowercase hex of the input.
pub fn hex_escape(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
