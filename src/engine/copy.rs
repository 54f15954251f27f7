//! COPY text format encoding.
//!
//! Rows are written tab separated and newline terminated, with `\N` for
//! null and backslash escapes for the characters the format reserves.

use crate::error::Result;
use crate::value::Value;
use bytes::{Bytes, BytesMut};

/// Producer of COPY data, pulled one chunk at a time. `None` ends the copy.
pub trait CopySource {
    fn next_chunk(&mut self) -> Result<Option<Bytes>>;
}

fn escape_into(buf: &mut BytesMut, bytes: &[u8]) {
    for &c in bytes {
        match c {
            b'\\' => buf.extend_from_slice(b"\\\\"),
            b'\t' => buf.extend_from_slice(b"\\t"),
            b'\n' => buf.extend_from_slice(b"\\n"),
            b'\r' => buf.extend_from_slice(b"\\r"),
            _ => buf.extend_from_slice(&[c]),
        }
    }
}

/// Encode one value.
#[inline]
pub fn encode_copy_value(buf: &mut BytesMut, value: &Value) {
    match value {
        Value::Null => buf.extend_from_slice(b"\\N"),
        Value::Bool(b) => buf.extend_from_slice(if *b { b"t" } else { b"f" }),
        Value::Int(n) => {
            let mut tmp = itoa::Buffer::new();
            buf.extend_from_slice(tmp.format(*n).as_bytes());
        }
        Value::Float(n) => {
            let mut tmp = ryu::Buffer::new();
            buf.extend_from_slice(tmp.format(*n).as_bytes());
        }
        Value::Text(s) => escape_into(buf, s.as_bytes()),
        Value::Bytes(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => escape_into(buf, s.as_bytes()),
            // bytea hex input, backslash escaped for the text format
            Err(_) => {
                buf.extend_from_slice(b"\\\\x");
                for byte in bytes {
                    let hi = byte >> 4;
                    let lo = byte & 0x0f;
                    buf.extend_from_slice(&[
                        if hi < 10 { b'0' + hi } else { b'a' + hi - 10 },
                        if lo < 10 { b'0' + lo } else { b'a' + lo - 10 },
                    ]);
                }
            }
        },
        Value::Timestamp(ts) => buf.extend_from_slice(ts.to_rfc3339().as_bytes()),
    }
}

/// Encode one row, padded with nulls or cut to `width` columns.
pub fn encode_copy_row(buf: &mut BytesMut, row: &[Value], width: usize) {
    for i in 0..width {
        if i > 0 {
            buf.extend_from_slice(b"\t");
        }
        encode_copy_value(buf, row.get(i).unwrap_or(&Value::Null));
    }
    buf.extend_from_slice(b"\n");
}
