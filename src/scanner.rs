//! Table reference scanner using nom.
//!
//! This is not a SQL parser. The query is split into quote-aware fields and
//! the fields right after `FROM`, `JOIN` or a comma inside a table list are
//! collected as table references.
//!
//! ```text
//! SELECT a, b FROM log.csv, "my data.ltsv" WHERE a = 'x y'
//!                  ───┬───  ──────┬───────
//!                     └── references, in order of appearance
//! ```

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::char,
    combinator::{map, opt, recognize},
    multi::many1,
    sequence::tuple,
};
use std::collections::HashSet;
use std::ops::Range;

/// Words that end a table list.
const SQL_KEYWORDS: &[&str] = &[
    "WHERE", "GROUP", "HAVING", "WINDOW", "UNION", "ORDER", "LIMIT", "OFFSET", "FETCH", "FOR",
    "LEFT", "RIGHT", "CROSS", "INNER", "FULL", "LATERAL", "(SELECT",
];

const QUOTES: [char; 3] = ['\'', '"', '`'];

fn is_keyword(word: &str) -> bool {
    let upper = word.to_ascii_uppercase();
    SQL_KEYWORDS.contains(&upper.as_str())
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ';' || c == '='
}

fn is_bare(c: char) -> bool {
    !is_separator(c) && c != ',' && !QUOTES.contains(&c)
}

/// A quoted run; an unterminated quote runs to the end of input.
fn quoted(q: char) -> impl Fn(&str) -> IResult<&str, &str> {
    move |input| recognize(tuple((char(q), take_while(move |c| c != q), opt(char(q)))))(input)
}

/// A field: bare characters and quoted runs glued together.
fn field(input: &str) -> IResult<&str, &str> {
    recognize(many1(alt((
        quoted('\''),
        quoted('"'),
        quoted('`'),
        take_while1(is_bare),
    ))))(input)
}

/// One step of the tokenizer. Separators produce `None`.
fn token(input: &str) -> IResult<&str, Option<&str>> {
    alt((
        map(char(','), |_| Some(",")),
        map(take_while1(is_separator), |_| None),
        map(field, Some),
    ))(input)
}

/// Fields of a query with their byte offsets.
fn fields_at(sql: &str) -> Vec<(usize, &str)> {
    let mut fields = Vec::new();
    let mut rest = sql;
    while !rest.is_empty() {
        match token(rest) {
            Ok((remaining, tok)) => {
                if let Some(tok) = tok {
                    fields.push((sql.len() - rest.len(), tok));
                }
                rest = remaining;
            }
            Err(_) => break,
        }
    }
    fields
}

/// Split a query into fields, keeping commas as their own field.
///
/// Whitespace, `;` and `=` separate fields and are dropped. Inside a quoted
/// run (single, double or back quote) nothing separates.
pub fn sql_fields(sql: &str) -> Vec<String> {
    fields_at(sql).into_iter().map(|(_, f)| f.to_string()).collect()
}

/// A table reference and the bytes it occupies in the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub span: Range<usize>,
}

/// Every field in table position, in query order. The same name shows up
/// once per occurrence.
pub fn table_spans(sql: &str) -> Vec<TableRef> {
    let fields = fields_at(sql);
    tracing::debug!("[{}]", fields.iter().map(|(_, f)| *f).collect::<Vec<_>>().join("]["));

    let mut refs = Vec::new();
    let mut in_list = false;
    for (i, (_, word)) in fields.iter().enumerate() {
        let mut front = false;
        if word.eq_ignore_ascii_case("FROM") || word.eq_ignore_ascii_case("JOIN") {
            in_list = true;
            front = true;
        } else if is_keyword(word) {
            in_list = false;
        } else if *word == "," {
            front = true;
        }

        if !(in_list && front) {
            continue;
        }
        let Some(&(start, next)) = fields.get(i + 1) else {
            continue;
        };
        let name = next.strip_suffix(')').unwrap_or(next);
        if name.is_empty() || name == "," || is_keyword(name) {
            continue;
        }
        refs.push(TableRef {
            name: name.to_string(),
            span: start..start + name.len(),
        });
    }
    refs
}

/// Find the table references of a query, deduplicated, in order of first
/// appearance. A query without `FROM`/`JOIN` yields an empty list.
pub fn table_refs(sql: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    table_spans(sql)
        .into_iter()
        .filter(|table| seen.insert(table.name.clone()))
        .map(|table| table.name)
        .collect()
}
