//! Read options and input formats.

use crate::error::{Error, Result};
use nom::{
    IResult,
    branch::alt,
    bytes::complete::take_while_m_n,
    character::complete::{char, none_of},
    combinator::{all_consuming, map_opt, value},
    sequence::{delimited, preceded},
};
use std::fmt;
use std::str::FromStr;

/// Input format of a table file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Decide from the file extension.
    #[default]
    Guess,
    Csv,
    Ltsv,
    Json,
    Yaml,
    Tbln,
    /// Whitespace aligned text, column widths guessed.
    Width,
    /// One `text` column per line.
    Text,
    Tsv,
    Psv,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::Guess => "GUESS",
            Format::Csv => "CSV",
            Format::Ltsv => "LTSV",
            Format::Json => "JSON",
            Format::Yaml => "YAML",
            Format::Tbln => "TBLN",
            Format::Width => "WIDTH",
            Format::Text => "TEXT",
            Format::Tsv => "TSV",
            Format::Psv => "PSV",
        };
        f.write_str(name)
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "guess" => Ok(Format::Guess),
            "csv" => Ok(Format::Csv),
            "ltsv" => Ok(Format::Ltsv),
            "json" | "jsonl" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            "tbln" => Ok(Format::Tbln),
            "width" => Ok(Format::Width),
            "text" => Ok(Format::Text),
            "tsv" => Ok(Format::Tsv),
            "psv" => Ok(Format::Psv),
            other => Err(Error::UnknownFormat(other.to_string())),
        }
    }
}

/// Options that determine how a reader decodes its input.
///
/// Readers take a shared reference and never modify it.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub format: Format,
    /// Field delimiter literal; escapes such as `\t` are decoded.
    pub delimiter: String,
    /// The first row holds column names.
    pub header: bool,
    /// Rows discarded before anything else is read.
    pub skip: usize,
    /// Rows read ahead to infer the schema.
    pub pre_read: usize,
    /// Path selector applied to each JSON/YAML document.
    pub path: Option<String>,
    /// Values equal to this string are loaded as NULL.
    pub null: Option<String>,
    /// Prepend a running row number column.
    pub row_number: bool,
    /// Load only the pre-read rows.
    pub limit_read: bool,
    /// Create temporary tables.
    pub temporary: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            format: Format::Guess,
            delimiter: ",".to_string(),
            header: false,
            skip: 0,
            pre_read: 1,
            path: None,
            null: None,
            row_number: false,
            limit_read: false,
            temporary: true,
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn delimiter(mut self, delimiter: &str) -> Self {
        self.delimiter = delimiter.to_string();
        self
    }

    pub fn header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn pre_read(mut self, rows: usize) -> Self {
        self.pre_read = rows;
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    pub fn null(mut self, sentinel: &str) -> Self {
        self.null = Some(sentinel.to_string());
        self
    }

    pub fn row_number(mut self, enabled: bool) -> Self {
        self.row_number = enabled;
        self
    }

    /// Read only `rows` rows.
    pub fn limit_read(mut self, rows: usize) -> Self {
        self.limit_read = true;
        self.pre_read = rows;
        self
    }

    pub fn temporary(mut self, temporary: bool) -> Self {
        self.temporary = temporary;
        self
    }

    /// The delimiter decoded to a single character.
    pub fn delimiter_char(&self) -> Result<char> {
        parse_delimiter(&self.delimiter)
    }
}

/// Decode an escape-aware delimiter literal such as `\t` or `\x1f` into one
/// character. An empty literal means a comma.
pub fn parse_delimiter(literal: &str) -> Result<char> {
    if literal.is_empty() {
        return Ok(',');
    }
    match all_consuming(escaped_char)(literal) {
        Ok((_, c)) => Ok(c),
        Err(_) => Err(Error::delimiter(literal, "must be a single character")),
    }
}

fn hex_value(digits: &str) -> Option<char> {
    u32::from_str_radix(digits, 16).ok().and_then(char::from_u32)
}

fn escaped_char(input: &str) -> IResult<&str, char> {
    alt((
        preceded(
            char('\\'),
            alt((
                value('\t', char('t')),
                value('\n', char('n')),
                value('\r', char('r')),
                value('\0', char('0')),
                value('\\', char('\\')),
                value('\'', char('\'')),
                value('"', char('"')),
                map_opt(
                    preceded(char('x'), take_while_m_n(2, 2, |c: char| c.is_ascii_hexdigit())),
                    hex_value,
                ),
                map_opt(
                    preceded(
                        char('u'),
                        alt((
                            delimited(
                                char('{'),
                                take_while_m_n(1, 6, |c: char| c.is_ascii_hexdigit()),
                                char('}'),
                            ),
                            take_while_m_n(4, 4, |c: char| c.is_ascii_hexdigit()),
                        )),
                    ),
                    hex_value,
                ),
            )),
        ),
        none_of("\\"),
    ))(input)
}

/// Guess the format from a file name. Compression suffixes and quotes are
/// ignored; an unknown extension is CSV.
pub fn guess_format(file_name: &str) -> Format {
    let name = file_name.trim_matches(|c| c == '"' || c == '\'' || c == '`');
    let name = strip_suffix_ignore_case(name, ".gz");
    let ext = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => return Format::Csv,
    };
    match ext.as_str() {
        "csv" => Format::Csv,
        "ltsv" => Format::Ltsv,
        "json" | "jsonl" => Format::Json,
        "tbln" => Format::Tbln,
        "yaml" | "yml" => Format::Yaml,
        _ => Format::Csv,
    }
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> &'a str {
    if s.len() >= suffix.len()
        && s.is_char_boundary(s.len() - suffix.len())
        && s[s.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
    {
        &s[..s.len() - suffix.len()]
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter(",").unwrap(), ',');
        assert_eq!(parse_delimiter("\\t").unwrap(), '\t');
        assert_eq!(parse_delimiter("|").unwrap(), '|');
        assert_eq!(parse_delimiter("\\x1f").unwrap(), '\u{1f}');
        assert_eq!(parse_delimiter("\\u3000").unwrap(), '\u{3000}');
        assert_eq!(parse_delimiter("").unwrap(), ',');
    }

    #[test]
    fn test_parse_delimiter_invalid() {
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("\\q").is_err());
        assert!(parse_delimiter("\\").is_err());
    }

    #[test]
    fn test_guess_format() {
        assert_eq!(guess_format("test.csv"), Format::Csv);
        assert_eq!(guess_format("test.LTSV"), Format::Ltsv);
        assert_eq!(guess_format("test.json.gz"), Format::Json);
        assert_eq!(guess_format("test.jsonl"), Format::Json);
        assert_eq!(guess_format("test.yml"), Format::Yaml);
        assert_eq!(guess_format("test.tbln"), Format::Tbln);
        assert_eq!(guess_format("`test.yaml`"), Format::Yaml);
        assert_eq!(guess_format("test.txt"), Format::Csv);
        assert_eq!(guess_format("noext"), Format::Csv);
        assert_eq!(guess_format("-"), Format::Csv);
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("ltsv".parse::<Format>().unwrap(), Format::Ltsv);
        assert!("xml".parse::<Format>().is_err());
    }

    #[test]
    fn test_builder() {
        let opts = ReadOptions::new().header(true).null("\\N").limit_read(5);
        assert!(opts.header);
        assert_eq!(opts.null.as_deref(), Some("\\N"));
        assert!(opts.limit_read);
        assert_eq!(opts.pre_read, 5);
        assert!(opts.temporary);
    }
}
