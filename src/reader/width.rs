//! Whitespace-aligned text such as `ps` or `df` output.

use super::{Input, Reader, default_types, names_or_no_rows, positional_name, unique_name};
use crate::error::Result;
use crate::options::ReadOptions;
use crate::value::{Row, Value};
use std::collections::VecDeque;
use std::io::{BufRead, BufReader};

/// Minimum number of lines sampled to guess column boundaries.
const SCAN_LINES: usize = 1000;
const TAB_WIDTH: usize = 8;

/// Splits lines at column boundaries guessed from a sample.
///
/// A boundary is a position between two words of the first line that is
/// blank in every sampled line. Words with no such position between them
/// belong to the same column.
pub struct WidthReader {
    input: BufReader<Input>,
    boundaries: Vec<usize>,
    sample: VecDeque<Vec<char>>,
    names: Vec<String>,
    types: Vec<String>,
    pre_read: Vec<Row>,
    null: Option<String>,
    limit_read: bool,
    done: bool,
}

impl WidthReader {
    pub fn new(input: Input, opts: &ReadOptions) -> Result<Self> {
        let mut r = Self {
            input: BufReader::new(input),
            boundaries: Vec::new(),
            sample: VecDeque::new(),
            names: Vec::new(),
            types: Vec::new(),
            pre_read: Vec::new(),
            null: opts.null.clone(),
            limit_read: opts.limit_read,
            done: false,
        };

        for _ in 0..opts.skip {
            if r.next_line()?.is_none() {
                break;
            }
        }

        let scan = SCAN_LINES.max(opts.pre_read);
        while r.sample.len() < scan {
            match r.next_line()? {
                Some(line) => r.sample.push_back(line),
                None => break,
            }
        }
        let Some(first) = r.sample.front() else {
            return Ok(r);
        };
        let lines: Vec<&[char]> = r.sample.iter().map(Vec::as_slice).collect();
        r.boundaries = guess_boundaries(first, &lines);

        if opts.header {
            if let Some(header) = r.sample.pop_front() {
                for (i, cell) in split_line(&header, &r.boundaries).into_iter().enumerate() {
                    let base = if cell.is_empty() { positional_name(i) } else { cell };
                    let name = unique_name(&base, &r.names);
                    r.names.push(name);
                }
            }
        } else {
            r.names = (0..=r.boundaries.len()).map(positional_name).collect();
        }
        r.types = default_types(r.names.len());

        for _ in 0..opts.pre_read {
            let Some(line) = r.sample.pop_front() else {
                break;
            };
            let row = r.to_row(&line);
            r.pre_read.push(row);
        }
        tracing::debug!(boundaries = ?r.boundaries, rows = r.pre_read.len(), "width pre-read");
        Ok(r)
    }

    /// Next non-blank line with tabs expanded.
    fn next_line(&mut self) -> Result<Option<Vec<char>>> {
        let mut buf = Vec::new();
        while !self.done {
            buf.clear();
            if self.input.read_until(b'\n', &mut buf)? == 0 {
                self.done = true;
                break;
            }
            let text = String::from_utf8_lossy(&buf);
            let text = text.trim_end_matches(['\n', '\r']);
            if text.trim().is_empty() {
                continue;
            }
            return Ok(Some(expand_tabs(text)));
        }
        Ok(None)
    }

    fn to_row(&self, line: &[char]) -> Row {
        let null = self.null.as_deref();
        let mut cells = split_line(line, &self.boundaries).into_iter();
        (0..self.names.len())
            .map(|_| cells.next().map_or(Value::Null, |c| Value::Text(c).null_if(null)))
            .collect()
    }
}

fn expand_tabs(text: &str) -> Vec<char> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        if c == '\t' {
            let pad = TAB_WIDTH - out.len() % TAB_WIDTH;
            out.extend(std::iter::repeat_n(' ', pad));
        } else {
            out.push(c);
        }
    }
    out
}

/// `(start, end)` of each run of non-blank characters.
fn word_spans(line: &[char]) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in line.iter().enumerate() {
        match (c.is_whitespace(), start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                spans.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, line.len()));
    }
    spans
}

fn guess_boundaries(first: &[char], lines: &[&[char]]) -> Vec<usize> {
    let blank = |p: usize| {
        lines
            .iter()
            .all(|line| line.get(p).is_none_or(|c| c.is_whitespace()))
    };
    word_spans(first)
        .windows(2)
        .filter_map(|pair| (pair[0].1..pair[1].0).find(|&p| blank(p)))
        .collect()
}

/// Cut a line at `boundaries`; the last cell takes the rest of the line.
fn split_line(line: &[char], boundaries: &[usize]) -> Vec<String> {
    let mut cells = Vec::with_capacity(boundaries.len() + 1);
    let mut start = 0;
    for &end in boundaries.iter().chain(std::iter::once(&line.len())) {
        let end = end.max(start).min(line.len());
        let from = start.min(line.len());
        let cell: String = line[from..end].iter().collect();
        cells.push(cell.trim().to_string());
        start = end;
    }
    cells
}

impl Reader for WidthReader {
    fn names(&self) -> Result<&[String]> {
        names_or_no_rows(&self.names)
    }

    fn types(&self) -> Result<&[String]> {
        names_or_no_rows(&self.names)?;
        Ok(&self.types)
    }

    fn pre_read_rows(&mut self) -> Vec<Row> {
        std::mem::take(&mut self.pre_read)
    }

    fn read_row(&mut self) -> Result<Option<Row>> {
        if self.limit_read {
            return Ok(None);
        }
        let line = match self.sample.pop_front() {
            Some(line) => line,
            None => match self.next_line()? {
                Some(line) => line,
                None => return Ok(None),
            },
        };
        Ok(Some(self.to_row(&line)))
    }
}
