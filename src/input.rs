//! Turning a table reference into a byte stream.
//!
//! A reference is standard input (`-`, `stdin`), a glob pattern, or a plain
//! file path, optionally quoted and optionally followed by `::path` to select
//! part of a JSON/YAML document. Compressed input is detected by its leading
//! bytes.

use crate::compress::decompress;
use crate::error::{Error, Result};
use crate::reader::Input;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};

const PATH_SEPARATOR: &str = "::";
const CHUNK_SIZE: usize = 64 * 1024;
const PIPE_DEPTH: usize = 4;

/// An opened table source.
pub struct Opened {
    pub input: Input,
    /// The file part of the reference, quotes included.
    pub file: String,
    /// Document path taken from a `file::path` reference.
    pub path: Option<String>,
}

/// Open a reference. `Ok(None)` means there is no such file, which is not an
/// error: the reference is left in the query untouched.
pub fn resolve(reference: &str) -> Result<Option<Opened>> {
    if let Some(input) = open(reference)? {
        return Ok(Some(Opened {
            input,
            file: reference.to_string(),
            path: None,
        }));
    }
    let Some((file, path)) = reference.split_once(PATH_SEPARATOR) else {
        return Ok(None);
    };
    Ok(open(file)?.map(|input| Opened {
        input,
        file: file.to_string(),
        path: Some(path.to_string()),
    }))
}

/// Open stdin, a glob or a single file.
pub fn open(name: &str) -> Result<Option<Input>> {
    if is_stdin(name) {
        return Ok(Some(decompress(io::stdin())?));
    }
    let name = trim_quotes(name);
    if is_glob(name) {
        return open_glob(name).map(Some);
    }
    let path = expand_tilde(name);
    if !path.is_file() {
        tracing::debug!(file = %path.display(), "not a file, skipped");
        return Ok(None);
    }
    Ok(Some(open_file(&path)?))
}

fn is_stdin(name: &str) -> bool {
    name.is_empty() || name == "-" || name.eq_ignore_ascii_case("stdin")
}

fn is_glob(name: &str) -> bool {
    name.contains(['*', '?', '['])
}

/// Strip one surrounding pair of back quotes, then of double quotes.
pub fn trim_quotes(name: &str) -> &str {
    let mut name = name;
    for q in ['`', '"'] {
        if name.len() >= 2 && name.starts_with(q) && name.ends_with(q) {
            name = &name[1..name.len() - 1];
        }
    }
    name
}

/// Replace a leading `~` with the home directory.
pub fn expand_tilde(name: &str) -> PathBuf {
    if let Some(rest) = name.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches(['/', '\\']));
        }
        tracing::warn!("home directory unknown, '{}' used as is", name);
    }
    PathBuf::from(name)
}

fn open_file(path: &Path) -> Result<Input> {
    tracing::debug!(file = %path.display(), "open");
    Ok(decompress(File::open(path)?)?)
}

/// Concatenate every match of `pattern` into one stream.
///
/// The files are copied by a background thread. A file that fails to open or
/// read is logged and skipped; each file is followed by a newline.
fn open_glob(pattern: &str) -> Result<Input> {
    let pattern = expand_tilde(pattern);
    let pattern = pattern.to_string_lossy();
    let paths = glob::glob(&pattern).map_err(|e| Error::Config(format!("{}: {}", pattern, e)))?;
    let files: Vec<PathBuf> = paths
        .filter_map(|entry| match entry {
            Ok(path) if path.is_file() => Some(path),
            Ok(_) => None,
            Err(e) => {
                tracing::error!("{}", e);
                None
            }
        })
        .collect();
    if files.is_empty() {
        return Err(Error::NoMatchFound(pattern.into_owned()));
    }
    tracing::debug!(pattern = %pattern, files = files.len(), "glob");

    let (tx, rx) = sync_channel(PIPE_DEPTH);
    std::thread::spawn(move || {
        for file in files {
            match copy_file(&file, &tx) {
                Ok(true) => {}
                Ok(false) => return,
                Err(e) => tracing::error!(file = %file.display(), "{}", e),
            }
            if tx.send(b"\n".to_vec()).is_err() {
                return;
            }
        }
    });
    Ok(Box::new(ChannelReader::new(rx)))
}

/// Send the contents of one file in chunks. `Ok(false)` when the reading end
/// is gone.
fn copy_file(path: &Path, tx: &SyncSender<Vec<u8>>) -> Result<bool> {
    let mut input = open_file(path)?;
    loop {
        let mut chunk = vec![0; CHUNK_SIZE];
        let n = input.read(&mut chunk)?;
        if n == 0 {
            return Ok(true);
        }
        chunk.truncate(n);
        if tx.send(chunk).is_err() {
            return Ok(false);
        }
    }
}

/// Reading end of the glob pipe. End of stream once the producer is done.
struct ChannelReader {
    rx: Receiver<Vec<u8>>,
    chunk: Vec<u8>,
    pos: usize,
}

impl ChannelReader {
    fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self {
            rx,
            chunk: Vec::new(),
            pos: 0,
        }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.chunk.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.chunk.len() - self.pos);
        buf[..n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}
