//! Compressed input and output streams.
//!
//! Input compression is detected from the leading bytes. A stream whose
//! magic matches but whose header does not decode is read as plain bytes.
//! Output compression is chosen by name or by the output file extension.

use crate::error::{Error, Result};
use crate::reader::Input;
use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;
use std::str::FromStr;

const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b, 0x08];
const BZIP2_MAGIC: &[u8] = b"BZh";
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];
const LZ4_MAGIC: &[u8] = &[0x04, 0x22, 0x4d, 0x18];
const XZ_MAGIC: &[u8] = &[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00, 0x00];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Bzip2,
    Zstd,
    Lz4,
    Xz,
}

impl Compression {
    /// Detect the compression of a stream from its first bytes.
    pub fn detect(head: &[u8]) -> Option<Self> {
        if head.starts_with(GZIP_MAGIC) {
            Some(Compression::Gzip)
        } else if head.starts_with(BZIP2_MAGIC) {
            Some(Compression::Bzip2)
        } else if head.starts_with(ZSTD_MAGIC) {
            Some(Compression::Zstd)
        } else if head.starts_with(LZ4_MAGIC) {
            Some(Compression::Lz4)
        } else if head.starts_with(XZ_MAGIC) {
            Some(Compression::Xz)
        } else {
            None
        }
    }

    /// Compression implied by the last extension of `path`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "gz" => Some(Compression::Gzip),
            "bz2" => Some(Compression::Bzip2),
            "zst" => Some(Compression::Zstd),
            "lz4" => Some(Compression::Lz4),
            "xz" => Some(Compression::Xz),
            _ => None,
        }
    }

    /// Whether the buffered head carries a complete, valid header.
    fn header_ok(self, head: &[u8]) -> bool {
        match self {
            Compression::Gzip => flate2::bufread::GzDecoder::new(head).header().is_some(),
            Compression::Bzip2 => matches!(head.get(3), Some(b'1'..=b'9')),
            Compression::Zstd | Compression::Lz4 | Compression::Xz => true,
        }
    }
}

impl FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gz" | "gzip" => Ok(Compression::Gzip),
            "bz2" | "bzip2" => Ok(Compression::Bzip2),
            "zst" | "zstd" => Ok(Compression::Zstd),
            "lz4" => Ok(Compression::Lz4),
            "xz" => Ok(Compression::Xz),
            _ => Err(Error::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Compression::Gzip => "gzip",
            Compression::Bzip2 => "bzip2",
            Compression::Zstd => "zstd",
            Compression::Lz4 => "lz4",
            Compression::Xz => "xz",
        };
        f.write_str(name)
    }
}

/// Wrap `reader` in the decoder its leading bytes call for, or pass it
/// through when there is none or the header is broken.
pub fn decompress<R: Read + Send + 'static>(reader: R) -> io::Result<Input> {
    let mut reader = BufReader::new(reader);
    let head = reader.fill_buf()?;
    let Some(compression) = Compression::detect(head) else {
        return Ok(Box::new(reader));
    };
    if !compression.header_ok(head) {
        tracing::debug!(%compression, "bad header, read as plain");
        return Ok(Box::new(reader));
    }

    tracing::debug!(%compression, "compressed input");
    let input: Input = match compression {
        Compression::Gzip => Box::new(flate2::bufread::MultiGzDecoder::new(reader)),
        Compression::Bzip2 => Box::new(bzip2::bufread::MultiBzDecoder::new(reader)),
        Compression::Zstd => Box::new(zstd::stream::read::Decoder::with_buffer(reader)?),
        Compression::Lz4 => Box::new(lz4_flex::frame::FrameDecoder::new(reader)),
        Compression::Xz => Box::new(xz2::bufread::XzDecoder::new_multi_decoder(reader)),
    };
    Ok(input)
}

/// An output stream, compressed or not. Compressed streams are finished
/// when the encoder is dropped.
pub enum Encoder<W: Write> {
    Plain(W),
    Gzip(flate2::write::GzEncoder<W>),
    Bzip2(bzip2::write::BzEncoder<W>),
    Zstd(zstd::stream::write::AutoFinishEncoder<'static, W>),
    Lz4(lz4_flex::frame::AutoFinishEncoder<W>),
    Xz(xz2::write::XzEncoder<W>),
}

impl<W: Write> Encoder<W> {
    pub fn new(out: W, compression: Option<Compression>) -> io::Result<Self> {
        let encoder = match compression {
            None => Encoder::Plain(out),
            Some(Compression::Gzip) => {
                Encoder::Gzip(flate2::write::GzEncoder::new(out, flate2::Compression::default()))
            }
            Some(Compression::Bzip2) => {
                Encoder::Bzip2(bzip2::write::BzEncoder::new(out, bzip2::Compression::default()))
            }
            Some(Compression::Zstd) => {
                Encoder::Zstd(zstd::stream::write::Encoder::new(out, 0)?.auto_finish())
            }
            Some(Compression::Lz4) => {
                Encoder::Lz4(lz4_flex::frame::FrameEncoder::new(out).auto_finish())
            }
            Some(Compression::Xz) => Encoder::Xz(xz2::write::XzEncoder::new(out, 6)),
        };
        Ok(encoder)
    }

    fn inner(&mut self) -> &mut dyn Write {
        match self {
            Encoder::Plain(w) => w,
            Encoder::Gzip(w) => w,
            Encoder::Bzip2(w) => w,
            Encoder::Zstd(w) => w,
            Encoder::Lz4(w) => w,
            Encoder::Xz(w) => w,
        }
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner().flush()
    }
}
