//! Uniform streaming compression facade over gzip, zstd and uncompressed bytes.
//!
//! Exposed as a three-variant tagged union rather than a trait-object
//! hierarchy (see DESIGN.md, "Polymorphic compressed IO"): callers match on
//! [`CompressionKind`] or just hand bytes to [`open_reader`]/[`Writer`] and
//! let the facade dispatch.

use std::io::{self, BufRead, BufReader, Read, Write};

use crate::error::{Error, Result};

/// Leading bytes that identify a gzip member.
pub const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];
/// Leading bytes that identify a zstd frame.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];
/// Number of header bytes the frame detector and header validator need.
pub const GZIP_HEADER_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionKind {
    Gzip,
    Zstd,
    None,
}

/// Inspect the first few bytes of a stream and classify its compression.
///
/// Matches §4.1: `1f 8b 08` is gzip, `28 b5 2f fd` is zstd, anything else is
/// treated as an uncompressed byte stream.
pub fn detect(prefix: &[u8]) -> CompressionKind {
    if prefix.len() >= 3 && prefix[..3] == GZIP_MAGIC {
        CompressionKind::Gzip
    } else if prefix.len() >= 4 && prefix[..4] == ZSTD_MAGIC {
        CompressionKind::Zstd
    } else {
        CompressionKind::None
    }
}

/// Wrap a reader so it decompresses (or passes through) `kind`-encoded bytes.
pub fn open_reader<'a, R: Read + 'a>(inner: R, kind: CompressionKind) -> Box<dyn BufRead + 'a> {
    match kind {
        CompressionKind::Gzip => Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(inner))),
        CompressionKind::Zstd => match zstd::stream::read::Decoder::new(inner) {
            Ok(dec) => Box::new(BufReader::new(dec)),
            // zstd::Decoder::new only fails constructing the internal zstd
            // context, never on malformed input (that surfaces on read), so
            // this path is unreachable in practice; keep the stream alive as
            // an empty reader rather than panicking.
            Err(_) => Box::new(BufReader::new(io::empty())),
        },
        CompressionKind::None => Box::new(BufReader::new(inner)),
    }
}

/// A frame-at-a-time compressed writer. Exactly one frame is produced per
/// instance, emitted when [`Writer::finish`] is called (even if nothing was
/// ever written to it).
pub enum Writer<W: Write> {
    Gzip(flate2::write::GzEncoder<W>),
    Zstd(Box<zstd::stream::write::Encoder<'static, W>>),
    None(W),
}

impl<W: Write> Writer<W> {
    pub fn new(sink: W, kind: CompressionKind) -> Result<Self> {
        Ok(match kind {
            CompressionKind::Gzip => {
                Writer::Gzip(flate2::write::GzEncoder::new(sink, flate2::Compression::default()))
            }
            CompressionKind::Zstd => {
                let encoder = zstd::stream::write::Encoder::new(sink, 0)
                    .map_err(|e| Error::Decode(e.to_string()))?;
                Writer::Zstd(Box::new(encoder))
            }
            CompressionKind::None => Writer::None(sink),
        })
    }

    /// Close the frame and hand back the underlying sink.
    pub fn finish(self) -> Result<W> {
        match self {
            Writer::Gzip(enc) => enc.finish().map_err(Error::Io),
            Writer::Zstd(enc) => enc.finish().map_err(Error::Io),
            Writer::None(sink) => Ok(sink),
        }
    }
}

impl<W: Write> Write for Writer<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Writer::Gzip(enc) => enc.write(buf),
            Writer::Zstd(enc) => enc.write(buf),
            Writer::None(sink) => sink.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Writer::Gzip(enc) => enc.flush(),
            Writer::Zstd(enc) => enc.flush(),
            Writer::None(sink) => sink.flush(),
        }
    }
}
