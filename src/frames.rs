//! Frame boundary detector.
//!
//! Scans an arbitrary concatenation of compressed frames and yields each
//! frame's byte range without decoding them, using the header magic plus the
//! `header` module's validation heuristics to avoid splitting on a magic that
//! occurs by chance inside a compressed payload.
//!
//! Grounded on `original_source/gzipi/lib.py::_iterate_archives`: the
//! accumulator/window/last-occurrence-of-magic algorithm here is a direct
//! port of that function, generalized to also recognize zstd frames.

use std::io::Read;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::compress::{CompressionKind, GZIP_HEADER_LEN, GZIP_MAGIC, ZSTD_MAGIC};
use crate::error::Result;
use crate::header;

/// Header bytes needed after a zstd magic to run the header-descriptor check.
const ZSTD_HEADER_LEN: usize = 5;

/// One decodable frame's location in the source stream.
#[derive(Debug, Clone)]
pub struct FrameSpan {
    pub bytes: Vec<u8>,
    pub start_off: u64,
    pub end_off: u64,
}

/// A lazy, finite, non-restartable iterator over frame spans.
pub struct FrameIter<R: Read> {
    reader: R,
    kind: CompressionKind,
    buffer_size: usize,
    accumulator: Vec<u8>,
    cur_start: u64,
    done: bool,
    now: i64,
}

impl<R: Read> FrameIter<R> {
    pub fn new(reader: R, kind: CompressionKind, buffer_size: usize) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(i64::MAX);
        FrameIter {
            reader,
            kind,
            buffer_size: buffer_size.max(1),
            accumulator: Vec::new(),
            cur_start: 0,
            done: false,
            now,
        }
    }

    fn magic(&self) -> &'static [u8] {
        match self.kind {
            CompressionKind::Gzip => &GZIP_MAGIC,
            CompressionKind::Zstd => &ZSTD_MAGIC,
            CompressionKind::None => &[],
        }
    }

    fn header_len(&self) -> usize {
        match self.kind {
            CompressionKind::Gzip => GZIP_HEADER_LEN,
            CompressionKind::Zstd => ZSTD_HEADER_LEN,
            CompressionKind::None => 0,
        }
    }

    fn header_valid(&self, candidate: &[u8]) -> bool {
        match self.kind {
            CompressionKind::Gzip => header::is_valid_gzip_header(candidate, self.now),
            CompressionKind::Zstd => header::is_valid_zstd_header(candidate[4]),
            CompressionKind::None => true,
        }
    }

    fn emit_remainder(&mut self) -> FrameSpan {
        let bytes = std::mem::take(&mut self.accumulator);
        let start = self.cur_start;
        let end = start + bytes.len() as u64;
        self.cur_start = end;
        FrameSpan { bytes, start_off: start, end_off: end }
    }
}

impl<R: Read> Iterator for FrameIter<R> {
    type Item = Result<FrameSpan>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        // Uncompressed input has no frame structure to find: the whole
        // stream is a single frame, read to EOF in one shot.
        if self.kind == CompressionKind::None {
            let mut rest = Vec::new();
            if let Err(e) = self.reader.read_to_end(&mut rest) {
                self.done = true;
                return Some(Err(e.into()));
            }
            self.accumulator = rest;
            self.done = true;
            return Some(Ok(self.emit_remainder()));
        }

        let magic = self.magic().to_vec();
        let header_len = self.header_len();
        let mut chunk = vec![0u8; self.buffer_size];

        loop {
            let n = match self.reader.read(&mut chunk) {
                Ok(n) => n,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            };

            if n == 0 {
                self.done = true;
                return Some(Ok(self.emit_remainder()));
            }

            self.accumulator.extend_from_slice(&chunk[..n]);

            let pos = rfind(&self.accumulator, &magic);
            let Some(pos) = pos else { continue };

            if pos == 0 {
                continue;
            }
            if self.accumulator.len() - pos < header_len {
                continue;
            }
            if !self.header_valid(&self.accumulator[pos..]) {
                continue;
            }

            let new_accumulator = self.accumulator.split_off(pos);
            let frame_bytes = std::mem::replace(&mut self.accumulator, new_accumulator);
            let start = self.cur_start;
            let end = start + frame_bytes.len() as u64;
            self.cur_start = end;
            return Some(Ok(FrameSpan { bytes: frame_bytes, start_off: start, end_off: end }));
        }
    }
}

/// Find the last occurrence of `needle` in `haystack`.
fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).rev().find(|&i| &haystack[i..i + needle.len()] == needle)
}
