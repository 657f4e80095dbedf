//! Indexer: scans a compressed input and emits one index entry per record.
//!
//! Grounded on `original_source/gzipi/lib.py::index_csv_file`/`index_json_file`,
//! generalized over the [`KeyExtractor`] abstraction and the gzip/zstd
//! [`CompressionKind`] facade.

use std::io::{Read, Write};

use crate::compress::{self, CompressionKind};
use crate::config::Config;
use crate::error::Result;
use crate::frames::FrameIter;
use crate::index::IndexEntry;
use crate::keys::KeyExtractor;
use crate::lines::iter_lines;

/// Scan `input`, a compressed stream of newline-delimited records, and write
/// one index entry per record to `output`.
///
/// Returns the number of entries written.
pub fn index_stream<R: Read, W: Write>(
    mut input: R,
    output: &mut W,
    extractor: &KeyExtractor,
    config: &Config,
) -> Result<u64> {
    let mut prefix = [0u8; 4];
    let n = fill(&mut input, &mut prefix)?;
    let kind = compress::detect(&prefix[..n]);

    let chained = std::io::Cursor::new(prefix[..n].to_vec()).chain(input);
    let frames = FrameIter::new(chained, kind, config.frame_read_buffer);

    let mut count = 0u64;
    for (i, frame) in frames.enumerate() {
        let frame = frame?;
        log::info!(
            "indexed chunk {i}, offset {}-{}",
            frame.start_off,
            frame.end_off
        );
        let mut decompressed = Vec::new();
        compress::open_reader(&frame.bytes[..], kind).read_to_end(&mut decompressed)?;

        for (line_start, line_end, line) in iter_lines(&decompressed) {
            let key = extractor.extract(line)?;
            let entry = IndexEntry {
                key,
                frame_start_off: frame.start_off,
                frame_len: frame.end_off - frame.start_off,
                line_start_off: line_start,
                line_len: line_end - line_start,
            };
            entry.write_to(output)?;
            count += 1;
        }
    }
    Ok(count)
}

/// Fill `buf` with up to `buf.len()` bytes, returning how many were read
/// (fewer than `buf.len()` only at EOF).
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = reader.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}
