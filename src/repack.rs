//! Repacker: turns one long compressed stream into a concatenation of small,
//! independently decodable frames, plus an index entry per record.
//!
//! Grounded on `original_source/gzipi/lib.py::_repack`, generalized over
//! [`KeyExtractor`] and the output [`CompressionKind`] (spec.md §9 flags the
//! reference implementation's hard-coded zstd empty frame as a bug; here the
//! empty-input frame always matches the requested `output_kind`).

use std::io::{BufRead, Read, Write};

use crate::compress::{self, CompressionKind};
use crate::error::Result;
use crate::index::IndexEntry;
use crate::keys::KeyExtractor;

/// Read batches of up to `batch_size` `\n`-terminated lines from `reader`.
/// The final batch may be shorter; an empty reader yields no batches.
struct LineBatches<R: BufRead> {
    reader: R,
    batch_size: usize,
    done: bool,
}

impl<R: BufRead> Iterator for LineBatches<R> {
    type Item = Result<Vec<Vec<u8>>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            let mut line = Vec::new();
            match self.reader.read_until(b'\n', &mut line) {
                Ok(0) => {
                    self.done = true;
                    break;
                }
                Ok(_) => batch.push(line),
                Err(e) => return Some(Err(e.into())),
            }
        }
        if batch.is_empty() {
            None
        } else {
            Some(Ok(batch))
        }
    }
}

/// Repack `input` into `data_out` (a concatenation of `output_kind` frames,
/// one per `chunk_size`-record batch) and write the matching index entries
/// to `index_out`.
pub fn repack_stream<R: Read, W: Write, IW: Write>(
    input: R,
    mut data_out: W,
    mut index_out: IW,
    extractor: &KeyExtractor,
    chunk_size: usize,
    output_kind: CompressionKind,
) -> Result<()> {
    let mut input = input;
    let mut prefix = [0u8; 4];
    let n = fill(&mut input, &mut prefix)?;
    let input_kind = compress::detect(&prefix[..n]);
    let chained = std::io::Cursor::new(prefix[..n].to_vec()).chain(input);
    let decompressed = compress::open_reader(chained, input_kind);

    let batches = LineBatches { reader: decompressed, batch_size: chunk_size.max(1), done: false };

    let mut frame_start = 0u64;
    let mut any_batch = false;

    for batch in batches {
        let batch = batch?;
        any_batch = true;

        let mut writer = compress::Writer::new(Vec::new(), output_kind)?;
        let mut entries = Vec::with_capacity(batch.len());
        let mut line_start = 0u64;

        for line in &batch {
            let key = extractor.extract(line)?;
            writer.write_all(line)?;
            let line_len = line.len() as u64;
            entries.push((key, line_start, line_len));
            line_start += line_len;
        }

        let frame_bytes = writer.finish()?;
        let frame_len = frame_bytes.len() as u64;
        data_out.write_all(&frame_bytes)?;
        data_out.flush()?;

        for (key, line_start_off, line_len) in entries {
            let entry = IndexEntry { key, frame_start_off: frame_start, frame_len, line_start_off, line_len };
            entry.write_to(&mut index_out)?;
        }
        index_out.flush()?;

        frame_start += frame_len;
    }

    if !any_batch {
        let empty = compress::Writer::new(Vec::new(), output_kind)?.finish()?;
        data_out.write_all(&empty)?;
        data_out.flush()?;
    }

    Ok(())
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
