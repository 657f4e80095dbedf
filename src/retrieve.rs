//! End-to-end orchestration: batch `retrieve` (multi-key, whole-index scan)
//! and point `search` (single-key, binary search).
//!
//! Grounded on `original_source/gzipi/lib.py::retrieve`/`search` and
//! `cli.py`'s dispatch of those two commands; `store::ObjectStore` supplies
//! the ranged reads described abstractly in spec.md §4.8.

use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};

use crate::compress;
use crate::error::{Error, Result};
use crate::index::IndexEntry;
use crate::search;
use crate::store::ObjectStore;

/// Maximum keys processed per `retrieve` scan pass, per spec.md §4.8 step 2.
pub const MAX_KEYS_PER_BATCH: usize = 5000;

/// Retrieve every record whose key is in `keys` and write the matching
/// lines to `out`, in frame-group order (iteration order of frames is
/// unspecified; within a frame records are written in index order).
///
/// Does not require `index` to be sorted. Missing keys are logged, not
/// fatal; a key matched more than once within a batch is logged as a
/// duplicate and both copies are written.
pub fn retrieve<I: Read, W: Write>(
    index: I,
    data: &dyn ObjectStore,
    keys: &[String],
    out: &mut W,
) -> Result<()> {
    let buf = index_buf(index)?;
    for batch in keys.chunks(MAX_KEYS_PER_BATCH) {
        retrieve_batch(&mut index_lines(buf.clone()), batch, data, out)?;
    }
    Ok(())
}

/// Read `index` fully, transparently decompressing if it turns out to be
/// gzip-compressed (index files may end in `.gz`, per spec.md §3).
fn index_buf<I: Read>(mut index: I) -> Result<Vec<u8>> {
    let mut prefix = [0u8; 4];
    let mut n = 0;
    while n < prefix.len() {
        let r = index.read(&mut prefix[n..])?;
        if r == 0 {
            break;
        }
        n += r;
    }
    let kind = compress::detect(&prefix[..n]);
    let chained = std::io::Cursor::new(prefix[..n].to_vec()).chain(index);
    let mut buf = Vec::new();
    compress::open_reader(chained, kind).read_to_end(&mut buf)?;
    Ok(buf)
}

fn index_lines(buf: Vec<u8>) -> impl Iterator<Item = Result<IndexEntry>> {
    // Index files may themselves be gzip-compressed (path ends in `.gz`);
    // callers are expected to have already decompressed via `compress`
    // before handing bytes here, so this just splits lines.
    LineEntries { buf, pos: 0 }
}

struct LineEntries {
    buf: Vec<u8>,
    pos: usize,
}

impl Iterator for LineEntries {
    type Item = Result<IndexEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.buf.len() {
            return None;
        }
        let rest = &self.buf[self.pos..];
        let nl = memchr::memchr(b'\n', rest).map(|i| i + 1).unwrap_or(rest.len());
        let line = std::str::from_utf8(&rest[..nl]).ok()?;
        self.pos += nl;
        if line.trim().is_empty() {
            return self.next();
        }
        Some(IndexEntry::parse(line))
    }
}

fn retrieve_batch<E: Iterator<Item = Result<IndexEntry>>, W: Write>(
    entries: &mut E,
    keys: &[String],
    data: &dyn ObjectStore,
    out: &mut W,
) -> Result<()> {
    let wanted: HashSet<&str> = keys.iter().map(String::as_str).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut groups: HashMap<(u64, u64), Vec<IndexEntry>> = HashMap::new();

    for entry in entries {
        let entry = entry?;
        if wanted.contains(entry.key.as_str()) {
            if !seen.insert(entry.key.clone()) {
                log::warn!("duplicate match for key {:?} in this batch", entry.key);
            }
            groups.entry((entry.frame_start_off, entry.frame_len)).or_default().push(entry);
        }
    }

    for ((frame_start, frame_len), mut members) in groups {
        members.sort_by_key(|e| e.line_start_off);
        let frame_bytes = data.read_range(frame_start, frame_len)?;
        let kind = compress::detect(&frame_bytes);
        let mut decompressed = Vec::new();
        compress::open_reader(&frame_bytes[..], kind).read_to_end(&mut decompressed)?;

        for entry in members {
            let start = entry.line_start_off as usize;
            let end = start + entry.line_len as usize;
            if end > decompressed.len() {
                return Err(Error::MalformedIndex(format!(
                    "index entry for key {:?} points past the decompressed frame",
                    entry.key
                )));
            }
            out.write_all(&decompressed[start..end])?;
        }
    }

    for key in &wanted {
        if !seen.contains(*key) {
            log::error!("key not found in index: {key:?}");
        }
    }

    Ok(())
}

/// Look up a single key via binary search and write its one matching
/// record to `out`. Requires `index` to be sorted (§4.7/§4.8).
pub fn search_one<S: std::io::Read + std::io::Seek, W: Write>(
    key: &[u8],
    index: &mut S,
    index_size: u64,
    data: &dyn ObjectStore,
    buffer_threshold_kib: u64,
    out: &mut W,
) -> Result<()> {
    let fields = search::binary_search(key, index, index_size, buffer_threshold_kib)?;
    let parse = |s: &str, what: &str| -> Result<u64> {
        s.parse::<u64>().map_err(|e| Error::MalformedIndex(format!("non-integer {what} '{s}': {e}")))
    };
    let frame_start = parse(&fields.frame_start_off, "frame_start_off")?;
    let frame_len = parse(&fields.frame_len, "frame_len")?;
    let line_start = parse(&fields.line_start_off, "line_start_off")? as usize;
    let line_len = parse(&fields.line_len, "line_len")? as usize;

    let frame_bytes = data.read_range(frame_start, frame_len)?;
    let kind = compress::detect(&frame_bytes);
    let mut decompressed = Vec::new();
    compress::open_reader(&frame_bytes[..], kind).read_to_end(&mut decompressed)?;

    let end = line_start + line_len;
    if end > decompressed.len() {
        return Err(Error::MalformedIndex("search match points past the decompressed frame".to_string()));
    }
    out.write_all(&decompressed[line_start..end])?;
    Ok(())
}
