//! Property-based tests for P1 (frame coverage), P2 (repack round-trip) and
//! P3 (index fidelity) — spec.md §8. Grounded on `ChainSafe-forest`'s
//! `#[quickcheck]` usage (`blockchain/blocks/src/tipset.rs`).

use quickcheck_macros::quickcheck;
use std::io::{Read, Write};

use gzipi::compress::{CompressionKind, Writer};
use gzipi::frames::FrameIter;
use gzipi::keys::KeyExtractor;
use gzipi::repack::repack_stream;

#[derive(Clone, Debug)]
struct RecordSet(Vec<String>);

impl quickcheck::Arbitrary for RecordSet {
    fn arbitrary(g: &mut quickcheck::Gen) -> Self {
        let len = usize::arbitrary(g) % 40;
        let records = (0..len)
            .map(|i| {
                let filler = u32::arbitrary(g);
                format!("{{\"id\": \"r{i}-{filler}\"}}\n")
            })
            .collect();
        RecordSet(records)
    }
}

fn gzip_of(data: &[u8]) -> Vec<u8> {
    let mut w = Writer::new(Vec::new(), CompressionKind::Gzip).unwrap();
    w.write_all(data).unwrap();
    w.finish().unwrap()
}

/// P1: concatenating every frame span reproduces the input byte-for-byte,
/// and the final `end_off` equals the input size.
#[quickcheck]
fn frame_coverage_reproduces_input(records: RecordSet) -> bool {
    let body: String = records.0.concat();
    let input = gzip_of(body.as_bytes());
    let total = input.len() as u64;

    let spans: Vec<_> = FrameIter::new(&input[..], CompressionKind::Gzip, 37)
        .collect::<gzipi::error::Result<Vec<_>>>()
        .unwrap();

    let mut reassembled = Vec::new();
    for s in &spans {
        reassembled.extend_from_slice(&s.bytes);
    }

    reassembled == input
        && spans.last().map(|s| s.end_off).unwrap_or(0) == total
        && spans.windows(2).all(|w| w[0].end_off == w[1].start_off)
}

/// P2: decompressing a repacked stream yields the same bytes as decompressing
/// the original, for any non-empty record set.
#[quickcheck]
fn repack_round_trip(records: RecordSet) -> bool {
    if records.0.is_empty() {
        return true;
    }
    let body: String = records.0.concat();
    let input = gzip_of(body.as_bytes());
    let extractor = KeyExtractor::JsonField { field: "id".to_string() };

    let mut data_out = Vec::new();
    let mut index_out = Vec::new();
    if repack_stream(&input[..], &mut data_out, &mut index_out, &extractor, 7, CompressionKind::Gzip).is_err() {
        return false;
    }

    let mut original = Vec::new();
    gzipi::compress::open_reader(&input[..], CompressionKind::Gzip).read_to_end(&mut original).unwrap();

    let mut repacked = Vec::new();
    gzipi::compress::open_reader(&data_out[..], CompressionKind::Gzip).read_to_end(&mut repacked).unwrap();

    original == repacked
}

/// P3: every index entry emitted by the repacker locates exactly the record
/// whose key it names.
#[quickcheck]
fn repack_index_entries_locate_their_own_key(records: RecordSet) -> bool {
    let body: String = records.0.concat();
    let input = gzip_of(body.as_bytes());
    let extractor = KeyExtractor::JsonField { field: "id".to_string() };

    let mut data_out = Vec::new();
    let mut index_out = Vec::new();
    if repack_stream(&input[..], &mut data_out, &mut index_out, &extractor, 7, CompressionKind::Gzip).is_err() {
        return false;
    }

    let index_text = match String::from_utf8(index_out) {
        Ok(t) => t,
        Err(_) => return false,
    };

    for line in index_text.lines() {
        let entry = match gzipi::index::IndexEntry::parse(line) {
            Ok(e) => e,
            Err(_) => return false,
        };
        let frame = &data_out[entry.frame_start_off as usize..(entry.frame_start_off + entry.frame_len) as usize];
        let mut decompressed = Vec::new();
        gzipi::compress::open_reader(frame, CompressionKind::Gzip).read_to_end(&mut decompressed).unwrap();
        let line_bytes = &decompressed[entry.line_start_off as usize..(entry.line_start_off + entry.line_len) as usize];
        let extracted = match extractor.extract(line_bytes) {
            Ok(k) => k,
            Err(_) => return false,
        };
        if extracted != entry.key {
            return false;
        }
    }
    true
}
