use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::Rng;

use gzipi::compress::{CompressionKind, Writer};
use gzipi::config::Config;
use gzipi::indexer::index_stream;
use gzipi::keys::KeyExtractor;
use gzipi::repack::repack_stream;
use gzipi::search::binary_search;
use std::io::Write as _;

fn generate_json_records(count: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let mut buf = Vec::new();
    for i in 0..count {
        let filler: u32 = rng.gen();
        writeln!(buf, "{{\"id\": \"{i:08}\", \"filler\": {filler}}}").unwrap();
    }
    buf
}

fn gzip_of(data: &[u8]) -> Vec<u8> {
    let mut w = Writer::new(Vec::new(), CompressionKind::Gzip).unwrap();
    w.write_all(data).unwrap();
    w.finish().unwrap()
}

fn bench_indexer(c: &mut Criterion) {
    let records = generate_json_records(20_000);
    let input = gzip_of(&records);
    let extractor = KeyExtractor::JsonField { field: "id".to_string() };
    let config = Config::default();

    c.bench_function("index_stream 20k json records", |b| {
        b.iter(|| {
            let mut out = Vec::new();
            let count = index_stream(&input[..], &mut out, &extractor, &config).unwrap();
            black_box(count);
        })
    });
}

fn bench_repacker(c: &mut Criterion) {
    let records = generate_json_records(20_000);
    let input = gzip_of(&records);
    let extractor = KeyExtractor::JsonField { field: "id".to_string() };

    let mut group = c.benchmark_group("repack_stream chunk_size");
    for chunk_size in [100usize, 1000, 5000] {
        group.bench_function(format!("{chunk_size}"), |b| {
            b.iter(|| {
                let mut data_out = Vec::new();
                let mut index_out = Vec::new();
                repack_stream(&input[..], &mut data_out, &mut index_out, &extractor, chunk_size, CompressionKind::Gzip).unwrap();
                black_box((data_out.len(), index_out.len()));
            })
        });
    }
    group.finish();
}

fn bench_binary_search(c: &mut Criterion) {
    let mut entries: Vec<String> = (0..50_000)
        .map(|i| format!("k{i:08}|0|100|0|10\n"))
        .collect();
    entries.sort();
    let index_text = entries.concat().into_bytes();
    let fsize = index_text.len() as u64;

    let mut group = c.benchmark_group("binary_search buffer threshold");
    for threshold_kib in [0u64, 64, 1024] {
        group.bench_function(format!("{threshold_kib}KiB"), |b| {
            b.iter(|| {
                let mut cursor = std::io::Cursor::new(index_text.clone());
                let result = binary_search(b"k00025000", &mut cursor, fsize, threshold_kib).unwrap();
                black_box(result);
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_indexer, bench_repacker, bench_binary_search);
criterion_main!(benches);
