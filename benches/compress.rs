//! Benchmarks for LZMA compression and decompression throughput.
//!
//! Run with: `cargo bench`
//! Compare with baseline: `cargo bench -- --save-baseline main`
//! Compare against baseline: `cargo bench -- --baseline main`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lzma_stream::{compress, decompress, EncoderOptions, MatchFinderKind};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const INPUT_SIZE: usize = 256 * 1024;

/// Word salad with plenty of repeats at varying distances.
fn text_input() -> Vec<u8> {
    const WORDS: [&str; 16] = [
        "lorem ", "ipsum ", "dolor ", "sit ", "amet ", "consectetur ", "adipiscing ", "elit ",
        "sed ", "do ", "eiusmod ", "tempor ", "incididunt ", "ut ", "labore ", ".\n",
    ];
    let mut rng = StdRng::seed_from_u64(1);
    let mut data = Vec::with_capacity(INPUT_SIZE + 16);
    while data.len() < INPUT_SIZE {
        data.extend_from_slice(WORDS[rng.gen_range(0..WORDS.len())].as_bytes());
    }
    data.truncate(INPUT_SIZE);
    data
}

fn random_input() -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(2);
    let mut data = vec![0u8; INPUT_SIZE];
    rng.fill(&mut data[..]);
    data
}

/// Compression across match finders and fast-bytes settings.
fn bench_compress(c: &mut Criterion) {
    let text = text_input();
    let mut group = c.benchmark_group("compress");
    group.throughput(Throughput::Bytes(text.len() as u64));
    group.sample_size(10);

    for (name, options) in [
        ("bt4_fast32", EncoderOptions::default()),
        (
            "bt2_fast32",
            EncoderOptions::default().with_match_finder(MatchFinderKind::Bt2),
        ),
        ("bt4_fast273", EncoderOptions::default().maximal_fast_bytes()),
    ] {
        group.bench_with_input(BenchmarkId::new("text", name), &options, |b, options| {
            b.iter(|| black_box(compress(black_box(&text), options)));
        });
    }

    let random = random_input();
    group.bench_function("random", |b| {
        b.iter(|| black_box(compress(black_box(&random), &EncoderOptions::default())));
    });

    group.finish();
}

fn bench_decompress(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompress");
    for (name, data) in [("text", text_input()), ("random", random_input())] {
        let packed = compress(&data, &EncoderOptions::default()).expect("compress");
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| black_box(decompress(black_box(&packed))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compress, bench_decompress);
criterion_main!(benches);
