//! Performance benchmarks for semvec on a synthetic embedding file.
//!
//! Run with: `cargo bench --bench similarity_perf`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use semvec::config::IndexConfig;
use semvec::dictionary::Vocabulary;
use semvec::index::{IndexBuilder, encode_vector_file};
use semvec::neighbors::compute_top_k;
use semvec::similarity::cosine_similarity;
use semvec::store::VectorStore;

const DIMENSION: usize = 300;
const WORDS: usize = 5_000;

/// Deterministic pseudo-random components in [-1, 1).
fn synthetic_vector(seed: u64) -> Vec<f32> {
    let mut state = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
    (0..DIMENSION)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            #[allow(clippy::cast_precision_loss)]
            let unit = (state >> 40) as f32 / (1u64 << 24) as f32;
            unit.mul_add(2.0, -1.0)
        })
        .collect()
}

struct Corpus {
    bytes: Vec<u8>,
    vocabulary: Vocabulary,
}

fn build_corpus(words: usize) -> Corpus {
    let names: Vec<String> = (0..words).map(|i| format!("word{i}")).collect();
    let vectors: Vec<Vec<f32>> = (0..words as u64).map(synthetic_vector).collect();
    let records: Vec<(&str, &[f32])> = names
        .iter()
        .zip(&vectors)
        .map(|(name, v)| (name.as_str(), v.as_slice()))
        .collect();
    Corpus {
        bytes: encode_vector_file(DIMENSION, &records),
        vocabulary: names.into_iter().collect(),
    }
}

fn index_config() -> IndexConfig {
    IndexConfig {
        dictionary_filename: PathBuf::from("dictionary.txt"),
        word_vector_filename: PathBuf::from("vectors.bin"),
        buffer_size: 64 * 1024,
        max_header_size: 1024,
        max_word_length: 64,
    }
}

fn open_store(corpus: &Corpus) -> VectorStore {
    let config = index_config();
    let index = IndexBuilder::new(&corpus.vocabulary, &config)
        .build(&mut Cursor::new(corpus.bytes.as_slice()))
        .unwrap_or_else(|e| panic!("synthetic corpus failed to index: {e}"));
    VectorStore::new(Arc::new(index), corpus.bytes.clone())
}

fn bench_cosine_similarity(c: &mut Criterion) {
    let a = synthetic_vector(1);
    let b = synthetic_vector(2);

    let mut group = c.benchmark_group("cosine_similarity");
    group.throughput(Throughput::Elements(DIMENSION as u64));
    group.bench_function("dim300", |bench| {
        bench.iter(|| black_box(cosine_similarity(black_box(&a), black_box(&b))));
    });
    group.finish();
}

fn bench_index_build(c: &mut Criterion) {
    let corpus = build_corpus(WORDS);
    let config = index_config();

    let mut group = c.benchmark_group("index_build");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(30);
    group.throughput(Throughput::Bytes(corpus.bytes.len() as u64));

    for buffer_size in [4 * 1024, 64 * 1024] {
        let config = IndexConfig {
            buffer_size,
            ..config.clone()
        };
        group.bench_with_input(
            BenchmarkId::from_parameter(buffer_size),
            &config,
            |bench, config| {
                bench.iter(|| {
                    let index = IndexBuilder::new(&corpus.vocabulary, config)
                        .build(&mut Cursor::new(corpus.bytes.as_slice()));
                    black_box(index.map(|i| i.len()).unwrap_or(0));
                });
            },
        );
    }
    group.finish();
}

fn bench_top_k_scan(c: &mut Criterion) {
    let corpus = build_corpus(WORDS);
    let store = open_store(&corpus);

    let mut group = c.benchmark_group("top_k_scan");
    group.measurement_time(Duration::from_secs(12));
    group.sample_size(20);
    group.throughput(Throughput::Elements(WORDS as u64));

    for k in [10, 2000] {
        group.bench_with_input(BenchmarkId::from_parameter(k), &k, |bench, &k| {
            bench.iter(|| {
                let list = compute_top_k(&store, "word42", k);
                black_box(list.map(|l| l.map(|l| l.len())).unwrap_or(None));
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_cosine_similarity,
    bench_index_build,
    bench_top_k_scan
);
criterion_main!(benches);
