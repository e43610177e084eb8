//! Integration tests for semvec.
//!
//! These tests drive the public library API end to end:
//! - Vocabulary loading and streaming index construction
//! - Similarity and nearest-neighbour queries
//! - Neighbour cache persistence across engine rebuilds
//! - Concurrent use of one shared engine

use semvec::config::{CacheConfig, Config};
use semvec::index::encode_vector_file;
use semvec::{Engine, SemvecError};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Write a vocabulary and vector file and return a config pointing at them
fn create_fixture(dir: &TempDir, vectors: &[u8], dictionary: &str) -> Config {
    semvec::logging::init_test_logging();
    let dict_path = dir.path().join("dictionary.txt");
    let vec_path = dir.path().join("vectors.bin");
    std::fs::write(&dict_path, dictionary).unwrap();
    std::fs::write(&vec_path, vectors).unwrap();

    let mut config = Config::default();
    config.dictionary.dictionary_filename = Some(dict_path);
    config.dictionary.word_vector_filename = Some(vec_path);
    config.cache = CacheConfig {
        directory: dir.path().join("similarity"),
        max_neighbors: 5,
    };
    config
}

/// Eight words on the unit circle, 45 degrees apart
fn compass() -> Vec<u8> {
    let h = std::f32::consts::FRAC_1_SQRT_2;
    encode_vector_file(
        2,
        &[
            ("e", &[1.0, 0.0]),
            ("ne", &[h, h]),
            ("n", &[0.0, 1.0]),
            ("nw", &[-h, h]),
            ("w", &[-1.0, 0.0]),
            ("sw", &[-h, -h]),
            ("s", &[0.0, -1.0]),
            ("se", &[h, -h]),
        ],
    )
}

const COMPASS_WORDS: &str = "e\nne\nn\nnw\nw\nsw\ns\nse\n";

fn cache_files(config: &Config) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let Ok(namespaces) = std::fs::read_dir(&config.cache.directory) else {
        return found;
    };
    for namespace in namespaces.flatten() {
        for entry in std::fs::read_dir(namespace.path()).unwrap().flatten() {
            found.push(entry.path());
        }
    }
    found
}

#[tokio::test]
async fn test_full_pipeline() {
    let dir = TempDir::new().unwrap();
    let config = create_fixture(&dir, &compass(), COMPASS_WORDS);
    let engine = Engine::build(&config).await.unwrap();

    assert_eq!(engine.word_list().len(), 8);

    let score = engine.similarity("e", "n").await.unwrap().unwrap();
    assert!(score.abs() < 1e-6);
    let score = engine.similarity("e", "w").await.unwrap().unwrap();
    assert!((score + 1.0).abs() < 1e-6);

    let top = engine.top_similarity("e", 5).await.unwrap().unwrap();
    assert_eq!(top.len(), 5);
    assert!(top.rank_of("e").is_none());
    // ne and se tie at cos 45 degrees; file order breaks the tie.
    let words: Vec<&str> = top.iter().map(|e| e.word.as_str()).collect();
    assert_eq!(&words[..2], ["ne", "se"]);
    for pair in top.entries().windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }
}

#[tokio::test]
async fn test_neighbour_cache_survives_rebuild() {
    let dir = TempDir::new().unwrap();
    let config = create_fixture(&dir, &compass(), COMPASS_WORDS);

    let first = {
        let engine = Engine::build(&config).await.unwrap();
        let list = engine.top_similarity("n", 5).await.unwrap().unwrap();
        assert_eq!(engine.neighbors().computations(), 1);
        list
    };
    assert_eq!(cache_files(&config).len(), 1);

    let engine = Engine::build(&config).await.unwrap();
    let second = engine.top_similarity("n", 5).await.unwrap().unwrap();
    assert_eq!(first, second);
    assert_eq!(engine.neighbors().computations(), 0);
    assert_eq!(engine.store().reads(), 0);
}

#[tokio::test]
async fn test_replaced_embedding_file_gets_fresh_cache() {
    let dir = TempDir::new().unwrap();
    let config = create_fixture(&dir, &compass(), COMPASS_WORDS);
    {
        let engine = Engine::build(&config).await.unwrap();
        engine.top_similarity("n", 5).await.unwrap();
    }

    let replacement = encode_vector_file(3, &[("n", &[1.0, 0.0, 0.0]), ("s", &[0.0, 1.0, 0.0])]);
    let vectors = config.dictionary.word_vector_filename.clone().unwrap();
    std::fs::write(vectors, replacement).unwrap();

    let engine = Engine::build(&config).await.unwrap();
    let top = engine.top_similarity("n", 5).await.unwrap().unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top.entries()[0].word, "s");
    assert_eq!(engine.neighbors().computations(), 1);
    assert_eq!(cache_files(&config).len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shared_engine_across_tasks() {
    let dir = TempDir::new().unwrap();
    let config = create_fixture(&dir, &compass(), COMPASS_WORDS);
    let engine = Arc::new(Engine::build(&config).await.unwrap());

    let mut handles = Vec::new();
    for i in 0..16 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            if i % 2 == 0 {
                engine.top_similarity("s", 3).await.map(|l| l.map(|l| l.len()))
            } else {
                engine.similarity("s", "n").await.map(|s| s.map(|_| 0))
            }
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().is_some());
    }
    assert_eq!(engine.neighbors().computations(), 1);
}

#[tokio::test]
async fn test_missing_filenames_are_config_errors() {
    let mut config = Config::default();
    config.dictionary.dictionary_filename = Some(PathBuf::from("dictionary.txt"));
    let err = Engine::build(&config).await.unwrap_err();
    assert!(matches!(err, SemvecError::Config { .. }));
    assert!(err.to_string().contains("word_vector_filename"));
}

#[tokio::test]
async fn test_zero_max_neighbors_rejected() {
    let dir = TempDir::new().unwrap();
    let mut config = create_fixture(&dir, &compass(), COMPASS_WORDS);
    config.cache.max_neighbors = 0;
    let err = Engine::build(&config).await.unwrap_err();
    assert!(matches!(err, SemvecError::Config { .. }));
}

#[tokio::test]
async fn test_narrowed_dictionary_does_not_reuse_lists() {
    let dir = TempDir::new().unwrap();
    let config = create_fixture(&dir, &compass(), COMPASS_WORDS);
    {
        let engine = Engine::build(&config).await.unwrap();
        let top = engine.top_similarity("n", 5).await.unwrap().unwrap();
        assert!(top.rank_of("ne").is_some());
        engine.top_similarity("ne", 5).await.unwrap().unwrap();
    }

    // Same embedding file, fewer allowed words.
    let dictionary = config.dictionary.dictionary_filename.clone().unwrap();
    std::fs::write(dictionary, "e\nn\nw\ns\n").unwrap();

    let engine = Engine::build(&config).await.unwrap();
    assert!(engine.top_similarity("ne", 5).await.unwrap().is_none());
    let top = engine.top_similarity("n", 5).await.unwrap().unwrap();
    let words: Vec<&str> = top.iter().map(|e| e.word.as_str()).collect();
    assert_eq!(words, ["e", "w", "s"]);
    assert_eq!(engine.neighbors().computations(), 1);
}

#[tokio::test]
async fn test_similarity_is_bit_symmetric() {
    let dir = TempDir::new().unwrap();
    let vectors = encode_vector_file(
        4,
        &[
            ("alpha", &[0.1, -2.7, 3.3, 0.0007]),
            ("beta", &[1.9, 0.45, -0.31, 12.5]),
            ("gamma", &[-0.003, 7.25, 0.6, -1.1]),
        ],
    );
    let config = create_fixture(&dir, &vectors, "alpha\nbeta\ngamma\n");
    let engine = Engine::build(&config).await.unwrap();

    for (a, b) in [("alpha", "beta"), ("alpha", "gamma"), ("beta", "gamma")] {
        let ab = engine.similarity(a, b).await.unwrap().unwrap();
        let ba = engine.similarity(b, a).await.unwrap().unwrap();
        assert_eq!(ab.to_bits(), ba.to_bits(), "{a}/{b}");
        assert!((-1.0..=1.0).contains(&ab));
    }
}
