use super::*;
use std::cell::RefCell;

/// Embeds each text as `[word count, 1]` and counts calls.
struct WordCountService {
    calls: RefCell<Vec<usize>>,
    fail_on_call: Option<usize>,
}

impl WordCountService {
    fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            fail_on_call: None,
        }
    }

    fn failing_on(call: usize) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            fail_on_call: Some(call),
        }
    }
}

impl EmbeddingService for WordCountService {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut calls = self.calls.borrow_mut();
        calls.push(texts.len());
        if self.fail_on_call == Some(calls.len()) {
            return Err(QaError::Service("connection reset".to_string()));
        }
        Ok(texts
            .iter()
            .map(|t| vec![t.split_whitespace().count() as f32, 1.0])
            .collect())
    }
}

fn indexer(service: &WordCountService, batch_size: usize) -> Indexer<&WordCountService> {
    let chunking = ChunkingConfig::new(3, 1).expect("valid chunking");
    Indexer::new(Embedder::new(service), chunking, batch_size).expect("valid indexer")
}

#[test]
fn ingest_chunks_embeds_and_adds() {
    let service = WordCountService::new();
    let mut index = VectorIndex::new();

    let stats = indexer(&service, 2)
        .ingest(&["a b c d e", "f g"], &mut index)
        .expect("ingestion should succeed");

    assert_eq!(
        stats,
        IngestStats {
            pages: 2,
            chunks: 3,
            batches: 2
        }
    );
    assert_eq!(*service.calls.borrow(), vec![2, 1]);
    assert_eq!(index.len(), 3);
    assert_eq!(index.chunk_text(0), Some("a b c"));
    assert_eq!(index.chunk_text(1), Some("c d e"));
    assert_eq!(index.chunk_text(2), Some("f g"));
}

#[test]
fn stored_vectors_are_normalized() {
    let service = WordCountService::new();
    let mut index = VectorIndex::new();

    indexer(&service, 8)
        .ingest(&["one two three"], &mut index)
        .expect("ingestion should succeed");

    let query = crate::embeddings::normalize::normalize(&[3.0, 1.0]).expect("non-zero");
    let results = index.search(&query, 1).expect("should search");
    assert!((results[0].score - 1.0).abs() < 1e-5);
}

#[test]
fn failure_leaves_index_untouched() {
    let service = WordCountService::failing_on(2);
    let mut index = VectorIndex::new();
    index
        .add(vec![vec![1.0, 0.0]], vec!["existing".to_string()])
        .expect("should add vectors");
    let before = index.clone();

    let result = indexer(&service, 1).ingest(&["a b c d e"], &mut index);

    assert!(matches!(result, Err(QaError::Service(_))));
    assert_eq!(index, before);
}

#[test]
fn blank_pages_make_no_calls() {
    let service = WordCountService::new();
    let mut index = VectorIndex::new();

    let stats = indexer(&service, 4)
        .ingest(&["", "   \n"], &mut index)
        .expect("ingestion should succeed");

    assert_eq!(stats.pages, 2);
    assert_eq!(stats.chunks, 0);
    assert_eq!(stats.batches, 0);
    assert!(service.calls.borrow().is_empty());
    assert!(index.is_empty());
}

#[test]
fn rejects_invalid_settings() {
    let service = WordCountService::new();

    assert!(Indexer::new(Embedder::new(&service), ChunkingConfig::default(), 0).is_err());
    assert!(
        Indexer::new(
            Embedder::new(&service),
            ChunkingConfig {
                chunk_size: 5,
                overlap: 5
            },
            4
        )
        .is_err()
    );
}

#[test]
fn from_config_uses_configured_settings() {
    let service = WordCountService::new();
    let config = Config {
        chunking: ChunkingConfig::new(2, 0).expect("valid chunking"),
        service: crate::config::ServiceConfig {
            batch_size: 3,
            ..Default::default()
        },
        ..Config::default()
    };

    let indexer = Indexer::from_config(Embedder::new(&service), &config).expect("valid config");
    let mut index = VectorIndex::new();
    let stats = indexer
        .ingest(&["a b c d e f g h"], &mut index)
        .expect("ingestion should succeed");

    assert_eq!(stats.chunks, 4);
    assert_eq!(stats.batches, 2);
    assert_eq!(*service.calls.borrow(), vec![3, 1]);
}
