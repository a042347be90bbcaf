use super::*;
use crate::embeddings::normalize::normalize;
use tempfile::TempDir;

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn unit_index() -> VectorIndex {
    let mut index = VectorIndex::new();
    index
        .add(
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.6, 0.8]],
            texts(&["east", "north", "between"]),
        )
        .expect("should add vectors");
    index
}

#[test]
fn new_index_is_empty() {
    let index = VectorIndex::new();
    assert!(index.is_empty());
    assert_eq!(index.len(), 0);
    assert_eq!(index.dimension(), None);
    assert_eq!(index.chunk_text(0), None);
}

#[test]
fn add_establishes_dimension() {
    let index = unit_index();
    assert_eq!(index.len(), 3);
    assert_eq!(index.dimension(), Some(2));
    assert_eq!(index.chunk_text(2), Some("between"));
}

#[test]
fn adding_nothing_keeps_dimension_open() {
    let mut index = VectorIndex::new();
    index
        .add(Vec::new(), Vec::new())
        .expect("empty add is a no-op");
    assert_eq!(index.dimension(), None);

    index
        .add(vec![vec![1.0, 2.0, 3.0]], texts(&["three"]))
        .expect("should add vectors");
    assert_eq!(index.dimension(), Some(3));
}

#[test]
fn mismatched_lengths_leave_index_untouched() {
    let mut index = unit_index();
    let before = index.clone();

    let result = index.add(vec![vec![1.0, 1.0]], texts(&["a", "b"]));

    assert!(matches!(result, Err(QaError::InvalidArgument(_))));
    assert_eq!(index, before);
}

#[test]
fn wrong_dimension_leaves_index_untouched() {
    let mut index = unit_index();
    let before = index.clone();

    let result = index.add(
        vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]],
        texts(&["ok", "bad"]),
    );

    assert!(matches!(
        result,
        Err(QaError::Dimension {
            expected: 2,
            actual: 3
        })
    ));
    assert_eq!(index, before);
}

#[test]
fn first_add_must_agree_on_dimension() {
    let mut index = VectorIndex::new();
    let result = index.add(vec![vec![1.0], vec![1.0, 2.0]], texts(&["a", "b"]));

    assert!(matches!(result, Err(QaError::Dimension { .. })));
    assert!(index.is_empty());
    assert_eq!(index.dimension(), None);
}

#[test]
fn zero_length_vectors_are_rejected() {
    let mut index = VectorIndex::new();
    let result = index.add(vec![Vec::new()], texts(&["nothing"]));
    assert!(matches!(result, Err(QaError::InvalidArgument(_))));
    assert!(index.is_empty());
}

#[test]
fn search_ranks_by_inner_product() {
    let index = unit_index();

    let results = index.search(&[1.0, 0.0], 3).expect("should search");

    let order: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(order, vec!["east", "between", "north"]);
    assert_eq!(
        results.iter().map(|r| r.index).collect::<Vec<_>>(),
        vec![0, 2, 1]
    );
    assert!((results[0].score - 1.0).abs() < 1e-6);
    assert!((results[1].score - 0.6).abs() < 1e-6);
    assert!(results[2].score.abs() < 1e-6);
}

#[test]
fn search_returns_at_most_k() {
    let index = unit_index();
    assert_eq!(index.search(&[0.0, 1.0], 1).expect("should search").len(), 1);
    assert_eq!(index.search(&[0.0, 1.0], 2).expect("should search").len(), 2);
    assert_eq!(index.search(&[0.0, 1.0], 50).expect("should search").len(), 3);
}

#[test]
fn ties_prefer_lower_position() {
    let mut index = VectorIndex::new();
    index
        .add(
            vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0]],
            texts(&["n0", "e1", "n2", "e3"]),
        )
        .expect("should add vectors");

    let results = index.search(&[1.0, 0.0], 2).expect("should search");
    assert_eq!(
        results.iter().map(|r| r.index).collect::<Vec<_>>(),
        vec![1, 3]
    );

    let all = index.search(&[1.0, 0.0], 4).expect("should search");
    assert_eq!(
        all.iter().map(|r| r.index).collect::<Vec<_>>(),
        vec![1, 3, 0, 2]
    );
}

#[test]
fn signed_zero_scores_tie() {
    let mut index = VectorIndex::new();
    index
        .add(
            vec![vec![-0.0], vec![0.0]],
            texts(&["negative zero", "positive zero"]),
        )
        .expect("should add vectors");

    let results = index.search(&[1.0], 2).expect("should search");

    assert_eq!(
        results.iter().map(|r| r.index).collect::<Vec<_>>(),
        vec![0, 1]
    );
    assert!(results.iter().all(|r| r.score == 0.0 && r.score.is_sign_positive()));
}

#[test]
fn non_finite_components_are_rejected() {
    let mut index = unit_index();
    let before = index.clone();

    for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
        let result = index.add(vec![vec![0.6, 0.8], vec![bad, 0.0]], texts(&["ok", "bad"]));
        assert!(matches!(result, Err(QaError::InvalidArgument(_))));
        assert_eq!(index, before);

        assert!(matches!(
            index.search(&[bad, 1.0], 1),
            Err(QaError::InvalidArgument(_))
        ));
    }

    let mut empty = VectorIndex::new();
    assert!(empty.add(vec![vec![f32::NAN]], texts(&["nan"])).is_err());
    assert_eq!(empty.dimension(), None);
}

#[test]
fn search_errors() {
    assert!(matches!(
        VectorIndex::new().search(&[1.0, 0.0], 1),
        Err(QaError::EmptyIndex)
    ));

    let index = unit_index();
    assert!(matches!(
        index.search(&[1.0, 0.0], 0),
        Err(QaError::InvalidArgument(_))
    ));
    assert!(matches!(
        index.search(&[1.0, 0.0, 0.0], 1),
        Err(QaError::Dimension {
            expected: 2,
            actual: 3
        })
    ));
}

#[test]
fn every_vector_finds_itself() {
    let raw = [
        vec![0.9, 0.1, 0.0, 0.3],
        vec![-0.2, 0.7, 0.5, 0.1],
        vec![0.0, 0.0, 1.0, -1.0],
        vec![0.4, 0.4, 0.4, 0.4],
        vec![-1.0, 0.2, 0.0, 0.0],
    ];
    let normalized: Vec<Vec<f32>> = raw
        .iter()
        .map(|v| normalize(v).expect("non-zero vector"))
        .collect();
    let names: Vec<String> = (0..raw.len()).map(|i| format!("chunk {i}")).collect();

    let mut index = VectorIndex::new();
    index
        .add(normalized.clone(), names.clone())
        .expect("should add vectors");

    for (i, query) in normalized.iter().enumerate() {
        let best = index.search(query, 1).expect("should search");
        assert_eq!(best[0].index, i);
        assert_eq!(best[0].text, names[i]);
        assert!((best[0].score - 1.0).abs() < 1e-5);
    }
}

#[test]
fn save_and_load_preserve_search() {
    let dir = TempDir::new().expect("should create temp dir");
    let key = dir.path().join("doc");
    let index = unit_index();

    index.save(&key).expect("should save");
    let loaded = VectorIndex::load(&key).expect("should load");

    assert_eq!(loaded, index);
    assert_eq!(
        loaded.search(&[0.6, 0.8], 3).expect("should search"),
        index.search(&[0.6, 0.8], 3).expect("should search")
    );
}

#[test]
fn save_overwrites_previous_save() {
    let dir = TempDir::new().expect("should create temp dir");
    let key = dir.path().join("doc");

    unit_index().save(&key).expect("should save");

    let mut smaller = VectorIndex::new();
    smaller
        .add(vec![vec![0.0, 0.0, 1.0]], texts(&["up"]))
        .expect("should add vectors");
    smaller.save(&key).expect("should save");

    let loaded = VectorIndex::load(&key).expect("should load");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded.dimension(), Some(3));
}

#[test]
fn empty_index_round_trips() {
    let dir = TempDir::new().expect("should create temp dir");
    let key = dir.path().join("empty");

    VectorIndex::new().save(&key).expect("should save");
    let loaded = VectorIndex::load(&key).expect("should load");

    assert!(loaded.is_empty());
    assert_eq!(loaded.dimension(), None);
}
