use super::*;

fn texts(chunks: &[Chunk]) -> Vec<&str> {
    chunks.iter().map(|c| c.text.as_str()).collect()
}

#[test]
fn overlapping_windows() {
    let chunks = chunk_text("a b c d e f", 4, 2).expect("valid parameters");

    assert_eq!(texts(&chunks), vec!["a b c d", "c d e f", "e f"]);
    assert_eq!(
        chunks.iter().map(|c| c.source_offset).collect::<Vec<_>>(),
        vec![0, 2, 4]
    );
}

#[test]
fn rejects_overlap_not_below_chunk_size() {
    assert!(matches!(
        chunk_text("a b c", 4, 4),
        Err(ConfigError::InvalidOverlap {
            overlap: 4,
            chunk_size: 4
        })
    ));
    assert!(matches!(
        chunk_text("a b c", 4, 5),
        Err(ConfigError::InvalidOverlap { .. })
    ));
    assert!(matches!(
        chunk_text("a b c", 0, 0),
        Err(ConfigError::InvalidChunkSize(0))
    ));
}

#[test]
fn window_count_matches_output() {
    let words = (0..37).map(|i| format!("w{i}")).collect::<Vec<_>>();
    let text = words.join(" ");

    for chunk_size in 1..12 {
        for overlap in 0..chunk_size {
            let config = ChunkingConfig::new(chunk_size, overlap).expect("valid parameters");
            let chunks = chunk_text(&text, chunk_size, overlap).expect("valid parameters");

            let mut expected = 0;
            let mut start = 0;
            while start < words.len() {
                expected += 1;
                start += chunk_size - overlap;
            }

            assert_eq!(chunks.len(), expected, "size {chunk_size}, overlap {overlap}");
            assert_eq!(window_count(words.len(), &config), expected);
        }
    }
}

#[test]
fn every_window_is_full_except_possibly_the_last() {
    let text = (0..25).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
    let chunks = chunk_text(&text, 6, 1).expect("valid parameters");

    let (last, rest) = chunks.split_last().expect("at least one chunk");
    for chunk in rest {
        assert_eq!(chunk.text.split_whitespace().count(), 6);
    }
    assert!(last.text.split_whitespace().count() <= 6);
}

#[test]
fn whitespace_is_collapsed() {
    let chunks = chunk_text("  alpha\tbeta\n\ngamma   delta  ", 3, 0).expect("valid parameters");
    assert_eq!(texts(&chunks), vec!["alpha beta gamma", "delta"]);
}

#[test]
fn empty_text_has_no_chunks() {
    assert!(chunk_text("", 4, 1).expect("valid parameters").is_empty());
    assert!(chunk_text(" \n\t ", 4, 1).expect("valid parameters").is_empty());
}

#[test]
fn text_shorter_than_window() {
    let chunks = chunk_text("one two", 10, 3).expect("valid parameters");
    assert_eq!(texts(&chunks), vec!["one two"]);
}

#[test]
fn pages_do_not_share_windows() {
    let config = ChunkingConfig::new(3, 1).expect("valid parameters");
    let pages = ["a b c d", "", "e f"];

    let chunks = chunk_pages(pages, &config).expect("valid parameters");

    assert_eq!(texts(&chunks), vec!["a b c", "c d", "e f"]);
    assert_eq!(
        chunks.iter().map(|c| c.page).collect::<Vec<_>>(),
        vec![0, 0, 2]
    );
    assert_eq!(
        chunks.iter().map(|c| c.chunk_index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert_eq!(chunks[2].source_offset, 0);
}

#[test]
fn chunk_pages_validates_config() {
    let config = ChunkingConfig {
        chunk_size: 2,
        overlap: 2,
    };
    assert!(chunk_pages(["a b c"], &config).is_err());
}

#[test]
fn default_config_is_valid() {
    let config = ChunkingConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.stride(), 160);
}
