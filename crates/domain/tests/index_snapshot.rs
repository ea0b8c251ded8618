//! Integration coverage for chunks, index snapshots, and retrieval results.
#![allow(missing_docs, reason = "integration test crate")]

use pilot_domain::{
    Chunk, ChunkBounds, ChunkError, ChunkText, IndexSnapshot, RetrievalResult, ScoredChunk,
};
use pilot_shared::{ErrorCode, ErrorEnvelope};
use proptest::prelude::*;

fn chunk(path: &str, text: &str, mtime: u64) -> Result<Chunk, ChunkError> {
    Ok(Chunk::new(
        path,
        ChunkText::new(text, ChunkBounds::default())?,
        vec![1.0, 0.0],
        mtime,
    ))
}

#[test]
fn replacing_a_file_restamps_its_chunks() -> Result<(), ChunkError> {
    let mut snapshot = IndexSnapshot::from_chunks(vec![
        chunk("src/a.rs", "fn alpha() -> u8 { 1 }", 10)?,
        chunk("src/b.rs", "fn beta() -> u8 { 2 }", 20)?,
    ]);

    snapshot.replace_file(
        "src/a.rs",
        30,
        vec![
            chunk("ignored", "fn alpha() -> u8 { 3 }", 0)?,
            chunk("ignored", "fn gamma() -> u8 { 4 }", 0)?,
        ],
    );

    assert_eq!(snapshot.len(), 3);
    assert_eq!(snapshot.file_count(), 2);
    assert_eq!(snapshot.watermark("src/a.rs"), Some(30));
    assert_eq!(snapshot.watermark("src/b.rs"), Some(20));
    assert!(
        snapshot
            .chunks_for("src/a.rs")
            .all(|chunk| chunk.mtime == 30 && chunk.file_path.as_ref() == "src/a.rs")
    );
    Ok(())
}

#[test]
fn loaded_chunks_with_conflicting_mtimes_keep_the_first_watermark() -> Result<(), ChunkError> {
    let snapshot = IndexSnapshot::from_chunks(vec![
        chunk("src/a.rs", "fn alpha() -> u8 { 1 }", 10)?,
        chunk("src/a.rs", "fn stale() -> u8 { 0 }", 5)?,
    ]);

    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.watermark("src/a.rs"), Some(10));
    Ok(())
}

#[test]
fn chunk_json_uses_camel_case_fields() -> Result<(), Box<dyn std::error::Error>> {
    let value = serde_json::to_value(chunk("src/a.rs", "fn alpha() -> u8 { 1 }", 7)?)?;

    assert_eq!(value.get("filePath").and_then(serde_json::Value::as_str), Some("src/a.rs"));
    assert_eq!(value.get("mtime").and_then(serde_json::Value::as_u64), Some(7));

    let legacy: Chunk =
        serde_json::from_str(r#"{"filePath":"src/a.rs","text":"fn alpha() -> u8 { 1 }"}"#)?;
    assert!(!legacy.is_embedded());
    assert_eq!(legacy.mtime, 0);
    Ok(())
}

#[test]
fn chunk_errors_map_into_error_envelopes() {
    let short = ChunkText::new("short", ChunkBounds::default())
        .err()
        .map(ErrorEnvelope::from);
    assert_eq!(
        short.map(|error| error.code),
        Some(ErrorCode::new("domain", "chunk_out_of_bounds"))
    );

    let band = ChunkBounds::new(10, 11).err().map(ErrorEnvelope::from);
    assert_eq!(
        band.map(|error| error.code),
        Some(ErrorCode::new("domain", "invalid_chunk_bounds"))
    );
}

#[test]
fn retrieval_result_serializes_as_a_plain_list() -> Result<(), Box<dyn std::error::Error>> {
    let result = RetrievalResult::from_ranked(vec![ScoredChunk {
        chunk: chunk("src/a.rs", "fn alpha() -> u8 { 1 }", 1)?,
        score: 0.5,
    }]);

    let value = serde_json::to_value(&result)?;

    assert_eq!(value.as_array().map(Vec::len), Some(1));
    assert_eq!(value.pointer("/0/score").and_then(serde_json::Value::as_f64), Some(0.5));
    assert!(RetrievalResult::empty().is_empty());
    Ok(())
}

proptest! {
    #[test]
    fn bounds_accept_only_lengths_strictly_inside_the_band(
        (min, max) in valid_band(),
        length in 0usize..300,
    ) {
        let bounds = ChunkBounds::new(min, max).map_err(|error| TestCaseError::fail(error.to_string()))?;
        let candidate = "x".repeat(length);
        let accepted = bounds.check(&candidate).is_ok();
        prop_assert_eq!(accepted, length > min && length < max);
    }

    #[test]
    fn retain_reports_the_number_of_dropped_chunks(files in prop::collection::vec(0u8..5, 1..20)) {
        let chunks: Vec<Chunk> = files
            .iter()
            .map(|file| chunk(&format!("src/{file}.rs"), "fn body() -> u8 { 0 }", 1))
            .collect::<Result<_, _>>()
            .map_err(|error| TestCaseError::fail(error.to_string()))?;
        let mut snapshot = IndexSnapshot::from_chunks(chunks);
        let before = snapshot.len();

        let removed = snapshot.retain_files(|path| path != "src/0.rs");

        prop_assert_eq!(before - removed, snapshot.len());
        prop_assert!(snapshot.chunks_for("src/0.rs").next().is_none());
    }
}

fn valid_band() -> impl Strategy<Value = (usize, usize)> {
    (0usize..100, 2usize..200).prop_filter("non-empty band", |(min, max)| min + 1 < *max)
}
