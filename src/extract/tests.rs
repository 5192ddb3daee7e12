//! Tests for extract module

use super::*;
use crate::error::Error;
use crate::schema::{LogRecord, SongRecord};
use bytes::Bytes;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::fs;

// ============================================================================
// Decoding Tests
// ============================================================================

#[test]
fn test_decode_jsonl_skips_blank_lines() {
    let body = "{\"a\": 1}\n\n  \n{\"a\": 2}\n";
    let records: Vec<Value> = decode_jsonl(body, "test.json").unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1]["a"], 2);
}

#[test]
fn test_decode_jsonl_reports_line_of_malformed_record() {
    let body = "{\"song_id\": \"S1\", \"artist_id\": \"A1\"}\n{\"song_id\": \n";
    let result: crate::Result<Vec<SongRecord>> = decode_jsonl(body, "song_data/x.json");

    match result {
        Err(Error::MalformedRecord { location, line, .. }) => {
            assert_eq!(location, "song_data/x.json");
            assert_eq!(line, 2);
        }
        other => panic!("expected malformed record, got {other:?}"),
    }
}

#[test]
fn test_decode_jsonl_rejects_wrong_shape() {
    let body = "[1, 2, 3]\n";
    let result: crate::Result<Vec<LogRecord>> = decode_jsonl(body, "log.json");
    assert!(matches!(result, Err(Error::MalformedRecord { line: 1, .. })));
}

// ============================================================================
// Location Tests
// ============================================================================

#[test]
fn test_parse_local_path() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().to_str().unwrap();
    let location = StoreLocation::parse(path).unwrap();
    assert_eq!(location.scheme(), "file");
    assert!(!location.is_cloud());
    assert_eq!(location.url(), path);
}

#[test]
fn test_parse_existing_requires_directory() {
    let temp_dir = tempfile::tempdir().unwrap();
    let missing = temp_dir.path().join("nope");
    let result = StoreLocation::parse_existing(missing.to_str().unwrap());
    assert!(matches!(result, Err(Error::FileNotFound { .. })));
}

#[test]
fn test_parse_output_creates_directory() {
    let temp_dir = tempfile::tempdir().unwrap();
    let out = temp_dir.path().join("out/nested");
    StoreLocation::parse(out.to_str().unwrap()).unwrap();
    assert!(out.is_dir());
}

#[test]
fn test_parse_rejects_empty() {
    assert!(StoreLocation::parse("").is_err());
    assert!(StoreLocation::parse("s3:///path").is_err());
}

#[test]
fn test_child_paths() {
    let location = StoreLocation::in_memory();
    assert_eq!(location.child("songs/part.parquet").as_ref(), "songs/part.parquet");
    assert_eq!(location.child("/songs/").as_ref(), "songs");
}

#[tokio::test]
async fn test_write_list_delete_in_memory() {
    let location = StoreLocation::in_memory();
    location
        .write("songs/year=2000/part-00000.parquet", Bytes::from_static(b"a"))
        .await
        .unwrap();
    location
        .write("songs/year=2001/part-00000.parquet", Bytes::from_static(b"b"))
        .await
        .unwrap();
    location
        .write("users/part-00000.parquet", Bytes::from_static(b"c"))
        .await
        .unwrap();

    let songs = location.list("songs").await.unwrap();
    assert_eq!(songs.len(), 2);

    let removed = location.delete_all("songs").await.unwrap();
    assert_eq!(removed, 2);
    assert!(location.list("songs").await.unwrap().is_empty());
    assert_eq!(location.list("").await.unwrap().len(), 1);
}

// ============================================================================
// Source Tests
// ============================================================================

#[tokio::test]
async fn test_local_source_lists_json_recursively_in_order() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("A/B")).unwrap();
    fs::write(root.join("A/B/b.json"), "{}\n").unwrap();
    fs::write(root.join("A/a.json"), "{}\n").unwrap();
    fs::write(root.join("A/notes.txt"), "skip me").unwrap();

    let source = StoreLocation::parse_existing(root.to_str().unwrap()).unwrap();
    let files = source.list_files().await.unwrap();
    assert_eq!(files, vec!["A/B/b.json".to_string(), "A/a.json".to_string()]);
}

#[tokio::test]
async fn test_read_all_decodes_every_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();
    fs::write(
        root.join("2018-11-01-events.json"),
        "{\"page\": \"NextSong\", \"ts\": 1, \"userId\": \"1\"}\n{\"page\": \"Home\", \"ts\": 2, \"userId\": \"\"}\n",
    )
    .unwrap();
    fs::write(
        root.join("2018-11-02-events.json"),
        "{\"page\": \"NextSong\", \"ts\": 3, \"userId\": 2}\n",
    )
    .unwrap();

    let source = StoreLocation::parse_existing(root.to_str().unwrap()).unwrap();
    let files: Vec<SourceFile<LogRecord>> = read_all(&source).await.unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(files[0].file, "2018-11-01-events.json");
    assert_eq!(files[0].records.len(), 2);
    assert_eq!(files[0].records[1].user_id, None);
    assert_eq!(files[1].records[0].user_id, Some(2));
}

#[tokio::test]
async fn test_read_all_aborts_on_malformed_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    fs::write(temp_dir.path().join("bad.json"), "{not json}\n").unwrap();

    let source = StoreLocation::parse_existing(temp_dir.path().to_str().unwrap()).unwrap();
    let result: crate::Result<Vec<SourceFile<LogRecord>>> = read_all(&source).await;
    assert!(matches!(result, Err(Error::MalformedRecord { .. })));
}
