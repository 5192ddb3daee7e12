//! Tests for pipeline module

use super::*;
use crate::error::Error;
use crate::load::sql::MEMORY;
use crate::orchestrator::TaskState;
use crate::quality::ValueCheck;
use crate::types::PageFilter;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SONG: &str = r#"{"num_songs": 1, "song_id": "S1", "title": "X", "artist_id": "A1", "artist_name": "Band", "artist_location": "", "artist_latitude": null, "artist_longitude": null, "year": 2000, "duration": 200.5}"#;

fn event(page: &str, user_id: &str, ts: i64) -> String {
    format!(
        r#"{{"artist": "Band", "auth": "Logged In", "firstName": "Ann", "gender": "F", "itemInSession": 0, "lastName": "Lee", "length": 200.5, "level": "free", "location": "Town", "method": "PUT", "page": "{page}", "registration": 1.5e12, "sessionId": 3, "song": "X", "status": 200, "ts": {ts}, "userAgent": "agent", "userId": "{user_id}"}}"#
    )
}

fn write(dir: &Path, relative: &str, lines: &[String]) {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, lines.join("\n")).unwrap();
}

fn fixture() -> (TempDir, PipelineConfig) {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "song_data/A/S1.json", &[SONG.to_string()]);
    write(
        dir.path(),
        "log_data/2018/11/events.json",
        &[event("NextSong", "7", 0), event("Home", "7", 5)],
    );

    let mut config = PipelineConfig::new(
        dir.path().join("song_data").display().to_string(),
        dir.path().join("log_data").display().to_string(),
    );
    config.database.path = MEMORY.to_string();
    config.warehouse.path = MEMORY.to_string();
    config.orchestration.retry_delay_secs = 0;
    (dir, config)
}

#[test]
fn test_summary_lookup_and_display() {
    let mut summary = RunSummary::new(Backend::Lake);
    summary.add_table("songs", 2);
    summary.add_table("users", 3);
    summary.add_files(4);

    assert_eq!(summary.rows("users"), Some(3));
    assert_eq!(summary.rows("time"), None);
    assert_eq!(summary.total_rows(), 5);
    assert_eq!(
        summary.to_string(),
        "lake backend: 4 file(s) processed, songs=2, users=3 (0 ms)"
    );
}

#[tokio::test]
async fn test_database_backend_loads_single_play() {
    let (_dir, config) = fixture();
    let summary = Pipeline::new(&config).run_database().await.unwrap();

    assert_eq!(summary.files_processed, 2);
    assert_eq!(
        summary.tables,
        vec![
            ("songplays".to_string(), 1),
            ("users".to_string(), 1),
            ("songs".to_string(), 1),
            ("artists".to_string(), 1),
            ("time".to_string(), 1),
        ]
    );
}

#[tokio::test]
async fn test_spaced_filter_skips_canonical_events() {
    let (_dir, mut config) = fixture();
    config.transform.page_filter = PageFilter::spaced_next_song();

    let summary = Pipeline::new(&config).run().await.unwrap();
    assert_eq!(summary.rows("songplays"), Some(0));
    assert_eq!(summary.rows("songs"), Some(1));
}

#[tokio::test]
async fn test_missing_source_directory_fails() {
    let (dir, mut config) = fixture();
    config.source.log_data = dir.path().join("nope").display().to_string();

    assert!(Pipeline::new(&config).run_warehouse().await.is_err());
}

#[tokio::test]
async fn test_orchestrated_records_every_task() {
    let (_dir, mut config) = fixture();
    config.quality.checks = vec![ValueCheck::new(
        "SELECT COUNT(*) FROM artists WHERE artist_id IS NULL",
        0,
    )];

    let summary = Pipeline::new(&config).run_orchestrated().await.unwrap();

    let states: Vec<(&str, TaskState)> = summary
        .tasks
        .iter()
        .map(|t| (t.id.as_str(), t.state))
        .collect();
    assert_eq!(
        states,
        vec![
            ("stage_events", TaskState::Succeeded),
            ("stage_songs", TaskState::Succeeded),
            ("load_songplays", TaskState::Succeeded),
            ("load_users", TaskState::Succeeded),
            ("load_songs", TaskState::Succeeded),
            ("load_artists", TaskState::Succeeded),
            ("load_time", TaskState::Succeeded),
            ("run_quality_checks", TaskState::Succeeded),
            ("run_empty_table_checks", TaskState::Skipped),
        ]
    );
    assert_eq!(summary.files_processed, 2);
    assert_eq!(summary.rows("songplays"), Some(1));
}

#[tokio::test]
async fn test_orchestrated_quality_failure_is_not_retried() {
    let (_dir, mut config) = fixture();
    config.quality.checks = vec![ValueCheck::new("SELECT COUNT(*) FROM songplays", 5)];

    match Pipeline::new(&config).run_orchestrated().await {
        Err(Error::TaskFailed { task, attempts, .. }) => {
            assert_eq!(task, "run_quality_checks");
            assert_eq!(attempts, 1);
        }
        other => panic!("expected task failure, got {other:?}"),
    }
}
