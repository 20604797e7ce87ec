/*!
 * Tests for the checkpoint store
 */

use epubtrans::checkpoint::{line_key, CheckpointStore, LineRecord};

use crate::common::memory_store;

fn record(text: &str) -> LineRecord {
    LineRecord {
        text: text.to_string(),
        is_dialogue: false,
    }
}

#[test]
fn test_lineKey_shouldBeIndexAddressed() {
    assert_eq!(line_key(0), "chunk0_line0");
    assert_eq!(line_key(12), "chunk0_line12");
}

#[test]
fn test_runKeyFor_shouldBeStableAndDistinct() {
    let a = CheckpointStore::run_key_for("/tmp/book.translated.json");
    let b = CheckpointStore::run_key_for("/tmp/book.translated.json");
    let c = CheckpointStore::run_key_for("/tmp/other.translated.json");

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.len(), 16);
    assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
}

#[tokio::test]
async fn test_loadItem_withNothingPersisted_shouldReturnEmptyCheckpoint() {
    let store = memory_store();

    let checkpoint = store.load_item("run", "ch1").await;

    assert!(checkpoint.is_empty());
    assert!(!checkpoint.completed);
}

#[tokio::test]
async fn test_saveLine_shouldRoundTripThroughLoadItem() {
    let store = memory_store();

    let saved = LineRecord {
        text: "Bonjour".to_string(),
        is_dialogue: true,
    };
    store
        .save_line("run", "ch1", &line_key(0), &saved)
        .await
        .unwrap();

    let checkpoint = store.load_item("run", "ch1").await;
    assert_eq!(checkpoint.lines.len(), 1);
    assert_eq!(checkpoint.lines.get(&line_key(0)), Some(&saved));
    assert!(!checkpoint.completed);
}

#[tokio::test]
async fn test_saveLine_withExistingKey_shouldKeepFirstRecord() {
    let store = memory_store();

    store
        .save_line("run", "ch1", &line_key(0), &record("first"))
        .await
        .unwrap();
    store
        .save_line("run", "ch1", &line_key(0), &record("second"))
        .await
        .unwrap();

    let checkpoint = store.load_item("run", "ch1").await;
    assert_eq!(checkpoint.lines.get(&line_key(0)).unwrap().text, "first");
    assert_eq!(store.line_count("run", "ch1").await.unwrap(), 1);
}

#[tokio::test]
async fn test_setCompleted_shouldFlagItem() {
    let store = memory_store();

    store
        .save_line("run", "ch1", &line_key(0), &record("text"))
        .await
        .unwrap();
    store.set_completed("run", "ch1").await.unwrap();

    let checkpoint = store.load_item("run", "ch1").await;
    assert!(checkpoint.completed);
    assert_eq!(checkpoint.lines.len(), 1);
}

#[tokio::test]
async fn test_setCompleted_withNoLines_shouldCreateItemRow() {
    let store = memory_store();

    store.set_completed("run", "empty").await.unwrap();

    let checkpoint = store.load_item("run", "empty").await;
    assert!(checkpoint.completed);
    assert!(checkpoint.lines.is_empty());
}

#[tokio::test]
async fn test_saveLine_withDifferentRunKeys_shouldNotCollide() {
    let store = memory_store();

    store
        .save_line("run-a", "ch1", &line_key(0), &record("alpha"))
        .await
        .unwrap();
    store
        .save_line("run-b", "ch1", &line_key(0), &record("beta"))
        .await
        .unwrap();

    let a = store.load_item("run-a", "ch1").await;
    let b = store.load_item("run-b", "ch1").await;
    assert_eq!(a.lines.get(&line_key(0)).unwrap().text, "alpha");
    assert_eq!(b.lines.get(&line_key(0)).unwrap().text, "beta");
}

#[test]
fn test_open_withFileBackedStore_shouldPersistAcrossReopen() {
    crate::common::init_test_logging();
    let dir = crate::common::create_temp_dir().unwrap();
    let db_path = dir.path().join("checkpoints.db");

    tokio_test::block_on(async {
        {
            let store = CheckpointStore::open(&db_path).unwrap();
            store
                .save_line("run", "ch1", &line_key(3), &record("persisted"))
                .await
                .unwrap();
        }

        let reopened = CheckpointStore::open(&db_path).unwrap();
        let checkpoint = reopened.load_item("run", "ch1").await;
        assert_eq!(checkpoint.lines.get(&line_key(3)).unwrap().text, "persisted");
    });
}
