/*!
 * End-to-end pipeline tests over the in-memory document backend
 */

use std::path::Path;
use std::sync::{Arc, Mutex};

use epubtrans::checkpoint::{line_key, CheckpointStore, LineRecord};
use epubtrans::client::{CancelToken, ResilientClient};
use epubtrans::chunker::TEXT_DELIMITER;
use epubtrans::document::memory::MemoryDocument;
use epubtrans::document::LeafContext;
use epubtrans::orchestrator::{is_dialogue, Orchestrator, PipelineOptions, RunOutcome};
use epubtrans::session::mock::MockSession;

use crate::common::{
    create_temp_dir, fast_client_config, init_test_logging, memory_store, sample_document,
};

const FOOTER: &str = "Translated with DeepL.com (free version)";

fn options(max_chars: usize) -> PipelineOptions {
    PipelineOptions {
        target_language: "french".to_string(),
        max_chars_per_chunk: max_chars,
        excluded_keywords: ["toc", "nav", "cover", "title", "index", "info", "copyright"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        strip_patterns: vec![FOOTER.to_string()],
        dialogue: is_dialogue,
    }
}

fn orchestrator(session: Arc<MockSession>, store: CheckpointStore, max_chars: usize) -> Orchestrator {
    let client = ResilientClient::new(session, fast_client_config());
    Orchestrator::new(client, store, options(max_chars))
}

fn french_responder(payload: &str) -> String {
    payload
        .replace("Hello", "Bonjour")
        .replace("world", "monde")
        .replace("Good morning", "Bon matin")
}

async fn run(
    orchestrator: &Orchestrator,
    document: &mut MemoryDocument,
    output: &Path,
    cancel: &CancelToken,
) -> RunOutcome {
    crate::common::init_test_logging();
    orchestrator
        .translate_document(document, output, |_| {}, cancel)
        .await
        .expect("pipeline infrastructure failure")
}

#[tokio::test(start_paused = true)]
async fn test_translateDocument_withResponderBackend_shouldTranslateAndReconstruct() {
    init_test_logging();
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("book.translated.json");
    let session = MockSession::with_responder(french_responder);
    let store = memory_store();
    let orchestrator = orchestrator(session, store.clone(), 4950);

    let mut document = sample_document();
    let progress_log: Mutex<Vec<f64>> = Mutex::new(Vec::new());

    let outcome = orchestrator
        .translate_document(
            &mut document,
            &output,
            |percent| progress_log.lock().unwrap().push(percent),
            &CancelToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(document.leaf_text("ch1", 0), Some("Bonjour"));
    assert_eq!(document.leaf_text("ch1", 1), Some("monde"));
    assert_eq!(
        document.leaf_text("ch1", 2),
        Some("\u{201c}Bon matin\u{201d}")
    );
    assert_eq!(document.language("ch1"), Some("fr"));

    // Dialogue in a paragraph context gets wrapped in emphasis
    assert_eq!(document.leaf_emphasized("ch1", 2), Some(true));
    assert_eq!(document.leaf_emphasized("ch1", 0), Some(false));

    // Final output written, intermediate snapshot cleaned up
    assert!(output.exists());
    assert!(!dir.path().join("book.translated.json.partial").exists());

    let progress = progress_log.lock().unwrap();
    assert_eq!(progress.last(), Some(&100.0));

    let run_key = CheckpointStore::run_key_for(&output);
    assert!(store.load_item(&run_key, "ch1").await.completed);
}

#[tokio::test(start_paused = true)]
async fn test_translateDocument_withCompletedCheckpoint_shouldSkipWithoutRequests() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("book.translated.json");
    let store = memory_store();

    let first_session = MockSession::with_responder(french_responder);
    let first = orchestrator(first_session.clone(), store.clone(), 4950);
    let mut document = sample_document();
    let outcome = run(&first, &mut document, &output, &CancelToken::new()).await;
    assert_eq!(outcome, RunOutcome::Completed);
    assert!(first_session.submissions() > 0);

    // Second run over the same output path resumes from the checkpoint
    let second_session = MockSession::with_responder(french_responder);
    let second = orchestrator(second_session.clone(), store, 4950);
    let mut fresh = sample_document();
    let outcome = run(&second, &mut fresh, &output, &CancelToken::new()).await;

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(second_session.submissions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_translateDocument_withPartialCheckpoint_shouldOnlyTranslateMissingLines() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("book.translated.json");
    let store = memory_store();
    let run_key = CheckpointStore::run_key_for(&output);

    // Line 0 already persisted by an earlier, interrupted run
    store
        .save_line(
            &run_key,
            "ch1",
            &line_key(0),
            &LineRecord {
                text: "Salutations".to_string(),
                is_dialogue: false,
            },
        )
        .await
        .unwrap();

    let session = MockSession::with_responder(french_responder);
    let orchestrator = orchestrator(session.clone(), store, 4950);
    let mut document = sample_document();
    let outcome = run(&orchestrator, &mut document, &output, &CancelToken::new()).await;

    assert_eq!(outcome, RunOutcome::Completed);
    // The persisted line was reused, not re-translated
    assert_eq!(document.leaf_text("ch1", 0), Some("Salutations"));
    assert_eq!(document.leaf_text("ch1", 1), Some("monde"));
    assert_eq!(session.submissions(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_translateDocument_withQuotaMidRun_shouldHaltKeepingProgress() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("book.translated.json");
    let store = memory_store();
    let run_key = CheckpointStore::run_key_for(&output);

    // A tiny chunk budget forces one chunk per segment; the quota trips on
    // the second submission
    let session = MockSession::quota_after(1);
    let orchestrator = orchestrator(session, store.clone(), 20);
    let mut document = sample_document();
    let outcome = run(&orchestrator, &mut document, &output, &CancelToken::new()).await;

    match outcome {
        RunOutcome::Failed(reason) => assert!(reason.contains("quota")),
        other => panic!("Expected quota failure, got {:?}", other),
    }

    // The first chunk's line survived for the next run
    assert_eq!(store.line_count(&run_key, "ch1").await.unwrap(), 1);
    assert!(!store.load_item(&run_key, "ch1").await.completed);
    assert!(!output.exists());
}

#[tokio::test(start_paused = true)]
async fn test_translateDocument_withDroppedDelimiter_shouldAbandonItemWithoutPanic() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("book.translated.json");
    let store = memory_store();
    let run_key = CheckpointStore::run_key_for(&output);

    fn delimiter_dropper(payload: &str) -> String {
        payload.replace(TEXT_DELIMITER, " ")
    }

    let session = MockSession::with_responder(delimiter_dropper);
    let orchestrator = orchestrator(session, store.clone(), 4950);
    let mut document = sample_document();
    let outcome = run(&orchestrator, &mut document, &output, &CancelToken::new()).await;

    // The run finishes, but the misaligned item is left untouched
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(document.leaf_text("ch1", 0), Some("Hello"));
    assert!(!store.load_item(&run_key, "ch1").await.completed);
    assert_eq!(store.line_count(&run_key, "ch1").await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_translateDocument_withCancelledToken_shouldStopBeforeWork() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("book.translated.json");
    let session = MockSession::with_responder(french_responder);
    let orchestrator = orchestrator(session.clone(), memory_store(), 4950);

    let cancel = CancelToken::new();
    cancel.cancel();
    let mut document = sample_document();
    let outcome = run(&orchestrator, &mut document, &output, &cancel).await;

    assert_eq!(outcome, RunOutcome::StoppedByUser);
    assert_eq!(session.submissions(), 0);
    assert!(!output.exists());
}

#[tokio::test(start_paused = true)]
async fn test_translateDocument_withExcludedItems_shouldSkipThem() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("book.translated.json");
    let store = memory_store();
    let run_key = CheckpointStore::run_key_for(&output);

    let mut document = MemoryDocument::new();
    document.add_item(
        "cover",
        "cover.xhtml",
        vec![("Cover art credit".to_string(), LeafContext::Other)],
    );
    document.add_item(
        "ch1",
        "chapter1.xhtml",
        vec![("Hello".to_string(), LeafContext::Paragraph)],
    );

    let session = MockSession::with_responder(french_responder);
    let orchestrator = orchestrator(session, store.clone(), 4950);
    let outcome = run(&orchestrator, &mut document, &output, &CancelToken::new()).await;

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(document.leaf_text("cover", 0), Some("Cover art credit"));
    assert_eq!(document.leaf_text("ch1", 0), Some("Bonjour"));
    assert!(!store.load_item(&run_key, "cover").await.completed);
}

#[tokio::test(start_paused = true)]
async fn test_translateDocument_withOnlyExcludedItems_shouldFail() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("book.translated.json");

    let mut document = MemoryDocument::new();
    document.add_item(
        "toc",
        "toc.xhtml",
        vec![("Contents".to_string(), LeafContext::Other)],
    );

    let session = MockSession::with_responder(french_responder);
    let orchestrator = orchestrator(session, memory_store(), 4950);
    let outcome = run(&orchestrator, &mut document, &output, &CancelToken::new()).await;

    assert!(matches!(outcome, RunOutcome::Failed(_)));
}

#[tokio::test(start_paused = true)]
async fn test_translateDocument_withWhitespaceOnlyItem_shouldMarkCompleted() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("book.translated.json");
    let store = memory_store();
    let run_key = CheckpointStore::run_key_for(&output);

    let mut document = MemoryDocument::new();
    document.add_item(
        "blank",
        "spacer.xhtml",
        vec![("   \n  ".to_string(), LeafContext::Other)],
    );

    let session = MockSession::with_responder(french_responder);
    let orchestrator = orchestrator(session.clone(), store.clone(), 4950);
    let outcome = run(&orchestrator, &mut document, &output, &CancelToken::new()).await;

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(session.submissions(), 0);
    assert!(store.load_item(&run_key, "blank").await.completed);
}

#[tokio::test(start_paused = true)]
async fn test_translateDocument_withServiceFooter_shouldStripIt() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("book.translated.json");

    fn footer_appender(payload: &str) -> String {
        format!("{} {}", french_responder(payload), FOOTER)
    }

    let session = MockSession::with_responder(footer_appender);
    let orchestrator = orchestrator(session, memory_store(), 4950);
    let mut document = sample_document();
    let outcome = run(&orchestrator, &mut document, &output, &CancelToken::new()).await;

    assert_eq!(outcome, RunOutcome::Completed);
    for index in 0..3 {
        let text = document.leaf_text("ch1", index).unwrap();
        assert!(!text.contains("Translated with"), "footer leaked: {}", text);
    }
}

#[tokio::test(start_paused = true)]
async fn test_translateDocument_withUnresponsiveService_shouldKeepSourceText() {
    let dir = create_temp_dir().unwrap();
    let output = dir.path().join("book.translated.json");
    let store = memory_store();
    let run_key = CheckpointStore::run_key_for(&output);

    let session = MockSession::silent();
    let orchestrator = orchestrator(session, store.clone(), 4950);
    let mut document = sample_document();
    let outcome = run(&orchestrator, &mut document, &output, &CancelToken::new()).await;

    // Exhausted retries degrade to source text instead of failing the run
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(document.leaf_text("ch1", 0), Some("Hello"));
    assert!(store.load_item(&run_key, "ch1").await.completed);
}
