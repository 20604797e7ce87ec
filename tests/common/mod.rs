/*!
 * Common test utilities for the epubtrans test suite
 */

use anyhow::Result;
use std::sync::Once;
use tempfile::TempDir;

use epubtrans::app_config::ClientConfig;
use epubtrans::checkpoint::CheckpointStore;
use epubtrans::document::memory::MemoryDocument;
use epubtrans::document::LeafContext;

static INIT_LOGGING: Once = Once::new();

/// Initialize env_logger once for the whole suite; RUST_LOG controls
/// verbosity when diagnosing a failing test
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Client configuration with timings shrunk for paused-clock tests
pub fn fast_client_config() -> ClientConfig {
    ClientConfig {
        cooldown_secs: 0.0,
        base_timeout_secs: 5,
        poll_interval_min_secs: 0.05,
        poll_interval_max_secs: 0.05,
        backoff_min_secs: 0.1,
        backoff_max_secs: 0.1,
        auth_timeout_secs: 2,
        ..Default::default()
    }
}

/// In-memory checkpoint store
pub fn memory_store() -> CheckpointStore {
    CheckpointStore::new_in_memory().expect("Failed to create in-memory store")
}

/// A three-paragraph document with one dialogue leaf
pub fn sample_document() -> MemoryDocument {
    let mut doc = MemoryDocument::new();
    doc.add_item(
        "ch1",
        "chapter1.xhtml",
        vec![
            ("Hello".to_string(), LeafContext::Paragraph),
            ("world".to_string(), LeafContext::Paragraph),
            (
                "\u{201c}Good morning\u{201d}".to_string(),
                LeafContext::Paragraph,
            ),
        ],
    );
    doc
}
