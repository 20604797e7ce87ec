/*!
 * Typed checkpoint store API.
 *
 * High-level operations over the checkpoint database, abstracting away the
 * SQL details. Line writes are append-only: once a line key has a record it
 * is never overwritten within a run key; re-translating a document from
 * scratch means running with a fresh run key.
 */

use anyhow::Result;
use log::{debug, warn};
use rusqlite::{params, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;

use super::connection::CheckpointConnection;
use super::models::{ItemCheckpoint, LineRecord};

/// Store of per-line translation results and per-item completion flags
#[derive(Clone)]
pub struct CheckpointStore {
    db: CheckpointConnection,
}

impl CheckpointStore {
    /// Create a store over the given connection
    pub fn new(db: CheckpointConnection) -> Self {
        Self { db }
    }

    /// Open (or create) a store at the given database path
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        Ok(Self::new(CheckpointConnection::new(db_path)?))
    }

    /// Create an in-memory store (for testing)
    pub fn new_in_memory() -> Result<Self> {
        Ok(Self::new(CheckpointConnection::new_in_memory()?))
    }

    /// Derive the stable run key for an output path.
    ///
    /// Checkpoints for different output paths never collide, and re-running
    /// with the same output path resumes the same records.
    pub fn run_key_for<P: AsRef<Path>>(output_path: P) -> String {
        let mut hasher = Sha256::new();
        hasher.update(output_path.as_ref().to_string_lossy().as_bytes());
        let digest = hasher.finalize();
        hex_prefix(&digest, 16)
    }

    /// Load everything persisted for one content item.
    ///
    /// Missing or unreadable state yields an empty checkpoint rather than an
    /// error: a corrupt store degrades to a fresh translation, never a
    /// failed run.
    pub async fn load_item(&self, run_key: &str, item_id: &str) -> ItemCheckpoint {
        let run_key = run_key.to_string();
        let item_id = item_id.to_string();

        let result = self
            .db
            .execute_async(move |conn| {
                let completed: Option<bool> = conn
                    .query_row(
                        "SELECT completed FROM items WHERE run_key = ?1 AND item_id = ?2",
                        params![run_key, item_id],
                        |row| row.get::<_, i64>(0).map(|v| v != 0),
                    )
                    .optional()?;

                let mut stmt = conn.prepare(
                    "SELECT line_key, text, is_dialogue FROM lines
                     WHERE run_key = ?1 AND item_id = ?2",
                )?;
                let rows = stmt.query_map(params![run_key, item_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        LineRecord {
                            text: row.get(1)?,
                            is_dialogue: row.get::<_, i64>(2)? != 0,
                        },
                    ))
                })?;

                let mut checkpoint = ItemCheckpoint {
                    completed: completed.unwrap_or(false),
                    ..Default::default()
                };
                for row in rows {
                    let (line_key, record) = row?;
                    checkpoint.lines.insert(line_key, record);
                }
                Ok(checkpoint)
            })
            .await;

        match result {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                warn!("Failed to load checkpoint, starting fresh: {}", e);
                ItemCheckpoint::default()
            }
        }
    }

    /// Persist a single translated line.
    ///
    /// Append-only: an existing record for the same line key is left intact.
    pub async fn save_line(
        &self,
        run_key: &str,
        item_id: &str,
        line_key: &str,
        record: &LineRecord,
    ) -> Result<()> {
        let run_key = run_key.to_string();
        let item_id = item_id.to_string();
        let line_key = line_key.to_string();
        let record = record.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO items (run_key, item_id, completed, updated_at)
                     VALUES (?1, ?2, 0, datetime('now'))",
                    params![run_key, item_id],
                )?;
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO lines (run_key, item_id, line_key, text, is_dialogue, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))",
                    params![run_key, item_id, line_key, record.text, record.is_dialogue as i64],
                )?;
                if inserted == 0 {
                    debug!("Line {} already persisted, keeping existing record", line_key);
                } else {
                    debug!("Checkpoint saved for item {}, line {}", item_id, line_key);
                }
                Ok(())
            })
            .await
    }

    /// Mark an item as fully processed
    pub async fn set_completed(&self, run_key: &str, item_id: &str) -> Result<()> {
        let run_key = run_key.to_string();
        let item_id = item_id.to_string();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "INSERT INTO items (run_key, item_id, completed, updated_at)
                     VALUES (?1, ?2, 1, datetime('now'))
                     ON CONFLICT (run_key, item_id)
                     DO UPDATE SET completed = 1, updated_at = datetime('now')",
                    params![run_key, item_id],
                )?;
                Ok(())
            })
            .await
    }

    /// Number of persisted lines for an item (diagnostics and tests)
    pub async fn line_count(&self, run_key: &str, item_id: &str) -> Result<usize> {
        let run_key = run_key.to_string();
        let item_id = item_id.to_string();

        self.db
            .execute_async(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM lines WHERE run_key = ?1 AND item_id = ?2",
                    params![run_key, item_id],
                    |row| row.get(0),
                )?;
                Ok(count as usize)
            })
            .await
    }
}

fn hex_prefix(bytes: &[u8], len: usize) -> String {
    let mut out = String::with_capacity(len);
    for byte in bytes {
        if out.len() >= len {
            break;
        }
        out.push_str(&format!("{:02x}", byte));
    }
    out.truncate(len);
    out
}
