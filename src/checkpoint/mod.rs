/*!
 * Checkpoint store for resumable translation runs.
 *
 * This module provides SQLite-based persistence for:
 * - Per-line translation records (append-only within a run)
 * - Per-item completion flags
 *
 * Durability is per line, not per item: a crash after N of M lines resumes
 * at line N+1 on the next run. Each line write is an atomic incremental
 * insert, so an interruption mid-write can never corrupt already-persisted
 * records.
 */

// Allow dead code - store types are for library consumers
#![allow(dead_code)]

pub mod connection;
pub mod models;
pub mod schema;
pub mod store;

// Re-export main types
pub use connection::CheckpointConnection;
pub use models::{line_key, ItemCheckpoint, LineRecord};
pub use store::CheckpointStore;
