/*!
 * Checkpoint record models.
 */

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One persisted translated line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRecord {
    /// Translated text for the segment
    pub text: String,
    /// Whether the segment was classified as dialogue
    pub is_dialogue: bool,
}

/// Everything the store knows about one content item
#[derive(Debug, Clone, Default)]
pub struct ItemCheckpoint {
    /// Persisted lines keyed by their line key
    pub lines: HashMap<String, LineRecord>,
    /// Whether the item was fully reconstructed and handed back
    pub completed: bool,
}

impl ItemCheckpoint {
    /// Whether nothing has been persisted for this item yet
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && !self.completed
    }
}

/// Build the line key for a segment's positional index.
///
/// The chunk namespace is constant per item so that resume lookups are
/// index-addressed: re-batching between runs cannot shift the identity of
/// an already-persisted line.
pub fn line_key(segment_index: usize) -> String {
    format!("chunk0_line{}", segment_index)
}
