/*!
 * Document model contract.
 *
 * The document container format and the concrete markup tree live outside
 * this crate; the pipeline only needs an ordered view of content items,
 * deterministic extraction of their translatable text leaves, and the
 * ability to write replacement nodes back.
 *
 * Determinism is load-bearing: checkpoint line identity is positional, so
 * re-extracting an unmodified item must yield the same ordered leaf list
 * across runs.
 */

use anyhow::Result;

pub mod memory;

/// Identity of one content item within the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemInfo {
    /// Stable item identifier
    pub id: String,
    /// Human-facing item name (used for exclusion filtering)
    pub name: String,
}

/// Structural context of a text leaf's parent element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafContext {
    /// Parent is a paragraph-level element; dialogue gets wrapped in
    /// emphasis here
    Paragraph,
    /// Parent is already an emphasis/italic element; replaced in place
    Emphasis,
    /// Anything else; replaced as plain text
    Other,
}

/// One translatable text leaf, as extracted from an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLeaf {
    /// Position within the item's full ordered leaf list
    pub index: usize,
    /// Raw leaf text, whitespace intact
    pub text: String,
    /// Parent element context
    pub context: LeafContext,
}

/// Replacement node written back into the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    /// Plain text node
    Plain(String),
    /// Text wrapped in an emphasis/italic element
    Emphasized(String),
}

/// Contract the pipeline requires from a document backend
pub trait DocumentModel: Send {
    /// All content items in document order
    fn items(&self) -> Vec<ItemInfo>;

    /// Ordered translatable leaves of an item, excluding non-translatable
    /// element kinds (scripts, styles, titles). Must be deterministic for
    /// an unmodified item.
    fn extract_leaves(&self, item_id: &str) -> Result<Vec<TextLeaf>>;

    /// Replace the leaf at `leaf_index` with a new node
    fn replace_leaf(&mut self, item_id: &str, leaf_index: usize, replacement: Replacement)
        -> Result<()>;

    /// Set the item's declared language attribute
    fn set_language(&mut self, item_id: &str, code: &str) -> Result<()>;

    /// Serialize the whole document back to bytes
    fn serialize(&self) -> Result<Vec<u8>>;
}

/// Whether an item name matches any of the exclusion keywords
pub fn is_excluded(name: &str, keywords: &[String]) -> bool {
    let lowered = name.to_lowercase();
    keywords.iter().any(|k| lowered.contains(&k.to_lowercase()))
}
