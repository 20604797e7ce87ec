/*!
 * In-memory document backend.
 *
 * Reference implementation of the document model used by tests and by the
 * CLI dry-run mode. Items are flat ordered lists of text leaves; the
 * serialized form is JSON.
 */

use anyhow::{anyhow, Result};
use serde::Serialize;

use super::{DocumentModel, ItemInfo, LeafContext, Replacement, TextLeaf};

/// One stored leaf
#[derive(Debug, Clone, Serialize)]
struct MemoryLeaf {
    text: String,
    #[serde(skip)]
    context: LeafContext,
    /// Set when a replacement wrapped the text in emphasis
    emphasized: bool,
}

/// One content item
#[derive(Debug, Clone, Serialize)]
struct MemoryItem {
    id: String,
    name: String,
    language: Option<String>,
    leaves: Vec<MemoryLeaf>,
}

/// Document held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryDocument {
    items: Vec<MemoryItem>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item with the given leaves
    pub fn add_item(&mut self, id: &str, name: &str, leaves: Vec<(String, LeafContext)>) {
        self.items.push(MemoryItem {
            id: id.to_string(),
            name: name.to_string(),
            language: None,
            leaves: leaves
                .into_iter()
                .map(|(text, context)| MemoryLeaf {
                    text,
                    context,
                    emphasized: false,
                })
                .collect(),
        });
    }

    /// Build a single-item document from plain text, one paragraph-context
    /// leaf per double-newline separated block
    pub fn from_text(id: &str, name: &str, text: &str) -> Self {
        let leaves = text
            .split("\n\n")
            .filter(|block| !block.trim().is_empty())
            .map(|block| (block.to_string(), LeafContext::Paragraph))
            .collect();
        let mut doc = Self::new();
        doc.add_item(id, name, leaves);
        doc
    }

    /// Current text of a leaf (for assertions)
    pub fn leaf_text(&self, item_id: &str, leaf_index: usize) -> Option<&str> {
        self.item(item_id)
            .ok()?
            .leaves
            .get(leaf_index)
            .map(|leaf| leaf.text.as_str())
    }

    /// Whether a leaf ended up wrapped in emphasis
    pub fn leaf_emphasized(&self, item_id: &str, leaf_index: usize) -> Option<bool> {
        self.item(item_id)
            .ok()?
            .leaves
            .get(leaf_index)
            .map(|leaf| leaf.emphasized)
    }

    /// Declared language of an item
    pub fn language(&self, item_id: &str) -> Option<&str> {
        self.item(item_id).ok()?.language.as_deref()
    }

    fn item(&self, item_id: &str) -> Result<&MemoryItem> {
        self.items
            .iter()
            .find(|item| item.id == item_id)
            .ok_or_else(|| anyhow!("Unknown item: {}", item_id))
    }

    fn item_mut(&mut self, item_id: &str) -> Result<&mut MemoryItem> {
        self.items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| anyhow!("Unknown item: {}", item_id))
    }
}

impl DocumentModel for MemoryDocument {
    fn items(&self) -> Vec<ItemInfo> {
        self.items
            .iter()
            .map(|item| ItemInfo {
                id: item.id.clone(),
                name: item.name.clone(),
            })
            .collect()
    }

    fn extract_leaves(&self, item_id: &str) -> Result<Vec<TextLeaf>> {
        let item = self.item(item_id)?;
        Ok(item
            .leaves
            .iter()
            .enumerate()
            .map(|(index, leaf)| TextLeaf {
                index,
                text: leaf.text.clone(),
                context: leaf.context,
            })
            .collect())
    }

    fn replace_leaf(
        &mut self,
        item_id: &str,
        leaf_index: usize,
        replacement: Replacement,
    ) -> Result<()> {
        let item = self.item_mut(item_id)?;
        let leaf = item
            .leaves
            .get_mut(leaf_index)
            .ok_or_else(|| anyhow!("Leaf index {} out of range in item {}", leaf_index, item_id))?;

        match replacement {
            Replacement::Plain(text) => {
                leaf.text = text;
            }
            Replacement::Emphasized(text) => {
                leaf.text = text;
                leaf.emphasized = true;
            }
        }
        Ok(())
    }

    fn set_language(&mut self, item_id: &str, code: &str) -> Result<()> {
        self.item_mut(item_id)?.language = Some(code.to_string());
        Ok(())
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        let bytes = serde_json::to_vec_pretty(&self.items)?;
        Ok(bytes)
    }
}
