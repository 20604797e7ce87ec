/*!
 * Translation orchestrator.
 *
 * Drives a whole document through the pipeline: filter and order content
 * items, extract and normalize their text leaves, diff against the
 * checkpoint store, batch what is missing, translate batch by batch with
 * immediate persistence, then reconstruct each item in place.
 *
 * The run is resumable at line granularity: killing the process mid-item
 * loses at most the chunk currently in flight.
 */

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::Config;
use crate::checkpoint::{line_key, CheckpointStore, LineRecord};
use crate::chunker;
use crate::client::{CancelToken, RequestOutcome, ResilientClient};
use crate::document::{is_excluded, DocumentModel, LeafContext, Replacement};
use crate::errors::{PipelineError, RequestError};
use crate::language_utils::normalize_to_part1;
use crate::session::TranslationSession;
use crate::whitespace::{self, WhitespaceInfo};

/// How a pipeline run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every item was processed (some possibly degraded)
    Completed,
    /// The caller's cancellation signal was observed; checkpoints intact
    StoppedByUser,
    /// A terminal condition halted the run
    Failed(String),
}

/// Classifier deciding whether a translated line reads as dialogue.
/// A heuristic, so it stays replaceable without touching persistence or
/// reconstruction.
pub type DialoguePredicate = fn(&str) -> bool;

/// Pipeline behavior knobs, derived from the application configuration
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Target language (name or code); normalized per run
    pub target_language: String,
    /// Upper bound on the character length of one translation batch
    pub max_chars_per_chunk: usize,
    /// Items whose name contains any of these keywords are skipped
    pub excluded_keywords: Vec<String>,
    /// Literal substrings stripped from service output before splitting
    pub strip_patterns: Vec<String>,
    /// Dialogue classifier applied to each translated line
    pub dialogue: DialoguePredicate,
}

impl From<&Config> for PipelineOptions {
    fn from(config: &Config) -> Self {
        Self {
            target_language: config.target_language.clone(),
            max_chars_per_chunk: config.max_chars_per_chunk,
            excluded_keywords: config.excluded_keywords.clone(),
            strip_patterns: config.strip_patterns.clone(),
            dialogue: is_dialogue,
        }
    }
}

/// One extracted segment awaiting translation or reconstruction
struct Segment {
    /// Index of the leaf within the document item
    leaf_index: usize,
    /// Parent element context of the leaf
    context: LeafContext,
    /// Whitespace recipe; `normalized` is what gets translated
    info: WhitespaceInfo,
}

/// Coordinates the client, the checkpoint store and a document backend
pub struct Orchestrator {
    client: ResilientClient,
    store: CheckpointStore,
    options: PipelineOptions,
}

impl Orchestrator {
    /// Build an orchestrator from the application configuration and a
    /// session backend
    pub fn from_config(config: &Config, session: Arc<dyn TranslationSession>) -> Result<Self> {
        let client = ResilientClient::new(session, config.client.clone());
        let store = CheckpointStore::open(&config.checkpoint_db)?;
        Ok(Self::new(client, store, PipelineOptions::from(config)))
    }

    /// Build an orchestrator from already-constructed parts
    pub fn new(client: ResilientClient, store: CheckpointStore, options: PipelineOptions) -> Self {
        Self { client, store, options }
    }

    /// Translate a whole document, writing the result to `output_path`.
    ///
    /// Progress is reported after each item, whether skipped, degraded or
    /// freshly translated. Returns `Err` only for infrastructure faults
    /// (document backend or filesystem); service-side terminal conditions
    /// come back as [`RunOutcome::Failed`].
    pub async fn translate_document<D, F>(
        &self,
        document: &mut D,
        output_path: &Path,
        progress: F,
        cancel: &CancelToken,
    ) -> Result<RunOutcome>
    where
        D: DocumentModel,
        F: Fn(f64),
    {
        let target_code = normalize_to_part1(&self.options.target_language)?;
        let run_key = CheckpointStore::run_key_for(output_path);

        let items: Vec<_> = document
            .items()
            .into_iter()
            .filter(|item| {
                if is_excluded(&item.name, &self.options.excluded_keywords) {
                    info!("Skipping excluded item: {}", item.name);
                    false
                } else {
                    true
                }
            })
            .collect();

        if items.is_empty() {
            return Ok(RunOutcome::Failed(
                "document contains no translatable content items".to_string(),
            ));
        }

        info!(
            "Translating {} items to '{}' (run key {})",
            items.len(),
            target_code,
            run_key
        );

        let total = items.len();
        for (index, item) in items.iter().enumerate() {
            if cancel.is_cancelled() {
                info!("Stop signal detected, halting run");
                return Ok(RunOutcome::StoppedByUser);
            }

            info!("Processing item {}/{}: {}", index + 1, total, item.name);

            let checkpoint = self.store.load_item(&run_key, &item.id).await;
            if checkpoint.completed {
                info!("Item {} already completed, skipping", item.name);
                progress((index + 1) as f64 / total as f64 * 100.0);
                continue;
            }

            let segments = extract_segments(document, &item.id)?;
            if segments.is_empty() {
                debug!("Item {} has no translatable text", item.name);
                self.mark_completed(&run_key, &item.id).await;
                progress((index + 1) as f64 / total as f64 * 100.0);
                continue;
            }

            let missing: Vec<usize> = (0..segments.len())
                .filter(|i| !checkpoint.lines.contains_key(&line_key(*i)))
                .collect();

            let mut aligned = true;
            if !missing.is_empty() {
                info!(
                    "Found {} untranslated segments out of {}",
                    missing.len(),
                    segments.len()
                );
                match self
                    .translate_missing(&run_key, &item.id, &segments, &missing, cancel)
                    .await?
                {
                    ChunkLoopResult::Done => {}
                    ChunkLoopResult::Misaligned => aligned = false,
                    ChunkLoopResult::Halted(outcome) => return Ok(outcome),
                }
            }

            if aligned {
                self.reconstruct_item(document, &run_key, &item.id, &segments, &target_code)
                    .await?;
                self.write_partial(document, output_path)?;
                self.mark_completed(&run_key, &item.id).await;
            } else {
                warn!(
                    "Item {} left partially translated due to alignment failure",
                    item.name
                );
            }

            progress((index + 1) as f64 / total as f64 * 100.0);
        }

        let bytes = document.serialize().context("Failed to serialize document")?;
        std::fs::write(output_path, bytes)
            .with_context(|| format!("Failed to write output file: {:?}", output_path))?;
        remove_partial(output_path);

        info!("Translation run completed: {:?}", output_path);
        Ok(RunOutcome::Completed)
    }

    /// Translate the missing segments of one item chunk by chunk,
    /// persisting each line as soon as its chunk comes back.
    async fn translate_missing(
        &self,
        run_key: &str,
        item_id: &str,
        segments: &[Segment],
        missing: &[usize],
        cancel: &CancelToken,
    ) -> Result<ChunkLoopResult> {
        let texts: Vec<String> = missing
            .iter()
            .map(|&i| segments[i].info.normalized.clone())
            .collect();
        let chunks = chunker::chunk(&texts, self.options.max_chars_per_chunk);

        let mut cursor = 0usize;
        for (chunk_index, chunk) in chunks.iter().enumerate() {
            if cancel.is_cancelled() {
                info!("Stop signal detected between chunks, halting run");
                return Ok(ChunkLoopResult::Halted(RunOutcome::StoppedByUser));
            }

            info!(
                "Translating chunk {}/{} ({} segments, {} chars)",
                chunk_index + 1,
                chunks.len(),
                chunk.segment_count,
                chunk.char_len()
            );

            let translated = match self.client.translate(&chunk.text, cancel).await {
                RequestOutcome::Success(text) => self.strip_patterns(&text),
                RequestOutcome::Cancelled => {
                    return Ok(ChunkLoopResult::Halted(RunOutcome::StoppedByUser));
                }
                RequestOutcome::QuotaExceeded => {
                    error!("Usage quota exhausted, halting run; progress is checkpointed");
                    return Ok(ChunkLoopResult::Halted(RunOutcome::Failed(
                        "translation service usage quota exhausted".to_string(),
                    )));
                }
                RequestOutcome::Failed(RequestError::AuthenticationTimeout(secs)) => {
                    return Ok(ChunkLoopResult::Halted(RunOutcome::Failed(format!(
                        "session was not authenticated within {}s",
                        secs
                    ))));
                }
                RequestOutcome::Failed(RequestError::Exhausted(reason)) => {
                    warn!(
                        "Chunk {} failed after all retries ({}), keeping source text",
                        chunk_index + 1,
                        reason
                    );
                    chunk.text.clone()
                }
            };

            let pieces = chunker::split(&translated);
            if pieces.len() != chunk.segment_count {
                error!(
                    "CRITICAL: {}",
                    PipelineError::Alignment {
                        item_id: item_id.to_string(),
                        expected: chunk.segment_count,
                        actual: pieces.len(),
                    }
                );
                return Ok(ChunkLoopResult::Misaligned);
            }

            for piece in pieces {
                let segment_index = missing[cursor];
                cursor += 1;
                let record = LineRecord {
                    is_dialogue: (self.options.dialogue)(&piece),
                    text: piece,
                };
                if let Err(e) = self
                    .store
                    .save_line(run_key, item_id, &line_key(segment_index), &record)
                    .await
                {
                    // Persistence faults cost resumability, not the translation
                    warn!("{}", PipelineError::Persistence(e.to_string()));
                }
            }
        }

        Ok(ChunkLoopResult::Done)
    }

    /// Write translated lines back into the document item
    async fn reconstruct_item<D: DocumentModel>(
        &self,
        document: &mut D,
        run_key: &str,
        item_id: &str,
        segments: &[Segment],
        target_code: &str,
    ) -> Result<()> {
        let checkpoint = self.store.load_item(run_key, item_id).await;

        for (segment_index, segment) in segments.iter().enumerate() {
            let record = match checkpoint.lines.get(&line_key(segment_index)) {
                Some(record) => record,
                None => {
                    warn!(
                        "No checkpoint record for segment {} of {}, keeping original text",
                        segment_index, item_id
                    );
                    continue;
                }
            };

            let text = compose_leaf_text(&record.text, &segment.info);
            let replacement = match segment.context {
                LeafContext::Paragraph if record.is_dialogue => Replacement::Emphasized(text),
                _ => Replacement::Plain(text),
            };

            if let Err(e) = document.replace_leaf(item_id, segment.leaf_index, replacement) {
                // The original-language leaf stays in place
                warn!(
                    "{}",
                    PipelineError::Reconstruction {
                        leaf_index: segment.leaf_index,
                        message: e.to_string(),
                    }
                );
            }
        }

        document
            .set_language(item_id, target_code)
            .with_context(|| format!("Failed to set language on item {}", item_id))?;
        Ok(())
    }

    /// Remove configured service footer substrings from a translated chunk
    fn strip_patterns(&self, text: &str) -> String {
        let mut out = text.to_string();
        for pattern in &self.options.strip_patterns {
            if out.contains(pattern.as_str()) {
                debug!("Stripping service footer from translated chunk");
                out = out.replace(pattern.as_str(), "");
            }
        }
        out
    }

    async fn mark_completed(&self, run_key: &str, item_id: &str) {
        if let Err(e) = self.store.set_completed(run_key, item_id).await {
            warn!("Failed to mark item {} completed: {}", item_id, e);
        }
    }

    /// Persist an intermediate snapshot so a crash after this point loses
    /// no reconstructed item
    fn write_partial<D: DocumentModel>(&self, document: &D, output_path: &Path) -> Result<()> {
        let bytes = document.serialize().context("Failed to serialize document")?;
        let path = partial_path(output_path);
        std::fs::write(&path, bytes)
            .with_context(|| format!("Failed to write intermediate file: {:?}", path))?;
        Ok(())
    }
}

enum ChunkLoopResult {
    /// Every chunk translated and persisted
    Done,
    /// A chunk came back with the wrong segment count; item abandoned
    Misaligned,
    /// A terminal condition ends the whole run
    Halted(RunOutcome),
}

/// Extract the translatable segments of an item, in document order.
///
/// Whitespace-only leaves are dropped here, so segment positions (and the
/// line keys derived from them) index the filtered list.
fn extract_segments<D: DocumentModel>(document: &D, item_id: &str) -> Result<Vec<Segment>> {
    let leaves = document
        .extract_leaves(item_id)
        .with_context(|| format!("Failed to extract text from item {}", item_id))?;

    Ok(leaves
        .into_iter()
        .filter_map(|leaf| {
            let info = whitespace::describe(&leaf.text);
            if info.normalized.is_empty() {
                None
            } else {
                Some(Segment {
                    leaf_index: leaf.index,
                    context: leaf.context,
                    info,
                })
            }
        })
        .collect())
}

/// Default dialogue classifier: a leading quotation mark after trimming
pub fn is_dialogue(text: &str) -> bool {
    matches!(
        text.trim_start().chars().next(),
        Some('"') | Some('\u{201c}') | Some('\u{2018}')
    )
}

/// Apply the whitespace recipe to a translated line.
///
/// Leaves with recorded internal breaks go through full reconstruction;
/// plain leaves just get a single leading/trailing space where the original
/// had surrounding whitespace.
fn compose_leaf_text(translated: &str, info: &WhitespaceInfo) -> String {
    if !info.breaks.is_empty() {
        return whitespace::reconstruct(translated, info);
    }
    let lead = if info.leading.is_empty() { "" } else { " " };
    let trail = if info.trailing.is_empty() { "" } else { " " };
    format!("{}{}{}", lead, translated, trail)
}

fn partial_path(output_path: &Path) -> PathBuf {
    let mut os: OsString = output_path.as_os_str().to_owned();
    os.push(".partial");
    PathBuf::from(os)
}

fn remove_partial(output_path: &Path) {
    let path = partial_path(output_path);
    if path.exists() {
        if let Err(e) = std::fs::remove_file(&path) {
            debug!("Could not remove intermediate file {:?}: {}", path, e);
        }
    }
}
