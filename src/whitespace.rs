/*!
 * Whitespace codec: reversible mapping between raw text and a normalized
 * form plus a reinsertion recipe.
 *
 * Text leaves are normalized before being sent to the translation service
 * (collapsed whitespace translates better and packs tighter into chunks),
 * and the descriptor produced here carries everything needed to re-apply
 * the original spacing to the translated text afterwards.
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

static BREAK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n|\n").expect("break regex"));
static MULTI_SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").expect("space regex"));
static WS_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static SENTENCE_END_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]\s+").expect("sentence regex"));

/// Number of sentences grouped per paragraph when the source had no
/// paragraph breaks to guide reconstruction
const FALLBACK_SENTENCES_PER_PARAGRAPH: usize = 5;

/// Kind of an internal break recorded by [`describe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakKind {
    /// Blank line (one or more newlines with only whitespace between)
    Paragraph,
    /// Single newline
    Line,
}

/// One internal break, positioned in the normalized-walk coordinate space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakInfo {
    /// Character position the break occupies
    pub position: usize,
    /// Paragraph or line break
    pub kind: BreakKind,
}

/// Reinsertion recipe for one text leaf. Derived, ephemeral, recomputed per
/// segment; never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhitespaceInfo {
    /// Character length of the original text
    pub original_length: usize,
    /// Trimmed text with every internal whitespace run collapsed to a space
    pub normalized: String,
    /// Ordered internal breaks
    pub breaks: Vec<BreakInfo>,
    /// Whether any paragraph break was recorded
    pub has_paragraphs: bool,
    /// Leading whitespace of the original text
    pub leading: String,
    /// Trailing whitespace of the original text
    pub trailing: String,
    /// Runs of two or more interior spaces, as (character offset, run)
    pub extra_spaces: Vec<(usize, String)>,
}

/// Describe the whitespace structure of `text`. Never fails; empty input
/// yields a zeroed descriptor.
pub fn describe(text: &str) -> WhitespaceInfo {
    if text.is_empty() {
        debug!("Empty input text, returning default whitespace info");
        return WhitespaceInfo::default();
    }

    let leading: String = text.chars().take_while(|c| c.is_whitespace()).collect();
    let trailing: String = if leading.chars().count() == text.chars().count() {
        // All-whitespace input: leading already captured everything
        leading.clone()
    } else {
        text.chars()
            .rev()
            .take_while(|c| c.is_whitespace())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect()
    };

    let extra_spaces: Vec<(usize, String)> = MULTI_SPACE_RE
        .find_iter(text)
        .map(|m| (char_offset(text, m.start()), m.as_str().to_string()))
        .collect();

    let normalized = WS_RUN_RE.replace_all(text.trim(), " ").into_owned();

    let mut breaks = Vec::new();
    let mut current_pos = 0usize;
    let mut last_end = 0usize;

    for m in BREAK_RE.find_iter(text) {
        let segment = &text[last_end..m.start()];
        if !segment.is_empty() {
            current_pos += segment.chars().count();
        }

        // A run containing more than one newline is a blank line
        let kind = if m.as_str().matches('\n').count() > 1 {
            BreakKind::Paragraph
        } else {
            BreakKind::Line
        };
        breaks.push(BreakInfo { position: current_pos, kind });
        current_pos += match kind {
            BreakKind::Paragraph => 2,
            BreakKind::Line => 1,
        };
        last_end = m.end();
    }

    let has_paragraphs = breaks.iter().any(|b| b.kind == BreakKind::Paragraph);

    debug!(
        "Extracted whitespace info: {} breaks ({} paragraph), {} extra space runs, original_length={}",
        breaks.len(),
        breaks.iter().filter(|b| b.kind == BreakKind::Paragraph).count(),
        extra_spaces.len(),
        text.chars().count()
    );

    WhitespaceInfo {
        original_length: text.chars().count(),
        normalized,
        breaks,
        has_paragraphs,
        leading,
        trailing,
        extra_spaces,
    }
}

/// Reconstruct translated text with the whitespace recorded in `info`.
///
/// When the source had no paragraph breaks the translated sentences are
/// regrouped into fixed clusters joined by blank lines. That regrouping is
/// an approximation of the original layout, not a guarantee.
///
/// Never fails outward: any internal inconsistency degrades to
/// leading + translated + trailing with no break reconstruction.
pub fn reconstruct(translated: &str, info: &WhitespaceInfo) -> String {
    if translated.trim().is_empty() {
        debug!("Empty translated text, returning leading/trailing whitespace only");
        return format!("{}{}", info.leading, info.trailing);
    }

    match reconstruct_inner(translated, info) {
        Some(text) => text,
        None => {
            warn!("Whitespace reconstruction fell back to flat output");
            format!("{}{}{}", info.leading, translated, info.trailing)
        }
    }
}

fn reconstruct_inner(translated: &str, info: &WhitespaceInfo) -> Option<String> {
    if !info.has_paragraphs {
        debug!("No paragraph breaks recorded, applying sentence-cluster fallback");
        let sentences = split_sentences(translated);
        let reconstructed = sentences
            .chunks(FALLBACK_SENTENCES_PER_PARAGRAPH)
            .map(|chunk| chunk.join(" "))
            .collect::<Vec<_>>()
            .join("\n\n");
        return Some(format!("{}{}{}", info.leading, reconstructed, info.trailing));
    }

    let segments: Vec<&str> = BREAK_RE
        .split(translated)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        return None;
    }

    let mut breaks = info.breaks.clone();
    breaks.sort_by_key(|b| b.position);

    // Walk the translated segments through the recorded break positions.
    // Translated lengths rarely match the source exactly, so placement is
    // approximate; break count is what must survive.
    let mut result = String::new();
    let mut segment_index = 0usize;
    let mut current_pos = 0usize;

    for brk in &breaks {
        while segment_index < segments.len() && current_pos <= brk.position {
            result.push_str(segments[segment_index]);
            current_pos += segments[segment_index].chars().count();
            segment_index += 1;
        }
        match brk.kind {
            BreakKind::Paragraph => {
                result.push_str("\n\n");
                current_pos += 2;
            }
            BreakKind::Line => {
                result.push('\n');
                current_pos += 1;
            }
        }
    }

    // Trailing unconsumed segments are appended as-is
    while segment_index < segments.len() {
        result.push_str(segments[segment_index]);
        segment_index += 1;
    }

    // Highest offset first so earlier insertions don't shift later offsets
    let mut extra = info.extra_spaces.clone();
    extra.sort_by(|a, b| b.0.cmp(&a.0));
    for (pos, spaces) in extra {
        if pos <= result.chars().count() {
            result = insert_at_char(&result, pos, &spaces);
        }
    }

    Some(format!("{}{}{}", info.leading, result, info.trailing))
}

/// Split text into sentences on sentence-final punctuation followed by
/// whitespace
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut last = 0usize;
    for m in SENTENCE_END_RE.find_iter(text) {
        // Keep the punctuation (first byte of the match) with the sentence
        let end = m.start() + 1;
        let sentence = text[last..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        last = m.end();
    }
    if last < text.len() {
        let rest = text[last..].trim();
        if !rest.is_empty() {
            sentences.push(rest.to_string());
        }
    }
    sentences
}

fn char_offset(text: &str, byte_offset: usize) -> usize {
    text[..byte_offset].chars().count()
}

fn insert_at_char(text: &str, char_pos: usize, insertion: &str) -> String {
    let byte_pos = text
        .char_indices()
        .nth(char_pos)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let mut out = String::with_capacity(text.len() + insertion.len());
    out.push_str(&text[..byte_pos]);
    out.push_str(insertion);
    out.push_str(&text[byte_pos..]);
    out
}
