/*!
 * Chunk batching for translation requests.
 *
 * Groups an ordered list of text segments into size-bounded batches joined
 * by a reserved delimiter, and splits a translated batch back into
 * per-segment results. Packing is greedy: minimal chunk count under the
 * greedy policy, not optimal bin-packing.
 */

use log::warn;

/// Reserved delimiter joining segments within a chunk. Must never occur in
/// segment text; [`chunk`] sanitizes segments that contain it.
pub const TEXT_DELIMITER: &str = "|||---|||";

/// One size-bounded batch of segments, ready for submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Delimiter-joined segment text
    pub text: String,
    /// Number of segments joined into `text`
    pub segment_count: usize,
}

impl Chunk {
    /// Character length of the serialized chunk
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Group `segments` into delimiter-joined chunks of at most `max_chars`
/// characters each.
///
/// Guarantees: segment order is preserved, every segment lands in exactly
/// one chunk, and appending accounts for the delimiter's length. A single
/// segment longer than `max_chars` starts its own chunk and is clipped to
/// the budget rather than looping forever.
pub fn chunk(segments: &[String], max_chars: usize) -> Vec<Chunk> {
    if segments.is_empty() {
        return Vec::new();
    }

    let delimiter_len = TEXT_DELIMITER.chars().count();
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = 0usize;

    for segment in segments {
        let text = sanitize(segment);
        let text_len = text.chars().count();

        if !current.is_empty() && current_len + text_len + delimiter_len > max_chars {
            chunks.push(finish(std::mem::take(&mut current)));
            current_len = 0;
        }

        if current.is_empty() && text_len > max_chars {
            // Oversized segment: clip instead of looping forever
            warn!(
                "Segment of {} chars exceeds chunk budget of {}, clipping",
                text_len, max_chars
            );
            chunks.push(Chunk {
                text: clip_chars(&text, max_chars),
                segment_count: 1,
            });
            continue;
        }

        current_len += text_len + delimiter_len;
        current.push(text);
    }

    if !current.is_empty() {
        chunks.push(finish(current));
    }

    chunks
}

/// Split a translated chunk back into per-segment results.
///
/// The caller is responsible for the alignment contract: the result count
/// must equal the segment count submitted for that chunk. A dropped, merged
/// or duplicated delimiter in the service output shows up there as a
/// recoverable alignment failure, never as a panic here.
pub fn split(translated_chunk: &str) -> Vec<String> {
    translated_chunk
        .split(TEXT_DELIMITER)
        .map(|s| s.trim().to_string())
        .collect()
}

fn finish(segments: Vec<String>) -> Chunk {
    let segment_count = segments.len();
    Chunk {
        text: segments.join(TEXT_DELIMITER),
        segment_count,
    }
}

fn sanitize(segment: &str) -> String {
    if segment.contains(TEXT_DELIMITER) {
        warn!("Segment contains the reserved delimiter, replacing with a space");
        segment.replace(TEXT_DELIMITER, " ")
    } else {
        segment.to_string()
    }
}

fn clip_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_pos, _)) => text[..byte_pos].to_string(),
        None => text.to_string(),
    }
}
