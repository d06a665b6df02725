//! Length-driven reply splitting.
//!
//! Text is cut at sentence boundaries and sentences are packed greedily into
//! chunks of roughly `target_chars` characters. A sentence longer than the
//! target is emitted as its own chunk. Chunks are slices of the original
//! text, so joining them with the whitespace that separated them yields the
//! input back.

const TERMINATORS: &[char] = &['.', '!', '?', '…'];

/// Split `text` into sentence-bounded chunks of about `target_chars` characters.
///
/// Empty or whitespace-only input yields no chunks. `target_chars == 0` is
/// treated as "no splitting".
pub fn split_reply(text: &str, target_chars: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if target_chars == 0 {
        return vec![trimmed.to_string()];
    }

    let sentences = sentence_spans(text);
    let mut chunks = Vec::new();
    let mut current: Option<(usize, usize)> = None;

    for (start, end) in sentences {
        current = match current {
            None => Some((start, end)),
            Some((chunk_start, chunk_end)) => {
                if text[chunk_start..end].chars().count() <= target_chars {
                    Some((chunk_start, end))
                } else {
                    chunks.push(text[chunk_start..chunk_end].to_string());
                    Some((start, end))
                }
            }
        };
    }
    if let Some((start, end)) = current {
        chunks.push(text[start..end].to_string());
    }
    chunks
}

/// Byte ranges of each sentence, surrounding whitespace excluded.
fn sentence_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if start.is_none() {
            if c.is_whitespace() {
                continue;
            }
            start = Some(i);
        }
        if TERMINATORS.contains(&c) {
            // A run of terminators ("?!", "...") ends the sentence only
            // when followed by whitespace or the end of the text.
            let boundary = match chars.peek() {
                None => true,
                Some((_, next)) => next.is_whitespace(),
            };
            if boundary {
                if let Some(s) = start.take() {
                    spans.push((s, i + c.len_utf8()));
                }
            }
        }
    }
    if let Some(s) = start {
        let end = text.trim_end().len();
        if end > s {
            spans.push((s, end));
        }
    }
    spans
}

/// Cut `text` into pieces of at most `limit` characters, on char boundaries.
pub fn hard_cut(text: &str, limit: usize) -> Vec<String> {
    if limit == 0 || text.chars().count() <= limit {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(limit)
        .map(|piece| piece.iter().collect())
        .collect()
}
