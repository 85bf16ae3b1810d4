use std::collections::VecDeque;
use std::ops::Range;

/// Default chunk size, in words.
pub const DEFAULT_CHUNK_SIZE: usize = 650;
/// Default overlap between consecutive chunks, in words.
pub const DEFAULT_CHUNK_OVERLAP: usize = 120;

/// Sentence-aware chunking parameters. Sizes are counted in whitespace-separated words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Split cleaned page text into overlapping chunks of whole sentences.
///
/// Sentences are packed greedily up to `chunk_size` words. Each new chunk
/// starts with the trailing sentences of the previous one, as many as fit in
/// `overlap` words. A sentence longer than `chunk_size` is cut on word
/// boundaries.
pub fn chunk_text(text: &str, config: &ChunkConfig) -> Vec<String> {
    let size = config.chunk_size.max(1);
    let words: Vec<&str> = text.split_whitespace().collect();

    let mut chunks = Vec::new();
    let mut current: VecDeque<Range<usize>> = VecDeque::new();
    let mut current_words = 0;
    // Whether `current` holds a unit not yet emitted.
    let mut fresh = false;

    for unit in sentence_units(&words, size) {
        if current_words + unit.len() > size && !current.is_empty() {
            if fresh {
                chunks.push(join(&words, &current));
            }

            let mut carry_words = 0;
            let keep = current
                .iter()
                .rev()
                .take_while(|u| {
                    carry_words += u.len();
                    carry_words <= config.overlap
                })
                .count();
            current.drain(..current.len() - keep);
            current_words = current.iter().map(|u| u.len()).sum();
            fresh = false;

            while current_words + unit.len() > size {
                match current.pop_front() {
                    Some(dropped) => current_words -= dropped.len(),
                    None => break,
                }
            }
        }

        current_words += unit.len();
        current.push_back(unit);
        fresh = true;
    }

    if fresh {
        chunks.push(join(&words, &current));
    }
    chunks
}

/// Word ranges of each sentence, with over-long sentences cut into `size`-word pieces.
fn sentence_units(words: &[&str], size: usize) -> Vec<Range<usize>> {
    let mut units = Vec::new();
    let mut start = 0;

    for (i, word) in words.iter().enumerate() {
        if ends_sentence(word) || i + 1 == words.len() {
            let end = i + 1;
            let mut piece = start;
            while piece < end {
                let piece_end = (piece + size).min(end);
                units.push(piece..piece_end);
                piece = piece_end;
            }
            start = end;
        }
    }
    units
}

fn ends_sentence(word: &str) -> bool {
    word.trim_end_matches(['"', '\'', ')', ']', '\u{201D}', '\u{2019}'])
        .ends_with(['.', '!', '?'])
}

fn join(words: &[&str], units: &VecDeque<Range<usize>>) -> String {
    units
        .iter()
        .flat_map(|u| words[u.clone()].iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}
