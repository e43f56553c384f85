//! Sliding-window chunking of document text into retrieval units.
//!
//! Windows are a fixed number of characters long and overlap by a fixed amount.
//! A window that stops short of the end of the text is pulled back to its last
//! line break when that break lies past the window's midpoint, so excerpts tend
//! to end on a line boundary instead of mid-sentence.

use serde::{Deserialize, Serialize};

/// A chunk of document text used as a retrieval unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position of this chunk in the document, starting at 0.
    pub id: usize,
    /// Trimmed chunk text.
    pub text: String,
    /// Character offset of the first character of `text` in the source.
    pub start_offset: usize,
    /// Character offset one past the last character of `text` in the source.
    pub end_offset: usize,
}

impl Chunk {
    /// Length of the chunk in characters.
    pub fn char_len(&self) -> usize {
        self.end_offset - self.start_offset
    }
}

/// Configuration for chunking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Window size in characters.
    pub size: usize,
    /// Characters shared between consecutive windows.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: 1000,
            overlap: 200,
        }
    }
}

impl From<&crate::config::RetrievalSettings> for ChunkingConfig {
    fn from(settings: &crate::config::RetrievalSettings) -> Self {
        Self {
            size: settings.chunk_size,
            overlap: settings.chunk_overlap,
        }
    }
}

/// Split text into overlapping chunks.
///
/// Blank input yields no chunks. Chunks come out in left-to-right order and the
/// result is a pure function of `text` and `config`.
pub fn chunk_text(text: &str, config: ChunkingConfig) -> Vec<Chunk> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let size = config.size.max(1);
    let mut chunks = Vec::new();

    if text.trim().is_empty() {
        return chunks;
    }

    let mut start = 0;
    loop {
        let mut end = (start + size).min(len);

        if end < len {
            let midpoint = start + size / 2;
            if let Some(offset) = chars[start..end].iter().rposition(|&c| c == '\n') {
                let line_break = start + offset;
                if line_break > midpoint {
                    end = line_break;
                }
            }
        }

        if let Some(chunk) = trimmed_piece(&chars, start, end, chunks.len()) {
            chunks.push(chunk);
        }

        if end >= len {
            break;
        }

        let next = end.saturating_sub(config.overlap);
        start = if next > start { next } else { end };
    }

    chunks
}

fn trimmed_piece(chars: &[char], start: usize, end: usize, id: usize) -> Option<Chunk> {
    let window = &chars[start..end];
    let first = window.iter().position(|c| !c.is_whitespace())?;
    let last = window.iter().rposition(|c| !c.is_whitespace())?;

    Some(Chunk {
        id,
        text: window[first..=last].iter().collect(),
        start_offset: start + first,
        end_offset: start + last + 1,
    })
}
