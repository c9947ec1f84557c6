//! Overlapping, boundary-aware text chunking.
//!
//! Chunks are exact slices of the source text. Sizes are counted in chars.
//! Each chunk ends at the last natural break inside its window (paragraph,
//! line, sentence, then any whitespace) and falls back to a hard cut. The
//! next chunk starts `chunk_overlap` chars before the previous end, snapped
//! forward to a word start, so the shared content is `1..=chunk_overlap` chars.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

const SENTENCE_ENDS: [&str; 6] = [". ", "! ", "? ", ".\n", "!\n", "?\n"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 400, chunk_overlap: 40 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be at least 1".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Byte range of one chunk inside its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    pub fn split(&self, text: &str) -> Vec<Span> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let ChunkingConfig { chunk_size, chunk_overlap } = self.config;
        let mut spans = Vec::new();
        let mut start = 0usize;
        loop {
            let window_end = advance_chars(text, start, chunk_size);
            if window_end >= text.len() {
                spans.push(Span { start, end: text.len() });
                break;
            }
            let end = find_break(&text[start..window_end], chunk_size, chunk_overlap)
                .map_or(window_end, |offset| start + offset);
            spans.push(Span { start, end });
            start = next_start(text, end, chunk_overlap);
        }
        spans
    }

    pub fn chunk_document(&self, doc: &Document) -> Vec<Chunk> {
        self.split(&doc.text)
            .into_iter()
            .enumerate()
            .map(|(index, span)| Chunk {
                doc_id: doc.id.clone(),
                index,
                start: span.start,
                end: span.end,
                text: doc.text[span.start..span.end].to_string(),
            })
            .collect()
    }
}

/// Rebuild the source text from ordered chunks by dropping each chunk's
/// overlap with what came before.
pub fn reconstruct(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    let mut covered = 0usize;
    for chunk in chunks {
        if chunk.end <= covered {
            continue;
        }
        let skip = covered.saturating_sub(chunk.start);
        out.push_str(&chunk.text[skip..]);
        covered = chunk.end;
    }
    out
}

/// Byte index `n` chars after `from`, clamped to the end of `text`.
fn advance_chars(text: &str, from: usize, n: usize) -> usize {
    text[from..].char_indices().nth(n).map_or(text.len(), |(i, _)| from + i)
}

/// Byte index `n` chars before `to` (n >= 1).
fn retreat_chars(text: &str, to: usize, n: usize) -> usize {
    text[..to].char_indices().rev().nth(n.saturating_sub(1)).map_or(0, |(i, _)| i)
}

/// End offset (relative to `window`) of the preferred break, if any.
///
/// The chunk before the break must be longer than `overlap` chars so the
/// following chunk always advances; structural breaks must also leave at
/// least a third of the window.
fn find_break(window: &str, chunk_size: usize, overlap: usize) -> Option<usize> {
    let overlap_floor = advance_chars(window, 0, overlap);
    let floor = overlap_floor.max(advance_chars(window, 0, chunk_size / 3));

    if let Some(pos) = window.rfind("\n\n") {
        if pos + 2 > floor {
            return Some(pos + 2);
        }
    }
    if let Some(pos) = window.rfind('\n') {
        if pos + 1 > floor {
            return Some(pos + 1);
        }
    }
    let sentence = SENTENCE_ENDS
        .iter()
        .filter_map(|p| window.rfind(p).map(|pos| pos + p.len()))
        .max();
    if let Some(end) = sentence {
        if end > floor {
            return Some(end);
        }
    }
    window
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, c)| i + c.len_utf8())
        .filter(|&end| end > overlap_floor)
}

/// Start of the chunk following one that ends at `end`.
fn next_start(text: &str, end: usize, overlap: usize) -> usize {
    if overlap == 0 {
        return end;
    }
    let raw = retreat_chars(text, end, overlap);
    let at_word_start = text[..raw].chars().next_back().map_or(true, char::is_whitespace);
    if at_word_start {
        return raw;
    }
    let mut snapped = None;
    let mut seen_space = false;
    for (i, c) in text[raw..end].char_indices() {
        if c.is_whitespace() {
            seen_space = true;
        } else if seen_space {
            snapped = Some(raw + i);
            break;
        }
    }
    snapped.unwrap_or(raw)
}
