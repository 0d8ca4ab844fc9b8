//! Overlapping token-window chunking.
//!
//! A token is a maximal run of non-whitespace characters. Each chunk is the
//! slice of the original body spanning its tokens, so inner whitespace is
//! preserved.

use crate::error::{IngestError, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 512;
pub const DEFAULT_CHUNK_OVERLAP: usize = 24;

/// Splits text into windows of `size` tokens sharing `overlap` tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl Chunker {
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 || overlap >= size {
            return Err(IngestError::InvalidChunking { size, overlap });
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunks of `body`, in order. A clone of the returned iterator replays
    /// the remaining sequence independently.
    pub fn chunks<'a>(&self, body: &'a str) -> Chunks<'a> {
        Chunks {
            body,
            spans: token_spans(body),
            next_token: 0,
            size: self.size,
            step: self.size - self.overlap,
        }
    }
}

/// Iterator over chunk texts produced by [`Chunker::chunks`].
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    body: &'a str,
    spans: Vec<(usize, usize)>,
    next_token: usize,
    size: usize,
    step: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next_token;
        if start >= self.spans.len() {
            return None;
        }

        let end = (start + self.size).min(self.spans.len());
        let text = &self.body[self.spans[start].0..self.spans[end - 1].1];

        self.next_token = if end == self.spans.len() {
            end
        } else {
            start + self.step
        };
        Some(text)
    }
}

/// Byte ranges of every whitespace-delimited token.
fn token_spans(body: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in body.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                spans.push((s, i));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        spans.push((s, body.len()));
    }
    spans
}
