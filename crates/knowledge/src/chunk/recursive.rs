//! Recursive separator splitting with greedy merge.
//!
//! The text is cut at the coarsest separator first. Pieces that still exceed
//! the target size are cut again with the next finer separator. Pieces that
//! fit are merged greedily into chunks, carrying whole trailing pieces over
//! as overlap. Every piece keeps its separator attached, so the pieces of a
//! segment concatenate back to the segment exactly.

use super::ChunkConfig;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use unicode_segmentation::UnicodeSegmentation;

/// Separator hierarchy, coarsest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Separator {
    Paragraph,
    Line,
    Sentence,
    Whitespace,
    Grapheme,
}

impl Separator {
    fn finer(self) -> Option<Separator> {
        match self {
            Separator::Paragraph => Some(Separator::Line),
            Separator::Line => Some(Separator::Sentence),
            Separator::Sentence => Some(Separator::Whitespace),
            Separator::Whitespace => Some(Separator::Grapheme),
            Separator::Grapheme => None,
        }
    }

    /// Contiguous byte ranges of `text`, each ending with its separator.
    fn pieces(self, text: &str) -> Vec<(usize, usize)> {
        let ends: Vec<usize> = match self {
            Separator::Paragraph => text.match_indices("\n\n").map(|(i, m)| i + m.len()).collect(),
            Separator::Line => text.match_indices('\n').map(|(i, _)| i + 1).collect(),
            Separator::Sentence => sentence_ends(text),
            Separator::Whitespace => whitespace_ends(text),
            Separator::Grapheme => text
                .grapheme_indices(true)
                .map(|(i, g)| i + g.len())
                .collect(),
        };

        let mut pieces = Vec::with_capacity(ends.len() + 1);
        let mut start = 0;
        for end in ends.into_iter().chain(std::iter::once(text.len())) {
            if end > start {
                pieces.push((start, end));
                start = end;
            }
        }
        pieces
    }
}

/// Split after `.`, `!` or `?` plus the single whitespace character that follows.
fn sentence_ends(text: &str) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(i, next)) = chars.peek() {
                if next.is_whitespace() {
                    ends.push(i + next.len_utf8());
                    chars.next();
                }
            }
        }
    }
    ends
}

/// Split after each run of whitespace.
fn whitespace_ends(text: &str) -> Vec<usize> {
    let mut ends = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c.is_whitespace() {
            let next_is_space = chars.peek().map(|&(_, n)| n.is_whitespace()).unwrap_or(false);
            if !next_is_space {
                ends.push(i + c.len_utf8());
            }
        }
    }
    ends
}

/// A chunk candidate before it is turned into a `Chunk`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub start: usize,
    pub end: usize,
    pub separator: Separator,
}

pub(crate) struct RecursiveSplitter<'a> {
    config: &'a ChunkConfig,
}

impl<'a> RecursiveSplitter<'a> {
    pub fn new(config: &'a ChunkConfig) -> Self {
        Self { config }
    }

    /// Spans covering `text` in order. Consecutive spans may overlap.
    pub fn split(&self, text: &str) -> Vec<Span> {
        if text.is_empty() {
            return Vec::new();
        }

        if self.config.measure(text) <= self.config.chunk_size {
            return vec![Span {
                start: 0,
                end: text.len(),
                separator: Separator::Paragraph,
            }];
        }

        let mut spans = Vec::new();
        self.split_range(text, 0, text.len(), Separator::Paragraph, &mut spans);
        spans
    }

    fn split_range(
        &self,
        text: &str,
        start: usize,
        end: usize,
        separator: Separator,
        out: &mut Vec<Span>,
    ) {
        let mut fitting: Vec<(usize, usize)> = Vec::new();

        for (piece_start, piece_end) in separator.pieces(&text[start..end]) {
            let (s, e) = (start + piece_start, start + piece_end);

            if self.config.measure(&text[s..e]) <= self.config.chunk_size {
                fitting.push((s, e));
                continue;
            }

            if !fitting.is_empty() {
                self.merge(text, &fitting, separator, out);
                fitting.clear();
            }

            match separator.finer() {
                Some(finer) => self.split_range(text, s, e, finer, out),
                // A single grapheme wider than the target; keep it whole
                None => out.push(Span {
                    start: s,
                    end: e,
                    separator,
                }),
            }
        }

        if !fitting.is_empty() {
            self.merge(text, &fitting, separator, out);
        }
    }

    fn merge(&self, text: &str, pieces: &[(usize, usize)], separator: Separator, out: &mut Vec<Span>) {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut window: VecDeque<(usize, usize, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &(s, e) in pieces {
            let len = self.config.measure(&text[s..e]);

            if total + len > size {
                if let (Some(first), Some(last)) = (window.front(), window.back()) {
                    out.push(Span {
                        start: first.0,
                        end: last.1,
                        separator,
                    });
                }

                while total > overlap || (total + len > size && total > 0) {
                    match window.pop_front() {
                        Some((_, _, l)) => total -= l,
                        None => break,
                    }
                }
            }

            window.push_back((s, e, len));
            total += len;
        }

        if let (Some(first), Some(last)) = (window.front(), window.back()) {
            out.push(Span {
                start: first.0,
                end: last.1,
                separator,
            });
        }
    }
}
