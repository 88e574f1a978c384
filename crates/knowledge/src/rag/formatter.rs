//! Response formatter: turns a routing decision and model output into the
//! user-facing answer with source references.

use super::fallback::FallbackPicker;
use super::types::{
    FormattedResponse, RouteReason, RoutingDecision, SourceRef, Strategy, VerdictKind,
};
use crate::chunk::Chunk;
use crate::types::RetrievedChunk;
use grounded_core::{AppResult, FallbackSelection, RagSettings};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

static SPACE_BEFORE_PUNCT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[ \t]+([.,!?;:])").ok());
static MISSING_SPACE_AFTER_SENTENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"([a-z][.!?])([A-Z])").ok());
static MISSING_SPACE_AFTER_COMMA: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r",([A-Za-z])").ok());
static LONG_ELLIPSIS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\.{3,}").ok());
static BULLET: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[-*•]\s+").ok());

#[derive(Debug)]
pub struct ResponseFormatter {
    snippet_length: usize,
    max_sources: usize,
    frame_answers: bool,
    fallback: FallbackPicker,
}

impl ResponseFormatter {
    pub fn new(
        snippet_length: usize,
        max_sources: usize,
        templates: &BTreeMap<String, String>,
        selection: FallbackSelection,
    ) -> AppResult<Self> {
        Ok(Self {
            snippet_length,
            max_sources,
            frame_answers: false,
            fallback: FallbackPicker::new(templates, selection)?,
        })
    }

    pub fn from_settings(settings: &RagSettings) -> AppResult<Self> {
        Ok(Self::new(
            settings.snippet_length,
            settings.max_sources,
            &settings.fallback_templates,
            settings.fallback_selection,
        )?
        .with_framing(settings.frame_answers))
    }

    /// Wrap document answers in a lead-in and a closing line.
    pub fn with_framing(mut self, frame_answers: bool) -> Self {
        self.frame_answers = frame_answers;
        self
    }

    pub fn fallback(&self) -> &FallbackPicker {
        &self.fallback
    }

    /// Build the final response.
    ///
    /// `generated` is `None` when generation was skipped or failed; any
    /// route that needed model output then answers with a fallback. Model
    /// text is tidied before it is returned.
    pub fn format(&self, decision: &RoutingDecision, generated: Option<&str>) -> FormattedResponse {
        let max_score = decision.verdict.best_candidate_score().unwrap_or(0.0);
        let generated = generated
            .map(clean_answer)
            .filter(|text| !text.is_empty());

        let body = match generated {
            Some(text) if !decision.requires_fallback() => text,
            _ => {
                return self.fallback_response(decision, max_score);
            }
        };

        let cites_documents = matches!(decision.strategy, Strategy::RagOnly | Strategy::Hybrid)
            && !decision.context.is_empty();

        let (answer, sources) = if cites_documents {
            (self.frame(&decision.query, decision.strategy, body), self.map_sources(&decision.context))
        } else {
            (body, Vec::new())
        };

        FormattedResponse {
            answer,
            sources,
            grounded: cites_documents,
            strategy: decision.strategy,
            verdict: decision.verdict.kind,
            max_score,
        }
    }

    /// Reply to an empty or whitespace-only query.
    pub fn empty_query_response(&self) -> FormattedResponse {
        FormattedResponse {
            answer: self.fallback.empty_query_reply(),
            sources: Vec::new(),
            grounded: false,
            strategy: Strategy::BaseModelOnly,
            verdict: VerdictKind::Rejected,
            max_score: 0.0,
        }
    }

    fn frame(&self, query: &str, strategy: Strategy, body: String) -> String {
        if !self.frame_answers {
            return body;
        }
        format!(
            "{}\n\n{}\n\n{}",
            self.fallback.answer_lead(query, strategy == Strategy::Hybrid),
            body,
            self.fallback.answer_closing(query)
        )
    }

    fn fallback_response(&self, decision: &RoutingDecision, max_score: f32) -> FormattedResponse {
        let answer = if decision.reason == RouteReason::Conversational {
            self.fallback.small_talk_reply(&decision.query)
        } else {
            self.fallback.render(&decision.query)
        };

        FormattedResponse {
            answer,
            sources: Vec::new(),
            grounded: false,
            strategy: decision.strategy,
            verdict: decision.verdict.kind,
            max_score,
        }
    }

    /// De-duplicated by (source, locator), capped at `max_sources`.
    fn map_sources(&self, context: &[RetrievedChunk]) -> Vec<SourceRef> {
        let mut seen = HashSet::new();
        let mut sources = Vec::new();

        for candidate in context {
            if sources.len() >= self.max_sources {
                break;
            }

            let chunk = &candidate.chunk;
            let locator = locator(chunk);
            if !seen.insert((chunk.source.clone(), locator.clone())) {
                continue;
            }

            sources.push(SourceRef {
                excerpt: truncate_excerpt(chunk.content(), self.snippet_length),
                source: chunk.source.clone(),
                title: display_title(&chunk.source),
                locator,
            });
        }

        sources
    }
}

/// Tidy model output: whitespace collapsed within lines, spacing around
/// punctuation fixed, ellipses normalized, list markers turned into
/// bullets and the first letter capitalized.
fn clean_answer(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.trim().lines() {
        let line = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            if lines.last().is_some_and(|last| !last.is_empty()) {
                lines.push(String::new());
            }
            continue;
        }
        lines.push(clean_line(&line));
    }

    let mut cleaned = lines.join("\n");
    if let Some(first) = cleaned.chars().next() {
        if first.is_lowercase() {
            cleaned = first.to_uppercase().chain(cleaned.chars().skip(1)).collect();
        }
    }
    cleaned
}

fn clean_line(line: &str) -> String {
    let mut line = line.to_string();
    if let Some(re) = &*BULLET {
        line = re.replace(&line, "• ").into_owned();
    }
    for (pattern, replacement) in [
        (&*SPACE_BEFORE_PUNCT, "$1"),
        (&*MISSING_SPACE_AFTER_SENTENCE, "$1 $2"),
        (&*MISSING_SPACE_AFTER_COMMA, ", $1"),
        (&*LONG_ELLIPSIS, "..."),
    ] {
        if let Some(re) = pattern {
            line = re.replace_all(&line, replacement).into_owned();
        }
    }
    line
}

/// "page N", "lines a-b" or "chunk N".
fn locator(chunk: &Chunk) -> String {
    if let Some(page) = chunk.page() {
        return format!("page {}", page);
    }

    let (start, end) = chunk.metadata.line_range;
    if start > 0 {
        return format!("lines {}-{}", start, end);
    }

    format!("chunk {}", chunk.position + 1)
}

/// Title-cased file name without extension; `_` becomes a space.
fn display_title(source: &str) -> String {
    let path = Path::new(source);
    let stem = path
        .file_stem()
        .or_else(|| path.file_name())
        .and_then(|s| s.to_str())
        .unwrap_or(source);

    stem.replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cut at a word boundary at or before `max_chars` and mark with "...".
fn truncate_excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let cut = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let truncated = &text[..cut];

    match truncated.rfind(char::is_whitespace) {
        Some(space) if space > 0 => format!("{}...", truncated[..space].trim_end()),
        _ => format!("{}...", truncated),
    }
}
