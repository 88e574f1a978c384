//! Cheap keyword and pattern heuristics for small talk.

use crate::text::significant_terms;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationalKind {
    Greeting,
    Thanks,
    Farewell,
    /// Questions about the assistant itself
    Meta,
    Joke,
    Arithmetic,
}

static ARITHMETIC: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[\d\s.,()]*\d\s*[-+*/x×÷^]\s*\d[\d\s.,()+\-*/x×÷^]*$").ok());

const GREETINGS: &[&str] = &[
    "hi", "hello", "hey", "hiya", "howdy", "greetings", "good morning", "good afternoon",
    "good evening", "how are you", "how's it going", "what's up", "whats up", "yo",
];

const THANKS: &[&str] = &["thanks", "thank you", "thx", "ty", "cheers", "much appreciated"];

const FAREWELLS: &[&str] = &["bye", "goodbye", "good bye", "see you", "see ya", "farewell", "good night"];

const META: &[&str] = &[
    "who are you",
    "what are you",
    "what is your name",
    "what's your name",
    "what can you do",
    "are you a bot",
    "are you human",
    "are you an ai",
    "how do you work",
];

/// Words that may trail a pleasantry without turning it into a question.
const ADDRESS_WORDS: &[&str] = &[
    "there", "again", "so", "much", "a", "lot", "very", "you", "all", "everyone", "folks",
    "guys", "friend", "buddy", "mate", "team", "bot", "assistant", "later", "soon", "today",
    "tonight", "now", "doing", "for", "the", "help",
];

const JOKES: &[&str] = &["tell me a joke", "say something funny", "make me laugh", "know any jokes"];

/// Surface features of a query used to override routing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFeatures {
    pub conversational: Option<ConversationalKind>,
}

impl QueryFeatures {
    /// No override; routing follows the verdict.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn conversational(kind: ConversationalKind) -> Self {
        Self {
            conversational: Some(kind),
        }
    }

    pub fn is_conversational(&self) -> bool {
        self.conversational.is_some()
    }

    pub fn detect(query: &str) -> Self {
        let normalized = normalize(query);
        if normalized.is_empty() {
            return Self::none();
        }

        let kind = if is_arithmetic(query.trim()) {
            Some(ConversationalKind::Arithmetic)
        } else if JOKES.iter().any(|p| normalized.contains(p)) {
            Some(ConversationalKind::Joke)
        } else if is_only(&normalized, META) {
            Some(ConversationalKind::Meta)
        } else if is_only(&normalized, THANKS) {
            Some(ConversationalKind::Thanks)
        } else if is_only(&normalized, FAREWELLS) {
            Some(ConversationalKind::Farewell)
        } else if is_only(&normalized, GREETINGS) {
            Some(ConversationalKind::Greeting)
        } else {
            None
        };

        Self {
            conversational: kind,
        }
    }
}

/// Lower-case, curly apostrophes folded, punctuation other than `'` dropped.
fn normalize(query: &str) -> String {
    let folded: String = query
        .to_lowercase()
        .replace('\u{2019}', "'")
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '\'' { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The query is one of the phrases, optionally followed by an address such
/// as "there" or "so much". Trailing words that name a topic disqualify it.
fn is_only(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| {
        if text == *phrase {
            return true;
        }
        match text.strip_prefix(phrase) {
            Some(rest) if rest.starts_with(' ') => is_filler(rest),
            _ => false,
        }
    })
}

fn is_filler(rest: &str) -> bool {
    rest.split_whitespace()
        .all(|word| ADDRESS_WORDS.contains(&word))
        || significant_terms(rest).is_empty()
}

fn is_arithmetic(query: &str) -> bool {
    let expr = query
        .trim_end_matches(['?', '=', ' '])
        .trim_start_matches("what is ")
        .trim_start_matches("What is ")
        .trim_start_matches("calculate ")
        .trim_start_matches("Calculate ");
    (*ARITHMETIC)
        .as_ref()
        .is_some_and(|re| re.is_match(expr.trim()))
}
