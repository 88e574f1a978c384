//! Canned phrasing: fallback replies used when the documents cannot support
//! an answer, plus the optional framing around document answers.

use grounded_core::{AppError, AppResult, FallbackSelection};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Placeholder replaced with the topic extracted from the query.
pub const TOPIC_PLACEHOLDER: &str = "{{topic}}";

const DEFAULT_TOPIC: &str = "this topic";
const TOPIC_WORDS: usize = 5;

const QUESTION_STARTERS: &[&str] = &[
    "what is", "what's", "who is", "who's", "tell me", "how to", "can you", "could you",
    "would you", "please", "i need",
];

const APOLOGIES: &[&str] = &[
    "I apologize for any inconvenience this may cause.",
    "I'm sorry I couldn't be more helpful with this specific question.",
    "I regret that I don't have that information available.",
];

const SUGGESTIONS: &[&str] = &[
    "Would you like me to search for something else related to this topic?",
    "Is there another aspect of this topic I can help you with?",
    "Would you like to rephrase the question with different terms?",
    "Could you provide more details about what specific information you're looking for?",
];

const CLOSINGS: &[&str] = &[
    "Please don't hesitate to ask if you have any other questions!",
    "Feel free to reach out if there's anything else I can assist you with!",
    "I'm here to help with any other questions you might have!",
];

const SMALL_TALK_REPLIES: &[&str] = &[
    "I'm here and happy to help! What would you like to know about your documents?",
    "Hello! Ask me anything about the documents I have access to.",
    "Thanks for reaching out! Let me know what you'd like to look up.",
];

const ANSWER_LEADS: &[&str] = &[
    "Here's some information about {{topic}} that might help.",
    "I'd be happy to share what I know about {{topic}}.",
    "Thanks for asking about {{topic}}. Here's what I found:",
];

const HEDGED_LEADS: &[&str] = &[
    "Here's what the documents suggest about {{topic}}, though they may not cover it fully.",
    "I found some information related to {{topic}}, but it may be incomplete.",
];

const ANSWER_CLOSINGS: &[&str] = &[
    "I hope this information is helpful!",
    "Let me know if you'd like to know more!",
    "Feel free to ask if you have any other questions!",
];

const EMPTY_QUERY_REPLIES: &[&str] = &[
    "I noticed your message was empty. I'm here to help! Could you tell me what you'd like to know?",
    "Hello! I didn't receive your question. What can I help you with today?",
    "I'm ready to assist you! Could you please share your question or topic of interest?",
];

const SUGGESTION_LEADS: &[&str] = &[
    "You might want to ask about:",
    "Here are some topics you could ask about:",
    "Consider asking about:",
    "Some popular topics include:",
];

const SAMPLE_TOPICS: &[&str] = &[
    "our products and services",
    "pricing information",
    "how to get started",
    "feature details",
];

/// Short topic phrase for a query: leading question starter removed, at
/// most five words kept.
pub fn extract_topic(query: &str) -> String {
    let mut clean = query.trim().trim_end_matches(['?', '!', '.']).trim();

    for starter in QUESTION_STARTERS {
        let matches = clean
            .get(..starter.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(starter));
        let at_boundary = clean
            .get(starter.len()..)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace));
        if matches && at_boundary {
            clean = clean[starter.len()..].trim();
            break;
        }
    }

    let words: Vec<&str> = clean.split_whitespace().collect();
    if words.is_empty() {
        DEFAULT_TOPIC.to_string()
    } else if words.len() > TOPIC_WORDS {
        format!("{}...", words[..TOPIC_WORDS].join(" "))
    } else {
        words.join(" ")
    }
}

/// Picks and renders fallback templates and answer framing according to a
/// selection policy.
#[derive(Debug)]
pub struct FallbackPicker {
    /// (template id, text), ordered by id
    templates: Vec<(String, String)>,
    selection: FallbackSelection,
    cursor: AtomicUsize,
}

impl FallbackPicker {
    pub fn new(
        templates: &BTreeMap<String, String>,
        selection: FallbackSelection,
    ) -> AppResult<Self> {
        if templates.is_empty() {
            return Err(AppError::Config(
                "at least one fallback template is required".to_string(),
            ));
        }

        Ok(Self {
            templates: templates
                .iter()
                .map(|(id, text)| (id.clone(), text.clone()))
                .collect(),
            selection,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn selection(&self) -> FallbackSelection {
        self.selection
    }

    pub fn template_ids(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|(id, _)| id.as_str())
    }

    /// Id and raw text of the template chosen for `query`.
    pub fn pick(&self, query: &str) -> (&str, &str) {
        let (id, text) = &self.templates[self.index(query, "template", self.templates.len())];
        (id.as_str(), text.as_str())
    }

    /// Fallback answer for `query`: the chosen template with the topic
    /// filled in, then an apology, a suggestion and a closing line.
    pub fn render(&self, query: &str) -> String {
        let (id, template) = self.pick(query);
        tracing::debug!("Using fallback template '{}'", id);

        let opening = template.replace(TOPIC_PLACEHOLDER, &extract_topic(query));
        format!(
            "{} {} {}\n\n{}",
            opening.trim(),
            self.choose(query, "apology", APOLOGIES),
            self.choose(query, "suggestion", SUGGESTIONS),
            self.choose(query, "closing", CLOSINGS)
        )
    }

    /// Neutral reply for small talk the model could not answer.
    pub fn small_talk_reply(&self, query: &str) -> String {
        self.choose(query, "small_talk", SMALL_TALK_REPLIES).to_string()
    }

    /// Lead-in sentence for a document answer; `hedged` for partial context.
    pub fn answer_lead(&self, query: &str, hedged: bool) -> String {
        let leads = if hedged { HEDGED_LEADS } else { ANSWER_LEADS };
        self.choose(query, "lead_in", leads)
            .replace(TOPIC_PLACEHOLDER, &extract_topic(query))
    }

    pub fn answer_closing(&self, query: &str) -> &'static str {
        self.choose(query, "answer_closing", ANSWER_CLOSINGS)
    }

    /// Polite reply for an empty query, with a few suggested topics.
    pub fn empty_query_reply(&self) -> String {
        let reply = self.choose("", "empty", EMPTY_QUERY_REPLIES);
        let lead = self.choose("", "lead", SUGGESTION_LEADS);
        let last = SAMPLE_TOPICS.len() - 1;
        format!(
            "{} {} {}, or {}.",
            reply,
            lead,
            SAMPLE_TOPICS[..last].join(", "),
            SAMPLE_TOPICS[last]
        )
    }

    fn choose(&self, query: &str, salt: &str, phrases: &[&'static str]) -> &'static str {
        phrases[self.index(query, salt, phrases.len())]
    }

    fn index(&self, query: &str, salt: &str, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        match self.selection {
            FallbackSelection::Random => rand::thread_rng().gen_range(0..len),
            FallbackSelection::RoundRobin => self.cursor.fetch_add(1, Ordering::Relaxed) % len,
            FallbackSelection::Hashed => {
                let mut hasher = Sha256::new();
                hasher.update(salt.as_bytes());
                hasher.update(query.trim().to_lowercase().as_bytes());
                let digest = hasher.finalize();
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&digest[..8]);
                (u64::from_be_bytes(bytes) % len as u64) as usize
            }
        }
    }
}
