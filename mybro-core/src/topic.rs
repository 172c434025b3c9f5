//! Keeps conversations on mental-health ground.
//!
//! A message is in scope if it mentions anything on the allow-list, or if it
//! carries no marker of a clearly unrelated request. Greetings and small talk
//! pass because they carry no marker.

use crate::text::Words;

/// Shown when a message is out of scope.
pub const REFUSAL_MESSAGE: &str = "I'm really only set up to talk about how you're doing: \
feelings, stress, relationships, sleep, that kind of thing. I'm not much help with that one, \
but if anything's been weighing on you lately, I'm all ears.";

/// Mental-health vocabulary. Also used to pick out topics for summaries.
pub const MENTAL_HEALTH_TERMS: &[&str] = &[
    "anxiety",
    "anxious",
    "depression",
    "depressed",
    "stress",
    "stressed",
    "worried",
    "sad",
    "lonely",
    "angry",
    "scared",
    "panic",
    "overwhelmed",
    "feel",
    "feeling",
    "feelings",
    "mood",
    "emotions",
    "therapy",
    "therapist",
    "counseling",
    "mental health",
    "self care",
    "sleep",
    "insomnia",
    "tired",
    "exhausted",
    "burnout",
    "relationship",
    "breakup",
    "family",
    "friends",
    "grief",
    "trauma",
    "self esteem",
    "confidence",
    "motivation",
    "coping",
    "suicide",
    "suicidal",
    "self harm",
    "hurt myself",
    "cope",
    "cry",
    "crying",
    "medication",
];

/// Requests that clearly belong somewhere else.
const UNRELATED_MARKERS: &[&str] = &[
    "recipe",
    "weather forecast",
    "stock price",
    "stock market",
    "bitcoin",
    "crypto",
    "write code",
    "python code",
    "javascript",
    "debug my",
    "compile",
    "sql query",
    "math problem",
    "solve for x",
    "capital of",
    "translate",
    "football score",
    "sports score",
    "movie recommendation",
    "write an essay",
    "homework answers",
    "tax return",
];

/// Why a message was let through or turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicReason {
    /// Mentions an allow-listed term.
    MentalHealthTerm,
    /// No signal either way.
    NoUnrelatedMarker,
    /// Mentions an unrelated domain and nothing on the allow-list.
    UnrelatedMarker,
}

/// Outcome of the topic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicVerdict {
    pub in_scope: bool,
    /// Allow-list terms or unrelated markers that decided the verdict.
    pub matched_terms: Vec<String>,
    pub reason: TopicReason,
}

/// Allow-list / unrelated-marker gate.
#[derive(Debug, Clone)]
pub struct TopicFilter {
    allow: Vec<String>,
}

impl Default for TopicFilter {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

impl TopicFilter {
    /// Build a filter whose allow-list also covers `crisis_phrases`.
    pub fn new<I, S>(crisis_phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allow: Vec<String> = MENTAL_HEALTH_TERMS.iter().map(|t| t.to_string()).collect();
        for phrase in crisis_phrases {
            let phrase = phrase.as_ref().trim().to_lowercase();
            if !phrase.is_empty() && !allow.contains(&phrase) {
                allow.push(phrase);
            }
        }
        Self { allow }
    }

    pub fn check(&self, text: &str) -> TopicVerdict {
        let words = Words::new(text);

        let allowed: Vec<String> = self
            .allow
            .iter()
            .filter(|term| words.contains_phrase(term))
            .cloned()
            .collect();
        if !allowed.is_empty() {
            return TopicVerdict {
                in_scope: true,
                matched_terms: allowed,
                reason: TopicReason::MentalHealthTerm,
            };
        }

        let markers: Vec<String> = UNRELATED_MARKERS
            .iter()
            .filter(|marker| words.contains_phrase(marker))
            .map(|marker| marker.to_string())
            .collect();
        if markers.is_empty() {
            TopicVerdict {
                in_scope: true,
                matched_terms: Vec::new(),
                reason: TopicReason::NoUnrelatedMarker,
            }
        } else {
            TopicVerdict {
                in_scope: false,
                matched_terms: markers,
                reason: TopicReason::UnrelatedMarker,
            }
        }
    }

    pub fn is_in_scope(&self, text: &str) -> bool {
        self.check(text).in_scope
    }
}
