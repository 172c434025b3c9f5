//! Rules-based emotion and urgency classification.
//!
//! Text is matched against ordered phrase tables, most specific first. The
//! first tier that matches decides the result:
//!
//! 1. concrete self-harm plan language (configurable) gives urgency 5
//! 2. non-suicidal self-harm or acute panic gives urgency 4
//! 3. general distress gives urgency 3
//! 4. the emotion keyword table gives 2 for negative emotions, 1 otherwise
//! 5. anything else is neutral at urgency 1
//!
//! An intensifier lifts a negative keyword match by one, never above 3.

use crate::text::Words;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Plan phrases that classify as a crisis unless configuration overrides them.
pub const DEFAULT_CRISIS_PHRASES: &[&str] = &[
    "going to kill myself",
    "planning to kill myself",
    "plan to kill myself",
    "have a plan to kill myself",
    "plan to end my life",
    "going to end my life",
    "planning to die",
    "ending my life tonight",
    "ending my life today",
    "taking pills to die",
    "going to jump off",
    "going to hurt myself",
    "tonight i will kill myself",
    "today i will die",
    "going to commit suicide",
    "suicide tonight",
];

/// Self-harm and acute panic, urgency 4.
const ACUTE_PHRASES: &[(&[&str], Emotion)] = &[
    (
        &[
            "cut myself",
            "cutting myself",
            "hurt myself",
            "hurting myself",
            "burn myself",
            "burning myself",
            "self harm",
            "harming myself",
        ],
        Emotion::Hopeless,
    ),
    (
        &[
            "panic attack",
            "having a panic attack",
            "can't breathe",
            "cannot breathe",
            "heart is racing",
        ],
        Emotion::Anxious,
    ),
];

/// General distress without plan language, urgency 3.
const DISTRESS_PHRASES: &[&str] = &[
    "want to die",
    "wanna die",
    "want to kill myself",
    "wish i was dead",
    "wish i were dead",
    "can't take it anymore",
    "cant take it anymore",
    "no point in living",
    "better off dead",
    "no reason to live",
    "suicidal",
];

/// Emotion keywords, checked in this order.
const EMOTION_KEYWORDS: &[(Emotion, &[&str])] = &[
    (
        Emotion::Anxious,
        &["anxious", "anxiety", "worried", "nervous", "panic", "fear", "scared"],
    ),
    (
        Emotion::Sad,
        &["sad", "depressed", "depression", "hopeless", "empty", "worthless"],
    ),
    (
        Emotion::Angry,
        &["angry", "frustrated", "mad", "furious", "irritated"],
    ),
    (
        Emotion::Happy,
        &["happy", "joy", "excited", "cheerful", "positive"],
    ),
    (
        Emotion::Stressed,
        &["stressed", "overwhelmed", "pressure", "tense"],
    ),
    (
        Emotion::Lonely,
        &["lonely", "alone", "isolated", "disconnected"],
    ),
    (
        Emotion::Confused,
        &["confused", "lost", "uncertain", "unclear"],
    ),
    (
        Emotion::Grateful,
        &["grateful", "thankful", "appreciate", "blessed"],
    ),
];

const INTENSIFIERS: &[&str] = &["really", "very", "extremely", "so"];

/// Emotional tone detected in a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    #[default]
    Neutral,
    Happy,
    Grateful,
    Anxious,
    Stressed,
    Sad,
    Angry,
    Lonely,
    Confused,
    Hopeless,
}

impl Emotion {
    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Neutral => "neutral",
            Emotion::Happy => "happy",
            Emotion::Grateful => "grateful",
            Emotion::Anxious => "anxious",
            Emotion::Stressed => "stressed",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Lonely => "lonely",
            Emotion::Confused => "confused",
            Emotion::Hopeless => "hopeless",
        }
    }

    /// Whether this emotion signals distress worth remembering.
    pub fn is_negative(self) -> bool {
        !matches!(self, Emotion::Neutral | Emotion::Happy | Emotion::Grateful)
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity from 1 (calm) to 5 (crisis). Construction clamps into range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Urgency(u8);

impl Urgency {
    pub const MIN: Urgency = Urgency(1);
    pub const MAX: Urgency = Urgency(5);

    pub fn new(level: u8) -> Self {
        Urgency(level.clamp(Self::MIN.0, Self::MAX.0))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Only the top level carries crisis resources.
    pub fn is_crisis(self) -> bool {
        self == Self::MAX
    }
}

impl Default for Urgency {
    fn default() -> Self {
        Self::MIN
    }
}

impl From<u8> for Urgency {
    fn from(level: u8) -> Self {
        Urgency::new(level)
    }
}

impl From<Urgency> for u8 {
    fn from(urgency: Urgency) -> Self {
        urgency.0
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of classifying one message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    pub emotion: Emotion,
    pub urgency: Urgency,
    /// The phrase that decided the result, if any.
    pub matched: Option<String>,
}

impl Classification {
    fn new(emotion: Emotion, urgency: u8, matched: &str) -> Self {
        Self {
            emotion,
            urgency: Urgency::new(urgency),
            matched: Some(matched.to_string()),
        }
    }
}

/// Phrase-table classifier. Never fails; unmatched text is neutral.
#[derive(Debug, Clone)]
pub struct Classifier {
    crisis_phrases: Vec<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_CRISIS_PHRASES.iter().copied())
    }
}

impl Classifier {
    /// Build a classifier with the given crisis plan phrases.
    pub fn new<I, S>(crisis_phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let crisis_phrases = crisis_phrases
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self { crisis_phrases }
    }

    pub fn crisis_phrases(&self) -> &[String] {
        &self.crisis_phrases
    }

    pub fn classify(&self, text: &str) -> Classification {
        let words = Words::new(text);

        if let Some(phrase) = words.first_match(&self.crisis_phrases) {
            return Classification::new(Emotion::Hopeless, 5, phrase);
        }

        for (phrases, emotion) in ACUTE_PHRASES {
            if let Some(phrase) = words.first_match(*phrases) {
                return Classification::new(*emotion, 4, phrase);
            }
        }

        if let Some(phrase) = words.first_match(DISTRESS_PHRASES) {
            return Classification::new(Emotion::Hopeless, 3, phrase);
        }

        for (emotion, keywords) in EMOTION_KEYWORDS {
            if let Some(keyword) = words.first_match(*keywords) {
                let mut urgency = if emotion.is_negative() { 2 } else { 1 };
                if emotion.is_negative() && words.first_match(INTENSIFIERS).is_some() {
                    urgency = (urgency + 1).min(3);
                }
                return Classification::new(*emotion, urgency, keyword);
            }
        }

        Classification::default()
    }
}
