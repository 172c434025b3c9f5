//! Bounded conversation history.
//!
//! The log holds at most `max_turns` turns. When an append pushes it over the
//! cap, the oldest `summary_block` turns (including any earlier summary) are
//! folded into a single summary turn at the front, so the log never holds more
//! than one summary and the summary is always first.

use crate::classifier::Emotion;
use crate::config::HistoryConfig;
use crate::llm::LanguageModel;
use crate::topic::MENTAL_HEALTH_TERMS;
use crate::text::Words;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gemini::{Message, Request};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, warn};

/// Who said something.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Synthetic assistant-side turn standing in for folded history.
    #[serde(default)]
    pub is_summary: bool,
    /// Emotion detected on a user turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<Emotion>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Speaker::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Speaker::Assistant, text)
    }

    pub fn summary(text: impl Into<String>) -> Self {
        Self {
            is_summary: true,
            ..Self::new(Speaker::Assistant, text)
        }
    }

    fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
            is_summary: false,
            emotion: None,
        }
    }

    pub fn with_emotion(mut self, emotion: Emotion) -> Self {
        self.emotion = Some(emotion);
        self
    }
}

/// Condenses a block of turns into one line of text. Never fails.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, turns: &[Turn]) -> String;
}

/// Rule-based summary: message count, topics mentioned and recent moods.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSummarizer;

impl LocalSummarizer {
    pub fn summarize_now(&self, turns: &[Turn]) -> String {
        let messages = turns.iter().filter(|t| !t.is_summary).count();

        let mut topics: Vec<&str> = Vec::new();
        for turn in turns
            .iter()
            .filter(|t| t.speaker == Speaker::User || t.is_summary)
        {
            let words = Words::new(&turn.text);
            for term in MENTAL_HEALTH_TERMS {
                if !topics.contains(term) && words.contains_phrase(term) {
                    topics.push(term);
                }
            }
        }
        topics.truncate(5);

        let mut moods: Vec<Emotion> = Vec::new();
        for emotion in turns.iter().rev().filter_map(|t| t.emotion).take(5) {
            if !moods.contains(&emotion) {
                moods.push(emotion);
            }
        }
        moods.reverse();

        let topics = if topics.is_empty() {
            "general chat".to_string()
        } else {
            topics.join(", ")
        };
        let mut summary = format!("Earlier conversation ({messages} messages) covered: {topics}.");
        if !moods.is_empty() {
            let moods: Vec<&str> = moods.iter().map(|m| m.as_str()).collect();
            summary.push_str(&format!(" User moods: {}.", moods.join(", ")));
        }
        summary
    }
}

#[async_trait]
impl Summarizer for LocalSummarizer {
    async fn summarize(&self, turns: &[Turn]) -> String {
        self.summarize_now(turns)
    }
}

const SUMMARY_INSTRUCTION: &str = "You condense earlier parts of a supportive conversation \
between a user and MyBro. Write two or three plain sentences covering what the user shared, \
how they seemed to feel, and anything they would want remembered. No advice, no greetings.";

/// Asks the model for a summary and falls back to [`LocalSummarizer`].
pub struct LlmSummarizer {
    model: Arc<dyn LanguageModel>,
    model_name: String,
    max_tokens: usize,
}

impl LlmSummarizer {
    pub fn new(model: Arc<dyn LanguageModel>, model_name: impl Into<String>) -> Self {
        Self {
            model,
            model_name: model_name.into(),
            max_tokens: 300,
        }
    }

    fn request(&self, turns: &[Turn]) -> Request {
        let transcript: Vec<String> = turns
            .iter()
            .map(|turn| {
                let who = match (turn.is_summary, turn.speaker) {
                    (true, _) => "Earlier summary",
                    (false, Speaker::User) => "User",
                    (false, Speaker::Assistant) => "MyBro",
                };
                format!("{who}: {}", turn.text)
            })
            .collect();

        Request::new(vec![Message::user(transcript.join("\n"))])
            .with_model(&self.model_name)
            .with_system(SUMMARY_INSTRUCTION)
            .with_max_tokens(self.max_tokens)
            .with_temperature(0.3)
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, turns: &[Turn]) -> String {
        match self.model.complete(self.request(turns)).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "LLM summary failed, using local summary");
                LocalSummarizer.summarize_now(turns)
            }
        }
    }
}

/// Ordered, capped sequence of turns.
#[derive(Debug, Clone)]
pub struct ConversationLog {
    turns: VecDeque<Turn>,
    max_turns: usize,
    summary_block: usize,
}

impl ConversationLog {
    pub fn new(history: &HistoryConfig) -> Self {
        Self {
            turns: VecDeque::with_capacity(history.max_turns + 1),
            max_turns: history.max_turns,
            summary_block: history.summary_block,
        }
    }

    /// Rebuild a log from stored turns.
    ///
    /// Only a leading summary survives, and the oldest regular turns are
    /// dropped if the stored history is longer than the cap.
    pub fn from_turns(history: &HistoryConfig, turns: Vec<Turn>) -> Self {
        let mut log = Self::new(history);

        let summary = turns.first().filter(|t| t.is_summary).cloned();
        let regular: Vec<Turn> = turns.into_iter().filter(|t| !t.is_summary).collect();

        let room = log.max_turns - usize::from(summary.is_some());
        let skip = regular.len().saturating_sub(room);
        if skip > 0 {
            debug!(dropped = skip, "Stored transcript longer than history cap");
        }

        log.turns.extend(summary);
        log.turns.extend(regular.into_iter().skip(skip));
        log
    }

    /// Add a turn, folding the oldest block if the cap is exceeded.
    pub async fn append(&mut self, mut turn: Turn, summarizer: &dyn Summarizer) {
        turn.is_summary = false;
        self.turns.push_back(turn);
        if self.turns.len() > self.max_turns {
            self.summarize(summarizer).await;
        }
    }

    /// Replace the oldest block with one summary turn.
    pub async fn summarize(&mut self, summarizer: &dyn Summarizer) {
        let block = self.summary_block.min(self.turns.len());
        if block == 0 {
            return;
        }
        let folded: Vec<Turn> = self.turns.drain(..block).collect();
        let text = summarizer.summarize(&folded).await;
        debug!(folded = folded.len(), remaining = self.turns.len(), "Summarized history");
        self.turns.push_front(Turn::summary(text));
    }

    /// The last `n` turns, most recent last.
    pub fn get_recent(&self, n: usize) -> impl DoubleEndedIterator<Item = &Turn> + '_ {
        let start = self.turns.len().saturating_sub(n);
        self.turns.range(start..)
    }

    /// The summary turn, if history has been folded.
    pub fn summary(&self) -> Option<&Turn> {
        self.turns.front().filter(|t| t.is_summary)
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Turn> + '_ {
        self.turns.iter()
    }

    pub fn to_vec(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockModel;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn history(max_turns: usize, summary_block: usize) -> HistoryConfig {
        HistoryConfig {
            max_turns,
            summary_block,
            recent_context: 5,
        }
    }

    /// Counts calls and reports how many turns it was handed.
    #[derive(Default)]
    struct CountingSummarizer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Summarizer for CountingSummarizer {
        async fn summarize(&self, turns: &[Turn]) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            format!("folded {}", turns.len())
        }
    }

    #[tokio::test]
    async fn test_append_under_cap() {
        let mut log = ConversationLog::new(&history(5, 2));
        let summarizer = CountingSummarizer::default();
        for i in 0..5 {
            log.append(Turn::user(format!("message {i}")), &summarizer).await;
        }
        assert_eq!(log.len(), 5);
        assert!(log.summary().is_none());
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_overflow_folds_oldest_block_once() {
        let mut log = ConversationLog::new(&history(5, 3));
        let summarizer = CountingSummarizer::default();
        for i in 0..6 {
            log.append(Turn::user(format!("message {i}")), &summarizer).await;
            assert!(log.len() <= 5);
        }

        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
        // 6 turns, oldest 3 folded into 1: summary + messages 3..=5
        assert_eq!(log.len(), 4);
        assert_eq!(log.summary().unwrap().text, "folded 3");
        let texts: Vec<&str> = log.iter().skip(1).map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["message 3", "message 4", "message 5"]);
    }

    #[tokio::test]
    async fn test_existing_summary_is_refolded() {
        let mut log = ConversationLog::new(&history(4, 2));
        let summarizer = CountingSummarizer::default();
        for i in 0..20 {
            log.append(Turn::user(format!("message {i}")), &summarizer).await;
            assert!(log.len() <= 4);
            let summaries = log.iter().filter(|t| t.is_summary).count();
            assert!(summaries <= 1);
            if summaries == 1 {
                assert!(log.iter().next().unwrap().is_summary);
            }
        }
        assert_eq!(log.iter().last().unwrap().text, "message 19");
    }

    #[tokio::test]
    async fn test_get_recent() {
        let mut log = ConversationLog::new(&history(10, 2));
        for i in 0..4 {
            log.append(Turn::user(format!("m{i}")), &LocalSummarizer).await;
        }
        let recent: Vec<&str> = log.get_recent(2).map(|t| t.text.as_str()).collect();
        assert_eq!(recent, vec!["m2", "m3"]);
        assert_eq!(log.get_recent(50).count(), 4);
    }

    #[tokio::test]
    async fn test_clear() {
        let mut log = ConversationLog::new(&history(10, 2));
        log.append(Turn::user("hi"), &LocalSummarizer).await;
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_local_summary_lists_topics_and_moods() {
        let turns = vec![
            Turn::user("I've been so stressed about work").with_emotion(Emotion::Stressed),
            Turn::assistant("That sounds heavy."),
            Turn::user("and I can't sleep").with_emotion(Emotion::Anxious),
        ];
        let summary = LocalSummarizer.summarize_now(&turns);
        assert!(summary.contains("3 messages"));
        assert!(summary.contains("stressed"));
        assert!(summary.contains("sleep"));
        assert!(summary.contains("User moods: stressed, anxious"));
    }

    #[test]
    fn test_local_summary_without_signal() {
        let summary = LocalSummarizer.summarize_now(&[Turn::user("hello there")]);
        assert_eq!(summary, "Earlier conversation (1 messages) covered: general chat.");
    }

    #[tokio::test]
    async fn test_llm_summarizer_uses_model() {
        let model = Arc::new(MockModel::new());
        model.push_reply("They talked about exams.");
        let summarizer = LlmSummarizer::new(model.clone(), "test-model");

        let text = summarizer.summarize(&[Turn::user("exams are killing me")]).await;
        assert_eq!(text, "They talked about exams.");

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].messages[0].text.contains("User: exams are killing me"));
    }

    #[tokio::test]
    async fn test_llm_summarizer_falls_back() {
        let model = Arc::new(MockModel::new());
        model.push_failure("offline");
        let summarizer = LlmSummarizer::new(model, "test-model");

        let text = summarizer
            .summarize(&[Turn::user("I feel lonely").with_emotion(Emotion::Lonely)])
            .await;
        assert!(text.starts_with("Earlier conversation"));
        assert!(text.contains("lonely"));
    }

    #[test]
    fn test_from_turns_enforces_shape() {
        let mut turns = vec![Turn::summary("old summary")];
        turns.extend((0..6).map(|i| Turn::user(format!("m{i}"))));
        turns.push(Turn::summary("stray"));

        let log = ConversationLog::from_turns(&history(4, 2), turns);
        assert_eq!(log.len(), 4);
        assert_eq!(log.summary().unwrap().text, "old summary");
        let texts: Vec<&str> = log.iter().skip(1).map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["m3", "m4", "m5"]);
    }
}
