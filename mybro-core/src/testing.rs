//! Testing utilities for the companion.
//!
//! This module provides tools for integration testing:
//! - `MockModel` for deterministic testing without API calls
//! - `TestHarness` for scripted conversations
//! - Assertion helpers for verifying replies

use crate::companion::{Companion, Disposition, Reply};
use crate::config::CompanionConfig;
use crate::llm::{LanguageModel, LlmError, OnDelta};
use crate::log::LocalSummarizer;
use crate::profile::UserProfile;
use async_trait::async_trait;
use gemini::Request;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Reply given once the script runs out.
pub const DEFAULT_MOCK_REPLY: &str = "I'm here with you. Tell me more.";

/// A scripted model outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockResponse {
    Reply(String),
    Failure(String),
}

#[derive(Default)]
struct MockState {
    script: VecDeque<MockResponse>,
    requests: Vec<Request>,
}

/// A language model that returns scripted responses and records requests.
///
/// Use this for deterministic tests without API calls.
#[derive(Default)]
pub struct MockModel {
    state: Mutex<MockState>,
}

impl MockModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock that answers with each reply in turn.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let model = Self::new();
        for reply in replies {
            model.push_reply(reply);
        }
        model
    }

    pub fn push_reply(&self, text: impl Into<String>) {
        self.state()
            .script
            .push_back(MockResponse::Reply(text.into()));
    }

    pub fn push_failure(&self, reason: impl Into<String>) {
        self.state()
            .script
            .push_back(MockResponse::Failure(reason.into()));
    }

    /// Every request seen so far, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        self.state().requests.clone()
    }

    pub fn last_request(&self) -> Option<Request> {
        self.state().requests.last().cloned()
    }

    pub fn call_count(&self) -> usize {
        self.state().requests.len()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panic in another test thread must not hide this one's result.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next(&self, request: Request) -> Result<String, LlmError> {
        let mut state = self.state();
        state.requests.push(request);
        match state.script.pop_front() {
            Some(MockResponse::Reply(text)) => Ok(text),
            Some(MockResponse::Failure(reason)) => Err(LlmError::Unavailable(reason)),
            None => Ok(DEFAULT_MOCK_REPLY.to_string()),
        }
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn complete(&self, request: Request) -> Result<String, LlmError> {
        self.next(request)
    }

    async fn complete_streaming(
        &self,
        request: Request,
        on_delta: &mut OnDelta<'_>,
    ) -> Result<String, LlmError> {
        let text = self.next(request)?;
        for chunk in text.split_inclusive(' ') {
            on_delta(chunk);
        }
        Ok(text)
    }
}

/// A companion wired to a [`MockModel`] with local summaries.
pub struct TestHarness {
    pub model: Arc<MockModel>,
    pub companion: Companion,
    replies: Vec<Reply>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(CompanionConfig::default())
    }

    pub fn with_config(config: CompanionConfig) -> Self {
        let model = Arc::new(MockModel::new());
        let companion = Companion::new(
            Arc::new(config),
            model.clone(),
            UserProfile::new("test_user"),
        )
        .with_summarizer(LocalSummarizer);
        Self {
            model,
            companion,
            replies: Vec::new(),
        }
    }

    /// Script the next model reply.
    pub fn expect_reply(&mut self, text: impl Into<String>) -> &mut Self {
        self.model.push_reply(text);
        self
    }

    /// Script the next model call to fail.
    pub fn expect_failure(&mut self) -> &mut Self {
        self.model.push_failure("scripted failure");
        self
    }

    /// Send a message and keep the reply.
    pub async fn say(&mut self, text: &str) -> Reply {
        let reply = self.companion.respond(text).await;
        self.replies.push(reply.clone());
        reply
    }

    pub fn last_reply(&self) -> Option<&Reply> {
        self.replies.last()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion helpers
// ============================================================================

/// Assert the reply carries crisis resources.
pub fn assert_crisis_resources(reply: &Reply) {
    assert!(
        reply.crisis_resources && reply.text.contains("988"),
        "Expected crisis resources in reply: {:?}",
        reply.text
    );
}

/// Assert the reply carries no crisis resources.
pub fn assert_no_crisis_resources(reply: &Reply) {
    assert!(
        !reply.crisis_resources && !reply.text.contains("741741"),
        "Unexpected crisis resources in reply: {:?}",
        reply.text
    );
}

pub fn assert_urgency(reply: &Reply, level: u8) {
    assert_eq!(
        reply.classification.urgency.get(),
        level,
        "Wrong urgency for reply {:?}",
        reply.text
    );
}

pub fn assert_disposition(reply: &Reply, disposition: Disposition) {
    assert_eq!(reply.disposition, disposition, "Reply: {:?}", reply.text);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_follows_script() {
        let model = MockModel::with_replies(["one"]);
        model.push_failure("boom");

        let request = || Request::new(vec![gemini::Message::user("hi")]);
        assert_eq!(model.complete(request()).await.unwrap(), "one");
        assert!(matches!(
            model.complete(request()).await,
            Err(LlmError::Unavailable(reason)) if reason == "boom"
        ));
        assert_eq!(model.complete(request()).await.unwrap(), DEFAULT_MOCK_REPLY);
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_streams_in_chunks() {
        let model = MockModel::with_replies(["a b c"]);
        let mut chunks = Vec::new();
        let text = model
            .complete_streaming(
                Request::new(vec![gemini::Message::user("hi")]),
                &mut |d: &str| chunks.push(d.to_string()),
            )
            .await
            .unwrap();
        assert_eq!(chunks, vec!["a ", "b ", "c"]);
        assert_eq!(text, "a b c");
    }

    #[tokio::test]
    async fn test_harness_records_replies() {
        let mut harness = TestHarness::new();
        harness.expect_reply("Glad to hear it!");

        let reply = harness.say("I'm happy today").await;
        assert_disposition(&reply, Disposition::Answered);
        assert_urgency(&reply, 1);
        assert_no_crisis_resources(&reply);
        assert_eq!(harness.last_reply().unwrap().text, "Glad to hear it!");
    }
}
