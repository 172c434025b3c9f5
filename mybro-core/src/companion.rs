//! The response orchestrator.
//!
//! Each turn runs the topic filter and the classifier, builds a prompt from
//! the profile and recent history, asks the model for a reply, applies the
//! crisis gate, and records the exchange.

use crate::classifier::{Classification, Classifier};
use crate::config::CompanionConfig;
use crate::crisis;
use crate::events;
use crate::llm::{LanguageModel, LlmError, OnDelta};
use crate::log::{ConversationLog, LlmSummarizer, Speaker, Summarizer, Turn};
use crate::profile::UserProfile;
use crate::prompt::{check_in_request, system_instruction, PromptContext};
use crate::suggestions;
use crate::topic::{TopicFilter, REFUSAL_MESSAGE};
use chrono::{Local, NaiveDate, Utc};
use gemini::{Message, Request, Role};
use std::sync::Arc;
use tracing::{debug, warn};

/// How a reply came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The model answered.
    Answered,
    /// The message was off topic and got the fixed refusal.
    Refused,
    /// The model call failed and a fallback message was used.
    Fallback,
}

/// The companion's answer to one message.
#[derive(Debug, Clone)]
pub struct Reply {
    /// Final text, including crisis resources when attached.
    pub text: String,
    pub classification: Classification,
    pub disposition: Disposition,
    /// Whether crisis resources were appended.
    pub crisis_resources: bool,
    /// Small things to try. Empty for refusals.
    pub suggestions: Vec<String>,
    /// Questions that invite them to say more. Empty for refusals.
    pub follow_up_questions: Vec<String>,
}

/// Supportive chat companion for one user.
pub struct Companion {
    config: Arc<CompanionConfig>,
    model: Arc<dyn LanguageModel>,
    classifier: Classifier,
    topic: TopicFilter,
    summarizer: Box<dyn Summarizer>,
    profile: UserProfile,
    log: ConversationLog,
}

impl Companion {
    /// Create a companion with an empty conversation.
    pub fn new(
        config: Arc<CompanionConfig>,
        model: Arc<dyn LanguageModel>,
        profile: UserProfile,
    ) -> Self {
        let summarizer = LlmSummarizer::new(Arc::clone(&model), config.model.clone());
        Self {
            classifier: Classifier::new(&config.crisis_phrases),
            topic: TopicFilter::new(&config.crisis_phrases),
            summarizer: Box::new(summarizer),
            log: ConversationLog::new(&config.history),
            profile,
            model,
            config,
        }
    }

    /// Resume from stored turns.
    pub fn with_history(mut self, turns: Vec<Turn>) -> Self {
        self.log = ConversationLog::from_turns(&self.config.history, turns);
        self
    }

    /// Use a different summarizer for folding old history.
    pub fn with_summarizer(mut self, summarizer: impl Summarizer + 'static) -> Self {
        self.summarizer = Box::new(summarizer);
        self
    }

    pub async fn respond(&mut self, text: &str) -> Reply {
        self.run_turn(text, None).await
    }

    /// Like [`respond`](Self::respond), reporting model text as it streams.
    ///
    /// Refusals, fallbacks and crisis resources are not streamed; the
    /// returned [`Reply::text`] is always the complete final text.
    pub async fn respond_streaming(
        &mut self,
        text: &str,
        on_delta: &mut OnDelta<'_>,
    ) -> Reply {
        self.run_turn(text, Some(on_delta)).await
    }

    async fn run_turn(
        &mut self,
        text: &str,
        on_delta: Option<&mut OnDelta<'_>>,
    ) -> Reply {
        let text = text.trim();
        let verdict = self.topic.check(text);
        let classification = self.classifier.classify(text);
        debug!(
            in_scope = verdict.in_scope,
            reason = ?verdict.reason,
            emotion = %classification.emotion,
            urgency = %classification.urgency,
            matched = ?classification.matched,
            "Classified message"
        );

        if verdict.in_scope {
            self.note_event(text);
        }

        let (body, disposition) = if !verdict.in_scope {
            (REFUSAL_MESSAGE.to_string(), Disposition::Refused)
        } else {
            let request = self.build_request(text, &classification);
            match self.generate(request, on_delta).await {
                Ok(reply) => (reply.trim().to_string(), Disposition::Answered),
                Err(e) => {
                    warn!(error = %e, "Model call failed, sending fallback");
                    (self.fallback_text(), Disposition::Fallback)
                }
            }
        };

        let (final_text, crisis_resources) = crisis::apply(body, classification.urgency);
        self.record(text, &classification, &final_text).await;

        let (suggestions, follow_up_questions) = match disposition {
            Disposition::Refused => (Vec::new(), Vec::new()),
            Disposition::Answered | Disposition::Fallback => {
                suggestions::for_classification(&classification)
            }
        };

        Reply {
            text: final_text,
            classification,
            disposition,
            crisis_resources,
            suggestions,
            follow_up_questions,
        }
    }

    fn note_event(&mut self, text: &str) {
        if let Some(note) = events::detect(text, Local::now().date_naive(), Utc::now()) {
            let (kind, date) = (note.kind.clone(), note.date);
            if self.profile.note_event(note) {
                debug!(kind = %kind, %date, "Noted upcoming event");
            }
        }
    }

    async fn generate(
        &self,
        request: Request,
        on_delta: Option<&mut OnDelta<'_>>,
    ) -> Result<String, LlmError> {
        match on_delta {
            Some(on_delta) => self.model.complete_streaming(request, on_delta).await,
            None => self.model.complete(request).await,
        }
    }

    fn build_request(&self, text: &str, classification: &Classification) -> Request {
        let system = system_instruction(&PromptContext {
            profile: &self.profile,
            summary: self.log.summary().map(|t| t.text.as_str()),
            classification,
            now: Utc::now(),
        });

        let mut messages: Vec<Message> = self
            .log
            .get_recent(self.config.history.recent_context)
            .filter(|t| !t.is_summary)
            .map(|t| match t.speaker {
                Speaker::User => Message::user(t.text.as_str()),
                Speaker::Assistant => Message::model(t.text.as_str()),
            })
            .collect();
        // Contents must open with a user turn.
        let leading_model = messages
            .iter()
            .take_while(|m| m.role == Role::Model)
            .count();
        messages.drain(..leading_model);
        messages.push(Message::user(text));

        Request::new(messages)
            .with_model(self.config.model.as_str())
            .with_system(system)
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature)
    }

    async fn record(&mut self, text: &str, classification: &Classification, reply: &str) {
        let user_turn = Turn::user(text).with_emotion(classification.emotion);
        self.log.append(user_turn, self.summarizer.as_ref()).await;
        self.log
            .append(Turn::assistant(reply), self.summarizer.as_ref())
            .await;

        self.profile.last_interaction = Some(Utc::now());
        if classification.emotion.is_negative()
            && self.profile.add_concern(classification.emotion.as_str())
        {
            debug!(concern = %classification.emotion, "Recorded new concern");
        }
    }

    fn fallback_text(&self) -> String {
        format!(
            "Hey {}, I'm having trouble processing that right now, but I'm still here for you. \
             Could you try saying that again in a moment?",
            self.profile.display_name()
        )
    }

    /// A once-a-day greeting, or `None` if today's check-in already happened.
    pub async fn daily_check_in(&mut self) -> Option<String> {
        self.check_in_on(Local::now().date_naive()).await
    }

    async fn check_in_on(&mut self, today: NaiveDate) -> Option<String> {
        if !self.profile.needs_check_in(today) {
            return None;
        }

        let due = self
            .profile
            .due_event(today)
            .map(|(note, timing)| (note.clone(), timing));
        let (system, about) = check_in_request(&self.profile, due.as_ref(), Utc::now());
        let request = Request::new(vec![Message::user(about)])
            .with_model(self.config.model.as_str())
            .with_system(system)
            .with_max_tokens(200)
            .with_temperature(self.config.temperature);

        let name = self.profile.display_name().to_string();
        let greeting = match self.model.complete(request).await {
            Ok(text) => text.trim().trim_matches('"').to_string(),
            Err(e) => {
                warn!(error = %e, "Check-in generation failed, using default greeting");
                match &due {
                    Some((note, timing)) => note.fallback_greeting(&name, *timing),
                    None => format!("Hey {name}, just checking in. How are you feeling today?"),
                }
            }
        };

        if let Some((note, _)) = &due {
            self.profile.mark_followed_up(&note.kind, note.date);
        }
        self.profile.prune_events(today);
        self.profile.last_check_in = Some(today);
        self.log
            .append(Turn::assistant(greeting.as_str()), self.summarizer.as_ref())
            .await;
        Some(greeting)
    }

    /// Drop the conversation and start fresh. The profile is kept.
    pub fn clear_history(&mut self) {
        self.log.clear();
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.profile.set_name(name);
    }

    pub fn add_concern(&mut self, concern: impl AsRef<str>) -> bool {
        self.profile.add_concern(concern)
    }

    pub fn set_preference(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        self.profile.set_preference(key, value);
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn config(&self) -> &CompanionConfig {
        &self.config
    }
}
