//! Background task that owns the chat session.
//!
//! The UI never touches the session directly: it sends [`WorkerRequest`]s and
//! renders whatever [`WorkerResponse`]s come back.

use std::collections::BTreeMap;

use mybro_core::{ChatSession, Classification, Disposition, Reply, UserProfile};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::commands::ProfileCommand;

/// Work the UI can ask for.
#[derive(Debug)]
pub enum WorkerRequest {
    Message(String),
    Profile(ProfileCommand),
    CheckIn,
    Clear,
    /// Save and stop.
    Shutdown,
}

/// What the UI needs to draw the side panel.
#[derive(Debug, Clone, Default)]
pub struct SessionView {
    pub name: String,
    pub user_id: String,
    pub concerns: Vec<String>,
    pub preferences: BTreeMap<String, String>,
    pub last_mood: Option<Classification>,
    /// Events still to ask about, as `kind (date)`.
    pub events: Vec<String>,
    /// From the latest reply.
    pub suggestions: Vec<String>,
    pub follow_up_questions: Vec<String>,
    pub turns: usize,
    pub persistent: bool,
}

impl SessionView {
    pub fn from_session(session: &ChatSession, last_reply: Option<&Reply>) -> Self {
        let profile = session.profile();
        Self {
            name: profile.display_name().to_string(),
            user_id: profile.user_id.clone(),
            concerns: profile.known_concerns.iter().cloned().collect(),
            preferences: profile.preferences.clone(),
            last_mood: last_reply.map(|r| r.classification.clone()),
            events: profile
                .events
                .iter()
                .filter(|e| !e.followed_up)
                .map(|e| format!("{} ({})", e.kind, e.date.format("%a %b %-d")))
                .collect(),
            suggestions: last_reply.map(|r| r.suggestions.clone()).unwrap_or_default(),
            follow_up_questions: last_reply
                .map(|r| r.follow_up_questions.clone())
                .unwrap_or_default(),
            turns: session.companion().log().len(),
            persistent: session.is_persistent(),
        }
    }
}

/// Events sent back to the UI.
#[derive(Debug)]
pub enum WorkerResponse {
    /// Model text as it arrives.
    Delta(String),
    /// The finished reply. Its text replaces anything streamed.
    Reply {
        text: String,
        disposition: Disposition,
        crisis_resources: bool,
    },
    CheckIn(Option<String>),
    /// A line for the conversation pane.
    Notice(String),
    /// A storage problem worth showing.
    Warning(String),
    View(SessionView),
    /// The session is saved and the worker has stopped.
    Finished,
}

/// Run until a shutdown request arrives or the UI hangs up.
pub async fn run(
    mut session: ChatSession,
    mut requests: mpsc::Receiver<WorkerRequest>,
    responses: mpsc::UnboundedSender<WorkerResponse>,
) {
    let mut last_reply: Option<Reply> = None;

    for warning in session.take_warnings() {
        let _ = responses.send(WorkerResponse::Warning(warning.to_string()));
    }
    let _ = responses.send(WorkerResponse::View(SessionView::from_session(&session, None)));

    while let Some(request) = requests.recv().await {
        debug!(?request, "Worker request");
        match request {
            WorkerRequest::Message(text) => {
                let tx = responses.clone();
                let reply = session
                    .send_streaming(&text, move |delta| {
                        let _ = tx.send(WorkerResponse::Delta(delta.to_string()));
                    })
                    .await;
                let _ = responses.send(WorkerResponse::Reply {
                    text: reply.text.clone(),
                    disposition: reply.disposition,
                    crisis_resources: reply.crisis_resources,
                });
                last_reply = Some(reply);
            }
            WorkerRequest::CheckIn => {
                let check_in = session.daily_check_in().await;
                let _ = responses.send(WorkerResponse::CheckIn(check_in));
            }
            WorkerRequest::Clear => {
                session.clear_history();
                let _ = responses.send(WorkerResponse::Notice(
                    "Conversation cleared. Your profile is still here.".into(),
                ));
            }
            WorkerRequest::Profile(command) => {
                let notice = apply_profile_command(&mut session, command);
                let _ = responses.send(WorkerResponse::Notice(notice));
            }
            WorkerRequest::Shutdown => break,
        }
        let _ = responses.send(WorkerResponse::View(SessionView::from_session(
            &session,
            last_reply.as_ref(),
        )));
    }

    for warning in session.end().await {
        let _ = responses.send(WorkerResponse::Warning(warning.to_string()));
    }
    info!("Worker stopped");
    let _ = responses.send(WorkerResponse::Finished);
}

/// Apply a profile command, returning what to tell the user.
pub fn apply_profile_command(session: &mut ChatSession, command: ProfileCommand) -> String {
    let companion = session.companion_mut();
    match command {
        ProfileCommand::Show => describe_profile(companion.profile()),
        ProfileCommand::Name(name) => {
            companion.set_name(name.as_str());
            format!("Got it, I'll call you {name}.")
        }
        ProfileCommand::Concern(concern) => {
            if companion.add_concern(&concern) {
                format!("I'll keep \"{concern}\" in mind.")
            } else {
                "I already had that one noted.".to_string()
            }
        }
        ProfileCommand::Preference { key, value } => {
            companion.set_preference(&key, value.as_str());
            format!("Noted: {key} = {value}")
        }
    }
}

pub fn describe_profile(profile: &UserProfile) -> String {
    let mut out = format!("Name: {}\n", profile.display_name());
    if profile.known_concerns.is_empty() {
        out.push_str("Concerns: none yet\n");
    } else {
        let concerns: Vec<&str> = profile.known_concerns.iter().map(String::as_str).collect();
        out.push_str(&format!("Concerns: {}\n", concerns.join(", ")));
    }
    for (key, value) in &profile.preferences {
        out.push_str(&format!("Preference: {key} = {value}\n"));
    }
    match profile.last_interaction {
        Some(at) => out.push_str(&format!(
            "Last talked: {}",
            at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
        )),
        None => out.push_str("Last talked: just now, for the first time"),
    }
    out
}
