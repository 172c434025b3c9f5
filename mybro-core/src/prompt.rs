//! System instruction assembly.

use crate::classifier::{Classification, Urgency};
use crate::events::{EventNote, FollowUp};
use crate::profile::UserProfile;
use chrono::{DateTime, Utc};

/// Everything the system instruction is built from.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub profile: &'a UserProfile,
    pub summary: Option<&'a str>,
    pub classification: &'a Classification,
    pub now: DateTime<Utc>,
}

/// Build the system instruction for one reply.
pub fn system_instruction(ctx: &PromptContext<'_>) -> String {
    let mut prompt = String::new();

    prompt.push_str(include_str!("prompts/persona.txt"));

    prompt.push_str("\n\n");
    prompt.push_str(include_str!("prompts/time_awareness.txt"));
    prompt.push_str("\n");
    prompt.push_str(&time_context(ctx.profile.last_interaction, ctx.now));

    prompt.push_str("\n\n## About them\n");
    prompt.push_str(&profile_section(ctx.profile));

    if let Some(summary) = ctx.summary {
        prompt.push_str("\n\n## Earlier in this conversation\n");
        prompt.push_str(summary);
    }

    let c = ctx.classification;
    prompt.push_str("\n\n## Right now\n");
    prompt.push_str(&format!(
        "Detected emotion: {}. Urgency: {}/5.\n",
        c.emotion, c.urgency
    ));
    prompt.push_str(urgency_guidance(c.urgency));

    prompt
}

/// How long since the last conversation, phrased for the model.
pub fn time_context(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(last) = last else {
        return "This is your first conversation with them.".to_string();
    };

    let elapsed = now.signed_duration_since(last);
    let days = elapsed.num_days();
    let hours = elapsed.num_hours();

    match days {
        d if d >= 3 => format!(
            "Last conversation was {d} days ago. They have been away a while, say you're glad they're back."
        ),
        d if d >= 1 => {
            let when = if d == 1 { "yesterday".to_string() } else { format!("{d} days ago") };
            format!("Last conversation was {when}.")
        }
        _ if hours >= 1 => format!("Last conversation was {hours} hour(s) ago, earlier today."),
        _ => "You were talking with them just a few minutes ago.".to_string(),
    }
}

fn profile_section(profile: &UserProfile) -> String {
    let mut section = match &profile.name {
        Some(name) => format!("They like to be called {name}."),
        None => "You don't know their name yet. Call them \"friend\".".to_string(),
    };

    if !profile.known_concerns.is_empty() {
        let concerns: Vec<&str> = profile.known_concerns.iter().map(String::as_str).collect();
        section.push_str(&format!(
            "\nThings they've been dealing with: {}.",
            concerns.join(", ")
        ));
    }

    if !profile.preferences.is_empty() {
        let prefs: Vec<String> = profile
            .preferences
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect();
        section.push_str(&format!("\nTheir preferences: {}.", prefs.join("; ")));
    }

    section
}

/// Tone guidance for an urgency level.
pub fn urgency_guidance(urgency: Urgency) -> &'static str {
    match urgency.get() {
        1 | 2 => "Keep it relaxed and supportive. Match their energy and don't overreact.",
        3 => "They are struggling. Show more concern, ask what's going on, and stay calm and steady.",
        4 => "They may be hurting themselves or in acute panic. Be protective and grounding, \
              help them slow down, and gently encourage them to reach out to someone they trust.",
        _ => "They have described a plan to end their life. Be protective and direct: tell them \
              you want them safe today and urge them to contact a crisis line or emergency \
              services right now. Crisis contact details are added after your reply, so don't \
              repeat the full list.",
    }
}

/// System instruction and user message for a daily check-in greeting.
///
/// When `event` is set the greeting should ask about it.
pub fn check_in_request(
    profile: &UserProfile,
    event: Option<&(EventNote, FollowUp)>,
    now: DateTime<Utc>,
) -> (String, String) {
    let mut about = format!("Name: {}.", profile.display_name());
    if !profile.known_concerns.is_empty() {
        let concerns: Vec<&str> = profile.known_concerns.iter().map(String::as_str).collect();
        about.push_str(&format!(" Recently dealing with: {}.", concerns.join(", ")));
    }
    about.push(' ');
    about.push_str(&time_context(profile.last_interaction, now));

    if let Some((note, timing)) = event {
        let when = match timing {
            FollowUp::Yesterday => "was yesterday, ask how it went",
            FollowUp::Today => "is today, ask how it's going or how it went",
            FollowUp::Upcoming(_) => "is coming up, ask how they're feeling about it",
        };
        about.push_str(&format!(
            "\nImportant event: their {} ({timing}) {when}. They said: \"{}\"",
            note.kind, note.description
        ));
    }

    (include_str!("prompts/check_in.txt").to_string(), about)
}
