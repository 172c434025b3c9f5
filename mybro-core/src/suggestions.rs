//! Coping suggestions and follow-up questions attached to each reply.
//!
//! Both come from fixed tables keyed by the classification.

use crate::classifier::{Classification, Emotion};

/// Most suggestions or questions offered with one reply.
pub const MAX_ITEMS: usize = 3;

const CRISIS_SUGGESTIONS: &[&str] = &[
    "Call or text 988 (US) or your local crisis line right now.",
    "Stay near someone you trust, or ask one person to come be with you.",
    "Put some distance between yourself and anything you could use to hurt yourself.",
];

const ACUTE_SUGGESTIONS: &[&str] = &[
    "Breathe in for 4 counts, hold for 4, out for 6. Repeat a few times.",
    "Name five things you can see and four you can hear around you.",
    "Text or call someone you trust and tell them you're having a hard time.",
];

fn emotion_suggestions(emotion: Emotion) -> &'static [&'static str] {
    match emotion {
        Emotion::Anxious => &[
            "Try a slow breath: in for 4, hold for 4, out for 6.",
            "Write the worry down, then one small thing you can do about it.",
            "Step outside for a five minute walk.",
        ],
        Emotion::Stressed => &[
            "Pick the one task that matters most today and let the rest wait.",
            "Take a short break away from screens.",
            "Break the big thing into a first step you can finish in ten minutes.",
        ],
        Emotion::Sad | Emotion::Hopeless => &[
            "Be gentle with yourself today. A shower or a snack counts as a win.",
            "Reach out to one person, even with a short message.",
            "Get a little daylight or fresh air if you can.",
        ],
        Emotion::Angry => &[
            "Give yourself a few minutes before responding to anyone.",
            "Move it out of your body: a brisk walk or some push-ups.",
            "Write out everything you're mad about, then decide what to keep.",
        ],
        Emotion::Lonely => &[
            "Send a message to someone you haven't talked to in a while.",
            "Spend some time somewhere with people around, like a cafe or library.",
            "Look for a club, class or online group around something you enjoy.",
        ],
        Emotion::Confused => &[
            "Write down the options you're stuck between, with one pro and con each.",
            "Talk it through with someone you trust.",
            "Sleep on it. Some decisions get clearer tomorrow.",
        ],
        Emotion::Happy | Emotion::Grateful => &[
            "Take a moment to notice what made today good.",
            "Share the good news with someone who'd be glad to hear it.",
        ],
        Emotion::Neutral => &[],
    }
}

fn emotion_questions(emotion: Emotion) -> &'static [&'static str] {
    match emotion {
        Emotion::Anxious => &[
            "What's the part of this that worries you most?",
            "Has anything helped calm you down before?",
        ],
        Emotion::Stressed => &[
            "What's taking up most of your energy right now?",
            "Is there anything you could hand off or drop?",
        ],
        Emotion::Sad | Emotion::Hopeless => &[
            "How long have you been feeling this way?",
            "Is there anyone you've been able to talk to about it?",
        ],
        Emotion::Angry => &[
            "What happened that set this off?",
            "What would feel fair to you here?",
        ],
        Emotion::Lonely => &[
            "Who do you usually feel most like yourself around?",
            "When did you last get to hang out with someone?",
        ],
        Emotion::Confused => &[
            "What would make the choice easier?",
            "What does your gut say?",
        ],
        Emotion::Happy | Emotion::Grateful => &["What's been the best part?"],
        Emotion::Neutral => &["How's your day been going?"],
    }
}

const SAFETY_QUESTIONS: &[&str] = &[
    "Are you safe right now?",
    "Is there someone who can be with you tonight?",
];

/// Suggestions and follow-up questions for a classified message.
pub fn for_classification(classification: &Classification) -> (Vec<String>, Vec<String>) {
    let urgency = classification.urgency.get();
    let suggestions = match urgency {
        5 => CRISIS_SUGGESTIONS,
        4 => ACUTE_SUGGESTIONS,
        _ => emotion_suggestions(classification.emotion),
    };
    let questions = if urgency >= 4 {
        SAFETY_QUESTIONS
    } else {
        emotion_questions(classification.emotion)
    };

    (owned(suggestions), owned(questions))
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().take(MAX_ITEMS).map(|s| s.to_string()).collect()
}
