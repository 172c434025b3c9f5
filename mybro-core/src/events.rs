//! Important events the user mentions, remembered for a later check-in.
//!
//! Detection is rules-based: a message has to name an event kind ("exam",
//! "interview", ...) and carry a timing word ("tomorrow", "next friday",
//! ...). Anything vaguer is ignored.

use crate::text::Words;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Event kinds and the words that name them, checked in this order.
const EVENT_KINDS: &[(&str, &[&str])] = &[
    ("interview", &["interview", "job interview"]),
    ("exam", &["exam", "exams", "midterm", "midterms", "finals", "test"]),
    (
        "appointment",
        &["appointment", "doctor's appointment", "therapy session", "surgery"],
    ),
    ("presentation", &["presentation", "speech", "pitch"]),
    ("deadline", &["deadline"]),
    ("meeting", &["meeting", "performance review"]),
    ("date", &["first date", "a date"]),
    ("party", &["party", "wedding", "birthday"]),
];

const WEEKDAYS: &[(&str, Weekday)] = &[
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

/// How many pending events a profile keeps.
pub const MAX_EVENTS: usize = 10;

/// Something coming up (or just past) worth asking about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventNote {
    /// Event kind, e.g. `exam`.
    pub kind: String,
    /// The message it was mentioned in.
    pub description: String,
    pub date: NaiveDate,
    pub mentioned_at: DateTime<Utc>,
    #[serde(default)]
    pub followed_up: bool,
}

/// Where an event sits relative to today, if it is close enough to ask about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    Yesterday,
    Today,
    /// Days until the event, 1 or 2.
    Upcoming(i64),
}

impl FollowUp {
    /// The follow-up window: yesterday through two days ahead.
    pub fn for_date(date: NaiveDate, today: NaiveDate) -> Option<Self> {
        match (date - today).num_days() {
            -1 => Some(FollowUp::Yesterday),
            0 => Some(FollowUp::Today),
            d @ 1..=2 => Some(FollowUp::Upcoming(d)),
            _ => None,
        }
    }
}

impl fmt::Display for FollowUp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FollowUp::Yesterday => write!(f, "yesterday"),
            FollowUp::Today => write!(f, "today"),
            FollowUp::Upcoming(1) => write!(f, "tomorrow"),
            FollowUp::Upcoming(d) => write!(f, "in {d} days"),
        }
    }
}

impl EventNote {
    /// Plain greeting used when the model can't write one.
    pub fn fallback_greeting(&self, name: &str, timing: FollowUp) -> String {
        match timing {
            FollowUp::Yesterday => {
                format!("Hey {name}! How did your {} go yesterday?", self.kind)
            }
            FollowUp::Today => format!(
                "Hey {name}! Today's the day for your {}. How are you feeling?",
                self.kind
            ),
            FollowUp::Upcoming(_) => format!(
                "Hey {name}! How are you feeling about your {} {timing}?",
                self.kind
            ),
        }
    }
}

/// Look for an event with a date in `text`.
pub fn detect(text: &str, today: NaiveDate, now: DateTime<Utc>) -> Option<EventNote> {
    let words = Words::new(text);
    let kind = EVENT_KINDS
        .iter()
        .find(|(_, names)| words.first_match(*names).is_some())
        .map(|(kind, _)| *kind)?;
    let date = event_date(&words, today)?;

    Some(EventNote {
        kind: kind.to_string(),
        description: text.trim().to_string(),
        date,
        mentioned_at: now,
        followed_up: false,
    })
}

fn event_date(words: &Words, today: NaiveDate) -> Option<NaiveDate> {
    if words.contains_phrase("tomorrow") {
        return Some(today + Duration::days(1));
    }
    if words.contains_phrase("yesterday") {
        return Some(today - Duration::days(1));
    }
    if words.contains_phrase("today") || words.contains_phrase("tonight") {
        return Some(today);
    }
    if words.contains_phrase("this weekend") {
        let from_monday = i64::from(today.weekday().num_days_from_monday());
        return Some(today + Duration::days((5 - from_monday).max(0)));
    }
    if words.contains_phrase("next week") {
        return Some(today + Duration::days(7));
    }
    if words.contains_phrase("next month") {
        return Some(today + Duration::days(30));
    }

    WEEKDAYS
        .iter()
        .find(|(name, _)| {
            words.contains_phrase(&format!("next {name}"))
                || words.contains_phrase(&format!("on {name}"))
                || words.contains_phrase(&format!("this {name}"))
        })
        .map(|(_, weekday)| {
            let ahead = i64::from(weekday.num_days_from_monday())
                - i64::from(today.weekday().num_days_from_monday());
            let ahead = if ahead <= 0 { ahead + 7 } else { ahead };
            today + Duration::days(ahead)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    // A Wednesday.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 4).unwrap()
    }

    fn detect_on(text: &str) -> Option<EventNote> {
        detect(text, today(), Utc::now())
    }

    #[test]
    fn test_event_with_timing() {
        let note = detect_on("I have a job interview tomorrow and I'm nervous").unwrap();
        assert_eq!(note.kind, "interview");
        assert_eq!(note.date, today() + Duration::days(1));
        assert!(!note.followed_up);
        assert!(note.description.contains("job interview"));

        let note = detect_on("my chem exam was yesterday").unwrap();
        assert_eq!(note.kind, "exam");
        assert_eq!(note.date, today() - Duration::days(1));
    }

    #[test]
    fn test_weekday_timing() {
        let note = detect_on("presentation next friday").unwrap();
        assert_eq!(note.date, NaiveDate::from_ymd_opt(2025, 6, 6).unwrap());

        // Same weekday means a week out.
        let note = detect_on("doctor's appointment on wednesday").unwrap();
        assert_eq!(note.date, NaiveDate::from_ymd_opt(2025, 6, 11).unwrap());

        let note = detect_on("going to a party this weekend").unwrap();
        assert_eq!(note.date, NaiveDate::from_ymd_opt(2025, 6, 7).unwrap());
    }

    #[test]
    fn test_needs_both_kind_and_timing() {
        assert!(detect_on("exams stress me out").is_none());
        assert!(detect_on("I feel awful today").is_none());
        assert!(detect_on("the meeting went badly").is_none());
    }

    #[test]
    fn test_follow_up_window() {
        let t = today();
        assert_eq!(FollowUp::for_date(t - Duration::days(1), t), Some(FollowUp::Yesterday));
        assert_eq!(FollowUp::for_date(t, t), Some(FollowUp::Today));
        assert_eq!(FollowUp::for_date(t + Duration::days(2), t), Some(FollowUp::Upcoming(2)));
        assert_eq!(FollowUp::for_date(t + Duration::days(3), t), None);
        assert_eq!(FollowUp::for_date(t - Duration::days(2), t), None);
        assert_eq!(FollowUp::Upcoming(1).to_string(), "tomorrow");
        assert_eq!(FollowUp::Upcoming(2).to_string(), "in 2 days");
    }

    #[test]
    fn test_fallback_greeting() {
        let note = detect_on("my exam is tomorrow").unwrap();
        assert_eq!(
            note.fallback_greeting("Sam", FollowUp::Yesterday),
            "Hey Sam! How did your exam go yesterday?"
        );
        assert_eq!(
            note.fallback_greeting("Sam", FollowUp::Upcoming(1)),
            "Hey Sam! How are you feeling about your exam tomorrow?"
        );
    }
}
