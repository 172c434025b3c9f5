//! Crisis resources gate.

use crate::classifier::Urgency;

/// Appended to every reply given at the top urgency level.
pub const CRISIS_RESOURCES: &str = "\
If you're thinking about ending your life, please reach out right now:
- Call or text 988 (Suicide & Crisis Lifeline), available 24/7
- Text HOME to 741741 (Crisis Text Line)
- Call 911 if you're in immediate danger
- Or go to your nearest emergency room
You matter, and you don't have to get through tonight alone.";

/// Attach crisis resources when `urgency` is at the crisis level.
///
/// Returns the final text and whether resources were attached.
pub fn apply(text: String, urgency: Urgency) -> (String, bool) {
    if urgency.is_crisis() {
        let mut text = text;
        text.push_str("\n\n");
        text.push_str(CRISIS_RESOURCES);
        (text, true)
    } else {
        (text, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resources_only_at_five() {
        for level in 1..=4 {
            let (text, attached) = apply("hey".into(), Urgency::new(level));
            assert_eq!(text, "hey");
            assert!(!attached);
        }

        let (text, attached) = apply("hey".into(), Urgency::new(5));
        assert!(attached);
        assert!(text.starts_with("hey\n\n"));
        assert!(text.contains("988"));
        assert!(text.contains("741741"));
        assert!(text.contains("911"));
    }
}
