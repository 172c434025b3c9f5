//! Word-level phrase matching shared by the classifier and the topic filter.

/// A message split into lowercase words.
///
/// Words are runs of alphanumerics and apostrophes, so "self-harm" is the two
/// words `self harm` and "can’t" normalizes to `can't`.
#[derive(Debug, Clone)]
pub(crate) struct Words {
    words: Vec<String>,
}

impl Words {
    pub fn new(text: &str) -> Self {
        let words = text
            .to_lowercase()
            .replace(['\u{2019}', '\u{2018}'], "'")
            .split(|c: char| !(c.is_alphanumeric() || c == '\''))
            .map(|w| w.trim_matches('\''))
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        Self { words }
    }

    /// True if `phrase` occurs as a run of whole words.
    pub fn contains_phrase(&self, phrase: &str) -> bool {
        let needle = Words::new(phrase).words;
        if needle.is_empty() || needle.len() > self.words.len() {
            return false;
        }
        self.words
            .windows(needle.len())
            .any(|window| window == needle.as_slice())
    }

    /// The first phrase from `phrases` that occurs in the text.
    pub fn first_match<'a, I, S>(&self, phrases: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a S>,
        S: AsRef<str> + ?Sized + 'a,
    {
        phrases
            .into_iter()
            .map(|phrase| <S as AsRef<str>>::as_ref(phrase))
            .find(|phrase| self.contains_phrase(phrase))
    }
}
