//! Content normalization and whitespace tokenization.

use std::borrow::Cow;

/// Applies the run's case policy to content, terms and tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Normalizer {
    case_insensitive: bool,
}

impl Normalizer {
    pub fn new(case_insensitive: bool) -> Self {
        Self { case_insensitive }
    }

    /// Lowercases `text` when the search is case-insensitive, borrowing it
    /// untouched otherwise.
    pub fn normalize<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if self.case_insensitive {
            Cow::Owned(text.to_lowercase())
        } else {
            Cow::Borrowed(text)
        }
    }

    /// Normalizes a line and hands each of its tokens to `f`.
    pub fn for_each_token<F>(&self, line: &str, mut f: F)
    where
        F: FnMut(&str),
    {
        let line = self.normalize(line);
        for token in tokens(&line) {
            f(token);
        }
    }
}

/// Splits text into maximal runs of non-whitespace.
///
/// Leading, trailing and repeated whitespace never yields empty tokens.
pub fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
}
