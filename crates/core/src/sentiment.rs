//! Keyword/phrase feedback classifier.
//!
//! Deterministic and local: no completion call is involved. Phrases are checked
//! before single keywords so that "not helpful" is never read as praise.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const NEGATIVE_PHRASES: &[&str] =
    &["not resolved", "not helpful", "did not work", "no response", "never received"];

pub const NEGATIVE_KEYWORDS: &[&str] =
    &["issue", "problem", "bad", "poor", "slow", "delay", "confusing"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn classify(feedback: &str) -> SentimentLabel {
    let normalized = feedback.trim().to_lowercase();

    if NEGATIVE_PHRASES.iter().any(|phrase| normalized.contains(phrase)) {
        return SentimentLabel::Negative;
    }
    if NEGATIVE_KEYWORDS.iter().any(|keyword| normalized.contains(keyword)) {
        return SentimentLabel::Negative;
    }

    SentimentLabel::Positive
}

/// `"<feedback> → <label>"` per item, newline-joined, input order preserved.
pub fn label_all<S: AsRef<str>>(feedbacks: &[S]) -> String {
    feedbacks
        .iter()
        .map(|feedback| {
            let feedback = feedback.as_ref();
            format!("{feedback} → {}", classify(feedback))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
