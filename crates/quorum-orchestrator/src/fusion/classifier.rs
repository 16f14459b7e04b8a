//! Topical prompt classification for fusion mode.
//!
//! Deliberately naive substring matching against fixed keyword sets. The
//! category enumeration order is the tie-break: the first category with
//! the highest hit count wins, and zero hits everywhere falls back to
//! `General`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Topical category of a fusion prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptCategory {
    /// Stories, poems, imaginative writing.
    Creative,
    /// Explanations of systems and concepts.
    Technical,
    /// Code generation and debugging.
    Code,
    /// Everything else.
    General,
}

impl PromptCategory {
    /// Categories in tie-break order.
    pub const ALL: [PromptCategory; 4] = [
        PromptCategory::Creative,
        PromptCategory::Technical,
        PromptCategory::Code,
        PromptCategory::General,
    ];

    /// The category's fixed keyword set.
    #[must_use]
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            PromptCategory::Creative => {
                &["story", "poem", "creative", "imagine", "write a", "fiction", "song"]
            }
            PromptCategory::Technical => {
                &["explain", "architecture", "system", "protocol", "how does", "technical"]
            }
            PromptCategory::Code => {
                &["code", "function", "debug", "implement", "program", "script", "algorithm"]
            }
            PromptCategory::General => &["help", "tell me", "what", "question"],
        }
    }

    /// Number of this category's keywords present in the lowercased
    /// prompt, alongside the keyword set size.
    #[must_use]
    pub fn keyword_hits(&self, lower_prompt: &str) -> (usize, usize) {
        let keywords = self.keywords();
        let matched = keywords.iter().filter(|kw| lower_prompt.contains(*kw)).count();
        (matched, keywords.len())
    }
}

impl fmt::Display for PromptCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PromptCategory::Creative => "creative",
            PromptCategory::Technical => "technical",
            PromptCategory::Code => "code",
            PromptCategory::General => "general",
        };
        f.write_str(s)
    }
}

/// The classifier's reading of one fusion prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptAnalysis {
    /// Winning topical category.
    pub category: PromptCategory,
    /// `min(matchCount / 3, 1)`.
    pub confidence: f64,
    /// Crude lexicon-based sentiment in [-1, 1].
    pub sentiment: f64,
    /// Top-3 frequent words longer than 3 characters.
    pub topics: Vec<String>,
}

const STOP_WORDS: [&str; 24] = [
    "about", "after", "also", "been", "before", "being", "could", "does", "from", "have", "into",
    "just", "like", "more", "please", "should", "some", "than", "that", "them", "this", "what",
    "with", "would",
];

const POSITIVE_WORDS: [&str; 8] =
    ["good", "great", "love", "best", "amazing", "excellent", "happy", "wonderful"];

const NEGATIVE_WORDS: [&str; 8] =
    ["bad", "wrong", "hate", "worst", "terrible", "broken", "awful", "fail"];

/// Classifies a prompt into a [`PromptAnalysis`].
#[must_use]
pub fn classify(prompt: &str) -> PromptAnalysis {
    let lower = prompt.to_lowercase();

    let mut best = PromptCategory::General;
    let mut best_hits = 0usize;
    for category in PromptCategory::ALL {
        let (hits, _) = category.keyword_hits(&lower);
        if hits > best_hits {
            best = category;
            best_hits = hits;
        }
    }

    PromptAnalysis {
        category: best,
        confidence: (best_hits as f64 / 3.0).min(1.0),
        sentiment: sentiment(&lower),
        topics: extract_topics(&lower),
    }
}

/// Top-3 frequent words longer than 3 characters, stop words excluded.
/// Ties break by word length (longer first), then by first occurrence.
fn extract_topics(lower: &str) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();

    for raw in lower.split_whitespace() {
        let word: String = raw.chars().filter(|c| c.is_alphanumeric()).collect();
        if word.len() <= 3 || STOP_WORDS.contains(&word.as_str()) {
            continue;
        }
        if let Some(pos) = order.iter().position(|w| *w == word) {
            counts[pos] += 1;
        } else {
            order.push(word);
            counts.push(1);
        }
    }

    let mut indexed: Vec<usize> = (0..order.len()).collect();
    indexed.sort_by(|&a, &b| {
        counts[b]
            .cmp(&counts[a])
            .then_with(|| order[b].len().cmp(&order[a].len()))
            .then_with(|| a.cmp(&b))
    });

    indexed.into_iter().take(3).map(|i| order[i].clone()).collect()
}

fn sentiment(lower: &str) -> f64 {
    let positive = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count() as f64;
    let negative = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count() as f64;
    if positive + negative == 0.0 {
        0.0
    } else {
        (positive - negative) / (positive + negative)
    }
}
