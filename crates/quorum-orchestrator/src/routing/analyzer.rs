//! Prompt analysis for routing decisions.
//!
//! The analyzer is a pure function over the prompt text: keyword scans
//! decide the complexity tier (falling back to sentence/term heuristics),
//! a substring map marks required features, and a crude word-count formula
//! estimates tokens. No I/O, deterministic for a given input.

use crate::registry::Feature;
use crate::routing::types::{ResponseType, RoutePriority, TaskAnalysis, TaskComplexity};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Complexity keyword tiers, scanned in declaration order. The first tier
/// with any substring hit wins, so a prompt matching both "what is" and
/// "prove" still resolves to `Simple`.
const COMPLEXITY_KEYWORDS: [(TaskComplexity, &[&str]); 4] = [
    (
        TaskComplexity::Simple,
        &["what is", "who is", "define", "hello", "thanks", "translate", "convert"],
    ),
    (
        TaskComplexity::Moderate,
        &["explain", "compare", "summarize", "describe", "how does", "walk me through"],
    ),
    (
        TaskComplexity::Complex,
        &["design", "implement", "architect", "refactor", "build a", "integrate", "debug"],
    ),
    (
        TaskComplexity::Expert,
        &["prove", "formally verify", "distributed consensus", "cryptographic", "theorem"],
    ),
];

/// Feature requirement keywords, matched as substrings of the lowercased
/// prompt.
const FEATURE_KEYWORDS: [(Feature, &[&str]); 5] = [
    (Feature::ToolUse, &["use tools", "browse the web", "search the web", "look up online"]),
    (Feature::CodeInterpreter, &["run this code", "execute the code", "run the script"]),
    (Feature::StructuredOutput, &["as json", "in json", "as a table", "as csv", "structured output"]),
    (Feature::Retrieval, &["from the document", "from my documents", "knowledge base", "this pdf"]),
    (Feature::FunctionCalling, &["call the function", "call the api", "invoke the api"]),
];

const SPEED_KEYWORDS: [&str; 6] = ["quick", "quickly", "fast", "briefly", "short answer", "asap"];

const QUALITY_KEYWORDS: [&str; 6] =
    ["detailed", "thorough", "comprehensive", "in depth", "in-depth", "high quality"];

static TECHNICAL_TERM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(algorithm|database|server|protocol|compiler|kernel|thread|concurrency|encryption|latency|schema|api|runtime|framework|container|pipeline|deployment)\b",
    )
    .expect("technical term regex is valid")
});

static REQUIREMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(must|should|need|require|specify)\b").expect("requirement regex is valid"));

/// Pure prompt analyzer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskAnalyzer;

impl TaskAnalyzer {
    /// Creates a new analyzer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Analyzes a prompt into a [`TaskAnalysis`].
    #[must_use]
    pub fn analyze(&self, prompt: &str, response_type: ResponseType) -> TaskAnalysis {
        let lower = prompt.to_lowercase();

        let complexity = Self::classify_complexity(&lower);
        let required_features = Self::required_features(&lower);
        let estimated_tokens = estimate_token_count(prompt);
        let priority = Self::priority(&lower, complexity);

        debug!(
            %response_type,
            %complexity,
            estimated_tokens,
            features = required_features.len(),
            "Analyzed prompt"
        );

        TaskAnalysis {
            prompt: prompt.to_string(),
            response_type,
            complexity,
            required_features,
            estimated_tokens,
            priority,
        }
    }

    fn classify_complexity(lower: &str) -> TaskComplexity {
        for (complexity, keywords) in COMPLEXITY_KEYWORDS {
            if keywords.iter().any(|kw| lower.contains(kw)) {
                return complexity;
            }
        }
        Self::heuristic_complexity(lower)
    }

    /// Fallback when no keyword tier matched: sentence length, technical
    /// term density, and requirement-indicator counts with fixed
    /// thresholds.
    fn heuristic_complexity(lower: &str) -> TaskComplexity {
        let words_per_sentence = average_words_per_sentence(lower);
        let technical_terms = TECHNICAL_TERM_RE.find_iter(lower).count();
        let requirement_words = REQUIREMENT_RE.find_iter(lower).count();

        if words_per_sentence > 20.0 || technical_terms > 3 || requirement_words > 3 {
            TaskComplexity::Complex
        } else if words_per_sentence > 15.0 || technical_terms > 1 || requirement_words > 1 {
            TaskComplexity::Moderate
        } else {
            TaskComplexity::Simple
        }
    }

    fn required_features(lower: &str) -> Vec<Feature> {
        FEATURE_KEYWORDS
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|kw| lower.contains(kw)))
            .map(|(feature, _)| *feature)
            .collect()
    }

    /// Speed wins whenever speed words appear without quality words,
    /// even for complex prompts; quality then covers quality words or
    /// high complexity.
    fn priority(lower: &str, complexity: TaskComplexity) -> RoutePriority {
        let wants_speed = SPEED_KEYWORDS.iter().any(|kw| lower.contains(kw));
        let wants_quality = QUALITY_KEYWORDS.iter().any(|kw| lower.contains(kw));

        if wants_speed && !wants_quality {
            RoutePriority::Speed
        } else if wants_quality || complexity >= TaskComplexity::Complex {
            RoutePriority::Quality
        } else {
            RoutePriority::Balanced
        }
    }
}

/// Estimates token count as `ceil(words * 1.3)`.
#[must_use]
pub fn estimate_token_count(prompt: &str) -> u32 {
    let words = prompt.split_whitespace().count();
    (words as f64 * 1.3).ceil() as u32
}

fn average_words_per_sentence(text: &str) -> f64 {
    let sentences = text.split(['.', '!', '?']).filter(|s| !s.trim().is_empty()).count().max(1);
    let words = text.split_whitespace().count();
    words as f64 / sentences as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_complexity_first_match_wins() {
        let analyzer = TaskAnalyzer::new();
        // Matches both the simple tier ("what is") and the expert tier
        // ("theorem"); the simple tier is scanned first.
        let analysis =
            analyzer.analyze("What is the four color theorem?", ResponseType::General);
        assert_eq!(analysis.complexity, TaskComplexity::Simple);
    }

    #[test]
    fn test_keyword_complexity_tiers() {
        let analyzer = TaskAnalyzer::new();
        assert_eq!(
            analyzer.analyze("Explain garbage collection", ResponseType::Technical).complexity,
            TaskComplexity::Moderate
        );
        assert_eq!(
            analyzer.analyze("Design a rate limiter", ResponseType::Coding).complexity,
            TaskComplexity::Complex
        );
        assert_eq!(
            analyzer
                .analyze("Prove this scheme is cryptographic secure", ResponseType::Technical)
                .complexity,
            TaskComplexity::Expert
        );
    }

    #[test]
    fn test_heuristic_fallback_technical_terms() {
        let analyzer = TaskAnalyzer::new();
        // No tier keyword, but four technical terms pushes it to complex.
        let analysis = analyzer.analyze(
            "The server talks a custom protocol over the api and stores rows in the database via a pipeline",
            ResponseType::Technical,
        );
        assert_eq!(analysis.complexity, TaskComplexity::Complex);
    }

    #[test]
    fn test_heuristic_fallback_simple() {
        let analyzer = TaskAnalyzer::new();
        let analysis = analyzer.analyze("Tell me a joke", ResponseType::General);
        assert_eq!(analysis.complexity, TaskComplexity::Simple);
    }

    #[test]
    fn test_estimate_token_count_exact() {
        assert_eq!(estimate_token_count("hello"), 2); // ceil(1 * 1.3)
        let ten = "a b c d e f g h i j";
        assert_eq!(estimate_token_count(ten), 13); // ceil(10 * 1.3)
        let hundred = vec!["word"; 100].join(" ");
        assert_eq!(estimate_token_count(&hundred), 130); // ceil(100 * 1.3)
    }

    #[test]
    fn test_estimate_token_count_monotonic() {
        let mut last = 0;
        for n in 1..50 {
            let prompt = vec!["w"; n].join(" ");
            let estimate = estimate_token_count(&prompt);
            assert!(estimate >= last);
            last = estimate;
        }
    }

    #[test]
    fn test_required_features() {
        let analyzer = TaskAnalyzer::new();
        let analysis = analyzer.analyze(
            "Give me the results as JSON after you search the web",
            ResponseType::Data,
        );
        assert!(analysis.required_features.contains(&Feature::StructuredOutput));
        assert!(analysis.required_features.contains(&Feature::ToolUse));
        assert!(!analysis.required_features.contains(&Feature::Retrieval));
    }

    #[test]
    fn test_priority_speed_vs_quality() {
        let analyzer = TaskAnalyzer::new();
        assert_eq!(
            analyzer.analyze("Give me a quick answer", ResponseType::General).priority,
            RoutePriority::Speed
        );
        assert_eq!(
            analyzer.analyze("Give me a quick but thorough answer", ResponseType::General).priority,
            RoutePriority::Quality
        );
        assert_eq!(
            analyzer.analyze("Tell me about cats", ResponseType::General).priority,
            RoutePriority::Balanced
        );
        // A speed word with no quality word wins even on a complex prompt.
        assert_eq!(
            analyzer.analyze("Quickly design a cache", ResponseType::Coding).priority,
            RoutePriority::Speed
        );
        // Without speed words, high complexity alone forces quality.
        assert_eq!(
            analyzer.analyze("Design a cache", ResponseType::Coding).priority,
            RoutePriority::Quality
        );
    }
}
