//! Request classification.
//!
//! A fixed keyword heuristic, not a learned model: lower-case the text, test
//! the provider-specific keyword sets in order, first match wins, otherwise
//! fall back to the provider's default category. Pure and deterministic.

use crate::providers::ProviderId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category label assigned to a request, used for prompt selection and
/// suggestion lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Architecture,
    Technology,
    General,
    Programming,
    Debugging,
    CodeReview,
    Support,
    Emergency,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Architecture => "architecture",
            Category::Technology => "technology",
            Category::General => "general",
            Category::Programming => "programming",
            Category::Debugging => "debugging",
            Category::CodeReview => "code_review",
            Category::Support => "support",
            Category::Emergency => "emergency",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default category for a provider when no keyword set matches.
pub fn default_category(provider: ProviderId) -> Category {
    match provider {
        ProviderId::Claude => Category::General,
        ProviderId::DeepSeek => Category::Programming,
        ProviderId::Dashka => Category::Support,
    }
}

/// Classify raw request text for a provider.
pub fn classify(provider: ProviderId, text: &str) -> Category {
    let text = text.to_lowercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|kw| text.contains(kw));

    match provider {
        ProviderId::Claude => {
            if contains_any(&["architect", "design", "pattern"]) {
                Category::Architecture
            } else if contains_any(&["technolog", "stack", "compare", "choose"]) {
                Category::Technology
            } else {
                default_category(provider)
            }
        }
        ProviderId::DeepSeek => {
            if contains_any(&["code", "function", "implement"]) {
                Category::Programming
            } else if contains_any(&["error", "bug", "debug"]) {
                Category::Debugging
            } else if contains_any(&["review", "check", "analyz"]) {
                Category::CodeReview
            } else {
                default_category(provider)
            }
        }
        ProviderId::Dashka => {
            if contains_any(&["critical", "urgent", "emergency"]) {
                Category::Emergency
            } else {
                default_category(provider)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claude_detects_architecture_before_technology() {
        assert_eq!(
            classify(ProviderId::Claude, "How should I design a microservice architecture?"),
            Category::Architecture
        );
        // "design" wins even when stack keywords are also present.
        assert_eq!(
            classify(ProviderId::Claude, "Design a stack for event processing"),
            Category::Architecture
        );
        assert_eq!(
            classify(ProviderId::Claude, "Which technology should I pick?"),
            Category::Technology
        );
        assert_eq!(classify(ProviderId::Claude, "hello there"), Category::General);
    }

    #[test]
    fn deepseek_defaults_to_programming() {
        assert_eq!(
            classify(ProviderId::DeepSeek, "write a function that sorts"),
            Category::Programming
        );
        assert_eq!(
            classify(ProviderId::DeepSeek, "why does this throw an error"),
            Category::Debugging
        );
        assert_eq!(
            classify(ProviderId::DeepSeek, "please review my PR"),
            Category::CodeReview
        );
        assert_eq!(classify(ProviderId::DeepSeek, "hi"), Category::Programming);
    }

    #[test]
    fn dashka_flags_urgency() {
        assert_eq!(
            classify(ProviderId::Dashka, "URGENT: production is down"),
            Category::Emergency
        );
        assert_eq!(classify(ProviderId::Dashka, "how do I reset a password"), Category::Support);
    }

    #[test]
    fn classification_is_case_insensitive_and_deterministic() {
        let a = classify(ProviderId::Claude, "DESIGN PATTERNS");
        let b = classify(ProviderId::Claude, "design patterns");
        assert_eq!(a, b);
        assert_eq!(a, Category::Architecture);
    }

    #[test]
    fn defaults_cover_every_provider() {
        assert_eq!(default_category(ProviderId::Claude), Category::General);
        assert_eq!(default_category(ProviderId::DeepSeek), Category::Programming);
        assert_eq!(default_category(ProviderId::Dashka), Category::Support);
    }
}
