//! Static prompt and suggestion tables.
//!
//! Two-level lookup keyed by (provider, category). Selection never fails: a
//! category with no entry in a provider's table degrades to that provider's
//! default template.

use crate::classify::Category;
use crate::providers::ProviderId;

const CLAUDE_ARCHITECTURE: &str = "You are an expert software architect. Analyze architectural \
     decisions, recommend proven patterns, and assess scalability and performance.";
const CLAUDE_TECHNOLOGY: &str = "You are a technology consultant. Help choose tech stacks, \
     compare approaches, and weigh the pros and cons of each option.";
const CLAUDE_GENERAL: &str = "You are a senior technical consultant. Answer in a structured way \
     and give practical advice.";

const DEEPSEEK_PROGRAMMING: &str = "You are an expert programmer. Write clean, efficient code, \
     optimize algorithms and follow established best practices.";
const DEEPSEEK_CODE_REVIEW: &str = "You are a code reviewer. Analyze code for quality, security \
     and performance, and propose concrete improvements.";
const DEEPSEEK_DEBUGGING: &str = "You are a debugging expert. Help locate and fix defects and \
     explain their root causes.";

const DASHKA_SUPPORT: &str = "You are a technical support specialist. Diagnose problems \
     systematically and propose step-by-step solutions.";
const DASHKA_EMERGENCY: &str = "You are an emergency support specialist. Prioritize critical \
     problems and give fast, actionable fixes.";

/// Select the instruction template for a classified request.
pub fn select_prompt(provider: ProviderId, category: Category) -> &'static str {
    match provider {
        ProviderId::Claude => match category {
            Category::Architecture => CLAUDE_ARCHITECTURE,
            Category::Technology => CLAUDE_TECHNOLOGY,
            _ => CLAUDE_GENERAL,
        },
        ProviderId::DeepSeek => match category {
            Category::CodeReview => DEEPSEEK_CODE_REVIEW,
            Category::Debugging => DEEPSEEK_DEBUGGING,
            _ => DEEPSEEK_PROGRAMMING,
        },
        ProviderId::Dashka => match category {
            Category::Emergency => DASHKA_EMERGENCY,
            _ => DASHKA_SUPPORT,
        },
    }
}

/// Fixed per-category follow-up suggestions used during enrichment.
/// At most three entries.
pub fn suggestions_for(provider: ProviderId, category: Category) -> Vec<String> {
    let entries: &[&str] = match provider {
        ProviderId::Claude => match category {
            Category::Architecture => &[
                "Consider scaling patterns",
                "Analyze performance requirements",
                "Assess maintenance complexity",
            ],
            Category::Technology => &[
                "Compare the performance of each option",
                "Evaluate ecosystem and support",
                "Check compatibility with the current stack",
            ],
            _ => &[],
        },
        ProviderId::DeepSeek => &[
            "Add unit tests",
            "Check the algorithm's performance",
            "Consider edge-case handling",
        ],
        ProviderId::Dashka => &[
            "Check the system logs",
            "Monitor server resources",
            "Create a backup before making changes",
        ],
    };
    entries.iter().take(3).map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_is_total_for_every_pair() {
        for provider in ProviderId::ALL {
            for category in [
                Category::Architecture,
                Category::Technology,
                Category::General,
                Category::Programming,
                Category::Debugging,
                Category::CodeReview,
                Category::Support,
                Category::Emergency,
            ] {
                assert!(!select_prompt(provider, category).is_empty());
            }
        }
    }

    #[test]
    fn unknown_category_degrades_to_provider_default() {
        assert_eq!(select_prompt(ProviderId::Claude, Category::Support), CLAUDE_GENERAL);
        assert_eq!(select_prompt(ProviderId::DeepSeek, Category::Architecture), DEEPSEEK_PROGRAMMING);
        assert_eq!(select_prompt(ProviderId::Dashka, Category::Programming), DASHKA_SUPPORT);
    }

    #[test]
    fn suggestions_never_exceed_three() {
        for provider in ProviderId::ALL {
            for category in [Category::Architecture, Category::Technology, Category::General] {
                assert!(suggestions_for(provider, category).len() <= 3);
            }
        }
    }

    #[test]
    fn claude_general_has_no_canned_suggestions() {
        assert!(suggestions_for(ProviderId::Claude, Category::General).is_empty());
        assert_eq!(suggestions_for(ProviderId::Claude, Category::Architecture).len(), 3);
    }
}
