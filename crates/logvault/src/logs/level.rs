//! Level classification: ordered substring rules over the message text.

use super::model::Level;

/// One row of the classification table.
#[derive(Debug, Clone, Copy)]
pub struct LevelRule {
    pub level: Level,
    /// Lowercase substrings; any one of them selects `level`.
    pub patterns: &'static [&'static str],
}

/// Default table, checked top to bottom. The first rule with a matching
/// pattern wins, so "warn and error" is an error.
pub const DEFAULT_RULES: &[LevelRule] = &[
    LevelRule { level: Level::Error, patterns: &["fatal", "error", "err"] },
    LevelRule { level: Level::Warn, patterns: &["warn", "warning"] },
    LevelRule { level: Level::Debug, patterns: &["debug", "trace"] },
];

/// Level used when no rule matches.
pub const FALLBACK_LEVEL: Level = Level::Info;

/// Classify a message with the default table.
pub fn classify(message: &str) -> Level {
    classify_with(DEFAULT_RULES, message)
}

/// Classify a message against a caller-supplied table.
pub fn classify_with(rules: &[LevelRule], message: &str) -> Level {
    let lower = message.to_lowercase();
    rules
        .iter()
        .find(|rule| rule.patterns.iter().any(|p| lower.contains(p)))
        .map(|rule| rule.level)
        .unwrap_or(FALLBACK_LEVEL)
}
