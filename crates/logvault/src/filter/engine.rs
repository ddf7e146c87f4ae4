use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid search text: {0}")]
    InvalidPattern(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Include,
    Exclude,
}

#[derive(Debug, Default)]
pub struct FilterStats {
    pub lines_scanned: AtomicU64,
    pub lines_matched: AtomicU64,
    pub bytes_processed: AtomicU64,
}

/// Case-insensitive literal substring matcher.
///
/// The needle is matched as a fixed string, never as a regex, so user input
/// such as `a.b(` is searched for verbatim.
pub struct TextMatcher {
    needle: String,
    matcher: RegexMatcher,
    mode: FilterMode,
    stats: FilterStats,
}

impl TextMatcher {
    pub fn new(needle: &str, mode: FilterMode) -> Result<Self, FilterError> {
        let matcher = RegexMatcherBuilder::new()
            .case_insensitive(true)
            .fixed_strings(true)
            .build(needle)
            .map_err(|e| FilterError::InvalidPattern(e.to_string()))?;

        Ok(Self {
            needle: needle.to_string(),
            matcher,
            mode,
            stats: FilterStats::default(),
        })
    }

    /// Whether `text` contains the needle (Include) or lacks it (Exclude).
    #[inline]
    pub fn should_include(&self, text: &str) -> bool {
        self.stats.lines_scanned.fetch_add(1, Ordering::Relaxed);
        self.stats.bytes_processed.fetch_add(text.len() as u64, Ordering::Relaxed);

        let include = match self.mode {
            FilterMode::Include => self.contains(text),
            FilterMode::Exclude => !self.contains(text),
        };

        if include {
            self.stats.lines_matched.fetch_add(1, Ordering::Relaxed);
        }

        include
    }

    /// Plain containment test, independent of the mode.
    #[inline]
    pub fn contains(&self, text: &str) -> bool {
        self.matcher.is_match(text.as_bytes()).unwrap_or(false)
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn stats(&self) -> (u64, u64, u64) {
        (
            self.stats.lines_scanned.load(Ordering::Relaxed),
            self.stats.lines_matched.load(Ordering::Relaxed),
            self.stats.bytes_processed.load(Ordering::Relaxed),
        )
    }
}

impl fmt::Debug for TextMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextMatcher")
            .field("needle", &self.needle)
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_mode() {
        let filter = TextMatcher::new("error", FilterMode::Include).expect("Failed to create filter");

        assert!(filter.should_include("This is an error message"));
        assert!(!filter.should_include("This is a debug message"));
        assert!(filter.should_include("ERROR: Critical failure"));
    }

    #[test]
    fn test_exclude_mode() {
        let filter = TextMatcher::new("healthcheck", FilterMode::Exclude).expect("Failed to create filter");

        assert!(!filter.should_include("healthcheck: ok"));
        assert!(filter.should_include("Processing request"));
        assert!(!filter.should_include("Running HealthCheck now"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let filter = TextMatcher::new("a.b(", FilterMode::Include).expect("Failed to create filter");

        assert!(filter.should_include("call a.b(1)"));
        assert!(!filter.should_include("axb("));
    }

    #[test]
    fn test_non_ascii_case_folding() {
        let filter = TextMatcher::new("ÉCHEC", FilterMode::Include).expect("Failed to create filter");
        assert!(filter.should_include("connexion: échec"));
    }

    #[test]
    fn test_stats_tracking() {
        let filter = TextMatcher::new("test", FilterMode::Include).expect("Failed to create filter");

        filter.should_include("test message");
        filter.should_include("another message");
        filter.should_include("test again");

        let (scanned, matched, bytes) = filter.stats();
        assert_eq!(scanned, 3);
        assert_eq!(matched, 2);
        assert!(bytes > 0);
    }
}
