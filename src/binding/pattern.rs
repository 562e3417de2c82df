//! Compiled step and transformation patterns.

use miette::Diagnostic;
use regex::Regex;
use thiserror::Error;

/// Errors raised when a binding pattern is not a valid regular expression.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("invalid binding pattern '{pattern}'")]
#[diagnostic(
    code(stepbind::binding::invalid_pattern),
    help("binding patterns use Rust `regex` syntax; escape literal metacharacters")
)]
pub struct PatternError {
    /// The pattern as written by the binding author.
    pub pattern: String,
    /// Underlying regex compilation error.
    #[source]
    pub source: regex::Error,
}

/// A regular expression that must match the whole input.
///
/// Authors may write explicit `^`/`$` anchors; they are accepted and the
/// pattern is anchored either way.
#[derive(Debug, Clone)]
pub struct StepPattern {
    source: String,
    regex: Regex,
}

impl StepPattern {
    /// Compile `pattern` for full-string matching.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] when the regex does not compile.
    ///
    /// # Examples
    ///
    /// ```
    /// use stepbind::binding::StepPattern;
    ///
    /// let pattern = StepPattern::new("I have (\\d+) cukes").expect("valid");
    /// assert_eq!(pattern.captures("I have 42 cukes"), Some(vec!["42".to_owned()]));
    /// assert_eq!(pattern.captures("I have 42 cukes today"), None);
    /// ```
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let unanchored = pattern.strip_prefix('^').unwrap_or(pattern);
        let body = if unanchored.ends_with("\\$") {
            unanchored
        } else {
            unanchored.strip_suffix('$').unwrap_or(unanchored)
        };
        let regex = Regex::new(&format!("^(?:{body})$")).map_err(|source| PatternError {
            pattern: pattern.to_owned(),
            source,
        })?;
        Ok(Self {
            source: pattern.to_owned(),
            regex,
        })
    }

    /// The pattern exactly as registered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Number of capture groups, excluding the implicit whole-match group.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.regex.captures_len().saturating_sub(1)
    }

    /// Whether `text` matches the pattern in full.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Capture groups in left-to-right order when `text` matches in full.
    ///
    /// Groups that did not participate in the match yield empty strings.
    #[must_use]
    pub fn captures(&self, text: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(text)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|group| group.map_or_else(String::new, |m| m.as_str().to_owned()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("sample step without param", "sample step without param", Some(vec![]))]
    #[case("sample step with (single) param", "sample step with single param", Some(vec!["single"]))]
    #[case("sample step with (multi)(ple) param", "sample step with multiple param", Some(vec!["multi", "ple"]))]
    #[case("^anchored (.*)$", "anchored text", Some(vec!["text"]))]
    #[case("partial", "a partial match", None)]
    #[case("a|b", "ab", None)]
    #[case("value( is)?: (.*)", "value: x", Some(vec!["", "x"]))]
    fn captures_match_full_text(
        #[case] pattern: &str,
        #[case] text: &str,
        #[case] expected: Option<Vec<&str>>,
    ) {
        let compiled = StepPattern::new(pattern).expect("valid pattern");
        let expected_owned =
            expected.map(|groups| groups.into_iter().map(str::to_owned).collect::<Vec<_>>());
        assert_eq!(compiled.captures(text), expected_owned);
    }

    #[rstest]
    fn escaped_trailing_dollar_is_literal() {
        let pattern = StepPattern::new(r"costs 5\$").expect("valid pattern");
        assert!(pattern.is_match("costs 5$"));
    }

    #[rstest]
    fn counts_groups() {
        let pattern = StepPattern::new("(a)(b)(?:c)").expect("valid pattern");
        assert_eq!(pattern.group_count(), 2);
    }

    #[rstest]
    fn reports_invalid_patterns() {
        let err = StepPattern::new("broken (").expect_err("unbalanced group");
        assert_eq!(err.pattern, "broken (");
    }
}
