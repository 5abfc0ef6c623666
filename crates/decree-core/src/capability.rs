//! Parser, suggestion and preprocessor capabilities.
//!
//! These traits are the seam between the compiler and the dispatch engine:
//! the compiler only resolves and attaches them, the engine calls them while
//! matching input.

use std::{fmt, sync::Arc};

use crate::context::{ArgumentValue, CommandContext, CommandInput};

/// Errors raised when a parser rejects its input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ArgumentParseError {
    #[error("expected {expected} but the input ended")]
    MissingInput { expected: String },

    #[error("'{input}' is not a valid {expected}")]
    Invalid { input: String, expected: String },

    #[error("'{input}' does not match the pattern '{pattern}'")]
    PatternMismatch { input: String, pattern: String },

    #[error("{0}")]
    Custom(String),
}

impl ArgumentParseError {
    pub fn custom(message: impl fmt::Display) -> Self {
        Self::Custom(message.to_string())
    }
}

impl From<String> for ArgumentParseError {
    fn from(message: String) -> Self {
        Self::Custom(message)
    }
}

impl From<&str> for ArgumentParseError {
    fn from(message: &str) -> Self {
        Self::Custom(message.to_string())
    }
}

/// A completion candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub text: String,
    pub tooltip: Option<String>,
}

impl Suggestion {
    pub fn simple(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tooltip: None,
        }
    }

    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }
}

impl From<String> for Suggestion {
    fn from(text: String) -> Self {
        Self::simple(text)
    }
}

impl From<&str> for Suggestion {
    fn from(text: &str) -> Self {
        Self::simple(text)
    }
}

/// Parses one component's value from the input cursor.
pub trait ArgumentParser: Send + Sync {
    /// # Errors
    ///
    /// Returns an [`ArgumentParseError`] when the input is missing or invalid.
    fn parse(
        &self,
        context: &CommandContext,
        input: &mut CommandInput,
    ) -> Result<ArgumentValue, ArgumentParseError>;

    /// Suggestions that come with the parser, used when a component names none.
    fn suggestions(&self) -> Option<Arc<dyn SuggestionProvider>> {
        None
    }
}

/// Produces completion candidates for a partially typed token.
pub trait SuggestionProvider: Send + Sync {
    fn suggestions(&self, context: &CommandContext, input: &str) -> Vec<Suggestion>;
}

/// A provider that never suggests anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSuggestions;

impl SuggestionProvider for NoSuggestions {
    fn suggestions(&self, _context: &CommandContext, _input: &str) -> Vec<Suggestion> {
        Vec::new()
    }
}

/// A fixed list of candidates filtered by prefix.
#[derive(Debug, Clone, Default)]
pub struct StaticSuggestions(pub Vec<String>);

impl SuggestionProvider for StaticSuggestions {
    fn suggestions(&self, _context: &CommandContext, input: &str) -> Vec<Suggestion> {
        self.0
            .iter()
            .filter(|candidate| candidate.starts_with(input))
            .map(|candidate| Suggestion::simple(candidate.clone()))
            .collect()
    }
}

/// Runs against the raw input before a component's parser.
pub trait ComponentPreprocessor: Send + Sync {
    /// # Errors
    ///
    /// Returns an [`ArgumentParseError`] to reject the input before parsing.
    fn preprocess(
        &self,
        context: &CommandContext,
        input: &CommandInput,
    ) -> Result<(), ArgumentParseError>;
}

/// Validates the next token against a regular expression.
#[derive(Debug, Clone)]
pub struct RegexPreprocessor {
    regex: regex::Regex,
    failure_message: Option<String>,
}

impl RegexPreprocessor {
    /// # Errors
    ///
    /// Returns the regex compilation error for an invalid pattern.
    pub fn new(pattern: &str, failure_message: Option<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: regex::Regex::new(pattern)?,
            failure_message,
        })
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

impl ComponentPreprocessor for RegexPreprocessor {
    fn preprocess(
        &self,
        _context: &CommandContext,
        input: &CommandInput,
    ) -> Result<(), ArgumentParseError> {
        let token = input.peek().unwrap_or_default();
        if self.regex.is_match(token) {
            return Ok(());
        }

        Err(match &self.failure_message {
            Some(message) => ArgumentParseError::Custom(message.replace("{input}", token)),
            None => ArgumentParseError::PatternMismatch {
                input: token.to_string(),
                pattern: self.regex.as_str().to_string(),
            },
        })
    }
}

/// Ordered string parameters handed to parser suppliers.
///
/// Built by annotation mappers from a parameter's annotations; later entries
/// replace earlier ones with the same key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserParameters {
    entries: Vec<(String, String)>,
}

impl ParserParameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn merge(&mut self, other: ParserParameters) {
        for (key, value) in other.entries {
            self.insert(key, value);
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_preprocessor_accepts_matching_token() {
        // Arrange
        let preprocessor = RegexPreprocessor::new("^[a-z]+$", None).expect("valid regex");
        let ctx = CommandContext::new(());

        // Act
        let result = preprocessor.preprocess(&ctx, &CommandInput::tokenize("alice rest"));

        // Assert
        assert!(result.is_ok());
    }

    #[test]
    fn test_regex_preprocessor_reports_pattern_or_custom_message() {
        let ctx = CommandContext::new(());
        let input = CommandInput::tokenize("Alice42");

        let plain = RegexPreprocessor::new("^[a-z]+$", None).expect("valid regex");
        let err = plain.preprocess(&ctx, &input).expect_err("must reject");
        assert!(matches!(err, ArgumentParseError::PatternMismatch { ref input, .. } if input == "Alice42"));

        let custom = RegexPreprocessor::new("^[a-z]+$", Some("bad name {input}".to_string()))
            .expect("valid regex");
        let err = custom.preprocess(&ctx, &input).expect_err("must reject");
        assert_eq!(err, ArgumentParseError::Custom("bad name Alice42".to_string()));
    }

    #[test]
    fn test_parser_parameters_replace_existing_keys() {
        let mut params = ParserParameters::new().with("min", "1").with("max", "5");
        params.merge(ParserParameters::new().with("min", "2"));

        assert_eq!(params.get("min"), Some("2"));
        assert_eq!(params.get("max"), Some("5"));
        assert_eq!(params.iter().count(), 2);
    }

    #[test]
    fn test_static_suggestions_filter_by_prefix() {
        let provider = StaticSuggestions(vec!["alice".into(), "albert".into(), "bob".into()]);

        let texts: Vec<String> = provider
            .suggestions(&CommandContext::new(()), "al")
            .into_iter()
            .map(|s| s.text)
            .collect();

        assert_eq!(texts, vec!["alice", "albert"]);
    }
}
