//! Syntax grammar for command declarations.
//!
//! A syntax string is a whitespace separated sequence of tokens:
//!
//! - `name|alias|alias` - a literal with optional alternate spellings
//! - `<name>` - a required variable
//! - `[name]` - an optional variable
//! - `--name` - a flag marker
//!
//! The first token is the command's root. Optional variables may not be
//! followed by required ones, and variable and flag names are unique within a
//! syntax string.

use std::{collections::HashSet, fmt};

use serde::Serialize;

const DELIMITERS: [char; 4] = ['<', '>', '[', ']'];
const FLAG_MARKER: &str = "--";

/// How a syntax fragment takes part in a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentMode {
    Literal,
    Required,
    Optional,
    Flag,
}

/// A single token of a command's grammar.
///
/// For literals, `major` is the canonical spelling and `minor` holds the
/// aliases. For variables and flags, `major` is the name and `minor` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntaxFragment {
    major: String,
    minor: Vec<String>,
    mode: ArgumentMode,
}

impl SyntaxFragment {
    pub fn literal(major: impl Into<String>, minor: Vec<String>) -> Self {
        Self {
            major: major.into(),
            minor,
            mode: ArgumentMode::Literal,
        }
    }

    pub fn required(name: impl Into<String>) -> Self {
        Self::variable(name, ArgumentMode::Required)
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self::variable(name, ArgumentMode::Optional)
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Self::variable(name, ArgumentMode::Flag)
    }

    fn variable(name: impl Into<String>, mode: ArgumentMode) -> Self {
        Self {
            major: name.into(),
            minor: Vec::new(),
            mode,
        }
    }

    #[must_use]
    pub fn major(&self) -> &str {
        &self.major
    }

    #[must_use]
    pub fn minor(&self) -> &[String] {
        &self.minor
    }

    #[must_use]
    pub fn mode(&self) -> ArgumentMode {
        self.mode
    }

    /// Returns `true` for required and optional variables.
    #[must_use]
    pub fn is_variable(&self) -> bool {
        matches!(self.mode, ArgumentMode::Required | ArgumentMode::Optional)
    }
}

impl fmt::Display for SyntaxFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            ArgumentMode::Literal => {
                f.write_str(&self.major)?;
                for alias in &self.minor {
                    write!(f, "|{alias}")?;
                }
                Ok(())
            }
            ArgumentMode::Required => write!(f, "<{}>", self.major),
            ArgumentMode::Optional => write!(f, "[{}]", self.major),
            ArgumentMode::Flag => write!(f, "{FLAG_MARKER}{}", self.major),
        }
    }
}

/// Renders fragments back into their canonical syntax string.
#[must_use]
pub fn render(fragments: &[SyntaxFragment]) -> String {
    fragments
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Errors produced while parsing a syntax string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum GrammarError {
    #[error("unbalanced delimiters in token '{0}'")]
    UnbalancedDelimiter(String),

    #[error("variable token '{0}' has an empty or malformed name")]
    MalformedVariable(String),

    #[error("literal token '{0}' contains an empty alias")]
    MalformedLiteral(String),

    #[error("flag token '{0}' has a malformed name")]
    MalformedFlag(String),

    #[error("required variable '{required}' follows optional variable '{optional}'")]
    RequiredAfterOptional { required: String, optional: String },

    #[error("name '{0}' is declared more than once")]
    DuplicateName(String),

    #[error("flag token '{0}' cannot be the root of a command")]
    FlagRoot(String),
}

/// Turns a syntax string into an ordered sequence of fragments.
///
/// Implementations must be stateless: every call returns a fresh list.
pub trait SyntaxParser: Send + Sync {
    /// Parses `syntax`. A blank string yields an empty sequence.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] when the string violates the grammar.
    fn parse(&self, syntax: &str) -> Result<Vec<SyntaxFragment>, GrammarError>;
}

/// The default grammar described in the module documentation.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardSyntaxParser;

impl SyntaxParser for StandardSyntaxParser {
    fn parse(&self, syntax: &str) -> Result<Vec<SyntaxFragment>, GrammarError> {
        let mut fragments: Vec<SyntaxFragment> = Vec::new();
        let mut names = HashSet::new();
        let mut first_optional: Option<String> = None;

        for token in syntax.split_whitespace() {
            let fragment = parse_token(token)?;

            match fragment.mode {
                ArgumentMode::Flag if fragments.is_empty() => {
                    return Err(GrammarError::FlagRoot(token.to_string()));
                }
                ArgumentMode::Required => {
                    if let Some(optional) = &first_optional {
                        return Err(GrammarError::RequiredAfterOptional {
                            required: fragment.major.clone(),
                            optional: optional.clone(),
                        });
                    }
                }
                ArgumentMode::Optional if first_optional.is_none() => {
                    first_optional = Some(fragment.major.clone());
                }
                _ => {}
            }

            if fragment.mode != ArgumentMode::Literal && !names.insert(fragment.major.clone()) {
                return Err(GrammarError::DuplicateName(fragment.major));
            }

            fragments.push(fragment);
        }

        Ok(fragments)
    }
}

fn parse_token(token: &str) -> Result<SyntaxFragment, GrammarError> {
    if let Some(rest) = token.strip_prefix('<') {
        let name = rest
            .strip_suffix('>')
            .ok_or_else(|| GrammarError::UnbalancedDelimiter(token.to_string()))?;
        return parse_variable(token, name, ArgumentMode::Required);
    }

    if let Some(rest) = token.strip_prefix('[') {
        let name = rest
            .strip_suffix(']')
            .ok_or_else(|| GrammarError::UnbalancedDelimiter(token.to_string()))?;
        return parse_variable(token, name, ArgumentMode::Optional);
    }

    if let Some(name) = token.strip_prefix(FLAG_MARKER) {
        if !is_valid_name(name) {
            return Err(GrammarError::MalformedFlag(token.to_string()));
        }
        return Ok(SyntaxFragment::flag(name));
    }

    if token.starts_with('-') {
        return Err(GrammarError::MalformedFlag(token.to_string()));
    }

    if token.contains(DELIMITERS) {
        return Err(GrammarError::UnbalancedDelimiter(token.to_string()));
    }

    let mut spellings = token.split('|').map(str::to_string);
    let major = spellings.next().unwrap_or_default();
    let minor: Vec<String> = spellings.collect();
    if major.is_empty() || minor.iter().any(String::is_empty) {
        return Err(GrammarError::MalformedLiteral(token.to_string()));
    }

    Ok(SyntaxFragment::literal(major, minor))
}

fn parse_variable(
    token: &str,
    name: &str,
    mode: ArgumentMode,
) -> Result<SyntaxFragment, GrammarError> {
    if name.contains(DELIMITERS) {
        return Err(GrammarError::UnbalancedDelimiter(token.to_string()));
    }
    if !is_valid_name(name) {
        return Err(GrammarError::MalformedVariable(token.to_string()));
    }
    Ok(SyntaxFragment::variable(name, mode))
}

/// Names start with an alphanumeric character or `_` and continue with
/// alphanumerics, `_` or `-`.
pub(crate) fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphanumeric() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(syntax: &str) -> Result<Vec<SyntaxFragment>, GrammarError> {
        StandardSyntaxParser.parse(syntax)
    }

    #[test]
    fn test_parse_literal_required_and_optional_tokens() {
        // Act
        let fragments = parse("teleport|tp <target> [reason]").expect("valid syntax");

        // Assert
        assert_eq!(
            fragments,
            vec![
                SyntaxFragment::literal("teleport", vec!["tp".to_string()]),
                SyntaxFragment::required("target"),
                SyntaxFragment::optional("reason"),
            ]
        );
    }

    #[test]
    fn test_parse_collapses_repeated_whitespace() {
        let fragments = parse("  ban \t <target>  ").expect("valid syntax");

        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].major(), "ban");
        assert_eq!(fragments[1].mode(), ArgumentMode::Required);
    }

    #[test]
    fn test_parse_blank_string_yields_no_fragments() {
        assert!(parse("   ").expect("blank syntax parses").is_empty());
    }

    #[test]
    fn test_parse_flag_marker() {
        let fragments = parse("clear <target> --silent").expect("valid syntax");

        assert_eq!(fragments[2], SyntaxFragment::flag("silent"));
    }

    #[test]
    fn test_parse_rejects_unbalanced_delimiters() {
        for syntax in ["ban <target", "ban target>", "ban [reason", "ban <ta<r>get>", "ba]n"] {
            let err = parse(syntax).expect_err("unbalanced syntax must fail");
            assert!(
                matches!(err, GrammarError::UnbalancedDelimiter(_)),
                "{syntax}: {err:?}"
            );
        }
    }

    #[test]
    fn test_parse_rejects_empty_variable_name() {
        let err = parse("ban <>").expect_err("empty variable must fail");

        assert_eq!(err, GrammarError::MalformedVariable("<>".to_string()));
    }

    #[test]
    fn test_parse_rejects_required_after_optional() {
        let err = parse("give [amount] <item>").expect_err("ordering must fail");

        assert_eq!(
            err,
            GrammarError::RequiredAfterOptional {
                required: "item".to_string(),
                optional: "amount".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_allows_literal_after_optional() {
        let fragments = parse("warp [name] list").expect("literal after optional is allowed");

        assert_eq!(fragments[2].mode(), ArgumentMode::Literal);
    }

    #[test]
    fn test_parse_rejects_malformed_flags() {
        for syntax in ["kick <target> --", "kick <target> ---x", "kick <target> -s"] {
            let err = parse(syntax).expect_err("malformed flag must fail");
            assert!(matches!(err, GrammarError::MalformedFlag(_)), "{syntax}");
        }
    }

    #[test]
    fn test_parse_rejects_flag_as_root() {
        let err = parse("--force now").expect_err("flag root must fail");

        assert_eq!(err, GrammarError::FlagRoot("--force".to_string()));
    }

    #[test]
    fn test_parse_rejects_duplicate_variable_names() {
        let err = parse("swap <slot> <slot>").expect_err("duplicate names must fail");

        assert_eq!(err, GrammarError::DuplicateName("slot".to_string()));
    }

    #[test]
    fn test_parse_rejects_empty_literal_alias() {
        let err = parse("teleport||tp").expect_err("empty alias must fail");

        assert!(matches!(err, GrammarError::MalformedLiteral(_)));
    }

    #[test]
    fn test_render_and_reparse_is_identity() {
        for syntax in [
            "teleport|tp|warp <target> [reason]",
            "ban <target> --silent [duration]",
            "config reload",
            "a|b|c <x_1> [y-2]",
        ] {
            let fragments = parse(syntax).expect("valid syntax");
            let rendered = render(&fragments);
            let reparsed = parse(&rendered).expect("rendered syntax must parse");

            assert_eq!(fragments, reparsed, "round trip of {syntax}");
            assert_eq!(rendered, syntax);
        }
    }

    #[test]
    fn test_parser_returns_independent_lists() {
        let first = parse("ban <target>").expect("valid syntax");
        let mut second = parse("ban <target>").expect("valid syntax");
        second.pop();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 1);
    }
}
