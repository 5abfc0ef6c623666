//! Error taxonomy for command compilation.
//!
//! Every error raised while loading a container or compiling one of its
//! methods surfaces as a [`CompileError`]. None of them are caught inside the
//! compiler: they propagate to whoever drives container loading, which decides
//! whether to abort startup or skip the offending container.

use std::fmt;

use crate::{manifest::ManifestError, syntax::GrammarError};

/// The kind of capability a lookup failed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityKind {
    Parser,
    Suggestions,
    BuilderModifier,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parser => f.write_str("parser"),
            Self::Suggestions => f.write_str("suggestion provider"),
            Self::BuilderModifier => f.write_str("builder modifier"),
        }
    }
}

/// Errors raised by the parser registry when a registration is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// A parser supplier is already bound to this exact value type.
    #[error("a parser supplier is already registered for type '{0}'")]
    DuplicateType(String),

    /// Capabilities registered by name require a non-empty name.
    #[error("{0} registration requires a non-empty name")]
    EmptyName(CapabilityKind),
}

/// Errors that abort compilation of a command container.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CompileError {
    /// The syntax string of a command method is malformed.
    #[error("invalid syntax on method '{method}': {source}")]
    Grammar {
        method: String,
        #[source]
        source: GrammarError,
    },

    /// A command method declares no syntax, or only whitespace.
    #[error("command method '{method}' declares no command syntax")]
    MissingSyntax { method: String },

    /// A syntax variable and the method's argument parameters disagree.
    #[error("unresolved argument '{name}' in method '{method}': {reason}")]
    UnresolvedArgument {
        name: String,
        method: String,
        reason: String,
    },

    /// A parser, suggestion provider or modifier could not be resolved.
    #[error("cannot find the {kind} '{identifier}' required by '{method}'")]
    CapabilityNotFound {
        kind: CapabilityKind,
        identifier: String,
        method: String,
    },

    /// An ad-hoc parser or suggestion method has the wrong shape.
    #[error(
        "{annotation} annotated method '{method}' in container '{container}' does not have the \
         correct signature: expected {expected}"
    )]
    SignatureMismatch {
        annotation: &'static str,
        method: String,
        container: String,
        expected: &'static str,
    },

    /// A container listed in the manifest could not be instantiated.
    #[error("command container '{container}' could not be constructed: {reason}")]
    ContainerConstruction { container: String, reason: String },

    /// A proxy alias contains more than one literal.
    #[error("proxy alias '{alias}' on method '{method}' may only contain a single literal")]
    AliasFormat { alias: String, method: String },

    /// Two flags of one command share a name or alias, or a flag is malformed.
    #[error("invalid flag '{flag}' in method '{method}': {reason}")]
    FlagConflict {
        flag: String,
        method: String,
        reason: String,
    },

    /// A preprocessor mapper rejected an argument's annotation.
    #[error("cannot build a preprocessor for argument '{argument}' in method '{method}': {reason}")]
    Preprocessor {
        argument: String,
        method: String,
        reason: String,
    },

    /// A capability registration was rejected.
    #[error("registration failed for method '{method}': {source}")]
    Registry {
        method: String,
        #[source]
        source: RegistryError,
    },

    /// The container manifest could not be loaded.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

impl CompileError {
    pub(crate) fn unresolved(
        name: impl Into<String>,
        method: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::UnresolvedArgument {
            name: name.into(),
            method: method.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(
        kind: CapabilityKind,
        identifier: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self::CapabilityNotFound {
            kind,
            identifier: identifier.into(),
            method: method.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_argument_message_names_argument_and_method() {
        let err = CompileError::unresolved("target", "ban", "no parameter is bound to it");

        assert_eq!(
            err.to_string(),
            "unresolved argument 'target' in method 'ban': no parameter is bound to it"
        );
    }

    #[test]
    fn test_capability_not_found_message_names_kind() {
        let err = CompileError::not_found(CapabilityKind::Suggestions, "players", "teleport");

        assert_eq!(
            err.to_string(),
            "cannot find the suggestion provider 'players' required by 'teleport'"
        );
    }

    #[test]
    fn test_registry_error_empty_name_message() {
        let err = RegistryError::EmptyName(CapabilityKind::Suggestions);

        assert_eq!(
            err.to_string(),
            "suggestion provider registration requires a non-empty name"
        );
    }
}
