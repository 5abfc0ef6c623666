//! Conversions from command container method return values.
//!
//! Generated invokers call these traits so container methods can return the
//! shapes a person would naturally write (`()`, `anyhow::Result<()>`,
//! `Result<T, E>`, `Vec<&str>`) instead of the type-erased values the
//! compiler stores.

use std::{any::Any, sync::Arc};

use decree_core::{ArgumentParseError, ArgumentValue, ExecutionError, Suggestion};

/// Return values accepted from `#[command]` methods.
pub trait IntoCommandResult {
    /// # Errors
    ///
    /// Returns [`ExecutionError::Handler`] when the method failed.
    fn into_command_result(self) -> Result<(), ExecutionError>;
}

impl IntoCommandResult for () {
    fn into_command_result(self) -> Result<(), ExecutionError> {
        Ok(())
    }
}

impl<E> IntoCommandResult for Result<(), E>
where
    E: Into<anyhow::Error>,
{
    fn into_command_result(self) -> Result<(), ExecutionError> {
        self.map_err(|e| ExecutionError::Handler(e.into().into()))
    }
}

/// Return values accepted from `#[parser]` methods.
pub trait IntoParseResult {
    /// # Errors
    ///
    /// Returns the method's error converted into an [`ArgumentParseError`].
    fn into_parse_result(self) -> Result<ArgumentValue, ArgumentParseError>;
}

impl<T, E> IntoParseResult for Result<T, E>
where
    T: Any + Send + Sync,
    E: Into<ArgumentParseError>,
{
    fn into_parse_result(self) -> Result<ArgumentValue, ArgumentParseError> {
        match self {
            Ok(value) => Ok(Arc::new(value)),
            Err(e) => Err(e.into()),
        }
    }
}

/// Return values accepted from `#[suggestions]` methods.
pub trait IntoSuggestions {
    fn into_suggestions(self) -> Vec<Suggestion>;
}

impl<S> IntoSuggestions for Vec<S>
where
    S: Into<Suggestion>,
{
    fn into_suggestions(self) -> Vec<Suggestion> {
        self.into_iter().map(Into::into).collect()
    }
}
