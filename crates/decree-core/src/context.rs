//! Runtime values handed to parsers and execution handlers.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

use crate::{capability::ArgumentParseError, metadata::TypeKey};

/// A parsed argument, flag value or injected value.
pub type ArgumentValue = Arc<dyn Any + Send + Sync>;

/// A cursor over whitespace separated input tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandInput {
    tokens: Vec<String>,
    position: usize,
}

impl CommandInput {
    #[must_use]
    pub fn tokenize(raw: &str) -> Self {
        Self::from_tokens(raw.split_whitespace().map(str::to_string).collect())
    }

    #[must_use]
    pub fn from_tokens(tokens: Vec<String>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// The next token, without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<&str> {
        self.tokens.get(self.position).map(String::as_str)
    }

    /// Consumes and returns the next token.
    pub fn read(&mut self) -> Option<String> {
        let token = self.tokens.get(self.position).cloned()?;
        self.position += 1;
        Some(token)
    }

    /// Tokens that have not been consumed yet.
    #[must_use]
    pub fn remaining(&self) -> &[String] {
        &self.tokens[self.position..]
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.position >= self.tokens.len()
    }
}

/// Values available to a command while it executes.
#[derive(Clone)]
pub struct CommandContext {
    sender: ArgumentValue,
    sender_type: TypeKey,
    raw_input: String,
    arguments: HashMap<String, ArgumentValue>,
    flags: HashMap<String, Option<ArgumentValue>>,
    injected: HashMap<TypeId, ArgumentValue>,
}

impl CommandContext {
    pub fn new<S: Any + Send + Sync>(sender: S) -> Self {
        Self {
            sender: Arc::new(sender),
            sender_type: TypeKey::of::<S>(),
            raw_input: String::new(),
            arguments: HashMap::new(),
            flags: HashMap::new(),
            injected: HashMap::new(),
        }
    }

    pub fn with_raw_input(mut self, raw_input: impl Into<String>) -> Self {
        self.raw_input = raw_input.into();
        self
    }

    /// The sender, if it is of type `S`.
    #[must_use]
    pub fn sender<S: Any>(&self) -> Option<&S> {
        self.sender.downcast_ref::<S>()
    }

    #[must_use]
    pub fn sender_type(&self) -> TypeKey {
        self.sender_type
    }

    #[must_use]
    pub fn raw_input(&self) -> &str {
        &self.raw_input
    }

    pub fn set_argument<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.arguments.insert(name.into(), Arc::new(value));
    }

    pub fn set_argument_value(&mut self, name: impl Into<String>, value: ArgumentValue) {
        self.arguments.insert(name.into(), value);
    }

    #[must_use]
    pub fn argument<T: Any>(&self, name: &str) -> Option<&T> {
        self.arguments.get(name)?.downcast_ref::<T>()
    }

    #[must_use]
    pub fn argument_value(&self, name: &str) -> Option<&ArgumentValue> {
        self.arguments.get(name)
    }

    #[must_use]
    pub fn contains_argument(&self, name: &str) -> bool {
        self.arguments.contains_key(name)
    }

    /// Marks a presence-only flag as set.
    pub fn set_flag(&mut self, name: impl Into<String>) {
        self.flags.insert(name.into(), None);
    }

    pub fn set_flag_value<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.flags.insert(name.into(), Some(Arc::new(value)));
    }

    #[must_use]
    pub fn flag_present(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }

    #[must_use]
    pub fn flag_value<T: Any>(&self, name: &str) -> Option<&T> {
        self.flag_raw_value(name)?.downcast_ref::<T>()
    }

    /// The value of a valued flag, whatever its type.
    #[must_use]
    pub fn flag_raw_value(&self, name: &str) -> Option<&ArgumentValue> {
        self.flags.get(name)?.as_ref()
    }

    /// Stores a value that command methods can receive by type.
    pub fn inject<T: Any + Send + Sync>(&mut self, value: T) {
        self.injected.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Looks up an injectable value of type `T`. The sender counts as one.
    #[must_use]
    pub fn injected<T: Any>(&self) -> Option<&T> {
        self.sender::<T>().or_else(|| {
            self.injected
                .get(&TypeId::of::<T>())?
                .downcast_ref::<T>()
        })
    }
}

impl std::fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut arguments: Vec<&String> = self.arguments.keys().collect();
        arguments.sort();
        let mut flags: Vec<&String> = self.flags.keys().collect();
        flags.sort();

        f.debug_struct("CommandContext")
            .field("sender_type", &self.sender_type)
            .field("raw_input", &self.raw_input)
            .field("arguments", &arguments)
            .field("flags", &flags)
            .finish_non_exhaustive()
    }
}

/// Errors raised while executing a compiled command.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ExecutionError {
    #[error("missing value for argument '{0}'")]
    MissingArgument(String),

    #[error("argument '{name}' does not hold a value of type '{expected}'")]
    ArgumentType { name: String, expected: &'static str },

    #[error("flag '{name}' does not hold a value of type '{expected}'")]
    FlagType { name: String, expected: &'static str },

    #[error("no value of type '{0}' is available for injection")]
    MissingInjection(&'static str),

    #[error("default value '{value}' of argument '{name}' could not be parsed: {source}")]
    InvalidDefault {
        name: String,
        value: String,
        #[source]
        source: ArgumentParseError,
    },

    #[error("command handler received a container that is not a '{0}'")]
    ContainerMismatch(&'static str),

    #[error("command '{0}' has no execution handler")]
    NotExecutable(String),

    #[error(transparent)]
    Handler(Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Admin(&'static str);

    #[test]
    fn test_input_read_and_peek_advance_cursor() {
        // Arrange
        let mut input = CommandInput::tokenize("  alice   spamming ");

        // Act
        let peeked = input.peek().map(str::to_string);
        let first = input.read();

        // Assert
        assert_eq!(peeked.as_deref(), Some("alice"));
        assert_eq!(first.as_deref(), Some("alice"));
        assert_eq!(input.remaining(), ["spamming".to_string()]);
        assert_eq!(input.read().as_deref(), Some("spamming"));
        assert!(input.is_empty());
        assert_eq!(input.read(), None);
    }

    #[test]
    fn test_context_downcasts_sender_and_arguments() {
        // Arrange
        let mut ctx = CommandContext::new(Admin("root"));
        ctx.set_argument("amount", 5_u32);
        ctx.set_flag("silent");
        ctx.set_flag_value("duration", 30_u64);

        // Assert
        assert_eq!(ctx.sender::<Admin>(), Some(&Admin("root")));
        assert!(ctx.sender::<String>().is_none());
        assert_eq!(ctx.sender_type(), TypeKey::of::<Admin>());
        assert_eq!(ctx.argument::<u32>("amount"), Some(&5));
        assert!(ctx.argument::<i64>("amount").is_none());
        assert!(ctx.flag_present("silent"));
        assert!(ctx.flag_value::<u64>("silent").is_none());
        assert_eq!(ctx.flag_value::<u64>("duration"), Some(&30));
    }

    #[test]
    fn test_injected_falls_back_from_sender_to_injected_values() {
        // Arrange
        let mut ctx = CommandContext::new(Admin("root"));
        ctx.inject(String::from("world"));

        // Assert
        assert_eq!(ctx.injected::<Admin>(), Some(&Admin("root")));
        assert_eq!(ctx.injected::<String>().map(String::as_str), Some("world"));
        assert!(ctx.injected::<u8>().is_none());
    }
}
