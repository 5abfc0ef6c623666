//! Parser and suggestion provider registry.
//!
//! Parsers are registered as suppliers: functions that receive the
//! [`ParserParameters`] collected from a parameter's annotations and return a
//! configured parser. Named suppliers follow last-registration-wins; a value
//! type can only be bound to one supplier.

use std::{any::Any, collections::HashMap, fmt, marker::PhantomData, str::FromStr, sync::Arc};

use tracing::debug;

use crate::{
    capability::{
        ArgumentParseError, ArgumentParser, ParserParameters, StaticSuggestions,
        SuggestionProvider,
    },
    context::{ArgumentValue, CommandContext, CommandInput},
    error::{CapabilityKind, RegistryError},
    metadata::TypeKey,
};

/// Creates a parser from annotation-derived parameters.
pub type ParserSupplier =
    Arc<dyn Fn(&ParserParameters) -> Arc<dyn ArgumentParser> + Send + Sync>;

/// Wraps a parser that needs no parameters into a supplier.
pub fn supplier<P: ArgumentParser + 'static>(parser: P) -> ParserSupplier {
    let parser: Arc<dyn ArgumentParser> = Arc::new(parser);
    Arc::new(move |_: &ParserParameters| Arc::clone(&parser))
}

#[derive(Default)]
pub struct ParserRegistry {
    named: HashMap<String, ParserSupplier>,
    typed: HashMap<TypeKey, ParserSupplier>,
    suggestions: HashMap<String, Arc<dyn SuggestionProvider>>,
}

impl ParserRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding parsers for `String`, `bool`, `char` and the
    /// numeric primitives.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.typed.insert(TypeKey::of::<String>(), supplier(StringParser));
        registry.typed.insert(TypeKey::of::<bool>(), supplier(BoolParser));

        macro_rules! from_str_parsers {
            ($($ty:ty),* $(,)?) => {
                $(registry
                    .typed
                    .insert(TypeKey::of::<$ty>(), supplier(FromStrParser::<$ty>::new()));)*
            };
        }
        from_str_parsers!(
            char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64
        );

        registry
    }

    /// Registers a supplier under `name`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyName`] for an empty name.
    pub fn register_named_parser(
        &mut self,
        name: impl Into<String>,
        supplier: ParserSupplier,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistryError::EmptyName(CapabilityKind::Parser));
        }
        if self.named.insert(name.clone(), supplier).is_some() {
            debug!(parser = %name, "Replaced named parser supplier");
        }
        Ok(())
    }

    /// Binds a supplier to a value type.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateType`] when the type already has one.
    pub fn register_type_parser(
        &mut self,
        value_type: TypeKey,
        supplier: ParserSupplier,
    ) -> Result<(), RegistryError> {
        if self.typed.contains_key(&value_type) {
            return Err(RegistryError::DuplicateType(value_type.name().to_string()));
        }
        self.typed.insert(value_type, supplier);
        Ok(())
    }

    /// Binds a supplier to `T`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateType`] when `T` already has one.
    pub fn register_parser<T: 'static>(
        &mut self,
        supplier: ParserSupplier,
    ) -> Result<(), RegistryError> {
        self.register_type_parser(TypeKey::of::<T>(), supplier)
    }

    /// Registers a suggestion provider under `name`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::EmptyName`] for an empty name.
    pub fn register_suggestions(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn SuggestionProvider>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistryError::EmptyName(CapabilityKind::Suggestions));
        }
        if self.suggestions.insert(name.clone(), provider).is_some() {
            debug!(suggestions = %name, "Replaced suggestion provider");
        }
        Ok(())
    }

    #[must_use]
    pub fn named_parser(
        &self,
        name: &str,
        parameters: &ParserParameters,
    ) -> Option<Arc<dyn ArgumentParser>> {
        self.named.get(name).map(|supplier| supplier(parameters))
    }

    #[must_use]
    pub fn type_parser(
        &self,
        value_type: TypeKey,
        parameters: &ParserParameters,
    ) -> Option<Arc<dyn ArgumentParser>> {
        self.typed.get(&value_type).map(|supplier| supplier(parameters))
    }

    #[must_use]
    pub fn suggestions(&self, name: &str) -> Option<Arc<dyn SuggestionProvider>> {
        self.suggestions.get(name).cloned()
    }

    #[must_use]
    pub fn has_type_parser(&self, value_type: TypeKey) -> bool {
        self.typed.contains_key(&value_type)
    }
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut named: Vec<&String> = self.named.keys().collect();
        named.sort();
        let mut typed: Vec<&str> = self.typed.keys().map(TypeKey::name).collect();
        typed.sort_unstable();
        let mut suggestions: Vec<&String> = self.suggestions.keys().collect();
        suggestions.sort();

        f.debug_struct("ParserRegistry")
            .field("named", &named)
            .field("typed", &typed)
            .field("suggestions", &suggestions)
            .finish()
    }
}

fn read_token(input: &mut CommandInput, expected: &str) -> Result<String, ArgumentParseError> {
    input.read().ok_or_else(|| ArgumentParseError::MissingInput {
        expected: expected.to_string(),
    })
}

/// Reads a single token as a `String`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringParser;

impl ArgumentParser for StringParser {
    fn parse(
        &self,
        _context: &CommandContext,
        input: &mut CommandInput,
    ) -> Result<ArgumentValue, ArgumentParseError> {
        Ok(Arc::new(read_token(input, "a string")?))
    }
}

/// Reads `true` or `false`, case-insensitively.
#[derive(Debug, Default, Clone, Copy)]
pub struct BoolParser;

impl ArgumentParser for BoolParser {
    fn parse(
        &self,
        _context: &CommandContext,
        input: &mut CommandInput,
    ) -> Result<ArgumentValue, ArgumentParseError> {
        let token = read_token(input, "a boolean")?;
        match token.to_ascii_lowercase().as_str() {
            "true" => Ok(Arc::new(true)),
            "false" => Ok(Arc::new(false)),
            _ => Err(ArgumentParseError::Invalid {
                input: token,
                expected: "boolean".to_string(),
            }),
        }
    }

    fn suggestions(&self) -> Option<Arc<dyn SuggestionProvider>> {
        Some(Arc::new(StaticSuggestions(vec![
            "true".to_string(),
            "false".to_string(),
        ])))
    }
}

/// Parses a single token through [`FromStr`].
pub struct FromStrParser<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> FromStrParser<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for FromStrParser<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ArgumentParser for FromStrParser<T>
where
    T: FromStr + Any + Send + Sync,
{
    fn parse(
        &self,
        _context: &CommandContext,
        input: &mut CommandInput,
    ) -> Result<ArgumentValue, ArgumentParseError> {
        let expected = std::any::type_name::<T>();
        let token = read_token(input, expected)?;
        match token.parse::<T>() {
            Ok(value) => Ok(Arc::new(value)),
            Err(_) => Err(ArgumentParseError::Invalid {
                input: token,
                expected: expected.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_with(
        registry: &ParserRegistry,
        value_type: TypeKey,
        raw: &str,
    ) -> Result<ArgumentValue, ArgumentParseError> {
        let parser = registry
            .type_parser(value_type, &ParserParameters::new())
            .expect("parser registered");
        parser.parse(&CommandContext::new(()), &mut CommandInput::tokenize(raw))
    }

    #[test]
    fn test_standard_registry_parses_primitives() {
        let registry = ParserRegistry::standard();

        let text = parse_with(&registry, TypeKey::of::<String>(), "alice bob").expect("string");
        let number = parse_with(&registry, TypeKey::of::<u32>(), "42").expect("u32");
        let flag = parse_with(&registry, TypeKey::of::<bool>(), "TRUE").expect("bool");

        assert_eq!(text.downcast_ref::<String>().map(String::as_str), Some("alice"));
        assert_eq!(number.downcast_ref::<u32>(), Some(&42));
        assert_eq!(flag.downcast_ref::<bool>(), Some(&true));
    }

    #[test]
    fn test_standard_parsers_reject_invalid_and_missing_input() {
        let registry = ParserRegistry::standard();

        let invalid = parse_with(&registry, TypeKey::of::<i32>(), "many").expect_err("invalid");
        let missing = parse_with(&registry, TypeKey::of::<String>(), "").expect_err("missing");

        assert!(matches!(invalid, ArgumentParseError::Invalid { ref input, .. } if input == "many"));
        assert!(matches!(missing, ArgumentParseError::MissingInput { .. }));
    }

    #[test]
    fn test_bool_parser_carries_suggestions() {
        let suggestions = BoolParser.suggestions().expect("bool suggests values");

        let texts: Vec<String> = suggestions
            .suggestions(&CommandContext::new(()), "t")
            .into_iter()
            .map(|s| s.text)
            .collect();

        assert_eq!(texts, vec!["true"]);
    }

    #[test]
    fn test_register_type_parser_rejects_duplicate_type() {
        // Arrange
        let mut registry = ParserRegistry::standard();

        // Act
        let err = registry
            .register_parser::<String>(supplier(StringParser))
            .expect_err("String is already bound");

        // Assert
        assert!(matches!(err, RegistryError::DuplicateType(ref name) if name.contains("String")));
    }

    #[test]
    fn test_register_named_parser_last_registration_wins() {
        // Arrange
        let mut registry = ParserRegistry::new();
        registry
            .register_named_parser("word", supplier(StringParser))
            .expect("first registration");

        // Act
        registry
            .register_named_parser("word", supplier(BoolParser))
            .expect("second registration");
        let parser = registry
            .named_parser("word", &ParserParameters::new())
            .expect("named parser present");

        // Assert
        assert!(parser.suggestions().is_some());
    }

    #[test]
    fn test_empty_names_are_rejected() {
        let mut registry = ParserRegistry::new();

        let parser_err = registry
            .register_named_parser("", supplier(StringParser))
            .expect_err("empty parser name");
        let suggestion_err = registry
            .register_suggestions("", Arc::new(StaticSuggestions::default()))
            .expect_err("empty suggestion name");

        assert_eq!(parser_err, RegistryError::EmptyName(CapabilityKind::Parser));
        assert_eq!(
            suggestion_err,
            RegistryError::EmptyName(CapabilityKind::Suggestions)
        );
    }

    #[test]
    fn test_supplier_receives_parameters() {
        // Arrange
        struct Bounded(u32);
        impl ArgumentParser for Bounded {
            fn parse(
                &self,
                _context: &CommandContext,
                input: &mut CommandInput,
            ) -> Result<ArgumentValue, ArgumentParseError> {
                let token = read_token(input, "number")?;
                let value: u32 = token.parse().map_err(ArgumentParseError::custom)?;
                if value > self.0 {
                    return Err(ArgumentParseError::custom(format!("{value} > {}", self.0)));
                }
                Ok(Arc::new(value))
            }
        }

        let mut registry = ParserRegistry::new();
        registry
            .register_named_parser(
                "bounded",
                Arc::new(|params: &ParserParameters| {
                    let max = params.get("max").and_then(|m| m.parse().ok()).unwrap_or(u32::MAX);
                    Arc::new(Bounded(max)) as Arc<dyn ArgumentParser>
                }),
            )
            .expect("registration");

        // Act
        let parser = registry
            .named_parser("bounded", &ParserParameters::new().with("max", "10"))
            .expect("named parser");
        let err = parser
            .parse(&CommandContext::new(()), &mut CommandInput::tokenize("11"))
            .expect_err("above max");

        // Assert
        assert_eq!(err, ArgumentParseError::Custom("11 > 10".to_string()));
    }
}
