//! Typed annotations attached to containers, methods and parameters.
//!
//! An annotation is any `'static` value implementing [`Annotation`]. Its
//! "annotation type" is the `TypeId` of the concrete value, which is the key
//! used by the annotation mapper, preprocessor mapper and builder modifier
//! registries. The built-in annotations below are the ones the compiler itself
//! understands; everything else is only visible through those registries.

use std::{
    any::{Any, TypeId},
    fmt,
    sync::Arc,
};

use crate::metadata::TypeKey;

/// Value of [`Argument::name`] meaning "use the parameter's own name".
pub const INFERRED_ARGUMENT_NAME: &str = "__INFERRED_ARGUMENT_NAME__";

#[doc(hidden)]
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Marker trait for annotation values.
pub trait Annotation: AsAny + fmt::Debug + Send + Sync + 'static {}

/// The annotation type of a type-erased annotation.
#[must_use]
pub fn annotation_type(annotation: &dyn Annotation) -> TypeId {
    annotation.as_any().type_id()
}

/// An ordered collection of annotations.
#[derive(Debug, Clone, Default)]
pub struct AnnotationSet {
    entries: Vec<Arc<dyn Annotation>>,
}

impl AnnotationSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an annotation, keeping declaration order.
    pub fn with<A: Annotation>(mut self, annotation: A) -> Self {
        self.entries.push(Arc::new(annotation));
        self
    }

    pub fn push(&mut self, annotation: Arc<dyn Annotation>) {
        self.entries.push(annotation);
    }

    /// Returns the first annotation of type `A`.
    #[must_use]
    pub fn get<A: Annotation>(&self) -> Option<&A> {
        self.entries
            .iter()
            .find_map(|entry| (**entry).as_any().downcast_ref::<A>())
    }

    #[must_use]
    pub fn contains<A: Annotation>(&self) -> bool {
        self.get::<A>().is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Annotation>> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Declares a method as a command handler.
///
/// Each syntax string produces its own command.
#[derive(Debug, Clone, Default)]
pub struct CommandMethod {
    pub syntax: Vec<String>,
    pub required_sender: Option<TypeKey>,
}

impl CommandMethod {
    pub fn new(syntax: impl Into<String>) -> Self {
        Self {
            syntax: vec![syntax.into()],
            required_sender: None,
        }
    }

    pub fn with_syntax(mut self, syntax: impl Into<String>) -> Self {
        self.syntax.push(syntax.into());
        self
    }

    pub fn with_sender(mut self, sender: TypeKey) -> Self {
        self.required_sender = Some(sender);
        self
    }
}

impl Annotation for CommandMethod {}

/// Binds a parameter to a syntax variable.
#[derive(Debug, Clone)]
pub struct Argument {
    /// Variable name, or [`INFERRED_ARGUMENT_NAME`].
    pub name: String,
    pub parser: Option<String>,
    pub suggestions: Option<String>,
    pub default_value: Option<String>,
    pub description: Option<String>,
}

impl Default for Argument {
    fn default() -> Self {
        Self {
            name: INFERRED_ARGUMENT_NAME.to_string(),
            parser: None,
            suggestions: None,
            default_value: None,
            description: None,
        }
    }
}

impl Argument {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// An argument whose name is taken from the parameter.
    #[must_use]
    pub fn inferred() -> Self {
        Self::default()
    }

    pub fn parser(mut self, name: impl Into<String>) -> Self {
        self.parser = Some(name.into());
        self
    }

    pub fn suggestions(mut self, name: impl Into<String>) -> Self {
        self.suggestions = Some(name.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Annotation for Argument {}

/// Declares a flag. On a `bool` parameter the flag is presence-only.
#[derive(Debug, Clone, Default)]
pub struct Flag {
    pub name: String,
    pub aliases: Vec<String>,
    pub permission: Option<String>,
    pub description: Option<String>,
    pub parser: Option<String>,
    pub suggestions: Option<String>,
}

impl Flag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn parser(mut self, name: impl Into<String>) -> Self {
        self.parser = Some(name.into());
        self
    }

    pub fn suggestions(mut self, name: impl Into<String>) -> Self {
        self.suggestions = Some(name.into());
        self
    }
}

impl Annotation for Flag {}

/// One flag contributed by a [`FlagGroup`].
#[derive(Debug, Clone)]
pub struct FlagMember {
    pub flag: Flag,
    /// `None` for presence-only flags.
    pub value_type: Option<TypeKey>,
}

impl FlagMember {
    #[must_use]
    pub fn presence(flag: Flag) -> Self {
        Self {
            flag,
            value_type: None,
        }
    }

    #[must_use]
    pub fn valued(flag: Flag, value_type: TypeKey) -> Self {
        Self {
            flag,
            value_type: Some(value_type),
        }
    }
}

/// A parameter that bundles several flags.
#[derive(Debug, Clone, Default)]
pub struct FlagGroup {
    pub members: Vec<FlagMember>,
}

impl Annotation for FlagGroup {}

/// Permission required to run a command.
#[derive(Debug, Clone)]
pub struct Permission(pub String);

impl Annotation for Permission {}

/// Hides a command from help listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hidden;

impl Annotation for Hidden {}

/// Requires confirmation before the command runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Confirmation;

impl Annotation for Confirmation {}

#[derive(Debug, Clone)]
pub struct CommandDescription(pub String);

impl Annotation for CommandDescription {}

/// Registers a single-literal alias that proxies the annotated command.
#[derive(Debug, Clone)]
pub struct ProxiedBy {
    pub alias: String,
    pub hidden: bool,
}

impl ProxiedBy {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            hidden: false,
        }
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

impl Annotation for ProxiedBy {}

/// Marks a `(context, input) -> value` method as an argument parser.
///
/// An empty `name` registers the parser under its return type.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    pub name: String,
    pub suggestions: String,
}

impl Parser {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            suggestions: String::new(),
        }
    }

    pub fn with_suggestions(mut self, suggestions: impl Into<String>) -> Self {
        self.suggestions = suggestions.into();
        self
    }
}

impl Annotation for Parser {}

/// Marks a `(context, partial) -> suggestions` method as a suggestion provider.
#[derive(Debug, Clone)]
pub struct Suggestions {
    pub name: String,
}

impl Suggestions {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Annotation for Suggestions {}

/// Validates the raw argument token against a pattern before parsing.
#[derive(Debug, Clone)]
pub struct Regex {
    pub pattern: String,
    pub failure_message: Option<String>,
}

impl Regex {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            failure_message: None,
        }
    }

    /// Message reported instead of the default; `{input}` is replaced by the
    /// rejected token.
    pub fn failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = Some(message.into());
        self
    }
}

impl Annotation for Regex {}
