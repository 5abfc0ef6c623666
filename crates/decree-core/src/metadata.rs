//! Language-native metadata describing command containers.
//!
//! The `#[command_container]` macro generates a [`ContainerMetadata`] value
//! for an `impl` block; the same value can be assembled by hand with the
//! builder methods below. Extraction and compilation operate purely on this
//! data, so nothing in the compiler depends on how it was produced.

use std::{
    any::{Any, TypeId},
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::{
    annotation::{Annotation, AnnotationSet},
    capability::{ArgumentParseError, Suggestion},
    context::{ArgumentValue, CommandContext, CommandInput, ExecutionError},
    handler::Invocation,
};

/// A runtime identifier for a Rust type.
///
/// Equality and hashing use the [`TypeId`]; the name is kept for messages.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Calls a command method on a type-erased container.
pub type CommandInvoker =
    Arc<dyn Fn(&dyn Any, &Invocation<'_>) -> Result<(), ExecutionError> + Send + Sync>;

/// Calls an ad-hoc parser method on a type-erased container.
pub type ParserInvoker = Arc<
    dyn Fn(&dyn Any, &CommandContext, &mut CommandInput) -> Result<ArgumentValue, ArgumentParseError>
        + Send
        + Sync,
>;

/// Calls an ad-hoc suggestion method on a type-erased container.
pub type SuggestionInvoker =
    Arc<dyn Fn(&dyn Any, &CommandContext, &str) -> Vec<Suggestion> + Send + Sync>;

/// The callable part of a method.
#[derive(Clone, Default)]
pub enum MethodBody {
    Command(CommandInvoker),
    Parser(ParserInvoker),
    Suggestions(SuggestionInvoker),
    /// The method cannot be called through the compiler, e.g. because its
    /// signature did not match any callable shape.
    #[default]
    Unbound,
}

impl fmt::Debug for MethodBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command(_) => f.write_str("Command(..)"),
            Self::Parser(_) => f.write_str("Parser(..)"),
            Self::Suggestions(_) => f.write_str("Suggestions(..)"),
            Self::Unbound => f.write_str("Unbound"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParameterMetadata {
    pub name: String,
    pub type_key: TypeKey,
    pub annotations: AnnotationSet,
}

impl ParameterMetadata {
    pub fn new(name: impl Into<String>, type_key: TypeKey) -> Self {
        Self {
            name: name.into(),
            type_key,
            annotations: AnnotationSet::new(),
        }
    }

    pub fn annotate<A: Annotation>(mut self, annotation: A) -> Self {
        self.annotations = self.annotations.with(annotation);
        self
    }
}

#[derive(Debug, Clone)]
pub struct MethodMetadata {
    pub name: String,
    pub annotations: AnnotationSet,
    /// Parameters in declaration order, excluding the receiver.
    pub parameters: Vec<ParameterMetadata>,
    /// `None` for methods returning `()`.
    pub return_type: Option<TypeKey>,
    pub body: MethodBody,
}

impl MethodMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotations: AnnotationSet::new(),
            parameters: Vec::new(),
            return_type: None,
            body: MethodBody::Unbound,
        }
    }

    pub fn annotate<A: Annotation>(mut self, annotation: A) -> Self {
        self.annotations = self.annotations.with(annotation);
        self
    }

    pub fn parameter(mut self, parameter: ParameterMetadata) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn returns(mut self, return_type: TypeKey) -> Self {
        self.return_type = Some(return_type);
        self
    }

    pub fn body(mut self, body: MethodBody) -> Self {
        self.body = body;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ContainerMetadata {
    pub type_name: String,
    pub annotations: AnnotationSet,
    /// Methods in declaration order.
    pub methods: Vec<MethodMetadata>,
}

impl ContainerMetadata {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            annotations: AnnotationSet::new(),
            methods: Vec::new(),
        }
    }

    pub fn annotate<A: Annotation>(mut self, annotation: A) -> Self {
        self.annotations = self.annotations.with(annotation);
        self
    }

    pub fn method(mut self, method: MethodMetadata) -> Self {
        self.methods.push(method);
        self
    }

    /// Methods carrying annotation `A`, in declaration order.
    pub fn methods_with<A: Annotation>(&self) -> impl Iterator<Item = &MethodMetadata> {
        self.methods
            .iter()
            .filter(|method| method.annotations.contains::<A>())
    }
}

/// An object whose methods declare commands, parsers and suggestion
/// providers.
pub trait CommandContainer: Send + Sync + 'static {
    fn metadata(&self) -> ContainerMetadata;

    fn as_any(&self) -> &dyn Any;
}

/// Looks up an annotation on the method first, then on its container.
pub(crate) fn method_or_container<'a, A: Annotation>(
    method: &'a MethodMetadata,
    container: &'a ContainerMetadata,
) -> Option<&'a A> {
    method
        .annotations
        .get::<A>()
        .or_else(|| container.annotations.get::<A>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{CommandMethod, Permission};

    #[test]
    fn test_type_key_equality_ignores_name() {
        assert_eq!(TypeKey::of::<String>(), TypeKey::of::<String>());
        assert_ne!(TypeKey::of::<String>(), TypeKey::of::<str>());
        assert!(TypeKey::of::<u32>().name().contains("u32"));
    }

    #[test]
    fn test_methods_with_filters_by_annotation() {
        // Arrange
        let container = ContainerMetadata::new("Moderation")
            .method(MethodMetadata::new("ban").annotate(CommandMethod::new("ban <target>")))
            .method(MethodMetadata::new("helper"));

        // Act
        let names: Vec<&str> = container
            .methods_with::<CommandMethod>()
            .map(|m| m.name.as_str())
            .collect();

        // Assert
        assert_eq!(names, vec!["ban"]);
    }

    #[test]
    fn test_method_or_container_prefers_method_annotation() {
        // Arrange
        let method = MethodMetadata::new("ban").annotate(Permission("mod.ban".to_string()));
        let plain = MethodMetadata::new("kick");
        let container =
            ContainerMetadata::new("Moderation").annotate(Permission("mod".to_string()));

        // Act
        let on_method = method_or_container::<Permission>(&method, &container);
        let on_container = method_or_container::<Permission>(&plain, &container);

        // Assert
        assert_eq!(on_method.map(|p| p.0.as_str()), Some("mod.ban"));
        assert_eq!(on_container.map(|p| p.0.as_str()), Some("mod"));
    }

    #[derive(Debug)]
    struct Cooldown {
        seconds: u32,
    }

    impl Annotation for Cooldown {}

    #[test]
    fn test_user_annotation_round_trips_through_metadata() {
        // Arrange
        let parameter = ParameterMetadata::new("target", TypeKey::of::<String>())
            .annotate(Cooldown { seconds: 3 });
        let method = MethodMetadata::new("warp")
            .annotate(Cooldown { seconds: 30 })
            .parameter(parameter);
        let container = ContainerMetadata::new("Travel").method(method);

        // Act
        let annotated: Vec<&MethodMetadata> = container.methods_with::<Cooldown>().collect();
        let cooldown = method_or_container::<Cooldown>(annotated[0], &container);

        // Assert
        assert_eq!(annotated.len(), 1);
        assert_eq!(cooldown.map(|c| c.seconds), Some(30));
        assert_eq!(
            annotated[0].parameters[0]
                .annotations
                .get::<Cooldown>()
                .map(|c| c.seconds),
            Some(3)
        );
    }
}
