//! Extension points owned by one compiler instance.
//!
//! Every table is keyed by annotation type (the `TypeId` of the concrete
//! annotation value) except the handler factories, which form an ordered list
//! of method predicates. The compiler never special-cases an annotation
//! outside of these tables.

use std::{any::TypeId, collections::HashMap, fmt, sync::Arc};

use tracing::debug;

use crate::{
    annotation::{Annotation, AnnotationSet, CommandDescription, Regex, annotation_type},
    capability::{ComponentPreprocessor, ParserParameters, RegexPreprocessor},
    command::{CommandBuilder, CommandExecutionHandler, CommandMeta},
    handler::CommandMethodContext,
    metadata::MethodMetadata,
};

/// Maps an annotation to string parameters (parser parameters or command meta).
pub type AnnotationMapper = Arc<dyn Fn(&dyn Annotation) -> ParserParameters + Send + Sync>;

/// Maps an annotation to a component preprocessor. `Err` carries a reason.
pub type PreprocessorMapper =
    Arc<dyn Fn(&dyn Annotation) -> Result<Arc<dyn ComponentPreprocessor>, String> + Send + Sync>;

/// Transforms a command builder according to an annotation.
pub type BuilderModifier =
    Arc<dyn Fn(&dyn Annotation, CommandBuilder) -> CommandBuilder + Send + Sync>;

pub type HandlerPredicate = Arc<dyn Fn(&MethodMetadata) -> bool + Send + Sync>;

pub type HandlerFactory =
    Arc<dyn Fn(&CommandMethodContext) -> Arc<dyn CommandExecutionHandler> + Send + Sync>;

pub struct CapabilityRegistries {
    annotation_mappers: HashMap<TypeId, AnnotationMapper>,
    preprocessor_mappers: HashMap<TypeId, PreprocessorMapper>,
    builder_modifiers: HashMap<TypeId, BuilderModifier>,
    handler_factories: Vec<(HandlerPredicate, HandlerFactory)>,
}

impl CapabilityRegistries {
    /// Registries with no entries at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            annotation_mappers: HashMap::new(),
            preprocessor_mappers: HashMap::new(),
            builder_modifiers: HashMap::new(),
            handler_factories: Vec::new(),
        }
    }

    /// Registries holding the default mappings: [`CommandDescription`] to the
    /// `description` meta key and [`Regex`] to a [`RegexPreprocessor`].
    #[must_use]
    pub fn new() -> Self {
        let mut registries = Self::empty();
        registries.register_annotation_mapper(|description: &CommandDescription| {
            ParserParameters::new().with(CommandMeta::DESCRIPTION, description.0.clone())
        });
        registries.register_preprocessor_mapper(|regex: &Regex| {
            RegexPreprocessor::new(&regex.pattern, regex.failure_message.clone())
                .map(|preprocessor| Arc::new(preprocessor) as Arc<dyn ComponentPreprocessor>)
                .map_err(|err| err.to_string())
        });
        registries
    }

    pub fn register_annotation_mapper<A, F>(&mut self, mapper: F)
    where
        A: Annotation + 'static,
        F: Fn(&A) -> ParserParameters + Send + Sync + 'static,
    {
        let mapper: AnnotationMapper = Arc::new(move |annotation: &dyn Annotation| {
            annotation
                .as_any()
                .downcast_ref::<A>()
                .map(&mapper)
                .unwrap_or_default()
        });
        self.annotation_mappers.insert(TypeId::of::<A>(), mapper);
        debug!(annotation = std::any::type_name::<A>(), "Registered annotation mapper");
    }

    pub fn register_preprocessor_mapper<A, F>(&mut self, mapper: F)
    where
        A: Annotation + 'static,
        F: Fn(&A) -> Result<Arc<dyn ComponentPreprocessor>, String> + Send + Sync + 'static,
    {
        let mapper: PreprocessorMapper = Arc::new(move |annotation: &dyn Annotation| {
            match annotation.as_any().downcast_ref::<A>() {
                Some(annotation) => mapper(annotation),
                None => Err(format!(
                    "preprocessor mapper expected a '{}' annotation",
                    std::any::type_name::<A>()
                )),
            }
        });
        self.preprocessor_mappers.insert(TypeId::of::<A>(), mapper);
        debug!(annotation = std::any::type_name::<A>(), "Registered preprocessor mapper");
    }

    pub fn register_builder_modifier<A, F>(&mut self, modifier: F)
    where
        A: Annotation + 'static,
        F: Fn(&A, CommandBuilder) -> CommandBuilder + Send + Sync + 'static,
    {
        let modifier: BuilderModifier =
            Arc::new(move |annotation: &dyn Annotation, builder: CommandBuilder| {
                match annotation.as_any().downcast_ref::<A>() {
                    Some(annotation) => modifier(annotation, builder),
                    None => builder,
                }
            });
        self.builder_modifiers.insert(TypeId::of::<A>(), modifier);
        debug!(annotation = std::any::type_name::<A>(), "Registered builder modifier");
    }

    /// Appends a handler factory. Factories are consulted in registration
    /// order and the first matching predicate wins.
    pub fn register_handler_factory<P, F>(&mut self, predicate: P, factory: F)
    where
        P: Fn(&MethodMetadata) -> bool + Send + Sync + 'static,
        F: Fn(&CommandMethodContext) -> Arc<dyn CommandExecutionHandler> + Send + Sync + 'static,
    {
        self.handler_factories
            .push((Arc::new(predicate), Arc::new(factory)));
    }

    /// Parameters contributed by every mapped annotation in `annotations`.
    #[must_use]
    pub fn map_annotations(&self, annotations: &AnnotationSet) -> ParserParameters {
        let mut parameters = ParserParameters::new();
        for annotation in annotations.iter() {
            if let Some(mapper) = self.annotation_mappers.get(&annotation_type(&**annotation)) {
                parameters.merge(mapper(&**annotation));
            }
        }
        parameters
    }

    /// Preprocessors for every mapped annotation in `annotations`, in order.
    ///
    /// # Errors
    ///
    /// Returns the first mapper failure.
    pub fn preprocessors(
        &self,
        annotations: &AnnotationSet,
    ) -> Result<Vec<Arc<dyn ComponentPreprocessor>>, String> {
        annotations
            .iter()
            .filter_map(|annotation| {
                self.preprocessor_mappers
                    .get(&annotation_type(&**annotation))
                    .map(|mapper| mapper(&**annotation))
            })
            .collect()
    }

    #[must_use]
    pub fn builder_modifier(&self, annotation_type: TypeId) -> Option<&BuilderModifier> {
        self.builder_modifiers.get(&annotation_type)
    }

    /// The factory of the first predicate matching `method`.
    #[must_use]
    pub fn handler_factory(&self, method: &MethodMetadata) -> Option<&HandlerFactory> {
        self.handler_factories
            .iter()
            .find(|(predicate, _)| predicate(method))
            .map(|(_, factory)| factory)
    }
}

impl Default for CapabilityRegistries {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CapabilityRegistries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistries")
            .field("annotation_mappers", &self.annotation_mappers.len())
            .field("preprocessor_mappers", &self.preprocessor_mappers.len())
            .field("builder_modifiers", &self.builder_modifiers.len())
            .field("handler_factories", &self.handler_factories.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Hidden, Permission};

    #[derive(Debug)]
    struct Cooldown(u32);

    impl Annotation for Cooldown {}

    #[test]
    fn test_default_mappers_cover_description_and_regex() {
        // Arrange
        let registries = CapabilityRegistries::new();
        let annotations = AnnotationSet::new()
            .with(CommandDescription("Bans a player".to_string()))
            .with(Regex::new("^[a-z]+$"))
            .with(Hidden);

        // Act
        let parameters = registries.map_annotations(&annotations);
        let preprocessors = registries
            .preprocessors(&annotations)
            .expect("valid pattern");

        // Assert
        assert_eq!(parameters.get("description"), Some("Bans a player"));
        assert_eq!(preprocessors.len(), 1);
    }

    #[test]
    fn test_invalid_regex_reports_reason() {
        let registries = CapabilityRegistries::new();
        let annotations = AnnotationSet::new().with(Regex::new("(unclosed"));

        let err = registries
            .preprocessors(&annotations)
            .err()
            .expect("invalid pattern must fail");

        assert!(!err.is_empty());
    }

    #[test]
    fn test_custom_annotation_mapper_is_keyed_by_type() {
        // Arrange
        let mut registries = CapabilityRegistries::empty();
        registries.register_annotation_mapper(|cooldown: &Cooldown| {
            ParserParameters::new().with("cooldown", cooldown.0.to_string())
        });

        // Act
        let parameters = registries.map_annotations(
            &AnnotationSet::new()
                .with(Permission("x".to_string()))
                .with(Cooldown(30)),
        );

        // Assert
        assert_eq!(parameters.get("cooldown"), Some("30"));
        assert!(parameters.get("description").is_none());
    }

    #[test]
    fn test_builder_modifier_downcasts_annotation() {
        // Arrange
        let mut registries = CapabilityRegistries::empty();
        registries.register_builder_modifier(|cooldown: &Cooldown, builder: CommandBuilder| {
            builder.meta("cooldown", cooldown.0.to_string())
        });
        let annotation = Cooldown(5);

        // Act
        let modifier = registries
            .builder_modifier(TypeId::of::<Cooldown>())
            .expect("modifier registered");
        let command = modifier(&annotation, CommandBuilder::new("warp", vec![])).build();

        // Assert
        assert_eq!(command.meta().get("cooldown"), Some("5"));
        assert!(registries.builder_modifier(TypeId::of::<Hidden>()).is_none());
    }

    #[test]
    fn test_handler_factory_first_matching_predicate_wins() {
        // Arrange
        let mut registries = CapabilityRegistries::empty();
        registries.register_handler_factory(
            |method: &MethodMetadata| method.name.starts_with("admin"),
            |_: &CommandMethodContext| -> Arc<dyn CommandExecutionHandler> {
                unreachable!("factories are only looked up in this test")
            },
        );
        registries.register_handler_factory(
            |_: &MethodMetadata| true,
            |_: &CommandMethodContext| -> Arc<dyn CommandExecutionHandler> {
                unreachable!("factories are only looked up in this test")
            },
        );
        let first = Arc::as_ptr(&registries.handler_factories[0].1);

        // Act
        let admin = registries
            .handler_factory(&MethodMetadata::new("admin_reset"))
            .expect("first predicate matches");
        let other = registries
            .handler_factory(&MethodMetadata::new("warp"))
            .expect("catch-all matches");

        // Assert
        assert!(std::ptr::addr_eq(Arc::as_ptr(admin), first));
        assert!(!std::ptr::addr_eq(Arc::as_ptr(other), first));
    }
}
