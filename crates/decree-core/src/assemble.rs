//! Component assemblers: descriptors in, invocable components out.

use std::sync::Arc;

use tracing::trace;

use crate::{
    annotation::AnnotationSet,
    capability::{ArgumentParser, NoSuggestions, SuggestionProvider},
    command::{CommandComponent, CommandFlag},
    descriptor::{ArgumentDescriptor, FlagDescriptor},
    error::{CapabilityKind, CompileError},
    parsers::ParserRegistry,
    registry::CapabilityRegistries,
    syntax::{ArgumentMode, SyntaxFragment},
};

/// Registries an assembler resolves capabilities from.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyContext<'a> {
    pub parsers: &'a ParserRegistry,
    pub registries: &'a CapabilityRegistries,
    /// The method being compiled, for error messages.
    pub method: &'a str,
}

impl AssemblyContext<'_> {
    fn named_parser(
        &self,
        name: &str,
        annotations: &AnnotationSet,
    ) -> Result<Arc<dyn ArgumentParser>, CompileError> {
        let parameters = self.registries.map_annotations(annotations);
        self.parsers
            .named_parser(name, &parameters)
            .ok_or_else(|| CompileError::not_found(CapabilityKind::Parser, name, self.method))
    }

    fn suggestions(&self, name: &str) -> Result<Arc<dyn SuggestionProvider>, CompileError> {
        self.parsers
            .suggestions(name)
            .ok_or_else(|| CompileError::not_found(CapabilityKind::Suggestions, name, self.method))
    }
}

pub trait ArgumentAssembler: Send + Sync {
    /// # Errors
    ///
    /// Returns [`CompileError::CapabilityNotFound`] when the parser or the
    /// suggestion provider cannot be resolved.
    fn assemble(
        &self,
        fragment: &SyntaxFragment,
        descriptor: &ArgumentDescriptor,
        context: &AssemblyContext<'_>,
    ) -> Result<CommandComponent, CompileError>;
}

pub trait FlagAssembler: Send + Sync {
    /// # Errors
    ///
    /// Returns [`CompileError::CapabilityNotFound`] when a valued flag's parser
    /// cannot be resolved.
    fn assemble(
        &self,
        descriptor: &FlagDescriptor,
        context: &AssemblyContext<'_>,
    ) -> Result<CommandFlag, CompileError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StandardArgumentAssembler;

impl ArgumentAssembler for StandardArgumentAssembler {
    fn assemble(
        &self,
        fragment: &SyntaxFragment,
        descriptor: &ArgumentDescriptor,
        context: &AssemblyContext<'_>,
    ) -> Result<CommandComponent, CompileError> {
        let parser = match &descriptor.parser_name {
            Some(name) => context.named_parser(name, &descriptor.annotations)?,
            None => {
                let parameters = context.registries.map_annotations(&descriptor.annotations);
                context
                    .parsers
                    .type_parser(descriptor.value_type, &parameters)
                    .ok_or_else(|| {
                        CompileError::not_found(
                            CapabilityKind::Parser,
                            descriptor.value_type.name(),
                            context.method,
                        )
                    })?
            }
        };

        let suggestions = match &descriptor.suggestions_name {
            Some(name) => context.suggestions(name)?,
            None => parser
                .suggestions()
                .unwrap_or_else(|| Arc::new(NoSuggestions) as Arc<dyn SuggestionProvider>),
        };

        let preprocessors = context
            .registries
            .preprocessors(&descriptor.annotations)
            .map_err(|reason| CompileError::Preprocessor {
                argument: descriptor.name.clone(),
                method: context.method.to_string(),
                reason,
            })?;

        trace!(
            method = context.method,
            argument = %descriptor.name,
            value_type = %descriptor.value_type,
            "Assembled argument component"
        );

        Ok(CommandComponent {
            name: fragment.major().to_string(),
            value_type: descriptor.value_type,
            parser,
            suggestions,
            required: descriptor.required && fragment.mode() == ArgumentMode::Required,
            default_value: descriptor.default_value.clone(),
            description: descriptor.description.clone(),
            preprocessors,
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StandardFlagAssembler;

impl FlagAssembler for StandardFlagAssembler {
    fn assemble(
        &self,
        descriptor: &FlagDescriptor,
        context: &AssemblyContext<'_>,
    ) -> Result<CommandFlag, CompileError> {
        let (parser, suggestions) = match descriptor.value_type {
            None => (None, None),
            Some(value_type) => {
                let parser = match &descriptor.parser_name {
                    Some(name) => context.named_parser(name, &descriptor.annotations)?,
                    None => context
                        .parsers
                        .type_parser(
                            value_type,
                            &context.registries.map_annotations(&descriptor.annotations),
                        )
                        .ok_or_else(|| {
                            CompileError::not_found(
                                CapabilityKind::Parser,
                                value_type.name(),
                                context.method,
                            )
                        })?,
                };
                let suggestions = match &descriptor.suggestions_name {
                    Some(name) => Some(context.suggestions(name)?),
                    None => parser.suggestions(),
                };
                (Some(parser), suggestions)
            }
        };

        Ok(CommandFlag {
            name: descriptor.name.clone(),
            aliases: descriptor.aliases.clone(),
            permission: descriptor.permission.clone(),
            description: descriptor.description.clone(),
            value_type: descriptor.value_type,
            parser,
            suggestions,
        })
    }
}
