//! Core of the Decree declarative command compiler.
//!
//! Command methods are declared on container types and described by typed
//! annotations. This crate turns that metadata into [`CompiledCommand`]s for an
//! external dispatch engine: it parses syntax strings, extracts argument and
//! flag descriptors, resolves parsers and suggestion providers, and binds an
//! execution handler to every command.
//!
//! # Key Components
//!
//! - **Syntax Grammar**: [`StandardSyntaxParser`] turns `teleport|tp <target> [reason]`
//!   into [`SyntaxFragment`]s
//! - **Metadata Model**: [`ContainerMetadata`] and the [`annotation`] module stand in
//!   for runtime reflection
//! - **Extractors and Assemblers**: pluggable stages producing descriptors and then
//!   [`CommandComponent`]s
//! - **Capability Registries**: [`ParserRegistry`] and [`CapabilityRegistries`] map
//!   names, types and annotations to parsers, preprocessors, modifiers and handlers
//! - **Compiler**: [`AnnotationCompiler`] runs the whole pipeline for one container
//! - **Loader**: [`ContainerLoader`] instantiates the containers named in a
//!   [`ContainerManifest`]
//!
//! # Example
//!
//! ```ignore
//! use decree_core::{
//!     AnnotationCompiler, CompilerConfig, ContainerCatalog, ContainerLoader,
//!     ContainerManifest, ParserRegistry,
//! };
//!
//! let manifest = ContainerManifest::load("decree.toml")?;
//! let config = CompilerConfig::builder::<Player>()
//!     .string_processor(manifest.string_processor())
//!     .build();
//! let mut compiler = AnnotationCompiler::new(ParserRegistry::standard(), config);
//!
//! let mut commands = Vec::new();
//! ContainerLoader::new(ContainerCatalog::from_inventory())
//!     .load(&manifest, &mut compiler, &mut commands)?;
//! ```
//!
//! # Thread Safety
//!
//! The compiler has two phases of operation:
//!
//! **Registration phase**: [`AnnotationCompiler::parse`] and the registration
//! methods require `&mut self`. Register every parser, modifier and handler
//! factory, and load every container, before sharing the compiler.
//!
//! **Compilation phase**: [`AnnotationCompiler::compile_container`] takes `&self`,
//! so independent containers whose capabilities are already registered can be
//! compiled concurrently.

mod assemble;
mod capability;
mod command;
mod compiler;
mod context;
mod descriptor;
mod error;
mod extract;
mod handler;
mod loader;
mod manifest;
mod metadata;
mod parsers;
mod registry;
mod strings;
mod syntax;

/// Built-in annotations and the [`Annotation`](annotation::Annotation) trait.
pub mod annotation;

/// Syntax grammar.
///
/// [`SyntaxParser`] implementations turn a syntax string into an ordered list
/// of [`SyntaxFragment`]s.
pub use syntax::{
    ArgumentMode, GrammarError, StandardSyntaxParser, SyntaxFragment, SyntaxParser, render,
};

/// Container, method and parameter metadata.
pub use metadata::{
    CommandContainer, CommandInvoker, ContainerMetadata, MethodBody, MethodMetadata,
    ParameterMetadata, ParserInvoker, SuggestionInvoker, TypeKey,
};

/// Runtime values handed to parsers and handlers.
pub use context::{ArgumentValue, CommandContext, CommandInput, ExecutionError};

/// Parser, suggestion and preprocessor capabilities.
pub use capability::{
    ArgumentParseError, ArgumentParser, ComponentPreprocessor, NoSuggestions, ParserParameters,
    RegexPreprocessor, StaticSuggestions, Suggestion, SuggestionProvider,
};

/// The dispatch-engine surface: components, builder and compiled commands.
pub use command::{
    CommandBuilder, CommandComponent, CommandExecutionHandler, CommandFlag, CommandMeta,
    CommandNode, CommandRegistrar, CompiledCommand,
};

/// String templating applied to syntax, names and permissions.
pub use strings::{NoopStringProcessor, PropertyStringProcessor, StringProcessor};

/// Parser registry and the standard parsers.
pub use parsers::{
    BoolParser, FromStrParser, ParserRegistry, ParserSupplier, StringParser, supplier,
};

/// Descriptors produced by the extractors.
pub use descriptor::{
    ArgumentDescriptor, CommandDescriptor, FlagBinding, FlagDescriptor, MethodRef,
};

/// Annotation mappers, preprocessor mappers, builder modifiers and handler
/// factories.
pub use registry::{
    AnnotationMapper, BuilderModifier, CapabilityRegistries, HandlerFactory, HandlerPredicate,
    PreprocessorMapper,
};

/// Metadata extractors.
pub use extract::{
    ArgumentExtractor, CommandExtractor, FlagExtractor, StandardArgumentExtractor,
    StandardCommandExtractor, StandardFlagExtractor,
};

/// Component assemblers.
pub use assemble::{
    ArgumentAssembler, AssemblyContext, FlagAssembler, StandardArgumentAssembler,
    StandardFlagAssembler,
};

/// The default execution handler and the values it passes to command methods.
pub use handler::{CommandMethodContext, FlagSet, FlagView, Invocation, MethodCommandExecutionHandler};

/// The command compiler and its configuration.
pub use compiler::{
    AnnotationCompiler, CompilationOutput, CompilerConfig, CompilerConfigBuilder,
    SenderHierarchy,
};

/// Container discovery and instantiation.
pub use loader::{
    CompilerConstructor, CompilerConstructorFn, ConstructionStrategy, ContainerCatalog,
    ContainerEntry, ContainerLoader, LoadReport, NoArgConstructor, NoArgConstructorFn,
};

#[doc(hidden)]
pub use loader::{Sealed, sealed};

/// Container manifest.
pub use manifest::{ContainerConfig, ContainerManifest, ManifestError};

/// Error types.
pub use error::{CapabilityKind, CompileError, RegistryError};

