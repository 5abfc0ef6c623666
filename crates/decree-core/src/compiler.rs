//! The command compiler.
//!
//! [`AnnotationCompiler`] owns the parser registry and the capability
//! registries, and is configured through an immutable [`CompilerConfig`].
//!
//! # Thread Safety
//!
//! Registration ([`AnnotationCompiler::register_capabilities`] and the
//! `*_mut` accessors) requires `&mut self`. Compilation only reads, so once all
//! containers have registered their capabilities the compiler can be shared
//! and independent containers compiled concurrently.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

use tracing::{debug, info};

use crate::{
    annotation::{
        Argument, Confirmation, Flag, FlagGroup, Hidden, Parser, Permission, ProxiedBy,
        Suggestions, annotation_type,
    },
    assemble::{
        ArgumentAssembler, AssemblyContext, FlagAssembler, StandardArgumentAssembler,
        StandardFlagAssembler,
    },
    capability::{
        ArgumentParseError, ArgumentParser, ParserParameters, Suggestion, SuggestionProvider,
    },
    command::{CommandBuilder, CommandComponent, CommandMeta, CommandRegistrar, CompiledCommand},
    context::{ArgumentValue, CommandContext, CommandInput},
    descriptor::{ArgumentDescriptor, CommandDescriptor, FlagDescriptor},
    error::{CapabilityKind, CompileError, RegistryError},
    extract::{
        ArgumentExtractor, CommandExtractor, FlagExtractor, StandardArgumentExtractor,
        StandardCommandExtractor, StandardFlagExtractor,
    },
    handler::{CommandMethodContext, MethodCommandExecutionHandler},
    metadata::{
        CommandContainer, ContainerMetadata, MethodBody, MethodMetadata, ParserInvoker,
        SuggestionInvoker, TypeKey, method_or_container,
    },
    parsers::{ParserRegistry, ParserSupplier},
    registry::CapabilityRegistries,
    strings::{NoopStringProcessor, StringProcessor},
    syntax::{ArgumentMode, StandardSyntaxParser, SyntaxParser},
};

const PARSER_SIGNATURE: &str = "fn(&self, &CommandContext, &mut CommandInput) -> Result<T, E>";
const SUGGESTIONS_SIGNATURE: &str = "fn(&self, &CommandContext, &str) -> Vec<Suggestion>";

/// The generic sender type and the types accepted as its subtypes.
#[derive(Debug, Clone)]
pub struct SenderHierarchy {
    sender: TypeKey,
    subtypes: Vec<TypeKey>,
}

impl SenderHierarchy {
    #[must_use]
    pub fn new<S: 'static>() -> Self {
        Self {
            sender: TypeKey::of::<S>(),
            subtypes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_subtype<T: 'static>(mut self) -> Self {
        let subtype = TypeKey::of::<T>();
        if !self.subtypes.contains(&subtype) {
            self.subtypes.push(subtype);
        }
        self
    }

    #[must_use]
    pub fn sender(&self) -> TypeKey {
        self.sender
    }

    /// Whether a parameter of type `candidate` can receive the sender.
    #[must_use]
    pub fn accepts(&self, candidate: TypeKey) -> bool {
        candidate == self.sender || self.subtypes.contains(&candidate)
    }
}

/// Compiler configuration. Immutable once built.
#[derive(Clone)]
pub struct CompilerConfig {
    senders: SenderHierarchy,
    strings: Arc<dyn StringProcessor>,
    syntax: Arc<dyn SyntaxParser>,
    command_extractor: Arc<dyn CommandExtractor>,
    argument_extractor: Arc<dyn ArgumentExtractor>,
    flag_extractor: Arc<dyn FlagExtractor>,
    argument_assembler: Arc<dyn ArgumentAssembler>,
    flag_assembler: Arc<dyn FlagAssembler>,
}

impl CompilerConfig {
    /// Starts a configuration for commands sent by `S`.
    #[must_use]
    pub fn builder<S: 'static>() -> CompilerConfigBuilder {
        CompilerConfigBuilder {
            config: Self {
                senders: SenderHierarchy::new::<S>(),
                strings: Arc::new(NoopStringProcessor),
                syntax: Arc::new(StandardSyntaxParser),
                command_extractor: Arc::new(StandardCommandExtractor),
                argument_extractor: Arc::new(StandardArgumentExtractor),
                flag_extractor: Arc::new(StandardFlagExtractor),
                argument_assembler: Arc::new(StandardArgumentAssembler),
                flag_assembler: Arc::new(StandardFlagAssembler),
            },
        }
    }

    /// A builder starting from this configuration.
    #[must_use]
    pub fn rebuild(&self) -> CompilerConfigBuilder {
        CompilerConfigBuilder {
            config: self.clone(),
        }
    }

    #[must_use]
    pub fn senders(&self) -> &SenderHierarchy {
        &self.senders
    }

    #[must_use]
    pub fn string_processor(&self) -> &dyn StringProcessor {
        self.strings.as_ref()
    }

    #[must_use]
    pub fn syntax_parser(&self) -> &dyn SyntaxParser {
        self.syntax.as_ref()
    }
}

impl fmt::Debug for CompilerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilerConfig")
            .field("senders", &self.senders)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct CompilerConfigBuilder {
    config: CompilerConfig,
}

impl CompilerConfigBuilder {
    /// Accepts `T` as a subtype of the sender when inferring sender types.
    #[must_use]
    pub fn sender_subtype<T: 'static>(mut self) -> Self {
        self.config.senders = self.config.senders.with_subtype::<T>();
        self
    }

    #[must_use]
    pub fn string_processor(mut self, strings: impl StringProcessor + 'static) -> Self {
        self.config.strings = Arc::new(strings);
        self
    }

    #[must_use]
    pub fn syntax_parser(mut self, syntax: impl SyntaxParser + 'static) -> Self {
        self.config.syntax = Arc::new(syntax);
        self
    }

    #[must_use]
    pub fn command_extractor(mut self, extractor: impl CommandExtractor + 'static) -> Self {
        self.config.command_extractor = Arc::new(extractor);
        self
    }

    #[must_use]
    pub fn argument_extractor(mut self, extractor: impl ArgumentExtractor + 'static) -> Self {
        self.config.argument_extractor = Arc::new(extractor);
        self
    }

    #[must_use]
    pub fn flag_extractor(mut self, extractor: impl FlagExtractor + 'static) -> Self {
        self.config.flag_extractor = Arc::new(extractor);
        self
    }

    #[must_use]
    pub fn argument_assembler(mut self, assembler: impl ArgumentAssembler + 'static) -> Self {
        self.config.argument_assembler = Arc::new(assembler);
        self
    }

    #[must_use]
    pub fn flag_assembler(mut self, assembler: impl FlagAssembler + 'static) -> Self {
        self.config.flag_assembler = Arc::new(assembler);
        self
    }

    #[must_use]
    pub fn build(self) -> CompilerConfig {
        self.config
    }
}

/// A compiled command and the proxy declared for it, if any.
#[derive(Debug, Clone)]
pub struct CompilationOutput {
    pub command: CompiledCommand,
    pub proxy: Option<CompiledCommand>,
}

impl CompilationOutput {
    pub fn into_commands(self) -> impl Iterator<Item = CompiledCommand> {
        std::iter::once(self.command).chain(self.proxy)
    }
}

/// A parser backed by a container method.
struct MethodArgumentParser {
    container: Arc<dyn CommandContainer>,
    invoker: ParserInvoker,
    suggestions: Option<Arc<dyn SuggestionProvider>>,
}

impl ArgumentParser for MethodArgumentParser {
    fn parse(
        &self,
        context: &CommandContext,
        input: &mut CommandInput,
    ) -> Result<ArgumentValue, ArgumentParseError> {
        (self.invoker)(self.container.as_any(), context, input)
    }

    fn suggestions(&self) -> Option<Arc<dyn SuggestionProvider>> {
        self.suggestions.clone()
    }
}

/// A suggestion provider backed by a container method.
struct MethodSuggestionProvider {
    container: Arc<dyn CommandContainer>,
    invoker: SuggestionInvoker,
}

impl SuggestionProvider for MethodSuggestionProvider {
    fn suggestions(&self, context: &CommandContext, input: &str) -> Vec<Suggestion> {
        (self.invoker)(self.container.as_any(), context, input)
    }
}

fn has_parameters(method: &MethodMetadata, expected: &[&[TypeKey]]) -> bool {
    method.parameters.len() == expected.len()
        && method
            .parameters
            .iter()
            .zip(expected)
            .all(|(parameter, accepted)| accepted.contains(&parameter.type_key))
}

pub struct AnnotationCompiler {
    config: CompilerConfig,
    parsers: ParserRegistry,
    registries: CapabilityRegistries,
}

impl AnnotationCompiler {
    /// Creates a compiler with the default capability registries.
    #[must_use]
    pub fn new(parsers: ParserRegistry, config: CompilerConfig) -> Self {
        Self {
            config,
            parsers,
            registries: CapabilityRegistries::new(),
        }
    }

    /// Replaces the configuration, keeping every registered capability.
    #[must_use]
    pub fn with_config(self, config: CompilerConfig) -> Self {
        Self { config, ..self }
    }

    #[must_use]
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    #[must_use]
    pub fn parser_registry(&self) -> &ParserRegistry {
        &self.parsers
    }

    pub fn parser_registry_mut(&mut self) -> &mut ParserRegistry {
        &mut self.parsers
    }

    #[must_use]
    pub fn registries(&self) -> &CapabilityRegistries {
        &self.registries
    }

    pub fn registries_mut(&mut self) -> &mut CapabilityRegistries {
        &mut self.registries
    }

    /// Runs `input` through the configured string processor.
    #[must_use]
    pub fn process_string(&self, input: &str) -> String {
        self.config.strings.process(input)
    }

    /// Registers the container's suggestion methods, then its parser methods.
    ///
    /// Every method is validated before anything is registered.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::SignatureMismatch`] for a method with the wrong
    /// shape, [`CompileError::CapabilityNotFound`] when a parser names an
    /// unknown suggestion provider, and [`CompileError::Registry`] when the
    /// registry rejects a registration.
    pub fn register_capabilities(
        &mut self,
        container: &Arc<dyn CommandContainer>,
    ) -> Result<(), CompileError> {
        let metadata = container.metadata();
        let context = [TypeKey::of::<CommandContext>()];
        let input = [TypeKey::of::<CommandInput>()];
        let text = [TypeKey::of::<str>(), TypeKey::of::<String>()];
        let suggestions_shape: [&[TypeKey]; 2] = [&context, &text];
        let parser_shape: [&[TypeKey]; 2] = [&context, &input];

        let mismatch = |annotation: &'static str, method: &MethodMetadata, expected| {
            CompileError::SignatureMismatch {
                annotation,
                method: method.name.clone(),
                container: metadata.type_name.clone(),
                expected,
            }
        };

        let mut suggestion_methods = Vec::new();
        for method in metadata.methods_with::<Suggestions>() {
            let invoker = match &method.body {
                MethodBody::Suggestions(invoker) if has_parameters(method, &suggestions_shape) => {
                    Arc::clone(invoker)
                }
                _ => return Err(mismatch("suggestions", method, SUGGESTIONS_SIGNATURE)),
            };
            suggestion_methods.push((method, invoker));
        }

        let mut parser_methods = Vec::new();
        for method in metadata.methods_with::<Parser>() {
            let invoker = match (&method.body, method.return_type) {
                (MethodBody::Parser(invoker), Some(return_type))
                    if has_parameters(method, &parser_shape) =>
                {
                    (Arc::clone(invoker), return_type)
                }
                _ => return Err(mismatch("parser", method, PARSER_SIGNATURE)),
            };
            parser_methods.push((method, invoker));
        }

        for (method, invoker) in suggestion_methods {
            let Some(annotation) = method.annotations.get::<Suggestions>() else {
                continue;
            };
            let name = self.process_string(&annotation.name);
            let provider = Arc::new(MethodSuggestionProvider {
                container: Arc::clone(container),
                invoker,
            });
            self.parsers
                .register_suggestions(name.clone(), provider)
                .map_err(|source| CompileError::Registry {
                    method: method.name.clone(),
                    source,
                })?;
            debug!(
                container = %metadata.type_name,
                method = %method.name,
                suggestions = %name,
                "Registered suggestion provider"
            );
        }

        for (method, (invoker, return_type)) in parser_methods {
            let Some(annotation) = method.annotations.get::<Parser>() else {
                continue;
            };
            let suggestions = if annotation.suggestions.is_empty() {
                None
            } else {
                let name = self.process_string(&annotation.suggestions);
                Some(self.parsers.suggestions(&name).ok_or_else(|| {
                    CompileError::not_found(CapabilityKind::Suggestions, name, &method.name)
                })?)
            };

            let parser: Arc<dyn ArgumentParser> = Arc::new(MethodArgumentParser {
                container: Arc::clone(container),
                invoker,
                suggestions,
            });
            let supplier: ParserSupplier =
                Arc::new(move |_: &ParserParameters| Arc::clone(&parser));
            let name = self.process_string(&annotation.name);
            let registered_as = if name.is_empty() {
                return_type.name().to_string()
            } else {
                name.clone()
            };
            let registered: Result<(), RegistryError> = if name.is_empty() {
                self.parsers.register_type_parser(return_type, supplier)
            } else {
                self.parsers.register_named_parser(name, supplier)
            };
            registered.map_err(|source| CompileError::Registry {
                method: method.name.clone(),
                source,
            })?;
            debug!(
                container = %metadata.type_name,
                method = %method.name,
                parser = %registered_as,
                "Registered parser"
            );
        }

        Ok(())
    }

    /// Compiles every command method of `container`.
    ///
    /// Nothing is registered; the caller decides what to do with the result.
    ///
    /// # Errors
    ///
    /// Returns the first [`CompileError`] raised by extraction, assembly or
    /// compilation.
    pub fn compile_container(
        &self,
        container: &Arc<dyn CommandContainer>,
    ) -> Result<Vec<CompiledCommand>, CompileError> {
        let metadata = container.metadata();
        let descriptors = self.config.command_extractor.extract(
            &metadata,
            self.config.strings.as_ref(),
            self.config.syntax.as_ref(),
        )?;

        let mut commands = Vec::new();
        let mut proxied = HashSet::new();
        for descriptor in &descriptors {
            let method = Self::method(&metadata, descriptor)?;
            let arguments = self.config.argument_extractor.extract(
                method,
                descriptor,
                self.config.strings.as_ref(),
            )?;
            let flags = self
                .config
                .flag_extractor
                .extract(method, self.config.strings.as_ref())?;

            let mut output = self.compile(container, &metadata, descriptor, &arguments, &flags)?;
            if !proxied.insert(descriptor.method.index) {
                output.proxy = None;
            }
            commands.extend(output.into_commands());
        }

        Ok(commands)
    }

    fn method<'m>(
        metadata: &'m ContainerMetadata,
        descriptor: &CommandDescriptor,
    ) -> Result<&'m MethodMetadata, CompileError> {
        metadata
            .methods
            .get(descriptor.method.index)
            .filter(|method| method.name == descriptor.method.name)
            .or_else(|| {
                metadata
                    .methods
                    .iter()
                    .find(|method| method.name == descriptor.method.name)
            })
            .ok_or_else(|| CompileError::ContainerConstruction {
                container: metadata.type_name.clone(),
                reason: format!("method '{}' is not declared", descriptor.method.name),
            })
    }

    /// Compiles one command descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::UnresolvedArgument`] when the syntax and the
    /// argument descriptors disagree, [`CompileError::CapabilityNotFound`]
    /// when a capability is missing and [`CompileError::AliasFormat`] for a
    /// malformed proxy alias.
    pub fn compile(
        &self,
        container: &Arc<dyn CommandContainer>,
        metadata: &ContainerMetadata,
        descriptor: &CommandDescriptor,
        arguments: &[ArgumentDescriptor],
        flags: &[FlagDescriptor],
    ) -> Result<CompilationOutput, CompileError> {
        let method = Self::method(metadata, descriptor)?;
        let strings = self.config.strings.as_ref();
        let (root, tail) = descriptor.syntax.split_first().ok_or_else(|| {
            CompileError::MissingSyntax {
                method: method.name.clone(),
            }
        })?;

        let mut builder = CommandBuilder::new(root.major(), root.minor().to_vec());

        let mut meta = self.registries.map_annotations(&metadata.annotations);
        meta.merge(self.registries.map_annotations(&method.annotations));
        for (key, value) in meta.iter() {
            builder = builder.meta(key, strings.process(value));
        }
        if method_or_container::<Confirmation>(method, metadata).is_some() {
            builder = builder.meta(CommandMeta::CONFIRMATION_REQUIRED, "true");
        }

        let assembly = AssemblyContext {
            parsers: &self.parsers,
            registries: &self.registries,
            method: &method.name,
        };
        let mut assembled: HashMap<&str, CommandComponent> = HashMap::new();
        for argument in arguments {
            let Some(fragment) = tail
                .iter()
                .find(|fragment| fragment.is_variable() && fragment.major() == argument.name)
            else {
                return Err(CompileError::unresolved(
                    &argument.name,
                    &method.name,
                    "the argument does not appear in the command syntax",
                ));
            };
            let component = self
                .config
                .argument_assembler
                .assemble(fragment, argument, &assembly)?;
            assembled.insert(fragment.major(), component);
        }
        let flag_components = flags
            .iter()
            .map(|flag| self.config.flag_assembler.assemble(flag, &assembly))
            .collect::<Result<Vec<_>, _>>()?;

        let mut components = Vec::new();
        for fragment in tail {
            match fragment.mode() {
                ArgumentMode::Literal => {
                    builder = builder.literal(fragment.major(), fragment.minor().to_vec());
                }
                ArgumentMode::Required | ArgumentMode::Optional => {
                    let Some(component) = assembled.get(fragment.major()) else {
                        return Err(CompileError::unresolved(
                            fragment.major(),
                            &method.name,
                            "no argument is bound to the syntax variable",
                        ));
                    };
                    components.push(component.clone());
                    builder = builder.argument(component.clone());
                }
                ArgumentMode::Flag => {
                    let declared = flags
                        .iter()
                        .any(|flag| flag.spellings().any(|name| name == fragment.major()));
                    if !declared {
                        return Err(CompileError::unresolved(
                            fragment.major(),
                            &method.name,
                            "the flag is not declared by the method",
                        ));
                    }
                }
            }
        }

        // First parameter bound to neither an argument nor a flag and accepting
        // the sender wins.
        let sender = descriptor.required_sender.or_else(|| {
            method
                .parameters
                .iter()
                .filter(|parameter| {
                    let annotations = &parameter.annotations;
                    !annotations.contains::<Argument>()
                        && !annotations.contains::<Flag>()
                        && !annotations.contains::<FlagGroup>()
                })
                .map(|parameter| parameter.type_key)
                .find(|candidate| self.config.senders.accepts(*candidate))
        });
        if let Some(sender) = sender {
            builder = builder.sender_type(sender);
        }

        if let Some(permission) = method_or_container::<Permission>(method, metadata) {
            builder = builder.permission(strings.process(&permission.0));
        }

        let method_context = CommandMethodContext {
            container: Arc::clone(container),
            method: method.clone(),
            components,
            arguments: arguments.to_vec(),
            flags: flags.to_vec(),
        };
        let handler = match self.registries.handler_factory(method) {
            Some(factory) => factory(&method_context),
            None => Arc::new(MethodCommandExecutionHandler::new(&method_context)),
        };
        builder = builder.handler(handler);

        if method_or_container::<Hidden>(method, metadata).is_some() {
            builder = builder.hidden();
        }

        for flag in flag_components {
            builder = builder.flag(flag);
        }

        let mut seen = HashSet::new();
        for annotation in metadata.annotations.iter().chain(method.annotations.iter()) {
            let kind = annotation_type(&**annotation);
            if !seen.insert(kind) {
                continue;
            }
            if let Some(modifier) = self.registries.builder_modifier(kind) {
                builder = modifier(&**annotation, builder);
            }
        }

        let command = builder.build();
        let proxy = match method.annotations.get::<ProxiedBy>() {
            Some(proxied_by) => Some(self.build_proxy(proxied_by, &command, &method.name)?),
            None => None,
        };

        debug!(
            container = %metadata.type_name,
            method = %method.name,
            syntax = %command.syntax(),
            proxy = ?proxy.as_ref().map(CompiledCommand::root),
            "Compiled command"
        );
        Ok(CompilationOutput { command, proxy })
    }

    fn build_proxy(
        &self,
        proxied_by: &ProxiedBy,
        target: &CompiledCommand,
        method: &str,
    ) -> Result<CompiledCommand, CompileError> {
        let alias = self.process_string(&proxied_by.alias);
        let mut tokens = alias.split_whitespace();
        let (Some(root), None) = (tokens.next(), tokens.next()) else {
            return Err(CompileError::AliasFormat {
                alias,
                method: method.to_string(),
            });
        };

        let mut builder = CommandBuilder::new(root, Vec::new()).proxies(target);
        if proxied_by.hidden {
            builder = builder.hidden();
        }
        Ok(builder.build())
    }

    /// Registers the container's capabilities, compiles its commands and hands
    /// them to `registrar`. Nothing is registered unless every command
    /// compiles.
    ///
    /// # Errors
    ///
    /// Returns the first [`CompileError`] raised along the way.
    pub fn parse(
        &mut self,
        container: Arc<dyn CommandContainer>,
        registrar: &mut dyn CommandRegistrar,
    ) -> Result<usize, CompileError> {
        self.register_capabilities(&container)?;
        let commands = self.compile_container(&container)?;

        let count = commands.len();
        for command in commands {
            registrar.register(command);
        }

        info!(
            container = %container.metadata().type_name,
            commands = count,
            "Compiled command container"
        );
        Ok(count)
    }
}

impl fmt::Debug for AnnotationCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationCompiler")
            .field("config", &self.config)
            .field("parsers", &self.parsers)
            .field("registries", &self.registries)
            .finish()
    }
}
