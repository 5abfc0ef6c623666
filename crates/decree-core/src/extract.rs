//! Metadata extractors.
//!
//! Each extractor turns container metadata into raw descriptors. They are
//! independent and replaceable through [`CompilerConfig`](crate::CompilerConfig).

use std::collections::HashSet;

use tracing::trace;

use crate::{
    annotation::{
        AnnotationSet, Argument, CommandMethod, Flag, FlagGroup, INFERRED_ARGUMENT_NAME,
    },
    descriptor::{ArgumentDescriptor, CommandDescriptor, FlagBinding, FlagDescriptor, MethodRef},
    error::CompileError,
    metadata::{ContainerMetadata, MethodMetadata, TypeKey},
    strings::StringProcessor,
    syntax::{ArgumentMode, SyntaxParser, is_valid_name},
};

pub trait CommandExtractor: Send + Sync {
    /// Produces one descriptor per syntax string of every command method.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::MissingSyntax`] or [`CompileError::Grammar`].
    fn extract(
        &self,
        container: &ContainerMetadata,
        strings: &dyn StringProcessor,
        syntax: &dyn SyntaxParser,
    ) -> Result<Vec<CommandDescriptor>, CompileError>;
}

pub trait ArgumentExtractor: Send + Sync {
    /// Produces one descriptor per argument parameter of `method`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::UnresolvedArgument`] when arguments and syntax
    /// variables do not pair up exactly.
    fn extract(
        &self,
        method: &MethodMetadata,
        command: &CommandDescriptor,
        strings: &dyn StringProcessor,
    ) -> Result<Vec<ArgumentDescriptor>, CompileError>;
}

pub trait FlagExtractor: Send + Sync {
    /// Produces one descriptor per declared flag, including flag groups.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::FlagConflict`] for malformed or clashing names.
    fn extract(
        &self,
        method: &MethodMetadata,
        strings: &dyn StringProcessor,
    ) -> Result<Vec<FlagDescriptor>, CompileError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StandardCommandExtractor;

impl CommandExtractor for StandardCommandExtractor {
    fn extract(
        &self,
        container: &ContainerMetadata,
        strings: &dyn StringProcessor,
        syntax: &dyn SyntaxParser,
    ) -> Result<Vec<CommandDescriptor>, CompileError> {
        let mut descriptors = Vec::new();

        for (index, method) in container.methods.iter().enumerate() {
            let Some(command) = method.annotations.get::<CommandMethod>() else {
                continue;
            };
            if command.syntax.is_empty() {
                return Err(CompileError::MissingSyntax {
                    method: method.name.clone(),
                });
            }

            for raw in &command.syntax {
                let processed = strings.process(raw);
                let fragments = syntax
                    .parse(&processed)
                    .map_err(|source| CompileError::Grammar {
                        method: method.name.clone(),
                        source,
                    })?;
                let Some(root) = fragments.first() else {
                    return Err(CompileError::MissingSyntax {
                        method: method.name.clone(),
                    });
                };

                trace!(method = %method.name, syntax = %processed, "Extracted command syntax");
                descriptors.push(CommandDescriptor {
                    root_token: root.major().to_string(),
                    syntax: fragments,
                    required_sender: command.required_sender,
                    method: MethodRef {
                        container: container.type_name.clone(),
                        index,
                        name: method.name.clone(),
                    },
                });
            }
        }

        Ok(descriptors)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StandardArgumentExtractor;

impl ArgumentExtractor for StandardArgumentExtractor {
    fn extract(
        &self,
        method: &MethodMetadata,
        command: &CommandDescriptor,
        strings: &dyn StringProcessor,
    ) -> Result<Vec<ArgumentDescriptor>, CompileError> {
        let variables: Vec<_> = command
            .tail()
            .iter()
            .filter(|fragment| fragment.is_variable())
            .collect();
        let mut bound = HashSet::new();
        let mut descriptors = Vec::new();

        for parameter in &method.parameters {
            let Some(argument) = parameter.annotations.get::<Argument>() else {
                continue;
            };
            let name = if argument.name == INFERRED_ARGUMENT_NAME {
                parameter.name.clone()
            } else {
                strings.process(&argument.name)
            };

            let Some(fragment) = variables.iter().find(|fragment| fragment.major() == name) else {
                return Err(CompileError::unresolved(
                    name,
                    &method.name,
                    "the argument does not appear in the command syntax",
                ));
            };
            if !bound.insert(name.clone()) {
                return Err(CompileError::unresolved(
                    name,
                    &method.name,
                    "more than one parameter is bound to the argument",
                ));
            }

            descriptors.push(ArgumentDescriptor {
                name,
                parameter: parameter.name.clone(),
                value_type: parameter.type_key,
                required: fragment.mode() == ArgumentMode::Required,
                default_value: argument.default_value.as_deref().map(|v| strings.process(v)),
                parser_name: argument.parser.as_deref().map(|v| strings.process(v)),
                suggestions_name: argument.suggestions.as_deref().map(|v| strings.process(v)),
                description: argument.description.as_deref().map(|v| strings.process(v)),
                annotations: parameter.annotations.clone(),
            });
        }

        if let Some(unbound) = variables
            .iter()
            .find(|fragment| !bound.contains(fragment.major()))
        {
            return Err(CompileError::unresolved(
                unbound.major(),
                &method.name,
                "no parameter is bound to the syntax variable",
            ));
        }

        Ok(descriptors)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StandardFlagExtractor;

impl StandardFlagExtractor {
    fn descriptor(
        flag: &Flag,
        value_type: Option<TypeKey>,
        annotations: AnnotationSet,
        binding: FlagBinding,
        strings: &dyn StringProcessor,
    ) -> FlagDescriptor {
        FlagDescriptor {
            name: strings.process(&flag.name),
            aliases: flag.aliases.iter().map(|alias| strings.process(alias)).collect(),
            value_type,
            permission: flag.permission.as_deref().map(|v| strings.process(v)),
            description: flag.description.as_deref().map(|v| strings.process(v)),
            parser_name: flag.parser.as_deref().map(|v| strings.process(v)),
            suggestions_name: flag.suggestions.as_deref().map(|v| strings.process(v)),
            annotations,
            binding,
        }
    }
}

impl FlagExtractor for StandardFlagExtractor {
    fn extract(
        &self,
        method: &MethodMetadata,
        strings: &dyn StringProcessor,
    ) -> Result<Vec<FlagDescriptor>, CompileError> {
        let mut descriptors = Vec::new();

        for parameter in &method.parameters {
            if let Some(flag) = parameter.annotations.get::<Flag>() {
                let value_type =
                    (parameter.type_key != TypeKey::of::<bool>()).then_some(parameter.type_key);
                descriptors.push(Self::descriptor(
                    flag,
                    value_type,
                    parameter.annotations.clone(),
                    FlagBinding::Parameter(parameter.name.clone()),
                    strings,
                ));
            }

            if let Some(group) = parameter.annotations.get::<FlagGroup>() {
                for member in &group.members {
                    descriptors.push(Self::descriptor(
                        &member.flag,
                        member.value_type,
                        AnnotationSet::new(),
                        FlagBinding::Group {
                            parameter: parameter.name.clone(),
                            declared_name: member.flag.name.clone(),
                        },
                        strings,
                    ));
                }
            }
        }

        let mut spellings = HashSet::new();
        for descriptor in &descriptors {
            for spelling in descriptor.spellings() {
                if !is_valid_name(spelling) {
                    return Err(CompileError::FlagConflict {
                        flag: spelling.to_string(),
                        method: method.name.clone(),
                        reason: "the name is malformed".to_string(),
                    });
                }
                if !spellings.insert(spelling.to_string()) {
                    return Err(CompileError::FlagConflict {
                        flag: spelling.to_string(),
                        method: method.name.clone(),
                        reason: "the name or alias is declared more than once".to_string(),
                    });
                }
            }
        }

        Ok(descriptors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        annotation::FlagMember,
        metadata::ParameterMetadata,
        strings::{NoopStringProcessor, PropertyStringProcessor},
        syntax::StandardSyntaxParser,
    };

    fn extract_commands(
        container: &ContainerMetadata,
    ) -> Result<Vec<CommandDescriptor>, CompileError> {
        StandardCommandExtractor.extract(container, &NoopStringProcessor, &StandardSyntaxParser)
    }

    fn teleport_method() -> MethodMetadata {
        MethodMetadata::new("teleport")
            .annotate(CommandMethod::new("teleport <target> [reason]"))
            .parameter(
                ParameterMetadata::new("target", TypeKey::of::<u64>())
                    .annotate(Argument::inferred()),
            )
            .parameter(
                ParameterMetadata::new("why", TypeKey::of::<String>())
                    .annotate(Argument::named("reason").default_value("none")),
            )
    }

    fn single_command(method: &MethodMetadata) -> CommandDescriptor {
        let container = ContainerMetadata::new("Warps").method(method.clone());
        extract_commands(&container)
            .expect("valid container")
            .remove(0)
    }

    #[test]
    fn test_command_extractor_yields_descriptor_per_syntax() {
        // Arrange
        let container = ContainerMetadata::new("Warps")
            .method(MethodMetadata::new("helper"))
            .method(
                MethodMetadata::new("warp")
                    .annotate(CommandMethod::new("warp <name>").with_syntax("w <name>")),
            );

        // Act
        let descriptors = extract_commands(&container).expect("valid container");

        // Assert
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].root_token, "warp");
        assert_eq!(descriptors[1].root_token, "w");
        assert_eq!(descriptors[1].method.index, 1);
        assert_eq!(descriptors[1].method.name, "warp");
    }

    #[test]
    fn test_command_extractor_processes_syntax_strings() {
        let container = ContainerMetadata::new("Warps")
            .method(MethodMetadata::new("warp").annotate(CommandMethod::new("${root} warp")));
        let strings = PropertyStringProcessor::default().with("root", "admin");

        let descriptors = StandardCommandExtractor
            .extract(&container, &strings, &StandardSyntaxParser)
            .expect("valid container");

        assert_eq!(descriptors[0].root_token, "admin");
        assert_eq!(descriptors[0].syntax.len(), 2);
    }

    #[test]
    fn test_command_extractor_rejects_blank_syntax() {
        let container = ContainerMetadata::new("Warps")
            .method(MethodMetadata::new("warp").annotate(CommandMethod::new("   ")));

        let err = extract_commands(&container).expect_err("blank syntax must fail");

        assert!(matches!(err, CompileError::MissingSyntax { ref method } if method == "warp"));
    }

    #[test]
    fn test_command_extractor_wraps_grammar_errors() {
        let container = ContainerMetadata::new("Warps")
            .method(MethodMetadata::new("give").annotate(CommandMethod::new("give [n] <item>")));

        let err = extract_commands(&container).expect_err("bad ordering must fail");

        assert!(matches!(err, CompileError::Grammar { ref method, .. } if method == "give"));
    }

    #[test]
    fn test_argument_extractor_infers_names_and_modes() {
        // Arrange
        let method = teleport_method();
        let command = single_command(&method);

        // Act
        let arguments = StandardArgumentExtractor
            .extract(&method, &command, &NoopStringProcessor)
            .expect("arguments match syntax");

        // Assert
        assert_eq!(arguments.len(), 2);
        assert_eq!(arguments[0].name, "target");
        assert!(arguments[0].required);
        assert_eq!(arguments[0].value_type, TypeKey::of::<u64>());
        assert_eq!(arguments[1].name, "reason");
        assert_eq!(arguments[1].parameter, "why");
        assert!(!arguments[1].required);
        assert_eq!(arguments[1].default_value.as_deref(), Some("none"));
    }

    #[test]
    fn test_argument_extractor_rejects_argument_missing_from_syntax() {
        let method = MethodMetadata::new("ban")
            .annotate(CommandMethod::new("ban"))
            .parameter(
                ParameterMetadata::new("target", TypeKey::of::<String>())
                    .annotate(Argument::inferred()),
            );
        let command = single_command(&method);

        let err = StandardArgumentExtractor
            .extract(&method, &command, &NoopStringProcessor)
            .expect_err("target is not in the syntax");

        assert!(matches!(
            err,
            CompileError::UnresolvedArgument { ref name, ref method, .. }
                if name == "target" && method == "ban"
        ));
    }

    #[test]
    fn test_argument_extractor_rejects_unbound_syntax_variable() {
        let method = MethodMetadata::new("ban").annotate(CommandMethod::new("ban <target>"));
        let command = single_command(&method);

        let err = StandardArgumentExtractor
            .extract(&method, &command, &NoopStringProcessor)
            .expect_err("target has no parameter");

        assert!(matches!(err, CompileError::UnresolvedArgument { ref name, .. } if name == "target"));
    }

    #[test]
    fn test_argument_extractor_ignores_root_variable() {
        let method = MethodMetadata::new("echo").annotate(CommandMethod::new("<anything>"));
        let command = single_command(&method);

        let arguments = StandardArgumentExtractor
            .extract(&method, &command, &NoopStringProcessor)
            .expect("root is not an argument");

        assert!(arguments.is_empty());
    }

    #[test]
    fn test_flag_extractor_reads_parameters_and_groups() {
        // Arrange
        let method = MethodMetadata::new("clear")
            .parameter(
                ParameterMetadata::new("silent", TypeKey::of::<bool>())
                    .annotate(Flag::new("silent").alias("s")),
            )
            .parameter(
                ParameterMetadata::new("options", TypeKey::of::<()>()).annotate(FlagGroup {
                    members: vec![FlagMember::valued(Flag::new("radius"), TypeKey::of::<u32>())],
                }),
            );

        // Act
        let flags = StandardFlagExtractor
            .extract(&method, &NoopStringProcessor)
            .expect("valid flags");

        // Assert
        assert_eq!(flags.len(), 2);
        assert_eq!(flags[0].aliases, vec!["s"]);
        assert!(flags[0].value_type.is_none());
        assert_eq!(flags[1].value_type, Some(TypeKey::of::<u32>()));
        assert_eq!(
            flags[1].binding,
            FlagBinding::Group {
                parameter: "options".to_string(),
                declared_name: "radius".to_string(),
            }
        );
    }

    #[test]
    fn test_flag_extractor_rejects_alias_clash() {
        let method = MethodMetadata::new("clear")
            .parameter(
                ParameterMetadata::new("silent", TypeKey::of::<bool>())
                    .annotate(Flag::new("silent").alias("s")),
            )
            .parameter(
                ParameterMetadata::new("sudo", TypeKey::of::<bool>())
                    .annotate(Flag::new("sudo").alias("s")),
            );

        let err = StandardFlagExtractor
            .extract(&method, &NoopStringProcessor)
            .expect_err("alias s is declared twice");

        assert!(matches!(err, CompileError::FlagConflict { ref flag, .. } if flag == "s"));
    }

    #[test]
    fn test_flag_extractor_rejects_malformed_name() {
        let method = MethodMetadata::new("clear").parameter(
            ParameterMetadata::new("silent", TypeKey::of::<bool>())
                .annotate(Flag::new("bad name")),
        );

        let err = StandardFlagExtractor
            .extract(&method, &NoopStringProcessor)
            .expect_err("space in flag name");

        assert!(matches!(err, CompileError::FlagConflict { .. }));
    }
}
