//! The default execution handler and the values it hands to command methods.

use std::{any::Any, collections::HashMap, fmt, sync::Arc};

use crate::{
    annotation::FlagMember,
    capability::ArgumentParseError,
    command::{CommandComponent, CommandExecutionHandler},
    context::{ArgumentValue, CommandContext, CommandInput, ExecutionError},
    descriptor::{ArgumentDescriptor, FlagBinding, FlagDescriptor},
    metadata::{CommandContainer, CommandInvoker, MethodBody, MethodMetadata},
};

/// Everything a handler factory knows about the method it binds.
#[derive(Clone)]
pub struct CommandMethodContext {
    pub container: Arc<dyn CommandContainer>,
    pub method: MethodMetadata,
    pub components: Vec<CommandComponent>,
    pub arguments: Vec<ArgumentDescriptor>,
    pub flags: Vec<FlagDescriptor>,
}

impl fmt::Debug for CommandMethodContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandMethodContext")
            .field("method", &self.method.name)
            .field("components", &self.components)
            .field("arguments", &self.arguments)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// A group of flags received by a single `#[flags]` parameter.
pub trait FlagSet: Sized {
    /// The flags this group declares.
    fn flags() -> Vec<FlagMember>;

    /// Builds the group from the flags present on the command.
    ///
    /// # Errors
    ///
    /// Returns an [`ExecutionError`] when a flag value has an unexpected type.
    fn from_flags(flags: &FlagView<'_>) -> Result<Self, ExecutionError>;
}

/// Flag lookup by declared name for a [`FlagSet`].
pub struct FlagView<'a> {
    context: &'a CommandContext,
    names: Option<&'a HashMap<String, String>>,
}

impl FlagView<'_> {
    fn resolve<'n>(&'n self, declared: &'n str) -> &'n str {
        self.names
            .and_then(|names| names.get(declared))
            .map_or(declared, String::as_str)
    }

    #[must_use]
    pub fn present(&self, name: &str) -> bool {
        self.context.flag_present(self.resolve(name))
    }

    /// # Errors
    ///
    /// Returns [`ExecutionError::FlagType`] when the value is not a `T`.
    pub fn value<T: Any + Clone>(&self, name: &str) -> Result<Option<T>, ExecutionError> {
        flag_value(self.context, self.resolve(name))
    }
}

fn flag_value<T: Any + Clone>(
    context: &CommandContext,
    name: &str,
) -> Result<Option<T>, ExecutionError> {
    match context.flag_raw_value(name) {
        None => Ok(None),
        Some(value) => value
            .downcast_ref::<T>()
            .cloned()
            .map(Some)
            .ok_or_else(|| ExecutionError::FlagType {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            }),
    }
}

/// Values for one call of a command method, looked up by parameter name.
pub struct Invocation<'a> {
    context: &'a CommandContext,
    arguments: &'a HashMap<String, String>,
    flags: &'a HashMap<String, String>,
    groups: &'a HashMap<String, HashMap<String, String>>,
    defaults: HashMap<String, ArgumentValue>,
}

impl<'a> Invocation<'a> {
    #[must_use]
    pub fn context(&self) -> &'a CommandContext {
        self.context
    }

    fn component_name<'n>(&self, parameter: &'n str) -> &'n str
    where
        'a: 'n,
    {
        self.arguments.get(parameter).map_or(parameter, String::as_str)
    }

    fn argument_value(&self, parameter: &str) -> Option<&ArgumentValue> {
        let name = self.component_name(parameter);
        self.context
            .argument_value(name)
            .or_else(|| self.defaults.get(name))
    }

    /// # Errors
    ///
    /// Returns an [`ExecutionError`] when the argument is absent or not a `T`.
    pub fn argument_ref<T: Any>(&self, parameter: &str) -> Result<&T, ExecutionError> {
        let name = self.component_name(parameter);
        self.argument_value(parameter)
            .ok_or_else(|| ExecutionError::MissingArgument(name.to_string()))?
            .downcast_ref::<T>()
            .ok_or_else(|| ExecutionError::ArgumentType {
                name: name.to_string(),
                expected: std::any::type_name::<T>(),
            })
    }

    /// # Errors
    ///
    /// Returns an [`ExecutionError`] when the argument is absent or not a `T`.
    pub fn argument<T: Any + Clone>(&self, parameter: &str) -> Result<T, ExecutionError> {
        self.argument_ref::<T>(parameter).cloned()
    }

    /// # Errors
    ///
    /// Returns [`ExecutionError::ArgumentType`] when a value is present but not a `T`.
    pub fn optional_argument<T: Any + Clone>(
        &self,
        parameter: &str,
    ) -> Result<Option<T>, ExecutionError> {
        if self.argument_value(parameter).is_none() {
            return Ok(None);
        }
        self.argument::<T>(parameter).map(Some)
    }

    #[must_use]
    pub fn flag_present(&self, parameter: &str) -> bool {
        let name = self.flags.get(parameter).map_or(parameter, String::as_str);
        self.context.flag_present(name)
    }

    /// # Errors
    ///
    /// Returns [`ExecutionError::FlagType`] when the value is not a `T`.
    pub fn flag_value<T: Any + Clone>(&self, parameter: &str) -> Result<Option<T>, ExecutionError> {
        let name = self.flags.get(parameter).map_or(parameter, String::as_str);
        flag_value(self.context, name)
    }

    /// # Errors
    ///
    /// Returns whatever [`FlagSet::from_flags`] returns.
    pub fn flag_group<F: FlagSet>(&self, parameter: &str) -> Result<F, ExecutionError> {
        F::from_flags(&FlagView {
            context: self.context,
            names: self.groups.get(parameter),
        })
    }

    /// # Errors
    ///
    /// Returns [`ExecutionError::MissingInjection`] when no `T` is available.
    pub fn inject_ref<T: Any>(&self) -> Result<&'a T, ExecutionError> {
        self.context
            .injected::<T>()
            .ok_or(ExecutionError::MissingInjection(std::any::type_name::<T>()))
    }

    /// # Errors
    ///
    /// Returns [`ExecutionError::MissingInjection`] when no `T` is available.
    pub fn inject<T: Any + Clone>(&self) -> Result<T, ExecutionError> {
        self.inject_ref::<T>().cloned()
    }
}

struct DefaultValue {
    component: CommandComponent,
    raw: String,
}

impl DefaultValue {
    /// Parses the literal so that nothing of it is left over. It is read as
    /// whitespace-separated tokens first, then as one token, so multi-word
    /// text defaults reach single-token parsers intact.
    fn parse(&self, context: &CommandContext) -> Result<ArgumentValue, ArgumentParseError> {
        let parser = &self.component.parser;
        let mut tokens = CommandInput::tokenize(&self.raw);
        let value = parser.parse(context, &mut tokens)?;
        if tokens.is_empty() {
            return Ok(value);
        }

        let mut whole = CommandInput::from_tokens(vec![self.raw.clone()]);
        let value = parser.parse(context, &mut whole)?;
        if whole.is_empty() {
            Ok(value)
        } else {
            Err(ArgumentParseError::custom(format!(
                "unexpected trailing input '{}'",
                whole.remaining().join(" ")
            )))
        }
    }
}

/// Invokes a command method through its generated invoker.
pub struct MethodCommandExecutionHandler {
    container: Arc<dyn CommandContainer>,
    method: String,
    invoker: Option<CommandInvoker>,
    arguments: HashMap<String, String>,
    flags: HashMap<String, String>,
    groups: HashMap<String, HashMap<String, String>>,
    defaults: Vec<DefaultValue>,
}

impl MethodCommandExecutionHandler {
    #[must_use]
    pub fn new(context: &CommandMethodContext) -> Self {
        let invoker = match &context.method.body {
            MethodBody::Command(invoker) => Some(Arc::clone(invoker)),
            _ => None,
        };

        let arguments = context
            .arguments
            .iter()
            .map(|argument| (argument.parameter.clone(), argument.name.clone()))
            .collect();

        let mut flags = HashMap::new();
        let mut groups: HashMap<String, HashMap<String, String>> = HashMap::new();
        for flag in &context.flags {
            match &flag.binding {
                FlagBinding::Parameter(parameter) => {
                    flags.insert(parameter.clone(), flag.name.clone());
                }
                FlagBinding::Group {
                    parameter,
                    declared_name,
                } => {
                    groups
                        .entry(parameter.clone())
                        .or_default()
                        .insert(declared_name.clone(), flag.name.clone());
                }
            }
        }

        let defaults = context
            .components
            .iter()
            .filter(|component| !component.required)
            .filter_map(|component| {
                component.default_value.as_ref().map(|raw| DefaultValue {
                    component: component.clone(),
                    raw: raw.clone(),
                })
            })
            .collect();

        Self {
            container: Arc::clone(&context.container),
            method: context.method.name.clone(),
            invoker,
            arguments,
            flags,
            groups,
            defaults,
        }
    }

    fn parse_defaults(
        &self,
        context: &CommandContext,
    ) -> Result<HashMap<String, ArgumentValue>, ExecutionError> {
        let mut values = HashMap::new();
        for default in &self.defaults {
            let name = &default.component.name;
            if context.contains_argument(name) {
                continue;
            }
            let value = default
                .parse(context)
                .map_err(|source| ExecutionError::InvalidDefault {
                    name: name.clone(),
                    value: default.raw.clone(),
                    source,
                })?;
            values.insert(name.clone(), value);
        }
        Ok(values)
    }
}

impl CommandExecutionHandler for MethodCommandExecutionHandler {
    fn execute(&self, context: &CommandContext) -> Result<(), ExecutionError> {
        let Some(invoker) = &self.invoker else {
            return Err(ExecutionError::NotExecutable(self.method.clone()));
        };

        let invocation = Invocation {
            context,
            arguments: &self.arguments,
            flags: &self.flags,
            groups: &self.groups,
            defaults: self.parse_defaults(context)?,
        };

        invoker(self.container.as_any(), &invocation)
    }
}

impl fmt::Debug for MethodCommandExecutionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodCommandExecutionHandler")
            .field("method", &self.method)
            .field("arguments", &self.arguments)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
