//! The command definition interface consumed by a dispatch engine.
//!
//! [`CommandBuilder`] is persistent: every operation consumes the builder and
//! returns the next state, which lets builder modifiers be chained as plain
//! functions. [`CommandBuilder::build`] produces a [`CompiledCommand`], the
//! artifact handed to a [`CommandRegistrar`].

use std::{fmt, sync::Arc};

use crate::{
    capability::{ArgumentParser, ComponentPreprocessor, SuggestionProvider},
    context::{CommandContext, ExecutionError},
    metadata::TypeKey,
};

/// An assembled argument component.
#[derive(Clone)]
pub struct CommandComponent {
    pub name: String,
    pub value_type: TypeKey,
    pub parser: Arc<dyn ArgumentParser>,
    pub suggestions: Arc<dyn SuggestionProvider>,
    pub required: bool,
    pub default_value: Option<String>,
    pub description: Option<String>,
    pub preprocessors: Vec<Arc<dyn ComponentPreprocessor>>,
}

impl fmt::Debug for CommandComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandComponent")
            .field("name", &self.name)
            .field("value_type", &self.value_type)
            .field("required", &self.required)
            .field("default_value", &self.default_value)
            .field("description", &self.description)
            .field("preprocessors", &self.preprocessors.len())
            .finish_non_exhaustive()
    }
}

/// An assembled flag. Presence-only flags carry no parser.
#[derive(Clone)]
pub struct CommandFlag {
    pub name: String,
    pub aliases: Vec<String>,
    pub permission: Option<String>,
    pub description: Option<String>,
    pub value_type: Option<TypeKey>,
    pub parser: Option<Arc<dyn ArgumentParser>>,
    pub suggestions: Option<Arc<dyn SuggestionProvider>>,
}

impl CommandFlag {
    #[must_use]
    pub fn is_presence(&self) -> bool {
        self.parser.is_none()
    }
}

impl fmt::Debug for CommandFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandFlag")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("permission", &self.permission)
            .field("value_type", &self.value_type)
            .finish_non_exhaustive()
    }
}

/// Ordered string metadata attached to a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandMeta {
    entries: Vec<(String, String)>,
}

impl CommandMeta {
    pub const DESCRIPTION: &'static str = "description";
    pub const CONFIRMATION_REQUIRED: &'static str = "confirmation_required";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key`, replacing an existing value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.get(Self::DESCRIPTION)
    }

    #[must_use]
    pub fn confirmation_required(&self) -> bool {
        self.get(Self::CONFIRMATION_REQUIRED) == Some("true")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Executes a compiled command against a populated context.
pub trait CommandExecutionHandler: Send + Sync {
    /// # Errors
    ///
    /// Returns an [`ExecutionError`] when the command's method cannot be
    /// invoked or fails.
    fn execute(&self, context: &CommandContext) -> Result<(), ExecutionError>;
}

/// One node of a command path.
#[derive(Debug, Clone)]
pub enum CommandNode {
    Literal { name: String, aliases: Vec<String> },
    Argument(CommandComponent),
}

impl fmt::Display for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal { name, aliases } => {
                f.write_str(name)?;
                for alias in aliases {
                    write!(f, "|{alias}")?;
                }
                Ok(())
            }
            Self::Argument(component) if component.required => write!(f, "<{}>", component.name),
            Self::Argument(component) => write!(f, "[{}]", component.name),
        }
    }
}

/// Builds a [`CompiledCommand`].
#[derive(Clone)]
pub struct CommandBuilder {
    nodes: Vec<CommandNode>,
    sender_type: Option<TypeKey>,
    permission: Option<String>,
    hidden: bool,
    meta: CommandMeta,
    flags: Vec<CommandFlag>,
    handler: Option<Arc<dyn CommandExecutionHandler>>,
    proxy_of: Option<String>,
}

impl CommandBuilder {
    /// Starts a command rooted at the literal `root`.
    pub fn new(root: impl Into<String>, aliases: Vec<String>) -> Self {
        Self {
            nodes: vec![CommandNode::Literal {
                name: root.into(),
                aliases,
            }],
            sender_type: None,
            permission: None,
            hidden: false,
            meta: CommandMeta::new(),
            flags: Vec::new(),
            handler: None,
            proxy_of: None,
        }
    }

    pub fn literal(mut self, name: impl Into<String>, aliases: Vec<String>) -> Self {
        self.nodes.push(CommandNode::Literal {
            name: name.into(),
            aliases,
        });
        self
    }

    pub fn argument(mut self, component: CommandComponent) -> Self {
        self.nodes.push(CommandNode::Argument(component));
        self
    }

    pub fn sender_type(mut self, sender_type: TypeKey) -> Self {
        self.sender_type = Some(sender_type);
        self
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key, value);
        self
    }

    pub fn flag(mut self, flag: CommandFlag) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn handler(mut self, handler: Arc<dyn CommandExecutionHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Makes this command delegate to `target`.
    ///
    /// Everything after the target's root, its flags, sender restriction,
    /// permission, metadata and handler are copied onto this builder.
    pub fn proxies(mut self, target: &CompiledCommand) -> Self {
        self.nodes.truncate(1);
        self.nodes.extend(target.nodes.iter().skip(1).cloned());
        self.flags.clone_from(&target.flags);
        self.sender_type = target.sender_type;
        self.permission.clone_from(&target.permission);
        self.meta = target.meta.clone();
        self.handler.clone_from(&target.handler);
        self.proxy_of = Some(target.root().to_string());
        self
    }

    #[must_use]
    pub fn current_permission(&self) -> Option<&str> {
        self.permission.as_deref()
    }

    #[must_use]
    pub fn current_meta(&self) -> &CommandMeta {
        &self.meta
    }

    #[must_use]
    pub fn build(self) -> CompiledCommand {
        CompiledCommand {
            nodes: self.nodes,
            sender_type: self.sender_type,
            permission: self.permission,
            hidden: self.hidden,
            meta: self.meta,
            flags: self.flags,
            handler: self.handler,
            proxy_of: self.proxy_of,
        }
    }
}

impl fmt::Debug for CommandBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuilder")
            .field("nodes", &self.nodes)
            .field("sender_type", &self.sender_type)
            .field("permission", &self.permission)
            .field("hidden", &self.hidden)
            .field("meta", &self.meta)
            .field("flags", &self.flags)
            .field("has_handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}

/// A finished command definition, ready for registration.
#[derive(Clone)]
pub struct CompiledCommand {
    nodes: Vec<CommandNode>,
    sender_type: Option<TypeKey>,
    permission: Option<String>,
    hidden: bool,
    meta: CommandMeta,
    flags: Vec<CommandFlag>,
    handler: Option<Arc<dyn CommandExecutionHandler>>,
    proxy_of: Option<String>,
}

impl CompiledCommand {
    /// The root literal.
    #[must_use]
    pub fn root(&self) -> &str {
        match self.nodes.first() {
            Some(CommandNode::Literal { name, .. }) => name,
            Some(CommandNode::Argument(component)) => &component.name,
            None => "",
        }
    }

    /// The full command path, root first.
    #[must_use]
    pub fn path(&self) -> &[CommandNode] {
        &self.nodes
    }

    pub fn components(&self) -> impl Iterator<Item = &CommandComponent> {
        self.nodes.iter().filter_map(|node| match node {
            CommandNode::Argument(component) => Some(component),
            CommandNode::Literal { .. } => None,
        })
    }

    #[must_use]
    pub fn component(&self, name: &str) -> Option<&CommandComponent> {
        self.components().find(|component| component.name == name)
    }

    #[must_use]
    pub fn sender_type(&self) -> Option<TypeKey> {
        self.sender_type
    }

    #[must_use]
    pub fn permission(&self) -> Option<&str> {
        self.permission.as_deref()
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    #[must_use]
    pub fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    #[must_use]
    pub fn flags(&self) -> &[CommandFlag] {
        &self.flags
    }

    /// The root of the command this one proxies, if any.
    #[must_use]
    pub fn proxy_of(&self) -> Option<&str> {
        self.proxy_of.as_deref()
    }

    #[must_use]
    pub fn handler(&self) -> Option<&Arc<dyn CommandExecutionHandler>> {
        self.handler.as_ref()
    }

    /// Renders the path in syntax notation, e.g. `teleport|tp <target> [reason]`.
    #[must_use]
    pub fn syntax(&self) -> String {
        self.nodes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs the bound handler.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::NotExecutable`] when no handler is bound, or
    /// whatever the handler returns.
    pub fn execute(&self, context: &CommandContext) -> Result<(), ExecutionError> {
        match &self.handler {
            Some(handler) => handler.execute(context),
            None => Err(ExecutionError::NotExecutable(self.root().to_string())),
        }
    }
}

impl fmt::Debug for CompiledCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledCommand")
            .field("syntax", &self.syntax())
            .field("sender_type", &self.sender_type)
            .field("permission", &self.permission)
            .field("hidden", &self.hidden)
            .field("meta", &self.meta)
            .field("flags", &self.flags)
            .field("proxy_of", &self.proxy_of)
            .finish_non_exhaustive()
    }
}

/// Receives finished commands.
pub trait CommandRegistrar {
    fn register(&mut self, command: CompiledCommand);
}

impl CommandRegistrar for Vec<CompiledCommand> {
    fn register(&mut self, command: CompiledCommand) {
        self.push(command);
    }
}
