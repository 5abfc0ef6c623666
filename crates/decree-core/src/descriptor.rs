//! Raw descriptors produced by the extractors.

use std::fmt;

use crate::{annotation::AnnotationSet, metadata::TypeKey, syntax::SyntaxFragment};

/// Identifies a method within its container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRef {
    pub container: String,
    pub index: usize,
    pub name: String,
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.container, self.name)
    }
}

/// One command declared by a method. A method with several syntax strings
/// yields one descriptor per string.
#[derive(Debug, Clone)]
pub struct CommandDescriptor {
    pub root_token: String,
    pub syntax: Vec<SyntaxFragment>,
    pub required_sender: Option<TypeKey>,
    pub method: MethodRef,
}

impl CommandDescriptor {
    /// Fragments after the root token.
    #[must_use]
    pub fn tail(&self) -> &[SyntaxFragment] {
        self.syntax.get(1..).unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct ArgumentDescriptor {
    /// The syntax variable this argument binds to.
    pub name: String,
    /// The method parameter receiving the value.
    pub parameter: String,
    pub value_type: TypeKey,
    pub required: bool,
    pub default_value: Option<String>,
    pub parser_name: Option<String>,
    pub suggestions_name: Option<String>,
    pub description: Option<String>,
    /// The parameter's annotations, read by annotation and preprocessor mappers.
    pub annotations: AnnotationSet,
}

/// How a flag reaches the method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagBinding {
    /// The flag is its own parameter.
    Parameter(String),
    /// The flag belongs to a flag group parameter.
    Group {
        parameter: String,
        declared_name: String,
    },
}

#[derive(Debug, Clone)]
pub struct FlagDescriptor {
    pub name: String,
    pub aliases: Vec<String>,
    /// `None` for presence-only flags.
    pub value_type: Option<TypeKey>,
    pub permission: Option<String>,
    pub description: Option<String>,
    pub parser_name: Option<String>,
    pub suggestions_name: Option<String>,
    /// Annotations on the flag parameter, fed to the parameter mappers when
    /// resolving a valued flag's parser. Empty for flag group members.
    pub annotations: AnnotationSet,
    pub binding: FlagBinding,
}

impl FlagDescriptor {
    /// The flag name followed by its aliases.
    pub fn spellings(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_skips_root_token() {
        let descriptor = CommandDescriptor {
            root_token: "ban".to_string(),
            syntax: vec![
                SyntaxFragment::literal("ban", vec![]),
                SyntaxFragment::required("target"),
            ],
            required_sender: None,
            method: MethodRef {
                container: "Moderation".to_string(),
                index: 0,
                name: "ban".to_string(),
            },
        };

        assert_eq!(descriptor.tail(), [SyntaxFragment::required("target")]);
        assert_eq!(descriptor.method.to_string(), "Moderation::ban");
    }

    #[test]
    fn test_spellings_lists_name_then_aliases() {
        let flag = FlagDescriptor {
            name: "silent".to_string(),
            aliases: vec!["s".to_string(), "quiet".to_string()],
            value_type: None,
            permission: None,
            description: None,
            parser_name: None,
            suggestions_name: None,
            annotations: AnnotationSet::new(),
            binding: FlagBinding::Parameter("silent".to_string()),
        };

        assert_eq!(flag.spellings().collect::<Vec<_>>(), vec!["silent", "s", "quiet"]);
    }
}
