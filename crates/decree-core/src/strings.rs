//! Processing applied to every externally authored string before it is
//! interpreted: syntax text, descriptions, permissions and flag names.

use std::collections::BTreeMap;

pub trait StringProcessor: Send + Sync {
    fn process(&self, input: &str) -> String;
}

/// Returns its input unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStringProcessor;

impl StringProcessor for NoopStringProcessor {
    fn process(&self, input: &str) -> String {
        input.to_string()
    }
}

/// Replaces `${key}` placeholders with property values.
///
/// Unknown keys and unterminated placeholders are left as written.
#[derive(Debug, Default, Clone)]
pub struct PropertyStringProcessor {
    properties: BTreeMap<String, String>,
}

impl PropertyStringProcessor {
    #[must_use]
    pub fn new(properties: BTreeMap<String, String>) -> Self {
        Self { properties }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }
}

impl StringProcessor for PropertyStringProcessor {
    fn process(&self, input: &str) -> String {
        let mut output = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(start) = rest.find("${") {
            output.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                output.push_str(&rest[start..]);
                return output;
            };

            let key = &after[..end];
            match self.properties.get(key) {
                Some(value) => output.push_str(value),
                None => output.push_str(&rest[start..start + 2 + end + 1]),
            }
            rest = &after[end + 1..];
        }

        output.push_str(rest);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_processor_returns_input() {
        assert_eq!(NoopStringProcessor.process("ban <target>"), "ban <target>");
    }

    #[test]
    fn test_property_processor_substitutes_known_keys() {
        // Arrange
        let processor = PropertyStringProcessor::default()
            .with("root", "mod")
            .with("perm", "moderation.ban");

        // Act
        let syntax = processor.process("${root} ban <target>");
        let permission = processor.process("${perm}");

        // Assert
        assert_eq!(syntax, "mod ban <target>");
        assert_eq!(permission, "moderation.ban");
    }

    #[test]
    fn test_property_processor_keeps_unknown_and_unterminated_placeholders() {
        let processor = PropertyStringProcessor::default().with("a", "1");

        assert_eq!(processor.process("${a}-${b}"), "1-${b}");
        assert_eq!(processor.process("x ${a"), "x ${a");
        assert_eq!(processor.process("${}"), "${}");
    }
}
