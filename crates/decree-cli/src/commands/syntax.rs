//! Parse a syntax string and print its fragments.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use decree::{
    ArgumentMode, PropertyStringProcessor, StandardSyntaxParser, StringProcessor, SyntaxFragment,
    SyntaxParser, render,
};

/// Command-line arguments for the syntax command.
#[derive(Args)]
pub struct SyntaxArgs {
    /// Syntax string, e.g. `ban|b <target> [reason] --silent`
    pub syntax: String,

    /// Print the fragments as JSON
    #[arg(long)]
    pub json: bool,

    /// Property substituted into `${key}` placeholders before parsing
    #[arg(short, long = "property", value_name = "KEY=VALUE", value_parser = super::parse_property)]
    pub properties: Vec<(String, String)>,
}

/// The templated syntax and its parsed form.
#[derive(Debug, serde::Serialize)]
pub(crate) struct ParsedSyntax {
    pub syntax: String,
    pub canonical: String,
    pub fragments: Vec<SyntaxFragment>,
}

pub(crate) fn parse(args: &SyntaxArgs) -> Result<ParsedSyntax> {
    let strings = PropertyStringProcessor::new(args.properties.iter().cloned().collect());
    let syntax = strings.process(&args.syntax);
    let fragments = StandardSyntaxParser
        .parse(&syntax)
        .with_context(|| format!("invalid syntax '{syntax}'"))?;

    Ok(ParsedSyntax {
        canonical: render(&fragments),
        syntax,
        fragments,
    })
}

fn mode_label(mode: ArgumentMode) -> &'static str {
    match mode {
        ArgumentMode::Literal => "literal",
        ArgumentMode::Required => "required",
        ArgumentMode::Optional => "optional",
        ArgumentMode::Flag => "flag",
    }
}

pub fn run(args: &SyntaxArgs) -> Result<()> {
    let parsed = parse(args)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
        return Ok(());
    }

    println!(
        "{:<10} {:<20} {}",
        style("MODE").bold(),
        style("NAME").bold(),
        style("ALIASES").bold()
    );
    println!("{}", "-".repeat(50));
    for fragment in &parsed.fragments {
        println!(
            "{:<10} {:<20} {}",
            mode_label(fragment.mode()),
            fragment.major(),
            fragment.minor().join(", ")
        );
    }
    println!(
        "\n{} {}",
        style("canonical:").dim(),
        style(&parsed.canonical).cyan()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(syntax: &str, properties: &[(&str, &str)]) -> SyntaxArgs {
        SyntaxArgs {
            syntax: syntax.to_string(),
            json: false,
            properties: properties
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_parse_applies_properties_before_parsing() {
        // Arrange
        let args = args("${root}|b <target>  [reason]", &[("root", "ban")]);

        // Act
        let parsed = parse(&args).expect("syntax parses");

        // Assert
        assert_eq!(parsed.syntax, "ban|b <target>  [reason]");
        assert_eq!(parsed.canonical, "ban|b <target> [reason]");
        assert_eq!(parsed.fragments.len(), 3);
        assert_eq!(parsed.fragments[0].minor(), ["b".to_string()]);
    }

    #[test]
    fn test_parse_reports_grammar_errors() {
        let err = parse(&args("ban [reason] <target>", &[])).expect_err("invalid syntax");

        assert!(err.to_string().contains("invalid syntax 'ban [reason] <target>'"));
    }

    #[test]
    fn test_parsed_syntax_serializes_fragment_modes() {
        let parsed = parse(&args("mute <target> --quiet", &[])).expect("syntax parses");

        let json = serde_json::to_value(&parsed).expect("serializes");

        assert_eq!(json["canonical"], "mute <target> --quiet");
        assert_eq!(json["fragments"][2]["mode"], "flag");
        assert_eq!(json["fragments"][1]["major"], "target");
    }
}
