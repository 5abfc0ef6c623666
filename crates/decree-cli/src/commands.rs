//! CLI command implementations for `decree`.
//!
//! - **`syntax`**: Parse a syntax string and show its fragments
//! - **`manifest`**: Validate a container manifest against the linked containers
//! - **`inspect`**: Compile the linked containers and list the resulting commands
//!
//! Each command module exports an `*Args` struct implementing `clap::Args` and a
//! `run(&Args) -> Result<()>` function.

pub mod inspect;
pub mod manifest;
pub mod syntax;

/// Parses a `key=value` command-line property.
pub(crate) fn parse_property(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("property '{raw}' has an empty key"));
    }
    Ok((key.to_string(), value.to_string()))
}
