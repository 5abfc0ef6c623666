//! Validate a container manifest.
//!
//! Loads the manifest, lists its properties and containers, and checks every
//! enabled container against the catalog linked into this binary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use decree::{ContainerCatalog, ContainerManifest};
use tracing::warn;

/// Command-line arguments for the manifest command.
#[derive(Args)]
pub struct ManifestArgs {
    /// Path to the manifest file
    pub path: PathBuf,
}

/// How a manifest entry relates to the linked catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryStatus {
    Linked,
    Disabled,
    Missing,
}

pub(crate) fn entry_statuses<'a>(
    manifest: &'a ContainerManifest,
    catalog: &ContainerCatalog,
) -> Vec<(&'a str, EntryStatus)> {
    manifest
        .containers
        .iter()
        .map(|container| {
            let status = match (container.enabled, catalog.lookup(&container.name)) {
                (false, _) => EntryStatus::Disabled,
                (true, Some(_)) => EntryStatus::Linked,
                (true, None) => EntryStatus::Missing,
            };
            (container.name.as_str(), status)
        })
        .collect()
}

pub fn run(args: &ManifestArgs) -> Result<()> {
    let manifest = ContainerManifest::load(&args.path)
        .with_context(|| format!("failed to load {}", args.path.display()))?;
    let catalog = ContainerCatalog::from_inventory();

    if manifest.properties.is_empty() {
        println!("{}", style("No properties").dim());
    } else {
        println!("{}", style("Properties").bold());
        for (key, value) in &manifest.properties {
            println!("  {key:<20} {value}");
        }
    }

    println!("\n{}", style("Containers").bold());
    let statuses = entry_statuses(&manifest, &catalog);
    for (name, status) in &statuses {
        let label = match status {
            EntryStatus::Linked => style("linked").green(),
            EntryStatus::Disabled => style("disabled").dim(),
            EntryStatus::Missing => {
                warn!(container = %name, "Container is not linked into this binary");
                style("missing").red()
            }
        };
        println!("  {name:<50} {label}");
    }

    let enabled = manifest.enabled_containers().count();
    println!(
        "\n{} {} container(s), {} enabled",
        style("✓").green(),
        statuses.len(),
        enabled
    );

    Ok(())
}
