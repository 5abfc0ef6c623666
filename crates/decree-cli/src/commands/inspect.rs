//! Compile the containers linked into this binary and list their commands.
//!
//! Without a manifest every linked container is compiled. With one, only the
//! enabled containers it names are compiled, and its properties feed `${key}`
//! placeholders.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use decree::{
    AnnotationCompiler, CompiledCommand, ContainerCatalog, ContainerConfig, ContainerLoader,
    ContainerManifest, ParserRegistry,
};
use tracing::info;

use crate::demo;

/// Command-line arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// Manifest selecting the containers to compile
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,

    /// Property substituted into `${key}` placeholders, overriding the manifest
    #[arg(short, long = "property", value_name = "KEY=VALUE", value_parser = super::parse_property)]
    pub properties: Vec<(String, String)>,

    /// Print the compiled commands as JSON
    #[arg(long)]
    pub json: bool,
}

/// The parts of a compiled command worth showing.
#[derive(Debug, serde::Serialize)]
pub(crate) struct CommandSummary {
    pub syntax: String,
    pub sender: Option<String>,
    pub permission: Option<String>,
    pub flags: Vec<String>,
    pub description: Option<String>,
    pub hidden: bool,
    pub confirmation: bool,
    pub proxy_of: Option<String>,
}

impl From<&CompiledCommand> for CommandSummary {
    fn from(command: &CompiledCommand) -> Self {
        let flags = command
            .flags()
            .iter()
            .map(|flag| {
                let spellings: Vec<String> = std::iter::once(&flag.name)
                    .chain(&flag.aliases)
                    .map(|name| format!("--{name}"))
                    .collect();
                match &flag.value_type {
                    Some(value_type) => {
                        format!("{} <{}>", spellings.join("|"), short_type_name(value_type.name()))
                    }
                    None => spellings.join("|"),
                }
            })
            .collect();

        Self {
            syntax: command.syntax(),
            sender: command
                .sender_type()
                .map(|sender| short_type_name(sender.name()).to_string()),
            permission: command.permission().map(ToString::to_string),
            flags,
            description: command.meta().description().map(ToString::to_string),
            hidden: command.is_hidden(),
            confirmation: command.meta().confirmation_required(),
            proxy_of: command.proxy_of().map(ToString::to_string),
        }
    }
}

/// `alloc::string::String` becomes `String`.
fn short_type_name(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

fn manifest(args: &InspectArgs, catalog: &ContainerCatalog) -> Result<ContainerManifest> {
    let mut manifest = match &args.manifest {
        Some(path) => ContainerManifest::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => ContainerManifest {
            containers: catalog
                .names()
                .into_iter()
                .map(|name| ContainerConfig {
                    name: name.to_string(),
                    enabled: true,
                })
                .collect(),
            ..ContainerManifest::default()
        },
    };
    manifest.properties.extend(args.properties.iter().cloned());
    Ok(manifest)
}

pub(crate) fn compile(args: &InspectArgs) -> Result<Vec<CompiledCommand>> {
    let catalog = ContainerCatalog::from_inventory();
    let manifest = manifest(args, &catalog)?;

    let config = demo::compiler_config(manifest.string_processor());
    let mut compiler = AnnotationCompiler::new(ParserRegistry::standard(), config);
    let mut commands = Vec::new();
    let report = ContainerLoader::new(catalog)
        .load(&manifest, &mut compiler, &mut commands)
        .context("failed to compile containers")?;

    info!(
        containers = report.loaded.len(),
        disabled = report.disabled.len(),
        commands = report.command_count(),
        "Compiled linked containers"
    );
    Ok(commands)
}

pub fn run(args: &InspectArgs) -> Result<()> {
    let summaries: Vec<CommandSummary> = compile(args)?.iter().map(Into::into).collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No commands compiled");
        return Ok(());
    }

    for summary in &summaries {
        println!("{}", style(&summary.syntax).bold().cyan());
        if let Some(description) = &summary.description {
            println!("  {description}");
        }
        if let Some(sender) = &summary.sender {
            println!("  {:<12} {sender}", style("sender").dim());
        }
        if let Some(permission) = &summary.permission {
            println!("  {:<12} {permission}", style("permission").dim());
        }
        if !summary.flags.is_empty() {
            println!("  {:<12} {}", style("flags").dim(), summary.flags.join(", "));
        }
        if let Some(target) = &summary.proxy_of {
            println!("  {:<12} {target}", style("proxies").dim());
        }
        let mut markers = Vec::new();
        if summary.hidden {
            markers.push("hidden");
        }
        if summary.confirmation {
            markers.push("requires confirmation");
        }
        if !markers.is_empty() {
            println!("  {}", style(markers.join(", ")).yellow());
        }
    }

    println!(
        "\n{} {} command(s) compiled",
        style("✓").green(),
        summaries.len()
    );

    Ok(())
}
