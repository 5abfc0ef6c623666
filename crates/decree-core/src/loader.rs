//! Container discovery and instantiation.
//!
//! `#[command_container]` submits a [`ContainerEntry`] for every container
//! type to a global [`inventory`]. The [`ContainerLoader`] looks the names
//! listed in a [`ContainerManifest`] up in that catalog, instantiates each
//! container through an ordered list of [`ConstructionStrategy`]s and hands it
//! to the [`AnnotationCompiler`].
//!
//! # Sealed Pattern
//!
//! [`ContainerEntry`] carries a `__sealed: Sealed` field so entries are only
//! created by generated code.

use std::{collections::HashMap, fmt, sync::Arc};

use tracing::{debug, info};

use crate::{
    command::CommandRegistrar,
    compiler::AnnotationCompiler,
    error::CompileError,
    manifest::ContainerManifest,
    metadata::CommandContainer,
};

/// Builds a container from the compiler that will compile it.
pub type CompilerConstructorFn = fn(&AnnotationCompiler) -> Arc<dyn CommandContainer>;

/// Builds a container without arguments.
pub type NoArgConstructorFn = fn() -> Arc<dyn CommandContainer>;

/// Marker type to prevent direct construction of [`ContainerEntry`].
#[doc(hidden)]
#[derive(Debug, Clone, Copy)]
pub struct Sealed(pub(crate) ());

#[doc(hidden)]
#[must_use]
pub const fn sealed() -> Sealed {
    Sealed(())
}

/// Registration entry for a command container.
#[derive(Debug)]
pub struct ContainerEntry {
    /// Fully qualified type name, e.g. `my_plugin::commands::Moderation`.
    pub name: &'static str,
    pub with_compiler: Option<CompilerConstructorFn>,
    pub no_args: Option<NoArgConstructorFn>,
    /// Sealed field to prevent manual construction
    #[doc(hidden)]
    pub __sealed: Sealed,
}

inventory::collect!(ContainerEntry);

/// One way of instantiating a container from its entry.
pub trait ConstructionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns `None` when the entry does not support this strategy.
    fn attempt(
        &self,
        entry: &ContainerEntry,
        compiler: &AnnotationCompiler,
    ) -> Option<Arc<dyn CommandContainer>>;
}

/// Calls a constructor that receives the compiler.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompilerConstructor;

impl ConstructionStrategy for CompilerConstructor {
    fn name(&self) -> &'static str {
        "compiler constructor"
    }

    fn attempt(
        &self,
        entry: &ContainerEntry,
        compiler: &AnnotationCompiler,
    ) -> Option<Arc<dyn CommandContainer>> {
        entry.with_compiler.map(|construct| construct(compiler))
    }
}

/// Calls a constructor without arguments.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoArgConstructor;

impl ConstructionStrategy for NoArgConstructor {
    fn name(&self) -> &'static str {
        "no-argument constructor"
    }

    fn attempt(
        &self,
        entry: &ContainerEntry,
        _compiler: &AnnotationCompiler,
    ) -> Option<Arc<dyn CommandContainer>> {
        entry.no_args.map(|construct| construct())
    }
}

/// Container entries indexed by name.
#[derive(Debug, Default)]
pub struct ContainerCatalog {
    entries: HashMap<&'static str, &'static ContainerEntry>,
}

impl ContainerCatalog {
    /// Every entry submitted to the global inventory.
    #[must_use]
    pub fn from_inventory() -> Self {
        Self::from_entries(inventory::iter::<ContainerEntry>)
    }

    /// The first entry wins when two share a name.
    pub fn from_entries(entries: impl IntoIterator<Item = &'static ContainerEntry>) -> Self {
        let mut catalog = Self::default();
        for entry in entries {
            catalog.entries.entry(entry.name).or_insert(entry);
        }
        catalog
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&'static ContainerEntry> {
        self.entries.get(name).copied()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What a [`ContainerLoader::load`] run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Loaded container names with the number of commands each registered.
    pub loaded: Vec<(String, usize)>,
    /// Containers skipped because the manifest disables them.
    pub disabled: Vec<String>,
}

impl LoadReport {
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.loaded.iter().map(|(_, count)| count).sum()
    }
}

pub struct ContainerLoader {
    catalog: ContainerCatalog,
    strategies: Vec<Box<dyn ConstructionStrategy>>,
}

impl ContainerLoader {
    /// A loader trying the compiler constructor, then the no-argument one.
    #[must_use]
    pub fn new(catalog: ContainerCatalog) -> Self {
        Self::with_strategies(
            catalog,
            vec![Box::new(CompilerConstructor), Box::new(NoArgConstructor)],
        )
    }

    #[must_use]
    pub fn with_strategies(
        catalog: ContainerCatalog,
        strategies: Vec<Box<dyn ConstructionStrategy>>,
    ) -> Self {
        Self {
            catalog,
            strategies,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &ContainerCatalog {
        &self.catalog
    }

    /// Instantiates the container registered as `name`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::ContainerConstruction`] when the name is not in
    /// the catalog or no strategy can construct it.
    pub fn instantiate(
        &self,
        name: &str,
        compiler: &AnnotationCompiler,
    ) -> Result<Arc<dyn CommandContainer>, CompileError> {
        let entry = self
            .catalog
            .lookup(name)
            .ok_or_else(|| CompileError::ContainerConstruction {
                container: name.to_string(),
                reason: "no container is registered under this name".to_string(),
            })?;

        for strategy in &self.strategies {
            if let Some(container) = strategy.attempt(entry, compiler) {
                debug!(container = %name, strategy = strategy.name(), "Instantiated container");
                return Ok(container);
            }
        }

        let tried: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        Err(CompileError::ContainerConstruction {
            container: name.to_string(),
            reason: format!("no usable constructor (tried: {})", tried.join(", ")),
        })
    }

    /// Loads and compiles every enabled container of `manifest`, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first container that fails to construct or compile.
    pub fn load(
        &self,
        manifest: &ContainerManifest,
        compiler: &mut AnnotationCompiler,
        registrar: &mut dyn CommandRegistrar,
    ) -> Result<LoadReport, CompileError> {
        let mut report = LoadReport::default();

        for config in &manifest.containers {
            if !config.enabled {
                debug!(container = %config.name, "Skipping disabled container");
                report.disabled.push(config.name.clone());
                continue;
            }

            let container = self.instantiate(&config.name, compiler)?;
            let count = compiler.parse(container, registrar)?;
            report.loaded.push((config.name.clone(), count));
        }

        info!(
            containers = report.loaded.len(),
            commands = report.command_count(),
            "Loaded command containers"
        );
        Ok(report)
    }
}

impl fmt::Debug for ContainerLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strategies: Vec<&str> = self.strategies.iter().map(|s| s.name()).collect();
        f.debug_struct("ContainerLoader")
            .field("catalog", &self.catalog)
            .field("strategies", &strategies)
            .finish()
    }
}
