//! # Decree
//!
//! Declarative commands for Rust. Command methods are declared on a container
//! type with the `#[command_container]` attribute; the [`AnnotationCompiler`]
//! turns them into [`CompiledCommand`]s that a dispatch engine registers and
//! executes.
//!
//! ## Defining a Container
//!
//! ```ignore
//! use decree::{ArgumentParseError, CommandContext, CommandInput, command_container};
//!
//! #[derive(Default)]
//! pub struct Travel;
//!
//! #[command_container(default)]
//! #[permission("${root}.travel")]
//! impl Travel {
//!     /// Sends the player to a warp.
//!     #[command("warp|w <destination> [speed]")]
//!     fn warp(
//!         &self,
//!         player: &Player,
//!         #[argument] destination: Warp,
//!         #[argument(default = "1")] speed: Option<u8>,
//!         #[flag(alias = "s")] silent: bool,
//!     ) -> decree::Result<()> {
//!         // ...
//!     }
//!
//!     #[parser(suggestions = "warps")]
//!     fn parse_warp(
//!         &self,
//!         context: &CommandContext,
//!         input: &mut CommandInput,
//!     ) -> Result<Warp, ArgumentParseError> {
//!         // ...
//!     }
//!
//!     #[suggestions("warps")]
//!     fn warps(&self, context: &CommandContext, input: &str) -> Vec<String> {
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Compiling
//!
//! Containers register themselves in a global inventory under
//! `module_path!()::Type`. A [`ContainerManifest`] selects the ones to load:
//!
//! ```ignore
//! let manifest = ContainerManifest::load("decree.toml")?;
//! let config = CompilerConfig::builder::<Player>()
//!     .string_processor(manifest.string_processor())
//!     .build();
//! let mut compiler = AnnotationCompiler::new(ParserRegistry::standard(), config);
//!
//! let mut commands = Vec::new();
//! ContainerLoader::new(ContainerCatalog::from_inventory())
//!     .load(&manifest, &mut compiler, &mut commands)?;
//! ```
//!
//! Command methods may return `()` or any `Result<(), E>` whose error
//! converts into [`anyhow::Error`]. Parser methods return `Result<T, E>` with
//! `E: Into<ArgumentParseError>`, and suggestion methods return a `Vec` of
//! anything that converts into a [`Suggestion`].

// Allow proc-macro expansions within this crate to refer to it via `::decree`.
extern crate self as decree;

mod convert;

pub use anyhow::{self, Result, bail, ensure};
pub use decree_core::*;
pub use decree_macro::command_container;
pub use tracing::{debug, error, info, trace, warn};

#[doc(hidden)]
pub mod __private {
    pub use anyhow;
    pub use inventory;

    pub use decree_core::{ContainerEntry, Sealed, sealed};

    pub use crate::convert::{IntoCommandResult, IntoParseResult, IntoSuggestions};
}
