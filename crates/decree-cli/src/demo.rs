//! A moderation container bundled into the CLI so `decree inspect` has
//! something to compile.

use std::sync::Mutex;

use decree::{
    ArgumentParseError, CommandContext, CommandInput, CompilerConfig, PropertyStringProcessor,
    Suggestion, command_container,
};
use tracing::info;

const ONLINE: [&str; 4] = ["alex", "blair", "casey", "drew"];

/// Any command source.
#[derive(Debug, Clone)]
pub struct Actor {
    pub name: String,
}

/// A command source that is a connected player.
#[derive(Debug, Clone)]
pub struct Player {
    pub name: String,
}

/// A player name accepted by the moderation commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target(pub String);

/// Compiler configuration for containers written against [`Actor`].
pub fn compiler_config(strings: PropertyStringProcessor) -> CompilerConfig {
    CompilerConfig::builder::<Actor>()
        .sender_subtype::<Player>()
        .string_processor(strings)
        .build()
}

#[derive(Debug, Default)]
pub struct Moderation {
    /// Banned player names with the reason given.
    banned: Mutex<Vec<(String, String)>>,
}

#[command_container(name = "demo::Moderation", default)]
#[permission("${root}.moderation")]
impl Moderation {
    /// Bans a player from the server.
    #[command("ban|b <target> [reason]")]
    #[permission("${root}.ban")]
    #[proxied_by("banish")]
    fn ban(
        &self,
        actor: &Actor,
        #[argument] target: Target,
        #[argument(default = "no reason given", description = "Shown to the banned player")]
        reason: Option<String>,
        #[flag(alias = "s", description = "Do not announce the ban")] silent: bool,
    ) -> anyhow::Result<()> {
        if actor.name == target.0 {
            anyhow::bail!("{} cannot ban themselves", actor.name);
        }
        let reason = reason.unwrap_or_default();
        info!(
            actor = %actor.name,
            target = %target.0,
            reason = %reason,
            silent,
            "Banned player"
        );
        self.banned
            .lock()
            .map_err(|_| anyhow::anyhow!("ban list is poisoned"))?
            .push((target.0, reason));
        Ok(())
    }

    /// Mutes a player for a number of minutes.
    #[command("mute <target> [minutes] --quiet")]
    fn mute(
        &self,
        player: &Player,
        #[argument] target: Target,
        #[argument(default = "10")] minutes: Option<u32>,
        #[flag] quiet: bool,
        #[flag(name = "note", permission = "${root}.mute.note")] note: Option<String>,
    ) {
        info!(
            player = %player.name,
            target = %target.0,
            minutes = minutes.unwrap_or_default(),
            quiet,
            note = note.as_deref().unwrap_or_default(),
            "Muted player"
        );
    }

    /// Erases every record of a player.
    #[command("wipe <name>")]
    #[confirmation]
    #[hidden]
    fn wipe(
        &self,
        #[argument]
        #[regex("^[a-z]{3,16}$", message = "'{input}' is not a player name")]
        name: String,
    ) {
        info!(name = %name, "Wiped player records");
    }

    #[parser(suggestions = "online")]
    fn target(
        &self,
        _context: &CommandContext,
        input: &mut CommandInput,
    ) -> Result<Target, ArgumentParseError> {
        let name = input.read().ok_or_else(|| ArgumentParseError::MissingInput {
            expected: "player".to_string(),
        })?;
        if ONLINE.contains(&name.as_str()) {
            Ok(Target(name))
        } else {
            Err(ArgumentParseError::Invalid {
                input: name,
                expected: "online player".to_string(),
            })
        }
    }

    #[suggestions("online")]
    fn online(&self, _context: &CommandContext, input: &str) -> Vec<Suggestion> {
        ONLINE
            .iter()
            .filter(|name| name.starts_with(input))
            .map(|name| Suggestion::simple(*name).with_tooltip("online"))
            .collect()
    }
}
