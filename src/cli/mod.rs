//! Command-line interface.

pub mod completions;
pub mod diff;
pub mod init;
pub mod login;
pub mod logout;
pub mod output;
pub mod pull;
pub mod push;
pub mod run;
pub mod sync;
pub mod whoami;

use clap::{Parser, Subcommand};

use crate::api::http::HttpClient;
use crate::auth::Keyring;
use crate::error::Result;

/// Warren - a GitHub-permission-gated secrets manager agent.
#[derive(Parser)]
#[command(
    name = "warren",
    about = "Sync vault secrets with your working copy and inject them into processes",
    version,
    after_help = "Share nothing. Ship everything. 🐇"
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Link this directory to a repository vault
    Init {
        /// Repository slug (owner/repo); detected from the git remote if omitted
        #[arg(short, long)]
        repo: Option<String>,
    },

    /// Authenticate this machine with the vault service
    Login {
        /// Import an existing token instead of running the device flow
        #[arg(long)]
        token: Option<String>,
    },

    /// Remove the stored credential
    Logout,

    /// Show the authenticated account
    Whoami,

    /// Push local secrets to the vault (additive by default)
    Push {
        /// Target environment (default: configured or development)
        #[arg(short, long)]
        env: Option<String>,
        /// Local secret file to read
        #[arg(short, long)]
        file: Option<String>,
        /// Also delete remote keys missing from the local file
        #[arg(long)]
        prune: bool,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Pull the vault snapshot into the local secret file
    Pull {
        /// Source environment
        #[arg(short, long)]
        env: Option<String>,
        /// Local secret file to write
        #[arg(short, long)]
        file: Option<String>,
        /// Overwrite an existing file without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Compare the local file with the vault, or two environments
    Diff {
        /// Environment to compare against the local file
        #[arg(short, long)]
        env: Option<String>,
        /// Compare `--env` with this second environment instead of the file
        #[arg(long)]
        against: Option<String>,
        /// Local secret file to read
        #[arg(short, long)]
        file: Option<String>,
        /// Print key names only
        #[arg(long)]
        keys_only: bool,
        /// Machine-readable JSON output
        #[arg(long)]
        json: bool,
        /// Include secret values in the output
        #[arg(long)]
        reveal: bool,
    },

    /// Run a command with vault secrets injected as env vars
    Run {
        /// Source environment
        #[arg(short, long)]
        env: Option<String>,
        /// Command and arguments to run
        #[arg(trailing_var_arg = true)]
        command: Vec<String>,
    },

    /// Sync the vault with the linked provider
    Sync {
        /// Direction: push (vault → provider) or pull (provider → vault)
        #[arg(long, value_enum, default_value_t = DirectionArg::Push)]
        direction: DirectionArg,
        /// Environment whose vault snapshot takes part in the sync
        #[arg(short, long)]
        env: Option<String>,
        /// Allow deleting destination-only keys
        #[arg(long)]
        allow_delete: bool,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Sync direction flag.
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum DirectionArg {
    Push,
    Pull,
}

impl std::fmt::Display for DirectionArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DirectionArg::Push => write!(f, "push"),
            DirectionArg::Pull => write!(f, "pull"),
        }
    }
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Whether a mutating command must prompt before its APPLY phase.
///
/// `--yes` skips the prompt. Without it, a session that cannot prompt
/// (piped stdin) must fail loudly instead of quietly applying nothing.
pub(crate) fn require_confirmation(yes: bool, interactive: bool) -> Result<bool> {
    if yes {
        return Ok(false);
    }
    if !interactive {
        return Err(crate::error::Error::ConfirmationRequired);
    }
    Ok(true)
}

/// Execute a command.
pub fn execute(command: Command) -> Result<()> {
    use Command::*;

    // Commands with no remote side don't need a client.
    match command {
        Init { repo } => return init::execute(repo),
        Completions { shell } => return completions::execute(shell),
        _ => {}
    }

    let api = HttpClient::new()?;
    let store = Keyring::new();

    match command {
        Login { token } => login::execute(&api, &store, token),
        Logout => logout::execute(&store),
        Whoami => whoami::execute(&api, &store),
        Push {
            env,
            file,
            prune,
            yes,
        } => push::execute(&api, &store, env.as_deref(), file.as_deref(), prune, yes),
        Pull { env, file, yes } => {
            pull::execute(&api, &store, env.as_deref(), file.as_deref(), yes)
        }
        Diff {
            env,
            against,
            file,
            keys_only,
            json,
            reveal,
        } => diff::execute(
            &api,
            &store,
            diff::Options {
                env: env.as_deref(),
                against: against.as_deref(),
                file: file.as_deref(),
                keys_only,
                json,
                reveal,
            },
        ),
        Run { env, command } => run::execute(&api, &store, env.as_deref(), &command),
        Sync {
            direction,
            env,
            allow_delete,
            yes,
        } => sync::execute(&api, &store, direction, env.as_deref(), allow_delete, yes),
        Init { .. } | Completions { .. } => unreachable!("handled above"),
    }
}
