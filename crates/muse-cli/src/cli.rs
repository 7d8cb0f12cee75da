use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "muse")]
#[command(about = "Browse and like community creations from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub api: ApiArgs,
}

/// Connection flags; each falls back to its environment variable
#[derive(Args, Debug, Default, Clone)]
pub struct ApiArgs {
    /// Base URL of the Muse API [env: MUSE_API_URL]
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Session token sent as a bearer credential [env: MUSE_API_TOKEN]
    #[arg(long, global = true, value_name = "TOKEN")]
    pub token: Option<String>,

    /// Your user id, used to show and toggle your likes [env: MUSE_USER_ID]
    #[arg(long, global = true, value_name = "ID")]
    pub user_id: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show published creations from the community, newest first
    Feed {
        /// Reveal this many extra pages beyond the first
        #[arg(long, default_value = "0")]
        more: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show your own creations
    Mine {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Like or unlike a creation
    Like {
        /// Creation ID
        id: String,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (defaults to stdout)
        #[arg(long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
