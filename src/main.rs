use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use retroquest_sync::logging;
use retroquest_sync::retro_config::{LogFormat, RetroConfig};

mod cmd;

#[derive(Parser)]
#[command(name = "retroquest")]
#[command(version, about = "Realtime sync client for RetroQuest boards")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to retroquest.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Server base URL. Overrides RETROQUEST_BASE_URL and the config file.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Team name as entered at login. Overrides RETROQUEST_TEAM and the config file.
    #[arg(long, global = true)]
    pub team: Option<String>,

    /// Team token. Overrides RETROQUEST_TOKEN and the config file.
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the STOMP destination an outgoing change would be sent to
    Destination {
        /// Item kind: thought, action-item or column-title
        kind: String,
        /// Action: create, edit or delete
        action: String,
        /// Item id (ignored for creates)
        #[arg(long, default_value = "-1")]
        id: i64,
    },
    /// Print the topics a session subscribes to
    Topics,
    /// Fetch the current board over HTTP and print it as JSON
    Fetch {
        /// Only fetch one collection: thought, action-item or column-title
        #[arg(long)]
        kind: Option<String>,
    },
    /// Connect and print incoming changes as JSON lines
    Listen {
        /// Stop after this many seconds (runs until Ctrl-C when omitted)
        #[arg(long)]
        seconds: Option<u64>,
        /// Also fetch and print the current board before listening
        #[arg(long)]
        fetch: bool,
    },
    /// Connect and publish a single change
    Send {
        #[command(subcommand)]
        command: SendCommands,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum SendCommands {
    /// Post a new thought
    Thought {
        message: String,
        /// Column: happy, confused or sad
        #[arg(long, default_value = "happy")]
        topic: String,
    },
    /// Add an action item; an `@name` in the text becomes the assignee
    ActionItem { entry: String },
    /// Rename a column
    ColumnTitle {
        id: i64,
        /// Column: happy, confused or sad
        topic: String,
        title: String,
    },
    /// Delete a thought or action item by id
    Delete {
        /// Item kind: thought or action-item
        kind: String,
        id: i64,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration file
    Validate,
    /// Initialize a default retroquest.toml file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = RetroConfig::with_cli_args(
        cli.config.clone(),
        cli.base_url.clone(),
        cli.team.clone(),
        cli.token.clone(),
    )?;
    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        config.logging().format
    };
    logging::init(&config.logging().level, format, cli.verbose)?;

    match &cli.command {
        Commands::Destination { kind, action, id } => {
            cmd::cmd_destination(&config, kind, action, *id)?
        }
        Commands::Topics => cmd::cmd_topics(&config)?,
        Commands::Fetch { kind } => cmd::cmd_fetch(&config, kind.as_deref()).await?,
        Commands::Listen { seconds, fetch } => cmd::cmd_listen(&config, *seconds, *fetch).await?,
        Commands::Send { command } => cmd::cmd_send(&config, command.clone()).await?,
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
    }

    Ok(())
}
