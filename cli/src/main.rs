use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use hearthctl::commands::{friend, member, room, user, watch};
use hearthctl::output;
use hearthctl::session::App;

#[derive(Parser)]
#[command(name = "hearthctl")]
#[command(about = "Command-line interface for Hearth shared-room coordination")]
#[command(version)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (human, json)
    #[arg(short, long, global = true, default_value = "human")]
    format: output::OutputFormat,

    /// Directory for the document store and config
    #[arg(long, global = true, env = "HEARTH_CONFIG_DIR")]
    config_dir: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// User account commands
    User {
        #[command(subcommand)]
        command: user::UserCommands,
    },
    /// Friend request and friend list commands
    Friend {
        #[command(subcommand)]
        command: friend::FriendCommands,
    },
    /// Room management commands
    Room {
        #[command(subcommand)]
        command: room::RoomCommands,
    },
    /// Room member commands
    Member {
        #[command(subcommand)]
        command: member::MemberCommands,
    },
    /// Watch pending requests in real time
    Watch(watch::WatchArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!("hearthctl starting");

    let app = App::new(cli.config_dir.as_deref())?;

    match cli.command {
        Commands::User { command } => user::execute(command, app, cli.format).await?,
        Commands::Friend { command } => friend::execute(command, app, cli.format).await?,
        Commands::Room { command } => room::execute(command, app, cli.format).await?,
        Commands::Member { command } => member::execute(command, app, cli.format).await?,
        Commands::Watch(args) => watch::execute(args, app, cli.format).await?,
    }

    Ok(())
}
