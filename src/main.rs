use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use taskboard::board::Priority;
use taskboard::config::RemoteConfig;
use taskboard::remote::SupabaseClient;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod cmd;

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(version, about = "Kanban boards, lists and cards from the terminal")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Read environment variables from this file instead of ./.env
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in, sign up, sign out, or show who is signed in
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// List your boards, or create one
    Boards {
        #[command(subcommand)]
        command: Option<BoardsCommands>,
    },
    /// Show a board, or change its lists and cards
    Board {
        /// Board id
        id: Uuid,

        #[command(subcommand)]
        command: Option<BoardCommands>,
    },
    /// Render a sample board from an in-memory backend (no configuration needed)
    Demo,
}

#[derive(Subcommand, Clone)]
pub enum AuthCommands {
    /// Sign in with email and password
    SignIn {
        #[arg(long)]
        email: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    SignOut,
    /// Show the signed-in user
    Status,
}

#[derive(Subcommand, Clone)]
pub enum BoardsCommands {
    /// Create a board
    Create {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum BoardCommands {
    /// Append a list to the board
    AddList { title: String },
    RenameList { list: Uuid, title: String },
    /// Delete a list and all of its cards
    DeleteList { list: Uuid },
    ReorderList {
        list: Uuid,
        #[arg(allow_hyphen_values = true)]
        position: i32,
    },
    /// Append a card to a list
    AddCard { list: Uuid, title: String },
    /// Change card fields; omitted flags are left alone
    EditCard {
        card: Uuid,
        #[arg(long)]
        title: Option<String>,
        /// Empty string clears the description
        #[arg(long)]
        description: Option<String>,
        /// Due date as YYYY-MM-DD
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<chrono::NaiveDate>,
        #[arg(long)]
        clear_due: bool,
        /// low, medium, high, urgent
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        cover_color: Option<String>,
        #[arg(long)]
        cover_image: Option<String>,
    },
    DeleteCard { card: Uuid },
    /// Move a card to a list; without --position it goes to the end
    MoveCard {
        card: Uuid,
        list: Uuid,
        #[arg(long, allow_hyphen_values = true)]
        position: Option<i32>,
    },
    ReorderCard {
        card: Uuid,
        #[arg(allow_hyphen_values = true)]
        position: i32,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "taskboard=debug" } else { "taskboard=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn connect(env_file: Option<&Path>) -> Result<Arc<SupabaseClient>> {
    let config = RemoteConfig::load(env_file).context("Failed to load configuration")?;
    tracing::debug!(url = %config.url, "using data platform");
    Ok(Arc::new(SupabaseClient::new(&config)))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let env_file = cli.env_file.as_deref();

    match cli.command {
        Commands::Auth { command } => cmd::cmd_auth(connect(env_file)?, command).await?,
        Commands::Boards { command } => cmd::cmd_boards(connect(env_file)?, command).await?,
        Commands::Board { id, command } => cmd::cmd_board(connect(env_file)?, id, command).await?,
        Commands::Demo => cmd::cmd_demo().await?,
    }

    Ok(())
}
