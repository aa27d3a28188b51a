//! Roster CLI
//!
//! Runs the API server and administers a user file directly.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use roster_api::{ApiConfig, ApiServer, AppState};
use roster_core::constants::DEFAULT_PAGE_SIZE;
use roster_core::types::{RegisterUser, UserFilter, UserRecord};

/// Roster - user registration service
#[derive(Parser)]
#[command(name = "roster")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    backend: BackendArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the environment configuration.
#[derive(Args)]
struct BackendArgs {
    /// User file (in-memory when unset)
    #[arg(long, global = true, env = "STORE_PATH")]
    store: Option<PathBuf>,

    /// Authorization service base URL
    #[arg(long, global = true, env = "AUTH_BASE_URL")]
    auth_url: Option<String>,

    /// Static authorization table, `key=Name,key2=Name2`
    #[arg(long, global = true, env = "AUTH_ALLOWLIST")]
    allowlist: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3001")]
        port: u16,
        /// Bind address
        #[arg(short, long, default_value = "0.0.0.0")]
        bind: String,
    },

    /// Register a user
    Register {
        /// User key
        user_key: String,
        /// Invitation code
        #[arg(short, long)]
        invitor_no: String,
        /// Acting user (defaults to the user key)
        #[arg(long)]
        actor: Option<String>,
    },

    /// Show one user
    Get {
        /// User key
        user_key: String,
    },

    /// List users
    List {
        /// 1-based page number
        #[arg(short, long, default_value = "1")]
        page: i64,
        /// Page size
        #[arg(short = 's', long, default_value_t = DEFAULT_PAGE_SIZE)]
        page_size: u32,
        /// Filter by display name
        #[arg(long)]
        display_name: Option<String>,
        /// Filter by invitation code
        #[arg(long)]
        invitor_no: Option<String>,
    },

    /// Soft-delete a user
    Remove {
        /// User key
        user_key: String,
        /// Acting user
        #[arg(long, default_value = "admin")]
        actor: String,
    },

    /// Show user statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "roster=debug,info"
    } else {
        "roster=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cli.backend.apply(ApiConfig::from_env());

    match cli.command {
        Commands::Serve { port, bind } => cmd_serve(config, port, &bind).await,
        Commands::Register {
            user_key,
            invitor_no,
            actor,
        } => cmd_register(config, user_key, invitor_no, actor).await,
        Commands::Get { user_key } => cmd_get(config, &user_key).await,
        Commands::List {
            page,
            page_size,
            display_name,
            invitor_no,
        } => cmd_list(config, page, page_size, display_name, invitor_no).await,
        Commands::Remove { user_key, actor } => cmd_remove(config, &user_key, &actor).await,
        Commands::Stats => cmd_stats(config).await,
    }
}

impl BackendArgs {
    fn apply(self, mut config: ApiConfig) -> ApiConfig {
        if self.store.is_some() {
            config.store_path = self.store;
        }
        if self.auth_url.is_some() {
            config.auth_base_url = self.auth_url;
        }
        if self.allowlist.is_some() {
            config.auth_allowlist = self.allowlist;
        }
        config
    }
}

/// Builds the service for a one-shot admin command.
async fn open(config: ApiConfig) -> Result<AppState> {
    if config.store_path.is_none() {
        warn!("No --store given; changes will be lost when the command exits");
    }
    AppState::from_config(config)
        .await
        .context("Failed to initialise the user service")
}

fn print_user(record: &UserRecord) {
    println!("   {} {}", "User key:    ".dimmed(), record.user_key.bold());
    println!("   {} {}", "Display name:".dimmed(), record.display_name);
    println!("   {} {}", "Invitation:  ".dimmed(), record.invitor_no);
    println!("   {} {}", "Version:     ".dimmed(), record.version);
    println!("   {} {} by {}", "Created:     ".dimmed(), record.created_at.to_rfc3339(), record.created_by);
    println!("   {} {} by {}", "Modified:    ".dimmed(), record.modified_at.to_rfc3339(), record.modified_by);
}

/// Run the API server
async fn cmd_serve(config: ApiConfig, port: u16, bind: &str) -> Result<()> {
    println!("{}", "🚀 Starting Roster API server...".cyan().bold());
    println!("   {} http://{}:{}", "Listening on:".green(), bind, port);
    println!("   {} http://{}:{}/health", "Health check:".dimmed(), bind, port);
    println!("\n   Press Ctrl+C to stop.\n");

    let server = ApiServer::from_config(config)
        .await
        .context("Failed to initialise the API server")?;

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    server.run(addr).await?;

    Ok(())
}

/// Register a user
async fn cmd_register(
    config: ApiConfig,
    user_key: String,
    invitor_no: String,
    actor: Option<String>,
) -> Result<()> {
    let state = open(config).await?;
    let actor = actor.unwrap_or_else(|| user_key.clone());

    let key = state
        .service
        .register(RegisterUser::new(user_key, invitor_no), &actor)
        .await
        .context("Registration failed")?;

    println!("{} {}", "✓ Registered".green().bold(), key);
    state.flush().await?;
    Ok(())
}

/// Show one user
async fn cmd_get(config: ApiConfig, user_key: &str) -> Result<()> {
    let state = open(config).await?;

    match state.service.query_by_key(user_key).await? {
        Some(record) => {
            print_user(&record);
            Ok(())
        }
        None => bail!("No user with key '{}'", user_key),
    }
}

/// List users
async fn cmd_list(
    config: ApiConfig,
    page: i64,
    page_size: u32,
    display_name: Option<String>,
    invitor_no: Option<String>,
) -> Result<()> {
    if page < 1 {
        bail!("--page must be at least 1");
    }
    if page_size == 0 {
        bail!("--page-size must be at least 1");
    }
    let state = open(config).await?;

    let filter = UserFilter {
        display_name,
        invitor_no,
        ..UserFilter::active()
    };
    let result = state.service.list_page(&filter, page, page_size).await?;

    if result.items.is_empty() {
        println!("{}", "No users found.".yellow());
    }
    for record in &result.items {
        println!(
            "   {}  {}  {}",
            record.user_key.bold(),
            record.display_name,
            record.invitor_no.dimmed()
        );
    }
    println!(
        "\n   {} page {} of {} ({} users)",
        "→".cyan(),
        result.page_num,
        result.page_count(),
        result.total
    );
    Ok(())
}

/// Soft-delete a user
async fn cmd_remove(config: ApiConfig, user_key: &str, actor: &str) -> Result<()> {
    let state = open(config).await?;

    if !state.service.remove(user_key, actor).await? {
        bail!("No user with key '{}'", user_key);
    }

    println!("{} {}", "✓ Removed".green().bold(), user_key);
    state.flush().await?;
    Ok(())
}

/// Show user statistics
async fn cmd_stats(config: ApiConfig) -> Result<()> {
    let state = open(config).await?;
    let stats = state.service.statistics().await?;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
