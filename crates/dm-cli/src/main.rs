//! desktop-manager CLI
//!
//! Single binary for managing remote cluster desktops:
//! - Browse the configurations the session may use
//! - Launch, list, watch and delete desktops
//! - Manage the local configuration file

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use desktop_manager::commands::{self, LaunchOverrides};
use desktop_manager::context::Context;
use desktop_manager::output::print_error;
use dm_core::error::DmError;

#[derive(Parser)]
#[command(name = "desktop-manager")]
#[command(author, version, about = "Launch and manage remote cluster desktops")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Act as this user instead of the session's uid
    #[arg(short, long, global = true, env = "DM_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configurations available to the session
    Configs,

    /// List desktops of a configuration
    /// Alias: ls
    #[command(alias = "ls")]
    List {
        /// Configuration name, e.g. "siteA|gpu"
        configuration: String,
    },

    /// Launch a desktop
    Launch {
        /// Configuration name, e.g. "siteA|gpu"
        configuration: String,
        /// Number of nodes
        #[arg(long)]
        nodes: Option<u32>,
        /// Walltime in hours
        #[arg(long)]
        hours: Option<u32>,
        /// Processors per node
        #[arg(long)]
        ppn: Option<u32>,
        /// Memory in GB
        #[arg(long)]
        mem: Option<u32>,
        /// Screen resolution, e.g. "1920x1080"
        #[arg(long)]
        resolution: Option<String>,
    },

    /// Delete a desktop
    /// Alias: delete
    #[command(alias = "delete")]
    Stop {
        /// Configuration name, e.g. "siteA|gpu"
        configuration: String,
        /// Job identifier of the desktop
        job_id: String,
        /// Delete without confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// End the server-side session
    /// Alias: logout
    #[command(alias = "logout")]
    Signout,

    /// Watch desktops of a configuration, refreshing periodically
    Watch {
        /// Configuration name, e.g. "siteA|gpu"
        configuration: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Get specific config value
    Get { key: String },
    /// Set config value
    Set { key: String, value: String },
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = run(cli).await {
        print_error(&format!("{:#}", e));
        std::process::exit(exit_code(&e));
    }
    Ok(())
}

/// 2 for configuration problems, 3 for Job API failures, 1 otherwise
fn exit_code(error: &anyhow::Error) -> i32 {
    match error.chain().find_map(|e| e.downcast_ref::<DmError>()) {
        Some(DmError::Config(_)) => 2,
        Some(DmError::Remote(_)) | Some(DmError::Catalog(_)) => 3,
        Some(DmError::Io(_)) | None => 1,
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    // Config commands work without a reachable Job API
    let command = match cli.command {
        Commands::Config { action } => {
            return match action {
                ConfigAction::Show => commands::config_show(config_path),
                ConfigAction::Get { key } => commands::config_get(config_path, &key),
                ConfigAction::Set { key, value } => commands::config_set(config_path, &key, &value),
                ConfigAction::Init { force } => commands::config_init(config_path, force),
                ConfigAction::Path => commands::config_path(config_path),
            };
        }
        other => other,
    };

    let ctx = Context::new(config_path, cli.user)?;

    match command {
        Commands::Configs => commands::configs_command(&ctx).await,
        Commands::List { configuration } => commands::list_command(&ctx, &configuration).await,
        Commands::Launch {
            configuration,
            nodes,
            hours,
            ppn,
            mem,
            resolution,
        } => {
            let overrides = LaunchOverrides {
                nodes,
                hours,
                ppn,
                mem,
                resolution,
            };
            commands::launch_command(&ctx, &configuration, &overrides).await
        }
        Commands::Stop {
            configuration,
            job_id,
            yes,
        } => commands::stop_command(&ctx, &configuration, &job_id, yes).await,
        Commands::Signout => commands::signout_command(&ctx).await,
        Commands::Watch { configuration } => commands::watch_command(&ctx, &configuration).await,
        Commands::Config { .. } => Ok(()),
    }
}
