mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::config::ConfigSubcommand;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "outbox",
    about = "Offline write queue: enqueue, inspect, and replay deferred actions",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .outbox/ or .git/)
    #[arg(long, global = true, env = "OUTBOX_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create .outbox/ and a default config
    Init,

    /// Submit an action: deliver now if online, otherwise queue it
    Enqueue {
        /// Target URL (absolute, or a path under api_base_url)
        #[arg(long)]
        url: String,

        /// HTTP method
        #[arg(long, default_value = "POST")]
        method: String,

        /// JSON payload
        #[arg(long, default_value = "{}")]
        body: String,

        /// Skip the reachability check and queue directly
        #[arg(long)]
        offline: bool,
    },

    /// List pending actions, oldest first
    List,

    /// Remove every pending action
    Clear,

    /// Replay pending actions now if the API is reachable
    Drain,

    /// Probe connectivity and drain on every online transition until Ctrl-C
    Watch,

    /// Show or validate the config
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Watch => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init => cmd::init::run(&root),
        Commands::Enqueue {
            url,
            method,
            body,
            offline,
        } => cmd::enqueue::run(&root, &url, &method, &body, offline, cli.json),
        Commands::List => cmd::list::run(&root, cli.json),
        Commands::Clear => cmd::clear::run(&root, cli.json),
        Commands::Drain => cmd::drain::run(&root, cli.json),
        Commands::Watch => cmd::watch::run(&root, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
