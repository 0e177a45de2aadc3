use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod state;

use commands::{Command, Paths};

#[derive(Parser, Debug, Clone)]
#[command(name = "rallymetric", about = "Per-player volleyball stat tracker")]
struct Config {
    /// Config file path (default: ~/.config/rallymetric/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding saved games (overrides the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory CSV exports are written to (overrides the config file)
    #[arg(long, global = true)]
    export_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new("rallymetric=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("debug logging enabled");

    let cli = Config::parse();

    // Load (or create) config file
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(state::config::default_config_path);
    let config = state::config::load(&config_path);

    let data_dir = state::config::resolve_data_dir(&config, cli.data_dir.as_deref());
    let paths = Paths {
        config: config_path,
        export_dir: state::config::resolve_export_dir(&config, cli.export_dir.as_deref()),
    };

    // Loads saved games; starts a game on first run
    let mut store = state::open_store(&data_dir, config.seed_new_games);

    let command = cli.command.unwrap_or(Command::Roster);
    commands::run(&mut store, command, &paths)
}
