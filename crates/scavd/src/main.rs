//! scavd: the scavgrid daemon.
//!
//! # Usage
//!
//! ```text
//! scavd run --config scavgrid.toml --world world.toml --data-dir /var/lib/scavgrid
//! scavd plan --units spear=100,light=230 --free 1,2,3
//! scavd estimate --config scavgrid.toml --data-dir /var/lib/scavgrid
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

const DEFAULT_FILTER: &str = "info,scavd=debug,scavgrid=debug";

#[derive(Parser)]
#[command(
    name = "scavd",
    about = "scavgrid: fleet dispatch daemon",
    version,
    propagate_version = true
)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Repeat fleet passes against a simulated world.
    Run {
        /// Fleet configuration (defaults apply when omitted).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Simulated world fixture.
        #[arg(long)]
        world: PathBuf,

        /// Directory for the tracker snapshot.
        #[arg(long, default_value = "/var/lib/scavgrid")]
        data_dir: PathBuf,

        /// Run a single pass, print its outcome and exit.
        #[arg(long)]
        once: bool,
    },
    /// Compute an allocation plan and print it as JSON.
    Plan {
        #[arg(long)]
        config: Option<PathBuf>,

        /// Available units, e.g. spear=100,light=230.
        #[arg(long)]
        units: String,

        /// Free slot levels, e.g. 1,2,3.
        #[arg(long, value_delimiter = ',')]
        free: Vec<u8>,

        /// Site whose unit overrides apply.
        #[arg(long)]
        site: Option<String>,
    },
    /// Print the next-poll delay from the persisted tracker.
    Estimate {
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, default_value = "/var/lib/scavgrid")]
        data_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    match cli.command {
        Command::Run {
            config,
            world,
            data_dir,
            once,
        } => commands::run::run(config.as_deref(), &world, &data_dir, once).await,
        Command::Plan {
            config,
            units,
            free,
            site,
        } => commands::plan::plan(config.as_deref(), &units, &free, site.as_deref()),
        Command::Estimate { config, data_dir } => {
            commands::estimate::estimate(config.as_deref(), &data_dir)
        }
    }
}

/// Logs go to stderr; stdout carries command output.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}
