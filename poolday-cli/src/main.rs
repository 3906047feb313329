mod commands;
mod render;
mod utils;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use poolday_core::config::PooldayConfig;
use poolday_core::remote::Remote;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "poolday")]
#[command(about = "Route calendar, offline service records and sync for pool technicians")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show appointments for a month, week or day
    Calendar {
        /// month, week or day
        #[arg(long, default_value = "week")]
        view: String,

        /// Any day inside the view (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Print the days a recurring series falls on
    Expand {
        /// daily, weekly, biweekly or monthly
        #[arg(short, long)]
        frequency: String,

        /// First day of the series (YYYY-MM-DD)
        #[arg(short, long)]
        start: String,

        /// Last day of the series (YYYY-MM-DD), open-ended if omitted
        #[arg(short, long)]
        end: Option<String>,

        /// Show occurrences from this date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Show occurrences until this date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },
    /// Manage service records waiting to be sent
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Send queued service records now
    Sync,
}

#[derive(Subcommand)]
enum QueueCommands {
    /// Record a completed visit
    Add {
        #[arg(short, long)]
        customer: String,

        #[arg(short, long)]
        appointment: Option<String>,

        #[arg(short, long)]
        technician: Option<String>,

        /// Work performed, repeatable (e.g. --service skim --service brush)
        #[arg(long = "service")]
        services: Vec<String>,

        /// Water reading as name=value, repeatable (e.g. --reading ph=7.4)
        #[arg(long = "reading")]
        readings: Vec<String>,

        #[arg(short, long)]
        notes: Option<String>,
    },
    List {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Discard every queued record
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = PooldayConfig::load()?;
    debug!(
        utc_offset_minutes = config.utc_offset_minutes,
        remote = config.remote.as_deref().unwrap_or("none"),
        "loaded config"
    );
    let today = config.time_window()?.today(Utc::now());

    match cli.command {
        Commands::Calendar { view, date } => {
            let remote = require_remote(&config)?;
            commands::calendar::run(&remote, &view, date.as_deref(), today).await
        }
        Commands::Expand {
            frequency,
            start,
            end,
            from,
            to,
        } => commands::expand::run(
            config.materialize_horizon(),
            &frequency,
            &start,
            end.as_deref(),
            from.as_deref(),
            to.as_deref(),
        ),
        Commands::Queue { command } => match command {
            QueueCommands::Add {
                customer,
                appointment,
                technician,
                services,
                readings,
                notes,
            } => commands::queue::add(
                &config,
                commands::queue::NewRecord {
                    customer,
                    appointment,
                    technician,
                    services,
                    readings,
                    notes,
                },
            ),
            QueueCommands::List { json } => commands::queue::list(&config, json),
            QueueCommands::Clear => commands::queue::clear(&config),
        },
        Commands::Sync => {
            let remote = require_remote(&config)?;
            commands::sync::run(&config, remote).await
        }
    }
}

fn require_remote(config: &PooldayConfig) -> Result<Remote> {
    match config.remote()? {
        Some(remote) => Ok(remote),
        None => {
            let path = PooldayConfig::config_path()?;
            anyhow::bail!(
                "No remote store configured.\n\n\
                Set one in {}:\n  \
                remote = \"<name>\"\n\n\
                poolday will run poolday-remote-<name> from your PATH.",
                path.display()
            );
        }
    }
}
