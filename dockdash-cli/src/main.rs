//! `dockdash` - live container dashboard with bulk lifecycle actions.
//!
//! Logs go to a file (default `/tmp/dockdash.log`); writing them to the
//! terminal would corrupt the TUI.

mod commands;
mod runtimes;
mod tui;
mod ui;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use dockdash_core::bulk::BulkAction;
use dockdash_core::{Dashboard, DashboardConfig};

#[derive(Parser, Debug)]
#[command(name = "dockdash", version, about = "Live container dashboard with bulk actions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (defaults to ./dockdash.yml if present)
    #[arg(short, long, env = "DOCKDASH_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Use simulated containers instead of Docker
    #[arg(long, global = true)]
    demo: bool,

    /// Override the unit list refresh interval
    #[arg(long, value_name = "MS", global = true)]
    refresh_ms: Option<u64>,

    /// Override the stats sampling interval
    #[arg(long, value_name = "MS", global = true)]
    stats_ms: Option<u64>,

    /// Log file path
    #[arg(long, default_value = "/tmp/dockdash.log", global = true)]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive dashboard (default)
    Tui,
    /// List containers once
    Ps,
    Start {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    Stop {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    Restart {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Force-remove containers and their volumes
    Rm {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Follow a container's logs
    Logs { id: String },
    /// Run a command inside a container via /bin/sh -c
    Exec {
        id: String,
        #[arg(last = true, required = true)]
        cmd: Vec<String>,
    },
    Inspect { id: String },
}

fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("dockdash={log_level},dockdash_core={log_level}"))
    });

    let log_dir = cli
        .log_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("dockdash.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}

/// File config (explicit path or discovered), then command-line overrides
fn load_config(cli: &Cli) -> Result<DashboardConfig> {
    let mut config = match &cli.config {
        Some(path) => DashboardConfig::load(path)
            .wrap_err_with(|| format!("failed to load {}", path.display()))?,
        None => {
            let cwd = std::env::current_dir().wrap_err("cannot read current directory")?;
            match DashboardConfig::discover(&cwd)? {
                Some((path, config)) => {
                    tracing::info!(path = %path.display(), "loaded config");
                    config
                }
                None => DashboardConfig::default(),
            }
        }
    };

    if let Some(ms) = cli.refresh_ms {
        config.refresh_interval_ms = ms;
    }
    if let Some(ms) = cli.stats_ms {
        config.stats_interval_ms = ms;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    tui::install_hooks()?;
    let _guard = setup_tracing(&cli);

    let config = load_config(&cli)?;
    ui::theme::init(config.theme);

    let client = runtimes::connect(&config, cli.demo)
        .await
        .wrap_err("cannot reach the container runtime (try --demo)")?;
    tracing::info!(runtime = client.name(), "connected");

    let lifecycle = |action: BulkAction, ids: Vec<String>| (action, ids);
    let bulk = match cli.command {
        Some(Commands::Start { ids }) => Some(lifecycle(BulkAction::Start, ids)),
        Some(Commands::Stop { ids }) => Some(lifecycle(BulkAction::Stop, ids)),
        Some(Commands::Restart { ids }) => Some(lifecycle(BulkAction::Restart, ids)),
        Some(Commands::Rm { ids }) => Some(lifecycle(BulkAction::Remove, ids)),
        Some(Commands::Ps) => {
            commands::ps(client).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Some(Commands::Logs { id }) => {
            commands::logs(client, &id).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Some(Commands::Exec { id, cmd }) => {
            commands::exec(client, &id, &cmd).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Some(Commands::Inspect { id }) => {
            commands::inspect(client, &id).await?;
            return Ok(ExitCode::SUCCESS);
        }
        Some(Commands::Tui) | None => None,
    };
    if let Some((action, ids)) = bulk {
        return commands::run_lifecycle(client, action, ids).await;
    }

    let mut dash = Dashboard::new(client, config);
    dash.initial_refresh()
        .await
        .wrap_err("failed to list containers")?;
    dash.start_workers();
    tui::run(dash).await?;
    Ok(ExitCode::SUCCESS)
}
