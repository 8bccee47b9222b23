//! goblin CLI: runs the box automation and pokes at its journal.

use std::sync::Arc;

use clap::{Parser, Subcommand};

use goblin_bot::client::GoblinClient;
use goblin_bot::config::Config;
use goblin_bot::engine::{self, Scheduler};
use goblin_bot::journal::Journal;

#[derive(Parser)]
#[command(
    name = "goblin",
    about = "Unattended farmer for goblin.meme mystery boxes"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one cycle immediately, then keep both schedules armed (default)
    Serve,
    /// Run a single cycle and exit
    Run {
        /// Only open matured boxes; skip start/mission handling
        #[arg(long)]
        ready_only: bool,
    },
    /// Journal operations
    Logs {
        #[command(subcommand)]
        action: LogsAction,
    },
    /// Check whether the session cookie is still accepted
    Validate,
    /// Probe the identity endpoints, best effort
    Whoami,
}

#[derive(Subcommand)]
enum LogsAction {
    /// Print the tail of the journal
    Show {
        /// Number of lines from the end
        #[arg(long, default_value_t = 100)]
        lines: usize,
        /// Print everything
        #[arg(long)]
        all: bool,
    },
    /// Truncate the journal (rotated backups are kept)
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Missing or malformed configuration is fatal before anything is armed.
    let config = Config::from_env()?;

    let default_filter = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let cli = Cli::parse();

    let journal = Arc::new(Journal::open(
        &config.log_file,
        config.max_log_size,
        config.max_log_backups,
        config.timezone,
    ));
    let client = Arc::new(GoblinClient::new(&config)?);
    let config = Arc::new(config);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(client, journal, config).await,
        Command::Run { ready_only } => {
            if ready_only {
                engine::run_ready_check(&client, &journal, &config).await;
            } else {
                engine::run_automation(&client, &journal, &config).await;
            }
            Ok(())
        }
        Command::Logs { action } => logs(&journal, action),
        Command::Validate => {
            if client.validate_cookie().await? {
                println!("Cookie is valid.");
                Ok(())
            } else {
                anyhow::bail!("Cookie expired or invalid; refresh GOBLIN_COOKIE");
            }
        }
        Command::Whoami => {
            match client.user_info().await {
                Some(info) => println!("{}", serde_json::to_string_pretty(&info)?),
                None => println!("No identity endpoint responded."),
            }
            Ok(())
        }
    }
}

async fn serve(
    client: Arc<GoblinClient>,
    journal: Arc<Journal>,
    config: Arc<Config>,
) -> anyhow::Result<()> {
    tracing::info!("Goblin Box Automation configuration:");
    tracing::info!("- API Base URL: {}", config.base_url);
    tracing::info!("- Daily Schedule: {}", config.daily_schedule);
    tracing::info!("- Check Ready Schedule: {}", config.ready_check_schedule);
    tracing::info!("- Timezone: {}", config.timezone);
    tracing::info!("- Auto Start: {}", config.auto_start);
    tracing::info!("- Auto Open: {}", config.auto_open);
    tracing::info!("- Debug Mode: {}", config.debug);

    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&client),
        Arc::clone(&journal),
        Arc::clone(&config),
    )?);

    let sched = Arc::clone(&scheduler);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        sched.shutdown();
    });

    journal.info("Running automation immediately...");
    engine::run_automation(&client, &journal, &config).await;

    scheduler.run().await;
    Ok(())
}

fn logs(journal: &Journal, action: LogsAction) -> anyhow::Result<()> {
    match action {
        LogsAction::Show { lines, all } => {
            let tail = journal.tail(if all { None } else { Some(lines) })?;
            for line in tail {
                println!("{line}");
            }
            Ok(())
        }
        LogsAction::Clear => {
            journal.clear()?;
            Ok(())
        }
    }
}
