use std::path::PathBuf;

use clap::Parser;
use tracing as log;
use tracing_subscriber::EnvFilter;

use inboxbot::alerts::LogAlertSink;
use inboxbot::config::Config;
use inboxbot::github::GithubClient;
use inboxbot::reconcile::{Command, Reconciler};
use inboxbot::rules::store::RuleStore;
use inboxbot::search::{SavedSearch, SearchWatcher};

#[derive(Parser)]
#[command(name = "inboxbot", about = "Watches the GitHub notifications feed")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "inboxbot.toml")]
    config: PathBuf,

    /// Override the configured poll interval in seconds.
    #[arg(long)]
    interval: Option<u64>,

    /// Override where the rule list is stored.
    #[arg(long)]
    rules: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = Config::load(&args.config)?;
    if let Some(interval) = args.interval {
        config.poll_interval_secs = interval;
    }
    if let Some(rules) = args.rules {
        config.rules_path = Some(rules);
    }
    let interval = config.poll_interval();

    let client = GithubClient::new_from_env();
    let rules_path = config.rules_path.clone().unwrap_or_else(|| {
        args.config.with_file_name("rules.json")
    });
    let rules = RuleStore::load(rules_path);
    log::info!(
        "starting with {} rules, polling every {}s",
        rules.rules().len(),
        interval.as_secs()
    );

    let reconciler = Reconciler::new(client.clone(), LogAlertSink, rules, config.alerts_enabled);

    let (command_tx, command_rx) = tokio::sync::mpsc::channel(8);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let searches: Vec<SavedSearch> = config
        .searches
        .iter()
        .map(|s| SavedSearch::new(s.name.clone(), s.query.clone()))
        .collect();
    let search_watcher = SearchWatcher::new(client, LogAlertSink, searches);
    let search_task = tokio::spawn(search_watcher.run(interval, shutdown_rx.clone()));

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    // SIGUSR1 triggers a manual refresh without waiting for the timer.
    #[cfg(unix)]
    {
        let refresh_tx = command_tx.clone();
        tokio::spawn(async move {
            let Ok(mut stream) =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::user_defined1())
            else {
                return;
            };
            while stream.recv().await.is_some() {
                let _ = refresh_tx.send(Command::Refresh).await;
            }
        });
    }

    reconciler.run(interval, command_rx, shutdown_rx).await;
    search_task.await?;

    Ok(())
}
