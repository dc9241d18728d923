mod config;

use clap::{Parser, Subcommand};
use config::{LogFormat, WardenConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use warden_channels::{LogNotifier, MemoryNotifier, NotifierManager, SlackWebhookNotifier};
use warden_gateway::GatewayServer;
use warden_orchestrator::{Orchestrator, Outcome};

#[derive(Parser)]
#[command(name = "warden", about = "Warden: security agent orchestration engine")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "warden.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST gateway
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Work with the predefined playbooks
    Playbook {
        #[command(subcommand)]
        action: PlaybookAction,
    },
}

#[derive(Subcommand)]
enum PlaybookAction {
    /// List predefined playbooks and their steps
    List,
    /// Run a predefined playbook to completion
    Run {
        /// Playbook name, e.g. "Contain Malware Infection"
        name: String,
        /// Agent to run it on
        #[arg(short, long, default_value = "Security Agent 1")]
        agent: String,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

/// Slack (when configured), the in-memory feed and the log, fanned out.
fn build_notifier(config: &WardenConfig) -> (Arc<NotifierManager>, Arc<MemoryNotifier>) {
    let feed = Arc::new(MemoryNotifier::new(config.notifications.feed_capacity));
    let mut manager = NotifierManager::new()
        .with(feed.clone())
        .with(Arc::new(LogNotifier));

    let slack = SlackWebhookNotifier::new(config.notifications.clone());
    let hooks = slack.enabled_webhooks().len();
    if hooks > 0 {
        info!(webhooks = hooks, "Slack notifications enabled");
        manager.add(Arc::new(slack));
    }
    (Arc::new(manager), feed)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = WardenConfig::load(&cli.config).await?;
    let missing = loaded.is_none();
    let config = loaded.unwrap_or_default();
    init_tracing(config.log_format);
    if missing {
        warn!(path = %cli.config.display(), "Config file not found, using defaults");
    }

    let (notifier, feed) = build_notifier(&config);
    let orchestrator = Arc::new(Orchestrator::new(&config.execution, notifier.clone())?);

    match cli.command {
        Commands::Serve { host, port } => {
            if config.seed {
                orchestrator.seed_defaults().await?;
            }
            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);
            info!("Starting Warden gateway on {}:{}", host, port);

            let app = GatewayServer::build(orchestrator, notifier, feed);
            GatewayServer::serve(&format!("{host}:{port}"), app).await?;
        }
        Commands::Playbook { action } => {
            orchestrator.seed_defaults().await?;
            match action {
                PlaybookAction::List => list_playbooks(&orchestrator).await,
                PlaybookAction::Run { name, agent } => {
                    run_playbook(&orchestrator, &name, &agent).await?
                }
            }
        }
    }

    Ok(())
}

async fn list_playbooks(orchestrator: &Orchestrator) {
    let playbooks = orchestrator.list_playbooks().await;
    println!("Predefined playbooks:");
    for playbook in &playbooks {
        println!("  {}", playbook.name);
        for (i, step) in orchestrator
            .playbook_steps(playbook.id)
            .await
            .unwrap_or_default()
            .iter()
            .enumerate()
        {
            println!("    {}. {}: {}", i + 1, step.name, step.description);
        }
    }
    println!("\nTotal: {} playbook(s)", playbooks.len());
}

async fn run_playbook(orchestrator: &Orchestrator, name: &str, agent: &str) -> anyhow::Result<()> {
    let Some(playbook) = orchestrator.find_playbook_by_name(name).await else {
        let known: Vec<String> = orchestrator
            .list_playbooks()
            .await
            .into_iter()
            .map(|p| p.name)
            .collect();
        anyhow::bail!("Unknown playbook '{}'. Known: {}", name, known.join(", "));
    };
    let Some(agent) = orchestrator.find_agent_by_name(agent).await else {
        anyhow::bail!("Unknown agent '{}'", agent);
    };

    println!("Running \"{}\" on {}...", playbook.name, agent.name);
    let assignment = orchestrator.assign_playbook(playbook.id, agent.id).await?;
    let cancel = assignment.cancellation_token();
    let wait = assignment.wait();
    tokio::pin!(wait);

    let outcome = tokio::select! {
        outcome = &mut wait => outcome?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling playbook");
            cancel.cancel();
            wait.await?
        }
    };

    for step in orchestrator
        .playbook_steps(playbook.id)
        .await
        .unwrap_or_default()
    {
        let detail = step.error.map(|e| format!(" ({e})")).unwrap_or_default();
        println!("  [{}] {}{}", step.status, step.name, detail);
    }

    match outcome {
        Outcome::Succeeded => {
            println!("Playbook completed.");
            Ok(())
        }
        Outcome::Failed { reason } => anyhow::bail!(reason),
        Outcome::Cancelled => anyhow::bail!("Playbook cancelled"),
    }
}
