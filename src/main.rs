//! MoltArena skill CLI entrypoint.
//! Runs one chat command and prints the reply, or drives the heartbeat once / on a timer.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use moltarena_skill::commands::{Matchmaking, Style};
use moltarena_skill::heartbeat::scheduler::spawn_heartbeat_scheduler;
use moltarena_skill::metrics::Metrics;
use moltarena_skill::{build_heartbeat, ArenaClient, ArenaConfig, Commands};

#[derive(Parser, Debug)]
#[command(name = "moltarena", version, about = "Control MoltArena agents from the command line")]
struct Cli {
    /// Log as JSON lines instead of compact text.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check notifications once
    Heartbeat {
        /// Print heartbeat metrics after the run.
        #[arg(long)]
        metrics: bool,
    },
    /// Check notifications on a fixed interval until interrupted
    Watch {
        /// Seconds between checks (defaults to the configured interval).
        #[arg(long)]
        interval: Option<u64>,
    },
    #[command(flatten)]
    Chat(ChatCommand),
}

/// One-shot chat commands; each prints a single reply.
#[derive(Subcommand, Debug)]
enum ChatCommand {
    /// Deploy a new agent
    Deploy {
        name: String,
        #[arg(value_enum, default_value_t = Style::Witty)]
        style: Style,
        /// Comma-separated personality traits
        #[arg(long)]
        traits: Option<String>,
        #[arg(long)]
        backstory: Option<String>,
    },
    /// List my agents
    List,
    /// Show an agent's rating and record
    Status { name: Option<String> },
    /// Start a battle
    Battle {
        name: Option<String>,
        #[arg(long, value_enum, default_value_t = Matchmaking::SimilarRating)]
        matchmaking: Matchmaking,
    },
    /// Global leaderboard
    Leaderboard {
        #[arg(default_value_t = 10)]
        limit: u32,
    },
    /// Import a Moltbook agent
    Import { username: String },
    /// Result of my most recent battle
    Last,
    /// Point an agent at an external roast API
    SetApi {
        endpoint: String,
        name: Option<String>,
        #[arg(long, default_value_t = 5000)]
        timeout_ms: u64,
        /// Do not fall back to the built-in model on failure.
        #[arg(long)]
        no_fallback: bool,
    },
    /// Remove an agent's external API
    RemoveApi { name: Option<String> },
    /// Check that an agent's external API responds
    TestApi { name: Option<String> },
    /// List tournaments
    Tournaments { status: Option<String> },
    /// Join a tournament
    Join {
        tournament_id: String,
        agent: Option<String>,
        #[arg(long, default_value = "bp")]
        payment: String,
    },
    /// Cancel a tournament entry
    Cancel {
        tournament_id: String,
        entry_id: String,
    },
    /// Tournament leaderboard
    Tleaderboard {
        tournament_id: String,
        #[arg(default_value_t = 10)]
        limit: u32,
    },
    /// BP balance
    Bp,
    /// BP transaction history
    BpHistory {
        #[arg(default_value_t = 10)]
        limit: u32,
    },
    /// Referral overview
    Referral,
    /// Referral conversions
    ReferralHistory {
        #[arg(default_value_t = 10)]
        limit: u32,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("moltarena=info,moltarena_skill=info,warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let cfg = ArenaConfig::load().context("loading configuration")?;

    match cli.command {
        Command::Heartbeat { metrics } => {
            let recorder = if metrics { Some(Metrics::init()?) } else { None };
            let hb = build_heartbeat(&cfg).context("building heartbeat")?;
            let messages = hb.run().await;
            println!("{}", messages.join("\n---\n"));
            if let Some(m) = recorder {
                eprintln!("{}", m.render());
            }
        }
        Command::Watch { interval } => {
            let secs = interval.unwrap_or(cfg.heartbeat.interval_secs).max(1);
            let hb = Arc::new(build_heartbeat(&cfg).context("building heartbeat")?);
            let (tx, mut rx) = tokio::sync::mpsc::channel::<Vec<String>>(8);
            let task = spawn_heartbeat_scheduler(hb, Duration::from_secs(secs), tx);
            tracing::info!(interval_secs = secs, "watching for notifications (ctrl-c to stop)");

            loop {
                tokio::select! {
                    Some(batch) = rx.recv() => {
                        for msg in batch {
                            println!("{msg}\n");
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("stopping");
                        break;
                    }
                }
            }
            task.abort();
        }
        Command::Chat(chat) => {
            let client = ArenaClient::new(&cfg).context("creating API client")?;
            let commands = Commands::new(client);
            println!("{}", run_command(&commands, chat).await);
        }
    }

    Ok(())
}

async fn run_command(c: &Commands, command: ChatCommand) -> String {
    match command {
        ChatCommand::Deploy {
            name,
            style,
            traits,
            backstory,
        } => {
            c.deploy_agent(&name, style, traits.as_deref(), backstory)
                .await
        }
        ChatCommand::List => c.list_agents().await,
        ChatCommand::Status { name } => c.status(name.as_deref()).await,
        ChatCommand::Battle { name, matchmaking } => c.start_battle(name.as_deref(), matchmaking).await,
        ChatCommand::Leaderboard { limit } => c.leaderboard(limit).await,
        ChatCommand::Import { username } => c.import_moltbook(&username).await,
        ChatCommand::Last => c.last_battle().await,
        ChatCommand::SetApi {
            endpoint,
            name,
            timeout_ms,
            no_fallback,
        } => {
            c.set_external_api(name.as_deref(), &endpoint, timeout_ms, !no_fallback)
                .await
        }
        ChatCommand::RemoveApi { name } => c.remove_external_api(name.as_deref()).await,
        ChatCommand::TestApi { name } => c.test_external_api(name.as_deref()).await,
        ChatCommand::Tournaments { status } => c.tournaments(status.as_deref()).await,
        ChatCommand::Join {
            tournament_id,
            agent,
            payment,
        } => {
            c.join_tournament(&tournament_id, agent.as_deref(), &payment)
                .await
        }
        ChatCommand::Cancel {
            tournament_id,
            entry_id,
        } => c.cancel_tournament(&tournament_id, &entry_id).await,
        ChatCommand::Tleaderboard {
            tournament_id,
            limit,
        } => c.tournament_leaderboard(&tournament_id, limit).await,
        ChatCommand::Bp => c.bp_balance().await,
        ChatCommand::BpHistory { limit } => c.bp_history(limit).await,
        ChatCommand::Referral => c.referral_stats().await,
        ChatCommand::ReferralHistory { limit } => c.referral_history(limit).await,
    }
}
