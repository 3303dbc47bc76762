//! Sample application for the betting venue client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sts_client::api::{create_router, AppState};
use sts_client::betting::{BetLifecycleController, BetSettlement, BetTerms, SettlementResult};
use sts_client::client::StsClient;
use sts_client::config::Config;
use sts_client::market::EventStore;
use sts_client::metrics;
use sts_client::stream::{open_stream, StreamEvent, StreamHandle};
use sts_client::utils::{join_or_cancel, short_id, shutdown_signal};

/// Betting venue client: streams odds and places bets.
#[derive(Parser, Debug)]
#[command(name = "sts-client")]
#[command(about = "Stream live odds from the venue and run the bet advice lifecycle")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override STS_USERNAME.
    #[arg(long, global = true)]
    username: Option<String>,

    /// Override STS_PASSWORD.
    #[arg(long, global = true)]
    password: Option<String>,

    /// Override STS_API_ROOT.
    #[arg(long, global = true)]
    api_root: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream odds and place one sample bet (default).
    Run {
        /// HTTP server port for the status API.
        #[arg(short, long)]
        port: Option<u16>,

        /// Update messages to receive before betting; 0 disables betting.
        #[arg(long)]
        bet_after: Option<u64>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Stream odds for a while and print cache statistics.
    Watch {
        /// How long to stream.
        #[arg(long, default_value = "30")]
        seconds: u64,
    },

    /// Report the result of a settled bet.
    Settle {
        /// Bet id used for the advice.
        bet_id: String,

        /// WIN, LOSE or VOID.
        result: SettlementResult,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("sts_client=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Initialize metrics
    metrics::init_metrics();

    let overrides = args.overrides();

    // Handle subcommands
    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(&overrides),
        Some(Command::Run { port, bet_after }) => cmd_run(&overrides, port, bet_after).await,
        Some(Command::Watch { seconds }) => cmd_watch(&overrides, seconds).await,
        Some(Command::Settle { bet_id, result }) => cmd_settle(&overrides, &bet_id, result).await,
        None => cmd_run(&overrides, None, None).await,
    }
}

/// Credential overrides from the command line.
#[derive(Debug, Default)]
struct Overrides {
    username: Option<String>,
    password: Option<String>,
    api_root: Option<String>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            username: self.username.clone(),
            password: self.password.clone(),
            api_root: self.api_root.clone(),
        }
    }
}

/// Load, override and validate configuration.
fn load_config(overrides: &Overrides) -> anyhow::Result<Config> {
    info!("Loading configuration...");
    let mut config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Some(username) = &overrides.username {
        config.sts_username = username.clone();
    }
    if let Some(password) = &overrides.password {
        config.sts_password = password.clone();
    }
    if let Some(api_root) = &overrides.api_root {
        config.sts_api_root = api_root.clone();
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    Ok(config)
}

/// Check configuration validity.
fn cmd_check_config(overrides: &Overrides) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("STS CLIENT - CONFIGURATION CHECK");
    println!("======================================================================");

    let config = load_config(overrides)?;

    println!("Configuration Summary:");
    println!("  User: {}", config.sts_username);
    println!("  REST base: {}", config.rest_base_url()?);
    println!("  Stream base: {}", config.stream_base_url()?);
    println!("  Poll interval: {}ms", config.bet_poll_interval_ms);
    println!("  Bet after: {} messages", config.bet_after_messages);
    println!("  Account: {} ({})", config.account_id, config.account_hierarchy.join(" > "));
    println!("  Punter: {}", config.end_punter_id);
    println!("  Currency: {}", config.currency);
    println!("  Stake fraction: {}", config.stake_fraction);
    println!("  Position taking: {}", config.position_taking);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Authenticate and open the odds stream into a fresh store.
async fn connect(client: &StsClient, config: &Config) -> anyhow::Result<StreamHandle> {
    info!("Authenticating as {}...", config.sts_username);
    let auth = client.auth(&config.sts_username, &config.sts_password).await?;
    info!("Authenticated, token {}...", short_id(&auth.token.to_string()));

    let url = client.odds_url(auth.token)?;
    let store = Arc::new(EventStore::new());
    Ok(open_stream(&url, store).await?)
}

/// Stream odds, cache them and run one sample bet.
async fn cmd_run(
    overrides: &Overrides,
    port: Option<u16>,
    bet_after: Option<u64>,
) -> anyhow::Result<()> {
    let config = load_config(overrides)?;
    let port = port.unwrap_or(config.port);
    let bet_after = bet_after.unwrap_or(config.bet_after_messages);

    if config.metrics_enabled {
        metrics::install_exporter(config.metrics_port).map_err(|e| anyhow::anyhow!(e))?;
    }

    let client = Arc::new(StsClient::from_config(&config)?);
    let mut stream = connect(&client, &config).await?;
    let store = stream.store();

    let app_state = AppState::new(store.clone()).with_ready_flag(stream.connected_flag());
    let (stop_tx, stop_rx) = watch::channel(false);
    let (cancel_tx, cancel_rx) = watch::channel(false);

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state.clone());
    let mut server_stop = stop_rx.clone();
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = server_stop.wait_for(|stop| *stop).await;
            })
            .await
    });

    info!("========================================");
    info!("STS CLIENT STARTED");
    info!("========================================");
    if bet_after > 0 {
        info!("Placing a bet after {} update messages", bet_after);
    } else {
        info!("Betting disabled");
    }

    let mut bet_task: Option<JoinHandle<()>> = None;
    let mut messages = 0u64;
    let mut closing = false;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown, if !closing => {
                info!("Closing odds stream...");
                closing = true;
                stream.close();
                let _ = cancel_tx.send(true);
            }

            event = stream.recv() => match event {
                Some(StreamEvent::Updates(updates)) => {
                    messages += 1;
                    app_state.stats.write().await.update_messages += 1;
                    debug!(
                        message = messages,
                        deltas = updates.len(),
                        events = store.len(),
                        "Update batch"
                    );

                    if bet_after > 0 && messages == bet_after && bet_task.is_none() {
                        bet_task = spawn_sample_bet(
                            client.clone(),
                            &store,
                            &config,
                            cancel_rx.clone(),
                            app_state.clone(),
                        );
                    }
                }
                Some(StreamEvent::Closed(reason)) => {
                    info!("Odds stream closed: {:?}", reason);
                    break;
                }
                None => break,
            },
        }
    }

    // A peer close leaves the bet polling over REST; only Ctrl-C cancels it.
    if let Some(task) = bet_task {
        let interrupt = async {
            if closing {
                std::future::pending::<()>().await;
            } else {
                (&mut shutdown).await;
            }
        };
        if let Err(e) = join_or_cancel(task, interrupt, &cancel_tx).await {
            error!("Bet task failed: {}", e);
        }
    }

    let _ = stop_tx.send(true);

    match stream.join().await {
        Ok(stats) => info!(
            "Stream summary: {} messages, {} heartbeats, {} update batches, {} decode errors",
            stats.messages, stats.heartbeats, stats.update_batches, stats.decode_errors
        ),
        Err(e) => warn!("Odds stream ended with error: {}", e),
    }

    let stats = app_state.stats.read().await.clone();
    info!("========================================");
    info!("SESSION SUMMARY");
    info!("========================================");
    info!("Events cached: {}", store.len());
    info!("Update messages: {}", stats.update_messages);
    info!("Bets placed: {}", stats.bets_placed);
    info!(
        "Accepted: {} Rejected: {} Other: {} Failed: {}",
        stats.bets_accepted, stats.bets_rejected, stats.bets_other, stats.bets_failed
    );
    info!("========================================");

    if let Ok(Err(e)) = server_handle.await {
        warn!("HTTP server error: {}", e);
    }

    Ok(())
}

/// Pick an event, print its prices and run one lifecycle in the background.
fn spawn_sample_bet(
    client: Arc<StsClient>,
    store: &EventStore,
    config: &Config,
    cancel: watch::Receiver<bool>,
    state: AppState,
) -> Option<JoinHandle<()>> {
    let Some(event) = store.pick_event() else {
        warn!("No event with prices to bet on");
        return None;
    };

    info!(
        "Picked event {} ({}, in play: {})",
        event.event_id,
        event.title(),
        event.is_inplay()
    );
    for odds in &event.prices {
        println!("{}", odds.board_line());
    }

    let terms = event.prices.first().and_then(|odds| {
        BetTerms::back_from_quote(&event, odds, config.stake_fraction, config.attribution())
    });
    let Some(terms) = terms else {
        warn!("First price record has no back quote, not betting");
        return None;
    };

    info!(
        "Requesting advice: {} @ {} stake {} ({})",
        terms.bet_type.join("/"),
        terms.price,
        terms.stake,
        terms.attribution.currency
    );

    let poll_interval = config.poll_interval();
    Some(tokio::spawn(async move {
        state.stats.write().await.bets_placed += 1;

        let controller = BetLifecycleController::new(client.as_ref())
            .with_poll_interval(poll_interval)
            .with_cancel(cancel);
        let result = controller.place(terms).await;

        let mut stats = state.stats.write().await;
        match result {
            Ok(outcome) => {
                info!(
                    "Bet {} finished {} after {} polls: price {:?} stake {:?}",
                    outcome.bet_id, outcome.state, outcome.polls, outcome.advice.price, outcome.advice.stake
                );
                stats.last_bet_id = Some(outcome.bet_id);
                stats.record_outcome(Some(outcome.state));
            }
            Err(e) => {
                error!("Bet lifecycle failed: {}", e);
                stats.last_bet_id = e.bet_id().map(str::to_string);
                stats.record_outcome(None);
            }
        }
    }))
}

/// Stream for a fixed time and report what was cached.
async fn cmd_watch(overrides: &Overrides, seconds: u64) -> anyhow::Result<()> {
    let config = load_config(overrides)?;
    let client = StsClient::from_config(&config)?;
    let mut stream = connect(&client, &config).await?;
    let store = stream.store();

    println!("Streaming for {}s...", seconds);

    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    tokio::pin!(deadline);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut batches = 0u64;
    let mut deltas = 0usize;
    let mut peer_closed = false;

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = &mut shutdown => break,
            event = stream.recv() => match event {
                Some(StreamEvent::Updates(updates)) => {
                    batches += 1;
                    deltas += updates.len();
                }
                Some(StreamEvent::Closed(reason)) => {
                    println!("Stream closed by venue: {:?}", reason);
                    peer_closed = true;
                    break;
                }
                None => break,
            },
        }
    }

    let stats = if peer_closed {
        stream.join().await?
    } else {
        stream.shutdown().await?
    };

    println!("======================================================================");
    println!("STREAM SUMMARY");
    println!("======================================================================");
    println!("  Frames: {}", stats.messages);
    println!("  Heartbeats answered: {}", stats.heartbeats);
    println!("  Update batches: {} ({} deltas)", batches, deltas);
    println!("  Decode errors: {}", stats.decode_errors);
    println!("  Events cached: {}", store.len());
    println!("  Events in play: {}", store.inplay_count());
    if let Some(event) = store.pick_event() {
        println!("  Best candidate: {} ({})", event.event_id, event.title());
    }
    println!("======================================================================");

    Ok(())
}

/// Report one settlement.
async fn cmd_settle(
    overrides: &Overrides,
    bet_id: &str,
    result: SettlementResult,
) -> anyhow::Result<()> {
    let config = load_config(overrides)?;
    let client = StsClient::from_config(&config)?;

    let settlement = BetSettlement {
        unique_id: bet_id.to_string(),
        result,
        timestamp: OffsetDateTime::now_utc(),
    };

    let response = client.settlement(&[settlement]).await?;
    println!("Settlement accepted: {}", serde_json::to_string(&response)?);

    Ok(())
}
