mod config;
mod status_cmd;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use hermes_agent::{CommandRouter, CommandTexts, InboundDispatcher, MessageRouter, SessionStore};
use hermes_channels::{ChannelAdapter, OutboundSender, TelegramAdapter};
use hermes_config::HermesConfig;
use hermes_core::{CompletionMode, CompletionRelay, ReplySink};
use hermes_gateway::GatewayState;
use hermes_scheduler::FollowUpScheduler;

#[derive(Parser)]
#[command(name = "hermes")]
#[command(about = "Hermes: Telegram bot relaying chats to a remote completion service")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot and the health endpoint
    Serve {
        /// Port for the health endpoint (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
        /// Completion protocol: chat, assistants or echo
        #[arg(short, long)]
        mode: Option<CompletionMode>,
    },
    /// Query a running instance's health endpoint
    Status {
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Load and validate the configuration, then print it with secrets masked
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, mode } => {
            let mut env = hermes_config::process_env();
            if let Some(port) = port {
                env.insert(hermes_config::env::PORT.to_string(), port.to_string());
            }
            if let Some(mode) = mode {
                env.insert(
                    hermes_config::env::HERMES_COMPLETION_MODE.to_string(),
                    mode.to_string(),
                );
            }
            let path = hermes_config::config_file_path(&env);
            let loaded = hermes_config::load_from(&path, &env).await?;
            hermes_logging::init_logger(&config::log_settings(&loaded.config));
            loaded.log();
            run_server(loaded.config).await?;
        }
        Commands::Status { port } => {
            let port = match port {
                Some(port) => port,
                None => configured_port().await,
            };
            status_cmd::run(port).await?;
        }
        Commands::CheckConfig => {
            let loaded = hermes_config::load().await?;
            let redacted = hermes_config::redacted_config(&loaded.config);
            println!("{}", serde_json::to_string_pretty(&redacted)?);
            match &loaded.source {
                Some(path) => println!("\nLoaded from {}", path.display()),
                None => println!("\nNo config file; defaults and environment only"),
            }
            for warning in &loaded.warnings {
                println!("warning: {warning}");
            }
            println!("\nConfiguration OK ({} mode)", loaded.config.completion.mode);
        }
    }

    Ok(())
}

/// Port from PORT or the config file, without requiring credentials.
async fn configured_port() -> u16 {
    let env = hermes_config::process_env();
    let path = hermes_config::config_file_path(&env);
    let raw = hermes_config::load_raw(&path)
        .await
        .unwrap_or_else(|_| serde_json::Value::Object(Default::default()));
    hermes_config::prepare(raw, &env)
        .map(|c| c.gateway.port)
        .unwrap_or(hermes_config::defaults::DEFAULT_PORT)
}

async fn run_server(config: HermesConfig) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port)
        .parse()
        .with_context(|| format!("invalid bind address '{}'", config.gateway.bind))?;

    info!(
        mode = %config.completion.mode,
        port = config.gateway.port,
        bind = %config.gateway.bind,
        "Starting Hermes"
    );

    let token = config
        .telegram
        .bot_token
        .clone()
        .context("TELEGRAM_TOKEN is required")?;

    let store = Arc::new(SessionStore::new(config.session.max_sessions));
    let relay = hermes_relay::build_relay(&config::relay_settings(&config))?;
    info!(relay = relay.name(), "Completion relay ready");

    let telegram = TelegramAdapter::new(token).with_format(config.telegram.parse_mode);
    let sink: Arc<dyn ReplySink> = Arc::new(
        OutboundSender::new(telegram.clone()).with_split(config::split_settings(&config)),
    );
    let follow_ups = FollowUpScheduler::new();

    let dispatcher = Arc::new(InboundDispatcher::new(
        Arc::clone(&store),
        relay,
        Arc::clone(&sink),
        follow_ups.clone(),
        config::dispatcher_settings(&config),
    ));
    let commands = CommandRouter::new(Arc::clone(&store), follow_ups, sink, CommandTexts::default());
    let router = Arc::new(MessageRouter::new(dispatcher, commands));

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let state = GatewayState::new(Arc::clone(&store), env!("CARGO_PKG_VERSION"));
    let gateway = tokio::spawn(async move {
        let shutdown = async {
            let _ = stop_rx.await;
        };
        if let Err(e) = hermes_gateway::start_server(addr, state, shutdown).await {
            error!("Gateway error: {}", e);
        }
    });

    // Runs until Ctrl-C.
    if let Err(e) = telegram.start(router).await {
        error!(adapter = telegram.name(), "Channel adapter error: {}", e);
    }

    info!("Shutting down");
    let _ = stop_tx.send(());
    let _ = gateway.await;
    Ok(())
}
