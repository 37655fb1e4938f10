use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use panel::config::{BOT_TOKEN_ENV, Config};
use panel::{AppContext, SessionHost, apps};
use panel_discord::{DiscordConfig, DiscordGateway, DiscordTransport};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Capacity of the channel between the Discord gateway and the host.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Panel - interactive button sessions for a Discord bot
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "panel.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::load(&cli.config)
        .await
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let token = config
        .bot_token()
        .with_context(|| format!("no bot token: set discord.bot_token or {BOT_TOKEN_ENV}"))?;

    let transport = Arc::new(DiscordTransport::new(&token));
    let host = apps::install(SessionHost::new(AppContext::new(transport)), &config);

    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let gateway = DiscordGateway::new(DiscordConfig::new(token));
    let gateway_task = tokio::spawn(gateway.start(event_tx));

    info!(config = %cli.config.display(), "Panel starting");

    tokio::select! {
        _ = host.run(event_rx) => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "Failed to listen for ctrl-c");
            }
            info!("Interrupt received");
        }
    }

    gateway_task.abort();
    host.shutdown().await;
    info!("Panel stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("panel=info,panel_discord=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
