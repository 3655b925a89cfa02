//! BalanceBot GW - gateway between the browser UI and the robot

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use balancebot_gw::api::{self, ApiState};
use balancebot_gw::device::{endpoint, DeviceClient, DeviceEndpoint, EndpointConfig};

/// BalanceBot Gateway - control an ESP32 self-balancing robot from the browser
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to serve the web UI and API on
    #[arg(short, long, env = "GW_PORT", default_value_t = api::DEFAULT_API_PORT)]
    port: u16,

    /// Robot IP address
    #[arg(long, env = "ESP32_IP", default_value = endpoint::DEFAULT_HOST)]
    esp32_ip: String,

    /// Robot HTTP port
    #[arg(long, env = "ESP32_PORT", default_value_t = endpoint::DEFAULT_PORT)]
    esp32_port: u16,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    info!("Starting BalanceBot GW...");
    info!("Robot endpoint: {}:{}", args.esp32_ip, args.esp32_port);

    let endpoint = EndpointConfig::new(DeviceEndpoint::new(args.esp32_ip, args.esp32_port));
    let state = Arc::new(ApiState::new(DeviceClient::new(endpoint)));

    tokio::select! {
        result = api::start_server(state, args.port) => result?,
        _ = shutdown_signal() => {}
    }

    info!("BalanceBot GW shutdown complete");
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}
