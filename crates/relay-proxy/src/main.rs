//! Relay proxy binary.
//!
//! ```bash
//! # Forward everything to a local backend
//! relay-proxy --port 8888 --target http://localhost:3000
//!
//! # Hold requests for manual resolution via the control API
//! relay-proxy --target http://localhost:3000 --intercept
//! ```

use clap::Parser;
use relay_proxy::{ControlApiServer, ProxyConfig, ProxyEvent, ProxyServer};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "relay-proxy")]
#[command(author, version, about = "Intercepting local HTTP proxy for API debugging")]
struct Args {
    /// Path to a YAML configuration file (CLI flags override it)
    #[arg(short, long)]
    config: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "RELAY_PORT")]
    port: Option<u16>,

    /// Target endpoint to forward to (repeatable; only the first is used)
    #[arg(short, long = "target")]
    targets: Vec<String>,

    /// Enable interception (capture events are published)
    #[arg(long)]
    intercept: bool,

    /// Forward captured requests immediately instead of holding them
    #[arg(long)]
    auto_respond: bool,

    /// Port for the control API
    #[arg(long, default_value = "8889", env = "RELAY_CONTROL_PORT")]
    control_port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ProxyConfig::from_file(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    if !args.targets.is_empty() {
        config.target_endpoints = args.targets.clone();
    }
    if args.intercept {
        config.intercept_enabled = true;
    }
    if args.auto_respond {
        config.auto_respond = true;
    }
    config.validate()?;

    let proxy = Arc::new(ProxyServer::new(config));
    proxy.start()?;

    // The single registered observer: log both sides of every exchange.
    let mut events = proxy.register_observer();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ProxyEvent::RequestCaptured(request) => {
                    info!(
                        id = %request.id,
                        "captured {} {} from {}",
                        request.method,
                        request.url,
                        request.client_address
                    );
                }
                ProxyEvent::ResponseReady { request, response } => {
                    info!(
                        id = %request.id,
                        "{} {} -> {} in {}ms ({} bytes)",
                        request.method,
                        request.url,
                        response.status_code,
                        response.response_time,
                        response.size
                    );
                }
            }
        }
    });

    let control_addr = SocketAddr::from(([127, 0, 0, 1], args.control_port));
    let control = ControlApiServer::new(control_addr, Arc::clone(&proxy));
    tokio::spawn(async move {
        if let Err(e) = control.run().await {
            tracing::error!("control API terminated: {}", e);
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    proxy.stop();
    Ok(())
}
