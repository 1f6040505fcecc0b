//! Hopbench node binary
//!
//! Usage:
//!   hop-node --bind 0.0.0.0 --port 7891
//!   hop-node --no-delay false --max-connections 32

use anyhow::{Context, Result};
use clap::Parser;
use node::{NodeConfig, Reactor};
use std::net::ToSocketAddrs;

#[derive(Parser, Debug)]
#[command(name = "hop-node")]
#[command(about = "Hopbench chain node")]
#[command(version)]
struct Args {
    /// Bind host name or address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// Bind port
    #[arg(short, long, default_value_t = 7891)]
    port: u16,

    /// Set TCP_NODELAY on accepted and outbound sockets
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    no_delay: bool,

    /// Receive-buffer pool size (bounds concurrent inbound connections)
    #[arg(long, default_value_t = 16)]
    max_connections: usize,

    /// Outbound peer table size (bounds distinct forward destinations)
    #[arg(long, default_value_t = 16)]
    max_peers: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let bind_address = (args.bind.as_str(), args.port)
        .to_socket_addrs()
        .with_context(|| format!("failed to resolve bind address {}:{}", args.bind, args.port))?
        .next()
        .with_context(|| format!("{}:{} resolved to no addresses", args.bind, args.port))?;

    let config = NodeConfig {
        bind_address,
        no_delay: args.no_delay,
        max_connections: args.max_connections,
        max_peers: args.max_peers,
    };

    // One reactor thread; connection tasks are !Send by design.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;
    let local = tokio::task::LocalSet::new();

    runtime.block_on(local.run_until(async move {
        let reactor = Reactor::bind(config).await?;
        reactor.run().await
    }))?;

    Ok(())
}

fn init_logging(args: &Args) {
    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::fmt().with_max_level(log_level).init();
}
