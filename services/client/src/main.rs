//! Hopbench client binary
//!
//! Usage:
//!   hop-client --server 10.0.0.5 --count 1000 --period-us 500
//!   hop-client --expon --wait-spin

use anyhow::Result;
use clap::Parser;
use client::{Arrival, ClientConfig, WaitStrategy};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "hop-client")]
#[command(about = "Hopbench traffic client")]
#[command(version)]
struct Args {
    /// Target node host name or address
    #[arg(short, long, default_value = "127.0.0.1")]
    server: String,

    /// Target node port
    #[arg(long, default_value_t = 7891)]
    server_port: u16,

    /// Local host name or address to bind before connecting
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: String,

    /// Local port; 0 picks an ephemeral port
    #[arg(long, default_value_t = 0)]
    bind_port: u16,

    /// Number of requests to issue
    #[arg(short, long, default_value_t = 10)]
    count: usize,

    /// Mean inter-departure period in microseconds
    #[arg(short, long, default_value_t = 1_000)]
    period_us: u64,

    /// Draw inter-departure times from an exponential distribution
    /// (Poisson arrivals) instead of a fixed period
    #[arg(short, long)]
    expon: bool,

    /// Busy-poll the clock between departures instead of sleeping
    #[arg(short = 'w', long)]
    wait_spin: bool,

    /// Declared on-wire size of each request in bytes, padding included
    #[arg(long, default_value_t = 256)]
    request_size: u32,

    /// CPU time each request asks its peer to burn, in microseconds
    #[arg(long, default_value_t = 1)]
    compute_us: u64,

    /// Set TCP_NODELAY on the session socket
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    no_delay: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let config = ClientConfig {
        server_host: args.server,
        server_port: args.server_port,
        bind_host: args.bind,
        bind_port: args.bind_port,
        count: args.count,
        period_us: args.period_us,
        arrival: if args.expon {
            Arrival::Exponential
        } else {
            Arrival::Fixed
        },
        wait: if args.wait_spin {
            WaitStrategy::Spin
        } else {
            WaitStrategy::Block
        },
        request_size: args.request_size,
        compute_us: args.compute_us,
        no_delay: args.no_delay,
    };

    info!(
        "configuration: server={}:{} bind={}:{} count={} period_us={} arrival={:?} wait={:?}",
        config.server_host,
        config.server_port,
        config.bind_host,
        config.bind_port,
        config.count,
        config.period_us,
        config.arrival,
        config.wait,
    );

    let samples = client::run(&config)?;
    for elapsed in &samples {
        println!("elapsed: {} us", elapsed);
    }

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
