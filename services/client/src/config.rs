//! Client runtime configuration

use crate::schedule::{Arrival, WaitStrategy};
use serde::{Deserialize, Serialize};

/// Client configuration, assembled from CLI arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Target node host name or address
    pub server_host: String,
    /// Target node port
    pub server_port: u16,
    /// Local host name or address to bind before connecting
    pub bind_host: String,
    /// Local port; 0 requests an ephemeral port
    pub bind_port: u16,
    /// Number of requests to issue
    pub count: usize,
    /// Mean inter-departure period in microseconds
    pub period_us: u64,
    /// Inter-departure distribution
    pub arrival: Arrival,
    /// Deadline wait strategy
    pub wait: WaitStrategy,
    /// Declared on-wire size of each request, padding included
    pub request_size: u32,
    /// CPU time each request asks its peer to burn, in microseconds
    pub compute_us: u64,
    /// Set TCP_NODELAY on the session socket
    pub no_delay: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 7891,
            bind_host: "127.0.0.1".to_string(),
            bind_port: 0,
            count: 10,
            period_us: 1_000,
            arrival: Arrival::Fixed,
            wait: WaitStrategy::Block,
            request_size: 256,
            compute_us: 1,
            no_delay: false,
        }
    }
}
