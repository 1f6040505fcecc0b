//! Node runtime configuration

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Capacity of each pooled receive buffer
pub const RECV_BUFFER_CAPACITY: usize = 64 * 1024;

/// Node configuration, assembled from CLI arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Address the listener binds to
    pub bind_address: SocketAddr,
    /// Set TCP_NODELAY on accepted and outbound sockets
    pub no_delay: bool,
    /// Receive-buffer pool size; bounds concurrent inbound connections
    pub max_connections: usize,
    /// Socket-registry capacity; bounds distinct forwarding peers
    pub max_peers: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:7891".parse().expect("static default address"),
            no_delay: true,
            max_connections: 16,
            max_peers: 16,
        }
    }
}
