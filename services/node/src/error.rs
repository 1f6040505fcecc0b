//! Node error types
//!
//! Per-connection failures (transport errors, protocol violations) stay
//! scoped to the connection task that hit them; only setup failures abort
//! the process, through `anyhow` at the binary boundary.

use codec::CodecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    /// Listener/socket setup failure, fatal to the process
    #[error("setup failed: {context}: {source}")]
    Setup {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Peer sent bytes that violate the wire protocol; fatal to that
    /// connection only
    #[error("protocol violation: {0}")]
    Protocol(#[from] CodecError),

    /// I/O failure on one connection
    #[error("connection i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// Outbound peer table is at capacity; the forward is refused
    #[error("socket registry full: all {capacity} outbound slots in use")]
    RegistryFull { capacity: usize },

    /// The reused outbound connection died before this forward was queued
    #[error("outbound connection to {endpoint} is closed")]
    ForwardClosed { endpoint: String },
}

impl NodeError {
    pub fn setup(context: &'static str, source: std::io::Error) -> Self {
        Self::Setup { context, source }
    }
}

pub type NodeResult<T> = std::result::Result<T, NodeError>;
