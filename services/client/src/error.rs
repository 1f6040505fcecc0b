//! Client error types
//!
//! Setup failures (resolve, bind, connect) are fatal to the whole client:
//! without an established session there is no traffic to generate. Protocol
//! violations on the reply stream are equally fatal — the client has exactly
//! one connection.

use codec::CodecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Name resolution produced no usable IPv4 address
    #[error("failed to resolve {host}:{port} to an IPv4 address")]
    Resolve { host: String, port: u16 },

    /// Socket setup failure (create, bind, connect, options)
    #[error("session setup failed: {context}: {source}")]
    Setup {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Reply stream violated the wire protocol
    #[error("protocol violation: {0}")]
    Protocol(#[from] CodecError),

    /// I/O failure on the session
    #[error("i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// Reply names a request id outside the configured id space
    #[error("reply carries unknown request id {request_id} (expected 0..{count})")]
    UnknownRequestId { request_id: u32, count: usize },

    /// Reply arrived for a request the sender never recorded
    #[error("reply for request id {request_id} has no recorded send time")]
    UnmatchedReply { request_id: u32 },

    /// A worker thread panicked
    #[error("{thread} thread panicked")]
    ThreadPanicked { thread: &'static str },
}

impl ClientError {
    pub fn setup(context: &'static str, errno: nix::errno::Errno) -> Self {
        Self::Setup {
            context,
            source: std::io::Error::from_raw_os_error(errno as i32),
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
