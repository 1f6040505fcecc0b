//! Session socket setup
//!
//! Resolve, bind, connect — in that order, all fatal on failure. The bind
//! happens before the connect so measurements can be pinned to a specific
//! local interface, which std's `TcpStream::connect` cannot express; the raw
//! socket calls go through `nix` and the finished fd is handed to
//! `std::net::TcpStream` for the worker threads.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use nix::sys::socket::{
    bind, connect, setsockopt, socket, sockopt, AddressFamily, SockFlag, SockType, SockaddrIn,
};
use std::net::{SocketAddr, SocketAddrV4, TcpStream, ToSocketAddrs};
use std::os::fd::AsRawFd;
use tracing::info;

pub fn connect_session(config: &ClientConfig) -> ClientResult<TcpStream> {
    let server = resolve_v4(&config.server_host, config.server_port)?;
    let local = resolve_v4(&config.bind_host, config.bind_port)?;
    info!(server = %server, bind = %local, "establishing session");

    let fd = socket(
        AddressFamily::Inet,
        SockType::Stream,
        SockFlag::empty(),
        None,
    )
    .map_err(|e| ClientError::setup("create socket", e))?;

    setsockopt(&fd, sockopt::TcpNoDelay, &config.no_delay)
        .map_err(|e| ClientError::setup("set TCP_NODELAY", e))?;
    bind(fd.as_raw_fd(), &SockaddrIn::from(local))
        .map_err(|e| ClientError::setup("bind local address", e))?;
    connect(fd.as_raw_fd(), &SockaddrIn::from(server))
        .map_err(|e| ClientError::setup("connect", e))?;

    Ok(TcpStream::from(fd))
}

fn resolve_v4(host: &str, port: u16) -> ClientResult<SocketAddrV4> {
    let addrs = (host, port).to_socket_addrs().map_err(|_| ClientError::Resolve {
        host: host.to_string(),
        port,
    })?;

    addrs
        .filter_map(|addr| match addr {
            SocketAddr::V4(v4) => Some(v4),
            SocketAddr::V6(_) => None,
        })
        .next()
        .ok_or_else(|| ClientError::Resolve {
            host: host.to_string(),
            port,
        })
}
