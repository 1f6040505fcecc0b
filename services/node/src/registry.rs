//! Outbound-connection reuse table and deferred forwarding
//!
//! ## Purpose
//!
//! Forward commands name a destination endpoint, not a socket. The registry
//! keeps at most one live outbound connection per endpoint and hands the same
//! connection to every forward targeting it. An entry is inserted the moment
//! a connect is initiated, so forwards racing against an in-flight connect
//! reuse it instead of opening a second socket to the same peer.
//!
//! Each outbound connection is driven by one local writer task. Forwards are
//! queued to it as [`PendingForward`] items — request id, command index and
//! encoded payload travel together from the moment the connect starts until
//! the bytes are on the wire, so a connect that resolves late still sends
//! exactly the forwards that triggered it, in order. If the connect fails,
//! every queued item is reported and discarded and the entry is removed;
//! that forward path dies, the inbound connections that used it do not.
//!
//! Capacity is a hard admission bound (a full table refuses new endpoints,
//! existing ones keep working) and lookup is a linear scan — fine for the
//! tens of peers a chain topology produces.

use crate::error::{NodeError, NodeResult};
use bytes::Bytes;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::rc::Rc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Forwarding destination key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub host: Ipv4Addr,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: Ipv4Addr, port: u16) -> Self {
        Self { host, port }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.host, self.port))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Lifecycle of an outbound forwarding connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardState {
    /// Connect in flight; sends queue as pending forwards
    Connecting,
    /// Established; queued and new sends go straight to the socket
    Forwarding,
    /// Dead; the registry entry is gone or about to be
    Closed,
}

/// One forward in flight toward (or queued for) an outbound connection
#[derive(Debug)]
pub struct PendingForward {
    pub request_id: u32,
    pub command_index: usize,
    pub payload: Bytes,
}

/// Handle to one outbound connection's writer task
#[derive(Debug, Clone)]
pub struct ForwardConn {
    tx: mpsc::UnboundedSender<PendingForward>,
    state: Rc<Cell<ForwardState>>,
}

impl ForwardConn {
    /// Spawn the writer task for `endpoint` on the current `LocalSet`.
    ///
    /// `connect` is the connection future; production passes
    /// `TcpStream::connect`, tests may pass a deliberately slow variant to
    /// exercise the pending-forward path.
    pub fn spawn<F>(
        registry: Rc<RefCell<SocketRegistry>>,
        endpoint: Endpoint,
        connect: F,
        no_delay: bool,
    ) -> ForwardConn
    where
        F: Future<Output = std::io::Result<TcpStream>> + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Rc::new(Cell::new(ForwardState::Connecting));
        let conn = ForwardConn {
            tx,
            state: state.clone(),
        };

        tokio::task::spawn_local(write_outbound(registry, endpoint, connect, no_delay, rx, state));
        conn
    }

    pub fn state(&self) -> ForwardState {
        self.state.get()
    }

    /// Queue one forward. While the connection is still `Connecting` the
    /// item waits as a pending forward and is sent on completion.
    pub fn send(&self, item: PendingForward, endpoint: Endpoint) -> NodeResult<()> {
        self.tx.send(item).map_err(|_| NodeError::ForwardClosed {
            endpoint: endpoint.to_string(),
        })
    }
}

/// Writer task: resolve the connect, then drain queued forwards in order.
async fn write_outbound<F>(
    registry: Rc<RefCell<SocketRegistry>>,
    endpoint: Endpoint,
    connect: F,
    no_delay: bool,
    mut rx: mpsc::UnboundedReceiver<PendingForward>,
    state: Rc<Cell<ForwardState>>,
) where
    F: Future<Output = std::io::Result<TcpStream>>,
{
    let mut stream = match connect.await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(%endpoint, error = %e, "outbound connect failed");
            state.set(ForwardState::Closed);
            rx.close();
            while let Ok(item) = rx.try_recv() {
                warn!(
                    %endpoint,
                    request_id = item.request_id,
                    command_index = item.command_index,
                    "discarding pending forward after failed connect"
                );
            }
            registry.borrow_mut().remove(endpoint);
            return;
        }
    };

    if no_delay {
        if let Err(e) = stream.set_nodelay(true) {
            warn!(%endpoint, error = %e, "failed to set TCP_NODELAY on outbound socket");
        }
    }
    state.set(ForwardState::Forwarding);
    debug!(%endpoint, "outbound connection established");

    while let Some(item) = rx.recv().await {
        if let Err(e) = stream.write_all(&item.payload).await {
            warn!(
                %endpoint,
                request_id = item.request_id,
                error = %e,
                "forward write failed, dropping outbound connection"
            );
            break;
        }
        debug!(
            %endpoint,
            request_id = item.request_id,
            bytes = item.payload.len(),
            "forwarded"
        );
    }

    state.set(ForwardState::Closed);
    registry.borrow_mut().remove(endpoint);
}

/// Endpoint → outbound connection table
#[derive(Debug)]
pub struct SocketRegistry {
    entries: Vec<(Endpoint, ForwardConn)>,
    capacity: usize,
    no_delay: bool,
}

impl SocketRegistry {
    pub fn new(capacity: usize, no_delay: bool) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            no_delay,
        }
    }

    pub fn find(&self, endpoint: Endpoint) -> Option<ForwardConn> {
        self.entries
            .iter()
            .find(|(e, _)| *e == endpoint)
            .map(|(_, conn)| conn.clone())
    }

    pub fn remove(&mut self, endpoint: Endpoint) {
        if let Some(pos) = self.entries.iter().position(|(e, _)| *e == endpoint) {
            debug!(%endpoint, "removing outbound connection from registry");
            self.entries.swap_remove(pos);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Register an outbound connection under its endpoint. Refuses with
    /// `RegistryFull` when a new endpoint would exceed capacity.
    pub fn insert(&mut self, endpoint: Endpoint, conn: ForwardConn) -> NodeResult<()> {
        if self.entries.len() >= self.capacity {
            return Err(NodeError::RegistryFull {
                capacity: self.capacity,
            });
        }
        self.entries.push((endpoint, conn));
        Ok(())
    }

    /// Reuse the endpoint's connection, or create one. Refuses with
    /// `RegistryFull` when a new endpoint would exceed capacity.
    pub fn obtain(registry: &Rc<RefCell<Self>>, endpoint: Endpoint) -> NodeResult<ForwardConn> {
        let no_delay = {
            let this = registry.borrow();
            if let Some(conn) = this.find(endpoint) {
                return Ok(conn);
            }
            if this.entries.len() >= this.capacity {
                return Err(NodeError::RegistryFull {
                    capacity: this.capacity,
                });
            }
            this.no_delay
        };

        let conn = ForwardConn::spawn(
            registry.clone(),
            endpoint,
            TcpStream::connect(endpoint.socket_addr()),
            no_delay,
        );
        registry
            .borrow_mut()
            .insert(endpoint, conn.clone())
            .expect("capacity checked above");
        Ok(conn)
    }
}
