//! Single-threaded connection reactor
//!
//! ## Purpose
//!
//! One thread multiplexes the listener, every inbound connection and every
//! outbound forwarding connection. Per-connection state lives in the local
//! task spawned for that connection; the node-wide tables (buffer pool,
//! socket registry) are owned here and only ever touched from this thread —
//! initialized at startup, mutated by connection tasks, dropped at exit.
//!
//! Admission control on accept: a connection that cannot get a receive
//! buffer is accepted and immediately closed, and the node keeps serving
//! everyone else. Inbound lifecycle is receive-until-zero-read; any protocol
//! violation or I/O failure tears down that connection alone.
//!
//! Must run inside a `tokio::task::LocalSet` on a current-thread runtime.

use crate::buffers::BufferPool;
use crate::config::{NodeConfig, RECV_BUFFER_CAPACITY};
use crate::engine::Engine;
use crate::error::{NodeError, NodeResult};
use crate::registry::SocketRegistry;
use codec::StreamReframer;
use bytes::BytesMut;
use std::cell::RefCell;
use std::net::SocketAddr;
use std::rc::Rc;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::{debug, info, warn};

pub struct Reactor {
    listener: TcpListener,
    pool: Rc<RefCell<BufferPool>>,
    registry: Rc<RefCell<SocketRegistry>>,
    config: NodeConfig,
}

impl Reactor {
    /// Bind the listening socket and build the node-wide tables.
    pub async fn bind(config: NodeConfig) -> NodeResult<Self> {
        let socket = TcpSocket::new_v4().map_err(|e| NodeError::setup("create socket", e))?;
        socket
            .set_reuseaddr(true)
            .map_err(|e| NodeError::setup("set SO_REUSEADDR", e))?;
        socket
            .set_reuseport(true)
            .map_err(|e| NodeError::setup("set SO_REUSEPORT", e))?;
        socket
            .bind(config.bind_address)
            .map_err(|e| NodeError::setup("bind listener", e))?;
        let listener = socket
            .listen(128)
            .map_err(|e| NodeError::setup("listen", e))?;

        let local = listener
            .local_addr()
            .map_err(|e| NodeError::setup("query listener address", e))?;
        info!(
            "🚀 node listening on {} (buffers: {}, peers: {}, no_delay: {})",
            local, config.max_connections, config.max_peers, config.no_delay
        );

        Ok(Self {
            listener,
            pool: Rc::new(RefCell::new(BufferPool::new(
                config.max_connections,
                RECV_BUFFER_CAPACITY,
            ))),
            registry: Rc::new(RefCell::new(SocketRegistry::new(
                config.max_peers,
                config.no_delay,
            ))),
            config,
        })
    }

    pub fn local_addr(&self) -> NodeResult<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| NodeError::setup("query listener address", e))
    }

    /// Accept loop. Runs until the surrounding runtime is torn down.
    pub async fn run(self) -> NodeResult<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => self.admit(stream, peer),
                Err(e) => {
                    // Transient accept failures (fd pressure) must not take
                    // down connections already being served.
                    warn!(error = %e, "accept failed");
                }
            }
        }
    }

    fn admit(&self, stream: TcpStream, peer: SocketAddr) {
        let Some((handle, buf)) = self.pool.borrow_mut().acquire() else {
            warn!(%peer, "no receive buffers free, closing new connection");
            return;
        };

        if self.config.no_delay {
            if let Err(e) = stream.set_nodelay(true) {
                warn!(%peer, error = %e, "failed to set TCP_NODELAY");
            }
        }

        debug!(%peer, slot = handle.index(), "accepted connection");
        let pool = self.pool.clone();
        let engine = Engine::new(self.registry.clone());
        tokio::task::spawn_local(async move {
            let buf = serve_inbound(stream, peer, buf, engine).await;
            pool.borrow_mut().release(handle, buf);
        });
    }
}

/// Drive one inbound connection: read, reframe, execute, until the peer
/// closes or an error tears the connection down. Always returns the receive
/// buffer for release back to the pool.
async fn serve_inbound(stream: TcpStream, peer: SocketAddr, buf: BytesMut, engine: Engine) -> BytesMut {
    let (mut read_half, mut write_half) = stream.into_split();
    let mut reframer = StreamReframer::with_buffer(buf);

    loop {
        match read_half.read_buf(reframer.buffer_mut()).await {
            Ok(0) => {
                debug!(%peer, "peer closed connection");
                break;
            }
            Ok(_) => loop {
                // One read may complete several pipelined messages; they
                // execute in arrival order, and a failure on a later one
                // never claws back replies already sent for earlier ones.
                match reframer.next_message() {
                    Ok(Some(message)) => {
                        if let Err(e) = engine.execute(&message, &mut write_half).await {
                            warn!(%peer, error = %e, "closing connection");
                            return reframer.into_buffer();
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(%peer, error = %e, "protocol violation, closing connection");
                        return reframer.into_buffer();
                    }
                }
            },
            Err(e) => {
                warn!(%peer, error = %e, "read failed, closing connection");
                break;
            }
        }
    }

    reframer.into_buffer()
}
