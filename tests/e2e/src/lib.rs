//! End-to-end scenarios spanning the client and one or more nodes.
//!
//! The scenarios live under `tests/`; this library hosts the shared node
//! harness.

use node::{NodeConfig, Reactor};
use std::net::SocketAddr;
use std::sync::mpsc;
use std::thread::JoinHandle;

/// Run a node on its own reactor thread, bound to an ephemeral loopback
/// port. Returns the bound address; the thread serves until the process
/// exits.
pub fn spawn_node(mut config: NodeConfig) -> (SocketAddr, JoinHandle<()>) {
    config.bind_address = "127.0.0.1:0".parse().expect("loopback address");
    let (addr_tx, addr_rx) = mpsc::channel();

    let handle = std::thread::Builder::new()
        .name("node-reactor".to_string())
        .spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("build node runtime");
            let local = tokio::task::LocalSet::new();
            runtime.block_on(local.run_until(async move {
                let reactor = Reactor::bind(config).await.expect("bind node");
                addr_tx
                    .send(reactor.local_addr().expect("node local addr"))
                    .expect("report node address");
                reactor.run().await.expect("node reactor failed");
            }));
        })
        .expect("spawn node thread");

    let addr = addr_rx.recv().expect("node never reported its address");
    (addr, handle)
}
