//! # Hopbench Traffic Client
//!
//! Generates scheduled request traffic against one node and records the
//! round-trip latency of every request. Two threads share the session
//! socket with disjoint directions: the sender writes requests on a fixed or
//! Poisson schedule, the receiver pairs replies with their recorded send
//! times. They meet only in the per-id timestamp table — one writer per
//! cell, no locks — and the elapsed samples surface after both threads
//! join.

pub mod clock;
pub mod config;
pub mod error;
pub mod recorder;
pub mod schedule;
pub mod sender;
pub mod session;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use schedule::{Arrival, WaitStrategy};

use recorder::LatencyTable;
use std::sync::Arc;
use std::thread;
use tracing::info;

/// Run one full measurement session: connect, issue `config.count`
/// requests, receive every reply, and return the elapsed microseconds per
/// request id in ascending id order.
pub fn run(config: &ClientConfig) -> ClientResult<Vec<u64>> {
    let stream = session::connect_session(config)?;
    let read_half = stream.try_clone()?;

    let table = Arc::new(LatencyTable::new(config.count));
    let start = clock::now();

    let sender = {
        let config = config.clone();
        let table = Arc::clone(&table);
        thread::Builder::new()
            .name("sender".to_string())
            .spawn(move || sender::run_sender(stream, &config, &table, start))?
    };
    let receiver = {
        let count = config.count;
        let table = Arc::clone(&table);
        thread::Builder::new()
            .name("receiver".to_string())
            .spawn(move || recorder::run_receiver(read_half, count, &table, start))?
    };

    sender
        .join()
        .map_err(|_| ClientError::ThreadPanicked { thread: "sender" })??;
    let samples = receiver
        .join()
        .map_err(|_| ClientError::ThreadPanicked { thread: "receiver" })??;

    info!(samples = samples.len(), "measurement complete");
    Ok(samples)
}
