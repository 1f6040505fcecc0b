//! Forwarding/compute engine
//!
//! Executes one decoded message's command list, strictly in order. Compute
//! burns CPU inline on the reactor thread — an intentional service-time
//! emulation during which no other connection makes progress. Forward and
//! Reply consume every remaining command for the downstream hop and end this
//! hop's processing of the message.

use crate::error::NodeResult;
use crate::registry::{Endpoint, PendingForward, SocketRegistry};
use codec::{encode_tail, Command, Message};
use std::cell::RefCell;
use std::rc::Rc;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tracing::{debug, warn};

/// Per-node command executor; cheap to clone per connection task
#[derive(Debug, Clone)]
pub struct Engine {
    registry: Rc<RefCell<SocketRegistry>>,
}

impl Engine {
    pub fn new(registry: Rc<RefCell<SocketRegistry>>) -> Self {
        Self { registry }
    }

    /// Execute one message arriving on the connection owning `reply_half`.
    ///
    /// An `Err` is fatal to that connection; refused forwards (registry
    /// full, outbound path dead) are reported and abandoned without killing
    /// the connection the message arrived on.
    pub async fn execute(&self, message: &Message, reply_half: &mut OwnedWriteHalf) -> NodeResult<()> {
        for (index, command) in message.commands.iter().enumerate() {
            match *command {
                Command::Compute { duration_us } => {
                    debug!(request_id = message.request_id, duration_us, "compute");
                    busy_burn_us(duration_us);
                }
                Command::Forward {
                    next_host,
                    next_port,
                    forwarded_size,
                } => {
                    let endpoint = Endpoint::new(next_host, next_port);
                    // A bad forwarded_size is the sender's protocol violation.
                    let payload = encode_tail(message, index, forwarded_size)?;
                    self.forward(message.request_id, index, endpoint, payload);
                    // Remaining commands belong to the next hop.
                    return Ok(());
                }
                Command::Reply { reply_size } => {
                    let payload = encode_tail(message, index, reply_size)?;
                    debug!(
                        request_id = message.request_id,
                        bytes = payload.len(),
                        "replying"
                    );
                    reply_half.write_all(&payload).await?;
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    fn forward(&self, request_id: u32, command_index: usize, endpoint: Endpoint, payload: bytes::Bytes) {
        let conn = match SocketRegistry::obtain(&self.registry, endpoint) {
            Ok(conn) => conn,
            Err(e) => {
                warn!(request_id, %endpoint, error = %e, "refusing forward");
                return;
            }
        };

        debug!(
            request_id,
            %endpoint,
            state = ?conn.state(),
            bytes = payload.len(),
            "queueing forward"
        );
        let item = PendingForward {
            request_id,
            command_index,
            payload,
        };
        if conn.send(item, endpoint).is_err() {
            warn!(request_id, %endpoint, "outbound connection died, abandoning forward");
            self.registry.borrow_mut().remove(endpoint);
        }
    }
}

/// Burn at least `duration_us` of CPU time, measured on this thread's CPU
/// clock, by polling it — sleeping would yield the core and miss the point
/// of emulating service time.
pub fn busy_burn_us(duration_us: u64) {
    use nix::time::{clock_gettime, ClockId};

    let clock = ClockId::CLOCK_THREAD_CPUTIME_ID;
    let start = clock_gettime(clock).expect("thread CPU clock unavailable");
    loop {
        let now = clock_gettime(clock).expect("thread CPU clock unavailable");
        let delta = now - start;
        let elapsed_us = delta.tv_sec() as u64 * 1_000_000 + delta.tv_nsec() as u64 / 1_000;
        if elapsed_us >= duration_us {
            return;
        }
        std::hint::spin_loop();
    }
}
