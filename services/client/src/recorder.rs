//! Latency recording
//!
//! The sender and receiver threads share exactly one structure: a fixed
//! table of per-request send timestamps. Each cell is written once by the
//! sender (before departure) and read once by the receiver (after the
//! matching reply), release/acquire paired so the causal order enforced by
//! the transport carries the value across threads without a lock.
//!
//! Elapsed samples stay private to the receiver and come back through its
//! join handle; nothing is published per-sample.

use crate::clock;
use crate::error::{ClientError, ClientResult};
use codec::{MessageHeader, MAX_MESSAGE_SIZE};
use nix::sys::time::TimeSpec;
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const UNSENT: u64 = u64::MAX;

/// Per-request send timestamps, indexed by request id
#[derive(Debug)]
pub struct LatencyTable {
    cells: Vec<AtomicU64>,
}

impl LatencyTable {
    pub fn new(count: usize) -> Self {
        Self {
            cells: (0..count).map(|_| AtomicU64::new(UNSENT)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Sender half: store the actual departure time, once per id.
    pub fn record_send(&self, request_id: u32, micros_since_start: u64) {
        self.cells[request_id as usize].store(micros_since_start, Ordering::Release);
    }

    /// Receiver half: read the departure time recorded for `request_id`.
    pub fn send_micros(&self, request_id: u32) -> Option<u64> {
        match self.cells[request_id as usize].load(Ordering::Acquire) {
            UNSENT => None,
            micros => Some(micros),
        }
    }
}

/// Receive `count` replies and pair each with its recorded send time.
///
/// Returns the elapsed microseconds per request id, index-aligned with the
/// send table. Runs until every reply arrived; a lost reply stalls here by
/// design — there is no per-request timeout.
pub fn run_receiver(
    mut stream: impl Read,
    count: usize,
    table: &LatencyTable,
    start: TimeSpec,
) -> ClientResult<Vec<u64>> {
    let mut elapsed = vec![0u64; count];
    let mut header_buf = [0u8; MessageHeader::SIZE];
    let mut drain = [0u8; MAX_MESSAGE_SIZE];

    for _ in 0..count {
        stream.read_exact(&mut header_buf)?;
        let header = MessageHeader::parse(&header_buf)?;

        // Replies may carry a payload beyond the header; consume it so the
        // stream stays framed.
        let mut remaining = header.total_size as usize - MessageHeader::SIZE;
        while remaining > 0 {
            let chunk = remaining.min(drain.len());
            stream.read_exact(&mut drain[..chunk])?;
            remaining -= chunk;
        }

        let request_id = header.request_id;
        if request_id as usize >= count {
            return Err(ClientError::UnknownRequestId { request_id, count });
        }
        let sent = table
            .send_micros(request_id)
            .ok_or(ClientError::UnmatchedReply { request_id })?;

        let received = clock::micros_between(clock::now(), start);
        elapsed[request_id as usize] = received.saturating_sub(sent);
        debug!(request_id, elapsed_us = elapsed[request_id as usize], "reply received");
    }

    Ok(elapsed)
}
