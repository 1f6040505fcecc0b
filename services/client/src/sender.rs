//! Sender thread: scheduled request generation
//!
//! Every request asks the peer to burn a small fixed compute cost and reply
//! with a header-only acknowledgement. The schedule decides when each
//! request departs; the timestamp recorded for latency accounting is the
//! actual moment before the bytes hit the socket, not the target deadline.

use crate::clock;
use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::recorder::LatencyTable;
use crate::schedule::TrafficSchedule;
use codec::{MessageBuilder, MessageHeader};
use nix::sys::time::TimeSpec;
use std::io::Write;
use tracing::debug;

pub fn run_sender(
    mut stream: impl Write,
    config: &ClientConfig,
    table: &LatencyTable,
    start: TimeSpec,
) -> ClientResult<()> {
    let mut schedule =
        TrafficSchedule::new(clock::now(), config.period_us, config.arrival, config.wait);

    for request_id in 0..config.count as u32 {
        let frame = MessageBuilder::new(request_id)
            .total_size(config.request_size)
            .compute(config.compute_us)
            .reply(MessageHeader::SIZE as u32)
            .build()?;

        table.record_send(request_id, clock::micros_between(clock::now(), start));
        stream.write_all(&frame)?;
        debug!(request_id, bytes = frame.len(), "request sent");

        schedule.advance();
        schedule.wait();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{Arrival, WaitStrategy};
    use codec::Message;

    #[test]
    fn sender_emits_count_well_formed_requests_and_stamps_each() {
        let config = ClientConfig {
            count: 3,
            period_us: 1,
            arrival: Arrival::Fixed,
            wait: WaitStrategy::Block,
            request_size: 256,
            compute_us: 1,
            ..ClientConfig::default()
        };
        let table = LatencyTable::new(config.count);
        let mut wire = Vec::new();

        run_sender(&mut wire, &config, &table, clock::now()).unwrap();

        assert_eq!(wire.len(), 3 * 256);
        for id in 0..3u32 {
            let frame = &wire[id as usize * 256..(id as usize + 1) * 256];
            let msg = Message::decode(frame).unwrap();
            assert_eq!(msg.request_id, id);
            assert_eq!(msg.total_size, 256);
            assert_eq!(
                msg.commands,
                vec![
                    codec::Command::Compute { duration_us: 1 },
                    codec::Command::Reply {
                        reply_size: MessageHeader::SIZE as u32
                    },
                ]
            );
            assert!(table.send_micros(id).is_some(), "id {id} never stamped");
        }
    }
}
