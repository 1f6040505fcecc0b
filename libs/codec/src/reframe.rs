//! Stream reframing: raw byte stream in, discrete messages out
//!
//! ## Purpose
//!
//! TCP delivers a byte stream with no message boundaries; one read may carry
//! half a header, one message and a fragment of the next, or several whole
//! messages back to back. `StreamReframer` accumulates reads in a single
//! reusable buffer and yields complete frames in order, keeping any trailing
//! partial message buffered for the next read.
//!
//! Consuming a frame with `split_to` also compacts the remainder to the
//! buffer's start, so the buffer's level is bounded by one read plus one
//! partial message and its capacity never needs to grow in steady state.

use crate::error::CodecResult;
use crate::message::{Message, MessageHeader};
use bytes::BytesMut;

/// Incremental message framer over one connection's byte stream
#[derive(Debug)]
pub struct StreamReframer {
    buf: BytesMut,
}

impl StreamReframer {
    /// Reframer over a fresh buffer of the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self::with_buffer(BytesMut::with_capacity(capacity))
    }

    /// Reframer over a caller-provided (typically pooled) buffer.
    pub fn with_buffer(buf: BytesMut) -> Self {
        Self { buf }
    }

    /// The accumulation buffer, for direct socket reads (`read_buf`).
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Append bytes by copy. Test and non-socket entry point.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Unconsumed bytes currently buffered.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Yield the next complete message, or `None` until more bytes arrive.
    ///
    /// Call in a loop after every read: a single read can complete several
    /// pipelined messages. A size or tag violation is an error; the caller
    /// is expected to tear the connection down, so the buffer's contents are
    /// left untouched afterwards.
    pub fn next_message(&mut self) -> CodecResult<Option<Message>> {
        if self.buf.len() < MessageHeader::SIZE {
            return Ok(None);
        }

        // Validates size bounds and command fit before the body is complete,
        // so an abusive declared size fails fast instead of stalling.
        let header = MessageHeader::parse(&self.buf)?;
        let total = header.total_size as usize;
        if self.buf.len() < total {
            return Ok(None);
        }

        let frame = self.buf.split_to(total);
        Message::decode(&frame).map(Some)
    }

    /// Give the buffer back, for release to its pool.
    pub fn into_buffer(mut self) -> BytesMut {
        self.buf.clear();
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::MessageBuilder;
    use crate::error::CodecError;
    use crate::message::MAX_MESSAGE_SIZE;
    use proptest::prelude::*;
    use std::net::Ipv4Addr;

    fn sample_frames() -> Vec<bytes::Bytes> {
        vec![
            MessageBuilder::new(0)
                .total_size(256)
                .compute(1)
                .reply(MessageHeader::SIZE as u32)
                .build()
                .unwrap(),
            MessageBuilder::new(1)
                .forward(Ipv4Addr::new(10, 1, 2, 3), 7892, 64)
                .compute(250)
                .build()
                .unwrap(),
            MessageBuilder::new(2).total_size(90).build().unwrap(),
        ]
    }

    fn drain(reframer: &mut StreamReframer) -> Vec<Message> {
        let mut out = Vec::new();
        while let Some(msg) = reframer.next_message().unwrap() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn short_read_yields_nothing() {
        let mut reframer = StreamReframer::new(1024);
        reframer.extend_from_slice(&[0u8; MessageHeader::SIZE - 1]);
        assert!(reframer.next_message().unwrap().is_none());
        assert_eq!(reframer.pending(), MessageHeader::SIZE - 1);
    }

    #[test]
    fn header_without_body_yields_nothing() {
        let frame = sample_frames().remove(0);
        let mut reframer = StreamReframer::new(1024);
        reframer.extend_from_slice(&frame[..MessageHeader::SIZE + 3]);
        assert!(reframer.next_message().unwrap().is_none());
    }

    #[test]
    fn batched_read_yields_all_messages_in_order() {
        let frames = sample_frames();
        let mut stream = Vec::new();
        for f in &frames {
            stream.extend_from_slice(f);
        }

        let mut reframer = StreamReframer::new(4 * 1024);
        reframer.extend_from_slice(&stream);
        let messages = drain(&mut reframer);
        assert_eq!(messages.len(), frames.len());
        for (i, msg) in messages.iter().enumerate() {
            assert_eq!(msg.request_id, i as u32);
        }
        assert_eq!(reframer.pending(), 0);
    }

    #[test]
    fn message_spanning_reads_completes_on_final_read() {
        let frame = sample_frames().remove(0);
        let mut reframer = StreamReframer::new(1024);
        for chunk in frame.chunks(7) {
            reframer.extend_from_slice(chunk);
        }
        let messages = drain(&mut reframer);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].total_size as usize, frame.len());
    }

    #[test]
    fn undersized_declared_size_is_fatal() {
        let mut bytes = [0u8; MessageHeader::SIZE];
        bytes[4..8].copy_from_slice(&3u32.to_le_bytes());
        let mut reframer = StreamReframer::new(1024);
        reframer.extend_from_slice(&bytes);
        assert!(matches!(
            reframer.next_message(),
            Err(CodecError::SizeOutOfRange { declared: 3, .. })
        ));
    }

    #[test]
    fn oversized_declared_size_is_fatal_before_body_arrives() {
        let mut bytes = [0u8; MessageHeader::SIZE];
        bytes[4..8].copy_from_slice(&(MAX_MESSAGE_SIZE as u32 * 2).to_le_bytes());
        let mut reframer = StreamReframer::new(1024);
        reframer.extend_from_slice(&bytes);
        assert!(matches!(
            reframer.next_message(),
            Err(CodecError::SizeOutOfRange { .. })
        ));
    }

    #[test]
    fn bad_tag_in_complete_frame_is_fatal() {
        let frame = MessageBuilder::new(5).compute(1).build().unwrap();
        let mut corrupted = frame.to_vec();
        corrupted[MessageHeader::SIZE] = 0xEE;

        let mut reframer = StreamReframer::new(1024);
        reframer.extend_from_slice(&corrupted);
        assert!(matches!(
            reframer.next_message(),
            Err(CodecError::UnknownTag { tag: 0xEE, .. })
        ));
    }

    proptest! {
        /// Feeding K concatenated messages split at arbitrary boundaries
        /// yields the same K messages as one contiguous feed.
        #[test]
        fn framing_is_split_invariant(splits in proptest::collection::vec(0usize..600, 0..8)) {
            let frames = sample_frames();
            let mut stream = Vec::new();
            for f in &frames {
                stream.extend_from_slice(f);
            }

            let mut whole = StreamReframer::new(4 * 1024);
            whole.extend_from_slice(&stream);
            let expected = drain(&mut whole);

            let mut cuts: Vec<usize> = splits.iter().map(|s| s % (stream.len() + 1)).collect();
            cuts.sort_unstable();

            let mut split_fed = StreamReframer::new(4 * 1024);
            let mut collected = Vec::new();
            let mut last = 0;
            for cut in cuts.into_iter().chain(std::iter::once(stream.len())) {
                split_fed.extend_from_slice(&stream[last..cut]);
                while let Some(msg) = split_fed.next_message().unwrap() {
                    collected.push(msg);
                }
                last = cut;
            }

            prop_assert_eq!(collected, expected);
        }
    }
}
