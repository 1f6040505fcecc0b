//! Outgoing message construction
//!
//! `MessageBuilder` assembles a header and command list into one contiguous
//! frame, zero-padded out to the declared `total_size`. The declared size
//! defaults to the encoded size but may be set larger to emulate a given
//! payload, which is how request traffic controls its on-wire footprint.
//! `encode_tail` builds the downstream message for a Forward or Reply: same
//! request id, the commands after the consuming command, a new declared size.

use crate::error::{CodecError, CodecResult};
use crate::message::{Command, Message, MessageHeader, COMMAND_SIZE, MAX_COMMANDS, MAX_MESSAGE_SIZE};
use bytes::{Bytes, BytesMut};
use std::net::Ipv4Addr;
use zerocopy::AsBytes;

/// Builder for one wire message
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    request_id: u32,
    declared_size: Option<u32>,
    commands: Vec<Command>,
}

impl MessageBuilder {
    pub fn new(request_id: u32) -> Self {
        Self {
            request_id,
            declared_size: None,
            commands: Vec::new(),
        }
    }

    /// Declare the on-wire size. Must cover the header and every command;
    /// the gap up to `size` is transmitted as zero padding.
    pub fn total_size(mut self, size: u32) -> Self {
        self.declared_size = Some(size);
        self
    }

    pub fn compute(self, duration_us: u64) -> Self {
        self.command(Command::Compute { duration_us })
    }

    pub fn forward(self, next_host: Ipv4Addr, next_port: u16, forwarded_size: u32) -> Self {
        self.command(Command::Forward {
            next_host,
            next_port,
            forwarded_size,
        })
    }

    pub fn reply(self, reply_size: u32) -> Self {
        self.command(Command::Reply { reply_size })
    }

    pub fn command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn commands(mut self, commands: impl IntoIterator<Item = Command>) -> Self {
        self.commands.extend(commands);
        self
    }

    /// Encode into one frame of exactly the declared size.
    pub fn build(self) -> CodecResult<Bytes> {
        if self.commands.len() > MAX_COMMANDS {
            return Err(CodecError::TooManyCommands {
                count: self.commands.len(),
                max: MAX_COMMANDS,
            });
        }

        let encoded = MessageHeader::SIZE + self.commands.len() * COMMAND_SIZE;
        let declared = self.declared_size.map(|s| s as usize).unwrap_or(encoded);
        if declared < encoded || declared > MAX_MESSAGE_SIZE {
            return Err(CodecError::size_out_of_range(
                declared,
                encoded,
                MAX_MESSAGE_SIZE,
            ));
        }

        let header = MessageHeader::new(
            self.request_id,
            declared as u32,
            self.commands.len() as u8,
        );

        let mut frame = BytesMut::zeroed(declared);
        frame[..MessageHeader::SIZE].copy_from_slice(header.as_bytes());
        for (i, cmd) in self.commands.iter().enumerate() {
            let start = MessageHeader::SIZE + i * COMMAND_SIZE;
            cmd.encode_into(&mut frame[start..start + COMMAND_SIZE]);
        }
        Ok(frame.freeze())
    }
}

/// Encode the downstream message a Forward or Reply at `consumed_index`
/// produces: the commands strictly after that index, under the original
/// request id, with `total_size` as declared by the consuming command.
pub fn encode_tail(message: &Message, consumed_index: usize, total_size: u32) -> CodecResult<Bytes> {
    MessageBuilder::new(message.request_id)
        .total_size(total_size)
        .commands(message.commands[consumed_index + 1..].iter().copied())
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_then_decode_roundtrips() {
        let frame = MessageBuilder::new(9)
            .total_size(256)
            .compute(1)
            .reply(MessageHeader::SIZE as u32)
            .build()
            .unwrap();
        assert_eq!(frame.len(), 256);

        let msg = Message::decode(&frame).unwrap();
        assert_eq!(msg.request_id, 9);
        assert_eq!(msg.total_size, 256);
        assert_eq!(
            msg.commands,
            vec![
                Command::Compute { duration_us: 1 },
                Command::Reply {
                    reply_size: MessageHeader::SIZE as u32
                },
            ]
        );
    }

    #[test]
    fn default_size_is_the_encoded_size() {
        let frame = MessageBuilder::new(0).compute(5).build().unwrap();
        assert_eq!(frame.len(), MessageHeader::SIZE + COMMAND_SIZE);
    }

    #[test]
    fn declared_size_must_cover_commands() {
        let err = MessageBuilder::new(0)
            .total_size(MessageHeader::SIZE as u32)
            .compute(5)
            .build()
            .unwrap_err();
        assert!(matches!(err, CodecError::SizeOutOfRange { .. }));
    }

    #[test]
    fn tail_drops_consumed_commands_and_resizes() {
        let original = Message {
            request_id: 3,
            total_size: 256,
            commands: vec![
                Command::Forward {
                    next_host: Ipv4Addr::LOCALHOST,
                    next_port: 7892,
                    forwarded_size: 64,
                },
                Command::Compute { duration_us: 10 },
                Command::Reply { reply_size: 12 },
            ],
        };

        let frame = encode_tail(&original, 0, 64).unwrap();
        assert_eq!(frame.len(), 64);

        let tail = Message::decode(&frame).unwrap();
        assert_eq!(tail.request_id, 3);
        assert_eq!(
            tail.commands,
            vec![
                Command::Compute { duration_us: 10 },
                Command::Reply { reply_size: 12 },
            ]
        );
    }

    #[test]
    fn tail_of_last_command_is_header_only() {
        let original = Message {
            request_id: 1,
            total_size: 44,
            commands: vec![
                Command::Compute { duration_us: 1 },
                Command::Reply { reply_size: 12 },
            ],
        };
        let frame = encode_tail(&original, 1, MessageHeader::SIZE as u32).unwrap();
        assert_eq!(frame.len(), MessageHeader::SIZE);
        let tail = Message::decode(&frame).unwrap();
        assert!(tail.commands.is_empty());
    }
}
