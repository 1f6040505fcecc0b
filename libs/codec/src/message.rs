//! Message layout: fixed header plus an array of fixed-size command records
//!
//! ```text
//! ┌──────────────────┬───────────────┬───────────────┬─────────────┐
//! │ MessageHeader    │ Command 0     │ Command ...   │ padding     │
//! │ (12 bytes)       │ (16 bytes)    │ (16 bytes)    │ (zeros)     │
//! └──────────────────┴───────────────┴───────────────┴─────────────┘
//! │◄──────────────────────── total_size ────────────────────────►│
//! ```
//!
//! `total_size` is authoritative and self-delimiting: a reader consumes
//! exactly that many bytes per message. It may exceed the encoded commands;
//! the remainder is zero padding, letting a request declare an arbitrary
//! payload size without carrying meaningful bytes. Multi-byte fields are
//! little-endian; the host address travels as its four dotted-quad octets.

use crate::error::{CodecError, CodecResult};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::net::Ipv4Addr;
use zerocopy::{AsBytes, FromBytes, FromZeroes, Ref};

/// Largest message either side will frame or accept
pub const MAX_MESSAGE_SIZE: usize = 4096;

/// Encoded size of one command record
pub const COMMAND_SIZE: usize = 16;

/// Ceiling on commands per message, implied by `MAX_MESSAGE_SIZE`
pub const MAX_COMMANDS: usize = (MAX_MESSAGE_SIZE - MessageHeader::SIZE) / COMMAND_SIZE;

/// Message header (12 bytes)
///
/// Field ordering keeps the struct free of implicit padding so it can be
/// reinterpreted as bytes; the trailing pad bytes are explicit and must be
/// zero on the wire.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsBytes, FromBytes, FromZeroes)]
pub struct MessageHeader {
    /// Caller-chosen id echoed through every hop of the chain (bytes 0-3)
    pub request_id: u32,
    /// Total on-wire size of this message, header included (bytes 4-7)
    pub total_size: u32,
    /// Number of command records encoded after the header (byte 8)
    pub command_count: u8,
    /// Zero padding (bytes 9-11)
    pub _padding: [u8; 3],
}

impl MessageHeader {
    /// Header size in bytes
    pub const SIZE: usize = 12;

    pub fn new(request_id: u32, total_size: u32, command_count: u8) -> Self {
        Self {
            request_id,
            total_size,
            command_count,
            _padding: [0; 3],
        }
    }

    /// Parse and validate a header from the front of `data`.
    ///
    /// Validates the declared size bounds and that the declared command
    /// records fit inside `total_size`. Does not require the full message to
    /// be present.
    pub fn parse(data: &[u8]) -> CodecResult<&MessageHeader> {
        if data.len() < Self::SIZE {
            return Err(CodecError::message_too_small(
                Self::SIZE,
                data.len(),
                "message header",
            ));
        }

        let header = Ref::<_, MessageHeader>::new(&data[..Self::SIZE])
            .ok_or_else(|| {
                CodecError::message_too_small(Self::SIZE, data.len(), "header byte conversion")
            })?
            .into_ref();

        let total = header.total_size as usize;
        if total < Self::SIZE || total > MAX_MESSAGE_SIZE {
            return Err(CodecError::size_out_of_range(
                total,
                Self::SIZE,
                MAX_MESSAGE_SIZE,
            ));
        }

        let need = header.command_count as usize * COMMAND_SIZE;
        let available = total - Self::SIZE;
        if need > available {
            return Err(CodecError::CommandOverrun {
                count: header.command_count as usize,
                need,
                available,
            });
        }

        Ok(header)
    }
}

/// Command tag byte
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
pub enum CommandKind {
    Compute = 1,
    Forward = 2,
    Reply = 3,
}

/// One instruction of a message's execution list
///
/// Execution order is encoding order. `Forward` and `Reply` hand every
/// remaining command to the downstream hop and end local processing, so at
/// most one of them is meaningful per hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Burn at least this much CPU time before the next command
    Compute { duration_us: u64 },
    /// Send the remaining commands to another node as a new message
    Forward {
        next_host: Ipv4Addr,
        next_port: u16,
        forwarded_size: u32,
    },
    /// Send the remaining commands back to the message's sender
    Reply { reply_size: u32 },
}

// Record layout, 16 bytes. Reply's size field deliberately occupies the same
// slot as Forward's so both tails of the record match.
//   offset 0   tag u8
//   Compute:   offset 8  duration_us u64
//   Forward:   offset 4  host octets [u8;4], offset 8 next_port u16,
//              offset 12 forwarded_size u32
//   Reply:     offset 12 reply_size u32
impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Compute { .. } => CommandKind::Compute,
            Command::Forward { .. } => CommandKind::Forward,
            Command::Reply { .. } => CommandKind::Reply,
        }
    }

    /// Decode one record. `record` must be exactly `COMMAND_SIZE` bytes;
    /// `index` is only used for error context.
    pub fn decode(record: &[u8], index: usize) -> CodecResult<Command> {
        debug_assert_eq!(record.len(), COMMAND_SIZE);
        let kind = CommandKind::try_from(record[0])
            .map_err(|_| CodecError::UnknownTag {
                tag: record[0],
                index,
            })?;

        let cmd = match kind {
            CommandKind::Compute => Command::Compute {
                duration_us: u64::from_le_bytes(record[8..16].try_into().unwrap()),
            },
            CommandKind::Forward => Command::Forward {
                next_host: Ipv4Addr::new(record[4], record[5], record[6], record[7]),
                next_port: u16::from_le_bytes(record[8..10].try_into().unwrap()),
                forwarded_size: u32::from_le_bytes(record[12..16].try_into().unwrap()),
            },
            CommandKind::Reply => Command::Reply {
                reply_size: u32::from_le_bytes(record[12..16].try_into().unwrap()),
            },
        };
        Ok(cmd)
    }

    /// Encode into a zeroed `COMMAND_SIZE`-byte record.
    pub fn encode_into(&self, record: &mut [u8]) {
        debug_assert_eq!(record.len(), COMMAND_SIZE);
        record.fill(0);
        record[0] = self.kind().into();
        match *self {
            Command::Compute { duration_us } => {
                record[8..16].copy_from_slice(&duration_us.to_le_bytes());
            }
            Command::Forward {
                next_host,
                next_port,
                forwarded_size,
            } => {
                record[4..8].copy_from_slice(&next_host.octets());
                record[8..10].copy_from_slice(&next_port.to_le_bytes());
                record[12..16].copy_from_slice(&forwarded_size.to_le_bytes());
            }
            Command::Reply { reply_size } => {
                record[12..16].copy_from_slice(&reply_size.to_le_bytes());
            }
        }
    }
}

/// A fully decoded message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub request_id: u32,
    /// Declared on-wire size, padding included
    pub total_size: u32,
    pub commands: Vec<Command>,
}

impl Message {
    /// Decode one complete frame. `frame` must hold exactly the message's
    /// `total_size` bytes; trailing padding is ignored.
    pub fn decode(frame: &[u8]) -> CodecResult<Message> {
        let header = MessageHeader::parse(frame)?;
        let total = header.total_size as usize;
        if frame.len() < total {
            return Err(CodecError::message_too_small(
                total,
                frame.len(),
                "message body",
            ));
        }

        let count = header.command_count as usize;
        let mut commands = Vec::with_capacity(count);
        for i in 0..count {
            let start = MessageHeader::SIZE + i * COMMAND_SIZE;
            commands.push(Command::decode(&frame[start..start + COMMAND_SIZE], i)?);
        }

        Ok(Message {
            request_id: header.request_id,
            total_size: header.total_size,
            commands,
        })
    }

    pub fn header(&self) -> MessageHeader {
        MessageHeader::new(self.request_id, self.total_size, self.commands.len() as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn header_layout_is_twelve_bytes() {
        assert_eq!(size_of::<MessageHeader>(), MessageHeader::SIZE);
        assert_eq!(MessageHeader::SIZE, 12);
    }

    #[test]
    fn header_rejects_out_of_range_sizes() {
        let mut bytes = [0u8; MessageHeader::SIZE];
        // total_size below header size
        bytes[4..8].copy_from_slice(&4u32.to_le_bytes());
        assert!(matches!(
            MessageHeader::parse(&bytes),
            Err(CodecError::SizeOutOfRange { declared: 4, .. })
        ));

        // total_size above the message ceiling
        bytes[4..8].copy_from_slice(&(MAX_MESSAGE_SIZE as u32 + 1).to_le_bytes());
        assert!(matches!(
            MessageHeader::parse(&bytes),
            Err(CodecError::SizeOutOfRange { .. })
        ));
    }

    #[test]
    fn header_rejects_commands_that_overrun_total_size() {
        let header = MessageHeader::new(7, (MessageHeader::SIZE + COMMAND_SIZE) as u32, 2);
        let err = MessageHeader::parse(header.as_bytes()).unwrap_err();
        assert!(matches!(err, CodecError::CommandOverrun { count: 2, .. }));
    }

    #[test]
    fn command_roundtrip_all_variants() {
        let cmds = [
            Command::Compute { duration_us: 1500 },
            Command::Forward {
                next_host: Ipv4Addr::new(10, 0, 0, 42),
                next_port: 7891,
                forwarded_size: 128,
            },
            Command::Reply { reply_size: 12 },
        ];
        for (i, cmd) in cmds.iter().enumerate() {
            let mut record = [0u8; COMMAND_SIZE];
            cmd.encode_into(&mut record);
            assert_eq!(Command::decode(&record, i).unwrap(), *cmd);
        }
    }

    #[test]
    fn reply_size_shares_the_forward_size_slot() {
        let mut fwd = [0u8; COMMAND_SIZE];
        Command::Forward {
            next_host: Ipv4Addr::LOCALHOST,
            next_port: 1,
            forwarded_size: 0xABCD,
        }
        .encode_into(&mut fwd);

        let mut rep = [0u8; COMMAND_SIZE];
        Command::Reply { reply_size: 0xABCD }.encode_into(&mut rep);

        assert_eq!(fwd[12..16], rep[12..16]);
    }

    #[test]
    fn unknown_tag_is_a_decode_error_not_a_panic() {
        let mut record = [0u8; COMMAND_SIZE];
        record[0] = 0x7F;
        assert_eq!(
            Command::decode(&record, 3),
            Err(CodecError::UnknownTag { tag: 0x7F, index: 3 })
        );
    }
}
