//! # Hopbench Wire Protocol
//!
//! ## Purpose
//!
//! The shared binary protocol between the traffic-generating client and the
//! chain nodes: a fixed 12-byte header followed by fixed-size command records,
//! self-delimited by the header's `total_size` field. This crate owns the
//! encoding/decoding rules and the incremental stream reframer; it knows
//! nothing about sockets, scheduling or execution.
//!
//! ## Architecture Role
//!
//! ```text
//! client ──► [codec: build]  ──► TCP ──► [codec: reframe] ──► node engine
//!    ▲                                                            │
//!    └──────────── [codec: reframe] ◄── TCP ◄── [codec: build] ◄──┘
//! ```
//!
//! ## What This Crate Does NOT Contain
//! - Socket management or connection handling (node reactor / client threads)
//! - Command execution semantics (node engine)

pub mod builder;
pub mod error;
pub mod message;
pub mod reframe;

pub use builder::{encode_tail, MessageBuilder};
pub use error::{CodecError, CodecResult};
pub use message::{
    Command, CommandKind, Message, MessageHeader, COMMAND_SIZE, MAX_COMMANDS, MAX_MESSAGE_SIZE,
};
pub use reframe::StreamReframer;
