//! Protocol-level errors for message encoding, decoding and reframing
//!
//! Each variant carries enough context to tell a truncated read apart from a
//! peer speaking a different protocol. A reframing error is fatal to the
//! connection that produced it, never to the process.

use thiserror::Error;

/// Wire protocol errors with diagnostic context
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Buffer is too small to contain the expected structure
    #[error("message too small: need {need} bytes, got {got} (context: {context})")]
    MessageTooSmall {
        need: usize,
        got: usize,
        context: &'static str,
    },

    /// Declared message size is outside the protocol bounds
    #[error("declared size {declared} out of range: valid sizes are {min}..={max}")]
    SizeOutOfRange {
        declared: usize,
        min: usize,
        max: usize,
    },

    /// Command records do not fit inside the declared message size
    #[error(
        "command records overrun message: {count} commands need {need} bytes, \
         message payload holds {available}"
    )]
    CommandOverrun {
        count: usize,
        need: usize,
        available: usize,
    },

    /// Tag byte read off the wire is not a known command
    #[error("unknown command tag {tag:#04x} at command index {index}")]
    UnknownTag { tag: u8, index: usize },

    /// Too many commands for one message
    #[error("too many commands: {count} exceeds limit {max}")]
    TooManyCommands { count: usize, max: usize },
}

impl CodecError {
    pub fn message_too_small(need: usize, got: usize, context: &'static str) -> Self {
        Self::MessageTooSmall { need, got, context }
    }

    pub fn size_out_of_range(declared: usize, min: usize, max: usize) -> Self {
        Self::SizeOutOfRange { declared, min, max }
    }
}

/// Result type for protocol operations
pub type CodecResult<T> = std::result::Result<T, CodecError>;
