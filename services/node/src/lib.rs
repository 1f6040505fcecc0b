//! # Hopbench Chain Node
//!
//! One hop of an emulated service chain. The node accepts connections, turns
//! each byte stream into protocol messages, and executes every message's
//! command list: burn CPU for a requested duration, forward the remaining
//! commands to another node, or reply to the sender.
//!
//! Everything runs on a single reactor thread; the only blocking operation
//! is the deliberate compute busy-wait. Receive buffers and outbound
//! connections come from bounded pools whose exhaustion refuses new work
//! without disturbing work already admitted.

pub mod buffers;
pub mod config;
pub mod engine;
pub mod error;
pub mod reactor;
pub mod registry;

pub use config::NodeConfig;
pub use error::{NodeError, NodeResult};
pub use reactor::Reactor;
