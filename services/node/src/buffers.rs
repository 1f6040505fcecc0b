//! Receive-buffer pool
//!
//! A fixed arena of reusable buffers, one per live inbound connection. The
//! pool bounds how many connections the node will serve at once: when every
//! slot is out, new connections are accepted and immediately closed instead
//! of being registered (admission control, not an error).
//!
//! `acquire` moves the buffer out of its slot so the connection task owns it
//! exclusively while reading; `release` hands it back, cleared, under the
//! same stable handle.

use bytes::BytesMut;

/// Stable index of a pool slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferHandle(usize);

impl BufferHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug)]
pub struct BufferPool {
    // None = buffer is out on loan
    slots: Vec<Option<BytesMut>>,
}

impl BufferPool {
    pub fn new(count: usize, buffer_capacity: usize) -> Self {
        Self {
            slots: (0..count)
                .map(|_| Some(BytesMut::with_capacity(buffer_capacity)))
                .collect(),
        }
    }

    /// Take a free buffer, or `None` when the pool is exhausted.
    pub fn acquire(&mut self) -> Option<(BufferHandle, BytesMut)> {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(buf) = slot.take() {
                return Some((BufferHandle(index), buf));
            }
        }
        None
    }

    /// Return a buffer to its slot for reuse.
    pub fn release(&mut self, handle: BufferHandle, mut buf: BytesMut) {
        debug_assert!(self.slots[handle.0].is_none(), "double release of buffer slot");
        buf.clear();
        self.slots[handle.0] = Some(buf);
    }

    pub fn available(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
