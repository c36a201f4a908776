//! Single-slot frame mailbox between the receiver and the render loop.
//!
//! The receiver overwrites the slot on every accepted frame; the render
//! loop asks for the slot only if its sequence number moved past the
//! last one it displayed. Nothing queues: an unread frame is simply
//! replaced by a newer one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::frame::RawFrame;

// ── FrameSlot ────────────────────────────────────────────────────

/// The shared cell. `seq` counts publishes; `data` is `None` until the
/// first one.
#[derive(Debug, Default)]
struct FrameSlot {
    data: Option<RawFrame>,
    seq: u64,
}

// ── FrameChannel ─────────────────────────────────────────────────

/// Cloneable handle to the latest published frame.
///
/// Both operations hold the guard only for a field update or a 1 KiB
/// copy, so neither side can stall the other.
#[derive(Debug, Clone, Default)]
pub struct FrameChannel {
    slot: Arc<Mutex<FrameSlot>>,
}

impl FrameChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot contents and return the new sequence number.
    pub fn publish(&self, raw: RawFrame) -> u64 {
        let mut slot = self.lock();
        slot.data = Some(raw);
        slot.seq += 1;
        slot.seq
    }

    /// Copy out the current frame if it is newer than `last_seen`.
    pub fn try_take_if_newer(&self, last_seen: u64) -> Option<(RawFrame, u64)> {
        let slot = self.lock();
        if slot.seq <= last_seen {
            return None;
        }
        slot.data.clone().map(|raw| (raw, slot.seq))
    }

    /// Number of frames published so far.
    pub fn seq(&self) -> u64 {
        self.lock().seq
    }

    // The slot is updated field by field with no await or fallible step
    // in between, so a poisoned guard still holds a consistent value.
    fn lock(&self) -> MutexGuard<'_, FrameSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ────────────────────────────────────────────────────────
