use serde::{Deserialize, Serialize};

use crate::engine::slots::SLOT_LIMIT;
use crate::util::vec3::Vec3;

/// A pending teleport for one slot, consumed on the next poll.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeleportRequest {
    pub destination: Vec3,
}

/// One pending teleport request per slot. A newer request replaces an
/// unconsumed one.
#[derive(Debug)]
pub struct TeleportTracker {
    pending: [Option<TeleportRequest>; SLOT_LIMIT],
}

impl TeleportTracker {
    pub fn new() -> Self {
        Self {
            pending: [None; SLOT_LIMIT],
        }
    }

    pub fn request(&mut self, slot: u8, destination: Vec3) {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        self.pending[slot as usize] = Some(TeleportRequest { destination });
    }

    pub fn take_request(&mut self, slot: u8) -> Option<TeleportRequest> {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        self.pending[slot as usize].take()
    }

    pub fn remove_slot(&mut self, slot: u8) {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        self.pending[slot as usize] = None;
    }
}

impl Default for TeleportTracker {
    fn default() -> Self {
        Self::new()
    }
}
