//! Two-party position-swap phase machine.
//!
//! Driven opportunistically off slot 0's update cycle when the session
//! runs in swap mode. The timer owns the trigger condition; the queue
//! holds the per-viewer phase each participant consumes on poll.

use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::engine::slots::SLOT_LIMIT;
use crate::util::vec3::Vec3;

/// Machine not running.
pub const SWAP_IDLE: u8 = 0;
/// Both parties alive, counting toward a trigger.
pub const SWAP_PENDING: u8 = 1;
/// A swap has been committed; sticky until the viewer clears it.
pub const SWAP_TRIGGERED: u8 = 2;

/// One slot's view of the swap machine. The position is meaningful only
/// in the triggered phase.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SwapEntry {
    pub phase: u8,
    pub position: Vec3,
}

/// Per-slot swap queue with sticky triggered entries.
#[derive(Debug)]
pub struct SwapQueue {
    entries: [SwapEntry; SLOT_LIMIT],
}

impl SwapQueue {
    pub fn new() -> Self {
        Self {
            entries: [SwapEntry::default(); SLOT_LIMIT],
        }
    }

    /// Broadcast a newly computed phase to every entry except those
    /// already triggered; triggered entries stay until consumer-cleared.
    pub fn broadcast_phase(&mut self, phase: u8) {
        for entry in self.entries.iter_mut() {
            if entry.phase != SWAP_TRIGGERED {
                entry.phase = phase;
            }
        }
    }

    pub fn set_position(&mut self, slot: u8, position: Vec3) {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        self.entries[slot as usize].position = position;
    }

    pub fn entry(&self, slot: u8) -> SwapEntry {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        self.entries[slot as usize]
    }

    /// Reset one viewer's entry to idle. Invoked by that viewer's own
    /// consume path, never by the broadcast.
    pub fn clear(&mut self, slot: u8) {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        self.entries[slot as usize].phase = SWAP_IDLE;
    }
}

impl Default for SwapQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Countdown that owns the swap trigger condition. Re-arms with a
/// uniformly jittered interval after each trigger or reset.
#[derive(Debug)]
pub struct SwapTimer {
    enabled: bool,
    running: bool,
    min_interval: Duration,
    max_interval: Duration,
    deadline: Instant,
}

impl SwapTimer {
    pub fn new(enabled: bool, min_interval: Duration, max_interval: Duration) -> Self {
        debug_assert!(min_interval <= max_interval);
        Self {
            enabled,
            running: false,
            min_interval,
            max_interval,
            deadline: Instant::now(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Compute the next phase. The first advance after a reset arms the
    /// countdown; an expired countdown triggers and re-arms.
    pub fn advance(&mut self) -> u8 {
        if !self.running {
            self.running = true;
            self.rearm();
            return SWAP_PENDING;
        }

        if Instant::now() >= self.deadline {
            self.rearm();
            SWAP_TRIGGERED
        } else {
            SWAP_PENDING
        }
    }

    /// Force the machine non-running and reset the countdown; it must
    /// re-arm before it can trigger again.
    pub fn stop(&mut self) {
        self.running = false;
        self.rearm();
    }

    fn rearm(&mut self) {
        let interval = if self.max_interval > self.min_interval {
            rand::thread_rng().gen_range(self.min_interval..=self.max_interval)
        } else {
            self.min_interval
        };
        self.deadline = Instant::now() + interval;
    }
}
