//! Per-(viewer, subject) change tracking.
//!
//! A committed player update dirties the subject's column in every
//! viewer's row, deliberately including viewers that cannot currently
//! see the subject: a participant that later comes into view still shows
//! as updated on the viewer's next poll. Bits are consumed (read and
//! cleared) when a viewer's snapshot emits the subject.

use bitvec::prelude::*;

use crate::engine::slots::SLOT_LIMIT;

type Row = BitArr!(for SLOT_LIMIT, in u32);

/// 32x32 dirty-bit grid, one row per viewer.
#[derive(Debug, Clone)]
pub struct DirtyMatrix {
    rows: [Row; SLOT_LIMIT],
}

impl DirtyMatrix {
    pub fn new() -> Self {
        Self {
            rows: [BitArray::ZERO; SLOT_LIMIT],
        }
    }

    /// Mark `subject` changed for every viewer row, the sender's own row
    /// included.
    pub fn mark_all_viewers(&mut self, subject: u8) {
        assert!((subject as usize) < SLOT_LIMIT, "slot out of range");
        for row in self.rows.iter_mut() {
            row.set(subject as usize, true);
        }
    }

    /// Consume the flag for one (viewer, subject) pair: return it and
    /// clear it.
    pub fn take(&mut self, viewer: u8, subject: u8) -> bool {
        assert!((viewer as usize) < SLOT_LIMIT, "slot out of range");
        assert!((subject as usize) < SLOT_LIMIT, "slot out of range");
        let row = &mut self.rows[viewer as usize];
        let flag = row[subject as usize];
        row.set(subject as usize, false);
        flag
    }

    /// Non-consuming read, for tests and diagnostics.
    pub fn peek(&self, viewer: u8, subject: u8) -> bool {
        assert!((viewer as usize) < SLOT_LIMIT, "slot out of range");
        assert!((subject as usize) < SLOT_LIMIT, "slot out of range");
        self.rows[viewer as usize][subject as usize]
    }
}

impl Default for DirtyMatrix {
    fn default() -> Self {
        Self::new()
    }
}
