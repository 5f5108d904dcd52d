use serde::{Deserialize, Serialize};

use crate::engine::slots::SLOT_LIMIT;

/// One outbound name announcement. An empty name means the slot was
/// vacated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameAnnouncement {
    pub slot: u8,
    pub name: String,
}

/// Display-name registry with per-slot outbound announcement queues.
#[derive(Debug)]
pub struct NameTracker {
    names: [Option<String>; SLOT_LIMIT],
    queues: Vec<Vec<NameAnnouncement>>,
}

impl NameTracker {
    pub fn new() -> Self {
        Self {
            names: std::array::from_fn(|_| None),
            queues: vec![Vec::new(); SLOT_LIMIT],
        }
    }

    /// Register a name and announce it to every other slot.
    pub fn add(&mut self, slot: u8, name: String) {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        self.names[slot as usize] = Some(name.clone());
        self.announce_to_others(slot, name);
    }

    /// Drop a slot's name and announce the vacancy.
    pub fn remove(&mut self, slot: u8) {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        self.names[slot as usize] = None;
        self.announce_to_others(slot, String::new());
    }

    /// Seed a newly admitted slot's queue with every currently-known name.
    pub fn fill_queue(&mut self, slot: u8) {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        let queue = &mut self.queues[slot as usize];
        queue.clear();
        for (idx, name) in self.names.iter().enumerate() {
            if let Some(name) = name {
                queue.push(NameAnnouncement {
                    slot: idx as u8,
                    name: name.clone(),
                });
            }
        }
    }

    /// Take everything queued for a slot.
    pub fn drain_queue(&mut self, slot: u8) -> Vec<NameAnnouncement> {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        std::mem::take(&mut self.queues[slot as usize])
    }

    /// All currently registered (slot, name) pairs.
    pub fn all_players(&self) -> Vec<NameAnnouncement> {
        self.names
            .iter()
            .enumerate()
            .filter_map(|(idx, name)| {
                name.as_ref().map(|name| NameAnnouncement {
                    slot: idx as u8,
                    name: name.clone(),
                })
            })
            .collect()
    }

    fn announce_to_others(&mut self, slot: u8, name: String) {
        for (idx, queue) in self.queues.iter_mut().enumerate() {
            if idx as u8 != slot {
                queue.push(NameAnnouncement { slot, name: name.clone() });
            }
        }
    }
}

impl Default for NameTracker {
    fn default() -> Self {
        Self::new()
    }
}
