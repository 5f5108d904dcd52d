use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::engine::slots::SLOT_LIMIT;

/// Quest completion flags reported by one client update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestUpdate {
    pub completed: Vec<String>,
}

/// Shared quest-completion tracker. Completion is monotonic: once any
/// participant reports a flag, it is canonical and queued for everyone
/// else.
#[derive(Debug)]
pub struct QuestTracker {
    enabled: bool,
    completed: HashSet<String>,
    queues: Vec<Vec<String>>,
}

impl QuestTracker {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            completed: HashSet::new(),
            queues: vec![Vec::new(); SLOT_LIMIT],
        }
    }

    /// Merge flags from `sender`, queuing only newly seen ones.
    pub fn update(&mut self, sender: u8, update: &QuestUpdate) {
        assert!((sender as usize) < SLOT_LIMIT, "slot out of range");
        if !self.enabled {
            return;
        }

        for flag in &update.completed {
            if self.completed.insert(flag.clone()) {
                for (idx, queue) in self.queues.iter_mut().enumerate() {
                    if idx as u8 != sender {
                        queue.push(flag.clone());
                    }
                }
            }
        }
    }

    /// Bulk import of quest flags from an external source (admin tooling,
    /// save import). Queued to every slot.
    pub fn process_external(&mut self, flags: Vec<String>) {
        if !self.enabled {
            return;
        }
        for flag in flags {
            if self.completed.insert(flag.clone()) {
                for queue in self.queues.iter_mut() {
                    queue.push(flag.clone());
                }
            }
        }
    }

    pub fn fill_queue(&mut self, slot: u8) {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        let queue = &mut self.queues[slot as usize];
        queue.clear();
        if !self.enabled {
            return;
        }
        queue.extend(self.completed.iter().cloned());
    }

    pub fn drain_queue(&mut self, slot: u8) -> Vec<String> {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        std::mem::take(&mut self.queues[slot as usize])
    }

    pub fn remove_slot(&mut self, slot: u8) {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        self.queues[slot as usize].clear();
    }

    pub fn is_completed(&self, flag: &str) -> bool {
        self.completed.contains(flag)
    }
}
