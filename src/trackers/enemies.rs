use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::engine::slots::SLOT_LIMIT;

/// One enemy health observation, keyed by the enemy's stable world id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyRecord {
    pub id: String,
    pub health: f32,
}

/// Batch of enemy observations from one client update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnemyUpdate {
    pub records: Vec<EnemyRecord>,
}

/// Shared enemy-health tracker. Merges client observations into one
/// canonical map and queues the changes for every other slot.
#[derive(Debug)]
pub struct EnemyTracker {
    enabled: bool,
    health: HashMap<String, f32>,
    queues: Vec<Vec<EnemyRecord>>,
}

impl EnemyTracker {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            health: HashMap::new(),
            queues: vec![Vec::new(); SLOT_LIMIT],
        }
    }

    /// Merge an update from `sender` and enqueue it for everyone else.
    /// A no-op when enemy sync is disabled for the session.
    pub fn update(&mut self, sender: u8, update: &EnemyUpdate) {
        assert!((sender as usize) < SLOT_LIMIT, "slot out of range");
        if !self.enabled {
            return;
        }

        for record in &update.records {
            self.health.insert(record.id.clone(), record.health);
            for (idx, queue) in self.queues.iter_mut().enumerate() {
                if idx as u8 != sender {
                    queue.push(record.clone());
                }
            }
        }
    }

    /// Seed a newly admitted slot's queue with the full known map.
    pub fn fill_queue(&mut self, slot: u8) {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        let queue = &mut self.queues[slot as usize];
        queue.clear();
        if !self.enabled {
            return;
        }
        for (id, health) in &self.health {
            queue.push(EnemyRecord {
                id: id.clone(),
                health: *health,
            });
        }
    }

    pub fn drain_queue(&mut self, slot: u8) -> Vec<EnemyRecord> {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        std::mem::take(&mut self.queues[slot as usize])
    }

    pub fn remove_slot(&mut self, slot: u8) {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        self.queues[slot as usize].clear();
    }
}
