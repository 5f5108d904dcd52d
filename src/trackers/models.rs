use serde::{Deserialize, Serialize};

use crate::engine::slots::SLOT_LIMIT;

/// Model/appearance descriptor submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model family id
    pub kind: u8,
    /// Named variant within the family
    pub variant: String,
    /// Opaque appearance payload (client-defined)
    #[serde(default)]
    pub custom_data: Vec<u8>,
}

/// One outbound model announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAnnouncement {
    pub slot: u8,
    pub model: ModelDescriptor,
}

/// Appearance registry with per-slot outbound announcement queues,
/// mirroring the name tracker's queue scheme.
#[derive(Debug)]
pub struct ModelTracker {
    models: [Option<ModelDescriptor>; SLOT_LIMIT],
    queues: Vec<Vec<ModelAnnouncement>>,
}

impl ModelTracker {
    pub fn new() -> Self {
        Self {
            models: std::array::from_fn(|_| None),
            queues: vec![Vec::new(); SLOT_LIMIT],
        }
    }

    pub fn add(&mut self, slot: u8, model: ModelDescriptor) {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        self.models[slot as usize] = Some(model.clone());
        for (idx, queue) in self.queues.iter_mut().enumerate() {
            if idx as u8 != slot {
                queue.push(ModelAnnouncement {
                    slot,
                    model: model.clone(),
                });
            }
        }
    }

    pub fn remove(&mut self, slot: u8) {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        self.models[slot as usize] = None;
    }

    pub fn fill_queue(&mut self, slot: u8) {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        let queue = &mut self.queues[slot as usize];
        queue.clear();
        for (idx, model) in self.models.iter().enumerate() {
            if let Some(model) = model {
                queue.push(ModelAnnouncement {
                    slot: idx as u8,
                    model: model.clone(),
                });
            }
        }
    }

    pub fn drain_queue(&mut self, slot: u8) -> Vec<ModelAnnouncement> {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        std::mem::take(&mut self.queues[slot as usize])
    }
}

impl Default for ModelTracker {
    fn default() -> Self {
        Self::new()
    }
}
