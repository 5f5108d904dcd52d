//! Fixed-capacity participant slot table.

use serde::{Deserialize, Serialize};

use crate::equipment::Equipment;
use crate::trackers::models::ModelDescriptor;
use crate::util::vec3::Vec3;

/// Fixed participant capacity. Slot indices are [0, SLOT_LIMIT).
pub const SLOT_LIMIT: usize = 32;

/// Wire sentinel used when a close record would otherwise carry the
/// viewer's own slot index.
pub const SELF_SENTINEL: u8 = 31;

/// Client-submitted state for one participant update.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerUpdate {
    pub position: Vec3,
    pub equipment: Equipment,
    pub model: ModelDescriptor,
}

/// One participant record. The slot index is the record's identity and
/// never changes; everything else is reset when the slot is released.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub slot: u8,
    pub connected: bool,
    pub name: String,
    pub position: Vec3,
    pub model: ModelDescriptor,
    pub equipment: Equipment,
}

impl PlayerRecord {
    pub fn empty(slot: u8) -> Self {
        Self {
            slot,
            connected: false,
            name: String::new(),
            position: Vec3::ZERO,
            model: ModelDescriptor::default(),
            equipment: Equipment::default(),
        }
    }

    /// A slot is vacant when it has no name.
    pub fn is_vacant(&self) -> bool {
        self.name.is_empty()
    }

    pub fn apply(&mut self, update: &PlayerUpdate, equipment: Equipment) {
        self.position = update.position;
        self.model = update.model.clone();
        self.equipment = equipment;
    }
}

/// The 32-entry participant table. Exclusively owned by the engine and
/// only touched under the primary gate.
#[derive(Debug)]
pub struct SlotTable {
    records: [PlayerRecord; SLOT_LIMIT],
}

impl SlotTable {
    pub fn new() -> Self {
        Self {
            records: std::array::from_fn(|i| PlayerRecord::empty(i as u8)),
        }
    }

    pub fn get(&self, slot: u8) -> &PlayerRecord {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        &self.records[slot as usize]
    }

    pub fn get_mut(&mut self, slot: u8) -> &mut PlayerRecord {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        &mut self.records[slot as usize]
    }

    /// Replace a slot with a fresh disconnected default. Full identity
    /// reset, not a flag flip.
    pub fn reset(&mut self, slot: u8) {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        self.records[slot as usize] = PlayerRecord::empty(slot);
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.records.iter()
    }

    /// First slot with no name, scanning in index order.
    pub fn first_vacant(&self) -> Option<u8> {
        self.records.iter().find(|r| r.is_vacant()).map(|r| r.slot)
    }

    /// Whether any slot below `slot` is currently connected.
    pub fn any_connected_below(&self, slot: u8) -> bool {
        self.records[..(slot as usize).min(SLOT_LIMIT)]
            .iter()
            .any(|r| r.connected)
    }
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new()
    }
}
