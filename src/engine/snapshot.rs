//! Per-viewer differential snapshot assembly.
//!
//! Splits the other connected participants into close (full detail) and
//! far (reduced detail) sets by Euclidean distance, consuming each
//! emitted record's dirty bit as it goes.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::engine::dirty::DirtyMatrix;
use crate::engine::slots::{SlotTable, SELF_SENTINEL, SLOT_LIMIT};
use crate::engine::swap::SwapEntry;
use crate::equipment::Equipment;
use crate::trackers::enemies::EnemyRecord;
use crate::trackers::models::{ModelAnnouncement, ModelDescriptor};
use crate::trackers::names::NameAnnouncement;
use crate::trackers::prophunt::{PropHuntSnapshot, PropHuntTracker, PHASE_LOBBY};
use crate::trackers::teleport::TeleportRequest;
use crate::util::vec3::Vec3;

/// Participants at or beyond this distance are reported in reduced
/// detail.
pub const FAR_THRESHOLD: f32 = 100.0;

/// Full-detail record for a nearby participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosePlayer {
    pub slot: u8,
    pub name: String,
    pub position: Vec3,
    pub model: ModelDescriptor,
    pub equipment: Equipment,
    /// Consumed dirty flag: the subject changed since this viewer's last
    /// poll.
    pub updated: bool,
}

/// Reduced-detail record for a distant participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarPlayer {
    pub slot: u8,
    pub position: Vec3,
    pub updated: bool,
}

/// Global world fields, not partitioned.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub time_of_day: f32,
    pub day: u32,
    pub weather: u8,
}

/// Everything one viewer receives from a poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub world: WorldSnapshot,
    pub names: Vec<NameAnnouncement>,
    pub models: Vec<ModelAnnouncement>,
    pub close_players: Vec<ClosePlayer>,
    pub far_players: Vec<FarPlayer>,
    pub enemies: Vec<EnemyRecord>,
    pub quests: Vec<String>,
    pub swap: SwapEntry,
    pub teleport: Option<TeleportRequest>,
    pub prop_hunt: PropHuntSnapshot,
}

/// Build the close/far partition for one viewer, consuming the viewer's
/// dirty bits for every emitted record.
///
/// The viewer's own record is skipped in the prop-hunt lobby phase and
/// whenever the viewer holds the hunter role; in any other prop-hunt
/// phase a non-hunter viewer sees their own record like any peer, with
/// its index rewritten to the wire sentinel.
pub fn partition_for_viewer(
    viewer: u8,
    slots: &SlotTable,
    dirty: &mut DirtyMatrix,
    prop_hunt: &PropHuntTracker,
) -> (Vec<ClosePlayer>, Vec<FarPlayer>) {
    assert!((viewer as usize) < SLOT_LIMIT, "slot out of range");

    let viewer_position = slots.get(viewer).position;
    let hide_self = prop_hunt.current_phase() == PHASE_LOBBY || prop_hunt.is_hunter(viewer);

    let candidates: SmallVec<[u8; SLOT_LIMIT]> = slots
        .iter()
        .filter(|record| record.connected)
        .filter(|record| !(record.slot == viewer && hide_self))
        .map(|record| record.slot)
        .collect();

    let mut close_players = Vec::new();
    let mut far_players = Vec::new();

    for subject in candidates {
        let record = slots.get(subject);
        let updated = dirty.take(viewer, subject);

        if record.position.distance(viewer_position) >= FAR_THRESHOLD {
            far_players.push(FarPlayer {
                slot: record.slot,
                position: record.position,
                updated,
            });
        } else {
            let slot = if record.slot == viewer {
                SELF_SENTINEL
            } else {
                record.slot
            };
            close_players.push(ClosePlayer {
                slot,
                name: record.name.clone(),
                position: record.position,
                model: record.model.clone(),
                equipment: record.equipment,
                updated,
            });
        }
    }

    (close_players, far_players)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn connected_slot(slots: &mut SlotTable, slot: u8, name: &str, position: Vec3) {
        let record = slots.get_mut(slot);
        record.name = name.to_string();
        record.connected = true;
        record.position = position;
    }

    #[test]
    fn test_threshold_boundary_is_far() {
        let mut slots = SlotTable::new();
        let mut dirty = DirtyMatrix::new();
        let prop_hunt = PropHuntTracker::new();
        connected_slot(&mut slots, 0, "a", Vec3::ZERO);
        connected_slot(&mut slots, 1, "b", Vec3::new(FAR_THRESHOLD, 0.0, 0.0));

        let (close, far) = partition_for_viewer(0, &slots, &mut dirty, &prop_hunt);
        assert!(close.is_empty());
        assert_eq!(far.len(), 1);
        assert_eq!(far[0].slot, 1);
    }

    #[test]
    fn test_close_inside_threshold() {
        let mut slots = SlotTable::new();
        let mut dirty = DirtyMatrix::new();
        let prop_hunt = PropHuntTracker::new();
        connected_slot(&mut slots, 0, "a", Vec3::ZERO);
        connected_slot(&mut slots, 1, "b", Vec3::new(50.0, 0.0, 0.0));

        let (close, far) = partition_for_viewer(0, &slots, &mut dirty, &prop_hunt);
        assert!(far.is_empty());
        assert_eq!(close.len(), 1);
        assert_eq!(close[0].slot, 1);
        assert_eq!(close[0].name, "b");
    }

    #[test]
    fn test_disconnected_slots_skipped() {
        let mut slots = SlotTable::new();
        let mut dirty = DirtyMatrix::new();
        let prop_hunt = PropHuntTracker::new();
        connected_slot(&mut slots, 0, "a", Vec3::ZERO);
        slots.get_mut(1).name = "assigned-but-offline".to_string();

        let (close, far) = partition_for_viewer(0, &slots, &mut dirty, &prop_hunt);
        assert!(close.is_empty());
        assert!(far.is_empty());
    }

    #[test]
    fn test_self_skipped_in_lobby_phase() {
        let mut slots = SlotTable::new();
        let mut dirty = DirtyMatrix::new();
        let prop_hunt = PropHuntTracker::new();
        connected_slot(&mut slots, 0, "a", Vec3::ZERO);
        dirty.mark_all_viewers(0);

        let (close, far) = partition_for_viewer(0, &slots, &mut dirty, &prop_hunt);
        assert!(close.is_empty());
        assert!(far.is_empty());
        // Skipped records do not consume their dirty bit
        assert!(dirty.peek(0, 0));
    }

    #[test]
    fn test_hider_sees_self_as_sentinel_after_lobby() {
        let mut slots = SlotTable::new();
        let mut dirty = DirtyMatrix::new();
        let mut prop_hunt = PropHuntTracker::new();
        connected_slot(&mut slots, 0, "hunter", Vec3::ZERO);
        connected_slot(&mut slots, 3, "hider", Vec3::new(10.0, 0.0, 0.0));
        prop_hunt.join(0, true);
        prop_hunt.join(3, false);
        prop_hunt.start_round(Duration::from_secs(60));

        let (close, _) = partition_for_viewer(3, &slots, &mut dirty, &prop_hunt);
        let own = close.iter().find(|p| p.name == "hider").unwrap();
        assert_eq!(own.slot, SELF_SENTINEL);
    }

    #[test]
    fn test_hunter_never_sees_self() {
        let mut slots = SlotTable::new();
        let mut dirty = DirtyMatrix::new();
        let mut prop_hunt = PropHuntTracker::new();
        connected_slot(&mut slots, 0, "hunter", Vec3::ZERO);
        prop_hunt.join(0, true);
        prop_hunt.start_round(Duration::from_secs(60));

        let (close, far) = partition_for_viewer(0, &slots, &mut dirty, &prop_hunt);
        assert!(close.is_empty());
        assert!(far.is_empty());
    }

    #[test]
    fn test_emitted_records_consume_dirty_bits() {
        let mut slots = SlotTable::new();
        let mut dirty = DirtyMatrix::new();
        let prop_hunt = PropHuntTracker::new();
        connected_slot(&mut slots, 0, "a", Vec3::ZERO);
        connected_slot(&mut slots, 1, "b", Vec3::new(10.0, 0.0, 0.0));
        connected_slot(&mut slots, 2, "c", Vec3::new(500.0, 0.0, 0.0));
        dirty.mark_all_viewers(1);
        dirty.mark_all_viewers(2);

        let (close, far) = partition_for_viewer(0, &slots, &mut dirty, &prop_hunt);
        assert!(close[0].updated);
        assert!(far[0].updated);

        // Second poll shows clean flags
        let (close, far) = partition_for_viewer(0, &slots, &mut dirty, &prop_hunt);
        assert!(!close[0].updated);
        assert!(!far[0].updated);

        // Other viewers' rows are untouched
        assert!(dirty.peek(5, 1));
    }
}
