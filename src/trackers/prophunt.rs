use std::time::{Duration, Instant};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::engine::slots::SLOT_LIMIT;

/// Prop hunt round phases
pub const PHASE_LOBBY: u8 = 0;
pub const PHASE_HIDING: u8 = 1;
pub const PHASE_HUNTING: u8 = 2;
pub const PHASE_ENDED: u8 = 3;

/// Per-participant prop hunt role state
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PropHuntRole {
    pub hunter: bool,
    pub found: bool,
}

/// Per-viewer prop hunt snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropHuntSnapshot {
    pub phase: u8,
    pub viewer_is_hunter: bool,
    pub hunters: Vec<u8>,
    pub found: Vec<u8>,
}

/// Prop hunt round tracker.
///
/// The lobby phase (0) never auto-advances; a round is started explicitly.
/// The hiding phase ends when its countdown expires; the hunting phase
/// ends when every hider is found or one side has no participants left.
/// Status recompute is viewer-triggered from the poll path, not run on a
/// timer.
#[derive(Debug)]
pub struct PropHuntTracker {
    players: HashMap<u8, PropHuntRole>,
    phase: u8,
    hiding_deadline: Option<Instant>,
}

impl PropHuntTracker {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
            phase: PHASE_LOBBY,
            hiding_deadline: None,
        }
    }

    pub fn current_phase(&self) -> u8 {
        self.phase
    }

    pub fn join(&mut self, slot: u8, hunter: bool) {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        self.players.insert(
            slot,
            PropHuntRole {
                hunter,
                found: false,
            },
        );
    }

    /// Whether the slot currently holds the hunter role. Unknown slots
    /// are not hunters.
    pub fn is_hunter(&self, slot: u8) -> bool {
        self.players.get(&slot).map(|p| p.hunter).unwrap_or(false)
    }

    /// Begin a round: everyone unfound, hiding countdown armed.
    pub fn start_round(&mut self, hide_duration: Duration) {
        for role in self.players.values_mut() {
            role.found = false;
        }
        self.phase = PHASE_HIDING;
        self.hiding_deadline = Some(Instant::now() + hide_duration);
    }

    /// Mark a hider as found by the hunters.
    pub fn mark_found(&mut self, slot: u8) {
        if let Some(role) = self.players.get_mut(&slot) {
            if !role.hunter {
                role.found = true;
            }
        }
    }

    /// Advance the round state machine from current facts.
    pub fn recompute_status(&mut self) {
        match self.phase {
            PHASE_HIDING => {
                let expired = self
                    .hiding_deadline
                    .map(|deadline| Instant::now() >= deadline)
                    .unwrap_or(true);
                if expired {
                    self.phase = PHASE_HUNTING;
                    self.hiding_deadline = None;
                }
            }
            PHASE_HUNTING => {
                let hunters = self.players.values().filter(|p| p.hunter).count();
                let hiders_left = self
                    .players
                    .values()
                    .filter(|p| !p.hunter && !p.found)
                    .count();
                if hunters == 0 || hiders_left == 0 {
                    self.phase = PHASE_ENDED;
                }
            }
            _ => {}
        }
    }

    pub fn remove_slot(&mut self, slot: u8) {
        self.players.remove(&slot);
    }

    pub fn snapshot_for(&self, viewer: u8) -> PropHuntSnapshot {
        let mut hunters: Vec<u8> = self
            .players
            .iter()
            .filter(|(_, role)| role.hunter)
            .map(|(slot, _)| *slot)
            .collect();
        hunters.sort_unstable();

        let mut found: Vec<u8> = self
            .players
            .iter()
            .filter(|(_, role)| !role.hunter && role.found)
            .map(|(slot, _)| *slot)
            .collect();
        found.sort_unstable();

        PropHuntSnapshot {
            phase: self.phase,
            viewer_is_hunter: self.is_hunter(viewer),
            hunters,
            found,
        }
    }
}

impl Default for PropHuntTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lobby_never_auto_advances() {
        let mut tracker = PropHuntTracker::new();
        tracker.join(0, true);
        tracker.join(1, false);
        tracker.recompute_status();
        assert_eq!(tracker.current_phase(), PHASE_LOBBY);
    }

    #[test]
    fn test_hiding_expires_into_hunting() {
        let mut tracker = PropHuntTracker::new();
        tracker.join(0, true);
        tracker.join(1, false);
        tracker.start_round(Duration::ZERO);
        assert_eq!(tracker.current_phase(), PHASE_HIDING);

        tracker.recompute_status();
        assert_eq!(tracker.current_phase(), PHASE_HUNTING);
    }

    #[test]
    fn test_round_ends_when_all_hiders_found() {
        let mut tracker = PropHuntTracker::new();
        tracker.join(0, true);
        tracker.join(1, false);
        tracker.join(2, false);
        tracker.start_round(Duration::ZERO);
        tracker.recompute_status();

        tracker.mark_found(1);
        tracker.recompute_status();
        assert_eq!(tracker.current_phase(), PHASE_HUNTING);

        tracker.mark_found(2);
        tracker.recompute_status();
        assert_eq!(tracker.current_phase(), PHASE_ENDED);
    }

    #[test]
    fn test_round_ends_when_hunters_leave() {
        let mut tracker = PropHuntTracker::new();
        tracker.join(0, true);
        tracker.join(1, false);
        tracker.start_round(Duration::ZERO);
        tracker.recompute_status();

        tracker.remove_slot(0);
        tracker.recompute_status();
        assert_eq!(tracker.current_phase(), PHASE_ENDED);
    }

    #[test]
    fn test_snapshot_roles() {
        let mut tracker = PropHuntTracker::new();
        tracker.join(0, true);
        tracker.join(1, false);
        tracker.start_round(Duration::from_secs(60));
        tracker.mark_found(1);

        let snapshot = tracker.snapshot_for(0);
        assert!(snapshot.viewer_is_hunter);
        assert_eq!(snapshot.hunters, vec![0]);
        assert_eq!(snapshot.found, vec![1]);

        let snapshot = tracker.snapshot_for(1);
        assert!(!snapshot.viewer_is_hunter);
    }

    #[test]
    fn test_unknown_slot_is_not_hunter() {
        let tracker = PropHuntTracker::new();
        assert!(!tracker.is_hunter(9));
    }
}
