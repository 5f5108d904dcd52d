//! State synchronization engine.
//!
//! Owns the canonical session state behind two disjoint bounded-wait
//! locks: the primary gate covers the slot table, the dirty matrix and
//! the collaborator trackers; the swap gate covers only the swap queue,
//! so swap polling by one participant never blocks ordinary updates from
//! another. No code path holds both gates at once: the player-update and
//! poll paths are two sequential scoped critical sections.

pub mod dirty;
pub mod gate;
pub mod slots;
pub mod snapshot;
pub mod swap;

use serde::{Deserialize, Serialize};

use crate::config::{GameMode, ServerConfig, SessionSettings};
use crate::engine::dirty::DirtyMatrix;
use crate::engine::gate::{GateTimeout, SyncGate};
use crate::engine::slots::{PlayerRecord, PlayerUpdate, SlotTable, SLOT_LIMIT};
use crate::engine::snapshot::{Snapshot, WorldSnapshot};
use crate::engine::swap::{SwapQueue, SwapTimer, SWAP_TRIGGERED};
use crate::equipment::EquipmentMap;
use crate::trackers::enemies::{EnemyTracker, EnemyUpdate};
use crate::trackers::models::{ModelDescriptor, ModelTracker};
use crate::trackers::names::{NameAnnouncement, NameTracker};
use crate::trackers::prophunt::{PropHuntTracker, PHASE_LOBBY};
use crate::trackers::quests::{QuestTracker, QuestUpdate};
use crate::trackers::teleport::TeleportTracker;
use crate::trackers::world::{WorldState, WorldUpdate};
use crate::util::vec3::Vec3;

/// Engine operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// A bounded-wait lock acquisition timed out. The operation did not
    /// run; the caller retries or drops the cycle.
    #[error("shared state busy, retry")]
    Busy,
}

impl From<GateTimeout> for EngineError {
    fn from(_: GateTimeout) -> Self {
        EngineError::Busy
    }
}

/// Where an update originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateSource {
    /// The server itself. Server-originated world updates never touch
    /// weather.
    Server,
    /// A connected participant slot.
    Slot(u8),
}

/// Connection request submitted by a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectRequest {
    pub name: String,
    pub model: ModelDescriptor,
    pub password: String,
}

/// Outcome of an admission attempt.
#[derive(Debug, Clone)]
pub enum Admission {
    Accepted { slot: u8, settings: SessionSettings },
    Full,
    BadCredential,
}

/// State owned by the primary gate.
pub(crate) struct SharedState {
    slots: SlotTable,
    dirty: DirtyMatrix,
    world: WorldState,
    names: NameTracker,
    models: ModelTracker,
    enemies: EnemyTracker,
    quests: QuestTracker,
    teleport: TeleportTracker,
    prop_hunt: PropHuntTracker,
}

/// State owned by the swap gate.
pub(crate) struct SwapState {
    queue: SwapQueue,
    timer: SwapTimer,
}

/// The authoritative session engine. One owned instance per session;
/// handlers share it behind an `Arc`.
pub struct SyncEngine {
    password: String,
    settings: SessionSettings,
    equipment_map: EquipmentMap,
    pub(crate) state: SyncGate<SharedState>,
    pub(crate) swap: SyncGate<SwapState>,
}

impl SyncEngine {
    pub fn new(config: &ServerConfig, equipment_map: EquipmentMap) -> Self {
        let settings = config.settings.clone();
        let (swap_min, swap_max) = settings.swap_interval_range();

        Self {
            password: config.password.clone(),
            settings: settings.clone(),
            equipment_map,
            state: SyncGate::new(SharedState {
                slots: SlotTable::new(),
                dirty: DirtyMatrix::new(),
                world: WorldState::new(settings.forced_weather),
                names: NameTracker::new(),
                models: ModelTracker::new(),
                enemies: EnemyTracker::new(settings.enemy_sync),
                quests: QuestTracker::new(settings.quest_sync),
                teleport: TeleportTracker::new(),
                prop_hunt: PropHuntTracker::new(),
            }),
            swap: SyncGate::new(SwapState {
                queue: SwapQueue::new(),
                timer: SwapTimer::new(settings.game_mode == GameMode::Swap, swap_min, swap_max),
            }),
        }
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    // ------------------------------------------------------------------
    // Slot lifecycle
    // ------------------------------------------------------------------

    /// Admit a new participant: credential gate first (no locking, no
    /// state change on rejection), then first-free-slot assignment and
    /// collaborator queue seeding.
    pub fn admit(&self, request: &ConnectRequest) -> Result<Admission, EngineError> {
        if !self.password.is_empty() && self.password != request.password {
            return Ok(Admission::BadCredential);
        }

        let mut state = self.state.lock()?;

        let Some(slot) = state.slots.first_vacant() else {
            return Ok(Admission::Full);
        };

        let record = state.slots.get_mut(slot);
        record.name = request.name.clone();
        record.model = request.model.clone();

        state.names.add(slot, request.name.clone());
        state.models.add(slot, request.model.clone());
        state.names.fill_queue(slot);
        state.models.fill_queue(slot);
        state.enemies.fill_queue(slot);
        state.quests.fill_queue(slot);

        if self.settings.game_mode == GameMode::PropHunt {
            state.prop_hunt.join(slot, false);
        }

        tracing::info!("Admitted '{}' to slot {}", request.name, slot);
        Ok(Admission::Accepted {
            slot,
            settings: self.settings.clone(),
        })
    }

    /// Flip the connection flag, or tear the slot down entirely.
    ///
    /// `connected = true` only flips the flag, resuming an assigned
    /// identity after a transient reconnect. `connected = false` is a
    /// full release: the record is replaced with a fresh disconnected
    /// default and every collaborator drops the slot.
    pub fn set_connected(&self, slot: u8, connected: bool) -> Result<(), EngineError> {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        let mut state = self.state.lock()?;

        if connected {
            state.slots.get_mut(slot).connected = true;
            return Ok(());
        }

        state.slots.reset(slot);
        state.names.remove(slot);
        state.models.remove(slot);
        state.enemies.remove_slot(slot);
        state.quests.remove_slot(slot);
        state.teleport.remove_slot(slot);
        state.prop_hunt.remove_slot(slot);
        state.prop_hunt.recompute_status();

        tracing::info!("Released slot {}", slot);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Update pipeline
    // ------------------------------------------------------------------

    /// Commit a world-clock observation. Time fields always apply; the
    /// weather field applies only when the sender is a client slot, the
    /// world is not in forced-weather mode, and no lower-indexed slot is
    /// currently connected (weather authority, recomputed fresh on every
    /// call).
    pub fn update_world(
        &self,
        source: UpdateSource,
        update: &WorldUpdate,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock()?;

        state.world.apply_time(update);

        let UpdateSource::Slot(sender) = source else {
            return Ok(());
        };
        assert!((sender as usize) < SLOT_LIMIT, "slot out of range");

        if state.world.is_forced_weather() {
            return Ok(());
        }
        if state.slots.any_connected_below(sender) {
            return Ok(());
        }

        state.world.apply_weather(update);
        Ok(())
    }

    /// Commit a participant's own state. Equipment ids are remapped
    /// before the critical section; the commit marks the sender dirty in
    /// every viewer's row. When the sender is slot 0 and the session is
    /// in swap mode, the swap machine advances in a second critical
    /// section under its own gate — the primary gate is released first.
    pub fn update_player(&self, slot: u8, update: &PlayerUpdate) -> Result<(), EngineError> {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");

        let equipment = self.equipment_map.remap(update.equipment);

        let swap_inputs = {
            let mut state = self.state.lock()?;
            state.slots.get_mut(slot).apply(update, equipment);
            state.dirty.mark_all_viewers(slot);

            if slot == 0 && self.settings.game_mode == GameMode::Swap {
                Some((
                    state.slots.get(1).connected,
                    state.slots.get(0).position,
                    state.slots.get(1).position,
                ))
            } else {
                None
            }
        };

        if let Some((party_connected, position_0, position_1)) = swap_inputs {
            let mut swap = self.swap.lock()?;
            if swap.timer.is_enabled() && party_connected {
                let phase = swap.timer.advance();
                swap.queue.broadcast_phase(phase);
                if phase == SWAP_TRIGGERED {
                    swap.queue.set_position(0, position_1);
                    swap.queue.set_position(1, position_0);
                    tracing::debug!("Swap triggered, positions exchanged");
                }
            } else {
                swap.timer.stop();
            }
        }

        Ok(())
    }

    pub fn update_enemies(&self, slot: u8, update: &EnemyUpdate) -> Result<(), EngineError> {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        let mut state = self.state.lock()?;
        state.enemies.update(slot, update);
        Ok(())
    }

    pub fn update_quests(&self, slot: u8, update: &QuestUpdate) -> Result<(), EngineError> {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        let mut state = self.state.lock()?;
        state.quests.update(slot, update);
        Ok(())
    }

    /// Bulk quest import from outside the client population.
    pub fn process_external_quests(&self, flags: Vec<String>) -> Result<(), EngineError> {
        let mut state = self.state.lock()?;
        state.quests.process_external(flags);
        Ok(())
    }

    pub fn request_teleport(&self, slot: u8, destination: Vec3) -> Result<(), EngineError> {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        let mut state = self.state.lock()?;
        state.teleport.request(slot, destination);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Prop hunt surface
    // ------------------------------------------------------------------

    pub fn set_prop_role(&self, slot: u8, hunter: bool) -> Result<(), EngineError> {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        let mut state = self.state.lock()?;
        state.prop_hunt.join(slot, hunter);
        Ok(())
    }

    pub fn start_prop_round(&self, hide_duration: std::time::Duration) -> Result<(), EngineError> {
        let mut state = self.state.lock()?;
        state.prop_hunt.start_round(hide_duration);
        Ok(())
    }

    pub fn mark_prop_found(&self, slot: u8) -> Result<(), EngineError> {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        let mut state = self.state.lock()?;
        state.prop_hunt.mark_found(slot);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Poll path
    // ------------------------------------------------------------------

    /// Assemble the viewer's differential snapshot. Consumes the
    /// viewer's dirty bits for every emitted record.
    ///
    /// The swap entry is copied out first, in its own critical section:
    /// that read destroys nothing, so a timed-out gate on either side
    /// leaves the viewer's dirty bits, queues and pending teleport
    /// intact for the retry.
    pub fn snapshot_for(&self, viewer: u8) -> Result<Snapshot, EngineError> {
        assert!((viewer as usize) < SLOT_LIMIT, "slot out of range");

        let swap = self.swap.lock()?.queue.entry(viewer);

        let mut state = self.state.lock()?;

        if state.prop_hunt.current_phase() != PHASE_LOBBY {
            state.prop_hunt.recompute_status();
        }

        let (close_players, far_players) = {
            let SharedState {
                slots,
                dirty,
                prop_hunt,
                ..
            } = &mut *state;
            snapshot::partition_for_viewer(viewer, slots, dirty, prop_hunt)
        };

        Ok(Snapshot {
            world: WorldSnapshot {
                time_of_day: state.world.time_of_day(),
                day: state.world.day(),
                weather: state.world.weather(),
            },
            names: state.names.drain_queue(viewer),
            models: state.models.drain_queue(viewer),
            close_players,
            far_players,
            enemies: state.enemies.drain_queue(viewer),
            quests: state.quests.drain_queue(viewer),
            swap,
            teleport: state.teleport.take_request(viewer),
            prop_hunt: state.prop_hunt.snapshot_for(viewer),
        })
    }

    /// Reset the viewer's own swap phase to idle, releasing a sticky
    /// triggered entry.
    pub fn clear_swap_phase(&self, slot: u8) -> Result<(), EngineError> {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        let mut swap = self.swap.lock()?;
        swap.queue.clear(slot);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn player(&self, slot: u8) -> Result<PlayerRecord, EngineError> {
        assert!((slot as usize) < SLOT_LIMIT, "slot out of range");
        let state = self.state.lock()?;
        Ok(state.slots.get(slot).clone())
    }

    pub fn participants(&self) -> Result<Vec<NameAnnouncement>, EngineError> {
        let state = self.state.lock()?;
        Ok(state.names.all_players())
    }
}
