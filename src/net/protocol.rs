use serde::{Deserialize, Serialize};

use crate::config::SessionSettings;
use crate::engine::slots::PlayerUpdate;
use crate::engine::snapshot::Snapshot;
use crate::engine::ConnectRequest;
use crate::trackers::enemies::EnemyUpdate;
use crate::trackers::names::NameAnnouncement;
use crate::trackers::quests::QuestUpdate;
use crate::trackers::world::WorldUpdate;
use crate::util::vec3::Vec3;

/// Messages from client to server. Bodies are JSON inside length-prefixed
/// frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Request admission to the session
    Connect(ConnectRequest),
    /// World clock / weather observation
    World(WorldUpdate),
    /// Own state push
    Player(PlayerUpdate),
    /// Enemy health observations
    Enemies(EnemyUpdate),
    /// Quest completion flags
    Quests(QuestUpdate),
    /// Ask the server to teleport another participant
    Teleport { target_slot: u8, destination: Vec3 },
    /// Bulk quest import, e.g. from a save-file sync; flags are queued
    /// to every participant, the sender included
    QuestImport { completed: Vec<String> },
    /// Ask for the current participant roster
    Roster,
    /// Pull this viewer's snapshot
    Poll,
    /// Release a consumed swap trigger
    ClearSwap,
    /// Orderly goodbye
    Disconnect,
}

/// Messages from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Admission granted
    Connected {
        slot: u8,
        settings: SessionSettings,
        description: String,
    },
    /// Admission denied
    Rejected { reason: RejectReason },
    /// Per-viewer differential snapshot
    Snapshot(Box<Snapshot>),
    /// Participant roster
    Roster { players: Vec<NameAnnouncement> },
    /// Shared state was busy; retry the request
    Busy,
    /// Update acknowledged
    Ack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    BadCredential,
    SessionFull,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_round_trip() {
        let msg = ClientMessage::Teleport {
            target_slot: 4,
            destination: Vec3::new(1.0, 2.0, 3.0),
        };
        let bytes = serde_json::to_vec(&msg).unwrap();
        let back: ClientMessage = serde_json::from_slice(&bytes).unwrap();
        assert!(matches!(
            back,
            ClientMessage::Teleport { target_slot: 4, .. }
        ));
    }

    #[test]
    fn test_reject_reason_serializes_as_tag() {
        let msg = ServerMessage::Rejected {
            reason: RejectReason::SessionFull,
        };
        let text = serde_json::to_string(&msg).unwrap();
        assert!(text.contains("SessionFull"));
    }
}
