//! TCP server loop: one task per client connection, each round-trip
//! dispatched to the shared sync engine.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::engine::slots::SLOT_LIMIT;
use crate::engine::{Admission, EngineError, SyncEngine, UpdateSource};
use crate::net::framing::{read_message, write_message, FramingError};
use crate::net::protocol::{ClientMessage, RejectReason, ServerMessage};

/// Attempts at flipping a slot's connection flag before giving up.
const FLAG_RETRIES: u32 = 3;

pub struct SyncServer {
    config: ServerConfig,
    engine: Arc<SyncEngine>,
}

impl SyncServer {
    pub fn new(config: ServerConfig, engine: Arc<SyncEngine>) -> Self {
        Self { config, engine }
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let listener = TcpListener::bind((self.config.bind_address, self.config.port)).await?;
        info!("Listening on {}:{}", self.config.bind_address, self.config.port);

        loop {
            let (stream, peer) = listener.accept().await?;
            debug!("Accepted connection from {}", peer);

            let engine = self.engine.clone();
            let description = self.config.description.clone();
            tokio::spawn(async move {
                handle_connection(engine, description, stream).await;
                debug!("Connection from {} closed", peer);
            });
        }
    }
}

/// Serve one client until it disconnects or breaks protocol.
pub(crate) async fn handle_connection<S>(engine: Arc<SyncEngine>, description: String, mut stream: S)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut slot: Option<u8> = None;

    loop {
        let payload = match read_message(&mut stream).await {
            Ok(payload) => payload,
            Err(FramingError::ConnectionClosed) => break,
            Err(e) => {
                warn!("Framing error: {}", e);
                break;
            }
        };

        let message: ClientMessage = match serde_json::from_slice(&payload) {
            Ok(message) => message,
            Err(e) => {
                warn!("Malformed client message: {}", e);
                break;
            }
        };

        let disconnect = matches!(message, ClientMessage::Disconnect);
        let Some(reply) = dispatch(&engine, &description, &mut slot, message).await else {
            // Protocol misuse (e.g. updates before Connect): drop the client
            break;
        };

        let bytes = match serde_json::to_vec(&reply) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Could not serialize reply: {}", e);
                break;
            }
        };
        if let Err(e) = write_message(&mut stream, &bytes).await {
            debug!("Write failed: {}", e);
            break;
        }

        if disconnect {
            break;
        }
    }

    if let Some(slot) = slot {
        release_with_retry(&engine, slot).await;
    }
}

async fn dispatch(
    engine: &SyncEngine,
    description: &str,
    slot: &mut Option<u8>,
    message: ClientMessage,
) -> Option<ServerMessage> {
    let (message, sender) = match message {
        ClientMessage::Connect(request) => {
            return Some(match engine.admit(&request) {
                Ok(Admission::Accepted {
                    slot: assigned,
                    settings,
                }) => {
                    // An admitted slot must come up connected, or it
                    // would sit assigned-but-invisible with no client
                    // message left to flip the flag
                    if set_connected_with_retry(engine, assigned, true).await.is_err() {
                        warn!("Could not mark slot {} connected, releasing it", assigned);
                        release_with_retry(engine, assigned).await;
                        return Some(ServerMessage::Busy);
                    }
                    *slot = Some(assigned);
                    ServerMessage::Connected {
                        slot: assigned,
                        settings,
                        description: description.to_string(),
                    }
                }
                Ok(Admission::Full) => ServerMessage::Rejected {
                    reason: RejectReason::SessionFull,
                },
                Ok(Admission::BadCredential) => ServerMessage::Rejected {
                    reason: RejectReason::BadCredential,
                },
                Err(EngineError::Busy) => ServerMessage::Busy,
            });
        }
        // Everything else requires an admitted slot
        other => match *slot {
            Some(sender) => (other, sender),
            None => {
                warn!("Client message before Connect");
                return None;
            }
        },
    };

    let result = match message {
        ClientMessage::World(update) => engine.update_world(UpdateSource::Slot(sender), &update),
        ClientMessage::Player(update) => engine.update_player(sender, &update),
        ClientMessage::Enemies(update) => engine.update_enemies(sender, &update),
        ClientMessage::Quests(update) => engine.update_quests(sender, &update),
        ClientMessage::Teleport {
            target_slot,
            destination,
        } => {
            // Slot indices off the wire are untrusted; the engine only
            // accepts indices it handed out itself
            if (target_slot as usize) >= SLOT_LIMIT {
                warn!("Teleport for out-of-range slot {} ignored", target_slot);
                Ok(())
            } else {
                engine.request_teleport(target_slot, destination)
            }
        }
        ClientMessage::QuestImport { completed } => engine.process_external_quests(completed),
        ClientMessage::ClearSwap => engine.clear_swap_phase(sender),
        ClientMessage::Roster => {
            return Some(match engine.participants() {
                Ok(players) => ServerMessage::Roster { players },
                Err(EngineError::Busy) => ServerMessage::Busy,
            });
        }
        ClientMessage::Poll => {
            return Some(match engine.snapshot_for(sender) {
                Ok(snapshot) => ServerMessage::Snapshot(Box::new(snapshot)),
                Err(EngineError::Busy) => ServerMessage::Busy,
            });
        }
        ClientMessage::Disconnect => Ok(()),
        ClientMessage::Connect(_) => unreachable!("handled above"),
    };

    Some(match result {
        Ok(()) => ServerMessage::Ack,
        // Update dropped this cycle; the client resends on its next tick
        Err(EngineError::Busy) => ServerMessage::Busy,
    })
}

/// Flip a slot's connection flag, retrying a busy gate with short pauses.
async fn set_connected_with_retry(
    engine: &SyncEngine,
    slot: u8,
    connected: bool,
) -> Result<(), EngineError> {
    for attempt in 0..FLAG_RETRIES {
        match engine.set_connected(slot, connected) {
            Ok(()) => return Ok(()),
            Err(EngineError::Busy) => {
                debug!(
                    "Connection flag for slot {} busy (attempt {})",
                    slot,
                    attempt + 1
                );
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    }
    Err(EngineError::Busy)
}

async fn release_with_retry(engine: &SyncEngine, slot: u8) {
    if set_connected_with_retry(engine, slot, false).await.is_err() {
        warn!("Could not release slot {} after {} attempts", slot, FLAG_RETRIES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::engine::ConnectRequest;
    use crate::equipment::EquipmentMap;
    use crate::trackers::models::ModelDescriptor;

    async fn send<S: AsyncRead + AsyncWrite + Unpin>(stream: &mut S, message: &ClientMessage) {
        let bytes = serde_json::to_vec(message).unwrap();
        write_message(stream, &bytes).await.unwrap();
    }

    async fn recv<S: AsyncRead + AsyncWrite + Unpin>(stream: &mut S) -> ServerMessage {
        let payload = read_message(stream).await.unwrap();
        serde_json::from_slice(&payload).unwrap()
    }

    fn test_engine() -> Arc<SyncEngine> {
        Arc::new(SyncEngine::new(
            &ServerConfig::default(),
            EquipmentMap::default(),
        ))
    }

    #[tokio::test]
    async fn test_connect_poll_disconnect() {
        let engine = test_engine();
        let (server_side, mut client) = tokio::io::duplex(64 * 1024);
        let task = tokio::spawn(handle_connection(
            engine.clone(),
            "test session".to_string(),
            server_side,
        ));

        send(
            &mut client,
            &ClientMessage::Connect(ConnectRequest {
                name: "tester".to_string(),
                model: ModelDescriptor::default(),
                password: String::new(),
            }),
        )
        .await;
        match recv(&mut client).await {
            ServerMessage::Connected { slot, description, .. } => {
                assert_eq!(slot, 0);
                assert_eq!(description, "test session");
            }
            other => panic!("unexpected reply: {other:?}"),
        }

        send(&mut client, &ClientMessage::Poll).await;
        assert!(matches!(recv(&mut client).await, ServerMessage::Snapshot(_)));

        send(&mut client, &ClientMessage::Disconnect).await;
        assert!(matches!(recv(&mut client).await, ServerMessage::Ack));

        task.await.unwrap();
        // Slot released on teardown
        assert!(engine.player(0).unwrap().is_vacant());
    }

    async fn connect(client: &mut (impl AsyncRead + AsyncWrite + Unpin), name: &str) -> u8 {
        send(
            client,
            &ClientMessage::Connect(ConnectRequest {
                name: name.to_string(),
                model: ModelDescriptor::default(),
                password: String::new(),
            }),
        )
        .await;
        match recv(client).await {
            ServerMessage::Connected { slot, .. } => slot,
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_out_of_range_teleport_ignored_without_dropping_client() {
        let engine = test_engine();
        let (server_side, mut client) = tokio::io::duplex(64 * 1024);
        let task = tokio::spawn(handle_connection(
            engine.clone(),
            String::new(),
            server_side,
        ));

        connect(&mut client, "tester").await;

        send(
            &mut client,
            &ClientMessage::Teleport {
                target_slot: 200,
                destination: crate::util::vec3::Vec3::new(1.0, 2.0, 3.0),
            },
        )
        .await;
        assert!(matches!(recv(&mut client).await, ServerMessage::Ack));

        // Connection still serviceable, and teardown still releases
        send(&mut client, &ClientMessage::Poll).await;
        assert!(matches!(recv(&mut client).await, ServerMessage::Snapshot(_)));
        send(&mut client, &ClientMessage::Disconnect).await;
        let _ = recv(&mut client).await;
        task.await.unwrap();
        assert!(engine.player(0).unwrap().is_vacant());
    }

    #[tokio::test]
    async fn test_connect_flag_retried_past_transient_contention() {
        let engine = test_engine();
        let assigned = match engine
            .admit(&ConnectRequest {
                name: "tester".to_string(),
                model: ModelDescriptor::default(),
                password: String::new(),
            })
            .unwrap()
        {
            Admission::Accepted { slot, .. } => slot,
            other => panic!("admission failed: {other:?}"),
        };

        // Hold the primary gate past one full lock wait, then free it
        let (held_tx, held_rx) = std::sync::mpsc::channel();
        let engine2 = engine.clone();
        let holder = std::thread::spawn(move || {
            let guard = engine2.state.lock().unwrap();
            held_tx.send(()).unwrap();
            std::thread::sleep(Duration::from_millis(150));
            drop(guard);
        });
        held_rx.recv().unwrap();

        assert!(set_connected_with_retry(&engine, assigned, true).await.is_ok());
        holder.join().unwrap();
        assert!(engine.player(assigned).unwrap().connected);
    }

    #[tokio::test]
    async fn test_quest_import_and_roster() {
        let engine = test_engine();
        let (server_side, mut client) = tokio::io::duplex(64 * 1024);
        let task = tokio::spawn(handle_connection(
            engine.clone(),
            String::new(),
            server_side,
        ));

        connect(&mut client, "tester").await;

        send(
            &mut client,
            &ClientMessage::QuestImport {
                completed: vec!["ruins_gate".to_string()],
            },
        )
        .await;
        assert!(matches!(recv(&mut client).await, ServerMessage::Ack));

        // Imported flags are queued to every participant, sender included
        send(&mut client, &ClientMessage::Poll).await;
        match recv(&mut client).await {
            ServerMessage::Snapshot(snapshot) => {
                assert_eq!(snapshot.quests, vec!["ruins_gate".to_string()]);
            }
            other => panic!("unexpected reply: {other:?}"),
        }

        send(&mut client, &ClientMessage::Roster).await;
        match recv(&mut client).await {
            ServerMessage::Roster { players } => {
                assert!(players.iter().any(|p| p.name == "tester"));
            }
            other => panic!("unexpected reply: {other:?}"),
        }

        send(&mut client, &ClientMessage::Disconnect).await;
        let _ = recv(&mut client).await;
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_update_before_connect_drops_client() {
        let engine = test_engine();
        let (server_side, mut client) = tokio::io::duplex(64 * 1024);
        let task = tokio::spawn(handle_connection(
            engine.clone(),
            String::new(),
            server_side,
        ));

        send(&mut client, &ClientMessage::Poll).await;
        // Server closes without replying
        assert!(read_message(&mut client).await.is_err());
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_connection_releases_slot() {
        let engine = test_engine();
        let (server_side, mut client) = tokio::io::duplex(64 * 1024);
        let task = tokio::spawn(handle_connection(
            engine.clone(),
            String::new(),
            server_side,
        ));

        send(
            &mut client,
            &ClientMessage::Connect(ConnectRequest {
                name: "tester".to_string(),
                model: ModelDescriptor::default(),
                password: String::new(),
            }),
        )
        .await;
        let _ = recv(&mut client).await;

        drop(client);
        task.await.unwrap();
        assert!(engine.player(0).unwrap().is_vacant());
    }
}
