//! WebSocket protocol messages for Quantum Catan multiplayer.
//!
//! Both directions are JSON objects tagged with `type`, with the body under
//! `payload`. Game actions, events and rejections use the engine's own types,
//! so clients see the same vocabulary the engine validates against.

use quantum_catan_core::{
    GameAction, GameError, GameEvent, GroupId, PlayerId, Resource, TokenConversion,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Open a room and take its first seat
    CreateRoom {
        player_name: String,
        max_players: u8,
        /// Entangled pairs on the generated board (room default when absent)
        #[serde(default)]
        entangled_pairs: Option<u8>,
    },

    JoinRoom { room_id: Uuid, player_name: String },

    LeaveRoom,

    /// Start the game (host only)
    StartGame,

    /// Submit a turn action for the caller's seat
    Act { action: GameAction },

    Chat { message: String },

    ListRooms,

    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Sent once per connection
    Welcome { player_id: Uuid },

    RoomCreated { room_id: Uuid },

    JoinedRoom { room: RoomInfo },

    LeftRoom,

    /// Seats, host or status changed
    RoomUpdated { room: RoomInfo },

    RoomList { rooms: Vec<RoomInfo> },

    /// Full engine snapshot
    GameState { state: serde_json::Value },

    /// An action went through; `seat` is the acting player
    ActionApplied { seat: PlayerId, events: Vec<GameEvent> },

    /// The caller's action was refused. `error` is set when the engine
    /// refused it, so clients can tell rejection reasons apart.
    ActionRejected {
        message: String,
        error: Option<GameError>,
    },

    /// A change to the board's superposition
    Quantum { notice: QuantumNotice },

    /// Selections the seat to move must make before play continues
    PendingChoices { seat: PlayerId, choices: PendingChoices },

    TurnChanged { seat: PlayerId },

    ChatMessage { player_name: String, message: String },

    GameOver { winner: PlayerId, winner_name: String },

    Error { message: String },

    Pong,
}

/// Superposition changes, pulled out of the event stream so clients can
/// animate them without parsing every event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum QuantumNotice {
    /// A robbed pair resolved; tokens on it became resources
    Collapsed {
        group: GroupId,
        tiles: [usize; 2],
        resolved: [Resource; 2],
        conversions: Vec<TokenConversion>,
    },
    /// First tile of the replacement pair picked
    SelectionStarted { seat: PlayerId, tile: usize },
    /// The replacement pair formed
    Entangled { group: GroupId, tiles: [usize; 2] },
    /// An Interference card shifted a pair's weights
    Interfered {
        tile: usize,
        partner: usize,
        weight: f64,
        partner_weight: f64,
    },
}

impl QuantumNotice {
    pub fn from_event(event: &GameEvent) -> Option<Self> {
        match event {
            GameEvent::PairCollapsed {
                group,
                tiles,
                resolved,
                conversions,
            } => Some(Self::Collapsed {
                group: *group,
                tiles: *tiles,
                resolved: *resolved,
                conversions: conversions.clone(),
            }),
            GameEvent::EntangleTileSelected { player, tile } => Some(Self::SelectionStarted {
                seat: *player,
                tile: *tile,
            }),
            GameEvent::PairEntangled { group, tiles } => Some(Self::Entangled {
                group: *group,
                tiles: *tiles,
            }),
            GameEvent::InterferenceApplied {
                tile,
                partner,
                weight,
                partner_weight,
                ..
            } => Some(Self::Interfered {
                tile: *tile,
                partner: *partner,
                weight: *weight,
                partner_weight: *partner_weight,
            }),
            _ => None,
        }
    }
}

/// Tiles and seats open to the player who must choose next.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChoices {
    pub robber_targets: Vec<usize>,
    pub entangle_candidates: Vec<usize>,
    pub steal_candidates: Vec<PlayerId>,
}

/// Room summary shown in lobbies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: Uuid,
    pub name: String,
    pub seats: Vec<SeatInfo>,
    pub max_players: u8,
    pub entangled_pairs: u8,
    pub host_id: Uuid,
    pub status: RoomStatus,
}

/// One occupied seat. The seat index is the player's id in the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatInfo {
    pub seat: PlayerId,
    pub id: Uuid,
    pub name: String,
    pub connected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Waiting,
    InGame,
    Finished,
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantum_catan_core::{BuildTarget, EntangleRejection};

    #[test]
    fn test_create_room_without_pairs() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"CreateRoom","payload":{"player_name":"Ada","max_players":3}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::CreateRoom {
                entangled_pairs, ..
            } => assert_eq!(entangled_pairs, None),
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn test_act_carries_engine_action() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"Act","payload":{"action":{"PlaceBuilding":{"Road":12}}}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::Act { action } => {
                assert_eq!(action, GameAction::PlaceBuilding(BuildTarget::Road(12)))
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn test_unknown_action_does_not_parse() {
        let parsed = serde_json::from_str::<ClientMessage>(
            r#"{"type":"Act","payload":{"action":{"Teleport":3}}}"#,
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_rejection_keeps_reason() {
        let msg = ServerMessage::ActionRejected {
            message: "no partner".into(),
            error: Some(GameError::InvalidEntangleTarget(
                EntangleRejection::NoEligiblePartner,
            )),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json["payload"]["error"]["InvalidEntangleTarget"],
            "NoEligiblePartner"
        );
    }

    #[test]
    fn test_quantum_notice_from_events() {
        let collapsed = GameEvent::PairCollapsed {
            group: GroupId(2),
            tiles: [3, 8],
            resolved: [Resource::Ore, Resource::Wool],
            conversions: vec![],
        };
        assert_eq!(
            QuantumNotice::from_event(&collapsed),
            Some(QuantumNotice::Collapsed {
                group: GroupId(2),
                tiles: [3, 8],
                resolved: [Resource::Ore, Resource::Wool],
                conversions: vec![],
            })
        );

        let rolled = GameEvent::DiceRolled { player: 0, total: 6 };
        assert_eq!(QuantumNotice::from_event(&rolled), None);
    }

    #[test]
    fn test_unit_message_shape() {
        let json = serde_json::to_string(&ServerMessage::Pong).unwrap();
        assert_eq!(json, r#"{"type":"Pong"}"#);
    }
}
