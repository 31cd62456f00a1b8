//! Turning client messages into room changes and outgoing envelopes.

use quantum_catan_core::{GameAction, GameEvent};
use tracing::info;
use uuid::Uuid;

use crate::hub::{Audience, Envelope, Hub};
use crate::protocol::{ClientMessage, QuantumNotice, ServerMessage};
use crate::room::{Departure, GameRoom, RoomError};

impl RoomError {
    /// What the caller is told when their request fails
    fn into_message(self) -> ServerMessage {
        match self {
            RoomError::Rejected(error) => ServerMessage::ActionRejected {
                message: error.to_string(),
                error: Some(error),
            },
            other => ServerMessage::Error {
                message: other.to_string(),
            },
        }
    }
}

/// Handle one message from `player_id`. Nothing is sent here; the caller
/// delivers the returned envelopes.
pub fn dispatch(hub: &Hub, player_id: Uuid, msg: ClientMessage) -> Vec<Envelope> {
    let result = match msg {
        ClientMessage::CreateRoom {
            player_name,
            max_players,
            entangled_pairs,
        } => create_room(hub, player_id, player_name, max_players, entangled_pairs),
        ClientMessage::JoinRoom {
            room_id,
            player_name,
        } => join_room(hub, player_id, room_id, player_name),
        ClientMessage::LeaveRoom => {
            leave_room(hub, player_id).map(|mut out| {
                out.push(Envelope::player(player_id, ServerMessage::LeftRoom));
                out
            })
        }
        ClientMessage::StartGame => start_game(hub, player_id),
        ClientMessage::Act { action } => act(hub, player_id, action),
        ClientMessage::Chat { message } => chat(hub, player_id, message),
        ClientMessage::ListRooms => Ok(vec![Envelope::player(
            player_id,
            ServerMessage::RoomList {
                rooms: hub.waiting_rooms(),
            },
        )]),
        ClientMessage::Ping => Ok(vec![Envelope::player(player_id, ServerMessage::Pong)]),
    };

    result.unwrap_or_else(|err| vec![Envelope::player(player_id, err.into_message())])
}

/// Connection dropped: leave whatever room the player was in
pub fn depart(hub: &Hub, player_id: Uuid) -> Vec<Envelope> {
    leave_room(hub, player_id).unwrap_or_default()
}

fn create_room(
    hub: &Hub,
    player_id: Uuid,
    player_name: String,
    max_players: u8,
    entangled_pairs: Option<u8>,
) -> Result<Vec<Envelope>, RoomError> {
    if hub.room_of(player_id).is_some() {
        return Err(RoomError::AlreadyInRoom);
    }
    let room_id = Uuid::new_v4();
    let room = GameRoom::new(room_id, player_id, player_name, max_players, entangled_pairs);
    let info = room.info();
    info!(room = %room_id, host = %player_id, pairs = room.entangled_pairs, "room.created");

    hub.rooms.insert(room_id, room);
    hub.memberships.insert(player_id, room_id);
    Ok(vec![
        Envelope::player(player_id, ServerMessage::RoomCreated { room_id }),
        Envelope::player(player_id, ServerMessage::JoinedRoom { room: info }),
    ])
}

fn join_room(
    hub: &Hub,
    player_id: Uuid,
    room_id: Uuid,
    player_name: String,
) -> Result<Vec<Envelope>, RoomError> {
    if hub.room_of(player_id).is_some() {
        return Err(RoomError::AlreadyInRoom);
    }
    let info = {
        let mut room = hub.rooms.get_mut(&room_id).ok_or(RoomError::RoomNotFound)?;
        room.join(player_id, player_name)?;
        room.info()
    };
    hub.memberships.insert(player_id, room_id);
    info!(room = %room_id, player = %player_id, "room.joined");

    Ok(vec![
        Envelope::player(player_id, ServerMessage::JoinedRoom { room: info.clone() }),
        Envelope {
            audience: Audience::RoomExcept {
                room: room_id,
                except: player_id,
            },
            message: ServerMessage::RoomUpdated { room: info },
        },
    ])
}

fn leave_room(hub: &Hub, player_id: Uuid) -> Result<Vec<Envelope>, RoomError> {
    let (_, room_id) = hub
        .memberships
        .remove(&player_id)
        .ok_or(RoomError::NotInRoom)?;

    let (departure, info) = {
        let mut room = hub.rooms.get_mut(&room_id).ok_or(RoomError::RoomNotFound)?;
        let departure = room.leave(player_id)?;
        (departure, room.info())
    };
    info!(room = %room_id, player = %player_id, ?departure, "room.left");

    if departure == Departure::Vacated {
        hub.rooms.remove(&room_id);
        info!(room = %room_id, "room.closed");
        return Ok(Vec::new());
    }
    Ok(vec![Envelope::room(
        room_id,
        ServerMessage::RoomUpdated { room: info },
    )])
}

fn start_game(hub: &Hub, player_id: Uuid) -> Result<Vec<Envelope>, RoomError> {
    let room_id = hub.room_of(player_id).ok_or(RoomError::NotInRoom)?;
    let mut room = hub.rooms.get_mut(&room_id).ok_or(RoomError::RoomNotFound)?;
    room.start(player_id)?;

    let mut out = vec![Envelope::room(
        room_id,
        ServerMessage::RoomUpdated { room: room.info() },
    )];
    if let Some(seat) = room.current_seat() {
        out.push(Envelope::room(room_id, ServerMessage::TurnChanged { seat }));
    }
    out.extend(game_update(&room));
    Ok(out)
}

fn act(hub: &Hub, player_id: Uuid, action: GameAction) -> Result<Vec<Envelope>, RoomError> {
    let room_id = hub.room_of(player_id).ok_or(RoomError::NotInRoom)?;
    let mut room = hub.rooms.get_mut(&room_id).ok_or(RoomError::RoomNotFound)?;
    let seat = room.seat_of(player_id).ok_or(RoomError::NotInRoom)?;
    let events = room.act(player_id, action)?;

    let mut out: Vec<Envelope> = events
        .iter()
        .filter_map(QuantumNotice::from_event)
        .map(|notice| Envelope::room(room_id, ServerMessage::Quantum { notice }))
        .collect();
    for event in &events {
        if let GameEvent::TurnEnded { next_player, .. } = event {
            out.push(Envelope::room(
                room_id,
                ServerMessage::TurnChanged { seat: *next_player },
            ));
        }
    }
    out.insert(
        0,
        Envelope::room(room_id, ServerMessage::ActionApplied { seat, events }),
    );
    out.extend(game_update(&room));
    Ok(out)
}

/// State, owed choices and the result, after the engine moved
fn game_update(room: &GameRoom) -> Vec<Envelope> {
    let mut out = Vec::new();
    if let Some(state) = room.snapshot() {
        out.push(Envelope::room(room.id, ServerMessage::GameState { state }));
    }
    if let Some((seat, choices)) = room.pending_choices() {
        out.push(Envelope::room(
            room.id,
            ServerMessage::PendingChoices { seat, choices },
        ));
    }
    if let Some((winner, winner_name)) = room.winner() {
        info!(room = %room.id, winner, "room.game_over");
        out.push(Envelope::room(
            room.id,
            ServerMessage::GameOver {
                winner,
                winner_name,
            },
        ));
    }
    out
}

fn chat(hub: &Hub, player_id: Uuid, message: String) -> Result<Vec<Envelope>, RoomError> {
    let room_id = hub.room_of(player_id).ok_or(RoomError::NotInRoom)?;
    let room = hub.rooms.get(&room_id).ok_or(RoomError::RoomNotFound)?;
    let player_name = room.name_of(player_id).ok_or(RoomError::NotInRoom)?.to_string();
    Ok(vec![Envelope::room(
        room_id,
        ServerMessage::ChatMessage {
            player_name,
            message,
        },
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantum_catan_core::{EntangleRejection, GameError};

    fn messages(out: &[Envelope]) -> Vec<&ServerMessage> {
        out.iter().map(|e| &e.message).collect()
    }

    /// Host creates a room with three pairs, a guest joins, host starts
    fn started(hub: &Hub) -> (Uuid, Uuid, Uuid) {
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        dispatch(
            hub,
            host,
            ClientMessage::CreateRoom {
                player_name: "Host".into(),
                max_players: 2,
                entangled_pairs: Some(3),
            },
        );
        let room_id = hub.room_of(host).unwrap();
        dispatch(
            hub,
            guest,
            ClientMessage::JoinRoom {
                room_id,
                player_name: "Guest".into(),
            },
        );
        dispatch(hub, host, ClientMessage::StartGame);
        (room_id, host, guest)
    }

    fn act_as(hub: &Hub, player: Uuid, action: GameAction) -> Vec<Envelope> {
        dispatch(hub, player, ClientMessage::Act { action })
    }

    #[test]
    fn test_join_notifies_others_only() {
        let hub = Hub::new();
        let host = Uuid::new_v4();
        dispatch(
            &hub,
            host,
            ClientMessage::CreateRoom {
                player_name: "Host".into(),
                max_players: 4,
                entangled_pairs: None,
            },
        );
        let room_id = hub.room_of(host).unwrap();
        let guest = Uuid::new_v4();
        let out = dispatch(
            &hub,
            guest,
            ClientMessage::JoinRoom {
                room_id,
                player_name: "Guest".into(),
            },
        );

        assert_eq!(out[0].audience, Audience::Player(guest));
        assert!(matches!(out[0].message, ServerMessage::JoinedRoom { .. }));
        assert_eq!(
            out[1].audience,
            Audience::RoomExcept {
                room: room_id,
                except: guest
            }
        );
        assert_eq!(hub.room_of(guest), Some(room_id));
    }

    #[test]
    fn test_unknown_room_is_reported_to_caller() {
        let hub = Hub::new();
        let player = Uuid::new_v4();
        let out = dispatch(
            &hub,
            player,
            ClientMessage::JoinRoom {
                room_id: Uuid::new_v4(),
                player_name: "Lost".into(),
            },
        );
        assert_eq!(out.len(), 1);
        assert!(matches!(&out[0].message, ServerMessage::Error { message } if message == "Room not found"));
    }

    #[test]
    fn test_start_announces_first_turn_and_state() {
        let hub = Hub::new();
        let host = Uuid::new_v4();
        dispatch(
            &hub,
            host,
            ClientMessage::CreateRoom {
                player_name: "Host".into(),
                max_players: 2,
                entangled_pairs: None,
            },
        );
        let room_id = hub.room_of(host).unwrap();
        dispatch(
            &hub,
            Uuid::new_v4(),
            ClientMessage::JoinRoom {
                room_id,
                player_name: "Guest".into(),
            },
        );

        let out = dispatch(&hub, host, ClientMessage::StartGame);
        let msgs = messages(&out);
        assert!(msgs
            .iter()
            .any(|m| matches!(m, ServerMessage::TurnChanged { seat: 0 })));
        assert!(msgs
            .iter()
            .any(|m| matches!(m, ServerMessage::GameState { .. })));
        assert!(hub.waiting_rooms().is_empty());
    }

    #[test]
    fn test_engine_rejection_is_typed() {
        let hub = Hub::new();
        let (_, _, guest) = started(&hub);
        let out = act_as(&hub, guest, GameAction::RollDice { total: Some(8) });

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].audience, Audience::Player(guest));
        assert!(matches!(
            out[0].message,
            ServerMessage::ActionRejected {
                error: Some(GameError::NotYourTurn),
                ..
            }
        ));
    }

    #[test]
    fn test_robber_collapse_flows_through_quantum_notices() {
        let hub = Hub::new();
        let (room_id, host, _) = started(&hub);
        let quantum = {
            let room = hub.rooms.get(&room_id).unwrap();
            let (tile, _) = room.game().unwrap().board.quantum_tiles().next().unwrap();
            tile
        };

        let out = act_as(&hub, host, GameAction::RollDice { total: Some(7) });
        assert!(messages(&out).iter().any(|m| matches!(
            m,
            ServerMessage::PendingChoices { seat: 0, choices } if !choices.robber_targets.is_empty()
        )));

        let out = act_as(&hub, host, GameAction::MoveRobber { tile: quantum });
        let msgs = messages(&out);
        assert!(matches!(msgs[0], ServerMessage::ActionApplied { seat: 0, .. }));
        assert!(msgs.iter().any(|m| matches!(
            m,
            ServerMessage::Quantum {
                notice: QuantumNotice::Collapsed { tiles, .. }
            } if tiles.contains(&quantum)
        )));
        let candidates = msgs
            .iter()
            .find_map(|m| match m {
                ServerMessage::PendingChoices { choices, .. } => {
                    Some(choices.entangle_candidates.clone())
                }
                _ => None,
            })
            .unwrap();
        assert!(!candidates.contains(&quantum));

        let first = candidates[0];
        let out = act_as(&hub, host, GameAction::EntangleSelect { tile: first });
        assert!(messages(&out).iter().any(|m| matches!(
            m,
            ServerMessage::Quantum {
                notice: QuantumNotice::SelectionStarted { seat: 0, tile }
            } if *tile == first
        )));

        let out = act_as(&hub, host, GameAction::EntangleSelect { tile: first });
        assert!(matches!(
            out[0].message,
            ServerMessage::ActionRejected {
                error: Some(GameError::InvalidEntangleTarget(EntangleRejection::AlreadySelected)),
                ..
            }
        ));
    }

    #[test]
    fn test_end_turn_announces_next_seat() {
        let hub = Hub::new();
        let (_, host, _) = started(&hub);
        act_as(&hub, host, GameAction::RollDice { total: Some(6) });
        let out = act_as(&hub, host, GameAction::EndTurn);
        assert!(messages(&out)
            .iter()
            .any(|m| matches!(m, ServerMessage::TurnChanged { seat: 1 })));
    }

    #[test]
    fn test_last_player_leaving_closes_room() {
        let hub = Hub::new();
        let host = Uuid::new_v4();
        dispatch(
            &hub,
            host,
            ClientMessage::CreateRoom {
                player_name: "Host".into(),
                max_players: 4,
                entangled_pairs: None,
            },
        );
        let room_id = hub.room_of(host).unwrap();

        let out = dispatch(&hub, host, ClientMessage::LeaveRoom);
        assert!(matches!(messages(&out)[..], [ServerMessage::LeftRoom]));
        assert!(hub.rooms.get(&room_id).is_none());
        assert_eq!(hub.room_of(host), None);
    }

    #[test]
    fn test_disconnect_mid_game_keeps_room() {
        let hub = Hub::new();
        let (room_id, _, guest) = started(&hub);
        let out = depart(&hub, guest);

        assert_eq!(out.len(), 1);
        let room = hub.rooms.get(&room_id).unwrap();
        assert_eq!(room.seat_of(guest), Some(1));
        assert!(!room.info().seats[1].connected);
    }

    #[test]
    fn test_chat_uses_seat_name() {
        let hub = Hub::new();
        let (room_id, _, guest) = started(&hub);
        let out = dispatch(
            &hub,
            guest,
            ClientMessage::Chat {
                message: "hi".into(),
            },
        );
        assert_eq!(out[0].audience, Audience::Room(room_id));
        assert!(matches!(
            &out[0].message,
            ServerMessage::ChatMessage { player_name, .. } if player_name == "Guest"
        ));
    }
}
