//! Shared registries and message delivery.
//!
//! Handlers never send directly. They return [`Envelope`]s, and the hub
//! delivers them once every room lock has been released.

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::{RoomInfo, RoomStatus, ServerMessage};
use crate::room::GameRoom;

/// Who an outgoing message is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Player(Uuid),
    /// Every seat in the room at delivery time
    Room(Uuid),
    RoomExcept { room: Uuid, except: Uuid },
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub audience: Audience,
    pub message: ServerMessage,
}

impl Envelope {
    pub fn player(id: Uuid, message: ServerMessage) -> Self {
        Self {
            audience: Audience::Player(id),
            message,
        }
    }

    pub fn room(id: Uuid, message: ServerMessage) -> Self {
        Self {
            audience: Audience::Room(id),
            message,
        }
    }
}

#[derive(Default)]
pub struct Hub {
    pub rooms: DashMap<Uuid, GameRoom>,
    /// Which room each player sits in
    pub memberships: DashMap<Uuid, Uuid>,
    outboxes: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and hand back its outgoing queue
    pub fn connect(&self, player_id: Uuid) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outboxes.insert(player_id, tx);
        rx
    }

    pub fn disconnect(&self, player_id: Uuid) {
        self.outboxes.remove(&player_id);
    }

    pub fn room_of(&self, player_id: Uuid) -> Option<Uuid> {
        self.memberships.get(&player_id).map(|r| *r)
    }

    pub fn waiting_rooms(&self) -> Vec<RoomInfo> {
        self.rooms
            .iter()
            .filter(|r| r.status() == RoomStatus::Waiting)
            .map(|r| r.info())
            .collect()
    }

    /// Resolve an audience to player ids
    pub fn recipients(&self, audience: Audience) -> Vec<Uuid> {
        match audience {
            Audience::Player(id) => vec![id],
            Audience::Room(room) => self
                .rooms
                .get(&room)
                .map(|r| r.members().collect())
                .unwrap_or_default(),
            Audience::RoomExcept { room, except } => self
                .rooms
                .get(&room)
                .map(|r| r.members().filter(|&id| id != except).collect())
                .unwrap_or_default(),
        }
    }

    pub fn deliver(&self, envelopes: Vec<Envelope>) {
        for envelope in envelopes {
            for id in self.recipients(envelope.audience) {
                if let Some(outbox) = self.outboxes.get(&id) {
                    // A closed queue means the socket is already going away
                    let _ = outbox.send(envelope.message.clone());
                }
            }
        }
    }
}
