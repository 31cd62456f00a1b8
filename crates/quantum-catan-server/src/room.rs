//! A room: ordered seats around one engine session.
//!
//! A seat's index is the player's id inside the engine, so seats are only
//! removed before the game starts. Once started, leaving just marks the seat
//! disconnected.

use quantum_catan_core::{
    Game, GameAction, GameConfig, GameError, GameEvent, PlayerId, SetupError, TurnPhase,
};
use thiserror::Error;
use uuid::Uuid;

use crate::protocol::{PendingChoices, RoomInfo, RoomStatus, SeatInfo};

/// Entangled pairs when the host does not choose
const DEFAULT_ENTANGLED_PAIRS: u8 = 2;

/// Upper bound on pairs a host may request
const MAX_ENTANGLED_PAIRS: u8 = 6;

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Room is full")]
    RoomFull,

    #[error("Already in a room")]
    AlreadyInRoom,

    #[error("Player not in room")]
    NotInRoom,

    #[error("Not the host")]
    NotHost,

    #[error("Game already started")]
    GameAlreadyStarted,

    #[error("Need at least 2 players")]
    NotEnoughPlayers,

    #[error("Game not started")]
    GameNotStarted,

    #[error("Could not set up game: {0}")]
    Setup(#[from] SetupError),

    #[error("{0}")]
    Rejected(#[from] GameError),
}

/// What leaving did to the room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// Seat removed; others remain
    Left,
    /// Seat kept for the running game
    Disconnected,
    /// Last seat removed; the room should go
    Vacated,
}

#[derive(Debug, Clone)]
struct Seat {
    id: Uuid,
    name: String,
    connected: bool,
}

pub struct GameRoom {
    pub id: Uuid,
    pub name: String,
    pub max_players: u8,
    pub entangled_pairs: u8,
    pub host_id: Uuid,
    seats: Vec<Seat>,
    game: Option<Game>,
}

impl GameRoom {
    pub fn new(
        id: Uuid,
        host_id: Uuid,
        host_name: String,
        max_players: u8,
        entangled_pairs: Option<u8>,
    ) -> Self {
        Self {
            id,
            name: format!("{}'s Game", host_name),
            max_players: max_players.clamp(2, 4),
            entangled_pairs: entangled_pairs
                .unwrap_or(DEFAULT_ENTANGLED_PAIRS)
                .min(MAX_ENTANGLED_PAIRS),
            host_id,
            seats: vec![Seat {
                id: host_id,
                name: host_name,
                connected: true,
            }],
            game: None,
        }
    }

    pub fn status(&self) -> RoomStatus {
        match &self.game {
            None => RoomStatus::Waiting,
            Some(game) if game.is_finished() => RoomStatus::Finished,
            Some(_) => RoomStatus::InGame,
        }
    }

    pub fn game(&self) -> Option<&Game> {
        self.game.as_ref()
    }

    /// Engine id of a member
    pub fn seat_of(&self, player_id: Uuid) -> Option<PlayerId> {
        self.seats
            .iter()
            .position(|s| s.id == player_id)
            .map(|i| i as PlayerId)
    }

    pub fn members(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.seats.iter().map(|s| s.id)
    }

    pub fn seat_count(&self) -> usize {
        self.seats.len()
    }

    pub fn name_of(&self, player_id: Uuid) -> Option<&str> {
        self.seats
            .iter()
            .find(|s| s.id == player_id)
            .map(|s| s.name.as_str())
    }

    pub fn join(&mut self, player_id: Uuid, name: String) -> Result<(), RoomError> {
        if self.game.is_some() {
            return Err(RoomError::GameAlreadyStarted);
        }
        if self.seat_count() >= self.max_players as usize {
            return Err(RoomError::RoomFull);
        }
        if self.seat_of(player_id).is_some() {
            return Err(RoomError::AlreadyInRoom);
        }
        self.seats.push(Seat {
            id: player_id,
            name,
            connected: true,
        });
        Ok(())
    }

    pub fn leave(&mut self, player_id: Uuid) -> Result<Departure, RoomError> {
        let index = self
            .seat_of(player_id)
            .ok_or(RoomError::NotInRoom)? as usize;

        if self.game.is_some() {
            self.seats[index].connected = false;
            return Ok(Departure::Disconnected);
        }

        self.seats.remove(index);
        let Some(first) = self.seats.first() else {
            return Ok(Departure::Vacated);
        };
        if player_id == self.host_id {
            self.host_id = first.id;
        }
        Ok(Departure::Left)
    }

    pub fn start(&mut self, requester_id: Uuid) -> Result<(), RoomError> {
        if requester_id != self.host_id {
            return Err(RoomError::NotHost);
        }
        if self.game.is_some() {
            return Err(RoomError::GameAlreadyStarted);
        }
        if self.seat_count() < 2 {
            return Err(RoomError::NotEnoughPlayers);
        }

        let names = self.seats.iter().map(|s| s.name.clone());
        let config = GameConfig::with_players(names).with_entangled_pairs(self.entangled_pairs);
        let game = Game::new(config)?;

        let (requested, created) = game.generation_report();
        tracing::info!(
            room = %self.id,
            players = self.seats.len(),
            requested,
            created,
            "room.game_started"
        );
        self.game = Some(game);
        Ok(())
    }

    /// Run one action for a member's seat
    pub fn act(&mut self, player_id: Uuid, action: GameAction) -> Result<Vec<GameEvent>, RoomError> {
        let seat = self.seat_of(player_id).ok_or(RoomError::NotInRoom)?;
        let game = self.game.as_mut().ok_or(RoomError::GameNotStarted)?;
        let events = game.apply_action(seat, action)?;
        tracing::debug!(room = %self.id, seat, ?action, events = events.len(), "room.action");
        Ok(events)
    }

    pub fn snapshot(&self) -> Option<serde_json::Value> {
        let game = self.game()?;
        serde_json::to_value(game.snapshot()).ok()
    }

    /// The choice the seat to move owes, if play is waiting on one
    pub fn pending_choices(&self) -> Option<(PlayerId, PendingChoices)> {
        let game = self.game()?;
        let mut choices = PendingChoices::default();
        match &game.phase {
            TurnPhase::AwaitingRobberPlacement => choices.robber_targets = game.robber_targets(),
            TurnPhase::AwaitingEntangleSelection { .. } => {
                choices.entangle_candidates = game.entangle_candidates()
            }
            TurnPhase::AwaitingVictimChoice { candidates } => {
                choices.steal_candidates = candidates.clone()
            }
            TurnPhase::Idle | TurnPhase::Finished { .. } => return None,
        }
        Some((game.current_player, choices))
    }

    pub fn current_seat(&self) -> Option<PlayerId> {
        self.game().map(|g| g.current_player)
    }

    pub fn winner(&self) -> Option<(PlayerId, String)> {
        let seat = self.game()?.winner()?;
        let name = self.seats.get(seat as usize)?.name.clone();
        Some((seat, name))
    }

    pub fn info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id,
            name: self.name.clone(),
            seats: self
                .seats
                .iter()
                .enumerate()
                .map(|(i, s)| SeatInfo {
                    seat: i as PlayerId,
                    id: s.id,
                    name: s.name.clone(),
                    connected: s.connected,
                })
                .collect(),
            max_players: self.max_players,
            entangled_pairs: self.entangled_pairs,
            host_id: self.host_id,
            status: self.status(),
        }
    }
}
