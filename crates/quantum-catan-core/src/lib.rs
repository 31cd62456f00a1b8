//! Quantum Catan - a Catan rules engine with superposed tiles
//!
//! Some land tiles hold two candidate resources instead of one. They come in
//! entangled pairs, pay out tokens instead of resources, and collapse to
//! concrete resources when the robber lands on them.
//!
//! # Architecture
//!
//! Board generation and the placement graph are built once per session;
//! everything after that runs through a single [`Game`] that validates and
//! applies one action at a time.
//!
//! # Modules
//!
//! - [`hex`]: Axial hex coordinates
//! - [`board`]: Tiles, the sea ring and board generation
//! - [`geometry`]: Vertex/edge graph derived from projected hexes
//! - [`quantum`]: Superposition, entanglement groups, collapse and interference
//! - [`ledger`]: Building and road ownership, placement rules, longest road
//! - [`distribution`]: Payouts for a dice roll
//! - [`player`]: Player state, resources and development cards
//! - [`game`]: The turn state machine
//! - [`actions`]: Action/event vocabulary
//! - [`config`]: Session and board configuration

pub mod actions;
pub mod board;
pub mod config;
pub mod distribution;
pub mod game;
pub mod geometry;
pub mod hex;
pub mod ledger;
pub mod player;
pub mod quantum;

// Re-export commonly used types
pub use actions::{GameAction, GameEvent};
pub use board::{Board, BoardError, GeneratedBoard, Harbor, PlayerId, Resource, SeaTile, Tile, TileKind};
pub use config::{BoardConfig, ConfigError, GameConfig};
pub use distribution::Payout;
pub use game::{
    BuildTarget, CollapseReport, EntangleProgress, EntangleRejection, Game, GameError,
    GameSnapshot, RobberOutcome, SetupError, TurnPhase,
};
pub use geometry::{EdgeId, Geometry, HexLayout, Point, Projection, VertexId};
pub use hex::HexCoord;
pub use ledger::{Building, BuildingKind, Ledger, PlacementError};
pub use player::{DevelopmentCard, Player, PlayerColor, Purchase, ResourceHand};
pub use quantum::{GroupId, GroupPool, Superposition, Token, TokenConversion};
