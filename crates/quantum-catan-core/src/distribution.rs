//! Resource distribution for a dice roll.
//!
//! Distribution is computed as a list of payouts without touching player
//! state, then applied by the session. Classical tiles pay resources;
//! quantum tiles mint one token per unit owed.

use crate::board::{Board, PlayerId, Resource, TileKind};
use crate::geometry::Geometry;
use crate::ledger::Ledger;
use crate::quantum::Token;
use serde::{Deserialize, Serialize};

/// One credit produced by a roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payout {
    /// Concrete resources added to a player's hand
    Resource {
        player: PlayerId,
        tile: usize,
        resource: Resource,
        amount: u32,
    },
    /// A single uncollapsed token
    Token { player: PlayerId, token: Token },
}

/// Everything a roll pays out, in tile order then corner order.
///
/// Tiles without the rolled number, the desert and the robber's tile pay
/// nothing. A roll of 7 matches no tile.
pub fn payouts_for_roll(
    board: &Board,
    geometry: &Geometry,
    ledger: &Ledger,
    roll: u8,
    robber: Option<usize>,
) -> Vec<Payout> {
    let mut payouts = Vec::new();

    for (index, tile) in board.tiles.iter().enumerate() {
        if tile.number() != Some(roll) || robber == Some(index) {
            continue;
        }

        for building in ledger.buildings_on_tile(geometry, index) {
            let amount = building.yield_amount();
            match tile.kind {
                TileKind::Classical { resource, .. } => payouts.push(Payout::Resource {
                    player: building.owner,
                    tile: index,
                    resource,
                    amount,
                }),
                TileKind::Quantum { state, .. } => {
                    let token = Token {
                        group: state.group,
                        origin_tile: index,
                        candidates: state.candidates,
                    };
                    payouts.extend((0..amount).map(|_| Payout::Token {
                        player: building.owner,
                        token,
                    }));
                }
                TileKind::Desert => {}
            }
        }
    }

    tracing::debug!(
        target: "quantum_catan::distribution",
        roll,
        payouts = payouts.len(),
        "distribution.computed"
    );
    payouts
}
