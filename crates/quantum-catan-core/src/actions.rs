//! Game actions that players can take.
//!
//! This module defines all possible actions in the game, the events that
//! result from them, and [`Game::apply_action`], which dispatches an action
//! to the matching session operation.

use crate::board::{PlayerId, Resource};
use crate::distribution::Payout;
use crate::game::{BuildTarget, EntangleProgress, Game, GameError, TurnPhase};
use crate::quantum::{GroupId, TokenConversion};
use serde::{Deserialize, Serialize};

/// All possible actions a player can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    // ==================== Turn Actions ====================
    /// Roll the dice; a fixed total may be supplied
    RollDice { total: Option<u8> },

    // ==================== Building ====================
    /// Build a settlement, city or road
    PlaceBuilding(BuildTarget),

    // ==================== Robber & Quantum ====================
    /// Move the robber to a land tile (after rolling 7 or playing a knight)
    MoveRobber { tile: usize },
    /// Pick a tile for the pair replacing a collapsed one
    EntangleSelect { tile: usize },
    /// Spend an Interference card on a tile of an entangled pair
    ApplyInterference { tile: usize },
    /// Choose a player to steal from (after moving the robber)
    Steal { victim: PlayerId },

    // ==================== Development Cards ====================
    /// Play a knight card (move robber, counts toward largest army)
    PlayKnight,
    /// Buy a development card from the deck
    BuyDevelopmentCard,

    // ==================== Trading ====================
    /// Trade with the bank (4:1) or a port (3:1 or 2:1)
    MaritimeTrade { give: Resource, receive: Resource },

    // ==================== Turn Management ====================
    /// End your turn
    EndTurn,
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Dice were rolled
    DiceRolled { player: PlayerId, total: u8 },

    /// Resources and tokens handed out after a roll
    ResourcesDistributed { payouts: Vec<Payout> },

    /// The robber must move before anything else happens
    RobberMustMove { player: PlayerId },

    /// Robber moved to a new tile
    RobberMoved {
        player: PlayerId,
        tile: usize,
        steal_candidates: Vec<PlayerId>,
    },

    /// An entangled pair resolved to concrete resources
    PairCollapsed {
        group: GroupId,
        tiles: [usize; 2],
        resolved: [Resource; 2],
        conversions: Vec<TokenConversion>,
    },

    /// First tile of a new pair picked
    EntangleTileSelected { player: PlayerId, tile: usize },

    /// A new entangled pair formed
    PairEntangled { group: GroupId, tiles: [usize; 2] },

    /// A pair's weights were skewed
    InterferenceApplied {
        player: PlayerId,
        tile: usize,
        partner: usize,
        weight: f64,
        partner_weight: f64,
    },

    /// Resource was stolen (None if the victim had nothing)
    ResourceStolen {
        thief: PlayerId,
        victim: PlayerId,
        resource: Option<Resource>,
    },

    /// Settlement, city or road built
    BuildingPlaced { player: PlayerId, target: BuildTarget },

    /// Development card bought (card type hidden from other players)
    DevelopmentCardBought { player: PlayerId },

    /// Knight card played
    KnightPlayed { player: PlayerId },

    /// Trade with the bank or a port
    MaritimeTradeCompleted {
        player: PlayerId,
        gave: Resource,
        gave_count: u32,
        received: Resource,
    },

    /// Turn ended
    TurnEnded {
        player: PlayerId,
        next_player: PlayerId,
    },

    /// Longest Road changed hands
    LongestRoadChanged {
        previous: Option<PlayerId>,
        current: Option<PlayerId>,
    },

    /// Largest Army changed hands
    LargestArmyChanged {
        previous: Option<PlayerId>,
        current: Option<PlayerId>,
    },

    /// Game won
    GameWon {
        player: PlayerId,
        victory_points: u32,
    },
}

impl Game {
    /// Apply an action for `player`, returning the events it produced.
    ///
    /// A rejected action returns the error and leaves the session unchanged.
    pub fn apply_action(
        &mut self,
        player: PlayerId,
        action: GameAction,
    ) -> Result<Vec<GameEvent>, GameError> {
        let road_holder = self.longest_road_holder();
        let army_holder = self.largest_army_holder();

        let mut events = match action {
            GameAction::RollDice { total } => {
                let outcome = self.roll_and_distribute(player, total)?;
                let mut events = vec![GameEvent::DiceRolled {
                    player,
                    total: outcome.total,
                }];
                if self.phase == TurnPhase::AwaitingRobberPlacement {
                    events.push(GameEvent::RobberMustMove { player });
                } else if !outcome.payouts.is_empty() {
                    events.push(GameEvent::ResourcesDistributed {
                        payouts: outcome.payouts,
                    });
                }
                events
            }

            GameAction::PlaceBuilding(target) => {
                self.place_building(player, target)?;
                vec![GameEvent::BuildingPlaced { player, target }]
            }

            GameAction::MoveRobber { tile } => {
                let outcome = self.move_robber(player, tile)?;
                let mut events = vec![GameEvent::RobberMoved {
                    player,
                    tile: outcome.tile,
                    steal_candidates: outcome.steal_candidates,
                }];
                if let Some(report) = outcome.collapsed {
                    events.push(GameEvent::PairCollapsed {
                        group: report.group,
                        tiles: report.tiles,
                        resolved: report.resolved,
                        conversions: report.conversions,
                    });
                }
                events
            }

            GameAction::EntangleSelect { tile } => match self.entangle_select(player, tile)? {
                EntangleProgress::Pending { first } => {
                    vec![GameEvent::EntangleTileSelected {
                        player,
                        tile: first,
                    }]
                }
                EntangleProgress::Completed { tiles, group } => {
                    vec![GameEvent::PairEntangled { group, tiles }]
                }
            },

            GameAction::ApplyInterference { tile } => {
                let outcome = self.apply_interference(player, tile)?;
                vec![GameEvent::InterferenceApplied {
                    player,
                    tile: outcome.tile,
                    partner: outcome.partner,
                    weight: outcome.weight,
                    partner_weight: outcome.partner_weight,
                }]
            }

            GameAction::Steal { victim } => {
                let resource = self.steal(player, victim)?;
                vec![GameEvent::ResourceStolen {
                    thief: player,
                    victim,
                    resource,
                }]
            }

            GameAction::PlayKnight => {
                self.play_knight(player)?;
                vec![GameEvent::KnightPlayed { player }]
            }

            GameAction::BuyDevelopmentCard => {
                self.buy_dev_card(player)?;
                vec![GameEvent::DevelopmentCardBought { player }]
            }

            GameAction::MaritimeTrade { give, receive } => {
                let ratio = self.maritime_trade(player, give, receive)?;
                vec![GameEvent::MaritimeTradeCompleted {
                    player,
                    gave: give,
                    gave_count: ratio,
                    received: receive,
                }]
            }

            GameAction::EndTurn => {
                let next_player = self.end_turn(player)?;
                vec![GameEvent::TurnEnded {
                    player,
                    next_player,
                }]
            }
        };

        let road_now = self.longest_road_holder();
        if road_now != road_holder {
            events.push(GameEvent::LongestRoadChanged {
                previous: road_holder,
                current: road_now,
            });
        }
        let army_now = self.largest_army_holder();
        if army_now != army_holder {
            events.push(GameEvent::LargestArmyChanged {
                previous: army_holder,
                current: army_now,
            });
        }
        if let TurnPhase::Finished { winner } = self.phase {
            events.push(GameEvent::GameWon {
                player: winner,
                victory_points: self.score(winner),
            });
        }

        Ok(events)
    }
}
