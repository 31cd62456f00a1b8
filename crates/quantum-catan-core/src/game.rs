//! Game session: the turn state machine over board, ledger and players.
//!
//! A [`Game`] owns every piece of mutable state for one session. Each
//! operation validates against the current [`TurnPhase`] first and only then
//! mutates, so a rejected call leaves the session untouched.

use crate::board::{Board, BoardError, Harbor, PlayerId, Resource, TileKind};
use crate::config::{ConfigError, GameConfig};
use crate::distribution::{payouts_for_roll, Payout};
use crate::geometry::{EdgeId, Geometry, HexLayout, Projection, VertexId};
use crate::ledger::{Building, Ledger, PlacementError};
use crate::player::{DevelopmentCard, Player, Purchase};
use crate::quantum::{collapse_pair, interfere, GroupId, GroupPool, TokenConversion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum road length for Longest Road
const MIN_LONGEST_ROAD: u32 = 5;

/// Minimum knights for Largest Army
const MIN_LARGEST_ARMY: u32 = 3;

/// Trade rate without a port
const BANK_RATE: u32 = 4;

/// Where a session is in its turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    /// Roll, build, trade, buy and play cards, end the turn
    Idle,

    /// A 7 was rolled or a knight played; the robber must move
    AwaitingRobberPlacement,

    /// The robber collapsed a pair; the acting player picks two classical
    /// tiles to entangle
    AwaitingEntangleSelection {
        /// First tile of the new pair, once picked
        first: Option<usize>,
    },

    /// The robber landed on a classical tile next to opponents
    AwaitingVictimChoice { candidates: Vec<PlayerId> },

    /// Game is over
    Finished { winner: PlayerId },
}

/// Why a tile cannot join the pair being entangled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum EntangleRejection {
    #[error("Tile already selected for this pair")]
    AlreadySelected,

    #[error("Tile is already quantum")]
    QuantumTile,

    #[error("The desert cannot be entangled")]
    DesertTile,

    #[error("Pair would hold {0} twice")]
    DuplicateResource(Resource),

    #[error("The robber's tile cannot be entangled")]
    RobberOccupied,

    #[error("No remaining tile could pair with this one")]
    NoEligiblePartner,
}

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Not your turn")]
    NotYourTurn,

    #[error("Invalid action for current phase")]
    InvalidPhase,

    #[error("No such player")]
    UnknownPlayer,

    #[error("No such tile")]
    UnknownTile,

    #[error("Dice total must be between 2 and 12")]
    InvalidRoll,

    #[error("The robber must move to a different land tile")]
    InvalidRobberTarget,

    #[error("That player cannot be robbed")]
    InvalidVictim,

    #[error("Tile is not part of an entangled pair")]
    NotEntangled,

    #[error("Don't have that card")]
    NoSuchCard,

    #[error("No development cards left in deck")]
    EmptyDeck,

    #[error("Cannot afford this")]
    CannotAfford,

    #[error("Invalid trade")]
    InvalidTrade,

    #[error("Game is over")]
    GameOver,

    #[error("Illegal placement: {0}")]
    IllegalPlacement(#[from] PlacementError),

    #[error("Invalid entangle target: {0}")]
    InvalidEntangleTarget(#[from] EntangleRejection),

    #[error("No entanglement groups left")]
    ExhaustedGroupPool,
}

/// Errors raised while setting up a session
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Board(#[from] BoardError),
}

/// Something a player can build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildTarget {
    Settlement(VertexId),
    City(VertexId),
    Road(EdgeId),
}

impl BuildTarget {
    pub fn purchase(&self) -> Purchase {
        match self {
            BuildTarget::Settlement(_) => Purchase::Settlement,
            BuildTarget::City(_) => Purchase::City,
            BuildTarget::Road(_) => Purchase::Road,
        }
    }
}

/// Result of a dice roll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollOutcome {
    pub total: u8,
    /// Empty on a 7
    pub payouts: Vec<Payout>,
}

/// An entangled pair resolved by the robber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollapseReport {
    pub group: GroupId,
    /// The two tiles, in resolution order
    pub tiles: [usize; 2],
    /// What each tile became
    pub resolved: [Resource; 2],
    /// Tokens of the group turned into resources
    pub conversions: Vec<TokenConversion>,
}

/// Result of moving the robber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobberOutcome {
    pub tile: usize,
    pub collapsed: Option<CollapseReport>,
    /// Opponents with a building on the robber's new tile
    pub steal_candidates: Vec<PlayerId>,
}

/// Progress of an entangle selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntangleProgress {
    /// First tile accepted, waiting for the second
    Pending { first: usize },
    /// Both tiles picked and entangled
    Completed { tiles: [usize; 2], group: GroupId },
}

/// Result of an interference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InterferenceOutcome {
    pub tile: usize,
    pub partner: usize,
    pub weight: f64,
    pub partner_weight: f64,
}

/// Read-only view of a session for clients
#[derive(Debug, Serialize)]
pub struct GameSnapshot<'a> {
    pub board: &'a Board,
    pub geometry: &'a Geometry,
    pub buildings: &'a [Option<Building>],
    pub roads: &'a [Option<PlayerId>],
    pub players: &'a [Player],
    pub current_player: PlayerId,
    pub phase: &'a TurnPhase,
    pub robber: Option<usize>,
    pub last_roll: Option<u8>,
    pub turn_number: u32,
    pub dev_cards_remaining: usize,
    pub free_groups: usize,
}

/// A tile pair due to collapse, read before anything mutates
struct CollapsePlan {
    group: GroupId,
    tiles: [usize; 2],
    candidates: [Resource; 2],
    weights: [f64; 2],
}

/// One game session
#[derive(Debug, Clone)]
pub struct Game {
    config: GameConfig,
    /// Land tiles and sea ring
    pub board: Board,
    /// Placement graph derived from the board
    pub geometry: Geometry,
    /// Building and road ownership
    pub ledger: Ledger,
    /// All players
    pub players: Vec<Player>,
    /// Current player index
    pub current_player: PlayerId,
    /// Current turn phase
    pub phase: TurnPhase,
    /// Tile the robber occupies; unset until first moved
    pub robber: Option<usize>,
    /// Last dice total
    pub last_roll: Option<u8>,
    /// Turn number (starts at 1)
    pub turn_number: u32,
    pool: GroupPool,
    dev_card_deck: Vec<DevelopmentCard>,
    rolled_this_turn: bool,
    pairs_requested: u8,
    pairs_created: u8,
    rng: StdRng,
}

impl Game {
    /// Create a session with the default pointy-top layout
    pub fn new(config: GameConfig) -> Result<Self, SetupError> {
        Self::with_projection(config, &HexLayout::default())
    }

    /// Create a session, building the placement graph through `projection`
    pub fn with_projection<P: Projection + ?Sized>(
        config: GameConfig,
        projection: &P,
    ) -> Result<Self, SetupError> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut pool = GroupPool::new(config.max_entanglement_groups);
        let generated = Board::generate(&config.board, &mut pool, &mut rng)?;
        let board = generated.board;
        let geometry = Geometry::build(&board.land_coords(), &board.sea_coords(), projection);
        let ledger = Ledger::new(&geometry);

        let players = config
            .player_names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut player = Player::new(i as PlayerId, name.clone());
                player.resources = config.starting_resources;
                player
            })
            .collect();

        let mut dev_card_deck = DevelopmentCard::standard_deck();
        DevelopmentCard::shuffle_deck(&mut dev_card_deck, &mut rng);

        tracing::info!(
            target: "quantum_catan::game",
            players = config.player_names.len(),
            seed = ?config.seed,
            tiles = board.tiles.len(),
            vertices = geometry.vertex_count(),
            pairs = generated.pairs_created,
            "game.created"
        );

        Ok(Self {
            config,
            board,
            geometry,
            ledger,
            players,
            current_player: 0,
            phase: TurnPhase::Idle,
            robber: None,
            last_roll: None,
            turn_number: 1,
            pool,
            dev_card_deck,
            rolled_this_turn: false,
            pairs_requested: generated.pairs_requested,
            pairs_created: generated.pairs_created,
            rng,
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn pool(&self) -> &GroupPool {
        &self.pool
    }

    /// Entangled pairs asked for and actually made at board generation
    pub fn generation_report(&self) -> (u8, u8) {
        (self.pairs_requested, self.pairs_created)
    }

    pub fn dev_cards_remaining(&self) -> usize {
        self.dev_card_deck.len()
    }

    pub fn has_rolled(&self) -> bool {
        self.rolled_this_turn
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn get_player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id as usize)
    }

    fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player, GameError> {
        self.players
            .get_mut(id as usize)
            .ok_or(GameError::UnknownPlayer)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, TurnPhase::Finished { .. })
    }

    pub fn winner(&self) -> Option<PlayerId> {
        match self.phase {
            TurnPhase::Finished { winner } => Some(winner),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> GameSnapshot<'_> {
        GameSnapshot {
            board: &self.board,
            geometry: &self.geometry,
            buildings: self.ledger.buildings(),
            roads: self.ledger.roads(),
            players: &self.players,
            current_player: self.current_player,
            phase: &self.phase,
            robber: self.robber,
            last_roll: self.last_roll,
            turn_number: self.turn_number,
            dev_cards_remaining: self.dev_card_deck.len(),
            free_groups: self.pool.available(),
        }
    }

    /// The acting player must be known and it must be their turn
    fn ensure_turn(&self, player: PlayerId) -> Result<(), GameError> {
        if self.is_finished() {
            return Err(GameError::GameOver);
        }
        if player as usize >= self.players.len() {
            return Err(GameError::UnknownPlayer);
        }
        if player != self.current_player {
            return Err(GameError::NotYourTurn);
        }
        Ok(())
    }

    fn ensure_idle(&self, player: PlayerId) -> Result<(), GameError> {
        self.ensure_turn(player)?;
        if self.phase != TurnPhase::Idle {
            return Err(GameError::InvalidPhase);
        }
        Ok(())
    }

    // ==================== Dice & Distribution ====================

    /// Roll (or use `roll`) and pay out. A 7 pays nothing and requires the
    /// robber to move.
    pub fn roll_and_distribute(
        &mut self,
        player: PlayerId,
        roll: Option<u8>,
    ) -> Result<RollOutcome, GameError> {
        self.ensure_idle(player)?;
        if self.rolled_this_turn {
            return Err(GameError::InvalidPhase);
        }
        let total = match roll {
            Some(total) if (2..=12).contains(&total) => total,
            Some(_) => return Err(GameError::InvalidRoll),
            None => self.rng.gen_range(1..=6) + self.rng.gen_range(1..=6),
        };

        self.rolled_this_turn = true;
        self.last_roll = Some(total);

        if total == 7 {
            self.phase = TurnPhase::AwaitingRobberPlacement;
            tracing::debug!(target: "quantum_catan::game", player, "game.robber.required");
            return Ok(RollOutcome {
                total,
                payouts: Vec::new(),
            });
        }

        let payouts = payouts_for_roll(&self.board, &self.geometry, &self.ledger, total, self.robber);
        for payout in &payouts {
            match *payout {
                Payout::Resource {
                    player,
                    resource,
                    amount,
                    ..
                } => self.player_mut(player)?.resources.add(resource, amount),
                Payout::Token { player, token } => self.player_mut(player)?.tokens.push(token),
            }
        }

        Ok(RollOutcome { total, payouts })
    }

    // ==================== Building ====================

    /// Whether a settlement could stand on `vertex` (ignores roads)
    pub fn can_place_settlement(&self, vertex: VertexId) -> bool {
        self.ledger.can_place_settlement(&self.geometry, vertex)
    }

    pub fn can_place_road(&self, player: PlayerId, edge: EdgeId) -> bool {
        self.ledger.can_place_road(&self.geometry, player, edge)
    }

    pub fn can_upgrade_to_city(&self, player: PlayerId, vertex: VertexId) -> bool {
        self.ledger.can_upgrade_to_city(player, vertex)
    }

    pub fn player_can_afford(&self, player: PlayerId, purchase: Purchase) -> bool {
        self.get_player(player)
            .is_some_and(|p| p.can_afford(purchase))
    }

    /// Settlements placed before this count are free and need no road
    fn is_founding(&self, player: &Player) -> bool {
        ((player.settlements.len() + player.cities.len()) as u32) < self.config.founding_settlements
    }

    /// Build a settlement, city or road for the current player
    pub fn place_building(&mut self, player: PlayerId, target: BuildTarget) -> Result<(), GameError> {
        self.ensure_idle(player)?;
        let owner = self.get_player(player).ok_or(GameError::UnknownPlayer)?;
        let purchase = target.purchase();
        let free = matches!(target, BuildTarget::Settlement(_)) && self.is_founding(owner);

        if !owner.has_piece_for(purchase) {
            return Err(PlacementError::NoPiecesRemaining.into());
        }
        match target {
            BuildTarget::Settlement(v) => self.ledger.check_settlement(&self.geometry, player, v, free)?,
            BuildTarget::City(v) => self.ledger.check_city(player, v)?,
            BuildTarget::Road(e) => self.ledger.check_road(&self.geometry, player, e)?,
        }
        if !free && !owner.can_afford(purchase) {
            return Err(PlacementError::InsufficientResources.into());
        }

        let Some(owner) = self.players.get_mut(player as usize) else {
            return Err(GameError::UnknownPlayer);
        };
        if !free {
            owner.pay(purchase);
        }
        match target {
            BuildTarget::Settlement(v) => {
                owner.add_settlement(v);
                self.ledger.place_settlement(v, player);
            }
            BuildTarget::City(v) => {
                owner.upgrade_settlement(v);
                self.ledger.upgrade_to_city(v, player);
            }
            BuildTarget::Road(e) => {
                owner.add_road(e);
                self.ledger.place_road(e, player);
            }
        }
        tracing::debug!(target: "quantum_catan::game", player, build = ?target, free, "game.building.placed");

        if !matches!(target, BuildTarget::City(_)) {
            self.update_longest_road();
        }
        self.check_win(player);
        Ok(())
    }

    // ==================== Robber & Collapse ====================

    /// Land tiles the robber may move to
    pub fn robber_targets(&self) -> Vec<usize> {
        (0..self.board.tiles.len())
            .filter(|&t| self.robber != Some(t))
            .collect()
    }

    /// Move the robber. Landing on a quantum tile collapses its pair and
    /// asks for a new pair to entangle; landing elsewhere offers a steal.
    pub fn move_robber(&mut self, player: PlayerId, tile: usize) -> Result<RobberOutcome, GameError> {
        self.ensure_turn(player)?;
        if self.phase != TurnPhase::AwaitingRobberPlacement {
            return Err(GameError::InvalidPhase);
        }
        if tile >= self.board.tiles.len() {
            return Err(GameError::UnknownTile);
        }
        if self.robber == Some(tile) {
            return Err(GameError::InvalidRobberTarget);
        }
        let plan = self.collapse_plan(tile)?;

        self.robber = Some(tile);
        let steal_candidates: Vec<PlayerId> = self
            .ledger
            .owners_on_tile(&self.geometry, tile)
            .into_iter()
            .filter(|&owner| owner != player)
            .collect();
        tracing::debug!(target: "quantum_catan::game", player, tile, ?steal_candidates, "game.robber.moved");

        let collapsed = plan.map(|plan| self.collapse(plan));
        let can_entangle =
            (0..self.board.tiles.len()).any(|t| self.check_entangle_target(t, None).is_ok());

        self.phase = match &collapsed {
            Some(_) if !can_entangle => {
                tracing::warn!(target: "quantum_catan::collapse", "entangle.skipped.no_eligible_pairs");
                TurnPhase::Idle
            }
            Some(_) => TurnPhase::AwaitingEntangleSelection { first: None },
            None if steal_candidates.is_empty() => TurnPhase::Idle,
            None => TurnPhase::AwaitingVictimChoice {
                candidates: steal_candidates.clone(),
            },
        };

        Ok(RobberOutcome {
            tile,
            collapsed,
            steal_candidates,
        })
    }

    /// Read the pair a robber landing on `tile` would collapse
    fn collapse_plan(&self, tile: usize) -> Result<Option<CollapsePlan>, GameError> {
        let Some(state) = self.board.tiles[tile].superposition() else {
            return Ok(None);
        };
        let members = self.board.group_members(state.group);
        let &[a, b] = members.as_slice() else {
            return Err(GameError::NotEntangled);
        };
        let (Some(sa), Some(sb)) = (
            self.board.tiles[a].superposition(),
            self.board.tiles[b].superposition(),
        ) else {
            return Err(GameError::NotEntangled);
        };

        Ok(Some(CollapsePlan {
            group: state.group,
            tiles: [a, b],
            candidates: sa.candidates,
            weights: [sa.weight, sb.weight],
        }))
    }

    /// Resolve both tiles of a pair, free the group id and settle its tokens
    fn collapse(&mut self, plan: CollapsePlan) -> CollapseReport {
        let resolved = collapse_pair(plan.candidates, plan.weights, &mut self.rng);

        for (&tile, &resource) in plan.tiles.iter().zip(&resolved) {
            if let Some(number) = self.board.tiles[tile].number() {
                self.board.tiles[tile].kind = TileKind::Classical { resource, number };
            }
        }
        self.pool.release(plan.group);

        let mut conversions = Vec::new();
        for player in &mut self.players {
            for token in player.take_tokens(plan.group) {
                let resource = if token.origin_tile == plan.tiles[1] {
                    resolved[1]
                } else {
                    resolved[0]
                };
                player.resources.add(resource, 1);
                conversions.push(TokenConversion {
                    player: player.id,
                    origin_tile: token.origin_tile,
                    resource,
                });
            }
        }

        tracing::info!(
            target: "quantum_catan::collapse",
            group = %plan.group,
            tiles = ?plan.tiles,
            resolved = ?resolved,
            tokens = conversions.len(),
            "pair.collapsed"
        );

        CollapseReport {
            group: plan.group,
            tiles: plan.tiles,
            resolved,
            conversions,
        }
    }

    /// Tiles that would be accepted by the next [`Game::entangle_select`]
    pub fn entangle_candidates(&self) -> Vec<usize> {
        let TurnPhase::AwaitingEntangleSelection { first } = self.phase else {
            return Vec::new();
        };
        (0..self.board.tiles.len())
            .filter(|&t| self.check_entangle_target(t, first).is_ok())
            .collect()
    }

    fn check_entangle_target(&self, tile: usize, first: Option<usize>) -> Result<(), GameError> {
        let candidate = self.board.tiles.get(tile).ok_or(GameError::UnknownTile)?;
        if first == Some(tile) {
            return Err(EntangleRejection::AlreadySelected.into());
        }
        let resource = match candidate.kind {
            TileKind::Desert => return Err(EntangleRejection::DesertTile.into()),
            TileKind::Quantum { .. } => return Err(EntangleRejection::QuantumTile.into()),
            TileKind::Classical { resource, .. } => resource,
        };
        if self.robber == Some(tile) {
            return Err(EntangleRejection::RobberOccupied.into());
        }

        match first.and_then(|f| self.board.tiles[f].resource()) {
            Some(chosen) if chosen == resource => {
                Err(EntangleRejection::DuplicateResource(resource).into())
            }
            Some(_) => Ok(()),
            // A first pick needs at least one tile it could pair with
            None => {
                let pairable = self.board.tiles.iter().enumerate().any(|(other, t)| {
                    other != tile
                        && self.robber != Some(other)
                        && t.resource().is_some_and(|r| r != resource)
                });
                if pairable {
                    Ok(())
                } else {
                    Err(EntangleRejection::NoEligiblePartner.into())
                }
            }
        }
    }

    /// Pick one tile of the next entangled pair
    pub fn entangle_select(
        &mut self,
        player: PlayerId,
        tile: usize,
    ) -> Result<EntangleProgress, GameError> {
        self.ensure_turn(player)?;
        let TurnPhase::AwaitingEntangleSelection { first } = self.phase else {
            return Err(GameError::InvalidPhase);
        };
        if let Err(err) = self.check_entangle_target(tile, first) {
            tracing::debug!(target: "quantum_catan::collapse", tile, %err, "entangle.rejected");
            return Err(err);
        }

        let Some(first) = first else {
            self.phase = TurnPhase::AwaitingEntangleSelection { first: Some(tile) };
            tracing::debug!(target: "quantum_catan::collapse", tile, "entangle.first_selected");
            return Ok(EntangleProgress::Pending { first: tile });
        };

        let Some(group) = self.pool.allocate() else {
            tracing::warn!(target: "quantum_catan::collapse", "entangle.pool_exhausted");
            return Err(GameError::ExhaustedGroupPool);
        };
        if !self.board.entangle(first, tile, group) {
            self.pool.release(group);
            return Err(EntangleRejection::QuantumTile.into());
        }
        self.phase = TurnPhase::Idle;

        tracing::info!(
            target: "quantum_catan::collapse",
            group = %group,
            first,
            second = tile,
            "pair.entangled"
        );
        Ok(EntangleProgress::Completed {
            tiles: [first, tile],
            group,
        })
    }

    /// The entangled sibling of a tile
    pub fn partner_of(&self, tile: usize) -> Option<usize> {
        self.board.partner_of(tile)
    }

    /// Spend an Interference card to push `tile`'s weight one step up the
    /// ladder at its partner's expense
    pub fn apply_interference(
        &mut self,
        player: PlayerId,
        tile: usize,
    ) -> Result<InterferenceOutcome, GameError> {
        self.ensure_idle(player)?;
        let target = self.board.tiles.get(tile).ok_or(GameError::UnknownTile)?;
        let state = target.superposition().ok_or(GameError::NotEntangled)?;
        let partner = self.board.partner_of(tile).ok_or(GameError::NotEntangled)?;
        let partner_state = self.board.tiles[partner]
            .superposition()
            .ok_or(GameError::NotEntangled)?;
        let (weight, partner_weight) = interfere(state.weight, partner_state.weight);

        if !self.player_mut(player)?.play_dev_card(DevelopmentCard::Interference) {
            return Err(GameError::NoSuchCard);
        }
        for (t, w) in [(tile, weight), (partner, partner_weight)] {
            if let TileKind::Quantum { state, .. } = &mut self.board.tiles[t].kind {
                state.weight = w;
            }
        }

        tracing::debug!(
            target: "quantum_catan::collapse",
            player,
            tile,
            partner,
            weight,
            partner_weight,
            "interference.applied"
        );
        Ok(InterferenceOutcome {
            tile,
            partner,
            weight,
            partner_weight,
        })
    }

    /// Take a random resource from a player next to the robber
    pub fn steal(&mut self, thief: PlayerId, victim: PlayerId) -> Result<Option<Resource>, GameError> {
        self.ensure_turn(thief)?;
        let TurnPhase::AwaitingVictimChoice { candidates } = &self.phase else {
            return Err(GameError::InvalidPhase);
        };
        if !candidates.contains(&victim) {
            return Err(GameError::InvalidVictim);
        }

        let stolen = {
            let Some(target) = self.players.get_mut(victim as usize) else {
                return Err(GameError::UnknownPlayer);
            };
            target.resources.steal_random(&mut self.rng)
        };
        if let Some(resource) = stolen {
            self.player_mut(thief)?.resources.add(resource, 1);
        }
        self.phase = TurnPhase::Idle;

        tracing::debug!(target: "quantum_catan::game", thief, victim, ?stolen, "game.steal");
        Ok(stolen)
    }

    // ==================== Development Cards ====================

    pub fn buy_dev_card(&mut self, player: PlayerId) -> Result<DevelopmentCard, GameError> {
        self.ensure_idle(player)?;
        if self.dev_card_deck.is_empty() {
            return Err(GameError::EmptyDeck);
        }
        if !self.player_can_afford(player, Purchase::DevelopmentCard) {
            return Err(GameError::CannotAfford);
        }
        let card = self.dev_card_deck.pop().ok_or(GameError::EmptyDeck)?;

        let buyer = self.player_mut(player)?;
        buyer.pay(Purchase::DevelopmentCard);
        buyer.dev_cards_bought_this_turn.push(card);

        self.check_win(player);
        Ok(card)
    }

    /// Play a knight: the robber must move next
    pub fn play_knight(&mut self, player: PlayerId) -> Result<(), GameError> {
        self.ensure_idle(player)?;
        if !self.player_mut(player)?.play_dev_card(DevelopmentCard::Knight) {
            return Err(GameError::NoSuchCard);
        }
        self.phase = TurnPhase::AwaitingRobberPlacement;
        self.update_largest_army();
        self.check_win(player);
        Ok(())
    }

    // ==================== Trading ====================

    /// Best rate the player gets for giving away `resource`
    pub fn trade_ratio(&self, player: PlayerId, resource: Resource) -> u32 {
        self.board
            .sea_tiles
            .iter()
            .zip(&self.geometry.port_map)
            .filter_map(|(sea, vertices)| {
                let port = sea.port?;
                let owned = vertices
                    .iter()
                    .any(|&v| self.ledger.building(v).is_some_and(|b| b.owner == player));
                owned.then_some(port)
            })
            .filter_map(|port| match port {
                Harbor::Specific(r) if r != resource => None,
                _ => Some(port.rate()),
            })
            .min()
            .unwrap_or(BANK_RATE)
    }

    /// Trade with the bank at the player's best rate. Returns the rate used.
    pub fn maritime_trade(
        &mut self,
        player: PlayerId,
        give: Resource,
        receive: Resource,
    ) -> Result<u32, GameError> {
        self.ensure_idle(player)?;
        if give == receive {
            return Err(GameError::InvalidTrade);
        }
        let ratio = self.trade_ratio(player, give);
        let trader = self.player_mut(player)?;
        if trader.resources.get(give) < ratio {
            return Err(GameError::CannotAfford);
        }
        trader.resources[give] -= ratio;
        trader.resources.add(receive, 1);

        tracing::debug!(target: "quantum_catan::game", player, %give, %receive, ratio, "game.maritime_trade");
        Ok(ratio)
    }

    // ==================== Turn Management ====================

    /// Hand the turn to the next player. Returns the new current player.
    pub fn end_turn(&mut self, player: PlayerId) -> Result<PlayerId, GameError> {
        self.ensure_idle(player)?;
        self.player_mut(player)?.end_turn();
        self.current_player = ((player as usize + 1) % self.players.len()) as PlayerId;
        self.turn_number += 1;
        self.rolled_this_turn = false;
        Ok(self.current_player)
    }

    pub fn longest_road_holder(&self) -> Option<PlayerId> {
        self.players.iter().find(|p| p.has_longest_road).map(|p| p.id)
    }

    pub fn largest_army_holder(&self) -> Option<PlayerId> {
        self.players.iter().find(|p| p.has_largest_army).map(|p| p.id)
    }

    fn update_longest_road(&mut self) {
        let lengths: Vec<u32> = self
            .players
            .iter()
            .map(|p| self.ledger.longest_road(&self.geometry, p.id))
            .collect();
        let best = lengths.iter().copied().max().unwrap_or(0);
        let current = self.longest_road_holder();

        let new_holder = if best < MIN_LONGEST_ROAD {
            None
        } else if current.is_some_and(|h| lengths[h as usize] == best) {
            // Ties keep the current holder
            current
        } else {
            let leaders: Vec<usize> = (0..lengths.len()).filter(|&i| lengths[i] == best).collect();
            match leaders.as_slice() {
                &[only] => Some(only as PlayerId),
                _ => None,
            }
        };

        if new_holder != current {
            for player in &mut self.players {
                player.has_longest_road = Some(player.id) == new_holder;
            }
        }
    }

    fn update_largest_army(&mut self) {
        let current = self.largest_army_holder();
        let to_beat = current
            .and_then(|h| self.get_player(h))
            .map_or(MIN_LARGEST_ARMY - 1, |p| p.knightmight);

        let challenger = self
            .players
            .iter()
            .filter(|p| p.knightmight > to_beat)
            .max_by_key(|p| p.knightmight)
            .map(|p| p.id);

        if let Some(leader) = challenger {
            for player in &mut self.players {
                player.has_largest_army = player.id == leader;
            }
        }
    }

    pub fn score(&self, player: PlayerId) -> u32 {
        self.get_player(player).map_or(0, Player::score)
    }

    fn check_win(&mut self, player: PlayerId) {
        let score = self.score(player);
        if score >= self.config.victory_points_to_win {
            self.phase = TurnPhase::Finished { winner: player };
            tracing::info!(target: "quantum_catan::game", player, score, "game.won");
        }
    }
}
