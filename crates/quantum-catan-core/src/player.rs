//! Player state and resource management.
//!
//! This module contains:
//! - Player struct with resources, tokens, development cards, and awards
//! - ResourceHand, a fixed-size vector indexed by resource
//! - Development card types and deck management
//! - Purchase costs

use crate::board::{PlayerId, Resource};
use crate::geometry::{EdgeId, VertexId};
use crate::quantum::{GroupId, Token};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Player color for UI rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerColor {
    Red,
    Blue,
    Green,
    Brown,
}

impl PlayerColor {
    /// Get color for a player index
    pub fn for_player(id: PlayerId) -> Self {
        match id % 4 {
            0 => PlayerColor::Red,
            1 => PlayerColor::Blue,
            2 => PlayerColor::Green,
            _ => PlayerColor::Brown,
        }
    }
}

/// Development card types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DevelopmentCard {
    /// Move robber and steal, counts toward Largest Army
    Knight,
    /// Immediately worth 1 VP
    VictoryPoint,
    /// Skew an entangled pair toward one of its tiles
    Interference,
}

impl DevelopmentCard {
    /// Create the development card deck (25 cards)
    pub fn standard_deck() -> Vec<DevelopmentCard> {
        let mut deck = Vec::with_capacity(25);
        deck.extend(std::iter::repeat(DevelopmentCard::Knight).take(14));
        deck.extend(std::iter::repeat(DevelopmentCard::VictoryPoint).take(5));
        deck.extend(std::iter::repeat(DevelopmentCard::Interference).take(6));
        deck
    }

    /// Shuffle a deck
    pub fn shuffle_deck<R: Rng>(deck: &mut [DevelopmentCard], rng: &mut R) {
        deck.shuffle(rng);
    }

    /// Whether this card can be played (VP cards are never "played")
    pub fn is_playable(&self) -> bool {
        !matches!(self, DevelopmentCard::VictoryPoint)
    }
}

/// Resource counts indexed by [`Resource`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceHand([u32; 5]);

impl ResourceHand {
    /// Create an empty hand
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hand with specific amounts
    pub fn with_amounts(brick: u32, lumber: u32, ore: u32, grain: u32, wool: u32) -> Self {
        Self([brick, lumber, ore, grain, wool])
    }

    /// Total number of resource cards
    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }

    /// Check if hand is empty
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Get count of a specific resource
    pub fn get(&self, resource: Resource) -> u32 {
        self[resource]
    }

    /// Add resources to hand
    pub fn add(&mut self, resource: Resource, amount: u32) {
        self[resource] += amount;
    }

    /// Check if can afford a cost
    pub fn can_afford(&self, cost: &ResourceHand) -> bool {
        Resource::ALL.iter().all(|&r| self[r] >= cost[r])
    }

    /// Try to subtract, returning false (and leaving the hand alone) if
    /// insufficient
    pub fn try_subtract(&mut self, cost: &ResourceHand) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        for resource in Resource::ALL {
            self[resource] -= cost[resource];
        }
        true
    }

    /// Remove a random resource card (for robber stealing)
    pub fn steal_random<R: Rng>(&mut self, rng: &mut R) -> Option<Resource> {
        let available: Vec<Resource> = self
            .iter()
            .flat_map(|(r, n)| std::iter::repeat(r).take(n as usize))
            .collect();

        let resource = *available.choose(rng)?;
        self[resource] -= 1;
        Some(resource)
    }

    /// Non-zero entries
    pub fn iter(&self) -> impl Iterator<Item = (Resource, u32)> + '_ {
        Resource::ALL
            .iter()
            .map(|&r| (r, self[r]))
            .filter(|(_, n)| *n > 0)
    }
}

impl Index<Resource> for ResourceHand {
    type Output = u32;

    fn index(&self, resource: Resource) -> &u32 {
        &self.0[resource.index()]
    }
}

impl IndexMut<Resource> for ResourceHand {
    fn index_mut(&mut self, resource: Resource) -> &mut u32 {
        &mut self.0[resource.index()]
    }
}

/// Things a player can buy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Purchase {
    Road,
    Settlement,
    City,
    DevelopmentCard,
}

impl Purchase {
    /// Cost of this purchase
    pub fn cost(&self) -> ResourceHand {
        match self {
            // 1 brick, 1 lumber
            Purchase::Road => ResourceHand::with_amounts(1, 1, 0, 0, 0),
            // 1 brick, 1 lumber, 1 grain, 1 wool
            Purchase::Settlement => ResourceHand::with_amounts(1, 1, 0, 1, 1),
            // 3 ore, 2 grain
            Purchase::City => ResourceHand::with_amounts(0, 0, 3, 2, 0),
            // 1 ore, 1 grain, 1 wool
            Purchase::DevelopmentCard => ResourceHand::with_amounts(0, 0, 1, 1, 1),
        }
    }
}

/// A single player's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Player ID (0-3)
    pub id: PlayerId,
    /// Display name
    pub name: String,
    /// Player color
    pub color: PlayerColor,
    /// Current resources
    pub resources: ResourceHand,
    /// Uncollapsed claims on entangled tiles
    pub tokens: Vec<Token>,
    /// Development cards in hand (unplayed)
    pub dev_cards: Vec<DevelopmentCard>,
    /// Development cards bought this turn (can't be played same turn)
    pub dev_cards_bought_this_turn: Vec<DevelopmentCard>,
    /// Knights played (army size)
    pub knightmight: u32,
    /// Whether this player has the Longest Road award
    pub has_longest_road: bool,
    /// Whether this player has the Largest Army award
    pub has_largest_army: bool,
    /// Vertices holding this player's settlements
    pub settlements: Vec<VertexId>,
    /// Vertices holding this player's cities
    pub cities: Vec<VertexId>,
    /// Road slots holding this player's roads
    pub roads: Vec<EdgeId>,
    /// Number of settlements remaining to build
    pub settlements_remaining: u32,
    /// Number of cities remaining to build
    pub cities_remaining: u32,
    /// Number of roads remaining to build
    pub roads_remaining: u32,
}

impl Player {
    /// Create a new player
    pub fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            color: PlayerColor::for_player(id),
            resources: ResourceHand::new(),
            tokens: Vec::new(),
            dev_cards: Vec::new(),
            dev_cards_bought_this_turn: Vec::new(),
            knightmight: 0,
            has_longest_road: false,
            has_largest_army: false,
            settlements: Vec::new(),
            cities: Vec::new(),
            roads: Vec::new(),
            settlements_remaining: 5,
            cities_remaining: 4,
            roads_remaining: 15,
        }
    }

    /// Total victory points: buildings, VP cards and awards
    pub fn score(&self) -> u32 {
        let mut vp = self.settlements.len() as u32 + 2 * self.cities.len() as u32;

        if self.has_longest_road {
            vp += 2;
        }
        if self.has_largest_army {
            vp += 2;
        }

        vp + self.victory_point_cards()
    }

    /// VP cards held (including ones bought this turn)
    pub fn victory_point_cards(&self) -> u32 {
        self.dev_cards
            .iter()
            .chain(&self.dev_cards_bought_this_turn)
            .filter(|c| matches!(c, DevelopmentCard::VictoryPoint))
            .count() as u32
    }

    /// Whether the player holds the resources for a purchase
    pub fn can_afford(&self, purchase: Purchase) -> bool {
        self.resources.can_afford(&purchase.cost())
    }

    /// Whether a piece of the right kind is still in the player's supply
    pub fn has_piece_for(&self, purchase: Purchase) -> bool {
        match purchase {
            Purchase::Road => self.roads_remaining > 0,
            Purchase::Settlement => self.settlements_remaining > 0,
            Purchase::City => self.cities_remaining > 0,
            Purchase::DevelopmentCard => true,
        }
    }

    /// Pay for a purchase. Returns false (nothing deducted) if unaffordable.
    pub fn pay(&mut self, purchase: Purchase) -> bool {
        self.resources.try_subtract(&purchase.cost())
    }

    /// Record a settlement on the board
    pub fn add_settlement(&mut self, vertex: VertexId) {
        self.settlements_remaining -= 1;
        self.settlements.push(vertex);
    }

    /// Swap a settlement for a city (the settlement piece returns to supply)
    pub fn upgrade_settlement(&mut self, vertex: VertexId) {
        self.settlements.retain(|&v| v != vertex);
        self.settlements_remaining += 1;
        self.cities_remaining -= 1;
        self.cities.push(vertex);
    }

    /// Record a road on the board
    pub fn add_road(&mut self, edge: EdgeId) {
        self.roads_remaining -= 1;
        self.roads.push(edge);
    }

    /// Called at end of turn - move bought cards to playable pile
    pub fn end_turn(&mut self) {
        self.dev_cards.append(&mut self.dev_cards_bought_this_turn);
    }

    /// Check if player has a playable development card of given type
    pub fn has_playable_dev_card(&self, card_type: DevelopmentCard) -> bool {
        self.dev_cards.iter().any(|c| *c == card_type)
    }

    /// Play a development card (removes it from hand)
    pub fn play_dev_card(&mut self, card_type: DevelopmentCard) -> bool {
        if !card_type.is_playable() {
            return false;
        }
        if let Some(pos) = self.dev_cards.iter().position(|c| *c == card_type) {
            self.dev_cards.remove(pos);
            if matches!(card_type, DevelopmentCard::Knight) {
                self.knightmight += 1;
            }
            true
        } else {
            false
        }
    }

    /// Take every token minted from a group out of the player's hand
    pub fn take_tokens(&mut self, group: GroupId) -> Vec<Token> {
        let (taken, kept): (Vec<Token>, Vec<Token>) =
            self.tokens.drain(..).partition(|t| t.group == group);
        self.tokens = kept;
        taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_hand_total() {
        let hand = ResourceHand::with_amounts(1, 2, 3, 4, 5);
        assert_eq!(hand.total(), 15);
        assert_eq!(hand[Resource::Ore], 3);
        assert_eq!(hand.get(Resource::Wool), 5);
    }

    #[test]
    fn test_resource_hand_can_afford() {
        let hand = ResourceHand::with_amounts(2, 2, 2, 2, 2);
        let cost = ResourceHand::with_amounts(1, 1, 1, 1, 1);
        assert!(hand.can_afford(&cost));

        let expensive = ResourceHand::with_amounts(3, 0, 0, 0, 0);
        assert!(!hand.can_afford(&expensive));
    }

    #[test]
    fn test_try_subtract_leaves_hand_on_failure() {
        let mut hand = ResourceHand::with_amounts(1, 0, 0, 0, 0);
        assert!(!hand.try_subtract(&Purchase::Road.cost()));
        assert_eq!(hand, ResourceHand::with_amounts(1, 0, 0, 0, 0));

        hand.add(Resource::Lumber, 1);
        assert!(hand.try_subtract(&Purchase::Road.cost()));
        assert!(hand.is_empty());
    }

    #[test]
    fn test_purchase_costs() {
        assert_eq!(Purchase::Road.cost().total(), 2);
        assert_eq!(Purchase::Settlement.cost().total(), 4);
        assert_eq!(Purchase::City.cost().total(), 5);
        assert_eq!(Purchase::DevelopmentCard.cost().total(), 3);
    }

    #[test]
    fn test_dev_card_deck_size() {
        let deck = DevelopmentCard::standard_deck();
        assert_eq!(deck.len(), 25);

        let knights = deck
            .iter()
            .filter(|c| matches!(c, DevelopmentCard::Knight))
            .count();
        assert_eq!(knights, 14);
        assert!(deck.contains(&DevelopmentCard::Interference));
    }

    #[test]
    fn test_player_score() {
        let mut player = Player::new(0, "Test".to_string());
        assert_eq!(player.score(), 0);

        player.add_settlement(3);
        player.add_settlement(9);
        assert_eq!(player.score(), 2);

        player.upgrade_settlement(3);
        assert_eq!(player.score(), 3);
        assert_eq!(player.settlements_remaining, 4);
        assert_eq!(player.cities_remaining, 3);

        player.has_longest_road = true;
        assert_eq!(player.score(), 5);

        player.dev_cards.push(DevelopmentCard::VictoryPoint);
        assert_eq!(player.score(), 6);
    }

    #[test]
    fn test_dev_card_bought_this_turn() {
        let mut player = Player::new(0, "Test".to_string());
        player.dev_cards_bought_this_turn.push(DevelopmentCard::Knight);

        assert!(!player.has_playable_dev_card(DevelopmentCard::Knight));
        player.end_turn();
        assert!(player.has_playable_dev_card(DevelopmentCard::Knight));

        assert!(player.play_dev_card(DevelopmentCard::Knight));
        assert_eq!(player.knightmight, 1);
        assert!(!player.play_dev_card(DevelopmentCard::Knight));
    }

    #[test]
    fn test_victory_point_cards_stay_in_hand() {
        let mut player = Player::new(0, "Test".to_string());
        player.dev_cards.push(DevelopmentCard::VictoryPoint);

        assert!(!player.play_dev_card(DevelopmentCard::VictoryPoint));
        assert_eq!(player.dev_cards, vec![DevelopmentCard::VictoryPoint]);
        assert_eq!(player.score(), 1);
    }

    #[test]
    fn test_hand_iter_skips_empty_resources() {
        let hand = ResourceHand::with_amounts(2, 0, 1, 0, 0);
        let entries: Vec<_> = hand.iter().collect();
        assert_eq!(entries, vec![(Resource::Brick, 2), (Resource::Ore, 1)]);
    }

    #[test]
    fn test_take_tokens_filters_by_group() {
        let mut player = Player::new(1, "Test".to_string());
        let candidates = [Resource::Ore, Resource::Grain];
        player.tokens = vec![
            Token { group: GroupId(1), origin_tile: 4, candidates },
            Token { group: GroupId(2), origin_tile: 7, candidates },
            Token { group: GroupId(1), origin_tile: 5, candidates },
        ];

        let taken = player.take_tokens(GroupId(1));
        assert_eq!(taken.len(), 2);
        assert_eq!(player.tokens.len(), 1);
        assert_eq!(player.tokens[0].group, GroupId(2));
    }

    #[test]
    fn test_steal_random() {
        let mut hand = ResourceHand::with_amounts(0, 0, 0, 1, 0);
        let mut rng = rand::thread_rng();

        let stolen = hand.steal_random(&mut rng);
        assert_eq!(stolen, Some(Resource::Grain));
        assert!(hand.is_empty());
        assert_eq!(hand.steal_random(&mut rng), None);
    }
}
