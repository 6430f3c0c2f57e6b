//! Player state and resource management.
//!
//! This module contains:
//! - Player struct with resources, pieces, development cards and award counters
//! - ResourceHand for managing resource counts
//! - Development card types and the standard deck
//! - Building costs

use crate::board::{PlayerId, Resource};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Player color for UI rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    Red,
    Blue,
    White,
    Orange,
}

impl PlayerColor {
    /// Get color for a seat
    pub fn for_player(id: PlayerId) -> Self {
        match id % 4 {
            0 => PlayerColor::Red,
            1 => PlayerColor::Blue,
            2 => PlayerColor::White,
            _ => PlayerColor::Orange,
        }
    }
}

/// Development card types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevelopmentCard {
    /// Move robber and steal, counts toward Largest Army
    Knight,
    /// Place up to 2 roads for free
    RoadBuilding,
    /// Take any 2 resources from the bank
    YearOfPlenty,
    /// All opponents give you all of one resource type
    Monopoly,
    /// Worth 1 VP while held, never played
    VictoryPoint,
}

impl DevelopmentCard {
    /// Create the development card deck (31 cards, unshuffled)
    pub fn standard_deck() -> Vec<DevelopmentCard> {
        let mut deck = Vec::with_capacity(31);
        deck.extend(std::iter::repeat(DevelopmentCard::Knight).take(14));
        deck.extend(std::iter::repeat(DevelopmentCard::RoadBuilding).take(5));
        deck.extend(std::iter::repeat(DevelopmentCard::YearOfPlenty).take(4));
        deck.extend(std::iter::repeat(DevelopmentCard::Monopoly).take(4));
        deck.extend(std::iter::repeat(DevelopmentCard::VictoryPoint).take(4));
        deck
    }

    /// Standard deck in random order
    pub fn shuffled_deck<R: Rng + ?Sized>(rng: &mut R) -> Vec<DevelopmentCard> {
        let mut deck = Self::standard_deck();
        deck.shuffle(rng);
        deck
    }
}

/// A hand of resources
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHand {
    pub wood: u32,
    pub brick: u32,
    pub sheep: u32,
    pub wheat: u32,
    pub ore: u32,
}

impl ResourceHand {
    /// Create an empty hand
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a hand with specific amounts
    pub fn with_amounts(wood: u32, brick: u32, sheep: u32, wheat: u32, ore: u32) -> Self {
        Self {
            wood,
            brick,
            sheep,
            wheat,
            ore,
        }
    }

    /// Create a hand with a single resource
    pub fn single(resource: Resource, amount: u32) -> Self {
        let mut hand = Self::new();
        hand.add(resource, amount);
        hand
    }

    /// Total number of resource cards
    pub fn total(&self) -> u32 {
        Resource::ALL.iter().map(|r| self.get(*r)).sum()
    }

    /// Check if hand is empty
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Get count of a specific resource
    pub fn get(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Wood => self.wood,
            Resource::Brick => self.brick,
            Resource::Sheep => self.sheep,
            Resource::Wheat => self.wheat,
            Resource::Ore => self.ore,
        }
    }

    fn slot(&mut self, resource: Resource) -> &mut u32 {
        match resource {
            Resource::Wood => &mut self.wood,
            Resource::Brick => &mut self.brick,
            Resource::Sheep => &mut self.sheep,
            Resource::Wheat => &mut self.wheat,
            Resource::Ore => &mut self.ore,
        }
    }

    /// Set count of a specific resource
    pub fn set(&mut self, resource: Resource, count: u32) {
        *self.slot(resource) = count;
    }

    /// Add resources to hand
    pub fn add(&mut self, resource: Resource, amount: u32) {
        *self.slot(resource) += amount;
    }

    /// Add another hand to this one
    pub fn add_hand(&mut self, other: &ResourceHand) {
        for r in Resource::ALL {
            self.add(r, other.get(r));
        }
    }

    /// Check if can afford a cost
    pub fn can_afford(&self, cost: &ResourceHand) -> bool {
        Resource::ALL.iter().all(|r| self.get(*r) >= cost.get(*r))
    }

    /// Subtract a cost, returning false (and leaving the hand untouched) if
    /// any count is insufficient
    pub fn try_subtract(&mut self, cost: &ResourceHand) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        for r in Resource::ALL {
            *self.slot(r) -= cost.get(r);
        }
        true
    }

    /// Take every card of one type, returning how many there were
    pub fn take_all(&mut self, resource: Resource) -> u32 {
        std::mem::take(self.slot(resource))
    }

    /// Resource types with a nonzero count
    pub fn held_kinds(&self) -> Vec<Resource> {
        Resource::ALL
            .into_iter()
            .filter(|r| self.get(*r) > 0)
            .collect()
    }

    /// Remove one card, each held card equally likely (robber steal)
    pub fn steal_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Resource> {
        let total = self.total();
        if total == 0 {
            return None;
        }

        let mut pick = rng.gen_range(0..total);
        for r in Resource::ALL {
            let count = self.get(r);
            if pick < count {
                *self.slot(r) -= 1;
                return Some(r);
            }
            pick -= count;
        }
        None
    }

    /// Remove one card of a uniformly chosen held type (discarding)
    pub fn discard_random_kind<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Resource> {
        let resource = *self.held_kinds().choose(rng)?;
        *self.slot(resource) -= 1;
        Some(resource)
    }
}

/// Building costs
pub mod costs {
    use super::ResourceHand;

    /// Cost to build a road: 1 wood, 1 brick
    pub fn road() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 0, 0, 0)
    }

    /// Cost to build a settlement: 1 wood, 1 brick, 1 sheep, 1 wheat
    pub fn settlement() -> ResourceHand {
        ResourceHand::with_amounts(1, 1, 1, 1, 0)
    }

    /// Cost to upgrade to city: 2 wheat, 3 ore
    pub fn city() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 0, 2, 3)
    }

    /// Cost to build a ship: 1 wood, 1 sheep
    pub fn ship() -> ResourceHand {
        ResourceHand::with_amounts(1, 0, 1, 0, 0)
    }

    /// Cost to buy a development card: 1 sheep, 1 wheat, 1 ore
    pub fn development_card() -> ResourceHand {
        ResourceHand::with_amounts(0, 0, 1, 1, 1)
    }
}

/// Pieces a player still has in supply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pieces {
    pub roads: u32,
    pub settlements: u32,
    pub cities: u32,
    pub ships: u32,
}

impl Default for Pieces {
    fn default() -> Self {
        Self {
            roads: 15,
            settlements: 5,
            cities: 4,
            ships: 15,
        }
    }
}

/// A single player's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Player ID (0-3)
    pub id: PlayerId,
    /// Display name
    pub name: String,
    pub color: PlayerColor,
    /// Current resources
    pub resources: ResourceHand,
    /// Pieces left in supply
    pub pieces: Pieces,
    /// Development cards in hand (unplayed)
    pub dev_cards: Vec<DevelopmentCard>,
    /// Number of knights played (for Largest Army)
    pub knights_played: u32,
    /// Length of this player's longest road, as last computed
    pub longest_road: u32,
    /// Whether a person (rather than a bot) controls this seat
    pub is_human: bool,
}

impl Player {
    /// Create a new player
    pub fn new(id: PlayerId, name: impl Into<String>, is_human: bool) -> Self {
        Self {
            id,
            name: name.into(),
            color: PlayerColor::for_player(id),
            resources: ResourceHand::new(),
            pieces: Pieces::default(),
            dev_cards: Vec::new(),
            knights_played: 0,
            longest_road: 0,
            is_human,
        }
    }

    /// Victory point cards held
    pub fn victory_point_cards(&self) -> u32 {
        self.dev_cards
            .iter()
            .filter(|c| matches!(c, DevelopmentCard::VictoryPoint))
            .count() as u32
    }

    /// Whether the player holds a card of this kind
    pub fn has_dev_card(&self, card: DevelopmentCard) -> bool {
        self.dev_cards.contains(&card)
    }

    /// Remove one card of this kind from hand, if held
    pub fn remove_dev_card(&mut self, card: DevelopmentCard) -> bool {
        match self.dev_cards.iter().position(|c| *c == card) {
            Some(index) => {
                self.dev_cards.remove(index);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_resource_hand_basics() {
        let mut hand = ResourceHand::new();
        assert!(hand.is_empty());

        hand.add(Resource::Wood, 3);
        hand.add(Resource::Ore, 2);
        assert_eq!(hand.total(), 5);
        assert_eq!(hand.get(Resource::Wood), 3);

        hand.set(Resource::Wood, 1);
        assert_eq!(hand.get(Resource::Wood), 1);
    }

    #[test]
    fn test_can_afford() {
        let hand = ResourceHand::with_amounts(1, 1, 1, 1, 0);
        assert!(hand.can_afford(&costs::settlement()));
        assert!(hand.can_afford(&costs::road()));
        assert!(!hand.can_afford(&costs::city()));
    }

    #[test]
    fn test_try_subtract_is_all_or_nothing() {
        let mut hand = ResourceHand::with_amounts(0, 0, 0, 2, 2);
        assert!(!hand.try_subtract(&costs::city()));
        assert_eq!(hand, ResourceHand::with_amounts(0, 0, 0, 2, 2));

        hand.add(Resource::Ore, 1);
        assert!(hand.try_subtract(&costs::city()));
        assert!(hand.is_empty());
    }

    #[test]
    fn test_steal_random_takes_one_held_card() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut hand = ResourceHand::with_amounts(0, 2, 0, 0, 1);

        let stolen = hand.steal_random(&mut rng).unwrap();
        assert!(matches!(stolen, Resource::Brick | Resource::Ore));
        assert_eq!(hand.total(), 2);
    }

    #[test]
    fn test_steal_from_empty_hand() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(ResourceHand::new().steal_random(&mut rng), None);
        assert_eq!(ResourceHand::new().discard_random_kind(&mut rng), None);
    }

    #[test]
    fn test_take_all() {
        let mut hand = ResourceHand::with_amounts(0, 0, 4, 0, 0);
        assert_eq!(hand.take_all(Resource::Sheep), 4);
        assert_eq!(hand.take_all(Resource::Sheep), 0);
    }

    #[test]
    fn test_standard_deck_composition() {
        let deck = DevelopmentCard::standard_deck();
        assert_eq!(deck.len(), 31);

        let count = |card: DevelopmentCard| deck.iter().filter(|c| **c == card).count();
        assert_eq!(count(DevelopmentCard::Knight), 14);
        assert_eq!(count(DevelopmentCard::RoadBuilding), 5);
        assert_eq!(count(DevelopmentCard::YearOfPlenty), 4);
        assert_eq!(count(DevelopmentCard::Monopoly), 4);
        assert_eq!(count(DevelopmentCard::VictoryPoint), 4);
    }

    #[test]
    fn test_new_player_supply() {
        let player = Player::new(2, "Blue", false);
        assert_eq!(player.color, PlayerColor::White);
        assert_eq!(player.pieces, Pieces::default());
        assert_eq!(player.pieces.roads, 15);
        assert_eq!(player.pieces.settlements, 5);
        assert_eq!(player.pieces.cities, 4);
        assert_eq!(player.pieces.ships, 15);
    }

    #[test]
    fn test_remove_dev_card() {
        let mut player = Player::new(0, "You", true);
        player.dev_cards = vec![DevelopmentCard::Knight, DevelopmentCard::VictoryPoint];

        assert!(player.remove_dev_card(DevelopmentCard::Knight));
        assert!(!player.remove_dev_card(DevelopmentCard::Knight));
        assert_eq!(player.victory_point_cards(), 1);
    }
}
