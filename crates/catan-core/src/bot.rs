//! AI bot players.
//!
//! Bots only ever pick from `GameState::valid_actions` and submit through
//! `apply_action`, the same path a person uses.
//! - Easy: Random valid moves
//! - Medium: Basic heuristics (pip-weighted settlement spots, robber on the
//!   best opponent hex, steal from the richest opponent)

use crate::actions::GameAction;
use crate::board::{EdgeId, HexId, PlayerId, Resource, VertexId};
use crate::player::costs;
use crate::rules;
use crate::state::GameState;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Bot difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotDifficulty {
    Easy,
    Medium,
}

/// A bot player that can decide on actions
pub struct Bot {
    pub player_id: PlayerId,
    pub difficulty: BotDifficulty,
    rng: StdRng,
}

impl Bot {
    pub fn new(player_id: PlayerId, difficulty: BotDifficulty) -> Self {
        Self {
            player_id,
            difficulty,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(player_id: PlayerId, difficulty: BotDifficulty, seed: u64) -> Self {
        Self {
            player_id,
            difficulty,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Choose an action from the valid actions
    pub fn choose_action(&mut self, game: &GameState) -> Option<GameAction> {
        let valid_actions = game.valid_actions(self.player_id);
        if valid_actions.is_empty() {
            return None;
        }

        match self.difficulty {
            BotDifficulty::Easy => self.choose_easy(&valid_actions),
            BotDifficulty::Medium => self.choose_medium(game, &valid_actions),
        }
    }

    /// Easy: Just pick a random valid action
    fn choose_easy(&mut self, actions: &[GameAction]) -> Option<GameAction> {
        actions.choose(&mut self.rng).cloned()
    }

    /// Medium: Use basic heuristics
    fn choose_medium(&mut self, game: &GameState, actions: &[GameAction]) -> Option<GameAction> {
        let has = |action: &GameAction| actions.contains(action);

        if has(&GameAction::RollDice) {
            // Knight first if the robber is sitting on us
            if has(&GameAction::PlayKnight) && self.robber_blocks_me(game) {
                return Some(GameAction::PlayKnight);
            }
            return Some(GameAction::RollDice);
        }
        if has(&GameAction::DiscardHalf) {
            return Some(GameAction::DiscardHalf);
        }

        // Setup placements
        let setup_settlements =
            of_kind(actions, |a| matches!(a, GameAction::PlaceInitialSettlement(_)));
        if !setup_settlements.is_empty() {
            return self.rank_settlement_spots(game, &setup_settlements).cloned();
        }
        let setup_roads = of_kind(actions, |a| matches!(a, GameAction::PlaceInitialRoad(_)));
        if !setup_roads.is_empty() {
            return self.rank_road_spots(game, &setup_roads).cloned();
        }

        // Robber
        let robber_actions = of_kind(actions, |a| matches!(a, GameAction::MoveRobber(_)));
        if !robber_actions.is_empty() {
            return self.rank_robber_spots(game, &robber_actions).cloned();
        }
        let steal_actions = of_kind(actions, |a| matches!(a, GameAction::StealFrom(_)));
        if !steal_actions.is_empty() {
            return self.choose_steal_target(game, &steal_actions);
        }

        // Answering someone else's offer
        if has(&GameAction::RejectTrade) {
            return Some(self.answer_trade(game, has(&GameAction::AcceptTrade)));
        }

        let road_actions = of_kind(actions, |a| matches!(a, GameAction::BuildRoad(_)));

        // Free roads from a road building card
        if has(&GameAction::FinishRoadBuilding) {
            return match self.rank_road_spots(game, &road_actions) {
                Some(road) => Some(road.clone()),
                None => Some(GameAction::FinishRoadBuilding),
            };
        }

        // Build settlements
        let settlement_actions = of_kind(actions, |a| matches!(a, GameAction::BuildSettlement(_)));
        if !settlement_actions.is_empty() {
            return self.rank_settlement_spots(game, &settlement_actions).cloned();
        }

        // Build cities
        let city_actions = of_kind(actions, |a| matches!(a, GameAction::BuildCity(_)));
        if !city_actions.is_empty() {
            return self.rank_settlement_spots(game, &city_actions).cloned();
        }

        if let Some(card) = self.choose_dev_card(game, actions, &road_actions) {
            return Some(card);
        }

        // Build roads with 30% chance
        if !road_actions.is_empty() && self.rng.gen_bool(0.3) {
            return self.rank_road_spots(game, &road_actions).cloned();
        }

        // Buy dev cards with 20% chance
        if has(&GameAction::BuyDevelopmentCard) && self.rng.gen_bool(0.2) {
            return Some(GameAction::BuyDevelopmentCard);
        }

        if let Some(trade) = self.choose_bank_trade(game, actions) {
            return Some(trade);
        }

        if has(&GameAction::EndTurn) {
            return Some(GameAction::EndTurn);
        }

        // Fallback to random
        actions.choose(&mut self.rng).cloned()
    }

    fn robber_blocks_me(&self, game: &GameState) -> bool {
        game.board
            .robber_hex()
            .and_then(|h| game.board.hex(h))
            .is_some_and(|hex| {
                hex.vertices
                    .iter()
                    .any(|v| game.board.vertex(*v).and_then(|v| v.owner()) == Some(self.player_id))
            })
    }

    fn choose_dev_card(
        &mut self,
        game: &GameState,
        actions: &[GameAction],
        road_actions: &[&GameAction],
    ) -> Option<GameAction> {
        let me = game.player(self.player_id)?;

        if actions.contains(&GameAction::PlayKnight)
            && (self.robber_blocks_me(game) || me.knights_played >= 2)
        {
            return Some(GameAction::PlayKnight);
        }
        if actions.contains(&GameAction::PlayRoadBuilding) && !road_actions.is_empty() {
            return Some(GameAction::PlayRoadBuilding);
        }

        // Monopoly on whatever opponents hold most of
        let monopoly = Resource::ALL
            .into_iter()
            .filter(|r| actions.contains(&GameAction::PlayMonopoly(*r)))
            .map(|r| {
                let held: u32 = game
                    .players
                    .iter()
                    .filter(|p| p.id != self.player_id)
                    .map(|p| p.resources.get(r))
                    .sum();
                (r, held)
            })
            .max_by_key(|(_, held)| *held);
        if let Some((resource, held)) = monopoly {
            if held >= 3 {
                return Some(GameAction::PlayMonopoly(resource));
            }
        }

        // Year of plenty toward a city
        let plenty = GameAction::PlayYearOfPlenty(Resource::Wheat, Resource::Ore);
        if actions.contains(&plenty) {
            return Some(plenty);
        }
        None
    }

    /// Trade the most-held resource for the least-held once the hand is big
    /// enough to risk a discard, or when it completes a city.
    fn choose_bank_trade(&self, game: &GameState, actions: &[GameAction]) -> Option<GameAction> {
        let me = game.player(self.player_id)?;
        let hand = &me.resources;
        let close_to_city = hand.wheat + hand.ore >= 4 && !hand.can_afford(&costs::city());
        if hand.total() < rules::DISCARD_THRESHOLD && !close_to_city {
            return None;
        }

        let give = Resource::ALL.into_iter().max_by_key(|r| hand.get(*r))?;
        let receive = Resource::ALL
            .into_iter()
            .filter(|r| *r != give)
            .min_by_key(|r| hand.get(*r))?;
        let trade = GameAction::BankTrade { give, receive };
        actions.contains(&trade).then_some(trade)
    }

    /// Accept when getting at least as many cards as given
    fn answer_trade(&self, game: &GameState, can_accept: bool) -> GameAction {
        let fair = game
            .pending_trade
            .as_ref()
            .is_some_and(|t| t.offer.offering.total() >= t.offer.requesting.total());
        if can_accept && fair {
            GameAction::AcceptTrade
        } else {
            GameAction::RejectTrade
        }
    }

    /// Rank settlement or city spots by tile value, picking from the top 3
    fn rank_settlement_spots<'a>(
        &mut self,
        game: &GameState,
        actions: &[&'a GameAction],
    ) -> Option<&'a GameAction> {
        let mut scored: Vec<_> = actions
            .iter()
            .map(|action| {
                let score = match action {
                    GameAction::PlaceInitialSettlement(v)
                    | GameAction::BuildSettlement(v)
                    | GameAction::BuildCity(v) => self.score_vertex(game, *v),
                    _ => 0,
                };
                (*action, score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.cmp(&a.1));

        let top = scored.iter().take(3).collect::<Vec<_>>();
        top.choose(&mut self.rng).map(|(a, _)| *a)
    }

    /// Score a vertex by production odds plus resource variety
    fn score_vertex(&self, game: &GameState, vertex: VertexId) -> i32 {
        let Some(v) = game.board.vertex(vertex) else {
            return 0;
        };

        let mut score = 0;
        let mut kinds = HashSet::new();
        for hex in v.hexes.iter().filter_map(|h| game.board.hex(*h)) {
            if let Some(dice) = hex.number {
                score += pips(dice);
            }
            if let Some(r) = hex.resource() {
                kinds.insert(r);
            }
        }
        score + kinds.len() as i32
    }

    /// Prefer roads whose far end is an open, valuable settlement spot
    fn rank_road_spots<'a>(
        &mut self,
        game: &GameState,
        actions: &[&'a GameAction],
    ) -> Option<&'a GameAction> {
        let mut scored: Vec<_> = actions
            .iter()
            .map(|action| {
                let score = match action {
                    GameAction::PlaceInitialRoad(e) | GameAction::BuildRoad(e) => {
                        self.score_edge_expansion(game, *e)
                    }
                    _ => 0,
                };
                (*action, score)
            })
            .collect();

        scored.shuffle(&mut self.rng);
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.first().map(|(a, _)| *a)
    }

    fn score_edge_expansion(&self, game: &GameState, edge: EdgeId) -> i32 {
        let Some(e) = game.board.edge(edge) else {
            return 0;
        };
        e.vertices
            .iter()
            .filter(|v| rules::is_valid_settlement_placement(game, **v, self.player_id))
            .map(|v| self.score_vertex(game, *v))
            .max()
            .unwrap_or(0)
    }

    /// Rank robber spots to hurt opponents
    fn rank_robber_spots<'a>(
        &mut self,
        game: &GameState,
        actions: &[&'a GameAction],
    ) -> Option<&'a GameAction> {
        let mut scored: Vec<_> = actions
            .iter()
            .map(|action| {
                let score = match action {
                    GameAction::MoveRobber(hex) => self.score_robber_spot(game, *hex),
                    _ => 0,
                };
                (*action, score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored.first().map(|(a, _)| *a)
    }

    fn score_robber_spot(&self, game: &GameState, hex: HexId) -> i32 {
        let Some(tile) = game.board.hex(hex) else {
            return -100;
        };

        let mut score = tile.number.map_or(0, |n| pips(n) * 2);

        // Prefer tiles with opponent buildings, avoid our own
        for v in tile.vertices.iter().filter_map(|v| game.board.vertex(*v)) {
            match v.owner() {
                Some(owner) if owner == self.player_id => score -= 20,
                Some(_) => score += 5,
                None => {}
            }
        }
        score
    }

    /// Choose steal target (richest opponent)
    fn choose_steal_target(&self, game: &GameState, actions: &[&GameAction]) -> Option<GameAction> {
        actions
            .iter()
            .filter_map(|action| match action {
                GameAction::StealFrom(victim) => {
                    let total = game.player(*victim)?.resources.total();
                    Some((*victim, total))
                }
                _ => None,
            })
            .max_by_key(|(_, total)| *total)
            .map(|(victim, _)| GameAction::StealFrom(victim))
    }
}

fn of_kind(actions: &[GameAction], pred: fn(&GameAction) -> bool) -> Vec<&GameAction> {
    actions.iter().filter(|a| pred(a)).collect()
}

/// Dots under a number token: 5 for 6/8 down to 1 for 2/12
fn pips(number: u8) -> i32 {
    match number {
        6 | 8 => 5,
        5 | 9 => 4,
        4 | 10 => 3,
        3 | 11 => 2,
        2 | 12 => 1,
        _ => 0,
    }
}
