//! Turn/phase controller.
//!
//! `GameState::apply_action` is the single entry point for every player
//! decision, human or bot. It checks the action against the current phase,
//! runs the matching rules operations, records each resulting event in the
//! game log, and checks for a winner. A rejected action returns an error and
//! leaves the state untouched.
//!
//! Phase flow:
//!
//! ```text
//! Setup1 -> Setup2 -> Playing <-> {Trading, Building, Robbing, Discarding}
//!                        |
//!                        v
//!                     GameOver
//! ```

use crate::actions::{GameAction, GameEvent, TradeOffer};
use crate::awards;
use crate::board::{Building, EdgeId, HexId, Placement, PlayerId, Resource, VertexId, PLAYER_COUNT};
use crate::player::{costs, DevelopmentCard};
use crate::rules;
use crate::state::{GameState, PendingTrade, Phase};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur when applying actions
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Not your turn")]
    NotYourTurn,

    #[error("Invalid action for current phase")]
    InvalidPhase,

    #[error("Invalid placement location")]
    InvalidLocation,

    #[error("Cannot afford this")]
    CannotAfford,

    #[error("No pieces remaining")]
    NoPiecesRemaining,

    #[error("No development cards left in deck")]
    EmptyDeck,

    #[error("Don't have that card")]
    NoSuchCard,

    #[error("Invalid trade")]
    InvalidTrade,

    #[error("No active trade")]
    NoActiveTrade,

    #[error("Nothing to discard")]
    NothingToDiscard,

    #[error("Dice must show 1 to 6")]
    InvalidDice,

    #[error("Game is over")]
    GameOver,
}

type ActionResult = Result<Vec<GameEvent>, GameError>;

impl GameState {
    /// Apply an action to the game state
    pub fn apply_action<R: Rng + ?Sized>(
        &mut self,
        player: PlayerId,
        action: GameAction,
        rng: &mut R,
    ) -> ActionResult {
        self.apply(player, &action, |state| state.dispatch(player, &action, rng))
    }

    /// Roll with known dice instead of random ones
    pub fn resolve_roll(&mut self, player: PlayerId, dice: (u8, u8)) -> ActionResult {
        self.apply(player, &GameAction::RollDice, |state| state.roll(player, dice))
    }

    fn apply(
        &mut self,
        player: PlayerId,
        action: &GameAction,
        handler: impl FnOnce(&mut Self) -> ActionResult,
    ) -> ActionResult {
        if self.phase == Phase::GameOver {
            return Err(GameError::GameOver);
        }
        if player as usize >= PLAYER_COUNT {
            return Err(GameError::NotYourTurn);
        }

        let mut events = handler(self)?;
        if !self.phase.is_setup() {
            events.extend(self.check_winner());
        }

        for event in &events {
            rules::add_log(self, event.to_string());
        }
        debug!(player, ?action, events = events.len(), "action applied");
        Ok(events)
    }

    fn dispatch<R: Rng + ?Sized>(
        &mut self,
        player: PlayerId,
        action: &GameAction,
        rng: &mut R,
    ) -> ActionResult {
        match action {
            // ==================== Setup Phase ====================
            GameAction::PlaceInitialSettlement(vertex) => {
                self.place_initial_settlement(player, *vertex)
            }
            GameAction::PlaceInitialRoad(edge) => self.place_initial_road(player, *edge),

            // ==================== Dice & Robber ====================
            GameAction::RollDice => self.roll(player, rules::roll_dice(rng)),
            GameAction::DiscardHalf => self.discard(player, rng),
            GameAction::MoveRobber(hex) => self.move_robber(player, *hex, rng),
            GameAction::StealFrom(victim) => self.steal_from(player, *victim, rng),

            // ==================== Building ====================
            GameAction::BuildRoad(edge) => self.build_road(player, *edge),
            GameAction::BuildSettlement(vertex) => self.build_settlement(player, *vertex),
            GameAction::BuildCity(vertex) => self.build_city(player, *vertex),
            GameAction::BuyDevelopmentCard => self.buy_development_card(player),

            // ==================== Development Cards ====================
            GameAction::PlayKnight => self.play_knight(player),
            GameAction::PlayRoadBuilding => self.play_road_building(player),
            GameAction::FinishRoadBuilding => self.finish_road_building(player),
            GameAction::PlayYearOfPlenty(first, second) => {
                self.play_year_of_plenty(player, *first, *second)
            }
            GameAction::PlayMonopoly(resource) => self.play_monopoly(player, *resource),

            // ==================== Trading ====================
            GameAction::ProposeTrade(offer) => self.propose_trade(player, offer.clone()),
            GameAction::AcceptTrade => self.accept_trade(player),
            GameAction::RejectTrade => self.reject_trade(player),
            GameAction::CancelTrade => self.cancel_trade(player),
            GameAction::BankTrade { give, receive } => self.bank_trade(player, *give, *receive),

            // ==================== Turn Management ====================
            GameAction::EndTurn => self.end_turn(player),
        }
    }

    // ==================== Guards ====================

    fn ensure_turn(&self, player: PlayerId) -> Result<(), GameError> {
        if player == self.current_player {
            Ok(())
        } else {
            Err(GameError::NotYourTurn)
        }
    }

    /// Current player, regular play, dice already rolled
    fn ensure_main_phase(&self, player: PlayerId) -> Result<(), GameError> {
        self.ensure_turn(player)?;
        if self.phase != Phase::Playing || self.dice.is_none() {
            return Err(GameError::InvalidPhase);
        }
        Ok(())
    }

    fn ensure_can_play_card(&self, player: PlayerId, card: DevelopmentCard) -> Result<(), GameError> {
        if self.dev_card_played {
            return Err(GameError::InvalidPhase);
        }
        if !self.players[player as usize].has_dev_card(card) {
            return Err(GameError::NoSuchCard);
        }
        Ok(())
    }

    // ==================== Setup ====================

    fn place_initial_settlement(&mut self, player: PlayerId, vertex: VertexId) -> ActionResult {
        if !self.phase.is_setup() || self.setup_settlement.is_some() {
            return Err(GameError::InvalidPhase);
        }
        self.ensure_turn(player)?;
        if !rules::is_valid_settlement_placement(self, vertex, player) {
            return Err(GameError::InvalidLocation);
        }
        if !rules::build_settlement(self, player, vertex, true) {
            return Err(GameError::NoPiecesRemaining);
        }

        self.setup_settlement = Some(vertex);
        let mut events = vec![GameEvent::SettlementBuilt {
            player,
            location: vertex,
        }];

        // Only the second settlement pays out
        if self.phase == Phase::Setup2 {
            let granted = rules::distribute_setup_resources(self, player, vertex);
            if !granted.is_empty() {
                events.push(GameEvent::ResourcesDistributed {
                    distributions: granted.into_iter().map(|r| (player, r, 1)).collect(),
                });
            }
        }

        Ok(events)
    }

    fn place_initial_road(&mut self, player: PlayerId, edge: EdgeId) -> ActionResult {
        if !self.phase.is_setup() {
            return Err(GameError::InvalidPhase);
        }
        self.ensure_turn(player)?;
        let Some(settlement) = self.setup_settlement else {
            return Err(GameError::InvalidPhase);
        };

        let touches_settlement = self
            .board
            .edge(edge)
            .is_some_and(|e| e.vertices.contains(&settlement));
        if !touches_settlement || !rules::can_place_road_in_setup(self, edge, player) {
            return Err(GameError::InvalidLocation);
        }
        if !rules::build_road(self, player, edge, true) {
            return Err(GameError::NoPiecesRemaining);
        }

        self.setup_settlement = None;
        let mut events = vec![GameEvent::RoadBuilt {
            player,
            location: edge,
        }];
        events.push(self.complete_setup());
        Ok(events)
    }

    /// Mark the current player done with this setup round and pick who
    /// places next; after the last placement of round two, start play.
    fn complete_setup(&mut self) -> GameEvent {
        self.setup_finished.push(self.current_player);

        if self.setup_finished.len() == PLAYER_COUNT {
            self.setup_finished.clear();
            if self.phase == Phase::Setup1 {
                self.phase = Phase::Setup2;
                self.current_player = self.next_setup_player();
            } else {
                self.phase = Phase::Playing;
                self.turn = 1;
                self.current_player = 0;
                info!("setup complete, starting play");
            }
        } else {
            self.current_player = self.next_setup_player();
        }

        GameEvent::SetupAdvanced {
            phase: self.phase,
            next_player: self.current_player,
        }
    }

    /// Ascending seat order in round one, descending in round two
    pub fn next_setup_player(&self) -> PlayerId {
        let count = self.setup_finished.len().min(PLAYER_COUNT - 1);
        match self.phase {
            Phase::Setup2 => (PLAYER_COUNT - 1 - count) as PlayerId,
            _ => count as PlayerId,
        }
    }

    // ==================== Dice & Robber ====================

    fn roll(&mut self, player: PlayerId, dice: (u8, u8)) -> ActionResult {
        self.ensure_turn(player)?;
        if self.phase != Phase::Playing || self.dice.is_some() {
            return Err(GameError::InvalidPhase);
        }
        if ![dice.0, dice.1].iter().all(|d| (1..=6).contains(d)) {
            return Err(GameError::InvalidDice);
        }

        let total = dice.0 + dice.1;
        self.dice = Some(dice);
        let mut events = vec![GameEvent::DiceRolled {
            player,
            roll: dice,
            total,
        }];

        if total == 7 {
            self.pending_discards = rules::get_players_to_discard(self);
            if self.pending_discards.is_empty() {
                self.enter_robbing();
            } else {
                self.phase = Phase::Discarding;
                events.push(GameEvent::DiscardRequired {
                    players: self.pending_discards.clone(),
                });
            }
        } else {
            let distributions = rules::distribute_resources(self, total);
            if !distributions.is_empty() {
                events.push(GameEvent::ResourcesDistributed { distributions });
            }
        }

        Ok(events)
    }

    fn enter_robbing(&mut self) {
        self.phase = Phase::Robbing;
        self.robber_hex = None;
        self.steal_target = None;
    }

    fn discard<R: Rng + ?Sized>(&mut self, player: PlayerId, rng: &mut R) -> ActionResult {
        if self.phase != Phase::Discarding {
            return Err(GameError::InvalidPhase);
        }
        if !self.pending_discards.contains(&player) {
            return Err(GameError::NothingToDiscard);
        }

        let discarded = rules::discard_half(self, player, rng);
        self.pending_discards.retain(|p| *p != player);
        if self.pending_discards.is_empty() {
            self.enter_robbing();
        }

        Ok(vec![GameEvent::CardsDiscarded {
            player,
            count: discarded.total(),
        }])
    }

    /// Opponents next to the robber's new hex who hold at least one card
    pub fn robber_victims(&self) -> Vec<PlayerId> {
        let Some(hex) = self.robber_hex else {
            return Vec::new();
        };
        rules::get_players_adjacent_to_hex(self, hex)
            .into_iter()
            .filter(|p| self.player(*p).is_some_and(|p| p.resources.total() > 0))
            .collect()
    }

    /// Who the game is waiting on: a pending discarder, an offer's next
    /// responder, or the current player. `None` once the game is over.
    pub fn awaiting_player(&self) -> Option<PlayerId> {
        match self.phase {
            Phase::GameOver => None,
            Phase::Discarding => self.pending_discards.first().copied(),
            Phase::Trading => {
                let pending = self.pending_trade.as_ref()?;
                let responder = (0..PLAYER_COUNT as PlayerId).find(|p| {
                    pending.offer.is_addressed_to(*p) && !pending.rejected_by.contains(p)
                });
                responder.or(Some(pending.offer.from))
            }
            _ => Some(self.current_player),
        }
    }

    fn move_robber<R: Rng + ?Sized>(
        &mut self,
        player: PlayerId,
        hex: HexId,
        rng: &mut R,
    ) -> ActionResult {
        self.ensure_turn(player)?;
        if self.phase != Phase::Robbing || self.robber_hex.is_some() {
            return Err(GameError::InvalidPhase);
        }
        let from = self.board.robber_hex();
        if self.board.hex(hex).is_none() || from == Some(hex) {
            return Err(GameError::InvalidLocation);
        }

        rules::move_robber(self, hex);
        self.robber_hex = Some(hex);
        let mut events = vec![GameEvent::RobberMoved {
            player,
            from,
            to: hex,
        }];

        match self.robber_victims().as_slice() {
            [] => self.phase = Phase::Playing,
            [victim] => {
                events.push(self.steal(*victim, rng));
                self.phase = Phase::Playing;
            }
            // Several candidates: wait for StealFrom
            _ => {}
        }

        Ok(events)
    }

    fn steal_from<R: Rng + ?Sized>(
        &mut self,
        player: PlayerId,
        victim: PlayerId,
        rng: &mut R,
    ) -> ActionResult {
        self.ensure_turn(player)?;
        if self.phase != Phase::Robbing || self.robber_hex.is_none() {
            return Err(GameError::InvalidPhase);
        }
        if !self.robber_victims().contains(&victim) {
            return Err(GameError::InvalidLocation);
        }

        let event = self.steal(victim, rng);
        self.phase = Phase::Playing;
        Ok(vec![event])
    }

    fn steal<R: Rng + ?Sized>(&mut self, victim: PlayerId, rng: &mut R) -> GameEvent {
        let resource = rules::steal_resource(self, victim, rng);
        self.steal_target = Some(victim);
        GameEvent::ResourceStolen {
            thief: self.current_player,
            victim,
            resource,
        }
    }

    // ==================== Building ====================

    fn build_road(&mut self, player: PlayerId, edge: EdgeId) -> ActionResult {
        self.ensure_turn(player)?;
        let free = match self.phase {
            Phase::Building => true,
            Phase::Playing if self.dice.is_some() => false,
            _ => return Err(GameError::InvalidPhase),
        };
        if !rules::is_valid_road_placement(self, edge, player) {
            return Err(GameError::InvalidLocation);
        }
        let p = &self.players[player as usize];
        if p.pieces.roads == 0 {
            return Err(GameError::NoPiecesRemaining);
        }
        if !free && !rules::can_afford(p, &costs::road()) {
            return Err(GameError::CannotAfford);
        }
        if !rules::build_road(self, player, edge, free) {
            return Err(GameError::InvalidLocation);
        }

        let mut events = vec![GameEvent::RoadBuilt {
            player,
            location: edge,
        }];

        if free {
            self.free_roads = self.free_roads.saturating_sub(1);
            if self.free_roads == 0 || self.players[player as usize].pieces.roads == 0 {
                self.free_roads = 0;
                self.phase = Phase::Playing;
            }
        }

        events.extend(awards::update_longest_road(self));
        Ok(events)
    }

    fn build_settlement(&mut self, player: PlayerId, vertex: VertexId) -> ActionResult {
        self.ensure_main_phase(player)?;
        if !rules::is_valid_settlement_placement(self, vertex, player)
            || !rules::is_connected_to_road(self, vertex, player)
        {
            return Err(GameError::InvalidLocation);
        }
        let p = &self.players[player as usize];
        if p.pieces.settlements == 0 {
            return Err(GameError::NoPiecesRemaining);
        }
        if !rules::can_afford(p, &costs::settlement()) {
            return Err(GameError::CannotAfford);
        }
        if !rules::build_settlement(self, player, vertex, false) {
            return Err(GameError::InvalidLocation);
        }

        let mut events = vec![GameEvent::SettlementBuilt {
            player,
            location: vertex,
        }];
        // A new settlement can split an opponent's road
        events.extend(awards::update_longest_road(self));
        Ok(events)
    }

    fn build_city(&mut self, player: PlayerId, vertex: VertexId) -> ActionResult {
        self.ensure_main_phase(player)?;
        let own_settlement = Some(Placement {
            player,
            piece: Building::Settlement,
        });
        if self.board.vertex(vertex).map(|v| v.occupant) != Some(own_settlement) {
            return Err(GameError::InvalidLocation);
        }
        let p = &self.players[player as usize];
        if p.pieces.cities == 0 {
            return Err(GameError::NoPiecesRemaining);
        }
        if !rules::can_afford(p, &costs::city()) {
            return Err(GameError::CannotAfford);
        }
        if !rules::build_city(self, player, vertex) {
            return Err(GameError::InvalidLocation);
        }

        Ok(vec![GameEvent::CityBuilt {
            player,
            location: vertex,
        }])
    }

    fn buy_development_card(&mut self, player: PlayerId) -> ActionResult {
        self.ensure_main_phase(player)?;
        if self.dev_deck.is_empty() {
            return Err(GameError::EmptyDeck);
        }
        if rules::buy_dev_card(self, player).is_none() {
            return Err(GameError::CannotAfford);
        }
        Ok(vec![GameEvent::DevelopmentCardPurchased { player }])
    }

    // ==================== Development Cards ====================

    fn play_knight(&mut self, player: PlayerId) -> ActionResult {
        self.ensure_turn(player)?;
        // Allowed before or after rolling
        if self.phase != Phase::Playing {
            return Err(GameError::InvalidPhase);
        }
        self.ensure_can_play_card(player, DevelopmentCard::Knight)?;

        let previous = self.largest_army_holder;
        rules::play_knight(self, player);
        self.dev_card_played = true;

        let mut events = vec![GameEvent::KnightPlayed { player }];
        if self.largest_army_holder != previous {
            events.push(GameEvent::LargestArmyChanged {
                previous,
                current: self.largest_army_holder,
                knights: self.players[player as usize].knights_played,
            });
        }
        self.enter_robbing();
        Ok(events)
    }

    fn play_road_building(&mut self, player: PlayerId) -> ActionResult {
        self.ensure_main_phase(player)?;
        self.ensure_can_play_card(player, DevelopmentCard::RoadBuilding)?;

        rules::play_road_building(self, player);
        self.dev_card_played = true;

        let roads_left = self.players[player as usize].pieces.roads;
        let free_roads = roads_left.min(2) as u8;
        if free_roads > 0 {
            self.free_roads = free_roads;
            self.phase = Phase::Building;
        }
        Ok(vec![GameEvent::RoadBuildingPlayed { player, free_roads }])
    }

    fn finish_road_building(&mut self, player: PlayerId) -> ActionResult {
        self.ensure_turn(player)?;
        if self.phase != Phase::Building {
            return Err(GameError::InvalidPhase);
        }
        self.free_roads = 0;
        self.phase = Phase::Playing;
        Ok(Vec::new())
    }

    fn play_year_of_plenty(
        &mut self,
        player: PlayerId,
        first: Resource,
        second: Resource,
    ) -> ActionResult {
        self.ensure_main_phase(player)?;
        self.ensure_can_play_card(player, DevelopmentCard::YearOfPlenty)?;

        rules::play_year_of_plenty(self, player, first, second);
        self.dev_card_played = true;
        Ok(vec![GameEvent::YearOfPlentyPlayed {
            player,
            resources: (first, second),
        }])
    }

    fn play_monopoly(&mut self, player: PlayerId, resource: Resource) -> ActionResult {
        self.ensure_main_phase(player)?;
        self.ensure_can_play_card(player, DevelopmentCard::Monopoly)?;

        let total_stolen = rules::play_monopoly(self, player, resource).unwrap_or_default();
        self.dev_card_played = true;
        Ok(vec![GameEvent::MonopolyPlayed {
            player,
            resource,
            total_stolen,
        }])
    }

    // ==================== Trading ====================

    fn bank_trade(&mut self, player: PlayerId, give: Resource, receive: Resource) -> ActionResult {
        self.ensure_main_phase(player)?;
        if give == receive {
            return Err(GameError::InvalidTrade);
        }

        let ratio = rules::trade_ratio(self, player, give);
        if !rules::bank_trade(self, player, give, receive, ratio) {
            return Err(GameError::CannotAfford);
        }
        Ok(vec![GameEvent::BankTradeCompleted {
            player,
            gave: give,
            gave_count: ratio,
            received: receive,
        }])
    }

    fn propose_trade(&mut self, player: PlayerId, offer: TradeOffer) -> ActionResult {
        self.ensure_main_phase(player)?;
        let bad_target = offer.to.is_some_and(|to| to as usize >= PLAYER_COUNT);
        if !offer.is_valid() || offer.from != player || bad_target {
            return Err(GameError::InvalidTrade);
        }
        if !rules::can_afford(&self.players[player as usize], &offer.offering) {
            return Err(GameError::CannotAfford);
        }

        self.pending_trade = Some(PendingTrade {
            offer: offer.clone(),
            rejected_by: Vec::new(),
        });
        self.phase = Phase::Trading;
        Ok(vec![GameEvent::TradeProposed { offer }])
    }

    fn pending_offer(&self) -> Result<&TradeOffer, GameError> {
        if self.phase != Phase::Trading {
            return Err(GameError::NoActiveTrade);
        }
        self.pending_trade
            .as_ref()
            .map(|t| &t.offer)
            .ok_or(GameError::NoActiveTrade)
    }

    fn accept_trade(&mut self, player: PlayerId) -> ActionResult {
        let offer = self.pending_offer()?.clone();
        if !offer.is_addressed_to(player) {
            return Err(GameError::InvalidTrade);
        }
        let (from, to) = (offer.from as usize, player as usize);
        if !self.players[to].resources.can_afford(&offer.requesting)
            || !self.players[from].resources.can_afford(&offer.offering)
        {
            return Err(GameError::CannotAfford);
        }

        self.players[from].resources.try_subtract(&offer.offering);
        self.players[to].resources.try_subtract(&offer.requesting);
        self.players[from].resources.add_hand(&offer.requesting);
        self.players[to].resources.add_hand(&offer.offering);
        self.close_trade();

        Ok(vec![GameEvent::TradeCompleted {
            player1: offer.from,
            player2: player,
        }])
    }

    fn reject_trade(&mut self, player: PlayerId) -> ActionResult {
        let offer = self.pending_offer()?.clone();
        if !offer.is_addressed_to(player) {
            return Err(GameError::InvalidTrade);
        }

        let mut events = vec![GameEvent::TradeRejected { player }];
        let everyone_declined = match self.pending_trade.as_mut() {
            Some(pending) => {
                if !pending.rejected_by.contains(&player) {
                    pending.rejected_by.push(player);
                }
                offer.to.is_some() || pending.rejected_by.len() == PLAYER_COUNT - 1
            }
            None => true,
        };
        if everyone_declined {
            self.close_trade();
            events.push(GameEvent::TradeCancelled);
        }
        Ok(events)
    }

    fn cancel_trade(&mut self, player: PlayerId) -> ActionResult {
        let offer = self.pending_offer()?;
        if offer.from != player {
            return Err(GameError::NotYourTurn);
        }
        self.close_trade();
        Ok(vec![GameEvent::TradeCancelled])
    }

    fn close_trade(&mut self) {
        self.pending_trade = None;
        self.phase = Phase::Playing;
    }

    // ==================== Turn Management ====================

    fn end_turn(&mut self, player: PlayerId) -> ActionResult {
        self.ensure_main_phase(player)?;

        let next_player = (self.current_player + 1) % PLAYER_COUNT as PlayerId;
        if next_player == 0 {
            self.turn += 1;
        }
        self.current_player = next_player;
        self.dice = None;
        self.dev_card_played = false;
        self.robber_hex = None;
        self.steal_target = None;
        self.free_roads = 0;

        Ok(vec![GameEvent::TurnEnded {
            player,
            next_player,
            turn: self.turn,
        }])
    }

    fn check_winner(&mut self) -> Option<GameEvent> {
        let winner = awards::check_win_condition(self)?;
        let victory_points = awards::calculate_vp(&self.players[winner as usize], self);

        self.winner = Some(winner);
        self.phase = Phase::GameOver;
        info!(winner, victory_points, turn = self.turn, "game over");
        Some(GameEvent::GameWon {
            player: winner,
            victory_points,
        })
    }

    // ==================== Valid Actions ====================

    /// Get all currently valid actions for a player.
    ///
    /// Domestic trade proposals are open-ended and never listed.
    pub fn valid_actions(&self, player: PlayerId) -> Vec<GameAction> {
        let mut actions = Vec::new();
        let Some(p) = self.player(player) else {
            return actions;
        };

        match self.phase {
            Phase::GameOver => {}

            Phase::Setup1 | Phase::Setup2 => {
                if player != self.current_player {
                    return actions;
                }
                match self.setup_settlement {
                    None => {
                        for vertex in self.board.vertices() {
                            if rules::is_valid_settlement_placement(self, vertex.id, player) {
                                actions.push(GameAction::PlaceInitialSettlement(vertex.id));
                            }
                        }
                    }
                    Some(settlement) => {
                        if let Some(vertex) = self.board.vertex(settlement) {
                            for edge in &vertex.edges {
                                if rules::can_place_road_in_setup(self, *edge, player) {
                                    actions.push(GameAction::PlaceInitialRoad(*edge));
                                }
                            }
                        }
                    }
                }
            }

            Phase::Discarding => {
                if self.pending_discards.contains(&player) {
                    actions.push(GameAction::DiscardHalf);
                }
            }

            Phase::Robbing => {
                if player != self.current_player {
                    return actions;
                }
                if self.robber_hex.is_none() {
                    let current = self.board.robber_hex();
                    for hex in self.board.hexes() {
                        if Some(hex.id) != current {
                            actions.push(GameAction::MoveRobber(hex.id));
                        }
                    }
                } else {
                    for victim in self.robber_victims() {
                        actions.push(GameAction::StealFrom(victim));
                    }
                }
            }

            Phase::Building => {
                if player != self.current_player {
                    return actions;
                }
                if p.pieces.roads > 0 {
                    actions.extend(self.road_spots(player).into_iter().map(GameAction::BuildRoad));
                }
                actions.push(GameAction::FinishRoadBuilding);
            }

            Phase::Trading => {
                if let Some(pending) = &self.pending_trade {
                    let offer = &pending.offer;
                    if player == offer.from {
                        actions.push(GameAction::CancelTrade);
                    } else if offer.is_addressed_to(player)
                        && !pending.rejected_by.contains(&player)
                    {
                        if p.resources.can_afford(&offer.requesting) {
                            actions.push(GameAction::AcceptTrade);
                        }
                        actions.push(GameAction::RejectTrade);
                    }
                }
            }

            Phase::Playing => {
                if player != self.current_player {
                    return actions;
                }

                let can_play_card = |card| !self.dev_card_played && p.has_dev_card(card);

                if self.dice.is_none() {
                    actions.push(GameAction::RollDice);
                    if can_play_card(DevelopmentCard::Knight) {
                        actions.push(GameAction::PlayKnight);
                    }
                    return actions;
                }

                // Can always end turn
                actions.push(GameAction::EndTurn);

                // Building actions
                if p.pieces.roads > 0 && p.resources.can_afford(&costs::road()) {
                    actions.extend(self.road_spots(player).into_iter().map(GameAction::BuildRoad));
                }
                if p.pieces.settlements > 0 && p.resources.can_afford(&costs::settlement()) {
                    for vertex in self.board.vertices() {
                        if rules::is_valid_settlement_placement(self, vertex.id, player)
                            && rules::is_connected_to_road(self, vertex.id, player)
                        {
                            actions.push(GameAction::BuildSettlement(vertex.id));
                        }
                    }
                }
                if p.pieces.cities > 0 && p.resources.can_afford(&costs::city()) {
                    for (vertex, building) in self.board.buildings_of(player) {
                        if building == Building::Settlement {
                            actions.push(GameAction::BuildCity(vertex.id));
                        }
                    }
                }
                if !self.dev_deck.is_empty() && p.resources.can_afford(&costs::development_card()) {
                    actions.push(GameAction::BuyDevelopmentCard);
                }

                // Development cards
                if can_play_card(DevelopmentCard::Knight) {
                    actions.push(GameAction::PlayKnight);
                }
                if can_play_card(DevelopmentCard::RoadBuilding) {
                    actions.push(GameAction::PlayRoadBuilding);
                }
                if can_play_card(DevelopmentCard::YearOfPlenty) {
                    for (i, first) in Resource::ALL.iter().enumerate() {
                        for second in &Resource::ALL[i..] {
                            actions.push(GameAction::PlayYearOfPlenty(*first, *second));
                        }
                    }
                }
                if can_play_card(DevelopmentCard::Monopoly) {
                    for r in Resource::ALL {
                        actions.push(GameAction::PlayMonopoly(r));
                    }
                }

                // Bank and port trades
                for give in Resource::ALL {
                    if p.resources.get(give) < rules::trade_ratio(self, player, give) {
                        continue;
                    }
                    for receive in Resource::ALL {
                        if receive != give {
                            actions.push(GameAction::BankTrade { give, receive });
                        }
                    }
                }
            }
        }

        actions
    }

    fn road_spots(&self, player: PlayerId) -> Vec<EdgeId> {
        self.board
            .edges()
            .iter()
            .filter(|e| rules::is_valid_road_placement(self, e.id, player))
            .map(|e| e.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::ResourceHand;
    use crate::state::GameConfig;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn new_game(seed: u64) -> (GameState, StdRng) {
        let mut rng = StdRng::seed_from_u64(seed);
        let game = GameState::new(&GameConfig::all_bots(), &mut rng);
        (game, rng)
    }

    /// Run setup by always taking the first listed placement
    fn finish_setup(game: &mut GameState, rng: &mut StdRng) {
        while game.phase.is_setup() {
            let player = game.current_player;
            let action = game.valid_actions(player).into_iter().next().unwrap();
            game.apply_action(player, action, rng).unwrap();
        }
    }

    #[test]
    fn test_setup_valid_actions() {
        let (game, _) = new_game(1);
        let actions = game.valid_actions(0);
        assert_eq!(actions.len(), 54, "every corner is open on an empty board");
        assert!(game.valid_actions(1).is_empty());
    }

    #[test]
    fn test_setup_snake_order() {
        let (mut game, mut rng) = new_game(2);
        let mut order = Vec::new();
        while game.phase.is_setup() {
            let player = game.current_player;
            order.push(player);
            for _ in 0..2 {
                let action = game.valid_actions(player).into_iter().next().unwrap();
                game.apply_action(player, action, &mut rng).unwrap();
            }
        }

        assert_eq!(order, vec![0, 1, 2, 3, 3, 2, 1, 0]);
        assert_eq!(game.phase, Phase::Playing);
        assert_eq!(game.current_player, 0);
        assert_eq!(game.turn, 1);
        for p in &game.players {
            assert_eq!(p.pieces.settlements, 3);
            assert_eq!(p.pieces.roads, 13);
        }
    }

    #[test]
    fn test_setup_road_must_touch_new_settlement() {
        let (mut game, mut rng) = new_game(3);
        game.apply_action(0, GameAction::PlaceInitialSettlement(VertexId(0)), &mut rng)
            .unwrap();
        let far_edge = game
            .board
            .edges()
            .iter()
            .find(|e| !e.vertices.contains(&VertexId(0)))
            .unwrap()
            .id;

        let result = game.apply_action(0, GameAction::PlaceInitialRoad(far_edge), &mut rng);
        assert_eq!(result, Err(GameError::InvalidLocation));
    }

    #[test]
    fn test_rejected_action_leaves_state_untouched() {
        let (mut game, mut rng) = new_game(4);
        let before = game.clone();

        assert_eq!(
            game.apply_action(1, GameAction::PlaceInitialSettlement(VertexId(0)), &mut rng),
            Err(GameError::NotYourTurn)
        );
        assert_eq!(
            game.apply_action(0, GameAction::RollDice, &mut rng),
            Err(GameError::InvalidPhase)
        );
        assert_eq!(game, before);
    }

    #[test]
    fn test_second_settlement_pays_out() {
        let (mut game, mut rng) = new_game(5);
        finish_setup(&mut game, &mut rng);
        let total: u32 = game.players.iter().map(|p| p.resources.total()).sum();
        assert!(total > 0);
    }

    #[test]
    fn test_must_roll_before_building() {
        let (mut game, mut rng) = new_game(6);
        finish_setup(&mut game, &mut rng);

        assert_eq!(game.valid_actions(0), vec![GameAction::RollDice]);
        assert_eq!(
            game.apply_action(0, GameAction::EndTurn, &mut rng),
            Err(GameError::InvalidPhase)
        );
    }

    #[test]
    fn test_turn_rotation() {
        let (mut game, mut rng) = new_game(7);
        finish_setup(&mut game, &mut rng);
        for _ in 0..PLAYER_COUNT {
            let player = game.current_player;
            game.resolve_roll(player, (2, 3)).unwrap();
            game.apply_action(player, GameAction::EndTurn, &mut rng).unwrap();
        }
        assert_eq!(game.current_player, 0);
        assert_eq!(game.turn, 2);
        assert_eq!(game.dice, None);
    }

    #[test]
    fn test_resolve_roll_rejects_impossible_dice() {
        let (mut game, mut rng) = new_game(18);
        finish_setup(&mut game, &mut rng);
        let before = game.clone();

        for dice in [(0, 0), (200, 100), (7, 1), (3, 0)] {
            assert_eq!(game.resolve_roll(0, dice), Err(GameError::InvalidDice));
        }
        assert_eq!(game, before);

        game.resolve_roll(0, (6, 6)).unwrap();
        assert_eq!(game.dice, Some((6, 6)));
    }

    #[test]
    fn test_stubbed_roll_pays_settlements_and_cities() {
        let (mut game, _) = new_game(19);
        game.phase = Phase::Playing;
        let six = game
            .board
            .hexes()
            .iter()
            .find(|h| h.number == Some(6) && !h.has_robber)
            .unwrap()
            .clone();
        let resource = six.resource().unwrap();
        let far = game
            .board
            .vertices()
            .iter()
            .find(|v| {
                v.hexes
                    .iter()
                    .all(|h| game.board.hex(*h).unwrap().number != Some(6))
            })
            .unwrap()
            .id;
        let expected = |game: &GameState, v: VertexId| -> u32 {
            game.board
                .vertex(v)
                .unwrap()
                .hexes
                .iter()
                .map(|h| game.board.hex(*h).unwrap())
                .filter(|h| h.number == Some(6) && h.resource() == Some(resource))
                .count() as u32
        };

        game.board.place_settlement(six.vertices[0], 0);
        game.board.upgrade_to_city(six.vertices[3], 1);
        game.board.place_settlement(far, 2);
        let settlement_share = expected(&game, six.vertices[0]);
        let city_share = expected(&game, six.vertices[3]) * 2;

        let events = game.resolve_roll(0, (3, 3)).unwrap();
        assert!(matches!(events[0], GameEvent::DiceRolled { total: 6, .. }));
        assert!(game.players[0].resources.get(resource) >= 1);
        assert_eq!(game.players[0].resources.get(resource), settlement_share);
        assert_eq!(game.players[1].resources.get(resource), city_share);
        assert!(city_share >= 2);
        assert_eq!(game.players[2].resources.total(), 0);
        assert_eq!(game.players[3].resources.total(), 0);
    }

    #[test]
    fn test_settlement_splitting_road_takes_title_away() {
        let (mut game, _) = new_game(20);
        // Five roads for player 0 around the centre hex
        let mut chain = Vec::new();
        let mut seen = vec![VertexId(0)];
        let mut at = VertexId(0);
        for _ in 0..5 {
            let next = game
                .board
                .vertex(at)
                .unwrap()
                .neighbors
                .iter()
                .copied()
                .find(|n| !seen.contains(n))
                .unwrap();
            let edge = game.board.edge_between(at, next).unwrap();
            game.board.place_road(edge, 0);
            chain.push(edge);
            seen.push(next);
            at = next;
        }
        awards::update_longest_road(&mut game);
        assert_eq!(game.longest_road_holder, Some(0));

        // Player 1 builds between the second and third road
        let cut = seen[2];
        let spur = game
            .board
            .vertex(cut)
            .unwrap()
            .edges
            .iter()
            .copied()
            .find(|e| !chain.contains(e))
            .unwrap();
        game.board.place_road(spur, 1);
        game.phase = Phase::Playing;
        game.current_player = 1;
        game.dice = Some((1, 2));
        game.players[1].resources = costs::settlement();

        let mut rng = StdRng::seed_from_u64(0);
        let events = game
            .apply_action(1, GameAction::BuildSettlement(cut), &mut rng)
            .unwrap();
        assert_eq!(
            events,
            vec![
                GameEvent::SettlementBuilt {
                    player: 1,
                    location: cut,
                },
                GameEvent::LongestRoadChanged {
                    previous: Some(0),
                    current: None,
                    length: 0,
                },
            ]
        );
        assert_eq!(game.longest_road_holder, None);
        assert_eq!(game.players[0].longest_road, 3);
    }

    #[test]
    fn test_seven_without_big_hands_goes_to_robbing() {
        let (mut game, mut rng) = new_game(8);
        finish_setup(&mut game, &mut rng);
        for p in game.players.iter_mut() {
            p.resources = ResourceHand::new();
        }

        game.resolve_roll(0, (3, 4)).unwrap();
        assert_eq!(game.phase, Phase::Robbing);

        let target = game
            .board
            .hexes()
            .iter()
            .find(|h| !h.has_robber)
            .unwrap()
            .id;
        game.apply_action(0, GameAction::MoveRobber(target), &mut rng).unwrap();
        assert_eq!(game.board.robber_hex(), Some(target));
        assert_eq!(game.phase, Phase::Playing, "nobody to steal from");
    }

    #[test]
    fn test_robber_cannot_stay_put() {
        let (mut game, mut rng) = new_game(9);
        finish_setup(&mut game, &mut rng);
        for p in game.players.iter_mut() {
            p.resources = ResourceHand::new();
        }
        game.resolve_roll(0, (6, 1)).unwrap();

        let current = game.board.robber_hex().unwrap();
        assert_eq!(
            game.apply_action(0, GameAction::MoveRobber(current), &mut rng),
            Err(GameError::InvalidLocation)
        );
    }

    #[test]
    fn test_discard_then_rob() {
        let (mut game, mut rng) = new_game(10);
        finish_setup(&mut game, &mut rng);
        for p in game.players.iter_mut() {
            p.resources = ResourceHand::new();
        }
        game.players[2].resources = ResourceHand::with_amounts(2, 2, 2, 2, 0);

        game.resolve_roll(0, (5, 2)).unwrap();
        assert_eq!(game.phase, Phase::Discarding);
        assert_eq!(game.valid_actions(2), vec![GameAction::DiscardHalf]);
        assert_eq!(
            game.apply_action(1, GameAction::DiscardHalf, &mut rng),
            Err(GameError::NothingToDiscard)
        );

        game.apply_action(2, GameAction::DiscardHalf, &mut rng).unwrap();
        assert_eq!(game.players[2].resources.total(), 4);
        assert_eq!(game.phase, Phase::Robbing);
    }

    #[test]
    fn test_one_dev_card_per_turn() {
        let (mut game, mut rng) = new_game(11);
        finish_setup(&mut game, &mut rng);
        game.players[0].dev_cards =
            vec![DevelopmentCard::YearOfPlenty, DevelopmentCard::Monopoly];
        game.resolve_roll(0, (4, 4)).unwrap();

        game.apply_action(
            0,
            GameAction::PlayYearOfPlenty(Resource::Ore, Resource::Ore),
            &mut rng,
        )
        .unwrap();
        assert_eq!(
            game.apply_action(0, GameAction::PlayMonopoly(Resource::Ore), &mut rng),
            Err(GameError::InvalidPhase)
        );
    }

    #[test]
    fn test_knight_before_roll_moves_robber() {
        let (mut game, mut rng) = new_game(12);
        finish_setup(&mut game, &mut rng);
        game.players[0].dev_cards = vec![DevelopmentCard::Knight];

        let events = game.apply_action(0, GameAction::PlayKnight, &mut rng).unwrap();
        assert_eq!(events, vec![GameEvent::KnightPlayed { player: 0 }]);
        assert_eq!(game.phase, Phase::Robbing);
        assert_eq!(game.players[0].knights_played, 1);
    }

    #[test]
    fn test_road_building_grants_two_free_roads() {
        let (mut game, mut rng) = new_game(13);
        finish_setup(&mut game, &mut rng);
        game.players[0].dev_cards = vec![DevelopmentCard::RoadBuilding];
        game.players[0].resources = ResourceHand::new();
        game.resolve_roll(0, (1, 1)).unwrap();

        game.apply_action(0, GameAction::PlayRoadBuilding, &mut rng).unwrap();
        assert_eq!(game.phase, Phase::Building);
        assert_eq!(game.free_roads, 2);

        for _ in 0..2 {
            let road = game
                .valid_actions(0)
                .into_iter()
                .find(|a| matches!(a, GameAction::BuildRoad(_)))
                .unwrap();
            game.apply_action(0, road, &mut rng).unwrap();
        }
        assert_eq!(game.phase, Phase::Playing);
        assert_eq!(game.players[0].pieces.roads, 11);
    }

    #[test]
    fn test_domestic_trade_swaps_hands() {
        let (mut game, mut rng) = new_game(14);
        finish_setup(&mut game, &mut rng);
        game.resolve_roll(0, (1, 1)).unwrap();
        for p in game.players.iter_mut() {
            p.resources = ResourceHand::new();
        }
        game.players[0].resources.wood = 2;
        game.players[2].resources.ore = 1;

        let offer = TradeOffer::new(
            0,
            Some(2),
            ResourceHand::single(Resource::Wood, 2),
            ResourceHand::single(Resource::Ore, 1),
        );
        game.apply_action(0, GameAction::ProposeTrade(offer), &mut rng).unwrap();
        assert_eq!(game.phase, Phase::Trading);
        assert_eq!(
            game.apply_action(1, GameAction::AcceptTrade, &mut rng),
            Err(GameError::InvalidTrade)
        );

        game.apply_action(2, GameAction::AcceptTrade, &mut rng).unwrap();
        assert_eq!(game.phase, Phase::Playing);
        assert_eq!(game.players[0].resources, ResourceHand::single(Resource::Ore, 1));
        assert_eq!(game.players[2].resources, ResourceHand::single(Resource::Wood, 2));
    }

    #[test]
    fn test_open_offer_cancelled_when_everyone_rejects() {
        let (mut game, mut rng) = new_game(15);
        finish_setup(&mut game, &mut rng);
        game.players[0].resources = ResourceHand::single(Resource::Sheep, 1);
        game.resolve_roll(0, (1, 1)).unwrap();

        let offer = TradeOffer::new(
            0,
            None,
            ResourceHand::single(Resource::Sheep, 1),
            ResourceHand::single(Resource::Brick, 1),
        );
        game.apply_action(0, GameAction::ProposeTrade(offer), &mut rng).unwrap();
        for player in 1..PLAYER_COUNT as PlayerId {
            assert_eq!(game.phase, Phase::Trading);
            game.apply_action(player, GameAction::RejectTrade, &mut rng).unwrap();
        }
        assert_eq!(game.phase, Phase::Playing);
        assert_eq!(game.pending_trade, None);
    }

    #[test]
    fn test_awaiting_player_follows_responders() {
        let (mut game, mut rng) = new_game(17);
        finish_setup(&mut game, &mut rng);
        game.players[0].resources = ResourceHand::single(Resource::Sheep, 1);
        game.resolve_roll(0, (1, 1)).unwrap();
        assert_eq!(game.awaiting_player(), Some(0));

        let offer = TradeOffer::new(
            0,
            None,
            ResourceHand::single(Resource::Sheep, 1),
            ResourceHand::single(Resource::Brick, 1),
        );
        game.apply_action(0, GameAction::ProposeTrade(offer), &mut rng).unwrap();
        assert_eq!(game.awaiting_player(), Some(1));
        game.apply_action(1, GameAction::RejectTrade, &mut rng).unwrap();
        assert_eq!(game.awaiting_player(), Some(2));
    }

    #[test]
    fn test_bank_trade_rejects_same_resource() {
        let (mut game, mut rng) = new_game(16);
        finish_setup(&mut game, &mut rng);
        game.players[0].resources = ResourceHand::single(Resource::Wood, 4);
        game.resolve_roll(0, (1, 1)).unwrap();

        assert_eq!(
            game.apply_action(
                0,
                GameAction::BankTrade {
                    give: Resource::Wood,
                    receive: Resource::Wood
                },
                &mut rng
            ),
            Err(GameError::InvalidTrade)
        );
    }

    #[test]
    fn test_events_are_logged() {
        let (mut game, mut rng) = new_game(17);
        game.apply_action(0, GameAction::PlaceInitialSettlement(VertexId(0)), &mut rng)
            .unwrap();
        assert_eq!(game.log.len(), 1);
        assert_eq!(game.log[0].action, "player 0 built a settlement at vertex-0");
    }

    #[test]
    fn test_reaching_target_ends_game() {
        let (mut game, mut rng) = new_game(18);
        finish_setup(&mut game, &mut rng);
        game.players[0].dev_cards = vec![DevelopmentCard::VictoryPoint; 8];

        let events = game.resolve_roll(0, (1, 1)).unwrap();
        assert!(matches!(
            events.last(),
            Some(GameEvent::GameWon { player: 0, victory_points: 10 })
        ));
        assert_eq!(game.winner, Some(0));
        assert_eq!(
            game.apply_action(0, GameAction::EndTurn, &mut rng),
            Err(GameError::GameOver)
        );
    }
}
