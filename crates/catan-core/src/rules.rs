//! Rules engine.
//!
//! Free functions over `GameState`. Each one either applies a complete
//! change and reports success, or reports failure (`false` / `None`) and
//! leaves the state exactly as it was. Unknown ids count as failures.
//!
//! Turn order and phase checks live in the controller; these functions only
//! know about the board, the players and the bank.

use crate::awards;
use crate::board::{Building, EdgeId, HexId, Placement, PlayerId, PortKind, Resource, VertexId};
use crate::player::{costs, DevelopmentCard, Player, ResourceHand};
use crate::state::{GameState, LogEntry};
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::trace;

/// Hand size at which a 7 forces a discard
pub const DISCARD_THRESHOLD: u32 = 7;

/// Bank rate without a port
pub const BANK_TRADE_RATIO: u32 = 4;

// ==================== Dice & Production ====================

/// Roll two independent six-sided dice
pub fn roll_dice<R: Rng + ?Sized>(rng: &mut R) -> (u8, u8) {
    (rng.gen_range(1..=6), rng.gen_range(1..=6))
}

/// Pay out every hex showing `dice_sum` that is not blocked by the robber.
///
/// Settlements earn 1 and cities 2 of the hex's resource. A 7 produces
/// nothing. Returns what was granted, per building.
pub fn distribute_resources(state: &mut GameState, dice_sum: u8) -> Vec<(PlayerId, Resource, u32)> {
    if dice_sum == 7 {
        return Vec::new();
    }

    let mut grants = Vec::new();
    for hex in state.board.hexes() {
        if hex.number != Some(dice_sum) || !hex.is_productive() {
            continue;
        }
        let Some(resource) = hex.resource() else {
            continue;
        };
        for vertex in hex.vertices {
            if let Some(Placement { player, piece }) =
                state.board.vertex(vertex).and_then(|v| v.occupant)
            {
                grants.push((player, resource, piece.resource_multiplier()));
            }
        }
    }

    for (player, resource, amount) in &grants {
        if let Some(p) = state.player_mut(*player) {
            p.resources.add(*resource, *amount);
        }
    }

    trace!(dice_sum, grants = grants.len(), "resources distributed");
    grants
}

/// One of each resource from the hexes around a second setup settlement
pub fn distribute_setup_resources(
    state: &mut GameState,
    player: PlayerId,
    vertex: VertexId,
) -> Vec<Resource> {
    let Some(v) = state.board.vertex(vertex) else {
        return Vec::new();
    };
    let resources: Vec<Resource> = v
        .hexes
        .iter()
        .filter_map(|h| state.board.hex(*h))
        .filter_map(|h| h.resource())
        .collect();

    match state.player_mut(player) {
        Some(p) => {
            for r in &resources {
                p.resources.add(*r, 1);
            }
            resources
        }
        None => Vec::new(),
    }
}

// ==================== Placement Checks ====================

/// Empty vertex with no building on any neighboring vertex
pub fn is_valid_settlement_placement(state: &GameState, vertex: VertexId, player: PlayerId) -> bool {
    if state.player(player).is_none() {
        return false;
    }
    let Some(v) = state.board.vertex(vertex) else {
        return false;
    };

    v.occupant.is_none()
        && v.neighbors
            .iter()
            .all(|n| state.board.vertex(*n).map_or(true, |n| n.occupant.is_none()))
}

/// Empty edge connected to the player's network.
///
/// The edge must touch one of the player's buildings, or one of the
/// player's roads through a corner that no opponent has built on.
pub fn is_valid_road_placement(state: &GameState, edge: EdgeId, player: PlayerId) -> bool {
    let Some(e) = state.board.edge(edge) else {
        return false;
    };
    if e.occupant.is_some() {
        return false;
    }

    e.vertices.iter().any(|v| {
        let Some(vertex) = state.board.vertex(*v) else {
            return false;
        };
        match vertex.owner() {
            Some(owner) => owner == player,
            None => vertex
                .edges
                .iter()
                .filter(|other| **other != edge)
                .any(|other| state.board.edge(*other).is_some_and(|o| o.is_road_of(player))),
        }
    })
}

/// Relaxed road check for setup: any empty edge touching the player's
/// buildings or roads, or any empty edge at all before they own a vertex.
pub fn can_place_road_in_setup(state: &GameState, edge: EdgeId, player: PlayerId) -> bool {
    let Some(e) = state.board.edge(edge) else {
        return false;
    };
    if e.occupant.is_some() {
        return false;
    }
    if state.board.buildings_of(player).next().is_none() {
        return true;
    }

    let touches_building = e
        .vertices
        .iter()
        .any(|v| state.board.vertex(*v).and_then(|v| v.owner()) == Some(player));
    let touches_road = e
        .neighbors
        .iter()
        .any(|n| state.board.edge(*n).is_some_and(|n| n.is_road_of(player)));

    touches_building || touches_road
}

/// Whether one of the player's roads ends at this vertex
pub fn is_connected_to_road(state: &GameState, vertex: VertexId, player: PlayerId) -> bool {
    state.board.vertex(vertex).is_some_and(|v| {
        v.edges
            .iter()
            .any(|e| state.board.edge(*e).is_some_and(|e| e.is_road_of(player)))
    })
}

// ==================== Resources ====================

pub fn can_afford(player: &Player, cost: &ResourceHand) -> bool {
    player.resources.can_afford(cost)
}

/// Remove `cost` from the player's hand; false (and no change) if short
pub fn deduct_resources(player: &mut Player, cost: &ResourceHand) -> bool {
    player.resources.try_subtract(cost)
}

pub fn grant_resources(player: &mut Player, hand: &ResourceHand) {
    player.resources.add_hand(hand);
}

// ==================== Building ====================
//
// Location legality is checked by the caller (setup and regular play use
// different rules). These check occupancy, pieces and cost.

/// Place a road, paying for it unless `free`
pub fn build_road(state: &mut GameState, player: PlayerId, edge: EdgeId, free: bool) -> bool {
    if !state.board.edge(edge).is_some_and(|e| e.occupant.is_none()) {
        return false;
    }
    let Some(p) = state.players.get_mut(player as usize) else {
        return false;
    };
    if p.pieces.roads == 0 || (!free && !p.resources.try_subtract(&costs::road())) {
        return false;
    }

    p.pieces.roads -= 1;
    state.board.place_road(edge, player);
    true
}

/// Place a settlement, paying for it unless `free`
pub fn build_settlement(
    state: &mut GameState,
    player: PlayerId,
    vertex: VertexId,
    free: bool,
) -> bool {
    if !state.board.vertex(vertex).is_some_and(|v| v.occupant.is_none()) {
        return false;
    }
    let Some(p) = state.players.get_mut(player as usize) else {
        return false;
    };
    if p.pieces.settlements == 0 || (!free && !p.resources.try_subtract(&costs::settlement())) {
        return false;
    }

    p.pieces.settlements -= 1;
    state.board.place_settlement(vertex, player);
    true
}

/// Upgrade one of the player's settlements; the settlement piece returns to supply
pub fn build_city(state: &mut GameState, player: PlayerId, vertex: VertexId) -> bool {
    let own_settlement = Some(Placement {
        player,
        piece: Building::Settlement,
    });
    if state.board.vertex(vertex).map(|v| v.occupant) != Some(own_settlement) {
        return false;
    }
    let Some(p) = state.players.get_mut(player as usize) else {
        return false;
    };
    if p.pieces.cities == 0 || !p.resources.try_subtract(&costs::city()) {
        return false;
    }

    p.pieces.cities -= 1;
    p.pieces.settlements += 1;
    state.board.upgrade_to_city(vertex, player);
    true
}

/// Draw the top development card, if the deck has one and the player can pay
pub fn buy_dev_card(state: &mut GameState, player: PlayerId) -> Option<DevelopmentCard> {
    let cost = costs::development_card();
    let p = state.players.get_mut(player as usize)?;
    if state.dev_deck.is_empty() || !p.resources.can_afford(&cost) {
        return None;
    }

    let card = state.dev_deck.pop()?;
    p.resources.try_subtract(&cost);
    p.dev_cards.push(card);
    Some(card)
}

// ==================== Robber ====================

/// Players holding at least `DISCARD_THRESHOLD` cards
pub fn get_players_to_discard(state: &GameState) -> Vec<PlayerId> {
    state
        .players
        .iter()
        .filter(|p| p.resources.total() >= DISCARD_THRESHOLD)
        .map(|p| p.id)
        .collect()
}

/// Throw away half the player's cards (rounded down), one at a time,
/// each time picking uniformly among the kinds still held
pub fn discard_half<R: Rng + ?Sized>(
    state: &mut GameState,
    player: PlayerId,
    rng: &mut R,
) -> ResourceHand {
    let mut discarded = ResourceHand::new();
    let Some(p) = state.player_mut(player) else {
        return discarded;
    };

    for _ in 0..p.resources.total() / 2 {
        if let Some(r) = p.resources.discard_random_kind(rng) {
            discarded.add(r, 1);
        }
    }
    discarded
}

pub fn move_robber(state: &mut GameState, hex: HexId) -> bool {
    if state.board.hex(hex).is_none() {
        return false;
    }
    state.board.move_robber(hex);
    true
}

/// Opponents of the current player with a building on this hex
pub fn get_players_adjacent_to_hex(state: &GameState, hex: HexId) -> Vec<PlayerId> {
    let Some(h) = state.board.hex(hex) else {
        return Vec::new();
    };

    let mut players: Vec<PlayerId> = h
        .vertices
        .iter()
        .filter_map(|v| state.board.vertex(*v).and_then(|v| v.owner()))
        .filter(|p| *p != state.current_player)
        .collect();
    players.sort_unstable();
    players.dedup();
    players
}

/// Move one random card from `from` to the current player
pub fn steal_resource<R: Rng + ?Sized>(
    state: &mut GameState,
    from: PlayerId,
    rng: &mut R,
) -> Option<Resource> {
    let thief = state.current_player;
    if from == thief || state.player(thief).is_none() {
        return None;
    }

    let stolen = state.player_mut(from)?.resources.steal_random(rng)?;
    state.player_mut(thief)?.resources.add(stolen, 1);
    Some(stolen)
}

// ==================== Trading ====================

/// Best rate the player gets for `give`: 2 at a matching port, 3 at a
/// generic port, otherwise 4
pub fn trade_ratio(state: &GameState, player: PlayerId, give: Resource) -> u32 {
    state
        .board
        .player_ports(player)
        .iter()
        .map(|port| match port.kind {
            PortKind::Specific(r) if r == give => port.ratio,
            PortKind::Specific(_) => BANK_TRADE_RATIO,
            PortKind::Generic => port.ratio,
        })
        .min()
        .unwrap_or(BANK_TRADE_RATIO)
}

/// Pay `ratio` of `give` to the bank for one `get`
pub fn bank_trade(
    state: &mut GameState,
    player: PlayerId,
    give: Resource,
    get: Resource,
    ratio: u32,
) -> bool {
    let Some(p) = state.player_mut(player) else {
        return false;
    };
    if ratio == 0 || !p.resources.try_subtract(&ResourceHand::single(give, ratio)) {
        return false;
    }
    p.resources.add(get, 1);
    true
}

// ==================== Development Cards ====================

pub fn play_knight(state: &mut GameState, player: PlayerId) -> bool {
    let Some(p) = state.player_mut(player) else {
        return false;
    };
    if !p.remove_dev_card(DevelopmentCard::Knight) {
        return false;
    }
    p.knights_played += 1;
    awards::update_largest_army(state);
    true
}

/// Spends the card; the free roads are placed through the controller
pub fn play_road_building(state: &mut GameState, player: PlayerId) -> bool {
    state
        .player_mut(player)
        .is_some_and(|p| p.remove_dev_card(DevelopmentCard::RoadBuilding))
}

pub fn play_year_of_plenty(
    state: &mut GameState,
    player: PlayerId,
    first: Resource,
    second: Resource,
) -> bool {
    let Some(p) = state.player_mut(player) else {
        return false;
    };
    if !p.remove_dev_card(DevelopmentCard::YearOfPlenty) {
        return false;
    }
    p.resources.add(first, 1);
    p.resources.add(second, 1);
    true
}

/// Collect every opponent's `resource`; returns how many were taken
pub fn play_monopoly(state: &mut GameState, player: PlayerId, resource: Resource) -> Option<u32> {
    if !state.player_mut(player)?.remove_dev_card(DevelopmentCard::Monopoly) {
        return None;
    }

    let total: u32 = state
        .players
        .iter_mut()
        .filter(|p| p.id != player)
        .map(|p| p.resources.take_all(resource))
        .sum();
    state.player_mut(player)?.resources.add(resource, total);
    Some(total)
}

// ==================== Log ====================

/// Append a line to the game log under the current turn and player
pub fn add_log(state: &mut GameState, action: impl Into<String>) {
    let timestamp_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();

    state.log.push(LogEntry {
        turn: state.turn,
        player: state.current_player,
        action: action.into(),
        timestamp_ms,
    });
}
