//! Victory points, Longest Road and Largest Army.
//!
//! Titles never move on a tie: a challenger must strictly beat the current
//! holder. Building points are always recounted from the board rather than
//! cached on the player.

use crate::actions::GameEvent;
use crate::board::{Board, PlayerId, VertexId, PLAYER_COUNT};
use crate::player::Player;
use crate::state::GameState;
use tracing::trace;

/// Minimum road length for Longest Road
pub const MIN_LONGEST_ROAD: u32 = 5;

/// Minimum knights for Largest Army
pub const MIN_LARGEST_ARMY: u32 = 3;

/// Points for holding either title
pub const TITLE_POINTS: u32 = 2;

/// Total victory points, including hidden VP cards
pub fn calculate_vp(player: &Player, state: &GameState) -> u32 {
    let buildings: u32 = state
        .board
        .buildings_of(player.id)
        .map(|(_, building)| building.victory_points())
        .sum();

    let mut vp = buildings + player.victory_point_cards();
    if state.longest_road_holder == Some(player.id) {
        vp += TITLE_POINTS;
    }
    if state.largest_army_holder == Some(player.id) {
        vp += TITLE_POINTS;
    }
    vp
}

/// First player in seat order at or above the target
pub fn check_win_condition(state: &GameState) -> Option<PlayerId> {
    state
        .players
        .iter()
        .find(|p| calculate_vp(p, state) >= state.victory_points_to_win)
        .map(|p| p.id)
}

/// Longest simple path (in roads) through the player's road network.
///
/// A path may not pass through a corner occupied by an opponent. Every road
/// is tried as a starting point in both directions.
pub fn calculate_longest_road(state: &GameState, player: PlayerId) -> u32 {
    let board = &state.board;
    let mut visited = vec![false; board.edges().len()];
    let mut best = 0;

    for road in board.roads_of(player) {
        for start in road.vertices {
            visited[road.id.index()] = true;
            let length = 1 + extend_road(board, player, road.other_end(start), &mut visited);
            visited[road.id.index()] = false;
            best = best.max(length);
        }
    }
    best
}

/// Longest continuation from `at` over unvisited roads of `player`
fn extend_road(board: &Board, player: PlayerId, at: VertexId, visited: &mut [bool]) -> u32 {
    let Some(vertex) = board.vertex(at) else {
        return 0;
    };
    if vertex.owner().is_some_and(|owner| owner != player) {
        return 0;
    }

    let mut best = 0;
    for edge_id in &vertex.edges {
        if visited[edge_id.index()] {
            continue;
        }
        let Some(edge) = board.edge(*edge_id) else {
            continue;
        };
        if !edge.is_road_of(player) {
            continue;
        }

        visited[edge_id.index()] = true;
        best = best.max(1 + extend_road(board, player, edge.other_end(at), visited));
        visited[edge_id.index()] = false;
    }
    best
}

/// Recompute every road length and move the title if someone strictly
/// beats the holder. A holder that falls below the minimum loses it.
pub fn update_longest_road(state: &mut GameState) -> Option<GameEvent> {
    let mut lengths = [0u32; PLAYER_COUNT];
    for (id, length) in lengths.iter_mut().enumerate() {
        *length = calculate_longest_road(state, id as PlayerId);
    }
    for (player, length) in state.players.iter_mut().zip(lengths) {
        player.longest_road = length;
    }
    trace!(?lengths, "longest roads recomputed");

    let previous = state.longest_road_holder;
    let mut holder = previous.filter(|h| lengths[*h as usize] >= MIN_LONGEST_ROAD);
    for (id, length) in lengths.iter().enumerate() {
        let to_beat = holder.map_or(MIN_LONGEST_ROAD - 1, |h| lengths[h as usize]);
        if *length > to_beat {
            holder = Some(id as PlayerId);
        }
    }

    if holder == previous {
        return None;
    }
    state.longest_road_holder = holder;
    Some(GameEvent::LongestRoadChanged {
        previous,
        current: holder,
        length: holder.map_or(0, |h| lengths[h as usize]),
    })
}

/// Move Largest Army to whoever strictly leads with at least the minimum
pub fn update_largest_army(state: &mut GameState) -> Option<GameEvent> {
    let previous = state.largest_army_holder;
    let mut holder = previous;
    for player in &state.players {
        let to_beat = holder
            .and_then(|h| state.player(h))
            .map_or(MIN_LARGEST_ARMY - 1, |h| h.knights_played);
        if player.knights_played > to_beat {
            holder = Some(player.id);
        }
    }

    if holder == previous {
        return None;
    }
    state.largest_army_holder = holder;
    let knights = holder
        .and_then(|h| state.player(h))
        .map_or(0, |p| p.knights_played);
    Some(GameEvent::LargestArmyChanged {
        previous,
        current: holder,
        knights,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Building, EdgeId, STANDARD_TILES};
    use crate::player::DevelopmentCard;
    use crate::state::GameConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fixed_game() -> GameState {
        let mut game = GameState::new(&GameConfig::all_bots(), &mut StdRng::seed_from_u64(1));
        game.board = Board::with_layout(STANDARD_TILES);
        game
    }

    /// Walk `len` roads for `player` from `start`, never reusing a corner
    fn lay_chain(game: &mut GameState, player: PlayerId, start: VertexId, len: usize) -> Vec<EdgeId> {
        let mut seen = vec![start];
        let mut at = start;
        let mut laid = Vec::new();
        for _ in 0..len {
            let vertex = game.board.vertex(at).unwrap().clone();
            let next = vertex
                .neighbors
                .iter()
                .copied()
                .find(|n| !seen.contains(n))
                .expect("chain ran off the board");
            let edge = game.board.edge_between(at, next).unwrap();
            game.board.place_road(edge, player);
            laid.push(edge);
            seen.push(next);
            at = next;
        }
        laid
    }

    #[test]
    fn test_no_roads_is_zero() {
        let game = fixed_game();
        assert_eq!(calculate_longest_road(&game, 0), 0);
    }

    #[test]
    fn test_simple_chain_has_its_length() {
        for len in 1..=6 {
            let mut game = fixed_game();
            lay_chain(&mut game, 1, VertexId(0), len);
            assert_eq!(calculate_longest_road(&game, 1), len as u32, "chain of {}", len);
        }
    }

    #[test]
    fn test_branch_counts_longest_arm() {
        let mut game = fixed_game();
        let chain = lay_chain(&mut game, 0, VertexId(0), 3);
        // Spur off the middle corner of the chain
        let middle = game.board.edge(chain[1]).unwrap().vertices;
        let spur = middle
            .iter()
            .flat_map(|v| game.board.vertex(*v).unwrap().edges.clone())
            .find(|e| game.board.edge(*e).unwrap().occupant.is_none())
            .unwrap();
        game.board.place_road(spur, 0);

        assert_eq!(calculate_longest_road(&game, 0), 3);
    }

    #[test]
    fn test_opponent_settlement_breaks_road() {
        let mut game = fixed_game();
        let chain = lay_chain(&mut game, 0, VertexId(0), 4);
        assert_eq!(calculate_longest_road(&game, 0), 4);

        let [a, b] = game.board.edge(chain[1]).unwrap().vertices;
        let shared = game.board.edge(chain[2]).unwrap().vertices;
        let cut = if shared.contains(&a) { a } else { b };
        game.board.place_settlement(cut, 3);

        assert_eq!(calculate_longest_road(&game, 0), 2);
    }

    #[test]
    fn test_longest_road_title_needs_five() {
        let mut game = fixed_game();
        lay_chain(&mut game, 2, VertexId(0), 4);
        assert_eq!(update_longest_road(&mut game), None);
        assert_eq!(game.players[2].longest_road, 4);

        let mut game = fixed_game();
        lay_chain(&mut game, 2, VertexId(0), 5);
        assert_eq!(
            update_longest_road(&mut game),
            Some(GameEvent::LongestRoadChanged {
                previous: None,
                current: Some(2),
                length: 5,
            })
        );
        assert_eq!(game.longest_road_holder, Some(2));
    }

    #[test]
    fn test_longest_road_tie_does_not_transfer() {
        let mut game = fixed_game();
        lay_chain(&mut game, 0, VertexId(0), 5);
        update_longest_road(&mut game);
        assert_eq!(game.longest_road_holder, Some(0));

        let far = game
            .board
            .vertices()
            .iter()
            .rev()
            .find(|v| v.hexes.len() == 1)
            .unwrap()
            .id;
        lay_chain(&mut game, 1, far, 5);
        assert_eq!(update_longest_road(&mut game), None);
        assert_eq!(game.longest_road_holder, Some(0));
    }

    #[test]
    fn test_longer_road_takes_title() {
        let mut game = fixed_game();
        lay_chain(&mut game, 0, VertexId(0), 5);
        update_longest_road(&mut game);

        let far = game
            .board
            .vertices()
            .iter()
            .rev()
            .find(|v| v.hexes.len() == 1)
            .unwrap()
            .id;
        lay_chain(&mut game, 1, far, 6);
        assert_eq!(
            update_longest_road(&mut game),
            Some(GameEvent::LongestRoadChanged {
                previous: Some(0),
                current: Some(1),
                length: 6,
            })
        );
        assert_eq!(game.longest_road_holder, Some(1));
    }

    #[test]
    fn test_split_road_loses_title() {
        let mut game = fixed_game();
        let chain = lay_chain(&mut game, 0, VertexId(0), 5);
        update_longest_road(&mut game);
        assert_eq!(game.longest_road_holder, Some(0));

        let [a, b] = game.board.edge(chain[1]).unwrap().vertices;
        let shared = game.board.edge(chain[2]).unwrap().vertices;
        let cut = if shared.contains(&a) { a } else { b };
        game.board.place_settlement(cut, 2);

        assert_eq!(
            update_longest_road(&mut game),
            Some(GameEvent::LongestRoadChanged {
                previous: Some(0),
                current: None,
                length: 0,
            })
        );
        assert_eq!(game.players[0].longest_road, 3);
    }

    #[test]
    fn test_largest_army() {
        let mut game = fixed_game();
        game.players[1].knights_played = 2;
        assert_eq!(update_largest_army(&mut game), None);

        game.players[1].knights_played = 3;
        assert!(update_largest_army(&mut game).is_some());
        assert_eq!(game.largest_army_holder, Some(1));

        game.players[3].knights_played = 3;
        assert_eq!(update_largest_army(&mut game), None, "tie keeps holder");

        game.players[3].knights_played = 4;
        assert_eq!(
            update_largest_army(&mut game),
            Some(GameEvent::LargestArmyChanged {
                previous: Some(1),
                current: Some(3),
                knights: 4,
            })
        );
    }

    #[test]
    fn test_victory_points() {
        let mut game = fixed_game();
        game.board.place_settlement(VertexId(0), 0);
        game.board.place_settlement(VertexId(20), 0);
        assert_eq!(calculate_vp(&game.players[0], &game), 2);

        game.board.upgrade_to_city(VertexId(20), 0);
        assert_eq!(calculate_vp(&game.players[0], &game), 3);

        game.players[0].dev_cards.push(DevelopmentCard::VictoryPoint);
        game.longest_road_holder = Some(0);
        game.largest_army_holder = Some(0);
        assert_eq!(calculate_vp(&game.players[0], &game), 8);
        assert_eq!(calculate_vp(&game.players[1], &game), 0);
    }

    #[test]
    fn test_city_upgrade_never_lowers_vp() {
        let mut game = fixed_game();
        let spots = [VertexId(3), VertexId(17), VertexId(31), VertexId(44)];
        for v in spots {
            game.board.place_settlement(v, 2);
        }

        let mut last = calculate_vp(&game.players[2], &game);
        for v in spots {
            game.board.upgrade_to_city(v, 2);
            let now = calculate_vp(&game.players[2], &game);
            assert_eq!(now, last + 1);
            last = now;
        }
        assert_eq!(
            game.board.buildings_of(2).filter(|(_, b)| *b == Building::City).count(),
            4
        );
    }

    #[test]
    fn test_win_condition_first_in_seat_order() {
        let mut game = fixed_game();
        assert_eq!(check_win_condition(&game), None);

        for player in [1, 3] {
            game.players[player].dev_cards = vec![DevelopmentCard::VictoryPoint; 10];
        }
        assert_eq!(check_win_condition(&game), Some(1));
    }
}
