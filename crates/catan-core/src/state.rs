//! Game state store.
//!
//! `GameState` is the aggregate root every rules operation reads and mutates.
//! It is created once per game from a `GameConfig`, mutated in place, and
//! replaced wholesale when a new game starts. Snapshots serialize the whole
//! state to JSON and back.

use crate::actions::TradeOffer;
use crate::board::{Board, HexId, PlayerId, VertexId, PLAYER_COUNT};
use crate::player::{DevelopmentCard, Player};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Victory points needed to win by default
pub const VICTORY_POINTS_TO_WIN: u32 = 10;

/// Game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// First placement round, ascending seat order
    Setup1,
    /// Second placement round, descending seat order
    Setup2,
    /// Regular turn: roll, then build and trade
    Playing,
    /// A domestic trade offer is on the table
    Trading,
    /// Placing free roads from a road building card
    Building,
    /// Robber must be moved (and possibly a victim picked)
    Robbing,
    /// Players holding too many cards must discard after a 7
    Discarding,
    /// Someone reached the victory point target
    GameOver,
}

impl Phase {
    pub fn is_setup(&self) -> bool {
        matches!(self, Phase::Setup1 | Phase::Setup2)
    }
}

/// Table setup for a new game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Display names, by seat
    pub player_names: [String; PLAYER_COUNT],
    /// Which seats a person controls
    pub human: [bool; PLAYER_COUNT],
    pub victory_points_to_win: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player_names: ["You", "Red", "Blue", "Orange"].map(String::from),
            human: [true, false, false, false],
            victory_points_to_win: VICTORY_POINTS_TO_WIN,
        }
    }
}

impl GameConfig {
    /// Every seat played by a bot
    pub fn all_bots() -> Self {
        Self {
            human: [false; PLAYER_COUNT],
            ..Self::default()
        }
    }
}

/// One line of the in-game history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub turn: u32,
    /// Current player when the entry was written
    pub player: PlayerId,
    pub action: String,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

/// An open domestic trade and who has turned it down so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTrade {
    pub offer: TradeOffer,
    pub rejected_by: Vec<PlayerId>,
}

/// Errors from snapshot save/restore
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot board is malformed")]
    MalformedBoard,

    #[error("snapshot refers to player {0}, which does not exist")]
    UnknownPlayer(PlayerId),

    #[error("snapshot player in seat {0} has a different id")]
    SeatMismatch(usize),
}

/// Complete game state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// The four seats
    pub players: [Player; PLAYER_COUNT],
    pub board: Board,
    pub current_player: PlayerId,
    pub phase: Phase,
    /// Last dice roll this turn, if rolled
    pub dice: Option<(u8, u8)>,
    /// Turn counter, starting at 1
    pub turn: u32,
    /// Draw pile, drawn from the end
    pub dev_deck: Vec<DevelopmentCard>,
    pub longest_road_holder: Option<PlayerId>,
    pub largest_army_holder: Option<PlayerId>,
    pub winner: Option<PlayerId>,
    /// Chronological log of everything that happened
    pub log: Vec<LogEntry>,

    // ==================== Setup / Robber Bookkeeping ====================
    /// Players who finished the current setup round
    pub setup_finished: Vec<PlayerId>,
    /// Settlement placed this setup step, awaiting its road
    pub setup_settlement: Option<VertexId>,
    /// Players who still owe a discard after a 7
    pub pending_discards: Vec<PlayerId>,
    /// Hex the robber was moved to during this robbing step
    pub robber_hex: Option<HexId>,
    /// Player most recently stolen from
    pub steal_target: Option<PlayerId>,

    // ==================== Turn Bookkeeping ====================
    /// Free roads left from a road building card
    pub free_roads: u8,
    /// Whether a development card was already played this turn
    pub dev_card_played: bool,
    pub pending_trade: Option<PendingTrade>,
    pub victory_points_to_win: u32,
}

impl GameState {
    /// Start a new game: fresh board, shuffled deck, everyone in setup
    pub fn new<R: Rng + ?Sized>(config: &GameConfig, rng: &mut R) -> Self {
        let board = Board::standard_with_rng(rng);
        let dev_deck = DevelopmentCard::shuffled_deck(rng);
        let players = [0, 1, 2, 3].map(|id: PlayerId| {
            Player::new(
                id,
                config.player_names[id as usize].clone(),
                config.human[id as usize],
            )
        });

        Self {
            players,
            board,
            current_player: 0,
            phase: Phase::Setup1,
            dice: None,
            turn: 1,
            dev_deck,
            longest_road_holder: None,
            largest_army_holder: None,
            winner: None,
            log: Vec::new(),
            setup_finished: Vec::new(),
            setup_settlement: None,
            pending_discards: Vec::new(),
            robber_hex: None,
            steal_target: None,
            free_roads: 0,
            dev_card_played: false,
            pending_trade: None,
            victory_points_to_win: config.victory_points_to_win,
        }
    }

    /// Get a player by ID
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id as usize)
    }

    /// Get a mutable player by ID
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id as usize)
    }

    /// Check if game is over
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::GameOver
    }

    // ==================== Snapshots ====================

    /// Every player id stored outside the board
    fn referenced_players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        let seats = [
            Some(self.current_player),
            self.longest_road_holder,
            self.largest_army_holder,
            self.winner,
            self.steal_target,
        ];
        let trade = self.pending_trade.iter().flat_map(|t| {
            [Some(t.offer.from), t.offer.to]
                .into_iter()
                .flatten()
                .chain(t.rejected_by.iter().copied())
        });
        seats
            .into_iter()
            .flatten()
            .chain(self.setup_finished.iter().copied())
            .chain(self.pending_discards.iter().copied())
            .chain(trade)
    }

    /// Serialize the whole state
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore a state saved with [`GameState::to_json`]
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let state: GameState = serde_json::from_str(json)?;

        if !state.board.is_well_formed() {
            return Err(SnapshotError::MalformedBoard);
        }
        if let Some((seat, _)) = state
            .players
            .iter()
            .enumerate()
            .find(|(seat, p)| p.id as usize != *seat)
        {
            return Err(SnapshotError::SeatMismatch(seat));
        }
        if let Some(bad) = state.referenced_players().find(|p| *p as usize >= PLAYER_COUNT) {
            return Err(SnapshotError::UnknownPlayer(bad));
        }
        let vertex_ok = state
            .setup_settlement
            .map_or(true, |v| state.board.vertex(v).is_some());
        let hex_ok = state.robber_hex.map_or(true, |h| state.board.hex(h).is_some());
        if !vertex_ok || !hex_ok {
            return Err(SnapshotError::MalformedBoard);
        }

        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn new_game(seed: u64) -> GameState {
        GameState::new(&GameConfig::default(), &mut StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_new_game_starts_in_setup() {
        let game = new_game(1);
        assert_eq!(game.phase, Phase::Setup1);
        assert_eq!(game.current_player, 0);
        assert_eq!(game.turn, 1);
        assert_eq!(game.dice, None);
        assert_eq!(game.dev_deck.len(), 31);
    }

    #[test]
    fn test_default_config_seats() {
        let game = new_game(2);
        let names: Vec<&str> = game.players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["You", "Red", "Blue", "Orange"]);
        assert!(game.players[0].is_human);
        assert!(game.players[1..].iter().all(|p| !p.is_human));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut game = new_game(3);
        game.players[1].resources.wood = 4;
        game.board.place_settlement(VertexId(7), 1);
        game.phase = Phase::Robbing;

        let json = game.to_json().unwrap();
        let restored = GameState::from_json(&json).unwrap();
        assert_eq!(restored, game);
    }

    #[test]
    fn test_snapshot_rejects_garbage() {
        assert!(matches!(
            GameState::from_json("{not json"),
            Err(SnapshotError::Json(_))
        ));
    }

    #[test]
    fn test_snapshot_rejects_unknown_player() {
        let mut game = new_game(4);
        game.winner = Some(9);
        let json = game.to_json().unwrap();
        assert!(matches!(
            GameState::from_json(&json),
            Err(SnapshotError::UnknownPlayer(9))
        ));
    }

    #[test]
    fn test_snapshot_rejects_foreign_occupant() {
        let mut game = new_game(5);
        game.board.place_settlement(VertexId(12), 9);
        let json = game.to_json().unwrap();
        assert!(matches!(
            GameState::from_json(&json),
            Err(SnapshotError::MalformedBoard)
        ));
    }

    #[test]
    fn test_snapshot_rejects_unknown_bookkeeping_ids() {
        let mut game = new_game(6);
        game.pending_discards = vec![1, 5];
        let json = game.to_json().unwrap();
        assert!(matches!(
            GameState::from_json(&json),
            Err(SnapshotError::UnknownPlayer(5))
        ));

        let mut game = new_game(6);
        game.setup_finished = vec![0, 4];
        let json = game.to_json().unwrap();
        assert!(matches!(
            GameState::from_json(&json),
            Err(SnapshotError::UnknownPlayer(4))
        ));
    }

    #[test]
    fn test_snapshot_rejects_swapped_seats() {
        let mut game = new_game(7);
        game.players[2].id = 3;
        let json = game.to_json().unwrap();
        assert!(matches!(
            GameState::from_json(&json),
            Err(SnapshotError::SeatMismatch(2))
        ));
    }
}
