//! Catan board topology and game-rules engine.
//!
//! This crate provides the core game logic, including:
//! - Hex coordinate system with exact corner and side canonicalization
//! - Board topology: hexes, vertices, edges and ports with neighbor lists
//! - Player state and resource management
//! - Rules engine, awards and the turn/phase controller
//! - Simple bots that play through the same action interface as people
//!
//! # Architecture
//!
//! The engine is UI-agnostic. A front end (or the bundled CLI) feeds
//! [`GameAction`]s into [`GameState::apply_action`] and renders the state
//! and the returned [`GameEvent`]s. All randomness comes from a caller
//! supplied `rand::Rng`, so a seeded generator replays a game exactly.
//!
//! # Modules
//!
//! - [`hex`]: Coordinate system for hex tiles, vertices, and edges
//! - [`board`]: Topology generator and board queries
//! - [`player`]: Player state, resources and development cards
//! - [`state`]: Game state store and snapshots
//! - [`rules`]: Rules engine operations
//! - [`awards`]: Longest road, largest army and victory points
//! - [`controller`]: Turn/phase controller and valid action enumeration
//! - [`bot`]: AI players

pub mod actions;
pub mod awards;
pub mod board;
pub mod bot;
pub mod controller;
pub mod hex;
pub mod player;
pub mod rules;
pub mod state;

// Re-export commonly used types
pub use actions::{GameAction, GameEvent, TradeOffer};
pub use board::{
    Board, Building, EdgeId, HexId, PlayerId, Port, PortKind, Resource, Terrain, VertexId,
};
pub use bot::{Bot, BotDifficulty};
pub use controller::GameError;
pub use hex::{EdgeCoord, HexCoord, VertexCoord};
pub use player::{DevelopmentCard, Player, PlayerColor, ResourceHand};
pub use state::{GameConfig, GameState, LogEntry, Phase, SnapshotError};
