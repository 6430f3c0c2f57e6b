//! Game actions that players can take.
//!
//! This module defines all possible actions in the game and the events
//! that result from those actions. Events double as the game log: each one
//! renders to a short human-readable line.

use crate::board::{EdgeId, HexId, PlayerId, Resource, VertexId};
use crate::player::ResourceHand;
use crate::state::Phase;
use serde::{Deserialize, Serialize};
use std::fmt;

/// All possible actions a player can take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    // ==================== Setup Phase ====================
    /// Place initial settlement during setup
    PlaceInitialSettlement(VertexId),
    /// Place initial road during setup (must touch the just-placed settlement)
    PlaceInitialRoad(EdgeId),

    // ==================== Turn Actions ====================
    /// Roll the dice (must be done before building or trading)
    RollDice,

    // ==================== Robber Actions ====================
    /// Discard half your cards after a 7 (cards chosen at random)
    DiscardHalf,
    /// Move the robber to a new hex (after rolling 7 or playing knight)
    MoveRobber(HexId),
    /// Choose a player to steal from (after moving robber)
    StealFrom(PlayerId),

    // ==================== Building Actions ====================
    /// Build a road at an edge (free while road building)
    BuildRoad(EdgeId),
    /// Build a settlement at a vertex
    BuildSettlement(VertexId),
    /// Upgrade a settlement to a city
    BuildCity(VertexId),
    /// Buy a development card from the deck
    BuyDevelopmentCard,

    // ==================== Development Card Actions ====================
    /// Play a knight card (move robber, steal, counts toward largest army)
    PlayKnight,
    /// Play road building card (then place up to 2 free roads)
    PlayRoadBuilding,
    /// Stop placing free roads early
    FinishRoadBuilding,
    /// Play year of plenty (take 2 resources from bank)
    PlayYearOfPlenty(Resource, Resource),
    /// Play monopoly (take all of one resource from all opponents)
    PlayMonopoly(Resource),

    // ==================== Trading Actions ====================
    /// Propose a trade to other players
    ProposeTrade(TradeOffer),
    /// Accept the current trade offer
    AcceptTrade,
    /// Reject the current trade offer
    RejectTrade,
    /// Cancel your own trade offer
    CancelTrade,
    /// Trade with the bank (4:1) or through a port (3:1 or 2:1)
    BankTrade { give: Resource, receive: Resource },

    // ==================== Turn Management ====================
    /// End your turn
    EndTurn,
}

/// A trade offer between players
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOffer {
    /// Player making the offer
    pub from: PlayerId,
    /// Specific player to trade with, or None for open offer
    pub to: Option<PlayerId>,
    /// Resources being offered
    pub offering: ResourceHand,
    /// Resources being requested
    pub requesting: ResourceHand,
}

impl TradeOffer {
    /// Create a new trade offer
    pub fn new(
        from: PlayerId,
        to: Option<PlayerId>,
        offering: ResourceHand,
        requesting: ResourceHand,
    ) -> Self {
        Self {
            from,
            to,
            offering,
            requesting,
        }
    }

    /// Check if offer is valid (non-empty on both sides, not to yourself)
    pub fn is_valid(&self) -> bool {
        !self.offering.is_empty() && !self.requesting.is_empty() && self.to != Some(self.from)
    }

    /// Whether `player` may answer this offer
    pub fn is_addressed_to(&self, player: PlayerId) -> bool {
        player != self.from && self.to.map_or(true, |to| to == player)
    }
}

/// Events that occur as a result of actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Dice were rolled
    DiceRolled {
        player: PlayerId,
        roll: (u8, u8),
        total: u8,
    },

    /// Resources were distributed after a dice roll or a second setup settlement
    ResourcesDistributed {
        distributions: Vec<(PlayerId, Resource, u32)>,
    },

    /// A settlement was built
    SettlementBuilt { player: PlayerId, location: VertexId },

    /// A settlement was upgraded to a city
    CityBuilt { player: PlayerId, location: VertexId },

    /// A road was built
    RoadBuilt { player: PlayerId, location: EdgeId },

    /// Setup moved on to the next placement or into the main game
    SetupAdvanced { phase: Phase, next_player: PlayerId },

    /// A development card was purchased
    DevelopmentCardPurchased { player: PlayerId },

    /// A knight was played
    KnightPlayed { player: PlayerId },

    /// Road building card was played
    RoadBuildingPlayed { player: PlayerId, free_roads: u8 },

    /// Year of plenty card was played
    YearOfPlentyPlayed {
        player: PlayerId,
        resources: (Resource, Resource),
    },

    /// Monopoly card was played
    MonopolyPlayed {
        player: PlayerId,
        resource: Resource,
        total_stolen: u32,
    },

    /// Players holding too many cards must discard
    DiscardRequired { players: Vec<PlayerId> },

    /// Player had to discard cards
    CardsDiscarded { player: PlayerId, count: u32 },

    /// The robber was moved
    RobberMoved {
        player: PlayerId,
        from: Option<HexId>,
        to: HexId,
    },

    /// A resource was stolen
    ResourceStolen {
        thief: PlayerId,
        victim: PlayerId,
        resource: Option<Resource>,
    },

    /// A trade was proposed
    TradeProposed { offer: TradeOffer },

    /// A trade was completed
    TradeCompleted { player1: PlayerId, player2: PlayerId },

    /// A player turned the offer down
    TradeRejected { player: PlayerId },

    /// The offer was withdrawn, or everyone it was addressed to declined
    TradeCancelled,

    /// Bank or port trade completed
    BankTradeCompleted {
        player: PlayerId,
        gave: Resource,
        gave_count: u32,
        received: Resource,
    },

    /// Longest road changed hands
    LongestRoadChanged {
        previous: Option<PlayerId>,
        current: Option<PlayerId>,
        length: u32,
    },

    /// Largest army changed hands
    LargestArmyChanged {
        previous: Option<PlayerId>,
        current: Option<PlayerId>,
        knights: u32,
    },

    /// Turn ended
    TurnEnded {
        player: PlayerId,
        next_player: PlayerId,
        turn: u32,
    },

    /// A player won the game
    GameWon {
        player: PlayerId,
        victory_points: u32,
    },
}

fn holder(player: &Option<PlayerId>) -> String {
    match player {
        Some(p) => format!("player {}", p),
        None => "nobody".to_string(),
    }
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEvent::DiceRolled { player, roll, total } => {
                write!(f, "player {} rolled {} ({} + {})", player, total, roll.0, roll.1)
            }
            GameEvent::ResourcesDistributed { distributions } => {
                let parts: Vec<String> = distributions
                    .iter()
                    .map(|(p, r, n)| format!("player {} +{} {}", p, n, r))
                    .collect();
                write!(f, "production: {}", parts.join(", "))
            }
            GameEvent::SettlementBuilt { player, location } => {
                write!(f, "player {} built a settlement at {}", player, location)
            }
            GameEvent::CityBuilt { player, location } => {
                write!(f, "player {} built a city at {}", player, location)
            }
            GameEvent::RoadBuilt { player, location } => {
                write!(f, "player {} built a road at {}", player, location)
            }
            GameEvent::SetupAdvanced { phase, next_player } => {
                write!(f, "{:?}: player {} to place", phase, next_player)
            }
            GameEvent::DevelopmentCardPurchased { player } => {
                write!(f, "player {} bought a development card", player)
            }
            GameEvent::KnightPlayed { player } => write!(f, "player {} played a knight", player),
            GameEvent::RoadBuildingPlayed { player, free_roads } => write!(
                f,
                "player {} played road building ({} free roads)",
                player, free_roads
            ),
            GameEvent::YearOfPlentyPlayed { player, resources } => write!(
                f,
                "player {} took {} and {} with year of plenty",
                player, resources.0, resources.1
            ),
            GameEvent::MonopolyPlayed {
                player,
                resource,
                total_stolen,
            } => write!(
                f,
                "player {} monopolized {} and collected {}",
                player, resource, total_stolen
            ),
            GameEvent::DiscardRequired { players } => {
                write!(f, "players {:?} must discard half their cards", players)
            }
            GameEvent::CardsDiscarded { player, count } => {
                write!(f, "player {} discarded {} cards", player, count)
            }
            GameEvent::RobberMoved { player, to, .. } => {
                write!(f, "player {} moved the robber to {}", player, to)
            }
            GameEvent::ResourceStolen { thief, victim, .. } => {
                write!(f, "player {} stole from player {}", thief, victim)
            }
            GameEvent::TradeProposed { offer } => match offer.to {
                Some(to) => write!(f, "player {} offered a trade to player {}", offer.from, to),
                None => write!(f, "player {} offered a trade to the table", offer.from),
            },
            GameEvent::TradeCompleted { player1, player2 } => {
                write!(f, "player {} traded with player {}", player1, player2)
            }
            GameEvent::TradeRejected { player } => {
                write!(f, "player {} rejected the trade", player)
            }
            GameEvent::TradeCancelled => write!(f, "trade cancelled"),
            GameEvent::BankTradeCompleted {
                player,
                gave,
                gave_count,
                received,
            } => write!(
                f,
                "player {} traded {} {} for 1 {}",
                player, gave_count, gave, received
            ),
            GameEvent::LongestRoadChanged {
                previous,
                current,
                length,
            } => write!(
                f,
                "longest road moved from {} to {} ({} roads)",
                holder(previous),
                holder(current),
                length
            ),
            GameEvent::LargestArmyChanged {
                previous,
                current,
                knights,
            } => write!(
                f,
                "largest army moved from {} to {} ({} knights)",
                holder(previous),
                holder(current),
                knights
            ),
            GameEvent::TurnEnded {
                player,
                next_player,
                turn,
            } => write!(
                f,
                "player {} ended the turn, player {} is up (turn {})",
                player, next_player, turn
            ),
            GameEvent::GameWon {
                player,
                victory_points,
            } => write!(f, "player {} wins with {} VP", player, victory_points),
        }
    }
}
