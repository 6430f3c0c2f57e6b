//! Board topology: hexes, vertices, edges and ports.
//!
//! This module contains:
//! - Resource and terrain types
//! - The arena of hexes, vertices and edges with index-based neighbor lists
//! - The fixed 19-hex layout and its randomized resource/number assignment
//! - Ports for maritime trading
//! - Occupancy mutation used by the rules engine
//!
//! All adjacency is computed once at generation time, so every later query is
//! an index lookup rather than a coordinate comparison.

use crate::hex::{EdgeCoord, HexCoord, VertexCoord};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Player identifier (0-3 for a 4-player game)
pub type PlayerId = u8;

/// Number of seats at the table
pub const PLAYER_COUNT: usize = 4;

/// Rings of hexes around the centre hex
pub const BOARD_RADIUS: u32 = 2;

/// Hexes on the standard board
pub const HEX_COUNT: usize = 19;

/// The five tradeable resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Wood,
    Brick,
    Sheep,
    Wheat,
    Ore,
}

impl Resource {
    /// All resource types
    pub const ALL: [Resource; 5] = [
        Resource::Wood,
        Resource::Brick,
        Resource::Sheep,
        Resource::Wheat,
        Resource::Ore,
    ];
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Resource::Wood => "wood",
            Resource::Brick => "brick",
            Resource::Sheep => "sheep",
            Resource::Wheat => "wheat",
            Resource::Ore => "ore",
        };
        f.write_str(name)
    }
}

/// What a hex is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    /// Produces a resource when its number is rolled
    Resource(Resource),
    /// No production; the robber starts here
    Desert,
    /// Modeled for expansion boards, never produces
    Gold,
}

impl Terrain {
    /// The resource this terrain yields, if it yields one at all
    pub fn resource(&self) -> Option<Resource> {
        match self {
            Terrain::Resource(r) => Some(*r),
            Terrain::Desert | Terrain::Gold => None,
        }
    }
}

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub usize);

        impl $name {
            /// Position in the board arena
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Index of a hex in the board arena
    HexId,
    "hex"
);
arena_id!(
    /// Index of a vertex in the board arena
    VertexId,
    "vertex"
);
arena_id!(
    /// Index of an edge in the board arena
    EdgeId,
    "edge"
);
arena_id!(
    /// Index of a port
    PortId,
    "port"
);

/// Piece that can stand on a vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Building {
    /// 1 VP, 1 resource per producing hex
    Settlement,
    /// 2 VP, 2 resources per producing hex
    City,
}

impl Building {
    /// Victory points provided by this building
    pub fn victory_points(&self) -> u32 {
        match self {
            Building::Settlement => 1,
            Building::City => 2,
        }
    }

    /// How many resources per production
    pub fn resource_multiplier(&self) -> u32 {
        match self {
            Building::Settlement => 1,
            Building::City => 2,
        }
    }
}

/// Piece that can lie on an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgePiece {
    Road,
    /// Modeled but never placed by the current rules
    Ship,
}

/// Who owns what on a vertex or edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement<P> {
    pub player: PlayerId,
    pub piece: P,
}

/// A single hex tile on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hex {
    pub id: HexId,
    /// Position on the hex grid
    pub coord: HexCoord,
    pub terrain: Terrain,
    /// Dice number that triggers production (None for non-producing hexes)
    pub number: Option<u8>,
    /// Whether the robber is currently on this hex
    pub has_robber: bool,
    /// Corners, indexed by corner number
    pub vertices: [VertexId; 6],
    /// Sides, indexed by side number
    pub edges: [EdgeId; 6],
}

impl Hex {
    /// The resource produced when this hex's number is rolled
    pub fn resource(&self) -> Option<Resource> {
        self.terrain.resource()
    }

    /// Check if this hex currently produces resources
    pub fn is_productive(&self) -> bool {
        self.resource().is_some() && self.number.is_some() && !self.has_robber
    }
}

/// A corner shared by up to three hexes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    pub id: VertexId,
    pub key: VertexCoord,
    /// Board hexes touching this corner (1-3)
    pub hexes: Vec<HexId>,
    /// Edges ending at this corner (2-3)
    pub edges: Vec<EdgeId>,
    /// Corners one edge away (2-3)
    pub neighbors: Vec<VertexId>,
    pub occupant: Option<Placement<Building>>,
}

impl Vertex {
    /// Get the owner of the building here, if any
    pub fn owner(&self) -> Option<PlayerId> {
        self.occupant.map(|o| o.player)
    }
}

/// A side shared by up to two hexes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub key: EdgeCoord,
    /// The two corners this edge joins
    pub vertices: [VertexId; 2],
    /// Board hexes sharing this side (1-2)
    pub hexes: Vec<HexId>,
    /// Edges sharing a corner with this one
    pub neighbors: Vec<EdgeId>,
    pub occupant: Option<Placement<EdgePiece>>,
}

impl Edge {
    /// Get the owner of the piece here, if any
    pub fn owner(&self) -> Option<PlayerId> {
        self.occupant.map(|o| o.player)
    }

    /// Whether `player` has a road (not a ship) here
    pub fn is_road_of(&self, player: PlayerId) -> bool {
        self.occupant
            == Some(Placement {
                player,
                piece: EdgePiece::Road,
            })
    }

    /// The endpoint that is not `vertex`
    pub fn other_end(&self, vertex: VertexId) -> VertexId {
        if self.vertices[0] == vertex {
            self.vertices[1]
        } else {
            self.vertices[0]
        }
    }
}

/// What a port accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    /// 3:1 trade any resource
    Generic,
    /// 2:1 trade for a specific resource
    Specific(Resource),
}

impl PortKind {
    /// The exchange rate for this port
    pub fn ratio(&self) -> u32 {
        match self {
            PortKind::Generic => 3,
            PortKind::Specific(_) => 2,
        }
    }
}

/// A port on a coastal edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub id: PortId,
    pub hex: HexId,
    /// Side of `hex` facing the sea
    pub side: u8,
    pub edge: EdgeId,
    pub kind: PortKind,
    pub ratio: u32,
}

/// Resource/number pairs of the classic board, shuffled as pairs.
pub const STANDARD_TILES: [(Terrain, Option<u8>); HEX_COUNT] = [
    (Terrain::Resource(Resource::Ore), Some(10)),
    (Terrain::Resource(Resource::Wheat), Some(2)),
    (Terrain::Resource(Resource::Wood), Some(9)),
    (Terrain::Resource(Resource::Sheep), Some(12)),
    (Terrain::Resource(Resource::Brick), Some(6)),
    (Terrain::Resource(Resource::Wheat), Some(4)),
    (Terrain::Resource(Resource::Wood), Some(8)),
    (Terrain::Desert, None),
    (Terrain::Resource(Resource::Sheep), Some(3)),
    (Terrain::Resource(Resource::Ore), Some(11)),
    (Terrain::Resource(Resource::Brick), Some(5)),
    (Terrain::Resource(Resource::Wheat), Some(6)),
    (Terrain::Resource(Resource::Sheep), Some(10)),
    (Terrain::Resource(Resource::Wood), Some(9)),
    (Terrain::Resource(Resource::Ore), Some(3)),
    (Terrain::Resource(Resource::Brick), Some(8)),
    (Terrain::Resource(Resource::Sheep), Some(11)),
    (Terrain::Resource(Resource::Wheat), Some(5)),
    (Terrain::Resource(Resource::Wood), Some(4)),
];

/// Fixed port slots: (hex, seaward side, kind)
const STANDARD_PORTS: [(HexCoord, u8, PortKind); 8] = [
    (HexCoord::new(0, -2), 0, PortKind::Specific(Resource::Sheep)),
    (HexCoord::new(2, -2), 1, PortKind::Generic),
    (HexCoord::new(2, -1), 1, PortKind::Specific(Resource::Wood)),
    (HexCoord::new(1, 1), 2, PortKind::Specific(Resource::Ore)),
    (HexCoord::new(0, 2), 3, PortKind::Specific(Resource::Wheat)),
    (HexCoord::new(-2, 2), 4, PortKind::Generic),
    (HexCoord::new(-2, 0), 4, PortKind::Specific(Resource::Wood)),
    (HexCoord::new(-1, -1), 5, PortKind::Specific(Resource::Brick)),
];

/// The complete game board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    hexes: Vec<Hex>,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    ports: Vec<Port>,
}

impl Board {
    /// Create the standard board with randomized tiles
    pub fn standard() -> Self {
        let mut rng = rand::thread_rng();
        Self::standard_with_rng(&mut rng)
    }

    /// Create the standard board with a provided RNG.
    ///
    /// The 19 resource/number pairs are shuffled as a uniform permutation and
    /// assigned positionally to the fixed radius-2 coordinates. Adjacent 6s
    /// and 8s are not prevented.
    pub fn standard_with_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut tiles = STANDARD_TILES;
        tiles.shuffle(rng);
        Self::with_layout(tiles)
    }

    /// Build a board from an explicit tile assignment, in spiral order from
    /// the centre hex outwards.
    pub fn with_layout(tiles: [(Terrain, Option<u8>); HEX_COUNT]) -> Self {
        let coords = HexCoord::default().spiral(BOARD_RADIUS);
        let mut builder = TopologyBuilder::default();

        for (i, (coord, (terrain, number))) in coords.iter().zip(tiles).enumerate() {
            builder.add_hex(HexId(i), *coord, terrain, number);
        }

        let mut board = builder.finish();

        for (i, (coord, side, kind)) in STANDARD_PORTS.iter().enumerate() {
            let Some(hex) = board.hex_at(coord) else {
                continue;
            };
            let edge = board.hexes[hex.index()].edges[*side as usize];
            board.ports.push(Port {
                id: PortId(i),
                hex,
                side: *side,
                edge,
                kind: *kind,
                ratio: kind.ratio(),
            });
        }

        board
    }

    // ==================== Query Methods ====================

    pub fn hexes(&self) -> &[Hex] {
        &self.hexes
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn hex(&self, id: HexId) -> Option<&Hex> {
        self.hexes.get(id.index())
    }

    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.index())
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index())
    }

    /// Find the hex at a coordinate
    pub fn hex_at(&self, coord: &HexCoord) -> Option<HexId> {
        self.hexes.iter().find(|h| h.coord == *coord).map(|h| h.id)
    }

    /// The edge joining two vertices, if they are adjacent
    pub fn edge_between(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        self.vertex(a)?
            .edges
            .iter()
            .copied()
            .find(|e| self.edges[e.index()].other_end(a) == b)
    }

    /// Get the robber's current hex
    pub fn robber_hex(&self) -> Option<HexId> {
        self.hexes.iter().find(|h| h.has_robber).map(|h| h.id)
    }

    /// Vertices holding a building of `player`
    pub fn buildings_of(&self, player: PlayerId) -> impl Iterator<Item = (&Vertex, Building)> {
        self.vertices.iter().filter_map(move |v| match v.occupant {
            Some(Placement { player: p, piece }) if p == player => Some((v, piece)),
            _ => None,
        })
    }

    /// Edges holding a road of `player`
    pub fn roads_of(&self, player: PlayerId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.is_road_of(player))
    }

    /// Ports a player reaches through a building on either end of the port edge
    pub fn player_ports(&self, player: PlayerId) -> Vec<&Port> {
        self.ports
            .iter()
            .filter(|port| {
                self.edges[port.edge.index()]
                    .vertices
                    .iter()
                    .any(|v| self.vertices[v.index()].owner() == Some(player))
            })
            .collect()
    }

    /// Structural sanity check used when restoring snapshots: ids match
    /// their slots, every cross reference is in range, occupants belong to
    /// real seats, and exactly one hex holds the robber.
    pub fn is_well_formed(&self) -> bool {
        let hex_ok = |h: &HexId| h.index() < self.hexes.len();
        let vertex_ok = |v: &VertexId| v.index() < self.vertices.len();
        let edge_ok = |e: &EdgeId| e.index() < self.edges.len();
        let seat_ok = |p: PlayerId| (p as usize) < PLAYER_COUNT;

        let hexes_ok = self.hexes.iter().enumerate().all(|(i, h)| {
            h.id.index() == i && h.vertices.iter().all(vertex_ok) && h.edges.iter().all(edge_ok)
        });
        let vertices_ok = self.vertices.iter().enumerate().all(|(i, v)| {
            v.id.index() == i
                && v.hexes.iter().all(hex_ok)
                && v.edges.iter().all(edge_ok)
                && v.neighbors.iter().all(vertex_ok)
                && v.owner().map_or(true, seat_ok)
        });
        let edges_ok = self.edges.iter().enumerate().all(|(i, e)| {
            e.id.index() == i
                && e.vertices.iter().all(vertex_ok)
                && e.hexes.iter().all(hex_ok)
                && e.neighbors.iter().all(edge_ok)
                && e.owner().map_or(true, seat_ok)
        });
        let ports_ok = self
            .ports
            .iter()
            .all(|p| hex_ok(&p.hex) && edge_ok(&p.edge));
        let robbers = self.hexes.iter().filter(|h| h.has_robber).count();

        self.hexes.len() == HEX_COUNT
            && hexes_ok
            && vertices_ok
            && edges_ok
            && ports_ok
            && robbers == 1
    }

    // ==================== Mutation Methods ====================
    //
    // These assume the rules engine already validated the placement.

    /// Place a settlement
    pub fn place_settlement(&mut self, vertex: VertexId, player: PlayerId) {
        if let Some(v) = self.vertices.get_mut(vertex.index()) {
            v.occupant = Some(Placement {
                player,
                piece: Building::Settlement,
            });
        }
    }

    /// Upgrade a settlement to a city in place
    pub fn upgrade_to_city(&mut self, vertex: VertexId, player: PlayerId) {
        if let Some(v) = self.vertices.get_mut(vertex.index()) {
            v.occupant = Some(Placement {
                player,
                piece: Building::City,
            });
        }
    }

    /// Place a road
    pub fn place_road(&mut self, edge: EdgeId, player: PlayerId) {
        if let Some(e) = self.edges.get_mut(edge.index()) {
            e.occupant = Some(Placement {
                player,
                piece: EdgePiece::Road,
            });
        }
    }

    /// Move the robber onto `hex`, clearing it everywhere else
    pub fn move_robber(&mut self, hex: HexId) {
        for h in &mut self.hexes {
            h.has_robber = h.id == hex;
        }
    }
}

/// Interns corner and side keys while hexes are added so that shared corners
/// and sides resolve to a single arena entry.
#[derive(Default)]
struct TopologyBuilder {
    hexes: Vec<Hex>,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    vertex_index: HashMap<VertexCoord, VertexId>,
    edge_index: HashMap<EdgeCoord, EdgeId>,
}

impl TopologyBuilder {
    fn add_hex(&mut self, id: HexId, coord: HexCoord, terrain: Terrain, number: Option<u8>) {
        let mut vertices = [VertexId(0); 6];
        for (slot, key) in vertices.iter_mut().zip(coord.corners()) {
            let vertex = self.intern_vertex(key);
            self.vertices[vertex.index()].hexes.push(id);
            *slot = vertex;
        }

        let mut edges = [EdgeId(0); 6];
        for (side, slot) in edges.iter_mut().enumerate() {
            let key = coord.side(side as u8);
            // Both endpoints are corners of this hex, already interned above.
            let ends = [vertices[side], vertices[(side + 1) % 6]];
            let edge = self.intern_edge(key, ends);
            self.edges[edge.index()].hexes.push(id);
            *slot = edge;
        }

        self.hexes.push(Hex {
            id,
            coord,
            terrain,
            number: terrain.resource().and(number),
            has_robber: terrain == Terrain::Desert,
            vertices,
            edges,
        });
    }

    fn intern_vertex(&mut self, key: VertexCoord) -> VertexId {
        if let Some(id) = self.vertex_index.get(&key) {
            return *id;
        }
        let id = VertexId(self.vertices.len());
        self.vertices.push(Vertex {
            id,
            key,
            hexes: Vec::new(),
            edges: Vec::new(),
            neighbors: Vec::new(),
            occupant: None,
        });
        self.vertex_index.insert(key, id);
        id
    }

    fn intern_edge(&mut self, key: EdgeCoord, ends: [VertexId; 2]) -> EdgeId {
        if let Some(id) = self.edge_index.get(&key) {
            return *id;
        }
        let id = EdgeId(self.edges.len());
        self.edges.push(Edge {
            id,
            key,
            vertices: ends,
            hexes: Vec::new(),
            neighbors: Vec::new(),
            occupant: None,
        });
        self.edge_index.insert(key, id);
        id
    }

    fn finish(mut self) -> Board {
        for edge in &self.edges {
            for v in edge.vertices {
                self.vertices[v.index()].edges.push(edge.id);
            }
        }

        for vertex in &mut self.vertices {
            vertex.neighbors = vertex
                .edges
                .iter()
                .map(|e| self.edges[e.index()].other_end(vertex.id))
                .collect();
        }

        let vertex_edges: Vec<Vec<EdgeId>> =
            self.vertices.iter().map(|v| v.edges.clone()).collect();
        for edge in &mut self.edges {
            edge.neighbors = edge
                .vertices
                .iter()
                .flat_map(|v| vertex_edges[v.index()].iter().copied())
                .filter(|e| *e != edge.id)
                .collect();
        }

        Board {
            hexes: self.hexes,
            vertices: self.vertices,
            edges: self.edges,
            ports: Vec::new(),
        }
    }
}
