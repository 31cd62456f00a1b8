//! Game board representation: tiles, the sea ring and ports.
//!
//! This module contains:
//! - Resource types
//! - Tile kinds (classical, desert, quantum)
//! - Sea tiles and port types
//! - Board generation, including the initial entangled pairs

use crate::config::BoardConfig;
use crate::hex::HexCoord;
use crate::quantum::{GroupId, GroupPool, Superposition};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Player identifier (0-3 for a 4-player game)
pub type PlayerId = u8;

/// Resource types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resource {
    Brick,
    Lumber,
    Ore,
    Grain,
    Wool,
}

impl Resource {
    /// All resource types
    pub const ALL: [Resource; 5] = [
        Resource::Brick,
        Resource::Lumber,
        Resource::Ore,
        Resource::Grain,
        Resource::Wool,
    ];

    /// Position of this resource in fixed-size resource vectors
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            Resource::Brick => "brick",
            Resource::Lumber => "lumber",
            Resource::Ore => "ore",
            Resource::Grain => "grain",
            Resource::Wool => "wool",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a land tile is
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TileKind {
    /// Produces a fixed resource when its number is rolled
    Classical { resource: Resource, number: u8 },
    /// No resource, no number
    Desert,
    /// Produces tokens until its entangled pair collapses
    Quantum { number: u8, state: Superposition },
}

/// A single land tile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    /// Position on the hex grid
    pub coord: HexCoord,
    pub kind: TileKind,
}

impl Tile {
    pub fn classical(coord: HexCoord, resource: Resource, number: u8) -> Self {
        Self {
            coord,
            kind: TileKind::Classical { resource, number },
        }
    }

    pub fn desert(coord: HexCoord) -> Self {
        Self {
            coord,
            kind: TileKind::Desert,
        }
    }

    pub fn quantum(coord: HexCoord, number: u8, state: Superposition) -> Self {
        Self {
            coord,
            kind: TileKind::Quantum { number, state },
        }
    }

    /// Dice number that triggers production (None for the desert)
    pub fn number(&self) -> Option<u8> {
        match self.kind {
            TileKind::Classical { number, .. } | TileKind::Quantum { number, .. } => Some(number),
            TileKind::Desert => None,
        }
    }

    /// The concrete resource, if this tile is classical
    pub fn resource(&self) -> Option<Resource> {
        match self.kind {
            TileKind::Classical { resource, .. } => Some(resource),
            _ => None,
        }
    }

    /// Quantum state, if this tile is in superposition
    pub fn superposition(&self) -> Option<&Superposition> {
        match &self.kind {
            TileKind::Quantum { state, .. } => Some(state),
            _ => None,
        }
    }

    pub fn group(&self) -> Option<GroupId> {
        self.superposition().map(|s| s.group)
    }

    pub fn is_desert(&self) -> bool {
        matches!(self.kind, TileKind::Desert)
    }

    pub fn is_quantum(&self) -> bool {
        matches!(self.kind, TileKind::Quantum { .. })
    }
}

/// Harbor types for maritime trading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Harbor {
    /// 3:1 trade any resource
    Generic,
    /// 2:1 trade for a specific resource
    Specific(Resource),
}

impl Harbor {
    /// The exchange rate for this harbor
    pub fn rate(&self) -> u32 {
        match self {
            Harbor::Generic => 3,
            Harbor::Specific(_) => 2,
        }
    }
}

/// A tile of the ring surrounding the land
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeaTile {
    pub coord: HexCoord,
    /// Port on this tile, or open water
    pub port: Option<Harbor>,
}

/// Errors raised while generating a board
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BoardError {
    #[error("{pool} pool holds {available} entries but {needed} land tiles need one")]
    PoolTooSmall {
        pool: String,
        available: usize,
        needed: usize,
    },
}

/// The land tiles and the surrounding sea ring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    /// Land tiles, sorted by coordinate; indices are stable for the game
    pub tiles: Vec<Tile>,
    /// Sea ring in angular order
    pub sea_tiles: Vec<SeaTile>,
}

/// Result of board generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedBoard {
    pub board: Board,
    pub pairs_requested: u8,
    /// Fewer than requested when the board ran out of eligible tiles or ids
    pub pairs_created: u8,
}

impl Board {
    /// Assemble a board from prepared tiles
    pub fn from_tiles(tiles: Vec<Tile>, sea_tiles: Vec<SeaTile>) -> Self {
        Self { tiles, sea_tiles }
    }

    /// Generate a randomized board.
    ///
    /// Group ids for the initial entangled pairs are drawn from `pool`.
    pub fn generate<R: Rng>(
        config: &BoardConfig,
        pool: &mut GroupPool,
        rng: &mut R,
    ) -> Result<GeneratedBoard, BoardError> {
        let coords = HexCoord::within_radius(config.radius);
        let needed = coords.len().saturating_sub(1);
        check_pool("resource", config.resources.len(), needed)?;
        check_pool("number", config.numbers.len(), needed)?;

        let mut resources = config.resources.clone();
        resources.shuffle(rng);
        let mut numbers = config.numbers.clone();
        numbers.shuffle(rng);
        let desert = rng.gen_range(0..coords.len());

        let mut resources = resources.into_iter();
        let mut numbers = numbers.into_iter();
        let mut tiles = Vec::with_capacity(coords.len());
        for (i, coord) in coords.iter().enumerate() {
            let tile = if i == desert {
                Tile::desert(*coord)
            } else {
                match (resources.next(), numbers.next()) {
                    (Some(resource), Some(number)) => Tile::classical(*coord, resource, number),
                    _ => {
                        return Err(BoardError::PoolTooSmall {
                            pool: "resource".into(),
                            available: config.resources.len(),
                            needed,
                        })
                    }
                }
            };
            tiles.push(tile);
        }

        let mut board = Self {
            tiles,
            sea_tiles: generate_sea_ring(config, rng),
        };

        let mut pairs_created = 0;
        for _ in 0..config.entangled_pairs {
            if !board.entangle_random_pair(pool, rng) {
                break;
            }
            pairs_created += 1;
        }
        if pairs_created < config.entangled_pairs {
            tracing::warn!(
                target: "quantum_catan::board",
                requested = config.entangled_pairs,
                created = pairs_created,
                "board.entangled_pairs.shortfall"
            );
        }

        Ok(GeneratedBoard {
            board,
            pairs_requested: config.entangled_pairs,
            pairs_created,
        })
    }

    /// Entangle one uniformly chosen eligible pair. Returns false if no
    /// pair of classical tiles with different resources exists or the pool
    /// is exhausted.
    fn entangle_random_pair<R: Rng>(&mut self, pool: &mut GroupPool, rng: &mut R) -> bool {
        let pairs = self.eligible_pairs();
        let Some(&(a, b)) = pairs.choose(rng) else {
            return false;
        };
        let Some(group) = pool.allocate() else {
            return false;
        };
        self.entangle(a, b, group)
    }

    /// Every unordered pair of classical tiles holding different resources
    pub fn eligible_pairs(&self) -> Vec<(usize, usize)> {
        let classical: Vec<(usize, Resource)> = self
            .tiles
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.resource().map(|r| (i, r)))
            .collect();

        let mut pairs = Vec::new();
        for (x, &(a, ra)) in classical.iter().enumerate() {
            for &(b, rb) in &classical[x + 1..] {
                if ra != rb {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }

    /// Turn two classical tiles into an entangled pair. Candidates are the
    /// two tiles' resources, in argument order.
    pub fn entangle(&mut self, a: usize, b: usize, group: GroupId) -> bool {
        let (Some(ta), Some(tb)) = (self.tiles.get(a).copied(), self.tiles.get(b).copied()) else {
            return false;
        };
        let (
            TileKind::Classical {
                resource: ra,
                number: na,
            },
            TileKind::Classical {
                resource: rb,
                number: nb,
            },
        ) = (ta.kind, tb.kind)
        else {
            return false;
        };
        if a == b || ra == rb {
            return false;
        }

        let candidates = [ra, rb];
        self.tiles[a].kind = TileKind::Quantum {
            number: na,
            state: Superposition::entangled(candidates, group),
        };
        self.tiles[b].kind = TileKind::Quantum {
            number: nb,
            state: Superposition::entangled(candidates, group),
        };
        true
    }

    /// Both tiles of a group, in index order
    pub fn group_members(&self, group: GroupId) -> Vec<usize> {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, t)| t.group() == Some(group))
            .map(|(i, _)| i)
            .collect()
    }

    /// The other tile of a tile's entangled pair
    pub fn partner_of(&self, tile: usize) -> Option<usize> {
        let group = self.tiles.get(tile)?.group()?;
        self.group_members(group).into_iter().find(|&i| i != tile)
    }

    pub fn land_coords(&self) -> Vec<HexCoord> {
        self.tiles.iter().map(|t| t.coord).collect()
    }

    pub fn sea_coords(&self) -> Vec<HexCoord> {
        self.sea_tiles.iter().map(|t| t.coord).collect()
    }

    pub fn desert_index(&self) -> Option<usize> {
        self.tiles.iter().position(Tile::is_desert)
    }

    pub fn quantum_tiles(&self) -> impl Iterator<Item = (usize, &Tile)> {
        self.tiles.iter().enumerate().filter(|(_, t)| t.is_quantum())
    }
}

fn check_pool(pool: &str, available: usize, needed: usize) -> Result<(), BoardError> {
    if available < needed {
        return Err(BoardError::PoolTooSmall {
            pool: pool.to_string(),
            available,
            needed,
        });
    }
    Ok(())
}

/// Ring of sea tiles one step beyond the land, alternating port and open
/// water from a random offset. Ports are shuffled and placed in ring order;
/// slots left over once the ports run out stay open water.
fn generate_sea_ring<R: Rng>(config: &BoardConfig, rng: &mut R) -> Vec<SeaTile> {
    let coords = HexCoord::ring(config.radius + 1);
    let n = coords.len();

    let mut ports: Vec<Harbor> = Resource::ALL.iter().map(|r| Harbor::Specific(*r)).collect();
    ports.extend(std::iter::repeat(Harbor::Generic).take(config.generic_ports as usize));
    ports.shuffle(rng);

    let rotation = if n == 0 { 0 } else { rng.gen_range(0..n) };
    let mut ports = ports.into_iter();
    coords
        .into_iter()
        .enumerate()
        .map(|(i, coord)| {
            let is_port_slot = (i + rotation) % 2 == 0;
            let port = if is_port_slot { ports.next() } else { None };
            SeaTile { coord, port }
        })
        .collect()
}
