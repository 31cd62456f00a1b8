//! Build/ownership ledger: who owns which vertex and road slot.
//!
//! The ledger only records ownership and answers legality questions about
//! the placement graph. Paying for pieces and tracking piece supplies is the
//! game session's job.

use crate::board::PlayerId;
use crate::geometry::{EdgeId, Geometry, VertexId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Why a settlement, city or road cannot go where requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum PlacementError {
    #[error("No such intersection")]
    UnknownVertex,

    #[error("No such road slot")]
    UnknownEdge,

    #[error("Intersection already occupied")]
    VertexOccupied,

    #[error("Too close to another settlement")]
    AdjacentSettlement,

    #[error("Not connected to your road network")]
    NotConnected,

    #[error("Road slot already taken")]
    EdgeOccupied,

    #[error("Cities replace your own settlements only")]
    NotOwnSettlement,

    #[error("Not enough resources")]
    InsufficientResources,

    #[error("No pieces of that kind remaining")]
    NoPiecesRemaining,
}

/// What stands on an intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildingKind {
    /// 1 VP, 1 resource per adjacent tile
    Settlement,
    /// 2 VP, 2 resources per adjacent tile
    City,
}

/// An owned building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub owner: PlayerId,
    pub kind: BuildingKind,
}

impl Building {
    /// Units produced per matching roll
    pub fn yield_amount(&self) -> u32 {
        match self.kind {
            BuildingKind::Settlement => 1,
            BuildingKind::City => 2,
        }
    }
}

/// Ownership of every vertex and road slot, indexed like the geometry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    buildings: Vec<Option<Building>>,
    roads: Vec<Option<PlayerId>>,
}

impl Ledger {
    /// An empty ledger sized for a geometry
    pub fn new(geometry: &Geometry) -> Self {
        Self {
            buildings: vec![None; geometry.vertex_count()],
            roads: vec![None; geometry.edge_count()],
        }
    }

    pub fn building(&self, vertex: VertexId) -> Option<Building> {
        self.buildings.get(vertex).copied().flatten()
    }

    pub fn road_owner(&self, edge: EdgeId) -> Option<PlayerId> {
        self.roads.get(edge).copied().flatten()
    }

    pub fn buildings(&self) -> &[Option<Building>] {
        &self.buildings
    }

    pub fn roads(&self) -> &[Option<PlayerId>] {
        &self.roads
    }

    fn owner_at(&self, vertex: VertexId) -> Option<PlayerId> {
        self.building(vertex).map(|b| b.owner)
    }

    // ==================== Validation ====================

    /// No building on any neighbor of `vertex`
    pub fn satisfies_distance_rule(&self, geometry: &Geometry, vertex: VertexId) -> bool {
        geometry
            .adjacency
            .get(vertex)
            .is_some_and(|neighbors| neighbors.iter().all(|&n| self.building(n).is_none()))
    }

    /// Whether any settlement could stand on `vertex`: empty and not
    /// adjacent to another building. Ignores road connection.
    pub fn can_place_settlement(&self, geometry: &Geometry, vertex: VertexId) -> bool {
        vertex < self.buildings.len()
            && self.building(vertex).is_none()
            && self.satisfies_distance_rule(geometry, vertex)
    }

    /// Full settlement check for a player. `founding` placements skip the
    /// road connection requirement.
    pub fn check_settlement(
        &self,
        geometry: &Geometry,
        player: PlayerId,
        vertex: VertexId,
        founding: bool,
    ) -> Result<(), PlacementError> {
        if vertex >= self.buildings.len() {
            return Err(PlacementError::UnknownVertex);
        }
        if self.building(vertex).is_some() {
            return Err(PlacementError::VertexOccupied);
        }
        if !self.satisfies_distance_rule(geometry, vertex) {
            return Err(PlacementError::AdjacentSettlement);
        }
        if !founding && !self.has_road_at(geometry, player, vertex) {
            return Err(PlacementError::NotConnected);
        }
        Ok(())
    }

    /// A road may go on an empty slot that touches the player's building or
    /// continues one of the player's roads through a vertex no opponent holds.
    pub fn check_road(
        &self,
        geometry: &Geometry,
        player: PlayerId,
        edge: EdgeId,
    ) -> Result<(), PlacementError> {
        let (a, b) = geometry.edge(edge).ok_or(PlacementError::UnknownEdge)?;
        if self.road_owner(edge).is_some() {
            return Err(PlacementError::EdgeOccupied);
        }

        let connected = [a, b].into_iter().any(|endpoint| match self.owner_at(endpoint) {
            Some(owner) => owner == player,
            None => geometry
                .edges_at(endpoint)
                .into_iter()
                .any(|e| e != edge && self.road_owner(e) == Some(player)),
        });
        if !connected {
            return Err(PlacementError::NotConnected);
        }
        Ok(())
    }

    pub fn can_place_road(&self, geometry: &Geometry, player: PlayerId, edge: EdgeId) -> bool {
        self.check_road(geometry, player, edge).is_ok()
    }

    pub fn check_city(&self, player: PlayerId, vertex: VertexId) -> Result<(), PlacementError> {
        if vertex >= self.buildings.len() {
            return Err(PlacementError::UnknownVertex);
        }
        match self.building(vertex) {
            Some(Building {
                owner,
                kind: BuildingKind::Settlement,
            }) if owner == player => Ok(()),
            _ => Err(PlacementError::NotOwnSettlement),
        }
    }

    pub fn can_upgrade_to_city(&self, player: PlayerId, vertex: VertexId) -> bool {
        self.check_city(player, vertex).is_ok()
    }

    fn has_road_at(&self, geometry: &Geometry, player: PlayerId, vertex: VertexId) -> bool {
        geometry
            .edges_at(vertex)
            .into_iter()
            .any(|e| self.road_owner(e) == Some(player))
    }

    // ==================== Mutation ====================

    /// Record a settlement (caller validates first)
    pub fn place_settlement(&mut self, vertex: VertexId, player: PlayerId) {
        if let Some(slot) = self.buildings.get_mut(vertex) {
            *slot = Some(Building {
                owner: player,
                kind: BuildingKind::Settlement,
            });
        }
    }

    /// Replace a settlement with a city (caller validates first)
    pub fn upgrade_to_city(&mut self, vertex: VertexId, player: PlayerId) {
        if let Some(slot) = self.buildings.get_mut(vertex) {
            *slot = Some(Building {
                owner: player,
                kind: BuildingKind::City,
            });
        }
    }

    /// Record a road (caller validates first)
    pub fn place_road(&mut self, edge: EdgeId, player: PlayerId) {
        if let Some(slot) = self.roads.get_mut(edge) {
            *slot = Some(player);
        }
    }

    // ==================== Queries ====================

    /// Buildings on the corners of a land tile, in corner order
    pub fn buildings_on_tile<'a>(
        &'a self,
        geometry: &'a Geometry,
        tile: usize,
    ) -> impl Iterator<Item = Building> + 'a {
        geometry
            .tile_vertices
            .get(tile)
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(|&v| self.building(v))
    }

    /// Distinct owners of buildings on a tile, ascending
    pub fn owners_on_tile(&self, geometry: &Geometry, tile: usize) -> Vec<PlayerId> {
        let mut owners: Vec<PlayerId> = self
            .buildings_on_tile(geometry, tile)
            .map(|b| b.owner)
            .collect();
        owners.sort_unstable();
        owners.dedup();
        owners
    }

    // ==================== Longest Road ====================

    /// Length of the player's longest simple road path.
    ///
    /// Depth-first search over the player's roads only, with an explicit
    /// stack. Each stack frame carries the edges its path has used. A path
    /// may end at, but not pass through, an opponent's building.
    pub fn longest_road(&self, geometry: &Geometry, player: PlayerId) -> u32 {
        let owned: Vec<EdgeId> = (0..self.roads.len())
            .filter(|&e| self.road_owner(e) == Some(player))
            .collect();

        let mut starts: Vec<VertexId> = owned
            .iter()
            .filter_map(|&e| geometry.edge(e))
            .flat_map(|(a, b)| [a, b])
            .collect();
        starts.sort_unstable();
        starts.dedup();

        let mut longest = 0;
        for start in starts {
            let mut stack: Vec<(VertexId, HashSet<EdgeId>)> = vec![(start, HashSet::new())];

            while let Some((vertex, used)) = stack.pop() {
                longest = longest.max(used.len() as u32);

                let blocked = !used.is_empty()
                    && self.owner_at(vertex).is_some_and(|owner| owner != player);
                if blocked {
                    continue;
                }

                for edge in geometry.edges_at(vertex) {
                    if self.road_owner(edge) != Some(player) || used.contains(&edge) {
                        continue;
                    }
                    let Some((a, b)) = geometry.edge(edge) else {
                        continue;
                    };
                    let next = if a == vertex { b } else { a };
                    let mut path = used.clone();
                    path.insert(edge);
                    stack.push((next, path));
                }
            }
        }
        longest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::HexLayout;
    use crate::hex::HexCoord;

    fn standard() -> (Geometry, Ledger) {
        let geometry = Geometry::build(&HexCoord::within_radius(2), &[], &HexLayout::default());
        let ledger = Ledger::new(&geometry);
        (geometry, ledger)
    }

    /// A path of `len` edges from `start` that never revisits a vertex
    fn simple_path(geometry: &Geometry, start: VertexId, len: usize) -> Vec<EdgeId> {
        fn extend(geometry: &Geometry, vertices: &mut Vec<VertexId>, len: usize) -> bool {
            if vertices.len() == len + 1 {
                return true;
            }
            let current = *vertices.last().unwrap();
            for &next in &geometry.adjacency[current] {
                if vertices.contains(&next) {
                    continue;
                }
                vertices.push(next);
                if extend(geometry, vertices, len) {
                    return true;
                }
                vertices.pop();
            }
            false
        }

        let mut vertices = vec![start];
        assert!(extend(geometry, &mut vertices, len));
        vertices
            .windows(2)
            .map(|w| geometry.edge_between(w[0], w[1]).unwrap())
            .collect()
    }

    #[test]
    fn test_distance_rule() {
        let (geometry, mut ledger) = standard();
        ledger.place_settlement(0, 0);

        for &n in &geometry.adjacency[0] {
            assert!(!ledger.can_place_settlement(&geometry, n));
            assert_eq!(
                ledger.check_settlement(&geometry, 1, n, true),
                Err(PlacementError::AdjacentSettlement)
            );
        }
        assert_eq!(
            ledger.check_settlement(&geometry, 1, 0, true),
            Err(PlacementError::VertexOccupied)
        );
    }

    #[test]
    fn test_can_place_settlement_is_idempotent() {
        let (geometry, mut ledger) = standard();
        ledger.place_settlement(10, 1);
        for v in 0..geometry.vertex_count() {
            let first = ledger.can_place_settlement(&geometry, v);
            assert_eq!(first, ledger.can_place_settlement(&geometry, v));
        }
        assert!(!ledger.can_place_settlement(&geometry, 999));
    }

    #[test]
    fn test_settlement_needs_road_after_founding() {
        let (geometry, mut ledger) = standard();
        ledger.place_settlement(0, 0);
        let path = simple_path(&geometry, 0, 2);
        let far_end = geometry
            .edge(path[1])
            .map(|(a, b)| if geometry.adjacency[0].contains(&a) { b } else { a })
            .unwrap();

        assert_eq!(
            ledger.check_settlement(&geometry, 0, far_end, false),
            Err(PlacementError::NotConnected)
        );
        ledger.place_road(path[0], 0);
        ledger.place_road(path[1], 0);
        assert_eq!(ledger.check_settlement(&geometry, 0, far_end, false), Ok(()));
    }

    #[test]
    fn test_road_connectivity() {
        let (geometry, mut ledger) = standard();
        ledger.place_settlement(0, 0);
        let touching = geometry.edges_at(0)[0];

        assert!(ledger.can_place_road(&geometry, 0, touching));
        assert!(!ledger.can_place_road(&geometry, 1, touching));

        ledger.place_road(touching, 0);
        assert_eq!(
            ledger.check_road(&geometry, 0, touching),
            Err(PlacementError::EdgeOccupied)
        );
        assert_eq!(
            ledger.check_road(&geometry, 0, 9999),
            Err(PlacementError::UnknownEdge)
        );
    }

    #[test]
    fn test_opponent_building_blocks_road_extension() {
        let (geometry, mut ledger) = standard();
        let path = simple_path(&geometry, 0, 2);
        ledger.place_settlement(0, 0);
        ledger.place_road(path[0], 0);

        let (a, b) = geometry.edge(path[0]).unwrap();
        let middle = if a == 0 { b } else { a };
        ledger.place_settlement(middle, 1);

        assert_eq!(
            ledger.check_road(&geometry, 0, path[1]),
            Err(PlacementError::NotConnected)
        );
    }

    #[test]
    fn test_city_upgrade_rules() {
        let (_, mut ledger) = standard();
        ledger.place_settlement(5, 0);
        assert!(ledger.can_upgrade_to_city(0, 5));
        assert!(!ledger.can_upgrade_to_city(1, 5));
        assert_eq!(ledger.check_city(0, 6), Err(PlacementError::NotOwnSettlement));

        ledger.upgrade_to_city(5, 0);
        assert_eq!(ledger.building(5).unwrap().yield_amount(), 2);
        assert!(!ledger.can_upgrade_to_city(0, 5));
    }

    #[test]
    fn test_longest_road_chain() {
        let (geometry, mut ledger) = standard();
        assert_eq!(ledger.longest_road(&geometry, 0), 0);

        let path = simple_path(&geometry, 0, 6);
        for &e in &path[..1] {
            ledger.place_road(e, 0);
        }
        assert_eq!(ledger.longest_road(&geometry, 0), 1);

        for &e in &path[1..] {
            ledger.place_road(e, 0);
        }
        assert_eq!(ledger.longest_road(&geometry, 0), 6);
    }

    #[test]
    fn test_longest_road_broken_by_opponent() {
        let (geometry, mut ledger) = standard();
        let path = simple_path(&geometry, 0, 6);
        for &e in &path {
            ledger.place_road(e, 0);
        }
        // Opponent settles on the vertex joining the third and fourth roads
        let (a, b) = geometry.edge(path[2]).unwrap();
        let (c, d) = geometry.edge(path[3]).unwrap();
        let joint = if a == c || a == d { a } else { b };
        ledger.place_settlement(joint, 1);

        assert_eq!(ledger.longest_road(&geometry, 0), 3);
    }

    #[test]
    fn test_owners_on_tile() {
        let (geometry, mut ledger) = standard();
        let corners = geometry.tile_vertices[0];
        ledger.place_settlement(corners[0], 2);
        ledger.place_settlement(corners[3], 1);
        assert_eq!(ledger.owners_on_tile(&geometry, 0), vec![1, 2]);
        assert_eq!(ledger.buildings_on_tile(&geometry, 0).count(), 2);
    }
}
