//! Vertex/edge graph derived from projected hex polygons.
//!
//! Settlements, cities and roads are placed on an index-based graph:
//! - vertices are deduplicated polygon corners (rounded coordinates are the key)
//! - edges are consecutive corner pairs, stored as sorted vertex pairs
//! - every vertex knows its neighbors and the land tiles touching it
//! - every sea tile serves the two land vertices nearest to its center
//!
//! The projection from hex coordinates to points is supplied by the caller
//! through [`Projection`]; [`HexLayout`] is the default pointy-top layout.

use crate::hex::HexCoord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Index into [`Geometry::vertices`]
pub type VertexId = usize;

/// Index into [`Geometry::edges`]
pub type EdgeId = usize;

/// Canonical road key: the two endpoint vertices, smaller index first
pub type EdgeKey = (VertexId, VertexId);

/// Corners closer than this (per axis) collapse into one vertex
const DEDUP_SCALE: f64 = 1e4;

/// A point in projected space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    fn dedup_key(&self) -> (i64, i64) {
        (
            (self.x * DEDUP_SCALE).round() as i64,
            (self.y * DEDUP_SCALE).round() as i64,
        )
    }
}

/// Maps a hex coordinate to its center and six ordered corners.
///
/// Implementations must return corners in a consistent winding order so
/// that consecutive corners describe the hex's edges.
pub trait Projection {
    /// Center point of the hex
    fn center(&self, hex: HexCoord) -> Point;

    /// The six corners of the hex, in winding order
    fn corners(&self, hex: HexCoord) -> [Point; 6];
}

/// Pointy-top hex layout with a size (center-to-corner radius) and origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HexLayout {
    pub size: f64,
    pub origin: Point,
}

impl HexLayout {
    pub const fn new(size: f64, origin: Point) -> Self {
        Self { size, origin }
    }
}

impl Default for HexLayout {
    fn default() -> Self {
        Self::new(1.0, Point::default())
    }
}

impl Projection for HexLayout {
    fn center(&self, hex: HexCoord) -> Point {
        let (x, y) = hex.to_pixel(self.size);
        Point::new(self.origin.x + x, self.origin.y + y)
    }

    fn corners(&self, hex: HexCoord) -> [Point; 6] {
        let center = self.center(hex);
        std::array::from_fn(|i| {
            let angle = (60.0 * i as f64 - 30.0).to_radians();
            Point::new(
                center.x + self.size * angle.cos(),
                center.y + self.size * angle.sin(),
            )
        })
    }
}

/// The placement graph shared by all players
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Geometry {
    /// Projected position of every vertex
    pub vertices: Vec<Point>,
    /// Center of every land tile, indexed like the board's tiles
    pub tile_centers: Vec<Point>,
    /// The six vertices of every land tile, in corner order
    pub tile_vertices: Vec<[VertexId; 6]>,
    /// Every road slot, sorted so lookups can binary search
    pub edges: Vec<EdgeKey>,
    /// Neighbors of every vertex (sorted, deduplicated)
    pub adjacency: Vec<Vec<VertexId>>,
    /// Land tiles touching every vertex
    pub vertex_tiles: Vec<Vec<usize>>,
    /// The two vertices each sea tile serves, indexed like the sea tiles
    pub port_map: Vec<[VertexId; 2]>,
}

impl Geometry {
    /// Build the graph from land and sea coordinates.
    pub fn build<P: Projection + ?Sized>(
        land: &[HexCoord],
        sea: &[HexCoord],
        projection: &P,
    ) -> Self {
        let mut vertices: Vec<Point> = Vec::new();
        let mut lookup: HashMap<(i64, i64), VertexId> = HashMap::new();
        let mut tile_vertices = Vec::with_capacity(land.len());
        let mut tile_centers = Vec::with_capacity(land.len());

        for hex in land {
            tile_centers.push(projection.center(*hex));
            let corners = projection.corners(*hex);
            let ids = corners.map(|corner| {
                *lookup.entry(corner.dedup_key()).or_insert_with(|| {
                    vertices.push(corner);
                    vertices.len() - 1
                })
            });
            tile_vertices.push(ids);
        }

        let mut edge_set: BTreeSet<EdgeKey> = BTreeSet::new();
        for ids in &tile_vertices {
            for i in 0..6 {
                let (a, b) = (ids[i], ids[(i + 1) % 6]);
                if a != b {
                    edge_set.insert(canonical_edge(a, b));
                }
            }
        }
        let edges: Vec<EdgeKey> = edge_set.into_iter().collect();

        let mut adjacency: Vec<Vec<VertexId>> = vec![Vec::new(); vertices.len()];
        for &(a, b) in &edges {
            adjacency[a].push(b);
            adjacency[b].push(a);
        }
        for neighbors in &mut adjacency {
            neighbors.sort_unstable();
            neighbors.dedup();
        }

        let mut vertex_tiles: Vec<Vec<usize>> = vec![Vec::new(); vertices.len()];
        for (tile, ids) in tile_vertices.iter().enumerate() {
            for &v in ids {
                if !vertex_tiles[v].contains(&tile) {
                    vertex_tiles[v].push(tile);
                }
            }
        }

        let port_map = sea
            .iter()
            .map(|hex| nearest_two(&vertices, projection.center(*hex)))
            .collect();

        Self {
            vertices,
            tile_centers,
            tile_vertices,
            edges,
            adjacency,
            vertex_tiles,
            port_map,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Look up the road slot between two vertices, in either order
    pub fn edge_between(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        self.edges.binary_search(&canonical_edge(a, b)).ok()
    }

    /// Endpoints of a road slot
    pub fn edge(&self, edge: EdgeId) -> Option<EdgeKey> {
        self.edges.get(edge).copied()
    }

    /// Road slots that touch a vertex
    pub fn edges_at(&self, vertex: VertexId) -> Vec<EdgeId> {
        self.adjacency
            .get(vertex)
            .map(|neighbors| {
                neighbors
                    .iter()
                    .filter_map(|&n| self.edge_between(vertex, n))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Nearest vertex to a point, if one lies within `max_distance`
    pub fn nearest_vertex(&self, point: Point, max_distance: f64) -> Option<VertexId> {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, v)| (i, v.distance_to(&point)))
            .filter(|(_, d)| *d < max_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Nearest road slot (by midpoint) to a point, if within `max_distance`
    pub fn nearest_edge(&self, point: Point, max_distance: f64) -> Option<EdgeId> {
        self.edges
            .iter()
            .enumerate()
            .map(|(i, &(a, b))| {
                let (pa, pb) = (self.vertices[a], self.vertices[b]);
                let mid = Point::new((pa.x + pb.x) / 2.0, (pa.y + pb.y) / 2.0);
                (i, mid.distance_to(&point))
            })
            .filter(|(_, d)| *d < max_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Nearest land tile (by center) to a point, if within `max_distance`
    pub fn nearest_tile(&self, point: Point, max_distance: f64) -> Option<usize> {
        self.tile_centers
            .iter()
            .enumerate()
            .map(|(i, c)| (i, c.distance_to(&point)))
            .filter(|(_, d)| *d < max_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }
}

/// Sort an edge's endpoints so ownership lookups are order-independent
pub fn canonical_edge(a: VertexId, b: VertexId) -> EdgeKey {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// The two vertices closest to `target`; ties resolve to the lower index
fn nearest_two(vertices: &[Point], target: Point) -> [VertexId; 2] {
    let mut by_distance: Vec<(VertexId, f64)> = vertices
        .iter()
        .enumerate()
        .map(|(i, v)| (i, v.distance_to(&target)))
        .collect();
    by_distance.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    let first = by_distance.first().map(|(i, _)| *i).unwrap_or(0);
    let second = by_distance.get(1).map(|(i, _)| *i).unwrap_or(first);
    [first, second]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard_geometry() -> Geometry {
        Geometry::build(
            &HexCoord::within_radius(2),
            &HexCoord::ring(3),
            &HexLayout::default(),
        )
    }

    #[test]
    fn test_standard_board_vertex_and_edge_counts() {
        let geometry = standard_geometry();
        assert_eq!(geometry.vertex_count(), 54);
        assert_eq!(geometry.edge_count(), 72);
    }

    #[test]
    fn test_single_hex() {
        let geometry = Geometry::build(&[HexCoord::new(0, 0)], &[], &HexLayout::default());
        assert_eq!(geometry.vertex_count(), 6);
        assert_eq!(geometry.edge_count(), 6);
        assert!(geometry.adjacency.iter().all(|n| n.len() == 2));
    }

    #[test]
    fn test_every_tile_has_six_distinct_vertices() {
        let geometry = standard_geometry();
        for ids in &geometry.tile_vertices {
            let unique: BTreeSet<_> = ids.iter().collect();
            assert_eq!(unique.len(), 6);
            assert!(ids.iter().all(|&v| v < geometry.vertex_count()));
        }
    }

    #[test]
    fn test_neighboring_tiles_share_two_vertices() {
        let land = HexCoord::within_radius(2);
        let geometry = Geometry::build(&land, &[], &HexLayout::default());
        let center = land.iter().position(|h| *h == HexCoord::new(0, 0)).unwrap();
        let east = land.iter().position(|h| *h == HexCoord::new(1, 0)).unwrap();

        let shared = geometry.tile_vertices[center]
            .iter()
            .filter(|v| geometry.tile_vertices[east].contains(v))
            .count();
        assert_eq!(shared, 2);
    }

    #[test]
    fn test_edges_are_canonical() {
        let geometry = standard_geometry();
        for &(a, b) in &geometry.edges {
            assert!(a < b);
            assert_eq!(geometry.edge_between(b, a), geometry.edge_between(a, b));
        }
    }

    #[test]
    fn test_adjacency_matches_edges() {
        let geometry = standard_geometry();
        for (v, neighbors) in geometry.adjacency.iter().enumerate() {
            assert!((2..=3).contains(&neighbors.len()));
            for &n in neighbors {
                assert!(geometry.edge_between(v, n).is_some());
                assert!(geometry.adjacency[n].contains(&v));
            }
            assert_eq!(geometry.edges_at(v).len(), neighbors.len());
        }
    }

    #[test]
    fn test_vertex_tiles_are_consistent() {
        let geometry = standard_geometry();
        for (v, tiles) in geometry.vertex_tiles.iter().enumerate() {
            assert!((1..=3).contains(&tiles.len()));
            for &t in tiles {
                assert!(geometry.tile_vertices[t].contains(&v));
            }
        }
    }

    #[test]
    fn test_ports_map_to_two_coastal_vertices() {
        let geometry = standard_geometry();
        assert_eq!(geometry.port_map.len(), 18);
        for [a, b] in &geometry.port_map {
            assert_ne!(a, b);
            // Coastal vertices touch fewer than three land tiles
            assert!(geometry.vertex_tiles[*a].len() < 3);
            assert!(geometry.vertex_tiles[*b].len() < 3);
        }
    }

    #[test]
    fn test_dedup_survives_custom_origin() {
        let layout = HexLayout::new(48.0, Point::new(550.0, 365.0));
        let geometry = Geometry::build(&HexCoord::within_radius(2), &[], &layout);
        assert_eq!(geometry.vertex_count(), 54);
    }

    #[test]
    fn test_nearest_lookups() {
        let geometry = standard_geometry();
        let v = geometry.vertices[7];
        assert_eq!(geometry.nearest_vertex(v, 0.1), Some(7));
        assert_eq!(geometry.nearest_tile(Point::new(100.0, 100.0), 1.0), None);

        let (a, b) = geometry.edges[3];
        let (pa, pb) = (geometry.vertices[a], geometry.vertices[b]);
        let mid = Point::new((pa.x + pb.x) / 2.0, (pa.y + pb.y) / 2.0);
        assert_eq!(geometry.nearest_edge(mid, 0.1), Some(3));
    }
}
