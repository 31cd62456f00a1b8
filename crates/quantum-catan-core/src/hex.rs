//! Hex coordinate system using axial coordinates (q, r).
//!
//! This module provides the coordinate type for the hex board and the two
//! shapes the board generator needs:
//! - `within_radius`: every hex of a filled hexagon (the land)
//! - `ring`: the hexes at exactly one distance, ordered by angle (the sea)
//!
//! Vertices and edges are not coordinates here. They are derived from
//! projected corner points by [`crate::geometry`].

use serde::{Deserialize, Serialize};

/// Axial coordinate for hex grid.
///
/// In axial coordinates:
/// - `q` increases going east (right)
/// - `r` increases going southeast
/// - The third coordinate `s` (not stored) satisfies: q + r + s = 0
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct HexCoord {
    /// Column (increases going east)
    pub q: i32,
    /// Row (increases going southeast)
    pub r: i32,
}

impl HexCoord {
    /// Create a new hex coordinate
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The implicit third coordinate (s = -q - r)
    pub const fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// The six neighboring hexes in clockwise order starting from East
    pub fn neighbors(&self) -> [HexCoord; 6] {
        [
            HexCoord::new(self.q + 1, self.r),     // East
            HexCoord::new(self.q + 1, self.r - 1), // NorthEast
            HexCoord::new(self.q, self.r - 1),     // NorthWest
            HexCoord::new(self.q - 1, self.r),     // West
            HexCoord::new(self.q - 1, self.r + 1), // SouthWest
            HexCoord::new(self.q, self.r + 1),     // SouthEast
        ]
    }

    /// Distance to another hex (in hex steps)
    pub fn distance_to(&self, other: &HexCoord) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// Distance from the origin hex
    pub fn length(&self) -> u32 {
        self.distance_to(&HexCoord::default())
    }

    /// Every hex within `radius` steps of the origin, sorted by (q, r).
    ///
    /// A radius of 2 yields the 19 hexes of the standard board.
    pub fn within_radius(radius: u32) -> Vec<HexCoord> {
        let radius = radius as i32;
        let mut coords = Vec::new();
        for q in -radius..=radius {
            for r in -radius..=radius {
                let hex = HexCoord::new(q, r);
                if hex.s().abs() <= radius {
                    coords.push(hex);
                }
            }
        }
        coords.sort();
        coords
    }

    /// The hexes at exactly `radius` steps from the origin, ordered by the
    /// angle of their center around the origin.
    ///
    /// Angle ordering keeps consecutive entries physically adjacent, which
    /// the sea ring relies on to alternate port and open-water slots.
    pub fn ring(radius: u32) -> Vec<HexCoord> {
        let mut coords: Vec<HexCoord> = Self::within_radius(radius)
            .into_iter()
            .filter(|hex| hex.length() == radius)
            .collect();
        coords.sort_by(|a, b| {
            let (ax, ay) = a.to_pixel(1.0);
            let (bx, by) = b.to_pixel(1.0);
            ay.atan2(ax).total_cmp(&by.atan2(bx))
        });
        coords
    }

    /// Convert to pixel coordinates (center of hex)
    /// Uses pointy-top orientation with the given hex size (radius)
    pub fn to_pixel(&self, hex_size: f64) -> (f64, f64) {
        let x = hex_size * (3.0_f64.sqrt() * self.q as f64 + 3.0_f64.sqrt() / 2.0 * self.r as f64);
        let y = hex_size * (3.0 / 2.0 * self.r as f64);
        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_hex_neighbors() {
        let center = HexCoord::new(0, 0);
        let neighbors = center.neighbors();

        // Should have 6 unique neighbors
        let unique: HashSet<_> = neighbors.iter().collect();
        assert_eq!(unique.len(), 6);

        // Each neighbor should be distance 1 away
        for neighbor in &neighbors {
            assert_eq!(center.distance_to(neighbor), 1);
        }
    }

    #[test]
    fn test_hex_distance() {
        let a = HexCoord::new(0, 0);
        let b = HexCoord::new(2, -1);
        assert_eq!(a.distance_to(&b), 2);

        let c = HexCoord::new(-3, 3);
        assert_eq!(a.distance_to(&c), 3);
    }

    #[test]
    fn test_within_radius_counts() {
        assert_eq!(HexCoord::within_radius(0).len(), 1);
        assert_eq!(HexCoord::within_radius(1).len(), 7);
        assert_eq!(HexCoord::within_radius(2).len(), 19);
        assert_eq!(HexCoord::within_radius(3).len(), 37);
    }

    #[test]
    fn test_within_radius_is_sorted() {
        let coords = HexCoord::within_radius(2);
        let mut sorted = coords.clone();
        sorted.sort();
        assert_eq!(coords, sorted);
    }

    #[test]
    fn test_ring_has_six_times_radius_hexes() {
        for radius in 1..=4 {
            let ring = HexCoord::ring(radius);
            assert_eq!(ring.len(), 6 * radius as usize);
            assert!(ring.iter().all(|h| h.length() == radius));
        }
    }

    #[test]
    fn test_ring_is_contiguous() {
        // Angle ordering must walk the ring one step at a time
        let ring = HexCoord::ring(3);
        for (i, hex) in ring.iter().enumerate() {
            let next = ring[(i + 1) % ring.len()];
            assert_eq!(hex.distance_to(&next), 1, "{:?} -> {:?}", hex, next);
        }
    }
}
