// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel adjacency relations (4- and 8-connectivity).

use alloc::vec::Vec;

/// A precomputed pixel neighborhood for a fixed image shape.
///
/// The relation is a disk of a given radius: radius `1.0` yields
/// 4-connectivity, radius `1.5` yields 8-connectivity. Offsets are stored in
/// row-major order, so neighbor enumeration is deterministic for every pixel.
///
/// Enumeration never yields the pixel itself and is clipped at the image
/// border.
#[derive(Clone, Debug)]
pub struct Adjacency {
    rows: u32,
    cols: u32,
    offsets: Vec<(i32, i32)>,
}

impl Adjacency {
    /// Builds the relation for an `rows x cols` image from a disk radius.
    #[must_use]
    pub fn with_radius(rows: u32, cols: u32, radius: f64) -> Self {
        let r0 = radius as i32;
        let r2 = (radius * radius) as i32;
        let mut offsets = Vec::new();
        for dr in -r0..=r0 {
            for dc in -r0..=r0 {
                if dr * dr + dc * dc <= r2 && (dr, dc) != (0, 0) {
                    offsets.push((dr, dc));
                }
            }
        }
        Self {
            rows,
            cols,
            offsets,
        }
    }

    /// 4-connectivity (radius 1.0).
    #[must_use]
    pub fn four_connected(rows: u32, cols: u32) -> Self {
        Self::with_radius(rows, cols, 1.0)
    }

    /// 8-connectivity (radius 1.5).
    #[must_use]
    pub fn eight_connected(rows: u32, cols: u32) -> Self {
        Self::with_radius(rows, cols, 1.5)
    }

    /// Number of offsets in the disk (upper bound on a pixel's degree).
    #[must_use]
    pub fn degree(&self) -> usize {
        self.offsets.len()
    }

    /// Number of rows of the underlying shape.
    #[must_use]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of columns of the underlying shape.
    #[must_use]
    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Enumerates the in-bounds neighbors of `p` in offset order.
    #[inline]
    pub fn neighbors(&self, p: u32) -> impl Iterator<Item = u32> + '_ {
        self.clipped(p, self.offsets.iter())
    }

    /// Enumerates only the "forward" half of the neighborhood of `p`.
    ///
    /// Every unordered neighbor pair `{p, q}` is produced exactly once across
    /// the image: by `p` if `q` is in `p`'s forward half, by `q` otherwise.
    /// Used to emit each cross-zone edge once during graph construction.
    #[inline]
    pub fn forward_neighbors(&self, p: u32) -> impl Iterator<Item = u32> + '_ {
        self.clipped(
            p,
            self.offsets
                .iter()
                .filter(|&&(dr, dc)| dr > 0 || (dr == 0 && dc > 0)),
        )
    }

    fn clipped<'a>(
        &'a self,
        p: u32,
        offsets: impl Iterator<Item = &'a (i32, i32)> + 'a,
    ) -> impl Iterator<Item = u32> + 'a {
        let row = (p / self.cols) as i32;
        let col = (p % self.cols) as i32;
        let (rows, cols) = (self.rows as i32, self.cols as i32);
        offsets.filter_map(move |&(dr, dc)| {
            let (r, c) = (row + dr, col + dc);
            (r >= 0 && r < rows && c >= 0 && c < cols).then(|| (r * cols + c) as u32)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn four_connectivity_has_cross_offsets() {
        let adj = Adjacency::four_connected(3, 3);
        assert_eq!(adj.degree(), 4);
        // Center pixel of a 3x3 grid.
        let n: Vec<u32> = adj.neighbors(4).collect();
        assert_eq!(n, [1, 3, 5, 7]);
    }

    #[test]
    fn eight_connectivity_is_clipped_at_corners() {
        let adj = Adjacency::eight_connected(3, 3);
        assert_eq!(adj.degree(), 8);
        let n: Vec<u32> = adj.neighbors(0).collect();
        assert_eq!(n, [1, 3, 4]);
        let n: Vec<u32> = adj.neighbors(8).collect();
        assert_eq!(n, [4, 5, 7]);
    }

    #[test]
    fn forward_halves_cover_each_pair_once() {
        let adj = Adjacency::eight_connected(4, 4);
        let mut pairs: Vec<(u32, u32)> = Vec::new();
        for p in 0..16 {
            for q in adj.forward_neighbors(p) {
                pairs.push((p.min(q), p.max(q)));
            }
        }
        let total = pairs.len();
        pairs.sort_unstable();
        pairs.dedup();
        assert_eq!(total, pairs.len(), "no duplicate undirected edges");

        let mut full = 0;
        for p in 0..16 {
            full += adj.neighbors(p).count();
        }
        assert_eq!(full, 2 * total, "forward halves are half the full relation");
    }
}
