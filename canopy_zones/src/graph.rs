// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The flat-zone graph: shared core plus a pluggable adjacency backend.

use alloc::collections::VecDeque;
use alloc::vec;
use alloc::vec::Vec;

use canopy_pixels::{Adjacency, ImageU8, PixelSets, Pixels};

use crate::backends::Boundary;
use crate::{Backend, RepList};

/// State shared by every adjacency backend.
///
/// Holds the image, the adjacency relation, the pixel sets of the flat
/// zones, a union-find over zone slots, and the generation-stamp scratch
/// used to deduplicate neighbor visits within one query.
#[derive(Clone, Debug)]
pub struct GraphCore {
    pub(crate) image: ImageU8,
    pub(crate) adj: Adjacency,
    pub(crate) pixels: PixelSets,
    /// Union-find parent over zone slots.
    pub(crate) parent: Vec<u32>,
    /// Per-slot generation stamp; a slot is "seen in this query" iff its
    /// stamp equals the current token.
    pub(crate) stamp: Vec<u32>,
    pub(crate) token: u32,
}

/// Finds the union-find root of `slot` with full path compression.
pub(crate) fn find_root(parent: &mut [u32], slot: u32) -> u32 {
    let mut root = slot;
    while parent[root as usize] != root {
        root = parent[root as usize];
    }
    let mut cur = slot;
    while parent[cur as usize] != cur {
        let next = parent[cur as usize];
        parent[cur as usize] = root;
        cur = next;
    }
    root
}

impl GraphCore {
    /// Starts a fresh stamp generation and returns its token.
    ///
    /// The token wraps after 2^32 − 1 queries; only then is the stamp array
    /// cleared, keeping the amortized cost O(1).
    pub fn begin_token(&mut self) -> u32 {
        self.token = self.token.wrapping_add(1);
        if self.token == 0 {
            self.stamp.fill(0);
            self.token = 1;
        }
        self.token
    }

    /// The image the zones were built from.
    #[must_use]
    pub fn image(&self) -> &ImageU8 {
        &self.image
    }

    /// The pixel adjacency relation.
    #[must_use]
    pub fn adjacency(&self) -> &Adjacency {
        &self.adj
    }

    /// The pixel sets backing the zones.
    #[must_use]
    pub fn pixels(&self) -> &PixelSets {
        &self.pixels
    }

    /// Union-find root slot of the zone containing pixel `p`.
    pub(crate) fn root_of_pixel(&mut self, p: u32) -> u32 {
        let slot = self.pixels.slot_of(p);
        find_root(&mut self.parent, slot)
    }

    /// Union-find root of `slot`, with path compression.
    pub fn find_slot_root(&mut self, slot: u32) -> u32 {
        find_root(&mut self.parent, slot)
    }

    /// Stamps `slot` as seen in the current query generation.
    pub fn mark(&mut self, slot: u32) {
        self.stamp[slot as usize] = self.token;
    }

    /// Was `slot` stamped in the current query generation?
    #[must_use]
    pub fn is_marked(&self, slot: u32) -> bool {
        self.stamp[slot as usize] == self.token
    }
}

/// A graph of flat zones under incremental merging.
///
/// The backend type `B` selects the adjacency strategy; it defaults to
/// [`Boundary`]. See the [crate docs](crate) for the trade-offs.
#[derive(Clone, Debug)]
pub struct ZoneGraph<B: Backend = Boundary> {
    core: GraphCore,
    backend: B,
}

impl<B: Backend + Default> ZoneGraph<B> {
    /// Discovers the flat zones of `image` under `adj` and builds the graph.
    #[must_use]
    pub fn from_image(image: ImageU8, adj: Adjacency) -> Self {
        Self::with_backend(image, adj, B::default())
    }
}

impl<B: Backend> ZoneGraph<B> {
    /// Like [`ZoneGraph::from_image`] with an explicit backend value.
    #[must_use]
    pub fn with_backend(image: ImageU8, adj: Adjacency, mut backend: B) -> Self {
        let n = image.len();
        let mut pixels = PixelSets::with_capacity(n);
        let mut visited = vec![false; n as usize];
        let mut is_boundary = vec![false; n as usize];
        let mut queue: VecDeque<u32> = VecDeque::new();
        let mut num_zones: u32 = 0;

        // One BFS per flat zone: same gray level, connected under `adj`.
        for p in 0..n {
            if visited[p as usize] {
                continue;
            }
            let slot = num_zones;
            num_zones += 1;
            let level = image.value(p);
            let mut tail = p;
            let mut count: u32 = 0;

            visited[p as usize] = true;
            pixels.open_set(slot, p);
            queue.push_back(p);
            while let Some(q) = queue.pop_front() {
                count += 1;
                let mut has_diff = false;
                for nq in adj.neighbors(q) {
                    if !visited[nq as usize] && image.value(nq) == level {
                        visited[nq as usize] = true;
                        pixels.append(slot, tail, nq);
                        tail = nq;
                        queue.push_back(nq);
                    } else if image.value(nq) != level {
                        has_diff = true;
                    }
                }
                if has_diff {
                    is_boundary[q as usize] = true;
                }
            }
            pixels.seal(slot, tail, count);
        }
        pixels.shrink_to(num_zones);

        let mut core = GraphCore {
            image,
            adj,
            pixels,
            parent: (0..num_zones).collect(),
            stamp: vec![0; num_zones as usize],
            token: 1,
        };
        backend.build(&mut core, num_zones, &is_boundary);
        Self { core, backend }
    }

    /// Current number of flat zones.
    #[must_use]
    pub fn num_zones(&self) -> u32 {
        self.core.pixels.num_sets()
    }

    /// The image the zones were built from.
    #[must_use]
    pub fn image(&self) -> &ImageU8 {
        &self.core.image
    }

    /// The pixel adjacency relation.
    #[must_use]
    pub fn adjacency(&self) -> &Adjacency {
        &self.core.adj
    }

    /// The pixel sets backing the zones.
    #[must_use]
    pub fn pixels(&self) -> &PixelSets {
        &self.core.pixels
    }

    /// Canonical representative of the zone containing pixel `p`.
    ///
    /// Idempotent: the canonical representative is always the smallest pixel
    /// index in the (merged) zone.
    pub fn find_representative(&mut self, p: u32) -> u32 {
        let root = self.core.root_of_pixel(p);
        self.core.pixels.rep_of(root)
    }

    /// Number of pixels in the zone whose canonical representative is `rep`.
    #[must_use]
    pub fn zone_len(&self, rep: u32) -> u32 {
        self.core.pixels.size_by_rep(rep)
    }

    /// Iterates the pixels of the zone whose canonical representative is
    /// `rep`.
    #[must_use]
    pub fn pixels_of_zone(&self, rep: u32) -> Pixels<'_> {
        self.core.pixels.pixels_of(rep)
    }

    /// Invokes `visit` once for the canonical representative of each zone
    /// sharing at least one pixel edge with the zone of `rep`.
    pub fn for_each_adjacent_zone<F: FnMut(u32)>(&mut self, rep: u32, visit: F) {
        let canon = self.find_representative(rep);
        let base_slot = self.core.root_of_pixel(canon);
        self.backend
            .for_each_adjacent(&mut self.core, base_slot, visit);
    }

    /// Like [`ZoneGraph::for_each_adjacent_zone`], assuming no merge has
    /// happened yet; skips the union-find lookups.
    pub fn for_each_adjacent_zone_static<F: FnMut(u32)>(&mut self, rep: u32, visit: F) {
        let base_slot = self.core.pixels.slot_of(rep);
        self.backend
            .for_each_adjacent_static(&mut self.core, base_slot, visit);
    }

    /// Merges the zones of `cands` that are actually adjacent to the zone of
    /// `base` into one zone together with it.
    ///
    /// The winner is the smallest canonical representative among the base
    /// and the adjacent candidates. On return `cands` holds the surviving
    /// entries: every candidate that collapsed into the winner is removed
    /// and the winner appears exactly once at the end.
    ///
    /// Returns the winner.
    pub fn merge_adjacent_candidates_in_place(&mut self, base: u32, cands: &mut RepList) -> u32 {
        let base_canon = self.find_representative(base);
        let base_slot = self.core.root_of_pixel(base_canon);

        // Stamp the roots adjacent to the base; the candidate filter below
        // reads the stamps of this query.
        self.backend
            .for_each_adjacent(&mut self.core, base_slot, |_| {});
        let token = self.core.token;

        let mut adjacent: RepList = RepList::new();
        let mut winner = base_canon;
        for i in 0..cands.len() {
            let c = self.find_representative(cands[i]);
            if c == base_canon {
                continue;
            }
            let root_c = self.core.root_of_pixel(c);
            if self.core.stamp[root_c as usize] != token {
                continue;
            }
            adjacent.push(c);
            if c < winner {
                winner = c;
            }
        }
        if winner != base_canon {
            adjacent.push(base_canon);
        }

        for &loser in &adjacent {
            if loser != winner {
                self.merge_zones(winner, loser);
            }
        }

        let w = self.find_representative(winner);
        cands.retain(|&mut x| {
            let slot = self.core.pixels.slot_of(x);
            let root = find_root(&mut self.core.parent, slot);
            self.core.pixels.rep_of(root) != w
        });
        cands.push(w);
        w
    }

    /// Merges all of `bases` (assumed to form one connected region) into a
    /// single zone, then folds in the adjacent candidates as
    /// [`ZoneGraph::merge_adjacent_candidates_in_place`] does.
    ///
    /// `winner_hint` may carry an already-computed smallest base
    /// representative; it is canonicalized and overridden if a smaller base
    /// exists. Returns the final winner.
    pub fn merge_bases_with_adjacent_candidates_in_place(
        &mut self,
        bases: &[u32],
        cands: &mut RepList,
        winner_hint: Option<u32>,
    ) -> u32 {
        assert!(!bases.is_empty(), "merge requires at least one base zone");

        let mut base_canon: RepList = RepList::new();
        for &rep in bases {
            let c = self.find_representative(rep);
            if !base_canon.contains(&c) {
                base_canon.push(c);
            }
        }
        let mut winner = match winner_hint {
            Some(hint) => self.find_representative(hint),
            None => base_canon[0],
        };
        for &c in &base_canon {
            if c < winner {
                winner = c;
            }
        }

        for i in 0..base_canon.len() {
            let c = base_canon[i];
            if c != winner {
                self.merge_zones(winner, c);
            }
        }

        self.merge_adjacent_candidates_in_place(winner, cands)
    }

    /// Merges the zone of `rep_b` into the zone of `rep_a` (or vice versa:
    /// the smaller canonical representative always wins). No adjacency check.
    fn merge_zones(&mut self, rep_a: u32, rep_b: u32) -> u32 {
        let root_a = self.core.root_of_pixel(rep_a);
        let root_b = self.core.root_of_pixel(rep_b);
        if root_a == root_b {
            return self.core.pixels.rep_of(root_a);
        }
        let rep_root_a = self.core.pixels.rep_of(root_a);
        let rep_root_b = self.core.pixels.rep_of(root_b);

        // Smallest representative wins, unconditionally.
        let (winner_root, loser_root, winner_rep, loser_rep) = if rep_root_b < rep_root_a {
            (root_b, root_a, rep_root_b, rep_root_a)
        } else {
            (root_a, root_b, rep_root_a, rep_root_b)
        };

        self.backend
            .merged(&mut self.core, winner_root, loser_root, winner_rep, loser_rep);
        self.core.parent[loser_root as usize] = winner_root;
        self.core.pixels.merge_by_rep(winner_rep, loser_rep);
        winner_rep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{Boundary, Scan};
    use alloc::vec::Vec;

    // 3x3 image with four zones:
    //   5 5 9
    //   5 0 9
    //   5 0 0
    fn tiny() -> ImageU8 {
        ImageU8::from_vec(3, 3, vec![5, 5, 9, 5, 0, 9, 5, 0, 0])
    }

    fn graph<B: Backend + Default>() -> ZoneGraph<B> {
        let img = tiny();
        let adj = Adjacency::four_connected(3, 3);
        ZoneGraph::from_image(img, adj)
    }

    #[test]
    fn discovers_zones_with_minimal_representatives() {
        let mut g: ZoneGraph<Boundary> = graph();
        assert_eq!(g.num_zones(), 3);
        assert_eq!(g.find_representative(1), 0);
        assert_eq!(g.find_representative(5), 2);
        assert_eq!(g.find_representative(8), 4);
        assert_eq!(g.zone_len(0), 4);
        assert_eq!(g.zone_len(4), 3);
    }

    #[test]
    fn find_representative_is_idempotent() {
        let mut g: ZoneGraph<Scan> = graph();
        for p in 0..9 {
            let r = g.find_representative(p);
            assert_eq!(g.find_representative(r), r);
        }
    }

    #[test]
    fn adjacency_visits_each_neighbor_once() {
        let mut g: ZoneGraph<Boundary> = graph();
        let mut seen: Vec<u32> = Vec::new();
        g.for_each_adjacent_zone(4, |r| seen.push(r));
        seen.sort_unstable();
        // The 0-zone touches the 5-zone and both 9-pixels' zone.
        assert_eq!(seen, [0, 2]);
    }

    #[test]
    fn merge_keeps_smallest_representative() {
        let mut g: ZoneGraph<Boundary> = graph();
        let mut cands: RepList = RepList::new();
        cands.push(4);
        let w = g.merge_adjacent_candidates_in_place(2, &mut cands);
        assert_eq!(w, 2);
        assert_eq!(cands.as_slice(), [2]);
        assert_eq!(g.find_representative(8), 2);
        assert_eq!(g.zone_len(2), 5);
        assert_eq!(g.num_zones(), 2);
    }

    #[test]
    fn non_adjacent_candidates_survive_a_merge() {
        // 1x5 stripe: zones {0}, {1}, {2}, {3}, {4}; zone 0 and zone 4 are
        // not adjacent.
        let img = ImageU8::from_vec(1, 5, vec![3, 7, 3, 7, 3]);
        let adj = Adjacency::four_connected(1, 5);
        let mut g: ZoneGraph<Boundary> = ZoneGraph::from_image(img, adj);
        let mut cands: RepList = RepList::new();
        cands.push(0);
        cands.push(4);
        let w = g.merge_adjacent_candidates_in_place(1, &mut cands);
        assert_eq!(w, 0);
        // Zone 4 was not adjacent to zone 1: untouched, winner appended.
        assert_eq!(cands.as_slice(), [4, 0]);
        assert_eq!(g.find_representative(1), 0);
        assert_eq!(g.find_representative(4), 4);
    }

    #[test]
    fn merge_bases_unions_all_bases_then_candidates() {
        let img = ImageU8::from_vec(1, 6, vec![9, 4, 9, 4, 9, 2]);
        let adj = Adjacency::four_connected(1, 6);
        let mut g: ZoneGraph<Boundary> = ZoneGraph::from_image(img, adj);
        // Bases: the three 9-zones (pretend they became connected); candidate
        // list holds the 4-zones plus the far 2-zone.
        let mut cands: RepList = RepList::new();
        cands.push(1);
        cands.push(3);
        cands.push(5);
        let w = g.merge_bases_with_adjacent_candidates_in_place(&[0, 2, 4], &mut cands, Some(0));
        assert_eq!(w, 0);
        assert_eq!(g.find_representative(2), 0);
        assert_eq!(g.find_representative(3), 0);
        // The 2-zone at pixel 5 is adjacent to base zone {4}, so it merged too.
        assert_eq!(g.find_representative(5), 0);
        assert_eq!(cands.as_slice(), [0]);
        assert_eq!(g.num_zones(), 1);
    }
}
