// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Eager adjacency backend: per-zone neighbor sets, rewired on merge.

use alloc::vec::Vec;
use core::mem::take;

use hashbrown::HashSet;

use crate::Backend;
use crate::graph::GraphCore;

/// Eager full-edge adjacency.
///
/// At build time every cross-zone pixel edge is turned into a symmetric
/// entry in two per-zone neighbor sets (stored as canonical zone
/// representatives, keyed by root slot). Queries just walk the base zone's
/// set; merges rewire the loser's neighbors onto the winner in
/// O(deg(loser)).
#[derive(Clone, Default, Debug)]
pub struct FullEdge {
    adjacent: Vec<HashSet<u32>>,
}

impl Backend for FullEdge {
    fn build(&mut self, core: &mut GraphCore, num_zones: u32, is_boundary: &[bool]) {
        self.adjacent = Vec::new();
        self.adjacent.resize_with(num_zones as usize, HashSet::new);
        for (pu, &boundary) in is_boundary.iter().enumerate() {
            if !boundary {
                continue;
            }
            #[allow(
                clippy::cast_possible_truncation,
                reason = "pixel indices fit in u32"
            )]
            let p = pu as u32;
            let level = core.image().value(p);
            let slot_p = core.pixels().slot_of(p);
            // The forward half-neighborhood emits each cross edge once.
            for q in core.adjacency().forward_neighbors(p) {
                if core.image().value(q) == level {
                    continue;
                }
                let slot_q = core.pixels().slot_of(q);
                let rep_p = core.pixels().rep_of(slot_p);
                let rep_q = core.pixels().rep_of(slot_q);
                self.adjacent[slot_p as usize].insert(rep_q);
                self.adjacent[slot_q as usize].insert(rep_p);
            }
        }
    }

    fn for_each_adjacent<F: FnMut(u32)>(
        &mut self,
        core: &mut GraphCore,
        base_slot: u32,
        mut visit: F,
    ) {
        // The set is already deduplicated; stamping keeps the backend
        // contract so merge candidate filtering can read this query.
        let token = core.begin_token();
        for &rep in &self.adjacent[base_slot as usize] {
            // Stored representatives are canonical, so their original slot
            // is their union-find root.
            let root = core.pixels.slot_of(rep);
            core.stamp[root as usize] = token;
            visit(rep);
        }
    }

    fn for_each_adjacent_static<F: FnMut(u32)>(
        &mut self,
        core: &mut GraphCore,
        base_slot: u32,
        mut visit: F,
    ) {
        let token = core.begin_token();
        for &rep in &self.adjacent[base_slot as usize] {
            let slot = core.pixels.slot_of(rep);
            core.stamp[slot as usize] = token;
            visit(rep);
        }
    }

    fn merged(
        &mut self,
        core: &mut GraphCore,
        winner_slot: u32,
        loser_slot: u32,
        winner_rep: u32,
        loser_rep: u32,
    ) {
        let neighbors = take(&mut self.adjacent[loser_slot as usize]);
        for rep in neighbors {
            if rep == winner_rep {
                continue;
            }
            let n_slot = core.pixels.slot_of(rep);
            self.adjacent[winner_slot as usize].insert(rep);
            self.adjacent[n_slot as usize].insert(winner_rep);
            self.adjacent[n_slot as usize].remove(&loser_rep);
        }
        self.adjacent[winner_slot as usize].remove(&loser_rep);
    }
}
