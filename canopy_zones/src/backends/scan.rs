// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Stateless adjacency backend: scan every pixel of the base zone.

use crate::Backend;
use crate::graph::{GraphCore, find_root};

/// Adjacency by full zone scan.
///
/// Keeps no per-zone state at all. Queries walk every pixel of the base
/// zone and resolve each neighbor through the union-find, deduplicating
/// with the generation stamps. Merges cost O(1); queries cost
/// O(|zone| · deg).
#[derive(Clone, Copy, Default, Debug)]
pub struct Scan;

impl Backend for Scan {
    fn build(&mut self, _core: &mut GraphCore, _num_zones: u32, _is_boundary: &[bool]) {}

    fn for_each_adjacent<F: FnMut(u32)>(
        &mut self,
        core: &mut GraphCore,
        base_slot: u32,
        mut visit: F,
    ) {
        let token = core.begin_token();
        let GraphCore {
            ref adj,
            ref pixels,
            ref mut parent,
            ref mut stamp,
            ..
        } = *core;
        let base_rep = pixels.rep_of(base_slot);
        for p in pixels.pixels_of(base_rep) {
            for q in adj.neighbors(p) {
                let slot_q = pixels.slot_of(q);
                let root_q = if parent[slot_q as usize] == slot_q {
                    slot_q
                } else {
                    find_root(parent, slot_q)
                };
                if root_q == base_slot || stamp[root_q as usize] == token {
                    continue;
                }
                stamp[root_q as usize] = token;
                visit(pixels.rep_of(root_q));
            }
        }
    }

    fn for_each_adjacent_static<F: FnMut(u32)>(
        &mut self,
        core: &mut GraphCore,
        base_slot: u32,
        mut visit: F,
    ) {
        let token = core.begin_token();
        let GraphCore {
            ref adj,
            ref pixels,
            ref mut stamp,
            ..
        } = *core;
        let base_rep = pixels.rep_of(base_slot);
        for p in pixels.pixels_of(base_rep) {
            for q in adj.neighbors(p) {
                let slot_q = pixels.slot_of(q);
                if slot_q == base_slot || stamp[slot_q as usize] == token {
                    continue;
                }
                stamp[slot_q as usize] = token;
                visit(pixels.rep_of(slot_q));
            }
        }
    }

    fn merged(
        &mut self,
        _core: &mut GraphCore,
        _winner_slot: u32,
        _loser_slot: u32,
        _winner_rep: u32,
        _loser_rep: u32,
    ) {
    }
}
