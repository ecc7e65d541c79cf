// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! On-demand adjacency through per-zone boundary pixel lists.

use alloc::vec;
use alloc::vec::Vec;

use canopy_pixels::NO_PIXEL;

use crate::Backend;
use crate::graph::{GraphCore, find_root};

/// Adjacency by boundary scan.
///
/// Stores, per zone, a singly linked list of its boundary pixels (pixels
/// with at least one differently-colored neighbor). Queries walk only the
/// boundary and resolve each neighbor through the union-find. Merges
/// concatenate the two boundary lists in O(1) and mark the result dirty:
/// pixels that became interior are filtered out incrementally, a bounded
/// number per query, until the cleanup cursor reaches the end of the list.
#[derive(Clone, Default, Debug)]
pub struct Boundary {
    /// Per-slot list heads/tails into `next`.
    head: Vec<u32>,
    tail: Vec<u32>,
    /// Per-pixel successor in its zone's boundary list.
    next: Vec<u32>,
    count: Vec<u32>,
    /// Per-slot incremental refilter cursor (current, previous).
    cursor: Vec<u32>,
    cursor_prev: Vec<u32>,
    dirty: Vec<bool>,
}

impl Boundary {
    fn append(&mut self, slot: u32, p: u32) {
        if self.head[slot as usize] == NO_PIXEL {
            self.head[slot as usize] = p;
        } else {
            self.next[self.tail[slot as usize] as usize] = p;
        }
        self.tail[slot as usize] = p;
        self.next[p as usize] = NO_PIXEL;
        self.count[slot as usize] += 1;
    }

    /// O(1) concatenation of the loser's boundary list onto the winner's.
    fn concat(&mut self, winner: u32, loser: u32) {
        let (w, l) = (winner as usize, loser as usize);
        let loser_head = self.head[l];
        if loser_head != NO_PIXEL {
            if self.head[w] == NO_PIXEL {
                self.head[w] = loser_head;
            } else {
                self.next[self.tail[w] as usize] = loser_head;
            }
            self.tail[w] = self.tail[l];
            self.count[w] += self.count[l];
        }
        self.head[l] = NO_PIXEL;
        self.tail[l] = NO_PIXEL;
        self.count[l] = 0;
        self.cursor[l] = NO_PIXEL;
        self.cursor_prev[l] = NO_PIXEL;
        self.dirty[l] = false;
    }

    /// How many boundary pixels to refilter in one query.
    ///
    /// Bucketed by list size, clamped to `[8, 4096]`; at least proportional
    /// to the square root of the list, which keeps the cleanup amortized.
    fn budget(&self, slot: u32) -> u32 {
        let count = self.count[slot as usize];
        if count == 0 {
            return 0;
        }
        let budget = if count < 64 {
            8
        } else if count < 256 {
            16
        } else if count < 1024 {
            count / 8
        } else {
            count / 4
        };
        budget.clamp(8, 4096)
    }

    /// Removes up to `budget` pixels that are no longer on the boundary,
    /// resuming from the stored cursor.
    fn partial_refilter(&mut self, core: &mut GraphCore, slot: u32, budget: u32) {
        if budget == 0 {
            return;
        }
        let s = slot as usize;
        let mut current = self.cursor[s];
        let mut prev = self.cursor_prev[s];
        if current == NO_PIXEL {
            current = self.head[s];
            prev = NO_PIXEL;
        }

        let mut processed = 0;
        while current != NO_PIXEL && processed < budget {
            let next = self.next[current as usize];
            if is_boundary_pixel(core, current, slot) {
                prev = current;
            } else {
                if prev == NO_PIXEL {
                    self.head[s] = next;
                } else {
                    self.next[prev as usize] = next;
                }
                if self.tail[s] == current {
                    self.tail[s] = prev;
                }
                self.next[current as usize] = NO_PIXEL;
                self.count[s] -= 1;
            }
            current = next;
            processed += 1;
        }

        self.cursor[s] = current;
        self.cursor_prev[s] = prev;
        if self.head[s] == NO_PIXEL {
            self.tail[s] = NO_PIXEL;
            self.cursor[s] = NO_PIXEL;
            self.cursor_prev[s] = NO_PIXEL;
        } else if current == NO_PIXEL {
            self.cursor_prev[s] = NO_PIXEL;
        }
    }
}

/// Does `p` still touch a zone other than the one rooted at `root`?
fn is_boundary_pixel(core: &mut GraphCore, p: u32, root: u32) -> bool {
    let GraphCore {
        ref adj,
        ref pixels,
        ref mut parent,
        ..
    } = *core;
    for q in adj.neighbors(p) {
        let slot_q = pixels.slot_of(q);
        let root_q = if parent[slot_q as usize] == slot_q {
            slot_q
        } else {
            find_root(parent, slot_q)
        };
        if root_q != root {
            return true;
        }
    }
    false
}

impl Backend for Boundary {
    fn build(&mut self, core: &mut GraphCore, num_zones: u32, is_boundary: &[bool]) {
        let n = core.pixels().num_pixels() as usize;
        let z = num_zones as usize;
        self.head = vec![NO_PIXEL; z];
        self.tail = vec![NO_PIXEL; z];
        self.next = vec![NO_PIXEL; n];
        self.count = vec![0; z];
        self.cursor = vec![NO_PIXEL; z];
        self.cursor_prev = vec![NO_PIXEL; z];
        self.dirty = vec![false; z];
        for (p, &boundary) in is_boundary.iter().enumerate() {
            if boundary {
                let slot = core.pixels().slot_of(p as u32);
                self.append(slot, p as u32);
            }
        }
    }

    fn for_each_adjacent<F: FnMut(u32)>(
        &mut self,
        core: &mut GraphCore,
        base_slot: u32,
        mut visit: F,
    ) {
        if self.dirty[base_slot as usize] {
            let budget = self.budget(base_slot);
            self.partial_refilter(core, base_slot, budget);
            if self.cursor[base_slot as usize] == NO_PIXEL {
                self.dirty[base_slot as usize] = false;
            }
        }

        let token = core.begin_token();
        let GraphCore {
            ref adj,
            ref pixels,
            ref mut parent,
            ref mut stamp,
            ..
        } = *core;
        let mut p = self.head[base_slot as usize];
        while p != NO_PIXEL {
            let next = self.next[p as usize];
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
            p = next;
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
        let mut p = self.head[base_slot as usize];
        while p != NO_PIXEL {
            let next = self.next[p as usize];
            for q in adj.neighbors(p) {
                let slot_q = pixels.slot_of(q);
                if slot_q == base_slot || stamp[slot_q as usize] == token {
                    continue;
                }
                stamp[slot_q as usize] = token;
                visit(pixels.rep_of(slot_q));
            }
            p = next;
        }
    }

    fn merged(
        &mut self,
        _core: &mut GraphCore,
        winner_slot: u32,
        loser_slot: u32,
        _winner_rep: u32,
        _loser_rep: u32,
    ) {
        self.concat(winner_slot, loser_slot);
        self.dirty[winner_slot as usize] = true;
        self.cursor[winner_slot as usize] = self.head[winner_slot as usize];
        self.cursor_prev[winner_slot as usize] = NO_PIXEL;
    }
}
