// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Disjoint pixel sets as circular singly linked lists.

use alloc::vec;
use alloc::vec::Vec;

use crate::{NO_PIXEL, NO_SLOT};

/// Disjoint sets of pixels, each stored as a circular singly linked list.
///
/// Four parallel arrays carry the whole structure:
///
/// - `next[p]`: the successor of pixel `p` in its circular list; following it
///   from any member visits the whole set.
/// - `slot_of[p]`: the set slot `p` was assigned at construction.
/// - `head[s]`: the head pixel of slot `s` (its representative), or
///   [`NO_PIXEL`] once the slot has been absorbed by a merge.
/// - `size[s]`: the slot's cardinality.
///
/// [`PixelSets::merge_by_rep`] splices two lists in O(1) by swapping the two
/// heads' successors. `slot_of` entries of absorbed pixels are left untouched;
/// callers that track merges (a union-find above this structure) resolve a
/// pixel's current set through their own `find`.
#[derive(Clone, Debug)]
pub struct PixelSets {
    next: Vec<u32>,
    slot_of: Vec<u32>,
    head: Vec<u32>,
    size: Vec<u32>,
    live: u32,
}

impl PixelSets {
    /// Creates storage for `num_pixels` pixels and up to as many sets.
    #[must_use]
    pub fn with_capacity(num_pixels: u32) -> Self {
        let n = num_pixels as usize;
        Self {
            next: vec![NO_PIXEL; n],
            slot_of: vec![NO_SLOT; n],
            head: vec![NO_PIXEL; n],
            size: vec![0; n],
            live: 0,
        }
    }

    /// Number of pixels the structure was sized for.
    #[must_use]
    pub fn num_pixels(&self) -> u32 {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "sized from a u32 pixel count"
        )]
        {
            self.next.len() as u32
        }
    }

    /// Number of live (unabsorbed) sets.
    #[must_use]
    pub fn num_sets(&self) -> u32 {
        self.live
    }

    /// The slot `p` was assigned at construction, or [`NO_SLOT`].
    #[inline]
    #[must_use]
    pub fn slot_of(&self, p: u32) -> u32 {
        self.slot_of[p as usize]
    }

    /// The head pixel (representative) of `slot`, or [`NO_PIXEL`] if absorbed.
    #[inline]
    #[must_use]
    pub fn rep_of(&self, slot: u32) -> u32 {
        self.head[slot as usize]
    }

    /// Cardinality of `slot`.
    #[inline]
    #[must_use]
    pub fn size_of(&self, slot: u32) -> u32 {
        self.size[slot as usize]
    }

    /// Cardinality of the set whose representative is `rep`.
    #[inline]
    #[must_use]
    pub fn size_by_rep(&self, rep: u32) -> u32 {
        self.size[self.slot_of[rep as usize] as usize]
    }

    /// Iterates the pixels of the set containing `rep`, in list order.
    ///
    /// The order is the internal list order, not pixel-index order. `rep`
    /// must be a member of a live set.
    #[must_use]
    pub fn pixels_of(&self, rep: u32) -> Pixels<'_> {
        Pixels {
            sets: self,
            start: rep,
            cur: rep,
            done: false,
        }
    }

    // --- construction ---

    /// Opens a new set in `slot` with `head` as its representative.
    ///
    /// The set is not iterable until [`PixelSets::seal`] closes its cycle.
    pub fn open_set(&mut self, slot: u32, head: u32) {
        self.head[slot as usize] = head;
        self.slot_of[head as usize] = slot;
    }

    /// Appends `p` after `tail` in the open set `slot`.
    pub fn append(&mut self, slot: u32, tail: u32, p: u32) {
        self.next[tail as usize] = p;
        self.slot_of[p as usize] = slot;
    }

    /// Closes the circular list of `slot` and records its cardinality.
    pub fn seal(&mut self, slot: u32, tail: u32, size: u32) {
        self.next[tail as usize] = self.head[slot as usize];
        self.size[slot as usize] = size;
        self.live += 1;
    }

    /// Opens and seals a one-pixel set in a single step.
    pub fn open_singleton(&mut self, slot: u32, p: u32) {
        self.head[slot as usize] = p;
        self.slot_of[p as usize] = slot;
        self.next[p as usize] = p;
        self.size[slot as usize] = 1;
        self.live += 1;
    }

    /// Inserts `p` right after `rep` into `rep`'s (sealed) set.
    pub fn insert_after_rep(&mut self, rep: u32, p: u32) {
        let slot = self.slot_of[rep as usize];
        self.next[p as usize] = self.next[rep as usize];
        self.next[rep as usize] = p;
        self.slot_of[p as usize] = slot;
        self.size[slot as usize] += 1;
    }

    /// Trims slot-indexed storage to the `n` sets actually produced.
    pub fn shrink_to(&mut self, n: u32) {
        debug_assert_eq!(n, self.live, "shrink_to must match the live set count");
        self.head.truncate(n as usize);
        self.size.truncate(n as usize);
        self.head.shrink_to_fit();
        self.size.shrink_to_fit();
    }

    // --- merging ---

    /// Merges the set represented by `loser` into the one represented by
    /// `winner` in O(1).
    ///
    /// Both arguments must be live representatives of distinct sets. The
    /// loser's slot is invalidated; its pixels become reachable from
    /// `winner`'s list.
    pub fn merge_by_rep(&mut self, winner: u32, loser: u32) {
        let ws = self.slot_of[winner as usize] as usize;
        let ls = self.slot_of[loser as usize] as usize;
        debug_assert_ne!(ws, ls, "merge of a set with itself");
        debug_assert_eq!(self.head[ws], winner, "winner must be a live representative");
        debug_assert_eq!(self.head[ls], loser, "loser must be a live representative");

        // Splice the two circular lists by swapping the heads' successors.
        self.next.swap(winner as usize, loser as usize);

        self.size[ws] += self.size[ls];
        self.size[ls] = 0;
        self.head[ls] = NO_PIXEL;
        self.live -= 1;
    }
}

/// Iterator over the pixels of one set, in internal list order.
#[derive(Clone, Debug)]
pub struct Pixels<'a> {
    sets: &'a PixelSets,
    start: u32,
    cur: u32,
    done: bool,
}

impl Iterator for Pixels<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.done {
            return None;
        }
        let p = self.cur;
        self.cur = self.sets.next[p as usize];
        if self.cur == self.start {
            self.done = true;
        }
        Some(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn singletons(n: u32) -> PixelSets {
        let mut sets = PixelSets::with_capacity(n);
        for p in 0..n {
            sets.open_singleton(p, p);
        }
        sets
    }

    #[test]
    fn singleton_sets_iterate_themselves() {
        let sets = singletons(4);
        assert_eq!(sets.num_sets(), 4);
        let pixels: Vec<u32> = sets.pixels_of(2).collect();
        assert_eq!(pixels, [2]);
    }

    #[test]
    fn merge_splices_lists_and_accumulates_sizes() {
        let mut sets = singletons(6);
        sets.merge_by_rep(0, 3);
        sets.merge_by_rep(0, 5);
        assert_eq!(sets.num_sets(), 4);
        assert_eq!(sets.size_by_rep(0), 3);
        assert_eq!(sets.rep_of(sets.slot_of(3)), NO_PIXEL);

        let mut pixels: Vec<u32> = sets.pixels_of(0).collect();
        pixels.sort_unstable();
        assert_eq!(pixels, [0, 3, 5]);
    }

    #[test]
    fn merge_of_merged_sets_keeps_all_members() {
        let mut sets = singletons(4);
        sets.merge_by_rep(0, 1);
        sets.merge_by_rep(2, 3);
        sets.merge_by_rep(0, 2);
        assert_eq!(sets.num_sets(), 1);
        assert_eq!(sets.size_by_rep(0), 4);
        let mut pixels: Vec<u32> = sets.pixels_of(0).collect();
        pixels.sort_unstable();
        assert_eq!(pixels, [0, 1, 2, 3]);
    }

    #[test]
    fn open_append_seal_builds_a_list_in_order() {
        let mut sets = PixelSets::with_capacity(5);
        sets.open_set(0, 1);
        sets.append(0, 1, 3);
        sets.append(0, 3, 4);
        sets.seal(0, 4, 3);
        let pixels: Vec<u32> = sets.pixels_of(1).collect();
        assert_eq!(pixels, [1, 3, 4]);
        assert_eq!(sets.size_by_rep(1), 3);
    }
}
