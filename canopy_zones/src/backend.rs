// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend trait for flat-zone adjacency strategies.

use crate::graph::GraphCore;

/// Adjacency strategy behind a [`ZoneGraph`][crate::ZoneGraph].
///
/// A backend owns whatever per-zone state its strategy needs (eager edge
/// sets, boundary pixel lists, or nothing) and answers adjacency queries over
/// the shared [`GraphCore`] (pixel sets, union-find, generation stamps).
///
/// ## Contract
///
/// `for_each_adjacent` must visit the canonical representative of every zone
/// sharing at least one pixel edge with the base zone, each exactly once per
/// call. It must start a fresh stamp token via [`GraphCore::begin_token`] and
/// leave the root slot of every visited zone stamped with that token; the
/// graph's merge operations read those stamps right after the call to filter
/// merge candidates.
pub trait Backend {
    /// Builds the backend's per-zone state once the core has discovered all
    /// flat zones. `is_boundary[p]` is true iff pixel `p` has a neighbor
    /// with a different gray level.
    fn build(&mut self, core: &mut GraphCore, num_zones: u32, is_boundary: &[bool]);

    /// Visits each zone adjacent to the zone rooted at `base_slot`.
    ///
    /// `base_slot` is a union-find root. See the trait docs for the stamping
    /// contract.
    fn for_each_adjacent<F: FnMut(u32)>(&mut self, core: &mut GraphCore, base_slot: u32, visit: F);

    /// Like [`Backend::for_each_adjacent`], but assumes no merge has happened
    /// yet: `base_slot` is the zone's original slot and neighbor resolution
    /// skips the union-find.
    fn for_each_adjacent_static<F: FnMut(u32)>(
        &mut self,
        core: &mut GraphCore,
        base_slot: u32,
        visit: F,
    );

    /// Hook called while the zone in `loser_slot` is being merged into the
    /// zone in `winner_slot`. It runs before the union-find and pixel-set
    /// updates, so both slots are still live roots and both representatives
    /// still resolve.
    fn merged(
        &mut self,
        core: &mut GraphCore,
        winner_slot: u32,
        loser_slot: u32,
        winner_rep: u32,
        loser_rep: u32,
    );
}
