// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Proper-parts collector for subtree-driven adjustments.

use alloc::vec::Vec;

use canopy_pixels::NO_PIXEL;
use canopy_tree::{NodeId, ZoneTree};
use canopy_zones::{Backend, ZoneGraph};

/// Collects, for one BySubtree call, the trigger's flat zones as seen from
/// the target tree.
///
/// For every flat zone of the pruned subtree it records the zone
/// representative and the target-tree node that carries it (its *proper
/// part*). Along the way it elects `tau_star`, the carrier whose level is
/// closest to the trigger level, and tracks the smallest representative seen,
/// which seeds the winner of the level-`b` zone merge. After the merge,
/// [`ProperParts::remove_zones`] deletes the collected zones from their
/// carriers and marks every carrier that ran out of zones for removal.
///
/// Storage is retained across calls; [`ProperParts::reset`] only clears
/// marks the previous call set.
#[derive(Clone, Debug)]
pub struct ProperParts {
    maxtree: bool,
    reps: Vec<u32>,
    carriers: Vec<NodeId>,
    removed: Vec<bool>,
    marked: Vec<NodeId>,
    tau_star: NodeId,
    rep_tau_star: u32,
    zone_winner: u32,
    removed_count: usize,
}

impl Default for ProperParts {
    fn default() -> Self {
        Self::new()
    }
}

impl ProperParts {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            maxtree: false,
            reps: Vec::new(),
            carriers: Vec::new(),
            removed: Vec::new(),
            marked: Vec::new(),
            tau_star: NodeId::NONE,
            rep_tau_star: NO_PIXEL,
            zone_winner: NO_PIXEL,
            removed_count: 0,
        }
    }

    /// Clears the previous call's state and fixes the target direction.
    pub fn reset(&mut self, maxtree: bool, slots: usize) {
        for m in self.marked.drain(..) {
            self.removed[m.idx()] = false;
        }
        if self.removed.len() < slots {
            self.removed.resize(slots, false);
        }
        self.maxtree = maxtree;
        self.reps.clear();
        self.carriers.clear();
        self.tau_star = NodeId::NONE;
        self.rep_tau_star = NO_PIXEL;
        self.zone_winner = NO_PIXEL;
        self.removed_count = 0;
    }

    /// Records that target node `carrier` holds the trigger zone `rep`.
    ///
    /// Updates `tau_star` when the carrier's level is strictly closer to the
    /// trigger level (higher for a min-tree target, lower for a max-tree
    /// target), and tracks the smallest representative as the merge winner
    /// seed.
    pub fn add(&mut self, tree: &ZoneTree, carrier: NodeId, rep: u32) {
        let prev = self.tau_star;
        self.reps.push(rep);
        self.carriers.push(carrier);

        let closer = prev.is_none() || {
            let (lc, lp) = (tree.level(carrier), tree.level(prev));
            if self.maxtree { lc < lp } else { lc > lp }
        };
        if closer {
            self.tau_star = carrier;
            self.rep_tau_star = rep;
        }
        if self.zone_winner == NO_PIXEL || rep < self.zone_winner {
            self.zone_winner = rep;
        }
    }

    /// All collected trigger zone representatives, in visit order.
    #[must_use]
    pub fn reps(&self) -> &[u32] {
        &self.reps
    }

    /// The elected boundary node of the adjustment interval.
    #[must_use]
    pub fn tau_star(&self) -> NodeId {
        self.tau_star
    }

    /// The representative recorded together with `tau_star`.
    #[must_use]
    pub fn rep_tau_star(&self) -> u32 {
        self.rep_tau_star
    }

    /// The smallest representative seen; seed for the zone-merge winner.
    #[must_use]
    pub fn zone_winner(&self) -> u32 {
        self.zone_winner
    }

    /// How many carriers have been emptied so far.
    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.removed_count
    }

    /// Has `id` been emptied of zones (and thus marked for removal)?
    #[must_use]
    pub fn is_removed(&self, id: NodeId) -> bool {
        self.removed.get(id.idx()).copied().unwrap_or(false)
    }

    /// Merges all collected zones into `node_union` (connecting them with
    /// whichever of its zones they touch), then removes them from their
    /// carriers. Returns the winning representative.
    pub fn connect_into<B: Backend>(
        &mut self,
        tree: &mut ZoneTree,
        graph: &mut ZoneGraph<B>,
        node_union: NodeId,
    ) -> u32 {
        let winner =
            tree.absorb_connected_zones(graph, node_union, &self.reps, Some(self.zone_winner));
        self.remove_zones(tree);
        winner
    }

    /// Deletes every collected zone from its carrier; carriers left with no
    /// zones are marked removed.
    pub fn remove_zones(&mut self, tree: &mut ZoneTree) {
        for i in 0..self.reps.len() {
            let node = self.carriers[i];
            tree.remove_rep(node, self.reps[i]);
            if tree.num_zones_of(node) == 0 && !self.removed[node.idx()] {
                self.removed[node.idx()] = true;
                self.marked.push(node);
                self.removed_count += 1;
            }
        }
    }
}
