// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared machinery of the ByLeaf and BySubtree engines.

use alloc::vec::Vec;

use canopy_tree::{NodeId, ZoneTree};
use canopy_zones::{Backend, ZoneGraph};

use crate::collection::{LevelBuckets, StampSet};

/// Scratch shared by both adjustment flavors: the collection `F`/`Fb` and
/// the harvest of nodes adjacent to the trigger zones.
#[derive(Clone, Default, Debug)]
pub(crate) struct AdjustmentCore {
    pub(crate) f: LevelBuckets,
    seen: StampSet,
    adjacent: Vec<NodeId>,
}

impl AdjustmentCore {
    /// Builds `F` and `Fb` for one adjustment of `tree`.
    ///
    /// `trigger_reps` are the flat zones leaving level `a` for level `b`;
    /// `upper` is the node bounding the interval on the `a` side (`tauL` for
    /// a leaf trigger, `tau_star` for a subtree trigger).
    ///
    /// Every node adjacent to a trigger zone is classified against the
    /// closed interval between `b` and the zone's own level:
    ///
    /// - inside: its parent path up to `upper` goes into `F`;
    /// - beyond `b`: the walk finds the deepest ancestor still at or beyond
    ///   `b`. If that ancestor sits exactly at `b` its path joins `F`; if
    ///   its parent is an interval node, the parent's path joins `F` and the
    ///   ancestor simply stays attached; only when it hangs directly under
    ///   `upper` is it carried in `Fb` for reattachment at level `b`.
    pub(crate) fn build_collections<B: Backend>(
        &mut self,
        tree: &ZoneTree,
        graph: &mut ZoneGraph<B>,
        trigger_reps: &[u32],
        upper: NodeId,
        b: u8,
    ) {
        let maxtree = tree.is_maxtree();
        self.f.reset(maxtree, tree.arena().len());
        self.seen.reset(tree.arena().len());
        self.adjacent.clear();

        // Harvest the nodes adjacent to any trigger zone, on the deep side
        // of that zone's level, each at most once.
        let seen = &mut self.seen;
        let adjacent = &mut self.adjacent;
        for &rep in trigger_reps {
            let gray = tree.level(tree.node_of_rep(rep));
            graph.for_each_adjacent_zone(rep, |nrep| {
                let n = tree.node_of_rep(nrep);
                let deeper = if maxtree {
                    tree.level(n) > gray
                } else {
                    tree.level(n) < gray
                };
                if deeper && seen.insert(n.idx()) {
                    adjacent.push(n);
                }
            });
        }

        for i in 0..self.adjacent.len() {
            let n = self.adjacent[i];
            let ln = tree.level(n);
            let inside = if maxtree { ln <= b } else { ln >= b };
            if inside {
                self.f.add_nodes_of_path(tree, n, upper);
                continue;
            }
            // Beyond b: find the deepest ancestor still at or beyond b.
            let mut sub = n;
            for anc in tree.path_to_root(n) {
                let la = tree.level(anc);
                let past = if maxtree { la < b } else { la > b };
                if past {
                    break;
                }
                sub = anc;
            }
            if tree.level(sub) == b {
                self.f.add_nodes_of_path(tree, sub, upper);
            } else {
                let parent_sub = tree.parent(sub);
                if parent_sub.is_some() && parent_sub != upper {
                    self.f.add_nodes_of_path(tree, parent_sub, upper);
                } else {
                    self.f.add_to_fb(sub);
                }
            }
        }
    }
}

/// Final rewiring after the level walk: either `upper` survives and the
/// merged `node_union` hangs under it, or `upper` is replaced by
/// `node_union` (promoting a new root if `upper` was the root and a child
/// outranks `node_union`).
pub(crate) fn finish_update(
    tree: &mut ZoneTree,
    upper: NodeId,
    node_union: NodeId,
    remove_upper: bool,
) {
    debug_assert!(node_union.is_some(), "the level walk always produces a union");
    if !remove_upper {
        if node_union != upper && tree.parent(node_union) != upper {
            tree.detach(node_union);
            tree.add_child(upper, node_union);
        }
        return;
    }

    tree.detach(node_union);
    let parent_upper = tree.parent(upper);
    let kids: Vec<NodeId> = tree.children(upper).collect();

    if parent_upper.is_some() {
        tree.add_child(parent_upper, node_union);
        let mut gained = 0;
        for &c in &kids {
            if c == node_union {
                continue;
            }
            tree.detach(c);
            tree.add_child(node_union, c);
            gained += tree.area(c);
        }
        let area = tree.area(node_union) + gained;
        tree.set_area(node_union, area);
        tree.detach(upper);
        tree.release_node(upper);
        return;
    }

    // `upper` was the root. Promote node_union, unless a child outranks it
    // under the level-monotonicity of edges.
    let mut new_root = node_union;
    for &c in &kids {
        let outranks = if tree.is_maxtree() {
            tree.level(c) < tree.level(new_root)
        } else {
            tree.level(c) > tree.level(new_root)
        };
        if outranks {
            new_root = c;
        }
    }
    for &c in &kids {
        tree.detach(c);
    }
    if new_root != node_union {
        tree.add_child(new_root, node_union);
    }
    for &c in &kids {
        if c != new_root && tree.parent(c) != node_union {
            tree.add_child(new_root, c);
        }
    }
    let area = tree.area(upper);
    tree.set_area(new_root, area);
    tree.set_root(new_root);
    tree.release_node(upper);
}
