// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Subtree-driven tree adjustment.

use alloc::vec::Vec;

use canopy_tree::{NodeId, ZoneTree};
use canopy_zones::{Backend, RepList, ZoneGraph};

use crate::engine::{AdjustmentCore, finish_update};
use crate::proper_parts::ProperParts;
use crate::session::DualTrees;

/// Adjusts one tree of a dual pair when a whole *subtree* of the other is
/// pruned at once.
///
/// Instead of walking the subtree leaf by leaf, the proper-parts collector
/// gathers every flat zone of the doomed subtree together with the target
/// node carrying it, elects the interval bound `tau_star`, and the level
/// walk merges from the destination level `b` up to `tau_star`'s level.
/// Target nodes whose zones were all part of the trigger vanish along the
/// way.
///
/// Scratch storage is reused across calls.
#[derive(Clone, Default, Debug)]
pub struct SubtreeAdjustment {
    core: AdjustmentCore,
    parts: ProperParts,
}

impl SubtreeAdjustment {
    /// Creates an engine with empty scratch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewires `tree` so it stays the component tree of the image in which
    /// the subtree of `other` rooted at `sub` (not `other`'s root) has been
    /// merged into its parent.
    ///
    /// Call [`ZoneTree::prune`] on `other` afterwards.
    pub fn update_tree<B: Backend>(
        &mut self,
        tree: &mut ZoneTree,
        graph: &mut ZoneGraph<B>,
        other: &ZoneTree,
        sub: NodeId,
    ) {
        assert_ne!(sub, other.root(), "cannot trigger on the root");
        debug_assert_ne!(tree.is_maxtree(), other.is_maxtree(), "trees must be dual");

        let maxtree = tree.is_maxtree();
        let b = other.level(other.parent(sub));

        // Collect the proper parts: every zone of the doomed subtree, with
        // the target node that carries it.
        self.parts.reset(maxtree, tree.arena().len());
        for n in other.bfs(sub) {
            for &rep in other.reps(n) {
                let carrier = tree.node_of_rep(rep);
                self.parts.add(tree, carrier, rep);
            }
        }
        let tau_star = self.parts.tau_star();
        let a_star = tree.level(tau_star);

        self.core
            .build_collections(tree, graph, self.parts.reps(), tau_star, b);
        let fb: Vec<NodeId> = self.core.f.fb().to_vec();

        let mut lambda = self.core.f.first_lambda(b);
        let mut node_union = NodeId::NONE;
        let mut node_union_prev = NodeId::NONE;

        if lambda != Some(b) {
            // No interval path reached level b: materialize a host node.
            let mut no_cands = RepList::new();
            let winner = graph.merge_bases_with_adjacent_candidates_in_place(
                self.parts.reps(),
                &mut no_cands,
                Some(self.parts.zone_winner()),
            );
            self.parts.remove_zones(tree);
            let fresh = tree.allocate_node(winner, b);
            tree.add_rep(fresh, winner);
            tree.add_child(tau_star, fresh);
            let mut area = graph.zone_len(winner);
            for &n in &fb {
                tree.detach(n);
                tree.add_child(fresh, n);
                area += tree.area(n);
            }
            tree.set_area(fresh, area);
            node_union = fresh;
            node_union_prev = fresh;
        }

        while let Some(l) = lambda {
            let past_a = if maxtree { l <= a_star } else { l >= a_star };
            if past_a {
                break;
            }
            let merged: Vec<NodeId> = self.core.f.nodes_at(l).to_vec();

            // The union survives the merge, so it must not be one of the
            // nodes scheduled to vanish.
            let Some(&union) = merged.iter().find(|&&n| !self.parts.is_removed(n)) else {
                // Every node at this level dissolves: hand each one's
                // children to its parent and release it.
                for &n in &merged {
                    let parent_n = tree.parent(n);
                    debug_assert!(parent_n.is_some(), "interval nodes are never the root");
                    tree.splice_children(parent_n, n);
                    tree.detach(n);
                    tree.release_node(n);
                }
                node_union = node_union_prev;
                lambda = self.core.f.next_lambda();
                continue;
            };
            node_union = union;

            tree.detach(node_union);
            for &n in &merged {
                if n == node_union {
                    continue;
                }
                if !self.parts.is_removed(n) {
                    tree.absorb_reps(node_union, n);
                }
                tree.splice_children(node_union, n);
                tree.detach(n);
                tree.release_node(n);
            }

            if l == b {
                self.parts.connect_into(tree, graph, node_union);
                for &n in &fb {
                    tree.detach(n);
                    tree.add_child(node_union, n);
                }
            }
            if node_union_prev.is_some() && node_union_prev != node_union {
                tree.detach(node_union_prev);
                tree.add_child(node_union, node_union_prev);
            }
            tree.refresh_area(graph, node_union);

            node_union_prev = node_union;
            lambda = self.core.f.next_lambda();
        }

        let remove_upper = self.parts.is_removed(tau_star);
        finish_update(tree, tau_star, node_union, remove_upper);
    }

    /// Adjusts the min-tree for every subtree of the max-tree pruning
    /// schedule, pruning the max-tree as it goes.
    pub fn adjust_min_tree<B: Backend>(&mut self, trees: &mut DualTrees<B>, prune_roots: &[NodeId]) {
        for &sub in prune_roots {
            assert_ne!(sub, trees.maxtree.root(), "schedule contains the root");
            self.update_tree(&mut trees.mintree, &mut trees.graph, &trees.maxtree, sub);
            trees.maxtree.prune(&mut trees.graph, sub);
        }
    }

    /// Adjusts the max-tree for every subtree of the min-tree pruning
    /// schedule, pruning the min-tree as it goes.
    pub fn adjust_max_tree<B: Backend>(&mut self, trees: &mut DualTrees<B>, prune_roots: &[NodeId]) {
        for &sub in prune_roots {
            assert_ne!(sub, trees.mintree.root(), "schedule contains the root");
            self.update_tree(&mut trees.maxtree, &mut trees.graph, &trees.mintree, sub);
            trees.mintree.prune(&mut trees.graph, sub);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use canopy_pixels::{Adjacency, ImageU8};
    use canopy_zones::backends::Boundary;

    #[test]
    fn subtree_prune_matches_the_leaf_by_leaf_result() {
        // 2 2 5 8 5 2 2: prune the whole {>=5} subtree in one call.
        let img = ImageU8::from_vec(1, 7, vec![2, 2, 5, 8, 5, 2, 2]);
        let mut trees: DualTrees<Boundary> =
            DualTrees::from_image(img, Adjacency::four_connected(1, 7));
        let mut adjust = SubtreeAdjustment::new();

        let mut sub = trees.maxtree.node_of_pixel(&mut trees.graph, 2);
        if sub == trees.maxtree.root() {
            sub = trees.maxtree.node_of_pixel(&mut trees.graph, 3);
        }
        assert_eq!(trees.maxtree.level(sub), 5);
        adjust.update_tree(&mut trees.mintree, &mut trees.graph, &trees.maxtree, sub);
        trees.maxtree.prune(&mut trees.graph, sub);

        let rec_max = trees.maxtree.reconstruct(&trees.graph);
        let rec_min = trees.mintree.reconstruct(&trees.graph);
        assert_eq!(rec_max.as_bytes(), [2, 2, 2, 2, 2, 2, 2]);
        assert_eq!(rec_max, rec_min);
        trees.maxtree.validate_structure().unwrap();
        trees.mintree.validate_structure().unwrap();
    }

    #[test]
    fn below_interval_neighbors_land_in_fb_under_the_union() {
        // 1 9 8 9 3 9: pruning the {>=8} subtree drops its pixels to 3.
        // The min-tree's 1-node hangs below the interval [3, 9] and must end
        // up as a child of the merged level-3 node.
        let img = ImageU8::from_vec(1, 6, vec![1, 9, 8, 9, 3, 9]);
        let mut trees: DualTrees<Boundary> =
            DualTrees::from_image(img, Adjacency::four_connected(1, 6));
        let mut adjust = SubtreeAdjustment::new();

        let sub = trees.maxtree.node_of_pixel(&mut trees.graph, 2);
        assert_eq!(trees.maxtree.level(sub), 8);
        assert_eq!(
            trees.maxtree.level(trees.maxtree.parent(sub)),
            3,
            "destination level is 3"
        );

        adjust.update_tree(&mut trees.mintree, &mut trees.graph, &trees.maxtree, sub);
        trees.maxtree.prune(&mut trees.graph, sub);

        let rec_max = trees.maxtree.reconstruct(&trees.graph);
        let rec_min = trees.mintree.reconstruct(&trees.graph);
        assert_eq!(rec_max.as_bytes(), [1, 3, 3, 3, 3, 9]);
        assert_eq!(rec_max, rec_min);

        // The 1-pixel node now hangs under the level-3 union.
        let one = trees.mintree.node_of_pixel(&mut trees.graph, 0);
        assert_eq!(trees.mintree.level(one), 1);
        let union3 = trees.mintree.parent(one);
        assert_eq!(trees.mintree.level(union3), 3);
        assert_eq!(trees.mintree.area(union3), 5);
        trees.mintree.validate_structure().unwrap();
    }

    #[test]
    fn emptied_carriers_vanish_from_the_target_tree() {
        // 3 9 8 9 3: the min-tree node at level 8 carries only the trigger
        // zone; after the adjustment it must be gone.
        let img = ImageU8::from_vec(1, 5, vec![3, 9, 8, 9, 3]);
        let mut trees: DualTrees<Boundary> =
            DualTrees::from_image(img, Adjacency::four_connected(1, 5));
        let mut adjust = SubtreeAdjustment::new();

        let before = trees.mintree.num_nodes();
        let sub = trees.maxtree.node_of_pixel(&mut trees.graph, 2);
        assert_eq!(trees.maxtree.level(sub), 8);

        adjust.update_tree(&mut trees.mintree, &mut trees.graph, &trees.maxtree, sub);
        trees.maxtree.prune(&mut trees.graph, sub);

        assert!(trees.mintree.num_nodes() < before);
        let rec_max = trees.maxtree.reconstruct(&trees.graph);
        assert_eq!(rec_max.as_bytes(), [3, 3, 3, 3, 3]);
        assert_eq!(rec_max, trees.mintree.reconstruct(&trees.graph));
        trees.mintree.validate_structure().unwrap();
    }
}
