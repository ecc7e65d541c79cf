// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Leaf-driven tree adjustment.

use alloc::vec::Vec;

use canopy_tree::{NodeId, ZoneTree};
use canopy_zones::{Backend, ZoneGraph};

use crate::engine::{AdjustmentCore, finish_update};
use crate::session::DualTrees;

/// Adjusts one tree of a dual pair when a *leaf* of the other is pruned.
///
/// The classic case: the leaf holds a single flat zone at level `a`; pruning
/// it drops that zone to the parent level `b`. [`LeafAdjustment::update_tree`]
/// rewires the complementary tree accordingly; the
/// [`adjust_min_tree`](LeafAdjustment::adjust_min_tree) /
/// [`adjust_max_tree`](LeafAdjustment::adjust_max_tree) drivers run whole
/// pruning schedules leaf by leaf, in post-order, pruning the source tree
/// after every update.
///
/// Scratch storage is reused across calls.
#[derive(Clone, Default, Debug)]
pub struct LeafAdjustment {
    core: AdjustmentCore,
}

impl LeafAdjustment {
    /// Creates an engine with empty scratch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewires `tree` so it stays the component tree of the image in which
    /// `leaf` (a leaf of `other`, not its root) has been merged into its
    /// parent.
    ///
    /// Call [`ZoneTree::prune`] on `other` afterwards; the pair of calls is
    /// what keeps the two trees reconstructing the same image.
    pub fn update_tree<B: Backend>(
        &mut self,
        tree: &mut ZoneTree,
        graph: &mut ZoneGraph<B>,
        other: &ZoneTree,
        leaf: NodeId,
    ) {
        assert_ne!(leaf, other.root(), "cannot trigger on the root");
        assert!(other.is_leaf(leaf), "ByLeaf trigger must be a leaf");
        debug_assert_ne!(tree.is_maxtree(), other.is_maxtree(), "trees must be dual");
        debug_assert_eq!(other.num_zones_of(leaf), 1, "a leaf holds one flat zone");

        let maxtree = tree.is_maxtree();
        let a = other.level(leaf);
        let b = other.level(other.parent(leaf));
        let rep = other.reps(leaf)[0];

        let tau = tree.node_of_rep(rep);
        debug_assert_eq!(tree.level(tau), a, "the leaf zone sits at level a");
        let tau_is_single = tree.num_zones_of(tau) == 1;

        self.core.build_collections(tree, graph, &[rep], tau, b);
        let fb: Vec<NodeId> = self.core.f.fb().to_vec();

        let mut lambda = self.core.f.first_lambda(b);
        let mut node_union = NodeId::NONE;
        let mut node_union_prev = NodeId::NONE;

        if lambda != Some(b) {
            // No interval path reached level b: materialize a node there to
            // host the zone, with Fb underneath.
            let fresh = tree.allocate_node(rep, b);
            tree.add_rep(fresh, rep);
            tree.remove_rep(tau, rep);
            tree.add_child(tau, fresh);
            let mut area = graph.zone_len(rep);
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
            let past_a = if maxtree { l <= a } else { l >= a };
            if past_a {
                break;
            }
            let merged: Vec<NodeId> = self.core.f.nodes_at(l).to_vec();

            node_union = merged[0];
            tree.detach(node_union);
            for &n in &merged[1..] {
                tree.absorb_reps(node_union, n);
                tree.splice_children(node_union, n);
                tree.detach(n);
                tree.release_node(n);
            }

            if l == b {
                // Connect the leaf zone with the zones already at the
                // destination level and drop it from its old carrier.
                tree.absorb_connected_zone(graph, node_union, rep);
                tree.remove_rep(tau, rep);
                for &n in &fb {
                    tree.detach(n);
                    tree.add_child(node_union, n);
                }
            }
            if node_union_prev.is_some() {
                tree.detach(node_union_prev);
                tree.add_child(node_union, node_union_prev);
            }
            tree.refresh_area(graph, node_union);

            node_union_prev = node_union;
            lambda = self.core.f.next_lambda();
        }

        finish_update(tree, tau, node_union, tau_is_single);
    }

    /// Adjusts the min-tree for every node of the max-tree pruning schedule,
    /// leaf by leaf in post-order, pruning the max-tree as it goes.
    pub fn adjust_min_tree<B: Backend>(&mut self, trees: &mut DualTrees<B>, prune_roots: &[NodeId]) {
        for &node in prune_roots {
            let order: Vec<NodeId> = trees.maxtree.post_order(node).collect();
            for leaf in order {
                assert_ne!(leaf, trees.maxtree.root(), "schedule reached the root");
                self.update_tree(&mut trees.mintree, &mut trees.graph, &trees.maxtree, leaf);
                trees.maxtree.prune(&mut trees.graph, leaf);
            }
        }
    }

    /// Adjusts the max-tree for every node of the min-tree pruning schedule,
    /// leaf by leaf in post-order, pruning the min-tree as it goes.
    pub fn adjust_max_tree<B: Backend>(&mut self, trees: &mut DualTrees<B>, prune_roots: &[NodeId]) {
        for &node in prune_roots {
            let order: Vec<NodeId> = trees.mintree.post_order(node).collect();
            for leaf in order {
                assert_ne!(leaf, trees.mintree.root(), "schedule reached the root");
                self.update_tree(&mut trees.maxtree, &mut trees.graph, &trees.mintree, leaf);
                trees.mintree.prune(&mut trees.graph, leaf);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use canopy_pixels::{Adjacency, ImageU8};
    use canopy_zones::backends::Boundary;

    fn dual(img: ImageU8, adj: Adjacency) -> DualTrees<Boundary> {
        DualTrees::from_image(img, adj)
    }

    #[test]
    fn pruning_a_peak_keeps_the_trees_in_lockstep() {
        // 2 2 5 8 5 2 2: prune the 8-peak from the max-tree.
        let img = ImageU8::from_vec(1, 7, vec![2, 2, 5, 8, 5, 2, 2]);
        let mut trees = dual(img, Adjacency::four_connected(1, 7));
        let mut adjust = LeafAdjustment::new();

        let peak = trees.maxtree.node_of_pixel(&mut trees.graph, 3);
        assert!(trees.maxtree.is_leaf(peak));
        adjust.update_tree(
            &mut trees.mintree,
            &mut trees.graph,
            &trees.maxtree,
            peak,
        );
        trees.maxtree.prune(&mut trees.graph, peak);

        let rec_max = trees.maxtree.reconstruct(&trees.graph);
        let rec_min = trees.mintree.reconstruct(&trees.graph);
        assert_eq!(rec_max.as_bytes(), [2, 2, 5, 5, 5, 2, 2]);
        assert_eq!(rec_max, rec_min);
        trees.maxtree.validate_structure().unwrap();
        trees.mintree.validate_structure().unwrap();
    }

    #[test]
    fn multi_zone_upper_node_survives_and_gains_a_child() {
        // 9 5 9: tauL in the min-tree is the root carrying two 9-zones;
        // it must stay alive and adopt the merged node as a child.
        let img = ImageU8::from_vec(1, 3, vec![9, 5, 9]);
        let mut trees = dual(img, Adjacency::four_connected(1, 3));
        let mut adjust = LeafAdjustment::new();

        let leaf = trees.maxtree.node_of_pixel(&mut trees.graph, 0);
        assert!(trees.maxtree.is_leaf(leaf));
        let tau = trees.mintree.node_of_pixel(&mut trees.graph, 0);
        assert_eq!(tau, trees.mintree.root());
        assert_eq!(trees.mintree.num_zones_of(tau), 2);

        adjust.update_tree(&mut trees.mintree, &mut trees.graph, &trees.maxtree, leaf);
        trees.maxtree.prune(&mut trees.graph, leaf);

        // tauL survived with its other zone; the 5-node swallowed pixel 0.
        let root = trees.mintree.root();
        assert_eq!(root, tau);
        assert_eq!(trees.mintree.num_zones_of(root), 1);
        let rec_max = trees.maxtree.reconstruct(&trees.graph);
        let rec_min = trees.mintree.reconstruct(&trees.graph);
        assert_eq!(rec_max.as_bytes(), [5, 5, 9]);
        assert_eq!(rec_max, rec_min);
        trees.mintree.validate_structure().unwrap();
    }

    #[test]
    fn border_leaves_behave_like_central_ones() {
        // The same bump at the border and in the center flatten identically.
        for img in [
            ImageU8::from_vec(1, 5, vec![8, 3, 3, 3, 3]),
            ImageU8::from_vec(1, 5, vec![3, 3, 8, 3, 3]),
        ] {
            let mut trees = dual(img, Adjacency::four_connected(1, 5));
            let mut adjust = LeafAdjustment::new();
            let leaf = trees.maxtree.leaves()[0];
            adjust.update_tree(&mut trees.mintree, &mut trees.graph, &trees.maxtree, leaf);
            trees.maxtree.prune(&mut trees.graph, leaf);
            let rec_max = trees.maxtree.reconstruct(&trees.graph);
            assert_eq!(rec_max.as_bytes(), [3, 3, 3, 3, 3]);
            assert_eq!(rec_max, trees.mintree.reconstruct(&trees.graph));
            trees.mintree.validate_structure().unwrap();
        }
    }

    #[test]
    fn full_leaf_schedule_keeps_reconstructions_equal() {
        // Flatten the whole max-tree leaf by leaf; after every prune both
        // trees must reconstruct the same image.
        let img = ImageU8::from_vec(
            3,
            5,
            vec![3, 3, 7, 3, 3, 3, 1, 7, 5, 3, 3, 3, 3, 5, 3],
        );
        let mut trees = dual(img, Adjacency::eight_connected(3, 5));
        let mut adjust = LeafAdjustment::new();

        while trees.maxtree.num_nodes() > 1 {
            let leaf = trees.maxtree.leaves()[0];
            adjust.update_tree(&mut trees.mintree, &mut trees.graph, &trees.maxtree, leaf);
            trees.maxtree.prune(&mut trees.graph, leaf);

            let rec_max = trees.maxtree.reconstruct(&trees.graph);
            let rec_min = trees.mintree.reconstruct(&trees.graph);
            assert_eq!(rec_max, rec_min);
            trees.maxtree.validate_structure().unwrap();
            trees.mintree.validate_structure().unwrap();
        }
        assert_eq!(trees.mintree.num_nodes(), 1);
        let leftover: Vec<u8> = trees
            .maxtree
            .reconstruct(&trees.graph)
            .as_bytes()
            .to_vec();
        assert!(leftover.iter().all(|&v| v == leftover[0]), "flat image");
    }
}
