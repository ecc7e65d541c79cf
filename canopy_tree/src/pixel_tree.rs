// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel-driven component tree.

use alloc::vec::Vec;

use canopy_pixels::{Adjacency, ImageU8, PixelSets};

use crate::NodeId;
use crate::arena::{Bfs, Children, NodeArena, PostOrder};
use crate::zone_tree::{StructureError, validate_arena};

/// A max- or min-tree whose nodes carry their own pixel sets.
///
/// The self-contained flavor: no flat-zone graph, every pixel maps directly
/// to its node, and each node's pixels live in a private set of the
/// embedded [`PixelSets`]. This is what the rebuild-from-scratch baseline
/// pipeline uses; the incremental adjustment engine works on
/// [`ZoneTree`][crate::ZoneTree] instead.
#[derive(Clone, Debug)]
pub struct PixelTree {
    pub(crate) arena: NodeArena,
    pub(crate) pixels: PixelSets,
    pub(crate) pixel_to_node: Vec<NodeId>,
    pub(crate) rows: u32,
    pub(crate) cols: u32,
    pub(crate) root: NodeId,
    pub(crate) num_nodes: u32,
    pub(crate) maxtree: bool,
}

impl PixelTree {
    /// Builds the max-tree (`maxtree = true`) or min-tree of `image`.
    #[must_use]
    pub fn from_image(image: &ImageU8, adj: &Adjacency, maxtree: bool) -> Self {
        crate::build::build_pixel_tree(image, adj, maxtree)
    }

    /// Is this a max-tree?
    #[must_use]
    pub fn is_maxtree(&self) -> bool {
        self.maxtree
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes.
    #[must_use]
    pub fn num_nodes(&self) -> u32 {
        self.num_nodes
    }

    /// Read access to the node arena.
    #[must_use]
    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    /// Gray level of `id`.
    #[inline]
    #[must_use]
    pub fn level(&self, id: NodeId) -> u8 {
        self.arena.level(id)
    }

    /// Component pixel count of `id`.
    #[inline]
    #[must_use]
    pub fn area(&self, id: NodeId) -> u32 {
        self.arena.area(id)
    }

    /// Parent of `id`, or [`NodeId::NONE`] for the root.
    #[inline]
    #[must_use]
    pub fn parent(&self, id: NodeId) -> NodeId {
        self.arena.parent(id)
    }

    /// Does `id` have no children?
    #[inline]
    #[must_use]
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.arena.is_leaf(id)
    }

    /// The node containing pixel `p`.
    #[inline]
    #[must_use]
    pub fn node_of_pixel(&self, p: u32) -> NodeId {
        self.pixel_to_node[p as usize]
    }

    /// Number of pixels carried directly by `id` (excluding descendants).
    #[must_use]
    pub fn cnp_count(&self, id: NodeId) -> u32 {
        self.pixels.size_by_rep(self.arena.rep(id))
    }

    /// Iterates the pixels carried directly by `id`.
    pub fn cnps(&self, id: NodeId) -> impl Iterator<Item = u32> + '_ {
        self.pixels.pixels_of(self.arena.rep(id))
    }

    /// One representative pixel per node of the subtree at `id`, in BFS
    /// order.
    pub fn reps_of_cc(&self, id: NodeId) -> impl Iterator<Item = u32> + '_ {
        self.arena.bfs(id).map(|n| self.arena.rep(n))
    }

    /// Direct children of `id` in list order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.arena.children(id)
    }

    /// Post-order traversal of the subtree at `id`.
    #[must_use]
    pub fn post_order(&self, id: NodeId) -> PostOrder<'_> {
        self.arena.post_order(id)
    }

    /// Breadth-first traversal of the subtree at `id`.
    #[must_use]
    pub fn bfs(&self, id: NodeId) -> Bfs<'_> {
        self.arena.bfs(id)
    }

    /// All leaves of the tree.
    #[must_use]
    pub fn leaves(&self) -> Vec<NodeId> {
        self.arena
            .bfs(self.root)
            .filter(|&n| self.arena.is_leaf(n))
            .collect()
    }

    /// Removes the subtree rooted at `id`, remapping all its pixels to the
    /// parent. The root cannot be pruned.
    pub fn prune(&mut self, id: NodeId) {
        assert_ne!(id, self.root, "the root cannot be pruned");
        let parent = self.arena.parent(id);
        let parent_rep = self.arena.rep(parent);
        self.arena.remove_child(parent, id);

        let doomed: Vec<NodeId> = self.arena.post_order(id).collect();
        for n in doomed {
            let rep = self.arena.rep(n);
            for p in self.pixels.pixels_of(rep) {
                self.pixel_to_node[p as usize] = parent;
            }
            self.pixels.merge_by_rep(parent_rep, rep);
            self.arena.detach(n);
            self.arena.release(n);
            self.num_nodes -= 1;
        }
    }

    /// Writes each node's level into all of its own pixels.
    #[must_use]
    pub fn reconstruct(&self) -> ImageU8 {
        let mut out = ImageU8::new(self.rows, self.cols);
        for n in self.arena.bfs(self.root) {
            let level = self.arena.level(n);
            for p in self.pixels.pixels_of(self.arena.rep(n)) {
                out.set_value(p, level);
            }
        }
        out
    }

    /// Maximal subtree roots whose maintained `area` is at most `threshold`.
    #[must_use]
    pub fn nodes_with_area_at_most(&self, threshold: u32) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut queue: Vec<NodeId> = self.arena.children(self.root).collect();
        let mut i = 0;
        while i < queue.len() {
            let id = queue[i];
            i += 1;
            if self.arena.area(id) <= threshold {
                out.push(id);
            } else {
                queue.extend(self.arena.children(id));
            }
        }
        out
    }

    /// Checks the structural invariants over all live slots.
    pub fn validate_structure(&self) -> Result<(), StructureError> {
        validate_arena(&self.arena, self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn bumps() -> ImageU8 {
        // 1x7 stripe with a bump: 2 2 5 8 5 2 2
        ImageU8::from_vec(1, 7, vec![2, 2, 5, 8, 5, 2, 2])
    }

    #[test]
    fn build_and_reconstruct_round_trip() {
        let img = bumps();
        let adj = Adjacency::four_connected(1, 7);
        let maxtree = PixelTree::from_image(&img, &adj, true);
        let mintree = PixelTree::from_image(&img, &adj, false);
        assert_eq!(maxtree.reconstruct(), img);
        assert_eq!(mintree.reconstruct(), img);
        assert_eq!(maxtree.num_nodes(), 3);
        assert_eq!(mintree.num_nodes(), 5);
        maxtree.validate_structure().unwrap();
        mintree.validate_structure().unwrap();
    }

    #[test]
    fn areas_match_component_sizes() {
        let img = bumps();
        let adj = Adjacency::four_connected(1, 7);
        let t = PixelTree::from_image(&img, &adj, true);
        assert_eq!(t.area(t.root()), 7);
        let mid = t.node_of_pixel(2);
        assert_eq!(t.area(mid), 3);
        assert_eq!(t.cnp_count(mid), 2);
    }

    #[test]
    fn prune_merges_pixels_into_the_parent() {
        let img = bumps();
        let adj = Adjacency::four_connected(1, 7);
        let mut t = PixelTree::from_image(&img, &adj, true);
        let peak = t.node_of_pixel(3);
        let mid = t.parent(peak);
        t.prune(peak);
        assert_eq!(t.num_nodes(), 2);
        assert_eq!(t.node_of_pixel(3), mid);
        assert_eq!(t.cnp_count(mid), 3);
        assert_eq!(t.reconstruct().as_bytes(), [2, 2, 5, 5, 5, 2, 2]);
        t.validate_structure().unwrap();
    }

    #[test]
    fn pruning_a_mid_subtree_drops_everything_below() {
        let img = bumps();
        let adj = Adjacency::four_connected(1, 7);
        let mut t = PixelTree::from_image(&img, &adj, true);
        let mid = t.node_of_pixel(2);
        t.prune(mid);
        assert_eq!(t.num_nodes(), 1);
        assert_eq!(t.reconstruct().as_bytes(), [2, 2, 2, 2, 2, 2, 2]);
        t.validate_structure().unwrap();
    }
}
