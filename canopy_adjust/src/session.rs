// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The dual-tree session: one graph, both trees.

use canopy_pixels::{Adjacency, ImageU8};
use canopy_tree::ZoneTree;
use canopy_zones::backends::Boundary;
use canopy_zones::{Backend, ZoneGraph};

/// One image's max-tree and min-tree over a single shared flat-zone graph.
///
/// The graph is common state: both trees reference its zones, and an
/// adjustment mutates it (zone merges) on behalf of both. Owning all three
/// in one struct makes the sharing discipline explicit: engine entry
/// points borrow the session exclusively, so only one adjustment can be in
/// flight, and both trees always observe the post-merge graph.
#[derive(Clone, Debug)]
pub struct DualTrees<B: Backend = Boundary> {
    /// The shared flat-zone graph.
    pub graph: ZoneGraph<B>,
    /// The max-tree of the image.
    pub maxtree: ZoneTree,
    /// The min-tree of the image.
    pub mintree: ZoneTree,
}

impl<B: Backend + Default> DualTrees<B> {
    /// Builds the graph and both trees for `image` under `adj`.
    #[must_use]
    pub fn from_image(image: ImageU8, adj: Adjacency) -> Self {
        let mut graph = ZoneGraph::from_image(image, adj);
        let maxtree = ZoneTree::from_graph(&mut graph, true);
        let mintree = ZoneTree::from_graph(&mut graph, false);
        Self {
            graph,
            maxtree,
            mintree,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn both_trees_share_the_zone_count() {
        let img = ImageU8::from_vec(2, 3, vec![1, 1, 9, 1, 9, 9]);
        let trees: DualTrees = DualTrees::from_image(img, Adjacency::four_connected(2, 3));
        assert_eq!(trees.graph.num_zones(), 2);
        assert_eq!(trees.maxtree.num_nodes(), 2);
        assert_eq!(trees.mintree.num_nodes(), 2);
        assert_eq!(
            trees.maxtree.reconstruct(&trees.graph),
            trees.mintree.reconstruct(&trees.graph)
        );
    }
}
