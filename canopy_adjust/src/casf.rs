// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Connected alternating sequential filter (CASF) drivers.
//!
//! One CASF step at threshold `t` is an area opening (prune every max-tree
//! node with `area <= t`) followed by an area closing (the same on the
//! min-tree). The incremental drivers build the dual trees once and adjust
//! them across the whole threshold schedule; the naive driver rebuilds a
//! pixel tree from scratch for every half-step. All drivers compute the
//! same image, bit for bit.

use canopy_pixels::{Adjacency, ImageU8};
use canopy_tree::PixelTree;
use canopy_zones::Backend;

use crate::by_leaf::LeafAdjustment;
use crate::by_subtree::SubtreeAdjustment;
use crate::session::DualTrees;

/// CASF with incremental leaf-by-leaf adjustment.
#[must_use]
pub fn casf<B: Backend + Default>(image: &ImageU8, radius: f64, thresholds: &[u32]) -> ImageU8 {
    let adj = Adjacency::with_radius(image.rows(), image.cols(), radius);
    let mut trees: DualTrees<B> = DualTrees::from_image(image.clone(), adj);
    let mut adjust = LeafAdjustment::new();
    for &t in thresholds {
        let roots = trees.maxtree.nodes_with_area_at_most(t);
        adjust.adjust_min_tree(&mut trees, &roots);
        let roots = trees.mintree.nodes_with_area_at_most(t);
        adjust.adjust_max_tree(&mut trees, &roots);
    }
    trees.mintree.reconstruct(&trees.graph)
}

/// CASF with incremental whole-subtree adjustment.
#[must_use]
pub fn casf_subtree<B: Backend + Default>(
    image: &ImageU8,
    radius: f64,
    thresholds: &[u32],
) -> ImageU8 {
    let adj = Adjacency::with_radius(image.rows(), image.cols(), radius);
    let mut trees: DualTrees<B> = DualTrees::from_image(image.clone(), adj);
    let mut adjust = SubtreeAdjustment::new();
    for &t in thresholds {
        let roots = trees.maxtree.nodes_with_area_at_most(t);
        adjust.adjust_min_tree(&mut trees, &roots);
        let roots = trees.mintree.nodes_with_area_at_most(t);
        adjust.adjust_max_tree(&mut trees, &roots);
    }
    trees.mintree.reconstruct(&trees.graph)
}

/// CASF by rebuilding a pixel tree from scratch for every half-step.
///
/// The reference the incremental drivers are checked against.
#[must_use]
pub fn casf_naive(image: &ImageU8, radius: f64, thresholds: &[u32]) -> ImageU8 {
    let adj = Adjacency::with_radius(image.rows(), image.cols(), radius);
    let mut out = image.clone();
    for &t in thresholds {
        let mut maxtree = PixelTree::from_image(&out, &adj, true);
        for n in maxtree.nodes_with_area_at_most(t) {
            maxtree.prune(n);
        }
        out = maxtree.reconstruct();

        let mut mintree = PixelTree::from_image(&out, &adj, false);
        for n in mintree.nodes_with_area_at_most(t) {
            mintree.prune(n);
        }
        out = mintree.reconstruct();
    }
    out
}
