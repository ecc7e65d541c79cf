// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node attribute computers over a post-order traversal.

use alloc::vec;
use alloc::vec::Vec;

use canopy_zones::{Backend, ZoneGraph};

use crate::{NodeId, ZoneTree};

/// Attribute a driver can threshold a tree on.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AttributeKind {
    /// Pixel count of the component.
    Area,
    /// Width of the component's bounding box.
    BoxWidth,
    /// Height of the component's bounding box.
    BoxHeight,
    /// Diagonal length of the component's bounding box.
    DiagonalLength,
}

/// Folds the subtree at `id` in post-order through a caller-owned state:
/// `pre(s, n)` on first visit, `merge(s, n, c)` after each child `c`
/// finished, `post(s, n)` once all children are merged.
///
/// Levels are strictly monotone along root paths, so the recursion depth is
/// bounded by the number of gray levels.
pub(crate) fn fold_post_order<S>(
    tree: &ZoneTree,
    id: NodeId,
    state: &mut S,
    pre: &mut impl FnMut(&mut S, NodeId),
    merge: &mut impl FnMut(&mut S, NodeId, NodeId),
    post: &mut impl FnMut(&mut S, NodeId),
) {
    pre(state, id);
    let mut c = tree.arena().first_child(id);
    while c.is_some() {
        fold_post_order(tree, c, state, pre, merge, post);
        merge(state, id, c);
        c = tree.arena().next_sibling(c);
    }
    post(state, id);
}

struct BoxState {
    buf: Vec<f32>,
    xmin: Vec<u32>,
    xmax: Vec<u32>,
    ymin: Vec<u32>,
    ymax: Vec<u32>,
}

/// Computes one attribute value per node into a dense buffer indexed by
/// [`NodeId`].
///
/// Slots of released nodes are left at `0.0` and must be treated as absent
/// by the caller.
#[must_use]
pub fn compute_attribute<B: Backend>(
    tree: &ZoneTree,
    graph: &ZoneGraph<B>,
    kind: AttributeKind,
) -> Vec<f32> {
    let slots = tree.arena().len();
    match kind {
        AttributeKind::Area => {
            let mut buf = vec![0.0f32; slots];
            fold_post_order(
                tree,
                tree.root(),
                &mut buf,
                &mut |buf, id| {
                    #[allow(
                        clippy::cast_precision_loss,
                        reason = "areas are far below f32 precision limits"
                    )]
                    {
                        buf[id.idx()] = tree.cnp_count(graph, id) as f32;
                    }
                },
                &mut |buf, id, child| buf[id.idx()] += buf[child.idx()],
                &mut |_, _| {},
            );
            buf
        }
        AttributeKind::BoxWidth | AttributeKind::BoxHeight | AttributeKind::DiagonalLength => {
            let cols = graph.image().cols();
            let rows = graph.image().rows();
            let mut state = BoxState {
                buf: vec![0.0f32; slots],
                xmin: vec![cols; slots],
                xmax: vec![0; slots],
                ymin: vec![rows; slots],
                ymax: vec![0; slots],
            };
            fold_post_order(
                tree,
                tree.root(),
                &mut state,
                &mut |s, id| {
                    let i = id.idx();
                    for &rep in tree.reps(id) {
                        for p in graph.pixels_of_zone(rep) {
                            let (y, x) = graph.image().to_2d(p);
                            s.xmin[i] = s.xmin[i].min(x);
                            s.xmax[i] = s.xmax[i].max(x);
                            s.ymin[i] = s.ymin[i].min(y);
                            s.ymax[i] = s.ymax[i].max(y);
                        }
                    }
                },
                &mut |s, id, child| {
                    let (i, c) = (id.idx(), child.idx());
                    s.xmin[i] = s.xmin[i].min(s.xmin[c]);
                    s.xmax[i] = s.xmax[i].max(s.xmax[c]);
                    s.ymin[i] = s.ymin[i].min(s.ymin[c]);
                    s.ymax[i] = s.ymax[i].max(s.ymax[c]);
                },
                &mut |s, id| {
                    let i = id.idx();
                    #[allow(
                        clippy::cast_precision_loss,
                        reason = "box extents are far below f32 precision limits"
                    )]
                    let (w, h) = (
                        (s.xmax[i] - s.xmin[i] + 1) as f32,
                        (s.ymax[i] - s.ymin[i] + 1) as f32,
                    );
                    s.buf[i] = match kind {
                        AttributeKind::BoxWidth => w,
                        AttributeKind::BoxHeight => h,
                        AttributeKind::DiagonalLength => sqrtf(w * w + h * h),
                        AttributeKind::Area => unreachable!(),
                    };
                },
            );
            state.buf
        }
    }
}

#[cfg(feature = "std")]
#[inline]
fn sqrtf(x: f32) -> f32 {
    x.sqrt()
}

#[cfg(all(not(feature = "std"), feature = "libm"))]
#[inline]
fn sqrtf(x: f32) -> f32 {
    libm::sqrtf(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_pixels::{Adjacency, ImageU8};
    use canopy_zones::ZoneGraph;
    use canopy_zones::backends::Boundary;

    // 4x4, a 2x2 bright square on a dark field.
    fn square() -> (ZoneGraph<Boundary>, ZoneTree) {
        let img = ImageU8::from_vec(
            4,
            4,
            vec![1, 1, 1, 1, 1, 9, 9, 1, 1, 9, 9, 1, 1, 1, 1, 1],
        );
        let adj = Adjacency::eight_connected(4, 4);
        let mut graph = ZoneGraph::from_image(img, adj);
        let tree = ZoneTree::from_graph(&mut graph, true);
        (graph, tree)
    }

    #[test]
    fn area_attribute_matches_maintained_areas() {
        let (graph, tree) = square();
        let area = compute_attribute(&tree, &graph, AttributeKind::Area);
        for id in tree.arena().live_ids() {
            #[allow(clippy::cast_precision_loss, reason = "small test values")]
            let expect = tree.area(id) as f32;
            assert_eq!(area[id.idx()], expect);
        }
    }

    #[test]
    fn bounding_box_of_the_bright_square() {
        let (mut graph, tree) = square();
        let w = compute_attribute(&tree, &graph, AttributeKind::BoxWidth);
        let h = compute_attribute(&tree, &graph, AttributeKind::BoxHeight);
        let square = tree.node_of_pixel(&mut graph, 5);
        assert_eq!(w[square.idx()], 2.0);
        assert_eq!(h[square.idx()], 2.0);
        assert_eq!(w[tree.root().idx()], 4.0);
        assert_eq!(h[tree.root().idx()], 4.0);
    }

    #[test]
    fn diagonal_is_euclidean() {
        let (graph, tree) = square();
        let d = compute_attribute(&tree, &graph, AttributeKind::DiagonalLength);
        let expect = sqrtf(4.0 * 4.0 + 4.0 * 4.0);
        assert!((d[tree.root().idx()] - expect).abs() < 1e-6);
    }
}
