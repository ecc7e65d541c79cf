// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flat-zone-driven component tree.

use alloc::vec::Vec;
use core::fmt;
use core::mem::take;

use canopy_pixels::ImageU8;
use canopy_zones::{Backend, RepList, ZoneGraph};

use crate::NodeId;
use crate::arena::{Bfs, Children, NodeArena, PathToRoot, PostOrder};

/// A max- or min-tree whose nodes carry flat zones of a shared
/// [`ZoneGraph`].
///
/// Each node owns an ordered list of flat-zone representatives; the zones of
/// a node all have the node's gray level, and the union of zones over a
/// subtree is the subtree's connected component. A representative-to-node
/// map resolves the node carrying any *canonical* zone representative; for
/// an arbitrary pixel, canonicalize through the graph first
/// ([`ZoneTree::node_of_pixel`]).
///
/// Two trees of opposite polarity are typically built over the *same* graph
/// and adjusted in lockstep by `canopy_adjust`; all operations that touch
/// zone structure therefore take the graph as an explicit argument instead
/// of owning it.
#[derive(Clone, Debug)]
pub struct ZoneTree {
    pub(crate) arena: NodeArena,
    pub(crate) reps: Vec<RepList>,
    pub(crate) rep_to_node: Vec<NodeId>,
    pub(crate) root: NodeId,
    pub(crate) num_nodes: u32,
    pub(crate) maxtree: bool,
}

impl ZoneTree {
    /// Builds the max-tree (`maxtree = true`) or min-tree of the graph's
    /// image. Both trees of a dual pair are built over one shared graph,
    /// before any merge has happened in it.
    #[must_use]
    pub fn from_graph<B: Backend>(graph: &mut ZoneGraph<B>, maxtree: bool) -> Self {
        crate::build::build_zone_tree(graph, maxtree)
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

    /// Read access to the node arena (levels, areas, links, traversals).
    #[must_use]
    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    // --- per-node reads ---

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

    /// The flat-zone representatives carried by `id`.
    #[inline]
    #[must_use]
    pub fn reps(&self, id: NodeId) -> &RepList {
        &self.reps[id.idx()]
    }

    /// Number of flat zones carried by `id`.
    #[inline]
    #[must_use]
    pub fn num_zones_of(&self, id: NodeId) -> usize {
        self.reps[id.idx()].len()
    }

    /// Total pixel count of the zones carried directly by `id`.
    #[must_use]
    pub fn cnp_count<B: Backend>(&self, graph: &ZoneGraph<B>, id: NodeId) -> u32 {
        self.reps[id.idx()]
            .iter()
            .map(|&rep| graph.zone_len(rep))
            .sum()
    }

    /// The node carrying the canonical zone representative `rep`.
    #[inline]
    #[must_use]
    pub fn node_of_rep(&self, rep: u32) -> NodeId {
        self.rep_to_node[rep as usize]
    }

    /// The node containing pixel `p` (canonicalizes through the graph).
    #[must_use]
    pub fn node_of_pixel<B: Backend>(&self, graph: &mut ZoneGraph<B>, p: u32) -> NodeId {
        self.rep_to_node[graph.find_representative(p) as usize]
    }

    // --- traversals ---

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

    /// `id` and its ancestors up to the root.
    #[must_use]
    pub fn path_to_root(&self, id: NodeId) -> PathToRoot<'_> {
        self.arena.path_to_root(id)
    }

    /// All zone representatives in the subtree at `id`, in BFS node order.
    pub fn reps_of_cc(&self, id: NodeId) -> impl Iterator<Item = u32> + '_ {
        self.arena
            .bfs(id)
            .flat_map(move |n| self.reps[n.idx()].iter().copied())
    }

    /// All leaves of the tree.
    #[must_use]
    pub fn leaves(&self) -> Vec<NodeId> {
        self.arena
            .bfs(self.root)
            .filter(|&n| self.arena.is_leaf(n))
            .collect()
    }

    /// Number of flat zones carried by strict descendants of `id`.
    #[must_use]
    pub fn count_zone_descendants(&self, id: NodeId) -> usize {
        self.arena
            .bfs(id)
            .skip(1)
            .map(|n| self.reps[n.idx()].len())
            .sum()
    }

    // --- structural mutation (used by the adjustment engine) ---

    /// Appends a detached `child` under `parent`.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.arena.add_child(parent, child);
    }

    /// Detaches `id` from its parent, if any.
    pub fn detach(&mut self, id: NodeId) {
        self.arena.detach(id);
    }

    /// Moves all children of `from` onto `to`.
    pub fn splice_children(&mut self, to: NodeId, from: NodeId) {
        self.arena.splice_children(to, from);
    }

    /// Sets the component pixel count of `id`.
    pub fn set_area(&mut self, id: NodeId, area: u32) {
        self.arena.set_area(id, area);
    }

    /// Recomputes `area(id)` as its own pixel count plus its children's
    /// areas.
    pub fn refresh_area<B: Backend>(&mut self, graph: &ZoneGraph<B>, id: NodeId) {
        let mut area = self.cnp_count(graph, id);
        for c in self.arena.children(id) {
            area += self.arena.area(c);
        }
        self.arena.set_area(id, area);
    }

    /// Allocates a fresh node carrying nothing, with `rep` as its
    /// construction representative.
    pub fn allocate_node(&mut self, rep: u32, level: u8) -> NodeId {
        let id = self.arena.allocate(rep, level);
        if self.reps.len() < self.arena.len() {
            self.reps.resize(self.arena.len(), RepList::new());
        }
        debug_assert!(self.reps[id.idx()].is_empty(), "recycled slot kept zones");
        self.num_nodes += 1;
        id
    }

    /// Releases a disconnected, zone-less node back to the arena.
    pub fn release_node(&mut self, id: NodeId) {
        assert!(
            self.reps[id.idx()].is_empty(),
            "release of a node still carrying zones"
        );
        self.arena.release(id);
        self.num_nodes -= 1;
    }

    /// Promotes `id` (already detached) to root.
    pub fn set_root(&mut self, id: NodeId) {
        debug_assert!(self.arena.parent(id).is_none(), "new root must be detached");
        self.root = id;
    }

    /// Adds the zone of canonical representative `rep` to `id` and points
    /// the representative map at it.
    pub fn add_rep(&mut self, id: NodeId, rep: u32) {
        self.reps[id.idx()].push(rep);
        self.rep_to_node[rep as usize] = id;
    }

    /// Removes the zone `rep` from `id`'s list (the map entry is left to the
    /// caller, which is moving the zone elsewhere).
    pub fn remove_rep(&mut self, id: NodeId, rep: u32) {
        self.reps[id.idx()].retain(|&mut r| r != rep);
    }

    /// Points the representative map of `rep` at `id`.
    pub fn set_node_of_rep(&mut self, rep: u32, id: NodeId) {
        self.rep_to_node[rep as usize] = id;
    }

    /// Moves every zone of `from` onto `into`, updating the map.
    pub fn absorb_reps(&mut self, into: NodeId, from: NodeId) {
        let moved = take(&mut self.reps[from.idx()]);
        for &rep in &moved {
            self.rep_to_node[rep as usize] = into;
        }
        self.reps[into.idx()].extend(moved);
    }

    /// Merges the trigger zone `rep` into whichever zones of `id` it is
    /// adjacent to, records the winner on `id`, and returns the winner.
    pub fn absorb_connected_zone<B: Backend>(
        &mut self,
        graph: &mut ZoneGraph<B>,
        id: NodeId,
        rep: u32,
    ) -> u32 {
        let mut cands = take(&mut self.reps[id.idx()]);
        let winner = graph.merge_adjacent_candidates_in_place(rep, &mut cands);
        self.reps[id.idx()] = cands;
        self.rep_to_node[winner as usize] = id;
        winner
    }

    /// Merges the connected trigger zones `bases` into whichever zones of
    /// `id` they touch, records the winner on `id`, and returns the winner.
    pub fn absorb_connected_zones<B: Backend>(
        &mut self,
        graph: &mut ZoneGraph<B>,
        id: NodeId,
        bases: &[u32],
        hint: Option<u32>,
    ) -> u32 {
        let mut cands = take(&mut self.reps[id.idx()]);
        let winner = graph.merge_bases_with_adjacent_candidates_in_place(bases, &mut cands, hint);
        self.reps[id.idx()] = cands;
        self.rep_to_node[winner as usize] = id;
        winner
    }

    // --- whole-tree operations ---

    /// Removes the subtree rooted at `id` and merges its pixels into the
    /// parent's flat zones.
    ///
    /// The subtree's zones (one connected region) are unioned in the graph
    /// with whichever of the parent's zones they touch; the subtree's nodes
    /// are released. The root cannot be pruned.
    pub fn prune<B: Backend>(&mut self, graph: &mut ZoneGraph<B>, id: NodeId) {
        assert_ne!(id, self.root, "the root cannot be pruned");
        let parent = self.arena.parent(id);

        let bases: Vec<u32> = self.reps_of_cc(id).collect();
        debug_assert!(!bases.is_empty(), "subtree without zones");

        self.arena.remove_child(parent, id);
        let mut cands = take(&mut self.reps[parent.idx()]);
        let winner = graph.merge_bases_with_adjacent_candidates_in_place(&bases, &mut cands, None);
        self.reps[parent.idx()] = cands;
        self.rep_to_node[winner as usize] = parent;

        let doomed: Vec<NodeId> = self.arena.post_order(id).collect();
        for n in doomed {
            self.arena.detach(n);
            self.reps[n.idx()].clear();
            self.arena.release(n);
            self.num_nodes -= 1;
        }
    }

    /// Writes each node's level into all pixels of its own flat zones.
    #[must_use]
    pub fn reconstruct<B: Backend>(&self, graph: &ZoneGraph<B>) -> ImageU8 {
        let mut out = ImageU8::new(graph.image().rows(), graph.image().cols());
        for n in self.arena.bfs(self.root) {
            let level = self.arena.level(n);
            for &rep in &self.reps[n.idx()] {
                for p in graph.pixels_of_zone(rep) {
                    out.set_value(p, level);
                }
            }
        }
        out
    }

    /// Maximal subtree roots whose attribute is at most `threshold`.
    ///
    /// Top-down BFS seeded with the root's children: a selected node is
    /// collected without descending into it, and the root itself is never
    /// selected.
    #[must_use]
    pub fn nodes_below_threshold(&self, attr: &[f32], threshold: f32) -> Vec<NodeId> {
        self.select(|id| attr[id.idx()] <= threshold)
    }

    /// Maximal subtree roots whose maintained `area` is at most `threshold`.
    #[must_use]
    pub fn nodes_with_area_at_most(&self, threshold: u32) -> Vec<NodeId> {
        self.select(|id| self.arena.area(id) <= threshold)
    }

    fn select(&self, selected: impl Fn(NodeId) -> bool) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut queue: Vec<NodeId> = self.arena.children(self.root).collect();
        let mut i = 0;
        while i < queue.len() {
            let id = queue[i];
            i += 1;
            if selected(id) {
                out.push(id);
            } else {
                queue.extend(self.arena.children(id));
            }
        }
        out
    }

    /// Checks the structural invariants over all live slots.
    ///
    /// A test and debugging aid, not meant for hot paths.
    pub fn validate_structure(&self) -> Result<(), StructureError> {
        validate_arena(&self.arena, self.root)
    }
}

/// First violated structural invariant found by
/// [`ZoneTree::validate_structure`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StructureError {
    /// Not exactly one live parentless node, or the root is not it.
    RootCount {
        /// Live nodes with no parent.
        found: usize,
    },
    /// A node is its own parent.
    SelfParent {
        /// The offending node.
        node: NodeId,
    },
    /// A node in a child list does not point back at the list's owner.
    ChildParentMismatch {
        /// Owner of the child list.
        parent: NodeId,
        /// The child with the wrong parent link.
        child: NodeId,
    },
    /// `prev_sibling`/`next_sibling` are not mutually consistent.
    BrokenSiblingLinks {
        /// Owner of the child list.
        parent: NodeId,
        /// The child where the chain broke.
        child: NodeId,
    },
    /// `last_child` does not match the end of the walked chain.
    LastChildMismatch {
        /// Owner of the child list.
        parent: NodeId,
    },
    /// `child_count` does not match the walked chain length.
    ChildCountMismatch {
        /// Owner of the child list.
        parent: NodeId,
        /// Children found by walking.
        walked: u32,
        /// The cached count.
        stored: u32,
    },
}

impl fmt::Display for StructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::RootCount { found } => {
                write!(f, "expected exactly one live root, found {found}")
            }
            Self::SelfParent { node } => write!(f, "node {node:?} is its own parent"),
            Self::ChildParentMismatch { parent, child } => {
                write!(f, "child {child:?} of {parent:?} has a different parent link")
            }
            Self::BrokenSiblingLinks { parent, child } => {
                write!(f, "sibling links around {child:?} under {parent:?} disagree")
            }
            Self::LastChildMismatch { parent } => {
                write!(f, "last_child of {parent:?} does not end its chain")
            }
            Self::ChildCountMismatch {
                parent,
                walked,
                stored,
            } => {
                write!(
                    f,
                    "child_count of {parent:?} is {stored} but the chain has {walked}"
                )
            }
        }
    }
}

pub(crate) fn validate_arena(arena: &NodeArena, root: NodeId) -> Result<(), StructureError> {
    let mut roots = 0;
    for id in arena.live_ids() {
        let parent = arena.parent(id);
        if parent.is_none() {
            roots += 1;
        } else if parent == id {
            return Err(StructureError::SelfParent { node: id });
        }
    }
    if roots != 1 || root.is_none() || arena.is_free(root) || arena.parent(root).is_some() {
        return Err(StructureError::RootCount { found: roots });
    }

    for u in arena.live_ids() {
        let mut walked = 0;
        let mut last = NodeId::NONE;
        let mut c = arena.first_child(u);
        while c.is_some() {
            if arena.parent(c) != u {
                return Err(StructureError::ChildParentMismatch { parent: u, child: c });
            }
            if arena.prev_sibling(c) != last {
                return Err(StructureError::BrokenSiblingLinks { parent: u, child: c });
            }
            last = c;
            walked += 1;
            c = arena.next_sibling(c);
        }
        if last != arena.last_child(u) {
            return Err(StructureError::LastChildMismatch { parent: u });
        }
        if walked != arena.child_count(u) {
            return Err(StructureError::ChildCountMismatch {
                parent: u,
                walked,
                stored: arena.child_count(u),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use canopy_pixels::Adjacency;
    use canopy_zones::backends::Boundary;

    // 1x7 stripe with a bump:  2 2 5 8 5 2 2
    fn stripe() -> (ZoneGraph<Boundary>, ZoneTree, ZoneTree) {
        let img = ImageU8::from_vec(1, 7, vec![2, 2, 5, 8, 5, 2, 2]);
        let adj = Adjacency::four_connected(1, 7);
        let mut graph = ZoneGraph::from_image(img, adj);
        let maxtree = ZoneTree::from_graph(&mut graph, true);
        let mintree = ZoneTree::from_graph(&mut graph, false);
        (graph, maxtree, mintree)
    }

    #[test]
    fn maxtree_of_stripe_has_expected_shape() {
        let (mut graph, t, _) = stripe();
        // Components: {>=2} all, {>=5} middle three, {>=8} peak.
        assert_eq!(t.num_nodes(), 3);
        assert_eq!(t.level(t.root()), 2);
        assert_eq!(t.area(t.root()), 7);

        let mid = t.node_of_pixel(&mut graph, 2);
        assert_eq!(t.level(mid), 5);
        assert_eq!(t.area(mid), 3);
        assert_eq!(t.num_zones_of(mid), 2);

        let peak = t.node_of_pixel(&mut graph, 3);
        assert_eq!(t.level(peak), 8);
        assert!(t.is_leaf(peak));
        assert_eq!(t.parent(peak), mid);
        t.validate_structure().unwrap();
    }

    #[test]
    fn mintree_of_stripe_has_dual_shape() {
        let (mut graph, _, t) = stripe();
        // root {<=8}, two level-5 flanks, each with a level-2 leaf.
        assert_eq!(t.num_nodes(), 5);
        assert_eq!(t.level(t.root()), 8);
        let low = t.node_of_pixel(&mut graph, 0);
        assert_eq!(t.level(low), 2);
        assert!(t.is_leaf(low));
        assert_eq!(t.num_zones_of(low), 1);
        let other_low = t.node_of_pixel(&mut graph, 6);
        assert_ne!(low, other_low, "the two 2-runs are separate components");
        t.validate_structure().unwrap();
    }

    #[test]
    fn reconstruction_round_trips_the_image() {
        let (graph, maxtree, mintree) = stripe();
        assert_eq!(maxtree.reconstruct(&graph), *graph.image());
        assert_eq!(mintree.reconstruct(&graph), *graph.image());
    }

    #[test]
    fn prune_flattens_the_subtree_into_its_parent() {
        let (mut graph, mut t, _) = stripe();
        let peak = t.node_of_pixel(&mut graph, 3);
        let mid = t.parent(peak);
        t.prune(&mut graph, peak);

        assert_eq!(t.num_nodes(), 2);
        t.validate_structure().unwrap();
        // The peak's zone was absorbed into an adjacent 5-zone; the winner
        // is the smallest pixel of the merged region.
        assert_eq!(graph.find_representative(3), 2);
        assert_eq!(t.node_of_pixel(&mut graph, 3), mid);
        let rec = t.reconstruct(&graph);
        assert_eq!(rec.as_bytes(), [2, 2, 5, 5, 5, 2, 2]);
    }

    #[test]
    #[should_panic(expected = "the root cannot be pruned")]
    fn pruning_the_root_is_a_precondition_violation() {
        let img = ImageU8::from_vec(1, 2, vec![4, 4]);
        let adj = Adjacency::four_connected(1, 2);
        let mut graph: ZoneGraph<Boundary> = ZoneGraph::from_image(img, adj);
        let mut t = ZoneTree::from_graph(&mut graph, true);
        assert_eq!(t.num_nodes(), 1);
        let root = t.root();
        t.prune(&mut graph, root);
    }

    #[test]
    fn threshold_selection_keeps_maximal_subtrees() {
        let (_, t, _) = stripe();
        // areas: root 7, mid 3, peak 1
        assert_eq!(t.nodes_with_area_at_most(0), []);
        let picked = t.nodes_with_area_at_most(1);
        assert_eq!(picked.len(), 1);
        assert_eq!(t.level(picked[0]), 8);
        let picked = t.nodes_with_area_at_most(3);
        assert_eq!(picked.len(), 1);
        assert_eq!(t.level(picked[0]), 5, "selected subtree swallows the peak");
    }

    #[test]
    fn infinite_attribute_buffers_bound_selection() {
        let (_, t, _) = stripe();
        let all_inf = vec![f32::INFINITY; t.arena().len()];
        assert!(t.nodes_below_threshold(&all_inf, 1e9).is_empty());
        let all_neg = vec![f32::NEG_INFINITY; t.arena().len()];
        let picked = t.nodes_below_threshold(&all_neg, 0.0);
        // Everything below the root, i.e. the root's children.
        assert_eq!(picked.len(), 1);
        assert_eq!(t.parent(picked[0]), t.root());
    }

    #[test]
    fn leaves_and_reps_of_cc() {
        let (_, t, _) = stripe();
        let leaves = t.leaves();
        assert_eq!(leaves.len(), 1);
        let mut reps: Vec<u32> = t.reps_of_cc(t.root()).collect();
        reps.sort_unstable();
        assert_eq!(reps, [0, 2, 3, 4, 5]);
    }
}
