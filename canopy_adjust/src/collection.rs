// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The level-bucketed merge collection `F` and its carry set `Fb`.

use alloc::vec::Vec;

use canopy_tree::{NodeId, ZoneTree};

/// Nodes to merge during one adjustment, grouped by gray level, plus the
/// carry set `Fb` of below-interval subtree roots.
///
/// One bucket per level; each bucket has set semantics (stamp-deduplicated
/// inserts in insertion order). The level walk starts at the destination
/// level `b` and moves toward the trigger level: decreasing for a max-tree
/// adjustment, increasing for a min-tree adjustment.
///
/// Buckets and stamps stay allocated across adjustments; [`LevelBuckets::reset`]
/// only clears what the previous run touched.
#[derive(Clone, Debug)]
pub struct LevelBuckets {
    buckets: Vec<Vec<NodeId>>,
    touched: Vec<u8>,
    fb: Vec<NodeId>,
    /// Per-slot membership stamp: `token_f` means "in a bucket",
    /// `token_fb` means "in Fb".
    stamp: Vec<u32>,
    token_f: u32,
    token_fb: u32,
    next_token: u32,
    maxtree: bool,
    cur: i32,
}

impl Default for LevelBuckets {
    fn default() -> Self {
        Self::new()
    }
}

impl LevelBuckets {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        let mut buckets = Vec::new();
        buckets.resize_with(256, Vec::new);
        Self {
            buckets,
            touched: Vec::new(),
            fb: Vec::new(),
            stamp: Vec::new(),
            token_f: 0,
            token_fb: 0,
            next_token: 0,
            maxtree: false,
            cur: -1,
        }
    }

    /// Clears buckets and `Fb` and sets the walk direction.
    ///
    /// `slots` is the arena size of the tree being adjusted.
    pub fn reset(&mut self, maxtree: bool, slots: usize) {
        for l in self.touched.drain(..) {
            self.buckets[l as usize].clear();
        }
        self.fb.clear();
        if self.stamp.len() < slots {
            self.stamp.resize(slots, 0);
        }
        if self.next_token >= u32::MAX - 2 {
            self.stamp.fill(0);
            self.next_token = 0;
        }
        self.token_f = self.next_token + 1;
        self.token_fb = self.next_token + 2;
        self.next_token += 2;
        self.maxtree = maxtree;
        self.cur = -1;
    }

    /// Inserts `id` into the bucket of `level`; duplicates are ignored.
    pub fn insert(&mut self, level: u8, id: NodeId) {
        if self.stamp[id.idx()] == self.token_f {
            return;
        }
        self.stamp[id.idx()] = self.token_f;
        let bucket = &mut self.buckets[level as usize];
        if bucket.is_empty() {
            self.touched.push(level);
        }
        bucket.push(id);
    }

    /// Walks the parent path from `from` in `tree`, bucketing every node by
    /// its level, and stops right after inserting `upper`.
    pub fn add_nodes_of_path(&mut self, tree: &ZoneTree, from: NodeId, upper: NodeId) {
        for n in tree.path_to_root(from) {
            self.insert(tree.level(n), n);
            if n == upper {
                break;
            }
        }
    }

    /// Adds a below-interval subtree root to `Fb`; duplicates are ignored.
    pub fn add_to_fb(&mut self, id: NodeId) {
        if self.stamp[id.idx()] == self.token_fb {
            return;
        }
        self.stamp[id.idx()] = self.token_fb;
        self.fb.push(id);
    }

    /// The carry set, in insertion order.
    #[must_use]
    pub fn fb(&self) -> &[NodeId] {
        &self.fb
    }

    /// The bucket of `level`, in insertion order.
    #[must_use]
    pub fn nodes_at(&self, level: u8) -> &[NodeId] {
        &self.buckets[level as usize]
    }

    /// Positions the walk at `b` and returns the first non-empty level, or
    /// `None` if the walk runs off the level range.
    pub fn first_lambda(&mut self, b: u8) -> Option<u8> {
        self.cur = i32::from(b);
        self.settle()
    }

    /// Advances to the next non-empty level in walk direction.
    pub fn next_lambda(&mut self) -> Option<u8> {
        self.step();
        self.settle()
    }

    fn step(&mut self) {
        self.cur += if self.maxtree { -1 } else { 1 };
    }

    fn settle(&mut self) -> Option<u8> {
        while (0..=255).contains(&self.cur) {
            #[allow(clippy::cast_sign_loss, reason = "range-checked above")]
            let l = self.cur as usize;
            if !self.buckets[l].is_empty() {
                #[allow(clippy::cast_possible_truncation, reason = "range-checked above")]
                return Some(l as u8);
            }
            self.step();
        }
        None
    }
}

/// Per-slot stamp set for deduplicating node visits across one harvest.
#[derive(Clone, Default, Debug)]
pub(crate) struct StampSet {
    stamp: Vec<u32>,
    token: u32,
}

impl StampSet {
    /// Starts a fresh generation covering at least `len` slots.
    pub(crate) fn reset(&mut self, len: usize) {
        if self.stamp.len() < len {
            self.stamp.resize(len, 0);
        }
        self.token = self.token.wrapping_add(1);
        if self.token == 0 {
            self.stamp.fill(0);
            self.token = 1;
        }
    }

    /// Returns `true` the first time `idx` is inserted this generation.
    pub(crate) fn insert(&mut self, idx: usize) -> bool {
        if self.stamp[idx] == self.token {
            return false;
        }
        self.stamp[idx] = self.token;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use canopy_pixels::{Adjacency, ImageU8};
    use canopy_zones::ZoneGraph;
    use canopy_zones::backends::Boundary;

    // Real node ids from a small tree: 2 2 5 8 5 2 2 max-tree has three
    // nodes at levels 2, 5, 8.
    fn nodes() -> (ZoneTree, Vec<NodeId>) {
        let img = ImageU8::from_vec(1, 7, vec![2, 2, 5, 8, 5, 2, 2]);
        let adj = Adjacency::four_connected(1, 7);
        let mut graph: ZoneGraph<Boundary> = ZoneGraph::from_image(img, adj);
        let tree = ZoneTree::from_graph(&mut graph, true);
        let ids: Vec<NodeId> = tree.bfs(tree.root()).collect();
        (tree, ids)
    }

    #[test]
    fn buckets_deduplicate_and_keep_insertion_order() {
        let (tree, ids) = nodes();
        let mut f = LevelBuckets::new();
        f.reset(false, tree.arena().len());
        f.insert(10, ids[0]);
        f.insert(10, ids[1]);
        f.insert(10, ids[0]);
        assert_eq!(f.nodes_at(10), [ids[0], ids[1]]);
    }

    #[test]
    fn walk_ascends_for_min_tree_adjustment() {
        let (tree, ids) = nodes();
        let mut f = LevelBuckets::new();
        f.reset(false, tree.arena().len());
        f.insert(4, ids[0]);
        f.insert(9, ids[1]);
        assert_eq!(f.first_lambda(4), Some(4));
        assert_eq!(f.next_lambda(), Some(9));
        assert_eq!(f.next_lambda(), None);
    }

    #[test]
    fn walk_descends_for_max_tree_adjustment() {
        let (tree, ids) = nodes();
        let mut f = LevelBuckets::new();
        f.reset(true, tree.arena().len());
        f.insert(9, ids[0]);
        f.insert(4, ids[1]);
        assert_eq!(f.first_lambda(9), Some(9));
        assert_eq!(f.next_lambda(), Some(4));
        assert_eq!(f.next_lambda(), None);
    }

    #[test]
    fn path_walk_stops_at_the_upper_node() {
        let (tree, ids) = nodes();
        let leaf = *ids.last().unwrap();
        let mid = tree.parent(leaf);
        let mut f = LevelBuckets::new();
        f.reset(true, tree.arena().len());
        f.add_nodes_of_path(&tree, leaf, mid);
        assert_eq!(f.nodes_at(tree.level(leaf)), [leaf]);
        assert_eq!(f.nodes_at(tree.level(mid)), [mid]);
        assert!(f.nodes_at(tree.level(tree.root())).is_empty());
    }

    #[test]
    fn reset_clears_previous_buckets_and_fb() {
        let (tree, ids) = nodes();
        let mut f = LevelBuckets::new();
        f.reset(false, tree.arena().len());
        f.insert(7, ids[0]);
        f.add_to_fb(ids[1]);
        f.reset(false, tree.arena().len());
        assert!(f.nodes_at(7).is_empty());
        assert!(f.fb().is_empty());
        f.insert(7, ids[0]);
        assert_eq!(f.nodes_at(7), [ids[0]], "stamps from the old run are stale");
    }
}
