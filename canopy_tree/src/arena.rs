// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with free-slot reuse.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use canopy_pixels::NO_PIXEL;

use crate::NodeId;

/// Arena of component-tree nodes.
///
/// Every per-node field lives in its own parallel vector, indexed by
/// [`NodeId`]. Structural linkage is a doubly linked multi-child encoding
/// (`parent`, `first_child`, `next_sibling`, `prev_sibling`, `last_child`,
/// `child_count`) with [`NodeId::NONE`] as the absent sentinel, so child
/// insertion, removal, and whole-list splicing are O(1).
///
/// Released slots are recycled LIFO through a free list; a free slot is
/// recognizable by `rep == NO_PIXEL` and carries no links.
#[derive(Clone, Default, Debug)]
pub struct NodeArena {
    /// Construction representative pixel; `NO_PIXEL` marks a free slot.
    rep: Vec<u32>,
    level: Vec<u8>,
    area: Vec<u32>,
    parent: Vec<NodeId>,
    first_child: Vec<NodeId>,
    next_sibling: Vec<NodeId>,
    prev_sibling: Vec<NodeId>,
    last_child: Vec<NodeId>,
    child_count: Vec<u32>,
    free: Vec<NodeId>,
}

impl NodeArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves capacity for `n` nodes across all field vectors.
    pub fn reserve(&mut self, n: usize) {
        self.rep.reserve(n);
        self.level.reserve(n);
        self.area.reserve(n);
        self.parent.reserve(n);
        self.first_child.reserve(n);
        self.next_sibling.reserve(n);
        self.prev_sibling.reserve(n);
        self.last_child.reserve(n);
        self.child_count.reserve(n);
    }

    /// Number of slots ever allocated (live and free).
    #[must_use]
    pub fn len(&self) -> usize {
        self.rep.len()
    }

    /// Returns `true` if no slot was ever allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rep.is_empty()
    }

    /// Is `id` a released (recyclable) slot?
    #[must_use]
    pub fn is_free(&self, id: NodeId) -> bool {
        self.rep[id.idx()] == NO_PIXEL
    }

    /// Allocates a node, reusing a free slot when one exists.
    ///
    /// The slot comes back with `area = 0`, no links, and no children.
    pub fn allocate(&mut self, rep: u32, level: u8) -> NodeId {
        debug_assert_ne!(rep, NO_PIXEL, "NO_PIXEL marks free slots");
        if let Some(id) = self.free.pop() {
            let i = id.idx();
            self.rep[i] = rep;
            self.level[i] = level;
            self.area[i] = 0;
            self.parent[i] = NodeId::NONE;
            self.first_child[i] = NodeId::NONE;
            self.next_sibling[i] = NodeId::NONE;
            self.prev_sibling[i] = NodeId::NONE;
            self.last_child[i] = NodeId::NONE;
            self.child_count[i] = 0;
            return id;
        }
        #[allow(
            clippy::cast_possible_truncation,
            reason = "node counts are bounded by the u32 pixel count"
        )]
        let id = NodeId::new(self.rep.len() as u32);
        self.rep.push(rep);
        self.level.push(level);
        self.area.push(0);
        self.parent.push(NodeId::NONE);
        self.first_child.push(NodeId::NONE);
        self.next_sibling.push(NodeId::NONE);
        self.prev_sibling.push(NodeId::NONE);
        self.last_child.push(NodeId::NONE);
        self.child_count.push(0);
        id
    }

    /// Returns `id`'s slot to the free list.
    ///
    /// The node must already be disconnected: no parent and no children.
    pub fn release(&mut self, id: NodeId) {
        let i = id.idx();
        debug_assert!(self.parent[i].is_none(), "release of a node with a parent");
        debug_assert_eq!(self.child_count[i], 0, "release of a node with children");
        self.rep[i] = NO_PIXEL;
        self.level[i] = 0;
        self.area[i] = 0;
        self.first_child[i] = NodeId::NONE;
        self.next_sibling[i] = NodeId::NONE;
        self.prev_sibling[i] = NodeId::NONE;
        self.last_child[i] = NodeId::NONE;
        self.free.push(id);
    }

    // --- field access ---

    /// Construction representative pixel of `id`.
    #[inline]
    #[must_use]
    pub fn rep(&self, id: NodeId) -> u32 {
        self.rep[id.idx()]
    }

    /// Gray level of `id`.
    #[inline]
    #[must_use]
    pub fn level(&self, id: NodeId) -> u8 {
        self.level[id.idx()]
    }

    /// Sets the gray level of `id` (used only when promoting a new root).
    #[inline]
    pub fn set_level(&mut self, id: NodeId, level: u8) {
        self.level[id.idx()] = level;
    }

    /// Pixel count of the component rooted at `id`.
    #[inline]
    #[must_use]
    pub fn area(&self, id: NodeId) -> u32 {
        self.area[id.idx()]
    }

    /// Sets the component pixel count of `id`.
    #[inline]
    pub fn set_area(&mut self, id: NodeId, area: u32) {
        self.area[id.idx()] = area;
    }

    /// Parent of `id`, or [`NodeId::NONE`] for the root.
    #[inline]
    #[must_use]
    pub fn parent(&self, id: NodeId) -> NodeId {
        self.parent[id.idx()]
    }

    /// First child of `id`.
    #[inline]
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> NodeId {
        self.first_child[id.idx()]
    }

    /// Next sibling of `id`.
    #[inline]
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> NodeId {
        self.next_sibling[id.idx()]
    }

    /// Previous sibling of `id`.
    #[inline]
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> NodeId {
        self.prev_sibling[id.idx()]
    }

    /// Last child of `id`.
    #[inline]
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> NodeId {
        self.last_child[id.idx()]
    }

    /// Number of direct children of `id`.
    #[inline]
    #[must_use]
    pub fn child_count(&self, id: NodeId) -> u32 {
        self.child_count[id.idx()]
    }

    /// Does `id` have no children?
    #[inline]
    #[must_use]
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.child_count[id.idx()] == 0
    }

    /// Is `child` a direct child of `id`?
    #[inline]
    #[must_use]
    pub fn has_child(&self, id: NodeId, child: NodeId) -> bool {
        self.parent[child.idx()] == id
    }

    // --- structural mutation ---

    /// Appends `child` to `parent`'s child list and sets its parent link.
    ///
    /// `child` must currently be detached.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            self.parent[child.idx()].is_none(),
            "add_child of an attached node"
        );
        debug_assert_ne!(parent, child, "node cannot parent itself");
        let last = self.last_child[parent.idx()];
        if last.is_none() {
            self.first_child[parent.idx()] = child;
        } else {
            self.next_sibling[last.idx()] = child;
        }
        self.prev_sibling[child.idx()] = last;
        self.next_sibling[child.idx()] = NodeId::NONE;
        self.last_child[parent.idx()] = child;
        self.child_count[parent.idx()] += 1;
        self.parent[child.idx()] = parent;
    }

    /// Unlinks `child` from `parent`'s child list and clears its parent.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.has_child(parent, child), "not a child of this parent");
        let prev = self.prev_sibling[child.idx()];
        let next = self.next_sibling[child.idx()];
        if prev.is_none() {
            self.first_child[parent.idx()] = next;
        } else {
            self.next_sibling[prev.idx()] = next;
        }
        if next.is_none() {
            self.last_child[parent.idx()] = prev;
        } else {
            self.prev_sibling[next.idx()] = prev;
        }
        self.child_count[parent.idx()] -= 1;
        self.parent[child.idx()] = NodeId::NONE;
        self.prev_sibling[child.idx()] = NodeId::NONE;
        self.next_sibling[child.idx()] = NodeId::NONE;
    }

    /// Detaches `id` from its parent if it has one.
    pub fn detach(&mut self, id: NodeId) {
        let parent = self.parent[id.idx()];
        if parent.is_some() {
            self.remove_child(parent, id);
        }
    }

    /// Moves the whole child list of `from` onto the end of `to`'s list.
    ///
    /// O(1) link surgery plus one parent-pointer update per moved child.
    pub fn splice_children(&mut self, to: NodeId, from: NodeId) {
        debug_assert_ne!(to, from, "splice onto itself");
        let head = self.first_child[from.idx()];
        if head.is_none() {
            return;
        }
        let mut c = head;
        while c.is_some() {
            self.parent[c.idx()] = to;
            c = self.next_sibling[c.idx()];
        }
        let last = self.last_child[to.idx()];
        if last.is_none() {
            self.first_child[to.idx()] = head;
        } else {
            self.next_sibling[last.idx()] = head;
        }
        self.prev_sibling[head.idx()] = last;
        self.last_child[to.idx()] = self.last_child[from.idx()];
        self.child_count[to.idx()] += self.child_count[from.idx()];
        self.first_child[from.idx()] = NodeId::NONE;
        self.last_child[from.idx()] = NodeId::NONE;
        self.child_count[from.idx()] = 0;
    }

    /// Clears the parent link of `id` without touching any child list.
    ///
    /// Only for root promotion; the caller must have already unlinked `id`.
    pub fn clear_parent(&mut self, id: NodeId) {
        self.parent[id.idx()] = NodeId::NONE;
    }

    // --- iteration ---

    /// Iterates the direct children of `id` in list order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            arena: self,
            cur: self.first_child[id.idx()],
        }
    }

    /// Iterates every live (non-free) slot id in index order.
    #[must_use]
    pub fn live_ids(&self) -> LiveIds<'_> {
        LiveIds {
            arena: self,
            cur: 0,
        }
    }

    /// Post-order traversal of the subtree rooted at `id`: descendants
    /// before their root. Sibling order is stable within one traversal.
    #[must_use]
    pub fn post_order(&self, id: NodeId) -> PostOrder<'_> {
        let mut stack = Vec::new();
        if id.is_some() {
            stack.push((id, false));
        }
        PostOrder { arena: self, stack }
    }

    /// Breadth-first traversal of the subtree rooted at `id`.
    #[must_use]
    pub fn bfs(&self, id: NodeId) -> Bfs<'_> {
        let mut queue = VecDeque::new();
        if id.is_some() {
            queue.push_back(id);
        }
        Bfs { arena: self, queue }
    }

    /// Yields `id`, its parent, grandparent, ... up to the root.
    #[must_use]
    pub fn path_to_root(&self, id: NodeId) -> PathToRoot<'_> {
        PathToRoot {
            arena: self,
            cur: id,
        }
    }

    /// Number of strict descendants of `id`.
    #[must_use]
    pub fn count_descendants(&self, id: NodeId) -> usize {
        let mut count = 0;
        let mut stack: Vec<NodeId> = self.children(id).collect();
        while let Some(u) = stack.pop() {
            count += 1;
            stack.extend(self.children(u));
        }
        count
    }
}

/// Iterator over a node's direct children.
#[derive(Clone, Debug)]
pub struct Children<'a> {
    arena: &'a NodeArena,
    cur: NodeId,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.cur.is_none() {
            return None;
        }
        let id = self.cur;
        self.cur = self.arena.next_sibling[id.idx()];
        Some(id)
    }
}

/// Iterator over live slot ids.
#[derive(Clone, Debug)]
pub struct LiveIds<'a> {
    arena: &'a NodeArena,
    cur: u32,
}

impl Iterator for LiveIds<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "arena slot counts fit in u32"
        )]
        let len = self.arena.rep.len() as u32;
        while self.cur < len {
            let id = NodeId::new(self.cur);
            self.cur += 1;
            if !self.arena.is_free(id) {
                return Some(id);
            }
        }
        None
    }
}

/// Post-order iterator (two-color explicit stack).
#[derive(Clone, Debug)]
pub struct PostOrder<'a> {
    arena: &'a NodeArena,
    stack: Vec<(NodeId, bool)>,
}

impl Iterator for PostOrder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        loop {
            let &(id, expanded) = self.stack.last()?;
            if expanded {
                self.stack.pop();
                return Some(id);
            }
            self.stack.last_mut().expect("non-empty").1 = true;
            let mut c = self.arena.first_child[id.idx()];
            while c.is_some() {
                self.stack.push((c, false));
                c = self.arena.next_sibling[c.idx()];
            }
        }
    }
}

/// Breadth-first iterator.
#[derive(Clone, Debug)]
pub struct Bfs<'a> {
    arena: &'a NodeArena,
    queue: VecDeque<NodeId>,
}

impl Iterator for Bfs<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.queue.pop_front()?;
        self.queue.extend(self.arena.children(id));
        Some(id)
    }
}

/// Iterator along parent links up to the root.
#[derive(Clone, Debug)]
pub struct PathToRoot<'a> {
    arena: &'a NodeArena,
    cur: NodeId,
}

impl Iterator for PathToRoot<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.cur.is_none() {
            return None;
        }
        let id = self.cur;
        self.cur = self.arena.parent[id.idx()];
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn chain() -> (NodeArena, NodeId, NodeId, NodeId, NodeId) {
        // root -> (a, b); a -> c
        let mut arena = NodeArena::new();
        let root = arena.allocate(0, 0);
        let a = arena.allocate(1, 3);
        let b = arena.allocate(2, 5);
        let c = arena.allocate(3, 7);
        arena.add_child(root, a);
        arena.add_child(root, b);
        arena.add_child(a, c);
        (arena, root, a, b, c)
    }

    #[test]
    fn child_links_stay_symmetric() {
        let (mut arena, root, a, b, c) = chain();
        assert_eq!(arena.children(root).collect::<Vec<_>>(), [a, b]);
        assert_eq!(arena.child_count(root), 2);

        arena.remove_child(root, a);
        assert_eq!(arena.children(root).collect::<Vec<_>>(), [b]);
        assert_eq!(arena.first_child(root), b);
        assert!(arena.parent(a).is_none());

        arena.add_child(b, a);
        assert_eq!(arena.children(b).collect::<Vec<_>>(), [a]);
        assert_eq!(arena.children(a).collect::<Vec<_>>(), [c]);
    }

    #[test]
    fn splice_moves_all_children() {
        let (mut arena, root, a, b, c) = chain();
        arena.splice_children(b, a);
        assert!(arena.is_leaf(a));
        assert_eq!(arena.children(b).collect::<Vec<_>>(), [c]);
        assert_eq!(arena.parent(c), b);
        assert_eq!(arena.children(root).collect::<Vec<_>>(), [a, b]);
    }

    #[test]
    fn free_slots_are_reused_lifo() {
        let (mut arena, _root, a, _b, c) = chain();
        arena.detach(c);
        arena.release(c);
        arena.detach(a);
        arena.release(a);
        assert!(arena.is_free(a) && arena.is_free(c));

        let d = arena.allocate(9, 1);
        assert_eq!(d, a, "last released slot is reused first");
        let e = arena.allocate(10, 1);
        assert_eq!(e, c);
        assert_eq!(arena.len(), 4);
        assert_eq!(arena.area(d), 0);
        assert!(arena.parent(d).is_none());
    }

    #[test]
    fn post_order_visits_children_first() {
        let (arena, root, a, b, c) = chain();
        let order: Vec<NodeId> = arena.post_order(root).collect();
        assert_eq!(order.len(), 4);
        let pos = |x: NodeId| order.iter().position(|&y| y == x).unwrap();
        assert!(pos(c) < pos(a), "descendant before ancestor");
        assert!(pos(a) < pos(root));
        assert!(pos(b) < pos(root));
    }

    #[test]
    fn bfs_and_path_to_root() {
        let (arena, root, a, b, c) = chain();
        let bfs: Vec<NodeId> = arena.bfs(root).collect();
        assert_eq!(bfs, [root, a, b, c]);
        let path: Vec<NodeId> = arena.path_to_root(c).collect();
        assert_eq!(path, [c, a, root]);
    }

    #[test]
    fn live_ids_skip_free_slots() {
        let (mut arena, root, a, b, c) = chain();
        arena.detach(c);
        arena.release(c);
        let live: Vec<NodeId> = arena.live_ids().collect();
        assert_eq!(live, [root, a, b]);
    }
}
