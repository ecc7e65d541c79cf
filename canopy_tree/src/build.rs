// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Component-tree construction by counting sort + union-find.

use alloc::vec;
use alloc::vec::Vec;

use canopy_pixels::{Adjacency, ImageU8, PixelSets};
use canopy_zones::{Backend, ZoneGraph};

use crate::NodeId;
use crate::arena::NodeArena;
use crate::pixel_tree::PixelTree;
use crate::zone_tree::ZoneTree;

const UNSET: u32 = u32::MAX;

/// Stable counting sort of all pixels by gray level.
///
/// Max-tree order is ascending gray, min-tree order descending, so that
/// processing the result back-to-front visits extremal pixels first.
fn counting_sort_pixels(image: &ImageU8, maxtree: bool) -> Vec<u32> {
    let n = image.len();
    let key = |v: u8| -> usize {
        if maxtree {
            v as usize
        } else {
            255 - v as usize
        }
    };
    let mut counter = [0u32; 256];
    for p in 0..n {
        counter[key(image.value(p))] += 1;
    }
    for i in 1..256 {
        counter[i] += counter[i - 1];
    }
    let mut ordered = vec![0u32; n as usize];
    for p in (0..n).rev() {
        let k = key(image.value(p));
        counter[k] -= 1;
        ordered[counter[k] as usize] = p;
    }
    ordered
}

fn find_root(zpar: &mut [u32], mut x: u32) -> u32 {
    while zpar[x as usize] != x {
        let next = zpar[x as usize];
        zpar[x as usize] = zpar[next as usize];
        x = zpar[x as usize];
    }
    x
}

/// Builds a pixel-driven component tree from the image.
pub(crate) fn build_pixel_tree(image: &ImageU8, adj: &Adjacency, maxtree: bool) -> PixelTree {
    let n = image.len();
    let ordered = counting_sort_pixels(image, maxtree);

    let mut zpar = vec![UNSET; n as usize];
    let mut parent = vec![UNSET; n as usize];
    for i in (0..n as usize).rev() {
        let p = ordered[i];
        parent[p as usize] = p;
        zpar[p as usize] = p;
        for q in adj.neighbors(p) {
            if zpar[q as usize] != UNSET {
                let r = find_root(&mut zpar, q);
                if r != p {
                    parent[r as usize] = p;
                    zpar[r as usize] = p;
                }
            }
        }
    }

    // Canonicalization: plateau pixels point at their node's representative.
    let mut num_nodes = 0usize;
    for i in 0..n as usize {
        let p = ordered[i] as usize;
        let q = parent[p] as usize;
        if image.value(parent[q]) == image.value(q as u32) {
            parent[p] = parent[q];
        }
        if parent[p] == p as u32 || image.value(parent[p]) != image.value(p as u32) {
            num_nodes += 1;
        }
    }

    let mut arena = NodeArena::new();
    arena.reserve(num_nodes);
    let mut pixels = PixelSets::with_capacity(n);
    let mut pixel_to_node = vec![NodeId::NONE; n as usize];
    let mut root = NodeId::NONE;
    let mut next_slot: u32 = 0;

    for i in 0..n as usize {
        let p = ordered[i];
        let canonical = parent[p as usize] == p || image.value(parent[p as usize]) != image.value(p);
        if parent[p as usize] == p {
            root = arena.allocate(p, image.value(p));
            pixel_to_node[p as usize] = root;
        } else if canonical {
            let id = arena.allocate(p, image.value(p));
            arena.add_child(pixel_to_node[parent[p as usize] as usize], id);
            pixel_to_node[p as usize] = id;
        } else {
            pixel_to_node[p as usize] = pixel_to_node[parent[p as usize] as usize];
        }

        if canonical {
            pixels.open_singleton(next_slot, p);
            next_slot += 1;
        } else {
            pixels.insert_after_rep(parent[p as usize], p);
        }
    }
    pixels.shrink_to(next_slot);

    let mut tree = PixelTree {
        arena,
        pixels,
        pixel_to_node,
        rows: image.rows(),
        cols: image.cols(),
        root,
        num_nodes: num_nodes as u32,
        maxtree,
    };
    compute_pixel_areas(&mut tree);
    tree
}

fn compute_pixel_areas(tree: &mut PixelTree) {
    let order: Vec<NodeId> = tree.arena.post_order(tree.root).collect();
    for id in order {
        let mut area = tree.pixels.size_by_rep(tree.arena.rep(id));
        for c in tree.arena.children(id) {
            area += tree.arena.area(c);
        }
        tree.arena.set_area(id, area);
    }
}

/// Stable counting sort of the zone representatives by gray level.
fn counting_sort_zones<B: Backend>(graph: &ZoneGraph<B>, maxtree: bool) -> Vec<u32> {
    let num_fz = graph.num_zones();
    let image = graph.image();
    let pixels = graph.pixels();
    let key = |v: u8| -> usize {
        if maxtree {
            v as usize
        } else {
            255 - v as usize
        }
    };
    let mut counter = [0u32; 256];
    for slot in 0..num_fz {
        counter[key(image.value(pixels.rep_of(slot)))] += 1;
    }
    for i in 1..256 {
        counter[i] += counter[i - 1];
    }
    let mut ordered = vec![0u32; num_fz as usize];
    for slot in (0..num_fz).rev() {
        let rep = pixels.rep_of(slot);
        let k = key(image.value(rep));
        counter[k] -= 1;
        ordered[counter[k] as usize] = rep;
    }
    ordered
}

/// Builds a flat-zone-driven component tree over the (unmerged) graph.
pub(crate) fn build_zone_tree<B: Backend>(graph: &mut ZoneGraph<B>, maxtree: bool) -> ZoneTree {
    let num_fz = graph.num_zones();
    let num_pixels = graph.image().len();
    let ordered = counting_sort_zones(graph, maxtree);

    // Union-find over zone slots, driven by static zone adjacency.
    let mut zpar = vec![UNSET; num_fz as usize];
    let mut parent = vec![UNSET; num_fz as usize];
    let mut neighbors: Vec<u32> = Vec::new();
    for i in (0..num_fz as usize).rev() {
        let p = ordered[i];
        let slot_p = graph.pixels().slot_of(p);
        zpar[slot_p as usize] = slot_p;
        parent[slot_p as usize] = slot_p;

        neighbors.clear();
        graph.for_each_adjacent_zone_static(p, |q| neighbors.push(q));
        for &q in &neighbors {
            let slot_q = graph.pixels().slot_of(q);
            if zpar[slot_q as usize] != UNSET {
                let r = find_root(&mut zpar, slot_q);
                if r != slot_p {
                    parent[r as usize] = slot_p;
                    zpar[r as usize] = slot_p;
                }
            }
        }
    }

    let mut tree = ZoneTree {
        arena: NodeArena::new(),
        reps: Vec::new(),
        rep_to_node: vec![NodeId::NONE; num_pixels as usize],
        root: NodeId::NONE,
        num_nodes: 0,
        maxtree,
    };

    // Zones whose parent zone has the same gray share that zone's node.
    for i in 0..num_fz as usize {
        let p = ordered[i];
        let slot_p = graph.pixels().slot_of(p);
        let slot_parent = parent[slot_p as usize];
        let p_parent = graph.pixels().rep_of(slot_parent);
        let level = graph.image().value(p);

        if slot_p == slot_parent {
            let id = tree.allocate_node(p, level);
            tree.root = id;
            tree.add_rep(id, p);
        } else if level != graph.image().value(p_parent) {
            let id = tree.allocate_node(p, level);
            tree.arena.add_child(tree.rep_to_node[p_parent as usize], id);
            tree.add_rep(id, p);
        } else {
            let id = tree.rep_to_node[p_parent as usize];
            tree.add_rep(id, p);
        }
    }

    // Areas, children before parents.
    let order: Vec<NodeId> = tree.arena.post_order(tree.root).collect();
    for id in order {
        tree.refresh_area(graph, id);
    }
    tree
}
