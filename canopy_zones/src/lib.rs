// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Zones: a flat-zone adjacency graph under incremental merging.
//!
//! A *flat zone* is a maximal connected set of pixels with one gray level.
//! Flat zones partition the image; each is identified by its
//! *representative*, the smallest pixel index it contains. This crate
//! discovers the zones of an image, tracks them through merges with a
//! union-find, and answers zone-adjacency queries:
//!
//! - [`ZoneGraph::find_representative`]: canonical representative of the
//!   zone containing a pixel (path-compressed).
//! - [`ZoneGraph::for_each_adjacent_zone`]: visit every neighboring zone
//!   exactly once per call (deduplicated with generation stamps).
//! - [`ZoneGraph::merge_adjacent_candidates_in_place`] and
//!   [`ZoneGraph::merge_bases_with_adjacent_candidates_in_place`]: the merge
//!   entry points the component-tree adjustment engine drives.
//!
//! The winner of every merge is the zone with the smallest representative.
//! That tie-break is an invariant of the graph, not a default.
//!
//! ## Backends
//!
//! How adjacency is answered is a performance/memory trade-off, so it is
//! pluggable via the [`Backend`] trait and selected at compile time:
//!
//! - [`backends::Boundary`] *(default)*: stores only each zone's boundary
//!   pixels; queries scan the boundary and resolve neighbors through the
//!   union-find. Merges concatenate boundary lists in O(1) and clean them up
//!   incrementally on later queries.
//! - [`backends::FullEdge`] *(feature `backend_full_edge`)*: eager per-zone
//!   adjacency sets, rewired on every merge. Fastest queries, highest memory.
//! - [`backends::Scan`]: no per-zone state at all; queries scan every pixel
//!   of the base zone. Smallest footprint, slowest queries.
//!
//! All three observe identical results; swapping the backend never changes
//! what the tree layer computes.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod backend;
pub mod backends;
mod graph;

pub use backend::Backend;
pub use graph::{GraphCore, ZoneGraph};

/// A short inline list of flat-zone representatives.
///
/// Component-tree nodes and the adjustment engine pass zone representatives
/// around in these; most nodes hold only a few zones.
pub type RepList = smallvec::SmallVec<[u32; 4]>;
