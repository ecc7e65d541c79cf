// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Tree: component trees of a grayscale image.
//!
//! A *component tree* decomposes an image into the connected components of
//! its threshold sets: the max-tree nests components of `{p : f(p) >= λ}`,
//! the min-tree nests components of `{p : f(p) <= λ}`. This crate provides
//! two flavors over one arena node store:
//!
//! - [`ZoneTree`]: flat-zone driven. Each node carries the representatives
//!   of its flat zones in a shared [`ZoneGraph`][canopy_zones::ZoneGraph];
//!   this is the flavor the adjustment engine in `canopy_adjust` operates
//!   on.
//! - [`PixelTree`]: pixel driven. Each node carries its own pixel set;
//!   used as the rebuild-from-scratch baseline.
//!
//! Both support pruning (remove a subtree, absorb its pixels into the
//! parent), image reconstruction, leaf/threshold selection, and structural
//! validation. Node storage is a struct-of-arrays arena with LIFO free-slot
//! reuse; identifiers are dense [`NodeId`] indices and stay stable across
//! unrelated mutations.
//!
//! ## Failure model
//!
//! Misuse (pruning the root, releasing a connected node, stale ids) is a
//! programmer error and panics via assertions; nothing is recoverable. The
//! offline [`ZoneTree::validate_structure`] check reports the first violated
//! structural invariant as a [`StructureError`] instead of asserting, as a
//! test and debugging aid.
//!
//! This crate is `no_std` and uses `alloc`. Either the `std` (default) or
//! `libm` feature must be enabled for the few float routines.

#![no_std]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

#[cfg(all(not(feature = "std"), not(feature = "libm")))]
compile_error!("canopy_tree requires either the `std` or the `libm` feature");

mod arena;
mod attributes;
mod build;
mod pixel_tree;
mod types;
mod zone_tree;

pub use arena::{Bfs, Children, LiveIds, NodeArena, PathToRoot, PostOrder};
pub use attributes::{AttributeKind, compute_attribute};
pub use pixel_tree::PixelTree;
pub use types::NodeId;
pub use zone_tree::{StructureError, ZoneTree};
