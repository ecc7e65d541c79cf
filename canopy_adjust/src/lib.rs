// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Adjust: keep a max-tree/min-tree pair consistent under pruning.
//!
//! Pruning a subtree in one component tree changes the image it represents;
//! the dual tree then no longer matches. Rebuilding it from scratch is the
//! naive answer. This crate instead *adjusts* the dual tree in place: when a
//! leaf or subtree at level `a` is about to be pruned (its pixels fall to
//! the parent level `b`), the affected nodes of the other tree are collected
//! into level buckets, merged level by level from `b` toward `a`, rewired,
//! and the shared flat-zone graph is updated, all without touching the
//! untouched majority of the tree.
//!
//! - [`LeafAdjustment`]: the trigger is a single leaf (one flat zone).
//! - [`SubtreeAdjustment`]: the trigger is a whole subtree; its flat zones
//!   are gathered by a proper-parts collector that also tracks which target
//!   nodes run out of zones and must disappear.
//!
//! Both engines operate on a [`DualTrees`] session: one shared
//! [`ZoneGraph`][canopy_zones::ZoneGraph] plus the max-tree and min-tree
//! built over it. Engine calls borrow the session exclusively; only one
//! adjustment runs at a time.
//!
//! The [`casf`], [`casf_subtree`], and [`casf_naive`] drivers run a full
//! connected alternating sequential filter over a threshold schedule; the
//! three produce bit-identical images.
//!
//! ## Failure model
//!
//! Triggering on a root, on a non-leaf (ByLeaf), or with mismatched tree
//! polarity is a programmer error and asserts. No operation partially
//! applies: every mutation that starts is completed.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod by_leaf;
mod by_subtree;
mod casf;
mod collection;
mod engine;
mod proper_parts;
mod session;

pub use by_leaf::LeafAdjustment;
pub use by_subtree::SubtreeAdjustment;
pub use casf::{casf, casf_naive, casf_subtree};
pub use collection::LevelBuckets;
pub use proper_parts::ProperParts;
pub use session::DualTrees;
