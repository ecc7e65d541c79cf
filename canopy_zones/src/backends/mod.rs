// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend implementations for the flat-zone graph.
//!
//! - `boundary` (default): per-zone boundary-pixel lists, O(1) merge
//!   concatenation, incremental cleanup on later queries.
//! - `full_edge` (feature `backend_full_edge`): eager adjacency sets,
//!   rewired on merge.
//! - `scan`: stateless; queries scan the whole base zone.
//!
//! Merge cost is O(1) amortized for `boundary` and `scan` and
//! O(deg(loser)) for `full_edge`; query cost is O(|boundary| · deg),
//! O(deg(base)), and O(|zone| · deg) respectively.

pub(crate) mod boundary;
#[cfg(feature = "backend_full_edge")]
pub(crate) mod full_edge;
pub(crate) mod scan;

pub use boundary::Boundary;
#[cfg(feature = "backend_full_edge")]
pub use full_edge::FullEdge;
pub use scan::Scan;
