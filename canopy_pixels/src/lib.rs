// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Pixels: grayscale image primitives for morphological trees.
//!
//! This crate holds the flat, index-addressed building blocks the rest of the
//! Canopy workspace is built on:
//!
//! - [`ImageU8`]: an 8-bit grayscale image stored as one contiguous row-major
//!   byte buffer. Pixels are addressed by a single `u32` index
//!   `p = row * cols + col`.
//! - [`Adjacency`]: a precomputed neighbor relation (4- or 8-connectivity,
//!   selected by a radius) with deterministic, bounds-checked neighbor
//!   enumeration.
//! - [`PixelSets`]: disjoint sets of pixels represented as circular singly
//!   linked lists over parallel arrays, with an O(1) set merge.
//!
//! Everything here is data-plane plumbing: no I/O, no decoding, no threads.
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod adjacency;
mod image;
mod pixel_set;

pub use adjacency::Adjacency;
pub use image::ImageU8;
pub use pixel_set::{PixelSets, Pixels};

/// Sentinel pixel index meaning "no pixel".
pub const NO_PIXEL: u32 = u32::MAX;

/// Sentinel set-slot index meaning "no slot".
pub const NO_SLOT: u32 = u32::MAX;
