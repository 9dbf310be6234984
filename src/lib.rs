//! Header-prefixed arrays.
//!
//! #   Organization
//!
//! This crate is composed of two top modules:
//!
//! -   The `collections` module contains the typed, owning, array: `DArray`.
//! -   The `utils` module contains the low-level, type-erased, building blocks upon which `DArray` is built, notably
//!     the `RawDArray` handle, and a shim over the allocator API.
//!
//!
//! #   Memory layout
//!
//! An array is stored in a single block: a small header (element size and alignment, length, and capacity) is
//! immediately followed by the elements. The handle to the array points to the first element, so that the elements
//! can be accessed by plain pointer arithmetic, while the header is found at a fixed negative offset.
//!
//! #### Why a header?
//!
//! A handle to a header-prefixed array is a single pointer, which can be passed around, and stored, as cheaply as a
//! pointer to the elements themselves, while still knowing its own length and capacity.
//!
//!
//! #   Growth
//!
//! The capacity of an array is always `max(10, ceil(1.3 * n))` for some `n`, recomputed on every reallocation. See
//! `utils::capacity_for`.
//!
//!
//! #   Features
//!
//! -   `allocator_api`: forwards to the unstable allocator API of the standard library, rather than the built-in shim.
//! -   `serde`: implements `Serialize` and `Deserialize` for `DArray`.

#![cfg_attr(not(test), no_std)]
//  Features (language)
//  Features (library)
#![cfg_attr(feature = "allocator_api", feature(allocator_api))]
//  Lints
#![deny(missing_docs)]
//  This author prefers to keep its test modules close to what they are testing.
#![allow(clippy::items_after_test_module)]

extern crate alloc;

pub mod collections;
pub mod utils;

pub use collections::DArray;
pub use utils::AllocationError;
