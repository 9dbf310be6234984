//! Low-level, type-erased, building blocks of arrays.

mod error;
mod growth;
mod header;
mod raw_array;
mod raw_iter;

#[cfg(test)]
pub(crate) mod testing;

pub mod alloc;

pub use error::AllocationError;
pub use growth::{GROWTH_DENOMINATOR, GROWTH_NUMERATOR, MIN_CAPACITY, capacity_for};
pub use header::ElementLayout;
pub use raw_array::RawDArray;
pub use raw_iter::{RawIter, RawIterRev};
