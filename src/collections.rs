//! Typed, owning, arrays.

//  Design considerations
//
//  #   Why consume `self` in `push` and `insert`?
//
//  Growth may relocate the block, and the handle with it. Consuming the array, and returning it, makes the relocation
//  visible at the call site, mirroring the type-erased `RawDArray`, whose mutators return the new handle.

pub mod darray;

pub use darray::DArray;
