//  Errors.

use core::{error, fmt};

/// An error in obtaining memory for an array.
///
/// This is the single failure class of this crate: it is only ever reported when allocating, or reallocating, the
/// backing block of an array fails, or when the requested size cannot be represented.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct AllocationError;

impl fmt::Display for AllocationError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str("AllocationError")
    }
}

impl error::Error for AllocationError {}

impl From<super::alloc::AllocError> for AllocationError {
    #[inline]
    fn from(_: super::alloc::AllocError) -> Self {
        Self
    }
}

// mod tests
