//  See structs.

use core::{iter::FusedIterator, ptr::NonNull};

/// Forward iterator over the positions of the elements of a `RawDArray`.
///
/// The iterator is a plain view over `[0, length)` at the time of its creation: it is not a snapshot, and any mutation
/// of the array while iterating invalidates it.
#[derive(Clone, Debug)]
pub struct RawIter {
    base: NonNull<u8>,
    size: usize,
    front: usize,
    back: usize,
}

impl RawIter {
    //  #   Safety
    //
    //  -   `base` must point to `length` consecutive elements of `size` bytes each.
    pub(crate) unsafe fn new(base: NonNull<u8>, size: usize, length: usize) -> Self {
        Self {
            base,
            size,
            front: 0,
            back: length,
        }
    }

    //  #   Safety
    //
    //  -   `index` must be strictly less than the length the iterator was created with.
    unsafe fn at(&self, index: usize) -> NonNull<u8> {
        //  Safety:
        //  -   `index * self.size` is within the elements, as per pre-condition.
        unsafe { self.base.add(index * self.size) }
    }
}

impl Iterator for RawIter {
    type Item = NonNull<u8>;

    fn size_hint(&self) -> (usize, Option<usize>) {
        let count = self.back - self.front;

        (count, Some(count))
    }

    fn count(self) -> usize {
        self.back - self.front
    }

    fn next(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }

        //  Safety:
        //  -   `self.front < self.back`, which is at most the length.
        let result = unsafe { self.at(self.front) };

        self.front += 1;

        Some(result)
    }
}

impl DoubleEndedIterator for RawIter {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front == self.back {
            return None;
        }

        self.back -= 1;

        //  Safety:
        //  -   `self.back` is strictly less than the length.
        Some(unsafe { self.at(self.back) })
    }
}

impl ExactSizeIterator for RawIter {}

impl FusedIterator for RawIter {}

/// Backward iterator over the positions of the elements of a `RawDArray`.
///
/// See `RawIter`.
#[derive(Clone, Debug)]
pub struct RawIterRev(RawIter);

impl RawIterRev {
    pub(crate) fn new(inner: RawIter) -> Self {
        Self(inner)
    }
}

impl Iterator for RawIterRev {
    type Item = NonNull<u8>;

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }

    fn count(self) -> usize {
        self.0.count()
    }

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next_back()
    }
}

impl DoubleEndedIterator for RawIterRev {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

impl ExactSizeIterator for RawIterRev {}

impl FusedIterator for RawIterRev {}

// mod tests
