//! A typed, owning, growable array, stored in a single header-prefixed block.

use core::{
    cmp, fmt,
    hash::{Hash, Hasher},
    iter::{self, Rev},
    marker::PhantomData,
    mem::{self, ManuallyDrop},
    ops::{Deref, DerefMut},
    ptr::{self, NonNull},
    slice,
};

use crate::utils::{
    AllocationError, ElementLayout, RawDArray,
    alloc::{Allocator, Global},
    capacity_for,
};

/// A typed, owning, growable array.
///
/// All elements live in a single block, immediately after a small header holding the length, the capacity, and the
/// layout of the elements. The array itself is a handle to the first element (plus the allocator, if not zero-sized)
/// and dereferences to a slice, so that ordinary indexing works.
///
/// #   Relocation
///
/// Any operation which may grow, or shrink, the capacity may relocate the block: references into the array do not
/// survive such calls, which the borrow-checker enforces.
///
/// #   Fast & safe mutators
///
/// `push` and `insert` consume the array, and return it. If growth fails, the array is lost: its elements are dropped,
/// and its block released. `try_push` and `try_insert` instead move the array into a caller-supplied backup before
/// attempting to grow, so that it survives a failed growth.
///
/// #   Examples
///
/// ```
/// #   use darray::collections::DArray;
/// let mut array = DArray::new().expect("allocation");
///
/// for i in 0..15 {
///     array = array.push(i).expect("growth");
/// }
///
/// assert_eq!(15, array.len());
/// assert_eq!(17, array.capacity());
/// assert_eq!(7, array[7]);
///
/// assert_eq!(3, array.remove(3));
/// assert_eq!(Some(14), array.pop());
/// ```
pub struct DArray<T, A = Global>
where
    A: Allocator,
{
    //  Safety Invariants:
    //  -   Live: `raw` is valid, and was allocated by `allocator`.
    //  -   Typed: the element layout of `raw` is `ElementLayout::of::<T>()`.
    //  -   Initialized: the first `raw.length()` elements of `raw` are initialized instances of `T`.
    raw: RawDArray,
    allocator: A,
    _marker: PhantomData<T>,
}

//
//  Creation
//

impl<T> DArray<T, Global> {
    /// Creates a new, empty, array, with the minimum capacity.
    pub fn new() -> Result<Self, AllocationError> {
        Self::new_in(Global)
    }

    /// Creates a new array of `length` clones of `value`.
    pub fn allocate(length: usize, value: T) -> Result<Self, AllocationError>
    where
        T: Clone,
    {
        Self::allocate_in(length, value, Global)
    }

    /// Creates a new array of `length` elements, created by successive calls to `f`.
    pub fn allocate_with<F>(length: usize, f: F) -> Result<Self, AllocationError>
    where
        F: FnMut() -> T,
    {
        Self::allocate_with_in(length, f, Global)
    }
}

impl<T, A> DArray<T, A>
where
    A: Allocator,
{
    /// Creates a new, empty, array, with the minimum capacity.
    pub fn new_in(allocator: A) -> Result<Self, AllocationError> {
        Self::allocate_with_in(0, || unreachable!("no element to create"), allocator)
    }

    /// Creates a new array of `length` clones of `value`.
    pub fn allocate_in(length: usize, value: T, allocator: A) -> Result<Self, AllocationError>
    where
        T: Clone,
    {
        Self::allocate_with_in(length, || value.clone(), allocator)
    }

    /// Creates a new array of `length` elements, created by successive calls to `f`.
    pub fn allocate_with_in<F>(length: usize, f: F, allocator: A) -> Result<Self, AllocationError>
    where
        F: FnMut() -> T,
    {
        Self::collect_in(length, iter::repeat_with(f), allocator)
    }

    //  Allocates an array of `length` elements, taken from `elements`.
    //
    //  If `elements` yields fewer than `length` elements, the array is shorter.
    fn collect_in<I>(length: usize, elements: I, allocator: A) -> Result<Self, AllocationError>
    where
        I: Iterator<Item = T>,
    {
        let raw = RawDArray::allocate(&allocator, length, ElementLayout::of::<T>()).ok_or(AllocationError)?;

        //  Safety:
        //  -   `raw` is valid, and `0 <= capacity`.
        unsafe { raw.set_length(0) };

        //  Safety Invariants:
        //  -   Live: freshly allocated by `allocator`.
        //  -   Typed: allocated with `ElementLayout::of::<T>()`.
        //  -   Initialized: the length is 0.
        let this = Self {
            raw,
            allocator,
            _marker: PhantomData,
        };

        for (index, element) in elements.take(length).enumerate() {
            //  Safety:
            //  -   `index` is strictly less than `length`, which is at most the capacity.
            //  -   The length is bumped only after the element is written, to remain panic-safe.
            unsafe {
                this.slot(index).write(element);
                this.raw.set_length(index + 1);
            }
        }

        Ok(this)
    }

    /// Creates an array from a raw handle, and its allocator.
    ///
    /// #   Safety
    ///
    /// -   Live: `raw` must be valid, and must have been allocated by `allocator`.
    /// -   Typed: the element layout of `raw` must be `ElementLayout::of::<T>()`.
    /// -   Initialized: the first `raw.length()` elements of `raw` must be initialized instances of `T`.
    pub unsafe fn from_raw_parts(raw: RawDArray, allocator: A) -> Self {
        debug_assert_eq!(ElementLayout::of::<T>(), unsafe { raw.element_layout() });

        Self {
            raw,
            allocator,
            _marker: PhantomData,
        }
    }

    /// Decomposes the array into its raw handle, and its allocator.
    ///
    /// The caller becomes responsible for dropping the elements, and releasing the block.
    pub fn into_raw_parts(self) -> (RawDArray, A) {
        let this = ManuallyDrop::new(self);

        //  Safety:
        //  -   `this.allocator` is never used again, nor dropped, as `this` is `ManuallyDrop`.
        let allocator = unsafe { ptr::read(&this.allocator) };

        (this.raw, allocator)
    }
}

//
//  Accessors
//

impl<T, A> DArray<T, A>
where
    A: Allocator,
{
    /// Returns the number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        //  Safety:
        //  -   `self.raw` is valid, as per Live invariant.
        unsafe { self.raw.length() }
    }

    /// Returns whether the array is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of elements the array can hold without reallocating.
    #[inline]
    pub fn capacity(&self) -> usize {
        //  Safety:
        //  -   `self.raw` is valid, as per Live invariant.
        unsafe { self.raw.capacity() }
    }

    /// Returns the size of an element, in bytes.
    #[inline]
    pub fn element_size(&self) -> usize {
        //  Safety:
        //  -   `self.raw` is valid, as per Live invariant.
        unsafe { self.raw.element_size() }
    }

    /// Returns a reference to the allocator.
    #[inline]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Returns the elements, as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        //  Safety:
        //  -   The pointer is non-null, and aligned for `T`, as per Typed invariant.
        //  -   The first `len` elements are initialized, as per Initialized invariant.
        //  -   No mutable borrow is accessible, as `self` could be borrowed.
        unsafe { slice::from_raw_parts(self.raw.as_ptr().cast::<T>().as_ptr(), self.len()) }
    }

    /// Returns the elements, as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        //  Safety:
        //  -   The pointer is non-null, and aligned for `T`, as per Typed invariant.
        //  -   The first `len` elements are initialized, as per Initialized invariant.
        //  -   No borrow is accessible, as `self` could be mutably borrowed.
        unsafe { slice::from_raw_parts_mut(self.raw.as_ptr().cast::<T>().as_ptr(), self.len()) }
    }

    /// Returns a forward iterator over the elements.
    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Returns a forward iterator over the elements, allowing modification.
    #[inline]
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    /// Returns a backward iterator over the elements.
    #[inline]
    pub fn iter_rev(&self) -> Rev<slice::Iter<'_, T>> {
        self.iter().rev()
    }

    /// Returns a backward iterator over the elements, allowing modification.
    #[inline]
    pub fn iter_rev_mut(&mut self) -> Rev<slice::IterMut<'_, T>> {
        self.iter_mut().rev()
    }
}

//
//  Growth
//

impl<T, A> DArray<T, A>
where
    A: Allocator,
{
    /// Resizes the array to `length` elements, filling any new slot with a clone of `value`.
    ///
    /// The block is always reallocated, to `capacity_for(length)` slots, even if the current capacity matches.
    ///
    /// On failure, the array is left untouched.
    pub fn resize(&mut self, length: usize, value: T) -> Result<(), AllocationError>
    where
        T: Clone,
    {
        self.resize_with(length, || value.clone())
    }

    /// Resizes the array to `length` elements, filling any new slot with the result of `f`.
    ///
    /// The block is always reallocated, to `capacity_for(length)` slots, even if the current capacity matches.
    ///
    /// On failure, the array is left untouched.
    pub fn resize_with<F>(&mut self, length: usize, mut f: F) -> Result<(), AllocationError>
    where
        F: FnMut() -> T,
    {
        let current = self.len();

        if length < current {
            return self.truncate_into_fresh_block(length);
        }

        let capacity = capacity_for(length).ok_or(AllocationError)?;

        //  Safety:
        //  -   `self.raw` is valid, and was allocated by `self.allocator`, as per Live invariant.
        //  -   `capacity >= length >= current`, hence no element is lost.
        self.raw = unsafe { self.raw.reallocate(&self.allocator, capacity) }.ok_or(AllocationError)?;

        for index in current..length {
            //  Safety:
            //  -   `index` is strictly less than `length`, which is at most the capacity.
            //  -   The length is bumped only after the element is written, to remain panic-safe.
            unsafe {
                self.slot(index).write(f());
                self.raw.set_length(index + 1);
            }
        }

        Ok(())
    }

    /// Ensures that at least `additional` more elements can be pushed without reallocating.
    ///
    /// Does nothing if the capacity already suffices. Never shrinks.
    ///
    /// On failure, the array is left untouched.
    pub fn reserve(&mut self, additional: usize) -> Result<(), AllocationError> {
        //  Safety:
        //  -   `self.raw` is valid, and was allocated by `self.allocator`, as per Live invariant.
        self.raw = unsafe { self.raw.reserve(&self.allocator, additional) }.ok_or(AllocationError)?;

        Ok(())
    }

    //  Moves the first `length` elements into a fresh block, then drops the remaining ones, and releases the old block.
    //
    //  Allocating first guarantees that a failure leaves `self` untouched.
    fn truncate_into_fresh_block(&mut self, length: usize) -> Result<(), AllocationError> {
        let current = self.len();

        debug_assert!(length < current);

        let fresh = RawDArray::allocate(&self.allocator, length, ElementLayout::of::<T>()).ok_or(AllocationError)?;

        //  Safety:
        //  -   Both blocks hold at least `length` slots, and are distinct.
        unsafe {
            fresh
                .as_ptr()
                .cast::<T>()
                .copy_from_nonoverlapping(self.raw.as_ptr().cast::<T>(), length)
        };

        let old = mem::replace(&mut self.raw, fresh);

        //  Safety:
        //  -   The elements in `[length, current)` of `old` are initialized, and not aliased by `fresh`.
        unsafe {
            let tail = ptr::slice_from_raw_parts_mut(old.as_ptr().cast::<T>().add(length).as_ptr(), current - length);

            ptr::drop_in_place(tail);
        }

        //  Safety:
        //  -   `old` is valid, and was allocated by `self.allocator`; nothing refers to it any longer.
        unsafe { old.free(&self.allocator) };

        Ok(())
    }
}

//
//  Insertion
//

impl<T, A> DArray<T, A>
where
    A: Allocator,
{
    /// Appends `value`, growing the array if necessary.
    ///
    /// On failure, the array is lost: its elements are dropped, its block released, and an error is returned.
    pub fn push(self, value: T) -> Result<Self, AllocationError> {
        let index = self.len();

        self.insert(index, value)
    }

    /// Appends `value`, growing the array if necessary.
    ///
    /// If growth is necessary, `self` is first moved into `backup`, dropping its previous content, if any. On failure,
    /// `backup` holds the untouched array, and an error is returned. On success, `backup` is reset to `None`.
    ///
    /// If growth is not necessary, `backup` is left untouched.
    pub fn try_push(self, value: T, backup: &mut Option<Self>) -> Result<Self, AllocationError> {
        let index = self.len();

        self.try_insert(index, value, backup)
    }

    /// Inserts `value` at `index`, shifting all elements after it towards the back, growing the array if necessary.
    ///
    /// On failure, the array is lost: its elements are dropped, its block released, and an error is returned.
    ///
    /// #   Panics
    ///
    /// If `index` is strictly greater than `self.len()`.
    pub fn insert(mut self, index: usize, value: T) -> Result<Self, AllocationError> {
        let length = self.len();

        assert!(index <= length, "insertion index (is {index}) should be <= len (is {length})");

        let value = ManuallyDrop::new(value);

        //  Safety:
        //  -   `self.raw` is valid, and was allocated by `self.allocator`, as per Live invariant.
        //  -   `index` is in bounds.
        //  -   `value` is readable, of the element size, and not within the array.
        let raw = unsafe { self.raw.insert(&self.allocator, index, NonNull::from(&*value).cast()) };

        //  On failure, `self.raw` is untouched and still valid, and dropping `self` releases it.
        let Some(raw) = raw else {
            drop(ManuallyDrop::into_inner(value));

            return Err(AllocationError);
        };

        //  `value` was moved into the array.
        self.raw = raw;

        Ok(self)
    }

    /// Inserts `value` at `index`, shifting all elements after it towards the back, growing the array if necessary.
    ///
    /// See `try_push` for the handling of `backup`.
    ///
    /// #   Panics
    ///
    /// If `index` is strictly greater than `self.len()`.
    pub fn try_insert(self, index: usize, value: T, backup: &mut Option<Self>) -> Result<Self, AllocationError> {
        let length = self.len();

        assert!(index <= length, "insertion index (is {index}) should be <= len (is {length})");

        if length < self.capacity() {
            //  No growth, no failure.
            return self.insert(index, value);
        }

        let value = ManuallyDrop::new(value);
        let original = backup.insert(self);

        let mut raw_backup = None;

        //  Safety:
        //  -   `original.raw` is valid, and was allocated by `original.allocator`, as per Live invariant.
        //  -   `index` is in bounds.
        //  -   `value` is readable, of the element size, and not within the array.
        let raw = unsafe {
            original
                .raw
                .insert_safe(&original.allocator, index, NonNull::from(&*value).cast(), &mut raw_backup)
        };

        let Some(raw) = raw else {
            debug_assert_eq!(Some(original.raw), raw_backup);

            drop(ManuallyDrop::into_inner(value));

            return Err(AllocationError);
        };

        //  `value` was moved into the array, and the original block is no longer valid.
        original.raw = raw;

        match backup.take() {
            Some(this) => Ok(this),
            None => unreachable!("backup populated above"),
        }
    }
}

//
//  Removal
//

impl<T, A> DArray<T, A>
where
    A: Allocator,
{
    /// Removes the last element, and returns it, or `None` if the array is empty.
    ///
    /// Never reallocates.
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        //  Safety:
        //  -   `self.raw` is valid, as per Live invariant, and non-empty.
        let position = unsafe { self.raw.pop() };

        //  Safety:
        //  -   `position` points to an initialized `T`, no longer part of the array.
        Some(unsafe { position.cast::<T>().read() })
    }

    /// Removes the element at `index`, and returns it.
    ///
    /// Only guarantees that the remaining elements occupy `[0, len)`: the order of the elements after `index` is not
    /// guaranteed to be preserved.
    ///
    /// Never reallocates, and never fails.
    ///
    /// #   Panics
    ///
    /// If `index` is greater than or equal to `self.len()`.
    pub fn remove(&mut self, index: usize) -> T {
        let length = self.len();

        assert!(index < length, "removal index (is {index}) should be < len (is {length})");

        //  Safety:
        //  -   `self.raw` is valid, and was allocated by `self.allocator`, as per Live invariant.
        //  -   `index` is in bounds.
        let position = unsafe { self.raw.remove(&self.allocator, index) };

        //  Safety:
        //  -   `position` points to an initialized `T`, no longer part of the array.
        unsafe { position.cast::<T>().read() }
    }

    /// Removes all elements, keeping the capacity.
    pub fn clear(&mut self) {
        let elements: *mut [T] = self.as_mut_slice();

        //  Safety:
        //  -   0 is less than the capacity.
        //  -   The length is lowered first, so a panicking `drop` does not lead to double drops.
        unsafe {
            self.raw.set_length(0);

            ptr::drop_in_place(elements);
        }
    }
}

//
//  Bulk operations
//

impl<T, A> DArray<T, A>
where
    A: Allocator,
{
    /// Overwrites every element with a clone of `value`.
    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        if let Some((last, init)) = self.as_mut_slice().split_last_mut() {
            for element in init {
                element.clone_from(&value);
            }

            *last = value;
        }
    }

    /// Exchanges the elements at `a` and `b`.
    ///
    /// #   Panics
    ///
    /// If either `a` or `b` is greater than or equal to `self.len()`.
    pub fn swap(&mut self, a: usize, b: usize) {
        let length = self.len();

        assert!(a < length, "index a (is {a}) should be < len (is {length})");
        assert!(b < length, "index b (is {b}) should be < len (is {length})");

        //  Safety:
        //  -   `self.raw` is valid, as per Live invariant.
        //  -   `a` and `b` are in bounds.
        unsafe { self.raw.swap(a, b) };
    }

    /// Attempts to clone the array.
    pub fn try_clone(&self) -> Result<Self, AllocationError>
    where
        T: Clone,
        A: Clone,
    {
        Self::collect_in(self.len(), self.iter().cloned(), self.allocator.clone())
    }
}

//
//  Common traits
//

impl<T, A> Clone for DArray<T, A>
where
    T: Clone,
    A: Allocator + Clone,
{
    fn clone(&self) -> Self {
        self.try_clone().expect("successful clone")
    }
}

impl<T, A> Deref for DArray<T, A>
where
    A: Allocator,
{
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T, A> DerefMut for DArray<T, A>
where
    A: Allocator,
{
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T> Default for DArray<T, Global> {
    fn default() -> Self {
        Self::new().expect("successful allocation")
    }
}

impl<T, A> Drop for DArray<T, A>
where
    A: Allocator,
{
    fn drop(&mut self) {
        self.clear();

        //  Safety:
        //  -   `self.raw` is valid, and was allocated by `self.allocator`, as per Live invariant.
        //  -   `self.raw` is never used again.
        unsafe { self.raw.free(&self.allocator) };
    }
}

impl<T, A> fmt::Debug for DArray<T, A>
where
    T: fmt::Debug,
    A: Allocator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T, A> Eq for DArray<T, A>
where
    T: Eq,
    A: Allocator,
{
}

impl<T, A> Hash for DArray<T, A>
where
    T: Hash,
    A: Allocator,
{
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        self.as_slice().hash(state);
    }
}

impl<'a, T, A> IntoIterator for &'a DArray<T, A>
where
    A: Allocator,
{
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A> IntoIterator for &'a mut DArray<T, A>
where
    A: Allocator,
{
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T, A> Ord for DArray<T, A>
where
    T: Ord,
    A: Allocator,
{
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.as_slice().cmp(other.as_slice())
    }
}

impl<T, U, A, B> PartialEq<DArray<U, B>> for DArray<T, A>
where
    T: PartialEq<U>,
    A: Allocator,
    B: Allocator,
{
    fn eq(&self, other: &DArray<U, B>) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T, U, A> PartialEq<[U]> for DArray<T, A>
where
    T: PartialEq<U>,
    A: Allocator,
{
    fn eq(&self, other: &[U]) -> bool {
        self.as_slice() == other
    }
}

impl<T, A> PartialOrd for DArray<T, A>
where
    T: PartialOrd,
    A: Allocator,
{
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        self.as_slice().partial_cmp(other.as_slice())
    }
}

//  Safety:
//  -   Just like a `Vec<T, A>`.
unsafe impl<T, A> Send for DArray<T, A>
where
    T: Send,
    A: Allocator + Send,
{
}

//  Safety:
//  -   Just like a `Vec<T, A>`.
unsafe impl<T, A> Sync for DArray<T, A>
where
    T: Sync,
    A: Allocator + Sync,
{
}

//
//  Implementation
//

impl<T, A> DArray<T, A>
where
    A: Allocator,
{
    //  #   Safety
    //
    //  -   `index` must be less than or equal to the capacity.
    #[inline]
    unsafe fn slot(&self, index: usize) -> NonNull<T> {
        debug_assert!(index <= self.capacity());

        //  Safety:
        //  -   `index` is within the block, as per pre-condition.
        unsafe { self.raw.as_ptr().cast::<T>().add(index) }
    }
}

//
//  Serde
//

//  #   Why an inner module?
//
//  It's much easier than annotating every item with `#[cfg(feature = "serde")]`.
#[cfg(feature = "serde")]
mod serde_impl {
    use serde::{
        Deserialize, Deserializer, Serialize, Serializer,
        de::{self, SeqAccess, Visitor},
    };

    use super::*;

    impl<T, A> Serialize for DArray<T, A>
    where
        T: Serialize,
        A: Allocator,
    {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.collect_seq(self.iter())
        }
    }

    impl<'de, T> Deserialize<'de> for DArray<T, Global>
    where
        T: Deserialize<'de>,
    {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_seq(DArrayVisitor(PhantomData))
        }
    }

    struct DArrayVisitor<T>(PhantomData<T>);

    impl<'de, T> Visitor<'de> for DArrayVisitor<T>
    where
        T: Deserialize<'de>,
    {
        type Value = DArray<T, Global>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a sequence")
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: SeqAccess<'de>,
        {
            let mut array = DArray::new().map_err(de::Error::custom)?;

            //  Untrusted hint, hence capped.
            if let Some(hint) = seq.size_hint() {
                array.reserve(hint.min(4096)).map_err(de::Error::custom)?;
            }

            while let Some(element) = seq.next_element()? {
                array = array.push(element).map_err(de::Error::custom)?;
            }

            Ok(array)
        }
    }
} // mod serde_impl

#[cfg(test)]
mod tests {
    use core::cell::Cell;
    use core::ops::AddAssign;
    use std::{rc::Rc, string::ToString};

    use proptest::prelude::*;

    use crate::utils::testing::FlakyAllocator;

    use super::*;

    type Flaky<'a, T> = DArray<T, &'a FlakyAllocator>;

    #[test]
    fn allocate() {
        let array = DArray::allocate(5, 7u32).expect("allocation");

        assert_eq!(5, array.len());
        assert_eq!(10, array.capacity());
        assert_eq!(4, array.element_size());
        assert_eq!(&[7, 7, 7, 7, 7], array.as_slice());

        let array = DArray::allocate_with(12, {
            let mut next = 0u8;
            move || {
                next += 1;
                next
            }
        })
        .expect("allocation");

        assert_eq!(16, array.capacity());
        assert_eq!((1..=12).collect::<Vec<u8>>(), array.as_slice());
    }

    #[test]
    fn allocate_failure() {
        let allocator = FlakyAllocator::new();
        allocator.fail();

        assert_eq!(Some(AllocationError), Flaky::<u32>::new_in(&allocator).err());
        assert_eq!(Some(AllocationError), Flaky::<u32>::allocate_in(3, 1, &allocator).err());
    }

    #[test]
    fn push_pop() {
        let allocator = FlakyAllocator::new();

        {
            let array = Flaky::<String>::new_in(&allocator).expect("allocation");

            let mut array = array.push(String::from("hello")).expect("push");

            assert_eq!(1, array.len());
            assert_eq!(Some(String::from("hello")), array.pop());
            assert_eq!(0, array.len());
            assert_eq!(None, array.pop());
        }

        assert_eq!(0, allocator.live());
    }

    #[test]
    fn push_capacity_sequence() {
        let mut array = DArray::new().expect("allocation");
        let mut capacities = vec![array.capacity()];

        for i in 0..15u32 {
            array = array.push(i).expect("push");

            if capacities.last() != Some(&array.capacity()) {
                capacities.push(array.capacity());
            }
        }

        assert_eq!(vec![10, 13, 17], capacities);
        assert_eq!(15, array.len());
    }

    #[test]
    fn push_failure_drops_everything() {
        let allocator = FlakyAllocator::new();
        let drops = Rc::new(Cell::new(0));

        let array = full_in(&allocator, || DropCounter(drops.clone()));

        allocator.fail();

        let result = array.push(DropCounter(drops.clone()));

        assert_eq!(Some(AllocationError), result.err());
        assert_eq!(11, drops.get());
        assert_eq!(0, allocator.live());
    }

    #[test]
    fn insert_failure_drops_everything() {
        let allocator = FlakyAllocator::new();
        let drops = Rc::new(Cell::new(0));

        let array = full_in(&allocator, || DropCounter(drops.clone()));

        allocator.fail();

        let result = array.insert(3, DropCounter(drops.clone()));

        assert_eq!(Some(AllocationError), result.err());
        assert_eq!(11, drops.get());
        assert_eq!(0, allocator.live());
    }

    #[test]
    fn try_push_no_growth() {
        let allocator = FlakyAllocator::new();

        {
            let array = Flaky::allocate_in(3, 1u32, &allocator).expect("allocation");
            let mut backup = Some(Flaky::allocate_in(1, 9u32, &allocator).expect("allocation"));

            allocator.fail();

            let array = array.try_push(2, &mut backup).expect("push");

            assert_eq!(&[1, 1, 1, 2], array.as_slice());
            assert_eq!(Some(&[9][..]), backup.as_deref());
        }

        assert_eq!(0, allocator.live());
    }

    #[test]
    fn try_push_failure_preserves_backup() {
        let allocator = FlakyAllocator::new();

        {
            let array = full_in(&allocator, counter(0u32));
            let address = array.as_ptr();

            let mut backup = None;

            allocator.fail();

            let result = array.try_push(11, &mut backup);

            assert_eq!(Some(AllocationError), result.err());

            let original = backup.take().expect("backup");

            assert_eq!(address, original.as_ptr());
            assert_eq!(10, original.len());
            assert_eq!(10, original.capacity());
            assert_eq!((1..=10).collect::<Vec<u32>>(), original.as_slice());

            allocator.heal();

            let array = original.try_push(11, &mut backup).expect("push");

            assert!(backup.is_none());
            assert_eq!(13, array.capacity());
            assert_eq!((1..=11).collect::<Vec<u32>>(), array.as_slice());
        }

        assert_eq!(0, allocator.live());
    }

    #[test]
    fn insert() {
        let array = DArray::allocate_with(3, counter(0)).expect("allocation");

        let array = array.insert(0, 0).expect("insert");
        let array = array.insert(4, 4).expect("insert");
        let array = array.insert(2, 42).expect("insert");

        assert_eq!(&[0, 1, 42, 2, 3, 4], array.as_slice());
    }

    #[test]
    #[should_panic]
    fn insert_out_of_bounds() {
        let array = DArray::allocate(3, 0u8).expect("allocation");

        let _ = array.insert(4, 1);
    }

    #[test]
    fn try_insert_failure_preserves_backup() {
        let allocator = FlakyAllocator::new();

        {
            let array = full_in(&allocator, || 5u16);
            let address = array.as_ptr();
            let mut backup = None;

            allocator.fail();

            assert_eq!(Some(AllocationError), array.try_insert(4, 1, &mut backup).err());

            let original = backup.take().expect("backup");

            assert_eq!(address, original.as_ptr());
            assert_eq!(10, original.capacity());
            assert_eq!(&[5; 10], original.as_slice());

            allocator.heal();

            let array = original.try_insert(4, 1, &mut backup).expect("insert");

            assert!(backup.is_none());
            assert_eq!(&[5, 5, 5, 5, 1, 5, 5, 5, 5, 5, 5], array.as_slice());
        }

        assert_eq!(0, allocator.live());
    }

    #[test]
    fn remove() {
        let mut array = DArray::allocate_with(5, counter(9)).expect("allocation");

        assert_eq!(12, array.remove(2));
        assert_eq!(4, array.len());

        let mut remaining = array.as_slice().to_vec();
        remaining.sort();

        assert_eq!(vec![10, 11, 13, 14], remaining);
    }

    #[test]
    fn remove_last_is_pop() {
        let mut removed = DArray::allocate_with(4, counter(0)).expect("allocation");
        let mut popped = removed.clone();

        assert_eq!(popped.pop(), Some(removed.remove(3)));
        assert_eq!(popped, removed);
    }

    #[test]
    fn remove_without_scratch() {
        let allocator = FlakyAllocator::new();

        {
            let mut next = counter(0usize);
            let mut array = Flaky::allocate_with_in(6, move || next().to_string(), &allocator).expect("allocation");

            allocator.fail();

            assert_eq!("2", array.remove(1));
            assert_eq!(&["1", "3", "4", "5", "6"], array.as_slice());
        }

        assert_eq!(0, allocator.live());
    }

    #[test]
    #[should_panic]
    fn remove_out_of_bounds() {
        let mut array = DArray::allocate(3, 0u8).expect("allocation");

        array.remove(3);
    }

    #[test]
    fn resize() {
        let allocator = FlakyAllocator::new();

        {
            let mut array = Flaky::allocate_in(3, String::from("a"), &allocator).expect("allocation");

            array.resize(20, String::from("b")).expect("resize");

            assert_eq!(20, array.len());
            assert_eq!(26, array.capacity());
            assert_eq!("a", array[2]);
            assert_eq!("b", array[3]);

            array.resize(2, String::new()).expect("resize");

            assert_eq!(2, array.len());
            assert_eq!(10, array.capacity());
            assert_eq!(&["a", "a"], array.as_slice());
        }

        assert_eq!(0, allocator.live());
    }

    #[test]
    fn resize_failure_leaves_untouched() {
        let allocator = FlakyAllocator::new();

        {
            let mut array = Flaky::allocate_in(5, 1u64, &allocator).expect("allocation");

            allocator.fail();

            assert_eq!(Err(AllocationError), array.resize(20, 2));
            assert_eq!(Err(AllocationError), array.resize(2, 2));
            assert_eq!(Err(AllocationError), array.resize(5, 2));

            assert_eq!(&[1; 5], array.as_slice());
            assert_eq!(10, array.capacity());
        }

        assert_eq!(0, allocator.live());
    }

    #[test]
    fn reserve() {
        let allocator = FlakyAllocator::new();

        {
            let mut array = Flaky::allocate_in(4, 1u8, &allocator).expect("allocation");
            let address = array.as_ptr();

            allocator.fail();

            array.reserve(6).expect("no-op");

            assert_eq!(address, array.as_ptr());
            assert_eq!(10, array.capacity());

            assert_eq!(Err(AllocationError), array.reserve(7));

            allocator.heal();

            array.reserve(7).expect("reserve");

            assert_eq!(4, array.len());
            assert_eq!(15, array.capacity());
        }

        assert_eq!(0, allocator.live());
    }

    #[test]
    fn fill() {
        let mut array = DArray::allocate(4, String::from("x")).expect("allocation");

        array.fill(String::from("y"));

        assert_eq!(&["y", "y", "y", "y"], array.as_slice());

        let mut empty = DArray::<String>::new().expect("allocation");

        empty.fill(String::from("z"));

        assert!(empty.is_empty());
    }

    #[test]
    fn swap() {
        let mut array = DArray::allocate_with(4, counter(0)).expect("allocation");

        array.swap(0, 2);

        assert_eq!(&[3, 2, 1, 4], array.as_slice());

        array.swap(0, 2);

        assert_eq!(&[1, 2, 3, 4], array.as_slice());
    }

    #[test]
    fn iterate() {
        let mut array = DArray::allocate_with(4, counter(0)).expect("allocation");

        assert_eq!(vec![1, 2, 3, 4], array.iter().copied().collect::<Vec<_>>());
        assert_eq!(vec![4, 3, 2, 1], array.iter_rev().copied().collect::<Vec<_>>());

        for (i, element) in array.iter_rev_mut().enumerate() {
            *element *= i;
        }

        assert_eq!(&[3, 4, 3, 0], array.as_slice());

        for element in &mut array {
            *element += 1;
        }

        assert_eq!(14, (&array).into_iter().sum::<usize>());
    }

    #[test]
    fn clear_and_drop() {
        let allocator = FlakyAllocator::new();
        let drops = Rc::new(Cell::new(0));

        {
            let mut array = Flaky::allocate_with_in(3, || DropCounter(drops.clone()), &allocator).expect("allocation");

            array.clear();

            assert_eq!(3, drops.get());
            assert!(array.is_empty());
            assert_eq!(10, array.capacity());

            let array = array.push(DropCounter(drops.clone())).expect("push");

            assert_eq!(1, array.len());
        }

        assert_eq!(4, drops.get());
        assert_eq!(0, allocator.live());
    }

    #[test]
    fn raw_parts() {
        let allocator = FlakyAllocator::new();

        {
            let array = Flaky::allocate_in(3, 4u32, &allocator).expect("allocation");

            let (raw, allocator) = array.into_raw_parts();

            //  Safety:
            //  -   `raw` is valid, and allocated by `allocator`.
            unsafe {
                assert_eq!(3, raw.length());
                assert_eq!(4, raw.element_size());
            }

            //  Safety:
            //  -   `raw` and `allocator` were just obtained from `into_raw_parts`.
            let array = unsafe { Flaky::<u32>::from_raw_parts(raw, allocator) };

            assert_eq!(&[4, 4, 4], array.as_slice());
        }

        assert_eq!(0, allocator.live());
    }

    #[test]
    fn common_traits() {
        let array = DArray::allocate(3, 1u8).expect("allocation");
        let clone = array.clone();

        assert_eq!(array, clone);
        assert_ne!(array.as_ptr(), clone.as_ptr());
        assert_eq!("[1, 1, 1]", format!("{array:?}"));
        assert_eq!(cmp::Ordering::Equal, array.cmp(&clone));

        let default = DArray::<u8>::default();

        assert!(default.is_empty());
        assert!(default < array);
        assert!(array == [1, 1, 1][..]);
    }

    #[test]
    fn zero_sized() {
        let mut array = DArray::allocate(3, ()).expect("allocation");

        array = array.push(()).expect("push");
        array = array.insert(1, ()).expect("insert");

        assert_eq!(5, array.len());
        assert_eq!(0, array.element_size());

        array.remove(0);
        array.swap(0, 3);

        assert_eq!(Some(()), array.pop());
        assert_eq!(3, array.len());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip() {
        let array = DArray::allocate_with(12, counter(0u32)).expect("allocation");

        let json = serde_json::to_string(&array).expect("serialize");

        assert_eq!("[1,2,3,4,5,6,7,8,9,10,11,12]", json);

        let back: DArray<u32> = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(array, back);
    }

    proptest! {
        #[test]
        fn push_then_pop(values in proptest::collection::vec(any::<i64>(), 0..50), last in any::<i64>()) {
            let mut array = DArray::new().expect("allocation");

            for value in &values {
                array = array.push(*value).expect("push");
            }

            let length = array.len();

            let mut array = array.push(last).expect("push");

            prop_assert_eq!(Some(last), array.pop());
            prop_assert_eq!(length, array.len());
            prop_assert_eq!(&values[..], array.as_slice());
        }

        #[test]
        fn insert_then_remove(
            values in proptest::collection::vec(any::<u16>(), 0..50),
            index in any::<prop::sample::Index>(),
            value in any::<u16>(),
        ) {
            let index = index.index(values.len() + 1);

            let mut array = DArray::new().expect("allocation");

            for v in &values {
                array = array.push(*v).expect("push");
            }

            let mut array = array.insert(index, value).expect("insert");

            prop_assert_eq!(value, array.remove(index));
            prop_assert_eq!(values.len(), array.len());
            prop_assert!(array.capacity() >= array.len());
        }

        #[test]
        fn remove_returns_element(
            values in proptest::collection::vec(any::<u32>(), 1..50),
            index in any::<prop::sample::Index>(),
        ) {
            let index = index.index(values.len());

            let mut array = DArray::new().expect("allocation");

            for v in &values {
                array = array.push(*v).expect("push");
            }

            prop_assert_eq!(values[index], array.remove(index));
            prop_assert_eq!(values.len() - 1, array.len());

            let mut expected = values.clone();
            expected.remove(index);
            expected.sort();

            let mut actual = array.as_slice().to_vec();
            actual.sort();

            prop_assert_eq!(expected, actual);
        }

        #[test]
        fn swap_twice_is_identity(
            values in proptest::collection::vec(any::<u8>(), 1..50),
            a in any::<prop::sample::Index>(),
            b in any::<prop::sample::Index>(),
        ) {
            let (a, b) = (a.index(values.len()), b.index(values.len()));

            let mut array = DArray::new().expect("allocation");

            for v in &values {
                array = array.push(*v).expect("push");
            }

            array.swap(a, b);
            array.swap(a, b);

            prop_assert_eq!(&values[..], array.as_slice());
        }

        #[test]
        fn fill_overwrites_all(length in 0usize..100, value in any::<u32>()) {
            let mut array = DArray::allocate(length, 0u32).expect("allocation");

            array.fill(value);

            prop_assert!(array.iter().all(|v| *v == value));
            prop_assert_eq!(length, array.len());
        }

        #[test]
        fn growth_formula(length in 0usize..10_000) {
            let mut array = DArray::allocate(length, 0u8).expect("allocation");

            prop_assert_eq!(capacity_for(length), Some(array.capacity()));

            array.resize(length + 1, 0).expect("resize");

            prop_assert_eq!(capacity_for(length + 1), Some(array.capacity()));
        }
    }

    //
    //  Helpers
    //

    //  Returns a generator of `start + 1`, `start + 2`, ...
    fn counter<T>(mut next: T) -> impl FnMut() -> T
    where
        T: Copy + AddAssign + From<u8>,
    {
        move || {
            next += T::from(1);
            next
        }
    }

    //  Returns an array filled to its minimum capacity, so that the next push or insert must grow it.
    fn full_in<T, F>(allocator: &FlakyAllocator, mut f: F) -> Flaky<'_, T>
    where
        F: FnMut() -> T,
    {
        let mut array = Flaky::new_in(allocator).expect("allocation");

        while array.len() < array.capacity() {
            array = array.push(f()).expect("push");
        }

        assert_eq!((10, 10), (array.len(), array.capacity()));

        array
    }

    struct DropCounter(Rc<Cell<usize>>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }
} // mod tests
