//  See `RawDArray`.
//
//  #   Why `unsafe` everywhere?
//
//  A `RawDArray` is a copyable, type-erased, handle: nothing prevents a copy from outliving the block it points to,
//  since any growing operation may relocate the block, and since `free` does not consume all copies. Handle validity
//  is therefore a pre-condition of nigh every operation, and it cannot be checked.
//
//  Indexes are similarly unchecked, and only verified by `debug_assert!`.

use core::{
    alloc::Layout,
    ptr::{self, NonNull},
};

use log::{debug, trace};

use super::{
    RawIter, RawIterRev,
    alloc::Allocator,
    growth::capacity_for,
    header::{BlockLayout, ElementLayout, Header},
};

/// A type-erased handle to an array.
///
/// The handle points at the first element of the array, within a single allocated block which also holds the
/// metadata of the array, immediately before the first element. The null, or failure, sentinel is `None`, and
/// `Option<RawDArray>` is the size of a pointer.
///
/// A handle is _valid_ if it was returned by `allocate`, or by one of the mutating operations called on a valid
/// handle, and no mutating operation nor `free` has been called since on any copy of it.
///
/// The handle does not remember which allocator allocated its block: the very same allocator must be passed to every
/// operation which may (re)allocate or deallocate.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(transparent)]
pub struct RawDArray(NonNull<u8>);

//
//  Lifecycle.
//

impl RawDArray {
    /// Allocates an array of `length` elements of the given layout, with a capacity of `capacity_for(length)`.
    ///
    /// The elements are left uninitialized.
    ///
    /// Returns `None` if the allocation fails.
    ///
    /// #   Examples
    ///
    /// ```
    /// #   use darray::utils::{ElementLayout, RawDArray, alloc::Global};
    /// let array = RawDArray::allocate(&Global, 3, ElementLayout::from_size(4)).expect("allocation");
    ///
    /// //  Safety:
    /// //  -   `array` is valid, and was allocated by `Global`.
    /// unsafe {
    ///     assert_eq!(3, array.length());
    ///     assert_eq!(10, array.capacity());
    ///     assert_eq!(4, array.element_size());
    ///
    ///     array.free(&Global);
    /// }
    /// ```
    pub fn allocate<A>(allocator: &A, length: usize, element: ElementLayout) -> Option<Self>
    where
        A: Allocator,
    {
        let capacity = capacity_for(length)?;
        let block = BlockLayout::new(element, capacity)?;

        let Ok(start) = allocator.allocate(block.layout) else {
            debug!("failed to allocate array of {capacity} elements of {element:?}");
            return None;
        };

        //  Safety:
        //  -   `block.handle_offset` is less than or equal to `block.layout.size()`, per `BlockLayout::new`.
        let handle = unsafe { start.cast::<u8>().add(block.handle_offset) };

        let this = Self(handle);

        let header = Header {
            element_size: element.size(),
            element_align: element.align(),
            length,
            capacity,
        };

        //  Safety:
        //  -   The header fits in the block, before `handle`, and is suitably aligned, per `BlockLayout::new`.
        unsafe { this.header_ptr().write(header) };

        Some(this)
    }

    /// Releases the array, header and elements, in one step.
    ///
    /// The elements are not dropped: they are plain bytes, as far as the handle is concerned.
    ///
    /// #   Safety
    ///
    /// -   Valid: `self` must be valid.
    /// -   Selfness: `allocator` must be the allocator which allocated `self`.
    pub unsafe fn free<A>(self, allocator: &A)
    where
        A: Allocator,
    {
        //  Safety:
        //  -   `self` is valid, as per pre-condition.
        let header = unsafe { self.header() };

        //  Safety:
        //  -   `header` is the header of a live block, hence its layout was computed successfully once.
        let block = unsafe { Self::block_layout(&header) };

        //  Safety:
        //  -   `self` is valid, hence `block.handle_offset` bytes before is the start of the block.
        let start = unsafe { self.0.sub(block.handle_offset) };

        //  Safety:
        //  -   Liveness: `start` is live, as `self` is valid.
        //  -   Selfness: `start` was allocated by `allocator`, as per pre-condition.
        //  -   Layout: `block.layout` is the layout the block was last (re)allocated with.
        unsafe { allocator.deallocate(start, block.layout) };
    }
}

//
//  Accessors.
//

impl RawDArray {
    /// Returns a pointer to the first element.
    ///
    /// The pointer is suitably aligned for the elements, even if the array is empty.
    #[inline]
    pub const fn as_ptr(self) -> NonNull<u8> {
        self.0
    }

    /// Returns the number of initialized elements.
    ///
    /// #   Safety
    ///
    /// -   Valid: `self` must be valid.
    #[inline]
    pub unsafe fn length(self) -> usize {
        //  Safety:
        //  -   Forwarded pre-condition.
        unsafe { self.header().length }
    }

    /// Returns the number of element slots in the block.
    ///
    /// #   Safety
    ///
    /// -   Valid: `self` must be valid.
    #[inline]
    pub unsafe fn capacity(self) -> usize {
        //  Safety:
        //  -   Forwarded pre-condition.
        unsafe { self.header().capacity }
    }

    /// Returns the size of an element, in bytes.
    ///
    /// #   Safety
    ///
    /// -   Valid: `self` must be valid.
    #[inline]
    pub unsafe fn element_size(self) -> usize {
        //  Safety:
        //  -   Forwarded pre-condition.
        unsafe { self.header().element_size }
    }

    /// Returns the layout of an element.
    ///
    /// #   Safety
    ///
    /// -   Valid: `self` must be valid.
    #[inline]
    pub unsafe fn element_layout(self) -> ElementLayout {
        //  Safety:
        //  -   Forwarded pre-condition.
        unsafe { self.header().element_layout() }
    }

    /// Returns a pointer to the element at `index`.
    ///
    /// #   Safety
    ///
    /// -   Valid: `self` must be valid.
    /// -   In-bounds: `index` must be strictly less than `self.length()`.
    #[inline]
    pub unsafe fn get(self, index: usize) -> NonNull<u8> {
        debug_assert!(index < unsafe { self.length() });

        //  Safety:
        //  -   Forwarded pre-conditions.
        unsafe { self.slot(index) }
    }

    /// Returns a forward iterator over the positions of the elements.
    ///
    /// The iterator borrows nothing: it must not be used past the next mutating call.
    ///
    /// #   Safety
    ///
    /// -   Valid: `self` must be valid.
    #[inline]
    pub unsafe fn iter(self) -> RawIter {
        //  Safety:
        //  -   Forwarded pre-condition.
        let header = unsafe { self.header() };

        //  Safety:
        //  -   `self.0` points to `header.length` elements of `header.element_size` bytes.
        unsafe { RawIter::new(self.0, header.element_size, header.length) }
    }

    /// Returns a reverse iterator over the positions of the elements.
    ///
    /// The iterator borrows nothing: it must not be used past the next mutating call.
    ///
    /// #   Safety
    ///
    /// -   Valid: `self` must be valid.
    #[inline]
    pub unsafe fn iter_rev(self) -> RawIterRev {
        //  Safety:
        //  -   Forwarded pre-condition.
        RawIterRev::new(unsafe { self.iter() })
    }
}

//
//  Growth.
//

impl RawDArray {
    /// Sets the length to `length`, and reallocates the block to `capacity_for(length)` slots.
    ///
    /// The block is reallocated even if its current capacity already matches. Elements at or beyond `length` may be
    /// lost, elements between the old and new length are uninitialized.
    ///
    /// On success, returns the new handle, and `self` is no longer valid. On failure, returns `None`, and `self` is
    /// left untouched.
    ///
    /// #   Safety
    ///
    /// -   Valid: `self` must be valid.
    /// -   Selfness: `allocator` must be the allocator which allocated `self`.
    pub unsafe fn resize<A>(self, allocator: &A, length: usize) -> Option<Self>
    where
        A: Allocator,
    {
        let capacity = capacity_for(length)?;

        //  Safety:
        //  -   Forwarded pre-conditions.
        let this = unsafe { self.reallocate(allocator, capacity)? };

        //  Safety:
        //  -   `this` is valid, and `length <= capacity`.
        unsafe { this.set_length(length) };

        Some(this)
    }

    /// Ensures that at least `additional` slots are available beyond the current length, without changing it.
    ///
    /// If enough slots are already available, returns `self` as is. Otherwise, reallocates the block to
    /// `capacity_for(length + additional)` slots. Never shrinks.
    ///
    /// On success, returns the new handle, and `self` is no longer valid. On failure, returns `None`, and `self` is
    /// left untouched.
    ///
    /// #   Safety
    ///
    /// -   Valid: `self` must be valid.
    /// -   Selfness: `allocator` must be the allocator which allocated `self`.
    pub unsafe fn reserve<A>(self, allocator: &A, additional: usize) -> Option<Self>
    where
        A: Allocator,
    {
        //  Safety:
        //  -   Forwarded pre-condition.
        let header = unsafe { self.header() };

        let required = header.length.checked_add(additional)?;

        if header.capacity >= required {
            return Some(self);
        }

        let capacity = capacity_for(required)?;

        //  Safety:
        //  -   Forwarded pre-conditions.
        unsafe { self.reallocate(allocator, capacity) }
    }

    //  Reallocates the block to `capacity` slots, preserving the length.
    //
    //  #   Safety
    //
    //  -   Valid: `self` must be valid.
    //  -   Selfness: `allocator` must be the allocator which allocated `self`.
    //  -   Fits: if `capacity` is less than the current length, the caller must lower the length before any other use.
    pub(crate) unsafe fn reallocate<A>(self, allocator: &A, capacity: usize) -> Option<Self>
    where
        A: Allocator,
    {
        //  Safety:
        //  -   Forwarded pre-condition.
        let header = unsafe { self.header() };

        //  Safety:
        //  -   `header` is the header of a live block.
        let old = unsafe { Self::block_layout(&header) };

        let Some(new) = BlockLayout::new(header.element_layout(), capacity) else {
            debug!("failed to reallocate array: {capacity} elements of {:?} overflow", header.element_layout());
            return None;
        };

        //  Same alignment, hence same offset.
        debug_assert_eq!(old.handle_offset, new.handle_offset);

        //  Safety:
        //  -   `self` is valid, hence `old.handle_offset` bytes before is the start of the block.
        let start = unsafe { self.0.sub(old.handle_offset) };

        //  Safety:
        //  -   Liveness: `start` is live, as `self` is valid.
        //  -   Selfness: `start` was allocated by `allocator`, as per pre-condition.
        //  -   Layout: `old.layout` is the layout the block was last (re)allocated with.
        //  -   Growth/Shrinkage: checked.
        let result = unsafe {
            if new.layout.size() >= old.layout.size() {
                allocator.grow(start, old.layout, new.layout)
            } else {
                allocator.shrink(start, old.layout, new.layout)
            }
        };

        let Ok(start) = result else {
            debug!("failed to reallocate array from {} to {capacity} elements", header.capacity);
            return None;
        };

        trace!("reallocated array from {} to {capacity} elements", header.capacity);

        //  Safety:
        //  -   `new.handle_offset` is less than or equal to `new.layout.size()`, per `BlockLayout::new`.
        let this = Self(unsafe { start.cast::<u8>().add(new.handle_offset) });

        //  Safety:
        //  -   The header was preserved, as it lies within the first `new.handle_offset` bytes.
        unsafe { (*this.header_ptr().as_ptr()).capacity = capacity };

        Some(this)
    }

    //  Ensures there is room for one more element, reallocating with `resize` if necessary.
    //
    //  #   Safety
    //
    //  -   Valid: `self` must be valid.
    //  -   Selfness: `allocator` must be the allocator which allocated `self`.
    #[inline]
    unsafe fn make_room<A>(self, allocator: &A) -> Option<Self>
    where
        A: Allocator,
    {
        //  Safety:
        //  -   Forwarded pre-condition.
        let header = unsafe { self.header() };

        if header.length < header.capacity {
            return Some(self);
        }

        //  Safety:
        //  -   Forwarded pre-conditions.
        unsafe { self.resize(allocator, header.length) }
    }

    //  Ensures there is room for one more element, recording `self` in `backup` before any reallocation.
    //
    //  #   Safety
    //
    //  -   Valid: `self` must be valid.
    //  -   Selfness: `allocator` must be the allocator which allocated `self`.
    #[inline]
    unsafe fn make_room_safe<A>(self, allocator: &A, backup: &mut Option<Self>) -> Option<Self>
    where
        A: Allocator,
    {
        //  Safety:
        //  -   Forwarded pre-condition.
        let header = unsafe { self.header() };

        if header.length < header.capacity {
            return Some(self);
        }

        *backup = Some(self);

        //  Safety:
        //  -   Forwarded pre-conditions.
        let this = unsafe { self.resize(allocator, header.length)? };

        //  The original is no longer valid.
        *backup = None;

        Some(this)
    }
}

//
//  Insertion.
//

impl RawDArray {
    /// Appends the element pointed to by `value`, growing the array if necessary.
    ///
    /// This is the fast version: the caller must always replace every copy of `self` with the result. On failure,
    /// `None` is returned, and unless the caller retained a copy of `self`, the array is unreachable.
    ///
    /// #   Safety
    ///
    /// -   Valid: `self` must be valid.
    /// -   Selfness: `allocator` must be the allocator which allocated `self`.
    /// -   Value: `value` must be valid for reads of `self.element_size()` bytes, and must not point within the array.
    #[inline]
    pub unsafe fn push<A>(self, allocator: &A, value: NonNull<u8>) -> Option<Self>
    where
        A: Allocator,
    {
        //  Safety:
        //  -   Forwarded pre-conditions.
        let this = unsafe { self.make_room(allocator)? };

        //  Safety:
        //  -   `this` has room for one more element, which goes at the back.
        unsafe { this.insert_in_place(this.length(), value) };

        Some(this)
    }

    /// Appends the element pointed to by `value`, growing the array if necessary.
    ///
    /// This is the safe version: if growth is necessary, `self` is first recorded into `backup`. On failure, `None` is
    /// returned and `backup` holds `self`, still valid, to be used or freed. On success, `backup` is reset to `None`
    /// if growth happened, and left untouched otherwise.
    ///
    /// #   Safety
    ///
    /// -   Valid: `self` must be valid.
    /// -   Selfness: `allocator` must be the allocator which allocated `self`.
    /// -   Value: `value` must be valid for reads of `self.element_size()` bytes, and must not point within the array.
    #[inline]
    pub unsafe fn push_safe<A>(self, allocator: &A, value: NonNull<u8>, backup: &mut Option<Self>) -> Option<Self>
    where
        A: Allocator,
    {
        //  Safety:
        //  -   Forwarded pre-conditions.
        let this = unsafe { self.make_room_safe(allocator, backup)? };

        //  Safety:
        //  -   `this` has room for one more element, which goes at the back.
        unsafe { this.insert_in_place(this.length(), value) };

        Some(this)
    }

    /// Inserts the element pointed to by `value` at `index`, shifting all elements after it towards the back.
    ///
    /// This is the fast version, see `push`.
    ///
    /// #   Safety
    ///
    /// -   Valid: `self` must be valid.
    /// -   Selfness: `allocator` must be the allocator which allocated `self`.
    /// -   In-bounds: `index` must be less than or equal to `self.length()`.
    /// -   Value: `value` must be valid for reads of `self.element_size()` bytes, and must not point within the array.
    #[inline]
    pub unsafe fn insert<A>(self, allocator: &A, index: usize, value: NonNull<u8>) -> Option<Self>
    where
        A: Allocator,
    {
        debug_assert!(index <= unsafe { self.length() });

        //  Safety:
        //  -   Forwarded pre-conditions.
        let this = unsafe { self.make_room(allocator)? };

        //  Safety:
        //  -   `this` has room for one more element, and `index` is in bounds.
        unsafe { this.insert_in_place(index, value) };

        Some(this)
    }

    /// Inserts the element pointed to by `value` at `index`, shifting all elements after it towards the back.
    ///
    /// This is the safe version, see `push_safe`.
    ///
    /// #   Safety
    ///
    /// -   Valid: `self` must be valid.
    /// -   Selfness: `allocator` must be the allocator which allocated `self`.
    /// -   In-bounds: `index` must be less than or equal to `self.length()`.
    /// -   Value: `value` must be valid for reads of `self.element_size()` bytes, and must not point within the array.
    #[inline]
    pub unsafe fn insert_safe<A>(
        self,
        allocator: &A,
        index: usize,
        value: NonNull<u8>,
        backup: &mut Option<Self>,
    ) -> Option<Self>
    where
        A: Allocator,
    {
        debug_assert!(index <= unsafe { self.length() });

        //  Safety:
        //  -   Forwarded pre-conditions.
        let this = unsafe { self.make_room_safe(allocator, backup)? };

        //  Safety:
        //  -   `this` has room for one more element, and `index` is in bounds.
        unsafe { this.insert_in_place(index, value) };

        Some(this)
    }

    //  #   Safety
    //
    //  -   Valid: `self` must be valid.
    //  -   Room: `self.length()` must be strictly less than `self.capacity()`.
    //  -   In-bounds: `index` must be less than or equal to `self.length()`.
    //  -   Value: `value` must be valid for reads of `self.element_size()` bytes, and must not point within the array.
    unsafe fn insert_in_place(self, index: usize, value: NonNull<u8>) {
        //  Safety:
        //  -   Forwarded pre-condition.
        let header = unsafe { self.header() };

        debug_assert!(header.length < header.capacity);
        debug_assert!(index <= header.length);

        let size = header.element_size;

        //  Safety:
        //  -   `index` is in bounds, as per pre-condition.
        let slot = unsafe { self.slot(index) };

        //  Safety:
        //  -   `[index, length)` is initialized, and `[index + 1, length + 1)` is within capacity, as per Room.
        unsafe { slot.copy_to(slot.add(size), (header.length - index) * size) };

        //  Safety:
        //  -   `value` is readable, and does not overlap `slot`, as per Value pre-condition.
        unsafe { slot.copy_from_nonoverlapping(value, size) };

        //  Safety:
        //  -   `length + 1 <= capacity`, as per Room.
        unsafe { self.set_length(header.length + 1) };
    }
}

//
//  Removal.
//

impl RawDArray {
    /// Removes the last element.
    ///
    /// Returns the position of the removed element, which remains readable until the next mutating operation.
    ///
    /// Never reallocates, and therefore never fails.
    ///
    /// #   Safety
    ///
    /// -   Valid: `self` must be valid.
    /// -   Non-empty: `self.length()` must be strictly greater than 0.
    #[inline]
    pub unsafe fn pop(self) -> NonNull<u8> {
        //  Safety:
        //  -   Forwarded pre-condition.
        let length = unsafe { self.length() };

        debug_assert!(length > 0);

        let length = length - 1;

        //  Safety:
        //  -   `length` is smaller than the current length.
        unsafe { self.set_length(length) };

        //  Safety:
        //  -   `length` is within the capacity.
        unsafe { self.slot(length) }
    }

    /// Removes the element at `index`.
    ///
    /// The order of the elements after `index` is not guaranteed to be preserved, only that all remaining elements
    /// occupy `[0, length)`.
    ///
    /// Returns the position of the removed element, which remains readable until the next mutating operation.
    ///
    /// A scratch slot is requested from `allocator` to move the element out of the way; if it cannot be obtained, the
    /// element is bubbled to the back by swaps instead. Never reallocates, and therefore never fails.
    ///
    /// #   Safety
    ///
    /// -   Valid: `self` must be valid.
    /// -   Selfness: `allocator` must be the allocator which allocated `self`.
    /// -   In-bounds: `index` must be strictly less than `self.length()`.
    pub unsafe fn remove<A>(self, allocator: &A, index: usize) -> NonNull<u8>
    where
        A: Allocator,
    {
        //  Safety:
        //  -   Forwarded pre-condition.
        let header = unsafe { self.header() };

        debug_assert!(index < header.length);

        let element = header.element_layout();

        if element.size() != 0 && index + 1 != header.length {
            //  Safety:
            //  -   `element.size()` is a multiple of `element.align()`, a power of two.
            let layout = unsafe { Layout::from_size_align_unchecked(element.size(), element.align()) };

            match allocator.allocate(layout) {
                Ok(scratch) => {
                    let scratch = scratch.cast::<u8>();

                    //  Safety:
                    //  -   `index` is in bounds, as per pre-condition.
                    //  -   `scratch` is valid for `element.size()` bytes, and does not overlap.
                    unsafe { self.move_to_back_via_scratch(index, scratch) };

                    //  Safety:
                    //  -   `scratch` was just allocated by `allocator`, with `layout`.
                    unsafe { allocator.deallocate(scratch, layout) };
                }
                Err(_) => {
                    debug!("no scratch available to remove element {index}, swapping instead");

                    //  Safety:
                    //  -   `index` is in bounds, as per pre-condition.
                    unsafe { self.move_to_back_via_swaps(index) };
                }
            }
        }

        //  Safety:
        //  -   `self` is non-empty, as `index < length`.
        unsafe { self.pop() }
    }

    //  Performs the following transform, with a single bulk move:
    //
    //  [0][1][2][3] => [0][2][3][1]
    //      ^                    ^
    //      index                moved to back
    //
    //  #   Safety
    //
    //  -   Valid: `self` must be valid.
    //  -   In-bounds: `index` must be strictly less than `self.length()`.
    //  -   Scratch: `scratch` must be valid for reads and writes of `self.element_size()` bytes, and not overlap.
    unsafe fn move_to_back_via_scratch(self, index: usize, scratch: NonNull<u8>) {
        //  Safety:
        //  -   Forwarded pre-condition.
        let header = unsafe { self.header() };

        debug_assert!(index < header.length);

        let size = header.element_size;
        let last = header.length - 1;

        //  Safety:
        //  -   `index` and `last` are in bounds.
        let (target, back) = unsafe { (self.slot(index), self.slot(last)) };

        //  Safety:
        //  -   `target` is readable, `scratch` writable, and they do not overlap, as per Scratch.
        unsafe { scratch.copy_from_nonoverlapping(target, size) };

        //  Safety:
        //  -   `[index + 1, length)` and `[index, length - 1)` are both within the array.
        unsafe { target.copy_from(target.add(size), (last - index) * size) };

        //  Safety:
        //  -   `back` is writable, `scratch` readable, and they do not overlap, as per Scratch.
        unsafe { back.copy_from_nonoverlapping(scratch, size) };
    }

    //  Performs the same transform as `move_to_back_via_scratch`, by swapping the target element with its successor
    //  until it reaches the back. Each swap exchanges exactly one element's worth of bytes, without any allocation.
    //
    //  #   Safety
    //
    //  -   Valid: `self` must be valid.
    //  -   In-bounds: `index` must be strictly less than `self.length()`.
    unsafe fn move_to_back_via_swaps(self, index: usize) {
        //  Safety:
        //  -   Forwarded pre-condition.
        let header = unsafe { self.header() };

        debug_assert!(index < header.length);

        let size = header.element_size;

        for i in index..(header.length - 1) {
            //  Safety:
            //  -   `i` and `i + 1` are in bounds, and distinct.
            unsafe { ptr::swap_nonoverlapping(self.slot(i).as_ptr(), self.slot(i + 1).as_ptr(), size) };
        }
    }
}

//
//  Bulk operations.
//

impl RawDArray {
    /// Overwrites every element with the one pointed to by `value`.
    ///
    /// #   Safety
    ///
    /// -   Valid: `self` must be valid.
    /// -   Value: `value` must be valid for reads of `self.element_size()` bytes, and must not point within the array.
    pub unsafe fn fill(self, value: NonNull<u8>) {
        //  Safety:
        //  -   Forwarded pre-condition.
        let size = unsafe { self.element_size() };

        //  Safety:
        //  -   Forwarded pre-condition.
        for slot in unsafe { self.iter() } {
            //  Safety:
            //  -   `slot` is writable, `value` readable, and they do not overlap, as per Value.
            unsafe { slot.copy_from_nonoverlapping(value, size) };
        }
    }

    /// Exchanges the elements at `a` and `b`.
    ///
    /// #   Safety
    ///
    /// -   Valid: `self` must be valid.
    /// -   In-bounds: `a` and `b` must both be strictly less than `self.length()`.
    pub unsafe fn swap(self, a: usize, b: usize) {
        if a == b {
            return;
        }

        //  Safety:
        //  -   Forwarded pre-condition.
        let size = unsafe { self.element_size() };

        //  Safety:
        //  -   `a` and `b` are in bounds, and distinct, hence their slots do not overlap.
        unsafe { ptr::swap_nonoverlapping(self.get(a).as_ptr(), self.get(b).as_ptr(), size) };
    }
}

//
//  Implementation.
//

impl RawDArray {
    //  #   Safety
    //
    //  -   Valid: `self` must be valid.
    #[inline]
    unsafe fn header_ptr(self) -> NonNull<Header> {
        //  Safety:
        //  -   The header immediately precedes the first element, within the same block.
        unsafe { self.0.sub(Header::SIZE).cast() }
    }

    //  #   Safety
    //
    //  -   Valid: `self` must be valid.
    #[inline]
    unsafe fn header(self) -> Header {
        //  Safety:
        //  -   The header is initialized, and aligned, as `self` is valid.
        unsafe { self.header_ptr().read() }
    }

    //  Sets the length, without any check.
    //
    //  #   Safety
    //
    //  -   Valid: `self` must be valid.
    //  -   Fits: `length` must be less than or equal to `self.capacity()`.
    //  -   Initialized: the caller is responsible for the first `length` elements being initialized, as needed.
    #[inline]
    pub(crate) unsafe fn set_length(self, length: usize) {
        debug_assert!(length <= unsafe { self.capacity() });

        //  Safety:
        //  -   The header is initialized, aligned, and writable, as `self` is valid.
        unsafe { (*self.header_ptr().as_ptr()).length = length };
    }

    //  Returns a pointer to the slot at `index`.
    //
    //  #   Safety
    //
    //  -   Valid: `self` must be valid.
    //  -   In-bounds: `index` must be less than or equal to `self.capacity()`.
    #[inline]
    unsafe fn slot(self, index: usize) -> NonNull<u8> {
        //  Safety:
        //  -   Forwarded pre-condition.
        let size = unsafe { self.element_size() };

        debug_assert!(index <= unsafe { self.capacity() });

        //  Safety:
        //  -   `index * size` is within the block, or one past its end, as per In-bounds.
        unsafe { self.0.add(index * size) }
    }

    //  #   Safety
    //
    //  -   Live: `header` must be the header of a live block.
    #[inline]
    unsafe fn block_layout(header: &Header) -> BlockLayout {
        let block = BlockLayout::of(header);

        #[cfg(debug_assertions)]
        let block = block.expect("valid layout");

        //  Safety:
        //  -   Valid since the block was (re)allocated with this very layout, which cannot succeed without
        //      `BlockLayout::new`, a pure function, succeeding.
        #[cfg(not(debug_assertions))]
        let block = unsafe { block.unwrap_unchecked() };

        block
    }
}

// mod tests
