//! Shim for unstable allocator API.
//!
//! -   By default, provides a minimal duplicate of the allocator API, sufficient to allocate, reallocate, and
//!     deallocate the backing block of an array.
//! -   If `allocator_api` is used, then forwards the allocator API.

#[cfg(feature = "allocator_api")]
pub use alloc::alloc::{AllocError, Allocator, Global};

#[cfg(not(feature = "allocator_api"))]
pub use shim::{AllocError, Allocator, Global};

#[cfg(not(feature = "allocator_api"))]
pub(super) mod shim {
    use core::{
        alloc::Layout,
        error, fmt,
        ptr::{self, NonNull},
    };

    use alloc::alloc;

    /// The AllocError error indicates an allocation failure that may be due to resource exhaustion or to something
    /// wrong when combining the given input arguments with this allocator.
    #[derive(Copy, Clone, PartialEq, Eq, Debug)]
    pub struct AllocError;

    impl fmt::Display for AllocError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
            f.write_str("memory allocation failed")
        }
    }

    impl error::Error for AllocError {}

    /// An implementation of Allocator can allocate, grow, shrink, and deallocate arbitrary blocks of data described via
    /// Layout.
    ///
    /// #   Safety
    ///
    /// -   Liveness: memory blocks that are currently allocated by an allocator must point to valid memory until either
    ///     they are deallocated or the `Allocator` and all its clones are dropped.
    /// -   Independence: moving an allocator must not invalidate memory blocks returned from it.
    /// -   Shallowness: a copied or cloned allocator must behave like the original allocator.
    pub unsafe trait Allocator {
        /// Attempts to allocate a block of memory.
        ///
        /// The content of the block is uninitialized.
        fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError>;

        /// Deallocates the memory referenced by ptr.
        ///
        /// #   Safety
        ///
        /// -   Liveness: `ptr` must still be allocated.
        /// -   Selfness: `ptr` must have been allocated by `self`.
        /// -   Layout: `layout` must match the layout used to allocate, or last reallocate, `ptr`.
        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

        /// Attempts to extend the memory block.
        ///
        /// On success, the first `old_layout.size()` bytes are preserved, and `ptr` must no longer be used. On failure,
        /// `ptr` is left untouched, and still allocated.
        ///
        /// #   Safety
        ///
        /// -   Liveness: `ptr` must still be allocated.
        /// -   Selfness: `ptr` must have been allocated by `self`.
        /// -   Layout: `old_layout` must match the layout used to allocate, or last reallocate, `ptr`.
        /// -   Growth: `new_layout.size()` must be greater than or equal to `old_layout.size()`.
        unsafe fn grow(
            &self,
            ptr: NonNull<u8>,
            old_layout: Layout,
            new_layout: Layout,
        ) -> Result<NonNull<[u8]>, AllocError> {
            debug_assert!(new_layout.size() >= old_layout.size());

            //  Safety:
            //  -   Forwarded pre-conditions, with `old_layout.size()` as the number of preserved bytes.
            unsafe { self.relocate(ptr, old_layout, new_layout, old_layout.size()) }
        }

        /// Attempts to shrink the memory block.
        ///
        /// On success, the first `new_layout.size()` bytes are preserved, and `ptr` must no longer be used. On failure,
        /// `ptr` is left untouched, and still allocated.
        ///
        /// #   Safety
        ///
        /// -   Liveness: `ptr` must still be allocated.
        /// -   Selfness: `ptr` must have been allocated by `self`.
        /// -   Layout: `old_layout` must match the layout used to allocate, or last reallocate, `ptr`.
        /// -   Shrinkage: `new_layout.size()` must be less than or equal to `old_layout.size()`.
        unsafe fn shrink(
            &self,
            ptr: NonNull<u8>,
            old_layout: Layout,
            new_layout: Layout,
        ) -> Result<NonNull<[u8]>, AllocError> {
            debug_assert!(new_layout.size() <= old_layout.size());

            //  Safety:
            //  -   Forwarded pre-conditions, with `new_layout.size()` as the number of preserved bytes.
            unsafe { self.relocate(ptr, old_layout, new_layout, new_layout.size()) }
        }

        //  Moves the first `preserved` bytes of `ptr` into a fresh block of `new_layout`, then releases `ptr`.
        //
        //  #   Safety
        //
        //  -   Liveness, Selfness, Layout: as per `grow` and `shrink`.
        //  -   Preserved: `preserved` is less than or equal to both `old_layout.size()` and `new_layout.size()`.
        #[doc(hidden)]
        unsafe fn relocate(
            &self,
            ptr: NonNull<u8>,
            old_layout: Layout,
            new_layout: Layout,
            preserved: usize,
        ) -> Result<NonNull<[u8]>, AllocError> {
            let new_ptr = self.allocate(new_layout)?;

            {
                let new_ptr = new_ptr.cast::<u8>();

                //  Safety:
                //  -   `ptr` is valid for `preserved` reads, as per Liveness, Layout & Preserved pre-conditions.
                //  -   `new_ptr` is valid for `preserved` writes, as per Preserved pre-condition.
                //  -   `ptr` and `new_ptr` point to non-overlapping blocks, as `new_ptr` is freshly allocated.
                unsafe { ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), preserved) };

                //  Safety:
                //  -   Liveness: as per Liveness pre-condition.
                //  -   Selfness: as per Selfness pre-condition.
                //  -   Layout: as per Layout pre-condition.
                unsafe { self.deallocate(ptr, old_layout) };
            }

            Ok(new_ptr)
        }
    }

    //  Safety:
    //  -   Forwarded to `A`.
    unsafe impl<A> Allocator for &A
    where
        A: ?Sized + Allocator,
    {
        #[inline]
        fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
            (**self).allocate(layout)
        }

        #[inline]
        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            //  Safety: forwarded.
            unsafe { (**self).deallocate(ptr, layout) }
        }

        #[inline]
        unsafe fn grow(
            &self,
            ptr: NonNull<u8>,
            old_layout: Layout,
            new_layout: Layout,
        ) -> Result<NonNull<[u8]>, AllocError> {
            //  Safety: forwarded.
            unsafe { (**self).grow(ptr, old_layout, new_layout) }
        }

        #[inline]
        unsafe fn shrink(
            &self,
            ptr: NonNull<u8>,
            old_layout: Layout,
            new_layout: Layout,
        ) -> Result<NonNull<[u8]>, AllocError> {
            //  Safety: forwarded.
            unsafe { (**self).shrink(ptr, old_layout, new_layout) }
        }
    }

    /// The global memory allocator.
    #[derive(Copy, Clone, Default, Debug)]
    pub struct Global;

    //  Safety:
    //  -   Liveness, Independence, Shallowness: guaranteed by implementation.
    unsafe impl Allocator for Global {
        #[inline]
        fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
            if layout.size() == 0 {
                return Ok(NonNull::slice_from_raw_parts(dangling(layout), 0));
            }

            //  Safety:
            //  -   `layout` has a non-zero size.
            let raw_ptr = unsafe { alloc::alloc(layout) };

            let ptr = NonNull::new(raw_ptr).ok_or(AllocError)?;

            Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
        }

        #[inline]
        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            if layout.size() == 0 {
                return;
            }

            //  Safety:
            //  -   `ptr.as_ptr()` is currently allocated, as per Liveness pre-condition.
            //  -   `ptr.as_ptr()` was allocated by `self`, as per Selfness pre-condition.
            //  -   `layout` matches the layout of `ptr.as_ptr()` as per Layout pre-condition.
            unsafe { alloc::dealloc(ptr.as_ptr(), layout) }
        }

        #[inline]
        unsafe fn grow(
            &self,
            ptr: NonNull<u8>,
            old_layout: Layout,
            new_layout: Layout,
        ) -> Result<NonNull<[u8]>, AllocError> {
            debug_assert!(new_layout.size() >= old_layout.size());

            //  Safety:
            //  -   Forwarded pre-conditions.
            unsafe { self.realloc_impl(ptr, old_layout, new_layout) }
        }

        #[inline]
        unsafe fn shrink(
            &self,
            ptr: NonNull<u8>,
            old_layout: Layout,
            new_layout: Layout,
        ) -> Result<NonNull<[u8]>, AllocError> {
            debug_assert!(new_layout.size() <= old_layout.size());

            //  Safety:
            //  -   Forwarded pre-conditions.
            unsafe { self.realloc_impl(ptr, old_layout, new_layout) }
        }
    }

    //
    //  Implementation
    //

    impl Global {
        //  #   Safety
        //
        //  -   Liveness, Selfness, Layout: as per `grow` and `shrink`.
        #[inline]
        unsafe fn realloc_impl(
            &self,
            ptr: NonNull<u8>,
            old_layout: Layout,
            new_layout: Layout,
        ) -> Result<NonNull<[u8]>, AllocError> {
            //  `realloc` cannot change the alignment, nor deal with zero-sized blocks.
            if old_layout.align() != new_layout.align() || old_layout.size() == 0 || new_layout.size() == 0 {
                let preserved = old_layout.size().min(new_layout.size());

                //  Safety:
                //  -   Forwarded pre-conditions.
                //  -   `preserved` is less than or equal to both sizes.
                return unsafe { self.relocate(ptr, old_layout, new_layout, preserved) };
            }

            //  Safety:
            //  -   `ptr` is currently allocated, by `self`, with `old_layout`, as per pre-conditions.
            //  -   `new_layout.size()` is non-zero, and does not overflow `isize` when rounded, as it is a `Layout`.
            let raw_ptr = unsafe { alloc::realloc(ptr.as_ptr(), old_layout, new_layout.size()) };

            let ptr = NonNull::new(raw_ptr).ok_or(AllocError)?;

            Ok(NonNull::slice_from_raw_parts(ptr, new_layout.size()))
        }
    }

    fn dangling(layout: Layout) -> NonNull<u8> {
        //  Safety:
        //  -   `layout.align()` is a non-zero power of two.
        unsafe { NonNull::new_unchecked(ptr::without_provenance_mut(layout.align())) }
    }
} // mod shim
