//  See `Header` and `ElementLayout`.
//
//  #   Memory layout
//
//  ```text
//  +---------+--------+---------+---------+-----+------------------+
//  | padding | header | elem[0] | elem[1] | ... | elem[capacity-1] |
//  +---------+--------+---------+---------+-----+------------------+
//                     ^
//                     handle
//  ```
//
//  The header always sits immediately before element 0, hence at a fixed negative offset from the handle, whatever the
//  alignment of the elements. Any padding required to align element 0 is placed _before_ the header, at the start of
//  the block.
//
//  #   Why store the alignment?
//
//  Deallocation requires the exact layout used for allocation, and the layout depends on the alignment. Since the
//  handle is type-erased, the alignment must be recorded alongside the element size.

use core::{alloc::Layout, mem};

/// Metadata of an array, stored immediately before its first element.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(C)]
pub(crate) struct Header {
    //  Immutable, after creation.
    pub(crate) element_size: usize,
    //  Immutable, after creation.
    pub(crate) element_align: usize,
    //  Number of initialized elements; always less than or equal to `capacity`.
    pub(crate) length: usize,
    //  Number of element slots in the block.
    pub(crate) capacity: usize,
}

impl Header {
    /// Size of the header, and offset from the handle to the header.
    pub(crate) const SIZE: usize = mem::size_of::<Header>();

    /// Alignment of the header.
    pub(crate) const ALIGN: usize = mem::align_of::<Header>();

    /// Returns the layout of the elements.
    pub(crate) const fn element_layout(&self) -> ElementLayout {
        ElementLayout {
            size: self.element_size,
            align: self.element_align,
        }
    }
}

/// The layout of a single element of an array.
///
/// The element type of a raw array is erased; only its size and alignment are recorded, once, at creation.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ElementLayout {
    size: usize,
    align: usize,
}

impl ElementLayout {
    /// Creates a layout from its size and alignment.
    ///
    /// Returns `None` if `align` is not a power of two, or `size` is not a multiple of `align`.
    pub const fn new(size: usize, align: usize) -> Option<Self> {
        if !align.is_power_of_two() || size % align != 0 {
            return None;
        }

        Some(Self { size, align })
    }

    /// Creates a layout from its size alone.
    ///
    /// The alignment is the largest power of two dividing `size`, capped to the alignment of `usize`, which matches
    /// what a general purpose allocator would guarantee for a block of `size` bytes.
    ///
    /// #   Examples
    ///
    /// ```
    /// #   use darray::utils::ElementLayout;
    /// let layout = ElementLayout::from_size(12);
    ///
    /// assert_eq!(12, layout.size());
    /// assert_eq!(4, layout.align());
    /// ```
    pub const fn from_size(size: usize) -> Self {
        let natural = if size == 0 { Header::ALIGN } else { 1 << size.trailing_zeros() };

        let align = if natural < Header::ALIGN { natural } else { Header::ALIGN };

        Self { size, align }
    }

    /// Returns the layout of `T`.
    pub const fn of<T>() -> Self {
        Self {
            size: mem::size_of::<T>(),
            align: mem::align_of::<T>(),
        }
    }

    /// Returns the size of an element, in bytes.
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Returns the alignment of an element, in bytes.
    pub const fn align(&self) -> usize {
        self.align
    }
}

//
//  Block layout.
//

/// Layout of a whole block: padding, header, and elements.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct BlockLayout {
    /// Layout to allocate, or deallocate, the block with.
    pub(crate) layout: Layout,
    /// Offset from the start of the block to the first element.
    pub(crate) handle_offset: usize,
}

impl BlockLayout {
    /// Computes the layout of a block holding `capacity` elements.
    ///
    /// Returns `None` on overflow.
    pub(crate) fn new(element: ElementLayout, capacity: usize) -> Option<Self> {
        let align = if element.align > Header::ALIGN {
            element.align
        } else {
            Header::ALIGN
        };

        let handle_offset = Self::handle_offset(align)?;

        let elements = element.size.checked_mul(capacity)?;
        let size = handle_offset.checked_add(elements)?;

        let layout = Layout::from_size_align(size, align).ok()?;

        Some(Self { layout, handle_offset })
    }

    /// Computes the layout of a block from its header.
    ///
    /// Returns `None` on overflow, which cannot happen for the header of a live block.
    pub(crate) fn of(header: &Header) -> Option<Self> {
        Self::new(header.element_layout(), header.capacity)
    }

    //  Rounds up the size of the header to `align`, a power of two.
    fn handle_offset(align: usize) -> Option<usize> {
        debug_assert!(align.is_power_of_two());

        let mask = align - 1;

        Some(Header::SIZE.checked_add(mask)? & !mask)
    }
}

// mod tests
