//  Test utilities.

use core::{alloc::Layout, cell::Cell, ptr::NonNull};

use crate::utils::alloc::{AllocError, Allocator, Global};

/// An allocator which can be instructed to fail.
///
/// Every successful allocation consumes one unit of budget; once the budget is exhausted, all further allocations
/// fail, until the budget is replenished. Reallocations go through `allocate`, and thus consume budget too.
///
/// The number of live blocks is tracked, to detect leaks and double-frees.
#[derive(Debug, Default)]
pub(crate) struct FlakyAllocator {
    budget: Cell<Option<usize>>,
    live: Cell<usize>,
}

impl FlakyAllocator {
    /// Creates an allocator which never fails.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Allows `n` more allocations to succeed, then fails all subsequent allocations.
    pub(crate) fn allow(&self, n: usize) {
        self.budget.set(Some(n));
    }

    /// Fails all subsequent allocations.
    pub(crate) fn fail(&self) {
        self.allow(0);
    }

    /// Lets all subsequent allocations succeed.
    pub(crate) fn heal(&self) {
        self.budget.set(None);
    }

    /// Returns the number of blocks currently allocated.
    pub(crate) fn live(&self) -> usize {
        self.live.get()
    }
}

//  Safety:
//  -   Liveness, Independence, Shallowness: forwarded to `Global`.
unsafe impl Allocator for FlakyAllocator {
    fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
        if let Some(budget) = self.budget.get() {
            let budget = budget.checked_sub(1).ok_or(AllocError)?;

            self.budget.set(Some(budget));
        }

        let ptr = Global.allocate(layout)?;

        self.live.set(self.live.get() + 1);

        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        debug_assert!(self.live.get() > 0, "double free");

        self.live.set(self.live.get() - 1);

        //  Safety:
        //  -   Forwarded pre-conditions, as all blocks are allocated by `Global`.
        unsafe { Global.deallocate(ptr, layout) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget() {
        let allocator = FlakyAllocator::new();
        let layout = Layout::new::<u64>();

        allocator.allow(1);

        let block = allocator.allocate(layout).expect("within budget");

        assert_eq!(1, allocator.live());
        assert_eq!(Err(AllocError), allocator.allocate(layout).map(|_| ()));

        allocator.heal();

        let other = allocator.allocate(layout).expect("unlimited");

        assert_eq!(2, allocator.live());

        //  Safety:
        //  -   Both blocks were allocated by `allocator`, with `layout`.
        unsafe {
            allocator.deallocate(block.cast(), layout);
            allocator.deallocate(other.cast(), layout);
        }

        assert_eq!(0, allocator.live());
    }
} // mod tests
