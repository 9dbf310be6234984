//  Growth policy.
//
//  #   Why a rational?
//
//  A growth factor of 1.3 is not representable exactly as a floating point number, and rounding `n * 1.3` upwards in
//  floating point yields off-by-one capacities for some lengths (`10 * 1.3 == 13.000000000000002`). Expressed as
//  `13 / 10` in integer arithmetic, the computation is exact, and overflow is detectable.

/// Minimum capacity of any array, in elements.
pub const MIN_CAPACITY: usize = 10;

/// Numerator of the growth factor.
pub const GROWTH_NUMERATOR: usize = 13;

/// Denominator of the growth factor.
pub const GROWTH_DENOMINATOR: usize = 10;

/// Computes the capacity of an array meant to hold `length` elements.
///
/// The capacity is `max(MIN_CAPACITY, ceil(length * 1.3))`, which guarantees amortized O(1) appends.
///
/// Returns `None` if the computation overflows.
///
/// #   Examples
///
/// ```
/// #   use darray::utils::capacity_for;
/// assert_eq!(Some(10), capacity_for(0));
/// assert_eq!(Some(13), capacity_for(10));
/// assert_eq!(Some(17), capacity_for(13));
/// ```
#[inline]
pub const fn capacity_for(length: usize) -> Option<usize> {
    let Some(scaled) = length.checked_mul(GROWTH_NUMERATOR) else {
        return None;
    };

    let Some(rounded) = scaled.checked_add(GROWTH_DENOMINATOR - 1) else {
        return None;
    };

    let capacity = rounded / GROWTH_DENOMINATOR;

    if capacity < MIN_CAPACITY {
        Some(MIN_CAPACITY)
    } else {
        Some(capacity)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn minimum() {
        for length in 0..=7 {
            assert_eq!(Some(MIN_CAPACITY), capacity_for(length), "{length}");
        }

        //  ceil(8 * 1.3) == 11.
        assert_eq!(Some(11), capacity_for(8));
    }

    #[test]
    fn sequence() {
        let mut capacity = MIN_CAPACITY;
        let mut sequence = [0; 6];

        for slot in &mut sequence {
            *slot = capacity;
            capacity = capacity_for(capacity).expect("no overflow");
        }

        assert_eq!([10, 13, 17, 23, 30, 39], sequence);
    }

    #[test]
    fn overflow() {
        assert_eq!(None, capacity_for(usize::MAX));
        assert_eq!(None, capacity_for(usize::MAX / GROWTH_NUMERATOR + 1));
    }

    proptest! {
        #[test]
        fn never_below_length(length in 0usize..1_000_000_000) {
            let capacity = capacity_for(length).expect("no overflow");

            prop_assert!(capacity >= length);
            prop_assert!(capacity >= MIN_CAPACITY);
            prop_assert!(capacity * GROWTH_DENOMINATOR >= length * GROWTH_NUMERATOR);
            prop_assert!(capacity == MIN_CAPACITY || (capacity - 1) * GROWTH_DENOMINATOR < length * GROWTH_NUMERATOR);
        }
    }
} // mod tests
