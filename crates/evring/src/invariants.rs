//! Debug assertion macros for ring invariants.
//!
//! Active only in debug builds (`debug_assert!`), so release builds pay
//! nothing. The one exception is reserved-slot over-commit, which stays a
//! hard check inside `Ring::push_reserved` because a lost reply is not
//! recoverable at any call site.

/// Assert that count does not exceed capacity.
///
/// **Invariant**: `0 ≤ (tail - head) ≤ capacity`
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "ring count {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

/// Assert that a sequence number only increases.
///
/// **Invariant**: `new_value ≥ old_value`
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "{} decreased from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

/// Assert that the consumer never advances past the producer.
///
/// **Invariant**: `head ≤ tail`
macro_rules! debug_assert_head_not_past_tail {
    ($head:expr, $tail:expr) => {
        debug_assert!(
            $head <= $tail,
            "head {} advanced beyond tail {}",
            $head,
            $tail
        )
    };
}

/// Assert that outstanding reservations stay within capacity.
///
/// **Invariant**: `reserved ≤ capacity`
macro_rules! debug_assert_reserved_bounded {
    ($reserved:expr, $capacity:expr) => {
        debug_assert!(
            $reserved <= $capacity,
            "reserved slots {} exceed capacity {}",
            $reserved,
            $capacity
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_head_not_past_tail;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_reserved_bounded;
