//! Generators for property-based testing.

use proptest::prelude::*;

/// Static shape of rank `1..=max_rank` with small dimensions.
pub fn arb_shape(max_rank: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..=4, 1..=max_rank)
}

/// A permutation of `0..rank`.
pub fn arb_permutation(rank: usize) -> impl Strategy<Value = Vec<usize>> {
    Just((0..rank).collect::<Vec<_>>()).prop_shuffle()
}

/// A shape together with a permutation of its axes.
pub fn arb_shape_and_permutation(max_rank: usize) -> impl Strategy<Value = (Vec<usize>, Vec<usize>)> {
    arb_shape(max_rank).prop_flat_map(|shape| {
        let rank = shape.len();
        (Just(shape), arb_permutation(rank))
    })
}
