//! Generators for property-based testing.

use proptest::prelude::*;

/// A permutation of `0..rank`.
pub fn arb_permutation(rank: usize) -> impl Strategy<Value = Vec<usize>> {
    Just((0..rank).collect::<Vec<_>>()).prop_shuffle()
}

/// Static shape of rank `1..=max_rank` with small dimensions, and a permutation of its axes.
pub fn arb_shape_and_permutation(max_rank: usize) -> impl Strategy<Value = (Vec<usize>, Vec<usize>)> {
    prop::collection::vec(1usize..=3, 1..=max_rank).prop_flat_map(|shape| {
        let rank = shape.len();
        (Just(shape), arb_permutation(rank))
    })
}

/// Concat case: input shape, transpose order, concat axis and input count.
pub fn arb_concat_case() -> impl Strategy<Value = (Vec<usize>, Vec<usize>, usize, usize)> {
    arb_shape_and_permutation(4).prop_flat_map(|(shape, order)| {
        let rank = shape.len();
        (Just(shape), Just(order), 0..rank, 2usize..=3)
    })
}

/// Interpolate settings for a data tensor of a given rank.
#[derive(Debug, Clone)]
pub struct InterpolateCase {
    pub axes: Vec<usize>,
    pub sizes: Vec<i64>,
    pub pads_begin: Vec<usize>,
    pub pads_end: Vec<usize>,
}

pub fn arb_interpolate_case(rank: usize) -> impl Strategy<Value = InterpolateCase> {
    let axes = prop::sample::subsequence((0..rank).collect::<Vec<_>>(), 1..=rank).prop_shuffle();
    (axes, prop::collection::vec(0usize..=1, 0..=rank), prop::collection::vec(0usize..=1, 0..=rank)).prop_flat_map(
        |(axes, pads_begin, pads_end)| {
            let n = axes.len();
            prop::collection::vec(1i64..=5, n).prop_map(move |sizes| InterpolateCase {
                axes: axes.clone(),
                sizes,
                pads_begin: pads_begin.clone(),
                pads_end: pads_end.clone(),
            })
        },
    )
}

/// Shape, permutation and an interpolate case over the same rank.
pub fn arb_interpolate_setup() -> impl Strategy<Value = (Vec<usize>, Vec<usize>, InterpolateCase)> {
    arb_shape_and_permutation(4).prop_flat_map(|(shape, order)| {
        let rank = shape.len();
        (Just(shape), Just(order), arb_interpolate_case(rank))
    })
}
