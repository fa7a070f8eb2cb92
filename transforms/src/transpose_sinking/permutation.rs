//! Permutation algebra.
//!
//! A transpose order `P` maps output dimension `i` to input dimension `P[i]`.
//! Functions here assume their arguments are valid permutations; callers that
//! read orders from the graph go through [`axis_order_of`], which validates.

use axion_ir::infer::validate_permutation;
use axion_ir::pattern::const_ints;
use axion_ir::{Graph, OutletId};
use smallvec::SmallVec;

pub type AxisOrder = SmallVec<[usize; 4]>;

/// Permutation `Q` with `Q[order[i]] == i`.
pub fn invert(order: &[usize]) -> AxisOrder {
    debug_assert!(is_permutation(order), "not a permutation: {order:?}");
    let mut inverse: AxisOrder = smallvec::smallvec![0; order.len()];
    for (i, &a) in order.iter().enumerate() {
        inverse[a] = i;
    }
    inverse
}

/// Axis in the input frame that output axis `axis` reads from.
#[inline]
pub fn apply(order: &[usize], axis: usize) -> usize {
    order[axis]
}

/// `values` permuted so that `result[i] == values[order[i]]`.
pub fn reindex<T: Clone>(order: &[usize], values: &[T]) -> Vec<T> {
    debug_assert_eq!(order.len(), values.len());
    order.iter().map(|&a| values[a].clone()).collect()
}

/// Single order equivalent to transposing by `first`, then by `second`.
pub fn compose(first: &[usize], second: &[usize]) -> AxisOrder {
    debug_assert_eq!(first.len(), second.len());
    second.iter().map(|&a| first[a]).collect()
}

pub fn is_identity(order: &[usize]) -> bool {
    order.iter().enumerate().all(|(i, &a)| i == a)
}

pub fn is_permutation(order: &[usize]) -> bool {
    let mut seen = vec![false; order.len()];
    order.iter().all(|&a| a < order.len() && !std::mem::replace(&mut seen[a], true))
}

/// Order held by a constant (or foldable) outlet, if it is a valid permutation.
pub fn axis_order_of(graph: &Graph, outlet: OutletId) -> Option<AxisOrder> {
    let ints = const_ints(graph, outlet)?;
    let order = validate_permutation(&ints, ints.len()).ok()?;
    Some(order.into_iter().collect())
}
