//! Rewrites preserve graph results on random layouts.

use axion_ir::{Graph, InterpolateAttrs, InterpolateMode, RewriteRule, ShapeCalcMode};
use proptest::prelude::*;

use super::generators::{InterpolateCase, arb_concat_case, arb_interpolate_setup};
use crate::test::helpers::*;
use crate::transpose_sinking::permutation::{apply, invert};
use crate::transpose_sinking::{ConcatForward, InterpolateBackward, InterpolateForward, TransposeSinking};

fn attrs(case: &InterpolateCase) -> InterpolateAttrs {
    InterpolateAttrs::new(InterpolateMode::Nearest, ShapeCalcMode::Sizes)
        .with_pads(case.pads_begin.clone(), case.pads_end.clone())
}

fn axes(case: &InterpolateCase) -> Vec<i64> {
    case.axes.iter().map(|&a| a as i64).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn concat_forward_preserves_results((shape, order, axis, inputs) in arb_concat_case()) {
        let shapes: Vec<&[usize]> = vec![shape.as_slice(); inputs];
        let (mut g, concat) = transposed_concat(&shapes, &order, axis as i64);
        let before = g.clone();

        prop_assert!(ConcatForward.apply(&mut g, concat).is_rewritten());
        prop_assert_eq!(concat_attrs(&g, concat).axis, apply(&order, axis) as i64);
        assert_same_results(&before, &g);
    }

    #[test]
    fn interpolate_forward_preserves_results((shape, order, case) in arb_interpolate_setup()) {
        let mut g = Graph::new();
        let x = param(&mut g, "x", &shape);
        let t = g.transpose_by(x, &order).unwrap();
        let interp = interpolate_sizes(&mut g, t, &axes(&case), &case.sizes, attrs(&case));
        g.result(interp).unwrap();
        let before = g.clone();

        prop_assert!(InterpolateForward.apply(&mut g, interp.node).is_rewritten());
        let expected: Vec<i64> = case.axes.iter().map(|&a| order[a] as i64).collect();
        prop_assert_eq!(folded_axes(&g, interp.node), expected);
        assert_same_results(&before, &g);
    }

    #[test]
    fn interpolate_backward_preserves_results((shape, order, case) in arb_interpolate_setup()) {
        let mut g = Graph::new();
        let x = param(&mut g, "x", &shape);
        let interp = interpolate_sizes(&mut g, x, &axes(&case), &case.sizes, attrs(&case));
        let t = g.transpose_by(interp, &order).unwrap();
        g.result(t).unwrap();
        let before = g.clone();

        prop_assert!(InterpolateBackward.apply(&mut g, interp.node).is_rewritten());
        let inverse = invert(&order);
        let expected: Vec<i64> = case.axes.iter().map(|&a| inverse[a] as i64).collect();
        prop_assert_eq!(folded_axes(&g, interp.node), expected);
        assert_same_results(&before, &g);
    }

    #[test]
    fn pass_preserves_results((shape, order, case) in arb_interpolate_setup()) {
        // Transpose -> Interpolate -> Concat with a plain input -> Transpose back.
        let mut g = Graph::new();
        let x = param(&mut g, "x", &shape);
        let t = g.transpose_by(x, &order).unwrap();
        let interp = interpolate_sizes(&mut g, t, &axes(&case), &case.sizes, attrs(&case));
        let out_shape = shape_of(&g, interp);
        let y = param(&mut g, "y", &out_shape);
        let concat = g.concat(&[interp, y], 0).unwrap();
        let back = g.transpose_by(concat, &invert(&order)).unwrap();
        g.result(back).unwrap();
        let before = g.clone();

        TransposeSinking::default().run(&mut g).unwrap();
        assert_same_results(&before, &g);
    }
}
