use test_case::test_case;

use crate::test::helpers::transposed_concat;
use crate::transpose_sinking::{SinkingConfig, TransposeSinking};

fn lookup(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
    move |key: &str| vars.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
}

#[test]
fn test_default_enables_everything() {
    let config = SinkingConfig::default();
    assert!(config.forward && config.backward && config.fuse);
    assert_eq!(config.max_sweeps, 64);
    assert!(!config.is_disabled());
    assert_eq!(SinkingConfig::builder().build(), config);
}

#[test]
fn test_builder_overrides() {
    let config = SinkingConfig::builder().backward(false).max_sweeps(8).build();
    assert!(config.forward);
    assert!(!config.backward);
    assert!(config.fuse);
    assert_eq!(config.max_sweeps, 8);

    let off = SinkingConfig::builder().forward(false).backward(false).build();
    assert!(off.is_disabled());
}

#[test]
fn test_rule_groups_follow_config() {
    let pass = TransposeSinking::default();
    // Concat and Interpolate rules, plus fusion under Transpose.
    assert_eq!(pass.forward_rules().len(), 3);
    assert_eq!(pass.backward_rules().len(), 3);

    let pass = TransposeSinking::new(SinkingConfig::builder().fuse(false).build());
    assert_eq!(pass.forward_rules().len(), 2);
    assert_eq!(pass.backward_rules().len(), 2);
    assert!(!pass.config().fuse);
}

#[test_case(&[] => (true, true, true, 64); "nothing set")]
#[test_case(&[("AXION_NO_TRANSPOSE_SINKING", "1")] => (false, false, true, 64); "disable all")]
#[test_case(&[("AXION_NO_BACKWARD_SINKING", "")] => (true, false, true, 64); "disable backward only")]
#[test_case(&[("AXION_NO_TRANSPOSE_FUSE", "1")] => (true, true, false, 64); "disable fuse")]
#[test_case(&[("AXION_REWRITE_MAX_SWEEPS", "12")] => (true, true, true, 12); "sweep limit")]
#[test_case(&[("AXION_REWRITE_MAX_SWEEPS", "0")] => (true, true, true, 64); "zero sweeps keep default")]
#[test_case(&[("AXION_REWRITE_MAX_SWEEPS", "many")] => (true, true, true, 64); "invalid sweeps keep default")]
#[test_case(
    &[("AXION_NO_BACKWARD_SINKING", "1"), ("AXION_NO_TRANSPOSE_FUSE", "1"), ("AXION_REWRITE_MAX_SWEEPS", "3")]
    => (true, false, false, 3);
    "combined"
)]
fn test_from_lookup(vars: &'static [(&'static str, &'static str)]) -> (bool, bool, bool, usize) {
    let config = SinkingConfig::from_lookup(lookup(vars));
    (config.forward, config.backward, config.fuse, config.max_sweeps)
}

#[test]
fn test_zero_sweeps_keep_default() {
    let config = SinkingConfig::builder().max_sweeps(0).build();
    assert_eq!(config.max_sweeps, 64);

    let (mut g, _) = transposed_concat(&[&[2, 3, 4], &[2, 3, 4]], &[2, 0, 1], 0);
    let stats = TransposeSinking::new(config).run(&mut g).unwrap();
    assert_eq!(stats.count("transpose_sinking_concat_forward"), 1);
}
