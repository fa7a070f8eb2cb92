//! Unit tests for provenance tracking.

use std::panic::Location;

use crate::graph::Graph;
use crate::provenance::{PassName, ProvenanceEvent, SourceLocation, format_chain, get_relative_location};
use crate::shape::PartialShape;
use crate::types::DType;

#[test]
fn test_created_event_points_at_caller() {
    let mut g = Graph::new();
    let line = line!() + 1;
    let x = g.parameter("x", DType::F32, PartialShape::from_static(&[2])).unwrap();

    let events = &g.node(x.node).unwrap().ext().provenance;
    assert_eq!(events.len(), 1);
    match &events[0] {
        ProvenanceEvent::Created { location } => {
            assert!(location.file.ends_with("provenance.rs"), "got {}", location.file);
            assert_eq!(location.line, line);
        }
        other => panic!("expected Created event, got {other}"),
    }
}

#[test]
fn test_chain_follows_transformations() {
    let mut g = Graph::new();
    let x = g.parameter("x", DType::F32, PartialShape::from_static(&[2, 3])).unwrap();
    let t = g.transpose_by(x, &[1, 0]).unwrap();
    let u = g.transpose_by(t, &[1, 0]).unwrap();
    g.record_transform(t.node, x.node, PassName::TransposeFuse).unwrap();
    g.record_transform(u.node, t.node, PassName::TransposeSinkingConcatForward).unwrap();

    let chain = g.provenance_chain(u.node);

    // x: Created; t: Created + Transformed; u: Created + Transformed.
    assert_eq!(chain.len(), 5);
    assert!(matches!(chain[0], ProvenanceEvent::Created { .. }));
    assert!(matches!(
        chain[4],
        ProvenanceEvent::Transformed { pass_name: PassName::TransposeSinkingConcatForward, .. }
    ));
}

#[test]
fn test_chain_survives_cycles() {
    let mut g = Graph::new();
    let x = g.parameter("x", DType::F32, PartialShape::from_static(&[2])).unwrap();
    let y = g.parameter("y", DType::F32, PartialShape::from_static(&[2])).unwrap();
    g.record_transform(x.node, y.node, PassName::RewritePattern).unwrap();
    g.record_transform(y.node, x.node, PassName::RewritePattern).unwrap();

    assert_eq!(g.provenance_chain(x.node).len(), 4);
}

#[test]
fn test_format_chain() {
    let chain = vec![
        ProvenanceEvent::Created { location: SourceLocation::new("ir/src/lib.rs", 10, 5) },
        ProvenanceEvent::Transformed { from: crate::graph::NodeId::from_index(3), pass_name: PassName::TransposeFuse },
    ];

    assert_eq!(
        format_chain(&chain),
        "\n  [0] Created at ir/src/lib.rs:10:5\n  [1] Transformed from node #3 by transpose_fuse"
    );
}

#[test]
fn test_error_provenance_logging() {
    use crate::error::{Error, log_provenance};

    let mut g = Graph::new();
    let x = g.parameter("x", DType::F32, PartialShape::from_static(&[2])).unwrap();
    let error = Error::RewriteLimit { sweeps: 1 };

    // Must not panic for live nodes or for ids the graph does not know.
    log_provenance(&g, x.node, &error);
    log_provenance(&g, crate::graph::NodeId::from_index(999), &error);
}

#[test]
fn test_relative_location() {
    let rel = get_relative_location(Location::caller());
    assert!(!rel.starts_with('/'), "expected workspace-relative path, got {rel}");
}
