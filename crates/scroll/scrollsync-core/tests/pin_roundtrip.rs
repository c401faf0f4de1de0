mod common;

use common::Harness;
use scrollsync_core::{
    Edge, EndSpec, Event, Keyframe, NodeId, Rect, StyleValue, TimelineConfig, TriggerPoint,
    Viewport,
};

fn grow(trigger: u32) -> TimelineConfig {
    TimelineConfig::new(
        NodeId(trigger),
        TriggerPoint::new(Edge::Top, Edge::Top),
        EndSpec::Distance(scrollsync_core::timeline::Distance::Px(1000.0)),
    )
    .pinned()
    .keyframe(Keyframe::new(0.0).with("scale", StyleValue::Number(1.0)))
    .keyframe(Keyframe::new(1.0).with("scale", StyleValue::Number(2.0)))
}

#[test]
fn pin_then_unpin_leaves_no_residue() {
    let mut h = Harness::new(common::direct_config(), "landing-desktop");
    h.doc.set_inline(NodeId(1), "position", "relative");
    h.doc.set_inline(NodeId(1), "top", "4px");
    let before = h.snapshot(&[1]);

    let scope = h.engine.create_scope(NodeId(1));
    h.engine.create_timeline(scope, grow(1)).unwrap();

    h.frame(0.0);
    h.frame(500.0);
    assert_eq!(h.style(1, "position").as_deref(), Some("fixed"));
    assert_eq!(h.doc.spacer_count(), 1);

    // scrolling back above the start returns the element to flow
    h.frame(0.0);
    assert_eq!(h.doc.spacer_count(), 0);
    assert_eq!(h.style(1, "position").as_deref(), Some("relative"));
    assert_eq!(h.style(1, "top").as_deref(), Some("4px"));

    h.dispose(scope);
    assert_eq!(h.snapshot(&[1]), before);
}

#[test]
fn pin_does_not_outlive_the_range_end() {
    let mut h = Harness::new(common::direct_config(), "landing-desktop");
    let scope = h.engine.create_scope(NodeId(1));
    h.engine.create_timeline(scope, grow(1)).unwrap();
    h.frame(500.0);
    assert_eq!(h.doc.spacer_count(), 1);
    h.frame(1000.0);
    assert_eq!(h.doc.spacer_count(), 0);
    assert_eq!(h.style(1, "position"), None);
    // animation keeps its final value after unpinning
    assert_eq!(h.style(1, "transform").as_deref(), Some("scale(2, 2)"));
}

#[test]
fn stale_rectangle_forces_two_phase_repin() {
    let mut h = Harness::new(common::direct_config(), "landing-desktop");
    let scope = h.engine.create_scope(NodeId(10));
    let tl = h.engine.create_timeline(scope, grow(10)).unwrap();
    h.frame(2500.0);
    assert_eq!(h.number(10, "width"), 1000.0);

    // narrower viewport: the section reflows
    h.doc
        .set_rect(NodeId(10), Rect::new(0.0, 2100.0, 700.0, 900.0));
    let out = h.frame_with_viewport(2500.0, Viewport::new(700.0, 800.0));
    assert!(out
        .events
        .iter()
        .any(|e| matches!(e, Event::StaleRectangle { timeline, .. } if *timeline == tl)));
    assert_eq!(h.doc.spacer_count(), 0);
    assert_eq!(h.style(10, "position"), None);

    let out = h.frame(2500.0);
    assert!(out.events.iter().any(|e| matches!(e, Event::Pinned { .. })));
    assert_eq!(h.number(10, "width"), 700.0);
    assert_eq!(h.number(10, "height"), 900.0);
    assert_eq!(h.number(10, "top"), 0.0);
    assert_eq!(h.doc.spacer_count(), 1);
}
