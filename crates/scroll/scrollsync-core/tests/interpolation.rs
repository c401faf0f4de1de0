mod common;

use scrollsync_core::timeline::{ResolvedPoint, ResolvedTrack};
use scrollsync_core::{sample_track, Ease, StyleValue};

fn track(ease: Ease, from: StyleValue, to: StyleValue) -> ResolvedTrack {
    ResolvedTrack {
        property: "x".into(),
        points: vec![
            ResolvedPoint {
                progress: 0.0,
                value: from,
                ease: Ease::Linear,
            },
            ResolvedPoint {
                progress: 1.0,
                value: to,
                ease,
            },
        ],
    }
}

const EASES: [Ease; 9] = [
    Ease::Linear,
    Ease::QuadIn,
    Ease::QuadOut,
    Ease::QuadInOut,
    Ease::CubicIn,
    Ease::CubicOut,
    Ease::CubicInOut,
    Ease::ExpoOut,
    Ease::CubicBezier {
        x1: 0.42,
        y1: 0.0,
        x2: 0.58,
        y2: 1.0,
    },
];

#[test]
fn endpoints_are_exact_for_every_ease() {
    let pairs = [
        (StyleValue::Px(0.0), StyleValue::Px(-600.0)),
        (StyleValue::Number(0.1), StyleValue::Number(0.7)),
        (StyleValue::Percent(-50.0), StyleValue::Percent(0.0)),
        (StyleValue::Deg(33.3), StyleValue::Deg(-12.9)),
    ];
    for ease in EASES {
        for (from, to) in &pairs {
            let t = track(ease, from.clone(), to.clone());
            assert_eq!(sample_track(&t, 0.0).as_ref(), Some(from), "{ease:?}");
            assert_eq!(sample_track(&t, 1.0).as_ref(), Some(to), "{ease:?}");
        }
    }
}

#[test]
fn no_overshoot_between_endpoints() {
    for ease in EASES {
        let t = track(ease, StyleValue::Px(100.0), StyleValue::Px(-300.0));
        for i in 0..=200 {
            let p = i as f32 / 200.0;
            let v = sample_track(&t, p).and_then(|v| v.scalar()).unwrap();
            assert!((-300.001..=100.001).contains(&v), "{ease:?} p={p} v={v}");
        }
    }
}

#[test]
fn out_of_range_progress_saturates() {
    let t = track(Ease::CubicOut, StyleValue::Px(0.0), StyleValue::Px(10.0));
    assert_eq!(sample_track(&t, -0.5), Some(StyleValue::Px(0.0)));
    assert_eq!(sample_track(&t, 1.5), Some(StyleValue::Px(10.0)));
    assert_eq!(sample_track(&t, f32::NAN), Some(StyleValue::Px(0.0)));
}

#[test]
fn colors_blend_per_channel() {
    let t = track(
        Ease::Linear,
        StyleValue::Color([1.0, 0.0, 0.0, 1.0]),
        StyleValue::Color([0.0, 0.0, 1.0, 0.0]),
    );
    let mid = sample_track(&t, 0.5).unwrap();
    assert_eq!(mid.to_css(), "rgba(128, 0, 128, 0.5)");
}

#[test]
fn shared_target_merges_distinct_properties() {
    use common::Harness;
    use scrollsync_core::{Edge, EndSpec, Keyframe, NodeId, TimelineConfig, TriggerPoint};

    let mut h = Harness::new(common::direct_config(), "landing-desktop");
    let scope = h.engine.create_scope(NodeId(3));
    let range = || {
        TimelineConfig::new(
            NodeId(1),
            TriggerPoint::new(Edge::Top, Edge::Top),
            EndSpec::At(TriggerPoint::new(Edge::Bottom, Edge::Top)),
        )
        .targets(vec![NodeId(3)])
    };
    h.engine
        .create_timeline(
            scope,
            range()
                .keyframe(Keyframe::new(0.0).with("opacity", StyleValue::Number(1.0)))
                .keyframe(Keyframe::new(1.0).with("opacity", StyleValue::Number(0.0))),
        )
        .unwrap();
    h.engine
        .create_timeline(
            scope,
            range()
                .keyframe(Keyframe::new(0.0).with("y", StyleValue::Px(0.0)))
                .keyframe(Keyframe::new(1.0).with("y", StyleValue::Px(-80.0))),
        )
        .unwrap();

    h.frame(400.0);
    assert_eq!(h.style(3, "opacity").as_deref(), Some("0.5"));
    assert_eq!(h.style(3, "transform").as_deref(), Some("translate(0px, -40px)"));

    // unchanged values are not written again
    let out = h.frame(400.0);
    assert!(out.styles.is_empty());
}
