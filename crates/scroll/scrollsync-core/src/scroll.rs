//! Scroll position source: native offsets in, smoothed virtual offset out.
//!
//! Each frame the virtual offset moves toward the native one with exponential
//! decay, so scroll-bound animation is continuous even when native scroll
//! events arrive in coarse steps.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{Config, FrameSource};
use crate::ids::SubscriptionId;

/// Remaining distance after `smoothing_decay_s` is `e^-SETTLE_RATE` (under 1%).
const SETTLE_RATE: f32 = 5.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollSample {
    pub offset: f32,
    /// Pixels per second of the virtual offset.
    pub velocity: f32,
    /// Seconds, host clock.
    pub timestamp: f64,
}

/// Turns host timestamps into bounded frame steps.
#[derive(Clone, Debug)]
pub struct FrameClock {
    source: FrameSource,
    max_dt: f32,
    last: Option<f64>,
}

impl FrameClock {
    pub fn new(source: FrameSource, max_dt: f32) -> Self {
        Self {
            source,
            max_dt,
            last: None,
        }
    }

    /// Step in seconds since the previous tick, clamped to `max_dt`. The first
    /// tick, and any tick whose clock went backwards, yields zero.
    pub fn tick(&mut self, now: f64) -> f32 {
        let dt = match self.source {
            FrameSource::Polling { interval_ms } => {
                if self.last.is_some() {
                    interval_ms / 1000.0
                } else {
                    0.0
                }
            }
            FrameSource::Display => match self.last {
                Some(prev) if now > prev => (now - prev) as f32,
                _ => 0.0,
            },
        };
        self.last = Some(now);
        dt.min(self.max_dt)
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

type ScrollCallback = Box<dyn FnMut(&ScrollSample)>;

pub struct ScrollSource {
    decay_s: f32,
    snap_epsilon: f32,
    clock: FrameClock,
    limit: Option<f32>,
    target: f32,
    current: f32,
    last_dt: f32,
    last_sample: ScrollSample,
    primed: bool,
    next_sub: u32,
    subscribers: Vec<(SubscriptionId, ScrollCallback)>,
}

impl fmt::Debug for ScrollSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollSource")
            .field("decay_s", &self.decay_s)
            .field("target", &self.target)
            .field("current", &self.current)
            .field("limit", &self.limit)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl ScrollSource {
    pub fn new(cfg: &Config) -> Self {
        Self {
            decay_s: cfg.smoothing_decay_s,
            snap_epsilon: cfg.snap_epsilon,
            clock: FrameClock::new(cfg.frame_source, cfg.max_frame_dt_s),
            limit: None,
            target: 0.0,
            current: 0.0,
            last_dt: 0.0,
            last_sample: ScrollSample::default(),
            primed: false,
            next_sub: 0,
            subscribers: Vec::new(),
        }
    }

    /// Register a per-frame callback. Callbacks run in registration order.
    pub fn subscribe(&mut self, cb: impl FnMut(&ScrollSample) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_sub);
        self.next_sub = self.next_sub.wrapping_add(1);
        self.subscribers.push((id, Box::new(cb)));
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Current virtual (smoothed) offset.
    pub fn offset(&self) -> f32 {
        self.current
    }

    /// Last native offset fed in, after limit clamping.
    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn last_sample(&self) -> ScrollSample {
        self.last_sample
    }

    /// Step used by the most recent frame.
    pub fn last_dt(&self) -> f32 {
        self.last_dt
    }

    /// Maximum scrollable offset (document height minus viewport height).
    pub fn set_limit(&mut self, limit: Option<f32>) {
        self.limit = limit.map(|l| l.max(0.0));
        self.target = self.clamp(self.target);
        self.current = self.clamp(self.current);
    }

    /// Move both native and virtual offsets without smoothing.
    pub fn jump_to(&mut self, offset: f32) {
        let offset = self.clamp(offset);
        self.target = offset;
        self.current = offset;
        self.primed = true;
    }

    fn clamp(&self, v: f32) -> f32 {
        let v = if v.is_finite() { v.max(0.0) } else { 0.0 };
        match self.limit {
            Some(limit) => v.min(limit),
            None => v,
        }
    }

    /// Advance one frame. `native` is the host's raw scroll offset.
    pub fn frame(&mut self, now: f64, native: f32) -> ScrollSample {
        let dt = self.clock.tick(now);
        self.last_dt = dt;
        self.target = self.clamp(native);

        let prev = self.current;
        if !self.primed {
            self.current = self.target;
            self.primed = true;
        } else if self.decay_s <= 0.0 {
            self.current = self.target;
        } else {
            let alpha = 1.0 - (-dt * SETTLE_RATE / self.decay_s).exp();
            self.current += (self.target - self.current) * alpha;
            if (self.target - self.current).abs() < self.snap_epsilon {
                self.current = self.target;
            }
        }
        let velocity = if dt > 0.0 {
            (self.current - prev) / dt
        } else {
            0.0
        };

        let sample = ScrollSample {
            offset: self.current,
            velocity,
            timestamp: now,
        };
        self.last_sample = sample;
        for (_, cb) in self.subscribers.iter_mut() {
            cb(&sample);
        }
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn cfg(decay: f32) -> Config {
        Config {
            smoothing_decay_s: decay,
            ..Config::default()
        }
    }

    #[test]
    fn first_frame_adopts_native_offset() {
        let mut src = ScrollSource::new(&cfg(1.2));
        let s = src.frame(0.0, 500.0);
        assert_eq!(s.offset, 500.0);
        assert_eq!(s.velocity, 0.0);
    }

    #[test]
    fn smoothing_converges_monotonically() {
        let mut src = ScrollSource::new(&cfg(1.2));
        src.frame(0.0, 0.0);
        let mut last = 0.0;
        let mut t = 0.0;
        for _ in 0..240 {
            t += 1.0 / 60.0;
            let s = src.frame(t, 1000.0);
            assert!(s.offset >= last && s.offset <= 1000.0);
            last = s.offset;
        }
        assert_eq!(last, 1000.0);
    }

    #[test]
    fn zero_decay_tracks_native_exactly() {
        let mut src = ScrollSource::new(&cfg(0.0));
        src.frame(0.0, 0.0);
        assert_eq!(src.frame(0.016, 321.5).offset, 321.5);
    }

    #[test]
    fn backgrounded_gap_does_not_jump() {
        let mut src = ScrollSource::new(&cfg(1.2));
        src.frame(0.0, 0.0);
        src.frame(1.0 / 60.0, 1000.0);
        let before = src.offset();
        // Tab hidden for a minute, then one frame arrives.
        let after = src.frame(60.0, 1000.0).offset;
        let max_step = (1000.0 - before) * (1.0 - (-(1.0f32 / 30.0) * SETTLE_RATE / 1.2).exp());
        assert!(after - before <= max_step + 1e-3);
        assert!(after < 1000.0);
    }

    #[test]
    fn polling_reaches_same_final_state() {
        let mut display = ScrollSource::new(&cfg(1.2));
        let mut polling = ScrollSource::new(&Config {
            frame_source: FrameSource::Polling { interval_ms: 50.0 },
            ..cfg(1.2)
        });
        display.frame(0.0, 0.0);
        polling.frame(0.0, 0.0);
        let mut t = 0.0;
        for _ in 0..600 {
            t += 1.0 / 60.0;
            display.frame(t, 800.0);
        }
        for i in 0..200 {
            polling.frame(i as f64 * 0.05, 800.0);
        }
        assert_eq!(display.offset(), polling.offset());
    }

    #[test]
    fn subscribers_fire_in_registration_order_and_unsubscribe() {
        let mut src = ScrollSource::new(&cfg(0.0));
        let log = Rc::new(RefCell::new(Vec::new()));
        let l1 = log.clone();
        let a = src.subscribe(move |_| l1.borrow_mut().push("a"));
        let l2 = log.clone();
        src.subscribe(move |_| l2.borrow_mut().push("b"));
        src.frame(0.0, 10.0);
        assert_eq!(*log.borrow(), vec!["a", "b"]);
        assert!(src.unsubscribe(a));
        assert!(!src.unsubscribe(a));
        src.frame(0.1, 20.0);
        assert_eq!(*log.borrow(), vec!["a", "b", "b"]);
        assert_eq!(src.subscriber_count(), 1);
    }

    #[test]
    fn limit_clamps_offsets() {
        let mut src = ScrollSource::new(&cfg(0.0));
        src.set_limit(Some(400.0));
        assert_eq!(src.frame(0.0, 900.0).offset, 400.0);
        assert_eq!(src.frame(0.1, -50.0).offset, 0.0);
    }
}
