// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stability tracker — the multi-frame gate in front of auto-capture.
//
//   Idle ──Good──▶ Accumulating ──count == threshold──▶ Armed
//    ▲                 │  ▲                               │
//    └──── non-Good ───┘  └── Good, moved: count = 1      │
//    └────────────────────── reset() ─────────────────────┘
//
// Armed is sticky: only an explicit reset (after a capture, or when scanning
// stops) returns the tracker to Idle, so one steady document yields exactly
// one auto-capture.

use docscan_core::config::StabilityConfig;
use docscan_core::{CaptureRequest, FrameSize, QualityVerdict, Quadrilateral, TrackedQuad};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StabilityPhase {
    #[default]
    Idle,
    Accumulating,
    Armed,
}

/// Snapshot of the tracker's state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StabilityState {
    pub consecutive_good: u32,
    pub last_quad: Option<TrackedQuad>,
    pub phase: StabilityPhase,
}

impl StabilityState {
    pub fn is_armed(&self) -> bool {
        self.phase == StabilityPhase::Armed
    }
}

/// Counts consecutive steady Good frames and fires one auto-capture request
/// when the count reaches the configured threshold.
///
/// Not thread-safe by itself; the owning pipeline is the single writer.
#[derive(Debug, Clone, Default)]
pub struct StabilityTracker {
    config: StabilityConfig,
    state: StabilityState,
}

impl StabilityTracker {
    pub fn new(config: StabilityConfig) -> Self {
        Self {
            config,
            state: StabilityState::default(),
        }
    }

    pub fn state(&self) -> StabilityState {
        self.state
    }

    pub fn threshold(&self) -> u32 {
        self.config.auto_capture_threshold
    }

    /// Change the number of frames required to arm. 0 disables auto-capture.
    pub fn set_threshold(&mut self, frames: u32) {
        debug!(frames, "Auto-capture threshold changed");
        self.config.auto_capture_threshold = frames;
    }

    /// Back to Idle. Called after every capture and when scanning stops.
    pub fn reset(&mut self) {
        if self.state.phase != StabilityPhase::Idle {
            debug!(phase = ?self.state.phase, "Stability tracker reset");
        }
        self.state = StabilityState::default();
    }

    /// Fold one upright frame's verdict into the state.
    ///
    /// Returns an auto [`CaptureRequest`] on the frame that arms the tracker
    /// and `None` on every other frame.
    pub fn observe(
        &mut self,
        verdict: QualityVerdict,
        quad: Option<&Quadrilateral>,
        frame: FrameSize,
    ) -> Option<CaptureRequest> {
        self.observe_tracked(verdict, quad.map(|quad| TrackedQuad::new(*quad, frame)))
    }

    /// Like [`observe`](Self::observe), for a quad that already carries the
    /// size and orientation of its frame. A change of orientation counts as
    /// movement.
    pub fn observe_tracked(
        &mut self,
        verdict: QualityVerdict,
        quad: Option<TrackedQuad>,
    ) -> Option<CaptureRequest> {
        if self.state.is_armed() {
            return None;
        }

        let (QualityVerdict::Good, Some(current)) = (verdict, quad) else {
            if self.state.phase != StabilityPhase::Idle {
                debug!(?verdict, count = self.state.consecutive_good, "Streak broken");
            }
            self.state = StabilityState::default();
            return None;
        };

        self.state.consecutive_good = match (self.state.phase, self.state.last_quad) {
            (StabilityPhase::Accumulating, Some(last)) if self.is_steady(&last, &current) => {
                self.state.consecutive_good + 1
            }
            (StabilityPhase::Accumulating, Some(_)) => {
                debug!("Rectangle moved; counting from one");
                1
            }
            _ => 1,
        };
        self.state.last_quad = Some(current);
        self.state.phase = StabilityPhase::Accumulating;

        let threshold = self.config.auto_capture_threshold;
        if threshold > 0 && self.state.consecutive_good >= threshold {
            self.state.phase = StabilityPhase::Armed;
            info!(frames = self.state.consecutive_good, "Rectangle stable; auto-capture armed");
            return Some(CaptureRequest::Auto { quad: current });
        }
        None
    }

    fn is_steady(&self, last: &TrackedQuad, current: &TrackedQuad) -> bool {
        if last.orientation != current.orientation {
            return false;
        }
        let previous = last.quad_for(current.frame_size);
        let tolerance = self.config.max_corner_displacement_fraction
            * current.frame_size.max_dimension() as f32;
        previous.max_corner_displacement(&current.quad) <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: FrameSize = FrameSize::new(400, 300);

    fn tracker(threshold: u32) -> StabilityTracker {
        StabilityTracker::new(StabilityConfig {
            auto_capture_threshold: threshold,
            ..StabilityConfig::default()
        })
    }

    fn page() -> Quadrilateral {
        Quadrilateral::from_rect(50.0, 40.0, 300.0, 220.0)
    }

    fn good(t: &mut StabilityTracker, quad: &Quadrilateral) -> Option<CaptureRequest> {
        t.observe(QualityVerdict::Good, Some(quad), FRAME)
    }

    #[test]
    fn arms_exactly_on_threshold_frame() {
        let mut t = tracker(5);
        let quad = page();
        for frame in 1..5 {
            assert!(good(&mut t, &quad).is_none(), "armed early on frame {frame}");
            assert_eq!(t.state().consecutive_good, frame);
        }
        let request = good(&mut t, &quad).expect("fifth frame arms");
        assert!(request.is_auto());
        assert_eq!(request.source_quad().map(|q| q.quad), Some(quad));
        assert!(t.state().is_armed());
    }

    #[test]
    fn armed_tracker_stays_silent_until_reset() {
        let mut t = tracker(3);
        let quad = page();
        let requests = (0..20).filter_map(|_| good(&mut t, &quad)).count();
        assert_eq!(requests, 1);

        // Even a bad frame does not leave Armed.
        t.observe(QualityVerdict::None, None, FRAME);
        assert!(t.state().is_armed());

        t.reset();
        assert_eq!(t.state(), StabilityState::default());
        let again = (0..3).filter_map(|_| good(&mut t, &quad)).count();
        assert_eq!(again, 1);
    }

    #[test]
    fn single_bad_frame_breaks_the_streak() {
        let mut t = tracker(5);
        let quad = page();
        for _ in 0..4 {
            assert!(good(&mut t, &quad).is_none());
        }
        assert!(t.observe(QualityVerdict::BadAngle, Some(&quad), FRAME).is_none());
        assert_eq!(t.state().consecutive_good, 0);
        assert_eq!(t.state().phase, StabilityPhase::Idle);
        for _ in 0..4 {
            assert!(good(&mut t, &quad).is_none());
        }
        assert!(!t.state().is_armed());
    }

    #[test]
    fn small_drift_keeps_counting() {
        let mut t = tracker(10);
        for i in 0..4 {
            // 3 px per frame against a 20 px tolerance (5% of 400).
            let quad = Quadrilateral::from_rect(50.0 + 3.0 * i as f32, 40.0, 300.0, 220.0);
            good(&mut t, &quad);
        }
        assert_eq!(t.state().consecutive_good, 4);
    }

    #[test]
    fn moved_rectangle_restarts_at_one() {
        let mut t = tracker(10);
        for _ in 0..3 {
            good(&mut t, &page());
        }
        let moved = Quadrilateral::from_rect(120.0, 90.0, 200.0, 150.0);
        assert!(good(&mut t, &moved).is_none());
        assert_eq!(t.state().consecutive_good, 1);
        assert_eq!(t.state().phase, StabilityPhase::Accumulating);
        assert_eq!(t.state().last_quad.map(|q| q.quad), Some(moved));
    }

    #[test]
    fn zero_threshold_never_arms() {
        let mut t = tracker(0);
        let quad = page();
        assert!((0..50).all(|_| good(&mut t, &quad).is_none()));
        assert_eq!(t.state().consecutive_good, 50);
    }

    #[test]
    fn good_verdict_without_quad_counts_as_none() {
        let mut t = tracker(2);
        good(&mut t, &page());
        assert!(t.observe(QualityVerdict::Good, None, FRAME).is_none());
        assert_eq!(t.state().phase, StabilityPhase::Idle);
    }

    #[test]
    fn displacement_is_compared_at_the_same_resolution() {
        let mut t = tracker(10);
        good(&mut t, &page());
        // Same page reported on a frame of twice the resolution.
        let doubled = Quadrilateral::from_rect(100.0, 80.0, 600.0, 440.0);
        t.observe(QualityVerdict::Good, Some(&doubled), FrameSize::new(800, 600));
        assert_eq!(t.state().consecutive_good, 2);
    }

    #[test]
    fn rotated_frame_restarts_the_streak() {
        use docscan_core::{ResolvedOrientation, Rotation};

        let mut t = tracker(10);
        for _ in 0..3 {
            good(&mut t, &page());
        }
        // The same corners reported after the buffer was turned a quarter.
        let turned = TrackedQuad::new(page(), FrameSize::new(300, 400)).in_orientation(
            ResolvedOrientation {
                rotation: Rotation::Deg90,
                mirrored: false,
            },
        );
        assert!(t.observe_tracked(QualityVerdict::Good, Some(turned)).is_none());
        assert_eq!(t.state().consecutive_good, 1);
        assert_eq!(t.state().last_quad, Some(turned));
    }
}
