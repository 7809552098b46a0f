//! Stationarity debounce for the actor position
//!
//! A single detection can catch the actor mid-flight. The position is only
//! trusted after several consecutive frames agree within a jitter threshold.

use serde::Serialize;

use crate::game::Point;

/// Debounce phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StationarityPhase {
    /// Actor not seen in the last frame
    Unknown,
    /// Actor seen but not yet stable long enough
    Tracking,
    /// Actor stable for the required number of frames
    Confirmed,
}

/// Rolling detection state for the actor
#[derive(Debug, Clone, Serialize)]
pub struct DetectionState {
    jitter_threshold: u32,
    required_frames: u32,
    phase: StationarityPhase,
    last_observed: Option<Point>,
    stationary_frames: u32,
    confirmed: Option<Point>,
}

impl DetectionState {
    /// `jitter_threshold` is an exclusive L1 bound in pixels
    pub fn new(jitter_threshold: u32, required_frames: u32) -> Self {
        Self {
            jitter_threshold,
            required_frames: required_frames.max(1),
            phase: StationarityPhase::Unknown,
            last_observed: None,
            stationary_frames: 0,
            confirmed: None,
        }
    }

    /// Feed one frame's detection. Returns the confirmed position when the
    /// actor is (still) confirmed after this frame.
    ///
    /// The published point is the raw reading of the confirming frame.
    pub fn observe(&mut self, observation: Option<Point>) -> Option<Point> {
        let Some(point) = observation else {
            self.reset();
            return None;
        };

        match self.last_observed {
            None => {
                self.stationary_frames = 1;
                self.phase = StationarityPhase::Tracking;
            }
            Some(previous) if previous.manhattan_to(point) < self.jitter_threshold => {
                self.stationary_frames += 1;
            }
            Some(previous) => {
                log::debug!(
                    "Actor moved {}px ({} -> {}), restarting debounce",
                    previous.manhattan_to(point),
                    previous,
                    point
                );
                self.stationary_frames = 1;
                self.phase = StationarityPhase::Tracking;
                self.confirmed = None;
            }
        }
        self.last_observed = Some(point);

        if self.stationary_frames >= self.required_frames {
            if self.phase != StationarityPhase::Confirmed {
                log::debug!("Actor confirmed at {}", point);
            }
            self.phase = StationarityPhase::Confirmed;
            self.confirmed = Some(point);
        }
        self.confirmed
    }

    /// Forget everything; the next detection starts a fresh debounce
    pub fn reset(&mut self) {
        self.phase = StationarityPhase::Unknown;
        self.last_observed = None;
        self.stationary_frames = 0;
        self.confirmed = None;
    }

    pub fn phase(&self) -> StationarityPhase {
        self.phase
    }

    pub fn stationary_frames(&self) -> u32 {
        self.stationary_frames
    }

    pub fn last_observed(&self) -> Option<Point> {
        self.last_observed
    }

    pub fn confirmed(&self) -> Option<Point> {
        self.confirmed
    }

    pub fn required_frames(&self) -> u32 {
        self.required_frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_confirms_on_third_stable_frame() {
        let mut state = DetectionState::new(5, 3);

        assert_eq!(state.observe(Some(Point::new(500, 500))), None);
        assert_eq!(state.phase(), StationarityPhase::Tracking);
        assert_eq!(state.observe(Some(Point::new(502, 501))), None);
        assert_eq!(state.stationary_frames(), 2);

        let confirmed = state.observe(Some(Point::new(501, 500)));
        assert_eq!(confirmed, Some(Point::new(501, 500)));
        assert_eq!(state.stationary_frames(), 3);
        assert_eq!(state.phase(), StationarityPhase::Confirmed);
    }

    #[test]
    fn test_large_move_resets_to_one() {
        let mut state = DetectionState::new(5, 3);
        state.observe(Some(Point::new(100, 100)));
        state.observe(Some(Point::new(101, 100)));
        state.observe(Some(Point::new(101, 101)));
        assert_eq!(state.phase(), StationarityPhase::Confirmed);

        // L1 displacement of exactly the threshold is not stable
        assert_eq!(state.observe(Some(Point::new(104, 103))), None);
        assert_eq!(state.stationary_frames(), 1);
        assert_eq!(state.phase(), StationarityPhase::Tracking);
        assert_eq!(state.last_observed(), Some(Point::new(104, 103)));
        assert_eq!(state.confirmed(), None);
    }

    #[test]
    fn test_missing_actor_resets_to_unknown() {
        let mut state = DetectionState::new(5, 3);
        state.observe(Some(Point::new(10, 10)));
        state.observe(Some(Point::new(10, 10)));
        assert_eq!(state.observe(None), None);

        assert_eq!(state.phase(), StationarityPhase::Unknown);
        assert_eq!(state.stationary_frames(), 0);
        assert_eq!(state.last_observed(), None);
    }

    #[test]
    fn test_confirmation_follows_pairwise_drift() {
        let mut state = DetectionState::new(5, 3);
        state.observe(Some(Point::new(0, 0)));
        state.observe(Some(Point::new(3, 0)));
        // 6px from the first frame but only 3px from the previous one
        assert_eq!(state.observe(Some(Point::new(6, 0))), Some(Point::new(6, 0)));
    }

    #[test]
    fn test_random_sequences_respect_debounce() {
        let mut rng = StdRng::seed_from_u64(7);
        let threshold = 5;
        let required = 3;

        for _ in 0..200 {
            let mut state = DetectionState::new(threshold, required);
            let mut previous: Option<Point> = None;
            let mut run = 0u32;
            let mut point = Point::new(500, 500);

            for _ in 0..40 {
                let observation = if rng.gen_bool(0.1) {
                    None
                } else {
                    let step = if rng.gen_bool(0.3) { 12 } else { 2 };
                    point = point.offset(rng.gen_range(-step..=step), rng.gen_range(-step..=step));
                    Some(point)
                };

                run = match (previous, observation) {
                    (_, None) => 0,
                    (None, Some(_)) => 1,
                    (Some(prev), Some(p)) if prev.manhattan_to(p) < threshold => run + 1,
                    (Some(_), Some(_)) => 1,
                };
                previous = observation;

                let confirmed = state.observe(observation);
                assert_eq!(state.stationary_frames(), run);
                assert_eq!(confirmed.is_some(), run >= required);
                if let Some(p) = confirmed {
                    assert_eq!(Some(p), observation);
                }
            }
        }
    }
}
