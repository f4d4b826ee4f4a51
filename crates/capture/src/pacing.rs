use std::time::{Duration, Instant};

/// Fixed capture cadence: each cycle gets a budget of one frame interval.
pub struct CapturePacing {
    frame_duration: Duration,
}

impl CapturePacing {
    pub fn new(target_fps: f64) -> Self {
        let fps = if target_fps.is_finite() && target_fps > 0.0 {
            target_fps
        } else {
            30.0
        };
        Self {
            frame_duration: Duration::from_secs_f64(1.0 / fps),
        }
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// Time left in the budget of a cycle that began at `started`, or `None`
    /// when the cycle overran.
    pub fn remaining(&self, started: Instant) -> Option<Duration> {
        self.frame_duration
            .checked_sub(started.elapsed())
            .filter(|left| !left.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirty_fps_budget() {
        let pacing = CapturePacing::new(30.0);
        let ms = pacing.frame_duration().as_secs_f64() * 1000.0;
        assert!((ms - 33.333).abs() < 0.01);
    }

    #[test]
    fn invalid_rate_falls_back_to_thirty() {
        assert_eq!(
            CapturePacing::new(0.0).frame_duration(),
            CapturePacing::new(30.0).frame_duration()
        );
        assert_eq!(
            CapturePacing::new(f64::NAN).frame_duration(),
            CapturePacing::new(30.0).frame_duration()
        );
    }

    #[test]
    fn overrun_has_no_remaining_budget() {
        let pacing = CapturePacing::new(1000.0);
        let started = Instant::now() - Duration::from_millis(5);
        assert!(pacing.remaining(started).is_none());
    }

    #[test]
    fn fresh_cycle_has_budget_left() {
        let pacing = CapturePacing::new(1.0);
        let left = pacing.remaining(Instant::now()).unwrap();
        assert!(left > Duration::from_millis(900));
    }
}
