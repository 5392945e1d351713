//! Detects an agent failing to make progress.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::Duration;

use nalgebra::Point3;
use tokio::time::Instant;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Counts consecutive evaluations in which the agent moved less than a threshold.
///
/// An evaluation only takes effect once a full window has elapsed since the previous one. The
/// displacement is measured from the position recorded at that previous evaluation.
#[derive(Debug, Clone)]
pub struct StuckDetector {
    last_position: Point3<f64>,
    last_check: Instant,
    count: u32,

    min_movement_m: f64,
    window: Duration,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl StuckDetector {
    pub fn new(position: Point3<f64>, now: Instant, min_movement_m: f64, window: Duration) -> Self {
        Self {
            last_position: position,
            last_check: now,
            count: 0,
            min_movement_m,
            window,
        }
    }

    /// Evaluate the agent's progress, returning the current stuck count.
    pub fn evaluate(&mut self, position: &Point3<f64>, now: Instant) -> u32 {
        if now.saturating_duration_since(self.last_check) < self.window {
            return self.count;
        }

        let moved_m = nalgebra::distance(position, &self.last_position);
        if moved_m < self.min_movement_m {
            self.count += 1;
        } else {
            self.count = 0;
        }

        self.last_position = *position;
        self.last_check = now;

        self.count
    }

    /// Start counting again from the given position.
    pub fn reset(&mut self, position: Point3<f64>, now: Instant) {
        self.last_position = position;
        self.last_check = now;
        self.count = 0;
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stuck_counting() {
        let t0 = Instant::now();
        let at = |s: u64| t0 + Duration::from_secs(s);
        let window = Duration::from_secs(3);
        let origin = Point3::new(0.0, 64.0, 0.0);
        let nudged = Point3::new(0.3, 64.0, 0.0);
        let moved = Point3::new(1.3, 64.0, 0.0);
        let mut det = StuckDetector::new(origin, t0, 0.5, window);

        // Inside the window nothing is evaluated
        assert_eq!(det.evaluate(&origin, at(1)), 0);

        assert_eq!(det.evaluate(&origin, at(3)), 1);
        assert_eq!(det.evaluate(&nudged, at(6)), 2);

        // Progress resets the count
        assert_eq!(det.evaluate(&moved, at(9)), 0);
        assert_eq!(det.evaluate(&moved, at(12)), 1);

        det.reset(origin, at(12));
        assert_eq!(det.count(), 0);
    }
}
