//! Step trajectories advanced by the rig each tick.

use std::time::Duration;

use strider_core::{Vec3, UP};

/// Point on the step arc at normalised progress `t`.
///
/// The planar path is a straight interpolation from `start` to `target`; a
/// parabola adds `lift_height * 4t(1 - t)` along the up axis, which is zero at
/// both ends and peaks at `lift_height` halfway through.
#[must_use]
pub fn arc_point(start: Vec3, target: Vec3, lift_height: f32, t: f32) -> Vec3 {
    let t = t.clamp(0.0, 1.0);
    start.lerp(target, t) + UP * (lift_height * 4.0 * t * (1.0 - t))
}

/// In-flight step owned by exactly one limb.
#[derive(Clone, Copy, Debug)]
pub(crate) struct StepTask {
    start: Vec3,
    target: Vec3,
    elapsed: Duration,
    duration: Duration,
}

/// Outcome of advancing a step by one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum StepProgress {
    /// The limb is still travelling; the point is its current foot anchor.
    Airborne(Vec3),
    /// The full duration elapsed; the point is the exact stored target.
    Landed(Vec3),
}

impl StepTask {
    pub(crate) fn new(start: Vec3, target: Vec3, duration: Duration) -> Self {
        Self {
            start,
            target,
            elapsed: Duration::ZERO,
            duration,
        }
    }

    pub(crate) fn advance(&mut self, dt: Duration, lift_height: f32) -> StepProgress {
        self.elapsed = self.elapsed.saturating_add(dt);
        if self.elapsed >= self.duration {
            return StepProgress::Landed(self.target);
        }

        StepProgress::Airborne(arc_point(
            self.start,
            self.target,
            lift_height,
            self.progress(),
        ))
    }

    pub(crate) fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arc_touches_endpoints_and_peaks_halfway() {
        let start = Vec3::new(0.0, 1.0, 0.0);
        let target = Vec3::new(2.0, 1.0, 0.0);

        assert_eq!(arc_point(start, target, 0.4, 0.0), start);
        assert_eq!(arc_point(start, target, 0.4, 1.0), target);

        let apex = arc_point(start, target, 0.4, 0.5);
        assert!((apex - Vec3::new(1.0, 1.4, 0.0)).length() < 1e-6);
    }

    #[test]
    fn arc_clamps_progress() {
        let start = Vec3::ZERO;
        let target = Vec3::X;
        assert_eq!(arc_point(start, target, 1.0, 1.5), target);
        assert_eq!(arc_point(start, target, 1.0, -0.5), start);
    }

    #[test]
    fn task_lands_on_exact_target_once_duration_elapses() {
        let target = Vec3::new(0.1, 0.2, 0.3);
        let mut task = StepTask::new(Vec3::ZERO, target, Duration::from_millis(100));

        assert!(matches!(
            task.advance(Duration::from_millis(60), 0.5),
            StepProgress::Airborne(_)
        ));
        assert_eq!(
            task.advance(Duration::from_millis(60), 0.5),
            StepProgress::Landed(target)
        );
    }

    #[test]
    fn task_is_not_finished_one_nanosecond_early() {
        let mut task = StepTask::new(Vec3::ZERO, Vec3::X, Duration::from_millis(100));
        let almost = Duration::from_millis(100) - Duration::from_nanos(1);

        assert!(matches!(
            task.advance(almost, 0.0),
            StepProgress::Airborne(_)
        ));
        assert!((task.progress() - 1.0).abs() < 1e-6);
    }
}
