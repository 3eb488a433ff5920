//! Contract for the external ground-surface oracle.

use glam::Vec3;

use crate::UP;

/// Surface point reported by a ground query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundHit {
    /// World-space point on the surface.
    pub point: Vec3,
    /// Surface normal at the hit point.
    pub normal: Vec3,
}

impl GroundHit {
    /// Reports whether both the point and normal hold finite values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.point.is_finite() && self.normal.is_finite()
    }
}

/// Finds the nearest surface below a point.
///
/// Implementations must be deterministic: the same origin against the same
/// geometry always yields the same result.
pub trait GroundQuery {
    /// Searches downward from `origin` for at most `max_distance` units.
    fn query_ground(&self, origin: Vec3, max_distance: f32) -> Option<GroundHit>;
}

impl<F> GroundQuery for F
where
    F: Fn(Vec3, f32) -> Option<GroundHit>,
{
    fn query_ground(&self, origin: Vec3, max_distance: f32) -> Option<GroundHit> {
        self(origin, max_distance)
    }
}

/// Infinite horizontal plane at a fixed height.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundPlane {
    height: f32,
}

impl GroundPlane {
    /// Creates a plane whose surface lies at the provided height.
    #[must_use]
    pub const fn at_height(height: f32) -> Self {
        Self { height }
    }

    /// Height of the plane's surface.
    #[must_use]
    pub const fn height(&self) -> f32 {
        self.height
    }
}

impl GroundQuery for GroundPlane {
    fn query_ground(&self, origin: Vec3, max_distance: f32) -> Option<GroundHit> {
        let drop = origin.dot(UP) - self.height;
        if drop < 0.0 || drop > max_distance {
            return None;
        }

        Some(GroundHit {
            point: origin - UP * drop,
            normal: UP,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_reports_point_directly_below() {
        let plane = GroundPlane::at_height(1.0);
        let hit = plane
            .query_ground(Vec3::new(2.0, 3.0, -1.0), 5.0)
            .expect("plane lies within reach");
        assert_eq!(hit.point, Vec3::new(2.0, 1.0, -1.0));
        assert_eq!(hit.normal, UP);
    }

    #[test]
    fn plane_out_of_reach_or_above_is_missed() {
        let plane = GroundPlane::at_height(0.0);
        assert!(plane.query_ground(Vec3::new(0.0, 3.0, 0.0), 2.0).is_none());
        assert!(plane.query_ground(Vec3::new(0.0, -0.5, 0.0), 2.0).is_none());
    }

    #[test]
    fn closures_act_as_ground_queries() {
        let never = |_: Vec3, _: f32| -> Option<GroundHit> { None };
        assert!(never.query_ground(Vec3::ZERO, 1.0).is_none());
    }
}
