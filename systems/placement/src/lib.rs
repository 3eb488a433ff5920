#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Ideal foothold calculation and startup planting of freshly attached limbs.

use strider_core::{
    BodyPose, Command, Event, GaitConfig, GaitSnapshot, GroundHit, GroundQuery, LimbView, Vec3, UP,
};

/// Tuning knobs consumed by the foothold calculation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementConfig {
    /// Fraction of the body velocity used to lead footholds along the direction of travel.
    pub overshoot_fraction: f32,
    /// Distance searched above and below the predicted foothold.
    pub search_radius: f32,
    /// Height added on top of a ground hit.
    pub clearance: f32,
}

impl PlacementConfig {
    /// Extracts the placement parameters from the shared gait configuration.
    #[must_use]
    pub fn from_gait(config: &GaitConfig) -> Self {
        Self {
            overshoot_fraction: config.overshoot_fraction,
            search_radius: config.ground_query_search_radius,
            clearance: config.ground_clearance,
        }
    }
}

/// Where a limb should be planted this tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Foothold {
    /// World-space anchor point.
    pub point: Vec3,
    /// Surface the point rests on, or `None` when it fell back to body height.
    pub surface: Option<GroundHit>,
}

impl Foothold {
    /// Reports whether the foothold was found on real ground.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.surface.is_some()
    }
}

/// Pure system that computes ideal footholds and plants newly attached limbs.
#[derive(Clone, Copy, Debug)]
pub struct Placement {
    config: PlacementConfig,
}

impl Placement {
    /// Creates a placement system with the provided tuning.
    #[must_use]
    pub const fn new(config: PlacementConfig) -> Self {
        Self { config }
    }

    /// Tuning the system was created with.
    #[must_use]
    pub const fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Computes the ideal world-space anchor for a limb with the provided home offset.
    ///
    /// The offset is rotated with the body, led along the velocity estimate by
    /// the overshoot fraction, and dropped onto the ground found within the
    /// search radius. Without ground the point stays at the body's height so
    /// the limb can still plant over a gap.
    #[must_use]
    pub fn ideal_position<G>(
        &self,
        pose: &BodyPose,
        body_velocity: Vec3,
        home_offset: Vec3,
        ground: &G,
    ) -> Foothold
    where
        G: GroundQuery + ?Sized,
    {
        let home = pose.local_to_world(home_offset);
        let predicted = home + body_velocity * self.config.overshoot_fraction;

        let radius = self.config.search_radius;
        let origin = predicted + UP * radius;
        let surface = ground
            .query_ground(origin, radius * 2.0)
            .filter(GroundHit::is_finite);

        match surface {
            Some(hit) => Foothold {
                point: hit.point + UP * self.config.clearance,
                surface: Some(hit),
            },
            None => Foothold {
                point: predicted + UP * (pose.position.dot(UP) - predicted.dot(UP)),
                surface: None,
            },
        }
    }

    /// Plants every limb announced by a `LimbAttached` event onto its ideal foothold.
    pub fn handle<G>(
        &self,
        events: &[Event],
        limb_view: &LimbView,
        gait: &GaitSnapshot,
        ground: &G,
        out: &mut Vec<Command>,
    ) where
        G: GroundQuery + ?Sized,
    {
        for event in events {
            let Event::LimbAttached { limb, .. } = event else {
                continue;
            };
            let Some(snapshot) = limb_view.get(*limb) else {
                continue;
            };

            let foothold = self.ideal_position(
                &gait.pose,
                gait.body_velocity,
                snapshot.home_offset,
                ground,
            );
            if foothold.point.is_finite() {
                out.push(Command::PlantLimb {
                    limb: *limb,
                    position: foothold.point,
                });
            }
        }
    }
}
