#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Cosmetic body-height follower that eases a visual anchor over the feet.
//!
//! The follower only reads rig views. Its output is meant for rendering and is
//! never fed back into placement or scheduling.

use std::time::Duration;

use strider_core::{BodyPose, Event, GaitConfig, LimbView, Vec3, UP};

/// Critically damped spring that moves `current` toward `target`.
///
/// `velocity` carries the spring state between calls. The result never
/// overshoots the target.
#[must_use]
pub fn smooth_damp(
    current: f32,
    target: f32,
    velocity: &mut f32,
    smooth_time: f32,
    dt: f32,
) -> f32 {
    if dt <= 0.0 {
        return current;
    }

    let smooth_time = smooth_time.max(f32::EPSILON);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let output = target + (change + temp) * decay;

    if (target - current > 0.0) == (output > target) {
        *velocity = 0.0;
        return target;
    }
    output
}

/// Average height of every foot anchor in the view, or `None` without limbs.
#[must_use]
pub fn mean_anchor_height(limb_view: &LimbView) -> Option<f32> {
    if limb_view.is_empty() {
        return None;
    }
    let sum: f32 = limb_view.iter().map(|limb| limb.foot_anchor.dot(UP)).sum();
    Some(sum / limb_view.len() as f32)
}

/// Pure system that keeps a smoothed visual body anchor above the feet.
#[derive(Clone, Debug)]
pub struct BodyHeight {
    offset: f32,
    smoothing: Duration,
    height: Option<f32>,
    velocity: f32,
    anchor: Vec3,
}

impl BodyHeight {
    /// Creates a follower using the height offset and smoothing time of the configuration.
    #[must_use]
    pub fn new(config: &GaitConfig) -> Self {
        Self {
            offset: config.body_height_offset,
            smoothing: config.body_height_smoothing,
            height: None,
            velocity: 0.0,
            anchor: Vec3::ZERO,
        }
    }

    /// Smoothed visual body anchor from the latest update.
    #[must_use]
    pub fn visual_anchor(&self) -> Vec3 {
        self.anchor
    }

    /// Updates the visual anchor from the events of one rig batch.
    ///
    /// The first update and every `LimbAttached` event snap the anchor to its
    /// desired height; `TimeAdvanced` events ease it there. Without limbs the
    /// desired height is the body pose's own height.
    pub fn handle(&mut self, events: &[Event], limb_view: &LimbView, pose: &BodyPose) {
        let desired = mean_anchor_height(limb_view)
            .map_or_else(|| pose.position.dot(UP), |mean| mean + self.offset);
        let attached = events
            .iter()
            .any(|event| matches!(event, Event::LimbAttached { .. }));

        let height = match self.height {
            Some(mut current) if !attached => {
                let smooth_time = self.smoothing.as_secs_f32();
                for event in events {
                    if let Event::TimeAdvanced { dt } = event {
                        current = smooth_damp(
                            current,
                            desired,
                            &mut self.velocity,
                            smooth_time,
                            dt.as_secs_f32(),
                        );
                    }
                }
                current
            }
            _ => {
                self.velocity = 0.0;
                desired
            }
        };
        self.height = Some(height);

        let planar = pose.position - UP * pose.position.dot(UP);
        self.anchor = planar + UP * height;
    }
}
