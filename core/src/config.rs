//! Tuning surface read once when a rig is created.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gait tuning shared by the rig and every system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GaitConfig {
    /// Upper bound on limbs stepping at the same time.
    pub max_simultaneous_steps: u32,
    /// Minimum rig time between two step initiations, across all limbs.
    pub min_time_between_steps: Duration,
    /// Drift a resting limb must exceed before it becomes a step candidate.
    pub step_distance_threshold: f32,
    /// Time a single step takes from lift-off to landing.
    pub step_duration: Duration,
    /// Peak height of the step arc above the straight start-to-target line.
    pub lift_height: f32,
    /// Fraction of the body velocity used to lead limbs in the direction of travel.
    pub overshoot_fraction: f32,
    /// Distance searched above and below a predicted foothold for ground.
    pub ground_query_search_radius: f32,
    /// Height added on top of a ground hit so feet do not clip into it.
    pub ground_clearance: f32,
    /// Height of the visual body above the averaged foot anchors.
    pub body_height_offset: f32,
    /// Time constant of the visual body height smoothing.
    pub body_height_smoothing: Duration,
}

impl Default for GaitConfig {
    fn default() -> Self {
        Self {
            max_simultaneous_steps: 2,
            min_time_between_steps: Duration::from_millis(50),
            step_distance_threshold: 0.5,
            step_duration: Duration::from_millis(250),
            lift_height: 0.3,
            overshoot_fraction: 0.5,
            ground_query_search_radius: 2.0,
            ground_clearance: 0.02,
            body_height_offset: 0.6,
            body_height_smoothing: Duration::from_millis(150),
        }
    }
}

impl GaitConfig {
    /// Rejects configurations that would stall the gait or divide by zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_simultaneous_steps == 0 {
            return Err(ConfigError::NoStepCapacity);
        }
        if self.step_duration.is_zero() {
            return Err(ConfigError::ZeroStepDuration);
        }
        if self.body_height_smoothing.is_zero() {
            return Err(ConfigError::ZeroHeightSmoothing);
        }

        positive("step_distance_threshold", self.step_distance_threshold)?;
        positive(
            "ground_query_search_radius",
            self.ground_query_search_radius,
        )?;
        non_negative("lift_height", self.lift_height)?;
        non_negative("overshoot_fraction", self.overshoot_fraction)?;
        non_negative("ground_clearance", self.ground_clearance)?;

        if !self.body_height_offset.is_finite() {
            return Err(ConfigError::NotFinite {
                field: "body_height_offset",
                value: self.body_height_offset,
            });
        }

        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { field, value })
    }
}

/// Reasons a [`GaitConfig`] is refused at setup time.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// No limb would ever be allowed to step.
    #[error("max_simultaneous_steps must be at least 1")]
    NoStepCapacity,
    /// Step trajectories would divide by zero.
    #[error("step_duration must be greater than zero")]
    ZeroStepDuration,
    /// Height smoothing would divide by zero.
    #[error("body_height_smoothing must be greater than zero")]
    ZeroHeightSmoothing,
    /// A strictly positive value was zero, negative or not finite.
    #[error("{field} must be positive and finite (received {value})")]
    NotPositive {
        /// Name of the offending field.
        field: &'static str,
        /// Value that failed validation.
        value: f32,
    },
    /// A non-negative value was negative or not finite.
    #[error("{field} must be non-negative and finite (received {value})")]
    Negative {
        /// Name of the offending field.
        field: &'static str,
        /// Value that failed validation.
        value: f32,
    },
    /// A value was NaN or infinite.
    #[error("{field} must be finite (received {value})")]
    NotFinite {
        /// Name of the offending field.
        field: &'static str,
        /// Value that failed validation.
        value: f32,
    },
}
