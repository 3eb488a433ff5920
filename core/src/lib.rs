#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Strider locomotion engine.
//!
//! This crate defines the message surface that connects the owning controller,
//! the authoritative limb rig, and pure systems. Owners submit [`Command`]
//! values describing desired mutations, the rig executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots such as [`LimbView`] and [`GaitSnapshot`], and respond exclusively
//! with new command batches.

use std::time::Duration;

pub use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

pub mod config;
pub mod ground;

pub use config::{ConfigError, GaitConfig};
pub use ground::{GroundHit, GroundPlane, GroundQuery};

/// World-space up axis. Vertical components are measured along this axis.
pub const UP: Vec3 = Vec3::Y;

/// Commands that express all permissible rig mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Replaces the limb registry with the provided limbs.
    AttachLimbs {
        /// Body pose used to derive home offsets that were not configured.
        pose: BodyPose,
        /// Limb descriptors in registry order.
        limbs: Vec<LimbSetup>,
    },
    /// Snaps a resting limb onto the provided world-space point.
    PlantLimb {
        /// Limb to plant.
        limb: LimbId,
        /// World-space point that becomes the limb's grounded position.
        position: Vec3,
    },
    /// Advances the rig clock and records the latest body pose.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
        /// Body pose reported by the navigation source for this tick.
        pose: BodyPose,
    },
    /// Requests that a limb begin stepping toward the provided target.
    BeginStep {
        /// Limb that should lift off.
        limb: LimbId,
        /// World-space point the step lands on.
        target: Vec3,
    },
    /// Cancels every in-flight step and grounds all limbs where they are.
    Reset,
    /// Re-derives every home offset from the current grounded positions.
    RecaptureHomeOffsets,
}

/// Events broadcast by the rig after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the rig clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a limb joined the registry.
    LimbAttached {
        /// Identifier assigned to the limb.
        limb: LimbId,
        /// Body-relative home offset captured for the limb.
        home_offset: Vec3,
    },
    /// Confirms that a resting limb was snapped onto a new grounded position.
    LimbPlanted {
        /// Limb that was planted.
        limb: LimbId,
        /// Grounded position assigned to the limb.
        position: Vec3,
    },
    /// Confirms that a limb lifted off.
    StepStarted {
        /// Limb that began stepping.
        limb: LimbId,
        /// Grounded position the step departs from.
        from: Vec3,
        /// Position the step will commit on completion.
        to: Vec3,
    },
    /// Confirms that a step landed and committed its target.
    StepCompleted {
        /// Limb that finished stepping.
        limb: LimbId,
        /// Grounded position committed by the step.
        position: Vec3,
    },
    /// Reports that a step request was refused.
    StepRejected {
        /// Limb named in the refused request.
        limb: LimbId,
        /// Specific reason the request was refused.
        reason: StepRejection,
    },
    /// Reports that an in-flight step was abandoned by a reset.
    StepCancelled {
        /// Limb whose step was cancelled.
        limb: LimbId,
        /// Foot-anchor position the limb was grounded at.
        position: Vec3,
    },
    /// Announces that the gait state was cleared by a reset.
    GaitReset,
    /// Confirms that a limb's home offset was re-captured.
    HomeOffsetCaptured {
        /// Limb whose offset changed.
        limb: LimbId,
        /// Newly captured body-relative home offset.
        home_offset: Vec3,
    },
}

/// Reasons a step request may be refused by the rig.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepRejection {
    /// No limb with the provided identifier exists.
    UnknownLimb,
    /// The limb is already owned by an in-flight step.
    AlreadyStepping,
    /// Admitting the step would exceed the simultaneous step limit.
    ConcurrencyLimit,
    /// The minimum interval since the last step has not elapsed yet.
    Cooldown,
    /// A step was already admitted during the current tick.
    TickBudgetSpent,
    /// The requested landing point holds NaN or infinite coordinates.
    InvalidTarget,
}

/// Unique identifier assigned to a limb. Identifiers follow registry order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LimbId(u32);

impl LimbId {
    /// Creates a new limb identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Position of the limb within the registry.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// World-space position and orientation of the creature body.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyPose {
    /// World-space position of the body origin.
    pub position: Vec3,
    /// World-space orientation of the body.
    pub orientation: Quat,
}

impl BodyPose {
    /// Creates a pose from a position and orientation.
    #[must_use]
    pub const fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Creates an unrotated pose located at the provided position.
    #[must_use]
    pub const fn at(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Rotates a body-local offset into world space and anchors it at the body.
    #[must_use]
    pub fn local_to_world(&self, offset: Vec3) -> Vec3 {
        self.position + self.orientation * offset
    }

    /// Expresses a world-space point relative to the body's position and rotation.
    #[must_use]
    pub fn world_to_local(&self, point: Vec3) -> Vec3 {
        self.orientation.inverse() * (point - self.position)
    }
}

impl Default for BodyPose {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

/// Removes the vertical component of a body-local offset.
#[must_use]
pub fn flatten_vertical(offset: Vec3) -> Vec3 {
    offset - UP * offset.dot(UP)
}

/// Reports whether a new step may begin given the time of the previous one.
///
/// `None` stands for "no step has been taken since the last reset" and always
/// permits a step.
#[must_use]
pub fn step_interval_elapsed(now: Duration, last: Option<Duration>, minimum: Duration) -> bool {
    last.map_or(true, |last| now.saturating_sub(last) >= minimum)
}

/// Static description of a limb supplied when the creature is instantiated.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LimbSetup {
    /// World-space position of the limb's anchor when the creature spawns.
    pub rest_position: Vec3,
    /// Explicit body-relative home offset. Derived from `rest_position` when absent.
    pub home_offset: Option<Vec3>,
}

impl LimbSetup {
    /// Describes a limb whose home offset is derived from its spawn position.
    #[must_use]
    pub const fn at(rest_position: Vec3) -> Self {
        Self {
            rest_position,
            home_offset: None,
        }
    }

    /// Supplies an explicit home offset, even one equal to zero.
    #[must_use]
    pub fn with_home_offset(mut self, home_offset: Vec3) -> Self {
        self.home_offset = Some(home_offset);
        self
    }
}

/// Immutable representation of a single limb's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LimbSnapshot {
    /// Identifier of the limb.
    pub id: LimbId,
    /// Body-relative home offset with no vertical component.
    pub home_offset: Vec3,
    /// Last committed world-space anchor point.
    pub grounded_position: Vec3,
    /// Point presented to rendering; differs from the grounded position mid-step.
    pub foot_anchor: Vec3,
    /// Indicates whether a step currently owns the limb.
    pub is_stepping: bool,
    /// Rig time at which the limb last lifted off, if ever.
    pub last_step_started: Option<Duration>,
    /// Normalised progress of the in-flight step, if any.
    pub step_progress: Option<f32>,
}

/// Read-only snapshot describing every limb in registry order.
#[derive(Clone, Debug, Default)]
pub struct LimbView {
    snapshots: Vec<LimbSnapshot>,
}

impl LimbView {
    /// Creates a new limb view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<LimbSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured limb snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &LimbSnapshot> {
        self.snapshots.iter()
    }

    /// Retrieves the snapshot for the provided limb.
    #[must_use]
    pub fn get(&self, limb: LimbId) -> Option<&LimbSnapshot> {
        self.snapshots
            .binary_search_by_key(&limb, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Number of limbs captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view contains no limbs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Number of limbs currently stepping.
    #[must_use]
    pub fn stepping_count(&self) -> usize {
        self.snapshots
            .iter()
            .filter(|snapshot| snapshot.is_stepping)
            .count()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<LimbSnapshot> {
        self.snapshots
    }
}

/// Read-only snapshot of the creature-wide gait state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaitSnapshot {
    /// Rig time accumulated across all ticks.
    pub now: Duration,
    /// Most recent body pose.
    pub pose: BodyPose,
    /// Body displacement over the previous tick divided by its duration.
    pub body_velocity: Vec3,
    /// Number of limbs currently stepping.
    pub moving_count: u32,
    /// Rig time of the most recent step initiated by any limb.
    pub last_global_step: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn local_offsets_follow_body_rotation() {
        let pose = BodyPose::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_y(FRAC_PI_2));
        let world = pose.local_to_world(Vec3::X);

        assert!((world - Vec3::new(1.0, 2.0, 2.0)).length() < 1e-5);
        assert!((pose.world_to_local(world) - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn flatten_vertical_drops_up_component() {
        assert_eq!(
            flatten_vertical(Vec3::new(0.5, 3.0, -2.0)),
            Vec3::new(0.5, 0.0, -2.0)
        );
    }

    #[test]
    fn interval_without_previous_step_is_always_elapsed() {
        assert!(step_interval_elapsed(
            Duration::ZERO,
            None,
            Duration::from_secs(10)
        ));
    }

    #[test]
    fn interval_is_inclusive_of_minimum() {
        let minimum = Duration::from_millis(50);
        let last = Some(Duration::from_millis(100));
        assert!(!step_interval_elapsed(
            Duration::from_millis(149),
            last,
            minimum
        ));
        assert!(step_interval_elapsed(
            Duration::from_millis(150),
            last,
            minimum
        ));
    }

    #[test]
    fn explicit_zero_offset_is_preserved() {
        let setup = LimbSetup::at(Vec3::new(1.0, 0.0, 1.0)).with_home_offset(Vec3::ZERO);
        assert_eq!(setup.home_offset, Some(Vec3::ZERO));
    }

    #[test]
    fn limb_view_lookup_uses_identifier_order() {
        let snapshot = |id: u32| LimbSnapshot {
            id: LimbId::new(id),
            home_offset: Vec3::ZERO,
            grounded_position: Vec3::splat(id as f32),
            foot_anchor: Vec3::splat(id as f32),
            is_stepping: id == 2,
            last_step_started: None,
            step_progress: None,
        };
        let view = LimbView::from_snapshots(vec![snapshot(2), snapshot(0), snapshot(1)]);

        let ids: Vec<u32> = view.iter().map(|limb| limb.id.get()).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(
            view.get(LimbId::new(1)).map(|limb| limb.grounded_position),
            Some(Vec3::ONE)
        );
        assert!(view.get(LimbId::new(7)).is_none());
        assert_eq!(view.stepping_count(), 1);
    }
}
