#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative limb registry and gait state for Strider.
//!
//! The rig owns every limb's grounded position, foot anchor and in-flight step.
//! It changes only through [`apply`], which re-checks the gait invariants for
//! every request, and it is read through the [`query`] module.

use std::time::Duration;

use strider_core::{
    flatten_vertical, step_interval_elapsed, BodyPose, Command, ConfigError, Event, GaitConfig,
    LimbId, LimbSetup, StepRejection, Vec3,
};
use tracing::{debug, trace};

mod step;

pub use step::arc_point;
use step::{StepProgress, StepTask};

/// Represents the authoritative limb state of a single creature.
#[derive(Debug)]
pub struct Rig {
    config: GaitConfig,
    limbs: Vec<Limb>,
    pose: BodyPose,
    body_velocity: Vec3,
    clock: Duration,
    moving_count: u32,
    last_global_step: Option<Duration>,
    step_admitted_this_tick: bool,
    tick_index: u64,
}

impl Rig {
    /// Creates an empty rig after validating the configuration.
    pub fn new(config: GaitConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            limbs: Vec::new(),
            pose: BodyPose::default(),
            body_velocity: Vec3::ZERO,
            clock: Duration::ZERO,
            moving_count: 0,
            last_global_step: None,
            step_admitted_this_tick: false,
            tick_index: 0,
        })
    }

    fn limb_mut(&mut self, limb: LimbId) -> Option<&mut Limb> {
        self.limbs.get_mut(limb.index())
    }

    fn attach_limbs(
        &mut self,
        pose: BodyPose,
        setups: Vec<LimbSetup>,
        out_events: &mut Vec<Event>,
    ) {
        self.pose = pose;
        self.body_velocity = Vec3::ZERO;
        self.moving_count = 0;
        self.last_global_step = None;
        self.limbs.clear();
        self.limbs.reserve(setups.len());

        for (index, setup) in setups.into_iter().enumerate() {
            let Ok(raw) = u32::try_from(index) else {
                break;
            };
            let limb = Limb::attach(LimbId::new(raw), setup, &pose);
            debug!(limb = raw, home_offset = ?limb.home_offset, "limb attached");
            out_events.push(Event::LimbAttached {
                limb: limb.id,
                home_offset: limb.home_offset,
            });
            self.limbs.push(limb);
        }
    }

    fn advance(&mut self, dt: Duration, pose: BodyPose, out_events: &mut Vec<Event>) {
        self.tick_index = self.tick_index.saturating_add(1);
        self.step_admitted_this_tick = false;
        self.clock = self.clock.saturating_add(dt);

        if !dt.is_zero() {
            self.body_velocity = (pose.position - self.pose.position) / dt.as_secs_f32();
        }
        self.pose = pose;
        out_events.push(Event::TimeAdvanced { dt });

        let lift_height = self.config.lift_height;
        for limb in &mut self.limbs {
            let Some(task) = limb.step.as_mut() else {
                continue;
            };

            match task.advance(dt, lift_height) {
                StepProgress::Airborne(point) => limb.foot_anchor = point,
                StepProgress::Landed(target) => {
                    limb.grounded_position = target;
                    limb.foot_anchor = target;
                    limb.step = None;
                    self.moving_count = self.moving_count.saturating_sub(1);
                    debug!(limb = limb.id.get(), position = ?target, "step completed");
                    out_events.push(Event::StepCompleted {
                        limb: limb.id,
                        position: target,
                    });
                }
            }
        }
    }

    fn begin_step(&mut self, limb: LimbId, target: Vec3) -> Result<Vec3, StepRejection> {
        let max_steps = self.config.max_simultaneous_steps;
        let min_interval = self.config.min_time_between_steps;
        let step_duration = self.config.step_duration;
        let now = self.clock;
        let moving_count = self.moving_count;
        let admitted = self.step_admitted_this_tick;
        let last_global_step = self.last_global_step;

        let entry = self.limb_mut(limb).ok_or(StepRejection::UnknownLimb)?;
        if entry.step.is_some() {
            return Err(StepRejection::AlreadyStepping);
        }
        if !target.is_finite() {
            return Err(StepRejection::InvalidTarget);
        }
        if admitted {
            return Err(StepRejection::TickBudgetSpent);
        }
        if moving_count >= max_steps {
            return Err(StepRejection::ConcurrencyLimit);
        }
        if !step_interval_elapsed(now, last_global_step, min_interval) {
            return Err(StepRejection::Cooldown);
        }

        let from = entry.grounded_position;
        entry.step = Some(StepTask::new(from, target, step_duration));
        entry.last_step_started = Some(now);

        self.moving_count += 1;
        self.last_global_step = Some(now);
        self.step_admitted_this_tick = true;
        Ok(from)
    }

    fn reset(&mut self, out_events: &mut Vec<Event>) {
        for limb in &mut self.limbs {
            if limb.step.take().is_some() {
                limb.grounded_position = limb.foot_anchor;
                debug!(limb = limb.id.get(), position = ?limb.foot_anchor, "step cancelled");
                out_events.push(Event::StepCancelled {
                    limb: limb.id,
                    position: limb.foot_anchor,
                });
            }
        }
        self.moving_count = 0;
        self.last_global_step = None;
        self.step_admitted_this_tick = false;
        out_events.push(Event::GaitReset);
    }

    fn recapture_home_offsets(&mut self, out_events: &mut Vec<Event>) {
        let pose = self.pose;
        for limb in &mut self.limbs {
            limb.home_offset = flatten_vertical(pose.world_to_local(limb.grounded_position));
            out_events.push(Event::HomeOffsetCaptured {
                limb: limb.id,
                home_offset: limb.home_offset,
            });
        }
    }
}

/// Applies the provided command to the rig, mutating state deterministically.
pub fn apply(rig: &mut Rig, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::AttachLimbs { pose, limbs } => rig.attach_limbs(pose, limbs, out_events),
        Command::PlantLimb { limb, position } => {
            let Some(entry) = rig.limb_mut(limb) else {
                trace!(limb = limb.get(), "plant ignored for unknown limb");
                return;
            };
            if entry.step.is_some() {
                trace!(limb = limb.get(), "plant ignored for stepping limb");
                return;
            }
            entry.grounded_position = position;
            entry.foot_anchor = position;
            out_events.push(Event::LimbPlanted { limb, position });
        }
        Command::Tick { dt, pose } => rig.advance(dt, pose, out_events),
        Command::BeginStep { limb, target } => match rig.begin_step(limb, target) {
            Ok(from) => {
                debug!(limb = limb.get(), ?from, to = ?target, "step started");
                out_events.push(Event::StepStarted {
                    limb,
                    from,
                    to: target,
                });
            }
            Err(reason) => {
                trace!(limb = limb.get(), ?reason, "step rejected");
                out_events.push(Event::StepRejected { limb, reason });
            }
        },
        Command::Reset => rig.reset(out_events),
        Command::RecaptureHomeOffsets => rig.recapture_home_offsets(out_events),
    }
}

/// Query functions that provide read-only access to the rig state.
pub mod query {
    use strider_core::{GaitConfig, GaitSnapshot, LimbSnapshot, LimbView, Vec3};

    use super::Rig;

    /// Provides read-only access to the configuration the rig was created with.
    #[must_use]
    pub fn config(rig: &Rig) -> &GaitConfig {
        &rig.config
    }

    /// Captures a read-only view of every limb.
    #[must_use]
    pub fn limb_view(rig: &Rig) -> LimbView {
        let snapshots = rig
            .limbs
            .iter()
            .map(|limb| LimbSnapshot {
                id: limb.id,
                home_offset: limb.home_offset,
                grounded_position: limb.grounded_position,
                foot_anchor: limb.foot_anchor,
                is_stepping: limb.step.is_some(),
                last_step_started: limb.last_step_started,
                step_progress: limb.step.as_ref().map(|task| task.progress()),
            })
            .collect();
        LimbView::from_snapshots(snapshots)
    }

    /// Captures the creature-wide gait state.
    #[must_use]
    pub fn gait_snapshot(rig: &Rig) -> GaitSnapshot {
        GaitSnapshot {
            now: rig.clock,
            pose: rig.pose,
            body_velocity: rig.body_velocity,
            moving_count: rig.moving_count,
            last_global_step: rig.last_global_step,
        }
    }

    /// Foot-anchor positions in limb order, as presented to rendering.
    #[must_use]
    pub fn foot_anchors(rig: &Rig) -> Vec<Vec3> {
        rig.limbs.iter().map(|limb| limb.foot_anchor).collect()
    }

    /// Number of ticks processed since the rig was created.
    #[must_use]
    pub fn tick_index(rig: &Rig) -> u64 {
        rig.tick_index
    }
}

#[derive(Clone, Debug)]
struct Limb {
    id: LimbId,
    home_offset: Vec3,
    grounded_position: Vec3,
    foot_anchor: Vec3,
    last_step_started: Option<Duration>,
    step: Option<StepTask>,
}

impl Limb {
    fn attach(id: LimbId, setup: LimbSetup, pose: &BodyPose) -> Self {
        let offset = setup
            .home_offset
            .unwrap_or_else(|| pose.world_to_local(setup.rest_position));
        Self {
            id,
            home_offset: flatten_vertical(offset),
            grounded_position: setup.rest_position,
            foot_anchor: setup.rest_position,
            last_step_started: None,
            step: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strider_core::Quat;

    fn rig_with_limbs(config: GaitConfig, positions: &[Vec3]) -> Rig {
        let mut rig = Rig::new(config).expect("valid configuration");
        let mut events = Vec::new();
        apply(
            &mut rig,
            Command::AttachLimbs {
                pose: BodyPose::default(),
                limbs: positions.iter().copied().map(LimbSetup::at).collect(),
            },
            &mut events,
        );
        rig
    }

    fn tick(rig: &mut Rig, millis: u64) -> Vec<Event> {
        let mut events = Vec::new();
        apply(
            rig,
            Command::Tick {
                dt: Duration::from_millis(millis),
                pose: query::gait_snapshot(rig).pose,
            },
            &mut events,
        );
        events
    }

    fn begin(rig: &mut Rig, limb: u32, target: Vec3) -> Event {
        let mut events = Vec::new();
        apply(
            rig,
            Command::BeginStep {
                limb: LimbId::new(limb),
                target,
            },
            &mut events,
        );
        assert_eq!(events.len(), 1);
        events.remove(0)
    }

    #[test]
    fn rejects_degenerate_configuration() {
        let config = GaitConfig {
            max_simultaneous_steps: 0,
            ..GaitConfig::default()
        };
        assert_eq!(Rig::new(config).err(), Some(ConfigError::NoStepCapacity));
    }

    #[test]
    fn derived_home_offsets_are_body_relative_and_flat() {
        let mut rig = Rig::new(GaitConfig::default()).expect("valid configuration");
        let mut events = Vec::new();
        let pose = BodyPose::new(
            Vec3::new(10.0, 1.0, 0.0),
            Quat::from_rotation_y(std::f32::consts::PI),
        );
        apply(
            &mut rig,
            Command::AttachLimbs {
                pose,
                limbs: vec![
                    LimbSetup::at(Vec3::new(11.0, 0.0, 0.0)),
                    LimbSetup::at(Vec3::new(12.0, 0.0, 0.0)).with_home_offset(Vec3::ZERO),
                ],
            },
            &mut events,
        );

        let view = query::limb_view(&rig);
        let derived = view.get(LimbId::new(0)).expect("limb 0").home_offset;
        assert!((derived - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5);
        assert_eq!(
            view.get(LimbId::new(1)).expect("limb 1").home_offset,
            Vec3::ZERO
        );
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn unknown_limb_is_rejected() {
        let mut rig = rig_with_limbs(GaitConfig::default(), &[Vec3::ZERO]);
        assert_eq!(
            begin(&mut rig, 5, Vec3::X),
            Event::StepRejected {
                limb: LimbId::new(5),
                reason: StepRejection::UnknownLimb,
            }
        );
    }

    #[test]
    fn second_admission_in_one_tick_is_rejected() {
        let mut rig = rig_with_limbs(GaitConfig::default(), &[Vec3::ZERO, Vec3::X]);
        let _ = tick(&mut rig, 16);

        assert!(matches!(
            begin(&mut rig, 0, Vec3::Z),
            Event::StepStarted { .. }
        ));
        assert_eq!(
            begin(&mut rig, 1, Vec3::Z),
            Event::StepRejected {
                limb: LimbId::new(1),
                reason: StepRejection::TickBudgetSpent,
            }
        );
        assert_eq!(
            begin(&mut rig, 0, Vec3::Z),
            Event::StepRejected {
                limb: LimbId::new(0),
                reason: StepRejection::AlreadyStepping,
            }
        );
    }

    #[test]
    fn cooldown_and_concurrency_limits_are_enforced() {
        let config = GaitConfig {
            max_simultaneous_steps: 1,
            min_time_between_steps: Duration::from_millis(100),
            step_duration: Duration::from_millis(500),
            ..GaitConfig::default()
        };
        let mut rig = rig_with_limbs(config, &[Vec3::ZERO, Vec3::X, Vec3::Z]);

        let _ = tick(&mut rig, 10);
        assert!(matches!(
            begin(&mut rig, 0, Vec3::Y),
            Event::StepStarted { .. }
        ));

        let _ = tick(&mut rig, 10);
        assert_eq!(
            begin(&mut rig, 1, Vec3::Y),
            Event::StepRejected {
                limb: LimbId::new(1),
                reason: StepRejection::ConcurrencyLimit,
            }
        );

        let _ = tick(&mut rig, 500);
        let _ = tick(&mut rig, 10);
        assert!(matches!(
            begin(&mut rig, 1, Vec3::Y),
            Event::StepStarted { .. }
        ));
    }

    #[test]
    fn cooldown_rejects_within_minimum_interval() {
        let config = GaitConfig {
            max_simultaneous_steps: 3,
            min_time_between_steps: Duration::from_millis(100),
            ..GaitConfig::default()
        };
        let mut rig = rig_with_limbs(config, &[Vec3::ZERO, Vec3::X]);

        let _ = tick(&mut rig, 10);
        let _ = begin(&mut rig, 0, Vec3::Y);
        let _ = tick(&mut rig, 50);
        assert_eq!(
            begin(&mut rig, 1, Vec3::Y),
            Event::StepRejected {
                limb: LimbId::new(1),
                reason: StepRejection::Cooldown,
            }
        );
        let _ = tick(&mut rig, 50);
        assert!(matches!(
            begin(&mut rig, 1, Vec3::Y),
            Event::StepStarted { .. }
        ));
    }

    #[test]
    fn reset_restores_a_clean_step_budget() {
        let mut rig = rig_with_limbs(GaitConfig::default(), &[Vec3::ZERO, Vec3::X]);
        let _ = tick(&mut rig, 16);
        assert!(matches!(
            begin(&mut rig, 0, Vec3::Z),
            Event::StepStarted { .. }
        ));

        let mut events = Vec::new();
        apply(&mut rig, Command::Reset, &mut events);
        assert_eq!(
            events,
            vec![
                Event::StepCancelled {
                    limb: LimbId::new(0),
                    position: Vec3::ZERO,
                },
                Event::GaitReset,
            ]
        );
        let snapshot = query::gait_snapshot(&rig);
        assert_eq!(snapshot.moving_count, 0);
        assert_eq!(snapshot.last_global_step, None);

        assert!(matches!(
            begin(&mut rig, 1, Vec3::Z),
            Event::StepStarted { .. }
        ));
    }

    #[test]
    fn non_finite_target_is_rejected() {
        let mut rig = rig_with_limbs(GaitConfig::default(), &[Vec3::ZERO]);
        assert_eq!(
            begin(&mut rig, 0, Vec3::new(f32::NAN, 0.0, 0.0)),
            Event::StepRejected {
                limb: LimbId::new(0),
                reason: StepRejection::InvalidTarget,
            }
        );
    }

    #[test]
    fn planting_a_stepping_limb_is_ignored() {
        let mut rig = rig_with_limbs(GaitConfig::default(), &[Vec3::ZERO]);
        let _ = begin(&mut rig, 0, Vec3::X);

        let mut events = Vec::new();
        apply(
            &mut rig,
            Command::PlantLimb {
                limb: LimbId::new(0),
                position: Vec3::Z,
            },
            &mut events,
        );

        assert!(events.is_empty());
        assert_eq!(
            query::limb_view(&rig)
                .get(LimbId::new(0))
                .expect("limb 0")
                .grounded_position,
            Vec3::ZERO
        );
    }

    #[test]
    fn velocity_estimate_tracks_displacement() {
        let mut rig = rig_with_limbs(GaitConfig::default(), &[]);
        let mut events = Vec::new();
        apply(
            &mut rig,
            Command::Tick {
                dt: Duration::from_millis(500),
                pose: BodyPose::at(Vec3::new(1.0, 0.0, 0.0)),
            },
            &mut events,
        );
        let velocity = query::gait_snapshot(&rig).body_velocity;
        assert!((velocity - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5);

        apply(
            &mut rig,
            Command::Tick {
                dt: Duration::ZERO,
                pose: BodyPose::at(Vec3::new(5.0, 0.0, 0.0)),
            },
            &mut events,
        );
        let velocity = query::gait_snapshot(&rig).body_velocity;
        assert!(
            (velocity - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5,
            "zero dt keeps the previous estimate"
        );
    }
}
