#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic gait scheduler that decides which resting limb steps next.

use std::time::Duration;

use strider_core::{
    step_interval_elapsed, Command, Event, GaitConfig, GaitSnapshot, GroundQuery, LimbId,
    LimbView, Vec3,
};
use strider_system_placement::{Placement, PlacementConfig};

/// Scheduling limits consumed by the gait system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GaitTuning {
    /// Drift a resting limb must exceed before it may step.
    pub step_distance_threshold: f32,
    /// Upper bound on limbs stepping at the same time.
    pub max_simultaneous_steps: u32,
    /// Minimum time between two step initiations.
    pub min_time_between_steps: Duration,
}

impl GaitTuning {
    /// Extracts the scheduling limits from the shared gait configuration.
    #[must_use]
    pub fn from_gait(config: &GaitConfig) -> Self {
        Self {
            step_distance_threshold: config.step_distance_threshold,
            max_simultaneous_steps: config.max_simultaneous_steps,
            min_time_between_steps: config.min_time_between_steps,
        }
    }
}

/// Distance between a resting limb's grounded position and its ideal foothold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LimbDrift {
    /// Limb the measurement belongs to.
    pub limb: LimbId,
    /// Distance from the grounded position to the ideal foothold.
    pub drift: f32,
    /// Ideal foothold computed this tick; becomes the step target when selected.
    pub target: Vec3,
}

/// Pure system that reacts to rig ticks and proposes at most one step per tick.
#[derive(Debug)]
pub struct Gait {
    tuning: GaitTuning,
    placement: Placement,
    drifts: Vec<LimbDrift>,
}

impl Gait {
    /// Creates a gait scheduler configured from the shared gait configuration.
    #[must_use]
    pub fn new(config: &GaitConfig) -> Self {
        Self::with_parts(
            GaitTuning::from_gait(config),
            Placement::new(PlacementConfig::from_gait(config)),
        )
    }

    /// Creates a gait scheduler from explicit tuning and placement.
    #[must_use]
    pub fn with_parts(tuning: GaitTuning, placement: Placement) -> Self {
        Self {
            tuning,
            placement,
            drifts: Vec::new(),
        }
    }

    /// Drift measurements taken during the most recent tick, in limb order.
    #[must_use]
    pub fn last_drifts(&self) -> &[LimbDrift] {
        &self.drifts
    }

    /// Consumes rig events and immutable views to emit step commands.
    ///
    /// Nothing happens unless the batch contains `Event::TimeAdvanced`. Every
    /// resting limb is measured before a candidate is chosen, and at most one
    /// `Command::BeginStep` is emitted per call.
    pub fn handle<G>(
        &mut self,
        events: &[Event],
        limb_view: &LimbView,
        gait: &GaitSnapshot,
        ground: &G,
        out: &mut Vec<Command>,
    ) where
        G: GroundQuery + ?Sized,
    {
        if !events
            .iter()
            .any(|event| matches!(event, Event::TimeAdvanced { .. }))
        {
            return;
        }

        self.measure_drifts(limb_view, gait, ground);

        let Some(candidate) = select_candidate(&self.drifts, self.tuning.step_distance_threshold)
        else {
            return;
        };

        if gait.moving_count >= self.tuning.max_simultaneous_steps {
            return;
        }
        if !step_interval_elapsed(
            gait.now,
            gait.last_global_step,
            self.tuning.min_time_between_steps,
        ) {
            return;
        }

        out.push(Command::BeginStep {
            limb: candidate.limb,
            target: candidate.target,
        });
    }

    fn measure_drifts<G>(&mut self, limb_view: &LimbView, gait: &GaitSnapshot, ground: &G)
    where
        G: GroundQuery + ?Sized,
    {
        self.drifts.clear();
        for limb in limb_view.iter().filter(|limb| !limb.is_stepping) {
            let foothold = self.placement.ideal_position(
                &gait.pose,
                gait.body_velocity,
                limb.home_offset,
                ground,
            );
            if !foothold.point.is_finite() {
                continue;
            }

            self.drifts.push(LimbDrift {
                limb: limb.id,
                drift: limb.grounded_position.distance(foothold.point),
                target: foothold.point,
            });
        }
    }
}

/// Picks the limb that drifted furthest beyond the threshold.
///
/// Ties resolve to the earliest entry, so callers passing drifts in limb order
/// get the lowest limb index.
#[must_use]
pub fn select_candidate(drifts: &[LimbDrift], threshold: f32) -> Option<LimbDrift> {
    let mut best: Option<LimbDrift> = None;
    for drift in drifts.iter().filter(|drift| drift.drift > threshold) {
        best = Some(match best {
            Some(existing) if existing.drift >= drift.drift => existing,
            _ => *drift,
        });
    }
    best
}
