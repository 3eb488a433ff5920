#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-creature locomotion controller that drives the rig and its systems.
//!
//! The controller owns the authoritative [`Rig`], the pure systems and the
//! ground oracle. Each public operation applies one command to the rig and
//! then lets the systems react to the resulting events until no further
//! commands are produced.

use std::time::Duration;

use strider_core::{
    BodyPose, Command, ConfigError, Event, GaitConfig, GaitSnapshot, GroundQuery, LimbSetup,
    LimbView, Vec3,
};
use strider_rig::{apply, query, Rig};
use strider_system_body_height::BodyHeight;
use strider_system_gait::{Gait, LimbDrift};
use strider_system_placement::{Placement, PlacementConfig};
use tracing::info;

/// Procedural multi-limb locomotion for a single creature.
#[derive(Debug)]
pub struct GaitController<G> {
    rig: Rig,
    placement: Placement,
    gait: Gait,
    body_height: BodyHeight,
    ground: G,
    events: Vec<Event>,
}

impl<G> GaitController<G>
where
    G: GroundQuery,
{
    /// Creates a controller, attaches the limbs and snaps them onto the ground.
    ///
    /// Fails when the configuration is degenerate. Attaching zero limbs is
    /// allowed; such a controller simply idles.
    pub fn new(
        config: GaitConfig,
        pose: BodyPose,
        limbs: Vec<LimbSetup>,
        ground: G,
    ) -> Result<Self, ConfigError> {
        let placement = Placement::new(PlacementConfig::from_gait(&config));
        let gait = Gait::new(&config);
        let body_height = BodyHeight::new(&config);
        let rig = Rig::new(config)?;

        let limb_count = limbs.len();
        let mut controller = Self {
            rig,
            placement,
            gait,
            body_height,
            ground,
            events: Vec::new(),
        };
        controller.run(Command::AttachLimbs { pose, limbs });

        info!(
            limbs = limb_count,
            position = ?pose.position,
            "gait controller ready"
        );
        Ok(controller)
    }

    /// Advances the controller by one tick with the latest body pose.
    ///
    /// Returns every event the tick produced, in the order they occurred.
    pub fn tick(&mut self, pose: BodyPose, dt: Duration) -> &[Event] {
        self.run(Command::Tick { dt, pose });
        &self.events
    }

    /// Cancels every in-flight step and grounds the limbs where they are.
    pub fn reset(&mut self) -> &[Event] {
        let moving = query::gait_snapshot(&self.rig).moving_count;
        self.run(Command::Reset);
        info!(cancelled = moving, "gait reset");
        &self.events
    }

    /// Re-derives every home offset from the limbs' current grounded positions.
    pub fn recapture_home_offsets(&mut self) -> &[Event] {
        self.run(Command::RecaptureHomeOffsets);
        &self.events
    }

    /// Events produced by the most recent operation.
    #[must_use]
    pub fn last_events(&self) -> &[Event] {
        &self.events
    }

    /// Foot-anchor positions in limb order.
    #[must_use]
    pub fn foot_anchors(&self) -> Vec<Vec3> {
        query::foot_anchors(&self.rig)
    }

    /// Read-only view of every limb.
    #[must_use]
    pub fn limb_view(&self) -> LimbView {
        query::limb_view(&self.rig)
    }

    /// Read-only view of the creature-wide gait state.
    #[must_use]
    pub fn gait_snapshot(&self) -> GaitSnapshot {
        query::gait_snapshot(&self.rig)
    }

    /// Drift of every resting limb measured during the most recent tick.
    #[must_use]
    pub fn last_drifts(&self) -> &[LimbDrift] {
        self.gait.last_drifts()
    }

    /// Smoothed visual body anchor hovering above the feet.
    #[must_use]
    pub fn visual_body_anchor(&self) -> Vec3 {
        self.body_height.visual_anchor()
    }

    /// Configuration the controller was created with.
    #[must_use]
    pub fn config(&self) -> &GaitConfig {
        query::config(&self.rig)
    }

    /// Ground oracle the controller queries.
    #[must_use]
    pub fn ground(&self) -> &G {
        &self.ground
    }

    /// Number of ticks processed since creation.
    #[must_use]
    pub fn tick_index(&self) -> u64 {
        query::tick_index(&self.rig)
    }

    fn run(&mut self, command: Command) {
        self.events.clear();
        let mut pending = Vec::new();
        apply(&mut self.rig, command, &mut pending);

        loop {
            if pending.is_empty() {
                break;
            }
            self.events.extend_from_slice(&pending);

            let limb_view = query::limb_view(&self.rig);
            let gait_snapshot = query::gait_snapshot(&self.rig);
            let mut commands = Vec::new();
            self.placement.handle(
                &pending,
                &limb_view,
                &gait_snapshot,
                &self.ground,
                &mut commands,
            );
            self.gait.handle(
                &pending,
                &limb_view,
                &gait_snapshot,
                &self.ground,
                &mut commands,
            );

            if commands.is_empty() {
                break;
            }

            pending.clear();
            for command in commands {
                apply(&mut self.rig, command, &mut pending);
            }
        }

        let limb_view = query::limb_view(&self.rig);
        let pose = query::gait_snapshot(&self.rig).pose;
        self.body_height.handle(&self.events, &limb_view, &pose);
    }
}
