use nalgebra::{Point3, UnitQuaternion, Vector3};

use crate::constants::LADDER_EXIT_EPS;
use crate::environment::{InteractionTarget, Ladder, LadderId};
use crate::input::CharacterInputs;
use crate::motion::normalize_or_zero;

use super::{MovementState, StateContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClimbingPhase {
    /// Moving from where the interaction started onto the ladder.
    Anchoring,
    Climbing,
    /// Moving off the ladder to a release pose.
    DeAnchoring,
}

/// Ladder climbing.
///
/// Anchoring and de-anchoring interpolate position and rotation from the pose the phase started
/// at to a target pose over `climbing.anchoring_duration`, producing the velocity that reaches the
/// interpolated position instead of teleporting. While climbing, forward input moves along the
/// ladder's up axis. Leaving the segment past either end de-anchors toward that end's release
/// pose; pressing interact de-anchors in place.
#[derive(Debug)]
pub struct ClimbingState {
    ladder: Option<LadderId>,
    phase: ClimbingPhase,
    anchoring_timer: f32,
    start_position: Point3<f32>,
    start_rotation: UnitQuaternion<f32>,
    target_position: Point3<f32>,
    target_rotation: UnitQuaternion<f32>,
    rotation_before_climbing: UnitQuaternion<f32>,
    up_down_input: f32,
}

impl Default for ClimbingState {
    fn default() -> Self {
        Self {
            ladder: None,
            phase: ClimbingPhase::Anchoring,
            anchoring_timer: 0.0,
            start_position: Point3::origin(),
            start_rotation: UnitQuaternion::identity(),
            target_position: Point3::origin(),
            target_rotation: UnitQuaternion::identity(),
            rotation_before_climbing: UnitQuaternion::identity(),
            up_down_input: 0.0,
        }
    }
}

impl ClimbingState {
    pub fn phase(&self) -> ClimbingPhase {
        self.phase
    }

    pub fn ladder(&self) -> Option<LadderId> {
        self.ladder
    }

    fn set_phase(&mut self, ctx: &StateContext<'_>, phase: ClimbingPhase) {
        self.phase = phase;
        self.anchoring_timer = 0.0;
        self.start_position = ctx.motor.position();
        self.start_rotation = ctx.motor.rotation();
    }

    /// Resolve the active ladder, or finish the state if it has gone away.
    fn active_ladder<'e>(&self, ctx: &'e StateContext<'_>) -> Option<&'e Ladder> {
        self.ladder.and_then(|id| ctx.environment.ladder(id))
    }

    fn abandon(&mut self, ctx: &mut StateContext<'_>) {
        log::warn!("Climbing without a ladder, returning to default movement");
        self.ladder = None;
        ctx.finish_state();
    }

    fn anchoring_progress(&self, ctx: &StateContext<'_>) -> f32 {
        (self.anchoring_timer / ctx.settings.climbing.anchoring_duration).clamp(0.0, 1.0)
    }
}

impl MovementState for ClimbingState {
    fn enter(&mut self, ctx: &mut StateContext<'_>) {
        self.rotation_before_climbing = ctx.motor.rotation();
        self.up_down_input = 0.0;
        ctx.motor.set_movement_collision_solving(false);
        ctx.motor.set_ground_solving(false);
        self.set_phase(ctx, ClimbingPhase::Anchoring);

        self.ladder = match ctx.shared.interaction_target {
            Some(InteractionTarget::Ladder(id)) => Some(id),
            _ => None,
        };
        let Some(ladder) = self.active_ladder(ctx) else {
            self.abandon(ctx);
            return;
        };

        let (anchor, _) = ladder.closest_point_on_segment(ctx.motor.position());
        self.target_position = anchor;
        self.target_rotation = ladder.rotation;
    }

    fn tick(&mut self, ctx: &mut StateContext<'_>, inputs: &CharacterInputs) {
        self.up_down_input = inputs.move_forward;

        if inputs.interact_down && self.phase == ClimbingPhase::Climbing {
            self.set_phase(ctx, ClimbingPhase::DeAnchoring);
            self.target_position = ctx.motor.position();
            self.target_rotation = self.rotation_before_climbing;
        }
    }

    fn exit(&mut self, ctx: &mut StateContext<'_>) {
        ctx.motor.set_movement_collision_solving(true);
        ctx.motor.set_ground_solving(true);
        self.ladder = None;
    }

    fn update_velocity(&mut self, ctx: &mut StateContext<'_>, velocity: &mut Vector3<f32>, dt: f32) {
        *velocity = Vector3::zeros();

        match self.phase {
            ClimbingPhase::Climbing => {
                let Some(ladder) = self.active_ladder(ctx) else {
                    self.abandon(ctx);
                    return;
                };
                *velocity = normalize_or_zero(ladder.up().into_inner() * self.up_down_input)
                    * ctx.settings.climbing.speed;
            }
            ClimbingPhase::Anchoring | ClimbingPhase::DeAnchoring => {
                let t = self.anchoring_progress(ctx);
                let waypoint = self.start_position.coords.lerp(&self.target_position.coords, t);
                *velocity = ctx.motor.velocity_for_move_position(
                    ctx.motor.position(),
                    Point3::from(waypoint),
                    dt,
                );
            }
        }
    }

    fn update_rotation(
        &mut self,
        ctx: &mut StateContext<'_>,
        rotation: &mut UnitQuaternion<f32>,
        _dt: f32,
    ) {
        match self.phase {
            ClimbingPhase::Climbing => {
                if let Some(ladder) = self.active_ladder(ctx) {
                    *rotation = ladder.rotation;
                }
            }
            ClimbingPhase::Anchoring | ClimbingPhase::DeAnchoring => {
                let t = self.anchoring_progress(ctx);
                *rotation = self.start_rotation.slerp(&self.target_rotation, t);
            }
        }
    }

    fn after_update(&mut self, ctx: &mut StateContext<'_>, dt: f32) {
        match self.phase {
            ClimbingPhase::Climbing => {
                let Some(ladder) = self.active_ladder(ctx) else {
                    self.abandon(ctx);
                    return;
                };
                let (_, overshoot) = ladder.closest_point_on_segment(ctx.motor.position());
                if overshoot.abs() > LADDER_EXIT_EPS {
                    let release = if overshoot > 0.0 {
                        ladder.top_release
                    } else {
                        ladder.bottom_release
                    };
                    log::debug!("Leaving ladder past the {}", if overshoot > 0.0 { "top" } else { "bottom" });
                    self.set_phase(ctx, ClimbingPhase::DeAnchoring);
                    self.target_position = release.position;
                    self.target_rotation = release.rotation;
                }
            }
            ClimbingPhase::Anchoring | ClimbingPhase::DeAnchoring => {
                if self.anchoring_timer >= ctx.settings.climbing.anchoring_duration {
                    match self.phase {
                        ClimbingPhase::Anchoring => self.set_phase(ctx, ClimbingPhase::Climbing),
                        _ => ctx.finish_state(),
                    }
                }
                self.anchoring_timer += dt;
            }
        }
    }
}
