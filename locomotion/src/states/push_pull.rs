/*!
Push/pull interaction with a [`PushBlock`].

The state runs its own [`StateMachine`] over [`PushPullPhase`]:

- Approach: walk to the closest of the four stand-off points around the block.
- Pushing:  forward/back input moves the character and the block along the block axis the
  character faces.
- Release:  report finished so the character returns to default movement.

Notes
- Interact while attached, or the block disappearing, jumps straight to Release.
- The interact press that selected the block is ignored by the phase machine.
*/

use nalgebra::{Point3, UnitQuaternion, Vector3};

use crate::environment::{BlockId, InteractionTarget, PushBlock};
use crate::input::CharacterInputs;
use crate::motion::{
    compute_desired_translation, look_rotation, normalize_or_zero, project_on_plane,
    slerp_direction, smoothing_factor, MoveTowardParams,
};
use crate::state_machine::{StateHost, StateMachine};

use super::{MovementState, StateContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushPullPhase {
    Approach,
    Pushing,
    Release,
}

/// What the phase transitions look at.
struct PhaseView {
    interact_down: bool,
    just_entered: bool,
    block_present: bool,
    approach_done: bool,
}

#[derive(Debug)]
struct PushPullData {
    block: Option<BlockId>,
    approach_target: Point3<f32>,
    push_axis: Vector3<f32>,
    approach_done: bool,
    push_input: f32,
    just_entered: bool,
}

impl Default for PushPullData {
    fn default() -> Self {
        Self {
            block: None,
            approach_target: Point3::origin(),
            push_axis: Vector3::zeros(),
            approach_done: false,
            push_input: 0.0,
            just_entered: false,
        }
    }
}

/// Phase lifecycle, run against the data and context of the owning state.
struct PhaseHost<'h, 'a> {
    data: &'h mut PushPullData,
    ctx: &'h mut StateContext<'a>,
}

impl PhaseHost<'_, '_> {
    fn choose_approach(&mut self, block: &PushBlock) {
        let position = self.ctx.motor.position();
        let up = self.ctx.up();
        let stand_off = self.ctx.settings.push_pull.stand_off;

        let target = block
            .approach_points(position.y, stand_off)
            .into_iter()
            .min_by(|a, b| {
                (*a - position)
                    .norm_squared()
                    .total_cmp(&(*b - position).norm_squared())
            })
            .unwrap_or(position);

        let mut axis = normalize_or_zero(project_on_plane(block.center - target, up));
        if axis.norm_squared() == 0.0 {
            axis = block.forward();
        }
        self.data.approach_target = target;
        self.data.push_axis = axis;
        self.data.approach_done = false;
    }
}

impl StateHost<PushPullPhase, CharacterInputs> for PhaseHost<'_, '_> {
    fn enter_state(&mut self, state: PushPullPhase, _previous: Option<PushPullPhase>) {
        match state {
            PushPullPhase::Approach => {
                let block = self
                    .data
                    .block
                    .and_then(|id| self.ctx.environment.block(id))
                    .cloned();
                if let Some(block) = block {
                    self.choose_approach(&block);
                }
            }
            PushPullPhase::Pushing => {
                log::debug!("Attached to push block along {:?}", self.data.push_axis);
            }
            PushPullPhase::Release => self.ctx.finish_state(),
        }
    }

    fn exit_state(&mut self, state: PushPullPhase) {
        if state == PushPullPhase::Pushing {
            self.data.push_input = 0.0;
        }
    }

    fn tick_state(&mut self, state: PushPullPhase, inputs: &CharacterInputs) {
        if state == PushPullPhase::Pushing {
            self.data.push_input = inputs.move_forward.clamp(-1.0, 1.0);
        }
    }
}

/// Walk up to a push block and shove it.
pub struct PushPullState {
    machine: StateMachine<PushPullPhase, PhaseView>,
    data: PushPullData,
}

impl Default for PushPullState {
    fn default() -> Self {
        Self {
            machine: Self::phase_machine(),
            data: PushPullData::default(),
        }
    }
}

impl PushPullState {
    fn phase_machine() -> StateMachine<PushPullPhase, PhaseView> {
        let mut machine = StateMachine::new();
        machine.add_any_transition(PushPullPhase::Release, |view: &PhaseView| {
            !view.block_present || (view.interact_down && !view.just_entered)
        });
        machine.add_transition(PushPullPhase::Approach, PushPullPhase::Pushing, |view: &PhaseView| {
            view.approach_done
        });
        machine
    }

    pub fn phase(&self) -> Option<PushPullPhase> {
        self.machine.current()
    }

    pub fn block(&self) -> Option<BlockId> {
        self.data.block
    }
}

impl MovementState for PushPullState {
    fn enter(&mut self, ctx: &mut StateContext<'_>) {
        self.machine = Self::phase_machine();
        self.data = PushPullData::default();

        let block = match ctx.shared.interaction_target {
            Some(InteractionTarget::Block(id)) if ctx.environment.block(id).is_some() => id,
            _ => {
                log::warn!("Push/pull started without a block, returning to default movement");
                ctx.finish_state();
                return;
            }
        };
        self.data.block = Some(block);
        self.data.just_entered = true;

        let mut host = PhaseHost {
            data: &mut self.data,
            ctx,
        };
        self.machine.set_state(PushPullPhase::Approach, &mut host);
    }

    fn tick(&mut self, ctx: &mut StateContext<'_>, inputs: &CharacterInputs) {
        if self.machine.current().is_none() {
            return;
        }

        let view = PhaseView {
            interact_down: inputs.interact_down,
            just_entered: self.data.just_entered,
            block_present: self
                .data
                .block
                .is_some_and(|id| ctx.environment.block(id).is_some()),
            approach_done: self.data.approach_done,
        };
        let mut host = PhaseHost {
            data: &mut self.data,
            ctx,
        };
        if let Err(err) = self.machine.tick(&view, &mut host, inputs) {
            log::error!("Push/pull phase update failed: {err}");
        }
        self.data.just_entered = false;
    }

    fn exit(&mut self, _ctx: &mut StateContext<'_>) {
        self.data.block = None;
    }

    fn update_velocity(&mut self, ctx: &mut StateContext<'_>, velocity: &mut Vector3<f32>, dt: f32) {
        let Some(block) = self.data.block else {
            *velocity = Vector3::zeros();
            return;
        };
        let settings = &ctx.settings.push_pull;

        match self.machine.current() {
            Some(PushPullPhase::Approach) => {
                let step = compute_desired_translation(MoveTowardParams {
                    current: ctx.motor.position(),
                    target: self.data.approach_target,
                    speed_mps: settings.approach_speed,
                    dt_seconds: dt,
                    acceptance_radius: settings.approach_acceptance,
                });
                *velocity = if dt > 0.0 {
                    step.desired_translation / dt
                } else {
                    Vector3::zeros()
                };
                self.data.approach_done = step.finished;
            }
            Some(PushPullPhase::Pushing) => {
                *velocity = self.data.push_axis * self.data.push_input * settings.push_speed;
                if let Some(block) = ctx.environment.block_mut(block) {
                    block.translate(*velocity * dt);
                }
            }
            _ => *velocity = Vector3::zeros(),
        }
    }

    fn update_rotation(
        &mut self,
        ctx: &mut StateContext<'_>,
        rotation: &mut UnitQuaternion<f32>,
        dt: f32,
    ) {
        if self.data.push_axis.norm_squared() == 0.0 {
            return;
        }
        let facing = slerp_direction(
            ctx.motor.character_forward(),
            self.data.push_axis,
            smoothing_factor(ctx.settings.movement.orientation_sharpness, dt),
        );
        *rotation = look_rotation(facing, ctx.up());
    }
}
