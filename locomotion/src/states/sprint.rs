use nalgebra::{UnitQuaternion, Vector3};

use crate::input::CharacterInputs;

use super::{MovementState, StateContext};

/// Ground movement with the sprint speed and turn rate. No crouching.
#[derive(Debug, Default)]
pub struct SprintState;

impl MovementState for SprintState {
    fn tick(&mut self, ctx: &mut StateContext<'_>, inputs: &CharacterInputs) {
        ctx.move_and_look(inputs);
        if ctx.settings.sprint.allow_jumping {
            ctx.request_jump(inputs);
        }
    }

    fn update_velocity(&mut self, ctx: &mut StateContext<'_>, velocity: &mut Vector3<f32>, dt: f32) {
        let sprint = &ctx.settings.sprint;
        ctx.ground_movement(velocity, dt, sprint.sharpness, sprint.max_speed);
        if ctx.settings.sprint.allow_jumping {
            ctx.handle_jump(velocity, dt);
        }
        ctx.apply_external_forces(velocity);
    }

    fn update_rotation(
        &mut self,
        ctx: &mut StateContext<'_>,
        rotation: &mut UnitQuaternion<f32>,
        dt: f32,
    ) {
        let sharpness = ctx.settings.sprint.orientation_sharpness;
        ctx.face_look_direction(rotation, dt, sharpness);
    }

    fn after_update(&mut self, ctx: &mut StateContext<'_>, dt: f32) {
        ctx.push_sprint_animation();
        ctx.update_jump_grounding(dt);
    }
}
