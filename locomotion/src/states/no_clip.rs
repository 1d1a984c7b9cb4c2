use nalgebra::{UnitQuaternion, Vector3};

use crate::input::CharacterInputs;
use crate::motion::{look_rotation, normalize_or_zero, smooth_toward};

use super::{MovementState, StateContext};

/// Debug flight with every collision toggle off.
#[derive(Debug, Default)]
pub struct NoClipState;

impl MovementState for NoClipState {
    fn enter(&mut self, ctx: &mut StateContext<'_>) {
        ctx.motor.set_capsule_collisions(false);
        ctx.motor.set_movement_collision_solving(false);
        ctx.motor.set_ground_solving(false);
    }

    fn tick(&mut self, ctx: &mut StateContext<'_>, inputs: &CharacterInputs) {
        ctx.move_and_look(inputs);
    }

    fn exit(&mut self, ctx: &mut StateContext<'_>) {
        ctx.motor.set_capsule_collisions(true);
        ctx.motor.set_movement_collision_solving(true);
        ctx.motor.set_ground_solving(true);
    }

    fn update_velocity(&mut self, ctx: &mut StateContext<'_>, velocity: &mut Vector3<f32>, dt: f32) {
        let no_clip = &ctx.settings.no_clip;
        let direction = normalize_or_zero(ctx.shared.move_input + ctx.up() * ctx.vertical_input());
        *velocity = smooth_toward(*velocity, direction * no_clip.speed, no_clip.sharpness, dt);
    }

    fn update_rotation(
        &mut self,
        ctx: &mut StateContext<'_>,
        rotation: &mut UnitQuaternion<f32>,
        _dt: f32,
    ) {
        let look = ctx.shared.look_input;
        if ctx.settings.rotate_to_camera_facing && look.norm_squared() > 0.0 {
            *rotation = look_rotation(look, ctx.up());
        }
    }
}
