use nalgebra::{UnitQuaternion, Vector3};

use crate::constants::DIST_EPS;
use crate::input::CharacterInputs;
use crate::motion::{normalize_or_zero, project_on_axis, project_on_plane, smooth_toward};

use super::{MovementState, StateContext};

/// Free 3D movement inside a water volume.
///
/// Jump held swims up, crouch held swims down. Velocity that would carry the swimming reference
/// point out of the water is flattened onto the surface, unless a jump breaches it.
#[derive(Debug, Default)]
pub struct SwimmingState;

impl MovementState for SwimmingState {
    fn enter(&mut self, ctx: &mut StateContext<'_>) {
        ctx.motor.set_ground_solving(false);
    }

    fn tick(&mut self, ctx: &mut StateContext<'_>, inputs: &CharacterInputs) {
        ctx.shared.jump_requested = inputs.jump_held;
        ctx.move_and_look(inputs);
    }

    fn exit(&mut self, ctx: &mut StateContext<'_>) {
        ctx.motor.set_ground_solving(true);
    }

    fn update_velocity(&mut self, ctx: &mut StateContext<'_>, velocity: &mut Vector3<f32>, dt: f32) {
        let Some(water) = ctx.shared.water else {
            return;
        };
        let up = ctx.up();
        let swimming = &ctx.settings.swimming;

        let target = normalize_or_zero(ctx.shared.move_input + up * ctx.vertical_input())
            * swimming.speed;
        let mut smoothed = smooth_toward(*velocity, target, swimming.sharpness, dt);

        let predicted = ctx.swimming_reference_point() + smoothed * dt;
        let surface = water.closest_point(predicted);
        let outward = predicted - surface;
        if outward.norm() > DIST_EPS {
            smoothed = project_on_plane(smoothed, normalize_or_zero(outward));

            if ctx.shared.jump_requested {
                smoothed += up * ctx.settings.jump.speed - project_on_axis(*velocity, up);
            }
        }

        *velocity = smoothed;
    }

    fn update_rotation(
        &mut self,
        ctx: &mut StateContext<'_>,
        rotation: &mut UnitQuaternion<f32>,
        dt: f32,
    ) {
        let sharpness = ctx.settings.movement.orientation_sharpness;
        ctx.face_look_direction(rotation, dt, sharpness);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::WaterVolume;
    use crate::motor::Motor;
    use crate::testing::{StateRig, StubMotor};
    use nalgebra::{point, vector};

    /// Pool whose surface sits at y = 0.
    fn pool() -> WaterVolume {
        WaterVolume::new(point![0.0, -5.0, 0.0], vector![10.0, 5.0, 10.0], UnitQuaternion::identity())
    }

    fn swimmer_at(y: f32) -> StateRig {
        let mut motor = StubMotor::airborne();
        // Reference point sits 1.5 above the feet.
        motor.position = point![0.0, y - 1.5, 0.0];
        let mut rig = StateRig::new(motor);
        rig.shared.water = Some(pool());
        rig
    }

    #[test]
    fn ground_solving_is_off_while_swimming() {
        let mut rig = swimmer_at(-2.0);
        let mut state = SwimmingState;

        state.enter(&mut rig.ctx());
        assert!(!rig.motor.toggles().ground_solving);
        state.exit(&mut rig.ctx());
        assert!(rig.motor.toggles().ground_solving);
    }

    #[test]
    fn swims_toward_input_inside_the_volume() {
        let mut rig = swimmer_at(-2.0);
        let mut state = SwimmingState;
        state.tick(
            &mut rig.ctx(),
            &CharacterInputs {
                move_forward: 1.0,
                ..CharacterInputs::default()
            },
        );

        let mut velocity = Vector3::zeros();
        for _ in 0..240 {
            state.update_velocity(&mut rig.ctx(), &mut velocity, 1.0 / 60.0);
        }

        assert!((velocity - vector![0.0, 0.0, 4.0]).norm() < 1.0e-2);
    }

    #[test]
    fn velocity_leaving_the_surface_is_flattened() {
        let mut rig = swimmer_at(-0.01);
        let mut state = SwimmingState;
        state.tick(&mut rig.ctx(), &CharacterInputs::default());
        rig.shared.jump_held = true;

        let mut velocity = vector![1.0, 3.0, 0.0];
        state.update_velocity(&mut rig.ctx(), &mut velocity, 0.1);

        let outward = Vector3::y();
        assert!(velocity.dot(&outward).abs() < 1.0e-5, "got {velocity:?}");
        assert!(velocity.x > 0.0);
    }

    #[test]
    fn jump_breaches_the_surface() {
        let mut rig = swimmer_at(-0.01);
        let mut state = SwimmingState;
        state.tick(
            &mut rig.ctx(),
            &CharacterInputs {
                jump_held: true,
                ..CharacterInputs::default()
            },
        );
        rig.shared.jump_held = true;

        let mut velocity = vector![0.0, 3.0, 0.0];
        state.update_velocity(&mut rig.ctx(), &mut velocity, 0.1);

        assert!((velocity.y - (10.0 - 3.0)).abs() < 1.0e-4);
    }

    #[test]
    fn no_water_leaves_velocity_untouched() {
        let mut rig = swimmer_at(-2.0);
        rig.shared.water = None;
        let mut state = SwimmingState;

        let mut velocity = vector![1.0, 2.0, 3.0];
        state.update_velocity(&mut rig.ctx(), &mut velocity, 0.1);

        assert_eq!(velocity, vector![1.0, 2.0, 3.0]);
    }
}
