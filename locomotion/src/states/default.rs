use nalgebra::{UnitQuaternion, Vector3};

use crate::input::CharacterInputs;
use crate::motor::{HitStabilityReport, MovementHit};

use super::{MovementState, StateContext};

/// Walking, crouching and jumping.
#[derive(Debug, Default)]
pub struct DefaultState;

impl MovementState for DefaultState {
    fn tick(&mut self, ctx: &mut StateContext<'_>, inputs: &CharacterInputs) {
        ctx.move_and_look(inputs);
        ctx.request_jump(inputs);
        ctx.handle_crouch(inputs);
    }

    fn update_velocity(&mut self, ctx: &mut StateContext<'_>, velocity: &mut Vector3<f32>, dt: f32) {
        let movement = &ctx.settings.movement;
        ctx.ground_movement(velocity, dt, movement.sharpness, movement.max_speed);
        ctx.handle_jump(velocity, dt);
        ctx.apply_external_forces(velocity);
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

    fn after_update(&mut self, ctx: &mut StateContext<'_>, dt: f32) {
        ctx.push_planar_animation(None);
        ctx.update_jump_grounding(dt);
        ctx.update_uncrouch();
    }

    fn on_movement_hit(
        &mut self,
        ctx: &mut StateContext<'_>,
        hit: &MovementHit,
        report: &HitStabilityReport,
    ) {
        ctx.detect_wall_jump(hit, report.is_stable);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation;
    use crate::motor::Motor;
    use crate::testing::{StateRig as Rig, StubMotor};
    use nalgebra::vector;

    fn forward_input() -> CharacterInputs {
        CharacterInputs {
            move_forward: 1.0,
            ..CharacterInputs::default()
        }
    }

    #[test]
    fn ground_velocity_approaches_max_speed_along_input() {
        let mut rig = Rig::new(StubMotor::grounded());
        let mut state = DefaultState;
        state.tick(&mut rig.ctx(), &forward_input());

        let mut velocity = Vector3::zeros();
        for _ in 0..120 {
            state.update_velocity(&mut rig.ctx(), &mut velocity, 1.0 / 60.0);
        }

        assert!((velocity - vector![0.0, 0.0, 10.0]).norm() < 1.0e-3);
        assert_eq!(rig.animator.last_bool(animation::IS_GROUNDED), Some(true));
    }

    #[test]
    fn airborne_velocity_gains_gravity_and_drag() {
        let mut rig = Rig::new(StubMotor::airborne());
        let mut state = DefaultState;
        let dt = 0.1;

        let mut velocity = Vector3::zeros();
        state.update_velocity(&mut rig.ctx(), &mut velocity, dt);

        let expected = -30.0 * dt / (1.0 + 0.1 * dt);
        assert!((velocity.y - expected).abs() < 1.0e-5);
        assert_eq!(rig.animator.last_bool(animation::IS_GROUNDED), Some(false));
    }

    #[test]
    fn jump_replaces_vertical_velocity_and_is_consumed() {
        let mut rig = Rig::new(StubMotor::grounded());
        let mut state = DefaultState;
        state.tick(
            &mut rig.ctx(),
            &CharacterInputs {
                jump_down: true,
                ..CharacterInputs::default()
            },
        );

        let mut velocity = vector![0.0, -4.0, 0.0];
        state.update_velocity(&mut rig.ctx(), &mut velocity, 1.0 / 60.0);

        assert!((velocity.y - 10.0).abs() < 1.0e-4);
        assert!(rig.shared.jump_consumed);
        assert!(!rig.shared.jump_requested);
        assert!(rig.motor.unground_remaining > 0.0);
        assert_eq!(rig.animator.trigger_count(animation::JUMP_TRIGGER), 1);
    }

    #[test]
    fn stale_jump_request_expires_after_the_pre_grounding_grace() {
        let mut rig = Rig::new(StubMotor::airborne());
        rig.settings.jump.pre_grounding_grace_time = 0.1;
        rig.shared.time_since_last_able_to_jump = 1.0;
        let mut state = DefaultState;
        state.tick(
            &mut rig.ctx(),
            &CharacterInputs {
                jump_down: true,
                ..CharacterInputs::default()
            },
        );

        let dt = 0.05;
        let mut velocity = Vector3::zeros();
        state.update_velocity(&mut rig.ctx(), &mut velocity, dt);
        state.after_update(&mut rig.ctx(), dt);
        assert!(rig.shared.jump_requested, "still inside the grace window");

        for _ in 0..2 {
            state.update_velocity(&mut rig.ctx(), &mut velocity, dt);
            state.after_update(&mut rig.ctx(), dt);
        }
        assert!(!rig.shared.jump_requested);
    }

    #[test]
    fn coyote_time_allows_a_jump_shortly_after_leaving_ground() {
        let mut rig = Rig::new(StubMotor::airborne());
        rig.settings.jump.post_grounding_grace_time = 0.2;
        rig.shared.time_since_last_able_to_jump = 0.1;
        let mut state = DefaultState;
        state.tick(
            &mut rig.ctx(),
            &CharacterInputs {
                jump_down: true,
                ..CharacterInputs::default()
            },
        );

        let mut velocity = Vector3::zeros();
        state.update_velocity(&mut rig.ctx(), &mut velocity, 0.01);

        assert!(rig.shared.jump_consumed);
        assert!(velocity.y > 0.0);
    }

    #[test]
    fn double_jump_needs_the_setting_and_a_consumed_first_jump() {
        let mut rig = Rig::new(StubMotor::airborne());
        rig.settings.jump.allow_double_jump = true;
        rig.shared.jump_consumed = true;
        let mut state = DefaultState;
        state.tick(
            &mut rig.ctx(),
            &CharacterInputs {
                jump_down: true,
                ..CharacterInputs::default()
            },
        );

        let mut velocity = vector![0.0, -8.0, 0.0];
        state.update_velocity(&mut rig.ctx(), &mut velocity, 0.01);

        assert!(rig.shared.double_jump_consumed);
        assert!(velocity.y > 0.0);
        assert_eq!(rig.animator.trigger_count(animation::JUMP_TRIGGER), 1);
    }

    #[test]
    fn wall_jump_pushes_along_the_wall_normal() {
        let mut rig = Rig::new(StubMotor::airborne());
        rig.settings.jump.allow_wall_jump = true;
        rig.shared.jump_consumed = true;
        let mut state = DefaultState;

        let wall = MovementHit {
            layer: 0,
            normal: vector![-1.0, 0.0, 0.0],
            point: nalgebra::point![0.5, 10.0, 0.0],
        };
        state.on_movement_hit(&mut rig.ctx(), &wall, &HitStabilityReport { is_stable: false });
        assert!(rig.shared.can_wall_jump);

        state.tick(
            &mut rig.ctx(),
            &CharacterInputs {
                jump_down: true,
                ..CharacterInputs::default()
            },
        );
        let mut velocity = Vector3::zeros();
        state.update_velocity(&mut rig.ctx(), &mut velocity, 0.01);

        assert!(velocity.x < -5.0);
        assert!(!rig.shared.can_wall_jump);
    }

    #[test]
    fn landing_refills_jumps_unless_jumping_this_frame() {
        let mut rig = Rig::new(StubMotor::grounded());
        rig.shared.jump_consumed = true;
        rig.shared.double_jump_consumed = true;
        rig.shared.jumped_this_frame = true;
        let mut state = DefaultState;

        state.after_update(&mut rig.ctx(), 0.01);
        assert!(rig.shared.jump_consumed);

        rig.shared.jumped_this_frame = false;
        state.after_update(&mut rig.ctx(), 0.01);
        assert!(!rig.shared.jump_consumed);
        assert!(!rig.shared.double_jump_consumed);
        assert_eq!(rig.shared.time_since_last_able_to_jump, 0.0);
    }

    #[test]
    fn crouch_shrinks_capsule_and_obstruction_keeps_it_small() {
        let mut rig = Rig::new(StubMotor::grounded());
        let mut state = DefaultState;
        let crouched = rig.settings.crouch.crouched;
        let standing = rig.settings.crouch.standing;

        state.tick(
            &mut rig.ctx(),
            &CharacterInputs {
                crouch_down: true,
                crouch_held: true,
                ..CharacterInputs::default()
            },
        );
        assert_eq!(rig.motor.capsule_dimensions(), crouched);

        state.tick(
            &mut rig.ctx(),
            &CharacterInputs {
                crouch_up: true,
                ..CharacterInputs::default()
            },
        );
        rig.motor.overlapping = true;
        state.after_update(&mut rig.ctx(), 0.01);
        assert!(rig.shared.is_crouching);
        assert_eq!(rig.motor.capsule_dimensions(), crouched);

        rig.motor.overlapping = false;
        state.after_update(&mut rig.ctx(), 0.01);
        assert!(!rig.shared.is_crouching);
        assert_eq!(rig.motor.capsule_dimensions(), standing);
    }

    #[test]
    fn rotation_turns_toward_camera_heading() {
        let mut rig = Rig::new(StubMotor::grounded());
        let mut state = DefaultState;
        let camera = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f32::consts::FRAC_PI_2);
        state.tick(
            &mut rig.ctx(),
            &CharacterInputs {
                camera_rotation: camera,
                ..CharacterInputs::default()
            },
        );

        let mut rotation = rig.motor.rotation();
        for _ in 0..200 {
            state.update_rotation(&mut rig.ctx(), &mut rotation, 1.0 / 60.0);
            rig.motor.rotation = rotation;
        }

        let forward = rotation * Vector3::z();
        assert!((forward - vector![1.0, 0.0, 0.0]).norm() < 1.0e-3);
    }

    #[test]
    fn external_impulse_is_applied_once() {
        let mut rig = Rig::new(StubMotor::airborne());
        rig.settings.gravity = Vector3::zeros();
        rig.settings.air.drag = 0.0;
        rig.shared.pending_velocity = vector![3.0, 0.0, 0.0];
        let mut state = DefaultState;

        let mut velocity = Vector3::zeros();
        state.update_velocity(&mut rig.ctx(), &mut velocity, 0.01);
        state.update_velocity(&mut rig.ctx(), &mut velocity, 0.01);

        assert!((velocity.x - 3.0).abs() < 1.0e-6);
    }
}
