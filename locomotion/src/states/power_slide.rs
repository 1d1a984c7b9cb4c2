use nalgebra::Vector3;

use crate::animation;
use crate::constants::{PROBE_LIFT, SLIDE_PROBE_DISTANCE, STOP_SPEED_SQ};
use crate::motion::{angle_between_deg, clamp_magnitude, normalize_or_zero};

use super::{MovementState, StateContext};

/// Slide out of a sprint.
///
/// On entry the current velocity plus a forward push fixes both the terminal velocity to aim
/// for and the direction to accelerate in. While the slope under the character is shallow enough
/// and the slide is younger than `power_slide.max_time`, velocity grows toward the terminal
/// magnitude; otherwise it decays exponentially. The state finishes once velocity reaches zero.
#[derive(Debug)]
pub struct PowerSlideState {
    desired_velocity: Vector3<f32>,
    slide_velocity: Vector3<f32>,
    elapsed: f32,
}

impl Default for PowerSlideState {
    fn default() -> Self {
        Self {
            desired_velocity: Vector3::zeros(),
            slide_velocity: Vector3::zeros(),
            elapsed: 0.0,
        }
    }
}

impl PowerSlideState {
    /// Unit direction the slide accelerates in.
    pub fn slide_direction(&self) -> Vector3<f32> {
        normalize_or_zero(self.slide_velocity)
    }

    /// `None` when there is no ground below to slide on.
    fn can_keep_sliding(&self, ctx: &StateContext<'_>) -> Option<bool> {
        let up = ctx.up();
        let origin = ctx.motor.position() + up * PROBE_LIFT;
        let hit = ctx.motor.raycast(origin, -up, SLIDE_PROBE_DISTANCE)?;

        let settings = &ctx.settings.power_slide;
        let angle = angle_between_deg(ctx.motor.character_forward(), hit.normal);
        Some(angle < settings.max_slope_angle && self.elapsed < settings.max_time)
    }
}

impl MovementState for PowerSlideState {
    fn enter(&mut self, ctx: &mut StateContext<'_>) {
        ctx.animator.set_trigger(animation::SLIDE_TRIGGER);

        let settings = &ctx.settings.power_slide;
        let velocity = ctx.motor.velocity();
        let forward = ctx.motor.character_forward();
        self.desired_velocity = velocity + forward * settings.max_speed;
        self.slide_velocity = velocity + forward * settings.initial_force;
        self.elapsed = 0.0;
    }

    fn exit(&mut self, ctx: &mut StateContext<'_>) {
        ctx.animator.set_trigger(animation::SLIDE_TRIGGER);
        self.elapsed = 0.0;
    }

    fn update_velocity(&mut self, ctx: &mut StateContext<'_>, velocity: &mut Vector3<f32>, dt: f32) {
        self.elapsed += dt;
        let settings = &ctx.settings.power_slide;

        match self.can_keep_sliding(ctx) {
            Some(true) => {
                let terminal = self.desired_velocity.norm();
                if velocity.norm() < terminal {
                    *velocity += self.slide_velocity * settings.max_acceleration * dt;
                    *velocity = clamp_magnitude(*velocity, terminal);
                }
                *velocity += ctx.settings.gravity * dt;
            }
            Some(false) => {
                *velocity *= (-settings.deceleration * dt).exp();
                if velocity.norm_squared() < STOP_SPEED_SQ {
                    *velocity = Vector3::zeros();
                }
            }
            None => *velocity += ctx.settings.gravity * dt,
        }

        if *velocity == Vector3::zeros() {
            log::debug!("Power slide came to rest after {:.2}s", self.elapsed);
            ctx.finish_state();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StateRig, StubMotor};
    use nalgebra::vector;

    fn sliding_rig(speed: f32) -> StateRig {
        let mut motor = StubMotor::grounded();
        motor.velocity = vector![0.0, 0.0, speed];
        let mut rig = StateRig::new(motor);
        rig.settings.gravity = Vector3::zeros();
        rig
    }

    #[test]
    fn enter_and_exit_fire_the_slide_trigger() {
        let mut rig = sliding_rig(10.0);
        let mut state = PowerSlideState::default();

        state.enter(&mut rig.ctx());
        state.exit(&mut rig.ctx());

        assert_eq!(rig.animator.trigger_count(animation::SLIDE_TRIGGER), 2);
    }

    #[test]
    fn accelerates_forward_but_not_past_the_terminal_speed() {
        let mut rig = sliding_rig(10.0);
        let mut state = PowerSlideState::default();
        state.enter(&mut rig.ctx());
        assert_eq!(state.slide_direction(), vector![0.0, 0.0, 1.0]);

        let mut velocity = rig.motor.velocity;
        state.update_velocity(&mut rig.ctx(), &mut velocity, 0.1);
        assert!((velocity.z - 11.5).abs() < 1.0e-4);

        for _ in 0..13 {
            state.update_velocity(&mut rig.ctx(), &mut velocity, 0.1);
        }
        assert!(velocity.norm() <= 30.0 + 1.0e-4);
        assert!(!rig.shared.finished);
    }

    #[test]
    fn decays_without_reversing_then_finishes() {
        let mut rig = sliding_rig(10.0);
        let mut state = PowerSlideState::default();
        state.enter(&mut rig.ctx());

        let mut velocity = rig.motor.velocity;
        let mut steps = 0;
        while !rig.shared.finished {
            state.update_velocity(&mut rig.ctx(), &mut velocity, 0.1);
            assert!(velocity.z >= 0.0, "slide reversed: {velocity:?}");
            steps += 1;
            assert!(steps < 200, "slide never came to rest");
        }

        assert_eq!(velocity, Vector3::zeros());
        assert!(steps as f32 * 0.1 > rig.settings.power_slide.max_time);
    }

    #[test]
    fn steep_slope_decelerates_immediately() {
        let mut rig = sliding_rig(10.0);
        rig.settings.power_slide.max_slope_angle = 45.0;
        let mut state = PowerSlideState::default();
        state.enter(&mut rig.ctx());

        let mut velocity = rig.motor.velocity;
        state.update_velocity(&mut rig.ctx(), &mut velocity, 0.1);

        assert!((velocity.z - 10.0 * (-0.3_f32).exp()).abs() < 1.0e-4);
    }

    #[test]
    fn without_ground_only_gravity_applies() {
        let mut motor = StubMotor::airborne();
        motor.velocity = vector![0.0, 0.0, 10.0];
        let mut rig = StateRig::new(motor);
        let mut state = PowerSlideState::default();
        state.enter(&mut rig.ctx());

        let mut velocity = rig.motor.velocity;
        state.update_velocity(&mut rig.ctx(), &mut velocity, 0.1);

        assert!((velocity - vector![0.0, -3.0, 10.0]).norm() < 1.0e-5);
    }
}
