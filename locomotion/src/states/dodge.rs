use nalgebra::Vector3;

use crate::animation;
use crate::flags::{DodgeDirection, DodgeDirections};
use crate::input::CharacterInputs;

use super::{CharacterState, MovementState, StateContext};

/// Where a dodge was started from. Each context has its own direction mask and force.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DodgeContext {
    Sprint,
    Air,
    Ground,
}

/// One-shot directional impulse.
///
/// The first input tick picks a cardinal direction from the move axes, checked against the mask of
/// the context the dodge started in. The next velocity update applies the impulse once and
/// finishes; without an allowed direction the state finishes without moving.
#[derive(Debug, Default)]
pub struct DodgeState {
    direction: Option<Vector3<f32>>,
    has_direction: bool,
    has_dodged: bool,
    was_sprinting: bool,
}

impl DodgeState {
    fn context(&self, ctx: &StateContext<'_>) -> Option<DodgeContext> {
        let dodge = &ctx.settings.dodge;
        let stable = ctx.motor.grounding().is_stable_on_ground;
        if self.was_sprinting && dodge.in_sprint {
            Some(DodgeContext::Sprint)
        } else if dodge.in_air && !stable {
            Some(DodgeContext::Air)
        } else if stable {
            Some(DodgeContext::Ground)
        } else {
            None
        }
    }

    fn allowed(ctx: &StateContext<'_>, context: DodgeContext) -> DodgeDirections {
        let dodge = &ctx.settings.dodge;
        match context {
            DodgeContext::Sprint => dodge.sprint_directions,
            DodgeContext::Air => dodge.air_directions,
            DodgeContext::Ground => dodge.directions,
        }
    }

    fn force(&self, ctx: &StateContext<'_>) -> f32 {
        let dodge = &ctx.settings.dodge;
        if self.was_sprinting {
            dodge.sprint_force
        } else if dodge.in_air && !ctx.motor.grounding().found_any_ground {
            dodge.air_force
        } else {
            dodge.force
        }
    }
}

impl MovementState for DodgeState {
    fn enter(&mut self, ctx: &mut StateContext<'_>) {
        self.direction = None;
        self.has_direction = false;
        self.has_dodged = false;
        self.was_sprinting = ctx.previous_state == Some(CharacterState::Sprinting);
    }

    fn tick(&mut self, ctx: &mut StateContext<'_>, inputs: &CharacterInputs) {
        if self.has_direction {
            return;
        }
        self.has_direction = true;

        let Some(context) = self.context(ctx) else {
            return;
        };
        let allowed = Self::allowed(ctx, context);
        let candidates = [
            (inputs.move_forward > 0.0, DodgeDirection::Forward, ctx.motor.character_forward()),
            (inputs.move_forward < 0.0, DodgeDirection::Back, -ctx.motor.character_forward()),
            (inputs.move_right > 0.0, DodgeDirection::Right, ctx.motor.character_right()),
            (inputs.move_right < 0.0, DodgeDirection::Left, -ctx.motor.character_right()),
        ];
        self.direction = candidates
            .into_iter()
            .find(|(pressed, direction, _)| *pressed && allowed.contains(*direction))
            .map(|(_, _, vector)| vector);
    }

    fn exit(&mut self, _ctx: &mut StateContext<'_>) {
        self.was_sprinting = false;
    }

    fn update_velocity(&mut self, ctx: &mut StateContext<'_>, velocity: &mut Vector3<f32>, _dt: f32) {
        if self.has_dodged {
            return;
        }
        match self.direction {
            Some(direction) if self.has_direction => {
                ctx.animator.set_trigger(animation::DODGE_TRIGGER);
                *velocity += direction * self.force(ctx);
                self.has_dodged = true;
                ctx.finish_state();
            }
            None if self.has_direction => {
                log::debug!("Dodge without an allowed direction");
                ctx.finish_state();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StateRig, StubMotor};
    use nalgebra::{UnitQuaternion, vector};

    fn input(forward: f32, right: f32) -> CharacterInputs {
        CharacterInputs {
            move_forward: forward,
            move_right: right,
            dodge_down: true,
            ..CharacterInputs::default()
        }
    }

    #[test]
    fn forward_only_mask_applies_the_impulse_exactly_once() {
        let mut motor = StubMotor::grounded();
        motor.rotation = UnitQuaternion::from_axis_angle(&nalgebra::Vector3::y_axis(), 0.7);
        let mut rig = StateRig::new(motor);
        rig.settings.dodge.directions = DodgeDirections::from_slice(&[DodgeDirection::Forward]);
        let mut state = DodgeState::default();
        state.enter(&mut rig.ctx());
        state.tick(&mut rig.ctx(), &input(1.0, 0.0));

        let mut velocity = Vector3::zeros();
        state.update_velocity(&mut rig.ctx(), &mut velocity, 1.0 / 60.0);
        state.update_velocity(&mut rig.ctx(), &mut velocity, 1.0 / 60.0);

        let expected = rig.motor.rotation * Vector3::z() * 15.0;
        assert!((velocity - expected).norm() < 1.0e-5);
        assert!(rig.shared.finished);
        assert_eq!(rig.animator.trigger_count(animation::DODGE_TRIGGER), 1);
    }

    #[test]
    fn disallowed_direction_finishes_without_moving() {
        let mut rig = StateRig::new(StubMotor::grounded());
        rig.settings.dodge.directions = DodgeDirections::from_slice(&[DodgeDirection::Forward]);
        let mut state = DodgeState::default();
        state.enter(&mut rig.ctx());
        state.tick(&mut rig.ctx(), &input(0.0, 1.0));

        let mut velocity = Vector3::zeros();
        state.update_velocity(&mut rig.ctx(), &mut velocity, 1.0 / 60.0);

        assert_eq!(velocity, Vector3::zeros());
        assert!(rig.shared.finished);
        assert_eq!(rig.animator.trigger_count(animation::DODGE_TRIGGER), 0);
    }

    #[test]
    fn direction_is_read_on_the_first_tick_only() {
        let mut rig = StateRig::new(StubMotor::grounded());
        let mut state = DodgeState::default();
        state.enter(&mut rig.ctx());
        state.tick(&mut rig.ctx(), &input(0.0, -1.0));
        state.tick(&mut rig.ctx(), &input(1.0, 0.0));

        let mut velocity = Vector3::zeros();
        state.update_velocity(&mut rig.ctx(), &mut velocity, 1.0 / 60.0);

        assert!((velocity - vector![-15.0, 0.0, 0.0]).norm() < 1.0e-5);
    }

    #[test]
    fn sprint_dodge_uses_sprint_mask_and_force() {
        let mut rig = StateRig::new(StubMotor::grounded());
        rig.previous_state = Some(CharacterState::Sprinting);
        let mut state = DodgeState::default();
        state.enter(&mut rig.ctx());

        // Sprint dodges only go sideways by default.
        state.tick(&mut rig.ctx(), &input(1.0, 1.0));
        let mut velocity = Vector3::zeros();
        state.update_velocity(&mut rig.ctx(), &mut velocity, 1.0 / 60.0);

        assert!((velocity - vector![20.0, 0.0, 0.0]).norm() < 1.0e-5);
    }

    #[test]
    fn air_dodge_needs_the_setting() {
        let mut rig = StateRig::new(StubMotor::airborne());
        let mut state = DodgeState::default();
        state.enter(&mut rig.ctx());
        state.tick(&mut rig.ctx(), &input(1.0, 0.0));
        let mut velocity = Vector3::zeros();
        state.update_velocity(&mut rig.ctx(), &mut velocity, 1.0 / 60.0);
        assert_eq!(velocity, Vector3::zeros());

        rig.settings.dodge.in_air = true;
        rig.shared.finished = false;
        state.enter(&mut rig.ctx());
        state.tick(&mut rig.ctx(), &input(1.0, 0.0));
        state.update_velocity(&mut rig.ctx(), &mut velocity, 1.0 / 60.0);
        assert!((velocity - vector![0.0, 0.0, 10.0]).norm() < 1.0e-5);
    }
}
