use nalgebra::Vector3;

use crate::constants::{CHARGE_OBSTRUCTION_DOT, TIME_EPS};
use crate::motion::{normalize_or_zero, project_on_axis};
use crate::motor::{HitStabilityReport, MovementHit};

use super::{MovementState, StateContext};

/// Scripted forward dash. Steering is ignored; gravity keeps applying.
///
/// The charge stops after `charge.max_time` or on a front-on hit with an unwalkable surface. The
/// next velocity update zeroes the velocity once, then the character waits
/// `charge.stopped_time` before the state reports finished.
#[derive(Debug, Default)]
pub struct ChargeState {
    charge_velocity: Vector3<f32>,
    is_stopped: bool,
    must_stop_velocity: bool,
    time_since_started: f32,
    time_since_stopped: f32,
}

impl ChargeState {
    pub fn is_stopped(&self) -> bool {
        self.is_stopped
    }

    fn stop(&mut self) {
        self.is_stopped = true;
        self.must_stop_velocity = true;
    }
}

impl MovementState for ChargeState {
    fn enter(&mut self, ctx: &mut StateContext<'_>) {
        self.charge_velocity = ctx.motor.character_forward() * ctx.settings.charge.speed;
        self.is_stopped = false;
        self.must_stop_velocity = false;
        self.time_since_started = 0.0;
        self.time_since_stopped = 0.0;
    }

    fn update_velocity(&mut self, ctx: &mut StateContext<'_>, velocity: &mut Vector3<f32>, dt: f32) {
        if self.must_stop_velocity {
            *velocity = Vector3::zeros();
            self.must_stop_velocity = false;
        }

        if !self.is_stopped {
            let up = ctx.up();
            *velocity = self.charge_velocity - project_on_axis(self.charge_velocity, up)
                + project_on_axis(*velocity, up);
        }
        *velocity += ctx.settings.gravity * dt;
    }

    fn before_update(&mut self, _ctx: &mut StateContext<'_>, dt: f32) {
        self.time_since_started += dt;
        if self.is_stopped {
            self.time_since_stopped += dt;
        }
    }

    fn after_update(&mut self, ctx: &mut StateContext<'_>, _dt: f32) {
        let charge = &ctx.settings.charge;
        if !self.is_stopped && self.time_since_started + TIME_EPS >= charge.max_time {
            log::debug!("Charge timed out after {:.2}s", self.time_since_started);
            self.stop();
        }

        if self.is_stopped && self.time_since_stopped + TIME_EPS >= charge.stopped_time {
            ctx.finish_state();
        }
    }

    fn on_movement_hit(
        &mut self,
        _ctx: &mut StateContext<'_>,
        hit: &MovementHit,
        report: &HitStabilityReport,
    ) {
        let direction = normalize_or_zero(self.charge_velocity);
        if !self.is_stopped
            && !report.is_stable
            && (-hit.normal).dot(&direction) > CHARGE_OBSTRUCTION_DOT
        {
            log::debug!("Charge obstructed at {:?}", hit.point);
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StateRig, StubMotor};
    use nalgebra::{point, vector};

    fn step(state: &mut ChargeState, rig: &mut StateRig, velocity: &mut Vector3<f32>, dt: f32) {
        state.before_update(&mut rig.ctx(), dt);
        state.update_velocity(&mut rig.ctx(), velocity, dt);
        state.after_update(&mut rig.ctx(), dt);
    }

    #[test]
    fn horizontal_velocity_is_forced_while_vertical_is_kept() {
        let mut rig = StateRig::new(StubMotor::grounded());
        let mut state = ChargeState::default();
        state.enter(&mut rig.ctx());

        let mut velocity = vector![3.0, -2.0, -1.0];
        state.update_velocity(&mut rig.ctx(), &mut velocity, 0.1);

        assert!((velocity - vector![0.0, -5.0, 15.0]).norm() < 1.0e-5);
    }

    #[test]
    fn stops_at_max_time_then_finishes_after_stopped_time() {
        for dt in [0.5_f32, 0.1, 1.0 / 60.0] {
            let mut rig = StateRig::new(StubMotor::grounded());
            rig.settings.gravity = Vector3::zeros();
            let mut state = ChargeState::default();
            state.enter(&mut rig.ctx());

            let mut velocity = Vector3::zeros();
            let mut elapsed = 0.0;
            while !state.is_stopped() {
                step(&mut state, &mut rig, &mut velocity, dt);
                elapsed += dt;
                assert!(elapsed < 1.5 + dt, "charge overran at dt {dt}");
            }
            assert!((elapsed - 1.5_f32).abs() < dt * 0.5, "stopped at {elapsed} with dt {dt}");
            assert!(velocity.norm() > 0.0);

            state.update_velocity(&mut rig.ctx(), &mut velocity, 0.0);
            assert_eq!(velocity, Vector3::zeros());

            let mut stopped = 0.0;
            while !rig.shared.finished {
                step(&mut state, &mut rig, &mut velocity, dt);
                stopped += dt;
                assert!(stopped < 1.0 + dt, "stopped phase overran at dt {dt}");
            }
            assert!((stopped - 1.0_f32).abs() < dt * 0.5);
            assert_eq!(velocity, Vector3::zeros());
        }
    }

    #[test]
    fn front_on_unstable_hit_stops_the_charge() {
        let mut rig = StateRig::new(StubMotor::grounded());
        let mut state = ChargeState::default();
        state.enter(&mut rig.ctx());

        let wall = MovementHit {
            layer: 0,
            normal: vector![0.0, 0.0, -1.0],
            point: point![0.0, 1.0, 0.5],
        };
        state.on_movement_hit(&mut rig.ctx(), &wall, &HitStabilityReport { is_stable: true });
        assert!(!state.is_stopped(), "walkable surfaces never stop the charge");

        state.on_movement_hit(&mut rig.ctx(), &wall, &HitStabilityReport { is_stable: false });
        assert!(state.is_stopped());

        let mut velocity = vector![0.0, 0.0, 15.0];
        state.update_velocity(&mut rig.ctx(), &mut velocity, 0.1);
        assert!((velocity - vector![0.0, -3.0, 0.0]).norm() < 1.0e-5);
    }

    #[test]
    fn glancing_hit_does_not_stop_the_charge() {
        let mut rig = StateRig::new(StubMotor::grounded());
        let mut state = ChargeState::default();
        state.enter(&mut rig.ctx());

        let side = MovementHit {
            layer: 0,
            normal: vector![-1.0, 0.0, 0.0],
            point: point![0.5, 1.0, 0.0],
        };
        state.on_movement_hit(&mut rig.ctx(), &side, &HitStabilityReport { is_stable: false });

        assert!(!state.is_stopped());
    }

    #[test]
    fn reentering_resets_timers() {
        let mut rig = StateRig::new(StubMotor::grounded());
        let mut state = ChargeState::default();
        state.enter(&mut rig.ctx());
        let mut velocity = Vector3::zeros();
        step(&mut state, &mut rig, &mut velocity, 2.0);
        assert!(state.is_stopped());

        state.exit(&mut rig.ctx());
        state.enter(&mut rig.ctx());

        assert!(!state.is_stopped());
    }
}
