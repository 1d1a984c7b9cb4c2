/*!
Scripted input timeline.

Input samples arrive at `INPUT_HZ` and physics runs at a fixed `PHYSICS_DT`, so a single sample
may be followed by zero, one or several physics steps. Button presses (`*_down` fields) are only
sent with the first sample of a segment; held buttons and axes are sent with every sample.
*/

use std::collections::HashMap;

use nalgebra::{Point3, UnitQuaternion, point, vector};
use locomotion::settings::FootIkSettings;
use locomotion::{
    CharacterController, CharacterInputs, CharacterState, Foot, FootIk, Motor, RapierMotor,
};

use crate::level::{BLOCK_CENTER, LADDER_BOTTOM, POOL_CENTER};

pub const PHYSICS_DT: f32 = 1.0 / 60.0;
const INPUT_HZ: f32 = 30.0;
/// Half the distance between the animated feet.
const FOOT_SPACING: f32 = 0.15;

/// One stretch of constant input.
pub struct Segment {
    pub label: &'static str,
    pub seconds: f32,
    pub inputs: CharacterInputs,
    /// Put the character here before the segment starts.
    pub teleport: Option<Point3<f32>>,
}

impl Segment {
    fn new(label: &'static str, seconds: f32, inputs: CharacterInputs) -> Self {
        Self {
            label,
            seconds,
            inputs,
            teleport: None,
        }
    }

    fn at(mut self, position: Point3<f32>) -> Self {
        self.teleport = Some(position);
        self
    }

    fn sample(&self, first: bool) -> CharacterInputs {
        if first {
            return self.inputs;
        }
        CharacterInputs {
            jump_down: false,
            crouch_down: false,
            crouch_up: false,
            charge_down: false,
            no_clip_down: false,
            interact_down: false,
            dodge_down: false,
            ..self.inputs
        }
    }
}

fn forward() -> CharacterInputs {
    CharacterInputs {
        move_forward: 1.0,
        ..CharacterInputs::default()
    }
}

fn idle() -> CharacterInputs {
    CharacterInputs::default()
}

pub fn timeline() -> Vec<Segment> {
    let ladder_reach = LADDER_BOTTOM - vector![0.0, 0.0, 0.5] + vector![0.0, 0.05, 0.0];
    vec![
        Segment::new("settle", 0.5, idle()),
        Segment::new("walk forward", 1.5, forward()),
        Segment::new("sprint", 1.0, CharacterInputs {
            sprint_held: true,
            ..forward()
        }),
        Segment::new("power slide", 0.6, CharacterInputs {
            sprint_held: true,
            crouch_down: true,
            crouch_held: true,
            ..forward()
        }),
        Segment::new("stand still", 0.5, idle()),
        Segment::new("jump", 1.0, CharacterInputs {
            jump_down: true,
            jump_held: true,
            ..idle()
        }),
        Segment::new("dodge right", 0.4, CharacterInputs {
            dodge_down: true,
            move_right: 1.0,
            ..idle()
        }),
        Segment::new("charge", 3.0, CharacterInputs {
            charge_down: true,
            ..idle()
        }),
        Segment::new("grab ladder", 0.5, CharacterInputs {
            interact_down: true,
            ..idle()
        })
        .at(ladder_reach),
        Segment::new("climb", 2.5, forward()),
        Segment::new("walk into pool", 2.0, forward())
            .at(POOL_CENTER - vector![0.0, 0.95, 7.0]),
        Segment::new("surface", 1.0, CharacterInputs {
            jump_held: true,
            ..forward()
        }),
        Segment::new("grab block", 1.0, CharacterInputs {
            interact_down: true,
            ..idle()
        })
        .at(point![BLOCK_CENTER.x, 0.05, BLOCK_CENTER.z - 1.5]),
        Segment::new("push block", 1.5, forward()),
        Segment::new("let go", 0.2, CharacterInputs {
            interact_down: true,
            ..idle()
        }),
        Segment::new("no-clip up", 1.0, CharacterInputs {
            no_clip_down: true,
            jump_held: true,
            ..idle()
        }),
        Segment::new("fall", 2.0, CharacterInputs {
            no_clip_down: true,
            ..idle()
        }),
    ]
}

/// Time spent per state over a run.
#[derive(Default)]
pub struct RunReport {
    seconds_in_state: HashMap<CharacterState, f32>,
    transitions: usize,
}

impl RunReport {
    pub fn log(&self) {
        log::info!("{} state changes", self.transitions);
        for state in CharacterState::ALL {
            if let Some(seconds) = self.seconds_in_state.get(&state) {
                log::info!("  {state:?}: {seconds:.2}s");
            }
        }
    }
}

pub fn run(
    controller: &mut CharacterController,
    motor: &mut RapierMotor,
    timeline: &[Segment],
) -> RunReport {
    let input_dt = 1.0 / INPUT_HZ;
    let foot_ik_settings: FootIkSettings = controller.settings().foot_ik.clone();
    let mut foot_ik = FootIk::new();
    let mut report = RunReport::default();
    let mut accumulator = 0.0;
    let mut last_state = controller.current_state();

    for segment in timeline {
        if let Some(position) = segment.teleport {
            motor.teleport(position, UnitQuaternion::identity());
        }
        log::info!("-- {} ({:.1}s)", segment.label, segment.seconds);

        let mut elapsed = 0.0;
        let mut first = true;
        while elapsed < segment.seconds {
            controller.set_inputs(motor, &segment.sample(first));
            first = false;

            accumulator += input_dt;
            while accumulator >= PHYSICS_DT {
                motor.simulate(controller, PHYSICS_DT);
                accumulator -= PHYSICS_DT;

                let state = controller.current_state();
                *report.seconds_in_state.entry(state).or_default() += PHYSICS_DT;

                let body: &dyn Motor = &*motor;
                let right = body.character_right() * FOOT_SPACING;
                let (left_foot, right_foot) = (body.position() - right, body.position() + right);
                foot_ik.update_targets(&foot_ik_settings, body, left_foot, right_foot);
                let pelvis = foot_ik.pelvis_height(&foot_ik_settings, body, 1.0);
                if let Some(placement) = foot_ik.foot_placement(&foot_ik_settings, body, Foot::Left) {
                    log::trace!("pelvis {pelvis:.3} left foot {:.3}", placement.height_offset);
                }
            }

            let state = controller.current_state();
            if state != last_state {
                report.transitions += 1;
                last_state = state;
            }
            elapsed += input_dt;
        }

        log::info!(
            "   state {:?} at {:.2?} moving {:.2?}",
            controller.current_state(),
            motor.position().coords.as_slice(),
            motor.velocity().as_slice()
        );
    }
    report
}
