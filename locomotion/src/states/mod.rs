/*!
Movement states.

One type per mode, each implementing [`MovementState`]. [`CharacterStates`] owns one instance of
each for the controller's lifetime and dispatches by [`CharacterState`]; `enter` and `exit`
reset whatever transient data a state carries, so instances are reused across activations.

- context:     shared movement bookkeeping and the routines states call into
- default:     walking, crouching, jumping
- sprint:      faster ground movement
- charge:      scripted forward dash
- swimming:    free 3D movement held inside a water volume
- climbing:    ladder anchoring and climbing
- no_clip:     collision-free flight
- power_slide: slide out of a sprint
- dodge:       one-shot directional impulse
- push_pull:   walk up to a block and shove it
*/

pub mod charge;
pub mod climbing;
pub mod context;
pub mod default;
pub mod dodge;
pub mod no_clip;
pub mod power_slide;
pub mod push_pull;
pub mod sprint;
pub mod swimming;

pub use charge::ChargeState;
pub use climbing::{ClimbingPhase, ClimbingState};
pub use context::{SharedMovement, StateContext};
pub use default::DefaultState;
pub use dodge::DodgeState;
pub use no_clip::NoClipState;
pub use power_slide::PowerSlideState;
pub use push_pull::{PushPullPhase, PushPullState};
pub use sprint::SprintState;
pub use swimming::SwimmingState;

use nalgebra::{UnitQuaternion, Vector3};

use crate::input::CharacterInputs;
use crate::motor::{HitStabilityReport, MovementHit};

/// Which movement mode is active. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharacterState {
    Default,
    Sprinting,
    Charging,
    Swimming,
    Climbing,
    NoClip,
    PowerSlide,
    Dodge,
    PushPull,
}

impl CharacterState {
    pub const ALL: [CharacterState; 9] = [
        CharacterState::Default,
        CharacterState::Sprinting,
        CharacterState::Charging,
        CharacterState::Swimming,
        CharacterState::Climbing,
        CharacterState::NoClip,
        CharacterState::PowerSlide,
        CharacterState::Dodge,
        CharacterState::PushPull,
    ];
}

/// Lifecycle and per-physics-step hooks of a movement mode.
///
/// Every hook has an empty default so states only implement what they use.
#[allow(unused_variables)]
pub trait MovementState {
    fn enter(&mut self, ctx: &mut StateContext<'_>) {}

    /// Interpret one input sample. May run zero or more times between physics steps.
    fn tick(&mut self, ctx: &mut StateContext<'_>, inputs: &CharacterInputs) {}

    /// Undo every motor toggle made in `enter`.
    fn exit(&mut self, ctx: &mut StateContext<'_>) {}

    fn update_velocity(&mut self, ctx: &mut StateContext<'_>, velocity: &mut Vector3<f32>, dt: f32) {}

    fn update_rotation(
        &mut self,
        ctx: &mut StateContext<'_>,
        rotation: &mut UnitQuaternion<f32>,
        dt: f32,
    ) {
    }

    fn before_update(&mut self, ctx: &mut StateContext<'_>, dt: f32) {}

    fn after_update(&mut self, ctx: &mut StateContext<'_>, dt: f32) {}

    fn on_movement_hit(
        &mut self,
        ctx: &mut StateContext<'_>,
        hit: &MovementHit,
        report: &HitStabilityReport,
    ) {
    }
}

/// One reusable instance of every movement state.
#[derive(Default)]
pub struct CharacterStates {
    pub default: DefaultState,
    pub sprint: SprintState,
    pub charge: ChargeState,
    pub swimming: SwimmingState,
    pub climbing: ClimbingState,
    pub no_clip: NoClipState,
    pub power_slide: PowerSlideState,
    pub dodge: DodgeState,
    pub push_pull: PushPullState,
}

impl CharacterStates {
    pub fn get_mut(&mut self, state: CharacterState) -> &mut dyn MovementState {
        match state {
            CharacterState::Default => &mut self.default,
            CharacterState::Sprinting => &mut self.sprint,
            CharacterState::Charging => &mut self.charge,
            CharacterState::Swimming => &mut self.swimming,
            CharacterState::Climbing => &mut self.climbing,
            CharacterState::NoClip => &mut self.no_clip,
            CharacterState::PowerSlide => &mut self.power_slide,
            CharacterState::Dodge => &mut self.dodge,
            CharacterState::PushPull => &mut self.push_pull,
        }
    }
}
