pub mod animation;
pub mod character;
pub mod constants;
pub mod environment;
pub mod flags;
pub mod foot_ik;
pub mod input;
pub mod kinematic;
pub mod motion;
pub mod motor;
pub mod rapier;
pub mod settings;
pub mod state_machine;
pub mod states;

#[cfg(test)]
mod testing;

// Re-export rapier so hosts can build levels without depending on it directly.
pub use rapier3d;

pub use animation::{AnimationSink, NullAnimator, RecordingAnimator};
pub use character::{CharacterController, TransitionView};
pub use environment::{
    BlockId, Environment, Interactable, InteractionTarget, Ladder, LadderId, Pose, PushBlock,
    WaterVolume,
};
pub use flags::{Ability, AbilityFlags, DodgeDirection, DodgeDirections};
pub use foot_ik::{Foot, FootIk, FootPlacement, FootTarget};
pub use input::CharacterInputs;
pub use kinematic::{RapierMotor, RapierMotorSettings};
pub use motor::{
    CapsuleDimensions, CharacterCallbacks, GroundingStatus, HitStabilityReport, Motor,
    MotorToggles, MovementHit, RaycastHit,
};
pub use rapier::{ColliderShapeDef, StaticQueryWorld, WorldStaticDef, build_static_query_world};
pub use settings::{CharacterSettings, SettingsError};
pub use state_machine::{StateHost, StateMachine, StateMachineError};
pub use states::{CharacterState, MovementState};
