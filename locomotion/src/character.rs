/*!
The character facade.

[`CharacterController`] owns the movement states, the transition graph and the bookkeeping they
share. The host drives it from two directions:

- `set_inputs` once per input sample: resolves interaction and water, evaluates transitions and
  lets the active state read the sample.
- [`CharacterCallbacks`] once per physics step, called by the motor: forwarded to the active
  state, plus landing detection and the spawn input lockout.

Notes
- Transition predicates read a [`TransitionView`] snapshot and never touch the controller.
- A state cannot switch modes itself. It sets `finished` and a transition picks that up on the
  next input sample.
*/

use nalgebra::{Point3, UnitQuaternion, Vector3};

use crate::animation::{self, AnimationSink};
use crate::environment::{Environment, InteractionTarget};
use crate::flags::{Ability, AbilityFlags};
use crate::input::CharacterInputs;
use crate::motor::{CharacterCallbacks, HitStabilityReport, Motor, MovementHit};
use crate::settings::CharacterSettings;
use crate::state_machine::{StateHost, StateMachine};
use crate::states::context::swimming_reference_point;
use crate::states::{CharacterState, CharacterStates, MovementState, SharedMovement, StateContext};

/// Everything the transition predicates may look at, captured once per input sample.
#[derive(Clone, Copy, Debug)]
pub struct TransitionView {
    pub inputs: CharacterInputs,
    pub abilities: AbilityFlags,
    pub finished: bool,
    pub in_water: bool,
    pub stable_on_ground: bool,
    pub interaction: Option<InteractionTarget>,
    pub previous: Option<CharacterState>,
    pub dodge_in_air: bool,
    pub dodge_in_sprint: bool,
}

impl TransitionView {
    #[inline]
    fn can(&self, ability: Ability) -> bool {
        self.abilities.contains(ability)
    }

    fn targets_ladder(&self) -> bool {
        matches!(self.interaction, Some(InteractionTarget::Ladder(_)))
    }

    fn targets_block(&self) -> bool {
        matches!(self.interaction, Some(InteractionTarget::Block(_)))
    }
}

/// Build the movement-mode graph. Registration order is evaluation order.
fn transition_graph() -> StateMachine<CharacterState, TransitionView> {
    use CharacterState::*;

    let mut machine = StateMachine::new();

    machine.add_any_transition(Swimming, |v: &TransitionView| {
        v.in_water && v.can(Ability::Swimming)
    });

    machine.add_transition(Default, Sprinting, |v: &TransitionView| {
        v.inputs.sprint_held && v.can(Ability::Sprint)
    });
    machine.add_transition(Default, Charging, |v: &TransitionView| {
        v.inputs.charge_down && v.can(Ability::Charge)
    });
    machine.add_transition(Default, NoClip, |v: &TransitionView| {
        v.inputs.no_clip_down && v.can(Ability::NoClip)
    });
    machine.add_transition(Default, Dodge, |v: &TransitionView| {
        v.inputs.dodge_down && v.can(Ability::Dodge) && (v.stable_on_ground || v.dodge_in_air)
    });
    machine.add_transition(Default, Climbing, |v: &TransitionView| {
        v.targets_ladder() && v.can(Ability::Climbing)
    });
    machine.add_transition(Default, PushPull, |v: &TransitionView| {
        v.targets_block() && v.can(Ability::Interact)
    });

    machine.add_transition(Sprinting, PowerSlide, |v: &TransitionView| {
        v.inputs.crouch_down && v.can(Ability::PowerSlide)
    });
    machine.add_transition(Sprinting, Dodge, |v: &TransitionView| {
        v.inputs.dodge_down && v.can(Ability::Dodge) && v.dodge_in_sprint
    });
    machine.add_transition(Sprinting, Default, |v: &TransitionView| !v.inputs.sprint_held);

    machine.add_transition(Charging, Default, |v: &TransitionView| v.finished);
    machine.add_transition(NoClip, Default, |v: &TransitionView| v.inputs.no_clip_down);
    machine.add_transition(Swimming, Default, |v: &TransitionView| !v.in_water);
    machine.add_transition(PowerSlide, Default, |v: &TransitionView| {
        !v.inputs.crouch_held || v.finished
    });

    machine.add_transition(Dodge, Sprinting, |v: &TransitionView| {
        v.finished && v.previous == Some(Sprinting) && v.inputs.sprint_held
    });
    machine.add_transition(Dodge, Default, |v: &TransitionView| v.finished);

    machine.add_transition(Climbing, Default, |v: &TransitionView| v.finished);
    machine.add_transition(PushPull, Default, |v: &TransitionView| v.finished);

    machine
}

/// Routes state-machine lifecycle calls to the state objects.
struct Dispatch<'s> {
    states: &'s mut CharacterStates,
    ctx: StateContext<'s>,
}

impl StateHost<CharacterState, CharacterInputs> for Dispatch<'_> {
    fn enter_state(&mut self, state: CharacterState, previous: Option<CharacterState>) {
        self.ctx.previous_state = previous;
        self.states.get_mut(state).enter(&mut self.ctx);
    }

    fn exit_state(&mut self, state: CharacterState) {
        self.states.get_mut(state).exit(&mut self.ctx);
        self.ctx.shared.finished = false;
    }

    fn tick_state(&mut self, state: CharacterState, inputs: &CharacterInputs) {
        self.states.get_mut(state).tick(&mut self.ctx, inputs);
    }
}

pub struct CharacterController {
    settings: CharacterSettings,
    states: CharacterStates,
    machine: StateMachine<CharacterState, TransitionView>,
    shared: SharedMovement,
    animator: Box<dyn AnimationSink>,
    environment: Environment,
    /// Seconds left during which input samples are dropped.
    input_lockout: f32,
}

impl CharacterController {
    /// Build the controller, size the motor's capsule and enter Default.
    pub fn new(
        settings: CharacterSettings,
        animator: Box<dyn AnimationSink>,
        environment: Environment,
        motor: &mut dyn Motor,
    ) -> Self {
        motor.set_capsule_dimensions(settings.crouch.standing);

        let mut controller = Self {
            input_lockout: settings.spawn_lockout,
            settings,
            states: CharacterStates::default(),
            machine: transition_graph(),
            shared: SharedMovement::default(),
            animator,
            environment,
        };
        let (machine, mut dispatch) = controller.parts(motor);
        machine.set_state(CharacterState::Default, &mut dispatch);

        log::info!(
            "Character controller ready with abilities {:?}",
            controller.settings.enabled_abilities
        );
        controller
    }

    /// Split borrows: the machine on one side, the states and their context on the other.
    fn parts<'s>(
        &'s mut self,
        motor: &'s mut dyn Motor,
    ) -> (&'s mut StateMachine<CharacterState, TransitionView>, Dispatch<'s>) {
        let previous_state = self.machine.previous();
        let dispatch = Dispatch {
            states: &mut self.states,
            ctx: StateContext {
                motor,
                settings: &self.settings,
                shared: &mut self.shared,
                animator: self.animator.as_mut(),
                environment: &mut self.environment,
                previous_state,
            },
        };
        (&mut self.machine, dispatch)
    }

    fn with_active_state(
        &mut self,
        motor: &mut dyn Motor,
        f: impl FnOnce(&mut dyn MovementState, &mut StateContext<'_>),
    ) {
        let (machine, mut dispatch) = self.parts(motor);
        if let Some(state) = machine.current() {
            f(dispatch.states.get_mut(state), &mut dispatch.ctx);
        }
    }

    /// Feed one input sample.
    pub fn set_inputs(&mut self, motor: &mut dyn Motor, inputs: &CharacterInputs) {
        if self.input_lockout > 0.0 {
            log::trace!("Input ignored, {:.2}s of spawn lockout left", self.input_lockout);
            return;
        }

        if inputs.interact_down {
            self.resolve_interaction(&*motor);
        }
        self.shared.water = self
            .environment
            .water_containing(swimming_reference_point(&*motor, &self.settings));

        let view = TransitionView {
            inputs: *inputs,
            abilities: self.settings.enabled_abilities,
            finished: self.shared.finished,
            in_water: self.shared.water.is_some(),
            stable_on_ground: motor.grounding().is_stable_on_ground,
            interaction: self.shared.interaction_target,
            previous: self.machine.previous(),
            dodge_in_air: self.settings.dodge.in_air,
            dodge_in_sprint: self.settings.dodge.in_sprint,
        };

        let (machine, mut dispatch) = self.parts(motor);
        if let Err(err) = machine.tick(&view, &mut dispatch, inputs) {
            log::error!("Character state update failed: {err}");
        }

        self.shared.jump_held = inputs.jump_held;
        self.shared.crouch_held = inputs.crouch_held;
        self.shared.interaction_target = None;
    }

    fn resolve_interaction(&mut self, motor: &dyn Motor) {
        let center = interaction_point(motor);
        let target = self.environment.interactable_at(center);
        if let Some(target) = target {
            log::debug!("Interacting with {target:?}");
            self.environment.notify(target);
        }
        self.shared.interaction_target = target;
    }

    pub fn current_state(&self) -> CharacterState {
        self.machine.current().unwrap_or(CharacterState::Default)
    }

    pub fn previous_state(&self) -> Option<CharacterState> {
        self.machine.previous()
    }

    /// Switch mode directly, bypassing the transition graph.
    pub fn force_state(&mut self, motor: &mut dyn Motor, state: CharacterState) -> bool {
        let (machine, mut dispatch) = self.parts(motor);
        machine.set_state(state, &mut dispatch)
    }

    /// Queue an impulse for the next ground-movement velocity update.
    pub fn add_velocity(&mut self, velocity: Vector3<f32>) {
        self.shared.pending_velocity += velocity;
    }

    pub fn is_input_locked(&self) -> bool {
        self.input_lockout > 0.0
    }

    pub fn settings(&self) -> &CharacterSettings {
        &self.settings
    }

    pub fn shared(&self) -> &SharedMovement {
        &self.shared
    }

    pub fn states(&self) -> &CharacterStates {
        &self.states
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.environment
    }
}

/// Capsule center, where interaction overlap queries are made from.
fn interaction_point(motor: &dyn Motor) -> Point3<f32> {
    motor.position() + motor.character_up() * motor.capsule_dimensions().y_offset
}

impl CharacterCallbacks for CharacterController {
    fn before_character_update(&mut self, motor: &mut dyn Motor, dt: f32) {
        self.with_active_state(motor, |state, ctx| state.before_update(ctx, dt));
    }

    fn update_rotation(&mut self, motor: &mut dyn Motor, rotation: &mut UnitQuaternion<f32>, dt: f32) {
        self.with_active_state(motor, |state, ctx| state.update_rotation(ctx, rotation, dt));
    }

    fn update_velocity(&mut self, motor: &mut dyn Motor, velocity: &mut Vector3<f32>, dt: f32) {
        self.with_active_state(motor, |state, ctx| state.update_velocity(ctx, velocity, dt));
    }

    fn post_grounding_update(&mut self, motor: &mut dyn Motor, _dt: f32) {
        let grounding = motor.grounding();
        let last = motor.last_grounding();

        if grounding.is_stable_on_ground && !last.is_stable_on_ground {
            log::debug!("Landed at {:?}", motor.position());
            self.animator.set_trigger(animation::HAS_LANDED);
        } else if !grounding.is_stable_on_ground && last.is_stable_on_ground {
            log::debug!("Left stable ground at {:?}", motor.position());
        }
    }

    fn after_character_update(&mut self, motor: &mut dyn Motor, dt: f32) {
        self.with_active_state(motor, |state, ctx| state.after_update(ctx, dt));

        if self.input_lockout > 0.0 {
            self.input_lockout = (self.input_lockout - dt).max(0.0);
            if self.input_lockout == 0.0 {
                log::debug!("Spawn input lockout over");
            }
        }
    }

    fn on_movement_hit(
        &mut self,
        motor: &mut dyn Motor,
        hit: &MovementHit,
        report: &mut HitStabilityReport,
    ) {
        self.with_active_state(motor, |state, ctx| state.on_movement_hit(ctx, hit, report));
    }

    fn is_collider_valid_for_collisions(&self, layer: u32) -> bool {
        !self.settings.is_layer_ignored(layer)
    }
}
