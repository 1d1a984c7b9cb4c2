/*!
State-facing context and the movement routines every state shares.

[`SharedMovement`] holds the bookkeeping that outlives a single state (jump and crouch flags,
cached input vectors, queued impulses). [`StateContext`] bundles it with the motor, settings,
animation sink and environment for the duration of one callback.

Notes
- Flags written during `tick` are read by the following velocity/rotation updates, so `tick`
  must store what it parsed here rather than in locals.
- Routines take the tunables they vary on (speed, sharpness) as parameters so Default and
  Sprint share one implementation.
*/

use nalgebra::{Point3, UnitQuaternion, Vector3};

use crate::animation::{self, AnimationSink};
use crate::constants::{JUMP_UNGROUND_TIME, SPRINT_ANIM_CLAMP};
use crate::environment::{Environment, InteractionTarget, WaterVolume};
use crate::flags::Ability;
use crate::input::CharacterInputs;
use crate::motion::{
    align_up, camera_planar_direction, clamp_magnitude, look_rotation, normalize_or_zero,
    project_on_axis, project_on_plane, reorient_on_surface, slerp_direction, smooth_toward,
    smoothing_factor,
};
use crate::motor::{Motor, MovementHit};
use crate::settings::CharacterSettings;

use super::CharacterState;

/// Mutable movement state shared by all movement states.
#[derive(Clone, Debug, PartialEq)]
pub struct SharedMovement {
    /// World-space move direction, magnitude in [0, 1].
    pub move_input: Vector3<f32>,
    /// World-space planar look direction, or zero.
    pub look_input: Vector3<f32>,

    pub jump_requested: bool,
    pub jump_consumed: bool,
    pub double_jump_consumed: bool,
    pub jumped_this_frame: bool,
    pub jump_held: bool,
    pub time_since_jump_requested: f32,
    pub time_since_last_able_to_jump: f32,
    pub can_wall_jump: bool,
    pub wall_jump_normal: Vector3<f32>,

    pub should_be_crouching: bool,
    pub is_crouching: bool,
    pub crouch_held: bool,

    /// Impulse added by the next ground-movement velocity update.
    pub pending_velocity: Vector3<f32>,
    /// Set by a state to report completion. Cleared whenever a state exits.
    pub finished: bool,
    /// What the last interact press resolved to, valid for the tick it was pressed in.
    pub interaction_target: Option<InteractionTarget>,
    /// Water volume containing the swimming reference point at the last input tick.
    pub water: Option<WaterVolume>,
}

impl Default for SharedMovement {
    fn default() -> Self {
        Self {
            move_input: Vector3::zeros(),
            look_input: Vector3::zeros(),
            jump_requested: false,
            jump_consumed: false,
            double_jump_consumed: false,
            jumped_this_frame: false,
            jump_held: false,
            time_since_jump_requested: f32::INFINITY,
            time_since_last_able_to_jump: 0.0,
            can_wall_jump: false,
            wall_jump_normal: Vector3::zeros(),
            should_be_crouching: false,
            is_crouching: false,
            crouch_held: false,
            pending_velocity: Vector3::zeros(),
            finished: false,
            interaction_target: None,
            water: None,
        }
    }
}

pub struct StateContext<'a> {
    pub motor: &'a mut dyn Motor,
    pub settings: &'a CharacterSettings,
    pub shared: &'a mut SharedMovement,
    pub animator: &'a mut dyn AnimationSink,
    pub environment: &'a mut Environment,
    /// State that was active before the current one.
    pub previous_state: Option<CharacterState>,
}

impl StateContext<'_> {
    #[inline]
    pub fn up(&self) -> Vector3<f32> {
        self.motor.character_up()
    }

    pub fn finish_state(&mut self) {
        self.shared.finished = true;
    }

    /// Point that has to be inside water for the character to swim.
    pub fn swimming_reference_point(&self) -> Point3<f32> {
        swimming_reference_point(&*self.motor, self.settings)
    }

    /// +1 while jump is held, -1 while crouch is held.
    pub fn vertical_input(&self) -> f32 {
        let up = if self.shared.jump_held { 1.0 } else { 0.0 };
        let down = if self.shared.crouch_held { 1.0 } else { 0.0 };
        up - down
    }

    /// Turn camera-relative axes into world-space move and look vectors.
    pub fn move_and_look(&mut self, inputs: &CharacterInputs) {
        let up = self.up();
        let axes = clamp_magnitude(inputs.move_axes(), 1.0);

        let mut planar = camera_planar_direction(inputs.camera_rotation, up);
        if planar.norm_squared() == 0.0 {
            planar = normalize_or_zero(project_on_plane(self.motor.character_forward(), up));
        }
        if planar.norm_squared() == 0.0 {
            self.shared.move_input = Vector3::zeros();
            self.shared.look_input = Vector3::zeros();
            return;
        }

        self.shared.move_input = look_rotation(planar, up) * axes;
        self.shared.look_input = planar;
    }

    pub fn request_jump(&mut self, inputs: &CharacterInputs) {
        if inputs.jump_down && self.settings.ability_enabled(Ability::Jump) {
            self.shared.time_since_jump_requested = 0.0;
            self.shared.jump_requested = true;
        }
    }

    /// Crouch on press; un-crouching waits for release and a clear standing capsule.
    pub fn handle_crouch(&mut self, inputs: &CharacterInputs) {
        if inputs.crouch_down {
            self.shared.should_be_crouching = true;
            if !self.shared.is_crouching {
                self.shared.is_crouching = true;
                self.motor.set_capsule_dimensions(self.settings.crouch.crouched);
            }
        } else if inputs.crouch_up {
            self.shared.should_be_crouching = false;
        }
    }

    /// Stand back up if crouch was released and nothing blocks the standing capsule.
    pub fn update_uncrouch(&mut self) {
        if !self.shared.is_crouching || self.shared.should_be_crouching {
            return;
        }

        self.motor.set_capsule_dimensions(self.settings.crouch.standing);
        let position = self.motor.position();
        let rotation = self.motor.rotation();
        if self.motor.character_collisions_overlap(position, rotation) {
            self.motor.set_capsule_dimensions(self.settings.crouch.crouched);
        } else {
            self.shared.is_crouching = false;
        }
    }

    /// Ground that allows jumping: any ground when sliding jumps are allowed, else stable ground.
    fn on_jumpable_ground(&self) -> bool {
        let grounding = self.motor.grounding();
        if self.settings.jump.allow_jumping_when_sliding {
            grounding.found_any_ground
        } else {
            grounding.is_stable_on_ground
        }
    }

    /// Steer toward `max_speed` along the ground, or apply air control, gravity and drag.
    pub fn ground_movement(
        &mut self,
        velocity: &mut Vector3<f32>,
        dt: f32,
        sharpness: f32,
        max_speed: f32,
    ) {
        let grounding = self.motor.grounding();
        let up = self.up();
        let input = self.shared.move_input;

        if grounding.is_stable_on_ground {
            self.animator.set_bool(animation::IS_GROUNDED, true);

            let current = reorient_on_surface(*velocity, grounding.ground_normal, up);
            let input_right = input.cross(&up);
            let reoriented_input =
                normalize_or_zero(grounding.ground_normal.cross(&input_right)) * input.norm();
            *velocity = smooth_toward(current, reoriented_input * max_speed, sharpness, dt);
            return;
        }

        self.animator.set_bool(animation::IS_GROUNDED, false);
        let air = &self.settings.air;

        if input.norm_squared() > 0.0 {
            let mut target = input * air.max_speed;

            // Keep air control from pushing the character up slopes it cannot stand on.
            if grounding.found_any_ground {
                let obstruction =
                    normalize_or_zero(up.cross(&grounding.ground_normal).cross(&up));
                target = project_on_plane(target, obstruction);
            }

            let gravity_dir = normalize_or_zero(self.settings.gravity);
            let diff = project_on_plane(target - *velocity, gravity_dir);
            *velocity += diff * air.acceleration * dt;
        }

        *velocity += self.settings.gravity * dt;
        *velocity *= 1.0 / (1.0 + air.drag * dt);
    }

    /// Consume a pending jump request if any jump (double, wall, ground, coyote) is allowed.
    pub fn handle_jump(&mut self, velocity: &mut Vector3<f32>, dt: f32) {
        self.shared.jumped_this_frame = false;
        self.shared.time_since_jump_requested += dt;
        if !self.shared.jump_requested {
            return;
        }

        let jump = &self.settings.jump;
        let grounding = self.motor.grounding();
        let up = self.up();
        let on_ground = self.on_jumpable_ground();

        if jump.allow_double_jump
            && self.shared.jump_consumed
            && !self.shared.double_jump_consumed
            && !on_ground
        {
            self.motor.force_unground(JUMP_UNGROUND_TIME);
            *velocity += up * jump.speed - project_on_axis(*velocity, up);
            self.shared.jump_requested = false;
            self.shared.double_jump_consumed = true;
            self.shared.jumped_this_frame = true;
            self.animator.set_trigger(animation::JUMP_TRIGGER);
        }

        let can_jump = self.shared.can_wall_jump
            || (!self.shared.jump_consumed
                && (on_ground
                    || self.shared.time_since_last_able_to_jump
                        <= jump.post_grounding_grace_time));

        if self.shared.jump_requested && can_jump {
            let direction = if self.shared.can_wall_jump {
                self.shared.wall_jump_normal
            } else if grounding.found_any_ground && !grounding.is_stable_on_ground {
                grounding.ground_normal
            } else {
                up
            };

            self.motor.force_unground(JUMP_UNGROUND_TIME);
            *velocity += direction * jump.speed - project_on_axis(*velocity, up);
            self.shared.jump_requested = false;
            self.shared.jump_consumed = true;
            self.shared.jumped_this_frame = true;
            self.animator.set_trigger(animation::JUMP_TRIGGER);
        }

        self.shared.can_wall_jump = false;
    }

    /// Post-move jump bookkeeping: expire stale requests and refill jumps on ground contact.
    pub fn update_jump_grounding(&mut self, dt: f32) {
        if self.shared.jump_requested
            && self.shared.time_since_jump_requested > self.settings.jump.pre_grounding_grace_time
        {
            self.shared.jump_requested = false;
        }

        if self.on_jumpable_ground() {
            if !self.shared.jumped_this_frame {
                self.shared.double_jump_consumed = false;
                self.shared.jump_consumed = false;
            }
            self.shared.time_since_last_able_to_jump = 0.0;
        } else {
            self.shared.time_since_last_able_to_jump += dt;
        }
    }

    pub fn apply_external_forces(&mut self, velocity: &mut Vector3<f32>) {
        if self.shared.pending_velocity.norm_squared() > 0.0 {
            *velocity += self.shared.pending_velocity;
            self.shared.pending_velocity = Vector3::zeros();
        }
    }

    /// Turn toward the cached look direction.
    pub fn face_look_direction(
        &mut self,
        rotation: &mut UnitQuaternion<f32>,
        dt: f32,
        sharpness: f32,
    ) {
        let look = self.shared.look_input;
        if !self.settings.rotate_to_camera_facing || look.norm_squared() == 0.0 || sharpness <= 0.0
        {
            return;
        }

        let smoothed = normalize_or_zero(slerp_direction(
            self.motor.character_forward(),
            look,
            smoothing_factor(sharpness, dt),
        ));
        if smoothed.norm_squared() == 0.0 {
            return;
        }

        *rotation = look_rotation(smoothed, self.up());
        if self.settings.orient_towards_gravity {
            *rotation = align_up(*rotation, -self.settings.gravity);
        }
    }

    /// Push the character-relative planar velocity, normalised by the stable move speed.
    pub fn push_planar_animation(&mut self, clamp: Option<f32>) {
        let relative = self.motor.rotation().inverse() * self.motor.velocity();
        let max_speed = self.settings.movement.max_speed;
        let (mut x, mut z) = if max_speed > 0.0 {
            (relative.x / max_speed, relative.z / max_speed)
        } else {
            (0.0, 0.0)
        };
        if let Some(limit) = clamp {
            x = x.clamp(-limit, limit);
            z = z.clamp(-limit, limit);
        }
        self.animator.set_float(animation::VELOCITY_X, x);
        self.animator.set_float(animation::VELOCITY_Z, z);
    }

    pub fn push_sprint_animation(&mut self) {
        self.push_planar_animation(Some(SPRINT_ANIM_CLAMP));
    }

    /// Record a wall-jump opportunity when airborne and pressed against an unwalkable surface.
    pub fn detect_wall_jump(&mut self, hit: &MovementHit, hit_is_stable: bool) {
        if self.settings.jump.allow_wall_jump
            && !self.motor.grounding().is_stable_on_ground
            && !hit_is_stable
        {
            self.shared.can_wall_jump = true;
            self.shared.wall_jump_normal = hit.normal;
        }
    }
}

pub(crate) fn swimming_reference_point(motor: &dyn Motor, settings: &CharacterSettings) -> Point3<f32> {
    motor.position() + motor.rotation() * settings.swimming.reference_offset
}
