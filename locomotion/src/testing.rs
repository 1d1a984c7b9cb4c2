//! Test doubles shared by the unit tests.

use nalgebra::{Point3, UnitQuaternion, Vector3};

use crate::animation::RecordingAnimator;
use crate::environment::Environment;
use crate::settings::CharacterSettings;
use crate::states::{CharacterState, SharedMovement, StateContext};
use crate::motor::{
    CapsuleDimensions, CharacterCallbacks, GroundingStatus, HitStabilityReport, Motor,
    MotorToggles, MovementHit, RaycastHit,
};

/// Motor over an optional infinite floor at `floor_height`, with scripted answers for overlap
/// tests and queued movement hits.
#[derive(Debug, Clone)]
pub struct StubMotor {
    pub position: Point3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub velocity: Vector3<f32>,
    pub grounding: GroundingStatus,
    pub last_grounding: GroundingStatus,
    pub capsule: CapsuleDimensions,
    pub toggles: MotorToggles,
    pub floor_height: Option<f32>,
    pub floor_normal: Vector3<f32>,
    /// Answer for `character_collisions_overlap`.
    pub overlapping: bool,
    /// Hits delivered during the next `simulate` call.
    pub queued_hits: Vec<(MovementHit, HitStabilityReport)>,
    pub unground_remaining: f32,
}

impl StubMotor {
    pub fn grounded() -> Self {
        let grounding = GroundingStatus {
            found_any_ground: true,
            is_stable_on_ground: true,
            ground_normal: Vector3::y(),
        };
        Self {
            position: Point3::origin(),
            rotation: UnitQuaternion::identity(),
            velocity: Vector3::zeros(),
            grounding,
            last_grounding: grounding,
            capsule: CapsuleDimensions::new(0.5, 2.0, 1.0),
            toggles: MotorToggles::default(),
            floor_height: Some(0.0),
            floor_normal: Vector3::y(),
            overlapping: false,
            queued_hits: Vec::new(),
            unground_remaining: 0.0,
        }
    }

    pub fn airborne() -> Self {
        Self {
            position: Point3::new(0.0, 10.0, 0.0),
            grounding: GroundingStatus::default(),
            last_grounding: GroundingStatus::default(),
            floor_height: None,
            ..Self::grounded()
        }
    }

    fn probe_ground(&self) -> GroundingStatus {
        let Some(floor) = self.floor_height else {
            return GroundingStatus::default();
        };
        if self.unground_remaining > 0.0
            || !self.toggles.ground_solving
            || self.position.y > floor + 0.05
        {
            return GroundingStatus::default();
        }
        GroundingStatus {
            found_any_ground: true,
            is_stable_on_ground: self.floor_normal.y >= 0.7,
            ground_normal: self.floor_normal,
        }
    }

    /// One physics step in callback order, with a floor that stops downward motion.
    pub fn simulate(&mut self, callbacks: &mut dyn CharacterCallbacks, dt: f32) {
        callbacks.before_character_update(self, dt);

        let mut rotation = self.rotation;
        callbacks.update_rotation(self, &mut rotation, dt);
        self.rotation = rotation;

        let mut velocity = self.velocity;
        callbacks.update_velocity(self, &mut velocity, dt);

        for (hit, mut report) in std::mem::take(&mut self.queued_hits) {
            callbacks.on_movement_hit(self, &hit, &mut report);
        }

        self.position += velocity * dt;
        if let Some(floor) = self.floor_height {
            if self.toggles.movement_collision_solving && self.position.y < floor {
                self.position.y = floor;
                velocity.y = velocity.y.max(0.0);
            }
        }
        self.velocity = velocity;
        self.unground_remaining = (self.unground_remaining - dt).max(0.0);

        self.last_grounding = self.grounding;
        self.grounding = self.probe_ground();
        callbacks.post_grounding_update(self, dt);
        callbacks.after_character_update(self, dt);
    }
}

impl Motor for StubMotor {
    fn position(&self) -> Point3<f32> {
        self.position
    }

    fn rotation(&self) -> UnitQuaternion<f32> {
        self.rotation
    }

    fn velocity(&self) -> Vector3<f32> {
        self.velocity
    }

    fn grounding(&self) -> GroundingStatus {
        self.grounding
    }

    fn last_grounding(&self) -> GroundingStatus {
        self.last_grounding
    }

    fn force_unground(&mut self, duration: f32) {
        self.unground_remaining = duration;
    }

    fn capsule_dimensions(&self) -> CapsuleDimensions {
        self.capsule
    }

    fn set_capsule_dimensions(&mut self, dimensions: CapsuleDimensions) {
        self.capsule = dimensions;
    }

    fn toggles(&self) -> MotorToggles {
        self.toggles
    }

    fn set_capsule_collisions(&mut self, enabled: bool) {
        self.toggles.capsule_collisions = enabled;
    }

    fn set_movement_collision_solving(&mut self, enabled: bool) {
        self.toggles.movement_collision_solving = enabled;
    }

    fn set_ground_solving(&mut self, enabled: bool) {
        self.toggles.ground_solving = enabled;
    }

    fn character_collisions_overlap(
        &self,
        _position: Point3<f32>,
        _rotation: UnitQuaternion<f32>,
    ) -> bool {
        self.overlapping
    }

    fn raycast(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> Option<RaycastHit> {
        let floor = self.floor_height?;
        if direction.y >= 0.0 || origin.y < floor {
            return None;
        }
        let distance = (origin.y - floor) / -direction.y;
        (distance <= max_distance).then(|| RaycastHit {
            point: origin + direction * distance,
            normal: self.floor_normal,
            distance,
        })
    }
}

/// Everything a [`StateContext`] borrows, owned in one place so tests can poke at each part.
pub struct StateRig {
    pub motor: StubMotor,
    pub settings: CharacterSettings,
    pub shared: SharedMovement,
    pub animator: RecordingAnimator,
    pub environment: Environment,
    pub previous_state: Option<CharacterState>,
}

impl StateRig {
    pub fn new(motor: StubMotor) -> Self {
        Self {
            motor,
            settings: CharacterSettings::default(),
            shared: SharedMovement::default(),
            animator: RecordingAnimator::default(),
            environment: Environment::new(),
            previous_state: Some(CharacterState::Default),
        }
    }

    pub fn ctx(&mut self) -> StateContext<'_> {
        StateContext {
            motor: &mut self.motor,
            settings: &self.settings,
            shared: &mut self.shared,
            animator: &mut self.animator,
            environment: &mut self.environment,
            previous_state: self.previous_state,
        }
    }
}
