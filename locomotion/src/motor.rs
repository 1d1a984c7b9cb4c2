/*!
Contract between the controller and the physics motor that moves the capsule.

The motor owns position, rotation and collision response. Once per physics step it calls the
[`CharacterCallbacks`] implementor in this order:

1. `before_character_update`
2. `update_rotation`
3. `update_velocity`
4. (integrate and resolve collisions, calling `on_movement_hit` zero or more times)
5. `post_grounding_update`
6. `after_character_update`

Notes
- Every callback receives the motor back as `&mut dyn Motor` so states can query grounding or
  flip collision toggles without holding a long-lived reference.
- Positions are the capsule's feet. Local axes are +Z forward, +X right, +Y up.
*/

use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Ground probing result for one physics step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GroundingStatus {
    /// Touching any surface below the character, walkable or not.
    pub found_any_ground: bool,
    /// Resting on a walkable surface.
    pub is_stable_on_ground: bool,
    pub ground_normal: Vector3<f32>,
}

impl Default for GroundingStatus {
    fn default() -> Self {
        Self {
            found_any_ground: false,
            is_stable_on_ground: false,
            ground_normal: Vector3::y(),
        }
    }
}

/// Capsule size, with `y_offset` being the height of the capsule center above the feet.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CapsuleDimensions {
    pub radius: f32,
    pub height: f32,
    pub y_offset: f32,
}

impl CapsuleDimensions {
    pub const fn new(radius: f32, height: f32, y_offset: f32) -> Self {
        Self {
            radius,
            height,
            y_offset,
        }
    }

    /// Half height of the cylindrical part, as rapier's `Capsule::new_y` expects.
    pub fn segment_half_height(&self) -> f32 {
        (self.height * 0.5 - self.radius).max(0.0)
    }
}

/// Collision features a state may switch off while it is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MotorToggles {
    pub capsule_collisions: bool,
    pub movement_collision_solving: bool,
    pub ground_solving: bool,
}

impl Default for MotorToggles {
    fn default() -> Self {
        Self {
            capsule_collisions: true,
            movement_collision_solving: true,
            ground_solving: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RaycastHit {
    pub point: Point3<f32>,
    pub normal: Vector3<f32>,
    pub distance: f32,
}

/// A collision reported while the motor resolves a move.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MovementHit {
    /// Collision layer of the collider that was hit.
    pub layer: u32,
    /// Surface normal, facing the character.
    pub normal: Vector3<f32>,
    pub point: Point3<f32>,
}

/// Whether the surface of a [`MovementHit`] would count as walkable ground.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HitStabilityReport {
    pub is_stable: bool,
}

/// Queries and commands the controller needs from the physics side.
pub trait Motor {
    fn position(&self) -> Point3<f32>;

    fn rotation(&self) -> UnitQuaternion<f32>;

    /// Velocity applied during the last step.
    fn velocity(&self) -> Vector3<f32>;

    fn character_up(&self) -> Vector3<f32> {
        self.rotation() * Vector3::y()
    }

    fn character_forward(&self) -> Vector3<f32> {
        self.rotation() * Vector3::z()
    }

    fn character_right(&self) -> Vector3<f32> {
        self.rotation() * Vector3::x()
    }

    fn grounding(&self) -> GroundingStatus;

    /// Grounding from the step before the current one.
    fn last_grounding(&self) -> GroundingStatus;

    /// Skip ground probing and snapping for `duration` seconds.
    fn force_unground(&mut self, duration: f32);

    fn capsule_dimensions(&self) -> CapsuleDimensions;

    fn set_capsule_dimensions(&mut self, dimensions: CapsuleDimensions);

    fn toggles(&self) -> MotorToggles;

    fn set_capsule_collisions(&mut self, enabled: bool);

    fn set_movement_collision_solving(&mut self, enabled: bool);

    fn set_ground_solving(&mut self, enabled: bool);

    /// Does the current capsule overlap any valid collider at this pose?
    fn character_collisions_overlap(
        &self,
        position: Point3<f32>,
        rotation: UnitQuaternion<f32>,
    ) -> bool;

    fn raycast(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> Option<RaycastHit>;

    /// Velocity that carries the character from `from` to `to` in one step.
    fn velocity_for_move_position(
        &self,
        from: Point3<f32>,
        to: Point3<f32>,
        dt: f32,
    ) -> Vector3<f32> {
        if dt <= 0.0 {
            return Vector3::zeros();
        }
        (to - from) / dt
    }
}

/// Per-physics-step hooks the motor drives, in the order listed in the module docs.
pub trait CharacterCallbacks {
    fn before_character_update(&mut self, motor: &mut dyn Motor, dt: f32);

    fn update_rotation(&mut self, motor: &mut dyn Motor, rotation: &mut UnitQuaternion<f32>, dt: f32);

    fn update_velocity(&mut self, motor: &mut dyn Motor, velocity: &mut Vector3<f32>, dt: f32);

    fn post_grounding_update(&mut self, motor: &mut dyn Motor, dt: f32);

    fn after_character_update(&mut self, motor: &mut dyn Motor, dt: f32);

    fn on_movement_hit(
        &mut self,
        motor: &mut dyn Motor,
        hit: &MovementHit,
        report: &mut HitStabilityReport,
    );

    fn is_collider_valid_for_collisions(&self, layer: u32) -> bool;
}
