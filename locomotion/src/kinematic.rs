/*!
Reference [`Motor`] built on rapier's kinematic character controller.

[`RapierMotor`] moves a capsule through a [`StaticQueryWorld`] and drives a [`CharacterCallbacks`]
implementor once per [`RapierMotor::simulate`] call, in the order documented on
[`crate::motor`].

Notes
- Sweep and slide, autostep and slope limits come from `KinematicCharacterController`; grounding
  is a separate downward ray from the feet so it can be switched off and suspended on its own.
- Collision layers are read from the callbacks at the start of every step and used for moves,
  ray casts and overlap tests alike.
- Velocity loses the component pointing into every surface hit during the move.
*/

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use rapier3d::control::{CharacterAutostep, CharacterCollision, CharacterLength, KinematicCharacterController};
use rapier3d::prelude::{Capsule, Collider, ColliderHandle, QueryFilter, UnitVector};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_SLOPE_DEG, GROUND_PROBE_DISTANCE, MOTOR_SKIN, PROBE_LIFT};
use crate::motor::{
    CapsuleDimensions, CharacterCallbacks, GroundingStatus, HitStabilityReport, Motor,
    MotorToggles, MovementHit, RaycastHit,
};
use crate::rapier::{StaticQueryWorld, collider_layer, layer_in_mask};

/// Tunables of the reference motor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RapierMotorSettings {
    /// Steepest slope the character can stand on (degrees).
    pub max_stable_slope_angle: f32,
    /// How far below the feet ground is still snapped to while grounded (meters).
    pub ground_probe_distance: f32,
    /// Gap kept between the capsule and the level (meters).
    pub skin: f32,
    /// Tallest ledge climbed without jumping (meters).
    pub autostep_height: f32,
    /// Free space needed on top of a ledge to step onto it (meters).
    pub autostep_min_width: f32,
}

impl Default for RapierMotorSettings {
    fn default() -> Self {
        Self {
            max_stable_slope_angle: DEFAULT_MAX_SLOPE_DEG,
            ground_probe_distance: GROUND_PROBE_DISTANCE,
            skin: MOTOR_SKIN,
            autostep_height: 0.4,
            autostep_min_width: 0.2,
        }
    }
}

pub struct RapierMotor {
    world: StaticQueryWorld,
    settings: RapierMotorSettings,
    position: Point3<f32>,
    rotation: UnitQuaternion<f32>,
    velocity: Vector3<f32>,
    grounding: GroundingStatus,
    last_grounding: GroundingStatus,
    capsule: CapsuleDimensions,
    toggles: MotorToggles,
    unground_remaining: f32,
    /// Layers the character collides with, refreshed every step.
    collision_layers: u32,
}

impl RapierMotor {
    pub fn new(
        world: StaticQueryWorld,
        settings: RapierMotorSettings,
        position: Point3<f32>,
        rotation: UnitQuaternion<f32>,
        capsule: CapsuleDimensions,
    ) -> Self {
        Self {
            world,
            settings,
            position,
            rotation,
            velocity: Vector3::zeros(),
            grounding: GroundingStatus::default(),
            last_grounding: GroundingStatus::default(),
            capsule,
            toggles: MotorToggles::default(),
            unground_remaining: 0.0,
            collision_layers: u32::MAX,
        }
    }

    pub fn world(&self) -> &StaticQueryWorld {
        &self.world
    }

    pub fn settings(&self) -> &RapierMotorSettings {
        &self.settings
    }

    /// Move without collision and drop any motion and grounding.
    pub fn teleport(&mut self, position: Point3<f32>, rotation: UnitQuaternion<f32>) {
        self.position = position;
        self.rotation = rotation;
        self.velocity = Vector3::zeros();
        self.grounding = GroundingStatus::default();
        self.last_grounding = GroundingStatus::default();
    }

    fn capsule_shape(&self) -> Capsule {
        Capsule::new_y(self.capsule.segment_half_height(), self.capsule.radius)
    }

    fn capsule_pose(&self, position: Point3<f32>, rotation: UnitQuaternion<f32>) -> Isometry3<f32> {
        let center = position + rotation * Vector3::y() * self.capsule.y_offset;
        Isometry3::from_parts(Translation3::from(center.coords), rotation)
    }

    fn stability_cos(&self) -> f32 {
        self.settings.max_stable_slope_angle.to_radians().cos()
    }

    fn controller(&self) -> KinematicCharacterController {
        let slope = self.settings.max_stable_slope_angle.to_radians();
        KinematicCharacterController {
            up: UnitVector::new_normalize(self.character_up()),
            offset: CharacterLength::Absolute(self.settings.skin),
            autostep: Some(CharacterAutostep {
                max_height: CharacterLength::Absolute(self.settings.autostep_height),
                min_width: CharacterLength::Absolute(self.settings.autostep_min_width),
                include_dynamic_bodies: false,
            }),
            max_slope_climb_angle: slope,
            min_slope_slide_angle: slope,
            snap_to_ground: None,
            ..KinematicCharacterController::default()
        }
    }

    fn refresh_collision_layers(&mut self, callbacks: &dyn CharacterCallbacks) {
        self.collision_layers = (0..u32::BITS)
            .filter(|layer| callbacks.is_collider_valid_for_collisions(*layer))
            .fold(0, |mask, layer| mask | (1 << layer));
    }

    /// Apply `translation`, sliding along the level when collision solving is on.
    fn solve_movement(
        &mut self,
        translation: Vector3<f32>,
        dt: f32,
    ) -> Vec<(MovementHit, HitStabilityReport)> {
        if !self.toggles.capsule_collisions || !self.toggles.movement_collision_solving {
            self.position += translation;
            return Vec::new();
        }

        let layers = self.collision_layers;
        let predicate = |_: ColliderHandle, collider: &Collider| {
            layer_in_mask(collider_layer(collider), layers)
        };
        let mut collisions: Vec<CharacterCollision> = Vec::new();
        let movement = {
            let pipeline = self
                .world
                .as_query_pipeline(QueryFilter::only_fixed().predicate(&predicate));
            self.controller().move_shape(
                dt,
                &pipeline,
                &self.capsule_shape(),
                &self.capsule_pose(self.position, self.rotation),
                translation,
                |collision| collisions.push(collision),
            )
        };
        self.position += movement.translation;

        let up = self.character_up();
        let stable_cos = self.stability_cos();
        collisions
            .iter()
            .map(|collision| {
                // Hit normals face the character: flip any that point along the attempted move.
                let attempted = collision.translation_applied + collision.translation_remaining;
                let mut normal = collision.hit.normal1.into_inner();
                if normal.dot(&attempted) > 0.0 {
                    normal = -normal;
                }
                let center = Point3::from(collision.character_pos.translation.vector);
                let hit = MovementHit {
                    layer: self.world.layer_of(collision.handle).unwrap_or(0),
                    normal,
                    point: center - normal * self.capsule.radius,
                };
                let report = HitStabilityReport {
                    is_stable: normal.dot(&up) >= stable_cos,
                };
                (hit, report)
            })
            .collect()
    }

    /// Look for ground below the feet and snap onto it while staying grounded.
    fn probe_ground(&mut self) -> GroundingStatus {
        if !self.toggles.ground_solving || self.unground_remaining > 0.0 {
            return GroundingStatus::default();
        }

        let up = self.character_up();
        let was_stable = self.grounding.is_stable_on_ground;
        let reach = if was_stable {
            self.settings.ground_probe_distance
        } else {
            self.settings.skin * 4.0
        };
        let origin = self.position + up * PROBE_LIFT;
        let Some(hit) = self
            .world
            .cast_ray(origin, -up, PROBE_LIFT + reach, self.collision_layers)
        else {
            return GroundingStatus::default();
        };

        let stable = hit.normal.dot(&up) >= self.stability_cos();
        let gap = hit.distance - PROBE_LIFT;
        if stable && was_stable && gap > self.settings.skin && self.velocity.dot(&up) <= 0.0 {
            self.position -= up * (gap - self.settings.skin);
        }

        GroundingStatus {
            found_any_ground: true,
            is_stable_on_ground: stable,
            ground_normal: hit.normal,
        }
    }

    /// Run one physics step.
    pub fn simulate(&mut self, callbacks: &mut dyn CharacterCallbacks, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.refresh_collision_layers(&*callbacks);

        callbacks.before_character_update(self, dt);

        let mut rotation = self.rotation;
        callbacks.update_rotation(self, &mut rotation, dt);
        self.rotation = rotation;

        let mut velocity = self.velocity;
        callbacks.update_velocity(self, &mut velocity, dt);

        for (hit, mut report) in self.solve_movement(velocity * dt, dt) {
            callbacks.on_movement_hit(self, &hit, &mut report);
            let into_surface = velocity.dot(&hit.normal);
            if into_surface < 0.0 {
                velocity -= hit.normal * into_surface;
            }
        }
        self.velocity = velocity;
        self.unground_remaining = (self.unground_remaining - dt).max(0.0);

        self.last_grounding = self.grounding;
        self.grounding = self.probe_ground();
        if self.grounding.is_stable_on_ground {
            let normal = self.grounding.ground_normal;
            let into_ground = self.velocity.dot(&normal);
            if into_ground < 0.0 {
                self.velocity -= normal * into_ground;
            }
        }

        callbacks.post_grounding_update(self, dt);
        callbacks.after_character_update(self, dt);
    }
}

impl Motor for RapierMotor {
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
        self.unground_remaining = self.unground_remaining.max(duration);
        self.grounding = GroundingStatus::default();
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
        position: Point3<f32>,
        rotation: UnitQuaternion<f32>,
    ) -> bool {
        if !self.toggles.capsule_collisions {
            return false;
        }
        let pose = self.capsule_pose(position, rotation);
        self.world
            .overlaps(&pose, &self.capsule_shape(), self.collision_layers)
    }

    fn raycast(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
    ) -> Option<RaycastHit> {
        let direction = direction.try_normalize(f32::EPSILON)?;
        self.world
            .cast_ray(origin, direction, max_distance, self.collision_layers)
            .map(|hit| RaycastHit {
                point: hit.point,
                normal: hit.normal,
                distance: hit.distance,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rapier::{ColliderShapeDef, WorldStaticDef, build_static_query_world};
    use nalgebra::{point, vector};

    const DT: f32 = 1.0 / 60.0;
    const WALL_LAYER: u32 = 2;

    /// Walks at a fixed planar velocity under gravity and records every hit.
    #[derive(Default)]
    struct Walker {
        planar: Vector3<f32>,
        gravity: bool,
        ignored_layers: u32,
        hits: Vec<(MovementHit, HitStabilityReport)>,
        landings: usize,
    }

    impl CharacterCallbacks for Walker {
        fn before_character_update(&mut self, _motor: &mut dyn Motor, _dt: f32) {}

        fn update_rotation(&mut self, _motor: &mut dyn Motor, _rotation: &mut UnitQuaternion<f32>, _dt: f32) {}

        fn update_velocity(&mut self, motor: &mut dyn Motor, velocity: &mut Vector3<f32>, dt: f32) {
            let vertical = if self.gravity && !motor.grounding().is_stable_on_ground {
                velocity.y - 30.0 * dt
            } else {
                0.0
            };
            *velocity = vector![self.planar.x, vertical, self.planar.z];
        }

        fn post_grounding_update(&mut self, motor: &mut dyn Motor, _dt: f32) {
            if motor.grounding().is_stable_on_ground && !motor.last_grounding().is_stable_on_ground {
                self.landings += 1;
            }
        }

        fn after_character_update(&mut self, _motor: &mut dyn Motor, _dt: f32) {}

        fn on_movement_hit(
            &mut self,
            _motor: &mut dyn Motor,
            hit: &MovementHit,
            report: &mut HitStabilityReport,
        ) {
            self.hits.push((*hit, *report));
        }

        fn is_collider_valid_for_collisions(&self, layer: u32) -> bool {
            self.ignored_layers & (1 << layer) == 0
        }
    }

    /// Ground plane at y = 0 and a wall whose near face is at x = 2.5.
    fn motor_at(position: Point3<f32>) -> RapierMotor {
        let world = build_static_query_world(
            [
                WorldStaticDef::new(0, vector![0.0, 0.0, 0.0], ColliderShapeDef::Plane {
                    offset_along_normal: 0.0,
                }),
                WorldStaticDef::new(1, vector![3.0, 2.0, 0.0], ColliderShapeDef::Cuboid {
                    half_extents: vector![0.5, 2.0, 5.0],
                })
                .on_layer(WALL_LAYER),
            ],
            DT,
        );
        RapierMotor::new(
            world,
            RapierMotorSettings::default(),
            position,
            UnitQuaternion::identity(),
            CapsuleDimensions::new(0.5, 2.0, 1.0),
        )
    }

    fn run(motor: &mut RapierMotor, walker: &mut Walker, steps: usize) {
        for _ in 0..steps {
            motor.simulate(walker, DT);
        }
    }

    #[test]
    fn falls_and_lands_on_the_ground() {
        let mut motor = motor_at(point![0.0, 2.0, 0.0]);
        let mut walker = Walker {
            gravity: true,
            ..Walker::default()
        };

        run(&mut motor, &mut walker, 90);

        assert!(motor.grounding().is_stable_on_ground);
        assert!(motor.position().y > -0.01 && motor.position().y < 0.05);
        assert_eq!(walker.landings, 1);
        assert!(motor.velocity().y.abs() < 1.0e-3);
    }

    #[test]
    fn wall_stops_the_capsule_and_is_reported() {
        let mut motor = motor_at(point![0.0, 0.02, 0.0]);
        let mut walker = Walker {
            planar: vector![4.0, 0.0, 0.0],
            gravity: true,
            ..Walker::default()
        };

        run(&mut motor, &mut walker, 90);

        assert!(motor.position().x < 2.05 && motor.position().x > 1.5);
        assert!(walker.hits.iter().any(|(hit, report)| {
            hit.layer == WALL_LAYER && hit.normal.x < -0.9 && !report.is_stable
        }));
    }

    #[test]
    fn ignored_layers_are_walked_through() {
        let mut motor = motor_at(point![0.0, 0.02, 0.0]);
        let mut walker = Walker {
            planar: vector![4.0, 0.0, 0.0],
            gravity: true,
            ignored_layers: 1 << WALL_LAYER,
            ..Walker::default()
        };

        run(&mut motor, &mut walker, 90);

        assert!(motor.position().x > 4.0);
        assert!(walker.hits.iter().all(|(hit, _)| hit.layer != WALL_LAYER));
    }

    #[test]
    fn collision_solving_off_moves_straight_through() {
        let mut motor = motor_at(point![0.0, 0.5, 0.0]);
        motor.set_movement_collision_solving(false);
        let mut walker = Walker {
            planar: vector![4.0, 0.0, 0.0],
            ..Walker::default()
        };

        run(&mut motor, &mut walker, 60);

        assert!((motor.position() - point![4.0, 0.5, 0.0]).norm() < 1.0e-3);
        assert!(walker.hits.is_empty());
    }

    #[test]
    fn force_unground_suspends_ground_probing() {
        let mut motor = motor_at(point![0.0, 0.01, 0.0]);
        let mut walker = Walker::default();
        run(&mut motor, &mut walker, 2);
        assert!(motor.grounding().is_stable_on_ground);

        motor.force_unground(0.1);
        run(&mut motor, &mut walker, 3);
        assert!(!motor.grounding().found_any_ground);

        run(&mut motor, &mut walker, 10);
        assert!(motor.grounding().is_stable_on_ground);
    }

    #[test]
    fn raycast_and_overlap_queries() {
        let mut motor = motor_at(point![0.0, 0.01, 0.0]);

        let hit = motor.raycast(point![0.0, 3.0, 0.0], vector![0.0, -2.0, 0.0], 5.0);
        assert!(hit.is_some_and(|h| (h.distance - 3.0).abs() < 1.0e-4));

        assert!(motor.character_collisions_overlap(point![3.0, 0.5, 0.0], UnitQuaternion::identity()));
        assert!(!motor.character_collisions_overlap(point![0.0, 0.5, 0.0], UnitQuaternion::identity()));

        motor.set_capsule_collisions(false);
        assert!(!motor.character_collisions_overlap(point![3.0, 0.5, 0.0], UnitQuaternion::identity()));
    }
}
