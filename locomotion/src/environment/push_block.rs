use nalgebra::{Point3, UnitQuaternion, Vector3};

use super::Interactable;

/// A box the character can walk up to and shove along one of its horizontal axes.
#[derive(Clone, Debug, PartialEq)]
pub struct PushBlock {
    pub center: Point3<f32>,
    pub half_extents: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    /// Extra reach around the box within which an interact press selects it.
    pub interaction_radius: f32,
    pub interactions: u32,
}

impl PushBlock {
    pub fn new(center: Point3<f32>, half_extents: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self {
            center,
            half_extents,
            rotation,
            interaction_radius: 1.0,
            interactions: 0,
        }
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.rotation * Vector3::z()
    }

    pub fn right(&self) -> Vector3<f32> {
        self.rotation * Vector3::x()
    }

    /// The four spots, level with `height`, a character can push from.
    pub fn approach_points(&self, height: f32, stand_off: f32) -> [Point3<f32>; 4] {
        let level = Point3::new(self.center.x, height, self.center.z);
        let forward = self.forward() * stand_off;
        let right = self.right() * stand_off;
        [level - forward, level + forward, level - right, level + right]
    }

    pub fn translate(&mut self, delta: Vector3<f32>) {
        self.center += delta;
    }

    fn distance_to_box(&self, point: Point3<f32>) -> f32 {
        let local = self.rotation.inverse() * (point - self.center);
        let outside = Vector3::new(
            (local.x.abs() - self.half_extents.x).max(0.0),
            (local.y.abs() - self.half_extents.y).max(0.0),
            (local.z.abs() - self.half_extents.z).max(0.0),
        );
        outside.norm()
    }
}

impl Interactable for PushBlock {
    fn interaction_contains(&self, point: Point3<f32>) -> bool {
        self.distance_to_box(point) <= self.interaction_radius
    }

    fn on_interact(&mut self) {
        self.interactions += 1;
        log::debug!("Push block at {:?} selected", self.center);
    }
}
