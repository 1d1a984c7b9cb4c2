use nalgebra::{Point3, UnitQuaternion, Vector3};

use crate::constants::DIST_EPS;

/// Oriented box of water.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaterVolume {
    pub center: Point3<f32>,
    pub half_extents: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl WaterVolume {
    pub fn new(
        center: Point3<f32>,
        half_extents: Vector3<f32>,
        rotation: UnitQuaternion<f32>,
    ) -> Self {
        Self {
            center,
            half_extents,
            rotation,
        }
    }

    /// Closest point inside the volume. Points already inside are returned unchanged.
    pub fn closest_point(&self, point: Point3<f32>) -> Point3<f32> {
        let local = self.rotation.inverse() * (point - self.center);
        let clamped = Vector3::new(
            local.x.clamp(-self.half_extents.x, self.half_extents.x),
            local.y.clamp(-self.half_extents.y, self.half_extents.y),
            local.z.clamp(-self.half_extents.z, self.half_extents.z),
        );
        self.center + self.rotation * clamped
    }

    #[inline]
    pub fn contains(&self, point: Point3<f32>) -> bool {
        (self.closest_point(point) - point).norm_squared() <= DIST_EPS * DIST_EPS
    }
}
