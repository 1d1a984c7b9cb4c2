use nalgebra::{Point3, Unit, UnitQuaternion, Vector3};

use super::{Interactable, Pose};

/// A climbable line segment.
///
/// The segment starts at `bottom` and runs `length` meters along `rotation * +Y`. While climbing,
/// the character takes on `rotation`.
#[derive(Clone, Debug, PartialEq)]
pub struct Ladder {
    pub bottom: Point3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub length: f32,
    /// Pose the character moves to when leaving past the top.
    pub top_release: Pose,
    /// Pose the character moves to when leaving past the bottom.
    pub bottom_release: Pose,
    /// How far from the segment an interact press still grabs the ladder.
    pub interaction_radius: f32,
    pub interactions: u32,
}

impl Ladder {
    /// Ladder with release points one meter in front of (bottom) and behind (top) the segment.
    pub fn new(bottom: Point3<f32>, rotation: UnitQuaternion<f32>, length: f32) -> Self {
        let forward = rotation * Vector3::z();
        let up = rotation * Vector3::y();
        let top = bottom + up * length;
        Self {
            bottom,
            rotation,
            length,
            top_release: Pose::new(top + forward, rotation),
            bottom_release: Pose::new(bottom - forward, rotation),
            interaction_radius: 1.0,
            interactions: 0,
        }
    }

    pub fn with_release_poses(mut self, top: Pose, bottom: Pose) -> Self {
        self.top_release = top;
        self.bottom_release = bottom;
        self
    }

    pub fn with_interaction_radius(mut self, radius: f32) -> Self {
        self.interaction_radius = radius;
        self
    }

    #[inline]
    pub fn up(&self) -> Unit<Vector3<f32>> {
        self.rotation * Vector3::y_axis()
    }

    #[inline]
    pub fn top(&self) -> Point3<f32> {
        self.bottom + self.up().into_inner() * self.length
    }

    /// Closest point on the segment to `point`, plus the signed overshoot along the ladder axis.
    ///
    /// Overshoot is zero while the projection lies on the segment, positive past the top (by how
    /// far past) and negative below the bottom.
    pub fn closest_point_on_segment(&self, point: Point3<f32>) -> (Point3<f32>, f32) {
        let up = self.up().into_inner();
        let projection = (point - self.bottom).dot(&up);

        if projection <= 0.0 {
            (self.bottom, projection)
        } else if projection <= self.length {
            (self.bottom + up * projection, 0.0)
        } else {
            (self.top(), projection - self.length)
        }
    }
}

impl Interactable for Ladder {
    fn interaction_contains(&self, point: Point3<f32>) -> bool {
        let (closest, _) = self.closest_point_on_segment(point);
        (point - closest).norm() <= self.interaction_radius
    }

    fn on_interact(&mut self) {
        self.interactions += 1;
        log::debug!("Ladder at {:?} grabbed", self.bottom);
    }
}
