/*!
Foot placement targets for an IK rig.

Each physics step [`FootIk::update_targets`] casts a ray down through each foot, starting a fixed
height above the character's feet, and records where the foot should rest and how it should tilt
to match the ground. During the animation pass the host asks for the smoothed per-foot height
offsets and the pelvis height, and applies them to its own skeleton.

Notes
- Heights are measured along the character's up axis relative to the character position.
- A foot whose ray hits nothing has no target; the pelvis is left alone until both feet have one.
*/

use nalgebra::{Point3, UnitQuaternion};

use crate::motion::align_up;
use crate::motor::Motor;
use crate::settings::FootIkSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Foot {
    Left,
    Right,
}

impl Foot {
    #[inline]
    fn index(self) -> usize {
        match self {
            Foot::Left => 0,
            Foot::Right => 1,
        }
    }
}

/// Where a foot should be planted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootTarget {
    pub position: Point3<f32>,
    /// Character rotation tilted so the foot's up matches the ground normal.
    pub rotation: UnitQuaternion<f32>,
}

/// Smoothed foot adjustment to apply on top of the animated pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootPlacement {
    /// Offset along the character up axis added to the animated foot position.
    pub height_offset: f32,
    pub rotation: UnitQuaternion<f32>,
}

#[derive(Debug, Default, Clone)]
pub struct FootIk {
    targets: [Option<FootTarget>; 2],
    last_foot_height: [f32; 2],
    last_pelvis_height: Option<f32>,
}

impl FootIk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self, foot: Foot) -> Option<FootTarget> {
        self.targets[foot.index()]
    }

    /// Raycast for one foot. `foot` is the animated foot position in world space.
    pub fn solve_foot(
        settings: &FootIkSettings,
        motor: &dyn Motor,
        foot: Point3<f32>,
    ) -> Option<FootTarget> {
        let up = motor.character_up();
        let base = motor.position();

        // Lift the foot to a fixed height above the character so steps up are found too.
        let along_up = (foot - base).dot(&up);
        let origin = foot + up * (settings.height_from_ground_raycast - along_up);
        let hit = motor.raycast(
            origin,
            -up,
            settings.raycast_down_distance + settings.height_from_ground_raycast,
        )?;

        let ground_height = (hit.point - base).dot(&up);
        let drop = settings.height_from_ground_raycast - ground_height - settings.pelvis_offset;
        let position = origin - up * drop;
        Some(FootTarget {
            position,
            rotation: align_up(motor.rotation(), hit.normal),
        })
    }

    /// Refresh both foot targets. Clears them while foot IK is disabled.
    pub fn update_targets(
        &mut self,
        settings: &FootIkSettings,
        motor: &dyn Motor,
        left_foot: Point3<f32>,
        right_foot: Point3<f32>,
    ) {
        if !settings.enabled {
            self.targets = [None, None];
            return;
        }
        self.targets = [
            Self::solve_foot(settings, motor, left_foot),
            Self::solve_foot(settings, motor, right_foot),
        ];
    }

    /// Smoothed adjustment for one foot, or `None` when it has no target.
    pub fn foot_placement(
        &mut self,
        settings: &FootIkSettings,
        motor: &dyn Motor,
        foot: Foot,
    ) -> Option<FootPlacement> {
        if !settings.enabled {
            return None;
        }
        let target = self.targets[foot.index()]?;
        let height = (target.position - motor.position()).dot(&motor.character_up());

        let last = &mut self.last_foot_height[foot.index()];
        let smoothed = lerp(*last, height, settings.feet_to_ik_position_speed);
        *last = smoothed;

        Some(FootPlacement {
            height_offset: smoothed,
            rotation: target.rotation,
        })
    }

    /// New pelvis height given the animated one, lowered toward the lower foot.
    pub fn pelvis_height(
        &mut self,
        settings: &FootIkSettings,
        motor: &dyn Motor,
        animated_height: f32,
    ) -> f32 {
        if !settings.enabled {
            return animated_height;
        }
        let (Some(left), Some(right), Some(last)) =
            (self.targets[0], self.targets[1], self.last_pelvis_height)
        else {
            self.last_pelvis_height = Some(animated_height);
            return animated_height;
        };

        let up = motor.character_up();
        let left_offset = (left.position - motor.position()).dot(&up);
        let right_offset = (right.position - motor.position()).dot(&up);

        let desired = animated_height + left_offset.min(right_offset);
        let height = lerp(last, desired, settings.pelvis_up_down_speed);
        self.last_pelvis_height = Some(height);
        height
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubMotor;
    use nalgebra::{point, vector};

    #[test]
    fn feet_land_on_the_floor_below() {
        let mut motor = StubMotor::grounded();
        motor.floor_height = Some(-0.3);
        let settings = FootIkSettings::default();

        let target = FootIk::solve_foot(&settings, &motor, point![0.2, 0.1, 0.0]);

        let target = target.map(|t| t.position);
        assert!(target.is_some_and(|p| (p - point![0.2, -0.3, 0.0]).norm() < 1.0e-5));
    }

    #[test]
    fn sloped_ground_tilts_the_foot() {
        let mut motor = StubMotor::grounded();
        motor.floor_normal = vector![0.0, 1.0, 1.0].normalize();
        let settings = FootIkSettings::default();

        let target = FootIk::solve_foot(&settings, &motor, point![0.0, 0.0, 0.0]);

        let foot_up = target.map(|t| t.rotation * vector![0.0, 1.0, 0.0]);
        assert!(foot_up.is_some_and(|up| (up - motor.floor_normal).norm() < 1.0e-5));
    }

    #[test]
    fn no_ground_means_no_target() {
        let motor = StubMotor::airborne();
        let mut ik = FootIk::new();

        ik.update_targets(&FootIkSettings::default(), &motor, motor.position, motor.position);

        assert_eq!(ik.target(Foot::Left), None);
        assert_eq!(ik.foot_placement(&FootIkSettings::default(), &motor, Foot::Left), None);
    }

    #[test]
    fn pelvis_follows_the_lower_foot_smoothly() {
        let mut motor = StubMotor::grounded();
        let settings = FootIkSettings::default();
        let mut ik = FootIk::new();
        ik.update_targets(&settings, &motor, point![-0.2, 0.0, 0.0], point![0.2, 0.0, 0.0]);

        // First call only seeds the smoothing.
        assert_eq!(ik.pelvis_height(&settings, &motor, 1.0), 1.0);

        motor.floor_height = Some(-0.5);
        ik.update_targets(&settings, &motor, point![-0.2, 0.0, 0.0], point![0.2, 0.0, 0.0]);
        let height = ik.pelvis_height(&settings, &motor, 1.0);

        assert!((height - (1.0 - 0.5 * settings.pelvis_up_down_speed)).abs() < 1.0e-5);
    }

    #[test]
    fn foot_offsets_ease_toward_the_target() {
        let mut motor = StubMotor::grounded();
        motor.floor_height = Some(0.4);
        let settings = FootIkSettings::default();
        let mut ik = FootIk::new();
        ik.update_targets(&settings, &motor, point![-0.2, 0.0, 0.0], point![0.2, 0.0, 0.0]);

        let first = ik.foot_placement(&settings, &motor, Foot::Right).map(|p| p.height_offset);
        let second = ik.foot_placement(&settings, &motor, Foot::Right).map(|p| p.height_offset);

        assert!(first.is_some_and(|h| (h - 0.2).abs() < 1.0e-5));
        assert!(second.is_some_and(|h| (h - 0.3).abs() < 1.0e-5));
    }

    #[test]
    fn disabled_foot_ik_leaves_the_pose_alone() {
        let motor = StubMotor::grounded();
        let settings = FootIkSettings {
            enabled: false,
            ..FootIkSettings::default()
        };
        let mut ik = FootIk::new();
        ik.update_targets(&settings, &motor, point![0.0, 0.0, 0.0], point![0.0, 0.0, 0.0]);

        assert_eq!(ik.target(Foot::Right), None);
        assert_eq!(ik.pelvis_height(&settings, &motor, 0.9), 0.9);
    }
}
