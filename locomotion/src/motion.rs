/*!
Movement math shared by every state.

Notes
- All smoothing goes through [`smoothing_factor`], the exponential form `1 - exp(-k * dt)`.
  Two half steps and one full step land on the same value, so behavior does not drift with
  the physics rate.
- Directions are treated as unit vectors unless a function says otherwise. Degenerate input
  (zero vectors) returns zero or the fallback named in the doc instead of NaN.
*/

use nalgebra::{Point3, Unit, UnitQuaternion, Vector3};

use crate::constants::DIST_EPS;

/// Interpolation factor for exponential smoothing with `sharpness` over `dt` seconds.
#[inline]
pub fn smoothing_factor(sharpness: f32, dt: f32) -> f32 {
    1.0 - (-sharpness * dt).exp()
}

/// Exponentially approach `target` from `current`.
#[inline]
pub fn smooth_toward(
    current: Vector3<f32>,
    target: Vector3<f32>,
    sharpness: f32,
    dt: f32,
) -> Vector3<f32> {
    current.lerp(&target, smoothing_factor(sharpness, dt))
}

/// Remove the component of `v` along the unit `normal`.
#[inline]
pub fn project_on_plane(v: Vector3<f32>, normal: Vector3<f32>) -> Vector3<f32> {
    v - normal * v.dot(&normal)
}

/// Component of `v` along the unit `axis`.
#[inline]
pub fn project_on_axis(v: Vector3<f32>, axis: Vector3<f32>) -> Vector3<f32> {
    axis * v.dot(&axis)
}

#[inline]
pub fn normalize_or_zero(v: Vector3<f32>) -> Vector3<f32> {
    v.try_normalize(DIST_EPS).unwrap_or_else(Vector3::zeros)
}

#[inline]
pub fn clamp_magnitude(v: Vector3<f32>, max: f32) -> Vector3<f32> {
    let len_sq = v.norm_squared();
    if len_sq > max * max {
        v * (max / len_sq.sqrt())
    } else {
        v
    }
}

/// Direction on the surface described by `surface_normal` that keeps the heading of `direction`
/// as seen from `up`. Returns zero when `direction` is parallel to `up`.
#[inline]
pub fn direction_tangent_to_surface(
    direction: Vector3<f32>,
    surface_normal: Vector3<f32>,
    up: Vector3<f32>,
) -> Vector3<f32> {
    let right = direction.cross(&up);
    normalize_or_zero(surface_normal.cross(&right))
}

/// Re-express `velocity` along the tangent of a new ground normal, keeping its magnitude.
#[inline]
pub fn reorient_on_surface(
    velocity: Vector3<f32>,
    surface_normal: Vector3<f32>,
    up: Vector3<f32>,
) -> Vector3<f32> {
    direction_tangent_to_surface(velocity, surface_normal, up) * velocity.norm()
}

/// Spherically interpolate between two directions. Falls back to `to` when the directions are
/// opposite or degenerate.
pub fn slerp_direction(from: Vector3<f32>, to: Vector3<f32>, t: f32) -> Vector3<f32> {
    let (Some(a), Some(b)) = (
        Unit::try_new(from, DIST_EPS),
        Unit::try_new(to, DIST_EPS),
    ) else {
        return normalize_or_zero(to);
    };
    a.try_slerp(&b, t, DIST_EPS)
        .map(Unit::into_inner)
        .unwrap_or_else(|| b.into_inner())
}

/// Rotation whose local +Z points along `forward` and whose local +Y leans toward `up`.
#[inline]
pub fn look_rotation(forward: Vector3<f32>, up: Vector3<f32>) -> UnitQuaternion<f32> {
    UnitQuaternion::face_towards(&forward, &up)
}

/// Rotation that tilts `rotation` so its up axis matches `target_up`.
pub fn align_up(rotation: UnitQuaternion<f32>, target_up: Vector3<f32>) -> UnitQuaternion<f32> {
    let current_up = rotation * Vector3::y();
    UnitQuaternion::rotation_between(&current_up, &target_up)
        .map(|tilt| tilt * rotation)
        .unwrap_or(rotation)
}

/// Camera forward flattened onto the plane perpendicular to `up`.
///
/// When the camera looks straight along `up`, its own up axis is flattened instead so the
/// character still has a heading.
pub fn camera_planar_direction(camera: UnitQuaternion<f32>, up: Vector3<f32>) -> Vector3<f32> {
    let direction = normalize_or_zero(project_on_plane(camera * Vector3::z(), up));
    if direction.norm_squared() > 0.0 {
        direction
    } else {
        normalize_or_zero(project_on_plane(camera * Vector3::y(), up))
    }
}

/// Angle between two vectors in degrees. Zero vectors yield zero.
#[inline]
pub fn angle_between_deg(a: Vector3<f32>, b: Vector3<f32>) -> f32 {
    let denom = a.norm() * b.norm();
    if denom <= DIST_EPS {
        return 0.0;
    }
    (a.dot(&b) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Input for computing the desired translation toward a target in 3D.
///
/// - The movement is clamped so we stop at the surface of the acceptance sphere.
/// - If already within acceptance, we return zero translation and `finished = true`.
#[derive(Clone, Copy, Debug)]
pub struct MoveTowardParams {
    pub current: Point3<f32>,
    pub target: Point3<f32>,
    /// Linear speed in meters per second.
    pub speed_mps: f32,
    pub dt_seconds: f32,
    /// If `distance(current, target) <= acceptance_radius`, the mover is considered done.
    pub acceptance_radius: f32,
}

#[derive(Clone, Copy, Debug)]
pub struct MoveTowardResult {
    /// The translation we want to apply for this step (meters), never past the acceptance boundary.
    pub desired_translation: Vector3<f32>,
    /// True when already inside acceptance or when this step reaches the boundary.
    pub finished: bool,
    /// Distance to the target at the time of computation (meters).
    pub distance_to_target: f32,
}

/// Compute the translation toward `target` at `speed_mps` over `dt_seconds`, stopping on the
/// acceptance sphere boundary.
///
/// This does not apply any collision. States convert the result to a velocity and let the
/// motor resolve it.
#[inline]
pub fn compute_desired_translation(params: MoveTowardParams) -> MoveTowardResult {
    let MoveTowardParams {
        current,
        target,
        speed_mps,
        dt_seconds,
        acceptance_radius,
    } = params;

    let delta = target - current;
    let dist = delta.norm();

    let acc = acceptance_radius.max(0.0);
    let speed = speed_mps.max(0.0);
    let dt = dt_seconds.max(0.0);

    if dist <= acc + DIST_EPS {
        return MoveTowardResult {
            desired_translation: Vector3::zeros(),
            finished: true,
            distance_to_target: dist,
        };
    }

    let max_step = speed * dt;
    if max_step <= DIST_EPS {
        return MoveTowardResult {
            desired_translation: Vector3::zeros(),
            finished: false,
            distance_to_target: dist,
        };
    }

    let to_boundary = (dist - acc).max(0.0);
    let step = to_boundary.min(max_step);
    let desired = delta / dist * step;

    MoveTowardResult {
        desired_translation: desired,
        finished: (to_boundary - step).abs() <= DIST_EPS,
        distance_to_target: dist,
    }
}
