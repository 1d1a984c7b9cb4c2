/*!
Controller-wide tolerances and fixed values.

Tunables that designers change live in [`crate::settings`]. The values here are the
non-negotiable numeric guards used by the movement math and the reference motor.

Notes
- Distances are in meters, time in seconds, angles in degrees unless stated otherwise.
*/

/// Practical small distance for comparisons (meters).
/// Use for dot-product guards, equality checks in world space, etc.
pub const DIST_EPS: f32 = 1.0e-6;

/// Squared speed below which a velocity is treated as zero (m^2/s^2).
pub const STOP_SPEED_SQ: f32 = 1.0e-4;

/// How long ground snapping is suspended after a jump (seconds).
pub const JUMP_UNGROUND_TIME: f32 = 0.1;

/// Dot threshold between the inverted hit normal and the charge direction
/// above which a hit counts as a front-on obstruction.
pub const CHARGE_OBSTRUCTION_DOT: f32 = 0.5;

/// Overshoot past either end of a ladder segment that detaches a climbing character (meters).
pub const LADDER_EXIT_EPS: f32 = 0.05;

/// Clamp applied to the sprint animation blend parameters.
pub const SPRINT_ANIM_CLAMP: f32 = 2.0;

/// Maximum walkable slope used by the reference motor (degrees).
pub const DEFAULT_MAX_SLOPE_DEG: f32 = 50.0;

/// Downward probe distance used by the reference motor to find ground (meters).
pub const GROUND_PROBE_DISTANCE: f32 = 0.3;

/// Small gap preserved between the character and its surroundings by the reference motor (meters).
pub const MOTOR_SKIN: f32 = 0.01;

/// Tolerance for accumulated timers so that a sequence of steps summing to a
/// duration counts as having reached it (seconds).
pub const TIME_EPS: f32 = 1.0e-5;

/// Length of the downward ray the power slide uses to sample the slope (meters).
pub const SLIDE_PROBE_DISTANCE: f32 = 10.0;

/// Height above the feet that ground rays start from, so a character resting on a surface
/// still hits it (meters).
pub const PROBE_LIFT: f32 = 0.1;
