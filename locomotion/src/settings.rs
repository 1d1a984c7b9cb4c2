/*!
Character tunables, loaded from RON.

Every group derives `serde` with `#[serde(default)]`, so a settings file only has to name the
values it changes. Loading goes through [`CharacterSettings::load`] or
[`CharacterSettings::from_ron_str`], both of which run [`CharacterSettings::validate`].

Notes
- Abilities are written as a list of names: `enabled_abilities: ["Jump", "Sprint"]` or
  `["All"]`. Unknown names are dropped with a warning.
- Vectors are written as tuples: `gravity: (0.0, -30.0, 0.0)`.
- Settings are read-only for the lifetime of a controller.
*/

use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::Vector3;
use ron::Options;
use serde::{Deserialize, Serialize};

use crate::flags::{Ability, AbilityFlags, DodgeDirection, DodgeDirections};
use crate::motor::CapsuleDimensions;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings from {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StableMovementSettings {
    pub max_speed: f32,
    pub sharpness: f32,
    pub orientation_sharpness: f32,
}

impl Default for StableMovementSettings {
    fn default() -> Self {
        Self {
            max_speed: 10.0,
            sharpness: 15.0,
            orientation_sharpness: 10.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirSettings {
    pub max_speed: f32,
    pub acceleration: f32,
    pub drag: f32,
}

impl Default for AirSettings {
    fn default() -> Self {
        Self {
            max_speed: 10.0,
            acceleration: 5.0,
            drag: 0.1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpSettings {
    pub speed: f32,
    /// Time before landing during which a jump press is kept.
    pub pre_grounding_grace_time: f32,
    /// Time after leaving ground during which a jump is still allowed (coyote time).
    pub post_grounding_grace_time: f32,
    pub allow_double_jump: bool,
    pub allow_wall_jump: bool,
    /// Treat any ground, walkable or not, as ground for jumping.
    pub allow_jumping_when_sliding: bool,
}

impl Default for JumpSettings {
    fn default() -> Self {
        Self {
            speed: 10.0,
            pre_grounding_grace_time: 0.0,
            post_grounding_grace_time: 0.0,
            allow_double_jump: false,
            allow_wall_jump: false,
            allow_jumping_when_sliding: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrouchSettings {
    pub standing: CapsuleDimensions,
    pub crouched: CapsuleDimensions,
}

impl Default for CrouchSettings {
    fn default() -> Self {
        Self {
            standing: CapsuleDimensions::new(0.5, 2.0, 1.0),
            crouched: CapsuleDimensions::new(0.5, 1.0, 0.5),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SprintSettings {
    pub max_speed: f32,
    pub sharpness: f32,
    pub orientation_sharpness: f32,
    pub allow_jumping: bool,
}

impl Default for SprintSettings {
    fn default() -> Self {
        Self {
            max_speed: 20.0,
            sharpness: 5.0,
            orientation_sharpness: 2.0,
            allow_jumping: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargeSettings {
    pub speed: f32,
    pub max_time: f32,
    /// How long the character stays put after the charge ends.
    pub stopped_time: f32,
}

impl Default for ChargeSettings {
    fn default() -> Self {
        Self {
            speed: 15.0,
            max_time: 1.5,
            stopped_time: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwimmingSettings {
    pub speed: f32,
    pub sharpness: f32,
    /// Offset from the feet, in character space, of the point that must be submerged to swim.
    pub reference_offset: Vector3<f32>,
}

impl Default for SwimmingSettings {
    fn default() -> Self {
        Self {
            speed: 4.0,
            sharpness: 3.0,
            reference_offset: Vector3::new(0.0, 1.5, 0.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimbingSettings {
    pub speed: f32,
    pub anchoring_duration: f32,
}

impl Default for ClimbingSettings {
    fn default() -> Self {
        Self {
            speed: 4.0,
            anchoring_duration: 0.25,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoClipSettings {
    pub speed: f32,
    pub sharpness: f32,
}

impl Default for NoClipSettings {
    fn default() -> Self {
        Self {
            speed: 10.0,
            sharpness: 15.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerSlideSettings {
    /// Speed added on top of the entry velocity that the slide accelerates toward.
    pub max_speed: f32,
    /// Forward boost added to the entry velocity; also the acceleration direction.
    pub initial_force: f32,
    pub max_acceleration: f32,
    pub max_time: f32,
    /// Exponential rate used once the slide is too long or too steep.
    pub deceleration: f32,
    /// Forward-to-ground-normal angle at or above which the slope counts as too steep (degrees).
    pub max_slope_angle: f32,
}

impl Default for PowerSlideSettings {
    fn default() -> Self {
        Self {
            max_speed: 20.0,
            initial_force: 5.0,
            max_acceleration: 1.0,
            max_time: 1.5,
            deceleration: 3.0,
            max_slope_angle: 100.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DodgeSettings {
    pub force: f32,
    pub air_force: f32,
    pub sprint_force: f32,
    pub in_air: bool,
    pub in_sprint: bool,
    pub directions: DodgeDirections,
    pub air_directions: DodgeDirections,
    pub sprint_directions: DodgeDirections,
}

impl Default for DodgeSettings {
    fn default() -> Self {
        Self {
            force: 15.0,
            air_force: 10.0,
            sprint_force: 20.0,
            in_air: false,
            in_sprint: true,
            directions: DodgeDirections::all(),
            air_directions: DodgeDirections::all(),
            sprint_directions: DodgeDirections::from_slice(&[
                DodgeDirection::Left,
                DodgeDirection::Right,
            ]),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushPullSettings {
    /// Distance from the block center to each of the four approach points.
    pub stand_off: f32,
    pub approach_speed: f32,
    pub approach_acceptance: f32,
    pub push_speed: f32,
}

impl Default for PushPullSettings {
    fn default() -> Self {
        Self {
            stand_off: 1.0,
            approach_speed: 2.0,
            approach_acceptance: 0.2,
            push_speed: 2.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FootIkSettings {
    pub enabled: bool,
    /// Height above the foot the ground ray starts from.
    pub height_from_ground_raycast: f32,
    pub raycast_down_distance: f32,
    pub pelvis_offset: f32,
    pub pelvis_up_down_speed: f32,
    pub feet_to_ik_position_speed: f32,
}

impl Default for FootIkSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            height_from_ground_raycast: 1.14,
            raycast_down_distance: 1.5,
            pelvis_offset: 0.0,
            pelvis_up_down_speed: 0.28,
            feet_to_ik_position_speed: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterSettings {
    pub enabled_abilities: AbilityFlags,
    pub movement: StableMovementSettings,
    pub air: AirSettings,
    pub jump: JumpSettings,
    pub crouch: CrouchSettings,
    pub sprint: SprintSettings,
    pub charge: ChargeSettings,
    pub swimming: SwimmingSettings,
    pub climbing: ClimbingSettings,
    pub no_clip: NoClipSettings,
    pub power_slide: PowerSlideSettings,
    pub dodge: DodgeSettings,
    pub push_pull: PushPullSettings,
    pub foot_ik: FootIkSettings,
    pub gravity: Vector3<f32>,
    /// Keep the character's up axis opposite to gravity.
    pub orient_towards_gravity: bool,
    pub rotate_to_camera_facing: bool,
    /// Bit `n` set means colliders on layer `n` are ignored by the motor.
    pub ignored_layers: u32,
    /// Seconds of ignored input after the controller is created.
    pub spawn_lockout: f32,
}

impl Default for CharacterSettings {
    fn default() -> Self {
        Self {
            enabled_abilities: AbilityFlags::all(),
            movement: StableMovementSettings::default(),
            air: AirSettings::default(),
            jump: JumpSettings::default(),
            crouch: CrouchSettings::default(),
            sprint: SprintSettings::default(),
            charge: ChargeSettings::default(),
            swimming: SwimmingSettings::default(),
            climbing: ClimbingSettings::default(),
            no_clip: NoClipSettings::default(),
            power_slide: PowerSlideSettings::default(),
            dodge: DodgeSettings::default(),
            push_pull: PushPullSettings::default(),
            foot_ik: FootIkSettings::default(),
            gravity: Vector3::new(0.0, -30.0, 0.0),
            orient_towards_gravity: false,
            rotate_to_camera_facing: true,
            ignored_layers: 0,
            spawn_lockout: 0.0,
        }
    }
}

fn ron_options() -> Options {
    Options::default().with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
}

impl CharacterSettings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::parse(&contents, path)?;
        log::info!("Loaded character settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_ron_str(contents: &str) -> Result<Self, SettingsError> {
        Self::parse(contents, Path::new("<string>"))
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, SettingsError> {
        let settings: Self =
            ron_options()
                .from_str(contents)
                .map_err(|source| SettingsError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;
        settings.validate()?;
        Ok(settings)
    }

    #[inline]
    pub fn ability_enabled(&self, ability: Ability) -> bool {
        self.enabled_abilities.contains(ability)
    }

    #[inline]
    pub fn is_layer_ignored(&self, layer: u32) -> bool {
        layer < u32::BITS && (self.ignored_layers & (1 << layer)) != 0
    }

    /// Reject values the movement math cannot work with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let non_negative = [
            ("movement.max_speed", self.movement.max_speed),
            ("movement.sharpness", self.movement.sharpness),
            ("movement.orientation_sharpness", self.movement.orientation_sharpness),
            ("air.max_speed", self.air.max_speed),
            ("air.acceleration", self.air.acceleration),
            ("air.drag", self.air.drag),
            ("jump.speed", self.jump.speed),
            ("jump.pre_grounding_grace_time", self.jump.pre_grounding_grace_time),
            ("jump.post_grounding_grace_time", self.jump.post_grounding_grace_time),
            ("sprint.max_speed", self.sprint.max_speed),
            ("sprint.sharpness", self.sprint.sharpness),
            ("sprint.orientation_sharpness", self.sprint.orientation_sharpness),
            ("charge.speed", self.charge.speed),
            ("charge.stopped_time", self.charge.stopped_time),
            ("swimming.speed", self.swimming.speed),
            ("swimming.sharpness", self.swimming.sharpness),
            ("climbing.speed", self.climbing.speed),
            ("no_clip.speed", self.no_clip.speed),
            ("no_clip.sharpness", self.no_clip.sharpness),
            ("power_slide.max_speed", self.power_slide.max_speed),
            ("power_slide.initial_force", self.power_slide.initial_force),
            ("power_slide.max_acceleration", self.power_slide.max_acceleration),
            ("power_slide.deceleration", self.power_slide.deceleration),
            ("dodge.force", self.dodge.force),
            ("dodge.air_force", self.dodge.air_force),
            ("dodge.sprint_force", self.dodge.sprint_force),
            ("push_pull.stand_off", self.push_pull.stand_off),
            ("push_pull.approach_speed", self.push_pull.approach_speed),
            ("push_pull.approach_acceptance", self.push_pull.approach_acceptance),
            ("push_pull.push_speed", self.push_pull.push_speed),
            ("foot_ik.raycast_down_distance", self.foot_ik.raycast_down_distance),
            ("spawn_lockout", self.spawn_lockout),
        ];
        if let Some((name, value)) = non_negative
            .iter()
            .find(|(_, value)| !value.is_finite() || *value < 0.0)
        {
            return Err(SettingsError::Invalid(format!(
                "{name} must be a finite, non-negative number (got {value})"
            )));
        }

        let positive = [
            ("charge.max_time", self.charge.max_time),
            ("climbing.anchoring_duration", self.climbing.anchoring_duration),
            ("power_slide.max_time", self.power_slide.max_time),
        ];
        if let Some((name, value)) = positive.iter().find(|(_, value)| !(*value > 0.0)) {
            return Err(SettingsError::Invalid(format!(
                "{name} must be greater than zero (got {value})"
            )));
        }

        for (name, capsule) in [
            ("crouch.standing", &self.crouch.standing),
            ("crouch.crouched", &self.crouch.crouched),
        ] {
            if !(capsule.radius > 0.0) || capsule.height < capsule.radius * 2.0 {
                return Err(SettingsError::Invalid(format!(
                    "{name} needs a positive radius and a height of at least two radii"
                )));
            }
        }

        if self.orient_towards_gravity && self.gravity.norm_squared() <= f32::EPSILON {
            return Err(SettingsError::Invalid(
                "orient_towards_gravity requires a non-zero gravity".into(),
            ));
        }

        Ok(())
    }
}
