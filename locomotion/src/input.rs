use nalgebra::UnitQuaternion;

/// One sample of player intent, supplied by the host's input layer.
///
/// `*_down` / `*_up` are edges for this sample, `*_held` is the level. The controller never
/// polls devices itself.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CharacterInputs {
    pub move_forward: f32,
    pub move_right: f32,
    pub camera_rotation: UnitQuaternion<f32>,
    pub jump_down: bool,
    pub jump_held: bool,
    pub crouch_down: bool,
    pub crouch_up: bool,
    pub crouch_held: bool,
    pub sprint_held: bool,
    pub charge_down: bool,
    pub no_clip_down: bool,
    pub interact_down: bool,
    pub dodge_down: bool,
}

impl Default for CharacterInputs {
    fn default() -> Self {
        Self {
            move_forward: 0.0,
            move_right: 0.0,
            camera_rotation: UnitQuaternion::identity(),
            jump_down: false,
            jump_held: false,
            crouch_down: false,
            crouch_up: false,
            crouch_held: false,
            sprint_held: false,
            charge_down: false,
            no_clip_down: false,
            interact_down: false,
            dodge_down: false,
        }
    }
}

impl CharacterInputs {
    /// Forward/right axes as a camera-local vector (x = right, z = forward).
    pub fn move_axes(&self) -> nalgebra::Vector3<f32> {
        nalgebra::vector![self.move_right, 0.0, self.move_forward]
    }
}
