//! One-way animation parameter output.
//!
//! The controller pushes named parameters and never reads them back.

pub const VELOCITY_X: &str = "velocityX";
pub const VELOCITY_Z: &str = "velocityZ";
pub const IS_GROUNDED: &str = "isGrounded";
pub const JUMP_TRIGGER: &str = "jumpTrigger";
pub const HAS_LANDED: &str = "hasLanded";
pub const DODGE_TRIGGER: &str = "dodgeTrigger";
pub const SLIDE_TRIGGER: &str = "slideTrigger";

pub trait AnimationSink {
    fn set_float(&mut self, name: &'static str, value: f32);
    fn set_bool(&mut self, name: &'static str, value: bool);
    fn set_trigger(&mut self, name: &'static str);
}

/// Discards every parameter.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAnimator;

impl AnimationSink for NullAnimator {
    fn set_float(&mut self, _name: &'static str, _value: f32) {}
    fn set_bool(&mut self, _name: &'static str, _value: bool) {}
    fn set_trigger(&mut self, _name: &'static str) {}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationEvent {
    Float(&'static str, f32),
    Bool(&'static str, bool),
    Trigger(&'static str),
}

/// Keeps every parameter write in order. Useful for hosts that replay parameters later and
/// for tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingAnimator {
    pub events: Vec<AnimationEvent>,
}

impl RecordingAnimator {
    pub fn trigger_count(&self, name: &str) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, AnimationEvent::Trigger(n) if *n == name))
            .count()
    }

    pub fn last_float(&self, name: &str) -> Option<f32> {
        self.events.iter().rev().find_map(|event| match event {
            AnimationEvent::Float(n, value) if *n == name => Some(*value),
            _ => None,
        })
    }

    pub fn last_bool(&self, name: &str) -> Option<bool> {
        self.events.iter().rev().find_map(|event| match event {
            AnimationEvent::Bool(n, value) if *n == name => Some(*value),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl AnimationSink for RecordingAnimator {
    fn set_float(&mut self, name: &'static str, value: f32) {
        self.events.push(AnimationEvent::Float(name, value));
    }

    fn set_bool(&mut self, name: &'static str, value: bool) {
        self.events.push(AnimationEvent::Bool(name, value));
    }

    fn set_trigger(&mut self, name: &'static str) {
        self.events.push(AnimationEvent::Trigger(name));
    }
}
