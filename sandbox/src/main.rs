//! Headless driver for the locomotion controller.
//!
//! Builds a small rapier level, spawns a character on the reference motor and plays a scripted
//! input timeline through it. Run with `RUST_LOG=debug` to see every state change.

mod level;
mod script;

use std::path::PathBuf;
use std::process::ExitCode;

use nalgebra::UnitQuaternion;
use locomotion::{AnimationSink, CharacterController, CharacterSettings, RapierMotor, RapierMotorSettings};

const DEFAULT_SETTINGS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/character.ron");

/// Writes animation parameters to the log instead of an animation graph.
struct LogAnimator;

impl AnimationSink for LogAnimator {
    fn set_float(&mut self, name: &'static str, value: f32) {
        log::trace!("anim {name} = {value:.2}");
    }

    fn set_bool(&mut self, name: &'static str, value: bool) {
        log::trace!("anim {name} = {value}");
    }

    fn set_trigger(&mut self, name: &'static str) {
        log::debug!("anim trigger {name}");
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS));
    let settings = match CharacterSettings::load(&path) {
        Ok(settings) => settings,
        Err(err) => {
            log::error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let level = level::build(script::PHYSICS_DT);
    let mut motor = RapierMotor::new(
        level.world,
        RapierMotorSettings::default(),
        level.spawn,
        UnitQuaternion::identity(),
        settings.crouch.standing,
    );
    let mut controller =
        CharacterController::new(settings, Box::new(LogAnimator), level.environment, &mut motor);

    let report = script::run(&mut controller, &mut motor, &script::timeline());
    report.log();
    ExitCode::SUCCESS
}
