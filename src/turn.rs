//! Turns a visual model toward the direction its controller is moving.
//!
//! Runs once per frame in `PostUpdate`, after the fixed steps of that frame,
//! and only reads the controller's cached velocities.

use bevy::prelude::*;

use crate::config::TurnSettings;
use crate::controller::CharacterWalker;
use crate::math;
use crate::state::LocomotionHalted;

/// Velocities shorter than this leave the model's heading alone.
const MIN_TURN_VELOCITY: f32 = 0.001;

/// Smoothly yaws a model entity toward the velocity of the controller named
/// by `target`.
///
/// The model is expected to be a direct child of the controller entity; only
/// its local rotation is written, always as a pure rotation about local Y.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct TurnController {
    pub settings: TurnSettings,
    /// Entity carrying the [`CharacterWalker`] this model follows.
    pub target: Entity,
    /// Current local yaw in degrees, kept within `-360..=360`.
    current_yaw: f32,
}

impl TurnController {
    pub fn new(target: Entity, settings: TurnSettings) -> Self {
        Self {
            settings,
            target,
            current_yaw: 0.0,
        }
    }

    /// Start from an existing local yaw (degrees).
    pub fn with_yaw(mut self, degrees: f32) -> Self {
        self.current_yaw = degrees;
        self
    }

    #[inline]
    pub fn yaw(&self) -> f32 {
        self.current_yaw
    }

    /// The velocity the model should face.
    pub fn heading_source(&self, walker: &CharacterWalker) -> Vec3 {
        if self.settings.ignore_controller_momentum {
            walker.movement_velocity()
        } else {
            walker.velocity()
        }
    }

    /// Advance the yaw toward `velocity` and return the new local rotation.
    ///
    /// Returns `None` when the velocity has no meaningful component on the
    /// plane orthogonal to `root_up`.
    pub fn late_tick(
        &mut self,
        velocity: Vec3,
        root_up: Vec3,
        model_forward: Vec3,
        dt: f32,
    ) -> Option<Quat> {
        let velocity = math::project_on_plane(velocity, root_up);
        if velocity.length() < MIN_TURN_VELOCITY {
            return None;
        }
        let direction = velocity.normalize();

        let difference = math::signed_angle(model_forward, direction, root_up);
        let factor = math::inverse_lerp(0.0, self.settings.fall_off_angle, difference.abs());
        let mut step = difference.signum() * factor * dt * self.settings.turn_speed;

        if (difference < 0.0 && step < difference) || (difference > 0.0 && step > difference) {
            step = difference;
        }

        self.current_yaw += step;
        if self.current_yaw > 360.0 {
            self.current_yaw -= 360.0;
        }
        if self.current_yaw < -360.0 {
            self.current_yaw += 360.0;
        }

        Some(Quat::from_rotation_y(self.current_yaw.to_radians()))
    }
}

/// Late-cadence system driving every [`TurnController`].
pub fn turn_models(
    time: Res<Time>,
    q_walkers: Query<(&CharacterWalker, &Transform), Without<LocomotionHalted>>,
    mut q_models: Query<
        (&mut TurnController, &mut Transform),
        (Without<CharacterWalker>, Without<LocomotionHalted>),
    >,
) {
    let dt = time.delta_secs();

    for (mut turn, mut model) in &mut q_models {
        let Ok((walker, root)) = q_walkers.get(turn.target) else {
            continue;
        };

        let root_up = root.rotation * Vec3::Y;
        let model_forward = root.rotation * model.rotation * Vec3::NEG_Z;
        let velocity = turn.heading_source(walker);

        if let Some(rotation) = turn.late_tick(velocity, root_up, model_forward, dt) {
            model.rotation = rotation;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn forward(yaw: f32) -> Vec3 {
        Quat::from_rotation_y(yaw.to_radians()) * Vec3::NEG_Z
    }

    #[test]
    fn converges_on_velocity_direction() {
        let mut turn = TurnController::new(Entity::PLACEHOLDER, TurnSettings::default());
        for _ in 0..120 {
            let model_forward = forward(turn.yaw());
            turn.late_tick(Vec3::X * 5.0, Vec3::Y, model_forward, DT);
        }
        assert!((forward(turn.yaw()) - Vec3::X).length() < 0.01);
        assert!((turn.yaw() + 90.0).abs() < 0.5);
    }

    #[test]
    fn first_step_is_limited_by_turn_speed() {
        let settings = TurnSettings::default().with_turn_speed(600.0);
        let mut turn = TurnController::new(Entity::PLACEHOLDER, settings);
        turn.late_tick(Vec3::X, Vec3::Y, Vec3::NEG_Z, DT);
        // 90 degrees off: full speed, 600 * dt.
        assert!((turn.yaw() + 10.0).abs() < 0.01);
    }

    #[test]
    fn never_overshoots_target() {
        let settings = TurnSettings::default().with_turn_speed(1.0e6);
        let mut turn = TurnController::new(Entity::PLACEHOLDER, settings);
        let rotation = turn.late_tick(Vec3::X, Vec3::Y, Vec3::NEG_Z, DT).unwrap();
        assert!((turn.yaw() + 90.0).abs() < 0.01);
        assert!((rotation * Vec3::NEG_Z - Vec3::X).length() < 0.001);
    }

    #[test]
    fn vertical_or_tiny_velocity_keeps_heading() {
        let mut turn = TurnController::new(Entity::PLACEHOLDER, TurnSettings::default()).with_yaw(30.0);
        assert!(turn.late_tick(Vec3::Y * 10.0, Vec3::Y, forward(30.0), DT).is_none());
        assert!(turn.late_tick(Vec3::X * 0.0001, Vec3::Y, forward(30.0), DT).is_none());
        assert_eq!(turn.yaw(), 30.0);
    }

    #[test]
    fn yaw_wraps_past_full_turn() {
        let settings = TurnSettings::default().with_turn_speed(1.0e6);
        let mut turn = TurnController::new(Entity::PLACEHOLDER, settings).with_yaw(350.0);
        // Facing 350; target 20 degrees further left.
        turn.late_tick(forward(370.0), Vec3::Y, forward(350.0), DT);
        assert!((turn.yaw() - 10.0).abs() < 0.01);
    }

    #[test]
    fn heading_source_follows_settings() {
        use crate::config::ControllerSettings;
        use crate::controller::StepInput;
        use crate::frame::BodyFrame;
        use crate::intent::MovementIntent;
        use crate::kinematic::PlaneGround;
        use crate::sensor::GroundSensor;

        // Airborne with sideways momentum while steering along X.
        let settings = ControllerSettings::default();
        let mut walker = CharacterWalker::new(&settings);
        let mut sensor = GroundSensor::default();
        walker.add_momentum(Vec3::Z * 3.0, &BodyFrame::IDENTITY);
        let input = StepInput::new(BodyFrame::IDENTITY, DT).with_intent(&MovementIntent::toward(Vec3::X));
        walker.step(&settings, &mut sensor, &PlaneGround::new(), None, input);
        assert_ne!(walker.velocity(), walker.movement_velocity());

        let full = TurnController::new(Entity::PLACEHOLDER, TurnSettings::default());
        let input_only =
            TurnController::new(Entity::PLACEHOLDER, TurnSettings::default().ignoring_momentum());
        assert_eq!(full.heading_source(&walker), walker.velocity());
        assert_eq!(input_only.heading_source(&walker), walker.movement_velocity());
    }
}
