//! Per-step momentum integration.
//!
//! Pure function of the previous momentum, the state picked for this step and
//! the player's movement input. All decompositions use the body's `up`.

use bevy::prelude::*;

use crate::config::ControllerSettings;
use crate::math;
use crate::state::ControllerState;

/// Horizontal input influence when momentum already exceeds movement speed.
const WEIGHTED_AIR_CONTROL: f32 = 0.25;

/// Inputs for one integration step. Vectors are in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegratorInput {
    pub state: ControllerState,
    pub momentum: Vec3,
    /// Input direction times movement speed.
    pub movement_velocity: Vec3,
    pub up: Vec3,
    /// Latest ground normal; only read while sliding.
    pub ground_normal: Vec3,
    pub dt: f32,
}

/// Advance momentum by one fixed step.
pub fn integrate_momentum(settings: &ControllerSettings, input: &IntegratorInput) -> Vec3 {
    let IntegratorInput {
        state,
        momentum,
        movement_velocity,
        up,
        ground_normal,
        dt,
    } = *input;

    let mut vertical = math::extract_dot_vector(momentum, up);
    let mut horizontal = momentum - vertical;

    vertical -= up * settings.gravity * dt;

    if state == ControllerState::Grounded && vertical.dot(up) < 0.0 {
        vertical = Vec3::ZERO;
    }

    if !state.is_grounded() {
        horizontal = steer_in_air(settings, horizontal, movement_velocity, dt);
    }

    if state == ControllerState::Sliding {
        let away_from_slope = math::project_on_plane(ground_normal, up).normalize_or_zero();
        let steering = math::remove_dot_vector(movement_velocity, away_from_slope);
        horizontal += steering * dt;
    }

    let friction = if state == ControllerState::Grounded {
        settings.ground_friction
    } else {
        settings.air_friction
    };
    horizontal = math::increment_toward(horizontal, friction, dt, Vec3::ZERO);

    let mut momentum = horizontal + vertical;

    if state == ControllerState::Sliding {
        momentum = math::project_on_plane(momentum, ground_normal);
        if momentum.dot(up) > 0.0 {
            momentum = math::remove_dot_vector(momentum, up);
        }
        let downhill = math::project_on_plane(-up, ground_normal).normalize_or_zero();
        momentum += downhill * settings.slide_gravity * dt;
    }

    if state == ControllerState::Jumping {
        momentum = math::remove_dot_vector(momentum, up);
        momentum += up * settings.jump_speed;
    }

    momentum
}

fn steer_in_air(
    settings: &ControllerSettings,
    horizontal: Vec3,
    movement_velocity: Vec3,
    dt: f32,
) -> Vec3 {
    if horizontal.length() > settings.movement_speed {
        // Already faster than walking: input may steer but never add speed
        // along the current momentum.
        let direction = horizontal.normalize_or_zero();
        let mut steering = movement_velocity;
        if steering.dot(direction) > 0.0 {
            steering = math::remove_dot_vector(steering, direction);
        }
        horizontal + steering * dt * settings.air_control_rate * WEIGHTED_AIR_CONTROL
    } else {
        (horizontal + movement_velocity * dt * settings.air_control_rate)
            .clamp_length_max(settings.movement_speed)
    }
}
