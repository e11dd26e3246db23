//! Vector helpers shared by the sensor, integrator and turn controller.
//!
//! Angles returned from this module are in degrees, matching the units used
//! by [`ControllerSettings`](crate::config::ControllerSettings).

use bevy::prelude::*;

/// Component of `vector` along `direction`.
///
/// `direction` does not need to be normalized. Returns zero for a zero direction.
#[inline]
pub fn extract_dot_vector(vector: Vec3, direction: Vec3) -> Vec3 {
    let direction = direction.normalize_or_zero();
    direction * vector.dot(direction)
}

/// `vector` with its component along `direction` removed.
#[inline]
pub fn remove_dot_vector(vector: Vec3, direction: Vec3) -> Vec3 {
    vector - extract_dot_vector(vector, direction)
}

/// Projects `vector` onto the plane with the given normal.
#[inline]
pub fn project_on_plane(vector: Vec3, normal: Vec3) -> Vec3 {
    remove_dot_vector(vector, normal)
}

/// Projects `vector` onto the line spanned by `onto`. Zero if `onto` is zero.
#[inline]
pub fn project(vector: Vec3, onto: Vec3) -> Vec3 {
    extract_dot_vector(vector, onto)
}

/// Unsigned angle in degrees. Zero if either vector has no length.
pub fn angle_between(a: Vec3, b: Vec3) -> f32 {
    let denominator = (a.length_squared() * b.length_squared()).sqrt();
    if denominator < 1e-15 {
        return 0.0;
    }
    let cos = (a.dot(b) / denominator).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Signed angle in degrees from `from` to `to`, measured around `axis`.
pub fn signed_angle(from: Vec3, to: Vec3, axis: Vec3) -> f32 {
    let angle = angle_between(from, to);
    if axis.dot(from.cross(to)) < 0.0 {
        -angle
    } else {
        angle
    }
}

/// Moves `current` toward `target` by at most `max_delta`, never overshooting.
pub fn move_towards(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let to_target = target - current;
    let distance = to_target.length();
    if distance <= max_delta || distance == 0.0 {
        return target;
    }
    current + to_target / distance * max_delta
}

/// `move_towards` driven by a rate and a timestep.
#[inline]
pub fn increment_toward(current: Vec3, rate: f32, dt: f32, target: Vec3) -> Vec3 {
    move_towards(current, target, rate * dt)
}

/// Position of `value` between `a` and `b`, clamped to `[0, 1]`.
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if (b - a).abs() < f32::EPSILON {
        return if value >= b { 1.0 } else { 0.0 };
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}
