//! Physics backend abstraction.
//!
//! The controller never moves bodies itself: it computes a velocity each
//! fixed step and hands it to the backend. Backends also register the systems
//! that fill [`GroundSensor`](crate::sensor::GroundSensor) readings and
//! [`ContactReport`](crate::ceiling::ContactReport)s in
//! [`ControllerSet::Sensors`](crate::ControllerSet::Sensors).

use bevy::prelude::*;

/// Trait for physics backend implementations.
///
/// Methods take the whole [`World`] so the locomotion system can run as an
/// exclusive system and stay agnostic of the backend's components.
///
/// See [`KinematicBackend`](crate::kinematic::KinematicBackend) for the
/// built-in implementation.
pub trait CharacterPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Get the current linear velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the linear velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32 {
        fixed_delta(world.get_resource::<Time<Fixed>>())
    }
}

/// Fixed-step delta, falling back to 60 Hz before the first fixed step has
/// run (or when the schedule is driven by hand).
pub(crate) fn fixed_delta(time: Option<&Time<Fixed>>) -> f32 {
    time.map(|t| t.delta_secs())
        .filter(|&d| d > 0.0)
        .unwrap_or(1.0 / 60.0)
}
