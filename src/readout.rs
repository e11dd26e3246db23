//! Per-frame locomotion snapshot for animation and UI consumers.

use bevy::prelude::*;

use crate::controller::CharacterWalker;
use crate::state::{ControllerState, LocomotionHalted};

/// Refreshed every frame in `Update` from the controller's cached values.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct LocomotionReadout {
    /// Velocity divided by movement speed.
    pub normal_velocity: Vec3,
    pub is_idle: bool,
    pub is_grounded: bool,
    pub is_sliding: bool,
    pub state: ControllerState,
}

impl LocomotionReadout {
    pub fn from_walker(walker: &CharacterWalker) -> Self {
        let normal_velocity = walker.normal_velocity();
        Self {
            normal_velocity,
            is_idle: normal_velocity == Vec3::ZERO,
            is_grounded: walker.is_grounded(),
            is_sliding: walker.is_sliding(),
            state: walker.state(),
        }
    }

    /// Planar speed as a fraction of movement speed.
    pub fn planar_speed(&self, up: Vec3) -> f32 {
        (self.normal_velocity - up * self.normal_velocity.dot(up)).length()
    }
}

pub fn update_readouts(
    mut q_readouts: Query<(&CharacterWalker, &mut LocomotionReadout), Without<LocomotionHalted>>,
) {
    for (walker, mut readout) in &mut q_readouts {
        readout.set_if_neq(LocomotionReadout::from_walker(walker));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_walker_reads_idle_and_falling() {
        let readout = LocomotionReadout::from_walker(&CharacterWalker::default());
        assert!(readout.is_idle);
        assert!(!readout.is_grounded);
        assert_eq!(readout.state, ControllerState::Falling);
    }

    #[test]
    fn planar_speed_ignores_vertical() {
        let readout = LocomotionReadout {
            normal_velocity: Vec3::new(0.6, -3.0, 0.8),
            ..default()
        };
        assert!((readout.planar_speed(Vec3::Y) - 1.0).abs() < 0.0001);
    }
}
