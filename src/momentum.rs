//! Momentum accumulator.
//!
//! Momentum carries gravity, inertia and external impulses across fixed
//! steps. It can be stored in the body's local frame so it rotates with the
//! body; callers always exchange world-space vectors and never see the
//! stored frame.

use bevy::prelude::*;

use crate::frame::BodyFrame;
use crate::math;

/// Vertical momentum below this magnitude counts as at rest.
pub const RISING_OR_FALLING_THRESHOLD: f32 = 0.001;

#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct Momentum {
    value: Vec3,
    local: bool,
}

impl Momentum {
    /// Empty momentum stored in world (`local = false`) or body space.
    pub fn new(local: bool) -> Self {
        Self {
            value: Vec3::ZERO,
            local,
        }
    }

    #[inline]
    pub fn is_local(&self) -> bool {
        self.local
    }

    /// World-space momentum.
    pub fn get(&self, frame: &BodyFrame) -> Vec3 {
        if self.local {
            frame.to_world(self.value)
        } else {
            self.value
        }
    }

    /// Replace the momentum with a world-space vector.
    pub fn set(&mut self, world: Vec3, frame: &BodyFrame) {
        self.value = if self.local {
            frame.to_local(world)
        } else {
            world
        };
    }

    /// Add a world-space vector.
    pub fn add(&mut self, world: Vec3, frame: &BodyFrame) {
        let sum = self.get(frame) + world;
        self.set(sum, frame);
    }

    /// Switch the storage frame, keeping the world-space value.
    pub fn set_local(&mut self, local: bool, frame: &BodyFrame) {
        if self.local == local {
            return;
        }
        let world = self.get(frame);
        self.local = local;
        self.set(world, frame);
    }

    /// Vertical momentum exceeds the rest threshold in either direction.
    pub fn is_rising_or_falling(&self, frame: &BodyFrame) -> bool {
        math::extract_dot_vector(self.get(frame), frame.up()).length() > RISING_OR_FALLING_THRESHOLD
    }

    /// Vertical momentum exceeds the rest threshold and points up.
    pub fn is_rising(&self, frame: &BodyFrame) -> bool {
        self.is_rising_or_falling(frame) && self.get(frame).dot(frame.up()) > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tilted() -> BodyFrame {
        BodyFrame::at(Vec3::new(3.0, 0.0, -2.0))
            .with_rotation(Quat::from_euler(EulerRot::YXZ, 1.1, 0.3, -0.25))
            .with_scale(Vec3::new(1.5, 2.0, 0.5))
    }

    #[test]
    fn set_get_round_trip_in_both_frames() {
        let frame = tilted();
        let samples = [
            Vec3::ZERO,
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(-40.0, 0.01, 7.5),
            Vec3::new(1e3, -1e3, 0.5),
        ];
        for local in [false, true] {
            let mut momentum = Momentum::new(local);
            for v in samples {
                momentum.set(v, &frame);
                let tolerance = 1e-4 * v.length().max(1.0);
                assert!(
                    (momentum.get(&frame) - v).length() < tolerance,
                    "local={local} v={v}"
                );
            }
        }
    }

    #[test]
    fn add_accumulates_world_vectors() {
        let frame = tilted();
        let mut momentum = Momentum::new(true);
        momentum.add(Vec3::X, &frame);
        momentum.add(Vec3::Y * 2.0, &frame);
        assert!((momentum.get(&frame) - Vec3::new(1.0, 2.0, 0.0)).length() < 0.001);
    }

    #[test]
    fn local_momentum_turns_with_body() {
        let mut momentum = Momentum::new(true);
        momentum.set(Vec3::NEG_Z * 5.0, &BodyFrame::IDENTITY);

        let turned = BodyFrame::IDENTITY.with_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        assert!((momentum.get(&turned) - turned.forward() * 5.0).length() < 0.001);
    }

    #[test]
    fn switching_frame_keeps_world_value() {
        let frame = tilted();
        let mut momentum = Momentum::new(false);
        momentum.set(Vec3::new(2.0, -1.0, 4.0), &frame);
        momentum.set_local(true, &frame);
        assert!(momentum.is_local());
        assert!((momentum.get(&frame) - Vec3::new(2.0, -1.0, 4.0)).length() < 0.001);
    }

    #[test]
    fn rising_needs_upward_vertical_component() {
        let frame = BodyFrame::IDENTITY;
        let mut momentum = Momentum::new(false);

        momentum.set(Vec3::new(10.0, 0.0005, 0.0), &frame);
        assert!(!momentum.is_rising_or_falling(&frame));
        assert!(!momentum.is_rising(&frame));

        momentum.set(Vec3::new(0.0, -3.0, 0.0), &frame);
        assert!(momentum.is_rising_or_falling(&frame));
        assert!(!momentum.is_rising(&frame));

        momentum.set(Vec3::new(0.0, 3.0, 0.0), &frame);
        assert!(momentum.is_rising(&frame));
    }
}
