//! The body's local coordinate frame.
//!
//! Every vector decomposition the controller makes uses the body's current
//! `up` axis, so characters can walk on rotated gravity frames. The frame is
//! rebuilt from the body's [`Transform`] at the start of every fixed step.

use bevy::prelude::*;

/// Snapshot of a body's position, rotation and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyFrame {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for BodyFrame {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<&Transform> for BodyFrame {
    fn from(transform: &Transform) -> Self {
        Self {
            position: transform.translation,
            rotation: transform.rotation,
            scale: transform.scale,
        }
    }
}

impl BodyFrame {
    /// World-aligned frame at the origin.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// World-aligned frame at `position`.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Replace the rotation.
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Replace the scale.
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    #[inline]
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    #[inline]
    pub fn down(&self) -> Vec3 {
        -self.up()
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Convert a body-local direction to world space, including scale.
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.rotation * (self.scale * local)
    }

    /// Convert a world-space direction into the body's local space.
    ///
    /// Axes with zero scale collapse to zero instead of producing infinities.
    pub fn to_local(&self, world: Vec3) -> Vec3 {
        let unrotated = self.rotation.inverse() * world;
        Vec3::new(
            safe_div(unrotated.x, self.scale.x),
            safe_div(unrotated.y, self.scale.y),
            safe_div(unrotated.z, self.scale.z),
        )
    }

    /// Convert a body-local point to a world position.
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.to_world(local)
    }
}

fn safe_div(value: f32, by: f32) -> f32 {
    if by == 0.0 {
        0.0
    } else {
        value / by
    }
}
