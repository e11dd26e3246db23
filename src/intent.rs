//! Movement intent component.
//!
//! Intents represent the desired movement from player input or AI. The fixed
//! step reads the intent; nothing in the controller writes to it.

use bevy::prelude::*;

/// Desired world-space movement direction and jump button state.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use walker_controller::prelude::*;
///
/// let mut intent = MovementIntent::new();
/// intent.set_direction(Vec3::new(3.0, 0.0, 4.0));
/// assert!((intent.direction().length() - 1.0).abs() < 0.001);
///
/// intent.set_jump_pressed(true);
/// assert!(intent.jump_pressed());
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct MovementIntent {
    /// World-relative movement direction, length at most 1.
    direction: Vec3,
    /// Whether the jump button is held.
    ///
    /// Holding the button jumps once; it must be released before the next
    /// jump can start.
    jump_pressed: bool,
}

impl MovementIntent {
    /// Create a new empty movement intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intent moving in `direction` (clamped to length 1).
    pub fn toward(direction: Vec3) -> Self {
        let mut intent = Self::default();
        intent.set_direction(direction);
        intent
    }

    /// Set the movement direction. Longer vectors are shortened to length 1;
    /// non-finite input clears the direction.
    pub fn set_direction(&mut self, direction: Vec3) {
        self.direction = if direction.is_finite() {
            direction.clamp_length_max(1.0)
        } else {
            Vec3::ZERO
        };
    }

    /// Set the direction from two input axes on the world ground plane.
    ///
    /// `horizontal` maps to +X, `vertical` to forward (-Z).
    pub fn set_axes(&mut self, horizontal: f32, vertical: f32) {
        self.set_direction(Vec3::new(horizontal, 0.0, -vertical));
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Check if there is active movement input.
    pub fn is_moving(&self) -> bool {
        self.direction.length_squared() > 1e-6
    }

    /// Clear the movement direction.
    pub fn clear(&mut self) {
        self.direction = Vec3::ZERO;
    }

    /// Set whether the jump button is held.
    ///
    /// ```rust,ignore
    /// intent.set_jump_pressed(keyboard.pressed(KeyCode::Space));
    /// ```
    pub fn set_jump_pressed(&mut self, pressed: bool) {
        self.jump_pressed = pressed;
    }

    #[inline]
    pub fn jump_pressed(&self) -> bool {
        self.jump_pressed
    }
}
