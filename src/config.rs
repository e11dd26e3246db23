//! Controller configuration components.
//!
//! Settings are supplied when a controller is spawned and treated as read-only
//! by the fixed step. Each settings type has a `validate` method; invalid
//! settings are rejected at construction (see
//! [`WalkerBundle::try_new`](crate::controller::WalkerBundle::try_new)) or halt
//! the controller when inserted directly.

use bevy::prelude::*;

use crate::error::{self, ConfigError};

/// Locomotion tuning for a [`CharacterWalker`](crate::controller::CharacterWalker).
///
/// Speeds are in units/second, rates in units/second², angles in degrees.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct ControllerSettings {
    // === Movement ===
    /// Grounded movement speed at full input.
    pub movement_speed: f32,
    /// How fast input steers horizontal momentum while airborne.
    pub air_control_rate: f32,

    // === Jumping ===
    /// Vertical speed held while the jump is active.
    pub jump_speed: f32,
    /// How long (seconds) the jump speed is held before the controller starts rising freely.
    pub jump_duration: f32,

    // === Friction ===
    /// Horizontal momentum decay rate while airborne or sliding.
    pub air_friction: f32,
    /// Horizontal momentum decay rate while grounded.
    pub ground_friction: f32,

    // === Gravity ===
    /// Downward acceleration along the body's up axis.
    pub gravity: f32,
    /// Extra acceleration down the slope while sliding.
    pub slide_gravity: f32,
    /// Steepest walkable ground, measured between the ground normal and up.
    pub slope_limit: f32,

    /// Store momentum in the body's local frame so it turns with the body.
    pub use_local_momentum: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            movement_speed: 7.0,
            air_control_rate: 2.0,
            jump_speed: 10.0,
            jump_duration: 0.2,
            air_friction: 0.5,
            ground_friction: 100.0,
            gravity: 30.0,
            slide_gravity: 5.0,
            slope_limit: 80.0,
            use_local_momentum: false,
        }
    }
}

impl ControllerSettings {
    /// Settings tuned for a responsive player character.
    pub fn player() -> Self {
        Self {
            air_control_rate: 4.0,
            jump_speed: 12.0,
            ..default()
        }
    }

    /// Slower, heavier settings for non-player characters.
    pub fn npc() -> Self {
        Self {
            movement_speed: 4.0,
            air_control_rate: 1.0,
            jump_speed: 8.0,
            slope_limit: 60.0,
            ..default()
        }
    }

    /// Set the grounded movement speed.
    pub fn with_movement_speed(mut self, speed: f32) -> Self {
        self.movement_speed = speed;
        self
    }

    /// Set the airborne steering rate.
    pub fn with_air_control_rate(mut self, rate: f32) -> Self {
        self.air_control_rate = rate;
        self
    }

    /// Set jump speed and how long it is held.
    pub fn with_jump(mut self, speed: f32, duration: f32) -> Self {
        self.jump_speed = speed;
        self.jump_duration = duration;
        self
    }

    /// Set ground and air friction.
    pub fn with_friction(mut self, ground: f32, air: f32) -> Self {
        self.ground_friction = ground;
        self.air_friction = air;
        self
    }

    /// Set gravity.
    pub fn with_gravity(mut self, gravity: f32) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set slide gravity.
    pub fn with_slide_gravity(mut self, slide_gravity: f32) -> Self {
        self.slide_gravity = slide_gravity;
        self
    }

    /// Set the slope limit (degrees).
    pub fn with_slope_limit(mut self, degrees: f32) -> Self {
        self.slope_limit = degrees;
        self
    }

    /// Store momentum relative to the body.
    pub fn with_local_momentum(mut self, local: bool) -> Self {
        self.use_local_momentum = local;
        self
    }

    /// Check that every field can be simulated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        error::positive("movement_speed", self.movement_speed)?;
        error::non_negative("air_control_rate", self.air_control_rate)?;
        error::non_negative("jump_speed", self.jump_speed)?;
        error::non_negative("jump_duration", self.jump_duration)?;
        error::non_negative("air_friction", self.air_friction)?;
        error::non_negative("ground_friction", self.ground_friction)?;
        error::non_negative("gravity", self.gravity)?;
        error::non_negative("slide_gravity", self.slide_gravity)?;
        error::in_range("slope_limit", self.slope_limit, 0.0, 90.0)?;
        Ok(())
    }
}

/// How collision contacts are aggregated into a ceiling hit.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CeilingDetectionMethod {
    /// Only the first contact of the collision is checked.
    #[default]
    FirstContact,
    /// Any qualifying contact registers a hit.
    AllContacts,
    /// The mean contact angle must qualify.
    AverageOfAllContacts,
}

/// Ceiling detection tuning.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct CeilingSettings {
    /// Largest angle (degrees) between a contact normal and `-up` that still counts as ceiling.
    pub angle_limit: f32,
    pub method: CeilingDetectionMethod,
}

impl Default for CeilingSettings {
    fn default() -> Self {
        Self {
            angle_limit: 10.0,
            method: CeilingDetectionMethod::FirstContact,
        }
    }
}

impl CeilingSettings {
    pub fn with_angle_limit(mut self, degrees: f32) -> Self {
        self.angle_limit = degrees;
        self
    }

    pub fn with_method(mut self, method: CeilingDetectionMethod) -> Self {
        self.method = method;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        error::in_range("ceiling.angle_limit", self.angle_limit, 0.0, 180.0)?;
        Ok(())
    }
}

/// Orientation smoothing for a [`TurnController`](crate::turn::TurnController).
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct TurnSettings {
    /// Maximum turn rate in degrees/second.
    pub turn_speed: f32,
    /// Below this angle (degrees) to the target, turning slows down linearly.
    pub fall_off_angle: f32,
    /// Face the input direction instead of the full velocity (momentum included).
    pub ignore_controller_momentum: bool,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            turn_speed: 1500.0,
            fall_off_angle: 90.0,
            ignore_controller_momentum: false,
        }
    }
}

impl TurnSettings {
    pub fn with_turn_speed(mut self, degrees_per_second: f32) -> Self {
        self.turn_speed = degrees_per_second;
        self
    }

    pub fn with_fall_off_angle(mut self, degrees: f32) -> Self {
        self.fall_off_angle = degrees;
        self
    }

    pub fn ignoring_momentum(mut self) -> Self {
        self.ignore_controller_momentum = true;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        error::non_negative("turn.turn_speed", self.turn_speed)?;
        error::in_range("turn.fall_off_angle", self.fall_off_angle, 0.0, 180.0)?;
        Ok(())
    }
}

/// How the ground sensor probes the environment.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CastType {
    /// A single ray from the collider center.
    #[default]
    Raycast,
    /// Concentric rings of parallel rays, averaged.
    RaycastArray,
    /// A sphere swept down from the collider center.
    Spherecast,
}

/// Shape of the body collider the sensor is sized against.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColliderShape {
    #[default]
    Capsule,
    Box,
    Sphere,
}

/// Collider geometry and ground cast settings.
///
/// The collider is shortened from below by `step_height_ratio`; the freed
/// space is what the sensor bridges when stepping onto ledges and slopes.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct SensorConfig {
    pub cast_type: CastType,
    pub shape: ColliderShape,
    /// Full standing height of the character.
    pub collider_height: f32,
    /// Diameter of the collider.
    pub collider_thickness: f32,
    /// Collider offset as a fraction of `collider_height`.
    pub collider_offset: Vec3,
    /// Share of the height reserved for stepping, `0..=1`.
    pub step_height_ratio: f32,
    /// Number of rings in [`CastType::RaycastArray`] mode.
    pub array_rows: usize,
    /// Rays on the innermost ring; ring `i` carries `array_ray_count * (i + 1)`.
    pub array_ray_count: usize,
    /// Rotate every other ring by half a step.
    pub array_rows_offset: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            cast_type: CastType::Raycast,
            shape: ColliderShape::Capsule,
            collider_height: 2.0,
            collider_thickness: 1.0,
            // Body origin at the feet.
            collider_offset: Vec3::new(0.0, 0.5, 0.0),
            step_height_ratio: 0.25,
            array_rows: 1,
            array_ray_count: 6,
            array_rows_offset: false,
        }
    }
}

impl SensorConfig {
    pub fn with_cast_type(mut self, cast_type: CastType) -> Self {
        self.cast_type = cast_type;
        self
    }

    pub fn with_shape(mut self, shape: ColliderShape) -> Self {
        self.shape = shape;
        self
    }

    /// Set collider height and thickness.
    pub fn with_dimensions(mut self, height: f32, thickness: f32) -> Self {
        self.collider_height = height;
        self.collider_thickness = thickness;
        self
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.collider_offset = offset;
        self
    }

    pub fn with_step_height_ratio(mut self, ratio: f32) -> Self {
        self.step_height_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// Configure the ray array (rows, rays on the first row, offset rows).
    pub fn with_array(mut self, rows: usize, ray_count: usize, offset_rows: bool) -> Self {
        self.array_rows = rows;
        self.array_ray_count = ray_count;
        self.array_rows_offset = offset_rows;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        error::positive("sensor.collider_height", self.collider_height)?;
        error::positive("sensor.collider_thickness", self.collider_thickness)?;
        error::in_range("sensor.step_height_ratio", self.step_height_ratio, 0.0, 1.0)?;
        error::finite("sensor.collider_offset.x", self.collider_offset.x)?;
        error::finite("sensor.collider_offset.y", self.collider_offset.y)?;
        error::finite("sensor.collider_offset.z", self.collider_offset.z)?;
        error::count_in_range("sensor.array_rows", self.array_rows, 1, 5)?;
        error::count_in_range("sensor.array_ray_count", self.array_ray_count, 3, 10)?;
        Ok(())
    }
}
