//! # `walker_controller`
//!
//! A sensor-driven kinematic 3D character controller for Bevy, with a physics
//! backend abstraction.
//!
//! This crate provides a walker that:
//! - Probes the ground below the body with a ray, a sphere or an array of rays
//! - Runs a five-state locomotion machine (grounded, falling, rising, sliding, jumping)
//! - Integrates gravity, friction, air control, slope sliding and jumps into momentum
//! - Hands a single velocity per fixed step to the physics body
//! - Turns a visual model toward the direction of travel
//!
//! ## Architecture
//!
//! Each fixed step:
//! 1. The backend refreshes every [`GroundSensor`](sensor::GroundSensor) and
//!    fills [`ContactReport`](ceiling::ContactReport)s
//! 2. [`CharacterWalker::fixed_tick`](controller::CharacterWalker::fixed_tick)
//!    picks the next state, integrates momentum and handles jumping
//! 3. The resulting velocity (input + momentum + ground adjustment) is written
//!    to the body through [`CharacterPhysicsBackend`](backend::CharacterPhysicsBackend)
//!
//! Model turning runs in `PostUpdate` and the animation read-out in `Update`,
//! both reading values cached by the last fixed step.
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use walker_controller::prelude::*;
//!
//! let walker = WalkerBundle::try_new(ControllerSettings::player(), SensorConfig::default())
//!     .expect("default settings are valid");
//! assert_eq!(walker.walker.state(), ControllerState::Falling);
//!
//! // Spawn `walker` together with a `Transform` and the backend's body components.
//! ```

use bevy::prelude::*;

pub mod backend;
pub mod ceiling;
pub mod collision;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod frame;
pub mod integrator;
pub mod intent;
pub mod kinematic;
pub mod layers;
pub mod math;
pub mod momentum;
pub mod readout;
pub mod sensor;
pub mod state;
pub mod systems;
pub mod turn;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::backend::CharacterPhysicsBackend;
    pub use crate::ceiling::{CeilingDetector, ContactReport};
    pub use crate::config::{
        CastType, CeilingDetectionMethod, CeilingSettings, ColliderShape, ControllerSettings,
        SensorConfig, TurnSettings,
    };
    pub use crate::controller::{CharacterWalker, StepInput, StepReport, WalkerBundle};
    pub use crate::error::ConfigError;
    pub use crate::events::{ControllerEvent, LocomotionEvent, MomentumCommand};
    pub use crate::frame::BodyFrame;
    pub use crate::intent::MovementIntent;
    pub use crate::kinematic::{BodyVelocity, GroundPlane, KinematicBackend, PlaneGround};
    pub use crate::layers::{CollisionLayer, LayerCollisionMatrix};
    pub use crate::readout::LocomotionReadout;
    pub use crate::sensor::{GroundCaster, GroundSensor, SensorReading};
    pub use crate::state::{Airborne, ControllerState, Grounded, LocomotionHalted, Sliding};
    pub use crate::turn::TurnController;
    pub use crate::{CharacterControllerPlugin, ControllerSet};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::{Rapier3dBackend, RapierWalkerBundle};
}

/// Ordered phases of the fixed step.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerSet {
    /// Validation, layer masks and queued momentum commands.
    Preparation,
    /// Backend ground probes and contact collection.
    Sensors,
    /// State machine, momentum integration and velocity output.
    Locomotion,
    /// Backend body integration.
    Integration,
    /// State markers and per-step flag resets.
    Cleanup,
}

/// Main plugin for the character controller system.
///
/// This plugin is generic over a physics backend `B` which provides ground
/// probing and velocity output.
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., [`KinematicBackend`](kinematic::KinematicBackend))
///
/// # Examples
///
/// ```rust,no_run
/// use bevy::prelude::*;
/// use walker_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .insert_resource(PlaneGround::flat(0.0))
///     .add_plugins(CharacterControllerPlugin::<KinematicBackend>::default())
///     .run();
/// ```
pub struct CharacterControllerPlugin<B: backend::CharacterPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::CharacterPhysicsBackend> Default for CharacterControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::CharacterPhysicsBackend> Plugin for CharacterControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<controller::CharacterWalker>();
        app.register_type::<config::ControllerSettings>();
        app.register_type::<config::CeilingSettings>();
        app.register_type::<config::TurnSettings>();
        app.register_type::<config::SensorConfig>();
        app.register_type::<sensor::GroundSensor>();
        app.register_type::<ceiling::CeilingDetector>();
        app.register_type::<intent::MovementIntent>();
        app.register_type::<turn::TurnController>();
        app.register_type::<readout::LocomotionReadout>();
        app.register_type::<layers::CollisionLayer>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<state::Sliding>();
        app.register_type::<state::LocomotionHalted>();

        app.add_event::<events::LocomotionEvent>();
        app.add_event::<events::MomentumCommand>();
        app.init_resource::<layers::LayerCollisionMatrix>();

        app.configure_sets(
            FixedUpdate,
            (
                ControllerSet::Preparation,
                ControllerSet::Sensors,
                ControllerSet::Locomotion,
                ControllerSet::Integration,
                ControllerSet::Cleanup,
            )
                .chain(),
        );

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.add_systems(
            FixedUpdate,
            (
                systems::validate_new_controllers,
                systems::refresh_sensor_layers,
                systems::apply_momentum_commands,
            )
                .chain()
                .in_set(ControllerSet::Preparation),
        );
        app.add_systems(
            FixedUpdate,
            (
                systems::register_ceiling_contacts,
                systems::step_controllers::<B>,
            )
                .chain()
                .in_set(ControllerSet::Locomotion),
        );
        app.add_systems(
            FixedUpdate,
            (systems::sync_state_markers, systems::reset_step_contacts)
                .in_set(ControllerSet::Cleanup),
        );

        // Late tick: orient models after this frame's fixed steps.
        app.add_systems(
            PostUpdate,
            turn::turn_models.before(bevy::transform::TransformSystem::TransformPropagate),
        );

        app.add_systems(Update, readout::update_readouts);
    }
}
