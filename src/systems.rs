//! Core controller systems.
//!
//! These systems run the fixed-step locomotion for every
//! [`CharacterWalker`]. They are generic over the physics backend, which
//! only has to provide ground readings, contact reports and a way to write
//! velocity.

use bevy::prelude::*;

use crate::backend::CharacterPhysicsBackend;
use crate::ceiling::{CeilingDetector, ContactReport};
use crate::config::ControllerSettings;
use crate::controller::{CharacterWalker, StepInput, StepReport};
use crate::error::ConfigError;
use crate::events::{LocomotionEvent, MomentumChange, MomentumCommand};
use crate::frame::BodyFrame;
use crate::intent::MovementIntent;
use crate::layers::{self, CollisionLayer, LayerCollisionMatrix};
use crate::sensor::GroundSensor;
use crate::state::{Airborne, ControllerState, Grounded, LocomotionHalted, Sliding};
use crate::turn::TurnController;

/// Halt controllers whose configuration cannot be simulated.
pub fn validate_new_controllers(
    mut commands: Commands,
    q_walkers: Query<
        (
            Entity,
            &ControllerSettings,
            &GroundSensor,
            Option<&CeilingDetector>,
        ),
        (Added<CharacterWalker>, Without<LocomotionHalted>),
    >,
    q_turns: Query<(Entity, &TurnController), (Added<TurnController>, Without<LocomotionHalted>)>,
) {
    for (entity, settings, sensor, ceiling) in &q_walkers {
        let result = settings
            .validate()
            .and_then(|()| sensor.config.validate())
            .and_then(|()| ceiling.map_or(Ok(()), |c| c.settings.validate()));
        if let Err(err) = result {
            halt(&mut commands, entity, &err);
        }
    }

    for (entity, turn) in &q_turns {
        if let Err(err) = turn.settings.validate() {
            halt(&mut commands, entity, &err);
        }
    }
}

fn halt(commands: &mut Commands, entity: Entity, err: &ConfigError) {
    error!("Invalid controller configuration on {entity}: {err}; halting locomotion");
    commands.entity(entity).insert(LocomotionHalted);
}

/// Apply queued [`MomentumCommand`]s before the step that consumes them.
pub fn apply_momentum_commands(
    mut momentum_commands: EventReader<MomentumCommand>,
    mut q_walkers: Query<(&mut CharacterWalker, &Transform), Without<LocomotionHalted>>,
) {
    for command in momentum_commands.read() {
        let Ok((mut walker, transform)) = q_walkers.get_mut(command.entity) else {
            continue;
        };
        let frame = BodyFrame::from(transform);
        match command.change {
            MomentumChange::Add(momentum) => walker.add_momentum(momentum, &frame),
            MomentumChange::Set(momentum) => walker.set_momentum(momentum, &frame),
        }
    }
}

/// Rebuild sensor layer masks when a body changes layer or the collision
/// matrix changes.
pub fn refresh_sensor_layers(
    matrix: Res<LayerCollisionMatrix>,
    mut q_sensors: Query<(Option<&CollisionLayer>, &mut GroundSensor), Without<LocomotionHalted>>,
) {
    for (layer, mut sensor) in &mut q_sensors {
        if matrix.is_changed() {
            sensor.invalidate_layer_mask();
        }
        let layer = layer.map_or(layers::DEFAULT_LAYER, |l| l.0);
        sensor.refresh_layer_mask(layer, &matrix);
    }
}

/// Feed this step's contacts to the ceiling detectors.
pub fn register_ceiling_contacts(
    mut q_detectors: Query<
        (&Transform, &ContactReport, &mut CeilingDetector),
        Without<LocomotionHalted>,
    >,
) {
    for (transform, report, mut ceiling) in &mut q_detectors {
        if report.is_empty() {
            continue;
        }
        ceiling.register_report(report, transform.rotation * Vec3::Y);
    }
}

/// Run one fixed step for every controller and hand the velocity to the
/// backend.
pub fn step_controllers<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);

    let reports: Vec<(Entity, StepReport)> = world
        .query_filtered::<(
            Entity,
            &mut CharacterWalker,
            &ControllerSettings,
            &mut GroundSensor,
            Option<&CeilingDetector>,
            &MovementIntent,
            &Transform,
        ), Without<LocomotionHalted>>()
        .iter_mut(world)
        .map(|(entity, mut walker, settings, mut sensor, ceiling, intent, transform)| {
            let input = StepInput::new(BodyFrame::from(transform), dt).with_intent(intent);
            (entity, walker.fixed_tick(settings, &mut sensor, ceiling, input))
        })
        .collect();

    for (entity, report) in reports {
        B::set_velocity(world, entity, report.velocity);
        for kind in report.events {
            world.send_event(LocomotionEvent { entity, kind });
        }
    }
}

/// Sync state marker components with the controller state.
pub fn sync_state_markers(
    mut commands: Commands,
    q_walkers: Query<
        (
            Entity,
            &CharacterWalker,
            Has<Grounded>,
            Has<Airborne>,
            Has<Sliding>,
        ),
        Without<LocomotionHalted>,
    >,
) {
    for (entity, walker, has_grounded, has_airborne, has_sliding) in &q_walkers {
        let state = walker.state();
        let grounded = state == ControllerState::Grounded;
        let sliding = state == ControllerState::Sliding;
        let airborne = !walker.is_grounded();

        let mut entity = commands.entity(entity);
        match (grounded, has_grounded) {
            (true, false) => {
                entity.insert(Grounded);
            }
            (false, true) => {
                entity.remove::<Grounded>();
            }
            _ => {}
        }
        match (sliding, has_sliding) {
            (true, false) => {
                entity.insert(Sliding);
            }
            (false, true) => {
                entity.remove::<Sliding>();
            }
            _ => {}
        }
        match (airborne, has_airborne) {
            (true, false) => {
                entity.insert(Airborne);
            }
            (false, true) => {
                entity.remove::<Airborne>();
            }
            _ => {}
        }
    }
}

/// Ceiling hits live for one step; contact reports are refilled every step.
pub fn reset_step_contacts(
    mut q_ceilings: Query<&mut CeilingDetector>,
    mut q_reports: Query<&mut ContactReport>,
) {
    for mut ceiling in &mut q_ceilings {
        if ceiling.hit_ceiling() {
            ceiling.reset_flags();
        }
    }
    for mut report in &mut q_reports {
        if !report.is_empty() {
            report.clear();
        }
    }
}
