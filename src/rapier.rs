//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature.

use bevy::prelude::*;
use bevy_rapier3d::geometry::Group;
use bevy_rapier3d::prelude::*;

use crate::backend::CharacterPhysicsBackend;
use crate::ceiling::ContactReport;
use crate::collision::CollisionData;
use crate::config::{ColliderShape, SensorConfig};
use crate::controller::CharacterWalker;
use crate::frame::BodyFrame;
use crate::layers::{self, CollisionLayer, LayerCollisionMatrix, LayerMask};
use crate::sensor::{GroundCaster, GroundSensor};
use crate::state::LocomotionHalted;
use crate::ControllerSet;

/// Rapier3D physics backend for the character controller.
///
/// Velocity is written to Rapier's [`Velocity`]; Rapier integrates the body
/// and resolves collisions. Ground probing and contact collection are
/// dedicated systems that read the [`RapierContext`].
pub struct Rapier3dBackend;

impl CharacterPhysicsBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }
}

/// Plugin that sets up Rapier3D-specific systems for the character controller.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            sync_collision_groups.in_set(ControllerSet::Preparation),
        );
        app.add_systems(
            FixedUpdate,
            (rapier_ground_detection, rapier_contact_collection).in_set(ControllerSet::Sensors),
        );
    }
}

/// [`GroundCaster`] over Rapier's query pipeline that ignores one body.
pub struct RapierGroundCaster<'a, 'w> {
    context: &'a RapierContext<'w>,
    exclude: Entity,
}

impl<'a, 'w> RapierGroundCaster<'a, 'w> {
    pub fn new(context: &'a RapierContext<'w>, exclude: Entity) -> Self {
        Self { context, exclude }
    }

    fn filter(&self, mask: LayerMask) -> QueryFilter<'static> {
        QueryFilter::default()
            .exclude_rigid_body(self.exclude)
            .exclude_sensors()
            .groups(CollisionGroups::new(
                Group::ALL,
                Group::from_bits_truncate(mask),
            ))
    }
}

impl GroundCaster for RapierGroundCaster<'_, '_> {
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<CollisionData> {
        self.context
            .cast_ray_and_get_normal(origin, direction, max_distance, true, self.filter(mask))
            .map(|(hit_entity, hit)| {
                CollisionData::new(hit.time_of_impact, hit.normal, hit.point, Some(hit_entity))
            })
    }

    fn cast_sphere(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<CollisionData> {
        let shape = Collider::ball(radius);
        self.context
            .cast_shape(
                origin,
                Quat::IDENTITY,
                direction,
                &shape,
                ShapeCastOptions {
                    max_time_of_impact: max_distance,
                    stop_at_penetration: false,
                    ..default()
                },
                self.filter(mask),
            )
            .map(|(hit_entity, hit)| {
                let normal = hit.details.map(|d| d.normal1).unwrap_or(-direction);
                let center = origin + direction * hit.time_of_impact;
                CollisionData::new(
                    hit.time_of_impact,
                    normal,
                    center - normal * radius,
                    Some(hit_entity),
                )
            })
    }
}

/// Rapier groups for a body on `layer`: member of its own layer only, colliding
/// with every layer the matrix allows.
pub fn layer_groups(layer: u32, matrix: &LayerCollisionMatrix) -> CollisionGroups {
    CollisionGroups::new(
        Group::from_bits_truncate(layers::layer_bit(layer)),
        Group::from_bits_truncate(matrix.collision_mask(layer)),
    )
}

/// Keep the [`CollisionGroups`] of every collider with a [`CollisionLayer`]
/// in line with the layer matrix.
///
/// Ground casts filter on collider memberships, so scene geometry only takes
/// part in layer filtering once it carries a [`CollisionLayer`]. Colliders
/// without one stay in every group.
fn sync_collision_groups(
    mut commands: Commands,
    matrix: Res<LayerCollisionMatrix>,
    q_colliders: Query<(Entity, &CollisionLayer, Option<&CollisionGroups>), With<Collider>>,
) {
    for (entity, layer, groups) in &q_colliders {
        let wanted = layer_groups(layer.0, &matrix);
        let up_to_date = groups.is_some_and(|g| {
            g.memberships == wanted.memberships && g.filters == wanted.filters
        });
        if !up_to_date {
            commands.entity(entity).insert(wanted);
        }
    }
}

/// Rapier-specific ground detection.
fn rapier_ground_detection(
    rapier_context: ReadRapierContext,
    mut q_sensors: Query<
        (Entity, &Transform, &mut GroundSensor),
        (With<CharacterWalker>, Without<LocomotionHalted>),
    >,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, mut sensor) in &mut q_sensors {
        let caster = RapierGroundCaster::new(&context, entity);
        sensor.check_for_ground(&caster, &BodyFrame::from(transform));
    }
}

/// Copy the body's active contact normals into its [`ContactReport`].
///
/// Normals are flipped where needed so they point from the other collider
/// toward the body.
fn rapier_contact_collection(
    rapier_context: ReadRapierContext,
    mut q_reports: Query<(Entity, &mut ContactReport), Without<LocomotionHalted>>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, mut report) in &mut q_reports {
        for pair in context.contact_pairs_with(entity) {
            if !pair.has_any_active_contact() {
                continue;
            }
            let sign = if pair.collider1() == Some(entity) { -1.0 } else { 1.0 };
            let normals: Vec<Vec3> = pair
                .manifolds()
                .flat_map(|manifold| {
                    std::iter::repeat(manifold.normal() * sign).take(manifold.num_points())
                })
                .collect();
            report.push_collision(normals);
        }
    }
}

/// Collider matching the shortened body described by a [`SensorConfig`].
///
/// The step-height margin at the bottom is left free so the ground sensor,
/// not the collider, holds the body above the ground.
pub fn walker_collider(config: &SensorConfig) -> Collider {
    let dims = config.collider_dimensions();
    let shape = match dims.shape {
        ColliderShape::Capsule => {
            Collider::capsule_y((dims.height / 2.0 - dims.radius).max(0.0), dims.radius)
        }
        ColliderShape::Box => Collider::cuboid(dims.radius, dims.height / 2.0, dims.radius),
        ColliderShape::Sphere => Collider::ball(dims.radius),
    };
    Collider::compound(vec![(dims.center, Quat::IDENTITY, shape)])
}

/// Bundle for creating a walker body with Rapier3D physics.
///
/// The body is dynamic so it is pushed out of walls by the solver, but
/// rotation is locked and Rapier gravity is disabled: the controller owns
/// vertical motion through its momentum.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use walker_controller::prelude::*;
///
/// fn spawn_player(mut commands: Commands) {
///     let sensor = SensorConfig::default();
///     commands.spawn((
///         Transform::from_xyz(0.0, 2.0, 0.0),
///         WalkerBundle::try_new(ControllerSettings::player(), sensor).unwrap(),
///         RapierWalkerBundle::from_sensor(&sensor),
///     ));
/// }
/// ```
#[derive(Bundle)]
pub struct RapierWalkerBundle {
    pub rigid_body: RigidBody,
    /// Written by the controller every fixed step.
    pub velocity: Velocity,
    pub locked_axes: LockedAxes,
    pub gravity_scale: GravityScale,
    /// Zero friction so walls do not slow the body down.
    pub friction: Friction,
    pub collider: Collider,
}

impl RapierWalkerBundle {
    /// Build the body and collider for a sensor configuration.
    pub fn from_sensor(config: &SensorConfig) -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            locked_axes: LockedAxes::ROTATION_LOCKED,
            gravity_scale: GravityScale(0.0),
            friction: Friction {
                coefficient: 0.0,
                combine_rule: CoefficientCombineRule::Min,
            },
            collider: walker_collider(config),
        }
    }

    /// Set the rigid body type, e.g. [`RigidBody::KinematicVelocityBased`].
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }

    /// Replace the generated collider.
    pub fn with_collider(mut self, collider: Collider) -> Self {
        self.collider = collider;
        self
    }
}
