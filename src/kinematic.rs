//! Kinematic backend.
//!
//! Bodies carry a [`BodyVelocity`] and are moved by integrating it into their
//! `Transform` once per fixed step. Ground is queried from a resource that
//! implements [`GroundCaster`], by default a set of analytic planes.

use std::marker::PhantomData;

use bevy::prelude::*;

use crate::backend::{self, CharacterPhysicsBackend};
use crate::collision::CollisionData;
use crate::controller::CharacterWalker;
use crate::frame::BodyFrame;
use crate::layers::{self, LayerMask};
use crate::sensor::{GroundCaster, GroundSensor};
use crate::state::LocomotionHalted;
use crate::ControllerSet;

/// Backend that moves bodies without a physics engine.
///
/// `C` is the resource the ground sensors cast against.
pub struct KinematicBackend<C = PlaneGround>(PhantomData<C>);

impl<C: GroundCaster + Resource + Default> CharacterPhysicsBackend for KinematicBackend<C> {
    fn plugin() -> impl Plugin {
        KinematicBackendPlugin::<C>::default()
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<BodyVelocity>(entity)
            .map(|v| v.0)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut body) = world.get_mut::<BodyVelocity>(entity) {
            body.0 = velocity;
        } else if let Ok(mut entity) = world.get_entity_mut(entity) {
            entity.insert(BodyVelocity(velocity));
        }
    }
}

/// Linear velocity of a kinematic body, in world units per second.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct BodyVelocity(pub Vec3);

/// Registers ground sensing against `C` and body integration.
pub struct KinematicBackendPlugin<C> {
    _marker: PhantomData<C>,
}

impl<C> Default for KinematicBackendPlugin<C> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<C: GroundCaster + Resource + Default> Plugin for KinematicBackendPlugin<C> {
    fn build(&self, app: &mut App) {
        app.register_type::<BodyVelocity>();
        app.init_resource::<C>();

        app.add_systems(FixedUpdate, sense_ground::<C>.in_set(ControllerSet::Sensors));
        app.add_systems(FixedUpdate, integrate_bodies.in_set(ControllerSet::Integration));
    }
}

fn sense_ground<C: GroundCaster + Resource>(
    caster: Res<C>,
    mut q_sensors: Query<
        (&Transform, &mut GroundSensor),
        (With<CharacterWalker>, Without<LocomotionHalted>),
    >,
) {
    for (transform, mut sensor) in &mut q_sensors {
        sensor.check_for_ground(&*caster, &BodyFrame::from(transform));
    }
}

fn integrate_bodies(
    time: Option<Res<Time<Fixed>>>,
    mut q_bodies: Query<(&BodyVelocity, &mut Transform), Without<LocomotionHalted>>,
) {
    let dt = backend::fixed_delta(time.as_deref());
    for (velocity, mut transform) in &mut q_bodies {
        transform.translation += velocity.0 * dt;
    }
}

/// One-sided infinite plane. Casts only hit it from the side its normal
/// faces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundPlane {
    pub point: Vec3,
    pub normal: Vec3,
    pub layer: u32,
    pub entity: Option<Entity>,
}

impl GroundPlane {
    pub fn new(point: Vec3, normal: Vec3) -> Self {
        Self {
            point,
            normal: normal.normalize_or_zero(),
            layer: layers::DEFAULT_LAYER,
            entity: None,
        }
    }

    pub fn on_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entity = Some(entity);
        self
    }

    /// Height of `position` above the plane.
    pub fn height_of(&self, position: Vec3) -> f32 {
        (position - self.point).dot(self.normal)
    }

    fn approach_speed(&self, direction: Vec3) -> Option<f32> {
        let speed = -direction.dot(self.normal);
        (speed > f32::EPSILON).then_some(speed)
    }

    fn cast_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<CollisionData> {
        let speed = self.approach_speed(direction)?;
        let height = self.height_of(origin);
        if height < 0.0 {
            return None;
        }
        let distance = height / speed;
        (distance <= max_distance).then(|| {
            CollisionData::new(distance, self.normal, origin + direction * distance, self.entity)
        })
    }

    fn cast_sphere(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<CollisionData> {
        let speed = self.approach_speed(direction)?;
        let height = self.height_of(origin);
        if height < 0.0 {
            return None;
        }
        let distance = ((height - radius) / speed).max(0.0);
        if distance > max_distance {
            return None;
        }
        let center = origin + direction * distance;
        let point = center - self.normal * self.height_of(center).min(radius);
        Some(CollisionData::new(distance, self.normal, point, self.entity))
    }
}

/// Analytic ground made of [`GroundPlane`]s.
#[derive(Resource, Debug, Clone, Default)]
pub struct PlaneGround {
    pub planes: Vec<GroundPlane>,
}

impl PlaneGround {
    /// No ground at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// Horizontal floor at `height`.
    pub fn flat(height: f32) -> Self {
        Self::single(Vec3::new(0.0, height, 0.0), Vec3::Y)
    }

    pub fn single(point: Vec3, normal: Vec3) -> Self {
        Self::new().with_plane(GroundPlane::new(point, normal))
    }

    pub fn with_plane(mut self, plane: GroundPlane) -> Self {
        self.planes.push(plane);
        self
    }

    fn closest(
        &self,
        mask: LayerMask,
        cast: impl Fn(&GroundPlane) -> Option<CollisionData>,
    ) -> Option<CollisionData> {
        self.planes
            .iter()
            .filter(|plane| layers::contains(mask, plane.layer))
            .filter_map(cast)
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

impl GroundCaster for PlaneGround {
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<CollisionData> {
        self.closest(mask, |plane| plane.cast_ray(origin, direction, max_distance))
    }

    fn cast_sphere(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<CollisionData> {
        self.closest(mask, |plane| {
            plane.cast_sphere(origin, radius, direction, max_distance)
        })
    }
}
