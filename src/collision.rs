//! Ground cast hits.
//!
//! A [`CollisionData`] is what a [`GroundCaster`](crate::sensor::GroundCaster)
//! returns for one ray or sphere. The sensor folds several of them into a
//! single reading.

use bevy::prelude::*;

use crate::math;

/// One ray or sphere hit against ground geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionData {
    /// How far the cast travelled before the hit.
    pub distance: f32,
    /// Surface normal at the hit.
    pub normal: Vec3,
    /// World-space contact point.
    pub point: Vec3,
    /// Collider entity, when the caster knows it.
    pub entity: Option<Entity>,
}

impl CollisionData {
    pub fn new(distance: f32, normal: Vec3, point: Vec3, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            entity,
        }
    }

    /// Depth of the contact point below `origin`, measured along `direction`
    /// only. Sideways offsets of the point do not count.
    pub fn depth_from(&self, origin: Vec3, direction: Vec3) -> f32 {
        math::extract_dot_vector(self.point - origin, direction).length()
    }

    /// Re-measure the hit as seen from `origin` along `direction`.
    pub fn measured_from(self, origin: Vec3, direction: Vec3) -> Self {
        Self {
            distance: self.depth_from(origin, direction),
            ..self
        }
    }

    pub fn with_normal(self, normal: Vec3) -> Self {
        Self { normal, ..self }
    }

    /// Merge hits into one: normalized mean normal and mean point, measured
    /// from `origin`. The first hit's entity is kept. `None` for no hits.
    pub fn average(hits: &[Self], origin: Vec3, direction: Vec3) -> Option<Self> {
        let first = hits.first()?;
        let count = hits.len() as f32;
        let normal = (hits.iter().map(|h| h.normal).sum::<Vec3>() / count).normalize_or_zero();
        let point = hits.iter().map(|h| h.point).sum::<Vec3>() / count;

        Some(Self::new(0.0, normal, point, first.entity).measured_from(origin, direction))
    }
}
