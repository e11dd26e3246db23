//! Ground sensor.
//!
//! The sensor casts from the center of the (shortened) body collider along
//! `-up` and reports whether ground was found, how far away it is and its
//! surface normal. The cast reaches below the collider by the step-height
//! margin, and by twice that margin while the controller is grounded
//! ("extended range"), so the body keeps contact when walking down steps
//! and slopes.
//!
//! The environment is abstracted behind [`GroundCaster`]; physics backends
//! implement it over their query pipeline.

use bevy::prelude::*;

use crate::collision::CollisionData;
use crate::config::{CastType, ColliderShape, SensorConfig};
use crate::frame::BodyFrame;
use crate::layers::{self, LayerCollisionMatrix, LayerMask};
use crate::math;

/// Keeps casts from starting inside the body's own collider.
pub const SAFETY_DISTANCE_FACTOR: f32 = 0.001;

/// Share of the collider thickness used as the spherecast / ray array radius.
const RADIUS_MODIFIER: f32 = 0.8;

/// Length of the ray that refines a spherecast's surface normal.
const NORMAL_PROBE_LENGTH: f32 = 1.5;

/// Refined normals further than this from the cast axis are discarded.
const NORMAL_PROBE_MAX_ANGLE: f32 = 89.0;

/// Read-only access to the environment for ground probing.
///
/// Implementations must ignore the probing body itself and any layer not
/// in `mask`.
pub trait GroundCaster {
    /// Cast a ray and return the closest hit.
    fn cast_ray(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<CollisionData>;

    /// Sweep a sphere and return the first hit. `distance` is the travel of
    /// the sphere center; `point` is the contact on the surface.
    fn cast_sphere(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<CollisionData>;
}

/// Result of the latest ground check. Replaced on every check.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorReading {
    pub has_hit: bool,
    /// Distance from the cast origin to the ground, along the cast axis.
    pub distance: f32,
    pub normal: Vec3,
    pub point: Vec3,
    /// How far the body must move along `up` to sit at its stand-off height.
    pub adjustment_distance: f32,
}

/// Body collider derived from a [`SensorConfig`], in unscaled body space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderDimensions {
    pub shape: ColliderShape,
    pub center: Vec3,
    /// Total height of the shortened collider.
    pub height: f32,
    /// Capsule or sphere radius; half extent on x/z for boxes.
    pub radius: f32,
}

impl SensorConfig {
    /// The collider left after reserving the step-height margin at the bottom.
    pub fn collider_dimensions(&self) -> ColliderDimensions {
        let h = self.collider_height;
        let r = self.step_height_ratio;
        let center = self.collider_offset * h + Vec3::new(0.0, r * h / 2.0, 0.0);

        let (height, radius) = match self.shape {
            ColliderShape::Capsule => {
                let height = h * (1.0 - r);
                (height, (self.collider_thickness / 2.0).min(height / 2.0))
            }
            ColliderShape::Box => (h * (1.0 - r), self.collider_thickness / 2.0),
            ColliderShape::Sphere => {
                let radius = h / 2.0 * (1.0 - r);
                (radius * 2.0, radius)
            }
        };

        ColliderDimensions {
            shape: self.shape,
            center,
            height,
            radius,
        }
    }

    /// Distance from the collider center to the ground when standing still.
    pub fn stand_off_distance(&self, scale: f32) -> f32 {
        let h = self.collider_height * scale;
        h * (1.0 - self.step_height_ratio) * 0.5 + h * self.step_height_ratio
    }

    /// Cast length without the step margin.
    pub fn base_range(&self, scale: f32) -> f32 {
        self.stand_off_distance(1.0) * (1.0 + SAFETY_DISTANCE_FACTOR) * scale
    }

    /// Cast length while the extended range is active.
    pub fn extended_range(&self, scale: f32) -> f32 {
        self.base_range(scale) + self.collider_height * scale * self.step_height_ratio
    }

    /// Radius of the spherecast and ray array, scaled.
    pub fn sensor_radius(&self, scale: f32) -> f32 {
        let dims = self.collider_dimensions();
        let upper = match self.shape {
            ColliderShape::Capsule | ColliderShape::Box => dims.height / 2.0,
            ColliderShape::Sphere => dims.radius / 2.0,
        } * (1.0 - SAFETY_DISTANCE_FACTOR);

        let mut radius = self.collider_thickness / 2.0 * RADIUS_MODIFIER;
        if radius < SAFETY_DISTANCE_FACTOR {
            radius = SAFETY_DISTANCE_FACTOR;
        } else if radius > upper {
            radius = upper;
        }
        radius * scale
    }

    /// Ray start offsets for [`CastType::RaycastArray`], on the body's x/z plane.
    ///
    /// The center ray comes first, followed by each ring from the inside out.
    pub fn raycast_array_start_positions(&self, radius: f32) -> Vec<Vec3> {
        let rows = self.array_rows.max(1);
        let mut positions = vec![Vec3::ZERO];

        for row in 0..rows {
            let row_radius = (row + 1) as f32 / rows as f32;
            let ray_count = self.array_ray_count * (row + 1);
            let step = 360.0 / ray_count as f32;

            for ray in 0..ray_count {
                let mut angle = step * ray as f32;
                if self.array_rows_offset && row % 2 == 0 {
                    angle += step / 2.0;
                }
                let (sin, cos) = angle.to_radians().sin_cos();
                positions.push(Vec3::new(row_radius * cos, 0.0, row_radius * sin) * radius);
            }
        }

        positions
    }
}

/// Probes the ground below a controller once per fixed step.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct GroundSensor {
    pub config: SensorConfig,
    reading: SensorReading,
    extended_range: bool,
    layer_mask: LayerMask,
    mask_layer: Option<u32>,
}

impl Default for GroundSensor {
    fn default() -> Self {
        Self::new(SensorConfig::default())
    }
}

impl GroundSensor {
    pub fn new(config: SensorConfig) -> Self {
        Self {
            config,
            reading: SensorReading::default(),
            extended_range: true,
            layer_mask: layers::without(layers::ALL_LAYERS, layers::IGNORE_RAYCAST_LAYER),
            mask_layer: None,
        }
    }

    /// Latest reading.
    #[inline]
    pub fn reading(&self) -> SensorReading {
        self.reading
    }

    /// Whether the last check found ground.
    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.reading.has_hit
    }

    #[inline]
    pub fn ground_normal(&self) -> Vec3 {
        self.reading.normal
    }

    #[inline]
    pub fn ground_point(&self) -> Vec3 {
        self.reading.point
    }

    #[inline]
    pub fn ground_distance(&self) -> f32 {
        self.reading.distance
    }

    /// Correction along `up` that puts the body at its stand-off height.
    /// Zero when no ground was found.
    #[inline]
    pub fn ground_adjustment_distance(&self) -> f32 {
        self.reading.adjustment_distance
    }

    /// Toggle the step-height margin on the cast length.
    pub fn set_extend_sensor_range(&mut self, extended: bool) {
        self.extended_range = extended;
    }

    #[inline]
    pub fn is_using_extended_range(&self) -> bool {
        self.extended_range
    }

    #[inline]
    pub fn layer_mask(&self) -> LayerMask {
        self.layer_mask
    }

    /// Rebuild the layer mask if the body moved to another layer.
    ///
    /// Returns `true` when the mask was recomputed.
    pub fn refresh_layer_mask(&mut self, layer: u32, matrix: &LayerCollisionMatrix) -> bool {
        if self.mask_layer == Some(layer) {
            return false;
        }
        self.layer_mask = matrix.sensor_mask(layer);
        self.mask_layer = Some(layer);
        true
    }

    /// Force the next [`refresh_layer_mask`](Self::refresh_layer_mask) to
    /// recompute, e.g. after the collision matrix changed.
    pub fn invalidate_layer_mask(&mut self) {
        self.mask_layer = None;
    }

    /// World-space cast origin: the collider center.
    pub fn cast_origin(&self, frame: &BodyFrame) -> Vec3 {
        frame.transform_point(self.config.collider_dimensions().center)
    }

    /// Current cast length for a body of the given scale.
    pub fn cast_length(&self, frame: &BodyFrame) -> f32 {
        if self.extended_range {
            self.config.extended_range(frame.scale.x)
        } else {
            self.config.base_range(frame.scale.x)
        }
    }

    /// Probe for ground and store the reading.
    pub fn check_for_ground(
        &mut self,
        caster: &impl GroundCaster,
        frame: &BodyFrame,
    ) -> SensorReading {
        let origin = self.cast_origin(frame);
        let direction = frame.down();
        let length = self.cast_length(frame);
        let mask = self.layer_mask;

        let hit = match self.config.cast_type {
            CastType::Raycast => caster.cast_ray(origin, direction, length, mask),
            CastType::Spherecast => {
                let radius = self.config.sensor_radius(frame.scale.x);
                spherecast(caster, origin, radius, direction, length, mask)
            }
            CastType::RaycastArray => {
                let radius = self.config.sensor_radius(frame.scale.x);
                let offsets: Vec<Vec3> = self
                    .config
                    .raycast_array_start_positions(radius)
                    .into_iter()
                    .map(|offset| frame.rotation * offset)
                    .collect();
                ray_array(caster, origin, &offsets, direction, length, mask)
            }
        };

        self.reading = match hit {
            Some(hit) => SensorReading {
                has_hit: true,
                distance: hit.distance,
                normal: hit.normal,
                point: hit.point,
                adjustment_distance: self.config.stand_off_distance(frame.scale.x) - hit.distance,
            },
            None => SensorReading::default(),
        };
        self.reading
    }
}

fn spherecast(
    caster: &impl GroundCaster,
    origin: Vec3,
    radius: f32,
    direction: Vec3,
    length: f32,
    mask: LayerMask,
) -> Option<CollisionData> {
    let hit = caster.cast_sphere(origin, radius, direction, (length - radius).max(0.0), mask)?;

    // The sphere's contact normal is rounded on edges; a short ray at the
    // contact gives the true surface normal.
    let normal = caster
        .cast_ray(hit.point - direction, direction, NORMAL_PROBE_LENGTH, mask)
        .map(|probe| probe.normal)
        .filter(|normal| math::angle_between(*normal, -direction) < NORMAL_PROBE_MAX_ANGLE)
        .unwrap_or(hit.normal);

    Some(hit.with_normal(normal).measured_from(origin, direction))
}

fn ray_array(
    caster: &impl GroundCaster,
    origin: Vec3,
    offsets: &[Vec3],
    direction: Vec3,
    length: f32,
    mask: LayerMask,
) -> Option<CollisionData> {
    let hits: Vec<CollisionData> = offsets
        .iter()
        .filter_map(|offset| caster.cast_ray(origin + *offset, direction, length, mask))
        .collect();

    CollisionData::average(&hits, origin, direction)
}
