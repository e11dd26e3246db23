//! Ceiling detection from collision contacts.
//!
//! Backends report the contact normals of every collision the body took part
//! in during the step (normals pointing from the other surface toward the
//! body). A contact counts as ceiling when its normal is within
//! [`CeilingSettings::angle_limit`] of `-up`. The hit flag lives for exactly
//! one fixed step: it is read by the state machine and cleared at the end
//! of the step.

use bevy::prelude::*;

use crate::config::{CeilingDetectionMethod, CeilingSettings};
use crate::math;

/// Contact normals collected for the current step, one entry per collision.
#[derive(Component, Debug, Clone, Default)]
pub struct ContactReport {
    collisions: Vec<Vec<Vec3>>,
}

impl ContactReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one collision and its contact normals.
    pub fn push_collision(&mut self, normals: impl IntoIterator<Item = Vec3>) {
        self.collisions.push(normals.into_iter().collect());
    }

    pub fn collisions(&self) -> impl Iterator<Item = &[Vec3]> {
        self.collisions.iter().map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.collisions.is_empty()
    }

    pub fn clear(&mut self) {
        self.collisions.clear();
    }
}

/// Flags ceiling strikes from the body's collision contacts.
///
/// Requires a [`ContactReport`], which the physics backend fills.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
#[require(ContactReport)]
pub struct CeilingDetector {
    pub settings: CeilingSettings,
    ceiling_was_hit: bool,
}

impl CeilingDetector {
    pub fn new(settings: CeilingSettings) -> Self {
        Self {
            settings,
            ceiling_was_hit: false,
        }
    }

    /// Whether a ceiling was hit since the last reset.
    #[inline]
    pub fn hit_ceiling(&self) -> bool {
        self.ceiling_was_hit
    }

    pub fn reset_flags(&mut self) {
        self.ceiling_was_hit = false;
    }

    /// Inspect one collision. Returns whether it qualified as a ceiling hit.
    ///
    /// A collision without contacts never qualifies.
    pub fn register_collision(&mut self, normals: &[Vec3], up: Vec3) -> bool {
        let limit = self.settings.angle_limit;
        let angle_to_ceiling = |normal: &Vec3| math::angle_between(-up, *normal);

        let qualifies = match self.settings.method {
            CeilingDetectionMethod::FirstContact => normals
                .first()
                .is_some_and(|normal| angle_to_ceiling(normal) < limit),
            CeilingDetectionMethod::AllContacts => {
                normals.iter().any(|normal| angle_to_ceiling(normal) < limit)
            }
            CeilingDetectionMethod::AverageOfAllContacts => {
                if normals.is_empty() {
                    false
                } else {
                    let total: f32 = normals.iter().map(angle_to_ceiling).sum();
                    let mean = total / (normals.len() as f32);
                    mean < limit
                }
            }
        };

        if qualifies {
            self.ceiling_was_hit = true;
        }
        qualifies
    }

    /// Inspect every collision in a report.
    pub fn register_report(&mut self, report: &ContactReport, up: Vec3) {
        for normals in report.collisions() {
            self.register_collision(normals, up);
        }
    }
}
