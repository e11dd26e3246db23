//! Physics layer bitmask helpers.
//!
//! Layers are plain ids in `0..32`; masks are `u32` bitsets over those ids.
//! Nothing here is global: the collision matrix is an ordinary resource.

use bevy::prelude::*;

/// Bitset over layer ids.
pub type LayerMask = u32;

/// Number of addressable layers.
pub const LAYER_COUNT: u32 = 32;

/// Layer every body starts on.
pub const DEFAULT_LAYER: u32 = 0;

/// Bodies on this layer are never reported to ground sensors.
pub const IGNORE_RAYCAST_LAYER: u32 = 2;

/// Mask with every layer set.
pub const ALL_LAYERS: LayerMask = LayerMask::MAX;

/// Mask containing only `layer`. Out-of-range ids yield an empty mask.
#[inline]
pub const fn layer_bit(layer: u32) -> LayerMask {
    if layer < LAYER_COUNT {
        1 << layer
    } else {
        0
    }
}

/// Whether `mask` includes `layer`.
#[inline]
pub const fn contains(mask: LayerMask, layer: u32) -> bool {
    mask & layer_bit(layer) != 0
}

/// Mask containing both layers.
#[inline]
pub const fn combine(layer_a: u32, layer_b: u32) -> LayerMask {
    layer_bit(layer_a) | layer_bit(layer_b)
}

/// Inverts a mask.
#[inline]
pub const fn flip(mask: LayerMask) -> LayerMask {
    !mask
}

/// `mask` with `layer` cleared.
#[inline]
pub const fn without(mask: LayerMask, layer: u32) -> LayerMask {
    mask & !layer_bit(layer)
}

/// The physics layer a body or piece of ground lives on.
///
/// Ground sensors rebuild their layer mask whenever this changes. With the
/// Rapier backend, colliders carrying a layer get matching `CollisionGroups`;
/// colliders without one belong to every layer.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[reflect(Component)]
pub struct CollisionLayer(pub u32);

/// Which layer pairs collide with each other.
///
/// Every pair collides unless explicitly ignored. The relation is symmetric.
#[derive(Resource, Debug, Clone, PartialEq, Eq)]
pub struct LayerCollisionMatrix {
    ignored: [LayerMask; LAYER_COUNT as usize],
}

impl Default for LayerCollisionMatrix {
    fn default() -> Self {
        Self {
            ignored: [0; LAYER_COUNT as usize],
        }
    }
}

impl LayerCollisionMatrix {
    /// Create a matrix where every layer collides with every other.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set_ignore`](Self::set_ignore).
    pub fn with_ignored(mut self, layer_a: u32, layer_b: u32) -> Self {
        self.set_ignore(layer_a, layer_b, true);
        self
    }

    /// Enable or disable collisions between two layers.
    pub fn set_ignore(&mut self, layer_a: u32, layer_b: u32, ignore: bool) {
        if layer_a >= LAYER_COUNT || layer_b >= LAYER_COUNT {
            return;
        }
        let (a, b) = (layer_a as usize, layer_b as usize);
        if ignore {
            self.ignored[a] |= layer_bit(layer_b);
            self.ignored[b] |= layer_bit(layer_a);
        } else {
            self.ignored[a] &= !layer_bit(layer_b);
            self.ignored[b] &= !layer_bit(layer_a);
        }
    }

    /// Whether bodies on the two layers collide.
    pub fn collides(&self, layer_a: u32, layer_b: u32) -> bool {
        if layer_a >= LAYER_COUNT || layer_b >= LAYER_COUNT {
            return false;
        }
        !contains(self.ignored[layer_a as usize], layer_b)
    }

    /// Every layer that collides with `layer`.
    pub fn collision_mask(&self, layer: u32) -> LayerMask {
        if layer >= LAYER_COUNT {
            return 0;
        }
        flip(self.ignored[layer as usize])
    }

    /// Mask a ground sensor on `layer` should cast against.
    pub fn sensor_mask(&self, layer: u32) -> LayerMask {
        without(self.collision_mask(layer), IGNORE_RAYCAST_LAYER)
    }
}
