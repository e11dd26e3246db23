//! Locomotion notifications and external momentum commands.

use bevy::prelude::*;

/// Side effect produced by one fixed step of a controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerEvent {
    /// Left walkable ground (started rising, falling, sliding or jumping).
    GroundContactLost,
    /// Landed on walkable ground. Carries the world-space momentum at impact.
    Landed { impact: Vec3 },
    /// Hit a ceiling while rising or jumping; vertical momentum was removed.
    CeilingContact,
    /// A jump started. Carries the world-space momentum after the jump impulse.
    JumpStarted { momentum: Vec3 },
}

/// A [`ControllerEvent`] raised by an entity's controller.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct LocomotionEvent {
    pub entity: Entity,
    pub kind: ControllerEvent,
}

/// How a [`MomentumCommand`] changes momentum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MomentumChange {
    /// Add a world-space vector (impacts, explosions, launch pads).
    Add(Vec3),
    /// Replace momentum with a world-space vector.
    Set(Vec3),
}

/// Changes a controller's momentum before its next fixed step.
///
/// This is the only supported way for other systems to push a character;
/// it keeps local-frame momentum consistent.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct MomentumCommand {
    pub entity: Entity,
    pub change: MomentumChange,
}

impl MomentumCommand {
    pub fn add(entity: Entity, momentum: Vec3) -> Self {
        Self {
            entity,
            change: MomentumChange::Add(momentum),
        }
    }

    pub fn set(entity: Entity, momentum: Vec3) -> Self {
        Self {
            entity,
            change: MomentumChange::Set(momentum),
        }
    }
}
