//! Locomotion state machine and state marker components.
//!
//! Transitions are a pure function of the current state and a bundle of
//! signals sampled once per fixed step. Side effects are returned alongside
//! the next state and executed by the controller, so the table itself can be
//! tested exhaustively.

use bevy::prelude::*;

use crate::math;

/// The five locomotion states. A new controller starts out falling.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ControllerState {
    Grounded,
    #[default]
    Falling,
    Rising,
    Sliding,
    Jumping,
}

impl ControllerState {
    pub const ALL: [Self; 5] = [
        Self::Grounded,
        Self::Falling,
        Self::Rising,
        Self::Sliding,
        Self::Jumping,
    ];

    /// Standing on walkable ground or sliding down a steep slope.
    #[inline]
    pub fn is_grounded(self) -> bool {
        matches!(self, Self::Grounded | Self::Sliding)
    }
}

/// Everything the transition table looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateSignals {
    /// Vertical momentum is above threshold and points up.
    pub rising: bool,
    /// The ground sensor found ground.
    pub grounded: bool,
    /// The ground is steeper than the slope limit, or there is no ground.
    pub too_steep: bool,
    /// The ceiling detector registered a hit this step.
    pub ceiling_hit: bool,
    /// More than `jump_duration` has passed since the jump started.
    pub jump_timed_out: bool,
}

impl StateSignals {
    /// On ground that is too steep to stand on.
    #[inline]
    pub fn sliding(&self) -> bool {
        self.grounded && self.too_steep
    }
}

/// Whether ground with the given normal is too steep. Missing ground always is.
pub fn is_too_steep(grounded: bool, ground_normal: Vec3, up: Vec3, slope_limit: f32) -> bool {
    !grounded || math::angle_between(ground_normal, up) > slope_limit
}

/// Side effect attached to a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    GroundContactLost,
    GroundContactRegained,
    CeilingContact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: ControllerState,
    pub effect: Option<TransitionEffect>,
}

impl Transition {
    const fn to(next: ControllerState) -> Self {
        Self { next, effect: None }
    }

    const fn with(next: ControllerState, effect: TransitionEffect) -> Self {
        Self {
            next,
            effect: Some(effect),
        }
    }
}

/// Pick the next state.
pub fn next(state: ControllerState, signals: StateSignals) -> Transition {
    use ControllerState as S;
    use TransitionEffect as E;

    let StateSignals {
        rising,
        grounded,
        ceiling_hit,
        jump_timed_out,
        ..
    } = signals;
    let sliding = signals.sliding();

    match state {
        S::Grounded => {
            if rising {
                Transition::with(S::Rising, E::GroundContactLost)
            } else if !grounded {
                Transition::with(S::Falling, E::GroundContactLost)
            } else if sliding {
                Transition::with(S::Sliding, E::GroundContactLost)
            } else {
                Transition::to(S::Grounded)
            }
        }
        S::Falling => {
            if rising {
                Transition::to(S::Rising)
            } else if grounded && !sliding {
                Transition::with(S::Grounded, E::GroundContactRegained)
            } else if sliding {
                Transition::to(S::Sliding)
            } else {
                Transition::to(S::Falling)
            }
        }
        S::Sliding => {
            if rising {
                Transition::with(S::Rising, E::GroundContactLost)
            } else if !grounded {
                Transition::with(S::Falling, E::GroundContactLost)
            } else if !sliding {
                Transition::with(S::Grounded, E::GroundContactRegained)
            } else {
                Transition::to(S::Sliding)
            }
        }
        S::Rising => {
            if !rising {
                if grounded && !sliding {
                    Transition::with(S::Grounded, E::GroundContactRegained)
                } else if sliding {
                    Transition::to(S::Sliding)
                } else {
                    Transition::to(S::Falling)
                }
            } else if ceiling_hit {
                Transition::with(S::Falling, E::CeilingContact)
            } else {
                Transition::to(S::Rising)
            }
        }
        S::Jumping => {
            if jump_timed_out {
                Transition::to(S::Rising)
            } else if ceiling_hit {
                Transition::with(S::Falling, E::CeilingContact)
            } else {
                Transition::to(S::Jumping)
            }
        }
    }
}

/// Marker component indicating the character is standing on walkable ground.
///
/// Mirrors [`ControllerState::Grounded`]. Mutually exclusive with [`Airborne`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is falling, rising or jumping.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Marker component indicating the character is sliding down a steep slope.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Sliding;

/// Stops every controller cadence for this entity.
///
/// Fixed, late and frame ticks all skip halted entities. Invalid
/// configuration inserts this automatically.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct LocomotionHalted;
