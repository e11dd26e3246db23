//! The walker controller.
//!
//! [`CharacterWalker`] owns the locomotion state, momentum and the values
//! cached from the previous step. One call to
//! [`fixed_tick`](CharacterWalker::fixed_tick) runs state determination,
//! momentum integration and jump handling, and returns the velocity to write
//! to the body together with the side effects that fired.

use bevy::prelude::*;

use crate::ceiling::CeilingDetector;
use crate::config::{ControllerSettings, SensorConfig};
use crate::error::ConfigError;
use crate::events::ControllerEvent;
use crate::frame::BodyFrame;
use crate::integrator::{integrate_momentum, IntegratorInput};
use crate::intent::MovementIntent;
use crate::math;
use crate::momentum::Momentum;
use crate::sensor::{GroundCaster, GroundSensor};
use crate::state::{self, ControllerState, StateSignals, TransitionEffect};

/// Per-step inputs that do not live on the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepInput {
    pub frame: BodyFrame,
    /// World-space movement direction, length at most 1.
    pub movement_direction: Vec3,
    /// Whether the jump button is held.
    pub jump_held: bool,
    pub dt: f32,
}

impl StepInput {
    pub fn new(frame: BodyFrame, dt: f32) -> Self {
        Self {
            frame,
            movement_direction: Vec3::ZERO,
            jump_held: false,
            dt,
        }
    }

    pub fn with_intent(mut self, intent: &MovementIntent) -> Self {
        self.movement_direction = intent.direction();
        self.jump_held = intent.jump_pressed();
        self
    }
}

/// Outcome of one fixed step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    pub previous_state: ControllerState,
    pub state: ControllerState,
    /// Velocity for the body this step, ground adjustment included.
    pub velocity: Vec3,
    pub events: Vec<ControllerEvent>,
}

impl StepReport {
    /// Impact momentum if the controller landed this step.
    pub fn landed(&self) -> Option<Vec3> {
        self.events.iter().find_map(|event| match event {
            ControllerEvent::Landed { impact } => Some(*impact),
            _ => None,
        })
    }

    pub fn state_changed(&self) -> bool {
        self.previous_state != self.state
    }
}

/// Sensor-driven kinematic walker.
///
/// Requires [`ControllerSettings`], [`GroundSensor`] and [`MovementIntent`],
/// which are inserted with defaults when missing.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
#[require(ControllerSettings, GroundSensor, MovementIntent, Transform)]
pub struct CharacterWalker {
    state: ControllerState,
    momentum: Momentum,
    /// Last step's velocity, without ground adjustment.
    velocity: Vec3,
    /// Last step's input velocity, without momentum.
    movement_velocity: Vec3,
    normal_velocity: Vec3,
    /// Sum of the fixed steps this controller has run.
    clock: f32,
    jump_start_time: f32,
    jump_input_locked: bool,
    jump_requested: bool,
}

impl CharacterWalker {
    /// A falling controller whose momentum frame follows `settings`.
    pub fn new(settings: &ControllerSettings) -> Self {
        Self {
            momentum: Momentum::new(settings.use_local_momentum),
            ..default()
        }
    }

    #[inline]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Grounded or sliding.
    #[inline]
    pub fn is_grounded(&self) -> bool {
        self.state.is_grounded()
    }

    #[inline]
    pub fn is_sliding(&self) -> bool {
        self.state == ControllerState::Sliding
    }

    /// Last step's velocity (ground adjustment excluded).
    #[inline]
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Last step's input-driven velocity, ignoring momentum.
    #[inline]
    pub fn movement_velocity(&self) -> Vec3 {
        self.movement_velocity
    }

    /// Last step's velocity divided by movement speed.
    #[inline]
    pub fn normal_velocity(&self) -> Vec3 {
        self.normal_velocity
    }

    /// World-space momentum.
    pub fn momentum(&self, frame: &BodyFrame) -> Vec3 {
        self.momentum.get(frame)
    }

    pub fn set_momentum(&mut self, momentum: Vec3, frame: &BodyFrame) {
        self.momentum.set(momentum, frame);
    }

    pub fn add_momentum(&mut self, momentum: Vec3, frame: &BodyFrame) {
        self.momentum.add(momentum, frame);
    }

    /// Request a jump on the next fixed step.
    ///
    /// The request is dropped unless the controller is grounded when that
    /// step handles jumping.
    pub fn jump(&mut self) {
        self.jump_requested = true;
    }

    #[inline]
    pub fn jump_requested(&self) -> bool {
        self.jump_requested
    }

    /// Probe the ground, run [`fixed_tick`](Self::fixed_tick) and clear the
    /// ceiling flags.
    pub fn step(
        &mut self,
        settings: &ControllerSettings,
        sensor: &mut GroundSensor,
        caster: &impl GroundCaster,
        ceiling: Option<&mut CeilingDetector>,
        input: StepInput,
    ) -> StepReport {
        sensor.check_for_ground(caster, &input.frame);
        let report = self.fixed_tick(settings, sensor, ceiling.as_deref(), input);
        if let Some(ceiling) = ceiling {
            ceiling.reset_flags();
        }
        report
    }

    /// Advance one fixed step using the sensor's latest reading.
    pub fn fixed_tick(
        &mut self,
        settings: &ControllerSettings,
        sensor: &mut GroundSensor,
        ceiling: Option<&CeilingDetector>,
        input: StepInput,
    ) -> StepReport {
        let StepInput {
            frame,
            movement_direction,
            jump_held,
            dt,
        } = input;
        let up = frame.up();
        let previous_state = self.state;
        let mut events = Vec::new();

        self.clock += dt;
        self.momentum.set_local(settings.use_local_momentum, &frame);
        if !jump_held {
            self.jump_input_locked = false;
        }

        let reading = sensor.reading();
        let adjustment_velocity = if dt > 0.0 {
            up * (reading.adjustment_distance / dt)
        } else {
            Vec3::ZERO
        };

        let signals = StateSignals {
            rising: self.momentum.is_rising(&frame),
            grounded: reading.has_hit,
            too_steep: state::is_too_steep(reading.has_hit, reading.normal, up, settings.slope_limit),
            ceiling_hit: ceiling.is_some_and(CeilingDetector::hit_ceiling),
            jump_timed_out: self.clock - self.jump_start_time > settings.jump_duration,
        };
        let transition = state::next(self.state, signals);
        if let Some(effect) = transition.effect {
            self.apply_effect(effect, &frame, &mut events);
        }
        self.state = transition.next;

        let movement_velocity = movement_direction * settings.movement_speed;
        let momentum = integrate_momentum(
            settings,
            &IntegratorInput {
                state: self.state,
                momentum: self.momentum.get(&frame),
                movement_velocity,
                up,
                ground_normal: reading.normal,
                dt,
            },
        );
        if momentum.is_finite() {
            self.momentum.set(momentum, &frame);
        } else {
            warn!("Non-finite controller momentum {momentum}; resetting to zero");
            self.momentum.set(Vec3::ZERO, &frame);
        }

        self.handle_jumping(settings, jump_held, &frame, &mut events);

        let mut velocity = if self.state == ControllerState::Grounded {
            movement_velocity
        } else {
            Vec3::ZERO
        };
        velocity += self.momentum.get(&frame);

        sensor.set_extend_sensor_range(self.is_grounded());

        self.velocity = velocity;
        self.movement_velocity = movement_velocity;
        self.normal_velocity = velocity / settings.movement_speed;

        if previous_state != self.state {
            debug!("Controller state {:?} -> {:?}", previous_state, self.state);
        }

        StepReport {
            previous_state,
            state: self.state,
            velocity: velocity + adjustment_velocity,
            events,
        }
    }

    fn handle_jumping(
        &mut self,
        settings: &ControllerSettings,
        jump_held: bool,
        frame: &BodyFrame,
        events: &mut Vec<ControllerEvent>,
    ) {
        let wants_jump = self.jump_requested || jump_held;
        self.jump_requested = false;

        if self.state != ControllerState::Grounded || !wants_jump || self.jump_input_locked {
            return;
        }

        self.on_ground_contact_lost(frame);
        events.push(ControllerEvent::GroundContactLost);

        self.momentum.add(frame.up() * settings.jump_speed, frame);
        self.jump_start_time = self.clock;
        self.jump_input_locked = true;
        let momentum = self.momentum.get(frame);
        events.push(ControllerEvent::JumpStarted { momentum });
        debug!("Jump started with momentum {momentum}");

        self.state = ControllerState::Jumping;
    }

    fn apply_effect(
        &mut self,
        effect: TransitionEffect,
        frame: &BodyFrame,
        events: &mut Vec<ControllerEvent>,
    ) {
        match effect {
            TransitionEffect::GroundContactLost => {
                self.on_ground_contact_lost(frame);
                events.push(ControllerEvent::GroundContactLost);
            }
            TransitionEffect::GroundContactRegained => {
                events.push(ControllerEvent::Landed {
                    impact: self.momentum.get(frame),
                });
            }
            TransitionEffect::CeilingContact => {
                let momentum = math::remove_dot_vector(self.momentum.get(frame), frame.up());
                self.momentum.set(momentum, frame);
                events.push(ControllerEvent::CeilingContact);
            }
        }
    }

    /// Carry last step's movement velocity into momentum, without stacking
    /// speed along a direction momentum already covers.
    fn on_ground_contact_lost(&mut self, frame: &BodyFrame) {
        let momentum = self.momentum.get(frame);
        let mut velocity = self.movement_velocity;

        if momentum.length_squared() > 0.0 {
            let direction = velocity.normalize_or_zero();
            let projected = math::project(momentum, direction);
            let alignment = projected.normalize_or_zero().dot(direction);

            if projected.length_squared() >= velocity.length_squared() && alignment > 0.0 {
                velocity = Vec3::ZERO;
            } else if alignment > 0.0 {
                velocity -= projected;
            }
        }

        self.momentum.set(momentum + velocity, frame);
    }
}

/// The components a walker needs, validated.
#[derive(Bundle, Clone)]
pub struct WalkerBundle {
    pub walker: CharacterWalker,
    pub settings: ControllerSettings,
    pub sensor: GroundSensor,
    pub intent: MovementIntent,
}

impl WalkerBundle {
    /// Build a walker, rejecting settings that cannot be simulated.
    pub fn try_new(settings: ControllerSettings, sensor: SensorConfig) -> Result<Self, ConfigError> {
        settings.validate()?;
        sensor.validate()?;
        Ok(Self {
            walker: CharacterWalker::new(&settings),
            settings,
            sensor: GroundSensor::new(sensor),
            intent: MovementIntent::default(),
        })
    }
}
