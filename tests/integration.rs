//! Integration tests for the walker controller.
//!
//! These tests drive a full Bevy app with the kinematic backend over analytic
//! ground. Every `app.update()` runs exactly one fixed step followed by the
//! frame schedules. Each test prints PROOF lines with the values it checks.

use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use walker_controller::prelude::*;

const DT: f32 = 1.0 / 60.0;

#[derive(Resource, Default)]
struct ReceivedEvents(Vec<LocomotionEvent>);

fn record_events(mut reader: EventReader<LocomotionEvent>, mut received: ResMut<ReceivedEvents>) {
    received.0.extend(reader.read().copied());
}

/// Create a minimal test app with the kinematic backend over `ground`.
fn create_test_app(ground: PlaneGround) -> App {
    let mut app = App::new();

    app.add_plugins(MinimalPlugins);
    app.insert_resource(Time::<Fixed>::from_hz(60.0));
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
        1.0 / 60.0,
    )));
    app.insert_resource(ground);
    app.add_plugins(CharacterControllerPlugin::<KinematicBackend>::default());
    app.init_resource::<ReceivedEvents>();
    app.add_systems(Update, record_events);

    app.finish();
    app.cleanup();

    // The first update only starts the clock.
    app.update();
    app
}

/// Spawn a walker with default settings, feet at `position`.
fn spawn_walker(app: &mut App, position: Vec3) -> Entity {
    spawn_walker_with_settings(app, position, ControllerSettings::default())
}

fn spawn_walker_with_settings(app: &mut App, position: Vec3, settings: ControllerSettings) -> Entity {
    let walker = WalkerBundle::try_new(settings, SensorConfig::default())
        .expect("test settings are valid");
    app.world_mut()
        .spawn((Transform::from_translation(position), walker, LocomotionReadout::default()))
        .id()
}

/// Run one fixed step plus the frame schedules.
fn tick(app: &mut App) {
    app.update();
}

/// Run the app for N frames.
fn run_frames(app: &mut App, frames: usize) {
    for _ in 0..frames {
        tick(app);
    }
}

fn position(app: &App, entity: Entity) -> Vec3 {
    app.world().get::<Transform>(entity).unwrap().translation
}

fn walker(app: &App, entity: Entity) -> &CharacterWalker {
    app.world().get::<CharacterWalker>(entity).unwrap()
}

fn state(app: &App, entity: Entity) -> ControllerState {
    walker(app, entity).state()
}

fn set_intent(app: &mut App, entity: Entity, direction: Vec3, jump: bool) {
    let mut intent = app.world_mut().get_mut::<MovementIntent>(entity).unwrap();
    intent.set_direction(direction);
    intent.set_jump_pressed(jump);
}

fn events_for(app: &App, entity: Entity) -> Vec<ControllerEvent> {
    app.world()
        .resource::<ReceivedEvents>()
        .0
        .iter()
        .filter(|event| event.entity == entity)
        .map(|event| event.kind)
        .collect()
}

fn count_jumps(app: &App, entity: Entity) -> usize {
    events_for(app, entity)
        .iter()
        .filter(|kind| matches!(kind, ControllerEvent::JumpStarted { .. }))
        .count()
}

/// Slope descending toward +X.
fn ramp(degrees: f32) -> PlaneGround {
    PlaneGround::single(Vec3::ZERO, Quat::from_rotation_z(-degrees.to_radians()) * Vec3::Y)
}

// ==================== Ground Tests ====================

mod ground {
    use super::*;

    #[test]
    fn walker_settles_on_flat_ground() {
        let mut app = create_test_app(PlaneGround::flat(0.0));
        let entity = spawn_walker(&mut app, Vec3::ZERO);

        run_frames(&mut app, 60);

        let pos = position(&app, entity);
        println!("PROOF: state={:?} position={pos}", state(&app, entity));
        assert_eq!(state(&app, entity), ControllerState::Grounded);
        assert!(pos.length() < 0.001);
        assert!(app.world().get::<Grounded>(entity).is_some());
        assert!(app.world().get::<Airborne>(entity).is_none());
    }

    #[test]
    fn walker_falls_without_ground() {
        let mut app = create_test_app(PlaneGround::new());
        let entity = spawn_walker(&mut app, Vec3::ZERO);

        run_frames(&mut app, 30);

        let pos = position(&app, entity);
        let velocity = app.world().get::<BodyVelocity>(entity).unwrap().0;
        println!("PROOF: position={pos} velocity={velocity}");
        assert_eq!(state(&app, entity), ControllerState::Falling);
        // 30 steps of 30 u/s² gravity.
        assert!((velocity.y + 30.0 * 30.0 * DT).abs() < 0.01);
        assert!(pos.y < -3.0);
        assert!(app.world().get::<Airborne>(entity).is_some());
    }

    #[test]
    fn walker_lands_from_height() {
        let mut app = create_test_app(PlaneGround::flat(0.0));
        let entity = spawn_walker(&mut app, Vec3::new(0.0, 3.0, 0.0));

        let mut frames = 0;
        while state(&app, entity) != ControllerState::Grounded {
            tick(&mut app);
            frames += 1;
            assert!(frames < 120, "walker never landed");
        }
        // The landing step corrects any overshoot on the next step.
        tick(&mut app);

        let pos = position(&app, entity);
        let landed = events_for(&app, entity)
            .into_iter()
            .find_map(|kind| match kind {
                ControllerEvent::Landed { impact } => Some(impact),
                _ => None,
            })
            .expect("landing event");
        println!("PROOF: landed after {frames} frames, impact={landed}, position={pos}");
        assert!(landed.y < -10.0);
        assert!(pos.y.abs() < 0.001);
    }

    #[test]
    fn walker_walks_along_input() {
        let mut app = create_test_app(PlaneGround::flat(0.0));
        let entity = spawn_walker(&mut app, Vec3::ZERO);
        tick(&mut app);

        set_intent(&mut app, entity, Vec3::X, false);
        run_frames(&mut app, 60);

        let pos = position(&app, entity);
        println!("PROOF: after 1s walking position={pos}");
        assert!((pos.x - 7.0).abs() < 0.01);
        assert!(pos.y.abs() < 0.001);
        assert_eq!(state(&app, entity), ControllerState::Grounded);
    }

    #[test]
    fn walker_stays_grounded_walking_down_a_ramp() {
        let mut app = create_test_app(ramp(20.0));
        let entity = spawn_walker(&mut app, Vec3::ZERO);
        tick(&mut app);
        set_intent(&mut app, entity, Vec3::X, false);

        for _ in 0..60 {
            tick(&mut app);
            assert!(walker(&app, entity).is_grounded());
        }

        let pos = position(&app, entity);
        let ground_height = -pos.x * 20f32.to_radians().tan();
        println!("PROOF: position={pos} ground height={ground_height}");
        assert!(pos.x > 6.0);
        assert!((pos.y - ground_height).abs() < 0.06);
    }

    #[test]
    fn steep_ground_slides() {
        let mut app = create_test_app(ramp(85.0));
        let entity = spawn_walker(&mut app, Vec3::ZERO);

        tick(&mut app);
        println!("PROOF: state on 85 degree slope={:?}", state(&app, entity));
        assert_eq!(state(&app, entity), ControllerState::Sliding);
        assert!(app.world().get::<Sliding>(entity).is_some());
        assert!(app.world().get::<Airborne>(entity).is_none());
        assert!(app.world().get::<Grounded>(entity).is_none());

        run_frames(&mut app, 10);
        let pos = position(&app, entity);
        println!("PROOF: slid to {pos}");
        assert!(pos.x > 0.0);
        assert!(pos.y < 0.0);
    }

    #[test]
    fn collision_layers_filter_ground() {
        let ground = PlaneGround::new().with_plane(GroundPlane::new(Vec3::ZERO, Vec3::Y).on_layer(9));
        let mut app = create_test_app(ground);
        app.insert_resource(LayerCollisionMatrix::new().with_ignored(3, 9));

        let default_layer = spawn_walker(&mut app, Vec3::ZERO);
        let ghost = spawn_walker(&mut app, Vec3::new(5.0, 0.0, 0.0));
        app.world_mut().entity_mut(ghost).insert(CollisionLayer(3));

        run_frames(&mut app, 10);

        println!(
            "PROOF: default layer={:?} ghost layer={:?}",
            state(&app, default_layer),
            state(&app, ghost)
        );
        assert_eq!(state(&app, default_layer), ControllerState::Grounded);
        assert_eq!(state(&app, ghost), ControllerState::Falling);
        assert!(position(&app, ghost).y < 0.0);
    }
}

// ==================== Jump Tests ====================

mod jumping {
    use super::*;

    #[test]
    fn held_jump_button_jumps_once() {
        let mut app = create_test_app(PlaneGround::flat(0.0));
        let entity = spawn_walker(&mut app, Vec3::ZERO);
        tick(&mut app);

        set_intent(&mut app, entity, Vec3::ZERO, true);
        tick(&mut app);
        assert_eq!(state(&app, entity), ControllerState::Jumping);

        let mut peak: f32 = 0.0;
        for _ in 0..120 {
            tick(&mut app);
            peak = peak.max(position(&app, entity).y);
        }

        println!(
            "PROOF: peak={peak} jumps={} final state={:?}",
            count_jumps(&app, entity),
            state(&app, entity)
        );
        // 0.2 s at 10 u/s, then a ballistic rise of v²/2g.
        assert!(peak > 3.4 && peak < 4.0);
        assert_eq!(count_jumps(&app, entity), 1);
        assert_eq!(state(&app, entity), ControllerState::Grounded);
    }

    #[test]
    fn released_button_allows_next_jump() {
        let mut app = create_test_app(PlaneGround::flat(0.0));
        let entity = spawn_walker(&mut app, Vec3::ZERO);
        tick(&mut app);

        set_intent(&mut app, entity, Vec3::ZERO, true);
        run_frames(&mut app, 120);
        set_intent(&mut app, entity, Vec3::ZERO, false);
        tick(&mut app);
        set_intent(&mut app, entity, Vec3::ZERO, true);
        tick(&mut app);

        println!("PROOF: jumps={}", count_jumps(&app, entity));
        assert_eq!(count_jumps(&app, entity), 2);
    }

    #[test]
    fn jump_request_is_dropped_midair() {
        let mut app = create_test_app(PlaneGround::new());
        let entity = spawn_walker(&mut app, Vec3::new(0.0, 10.0, 0.0));
        tick(&mut app);

        app.world_mut()
            .get_mut::<CharacterWalker>(entity)
            .unwrap()
            .jump();
        tick(&mut app);

        println!("PROOF: midair jump request -> state={:?}", state(&app, entity));
        assert_eq!(count_jumps(&app, entity), 0);
        assert_eq!(state(&app, entity), ControllerState::Falling);
        assert!(!walker(&app, entity).jump_requested());
    }

    #[test]
    fn jump_carries_walking_momentum() {
        let mut app = create_test_app(PlaneGround::flat(0.0));
        let entity = spawn_walker(&mut app, Vec3::ZERO);
        tick(&mut app);
        set_intent(&mut app, entity, Vec3::X, false);
        run_frames(&mut app, 5);

        set_intent(&mut app, entity, Vec3::X, true);
        tick(&mut app);

        let jump_momentum = events_for(&app, entity)
            .into_iter()
            .find_map(|kind| match kind {
                ControllerEvent::JumpStarted { momentum } => Some(momentum),
                _ => None,
            })
            .expect("jump started");
        println!("PROOF: jump momentum={jump_momentum}");
        assert!((jump_momentum.x - 7.0).abs() < 0.01);
        assert!((jump_momentum.y - 10.0).abs() < 0.01);
    }
}

// ==================== Momentum Tests ====================

mod momentum {
    use super::*;

    #[test]
    fn momentum_command_launches_walker() {
        let mut app = create_test_app(PlaneGround::flat(0.0));
        let entity = spawn_walker(&mut app, Vec3::ZERO);
        tick(&mut app);

        app.world_mut()
            .send_event(MomentumCommand::add(entity, Vec3::Y * 12.0));
        tick(&mut app);

        let pos = position(&app, entity);
        println!("PROOF: after launch state={:?} position={pos}", state(&app, entity));
        assert_eq!(state(&app, entity), ControllerState::Rising);
        assert!(events_for(&app, entity).contains(&ControllerEvent::GroundContactLost));
        assert!(pos.y > 0.15);
    }

    #[test]
    fn set_momentum_command_replaces_momentum() {
        let mut app = create_test_app(PlaneGround::new());
        let entity = spawn_walker(&mut app, Vec3::ZERO);
        tick(&mut app);

        app.world_mut()
            .send_event(MomentumCommand::set(entity, Vec3::Z * 3.0));
        tick(&mut app);

        let momentum = walker(&app, entity).momentum(&BodyFrame::IDENTITY);
        println!("PROOF: momentum after set={momentum}");
        assert!(momentum.x.abs() < 0.0001);
        assert!((momentum.z - (3.0 - 0.5 * DT)).abs() < 0.001);
        assert!((momentum.y + 30.0 * DT).abs() < 0.001);
    }
}

// ==================== Ceiling Tests ====================

mod ceiling {
    use super::*;

    #[test]
    fn ceiling_contact_ends_rise() {
        let mut app = create_test_app(PlaneGround::flat(0.0));
        let entity = spawn_walker(&mut app, Vec3::ZERO);
        app.world_mut()
            .entity_mut(entity)
            .insert(CeilingDetector::new(CeilingSettings::default()));
        tick(&mut app);

        app.world_mut()
            .send_event(MomentumCommand::add(entity, Vec3::Y * 12.0));
        tick(&mut app);
        assert_eq!(state(&app, entity), ControllerState::Rising);

        app.world_mut()
            .get_mut::<ContactReport>(entity)
            .unwrap()
            .push_collision([Vec3::NEG_Y]);
        tick(&mut app);

        let velocity = app.world().get::<BodyVelocity>(entity).unwrap().0;
        println!("PROOF: after ceiling state={:?} velocity={velocity}", state(&app, entity));
        assert_eq!(state(&app, entity), ControllerState::Falling);
        assert!(events_for(&app, entity).contains(&ControllerEvent::CeilingContact));
        assert!(velocity.y <= 0.0);
        assert!(!app.world().get::<CeilingDetector>(entity).unwrap().hit_ceiling());
        assert!(app.world().get::<ContactReport>(entity).unwrap().is_empty());
    }

    #[test]
    fn wall_contact_is_not_a_ceiling() {
        let mut app = create_test_app(PlaneGround::flat(0.0));
        let entity = spawn_walker(&mut app, Vec3::ZERO);
        app.world_mut()
            .entity_mut(entity)
            .insert(CeilingDetector::new(CeilingSettings::default()));
        tick(&mut app);
        app.world_mut()
            .send_event(MomentumCommand::add(entity, Vec3::Y * 12.0));
        tick(&mut app);

        app.world_mut()
            .get_mut::<ContactReport>(entity)
            .unwrap()
            .push_collision([Vec3::X]);
        tick(&mut app);

        println!("PROOF: after wall contact state={:?}", state(&app, entity));
        assert_eq!(state(&app, entity), ControllerState::Rising);
    }
}

// ==================== Cancellation Tests ====================

mod halting {
    use super::*;

    #[test]
    fn invalid_settings_halt_controller() {
        let mut app = create_test_app(PlaneGround::new());
        let entity = app
            .world_mut()
            .spawn((
                Transform::default(),
                CharacterWalker::default(),
                ControllerSettings::default().with_movement_speed(0.0),
            ))
            .id();

        run_frames(&mut app, 30);

        println!("PROOF: halted={}", app.world().get::<LocomotionHalted>(entity).is_some());
        assert!(app.world().get::<LocomotionHalted>(entity).is_some());
        assert_eq!(position(&app, entity), Vec3::ZERO);
        assert_eq!(state(&app, entity), ControllerState::Falling);
    }

    #[test]
    fn halted_walker_stops_every_cadence() {
        let mut app = create_test_app(PlaneGround::flat(0.0));
        let entity = spawn_walker(&mut app, Vec3::ZERO);
        let model = app
            .world_mut()
            .spawn((Transform::default(), TurnController::new(entity, TurnSettings::default())))
            .id();
        tick(&mut app);
        set_intent(&mut app, entity, Vec3::X, false);
        run_frames(&mut app, 5);

        app.world_mut().entity_mut(entity).insert(LocomotionHalted);
        let frozen_position = position(&app, entity);
        let frozen_rotation = app.world().get::<Transform>(model).unwrap().rotation;
        let frozen_readout = *app.world().get::<LocomotionReadout>(entity).unwrap();

        set_intent(&mut app, entity, Vec3::NEG_Z, false);
        run_frames(&mut app, 20);

        println!("PROOF: position {frozen_position} -> {}", position(&app, entity));
        assert_eq!(position(&app, entity), frozen_position);
        assert_eq!(app.world().get::<Transform>(model).unwrap().rotation, frozen_rotation);
        assert_eq!(*app.world().get::<LocomotionReadout>(entity).unwrap(), frozen_readout);
    }

    #[test]
    fn despawn_removes_controller_with_entity() {
        let mut app = create_test_app(PlaneGround::flat(0.0));
        let entity = spawn_walker(&mut app, Vec3::ZERO);
        run_frames(&mut app, 3);

        app.world_mut().despawn(entity);
        run_frames(&mut app, 3);

        assert!(app.world().get_entity(entity).is_err());
    }
}

// ==================== Frame Cadence Tests ====================

mod frame_cadence {
    use super::*;

    #[test]
    fn model_turns_toward_velocity() {
        let mut app = create_test_app(PlaneGround::flat(0.0));
        let entity = spawn_walker(&mut app, Vec3::ZERO);
        let model = app
            .world_mut()
            .spawn((Transform::default(), TurnController::new(entity, TurnSettings::default())))
            .id();
        tick(&mut app);

        set_intent(&mut app, entity, Vec3::X, false);
        run_frames(&mut app, 60);

        let forward = app.world().get::<Transform>(model).unwrap().rotation * Vec3::NEG_Z;
        println!("PROOF: model forward={forward}");
        assert!((forward - Vec3::X).length() < 0.01);
    }

    #[test]
    fn idle_walker_keeps_model_heading() {
        let mut app = create_test_app(PlaneGround::flat(0.0));
        let entity = spawn_walker(&mut app, Vec3::ZERO);
        let start = Quat::from_rotation_y(0.7);
        let model = app
            .world_mut()
            .spawn((
                Transform::from_rotation(start),
                TurnController::new(entity, TurnSettings::default()).with_yaw(0.7f32.to_degrees()),
            ))
            .id();

        run_frames(&mut app, 30);

        let rotation = app.world().get::<Transform>(model).unwrap().rotation;
        println!("PROOF: idle model rotation={rotation}");
        assert_eq!(rotation, start);
    }

    #[test]
    fn readout_reports_normal_velocity() {
        let mut app = create_test_app(PlaneGround::flat(0.0));
        let entity = spawn_walker(&mut app, Vec3::ZERO);
        tick(&mut app);

        let readout = *app.world().get::<LocomotionReadout>(entity).unwrap();
        assert!(readout.is_idle);
        assert!(readout.is_grounded);

        set_intent(&mut app, entity, Vec3::new(0.0, 0.0, -0.5), false);
        tick(&mut app);

        let readout = *app.world().get::<LocomotionReadout>(entity).unwrap();
        println!("PROOF: readout={readout:?}");
        assert!((readout.normal_velocity - Vec3::new(0.0, 0.0, -0.5)).length() < 0.001);
        assert!(!readout.is_idle);
        assert!(!readout.is_sliding);
        assert_eq!(readout.state, ControllerState::Grounded);
    }
}
