//! Behavioural properties of `decide` over hand-built scenes.

use std::collections::BTreeMap;
use std::fs;

use drive_decision_core::geometry::Vec2;
use drive_decision_core::{decide, Actor, ActorKind, EgoState, SceneSnapshot, SpeedLevel};

fn load_scene(name: &str) -> SceneSnapshot {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    let raw = fs::read_to_string(&path).unwrap_or_else(|e| panic!("failed reading {path}: {e}"));
    serde_json::from_str(&raw).unwrap_or_else(|e| panic!("failed parsing {path}: {e}"))
}

fn open_road() -> SceneSnapshot {
    SceneSnapshot {
        ego: EgoState {
            position: Vec2::ZERO,
            orientation: Vec2::new(1.0, 0.0),
            speed: 5.0,
            length: 4.0,
            width: 2.0,
        },
        target_position: Vec2::new(100.0, 0.0),
        distance_to_red_light: None,
        distance_to_stop_sign: None,
        actors: BTreeMap::new(),
        stop_sign_cleared: false,
    }
}

fn vehicle(x: f64, y: f64) -> Actor {
    Actor {
        kind: ActorKind::Vehicle,
        position: Vec2::new(x, y),
        orientation: Vec2::new(1.0, 0.0),
        speed: 0.0,
        length: 4.0,
        width: 2.0,
    }
}

#[test]
fn oncoming_vehicle_fixture_slows_and_keeps_heading() {
    let scene = load_scene("oncoming-vehicle.json");
    let decision = decide(&scene).expect("fixture is valid");

    assert!(matches!(
        decision.speed_level,
        SpeedLevel::Slow | SpeedLevel::Stop
    ));
    assert_eq!(decision.turn_angle, 0.0);
    assert_eq!(
        decision.hazard.as_ref().map(|h| h.actor_id.as_str()),
        Some("vehicle-1")
    );
}

#[test]
fn lateral_target_is_plus_ninety_degrees() {
    let mut scene = open_road();
    scene.target_position = Vec2::new(0.0, 10.0);
    let decision = decide(&scene).expect("valid");

    assert_eq!(decision.speed_level, SpeedLevel::Move);
    assert!((decision.turn_angle - 90.0).abs() < 1e-9);
}

#[test]
fn empty_scene_moves() {
    let decision = decide(&open_road()).expect("valid");
    assert_eq!(decision.speed_level, SpeedLevel::Move);
    assert_eq!(decision.hazard, None);
    assert_eq!(decision.traffic_control, None);
}

#[test]
fn repeated_calls_are_identical() {
    let mut scene = load_scene("oncoming-vehicle.json");
    scene.actors.insert("parked".to_string(), vehicle(25.0, 1.0));
    scene.distance_to_stop_sign = Some(9.0);

    let first = decide(&scene).expect("valid");
    for _ in 0..16 {
        assert_eq!(decide(&scene).expect("valid"), first);
    }
}

#[test]
fn blocker_inside_contact_forces_stop_regardless_of_others() {
    let mut scene = open_road();
    scene.actors.insert("far".to_string(), vehicle(60.0, 0.0));
    scene.actors.insert("beside".to_string(), vehicle(3.0, 6.0));
    // sqrt(25 + 4) - 6 < 0
    scene.actors.insert("blocker".to_string(), vehicle(5.0, 0.0));

    let decision = decide(&scene).expect("valid");
    assert_eq!(decision.speed_level, SpeedLevel::Stop);
    let hazard = decision.hazard.expect("blocker controls");
    assert_eq!(hazard.actor_id, "blocker");
    assert!(hazard.closing_distance <= 0.0);
}

#[test]
fn actors_behind_never_change_the_level() {
    for x in [-0.5, -3.0, -10.0, -40.0] {
        let mut scene = open_road();
        scene.actors.insert("behind".to_string(), vehicle(x, 0.0));
        assert_eq!(decide(&scene).expect("valid").speed_level, SpeedLevel::Move, "x={x}");
    }
}

#[test]
fn laterally_clear_actors_never_change_the_level() {
    for y in [2.3, -2.3, 3.5, -8.0] {
        let mut scene = open_road();
        scene.actors.insert("adjacent".to_string(), vehicle(6.0, y));
        assert_eq!(decide(&scene).expect("valid").speed_level, SpeedLevel::Move, "y={y}");
    }
}

#[test]
fn red_light_rule_wins_over_stop_sign_completion() {
    let mut scene = open_road();
    scene.ego.speed = 0.0;
    scene.distance_to_red_light = Some(1.0);
    scene.distance_to_stop_sign = Some(1.0);
    scene.stop_sign_cleared = true;

    let decision = decide(&scene).expect("valid");
    assert_eq!(decision.speed_level, SpeedLevel::Stop);

    scene.ego.speed = 3.0;
    assert_eq!(decide(&scene).expect("valid").speed_level, SpeedLevel::Slow);
}

#[test]
fn stop_sign_is_released_after_a_full_stop() {
    let mut scene = open_road();
    scene.ego.speed = 0.05;
    scene.distance_to_stop_sign = Some(0.0);

    let first = decide(&scene).expect("valid");
    assert_eq!(first.speed_level, SpeedLevel::Move);
    assert!(first.stop_sign_cleared);

    // The harness threads the flag back; same spot, still permitted to go.
    scene.stop_sign_cleared = first.stop_sign_cleared;
    for _ in 0..5 {
        let next = decide(&scene).expect("valid");
        assert_eq!(next.speed_level, SpeedLevel::Move);
        scene.stop_sign_cleared = next.stop_sign_cleared;
    }

    scene.ego.speed = 1.0;
    assert_eq!(decide(&scene).expect("valid").speed_level, SpeedLevel::Move);
}

#[test]
fn rolling_through_a_stop_sign_is_stopped() {
    let mut scene = open_road();
    scene.ego.speed = 2.0;
    scene.distance_to_stop_sign = Some(0.0);
    assert_eq!(decide(&scene).expect("valid").speed_level, SpeedLevel::Stop);
}

#[test]
fn turn_angle_stays_in_range() {
    let targets = [
        Vec2::new(-1.0, 0.0),
        Vec2::new(-1.0, -1e-12),
        Vec2::new(-5.0, 3.0),
        Vec2::new(0.0, -7.0),
        Vec2::new(3.0, -0.1),
        Vec2::ZERO,
    ];
    let headings = [
        Vec2::new(1.0, 0.0),
        Vec2::new(0.0, -3.0),
        Vec2::new(-2.0, -2.0),
        Vec2::new(0.3, 0.9),
    ];
    for heading in headings {
        for target in targets {
            let mut scene = open_road();
            scene.ego.orientation = heading;
            scene.target_position = target;
            let angle = decide(&scene).expect("valid").turn_angle;
            assert!(
                (-180.0..=180.0).contains(&angle),
                "heading={heading:?} target={target:?} angle={angle}"
            );
        }
    }
}

#[test]
fn overflowing_actor_offset_is_not_a_hazard() {
    let mut scene = open_road();
    scene.ego.position = Vec2::new(-1e308, 0.0);
    scene.actors.insert("far".to_string(), vehicle(1e308, 0.0));
    let decision = decide(&scene).expect("finite inputs are valid");
    assert_eq!(decision.hazard, None);
    assert_eq!(decision.speed_level, SpeedLevel::Move);
    assert!(decision.turn_angle.is_finite());
}

#[test]
fn coincident_target_stops_with_zero_angle() {
    let mut scene = open_road();
    scene.target_position = scene.ego.position;
    let decision = decide(&scene).expect("valid");
    assert_eq!(decision.speed_level, SpeedLevel::Stop);
    assert_eq!(decision.turn_angle, 0.0);
}

#[test]
fn malformed_input_names_the_field() {
    let mut scene = open_road();
    scene.ego.length = -1.0;
    let err = decide(&scene).expect_err("negative length");
    assert_eq!(err.to_string(), "EGO_LENGTH must be > 0, got -1");

    let mut scene = open_road();
    scene.actors.insert(
        "ghost".to_string(),
        Actor {
            position: Vec2::new(f64::INFINITY, 0.0),
            ..vehicle(0.0, 0.0)
        },
    );
    let err = decide(&scene).expect_err("infinite actor position");
    assert_eq!(
        err.to_string(),
        "ACTOR_POSITION of actor 'ghost' must be finite"
    );
}
