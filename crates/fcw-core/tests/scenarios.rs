//! End-to-end FCW scenarios through the engine

use fcw_core::{
    BoundingBox, CameraConfig, FcwConfig, FcwEngine, FrameMeta, GroundPosition, ImageSpace, RiskLevel,
    SkipReason, TrackId, TrackedObject, VelocitySource, WarningResult,
};

const FPS: f64 = 25.0;

fn scenario_config() -> FcwConfig {
    let mut config = FcwConfig::default();
    config.fcw.danger_zone = vec![[3.0, 1.5], [10.0, 1.5], [10.0, -1.5], [3.0, -1.5]];
    config.fcw.vehicle_length = 4.6;
    config.fcw.vehicle_width = 1.8;
    config.fcw.vehicle_zone_buffer = 0.5;
    config.fcw.prediction_length = 1.0;
    config.fcw.prediction_step = 0.1;
    config
}

fn camera_config() -> CameraConfig {
    CameraConfig {
        d: vec![-0.12, 0.03, 0.0005, -0.0003, 0.0],
        ..Default::default()
    }
}

/// Box whose bottom centre sits on `ground`
fn track_at(engine: &FcwEngine, id: u64, ground: GroundPosition) -> TrackedObject {
    let calibration = engine.calibration().load();
    let p = calibration
        .camera
        .ground_to_image(&ground, ImageSpace::Raw)
        .expect("ground point visible");
    TrackedObject::new(id, "car", BoundingBox::new(p.x - 25.0, p.y - 50.0, p.x + 25.0, p.y))
}

/// Feed `frames` consecutive frames of tracks moving at constant velocity,
/// ending at their start positions, and return the last result
fn run(engine: &mut FcwEngine, tracks: &[(u64, GroundPosition, (f64, f64))], frames: u64) -> WarningResult {
    let dt = 1.0 / FPS;
    let mut result = None;
    for k in 0..frames {
        let back = (frames - 1 - k) as f64 * dt;
        let objects: Vec<TrackedObject> = tracks
            .iter()
            .map(|&(id, end, (vx, vy))| track_at(engine, id, end.advanced(vx, vy, -back)))
            .collect();
        let frame = FrameMeta::new(k, k * 40_000_000, FPS);
        result = Some(engine.process_frame(&frame, &objects).expect("frame processed"));
    }
    result.expect("at least one frame")
}

#[test]
fn track_inside_zone_is_flagged_immediately() {
    let mut engine = FcwEngine::new(&camera_config(), &scenario_config()).unwrap();
    let result = run(&mut engine, &[(1, GroundPosition::new(8.0, 0.0), (-2.0, 0.0))], 2);

    assert!(result.warning);
    let track = result.track(TrackId(1)).unwrap();
    assert_eq!(track.velocity.source, VelocitySource::Estimated);
    assert!((track.velocity.vx + 2.0).abs() < 1e-4);

    let xs: Vec<f64> = track.predicted_path.iter().map(|s| s.position.x).collect();
    assert_eq!(xs.len(), 10);
    assert!((xs[0] - 7.8).abs() < 1e-4);
    assert!((xs[9] - 6.0).abs() < 1e-3);

    let urgent = result.most_urgent.unwrap();
    assert_eq!(urgent.id, TrackId(1));
    assert!((urgent.time_to_intersection - 0.1).abs() < 1e-9);
    assert!((urgent.dangerous_distance - 7.5).abs() < 1e-4);
    assert_eq!(track.risk, RiskLevel::Critical);
}

#[test]
fn track_beyond_safety_radius_is_culled() {
    let mut config = scenario_config();
    config.fcw.safety_radius = 50.0;
    let mut engine = FcwEngine::new(&camera_config(), &config).unwrap();

    let result = run(&mut engine, &[(3, GroundPosition::new(80.0, 0.0), (-30.0, 0.0))], 2);
    assert!(!result.warning);
    assert!(result.tracks.is_empty());
    assert!(result.track(TrackId(3)).is_none());
    assert_eq!(result.culled, 1);
}

#[test]
fn stationary_track_has_constant_path() {
    let mut engine = FcwEngine::new(&camera_config(), &scenario_config()).unwrap();
    let start = GroundPosition::new(15.0, 3.0);
    let result = run(&mut engine, &[(2, start, (0.0, 0.0))], 3);

    let track = result.track(TrackId(2)).unwrap();
    assert_eq!(track.predicted_path.len(), 10);
    for sample in track.predicted_path.iter() {
        assert!(sample.position.distance_to(&track.position) < 1e-9);
        assert!(sample.position.distance_to(&start) < 1e-6);
    }
    assert!(!track.in_danger);
}

#[test]
fn new_track_is_treated_as_stationary() {
    let mut engine = FcwEngine::new(&camera_config(), &scenario_config()).unwrap();
    let result = run(&mut engine, &[(4, GroundPosition::new(12.0, 0.0), (-5.0, 0.0))], 1);
    let track = result.track(TrackId(4)).unwrap();
    assert_eq!(track.velocity.source, VelocitySource::Stationary);
    assert!(!track.in_danger);
}

#[test]
fn head_on_time_to_intersection_within_one_step() {
    let mut config = scenario_config();
    config.fcw.prediction_length = 3.0;
    let mut engine = FcwEngine::new(&camera_config(), &config).unwrap();

    let start = GroundPosition::new(20.0, 0.2);
    let speed = 5.0;
    let result = run(&mut engine, &[(6, start, (-speed, 0.0))], 4);

    // Buffered zone edge sits at x = 10.5
    let expected = (start.x - 10.5) / speed;
    let tti = result.track(TrackId(6)).unwrap().time_to_intersection.unwrap();
    assert!(tti >= expected - 1e-6);
    assert!(tti <= expected + config.fcw.prediction_step + 1e-6);
    assert_eq!(result.level, RiskLevel::Warning);
}

#[test]
fn path_outside_zone_is_never_flagged() {
    let start = GroundPosition::new(12.0, 4.0);
    for radius in [5.0, 10.0, 25.0, 100.0] {
        let mut config = scenario_config();
        config.fcw.safety_radius = radius;
        let mut engine = FcwEngine::new(&camera_config(), &config).unwrap();

        let result = run(&mut engine, &[(7, start, (3.0, 0.0))], 3);
        assert!(!result.warning, "radius {radius}");
        assert!(result.flagged().next().is_none());
        if radius < start.range() {
            assert_eq!(result.culled, 1);
        }
    }
}

#[test]
fn soonest_track_is_most_urgent() {
    let mut engine = FcwEngine::new(&camera_config(), &scenario_config()).unwrap();
    let result = run(
        &mut engine,
        &[
            (10, GroundPosition::new(14.0, 0.0), (-8.0, 0.0)),
            (11, GroundPosition::new(12.0, -0.5), (-8.0, 0.0)),
            (12, GroundPosition::new(9.0, 4.0), (0.0, 0.0)),
        ],
        3,
    );

    assert!(result.warning);
    assert_eq!(result.most_urgent.unwrap().id, TrackId(11));
    let ids: Vec<TrackId> = result.tracks.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![TrackId(10), TrackId(11), TrackId(12)]);
}

#[test]
fn failed_projection_does_not_affect_other_tracks() {
    let mut engine = FcwEngine::new(&camera_config(), &scenario_config()).unwrap();
    let good = track_at(&engine, 1, GroundPosition::new(8.0, 0.0));
    let sky = TrackedObject::new(2, "car", BoundingBox::new(600.0, 80.0, 680.0, 160.0));

    let result = engine
        .process_frame(&FrameMeta::new(0, 0, FPS), &[sky, good])
        .unwrap();
    assert_eq!(result.tracks.len(), 1);
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].id, TrackId(2));
    assert_eq!(result.skipped[0].reason, SkipReason::NoGroundIntersection);
    assert!(result.warning);
}

#[test]
fn parallel_evaluation_matches_sequential() {
    let tracks: Vec<(u64, GroundPosition, (f64, f64))> = (0..12)
        .map(|i| {
            let i = i as u64;
            (
                30 - i,
                GroundPosition::new(6.0 + i as f64, -3.0 + 0.5 * i as f64),
                (-1.0 - 0.3 * i as f64, 0.2),
            )
        })
        .collect();

    let mut sequential = FcwEngine::new(&camera_config(), &scenario_config()).unwrap();
    let mut config = scenario_config();
    config.fcw.parallel = true;
    let mut parallel = FcwEngine::new(&camera_config(), &config).unwrap();

    let a = run(&mut sequential, &tracks, 3);
    let b = run(&mut parallel, &tracks, 3);
    assert_eq!(a, b);
}

#[test]
fn expired_tracks_lose_their_history() {
    let mut engine = FcwEngine::new(&camera_config(), &scenario_config()).unwrap();
    run(&mut engine, &[(1, GroundPosition::new(12.0, 0.0), (-2.0, 0.0))], 2);

    // Track 1 missing from frame 2, reappears in frame 3 without history
    engine
        .process_frame(&FrameMeta::new(2, 80_000_000, FPS), &[])
        .unwrap();
    let track = track_at(&engine, 1, GroundPosition::new(11.9, 0.0));
    let result = engine
        .process_frame(&FrameMeta::new(3, 120_000_000, FPS), &[track])
        .unwrap();
    assert_eq!(
        result.track(TrackId(1)).unwrap().velocity.source,
        VelocitySource::Stationary
    );
}

#[test]
fn zero_horizon_points_give_level_pose() {
    let engine = FcwEngine::new(&camera_config(), &scenario_config()).unwrap();
    let calibration = engine.calibration().load();
    let pose = calibration.camera.pose();
    assert!(pose.roll.abs() < 1e-12);
    assert!(pose.pitch.abs() < 1e-12);
    assert!(pose.yaw.abs() < 1e-12);
    assert!((pose.vanishing_point.x - 640.0).abs() < 1e-9);
    assert!((pose.vanishing_point.y - 360.0).abs() < 1e-9);
}
