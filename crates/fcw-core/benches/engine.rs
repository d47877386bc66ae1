use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fcw_core::{
    BoundingBox, CameraConfig, FcwConfig, FcwEngine, FrameMeta, GroundPosition, ImageSpace, TrackedObject,
};

fn make_tracks(engine: &FcwEngine, n: usize, frame: u64) -> Vec<TrackedObject> {
    let calibration = engine.calibration().load();
    (0..n)
        .filter_map(|i| {
            let lateral = -6.0 + 12.0 * (i as f64 + 0.5) / n as f64;
            let ground = GroundPosition::new(25.0 - 0.05 * frame as f64, lateral);
            let p = calibration.camera.ground_to_image(&ground, ImageSpace::Raw).ok()?;
            Some(TrackedObject::new(
                i as u64,
                "car",
                BoundingBox::new(p.x - 10.0, p.y - 20.0, p.x + 10.0, p.y),
            ))
        })
        .collect()
}

fn bench_engine(c: &mut Criterion) {
    let camera = CameraConfig {
        d: vec![-0.12, 0.03, 0.0005, -0.0003, 0.0],
        ..Default::default()
    };
    let mut group = c.benchmark_group("engine");

    for parallel in [false, true] {
        for n in [10, 100, 500] {
            let mut config = FcwConfig::default();
            config.fcw.safety_radius = 50.0;
            config.fcw.parallel = parallel;
            let label = if parallel { "parallel" } else { "sequential" };

            group.bench_function(format!("{n}_tracks_{label}"), |b| {
                let mut engine = FcwEngine::new(&camera, &config).unwrap();
                let warmup = make_tracks(&engine, n, 0);
                let tracks = make_tracks(&engine, n, 1);
                engine.process_frame(&FrameMeta::new(0, 0, 30.0), &warmup).unwrap();

                let mut frame = 1;
                b.iter(|| {
                    frame += 1;
                    black_box(engine.process_frame(&FrameMeta::new(frame, 0, 30.0), &tracks).unwrap());
                });
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_engine);
criterion_main!(benches);
