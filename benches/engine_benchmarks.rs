//! Benchmarks for the per-frame evaluation path

use capture_guidance::{
    angles::CaptureAngle,
    config::EngineConfig,
    filters::create_filter,
    geometry::{BoundingBox, Point2},
    head_pose::{DetectedFace, Landmark, LandmarkKind},
    lighting::LuminanceHistogram,
    sensor_fusion::{OrientationFilter, RawSensorSample},
    session::CaptureSession,
    silhouette::calculate_iou,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Vector3;

/// Noisy stationary IMU stream at 100 Hz
fn sensor_stream(num_samples: u64) -> Vec<RawSensorSample> {
    (0..num_samples)
        .map(|i| {
            let noise = || 0.02 * (rand::random::<f64>() - 0.5);
            RawSensorSample::new(
                Vector3::new(noise(), noise(), noise()),
                Vector3::new(noise() * 10.0, noise() * 10.0, 9.81 + noise() * 10.0),
                i * 10,
            )
        })
        .collect()
}

fn face(timestamp_ms: u64) -> DetectedFace {
    let landmark = |kind, x, y| Landmark {
        kind,
        position: Point2::new(x, y),
    };
    DetectedFace {
        bounds: BoundingBox::centered(0.5, 0.5, 0.33, 0.24),
        yaw: 0.5 * (rand::random::<f64>() - 0.5),
        pitch: 0.0,
        roll: 0.0,
        landmarks: vec![
            landmark(LandmarkKind::LeftEye, 400.0, 500.0),
            landmark(LandmarkKind::RightEye, 680.0, 500.0),
            landmark(LandmarkKind::NoseBase, 540.0, 700.0),
        ],
        eyes_open_probability: Some(0.9),
        smiling_probability: None,
        timestamp_ms,
    }
}

fn benchmark_sensor_fusion(c: &mut Criterion) {
    let mut group = c.benchmark_group("sensor_fusion");
    let samples = sensor_stream(100);

    for smoothing in ["none", "exponential", "kalman"] {
        let mut config = EngineConfig::default().sensor_fusion;
        config.smoothing = smoothing.to_string();
        let Ok(mut filter) = OrientationFilter::new(&config) else {
            continue;
        };

        group.bench_with_input(BenchmarkId::new("sequence_100", smoothing), &samples, |b, data| {
            b.iter(|| {
                filter.reset();
                for sample in data {
                    black_box(filter.fuse(black_box(sample)));
                }
            });
        });
    }

    group.finish();
}

fn benchmark_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("angle_filters");
    for name in ["kalman", "exponential:0.3"] {
        let Ok(mut filter) = create_filter(name) else {
            continue;
        };
        group.bench_function(BenchmarkId::new("single_update", name), |b| {
            b.iter(|| black_box(filter.apply(black_box(12.5))));
        });
    }
    group.finish();
}

fn benchmark_iou(c: &mut Criterion) {
    let a = BoundingBox::centered(0.5, 0.5, 0.33, 0.24);
    let b = BoundingBox::centered(0.52, 0.48, 0.30, 0.22);
    c.bench_function("iou", |bench| {
        bench.iter(|| black_box(calculate_iou(black_box(&a), black_box(&b))));
    });
}

fn benchmark_session_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");
    let lighting = LuminanceHistogram::uniform(60, 239, 10);
    let region = Some(BoundingBox::centered(0.5, 0.5, 0.35, 0.2));
    let frames: Vec<(RawSensorSample, DetectedFace)> = sensor_stream(90)
        .into_iter()
        .map(|sample| {
            let t = sample.timestamp_ms * 33 / 10;
            (RawSensorSample { timestamp_ms: t, ..sample }, face(t))
        })
        .collect();

    for angle in [CaptureAngle::Front, CaptureAngle::Vertex] {
        let Ok(mut session) = CaptureSession::for_angle(EngineConfig::default(), angle) else {
            continue;
        };
        session.ingest_luminance(&lighting);
        session.ingest_region(region);

        group.bench_with_input(BenchmarkId::new("frame", angle.as_str()), &frames[0], |b, (sample, face)| {
            b.iter(|| {
                let _ = session.ingest_sensor(black_box(sample));
                session.ingest_face(Some(black_box(face)));
                black_box(session.tick(sample.timestamp_ms))
            });
        });

        group.bench_with_input(BenchmarkId::new("sequence_90", angle.as_str()), &frames, |b, data| {
            b.iter(|| {
                session.reset();
                for (sample, face) in data {
                    let _ = session.ingest_sensor(sample);
                    session.ingest_face(Some(face));
                    session.ingest_region(region);
                    black_box(session.tick(sample.timestamp_ms));
                }
            });
        });
    }

    group.finish();
}

fn benchmark_lighting(c: &mut Criterion) {
    let frame: Vec<u8> = (0..320 * 240)
        .flat_map(|i: u32| {
            let v = u8::try_from(i % 256).unwrap_or(u8::MAX);
            [v, v, v, 255]
        })
        .collect();
    c.bench_function("lighting_rgba_320x240", |b| {
        b.iter(|| {
            LuminanceHistogram::from_rgba(320, 240, black_box(&frame)).map(|h| black_box(h.analyze()))
        });
    });
}

criterion_group!(
    benches,
    benchmark_sensor_fusion,
    benchmark_filters,
    benchmark_iou,
    benchmark_session_tick,
    benchmark_lighting
);
criterion_main!(benches);
