use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fsm_motion::capture::{Camera, CaptureConfig, MockCamera};
use fsm_motion::config::DetectionConfig;
use fsm_motion::detection::{linearize_pair, MotionDetector};

fn benchmark_default_cycle(c: &mut Criterion) {
    let config = CaptureConfig::default();
    let mut camera = MockCamera::new();
    camera.open(&config).unwrap();
    let a = camera.capture().unwrap();
    let b = camera.capture().unwrap();

    let mut detector =
        MotionDetector::new(config.width, config.height, &DetectionConfig::default()).unwrap();

    // 640x480, 1200 chunks
    c.bench_function("run_cycle_640x480", |bench| {
        bench.iter(|| detector.run_cycle(black_box(&a), black_box(&b)).unwrap())
    });
}

fn benchmark_linearize(c: &mut Criterion) {
    let config = CaptureConfig::default();
    let mut camera = MockCamera::new();
    camera.open(&config).unwrap();
    let a = camera.capture().unwrap();
    let b = camera.capture().unwrap();

    c.bench_function("linearize_pair_640x480", |bench| {
        bench.iter(|| linearize_pair(black_box(&a), black_box(&b)))
    });
}

criterion_group!(benches, benchmark_default_cycle, benchmark_linearize);
criterion_main!(benches);
