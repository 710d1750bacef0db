use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tagloc_image::{Image, ImageSize};
use tagloc_imgproc::{
    calibration::{CalibrationParameters, FisheyeDistortion},
    rectify::{RectificationCache, RectificationMap},
};

fn calibration() -> CalibrationParameters {
    CalibrationParameters::new(
        [[612.0, 0.0, 640.0], [0.0, 611.0, 360.0], [0.0, 0.0, 1.0]],
        FisheyeDistortion::from_array([-0.03, 0.005, -0.001, 0.0001]),
    )
    .expect("valid calibration")
}

fn bench_map_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("RectificationMapBuild");

    for (width, height) in [(320, 240), (640, 480), (1280, 720)].iter() {
        group.throughput(criterion::Throughput::Elements((*width * *height) as u64));

        let parameter_string = format!("{}x{}", width, height);
        let size: ImageSize = [*width, *height].into();
        let params = calibration();

        group.bench_with_input(
            BenchmarkId::new("fisheye", &parameter_string),
            &size,
            |b, size| b.iter(|| RectificationMap::new(black_box(&params), *size)),
        );
    }
    group.finish();
}

fn bench_rectify(c: &mut Criterion) {
    let mut group = c.benchmark_group("Rectify");

    for (width, height) in [(320, 240), (640, 480), (1280, 720)].iter() {
        group.throughput(criterion::Throughput::Elements((*width * *height) as u64));

        let parameter_string = format!("{}x{}", width, height);
        let size: ImageSize = [*width, *height].into();

        let image = Image::<u8, 3>::new(size, vec![0u8; width * height * 3]).unwrap();
        let cache = RectificationCache::with_size(calibration(), size).unwrap();

        group.bench_with_input(
            BenchmarkId::new("cached_bilinear", &parameter_string),
            &image,
            |b, image| b.iter(|| cache.apply(black_box(image), size)),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_map_build, bench_rectify);
criterion_main!(benches);
