use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fryum_inspect::{Inspector, PipelineConfig, Provenance};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;

/// Pellet with six windows, a center hole and one dark spot
fn synthetic_frame() -> RgbImage {
    let mut image = RgbImage::from_pixel(400, 360, Rgb([40, 160, 60]));
    draw_filled_circle_mut(&mut image, (200, 180), 130, Rgb([225, 200, 150]));
    for k in 0..6 {
        let angle = k as f64 * std::f64::consts::PI / 3.0;
        let x = 200.0 + 80.0 * angle.cos();
        let y = 180.0 + 80.0 * angle.sin();
        let rect = Rect::at(x.round() as i32 - 10, y.round() as i32 - 10).of_size(20, 20);
        draw_filled_rect_mut(&mut image, rect, Rgb([40, 160, 60]));
    }
    draw_filled_circle_mut(&mut image, (200, 180), 25, Rgb([40, 160, 60]));
    draw_filled_rect_mut(&mut image, Rect::at(240, 120).of_size(8, 8), Rgb([60, 40, 30]));
    image
}

fn benchmark_inspection(c: &mut Criterion) {
    let inspector = Inspector::new(PipelineConfig::default()).unwrap();
    let frame = synthetic_frame();

    c.bench_function("inspect_candidate", |b| {
        b.iter(|| inspector.inspect(black_box(&frame), Provenance::in_memory("bench.png", true)))
    });

    c.bench_function("inspect_normal", |b| {
        b.iter(|| inspector.inspect(black_box(&frame), Provenance::in_memory("bench.png", false)))
    });
}

criterion_group!(benches, benchmark_inspection);
criterion_main!(benches);
