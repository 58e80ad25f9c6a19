use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use stipple_image::{ChannelMask, Image};
use stipple_imgproc::{
    canny::canny,
    context::ExecutionContext,
    filter::{blur, despeckle, gaussian_blur, motion_blur},
    parallel::ExecutionStrategy,
};

use image::RgbImage;
use imageproc::filter::gaussian_blur_f32;

fn bench_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("Gaussian Blur");

    for (width, height) in [(256, 224), (512, 448), (1024, 896)].iter() {
        for sigma in [0.5, 1.0, 2.0].iter() {
            group.throughput(criterion::Throughput::Elements((*width * *height) as u64));

            let parameter_string = format!("{}x{}x{}", width, height, sigma);

            // input image
            let image_data = (0..width * height * 3).map(|i| (i % 251) as u8).collect();
            let image = Image::<u8, 3>::new([*width, *height].into(), image_data).unwrap();

            let parallel = ExecutionContext::default();
            let serial = ExecutionContext::default().with_strategy(ExecutionStrategy::Serial);

            group.bench_with_input(
                BenchmarkId::new("gaussian_blur_square", &parameter_string),
                &image,
                |b, i| {
                    b.iter(|| {
                        black_box(gaussian_blur(i, ChannelMask::DEFAULT, 0.0, *sigma, &parallel))
                    })
                },
            );

            group.bench_with_input(
                BenchmarkId::new("blur_separable", &parameter_string),
                &image,
                |b, i| {
                    b.iter(|| black_box(blur(i, ChannelMask::DEFAULT, 0.0, *sigma, &parallel)))
                },
            );

            group.bench_with_input(
                BenchmarkId::new("blur_separable_serial", &parameter_string),
                &image,
                |b, i| b.iter(|| black_box(blur(i, ChannelMask::DEFAULT, 0.0, *sigma, &serial))),
            );

            group.bench_with_input(
                BenchmarkId::new("gaussian_blur_imageproc", &parameter_string),
                &image,
                |b, i| {
                    let rgb_image =
                        RgbImage::from_raw(i.cols() as u32, i.rows() as u32, i.as_slice().to_vec())
                            .unwrap();
                    b.iter(|| black_box(gaussian_blur_f32(&rgb_image, *sigma as f32)))
                },
            );
        }
    }

    group.finish();
}

fn bench_effects(c: &mut Criterion) {
    let mut group = c.benchmark_group("Effects");

    for (width, height) in [(256, 224), (512, 448)].iter() {
        let parameter_string = format!("{}x{}", width, height);
        group.throughput(criterion::Throughput::Elements((*width * *height) as u64));

        let image_data = (0..width * height * 3).map(|i| (i % 97) as u8).collect();
        let image = Image::<u8, 3>::new([*width, *height].into(), image_data).unwrap();
        let ctx = ExecutionContext::default();

        group.bench_with_input(
            BenchmarkId::new("despeckle", &parameter_string),
            &image,
            |b, i| b.iter(|| black_box(despeckle(i, ChannelMask::DEFAULT, &ctx))),
        );

        group.bench_with_input(
            BenchmarkId::new("motion_blur", &parameter_string),
            &image,
            |b, i| b.iter(|| black_box(motion_blur(i, ChannelMask::DEFAULT, 5.0, 2.0, 30.0, &ctx))),
        );

        group.bench_with_input(
            BenchmarkId::new("canny", &parameter_string),
            &image,
            |b, i| b.iter(|| black_box(canny(i, 0.0, 1.0, 0.1, 0.3, &ctx))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_filters, bench_effects);
criterion_main!(benches);
