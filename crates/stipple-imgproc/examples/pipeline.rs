use stipple_image::{ChannelMask, Image};
use stipple_imgproc::{
    canny::canny,
    context::ExecutionContext,
    filter::{despeckle, motion_blur, unsharp_mask},
    parallel::ExecutionStrategy,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // a noisy disc on a dark background
    let (cols, rows) = (128usize, 96usize);
    let data = (0..cols * rows)
        .flat_map(|i| {
            let (x, y) = ((i % cols) as f64 - 64.0, (i / cols) as f64 - 48.0);
            let base = if x.hypot(y) < 30.0 { 200u8 } else { 30 };
            let noise = if i % 37 == 0 { 60 } else { 0 };
            [base.saturating_add(noise), base, base / 2]
        })
        .collect();
    let image = Image::<u8, 3>::new([cols, rows].into(), data)?;

    let monitor = |tag: &str, done: u64, total: u64| {
        if done == total {
            log::info!("{tag} done");
        }
        true
    };
    let ctx = ExecutionContext::default()
        .with_strategy(ExecutionStrategy::Fixed(4))
        .with_monitor(&monitor);

    let clean = despeckle(&image, ChannelMask::DEFAULT, &ctx)?;
    let sharp = unsharp_mask(&clean, ChannelMask::DEFAULT, 0.0, 1.0, 1.2, 0.02, &ctx)?;
    let moved = motion_blur(&sharp, ChannelMask::DEFAULT, 6.0, 2.0, 30.0, &ctx)?;
    let edges = canny(&sharp, 0.0, 1.0, 0.1, 0.3, &ctx)?;

    let count = edges.as_slice().iter().filter(|v| **v > 0).count();
    log::info!("{} edge pixels out of {}", count, cols * rows);
    log::info!("motion blurred size: {}", moved.size());

    Ok(())
}
