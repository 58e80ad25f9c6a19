use stipple_image::{
    allocator::{alloc_buffer, buffer_len},
    ChannelMask, Image, Sample,
};

use crate::{
    accelerate::{try_accelerated, FilterOp},
    context::ExecutionContext,
    error::{ensure_not_empty, FilterError},
    histogram::is_selected,
    parallel::par_rows,
};

const DESPECKLE_TAG: &str = "Despeckle/Image";

/// Directions of the hull passes, as `(x, y)` offsets.
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (-1, 1)];

/// One channel copied into a plane with a border of one zero sample.
struct Plane {
    cols: usize,
    rows: usize,
    f: Vec<f64>,
    g: Vec<f64>,
}

impl Plane {
    fn new(cols: usize, rows: usize) -> Result<Self, FilterError> {
        let len = buffer_len(cols + 2, rows + 2, 1)?;
        Ok(Self {
            cols,
            rows,
            f: alloc_buffer(len, 0.0)?,
            g: alloc_buffer(len, 0.0)?,
        })
    }

    fn stride(&self) -> usize {
        self.cols + 2
    }

    /// The samples of rows `1..=rows`, where the hull writes.
    fn interior(buf: &mut [f64], stride: usize, rows: usize) -> &mut [f64] {
        &mut buf[stride..stride * (rows + 1)]
    }

    fn load<T: Sample, const C: usize>(&mut self, src: &Image<T, C>, c: usize) {
        let stride = self.stride();
        self.g.fill(0.0);
        for (y, row) in src.as_slice().chunks_exact(self.cols * C).enumerate() {
            let dst = &mut self.f[(y + 1) * stride + 1..(y + 1) * stride + 1 + self.cols];
            for (d, px) in dst.iter_mut().zip(row.chunks_exact(C)) {
                *d = px[c].to_f64();
            }
        }
    }

    fn store<T: Sample, const C: usize>(&self, dst: &mut Image<T, C>, c: usize) {
        let stride = self.stride();
        let cols = self.cols;
        for (y, row) in dst.as_slice_mut().chunks_exact_mut(cols * C).enumerate() {
            let src = &self.f[(y + 1) * stride + 1..(y + 1) * stride + 1 + cols];
            for (px, s) in row.chunks_exact_mut(C).zip(src) {
                px[c] = T::from_f64(*s);
            }
        }
    }

    /// One hull pass along `(dx, dy)`.
    ///
    /// A sample is raised (polarity `+1`) or lowered (`-1`) by one `unit`
    /// when it lags behind its neighbour along the offset by two units, then
    /// raised or lowered again when it lags behind the sample on the other
    /// side while staying below the first one.
    fn hull(
        &mut self,
        (dx, dy): (isize, isize),
        polarity: i8,
        unit: f64,
        ctx: &ExecutionContext<'_>,
    ) -> Result<(), FilterError> {
        let stride = self.stride();
        let (cols, rows) = (self.cols, self.rows);
        let offset = dy * stride as isize + dx;
        let at = |buf: &[f64], i: usize, o: isize| buf[(i as isize + o) as usize];

        {
            let f = &self.f;
            par_rows(ctx, DESPECKLE_TAG, Plane::interior(&mut self.g, stride, rows), stride, |y, row| {
                let base = (y + 1) * stride;
                for x in 1..=cols {
                    let i = base + x;
                    let v = f[i];
                    let r = at(f, i, offset);
                    row[x] = if polarity > 0 && r >= v + 2.0 * unit {
                        v + unit
                    } else if polarity < 0 && r <= v - 2.0 * unit {
                        v - unit
                    } else {
                        v
                    };
                }
                Ok(())
            })?;
        }

        let g = &self.g;
        par_rows(ctx, DESPECKLE_TAG, Plane::interior(&mut self.f, stride, rows), stride, |y, row| {
            let base = (y + 1) * stride;
            for x in 1..=cols {
                let i = base + x;
                let v = g[i];
                let (s, r) = (at(g, i, -offset), at(g, i, offset));
                row[x] = if polarity > 0 && s >= v + 2.0 * unit && r > v {
                    v + unit
                } else if polarity < 0 && s <= v - 2.0 * unit && r < v {
                    v - unit
                } else {
                    v
                };
            }
            Ok(())
        })
    }
}

/// Reduce speckle noise while preserving edges.
///
/// Each selected channel is smoothed by the eight hull passes of Crimmins'
/// complementary hulling algorithm in four directions. Samples outside the
/// image count as zero, which slightly darkens the border. Progress is
/// reported once per processed channel.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `channels` - The channels to filter.
/// * `ctx` - The execution context.
///
/// # Example
///
/// ```
/// use stipple_image::{ChannelMask, Image};
/// use stipple_imgproc::{context::ExecutionContext, filter::despeckle};
///
/// let image = Image::<u8, 1>::from_size_val([5, 5].into(), 0).unwrap();
/// let out = despeckle(&image, ChannelMask::DEFAULT, &ExecutionContext::default()).unwrap();
/// assert_eq!(out, image);
/// ```
pub fn despeckle<T: Sample, const C: usize>(
    src: &Image<T, C>,
    channels: ChannelMask,
    ctx: &ExecutionContext<'_>,
) -> Result<Image<T, C>, FilterError> {
    ensure_not_empty(src)?;

    let op = FilterOp::Despeckle { channels };
    if let Some(dst) = try_accelerated(ctx, &op, src) {
        return Ok(dst);
    }

    let selected = (0..C)
        .filter(|c| is_selected(src, channels, *c))
        .collect::<Vec<_>>();
    let mut dst = src.try_clone()?;
    let mut plane = Plane::new(src.cols(), src.rows())?;
    // one 8-bit step in the sample range
    let unit = T::MAX / 255.0;
    let passes = ctx.without_monitor();

    for (done, &c) in selected.iter().enumerate() {
        plane.load(src, c);
        for direction in DIRECTIONS {
            let reverse = (-direction.0, -direction.1);
            plane.hull(direction, 1, unit, &passes)?;
            plane.hull(reverse, 1, unit, &passes)?;
            plane.hull(reverse, -1, unit, &passes)?;
            plane.hull(direction, -1, unit, &passes)?;
        }
        plane.store(&mut dst, c);

        if !ctx.report(DESPECKLE_TAG, done as u64 + 1, selected.len() as u64) {
            return Err(FilterError::Cancelled(DESPECKLE_TAG));
        }
    }
    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn total_variation(image: &Image<u8, 1>) -> u64 {
        let cols = image.cols();
        let px = image.as_slice();
        let mut tv = 0;
        for (i, v) in px.iter().enumerate() {
            if (i + 1) % cols != 0 {
                tv += v.abs_diff(px[i + 1]) as u64;
            }
            if let Some(below) = px.get(i + cols) {
                tv += v.abs_diff(*below) as u64;
            }
        }
        tv
    }

    fn speckled() -> Result<Image<u8, 1>, FilterError> {
        let mut image = Image::<u8, 1>::from_size_val([7, 7].into(), 100)?;
        image.set([3, 3, 0], 200)?;
        Ok(image)
    }

    #[test]
    fn speckle_is_reduced() -> Result<(), FilterError> {
        let out = despeckle(&speckled()?, ChannelMask::DEFAULT, &ExecutionContext::default())?;
        assert_eq!(out.get([3, 3, 0]), Some(&184));
        assert_eq!(out.get([2, 2, 0]), Some(&101));
        // the zero border pulls the corners down
        assert_eq!(out.get([0, 0, 0]), Some(&94));
        Ok(())
    }

    #[test]
    fn second_pass_does_not_add_variation() -> Result<(), FilterError> {
        let ctx = ExecutionContext::default();
        let once = despeckle(&speckled()?, ChannelMask::DEFAULT, &ctx)?;
        let twice = despeckle(&once, ChannelMask::DEFAULT, &ctx)?;
        assert!(total_variation(&twice) <= total_variation(&once));
        Ok(())
    }

    #[test]
    fn unit_follows_sample_range() -> Result<(), FilterError> {
        let ctx = ExecutionContext::default();
        let narrow = despeckle(&speckled()?, ChannelMask::DEFAULT, &ctx)?;
        let wide = despeckle(&speckled()?.convert::<u16>()?, ChannelMask::DEFAULT, &ctx)?;
        assert_eq!(wide, narrow.convert::<u16>()?);
        Ok(())
    }

    #[test]
    fn progress_per_channel() -> Result<(), FilterError> {
        let image = Image::<u8, 4>::from_size_val([3, 3].into(), 50)?;
        let reports = Mutex::new(Vec::new());
        let monitor = |tag: &str, done: u64, total: u64| {
            reports.lock().map(|mut r| r.push((tag.to_string(), done, total))).is_ok()
        };
        let ctx = ExecutionContext::default().with_monitor(&monitor);
        let out = despeckle(&image, ChannelMask::RED | ChannelMask::ALPHA, &ctx)?;
        // the alpha channel is despeckled too
        assert_eq!(out.get([0, 0, 3]), Some(&44));
        assert_eq!(out.get([0, 0, 1]), Some(&50));

        let reports = reports.into_inner().unwrap_or_default();
        assert_eq!(
            reports,
            vec![
                (DESPECKLE_TAG.to_string(), 1, 2),
                (DESPECKLE_TAG.to_string(), 2, 2)
            ]
        );

        let stop = |_: &str, _: u64, _: u64| false;
        let ctx = ExecutionContext::default().with_monitor(&stop);
        assert_eq!(
            despeckle(&image, ChannelMask::ALL, &ctx),
            Err(FilterError::Cancelled(DESPECKLE_TAG))
        );
        Ok(())
    }
}
