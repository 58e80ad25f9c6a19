use stipple_image::{ChannelKind, ChannelMask, Image, Sample};

use crate::core::perceptible_reciprocal;

/// How a filter treats one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    /// Not selected, keeps the source value.
    Skip,
    /// Color or gray, weighted by alpha when alpha is selected.
    Color,
    /// Black plate, weighted by alpha when alpha is selected.
    Black,
    /// Alpha, accumulated without weighting.
    Alpha,
}

/// Per-channel roles of a filter call, resolved once from the mask.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ChannelPlan<const C: usize> {
    pub roles: [Role; C],
    /// Alpha channel index when samples are weighted by their alpha.
    pub weight_alpha: Option<usize>,
}

impl<const C: usize> ChannelPlan<C> {
    pub fn new<T>(image: &Image<T, C>, mask: ChannelMask) -> Self {
        let mut roles = [Role::Skip; C];
        for (i, role) in roles.iter_mut().enumerate() {
            let kind = image.channel_kind(i);
            if !mask.contains(kind.mask()) {
                continue;
            }
            *role = match kind {
                ChannelKind::Alpha => Role::Alpha,
                ChannelKind::Black => Role::Black,
                _ => Role::Color,
            };
        }
        let weight_alpha = image
            .alpha_index()
            .filter(|_| mask.contains(ChannelMask::ALPHA));
        Self {
            roles,
            weight_alpha,
        }
    }

    /// Whether no channel is selected.
    pub fn is_noop(&self) -> bool {
        self.roles.iter().all(|r| *r == Role::Skip)
    }

    /// Alpha of `px` in `[0, 1]` when weighting, else 1.
    #[inline]
    pub fn alpha<T: Sample>(&self, px: &[T]) -> f64 {
        match self.weight_alpha {
            Some(a) => px[a].to_unit(),
            None => 1.0,
        }
    }
}

/// Running weighted sums of one output pixel.
///
/// Color and black samples are pre-multiplied by alpha when the plan weights
/// by alpha; `gamma` tracks the matching normalization.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Accumulator<const C: usize> {
    sums: [f64; C],
    gamma: f64,
}

impl<const C: usize> Accumulator<C> {
    #[inline]
    pub fn new() -> Self {
        Self {
            sums: [0.0; C],
            gamma: 0.0,
        }
    }

    /// Add sample `px` with weight `k`.
    #[inline]
    pub fn add<T: Sample>(&mut self, plan: &ChannelPlan<C>, k: f64, px: &[T]) {
        let alpha = plan.alpha(px);
        let ka = k * alpha;
        for (c, role) in plan.roles.iter().enumerate() {
            match role {
                Role::Color | Role::Black => self.sums[c] += ka * px[c].to_f64(),
                Role::Alpha => self.sums[c] += k * px[c].to_f64(),
                Role::Skip => {}
            }
        }
        self.gamma += ka;
    }

    /// Write the selected channels of the result into `dst`.
    ///
    /// Color and black are divided by gamma when weighting by alpha; alpha
    /// and unweighted sums are written as they are.
    #[inline]
    pub fn store<T: Sample>(&self, plan: &ChannelPlan<C>, dst: &mut [T]) {
        let gamma = match plan.weight_alpha {
            Some(_) => perceptible_reciprocal(self.gamma),
            None => 1.0,
        };
        for (c, role) in plan.roles.iter().enumerate() {
            match role {
                Role::Color | Role::Black => dst[c] = T::from_f64(gamma * self.sums[c]),
                Role::Alpha => dst[c] = T::from_f64(self.sums[c]),
                Role::Skip => {}
            }
        }
    }
}
