use rand::{rngs::StdRng, SeedableRng};

/// Hands out one independent random generator per partition of work.
///
/// The generator of a partition depends only on the arena seed and the
/// partition index, so a filter that draws its numbers per partition gives
/// the same output whichever thread processes which partition.
///
/// # Example
///
/// ```
/// use rand::Rng;
/// use stipple_imgproc::random::RngArena;
///
/// let arena = RngArena::new(42);
/// let a: f64 = arena.generator(3).random();
/// let b: f64 = arena.generator(3).random();
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RngArena {
    seed: u64,
}

impl RngArena {
    /// Create an arena for `seed`.
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// The generator of partition `index`.
    ///
    /// Seeded with the arena seed and the index side by side, so no two
    /// partitions of one arena or of two arenas share a stream.
    pub fn generator(&self, index: usize) -> StdRng {
        let mut seed = <StdRng as SeedableRng>::Seed::default();
        seed[..8].copy_from_slice(&self.seed.to_le_bytes());
        seed[8..16].copy_from_slice(&(index as u64).to_le_bytes());
        StdRng::from_seed(seed)
    }
}
