//! Explicit, seedable random source for release sampling.
//!
//! Every call that draws random numbers (triangle selection, barycentric
//! placement, remainder positions) takes a `&mut ReleaseRng` instead of
//! reaching for a process-global generator.  Tests seed it explicitly;
//! applications seed it from the run configuration.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Deterministic random source threaded through release sampling.
///
/// Used only in single-threaded contexts; one driver loop owns one
/// `ReleaseRng`.
pub struct ReleaseRng(SmallRng);

impl ReleaseRng {
    pub fn new(seed: u64) -> Self {
        ReleaseRng(SmallRng::seed_from_u64(seed))
    }

    /// Seed from OS entropy — non-reproducible runs only.
    pub fn from_entropy() -> Self {
        ReleaseRng(SmallRng::from_entropy())
    }

    /// Derive a child `ReleaseRng` with a different seed offset, e.g. one
    /// stream per release so adding a release doesn't perturb the others.
    pub fn child(&mut self, offset: u64) -> ReleaseRng {
        let child_seed: u64 = self.0.r#gen::<u64>() ^ offset.wrapping_mul(MIXING_CONSTANT);
        ReleaseRng(SmallRng::seed_from_u64(child_seed))
    }

    /// Expose the inner `SmallRng` for use with `rand` distribution types.
    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    #[inline]
    pub fn random<T>(&mut self) -> T
    where
        rand::distributions::Standard: rand::distributions::Distribution<T>,
    {
        self.0.r#gen()
    }

    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// Uniform index in `0..len`.  `len` must be non-zero.
    #[inline]
    pub fn index(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }
}
