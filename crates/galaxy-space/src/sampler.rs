//! Random sampling primitives for field generation and per-body variation.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Uniform and gaussian draws over a ChaCha8 stream.
pub struct RandomSampler {
    rng: ChaCha8Rng,
}

impl RandomSampler {
    /// Reproducible sampler for a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Sampler seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_os_rng(),
        }
    }

    /// Seeded when `seed` is set, entropy otherwise.
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => {
                log::info!("Using fixed galaxy seed {seed}");
                Self::seeded(seed)
            }
            None => Self::from_entropy(),
        }
    }

    /// Uniform draw in `[0, 1)`.
    pub fn uniform(&mut self) -> f32 {
        self.rng.random::<f32>()
    }

    /// Uniform draw in `[min, max)`.
    pub fn uniform_range(&mut self, min: f32, max: f32) -> f32 {
        min + self.uniform() * (max - min)
    }

    /// Normally distributed draw using the Marsaglia polar method.
    ///
    /// Each attempt consumes two uniform draws; pairs outside the unit disc
    /// (or at its centre) are rejected, which happens for about 21% of pairs.
    pub fn gaussian(&mut self, mean: f32, stddev: f32) -> f32 {
        loop {
            let u = self.rng.random::<f64>() * 2.0 - 1.0;
            let v = self.rng.random::<f64>() * 2.0 - 1.0;
            let s = u * u + v * v;
            if s > 0.0 && s < 1.0 {
                let scale = (-2.0 * s.ln() / s).sqrt();
                return mean + stddev * (u * scale) as f32;
            }
        }
    }
}

impl std::fmt::Debug for RandomSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomSampler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moments(samples: &[f32]) -> (f64, f64) {
        let n = samples.len() as f64;
        let mean = samples.iter().map(|&x| x as f64).sum::<f64>() / n;
        let var = samples
            .iter()
            .map(|&x| (x as f64 - mean).powi(2))
            .sum::<f64>()
            / (n - 1.0);
        (mean, var.sqrt())
    }

    #[test]
    fn test_gaussian_moments_converge() {
        let mut sampler = RandomSampler::seeded(42);
        let samples: Vec<f32> = (0..100_000).map(|_| sampler.gaussian(10.0, 2.0)).collect();
        let (mean, stddev) = moments(&samples);
        assert!((mean - 10.0).abs() < 0.1, "mean {mean}");
        assert!((stddev - 2.0).abs() < 0.04, "stddev {stddev}");
    }

    #[test]
    fn test_gaussian_zero_stddev_is_constant() {
        let mut sampler = RandomSampler::seeded(1);
        for _ in 0..100 {
            assert_eq!(sampler.gaussian(3.5, 0.0), 3.5);
        }
    }

    #[test]
    fn test_uniform_range_bounds() {
        let mut sampler = RandomSampler::seeded(7);
        for _ in 0..10_000 {
            let u = sampler.uniform();
            assert!((0.0..1.0).contains(&u));
            let r = sampler.uniform_range(0.7, 1.3);
            assert!((0.7..1.3).contains(&r), "{r}");
        }
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = RandomSampler::seeded(99);
        let mut b = RandomSampler::seeded(99);
        for _ in 0..32 {
            assert_eq!(a.gaussian(0.0, 1.0), b.gaussian(0.0, 1.0));
        }
    }
}
