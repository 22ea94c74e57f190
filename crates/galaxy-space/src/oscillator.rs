//! Sinusoidal twinkle oscillators.

use std::ops::Range;

use crate::sampler::RandomSampler;

/// Initial phases are spread over `[0, 100π)` so neighbouring stars start far apart.
pub const PHASE_SPAN: f32 = std::f32::consts::PI * 100.0;

/// One sine term with its own speed, phase and amplitude.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Oscillator {
    /// Phase advance per reference frame.
    pub speed: f32,
    pub phase: f32,
    pub amplitude: f32,
}

impl Oscillator {
    pub fn random(sampler: &mut RandomSampler, speed: Range<f32>, amplitude: Range<f32>) -> Self {
        Self {
            speed: sampler.uniform_range(speed.start, speed.end),
            phase: sampler.uniform() * PHASE_SPAN,
            amplitude: sampler.uniform_range(amplitude.start, amplitude.end),
        }
    }

    /// Copy with the phase advanced by `frames` reference frames.
    pub fn advanced(self, frames: f32) -> Self {
        Self {
            phase: self.phase + self.speed * frames,
            ..self
        }
    }

    pub fn value(&self) -> f32 {
        self.phase.sin() * self.amplitude
    }
}

/// Primary, secondary and tertiary twinkle ranges as `(speed, amplitude)`.
pub const TWINKLE_RANGES: [(Range<f32>, Range<f32>); 3] = [
    (0.001..0.021, 0.1..0.6),
    (0.002..0.017, 0.05..0.35),
    (0.003..0.015, 0.02..0.22),
];

/// The three independent oscillators every star carries.
pub fn twinkle_set(sampler: &mut RandomSampler) -> [Oscillator; 3] {
    TWINKLE_RANGES.map(|(speed, amplitude)| Oscillator::random(sampler, speed, amplitude))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_is_linear_in_frames() {
        let osc = Oscillator {
            speed: 0.01,
            phase: 1.0,
            amplitude: 0.5,
        };
        let once = osc.advanced(2.0);
        let twice = osc.advanced(1.0).advanced(1.0);
        assert!((once.phase - 1.02).abs() < 1e-6);
        assert!((once.phase - twice.phase).abs() < 1e-6);
        assert_eq!(once.speed, osc.speed);
    }

    #[test]
    fn test_value_bounded_by_amplitude() {
        let mut osc = Oscillator {
            speed: 0.37,
            phase: 0.0,
            amplitude: 0.3,
        };
        for _ in 0..1000 {
            osc = osc.advanced(1.0);
            assert!(osc.value().abs() <= 0.3 + 1e-6);
        }
    }

    #[test]
    fn test_twinkle_set_within_ranges() {
        let mut sampler = RandomSampler::seeded(12);
        for _ in 0..500 {
            let set = twinkle_set(&mut sampler);
            for (osc, (speed, amplitude)) in set.iter().zip(TWINKLE_RANGES) {
                assert!(speed.contains(&osc.speed));
                assert!(amplitude.contains(&osc.amplitude));
                assert!((0.0..PHASE_SPAN).contains(&osc.phase));
            }
        }
    }
}
