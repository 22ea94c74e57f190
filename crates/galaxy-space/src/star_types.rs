//! Weighted star classification.

use galaxy_config::StarTypeEntry;
use galaxy_render::hex_to_rgb;

use crate::sampler::RandomSampler;

/// Errors building a [`StarTypeTable`].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum StarTypeError {
    #[error("star type table is empty")]
    Empty,

    #[error("star type {index} has invalid weight {weight}")]
    InvalidWeight { index: usize, weight: f32 },

    #[error("star type weights sum to {0}, expected a positive total")]
    NonPositiveTotal(f32),
}

/// Appearance of one star class.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StarType {
    /// Linear RGB.
    pub color: [f32; 3],
    /// Size class multiplier.
    pub size: f32,
}

/// Ordered classes with cumulative weights.
///
/// A uniform draw in `[0, total)` selects the first class whose cumulative
/// weight exceeds it. Weights need not sum to 100.
#[derive(Clone, Debug)]
pub struct StarTypeTable {
    types: Vec<StarType>,
    cumulative: Vec<f32>,
    /// Last class with a positive weight; taken when rounding puts a draw at the total.
    fallback: usize,
}

impl StarTypeTable {
    pub fn new(entries: &[StarTypeEntry]) -> Result<Self, StarTypeError> {
        if entries.is_empty() {
            return Err(StarTypeError::Empty);
        }
        let mut cumulative = Vec::with_capacity(entries.len());
        let mut total = 0.0;
        for (index, entry) in entries.iter().enumerate() {
            if !entry.percentage.is_finite() || entry.percentage < 0.0 {
                return Err(StarTypeError::InvalidWeight {
                    index,
                    weight: entry.percentage,
                });
            }
            total += entry.percentage;
            cumulative.push(total);
        }
        let Some(fallback) = entries.iter().rposition(|e| e.percentage > 0.0) else {
            return Err(StarTypeError::NonPositiveTotal(total));
        };
        let types = entries
            .iter()
            .map(|e| StarType {
                color: hex_to_rgb(e.color),
                size: e.size,
            })
            .collect();
        Ok(Self {
            types,
            cumulative,
            fallback,
        })
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn total_weight(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    pub fn get(&self, index: usize) -> Option<&StarType> {
        self.types.get(index)
    }

    /// Map a uniform draw in `[0, 1)` to a class index.
    pub fn classify(&self, u: f32) -> usize {
        let draw = u * self.total_weight();
        self.cumulative
            .iter()
            .position(|&c| c > draw)
            .unwrap_or(self.fallback)
    }

    pub fn sample(&self, sampler: &mut RandomSampler) -> usize {
        self.classify(sampler.uniform())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galaxy_config::StarConfig;

    fn entry(percentage: f32) -> StarTypeEntry {
        StarTypeEntry {
            percentage,
            color: 0xffffff,
            size: 1.0,
        }
    }

    #[test]
    fn test_default_frequencies_match_table() {
        let entries = StarConfig::default_types();
        let table = StarTypeTable::new(&entries).unwrap();
        let mut sampler = RandomSampler::seeded(2024);
        let draws = 1_000_000;
        let mut counts = vec![0u32; table.len()];
        for _ in 0..draws {
            counts[table.sample(&mut sampler)] += 1;
        }
        for (entry, count) in entries.iter().zip(&counts) {
            let pct = *count as f32 / draws as f32 * 100.0;
            assert!(
                (pct - entry.percentage).abs() < 0.5,
                "expected {}%, got {pct}%",
                entry.percentage
            );
        }
    }

    #[test]
    fn test_classify_boundaries() {
        let table = StarTypeTable::new(&[entry(45.0), entry(20.0), entry(35.0)]).unwrap();
        assert_eq!(table.classify(0.0), 0);
        assert_eq!(table.classify(0.449), 0);
        assert_eq!(table.classify(0.451), 1);
        assert_eq!(table.classify(0.66), 2);
        assert_eq!(table.classify(0.999_999), 2);
    }

    #[test]
    fn test_weights_are_normalized() {
        let table = StarTypeTable::new(&[entry(1.0), entry(3.0)]).unwrap();
        assert_eq!(table.classify(0.24), 0);
        assert_eq!(table.classify(0.26), 1);
    }

    #[test]
    fn test_zero_weight_class_is_never_selected() {
        let table = StarTypeTable::new(&[entry(0.0), entry(10.0)]).unwrap();
        assert_eq!(table.classify(0.0), 1);
    }

    #[test]
    fn test_draw_at_total_skips_trailing_zero_weights() {
        let table = StarTypeTable::new(&[entry(30.0), entry(70.0), entry(0.0), entry(0.0)]).unwrap();
        assert_eq!(table.classify(1.0), 1);
        assert_eq!(table.classify(0.999_999), 1);
    }

    #[test]
    fn test_malformed_tables_rejected() {
        assert_eq!(StarTypeTable::new(&[]).unwrap_err(), StarTypeError::Empty);
        assert_eq!(
            StarTypeTable::new(&[entry(0.0), entry(0.0)]).unwrap_err(),
            StarTypeError::NonPositiveTotal(0.0)
        );
        assert!(matches!(
            StarTypeTable::new(&[entry(10.0), entry(-1.0)]),
            Err(StarTypeError::InvalidWeight { index: 1, .. })
        ));
        assert!(StarTypeTable::new(&[entry(f32::NAN)]).is_err());
    }

    #[test]
    fn test_colors_are_linearized_from_hex() {
        let table = StarTypeTable::new(&StarConfig::default_types()).unwrap();
        let red = table.get(5).unwrap();
        assert!((red.color[0] - 1.0).abs() < 1e-5);
        // sRGB 0x55 decodes to roughly 0.0908 linear.
        assert!((red.color[1] - 0.090_842).abs() < 1e-4, "got {:?}", red.color);
        assert_eq!(red.color[1], red.color[2]);
        assert_eq!(red.size, 1.8);
    }
}
