//! Sampling primitives shared by both emission modes.
//!
//! All functions take `&mut impl Rng` so production code can pass a fresh OS
//! seeded generator while tests pass a `StdRng` with a fixed seed.

use crate::error::SimError;
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;
use rand_distr::Normal;

/// Uniform sample in `[low, high)`. Requires `low < high`.
pub fn uniform(rng: &mut impl Rng, low: f64, high: f64) -> f64 {
    debug_assert!(low < high);
    rng.random_range(low..high)
}

/// Sample a normal distribution, re-mapped to `max(floor, sample)`.
///
/// The underlying distribution is unbounded below; the result is guaranteed
/// to be at least `floor`. A degenerate `stddev` collapses to the floor.
pub fn gaussian_floored(rng: &mut impl Rng, mean: f64, stddev: f64, floor: f64) -> f64 {
    Normal::new(mean, stddev)
        .map(|dist| dist.sample(rng).max(floor))
        .unwrap_or(floor)
}

/// Select one item according to relative weights.
///
/// Weights need not sum to 1. Fails with [`SimError::InvalidWeights`] when
/// the slice is empty, any weight is negative, or all weights are zero.
pub fn weighted_choice<'a, T>(rng: &mut impl Rng, items: &'a [(T, f64)]) -> Result<&'a T, SimError> {
    let index = WeightedIndex::new(items.iter().map(|(_, w)| *w))
        .map_err(|e| SimError::InvalidWeights(e.to_string()))?;
    Ok(&items[index.sample(rng)].0)
}

/// Uniformly pick one item from a non-empty slice.
pub fn pick<'a, T>(rng: &mut impl Rng, items: &'a [T]) -> &'a T {
    &items[rng.random_range(0..items.len())]
}

/// Rescale a weight vector so it sums to 1.0. Idempotent within float
/// tolerance.
pub fn normalize_weights(weights: &[f64]) -> Result<Vec<f64>, SimError> {
    if weights.is_empty() {
        return Err(SimError::InvalidWeights("empty weight vector".into()));
    }
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(SimError::InvalidWeights(
            "weights must be finite and non-negative".into(),
        ));
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(SimError::InvalidWeights("weights sum to zero".into()));
    }
    Ok(weights.iter().map(|w| w / total).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn uniform_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10_000 {
            let v = uniform(&mut rng, 0.5, 2.0);
            assert!((0.5..2.0).contains(&v));
        }
    }

    #[test]
    fn gaussian_floored_never_below_floor() {
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..1_000_000 {
            let v = gaussian_floored(&mut rng, 0.24, 0.10, 0.05);
            assert!(v >= 0.05);
        }
    }

    #[test]
    fn weighted_choice_rejects_all_zero_weights() {
        let mut rng = StdRng::seed_from_u64(3);
        let items = [("a", 0.0), ("b", 0.0)];
        let err = weighted_choice(&mut rng, &items).unwrap_err();
        assert!(matches!(err, SimError::InvalidWeights(_)));
    }

    #[test]
    fn weighted_choice_rejects_empty_and_negative() {
        let mut rng = StdRng::seed_from_u64(4);
        let empty: [(&str, f64); 0] = [];
        assert!(matches!(
            weighted_choice(&mut rng, &empty),
            Err(SimError::InvalidWeights(_))
        ));
        let negative = [("a", 1.0), ("b", -2.0)];
        assert!(matches!(
            weighted_choice(&mut rng, &negative),
            Err(SimError::InvalidWeights(_))
        ));
    }

    #[test]
    fn weighted_choice_honors_dominant_weight() {
        let mut rng = StdRng::seed_from_u64(5);
        let items = [("always", 1.0), ("never", 0.0)];
        for _ in 0..1_000 {
            assert_eq!(*weighted_choice(&mut rng, &items).unwrap(), "always");
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize_weights(&[97.0, 2.0, 0.5, 0.5]).unwrap();
        let twice = normalize_weights(&once).unwrap();
        let sum: f64 = once.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        for (a, b) in once.iter().zip(twice.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn normalize_rejects_zero_sum() {
        assert!(matches!(
            normalize_weights(&[0.0, 0.0]),
            Err(SimError::InvalidWeights(_))
        ));
    }
}
