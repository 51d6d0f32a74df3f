//! Order statistics and means of ensemble samples.

/// Arithmetic mean; NaN for an empty slice.
///
/// Sums deviations from the first sample so that a slice of identical
/// values returns that value exactly.
#[must_use]
pub fn mean(samples: &[f64]) -> f64 {
    let Some(&shift) = samples.first() else {
        return f64::NAN;
    };
    let deviation: f64 = samples.iter().map(|x| x - shift).sum();
    shift + deviation / samples.len() as f64
}

/// Quantile at `level` ∈ [0, 1] by linear interpolation between order
/// statistics (position `level·(n−1)`); NaN for an empty slice.
#[must_use]
pub fn quantile(samples: &[f64], level: f64) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    quantile_sorted(&sorted, level)
}

/// [`quantile`] on an already sorted slice.
#[must_use]
pub fn quantile_sorted(sorted: &[f64], level: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let position = level.clamp(0.0, 1.0) * (n - 1) as f64;
            let below = position.floor() as usize;
            let above = (below + 1).min(n - 1);
            let fraction = position - below as f64;
            sorted[below] + (sorted[above] - sorted[below]) * fraction
        }
    }
}

/// Mean with lower and upper quantiles of one sample set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// Mean.
    pub mean: f64,
    /// Lower quantile.
    pub lower: f64,
    /// Upper quantile.
    pub upper: f64,
}

impl Band {
    /// Band of `samples` at the given quantile levels.
    #[must_use]
    pub fn of(samples: &[f64], lower: f64, upper: f64) -> Self {
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        Self {
            mean: mean(samples),
            lower: quantile_sorted(&sorted, lower),
            upper: quantile_sorted(&sorted, upper),
        }
    }

    /// Band with every statistic NaN.
    #[must_use]
    pub const fn undefined() -> Self {
        Self {
            mean: f64::NAN,
            lower: f64::NAN,
            upper: f64::NAN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rng::SimRng;

    #[test]
    fn test_mean_exact_for_identical_samples() {
        let samples = vec![0.1; 1000];
        assert!((mean(&samples) - 0.1).abs() < f64::EPSILON);
        assert!(mean(&[]).is_nan());
        assert!((mean(&[1.0, 2.0, 3.0, 4.0]) - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_quantile_interpolation() {
        let samples = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert!((quantile(&samples, 0.0) - 1.0).abs() < f64::EPSILON);
        assert!((quantile(&samples, 1.0) - 5.0).abs() < f64::EPSILON);
        assert!((quantile(&samples, 0.5) - 3.0).abs() < f64::EPSILON);
        assert!((quantile(&samples, 0.1) - 1.4).abs() < 1e-12);
        assert!((quantile(&[7.0], 0.3) - 7.0).abs() < f64::EPSILON);
        assert!(quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn test_standard_normal_sigma_band() {
        let mut rng = SimRng::new(42);
        let samples: Vec<f64> = (0..1000).map(|_| rng.gen_standard_normal()).collect();
        let band = Band::of(&samples, 0.159, 0.841);
        assert!(band.mean.abs() < 0.1, "mean = {}", band.mean);
        assert!((band.lower + 1.0).abs() < 0.15, "lower = {}", band.lower);
        assert!((band.upper - 1.0).abs() < 0.15, "upper = {}", band.upper);
    }

    #[test]
    fn test_band_ordering_and_undefined() {
        let band = Band::of(&[3.0, 1.0, 2.0], 0.159, 0.841);
        assert!(band.lower <= band.mean && band.mean <= band.upper);
        let nan = Band::undefined();
        assert!(nan.mean.is_nan() && nan.lower.is_nan() && nan.upper.is_nan());
    }
}
