//! Numeric kernels shared by the ingestion cleaner and the query engine.
//!
//! Conventions:
//! - z-scores use the population standard deviation (ddof = 0)
//! - reported `std` uses the sample standard deviation (ddof = 1)
//! - percentiles interpolate linearly between closest ranks, `rank = p * (n - 1)`

// ---

/// Below this spread (relative to the mean) a field is treated as constant.
const RELATIVE_STD_EPSILON: f64 = 1e-12;

pub fn mean(values: &[f64]) -> Option<f64> {
    // ---
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Standard deviation with `ddof` delta degrees of freedom.
/// `None` when there are not more than `ddof` values.
fn std_dev(values: &[f64], ddof: usize) -> Option<f64> {
    // ---
    if values.len() <= ddof {
        return None;
    }
    let mu = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - mu).powi(2)).sum();
    Some((sum_sq / (values.len() - ddof) as f64).sqrt())
}

pub fn population_std(values: &[f64]) -> Option<f64> {
    std_dev(values, 0)
}

pub fn sample_std(values: &[f64]) -> Option<f64> {
    std_dev(values, 1)
}

/// Copy and sort ascending. Inputs are finite, so `total_cmp` agrees with `<`.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    // ---
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Linear-interpolation percentile of an already sorted slice, `p` in `[0, 1]`.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    // ---
    if sorted.is_empty() {
        return None;
    }
    let rank = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Fitted mean/σ for scoring values of a single field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScorer {
    pub mean: f64,
    pub std: f64,
}

impl ZScorer {
    /// Fit over `values`. An empty set fits to `(0, 0)`, which scores everything as 0.
    pub fn fit(values: &[f64]) -> Self {
        // ---
        ZScorer {
            mean: mean(values).unwrap_or(0.0),
            std: population_std(values).unwrap_or(0.0),
        }
    }

    fn is_degenerate(&self) -> bool {
        self.std <= self.mean.abs() * RELATIVE_STD_EPSILON
    }

    /// `(value - mean) / std`, or 0 when the field has no spread.
    pub fn score(&self, value: f64) -> f64 {
        // ---
        if self.is_degenerate() {
            return 0.0;
        }
        (value - self.mean) / self.std
    }
}

/// Fences `[q1 - k*iqr, q3 + k*iqr]` for the interquartile-range rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrFence {
    pub lower: f64,
    pub upper: f64,
}

impl IqrFence {
    pub fn fit(values: &[f64], k: f64) -> Option<Self> {
        // ---
        let sorted = sorted(values);
        let q1 = percentile(&sorted, 0.25)?;
        let q3 = percentile(&sorted, 0.75)?;
        let iqr = q3 - q1;
        Some(IqrFence {
            lower: q1 - k * iqr,
            upper: q3 + k * iqr,
        })
    }

    pub fn is_outside(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}
