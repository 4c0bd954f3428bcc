//! Deterministic fixtures shared by unit tests.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::Observation;

// ---

pub fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2022, 10, 7)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// An observation `minute` minutes after [`base_time`].
pub fn observation(minute: i64, temperature: f64, salinity: f64, odo: f64) -> Observation {
    // ---
    Observation {
        timestamp: base_time() + Duration::minutes(minute),
        latitude: 25.9,
        longitude: -80.1,
        temperature,
        salinity,
        odo,
    }
}

/// Seeded generator so every fixture is reproducible.
pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Approximately standard normal (Irwin-Hall, 12 draws), clamped to `[-2, 2]`
/// so no fixture value sits near an outlier fence.
pub fn normalish(rng: &mut StdRng) -> f64 {
    // ---
    let sum: f64 = (0..12).map(|_| rng.gen::<f64>()).sum();
    (sum - 6.0).clamp(-2.0, 2.0)
}

/// `n` well-behaved observations, one per minute, around typical bay values.
pub fn normalish_observations(n: usize, seed: u64) -> Vec<Observation> {
    // ---
    let mut rng = rng(seed);
    (0..n)
        .map(|i| {
            observation(
                i as i64,
                28.0 + normalish(&mut rng),
                36.0 + 0.5 * normalish(&mut rng),
                6.0 + 0.3 * normalish(&mut rng),
            )
        })
        .collect()
}

/// Temperatures in tenths of a degree, as small integers from quickcheck.
pub fn from_tenths(temps: &[i16]) -> Vec<Observation> {
    // ---
    temps
        .iter()
        .enumerate()
        .map(|(i, &t)| observation(i as i64, f64::from(t) / 10.0, 35.0, 6.0))
        .collect()
}
