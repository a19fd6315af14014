//! Perceptual brightness curve.
//!
//! The gamma side is a fixed 16-bit encoding `[0, 65535]`; the linear side is
//! whatever `[min, max]` the caller works in. The curve is square-law up to
//! the midpoint and an exponential tail above it, the same hybrid shape
//! display gamma tables use.

use serde::Deserialize;

use crate::output::OutputRange;

pub const GAMMA_SPACE_MAX: u16 = u16::MAX;

const CURVE_R: f64 = 0.5;
const CURVE_A: f64 = 0.178_832_77;
const CURVE_B: f64 = 0.284_668_92;
const CURVE_C: f64 = 0.559_910_7;
const CURVE_LINEAR_MAX: f64 = 12.0;

const GAIN_MIN: f32 = 0.01;
const GAIN_MAX: f32 = 100.0;

pub fn constrain(amount: f64, low: f64, high: f64) -> f64 {
    if amount < low {
        low
    } else if amount > high {
        high
    } else {
        amount
    }
}

pub fn lerp(start: f64, stop: f64, amount: f64) -> f64 {
    start + (stop - start) * amount
}

pub fn norm(start: f64, stop: f64, value: f64) -> f64 {
    (value - start) / (stop - start)
}

/// Gamma-encoded `i` to a linear value in `[min, max]`.
pub fn gamma_to_linear(i: u16, min: f64, max: f64) -> f64 {
    let n = norm(0.0, GAMMA_SPACE_MAX as f64, i as f64);
    let linear = if n <= CURVE_R {
        (n / CURVE_R) * (n / CURVE_R)
    } else {
        ((n - CURVE_C) / CURVE_A).exp() + CURVE_B
    };
    lerp(
        min,
        max,
        constrain(linear, 0.0, CURVE_LINEAR_MAX) / CURVE_LINEAR_MAX,
    )
}

/// Linear `v` in `[min, max]` to the gamma encoding. Inverse of
/// [`gamma_to_linear`] within one unit of rounding.
pub fn linear_to_gamma(v: f64, min: f64, max: f64) -> u16 {
    let n = constrain(norm(min, max, v), 0.0, 1.0) * CURVE_LINEAR_MAX;
    let gamma = if n <= 1.0 {
        n.sqrt() * CURVE_R
    } else {
        (n - CURVE_B).ln() * CURVE_A + CURVE_C
    };
    let encoded = lerp(0.0, GAMMA_SPACE_MAX as f64, gamma).round();
    constrain(encoded, 0.0, GAMMA_SPACE_MAX as f64) as u16
}

/// Perceptual position of `value` inside `range`, in `[0, 1]`.
pub fn perceived_progress(value: f32, range: OutputRange) -> f32 {
    let encoded = linear_to_gamma(value as f64, range.min as f64, range.max as f64);
    encoded as f32 / GAMMA_SPACE_MAX as f32
}

/// Gain applied to a horizontal adjustment depending on the current value.
/// Every curve makes steps finer near the dark end.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityCurve {
    /// `(0.02·v + 1.4)^2.8 / 50` on the value in platform units.
    #[default]
    Power,
    /// `30·((n + 0.35)² − 0.115)` on the normalized value.
    Quadratic,
    Flat,
}

impl SensitivityCurve {
    pub fn gain(self, normalized: f32, range: OutputRange) -> f32 {
        let gain = match self {
            Self::Power => {
                let units = range.units(normalized) as f64;
                ((0.02 * units + 1.4).powf(2.8) / 50.0) as f32
            }
            Self::Quadratic => {
                let n = normalized.clamp(0.0, 1.0);
                30.0 * ((n + 0.35) * (n + 0.35) - 0.115)
            }
            Self::Flat => return 1.0,
        };
        gain.clamp(GAIN_MIN, GAIN_MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANGES: [(f64, f64); 4] = [(0.0, 1.0), (1.0, 4095.0), (0.0, 255.0), (10.0, 20.0)];

    #[test]
    fn round_trip_stays_within_one_unit() {
        for (min, max) in RANGES {
            for i in 0..=GAMMA_SPACE_MAX {
                let back = linear_to_gamma(gamma_to_linear(i, min, max), min, max);
                let diff = (back as i32 - i as i32).abs();
                assert!(diff <= 1, "i={i} back={back} range=({min},{max})");
            }
        }
    }

    #[test]
    fn gamma_to_linear_is_monotonic() {
        for (min, max) in RANGES {
            let mut prev = gamma_to_linear(0, min, max);
            for i in 1..=GAMMA_SPACE_MAX {
                let next = gamma_to_linear(i, min, max);
                assert!(next >= prev, "i={i} prev={prev} next={next}");
                prev = next;
            }
        }
    }

    #[test]
    fn curve_endpoints_and_knee() {
        assert_eq!(gamma_to_linear(0, 1.0, 4095.0), 1.0);
        assert!((gamma_to_linear(GAMMA_SPACE_MAX, 0.0, 1.0) - 1.0).abs() < 1e-3);
        // Square-law half ends at one twelfth of the linear range.
        let knee = gamma_to_linear(GAMMA_SPACE_MAX / 2 + 1, 0.0, 12.0);
        assert!((knee - 1.0).abs() < 1e-3, "knee={knee}");
        let back = linear_to_gamma(1.0, 0.0, 12.0);
        assert!((32_767..=32_768).contains(&back), "back={back}");
    }

    #[test]
    fn linear_to_gamma_clamps_out_of_range_input() {
        assert_eq!(linear_to_gamma(-50.0, 0.0, 1.0), 0);
        assert_eq!(linear_to_gamma(50.0, 0.0, 1.0), GAMMA_SPACE_MAX);
    }

    #[test]
    fn sensitivity_is_finer_at_low_values() {
        let range = OutputRange::default();
        for curve in [SensitivityCurve::Power, SensitivityCurve::Quadratic] {
            let low = curve.gain(0.05, range);
            let high = curve.gain(0.9, range);
            assert!(low < high, "{curve:?}: low={low} high={high}");
            assert!((GAIN_MIN..=GAIN_MAX).contains(&low));
            assert!((GAIN_MIN..=GAIN_MAX).contains(&high));
        }
        assert_eq!(SensitivityCurve::Flat.gain(0.3, range), 1.0);
    }

    #[test]
    fn power_gain_matches_reference_points() {
        let range = OutputRange::default();
        let at_min = SensitivityCurve::Power.gain(0.0, range);
        assert!((at_min - 1.42f32.powf(2.8) / 50.0).abs() < 1e-4, "{at_min}");
        assert_eq!(SensitivityCurve::Power.gain(1.0, range), GAIN_MAX);
    }

    #[test]
    fn progress_is_perceptual() {
        let range = OutputRange::new(0, 1200);
        // One twelfth of the linear range sits at the perceptual midpoint.
        let mid = perceived_progress(100.0, range);
        assert!((mid - 0.5).abs() < 1e-3, "{mid}");
        assert_eq!(perceived_progress(0.0, range), 0.0);
        assert_eq!(perceived_progress(1200.0, range), 1.0);
    }
}
