//! Regulatory capital arithmetic: VaR quantile, MRC, invested notional.
//!
//! All functions are pure and scalar; the transition step applies them
//! column by column.

use statrs::distribution::{ContinuousCDF, Normal};

pub const SQRT_10: f64 = 3.162_277_660_168_379_5;

/// Standard normal inverse CDF.
///
/// Returns ±infinity at the endpoints and NaN outside [0, 1].
pub fn standard_normal_ppf(p: f64) -> f64 {
    normal_ppf(p, 0.0, 1.0)
}

/// Quantile of N(mean, std²) at level `p`. NaN when `p` is outside
/// [0, 1] or the parameters do not describe a normal distribution.
pub fn normal_ppf(p: f64, mean: f64, std: f64) -> f64 {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    match Normal::new(mean, std) {
        Ok(_) if p == 0.0 => f64::NEG_INFINITY,
        Ok(_) if p == 1.0 => f64::INFINITY,
        Ok(normal) => normal.inverse_cdf(p),
        Err(_) => f64::NAN,
    }
}

/// MRC = mean(trailing disclosures) × multiplier × √10.
pub fn minimum_regulatory_capital(disclosure_mean: f64, multiplier: f64) -> f64 {
    disclosure_mean * multiplier * SQRT_10
}

/// Notional the desk can carry against `mrc`, sized inversely to it.
///
/// `None` when the MRC has underflowed to zero (or is not finite), where
/// the ratio would blow up.
pub fn invested_notional(notional: f64, mrc: f64, asset_price: f64) -> Option<f64> {
    if mrc.is_finite() && mrc > 0.0 {
        Some(notional / mrc * asset_price)
    } else {
        None
    }
}

/// Annual return divided by the year's average invested notional.
///
/// `None` unless the average is strictly positive.
pub fn effective_annual_return(annual_return: f64, average_investment: f64) -> Option<f64> {
    if average_investment > 0.0 && average_investment.is_finite() {
        Some(annual_return / average_investment)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ppf_matches_reference_quantiles() {
        assert_relative_eq!(standard_normal_ppf(0.5), 0.0, epsilon = 1e-10);
        assert_relative_eq!(standard_normal_ppf(0.99), 2.326_347_874, epsilon = 1e-7);
        assert_relative_eq!(standard_normal_ppf(0.975), 1.959_963_985, epsilon = 1e-7);
        assert_relative_eq!(standard_normal_ppf(0.01), -2.326_347_874, epsilon = 1e-7);
        assert_relative_eq!(standard_normal_ppf(0.001), -3.090_232_306, epsilon = 1e-6);
    }

    #[test]
    fn ppf_endpoints() {
        assert_eq!(standard_normal_ppf(0.0), f64::NEG_INFINITY);
        assert_eq!(standard_normal_ppf(1.0), f64::INFINITY);
        assert!(standard_normal_ppf(1.5).is_nan());
    }

    #[test]
    fn shifted_and_scaled_quantile() {
        assert_relative_eq!(normal_ppf(0.99, 1.0, 2.0), 1.0 + 2.0 * 2.326_347_874, epsilon = 1e-6);
    }

    #[test]
    fn degenerate_parameters_give_nan() {
        assert!(normal_ppf(0.99, 0.0, 0.0).is_nan());
        assert!(normal_ppf(0.99, 0.0, -1.0).is_nan());
        assert!(normal_ppf(f64::NAN, 0.0, 1.0).is_nan());
    }

    #[test]
    fn zero_mrc_is_flagged() {
        assert_eq!(invested_notional(100_000.0, 0.0, 1.0), None);
        assert_eq!(invested_notional(100_000.0, f64::NAN, 1.0), None);
        assert_relative_eq!(invested_notional(100_000.0, 20.0, 1.0).unwrap(), 5_000.0);
    }

    #[test]
    fn effective_return_guards_division() {
        assert_eq!(effective_annual_return(10.0, 0.0), None);
        let r = effective_annual_return(300.0, 5_000.0).unwrap();
        assert!(r.is_finite());
        assert_relative_eq!(r, 0.06);
    }
}
