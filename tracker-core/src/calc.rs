//! Derived-metric and calculator arithmetic.
//!
//! Pure functions shared by the tracker and both presentation shells so the
//! math lives in exactly one place.

use crate::error::ValidationError;

/// Relative change between two consecutive observations, as a percentage.
///
/// Returns `None` when the base is zero; callers keep their prior value
/// rather than dividing by zero.
pub fn percent_change(old: f64, new: f64) -> Option<f64> {
    if old == 0.0 {
        return None;
    }
    Some((new - old) / old * 100.0)
}

/// SPY price implied by an ES price at the given ratio.
pub fn spy_from_es(es_price: f64, ratio: f64) -> Result<f64, ValidationError> {
    check_price(es_price)?;
    check_ratio(ratio)?;
    Ok(es_price / ratio)
}

/// ES price implied by a SPY price at the given ratio.
pub fn es_from_spy(spy_price: f64, ratio: f64) -> Result<f64, ValidationError> {
    check_price(spy_price)?;
    check_ratio(ratio)?;
    Ok(spy_price * ratio)
}

fn check_price(price: f64) -> Result<(), ValidationError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(ValidationError::Price(price));
    }
    Ok(())
}

fn check_ratio(ratio: f64) -> Result<(), ValidationError> {
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(ValidationError::Ratio(ratio));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_change_up() {
        let pct = percent_change(100.0, 105.0).unwrap();
        assert!((pct - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_percent_change_down() {
        let pct = percent_change(100.0, 95.0).unwrap();
        assert!((pct + 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_percent_change_zero_base() {
        assert!(percent_change(0.0, 95.0).is_none());
    }

    #[test]
    fn test_calculator_round_trip() {
        let ratio = 10.0834;
        let es_price = 5321.25;

        let spy_price = spy_from_es(es_price, ratio).unwrap();
        let back = es_from_spy(spy_price, ratio).unwrap();
        assert!((back - es_price).abs() < 1e-6);
    }

    #[test]
    fn test_calculator_rejects_bad_input() {
        assert_eq!(
            spy_from_es(0.0, 10.0),
            Err(ValidationError::Price(0.0))
        );
        assert_eq!(
            spy_from_es(-4200.0, 10.0),
            Err(ValidationError::Price(-4200.0))
        );
        assert_eq!(
            es_from_spy(420.0, 0.0),
            Err(ValidationError::Ratio(0.0))
        );
        assert!(spy_from_es(f64::NAN, 10.0).is_err());
        assert!(es_from_spy(420.0, f64::INFINITY).is_err());
    }
}
