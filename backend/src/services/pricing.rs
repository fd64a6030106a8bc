//! Margin and price calculations

use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Margin of a sale: absolute amount and percentage of the price
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Margin {
    pub amount: f64,
    pub percent: f64,
}

/// Margin from a price and a cost.
///
/// Zero or negative prices are valid (free samples): the margin is the full
/// cost lost and the percentage is reported as 0 rather than undefined.
pub fn margin(price: f64, cost: f64) -> Margin {
    if price <= 0.0 {
        return Margin {
            amount: -cost,
            percent: 0.0,
        };
    }
    let amount = price - cost;
    Margin {
        amount,
        percent: amount / price * 100.0,
    }
}

/// Price needed to reach a target margin percentage from a cost.
///
/// A target of 100% or more is unachievable from a positive cost, so it is
/// rejected rather than clamped.
pub fn price_from_margin(cost: f64, margin_percent: f64) -> AppResult<f64> {
    if !margin_percent.is_finite() {
        return Err(AppError::validation(
            "margin_percent",
            "Margin percentage must be a finite number",
        ));
    }
    if margin_percent >= 100.0 {
        return Err(AppError::validation(
            "margin_percent",
            "Margin percentage must be below 100",
        ));
    }
    Ok(cost / (1.0 - margin_percent / 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn margin_from_price_and_cost() {
        let m = margin(20.0, 10.0);
        assert!((m.amount - 10.0).abs() < 1e-9);
        assert!((m.percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn zero_price_is_the_documented_degenerate_case() {
        let m = margin(0.0, 10.0);
        assert_eq!(m.amount, -10.0);
        assert_eq!(m.percent, 0.0);
    }

    #[test]
    fn price_from_margin_inverts_margin() {
        let price = price_from_margin(10.0, 50.0).unwrap();
        assert!((price - 20.0).abs() < 1e-9);
    }

    #[test]
    fn hundred_percent_margin_is_rejected() {
        assert!(price_from_margin(10.0, 100.0).is_err());
        assert!(price_from_margin(10.0, 150.0).is_err());
    }
}
