//! Validation utilities for the Tea Business Management Platform

/// Tolerance used when comparing percentage sums
pub const PERCENT_SUM_TOLERANCE: f64 = 0.01;

/// Check that the bulk ingredient percentages of a recipe sum to 100.
///
/// This is a soft invariant: callers surface a warning rather than reject
/// the write, so a recipe can be saved mid-edit.
pub fn percents_sum_to_100(percents: &[f64]) -> bool {
    let total: f64 = percents.iter().sum();
    (total - 100.0).abs() <= PERCENT_SUM_TOLERANCE
}

/// Validate that a quantity is strictly positive
pub fn validate_positive_quantity(quantity: f64) -> Result<(), &'static str> {
    if !quantity.is_finite() {
        return Err("Quantity must be a finite number");
    }
    if quantity <= 0.0 {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate that a unit price is non-negative and finite
pub fn validate_unit_price(price: f64) -> Result<(), &'static str> {
    if !price.is_finite() {
        return Err("Unit price must be a finite number");
    }
    if price < 0.0 {
        return Err("Unit price cannot be negative");
    }
    Ok(())
}

/// Validate a percentage lies in [0, 100]
pub fn validate_percent(percent: f64) -> Result<(), &'static str> {
    if !percent.is_finite() {
        return Err("Percentage must be a finite number");
    }
    if !(0.0..=100.0).contains(&percent) {
        return Err("Percentage must be between 0 and 100");
    }
    Ok(())
}

/// Validate a sale format (discrete sale size in grams)
pub fn validate_format(format_g: u32) -> Result<(), &'static str> {
    if format_g == 0 {
        return Err("Format must be at least 1 gram");
    }
    Ok(())
}
