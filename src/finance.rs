//! General functions related to finance.
use crate::units::{Dimensionless, Money, MoneyPerYear, PerYear};
use chrono::TimeDelta;

/// Calculates the capital recovery factor (CRF) for a given lifetime and discount rate.
///
/// The CRF is used to annualize capital costs over the lifetime of an item.
pub fn capital_recovery_factor(lifetime: u32, discount_rate: Dimensionless) -> Dimensionless {
    if lifetime == 0 {
        return Dimensionless(0.0);
    }
    if discount_rate == Dimensionless(0.0) {
        return Dimensionless(1.0) / Dimensionless(lifetime as f64);
    }
    let factor = (Dimensionless(1.0) + discount_rate).powi(lifetime as i32);
    (discount_rate * factor) / (factor - Dimensionless(1.0))
}

/// Calculates the annual capital cost of an item bought for `capital_cost`
pub fn annual_capital_cost(
    capital_cost: Money,
    lifetime: u32,
    discount_rate: Dimensionless,
) -> MoneyPerYear {
    // The CRF is the fraction of the capital cost paid each year
    let crf = capital_recovery_factor(lifetime, discount_rate);
    capital_cost * PerYear(crf.0)
}

/// The lifetime in whole years (rounded down) of an item depreciating over `depreciation_time`.
///
/// Items are always assumed to last at least one year.
pub fn lifetime_in_years(depreciation_time: TimeDelta) -> u32 {
    let years = (depreciation_time.num_days() / 365).max(1);
    u32::try_from(years).unwrap_or(u32::MAX)
}
