//! Fee-split calculator.
//!
//! Splits a donor charge into the NGO's net share and the platform's fee
//! share for both rails and both billing modes. Pure: no state, no I/O.
//!
//! One-time charges withhold the tip at the source through the rail's
//! native fee mechanism (Stripe `application_fee_amount`, PayPal
//! `platform_fees`). Stripe subscriptions charge fees as a percent of
//! each invoice, so the tip is converted to a percentage of the price at
//! subscription-creation time; PayPal billing plans take a fixed
//! per-cycle platform fee, so no conversion happens there.

use crate::models::{DonationFrequency, PaymentRail};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FeeError {
    #[error("donation amount must be greater than zero")]
    NonPositiveAmount,
    #[error("tip amount must not be negative")]
    NegativeTip,
}

/// How the platform's share is collected on renewal cycles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecurringFee {
    /// Percent of each invoice, rounded to two decimals (Stripe).
    Percent(f64),
    /// Fixed amount in cents per cycle (PayPal).
    FixedCents(i64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeSplit {
    /// Total charged to the donor, in cents.
    pub total_cents: i64,
    /// The NGO's net share, in cents.
    pub ngo_cents: i64,
    /// The platform's share, in cents.
    pub platform_cents: i64,
    /// Set for recurring donations only.
    pub recurring_fee: Option<RecurringFee>,
}

/// Convert a dollar amount from the API surface to integer cents.
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Convert integer cents back to the dollar amounts stored in the ledger.
pub fn to_dollars(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Compute the fee split for a donation of `amount_cents` with a platform
/// tip of `tip_cents`.
///
/// Precondition: `amount_cents > 0` (the Stripe percent conversion divides
/// by it) and `tip_cents >= 0`.
pub fn compute(
    amount_cents: i64,
    tip_cents: i64,
    rail: PaymentRail,
    frequency: DonationFrequency,
) -> Result<FeeSplit, FeeError> {
    if amount_cents <= 0 {
        return Err(FeeError::NonPositiveAmount);
    }
    if tip_cents < 0 {
        return Err(FeeError::NegativeTip);
    }

    let total_cents = amount_cents + tip_cents;

    let recurring_fee = match frequency {
        DonationFrequency::Once => None,
        DonationFrequency::Monthly => Some(match rail {
            PaymentRail::Stripe => RecurringFee::Percent(fee_percent(amount_cents, tip_cents)),
            PaymentRail::Paypal => RecurringFee::FixedCents(tip_cents),
        }),
    };

    Ok(FeeSplit {
        total_cents,
        ngo_cents: total_cents - tip_cents,
        platform_cents: tip_cents,
        recurring_fee,
    })
}

/// Tip as a percent of the donation amount, rounded to two decimals.
fn fee_percent(amount_cents: i64, tip_cents: i64) -> f64 {
    let percent = tip_cents as f64 / amount_cents as f64 * 100.0;
    (percent * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_time_total_is_amount_plus_tip() {
        let split = compute(5000, 500, PaymentRail::Stripe, DonationFrequency::Once).unwrap();
        assert_eq!(split.total_cents, 5500);
        assert_eq!(split.ngo_cents, 5000);
        assert_eq!(split.platform_cents, 500);
        assert_eq!(split.recurring_fee, None);
    }

    #[test]
    fn monthly_stripe_converts_tip_to_percent() {
        // A=20.00, T=2.00 -> price 22.00/month, fee percent 10.00
        let split = compute(2000, 200, PaymentRail::Stripe, DonationFrequency::Monthly).unwrap();
        assert_eq!(split.total_cents, 2200);
        assert_eq!(split.recurring_fee, Some(RecurringFee::Percent(10.0)));
    }

    #[test]
    fn monthly_paypal_keeps_fixed_fee() {
        let split = compute(2000, 200, PaymentRail::Paypal, DonationFrequency::Monthly).unwrap();
        assert_eq!(split.recurring_fee, Some(RecurringFee::FixedCents(200)));
    }

    #[test]
    fn fee_percent_rounds_to_two_decimals() {
        // 1.00 tip on 3.00 -> 33.333...% -> 33.33
        let split = compute(300, 100, PaymentRail::Stripe, DonationFrequency::Monthly).unwrap();
        assert_eq!(split.recurring_fee, Some(RecurringFee::Percent(33.33)));
    }

    #[test]
    fn zero_amount_is_rejected_before_division() {
        let err = compute(0, 100, PaymentRail::Stripe, DonationFrequency::Monthly).unwrap_err();
        assert_eq!(err, FeeError::NonPositiveAmount);
    }

    #[test]
    fn negative_tip_is_rejected() {
        let err = compute(1000, -1, PaymentRail::Stripe, DonationFrequency::Once).unwrap_err();
        assert_eq!(err, FeeError::NegativeTip);
    }

    #[test]
    fn zero_tip_means_full_amount_to_ngo() {
        let split = compute(1234, 0, PaymentRail::Paypal, DonationFrequency::Once).unwrap();
        assert_eq!(split.total_cents, 1234);
        assert_eq!(split.ngo_cents, 1234);
        assert_eq!(split.platform_cents, 0);
    }

    #[test]
    fn dollar_cent_conversion_round_trips() {
        assert_eq!(to_cents(55.0), 5500);
        assert_eq!(to_cents(0.1 + 0.2), 30);
        assert_eq!(to_dollars(5500), 55.0);
    }
}
