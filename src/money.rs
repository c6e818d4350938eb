//! Decimal helpers for lira amounts.

use crate::errors::ServiceError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const CURRENCY_SYMBOL: &str = "₺";

/// A raw amount paired with its printed form, for report payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Money {
    #[schema(value_type = String, example = "1234.56")]
    pub amount: Decimal,
    #[schema(example = "₺1.234,56")]
    pub display: String,
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self {
            display: format_try(amount),
            amount,
        }
    }
}

/// Rounds half away from zero to kuruş precision.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Truncates toward zero to kuruş precision.
pub fn floor2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

/// `max(value, 0)`
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// Rounds an incoming amount to kuruş and requires the stored value to be above zero.
pub fn positive_amount(value: Decimal, field: &str) -> Result<Decimal, ServiceError> {
    let rounded = round2(value);
    if rounded <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "{field} must be greater than zero"
        )));
    }
    Ok(rounded)
}

/// Rounds an incoming amount to kuruş and rejects negative results.
pub fn non_negative_amount(value: Decimal, field: &str) -> Result<Decimal, ServiceError> {
    let rounded = round2(value);
    if rounded < Decimal::ZERO {
        return Err(ServiceError::ValidationError(format!(
            "{field} must not be negative"
        )));
    }
    // -0.004 rounds to a signed zero
    Ok(if rounded.is_zero() { Decimal::ZERO } else { rounded })
}

/// Formats an amount the way Turkish invoices print it: `₺1.234,56`.
///
/// Thousands are grouped with `.`, the decimal separator is `,` and exactly two
/// fraction digits are shown. Negative amounts carry a leading `-`.
pub fn format_try(value: Decimal) -> String {
    let rounded = round2(value);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    let plain = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("{sign}{CURRENCY_SYMBOL}{grouped},{frac_part}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn formats_with_turkish_grouping() {
        assert_eq!(format_try(dec!(1234.56)), "₺1.234,56");
        assert_eq!(format_try(dec!(0)), "₺0,00");
        assert_eq!(format_try(dec!(999)), "₺999,00");
        assert_eq!(format_try(dec!(1000)), "₺1.000,00");
        assert_eq!(format_try(dec!(1234567.8)), "₺1.234.567,80");
    }

    #[test]
    fn rounds_half_up_before_formatting() {
        assert_eq!(format_try(dec!(10.005)), "₺10,01");
        assert_eq!(format_try(dec!(10.004)), "₺10,00");
    }

    #[test]
    fn negative_amounts_keep_their_sign() {
        assert_eq!(format_try(dec!(-1500.5)), "-₺1.500,50");
        assert_eq!(format_try(dec!(-0.001)), "₺0,00");
    }

    #[test]
    fn money_carries_both_forms() {
        let money = Money::from(dec!(2500));
        assert_eq!(money.amount, dec!(2500));
        assert_eq!(money.display, "₺2.500,00");
    }

    #[test]
    fn incoming_amounts_are_checked_after_rounding() {
        assert_eq!(positive_amount(dec!(10.005), "amount").unwrap(), dec!(10.01));
        assert!(matches!(
            positive_amount(dec!(0.004), "amount"),
            Err(ServiceError::ValidationError(_))
        ));
        assert!(positive_amount(dec!(0.005), "amount").is_ok());
        assert_eq!(non_negative_amount(dec!(-0.004), "fee").unwrap(), Decimal::ZERO);
        assert!(!non_negative_amount(dec!(-0.004), "fee").unwrap().is_sign_negative());
        assert!(non_negative_amount(dec!(-0.005), "fee").is_err());
    }

    #[test]
    fn floor2_never_rounds_up() {
        assert_eq!(floor2(dec!(333.339)), dec!(333.33));
        assert_eq!(round2(dec!(333.335)), dec!(333.34));
        assert_eq!(non_negative(dec!(-4)), Decimal::ZERO);
    }
}
