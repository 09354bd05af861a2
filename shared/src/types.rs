//! Monetary arithmetic for the Stock Ledger
//!
//! Every value that is persisted, accumulated into a grand total or placed in
//! a report passes through [`round_money`] first. Monetary amounts are always
//! `rust_decimal::Decimal`, never binary floating point.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary amount to exactly 2 decimal places, half-up.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Value of `units` at `unit_price`, rounded to the cent.
///
/// Intermediate multiplications are rounded before they are accumulated into
/// any running total, so fractional cents never drift into the ledger.
pub fn line_value(units: i64, unit_price: Decimal) -> Decimal {
    round_money(Decimal::from(units) * unit_price)
}

/// Format a monetary amount for reports: symbol prefix, thousands grouping,
/// always 2 decimal places (`£1,234.56`, `-£0.01`).
pub fn format_currency(amount: Decimal, symbol: &str) -> String {
    let quantized = round_money(amount);
    // Decimal carries a signed zero; `-0.00` must render as positive.
    let negative = quantized.is_sign_negative() && !quantized.is_zero();
    let rendered = format!("{:.2}", quantized.abs());
    let (int_part, frac_part) = rendered
        .split_once('.')
        .unwrap_or((rendered.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if negative {
        format!("-{}{}.{}", symbol, grouped, frac_part)
    } else {
        format!("{}{}.{}", symbol, grouped, frac_part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn rounds_half_up() {
        assert_eq!(round_money(dec("1.005")), dec("1.01"));
        assert_eq!(round_money(dec("2.675")), dec("2.68"));
        assert_eq!(round_money(dec("1.004")), dec("1.00"));
    }

    #[test]
    fn rounds_half_away_from_zero_for_negatives() {
        assert_eq!(round_money(dec("-1.005")), dec("-1.01"));
        assert_eq!(round_money(dec("-0.004")), dec("-0.00"));
    }

    #[test]
    fn line_value_rounds_before_return() {
        assert_eq!(line_value(40, dec("2.00")), dec("80.00"));
        assert_eq!(line_value(3, dec("1.99")), dec("5.97"));
        assert_eq!(line_value(7, dec("0.015")), dec("0.11"));
    }

    #[test]
    fn formats_with_grouping() {
        assert_eq!(format_currency(dec("1234567.891"), "£"), "£1,234,567.89");
        assert_eq!(format_currency(dec("123"), "£"), "£123.00");
        assert_eq!(format_currency(dec("12.34"), "$"), "$12.34");
        assert_eq!(format_currency(dec("0"), "£"), "£0.00");
    }

    #[test]
    fn formats_negatives_without_negative_zero() {
        assert_eq!(format_currency(dec("-1234.5"), "£"), "-£1,234.50");
        assert_eq!(format_currency(dec("-0.005"), "£"), "-£0.01");
        // rounds away to zero: sign dropped
        assert_eq!(format_currency(dec("-0.001"), "£"), "£0.00");
    }

    proptest! {
        /// Rounding is idempotent: round(round(x)) == round(x).
        #[test]
        fn prop_rounding_idempotent(mantissa in any::<i64>(), scale in 0u32..15) {
            let value = Decimal::new(mantissa, scale);
            let once = round_money(value);
            prop_assert_eq!(round_money(once), once);
        }

        /// Rounded amounts never carry more than 2 decimal places.
        #[test]
        fn prop_rounding_quantizes(mantissa in any::<i64>(), scale in 0u32..15) {
            let rounded = round_money(Decimal::new(mantissa, scale));
            prop_assert!(rounded.scale() <= 2);
        }

        /// Formatting never loses the integer digits.
        #[test]
        fn prop_format_keeps_digits(units in 0i64..1_000_000_000) {
            let formatted = format_currency(Decimal::from(units), "£");
            let digits: String = formatted.chars().filter(|c| c.is_ascii_digit()).collect();
            prop_assert_eq!(digits, format!("{}00", units));
        }
    }
}
