use bigdecimal::BigDecimal;
use common_money::{round_half_up, truncate_scale};
use proptest::prelude::*;
use std::str::FromStr;

fn cents(cents: i64) -> BigDecimal {
    BigDecimal::from(cents) / BigDecimal::from(100)
}

fn thousandths(milli: i64) -> BigDecimal {
    BigDecimal::from(milli) / BigDecimal::from(1000)
}

proptest! {
    // Any value sitting exactly on a half-cent boundary moves away from zero
    // by one cent relative to truncation.
    #[test]
    fn half_up_midpoint_moves_away_from_zero(base in -10_000i64..10_000) {
        let sign = if base < 0 { -1 } else { 1 };
        let midpoint = cents(base) + thousandths(5 * sign);
        let rounded = round_half_up(&midpoint);
        prop_assert_eq!(rounded, cents(base + sign));
    }

    // Away from midpoints, half-up agrees with round-to-nearest.
    #[test]
    fn half_up_matches_nearest_off_midpoint(base in 0i64..10_000, thousandth in 0i64..10) {
        prop_assume!(thousandth != 5);
        let value = thousandths(base * 10 + thousandth);
        let rounded = round_half_up(&value);
        let expected = if thousandth < 5 { cents(base) } else { cents(base + 1) };
        prop_assert_eq!(rounded, expected);
    }

    // Truncation never exceeds half-up for non-negative values.
    #[test]
    fn truncate_is_monotonic_below_half_up(raw in 0i64..10_000_000) {
        let value = thousandths(raw);
        prop_assert!(truncate_scale(&value) <= round_half_up(&value));
    }

    // Rounding an already scale-2 value is the identity.
    #[test]
    fn scale_two_values_are_fixed_points(raw in -1_000_000i64..1_000_000) {
        let value = cents(raw);
        prop_assert_eq!(round_half_up(&value), value.clone());
        prop_assert_eq!(truncate_scale(&value), value);
    }
}

#[test]
fn spec_tax_vector_rounds_half_up() {
    // 270 * 0.08 = 21.6 -> 21.60
    let tax = round_half_up(&(BigDecimal::from(270) * BigDecimal::from_str("0.08").unwrap()));
    assert_eq!(tax.to_string(), "21.60");
}
