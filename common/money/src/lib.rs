use std::str::FromStr;
use std::sync::OnceLock;

use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

/// Scale used for externally-reported monetary figures.
pub const MONEY_SCALE: i64 = 2;

/// Rounding applied when reducing a value to [`MONEY_SCALE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingMode {
    Truncate,
    HalfUp,
    Bankers,
}

#[derive(Debug, thiserror::Error)]
#[error("unrecognised rounding mode `{0}` (expected truncate, half-up or bankers)")]
pub struct InvalidRoundingMode(String);

impl FromStr for RoundingMode {
    type Err = InvalidRoundingMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "truncate" => Ok(Self::Truncate),
            "half-up" | "half_up" | "halfup" => Ok(Self::HalfUp),
            "bankers" | "half-even" | "half_even" => Ok(Self::Bankers),
            other => Err(InvalidRoundingMode(other.to_string())),
        }
    }
}

static ROUNDING_MODE: OnceLock<RoundingMode> = OnceLock::new();
static ROUNDING_MODE_LOGGED: OnceLock<()> = OnceLock::new();

/// Resolve the process-wide rounding mode from `MONEY_ROUNDING`, defaulting to
/// half-up. The first call wins; later env changes are ignored.
pub fn init_rounding_mode_from_env() -> RoundingMode {
    *ROUNDING_MODE.get_or_init(|| match std::env::var("MONEY_ROUNDING") {
        Ok(raw) => raw.parse().unwrap_or_else(|err: InvalidRoundingMode| {
            tracing::warn!(%err, "falling back to half-up rounding");
            RoundingMode::HalfUp
        }),
        Err(_) => RoundingMode::HalfUp,
    })
}

pub fn rounding_mode() -> RoundingMode {
    init_rounding_mode_from_env()
}

/// Emit a single startup log line recording the active rounding mode so audits
/// of historical totals can tell which mode produced them.
pub fn log_rounding_mode_once() {
    ROUNDING_MODE_LOGGED.get_or_init(|| {
        tracing::info!(mode = ?rounding_mode(), scale = MONEY_SCALE, "monetary rounding configured");
    });
}

fn half_cent() -> BigDecimal {
    // 0.005
    BigDecimal::from(5) / BigDecimal::from(1000)
}

fn one_cent() -> BigDecimal {
    BigDecimal::from(1) / BigDecimal::from(100)
}

/// Drop digits beyond [`MONEY_SCALE`] toward zero.
pub fn truncate_scale(value: &BigDecimal) -> BigDecimal {
    value.with_scale(MONEY_SCALE)
}

/// Round to [`MONEY_SCALE`] with ties moving away from zero.
pub fn round_half_up(value: &BigDecimal) -> BigDecimal {
    let adjust = half_cent();
    let shifted = if *value < BigDecimal::zero() {
        value - adjust
    } else {
        value + adjust
    };
    shifted.with_scale(MONEY_SCALE)
}

/// Round to [`MONEY_SCALE`] with ties settling on the even cent.
pub fn round_bankers(value: &BigDecimal) -> BigDecimal {
    let truncated = value.with_scale(MONEY_SCALE);
    let remainder = value - &truncated;
    let half = half_cent();
    let is_tie = remainder == half || remainder == -half_cent();
    if !is_tie {
        return round_half_up(value);
    }
    let cents = (&truncated * BigDecimal::from(100)).with_scale(0);
    match cents.to_i64() {
        Some(cents) if cents % 2 == 0 => truncated,
        // Odd cent (or magnitude beyond i64): behave as half-up.
        _ => {
            if *value < BigDecimal::zero() {
                truncated - one_cent()
            } else {
                truncated + one_cent()
            }
        }
    }
}

/// Normalize a monetary value to [`MONEY_SCALE`] using the process-wide mode.
pub fn normalize_scale(value: &BigDecimal) -> BigDecimal {
    match rounding_mode() {
        RoundingMode::Truncate => truncate_scale(value),
        RoundingMode::HalfUp => round_half_up(value),
        RoundingMode::Bankers => round_bankers(value),
    }
}

/// Compare two monetary values allowing a tolerance (in cents) after normalization.
pub fn nearly_equal(a: &BigDecimal, b: &BigDecimal, cents_tolerance: i64) -> bool {
    let diff = normalize_scale(a) - normalize_scale(b);
    let diff = if diff < BigDecimal::zero() { -diff } else { diff };
    diff <= BigDecimal::from(cents_tolerance) / BigDecimal::from(100)
}

/// A monetary amount already normalized to [`MONEY_SCALE`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedMoney(BigDecimal);

impl NormalizedMoney {
    pub fn new(raw: BigDecimal) -> Self {
        Self(normalize_scale(&raw))
    }

    pub fn inner(&self) -> &BigDecimal {
        &self.0
    }

    pub fn into_inner(self) -> BigDecimal {
        self.0
    }
}

impl From<BigDecimal> for NormalizedMoney {
    fn from(value: BigDecimal) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Display for NormalizedMoney {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn truncate_drops_extra_digits() {
        assert_eq!(truncate_scale(&dec("12.3456")).to_string(), "12.34");
        assert_eq!(truncate_scale(&dec("-12.3456")).to_string(), "-12.34");
    }

    #[test]
    fn half_up_rounds_midpoint_away_from_zero() {
        assert_eq!(round_half_up(&dec("1.005")).to_string(), "1.01");
        assert_eq!(round_half_up(&dec("1.0049")).to_string(), "1.00");
        assert_eq!(round_half_up(&dec("-1.005")).to_string(), "-1.01");
        assert_eq!(round_half_up(&dec("21.6")).to_string(), "21.60");
    }

    #[test]
    fn bankers_ties_settle_on_even_cent() {
        assert_eq!(round_bankers(&dec("0.125")).to_string(), "0.12");
        assert_eq!(round_bankers(&dec("0.135")).to_string(), "0.14");
        assert_eq!(round_bankers(&dec("0.1351")).to_string(), "0.14");
        assert_eq!(round_bankers(&dec("-0.125")).to_string(), "-0.12");
    }

    #[test]
    fn normalize_defaults_to_half_up() {
        // MONEY_ROUNDING is unset in the test environment.
        assert_eq!(normalize_scale(&dec("12.3456")).to_string(), "12.35");
    }

    #[test]
    fn nearly_equal_within_cent_tolerance() {
        assert!(nearly_equal(&dec("10.00"), &dec("10.01"), 1));
        assert!(!nearly_equal(&dec("10.00"), &dec("10.02"), 1));
    }

    #[test]
    fn normalized_money_round_trips() {
        let money = NormalizedMoney::new(dec("19.999"));
        assert_eq!(money.inner().to_string(), "20.00");
    }
}
