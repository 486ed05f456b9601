use crate::{BaseUnits, UnitsError};
use num_bigint::BigUint;
use num_traits::Zero;
use std::{fmt, str::FromStr};

/// Largest exponent accepted in exponent notation.
///
/// Bounds the size of the integers built while parsing untrusted input.
const MAX_EXPONENT: u32 = 1_000;

/// Arbitrary-precision non-negative decimal: `mantissa / 10^scale`.
///
/// Always normalized: the mantissa carries no trailing zero digits while `scale > 0`, so two
/// equal values have equal representations and [`Display`](fmt::Display) yields the canonical
/// string (no leading zeros, no trailing fractional zeros, no exponent).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DecimalAmount {
    mantissa: BigUint,
    scale: u32,
}

impl DecimalAmount {
    pub fn zero() -> Self {
        Self { mantissa: BigUint::zero(), scale: 0 }
    }

    /// Builds a decimal from an integer mantissa and a number of fractional digits.
    pub fn new(mantissa: BigUint, scale: u32) -> Self {
        let mut value = Self { mantissa, scale };
        value.normalize();
        value
    }

    /// Reconstitutes the exact decimal digits of a binary float.
    ///
    /// The float is rendered with its shortest round-trip digits in exponent form and those
    /// digits are then scaled arithmetically, so `1.5e-7` becomes `0.00000015` without any
    /// textual shifting of the decimal point.
    pub fn from_f64(value: f64) -> Result<Self, UnitsError> {
        if !value.is_finite() {
            return Err(UnitsError::invalid(value.to_string(), "amount must be finite"));
        }
        if value < 0.0 {
            return Err(UnitsError::invalid(value.to_string(), "amount must not be negative"));
        }
        // `-0.0` compares equal to zero but renders with a sign.
        if value == 0.0 {
            return Ok(Self::zero());
        }
        format!("{value:e}").parse()
    }

    /// Number of fractional digits.
    pub const fn scale(&self) -> u32 {
        self.scale
    }

    pub fn mantissa(&self) -> &BigUint {
        &self.mantissa
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    /// Scales by `10^decimals`, truncating toward zero.
    ///
    /// Truncation is silent here; callers that must not lose digits compare the result's
    /// decimal rendering against `self`.
    pub fn to_base_units_truncated(&self, decimals: u32) -> BaseUnits {
        let value = if self.scale <= decimals {
            &self.mantissa * pow10(decimals - self.scale)
        } else {
            &self.mantissa / pow10(self.scale - decimals)
        };
        BaseUnits::new(value)
    }

    fn normalize(&mut self) {
        if self.mantissa.is_zero() {
            self.scale = 0;
            return;
        }
        if self.scale == 0 {
            return;
        }
        let digits = self.mantissa.to_str_radix(10);
        let zeros = digits.bytes().rev().take_while(|b| *b == b'0').count();
        let strip = u32::try_from(zeros).map_or(self.scale, |zeros| zeros.min(self.scale));
        if strip > 0 {
            self.mantissa /= pow10(strip);
            self.scale -= strip;
        }
    }
}

impl Default for DecimalAmount {
    fn default() -> Self {
        Self::zero()
    }
}

/// Returns `10^exp`.
pub(crate) fn pow10(exp: u32) -> BigUint {
    BigUint::from(10u32).pow(exp)
}

impl FromStr for DecimalAmount {
    type Err = UnitsError;

    /// Parses `[+]digits[.digits][(e|E)[+|-]digits]`, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(UnitsError::invalid(s, "amount is empty"));
        }
        if trimmed.starts_with('-') {
            return Err(UnitsError::invalid(s, "amount must not be negative"));
        }
        let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);

        let (number, exponent) = match unsigned.find(['e', 'E']) {
            Some(idx) => (&unsigned[..idx], Some(&unsigned[idx + 1..])),
            None => (unsigned, None),
        };

        let (int_part, frac_part) = match number.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (number, ""),
        };
        let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !is_digits(int_part) || !is_digits(frac_part) {
            return Err(UnitsError::invalid(s, "amount must be a decimal number"));
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(UnitsError::invalid(s, "amount has no digits"));
        }

        let frac_part = frac_part.trim_end_matches('0');
        let mut digits = String::with_capacity(int_part.len() + frac_part.len());
        digits.push_str(int_part);
        digits.push_str(frac_part);
        if digits.is_empty() {
            digits.push('0');
        }
        let mantissa = BigUint::parse_bytes(digits.as_bytes(), 10)
            .ok_or_else(|| UnitsError::invalid(s, "amount must be a decimal number"))?;

        let frac_len = i64::try_from(frac_part.len())
            .map_err(|_| UnitsError::invalid(s, "amount has too many digits"))?;
        let exponent = match exponent {
            Some(exp) => parse_exponent(exp).ok_or_else(|| {
                UnitsError::invalid(s, "exponent must be an integer within ±1000")
            })?,
            None => 0,
        };

        // value = mantissa * 10^(exponent - frac_len)
        let shift = exponent - frac_len;
        let amount = if shift >= 0 {
            let shift = u32::try_from(shift)
                .map_err(|_| UnitsError::invalid(s, "amount has too many digits"))?;
            Self::new(mantissa * pow10(shift), 0)
        } else {
            let scale = u32::try_from(-shift)
                .map_err(|_| UnitsError::invalid(s, "amount has too many digits"))?;
            Self::new(mantissa, scale)
        };
        Ok(amount)
    }
}

fn parse_exponent(exp: &str) -> Option<i64> {
    let (negative, digits) = match exp.as_bytes().first()? {
        b'-' => (true, &exp[1..]),
        b'+' => (false, &exp[1..]),
        _ => (false, exp),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let magnitude: u32 = digits.parse().ok().filter(|m| *m <= MAX_EXPONENT)?;
    let magnitude = i64::from(magnitude);
    Some(if negative { -magnitude } else { magnitude })
}

impl fmt::Display for DecimalAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.to_string();
        let scale = self.scale as usize;
        if scale == 0 {
            return f.write_str(&digits);
        }
        if digits.len() <= scale {
            write!(f, "0.{digits:0>scale$}")
        } else {
            let (whole, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{whole}.{frac}")
        }
    }
}
