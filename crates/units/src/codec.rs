use crate::{BaseUnits, DecimalAmount, UnitsError, decimal::pow10};
use num_bigint::BigUint;
use num_traits::Zero;

/// Largest token decimals the codec accepts.
pub const MAX_DECIMALS: u32 = 255;

/// A user- or upstream-provided amount.
///
/// Text is the preferred form. Numbers are accepted because upstream layers sometimes hand
/// over values that already went through binary floating point; their shortest round-trip
/// digits are reconstituted before any scaling happens.
#[derive(Clone, Debug, PartialEq)]
pub enum AmountInput {
    Text(String),
    Number(f64),
}

impl AmountInput {
    /// Parses the input into an arbitrary-precision decimal.
    pub fn to_decimal(&self) -> Result<DecimalAmount, UnitsError> {
        match self {
            Self::Text(text) => text.parse(),
            Self::Number(number) => DecimalAmount::from_f64(*number),
        }
    }
}

impl From<&str> for AmountInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AmountInput {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for AmountInput {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<f64> for AmountInput {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

pub(crate) fn check_decimals(decimals: u32) -> Result<(), UnitsError> {
    if decimals > MAX_DECIMALS {
        return Err(UnitsError::InvalidDecimals(decimals));
    }
    Ok(())
}

/// Converts a human decimal amount into base units.
///
/// The amount is multiplied by `10^decimals` and truncated toward zero. The result is then
/// rendered back to a decimal string and compared with the parsed input: any mismatch means
/// digits were dropped and the conversion fails with [`UnitsError::PrecisionLoss`] instead of
/// returning a rounded value.
///
/// ```
/// use vault_units::{UnitsError, to_base_units};
///
/// assert_eq!(to_base_units("1.5", 6)?.to_string(), "1500000");
/// assert!(matches!(to_base_units("0.0000001", 6), Err(UnitsError::PrecisionLoss { .. })));
/// # Ok::<_, UnitsError>(())
/// ```
pub fn to_base_units(
    amount: impl Into<AmountInput>,
    decimals: u32,
) -> Result<BaseUnits, UnitsError> {
    check_decimals(decimals)?;
    let parsed = amount.into().to_decimal()?;
    let base = parsed.to_base_units_truncated(decimals);

    let expected = parsed.to_string();
    let roundtrip = to_decimal_string(&base, decimals)?;
    if roundtrip != expected {
        debug!(amount = %expected, %roundtrip, decimals, "rejecting precision-losing amount");
        return Err(UnitsError::PrecisionLoss { amount: expected, decimals });
    }

    trace!(amount = %expected, %base, decimals, "converted to base units");
    Ok(base)
}

/// Renders base units as a canonical decimal string.
///
/// Zero renders as `"0"`. Otherwise the whole part is followed by the remainder, left-padded
/// to `decimals` digits with trailing zeros trimmed; an all-zero remainder omits the decimal
/// point. Only integer arithmetic is involved, so one base unit of an 18-decimal token renders
/// as `0.000000000000000001`, never `0`.
pub fn to_decimal_string(amount: &BaseUnits, decimals: u32) -> Result<String, UnitsError> {
    check_decimals(decimals)?;
    let (whole, frac) = split(amount, decimals);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() { Ok(whole.to_string()) } else { Ok(format!("{whole}.{frac}")) }
}

/// Splits base units into the whole-unit integer and the zero-padded fractional digits.
pub(crate) fn split(amount: &BaseUnits, decimals: u32) -> (BigUint, String) {
    let value = amount.as_biguint();
    if decimals == 0 {
        return (value.clone(), String::new());
    }
    let unit = pow10(decimals);
    let whole = value / &unit;
    let remainder = value % &unit;
    let width = decimals as usize;
    let frac = if remainder.is_zero() {
        "0".repeat(width)
    } else {
        format!("{:0>width$}", remainder.to_string())
    };
    (whole, frac)
}

/// Strips leading zeros and trailing fractional zeros, resolving any exponent.
///
/// ```
/// assert_eq!(vault_units::canonicalize("00100.5000")?, "100.5");
/// assert_eq!(vault_units::canonicalize("0.000")?, "0");
/// # Ok::<_, vault_units::UnitsError>(())
/// ```
pub fn canonicalize(amount: &str) -> Result<String, UnitsError> {
    amount.parse::<DecimalAmount>().map(|d| d.to_string())
}
